// Resource services
// Thin wrappers that build paths, call the dispatcher and decode payloads

mod admin_settings;
mod auth_local;
mod catalogs;
mod manifests;
mod ml_dataset;
mod operations;
mod repository;
mod roles;
mod users;

pub use admin_settings::AdminSettingsService;
pub use auth_local::AuthLocalService;
pub use catalogs::CatalogsService;
pub use manifests::ManifestsService;
pub use ml_dataset::MlDatasetService;
pub use operations::OperationsService;
pub use repository::RepositoryService;
pub use roles::RolesService;
pub use users::UsersService;

use crate::error::{ClientError, Result};
use crate::utils::encode_path_segment;

/// `{collection}/{id}` with the id percent-encoded; empty ids are rejected
pub(crate) fn item_path(collection: &str, id: &str) -> Result<String> {
    let id = id.trim();
    if id.is_empty() {
        return Err(ClientError::InvalidRequest(format!(
            "{} ID is required",
            collection
        )));
    }
    // URL resolution would collapse these into a parent path
    if id == "." || id == ".." {
        return Err(ClientError::InvalidRequest(format!(
            "{} ID '{}' is not a valid path segment",
            collection, id
        )));
    }
    Ok(format!("{}/{}", collection, encode_path_segment(id)))
}
