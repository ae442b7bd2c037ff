// Resource models for the ENBUILD API

pub mod catalog;
pub mod common;
pub mod identity;
pub mod platform;

pub use catalog::{Catalog, CatalogListOptions, Manifest, ManifestListOptions, VcsType};
pub use common::{DataEnvelope, PageOptions, ResourceId};
pub use identity::{LocalAdmin, Role, User, UserListOptions};
pub use platform::{AdminSettings, MlDataset, Operation, OperationListOptions, Repository};
