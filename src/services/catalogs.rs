// Catalog endpoints
// Catalogs are served from the manifests resource; filtering happens locally

use reqwest::Method;

use super::item_path;
use crate::error::{ClientError, Result};
use crate::http_client::RequestDispatcher;
use crate::models::{Catalog, CatalogListOptions};

pub struct CatalogsService<'a> {
    dispatcher: &'a RequestDispatcher,
}

impl<'a> CatalogsService<'a> {
    pub fn new(dispatcher: &'a RequestDispatcher) -> Self {
        Self { dispatcher }
    }

    /// List catalogs matching every filter set in `opts`
    pub async fn list(&self, opts: &CatalogListOptions) -> Result<Vec<Catalog>> {
        let req = self
            .dispatcher
            .new_request(Method::GET, "manifests", None)
            .await?;
        let catalogs: Vec<Catalog> = self.dispatcher.execute(req).await?;
        let total = catalogs.len();

        let filtered: Vec<Catalog> = catalogs.into_iter().filter(|c| opts.matches(c)).collect();
        tracing::debug!(total = total, matched = filtered.len(), "Filtered catalogs");

        Ok(filtered)
    }

    /// Fetch one catalog; the endpoint answers with a list
    pub async fn get(&self, id: &str) -> Result<Catalog> {
        let path = item_path("manifests", id)
            .map_err(|_| ClientError::InvalidRequest("catalog ID is required".to_string()))?;

        let req = self.dispatcher.new_request(Method::GET, &path, None).await?;
        let catalogs: Vec<Catalog> = self.dispatcher.execute(req).await?;

        catalogs
            .into_iter()
            .next()
            .ok_or_else(|| ClientError::NotFound(format!("catalog {}", id)))
    }
}
