// Manifest endpoints
// Without a VCS the generic `manifests` resource is used; GitHub and GitLab
// manifests live under their own resources and nest the payload in
// `data.catalogManifest`

use reqwest::Method;

use super::item_path;
use crate::error::Result;
use crate::http_client::RequestDispatcher;
use crate::models::catalog::{VcsManifestItem, VcsManifestList};
use crate::models::{Manifest, ManifestListOptions};

pub struct ManifestsService<'a> {
    dispatcher: &'a RequestDispatcher,
}

impl<'a> ManifestsService<'a> {
    pub fn new(dispatcher: &'a RequestDispatcher) -> Self {
        Self { dispatcher }
    }

    pub async fn list(&self, opts: &ManifestListOptions) -> Result<Vec<Manifest>> {
        match opts.vcs {
            None => {
                let req = self
                    .dispatcher
                    .new_request(Method::GET, "manifests", None)
                    .await?;
                self.dispatcher.execute(req).await
            }
            Some(vcs) => {
                tracing::debug!(vcs = %vcs, "Listing VCS manifests");
                let req = self
                    .dispatcher
                    .new_request(Method::GET, vcs.manifest_path(), None)
                    .await?;
                let data: VcsManifestList = self.dispatcher.execute(req).await?;
                Ok(data.catalog_manifest)
            }
        }
    }

    pub async fn get(&self, id: &str, opts: &ManifestListOptions) -> Result<Manifest> {
        match opts.vcs {
            None => {
                let req = self
                    .dispatcher
                    .new_request(Method::GET, &item_path("manifests", id)?, None)
                    .await?;
                self.dispatcher.execute(req).await
            }
            Some(vcs) => {
                let req = self
                    .dispatcher
                    .new_request(Method::GET, &item_path(vcs.manifest_path(), id)?, None)
                    .await?;
                let data: VcsManifestItem = self.dispatcher.execute(req).await?;
                Ok(data.catalog_manifest)
            }
        }
    }
}
