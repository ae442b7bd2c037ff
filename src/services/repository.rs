// Repository endpoints

use reqwest::Method;

use super::item_path;
use crate::error::Result;
use crate::http_client::RequestDispatcher;
use crate::models::Repository;

pub struct RepositoryService<'a> {
    dispatcher: &'a RequestDispatcher,
}

impl<'a> RepositoryService<'a> {
    pub fn new(dispatcher: &'a RequestDispatcher) -> Self {
        Self { dispatcher }
    }

    pub async fn list(&self) -> Result<Vec<Repository>> {
        let req = self
            .dispatcher
            .new_request(Method::GET, "repository", None)
            .await?;
        self.dispatcher.execute(req).await
    }

    pub async fn get(&self, id: &str) -> Result<Repository> {
        let req = self
            .dispatcher
            .new_request(Method::GET, &item_path("repository", id)?, None)
            .await?;
        self.dispatcher.execute(req).await
    }
}
