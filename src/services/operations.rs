// Operation endpoints

use reqwest::Method;

use super::item_path;
use crate::error::Result;
use crate::http_client::{json_body, RequestDispatcher};
use crate::models::{Operation, OperationListOptions};

pub struct OperationsService<'a> {
    dispatcher: &'a RequestDispatcher,
}

impl<'a> OperationsService<'a> {
    pub fn new(dispatcher: &'a RequestDispatcher) -> Self {
        Self { dispatcher }
    }

    pub async fn list(&self, opts: &OperationListOptions) -> Result<Vec<Operation>> {
        let req = self
            .dispatcher
            .new_request_with_query(Method::GET, "operations", &opts.to_query(), None)
            .await?;
        self.dispatcher.execute(req).await
    }

    pub async fn get(&self, id: &str) -> Result<Operation> {
        let req = self
            .dispatcher
            .new_request(Method::GET, &item_path("operations", id)?, None)
            .await?;
        self.dispatcher.execute(req).await
    }

    pub async fn create(&self, operation: &Operation) -> Result<Operation> {
        let req = self
            .dispatcher
            .new_request(Method::POST, "operations", Some(json_body(operation)?))
            .await?;
        self.dispatcher.execute(req).await
    }

    pub async fn update(&self, id: &str, operation: &Operation) -> Result<Operation> {
        let req = self
            .dispatcher
            .new_request(
                Method::PUT,
                &item_path("operations", id)?,
                Some(json_body(operation)?),
            )
            .await?;
        self.dispatcher.execute(req).await
    }
}
