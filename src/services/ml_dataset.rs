// ML dataset endpoints

use reqwest::Method;

use crate::error::Result;
use crate::http_client::RequestDispatcher;
use crate::models::MlDataset;

pub struct MlDatasetService<'a> {
    dispatcher: &'a RequestDispatcher,
}

impl<'a> MlDatasetService<'a> {
    pub fn new(dispatcher: &'a RequestDispatcher) -> Self {
        Self { dispatcher }
    }

    pub async fn list(&self) -> Result<Vec<MlDataset>> {
        let req = self
            .dispatcher
            .new_request(Method::GET, "mlDataset", None)
            .await?;
        self.dispatcher.execute(req).await
    }
}
