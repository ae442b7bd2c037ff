// Admin settings endpoint of the resource API

use reqwest::Method;

use crate::error::Result;
use crate::http_client::RequestDispatcher;
use crate::models::AdminSettings;

pub struct AdminSettingsService<'a> {
    dispatcher: &'a RequestDispatcher,
}

impl<'a> AdminSettingsService<'a> {
    pub fn new(dispatcher: &'a RequestDispatcher) -> Self {
        Self { dispatcher }
    }

    pub async fn get(&self) -> Result<AdminSettings> {
        let req = self
            .dispatcher
            .new_request(Method::GET, "adminSettings", None)
            .await?;
        self.dispatcher.execute(req).await
    }
}
