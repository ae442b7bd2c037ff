// Local administrator endpoints

use reqwest::Method;

use super::item_path;
use crate::error::Result;
use crate::http_client::{json_body, RequestDispatcher};
use crate::models::LocalAdmin;

pub struct AuthLocalService<'a> {
    dispatcher: &'a RequestDispatcher,
}

impl<'a> AuthLocalService<'a> {
    pub fn new(dispatcher: &'a RequestDispatcher) -> Self {
        Self { dispatcher }
    }

    pub async fn create(&self, admin: &LocalAdmin) -> Result<LocalAdmin> {
        let req = self
            .dispatcher
            .new_request(Method::POST, "authLocal", Some(json_body(admin)?))
            .await?;
        self.dispatcher.execute(req).await
    }

    pub async fn update(&self, id: &str, admin: &LocalAdmin) -> Result<LocalAdmin> {
        let req = self
            .dispatcher
            .new_request(Method::PUT, &item_path("authLocal", id)?, Some(json_body(admin)?))
            .await?;
        self.dispatcher.execute(req).await
    }
}
