// Role endpoints

use reqwest::{Method, StatusCode};

use super::item_path;
use crate::error::{ClientError, Result};
use crate::http_client::{json_body, RequestDispatcher};
use crate::models::Role;

pub struct RolesService<'a> {
    dispatcher: &'a RequestDispatcher,
}

impl<'a> RolesService<'a> {
    pub fn new(dispatcher: &'a RequestDispatcher) -> Self {
        Self { dispatcher }
    }

    pub async fn list(&self) -> Result<Vec<Role>> {
        let req = self.dispatcher.new_request(Method::GET, "roles", None).await?;
        self.dispatcher.execute(req).await
    }

    pub async fn create(&self, role: &Role) -> Result<Role> {
        let req = self
            .dispatcher
            .new_request(Method::POST, "roles", Some(json_body(role)?))
            .await?;
        self.dispatcher.execute(req).await
    }

    pub async fn update(&self, id: &str, role: &Role) -> Result<Role> {
        let req = self
            .dispatcher
            .new_request(Method::PUT, &item_path("roles", id)?, Some(json_body(role)?))
            .await?;
        self.dispatcher.execute(req).await
    }

    /// Check whether the server accepts the current token
    ///
    /// 401 and 403 answer `false`; other failures are returned as errors.
    pub async fn check_auth(&self) -> Result<bool> {
        let req = self
            .dispatcher
            .new_request(Method::GET, "roles/auth", None)
            .await?;

        match self.dispatcher.send(req).await {
            Ok(response) => Ok(response.status() == StatusCode::OK),
            Err(ClientError::Api { status: 401 | 403, .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }
}
