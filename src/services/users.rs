// User endpoints

use reqwest::Method;

use super::item_path;
use crate::error::Result;
use crate::http_client::{json_body, RequestDispatcher};
use crate::models::{User, UserListOptions};

pub struct UsersService<'a> {
    dispatcher: &'a RequestDispatcher,
}

impl<'a> UsersService<'a> {
    pub fn new(dispatcher: &'a RequestDispatcher) -> Self {
        Self { dispatcher }
    }

    pub async fn list(&self, opts: &UserListOptions) -> Result<Vec<User>> {
        let req = self
            .dispatcher
            .new_request_with_query(Method::GET, "users", &opts.to_query(), None)
            .await?;
        self.dispatcher.execute(req).await
    }

    pub async fn get(&self, id: &str) -> Result<User> {
        let req = self
            .dispatcher
            .new_request(Method::GET, &item_path("users", id)?, None)
            .await?;
        self.dispatcher.execute(req).await
    }

    pub async fn create(&self, user: &User) -> Result<User> {
        let req = self
            .dispatcher
            .new_request(Method::POST, "users", Some(json_body(user)?))
            .await?;
        self.dispatcher.execute(req).await
    }

    pub async fn update(&self, id: &str, user: &User) -> Result<User> {
        let req = self
            .dispatcher
            .new_request(Method::PUT, &item_path("users", id)?, Some(json_body(user)?))
            .await?;
        self.dispatcher.execute(req).await
    }
}
