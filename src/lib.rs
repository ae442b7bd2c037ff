// ENBUILD SDK - typed client for the ENBUILD REST API

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod http_client;
pub mod models;
pub mod services;
pub mod utils;

pub use client::{AuthStrategy, ClientBuilder, EnbuildClient};
pub use error::{AuthError, ClientError, Result};
