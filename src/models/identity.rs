// User, role and local admin models

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::common::{PageOptions, ResourceId};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<ResourceId>,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_on: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_on: Option<Value>,
}

/// Filters for listing users
#[derive(Debug, Clone, Default)]
pub struct UserListOptions {
    pub created_by: Option<String>,
    pub page: PageOptions,
}

impl UserListOptions {
    pub(crate) fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if let Some(created_by) = self.created_by.as_deref().filter(|s| !s.is_empty()) {
            query.push(("createdBy", created_by.to_string()));
        }
        self.page.append_to(&mut query);
        query
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<ResourceId>,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub permissions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_on: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_on: Option<Value>,
}

/// Local administrator account
/// `password` is write-only and never present in responses
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalAdmin {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<ResourceId>,
    #[serde(default)]
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_on: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_on: Option<Value>,
}

impl std::fmt::Debug for LocalAdmin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalAdmin")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_list_query() {
        let opts = UserListOptions {
            created_by: Some("admin".to_string()),
            page: PageOptions {
                limit: Some(10),
                page: None,
                sort: Some("-createdOn".to_string()),
            },
        };
        assert_eq!(
            opts.to_query(),
            vec![
                ("createdBy", "admin".to_string()),
                ("limit", "10".to_string()),
                ("sort", "-createdOn".to_string()),
            ]
        );
        assert!(UserListOptions::default().to_query().is_empty());
    }

    #[test]
    fn test_user_serialization_omits_empty_fields() {
        let user = User {
            username: "jdoe".to_string(),
            email: "jdoe@example.com".to_string(),
            ..Default::default()
        };
        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"username": "jdoe", "email": "jdoe@example.com"})
        );
    }

    #[test]
    fn test_local_admin_debug_hides_password() {
        let admin = LocalAdmin {
            username: "root".to_string(),
            password: Some("s3cr3t-value".to_string()),
            ..Default::default()
        };
        let debug = format!("{:?}", admin);
        assert!(debug.contains("root"));
        assert!(!debug.contains("s3cr3t-value"));
    }
}
