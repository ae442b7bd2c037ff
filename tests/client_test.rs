// Integration tests for the client, the dispatcher and the resource services

use mockito::{Matcher, Server, ServerGuard};
use reqwest::Url;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use enbuild::auth::{GrantType, StaticToken, TokenSource, ADMIN_SETTINGS_PATH, LOCAL_SENTINEL_TOKEN};
use enbuild::error::{AuthError, ConfigFailure};
use enbuild::http_client::RequestDispatcher;
use enbuild::models::{
    CatalogListOptions, LocalAdmin, ManifestListOptions, OperationListOptions, PageOptions, User,
    UserListOptions, VcsType,
};
use enbuild::{AuthStrategy, ClientBuilder, ClientError, EnbuildClient};

// ==================================================================================================
// Test Helpers
// ==================================================================================================

const API: &str = "/enbuild-bk/api/v1";
const TOKEN_PATH: &str = "/realms/enbuild/protocol/openid-connect/token";

fn api(path: &str) -> String {
    format!("{}/{}", API, path)
}

async fn token_client(server: &ServerGuard) -> EnbuildClient {
    ClientBuilder::new()
        .base_url(server.url())
        .auth(AuthStrategy::api_token("test-token"))
        .build()
        .await
        .unwrap()
}

async fn mock_keycloak_discovery(server: &mut ServerGuard) {
    let body = json!({
        "data": {
            "settings": {
                "authMechanism": "keycloak",
                "adminConfigs": {
                    "keycloak": {
                        "KEYCLOAK_BACKEND_URL": server.url(),
                        "KEYCLOAK_CLIENT_ID": "enbuild-sdk",
                        "KEYCLOAK_REALM": "enbuild"
                    }
                }
            }
        }
    });

    server
        .mock("GET", ADMIN_SETTINGS_PATH)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(body.to_string())
        .create_async()
        .await;
}

fn wiremock_dispatcher(server: &MockServer, max_retries: u32) -> RequestDispatcher {
    let base = Url::parse(&format!("{}{}/", server.uri(), API)).unwrap();
    let token: Arc<dyn TokenSource> = Arc::new(StaticToken::new("test-token"));
    RequestDispatcher::new(base, "enbuild-sdk-rust/test", Duration::from_secs(5), Some(token))
        .unwrap()
        .with_max_retries(max_retries)
        .with_retry_base_delay(Duration::from_millis(10))
}

// ==================================================================================================
// Authentication through the client
// ==================================================================================================

#[tokio::test]
async fn test_local_mechanism_sends_sentinel_token() {
    let mut server = Server::new_async().await;
    let discovery = server
        .mock("GET", ADMIN_SETTINGS_PATH)
        .with_status(200)
        .with_body(json!({"data": {"settings": {"authMechanism": "local"}}}).to_string())
        .expect(1)
        .create_async()
        .await;
    let roles = server
        .mock("GET", api("roles").as_str())
        .match_header(
            "authorization",
            format!("Bearer {}", LOCAL_SENTINEL_TOKEN).as_str(),
        )
        .match_header("user-agent", Matcher::Regex("^enbuild-sdk-rust/".into()))
        .match_header("accept", "application/json")
        .with_status(200)
        .with_body(json!({"data": [{"id": 1, "name": "admin"}]}).to_string())
        .expect(2)
        .create_async()
        .await;

    let client = ClientBuilder::new()
        .base_url(server.url())
        .auth(AuthStrategy::password("admin", "pw"))
        .build()
        .await
        .unwrap();

    assert_eq!(client.mechanism().map(|m| m.name()), Some("local"));
    for _ in 0..2 {
        let list = client.roles().list().await.unwrap();
        assert_eq!(list[0].name, "admin");
        assert_eq!(list[0].id.as_ref().unwrap().as_str(), "1");
    }

    discovery.assert_async().await;
    roles.assert_async().await;
}

#[tokio::test]
async fn test_oidc_token_is_attached_to_requests() {
    let mut server = Server::new_async().await;
    mock_keycloak_discovery(&mut server).await;
    let grant = server
        .mock("POST", TOKEN_PATH)
        .match_body(Matcher::UrlEncoded("grant_type".into(), "password".into()))
        .with_status(200)
        .with_body(
            json!({
                "access_token": "T1",
                "expires_in": 300,
                "refresh_token": "R1",
                "refresh_expires_in": 1800
            })
            .to_string(),
        )
        .expect(1)
        .create_async()
        .await;
    let settings = server
        .mock("GET", api("adminSettings").as_str())
        .match_header("authorization", "Bearer T1")
        .with_status(200)
        .with_body(json!({"data": {"settings": {"authMechanism": "keycloak"}}}).to_string())
        .expect(2)
        .create_async()
        .await;

    let client = ClientBuilder::new()
        .base_url(format!("{}/enbuild-bk", server.url()))
        .auth(AuthStrategy::password("admin", "pw"))
        .build()
        .await
        .unwrap();

    assert_eq!(client.mechanism().map(|m| m.name()), Some("oidc-password"));
    client.admin_settings().get().await.unwrap();
    client.admin_settings().get().await.unwrap();

    grant.assert_async().await;
    settings.assert_async().await;
}

#[tokio::test]
async fn test_token_failure_fails_fast_without_sending() {
    let mut server = Server::new_async().await;
    mock_keycloak_discovery(&mut server).await;
    server
        .mock("POST", TOKEN_PATH)
        .with_status(401)
        .with_body(r#"{"error":"invalid_grant","error_description":"Invalid user credentials"}"#)
        .create_async()
        .await;
    let users = server
        .mock("GET", Matcher::Regex(format!("^{}/users", API)))
        .expect(0)
        .create_async()
        .await;

    let client = ClientBuilder::new()
        .base_url(server.url())
        .auth(AuthStrategy::password("admin", "wrong"))
        .build()
        .await
        .unwrap();

    let err = client
        .users()
        .list(&UserListOptions::default())
        .await
        .unwrap_err();

    assert!(err.is_auth_error());
    match err {
        ClientError::Auth(AuthError::TokenExchangeFailed { grant, status, .. }) => {
            assert_eq!(grant, GrantType::Password);
            assert_eq!(status, Some(401));
        }
        other => panic!("expected token exchange failure, got {:?}", other),
    }
    users.assert_async().await;
}

#[tokio::test]
async fn test_build_fails_when_discovery_is_unreachable() {
    let err = ClientBuilder::new()
        .base_url("http://127.0.0.1:9")
        .auth(AuthStrategy::password("admin", "pw"))
        .auth_timeout(Duration::from_secs(2))
        .build()
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ClientError::Auth(AuthError::ConfigUnavailable {
            reason: ConfigFailure::Transport { .. },
            ..
        })
    ));
}

// ==================================================================================================
// Dispatcher behaviour
// ==================================================================================================

#[tokio::test]
async fn test_users_list_sends_query_and_decodes_envelope() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", api("users").as_str())
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("createdBy".into(), "alice".into()),
            Matcher::UrlEncoded("limit".into(), "10".into()),
            Matcher::UrlEncoded("page".into(), "2".into()),
            Matcher::UrlEncoded("sort".into(), "username".into()),
        ]))
        .match_header("authorization", "Bearer test-token")
        .with_status(200)
        .with_body(
            json!({
                "data": [
                    {"id": "u1", "username": "bob", "email": "bob@example.com", "createdBy": "alice"},
                    {"_id": "ignored", "id": 7, "username": "carol", "email": "carol@example.com"}
                ]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let client = token_client(&server).await;
    let opts = UserListOptions {
        created_by: Some("alice".to_string()),
        page: PageOptions {
            limit: Some(10),
            page: Some(2),
            sort: Some("username".to_string()),
        },
    };

    let users = client.users().list(&opts).await.unwrap();
    assert_eq!(users.len(), 2);
    assert_eq!(users[0].username, "bob");
    assert_eq!(users[0].created_by.as_deref(), Some("alice"));
    assert_eq!(users[1].id.as_ref().unwrap().as_str(), "7");

    mock.assert_async().await;
}

#[tokio::test]
async fn test_user_create_sends_json_body() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", api("users").as_str())
        .match_header("content-type", "application/json")
        .match_body(Matcher::Json(json!({
            "username": "dave",
            "email": "dave@example.com",
            "firstName": "Dave"
        })))
        .with_status(201)
        .with_body(
            json!({"data": {"id": "u9", "username": "dave", "email": "dave@example.com"}})
                .to_string(),
        )
        .create_async()
        .await;

    let client = token_client(&server).await;
    let user = User {
        username: "dave".to_string(),
        email: "dave@example.com".to_string(),
        first_name: Some("Dave".to_string()),
        ..Default::default()
    };

    let created = client.users().create(&user).await.unwrap();
    assert_eq!(created.id.unwrap().as_str(), "u9");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_user_get_encodes_id() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", api("users/a%2Fb").as_str())
        .with_status(200)
        .with_body(json!({"data": {"id": "a/b", "username": "odd"}}).to_string())
        .create_async()
        .await;

    let client = token_client(&server).await;
    let user = client.users().get("a/b").await.unwrap();
    assert_eq!(user.username, "odd");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_api_error_message_is_extracted() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", api("users/missing").as_str())
        .with_status(404)
        .with_body(r#"{"statusCode":404,"message":"User not found","error":"Not Found"}"#)
        .create_async()
        .await;

    let client = token_client(&server).await;
    match client.users().get("missing").await.unwrap_err() {
        ClientError::Api {
            status,
            message,
            url,
        } => {
            assert_eq!(status, 404);
            assert_eq!(message, "User not found");
            assert!(url.ends_with("/enbuild-bk/api/v1/users/missing"));
        }
        other => panic!("expected Api error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_missing_envelope_is_invalid_response() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", api("roles").as_str())
        .with_status(200)
        .with_body(r#"{"items": []}"#)
        .create_async()
        .await;

    let client = token_client(&server).await;
    let err = client.roles().list().await.unwrap_err();
    assert!(matches!(err, ClientError::InvalidResponse(_)));
}

#[tokio::test]
async fn test_retries_transient_status_then_succeeds() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(api("operations")))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(api("operations")))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"data": [{"id": "op1"}]})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let dispatcher = wiremock_dispatcher(&server, 2);
    let req = dispatcher
        .new_request(reqwest::Method::GET, "operations", None)
        .await
        .unwrap();
    let ops: Vec<serde_json::Value> = dispatcher.execute(req).await.unwrap();
    assert_eq!(ops.len(), 1);
}

#[tokio::test]
async fn test_exhausted_retries_return_last_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(api("operations")))
        .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
        .expect(3)
        .mount(&server)
        .await;

    let dispatcher = wiremock_dispatcher(&server, 2);
    let req = dispatcher
        .new_request(reqwest::Method::GET, "operations", None)
        .await
        .unwrap();
    let err = dispatcher.send(req).await.unwrap_err();

    assert!(matches!(err, ClientError::Api { status: 429, ref message, .. } if message == "slow down"));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_no_retries_by_default() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(api("operations")))
        .respond_with(ResponseTemplate::new(502))
        .expect(1)
        .mount(&server)
        .await;

    let dispatcher = wiremock_dispatcher(&server, 0);
    let req = dispatcher
        .new_request(reqwest::Method::GET, "operations", None)
        .await
        .unwrap();
    let err = dispatcher.send(req).await.unwrap_err();
    assert!(matches!(err, ClientError::Api { status: 502, .. }));
}

#[tokio::test]
async fn test_client_errors_are_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(api("operations")))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "statusCode": 400,
            "message": ["limit must be a number"]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dispatcher = wiremock_dispatcher(&server, 3);
    let req = dispatcher
        .new_request(reqwest::Method::GET, "operations", None)
        .await
        .unwrap();
    let err = dispatcher.send(req).await.unwrap_err();
    assert!(
        matches!(err, ClientError::Api { status: 400, ref message, .. } if message == "limit must be a number")
    );
}

#[tokio::test]
async fn test_network_errors_exhaust_retries() {
    let base = Url::parse("http://127.0.0.1:9/enbuild-bk/api/v1/").unwrap();
    let dispatcher = RequestDispatcher::new(base, "enbuild-sdk-rust/test", Duration::from_secs(2), None)
        .unwrap()
        .with_max_retries(1)
        .with_retry_base_delay(Duration::from_millis(10));

    let req = dispatcher
        .new_request(reqwest::Method::GET, "roles", None)
        .await
        .unwrap();
    assert!(req.headers().get("authorization").is_none());

    let err = dispatcher.send(req).await.unwrap_err();
    assert!(matches!(err, ClientError::MaxRetriesExceeded(2)));
}

// ==================================================================================================
// Manifests and catalogs
// ==================================================================================================

#[tokio::test]
async fn test_manifest_listing_per_vcs() {
    let mut server = Server::new_async().await;
    let generic = server
        .mock("GET", api("manifests").as_str())
        .with_status(200)
        .with_body(json!({"data": [{"_id": "m1", "name": "EKS"}]}).to_string())
        .create_async()
        .await;
    let github = server
        .mock("GET", api("githubManifest").as_str())
        .with_status(200)
        .with_body(
            json!({"data": {"catalogManifest": [
                {"id": "g1", "name": "AKS", "vcs": "GITHUB"},
                {"id": "g2", "name": "GKE", "vcs": "GITHUB"}
            ]}})
            .to_string(),
        )
        .create_async()
        .await;
    let gitlab = server
        .mock("GET", api("gitlabManifest/l1").as_str())
        .with_status(200)
        .with_body(
            json!({"data": {"catalogManifest": {"id": "l1", "name": "Kafka", "vcs": "GITLAB"}}})
                .to_string(),
        )
        .create_async()
        .await;

    let client = token_client(&server).await;
    let manifests = client.manifests();

    let plain = manifests.list(&ManifestListOptions::default()).await.unwrap();
    assert_eq!(plain[0].resource_id().unwrap().as_str(), "m1");

    let from_github = manifests
        .list(&ManifestListOptions {
            vcs: Some(VcsType::GitHub),
        })
        .await
        .unwrap();
    assert_eq!(
        from_github.iter().map(|m| m.name.as_str()).collect::<Vec<_>>(),
        vec!["AKS", "GKE"]
    );

    let one = manifests
        .get(
            "l1",
            &ManifestListOptions {
                vcs: Some(VcsType::GitLab),
            },
        )
        .await
        .unwrap();
    assert_eq!(one.name, "Kafka");
    assert_eq!(one.vcs.as_deref(), Some("GITLAB"));

    generic.assert_async().await;
    github.assert_async().await;
    gitlab.assert_async().await;
}

#[tokio::test]
async fn test_catalog_filtering() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", api("manifests").as_str())
        .with_status(200)
        .with_body(
            json!({"data": [
                {"id": "c1", "name": "EKS Cluster", "type": "terraform", "vcs": "GITHUB", "slug": "eks"},
                {"id": "c2", "name": "AKS Cluster", "type": "terraform", "vcs": "GITLAB", "slug": "aks"},
                {"id": "c3", "name": "Kafka", "type": "helm", "vcs": "GITHUB", "slug": "kafka"}
            ]})
            .to_string(),
        )
        .expect(3)
        .create_async()
        .await;

    let client = token_client(&server).await;
    let catalogs = client.catalogs();

    let all = catalogs.list(&CatalogListOptions::default()).await.unwrap();
    assert_eq!(all.len(), 3);

    let terraform_github = catalogs
        .list(&CatalogListOptions {
            kind: Some("Terraform".to_string()),
            vcs: Some(VcsType::GitHub),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(terraform_github.len(), 1);
    assert_eq!(terraform_github[0].slug.as_deref(), Some("eks"));

    let clusters = catalogs
        .list(&CatalogListOptions {
            name: Some("cluster".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(clusters.len(), 2);
}

#[tokio::test]
async fn test_catalog_get() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", api("manifests/c1").as_str())
        .with_status(200)
        .with_body(json!({"data": [{"id": "c1", "name": "EKS"}]}).to_string())
        .create_async()
        .await;
    server
        .mock("GET", api("manifests/gone").as_str())
        .with_status(200)
        .with_body(json!({"data": []}).to_string())
        .create_async()
        .await;

    let client = token_client(&server).await;

    let found = client.catalogs().get("c1").await.unwrap();
    assert_eq!(found.name, "EKS");

    let err = client.catalogs().get("gone").await.unwrap_err();
    assert!(matches!(err, ClientError::NotFound(_)));
}

#[tokio::test]
async fn test_empty_ids_are_rejected_before_sending() {
    let mut server = Server::new_async().await;
    let any = server
        .mock("GET", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let client = token_client(&server).await;

    match client.catalogs().get("").await.unwrap_err() {
        ClientError::InvalidRequest(msg) => assert_eq!(msg, "catalog ID is required"),
        other => panic!("expected InvalidRequest, got {:?}", other),
    }
    assert!(matches!(
        client.users().get("  ").await,
        Err(ClientError::InvalidRequest(_))
    ));
    assert!(matches!(
        client.operations().get("").await,
        Err(ClientError::InvalidRequest(_))
    ));
    for id in [".", ".."] {
        assert!(matches!(
            client.users().get(id).await,
            Err(ClientError::InvalidRequest(_))
        ));
        assert!(matches!(
            client.repository().get(id).await,
            Err(ClientError::InvalidRequest(_))
        ));
    }

    any.assert_async().await;
}

// ==================================================================================================
// Roles, local admin and the remaining resources
// ==================================================================================================

#[tokio::test]
async fn test_check_auth() {
    let mut server = Server::new_async().await;
    let ok = server
        .mock("GET", api("roles/auth").as_str())
        .match_header("authorization", "Bearer test-token")
        .with_status(200)
        .with_body("{}")
        .create_async()
        .await;

    let client = token_client(&server).await;
    assert!(client.roles().check_auth().await.unwrap());
    ok.assert_async().await;
    ok.remove_async().await;

    server
        .mock("GET", api("roles/auth").as_str())
        .with_status(401)
        .with_body(r#"{"message":"Unauthorized"}"#)
        .create_async()
        .await;
    assert!(!client.roles().check_auth().await.unwrap());
}

#[tokio::test]
async fn test_check_auth_surfaces_server_errors() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", api("roles/auth").as_str())
        .with_status(500)
        .with_body("boom")
        .create_async()
        .await;

    let client = token_client(&server).await;
    let err = client.roles().check_auth().await.unwrap_err();
    assert!(matches!(err, ClientError::Api { status: 500, .. }));
}

#[tokio::test]
async fn test_auth_local_update() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("PUT", api("authLocal/root").as_str())
        .match_body(Matcher::PartialJson(json!({
            "username": "root",
            "password": "new-secret"
        })))
        .with_status(200)
        .with_body(json!({"data": {"id": "root", "username": "root"}}).to_string())
        .create_async()
        .await;

    let client = token_client(&server).await;
    let admin = LocalAdmin {
        username: "root".to_string(),
        password: Some("new-secret".to_string()),
        ..Default::default()
    };

    let updated = client.auth_local().update("root", &admin).await.unwrap();
    assert_eq!(updated.username, "root");
    assert!(updated.password.is_none());
    mock.assert_async().await;
}

#[tokio::test]
async fn test_remaining_resources() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", api("operations").as_str())
        .match_query(Matcher::UrlEncoded("limit".into(), "5".into()))
        .with_status(200)
        .with_body(json!({"data": [{"id": "op1", "name": "deploy"}]}).to_string())
        .create_async()
        .await;
    server
        .mock("GET", api("repository/r1").as_str())
        .with_status(200)
        .with_body(json!({"data": {"id": "r1", "name": "infra"}}).to_string())
        .create_async()
        .await;
    server
        .mock("GET", api("mlDataset").as_str())
        .with_status(200)
        .with_body(json!({"data": [{"id": "d1", "name": "images"}]}).to_string())
        .create_async()
        .await;

    let client = token_client(&server).await;

    let ops = client
        .operations()
        .list(&OperationListOptions {
            page: PageOptions {
                limit: Some(5),
                ..Default::default()
            },
        })
        .await
        .unwrap();
    assert_eq!(ops.len(), 1);

    let repo = client.repository().get("r1").await.unwrap();
    assert_eq!(repo.id.unwrap().as_str(), "r1");

    let datasets = client.ml_dataset().list().await.unwrap();
    assert_eq!(datasets.len(), 1);
}
