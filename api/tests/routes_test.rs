// ABOUTME: Integration tests for the HTTP routes driven through tower's oneshot
// ABOUTME: Proofs are signed with fixed keys against the current clock

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use nostr_file_api::{api_routes, AppState, FileStore, MemoryFileStore};
use nostr_file_core::nip98::{encode_header, sign_proof};
use nostr_file_core::signature::public_key_from_secret;
use nostr_file_core::{
    encode_npub, AuthorizationConfig, AuthorizationDirectory, IdentityError, NameResolver,
    ServerConfig,
};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

const HOST: &str = "http://files.example.com";

struct NoResolver;

#[async_trait]
impl NameResolver for NoResolver {
    async fn resolve(&self, username: &str) -> Result<String, IdentityError> {
        Err(IdentityError::NotFound(username.to_string()))
    }
}

fn admin_key() -> String {
    "01".repeat(32)
}

fn writer_key() -> String {
    "02".repeat(32)
}

fn stranger_key() -> String {
    "03".repeat(32)
}

fn now() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64
}

struct TestApp {
    router: Router,
    store: Arc<MemoryFileStore>,
}

async fn setup(auth_enabled: bool) -> TestApp {
    let config = ServerConfig {
        authorization: AuthorizationConfig {
            enabled: auth_enabled,
            allowed_users: vec![
                encode_npub(&public_key_from_secret(&writer_key()).unwrap()).unwrap(),
            ],
            admin_users: vec![public_key_from_secret(&admin_key()).unwrap()],
            ..AuthorizationConfig::default()
        },
        ..ServerConfig::default()
    };

    let directory = Arc::new(AuthorizationDirectory::new(
        &config.authorization,
        Arc::new(NoResolver),
    ));
    directory.initialize().await;

    let store = Arc::new(MemoryFileStore::new());
    let state = Arc::new(AppState::new(&config, directory, store.clone()));

    TestApp {
        router: api_routes(state),
        store,
    }
}

fn request(method: &str, path: &str, key: Option<&str>, body: Body) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(path);
    if let Some(key) = key {
        let event = sign_proof(key, &format!("{}{}", HOST, path), method, now()).unwrap();
        builder = builder.header(header::AUTHORIZATION, encode_header(&event).unwrap());
    }
    builder.body(body).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health_is_public() {
    let app = setup(true).await;
    let response = app
        .router
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_authorized_upload_then_public_read() {
    let app = setup(true).await;

    let response = app
        .router
        .clone()
        .oneshot(request("PUT", "/files/notes/a.txt", Some(&writer_key()), Body::from("hello")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .router
        .oneshot(request("GET", "/files/notes/a.txt", None, Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"hello");
}

#[tokio::test]
async fn test_missing_file_is_404() {
    let app = setup(true).await;
    let response = app
        .router
        .oneshot(request("GET", "/files/nope.txt", None, Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_upload_without_proof_is_401_with_generic_body() {
    let app = setup(true).await;
    let response = app
        .router
        .oneshot(request("PUT", "/files/a.txt", None, Body::from("x")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"], "Authentication required");
}

#[tokio::test]
async fn test_expired_proof_is_401() {
    let app = setup(true).await;
    let event = sign_proof(&writer_key(), &format!("{}/files/a.txt", HOST), "PUT", now() - 120)
        .unwrap();
    let req = Request::put("/files/a.txt")
        .header(header::AUTHORIZATION, encode_header(&event).unwrap())
        .body(Body::from("x"))
        .unwrap();

    let response = app.router.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"], "Authentication required");
}

#[tokio::test]
async fn test_proof_for_other_request_is_401() {
    let app = setup(true).await;

    // Signed for a different path
    let event = sign_proof(&writer_key(), &format!("{}/files/b.txt", HOST), "PUT", now()).unwrap();
    let req = Request::put("/files/a.txt")
        .header(header::AUTHORIZATION, encode_header(&event).unwrap())
        .body(Body::from("x"))
        .unwrap();
    let response = app.router.clone().oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // Signed for a different method
    let event = sign_proof(&writer_key(), &format!("{}/files/a.txt", HOST), "GET", now()).unwrap();
    let req = Request::put("/files/a.txt")
        .header(header::AUTHORIZATION, encode_header(&event).unwrap())
        .body(Body::from("x"))
        .unwrap();
    let response = app.router.oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_unlisted_caller_is_403() {
    let app = setup(true).await;
    let response = app
        .router
        .oneshot(request("PUT", "/files/a.txt", Some(&stranger_key()), Body::from("x")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(app.store.get("a.txt").await.unwrap().is_none());
}

#[tokio::test]
async fn test_admin_may_upload() {
    let app = setup(true).await;
    let response = app
        .router
        .oneshot(request("PUT", "/files/a.txt", Some(&admin_key()), Body::from("x")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_delete_requires_admin() {
    let app = setup(true).await;
    app.store.put("a.txt", b"x".to_vec()).await.unwrap();

    let response = app
        .router
        .clone()
        .oneshot(request("DELETE", "/files/a.txt", Some(&writer_key()), Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .router
        .clone()
        .oneshot(request("DELETE", "/files/a.txt", Some(&admin_key()), Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(app.store.get("a.txt").await.unwrap().is_none());

    let response = app
        .router
        .oneshot(request("DELETE", "/files/a.txt", Some(&admin_key()), Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_directory_listing() {
    let app = setup(true).await;

    let response = app
        .router
        .clone()
        .oneshot(request("GET", "/admin/directory", Some(&writer_key()), Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .router
        .oneshot(request("GET", "/admin/directory", Some(&admin_key()), Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(
        json["authorized"][0],
        public_key_from_secret(&writer_key()).unwrap()
    );
    assert_eq!(json["admins"][0], public_key_from_secret(&admin_key()).unwrap());
}

#[tokio::test]
async fn test_whoami() {
    let app = setup(true).await;
    let pubkey = public_key_from_secret(&writer_key()).unwrap();

    let response = app
        .router
        .clone()
        .oneshot(request("GET", "/auth/whoami", Some(&writer_key()), Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["pubkey"], pubkey);
    assert_eq!(json["npub"], encode_npub(&pubkey).unwrap());
    assert_eq!(json["authorized"], true);
    assert_eq!(json["admin"], false);

    let response = app
        .router
        .oneshot(request("GET", "/auth/whoami", None, Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_auth_disabled_opens_write_routes() {
    let app = setup(false).await;

    let response = app
        .router
        .clone()
        .oneshot(request("PUT", "/files/a.txt", None, Body::from("x")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .router
        .clone()
        .oneshot(request("DELETE", "/files/a.txt", None, Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    // Identity still needs a proof
    let response = app
        .router
        .oneshot(request("GET", "/auth/whoami", None, Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_path_traversal_is_rejected() {
    let app = setup(false).await;
    let response = app
        .router
        .oneshot(request("PUT", "/files/a/../../etc/passwd", None, Body::from("x")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
