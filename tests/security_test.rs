use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use jsonwebtoken::{EncodingKey, Header, encode};
use rust_video_backend::config::AppConfig;
use rust_video_backend::entities::{prelude::*, *};
use rust_video_backend::infrastructure::database;
use rust_video_backend::services::media::{MediaToolError, MediaToolRunner, ProbeResult};
use rust_video_backend::services::storage::StorageService;
use rust_video_backend::services::upload::VideoUploadService;
use rust_video_backend::utils::auth::{Claims, create_jwt};
use rust_video_backend::{AppState, create_app};
use sea_orm::{ColumnTrait, Database, EntityTrait, ModelTrait, QueryFilter};
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

const JWT_SECRET: &str = "test_secret_for_security_tests";
const BOUNDARY: &str = "---------------------------123456789012345678901234567";

struct MockStorageService {
    files: Mutex<HashMap<String, Vec<u8>>>,
}

#[async_trait]
impl StorageService for MockStorageService {
    async fn put_object_from_path(
        &self,
        key: &str,
        path: &Path,
        _content_type: &str,
    ) -> anyhow::Result<()> {
        let data = tokio::fs::read(path).await?;
        self.files.lock().unwrap().insert(key.to_string(), data);
        Ok(())
    }

    async fn file_exists(&self, key: &str) -> anyhow::Result<bool> {
        Ok(self.files.lock().unwrap().contains_key(key))
    }
}

struct PassthroughToolRunner;

#[async_trait]
impl MediaToolRunner for PassthroughToolRunner {
    async fn probe(&self, _path: &Path) -> Result<ProbeResult, MediaToolError> {
        Ok(ProbeResult {
            width: 1920,
            height: 1080,
        })
    }

    async fn remux_faststart(&self, path: &Path) -> Result<PathBuf, MediaToolError> {
        let mut os = path.as_os_str().to_owned();
        os.push(".processing");
        let out = PathBuf::from(os);
        tokio::fs::copy(path, &out).await?;
        Ok(out)
    }

    async fn health_check(&self) -> bool {
        true
    }
}

struct TestApp {
    app: axum::Router,
    db: sea_orm::DatabaseConnection,
    storage: Arc<MockStorageService>,
    _assets_dir: tempfile::TempDir,
}

async fn setup_app() -> TestApp {
    let _ = tracing_subscriber::fmt::try_init();
    unsafe { std::env::set_var("DATABASE_URL", "sqlite::memory:") };
    let db = Database::connect("sqlite::memory:").await.unwrap();
    database::run_migrations(&db).await.unwrap();

    let storage = Arc::new(MockStorageService {
        files: Mutex::new(HashMap::new()),
    });
    let storage_service: Arc<dyn StorageService> = storage.clone();
    let tools: Arc<dyn MediaToolRunner> = Arc::new(PassthroughToolRunner);

    let assets_dir = tempfile::tempdir().unwrap();
    let mut config = AppConfig::development();
    config.assets_root = assets_dir.path().to_str().unwrap().to_string();
    config.jwt_secret = JWT_SECRET.to_string();

    let upload_service = Arc::new(VideoUploadService::new(
        db.clone(),
        storage_service.clone(),
        tools,
        config.clone(),
    ));

    let state = AppState {
        db: db.clone(),
        storage: storage_service,
        upload_service,
        config,
    };

    TestApp {
        app: create_app(state),
        db,
        storage,
        _assets_dir: assets_dir,
    }
}

async fn register_and_login(app: &axum::Router, email: &str) -> String {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/users")
                .header("Content-Type", "application/json")
                .body(Body::from(format!(
                    r#"{{"email": "{}", "password": "password123"}}"#,
                    email
                )))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/login")
                .header("Content-Type", "application/json")
                .body(Body::from(format!(
                    r#"{{"email": "{}", "password": "password123"}}"#,
                    email
                )))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&body).unwrap();
    json["token"].as_str().unwrap().to_string()
}

async fn create_video(app: &axum::Router, token: &str, title: &str) -> String {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/videos")
                .header("Authorization", format!("Bearer {}", token))
                .header("Content-Type", "application/json")
                .body(Body::from(format!(r#"{{"title": "{}"}}"#, title)))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&body).unwrap();
    json["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_requests_without_token_rejected() {
    let ctx = setup_app().await;

    let response = ctx
        .app
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/videos")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = ctx
        .app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/videos/some-id/media")
                .header(
                    "Content-Type",
                    format!("multipart/form-data; boundary={}", BOUNDARY),
                )
                .body(Body::from(format!("--{}--\r\n", BOUNDARY)))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_forged_and_expired_tokens_rejected() {
    let ctx = setup_app().await;
    register_and_login(&ctx.app, "victim@example.com").await;

    let user = Users::find()
        .filter(users::Column::Email.eq("victim@example.com"))
        .one(&ctx.db)
        .await
        .unwrap()
        .unwrap();

    // Signed with a different secret
    let forged = create_jwt(&user.id, "not_the_real_secret").unwrap();

    // Signed with the right secret but already expired
    let expired_claims = Claims {
        sub: user.id.clone(),
        exp: (chrono::Utc::now().timestamp() - 3600) as usize,
        jti: uuid::Uuid::new_v4().to_string(),
    };
    let expired = encode(
        &Header::default(),
        &expired_claims,
        &EncodingKey::from_secret(JWT_SECRET.as_ref()),
    )
    .unwrap();

    for token in ["garbage-token".to_string(), forged, expired] {
        let response = ctx
            .app
            .clone()
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri("/api/videos")
                    .header("Authorization", format!("Bearer {}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}

#[tokio::test]
async fn test_token_for_deleted_user_rejected() {
    let ctx = setup_app().await;
    let token = register_and_login(&ctx.app, "ghost@example.com").await;

    let user = Users::find()
        .filter(users::Column::Email.eq("ghost@example.com"))
        .one(&ctx.db)
        .await
        .unwrap()
        .unwrap();
    user.delete(&ctx.db).await.unwrap();

    // The token is still validly signed but the account no longer exists
    let response = ctx
        .app
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/videos")
                .header("Authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_cannot_touch_another_users_video() {
    let ctx = setup_app().await;
    let owner_token = register_and_login(&ctx.app, "owner@example.com").await;
    let intruder_token = register_and_login(&ctx.app, "intruder@example.com").await;
    let video_id = create_video(&ctx.app, &owner_token, "Private video").await;

    // Read
    let response = ctx
        .app
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(format!("/api/videos/{}", video_id))
                .header("Authorization", format!("Bearer {}", intruder_token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Delete
    let response = ctx
        .app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/videos/{}", video_id))
                .header("Authorization", format!("Bearer {}", intruder_token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Media upload is refused before the body is processed
    let multipart = format!(
        "--{boundary}\r\n\
        Content-Disposition: form-data; name=\"video\"; filename=\"intrusion.mp4\"\r\n\
        Content-Type: video/mp4\r\n\r\n\
        payload\r\n\
        --{boundary}--\r\n",
        boundary = BOUNDARY,
    );
    let response = ctx
        .app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/api/videos/{}/media", video_id))
                .header("Authorization", format!("Bearer {}", intruder_token))
                .header(
                    "Content-Type",
                    format!("multipart/form-data; boundary={}", BOUNDARY),
                )
                .body(Body::from(multipart))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(ctx.storage.files.lock().unwrap().is_empty());

    // The record is untouched and still visible to its owner
    let response = ctx
        .app
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(format!("/api/videos/{}", video_id))
                .header("Authorization", format!("Bearer {}", owner_token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["video_url"], Value::Null);
}

#[tokio::test]
async fn test_unknown_video_returns_404() {
    let ctx = setup_app().await;
    let token = register_and_login(&ctx.app, "nobody@example.com").await;

    let response = ctx
        .app
        .clone()
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(format!("/api/videos/{}", uuid::Uuid::new_v4()))
                .header("Authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_weak_registration_payloads_rejected() {
    let ctx = setup_app().await;

    // Short password
    let response = ctx
        .app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/users")
                .header("Content-Type", "application/json")
                .body(Body::from(
                    r#"{"email": "weak@example.com", "password": "short"}"#,
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Not an email address
    let response = ctx
        .app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/users")
                .header("Content-Type", "application/json")
                .body(Body::from(
                    r#"{"email": "not-an-email", "password": "password123"}"#,
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Duplicate registration
    let good = r#"{"email": "dupe@example.com", "password": "password123"}"#;
    let response = ctx
        .app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/users")
                .header("Content-Type", "application/json")
                .body(Body::from(good))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = ctx
        .app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/users")
                .header("Content-Type", "application/json")
                .body(Body::from(good))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_wrong_password_rejected() {
    let ctx = setup_app().await;
    register_and_login(&ctx.app, "locked@example.com").await;

    let response = ctx
        .app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/login")
                .header("Content-Type", "application/json")
                .body(Body::from(
                    r#"{"email": "locked@example.com", "password": "wrong-password"}"#,
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
