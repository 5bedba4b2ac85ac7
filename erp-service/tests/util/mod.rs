//! Drives the real router over an in-memory store.

use std::path::PathBuf;
use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, Response, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use shared::permissions::{uniform_permissions, ADMIN_ROLE};
use tower::ServiceExt;
use uuid::Uuid;

use erp_service::api::{create_router, AppState};
use erp_service::auth::hash_password;
use erp_service::config::AppConfig;
use erp_service::models::{User, UserData};
use erp_service::sefaz::{SefazGateway, SimulatedSefaz};
use erp_service::store::{MemoryStore, Storage};

pub const ADMIN: &str = "admin";
pub const ADMIN_PASSWORD: &str = "admin123";
const ITERATIONS: u32 = 1_000;

pub struct TestApp {
    pub router: Router,
    pub store: Arc<dyn Storage>,
    pub uploads: PathBuf,
    pub admin: String,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_gateway(Arc::new(SimulatedSefaz::new())).await
    }

    /// Same app, talking to the given SEFAZ stand-in.
    pub async fn with_gateway(sefaz: Arc<dyn SefazGateway>) -> Self {
        let store: Arc<dyn Storage> = Arc::new(MemoryStore::new());
        store
            .create::<User>(UserData {
                username: ADMIN.into(),
                password: hash_password(ADMIN_PASSWORD, ITERATIONS),
                full_name: "Administrador".into(),
                email: "admin@custosmart.local".into(),
                role: ADMIN_ROLE.into(),
                active: true,
                status: None,
                status_message: None,
                permissions: uniform_permissions(true),
            })
            .await
            .unwrap();

        let uploads = std::env::temp_dir().join(format!("erp-service-tests-{}", Uuid::new_v4()));
        let config = AppConfig {
            jwt_secret: "test-secret".into(),
            token_ttl_hours: 1,
            password_iterations: ITERATIONS,
            uploads_dir: uploads.clone(),
            max_upload_bytes: AppConfig::MAX_UPLOAD_BYTES,
        };
        let state = AppState::new(Arc::clone(&store), config, sefaz);
        let mut app = TestApp {
            router: create_router(state),
            store,
            uploads,
            admin: String::new(),
        };
        app.admin = app.login(ADMIN, ADMIN_PASSWORD).await;
        app
    }

    pub async fn raw(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = match body {
            Some(value) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };
        read_json(self.raw(builder.body(body).unwrap()).await).await
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, Some(token), Some(body)).await
    }

    pub async fn patch(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::PATCH, uri, Some(token), Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::PUT, uri, Some(token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> StatusCode {
        self.send(Method::DELETE, uri, Some(token), None).await.0
    }

    pub async fn login(&self, username: &str, password: &str) -> String {
        let (status, body) = self
            .send(
                Method::POST,
                "/api/login",
                None,
                Some(json!({ "username": username, "password": password })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {body}");
        body["token"].as_str().unwrap().to_string()
    }

    /// Registers a plain user and grants `permissions`. Returns id and token.
    pub async fn user(&self, username: &str, permissions: Value) -> (i32, String) {
        let (status, body) = self
            .send(
                Method::POST,
                "/api/register",
                None,
                Some(json!({
                    "username": username,
                    "password": "secret123",
                    "fullName": format!("{username} da Silva"),
                    "email": format!("{username}@custosmart.local"),
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
        let id = body["user"]["id"].as_i64().unwrap() as i32;
        if !permissions.is_null() {
            let (status, body) = self
                .patch(
                    &format!("/api/users/{id}/permissions"),
                    &self.admin,
                    json!({ "permissions": permissions }),
                )
                .await;
            assert_eq!(status, StatusCode::OK, "permissions failed: {body}");
        }
        (id, body["token"].as_str().unwrap().to_string())
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.uploads);
    }
}

pub async fn read_json(response: Response<Body>) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, body)
}

pub fn id_of(body: &Value) -> i32 {
    body["id"].as_i64().unwrap() as i32
}
