//! Test utilities shared by the integration suites.
//!
//! Each test gets its own in-memory SQLite database with migrations applied
//! and its own temporary upload directory.

#![allow(dead_code)]

use std::sync::LazyLock;

use anyhow::Result;
use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use estate_api::{
    auth::hash_password,
    config::AppConfig,
    db,
    models::{PropertyStatus, PropertyType, Role, user},
    repositories::{
        PropertyRepository, UserRepository,
        property::{PropertyDetails, PropertyInput},
        user::NewUser,
    },
    server::{AppState, create_app},
};
use sea_orm::DatabaseConnection;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

pub const TEST_PASSWORD: &str = "password123";
pub const BOUNDARY: &str = "estate-test-boundary";
pub const TEST_JWT_SECRET: &str = "integration-test-secret-with-enough-bytes";

/// Hashing is slow in debug builds, so fixtures share one hash.
static TEST_PASSWORD_HASH: LazyLock<String> =
    LazyLock::new(|| hash_password(TEST_PASSWORD).expect("hash test password"));

pub fn test_config(upload_dir: &std::path::Path) -> AppConfig {
    AppConfig {
        profile: "test".to_string(),
        database_url: "sqlite::memory:".to_string(),
        jwt_secret: Some(TEST_JWT_SECRET.to_string()),
        upload_dir: upload_dir.to_path_buf(),
        max_image_bytes: 64 * 1024,
        ..Default::default()
    }
}

/// Sets up an in-memory SQLite database with all migrations applied.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let config = test_config(std::path::Path::new("unused"));
    let db = db::init_pool(&config).await?;
    db::run_migrations(&db).await?;
    Ok(db)
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub upload_dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        let upload_dir = TempDir::new().expect("create upload dir");
        let config = test_config(upload_dir.path());
        let db = db::init_pool(&config).await.expect("connect test database");
        db::run_migrations(&db).await.expect("apply migrations");

        let state = AppState::new(config, db).expect("build app state");
        let router = create_app(state.clone());

        Self {
            router,
            state,
            upload_dir,
        }
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.state.db
    }

    /// Inserts a user directly and returns it with a valid bearer token.
    pub async fn create_user(&self, name: &str, email: &str, role: Role) -> (user::Model, String) {
        let user = UserRepository::new(self.db())
            .create(NewUser {
                name: name.to_string(),
                email: email.to_string(),
                password_hash: TEST_PASSWORD_HASH.clone(),
                phone: Some("+1 555 0100".to_string()),
                role,
            })
            .await
            .expect("create user");
        let token = self.token_for(&user);
        (user, token)
    }

    pub fn token_for(&self, user: &user::Model) -> String {
        self.state.jwt.issue(user.id, user.role).expect("issue token")
    }

    pub async fn create_property(&self, owner_id: Uuid, input: PropertyInput) -> PropertyDetails {
        PropertyRepository::new(self.db())
            .create(owner_id, input, &[])
            .await
            .expect("create property")
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, body)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(json_request(Method::GET, uri, token, None)).await
    }

    pub async fn post_json(
        &self,
        uri: &str,
        token: Option<&str>,
        body: Value,
    ) -> (StatusCode, Value) {
        self.send(json_request(Method::POST, uri, token, Some(body)))
            .await
    }

    pub async fn put_json(
        &self,
        uri: &str,
        token: Option<&str>,
        body: Value,
    ) -> (StatusCode, Value) {
        self.send(json_request(Method::PUT, uri, token, Some(body)))
            .await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(json_request(Method::DELETE, uri, token, None))
            .await
    }

    /// Number of files currently in the upload directory.
    pub fn stored_files(&self) -> usize {
        std::fs::read_dir(self.upload_dir.path())
            .map(|entries| entries.count())
            .unwrap_or(0)
    }
}

pub fn json_request(
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("valid request"),
        None => builder.body(Body::empty()).expect("valid request"),
    }
}

pub fn sample_input(title: &str, city: &str, price: f64) -> PropertyInput {
    PropertyInput {
        title: title.to_string(),
        description: "A bright listing with plenty of natural light.".to_string(),
        price,
        address: "12 Elm Street".to_string(),
        city: city.to_string(),
        state: "IL".to_string(),
        zip_code: "62701".to_string(),
        country: "USA".to_string(),
        latitude: None,
        longitude: None,
        bedrooms: 3,
        bathrooms: 2,
        area: 120.0,
        year_built: Some(2001),
        property_type: PropertyType::House,
        status: PropertyStatus::Active,
        features: Vec::new(),
        tour_3d: None,
    }
}

/// A single multipart part.
pub enum Part<'a> {
    Text(&'a str, &'a str),
    File {
        name: &'a str,
        file_name: &'a str,
        content_type: &'a str,
        bytes: &'a [u8],
    },
}

pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File {
                name,
                file_name,
                content_type,
                bytes,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub fn multipart_request(
    method: Method,
    uri: &str,
    token: &str,
    parts: &[Part<'_>],
) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(parts)))
        .expect("valid request")
}

/// Text parts for a complete, valid property form.
pub fn valid_form_fields() -> Vec<Part<'static>> {
    vec![
        Part::Text("title", "Sunny family home"),
        Part::Text("description", "Three bedrooms close to parks and schools."),
        Part::Text("price", "350000"),
        Part::Text("address", "12 Elm Street"),
        Part::Text("city", "Springfield"),
        Part::Text("state", "IL"),
        Part::Text("zipCode", "62701"),
        Part::Text("country", "USA"),
        Part::Text("bedrooms", "3"),
        Part::Text("bathrooms", "2"),
        Part::Text("area", "180"),
        Part::Text("propertyType", "HOUSE"),
    ]
}
