#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, Response, StatusCode},
};
use chrono::Utc;
use cv_backend::config::AppConfig;
use cv_backend::entities::users;
use cv_backend::infrastructure::{database, storage};
use cv_backend::{AppState, create_app};
use http_body_util::BodyExt;
use image::{DynamicImage, ImageOutputFormat, RgbImage};
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, Set};
use serde_json::Value;
use std::io::Cursor;
use std::path::PathBuf;
use tempfile::TempDir;
use tower::ServiceExt;

pub struct TestApp {
    pub app: Router,
    pub db: DatabaseConnection,
    pub public_dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(AppConfig::development()).await
    }

    /// `config.public_dir` is replaced by a fresh temp dir
    pub async fn with_config(config: AppConfig) -> Self {
        let public_dir = tempfile::tempdir().unwrap();

        // One connection: every sqlite::memory: connection is its own database
        let mut opt = ConnectOptions::new("sqlite::memory:");
        opt.max_connections(1).min_connections(1).sqlx_logging(false);
        let db = Database::connect(opt).await.unwrap();
        database::run_migrations(&db).await.unwrap();

        let storage = storage::setup_storage(public_dir.path()).await.unwrap();

        let config = AppConfig {
            public_dir: public_dir.path().to_path_buf(),
            ..config
        };
        let state = AppState::new(db.clone(), storage, config);

        Self {
            app: create_app(state),
            db,
            public_dir,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.app.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        let response = self
            .send(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await;
        read_json(response).await
    }

    pub async fn delete(&self, uri: &str) -> (StatusCode, Value) {
        let response = self
            .send(
                Request::builder()
                    .method("DELETE")
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;
        read_json(response).await
    }

    pub async fn post_form(&self, uri: &str, form: MultipartBody) -> (StatusCode, Value) {
        let response = self.send(form.into_request(uri)).await;
        read_json(response).await
    }

    pub async fn post_json(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        let response = self
            .send(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("Content-Type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await;
        read_json(response).await
    }

    pub async fn create_user(&self, username: &str) -> i32 {
        let now = Utc::now();
        users::ActiveModel {
            username: Set(username.to_string()),
            email: Set(format!("{}@example.com", username)),
            name: Set(username.to_string()),
            password_hash: Set("not-a-real-hash".to_string()),
            status: Set("active".to_string()),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&self.db)
        .await
        .unwrap()
        .id
    }

    /// Path of a stored image under the public directory
    pub fn image_path(&self, base_url: &str, filename: &str) -> PathBuf {
        self.public_dir.path().join(base_url).join(filename)
    }

    pub fn stored_files(&self, base_url: &str) -> Vec<String> {
        let dir = self.public_dir.path().join(base_url);
        let Ok(entries) = std::fs::read_dir(dir) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }
}

pub async fn read_json(response: Response<Body>) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    encode(width, height, ImageOutputFormat::Png)
}

pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    encode(width, height, ImageOutputFormat::Jpeg(90))
}

fn encode(width: u32, height: u32, format: ImageOutputFormat) -> Vec<u8> {
    let img = DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    }));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, format).unwrap();
    out.into_inner()
}

pub fn image_dimensions(path: &std::path::Path) -> (u32, u32) {
    let img = image::open(path).unwrap();
    (img.width(), img.height())
}

/// Hand-built multipart/form-data body
pub struct MultipartBody {
    boundary: String,
    body: Vec<u8>,
}

impl MultipartBody {
    pub fn new() -> Self {
        Self {
            boundary: "----cv-backend-test-boundary".to_string(),
            body: Vec::new(),
        }
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                self.boundary, name, value
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, filename: &str, content_type: &str, data: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                self.boundary, name, filename, content_type
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(data);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn into_request(mut self, uri: &str) -> Request<Body> {
        self.body
            .extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                "Content-Type",
                format!("multipart/form-data; boundary={}", self.boundary),
            )
            .body(Body::from(self.body))
            .unwrap()
    }
}
