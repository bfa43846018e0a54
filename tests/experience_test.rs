mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::{MultipartBody, TestApp, image_dimensions, jpeg_bytes, png_bytes, read_json};
use cv_backend::config::AppConfig;

const DIR: &str = "images/cv/experience";

fn experience_form(users_id: i32) -> MultipartBody {
    MultipartBody::new()
        .text("users_id", &users_id.to_string())
        .text("company", "Acme Corp")
        .text("job", "Backend Engineer")
        .text("location", "Jakarta")
        .text("start_date", "2021-02-01")
        .text("description", "Built the billing service")
        .text("is_graduated", "1")
        .text("tags", r#"["rust", "postgres"]"#)
}

#[tokio::test]
async fn test_create_stores_image_under_fresh_uuid() {
    let app = TestApp::new().await;
    let user_id = app.create_user("janedoe01").await;

    let form = experience_form(user_id).file("image_company", "logo.PNG", "image/png", &png_bytes(640, 320));
    let (status, body) = app.post_form("/api/cv/experience", form).await;

    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["company"], "Acme Corp");
    assert_eq!(body["data"]["is_graduated"], true);
    assert_eq!(body["data"]["tags"], serde_json::json!(["rust", "postgres"]));

    let filename = body["data"]["image_company"].as_str().unwrap();
    let (stem, ext) = filename.rsplit_once('.').unwrap();
    assert_eq!(ext, "png");
    assert!(uuid::Uuid::parse_str(stem).is_ok());

    // Resized to the experience width, aspect ratio kept
    assert_eq!(image_dimensions(&app.image_path(DIR, filename)), (200, 100));
    assert_eq!(app.stored_files(DIR), vec![filename.to_string()]);
}

#[tokio::test]
async fn test_reupload_same_extension_keeps_name() {
    let app = TestApp::new().await;
    let user_id = app.create_user("janedoe01").await;

    let form = experience_form(user_id).file("image_company", "a.png", "image/png", &png_bytes(100, 100));
    let (_, created) = app.post_form("/api/cv/experience", form).await;
    let id = created["data"]["id"].as_str().unwrap().to_string();
    let filename = created["data"]["image_company"].as_str().unwrap().to_string();

    let form = experience_form(user_id)
        .text("id", &id)
        .text("company", "Acme Holdings")
        .file("image_company", "b.png", "image/png", &png_bytes(50, 80));
    let (status, updated) = app.post_form("/api/cv/experience", form).await;

    assert_eq!(status, StatusCode::OK, "{}", updated);
    assert_eq!(updated["data"]["id"], id.as_str());
    assert_eq!(updated["data"]["company"], "Acme Holdings");
    assert_eq!(updated["data"]["image_company"], filename.as_str());
    assert_eq!(image_dimensions(&app.image_path(DIR, &filename)), (50, 80));
    assert_eq!(app.stored_files(DIR), vec![filename]);
}

#[tokio::test]
async fn test_extension_change_replaces_old_file() {
    let app = TestApp::new().await;
    let user_id = app.create_user("janedoe01").await;

    let form = experience_form(user_id).file("image_company", "a.png", "image/png", &png_bytes(100, 100));
    let (_, created) = app.post_form("/api/cv/experience", form).await;
    let id = created["data"]["id"].as_str().unwrap().to_string();
    let old = created["data"]["image_company"].as_str().unwrap().to_string();

    let form = experience_form(user_id)
        .text("id", &id)
        .file("image_company", "b.jpg", "image/jpeg", &jpeg_bytes(100, 100));
    let (status, updated) = app.post_form("/api/cv/experience", form).await;
    assert_eq!(status, StatusCode::OK, "{}", updated);

    let new = updated["data"]["image_company"].as_str().unwrap().to_string();
    let (old_stem, _) = old.rsplit_once('.').unwrap();
    assert_eq!(new, format!("{}.jpg", old_stem));
    assert!(!app.image_path(DIR, &old).exists());
    assert_eq!(app.stored_files(DIR), vec![new.clone()]);

    let bytes = std::fs::read(app.image_path(DIR, &new)).unwrap();
    assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
}

#[tokio::test]
async fn test_update_without_file_keeps_image() {
    let app = TestApp::new().await;
    let user_id = app.create_user("janedoe01").await;

    let form = experience_form(user_id).file("image_company", "a.png", "image/png", &png_bytes(30, 30));
    let (_, created) = app.post_form("/api/cv/experience", form).await;
    let id = created["data"]["id"].as_str().unwrap().to_string();

    let form = experience_form(user_id).text("id", &id).text("job", "Staff Engineer");
    let (status, updated) = app.post_form("/api/cv/experience", form).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["data"]["job"], "Staff Engineer");
    assert_eq!(updated["data"]["image_company"], created["data"]["image_company"]);
}

#[tokio::test]
async fn test_unknown_id_creates_new_row() {
    let app = TestApp::new().await;
    let user_id = app.create_user("janedoe01").await;

    let form = experience_form(user_id).text("id", "does-not-exist");
    let (status, body) = app.post_form("/api/cv/experience", form).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Experience created");
    assert_ne!(body["data"]["id"], "does-not-exist");
}

#[tokio::test]
async fn test_missing_company_is_validation_error() {
    let app = TestApp::new().await;
    let user_id = app.create_user("janedoe01").await;

    let form = MultipartBody::new()
        .text("users_id", &user_id.to_string())
        .text("job", "Backend Engineer")
        .text("start_date", "2021-02-01")
        .text("description", "desc")
        .file("image_company", "a.png", "image/png", &png_bytes(10, 10));
    let (status, body) = app.post_form("/api/cv/experience", form).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["type"], "VALIDATION_ERROR");
    let fields: Vec<&str> = body["message"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["field"].as_str().unwrap())
        .collect();
    assert_eq!(fields, vec!["company"]);

    // Nothing reached the upload directory
    assert!(app.stored_files(DIR).is_empty());
}

#[tokio::test]
async fn test_malformed_date_is_validation_error() {
    let app = TestApp::new().await;
    let user_id = app.create_user("janedoe01").await;

    let form = experience_form(user_id).text("start_date", "last spring");
    let (status, body) = app.post_form("/api/cv/experience", form).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["type"], "VALIDATION_ERROR");
    assert_eq!(body["message"][0]["field"], "start_date");
    assert_eq!(body["message"][0]["type"], "date");
}

#[tokio::test]
async fn test_rejects_disallowed_uploads() {
    let app = TestApp::new().await;
    let user_id = app.create_user("janedoe01").await;

    let form = experience_form(user_id).file("image_company", "logo.gif", "image/gif", b"GIF89a....");
    let (status, body) = app.post_form("/api/cv/experience", form).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    // Right name, wrong content
    let form = experience_form(user_id).file("image_company", "logo.png", "image/png", b"plain text, not an image");
    let (status, _) = app.post_form("/api/cv/experience", form).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert!(app.stored_files(DIR).is_empty());
}

#[tokio::test]
async fn test_unknown_user_is_not_found() {
    let app = TestApp::new().await;

    let (status, body) = app.post_form("/api/cv/experience", experience_form(4242)).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_list_returns_urls_not_filenames() {
    let app = TestApp::new().await;
    let user_id = app.create_user("janedoe01").await;

    let form = experience_form(user_id)
        .text("start_date", "2019-01-01")
        .file("image_company", "a.png", "image/png", &png_bytes(10, 10));
    let (_, older) = app.post_form("/api/cv/experience", form).await;
    let form = experience_form(user_id).text("start_date", "2023-05-01");
    app.post_form("/api/cv/experience", form).await;

    let (status, body) = app.get(&format!("/api/cv/experience/{}", user_id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let rows = body["data"].as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["start_date"], "2023-05-01");
    assert!(rows[0]["image_company"].is_null());

    let filename = older["data"]["image_company"].as_str().unwrap();
    assert_eq!(
        rows[1]["image_company"],
        format!("http://localhost:3000/{}/{}", DIR, filename).as_str()
    );
}

#[tokio::test]
async fn test_delete_removes_file() {
    let app = TestApp::new().await;
    let user_id = app.create_user("janedoe01").await;

    let form = experience_form(user_id).file("image_company", "a.png", "image/png", &png_bytes(10, 10));
    let (_, created) = app.post_form("/api/cv/experience", form).await;
    let id = created["data"]["id"].as_str().unwrap();

    let (status, body) = app.delete(&format!("/api/cv/experience/{}", id)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], id);
    assert!(app.stored_files(DIR).is_empty());

    let (status, _) = app.delete(&format!("/api/cv/experience/{}", id)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_with_missing_file_succeeds() {
    let app = TestApp::new().await;
    let user_id = app.create_user("janedoe01").await;

    let form = experience_form(user_id).file("image_company", "a.png", "image/png", &png_bytes(10, 10));
    let (_, created) = app.post_form("/api/cv/experience", form).await;
    let id = created["data"]["id"].as_str().unwrap();
    let filename = created["data"]["image_company"].as_str().unwrap();
    std::fs::remove_file(app.image_path(DIR, filename)).unwrap();

    let (status, body) = app.delete(&format!("/api/cv/experience/{}", id)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
}

#[tokio::test]
async fn test_image_at_size_limit_is_rejected() {
    let app = TestApp::with_config(AppConfig {
        max_image_size_mb: 1,
        ..AppConfig::development()
    })
    .await;
    let user_id = app.create_user("janedoe01").await;

    // A PNG signature padded to exactly one megabyte
    let mut data = png_bytes(4, 4);
    data.resize(1024 * 1024, 0);
    let form = experience_form(user_id).file("image_company", "big.png", "image/png", &data);
    let (status, body) = app.post_form("/api/cv/experience", form).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["message"].as_str().unwrap().contains("below 1 MB"));
    assert!(app.stored_files(DIR).is_empty());

    let (_, list) = app.get(&format!("/api/cv/experience/{}", user_id)).await;
    assert!(list["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_malformed_requests_use_error_envelope() {
    let app = TestApp::new().await;

    let (status, body) = app.get("/api/cv/experience/abc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["message"].is_string());

    let response = app
        .send(
            Request::builder()
                .method("POST")
                .uri("/api/cv/experience")
                .header("Content-Type", "text/plain")
                .body(Body::from("company=Acme"))
                .unwrap(),
        )
        .await;
    let (status, body) = read_json(response).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["message"].is_string());
}
