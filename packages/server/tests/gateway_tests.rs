//! End-to-end gateway tests driving the router in process.

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use base64::Engine as _;
use pagewright_server::rotate::{ImageCrateRotator, ImageRotator};
use pagewright_server::server::{router, AppState, MAX_BODY_BYTES};
use pagewright_server::GatewayError;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

struct CountingRotator {
    calls: AtomicUsize,
}

impl CountingRotator {
    fn new() -> Arc<Self> {
        Arc::new(CountingRotator {
            calls: AtomicUsize::new(0),
        })
    }
}

impl ImageRotator for CountingRotator {
    fn rotate(&self, _file: &Path, _degrees: i32) -> Result<(), GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn app_with(rotator: Arc<dyn ImageRotator>) -> (Router, TempDir) {
    let root = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(root.path().join("data")).unwrap();
    let state = AppState {
        root: root.path().to_path_buf(),
        data_file: root.path().join("data/site.json"),
        rotator,
    };
    (router(state), root)
}

fn app() -> (Router, TempDir) {
    app_with(CountingRotator::new())
}

fn post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn save_markup_writes_the_page_file() {
    let (app, root) = app();
    std::fs::create_dir_all(root.path().join("days/day1")).unwrap();

    let response = app
        .oneshot(post(
            "/api/save-markup",
            json!({ "path": "/days/day1/index.html", "html": "<!DOCTYPE html>\n<html></html>" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["ok"], json!(true));
    let saved = std::fs::read_to_string(root.path().join("days/day1/index.html")).unwrap();
    assert!(saved.starts_with("<!DOCTYPE html>"));
}

#[tokio::test]
async fn upload_filename_with_separators_is_forbidden() {
    let (app, root) = app();
    let encoded = base64::engine::general_purpose::STANDARD.encode(b"img");

    let response = app
        .oneshot(post(
            "/api/upload-image",
            json!({ "dir": "photos", "filename": "../escape.jpg", "base64": encoded }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await["ok"], json!(false));
    // nothing was written anywhere under or beside the root
    assert!(!root.path().join("escape.jpg").exists());
    assert!(!root.path().parent().unwrap().join("escape.jpg").exists());
}

#[tokio::test]
async fn parent_segments_in_page_paths_are_forbidden() {
    let (app, root) = app();

    let response = app
        .oneshot(post(
            "/api/save-markup",
            json!({ "path": "../../outside.html", "html": "<html></html>" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await["ok"], json!(false));
    assert!(!root.path().join("outside.html").exists());
    assert!(!root.path().parent().unwrap().join("outside.html").exists());
}

#[tokio::test]
async fn patch_data_preserves_unrelated_keys() {
    let (app, root) = app();
    std::fs::write(
        root.path().join("data/site.json"),
        r#"{ "site": { "title": "T", "lang": "en" }, "days": [{ "title": "a" }] }"#,
    )
    .unwrap();

    let response = app
        .oneshot(post(
            "/api/patch-data",
            json!({ "changes": { "days.0.title": "<em>A</em>" } }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let doc: Value =
        serde_json::from_str(&std::fs::read_to_string(root.path().join("data/site.json")).unwrap())
            .unwrap();
    assert_eq!(doc["days"][0]["title"], json!("<em>A</em>"));
    assert_eq!(doc["site"]["lang"], json!("en"));
}

#[tokio::test]
async fn upload_returns_the_stored_path() {
    let (app, root) = app();
    let encoded = base64::engine::general_purpose::STANDARD.encode(b"jpeg bytes");

    let response = app
        .oneshot(post(
            "/api/upload-image",
            json!({ "dir": "days/day1/photos", "filename": "shore_42.jpg", "base64": encoded }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["ok"], json!(true));
    assert_eq!(body["path"], json!("/days/day1/photos/shore_42.jpg"));
    assert_eq!(
        std::fs::read(root.path().join("days/day1/photos/shore_42.jpg")).unwrap(),
        b"jpeg bytes"
    );
}

#[tokio::test]
async fn bad_rotation_angle_never_reaches_the_rotator() {
    let rotator = CountingRotator::new();
    let (app, _root) = app_with(rotator.clone());

    let response = app
        .oneshot(post(
            "/api/rotate-image",
            json!({ "path": "photos/absent.jpg", "degrees": 45 }),
        ))
        .await
        .unwrap();

    // rejected for the angle, not for the missing file
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(rotator.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn rotation_path_with_parent_segments_is_forbidden() {
    let rotator = CountingRotator::new();
    let (app, root) = app_with(rotator.clone());
    std::fs::create_dir_all(root.path().join("photos")).unwrap();

    let response = app
        .oneshot(post(
            "/api/rotate-image",
            json!({ "path": "../../etc/x.jpg", "degrees": 90 }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await["ok"], json!(false));
    assert_eq!(rotator.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn rotating_a_missing_file_is_not_found() {
    let rotator = CountingRotator::new();
    let (app, _root) = app_with(rotator.clone());

    let response = app
        .oneshot(post(
            "/api/rotate-image",
            json!({ "path": "photos/absent.jpg", "degrees": 90 }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(rotator.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn rotation_turns_the_stored_image() {
    let (app, root) = app_with(Arc::new(ImageCrateRotator));
    std::fs::create_dir_all(root.path().join("photos")).unwrap();
    let file = root.path().join("photos/wide.jpg");
    let buf: image::ImageBuffer<image::Rgb<u8>, _> =
        image::ImageBuffer::from_pixel(40, 20, image::Rgb([10, 20, 30]));
    buf.save(&file).unwrap();

    let response = app
        .oneshot(post(
            "/api/rotate-image",
            json!({ "path": "/photos/wide.jpg", "degrees": 90 }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let turned = image::open(&file).unwrap();
    assert_eq!((turned.width(), turned.height()), (20, 40));
}

#[tokio::test]
async fn oversized_bodies_are_rejected_before_any_write() {
    let (app, root) = app();
    let request = Request::builder()
        .method("POST")
        .uri("/api/save-markup")
        .header("content-type", "application/json")
        .header("content-length", (MAX_BODY_BYTES + 1).to_string())
        .body(Body::from(vec![b' '; MAX_BODY_BYTES + 1]))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body_json(response).await["ok"], json!(false));
    assert!(!root.path().join("index.html").exists());
}

#[tokio::test]
async fn malformed_json_is_a_bad_request() {
    let (app, _root) = app();
    let request = Request::builder()
        .method("POST")
        .uri("/api/patch-data")
        .header("content-type", "application/json")
        .body(Body::from("{ not json"))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["ok"], json!(false));
}

#[tokio::test]
async fn static_pages_are_served_from_the_root() {
    let (app, root) = app();
    std::fs::create_dir_all(root.path().join("days/day1")).unwrap();
    std::fs::write(root.path().join("days/day1/index.html"), "<html>day one</html>").unwrap();

    let request = Request::builder()
        .uri("/days/day1/")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"<html>day one</html>");
}

#[tokio::test]
async fn missing_static_files_get_a_plain_404() {
    let (app, _root) = app();
    let request = Request::builder()
        .uri("/nowhere.html")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
