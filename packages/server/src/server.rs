//! HTTP surface of the persistence gateway.
//!
//! Four JSON POST endpoints plus a static file fallback over the project
//! root. The editor client is the only intended caller, so the service binds
//! to loopback and CORS admits localhost origins only.

use crate::data;
use crate::errors::GatewayError;
use crate::rotate::{validate_degrees, ImageRotator};
use crate::store;
use axum::extract::rejection::JsonRejection;
use axum::extract::{ConnectInfo, DefaultBodyLimit, Request, State};
use axum::http::{HeaderValue, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::services::ServeDir;

pub const MAX_BODY_BYTES: usize = 20 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub root: PathBuf,
    pub data_file: PathBuf,
    pub rotator: Arc<dyn ImageRotator>,
}

#[derive(Deserialize)]
pub struct SaveMarkupBody {
    pub path: String,
    pub html: String,
}

#[derive(Deserialize)]
pub struct PatchDataBody {
    pub changes: BTreeMap<String, String>,
}

#[derive(Deserialize)]
pub struct UploadImageBody {
    pub dir: String,
    pub filename: String,
    pub base64: String,
}

#[derive(Deserialize)]
pub struct RotateImageBody {
    pub path: String,
    pub degrees: i32,
}

fn ok_body() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "ok": true }))
}

/// Body extraction failures keep the JSON envelope: over-cap bodies become
/// `OversizedBody`, everything else is a malformed request.
fn accept<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, GatewayError> {
    match payload {
        Ok(Json(body)) => Ok(body),
        Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
            Err(GatewayError::OversizedBody)
        }
        Err(rejection) => Err(GatewayError::MalformedRequest(rejection.body_text())),
    }
}

async fn save_markup(
    State(state): State<AppState>,
    payload: Result<Json<SaveMarkupBody>, JsonRejection>,
) -> Result<impl IntoResponse, GatewayError> {
    let body = accept(payload)?;
    store::write_markup(&state.root, &body.path, &body.html)?;
    Ok(ok_body())
}

async fn patch_data(
    State(state): State<AppState>,
    payload: Result<Json<PatchDataBody>, JsonRejection>,
) -> Result<impl IntoResponse, GatewayError> {
    let body = accept(payload)?;
    data::patch_file(&state.data_file, &body.changes)?;
    Ok(ok_body())
}

async fn upload_image(
    State(state): State<AppState>,
    payload: Result<Json<UploadImageBody>, JsonRejection>,
) -> Result<impl IntoResponse, GatewayError> {
    let body = accept(payload)?;
    let path = store::write_image(&state.root, &body.dir, &body.filename, &body.base64)?;
    Ok(Json(serde_json::json!({ "ok": true, "path": path })))
}

async fn rotate_image(
    State(state): State<AppState>,
    payload: Result<Json<RotateImageBody>, JsonRejection>,
) -> Result<impl IntoResponse, GatewayError> {
    let body = accept(payload)?;
    // angle first: a bad request never touches the filesystem
    let degrees = validate_degrees(body.degrees)?;

    let file = crate::paths::resolve_within_root(&state.root, &body.path)?;
    if !file.is_file() {
        return Err(GatewayError::NotFound(body.path));
    }

    let rotator = Arc::clone(&state.rotator);
    tokio::task::spawn_blocking(move || rotator.rotate(&file, degrees))
        .await
        .map_err(|e| GatewayError::RotationTool(e.to_string()))??;
    Ok(ok_body())
}

/// Reject connections from anything other than the local machine. In-process
/// callers (tests driving the router directly) carry no peer address and are
/// let through.
async fn require_loopback(request: Request, next: Next) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());
    match peer {
        Some(ip) if !ip.is_loopback() => {
            tracing::warn!(peer = %ip, "rejected non-local connection");
            StatusCode::FORBIDDEN.into_response()
        }
        _ => next.run(request).await,
    }
}

fn local_origin(origin: &HeaderValue) -> bool {
    origin
        .to_str()
        .map(|o| o.starts_with("http://localhost") || o.starts_with("http://127.0.0.1"))
        .unwrap_or(false)
}

async fn not_found() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "not found")
}

pub fn router(state: AppState) -> Router {
    use axum::handler::HandlerWithoutStateExt;

    let static_files = ServeDir::new(state.root.clone())
        .append_index_html_on_directories(true)
        .not_found_service(not_found.into_service());

    Router::new()
        .route("/api/save-markup", post(save_markup))
        .route("/api/patch-data", post(patch_data))
        .route("/api/upload-image", post(upload_image))
        .route("/api/rotate-image", post(rotate_image))
        .with_state(state)
        .fallback_service(static_files)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(
            CorsLayer::new()
                .allow_origin(AllowOrigin::predicate(|origin, _| local_origin(origin)))
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        .layer(middleware::from_fn(require_loopback))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_origins_pass_the_cors_predicate() {
        assert!(local_origin(&HeaderValue::from_static("http://localhost:3000")));
        assert!(local_origin(&HeaderValue::from_static("http://127.0.0.1:8080")));
        assert!(!local_origin(&HeaderValue::from_static("https://example.com")));
        assert!(!local_origin(&HeaderValue::from_static("http://evil.localhost.example")));
    }
}
