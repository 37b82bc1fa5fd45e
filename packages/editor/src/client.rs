//! HTTP-backed save gateway.
//!
//! Speaks the persistence gateway's JSON envelope: `{ ok, error?, ...extra }`.
//! Every call is best-effort from the session's point of view; errors bubble
//! up as [`EditorError::Gateway`] and the session downgrades the sink result.

use crate::errors::EditorError;
use crate::session::Gateway;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

#[derive(Debug, Serialize)]
struct SaveMarkupBody<'a> {
    path: &'a str,
    html: &'a str,
}

#[derive(Debug, Serialize)]
struct PatchDataBody<'a> {
    changes: &'a BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
struct UploadImageBody<'a> {
    dir: &'a str,
    filename: &'a str,
    base64: &'a str,
}

#[derive(Debug, Serialize)]
struct RotateImageBody<'a> {
    path: &'a str,
    degrees: i32,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    ok: bool,
    error: Option<String>,
    path: Option<String>,
}

/// Client for a locally running persistence gateway.
pub struct HttpGateway {
    base_url: String,
    http: reqwest::blocking::Client,
}

impl HttpGateway {
    pub fn new(base_url: impl Into<String>) -> Result<Self, EditorError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(20))
            .build()?;
        Ok(Self {
            base_url: base_url.into(),
            http,
        })
    }

    fn post<B: Serialize>(&self, route: &str, body: &B) -> Result<Envelope, EditorError> {
        let url = format!("{}{}", self.base_url, route);
        let envelope: Envelope = self.http.post(&url).json(body).send()?.json()?;
        if envelope.ok {
            Ok(envelope)
        } else {
            Err(EditorError::Gateway(
                envelope.error.unwrap_or_else(|| "unknown error".to_string()),
            ))
        }
    }
}

impl Gateway for HttpGateway {
    fn write_markup(&self, page_path: &str, html: &str) -> Result<(), EditorError> {
        self.post(
            "/api/save-markup",
            &SaveMarkupBody {
                path: page_path,
                html,
            },
        )?;
        Ok(())
    }

    fn patch_data(&self, changes: &BTreeMap<String, String>) -> Result<(), EditorError> {
        self.post("/api/patch-data", &PatchDataBody { changes })?;
        Ok(())
    }

    fn upload_image(
        &self,
        dir: &str,
        filename: &str,
        base64: &str,
    ) -> Result<String, EditorError> {
        let envelope = self.post(
            "/api/upload-image",
            &UploadImageBody {
                dir,
                filename,
                base64,
            },
        )?;
        envelope
            .path
            .ok_or_else(|| EditorError::Gateway("upload response missing path".to_string()))
    }

    fn rotate_image(&self, image_path: &str, degrees: i32) -> Result<(), EditorError> {
        self.post(
            "/api/rotate-image",
            &RotateImageBody {
                path: image_path,
                degrees,
            },
        )?;
        Ok(())
    }
}
