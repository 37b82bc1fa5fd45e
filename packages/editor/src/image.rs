//! # Image Pipeline (client stage)
//!
//! Downscales and re-encodes an uploaded image before it ever leaves the
//! editor, then wires the stored file back into its figure.
//!
//! The longest side is capped at [`MAX_DIMENSION`]; smaller sources pass
//! through unscaled. Output is always JPEG at a fixed quality, carried as
//! base64 so the gateway body is plain JSON.

use crate::blocks::{PLACEHOLDER_CLASS, PORTRAIT_CLASS};
use crate::dom::{Dom, NodeId};
use crate::errors::EditorError;
use base64::Engine as _;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;

/// Longest allowed side of a stored image, px.
pub const MAX_DIMENSION: u32 = 1400;
/// JPEG quality factor for re-encoding.
pub const JPEG_QUALITY: u8 = 85;

/// Re-encoded image ready for upload.
#[derive(Debug, Clone)]
pub struct ImageArtifact {
    pub width: u32,
    pub height: u32,
    /// JPEG bytes, base64-encoded for transport.
    pub base64: String,
    /// Sanitized stem + millisecond suffix + fixed extension.
    pub filename: String,
}

/// Post-resize dimensions: unchanged when both sides fit the cap, otherwise
/// the longer side becomes the cap and the other is rounded proportionally.
pub fn target_size(width: u32, height: u32, cap: u32) -> (u32, u32) {
    if width <= cap && height <= cap {
        return (width, height);
    }
    if width > height {
        let h = (height as f64 * cap as f64 / width as f64).round() as u32;
        (cap, h.max(1))
    } else {
        let w = (width as f64 * cap as f64 / height as f64).round() as u32;
        (w.max(1), cap)
    }
}

/// Filename stem with anything outside `[A-Za-z0-9_-]` collapsed to `_`.
pub fn sanitize_stem(original_name: &str) -> String {
    let stem = original_name
        .rsplit_once('.')
        .map(|(s, _)| s)
        .unwrap_or(original_name);
    stem.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Decode, downscale, re-encode. Undecodable input fails with
/// [`EditorError::ImageDecode`] and leaves the triggering figure untouched.
pub fn process_image(
    bytes: &[u8],
    original_name: &str,
    now_millis: u64,
) -> Result<ImageArtifact, EditorError> {
    let decoded = image::load_from_memory(bytes)
        .map_err(|e| EditorError::ImageDecode(e.to_string()))?;
    let (w, h) = (decoded.width(), decoded.height());
    let (tw, th) = target_size(w, h, MAX_DIMENSION);
    let resized = if (tw, th) == (w, h) {
        decoded
    } else {
        decoded.resize_exact(tw, th, FilterType::Triangle)
    };

    let rgb = resized.to_rgb8();
    let mut jpeg = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut jpeg, JPEG_QUALITY);
    rgb.write_with_encoder(encoder)
        .map_err(|e| EditorError::ImageDecode(e.to_string()))?;

    Ok(ImageArtifact {
        width: tw,
        height: th,
        base64: base64::engine::general_purpose::STANDARD.encode(&jpeg),
        filename: format!("{}_{}.jpg", sanitize_stem(original_name), now_millis),
    })
}

/// Image directory for a page, derived from its logical section: pages at
/// least two directories deep store photos next to their section, everything
/// else shares the site-wide pool. Root-relative, leading slash.
pub fn image_dir(page_path: &str) -> String {
    let dirs: Vec<&str> = page_path
        .split('/')
        .filter(|s| !s.is_empty() && !s.contains('.'))
        .collect();
    if dirs.len() >= 2 {
        format!("/{}/{}/photos", dirs[0], dirs[1])
    } else {
        "/assets/photos".to_string()
    }
}

/// Relative path from the page's directory to a root-relative target, by
/// common-segment comparison.
pub fn relative_from(page_path: &str, abs_path: &str) -> String {
    let page_dir = match page_path.rfind('/') {
        Some(idx) => &page_path[..idx],
        None => "",
    };
    let from: Vec<&str> = page_dir.split('/').filter(|s| !s.is_empty()).collect();
    let to: Vec<&str> = abs_path.split('/').filter(|s| !s.is_empty()).collect();
    let mut common = 0;
    while common < from.len() && common < to.len() && from[common] == to[common] {
        common += 1;
    }
    let ups = from.len() - common;
    let prefix = if ups > 0 {
        "../".repeat(ups)
    } else {
        "./".to_string()
    };
    format!("{}{}", prefix, to[common..].join("/"))
}

/// Resolve a page-relative reference back to a root-relative absolute path,
/// the form the rotation endpoint expects.
pub fn absolute_from(page_path: &str, relative: &str) -> String {
    if relative.starts_with('/') {
        return relative.to_string();
    }
    let page_dir = match page_path.rfind('/') {
        Some(idx) => &page_path[..idx],
        None => "",
    };
    let mut segments: Vec<&str> = page_dir.split('/').filter(|s| !s.is_empty()).collect();
    for seg in relative.split('/') {
        match seg {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    format!("/{}", segments.join("/"))
}

/// Append the cache-busting query token that forces a refetch of a filename
/// the browser may have cached before a revert.
pub fn cache_busted(path: &str, now_millis: u64) -> String {
    format!("{}?t={}", path, now_millis)
}

/// Wire a stored image into its figure: drop the upload placeholder, create
/// or reuse the `img` (kept ahead of the caption), point it at the
/// page-relative path with a fresh cache token, and classify the layout.
pub fn apply_upload(
    dom: &mut Dom,
    fig: NodeId,
    artifact: &ImageArtifact,
    stored_path: &str,
    page_path: &str,
    now_millis: u64,
) {
    for child in dom.children(fig) {
        if dom.has_class(child, PLACEHOLDER_CLASS) {
            dom.detach(child);
        }
    }

    let img = dom
        .children(fig)
        .into_iter()
        .find(|&c| dom.tag(c) == Some("img"))
        .unwrap_or_else(|| {
            let img = dom.create_element("img");
            // keep the image ahead of its caption
            dom.prepend_child(fig, img);
            img
        });

    let rel = relative_from(page_path, stored_path);
    dom.set_attr(img, "src", cache_busted(&rel, now_millis));
    let alt = artifact
        .filename
        .rsplit_once('_')
        .map(|(s, _)| s)
        .unwrap_or(&artifact.filename);
    dom.set_attr(img, "alt", alt);

    if artifact.height as f64 > artifact.width as f64 * 1.1 {
        dom.add_class(fig, PORTRAIT_CLASS);
    } else {
        dom.remove_class(fig, PORTRAIT_CLASS);
    }
}
