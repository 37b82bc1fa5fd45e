//! In-place image rotation.
//!
//! Rotation is modeled as a capability: the HTTP layer validates degrees and
//! resolves the target path, then hands both to an [`ImageRotator`]. The
//! default implementation shells out to ImageMagick with a hard deadline;
//! [`ImageCrateRotator`] does the same work in-process and is what the tests
//! use.

use crate::errors::GatewayError;
use std::path::Path;
use std::time::{Duration, Instant};

pub const ALLOWED_DEGREES: [i32; 5] = [90, -90, 180, 270, -270];

const SHELL_DEADLINE: Duration = Duration::from_secs(20);
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Validate a rotation request's angle. Quarter turns only, in either
/// direction.
pub fn validate_degrees(degrees: i32) -> Result<i32, GatewayError> {
    if ALLOWED_DEGREES.contains(&degrees) {
        Ok(degrees)
    } else {
        Err(GatewayError::InvalidRotation(degrees))
    }
}

/// Rotates one image file in place. `degrees` is already validated.
pub trait ImageRotator: Send + Sync {
    fn rotate(&self, file: &Path, degrees: i32) -> Result<(), GatewayError>;
}

/// Rotation via the `magick` command line tool, bounded by a deadline so a
/// wedged child cannot pin the worker.
pub struct ShellRotator;

impl ImageRotator for ShellRotator {
    fn rotate(&self, file: &Path, degrees: i32) -> Result<(), GatewayError> {
        let angle = degrees.rem_euclid(360);
        let mut child = std::process::Command::new("magick")
            .arg(file)
            .arg("-rotate")
            .arg(angle.to_string())
            .arg(file)
            .spawn()
            .map_err(|e| GatewayError::RotationTool(format!("magick: {}", e)))?;

        let deadline = Instant::now() + SHELL_DEADLINE;
        loop {
            match child.try_wait() {
                Ok(Some(status)) if status.success() => return Ok(()),
                Ok(Some(status)) => {
                    return Err(GatewayError::RotationTool(format!(
                        "magick exited with {}",
                        status
                    )));
                }
                Ok(None) if Instant::now() >= deadline => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(GatewayError::RotationTool("magick timed out".to_string()));
                }
                Ok(None) => std::thread::sleep(POLL_INTERVAL),
                Err(e) => return Err(GatewayError::RotationTool(e.to_string())),
            }
        }
    }
}

/// Pure-Rust rotation through the `image` crate. Decodes, turns by quarter
/// steps, and re-encodes at the same path.
pub struct ImageCrateRotator;

impl ImageRotator for ImageCrateRotator {
    fn rotate(&self, file: &Path, degrees: i32) -> Result<(), GatewayError> {
        let img = image::open(file)
            .map_err(|e| GatewayError::RotationTool(format!("decode: {}", e)))?;
        let turned = match degrees.rem_euclid(360) {
            90 => img.rotate90(),
            180 => img.rotate180(),
            270 => img.rotate270(),
            _ => img,
        };
        turned
            .save(file)
            .map_err(|e| GatewayError::RotationTool(format!("encode: {}", e)))?;
        Ok(())
    }
}
