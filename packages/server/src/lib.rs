//! Pagewright persistence gateway.
//!
//! A small local HTTP service the in-page editor saves through. It owns the
//! three durable sinks behind a site: page markup files, the structured
//! data file, and the photo directories, plus in-place image rotation.
//!
//! Everything binds to loopback. The service is a companion process for an
//! author working on their own machine, not a public endpoint.

pub mod data;
pub mod errors;
pub mod paths;
pub mod rotate;
pub mod server;
pub mod store;

pub use errors::GatewayError;
pub use rotate::{ImageCrateRotator, ImageRotator, ShellRotator};
pub use server::{router, AppState};
