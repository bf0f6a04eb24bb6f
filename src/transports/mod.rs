//! Transport adapters for hosting a processor.
//!
//! - **Axum**: HTTP transport via the Axum web framework

#[cfg(feature = "axum")]
pub mod axum;

#[cfg(feature = "axum")]
pub use axum::*;
