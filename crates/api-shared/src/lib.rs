//! # API Shared
//!
//! Shared definitions for the HealthDesk front-ends.
//!
//! Contains:
//! - Request/response types with OpenAPI schemas (`dto` module)
//! - Shared services like `HealthService`
//!
//! Used by `api-rest` and the `healthdesk-run` binary.

pub mod dto;
pub mod health;

pub use dto::*;
pub use health::HealthService;
