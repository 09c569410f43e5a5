//! HTTP middleware stack and request extractors.

pub mod access;
pub mod auth;
pub mod cors;
pub mod json;
pub mod trace;

pub use access::{Operation, Role};
pub use auth::{AuthUser, ClientMeta, MaybeUser};
pub use json::Json;
