//! Unified server error type.
//!
//! Every handler returns `Result<T, ServerError>`, which implements
//! [`axum::response::IntoResponse`] so errors are automatically converted
//! to a JSON-body HTTP response with an appropriate status code.
//!
//! **Security note:** Internal errors (Database, Io, Internal) are logged with
//! full detail but only a generic message is returned to the caller so that
//! file paths, SQL, or other implementation details never leak to clients.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// All errors that can occur in the folio-server request lifecycle.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Propagated from the SQLite store.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Filesystem failure while handling an upload or download.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A request DTO failed field validation.
    #[error("validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    /// The caller referenced a resource that does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The caller sent an invalid or malformed request.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The request body is larger than the server accepts.
    #[error("payload too large: {0}")]
    PayloadTooLarge(String),

    /// Missing, expired or unknown credentials.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated, but not allowed to perform the operation.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// An unclassified internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            // Client-facing errors: expose the message directly.
            ServerError::NotFound(m) => (StatusCode::NOT_FOUND, json!({ "error": m })),
            ServerError::BadRequest(m) => (StatusCode::BAD_REQUEST, json!({ "error": m })),
            ServerError::PayloadTooLarge(m) => (StatusCode::PAYLOAD_TOO_LARGE, json!({ "error": m })),
            ServerError::Unauthorized(m) => (StatusCode::UNAUTHORIZED, json!({ "error": m })),
            ServerError::PermissionDenied(m) => (StatusCode::FORBIDDEN, json!({ "error": m })),
            ServerError::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "validation error", "fields": field_messages(errors) }),
            ),
            // Duplicate email / username / slug.
            ServerError::Database(sqlx::Error::Database(db)) if db.is_unique_violation() => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "a record with these values already exists" }),
            ),

            // Internal errors: log the full detail, return a generic message.
            ServerError::Database(e) => {
                error!(error = %e, "database error");
                internal()
            }
            ServerError::Io(e) => {
                error!(error = %e, "io error");
                internal()
            }
            ServerError::Internal(m) => {
                error!(message = %m, "internal server error");
                internal()
            }
        };
        (status, Json(body)).into_response()
    }
}

fn internal() -> (StatusCode, serde_json::Value) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        json!({ "error": "internal server error" }),
    )
}

impl From<anyhow::Error> for ServerError {
    fn from(e: anyhow::Error) -> Self {
        // Keep the whole chain in the logs; clients only see a generic message.
        error!(error = ?e, "converting anyhow error to ServerError::Internal");
        ServerError::Internal(e.to_string())
    }
}

/// Flatten `validator` errors into `{ field: [message, …] }`.
fn field_messages(errors: &validator::ValidationErrors) -> serde_json::Value {
    let mut out = serde_json::Map::new();
    for (field, errs) in errors.field_errors() {
        let messages: Vec<String> = errs
            .iter()
            .map(|e| {
                e.message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("invalid value ({})", e.code))
            })
            .collect();
        out.insert(field.to_string(), json!(messages));
    }
    serde_json::Value::Object(out)
}

#[cfg(test)]
mod test {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_json(resp: Response) -> serde_json::Value {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn permission_denied_maps_to_403() {
        let resp = ServerError::PermissionDenied("nope".into()).into_response();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        assert_eq!(body_json(resp).await["error"], "nope");
    }

    #[tokio::test]
    async fn internal_error_hides_detail() {
        let resp = ServerError::Internal("/var/secret/path exploded".into()).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(resp).await;
        assert_eq!(body["error"], "internal server error");
    }

    #[tokio::test]
    async fn validation_errors_list_fields() {
        use validator::Validate;

        #[derive(Validate)]
        struct Probe {
            #[validate(email(message = "Enter a valid email address."))]
            email: String,
        }

        let errs = Probe { email: "not-an-email".into() }.validate().unwrap_err();
        let resp = ServerError::from(errs).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = body_json(resp).await;
        assert_eq!(body["fields"]["email"][0], "Enter a valid email address.");
    }
}
