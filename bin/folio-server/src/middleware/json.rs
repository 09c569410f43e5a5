//! JSON extractor whose rejections are plain 400s in the usual error shape.
//!
//! axum answers a body with a missing or mistyped field with 422 and a text
//! body; handlers here use [`Json`] instead so every malformed request body
//! comes back as `{"error": ...}` with status 400.

use axum::extract::FromRequest;
use axum::extract::rejection::JsonRejection;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::error::ServerError;

#[derive(Debug, Clone, Copy, Default, FromRequest)]
#[from_request(via(axum::Json), rejection(ServerError))]
pub struct Json<T>(pub T);

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}

impl From<JsonRejection> for ServerError {
    fn from(rejection: JsonRejection) -> Self {
        ServerError::BadRequest(rejection.body_text())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Named {
        name: String,
    }

    async fn extract(content_type: Option<&str>, body: &str) -> Result<Json<Named>, ServerError> {
        let mut req = Request::builder().method("POST").uri("/");
        if let Some(ct) = content_type {
            req = req.header(header::CONTENT_TYPE, ct);
        }
        let req = req.body(Body::from(body.to_owned())).unwrap();
        Json::<Named>::from_request(req, &()).await
    }

    #[tokio::test]
    async fn well_formed_body_is_extracted() {
        let Json(named) = extract(Some("application/json"), r#"{"name":"ann"}"#).await.unwrap();
        assert_eq!(named.name, "ann");
    }

    #[tokio::test]
    async fn missing_field_is_a_400() {
        let err = extract(Some("application/json"), "{}").await.unwrap_err();
        assert!(matches!(&err, ServerError::BadRequest(m) if m.contains("name")));
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn syntax_error_and_wrong_content_type_are_400s() {
        let broken = extract(Some("application/json"), "{").await.unwrap_err();
        assert_eq!(broken.into_response().status(), StatusCode::BAD_REQUEST);
        let plain = extract(None, r#"{"name":"ann"}"#).await.unwrap_err();
        assert_eq!(plain.into_response().status(), StatusCode::BAD_REQUEST);
    }
}
