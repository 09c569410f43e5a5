//! Axum router construction.
//!
//! [`build`] assembles the complete application router, including:
//! - Middleware layers (CORS, per-request trace-ID injection, body limit)
//! - Optional Swagger UI / OpenAPI spec endpoint (disable with `FOLIO_ENABLE_SWAGGER=false`)
//! - Health / heartbeat route
//! - `/api/v1` routes for accounts, portfolio and chat

pub mod doc;
mod health;
mod v1;

use crate::middleware::{cors, trace};
use crate::state::AppState;
use axum::extract::DefaultBodyLimit;
use axum::{Router, middleware};
use std::sync::Arc;
use tower::ServiceBuilder;
use utoipa_swagger_ui::SwaggerUi;

/// Room for multipart framing and the text fields around an upload.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

// ── Router builder ────────────────────────────────────────────────────────────

/// Build the complete Axum [`Router`] for the application.
pub fn build(state: Arc<AppState>) -> Router {
    let api_router = Router::new()
        .merge(health::router())
        .nest("/api/v1", v1::router());

    let mut app = Router::new().merge(api_router);

    // ── Swagger UI ────────────────────────────────────────────────────────────
    if state.config.enable_swagger {
        app = app.merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", doc::get_docs()));
    }

    app
        // Outermost layers execute first on the way in.
        .layer(
            ServiceBuilder::new()
                .layer(cors::cors_layer(state.clone()))
                .layer(DefaultBodyLimit::max(state.config.max_upload_bytes + MULTIPART_OVERHEAD)),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            trace::trace_middleware,
        ))
        .with_state(state)
}

/// Shared helpers for router-level tests.
#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::entities::{TokenStore, User, UserStore};
    use crate::handlers::credentials::{generate_token, hash_token};
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use axum::response::Response;
    use chrono::Utc;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    /// Send one request through a freshly built router.
    pub(crate) async fn call(state: &Arc<AppState>, req: Request<Body>) -> Response {
        build(state.clone()).oneshot(req).await.unwrap()
    }

    pub(crate) fn json_request(
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: serde_json::Value,
    ) -> Request<Body> {
        let mut req = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(t) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {t}"));
        }
        req.body(Body::from(body.to_string())).unwrap()
    }

    pub(crate) fn get(uri: &str, token: Option<&str>) -> Request<Body> {
        let mut req = Request::builder().uri(uri);
        if let Some(t) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {t}"));
        }
        req.body(Body::empty()).unwrap()
    }

    pub(crate) async fn body_json(resp: Response) -> serde_json::Value {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        if bytes.is_empty() {
            return serde_json::Value::Null;
        }
        serde_json::from_slice(&bytes).unwrap()
    }

    /// Store `user` and return a valid bearer token for it.
    pub(crate) async fn login_as(state: &Arc<AppState>, user: &User) -> String {
        if state.store.get_user(&user.id).await.unwrap().is_none() {
            state.store.create_user(user.clone()).await.unwrap();
        }
        let token = generate_token();
        state
            .store
            .insert_auth_token(&hash_token(&token), &user.id, Utc::now() + chrono::Duration::hours(1))
            .await
            .unwrap();
        token
    }

    pub(crate) fn assert_status(resp: &Response, status: StatusCode) {
        assert_eq!(resp.status(), status, "unexpected status");
    }
}
