use crate::error::ServerError;
use crate::state::AppState;
use axum::{
    body::{Body, HttpBody},
    extract::{Request, State},
    http::{HeaderValue, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use http_body_util::{BodyExt, LengthLimitError, Limited};
use std::sync::Arc;
use std::time::Instant;
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

pub static X_TRACE_ID: &str = "x-trace-id";

/// Only JSON bodies with a known length up to this size are buffered and
/// logged; everything else streams through.
const MAX_LOGGED_BODY: usize = 1024;

/// Field names whose values never reach the logs.
const REDACTED_KEYS: &[&str] = &["password", "token", "old_password", "new_password", "new_password2", "password2"];

pub async fn trace_middleware(
    State(_state): State<Arc<AppState>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let start_time = Instant::now();

    // Reuse the caller's trace id when it is a valid UUID.
    let trace_id = req
        .headers()
        .get(X_TRACE_ID)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
        .unwrap_or_else(Uuid::new_v4);
    let trace_header = HeaderValue::from_str(&trace_id.to_string()).ok();

    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let span = info_span!(
        "http_request",
        trace_id = %trace_id,
        method = %method,
        path = %path,
    );

    async move {
        info!("→ request started");
        let (parts, body) = req.into_parts();
        let body = match buffer_and_log("request", &parts.headers, body).await {
            Ok(body) => body,
            Err(err) => {
                let mut response = err.into_response();
                if let Some(v) = trace_header {
                    response.headers_mut().insert(X_TRACE_ID, v);
                }
                info!(status = response.status().as_u16(), "← request body rejected");
                return response;
            }
        };
        let mut req = Request::from_parts(parts, body);
        if let Some(v) = &trace_header {
            req.headers_mut().insert(X_TRACE_ID, v.clone());
        }

        let response = next.run(req).await;

        let (parts, body) = response.into_parts();
        let body = buffer_and_log("response", &parts.headers, body)
            .await
            .unwrap_or_else(|e| {
                warn!(error = %e, "failed to read response body");
                Body::empty()
            });
        let mut response = Response::from_parts(parts, body);
        if let Some(v) = trace_header {
            response.headers_mut().insert(X_TRACE_ID, v);
        }

        info!(
            status = response.status().as_u16(),
            latency_ms = start_time.elapsed().as_millis(),
            "← response finished"
        );
        response
    }
    .instrument(span)
    .await
}

/// Log a small JSON body with secrets masked. Other bodies, including JSON of
/// unknown or large size, stream through untouched.
async fn buffer_and_log(
    direction: &str,
    headers: &header::HeaderMap,
    body: Body,
) -> Result<Body, ServerError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if !content_type.contains("application/json") {
        return Ok(body);
    }
    match body.size_hint().exact() {
        Some(size) if size <= MAX_LOGGED_BODY as u64 => {}
        size => {
            debug!(size, "{direction} body not logged");
            return Ok(body);
        }
    }

    let bytes = match Limited::new(body, MAX_LOGGED_BODY).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) if e.is::<LengthLimitError>() => {
            return Err(ServerError::PayloadTooLarge(format!(
                "{direction} body exceeds its declared length"
            )));
        }
        Err(e) => {
            return Err(ServerError::BadRequest(format!("failed to read {direction} body: {e}")));
        }
    };

    if let Ok(mut value) = serde_json::from_slice::<serde_json::Value>(&bytes) {
        redact(&mut value);
        debug!(body = %value, "{direction} body");
    }
    Ok(Body::from(bytes))
}

fn redact(value: &mut serde_json::Value) {
    match value {
        serde_json::Value::Object(map) => {
            for (key, v) in map.iter_mut() {
                if REDACTED_KEYS.contains(&key.as_str()) {
                    *v = serde_json::Value::String("***".into());
                } else {
                    redact(v);
                }
            }
        }
        serde_json::Value::Array(items) => items.iter_mut().for_each(redact),
        _ => {}
    }
}
