use crate::state::AppState;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

pub fn cors_layer(state: Arc<AppState>) -> CorsLayer {
    let origins: Vec<axum::http::HeaderValue> = state
        .config
        .cors_allowed_origins
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse().ok())
        .collect();

    let cors = CorsLayer::new().allow_headers(Any).allow_methods(Any);
    if origins.is_empty() {
        // Wildcard; set FOLIO_CORS_ORIGINS in production.
        cors.allow_origin(Any)
    } else {
        tracing::info!(count = origins.len(), "restricting CORS origins");
        cors.allow_origin(origins)
    }
}

#[cfg(test)]
mod test {
    use crate::config::Config;
    use crate::routes::test_support::call;
    use crate::state::test_support::state;
    use axum::body::Body;
    use axum::http::Request;
    use std::sync::Arc;

    fn from_origin(origin: &str) -> Request<Body> {
        Request::builder().uri("/health").header("origin", origin).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn unset_origins_allow_any() {
        let state = state().await;
        let resp = call(&state, from_origin("https://anywhere.test")).await;
        assert_eq!(resp.headers()["access-control-allow-origin"], "*");
    }

    #[tokio::test]
    async fn listed_origins_are_echoed() {
        let mut state = state().await;
        let mut config = Config::for_tests();
        config.cors_allowed_origins = Some("https://portfolio.test, https://admin.portfolio.test".into());
        Arc::get_mut(&mut state).unwrap().config = Arc::new(config);

        let resp = call(&state, from_origin("https://admin.portfolio.test")).await;
        assert_eq!(resp.headers()["access-control-allow-origin"], "https://admin.portfolio.test");
        let resp = call(&state, from_origin("https://evil.test")).await;
        assert!(resp.headers().get("access-control-allow-origin").is_none());
    }
}
