//! Client for an OpenAI-compatible chat-completions API.
//!
//! The chatbot hands a structured turn list to an [`InferenceClient`] and
//! gets back the first choice's text, or an [`InferenceError`] saying why
//! there is none.

pub mod schema;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use thiserror::Error;

use crate::config::InferenceConfig;
use schema::{ChatCompletionRequest, ChatCompletionResponse, ChatMessage};

/// What the responder asks the model for.
#[derive(Debug, Clone)]
pub struct Completion {
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("inference api key not configured")]
    NotConfigured,

    /// HTTP 503: the hosted model is still being loaded.
    #[error("model is loading")]
    Loading,

    #[error("inference api returned status {0}")]
    Status(u16),

    #[error("inference request timed out")]
    Timeout,

    #[error("inference transport error: {0}")]
    Transport(String),

    #[error("malformed inference response: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for InferenceError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            InferenceError::Timeout
        } else if e.is_decode() {
            InferenceError::Malformed(e.to_string())
        } else {
            InferenceError::Transport(e.to_string())
        }
    }
}

#[async_trait]
pub trait InferenceClient: Send + Sync + 'static {
    /// Whether a call could reach the API at all.
    fn is_configured(&self) -> bool;

    async fn complete(&self, completion: Completion) -> Result<String, InferenceError>;
}

/// `reqwest`-backed client.
#[derive(Debug, Clone)]
pub struct HttpInferenceClient {
    cfg: InferenceConfig,
    client: Client,
}

impl HttpInferenceClient {
    /// Fails when the HTTP client cannot be built with the configured timeouts.
    pub fn new(cfg: InferenceConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(concat!("folio-server/", env!("CARGO_PKG_VERSION")))
            .timeout(cfg.timeout)
            .connect_timeout(Duration::from_secs(10).min(cfg.timeout))
            .build()?;
        Ok(Self { cfg, client })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.cfg.base_url)
    }
}

#[async_trait]
impl InferenceClient for HttpInferenceClient {
    fn is_configured(&self) -> bool {
        self.cfg.api_key.is_some()
    }

    async fn complete(&self, completion: Completion) -> Result<String, InferenceError> {
        let key = self.cfg.api_key.as_deref().ok_or(InferenceError::NotConfigured)?;
        let body = ChatCompletionRequest {
            model: self.cfg.model.clone(),
            messages: completion.messages,
            max_tokens: Some(completion.max_tokens),
            temperature: Some(completion.temperature),
            stream: false,
        };

        tracing::debug!(model = %self.cfg.model, turns = body.messages.len(), "inference request");
        let resp = self
            .client
            .post(self.endpoint())
            .bearer_auth(key)
            .json(&body)
            .send()
            .await?;

        match resp.status() {
            StatusCode::OK => {}
            StatusCode::SERVICE_UNAVAILABLE => return Err(InferenceError::Loading),
            other => return Err(InferenceError::Status(other.as_u16())),
        }

        let parsed: ChatCompletionResponse = resp.json().await?;
        let text = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content.trim().to_owned())
            .ok_or_else(|| InferenceError::Malformed("no choices".into()))?;
        if text.is_empty() {
            return Err(InferenceError::Malformed("empty content".into()));
        }
        Ok(text)
    }
}


#[cfg(test)]
mod test {
    use super::*;
    use axum::http::StatusCode as AxumStatus;
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::json;

    /// Serve `router` on an ephemeral port and return its `/v1` base URL.
    async fn stub(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}/v1")
    }

    fn client_with_timeout(base_url: String, timeout: Duration) -> HttpInferenceClient {
        HttpInferenceClient::new(InferenceConfig {
            api_key: Some("k".into()),
            base_url,
            model: "m".into(),
            timeout,
            history_limit: 10,
        })
        .unwrap()
    }

    fn client(base_url: String) -> HttpInferenceClient {
        client_with_timeout(base_url, Duration::from_secs(2))
    }

    fn hello() -> Completion {
        Completion {
            messages: vec![ChatMessage::user("hello")],
            max_tokens: 50,
            temperature: 0.7,
        }
    }

    #[tokio::test]
    async fn first_choice_content_is_returned() {
        let router = Router::new().route(
            "/v1/chat/completions",
            post(|Json(body): Json<serde_json::Value>| async move {
                assert_eq!(body["model"], "m");
                Json(json!({
                    "choices": [{ "index": 0, "message": { "role": "assistant", "content": " hi there " }, "finish_reason": "stop" }]
                }))
            }),
        );
        let text = client(stub(router).await).complete(hello()).await.unwrap();
        assert_eq!(text, "hi there");
    }

    #[tokio::test]
    async fn service_unavailable_means_loading() {
        let router = Router::new()
            .route("/v1/chat/completions", post(|| async { AxumStatus::SERVICE_UNAVAILABLE }));
        let err = client(stub(router).await).complete(hello()).await.unwrap_err();
        assert!(matches!(err, InferenceError::Loading));
    }

    #[tokio::test]
    async fn other_statuses_are_reported() {
        let router = Router::new()
            .route("/v1/chat/completions", post(|| async { AxumStatus::TOO_MANY_REQUESTS }));
        let err = client(stub(router).await).complete(hello()).await.unwrap_err();
        assert!(matches!(err, InferenceError::Status(429)));
    }

    #[tokio::test]
    async fn empty_choices_are_malformed() {
        let router = Router::new()
            .route("/v1/chat/completions", post(|| async { Json(json!({ "choices": [] })) }));
        let err = client(stub(router).await).complete(hello()).await.unwrap_err();
        assert!(matches!(err, InferenceError::Malformed(_)));
    }

    #[tokio::test]
    async fn slow_endpoint_hits_the_configured_timeout() {
        let router = Router::new().route(
            "/v1/chat/completions",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Json(json!({ "choices": [] }))
            }),
        );
        let c = client_with_timeout(stub(router).await, Duration::from_millis(200));
        let err = c.complete(hello()).await.unwrap_err();
        assert!(matches!(err, InferenceError::Timeout));
    }

    #[tokio::test]
    async fn missing_key_never_calls_out() {
        let mut c = client("http://127.0.0.1:9/v1".into());
        c.cfg.api_key = None;
        assert!(!c.is_configured());
        assert!(matches!(c.complete(hello()).await, Err(InferenceError::NotConfigured)));
    }
}
