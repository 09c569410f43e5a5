pub mod accounts;
pub mod ai_chat;
pub mod chat;
pub mod portfolio;

use crate::state::AppState;
use utoipa::OpenApi;

use axum::Router;
use std::sync::Arc;

/// Routes nested under `/api/v1`.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .nest("/accounts", accounts::router())
        .nest("/portfolio", portfolio::router())
        .nest("/chat", chat::router().merge(ai_chat::router()))
}

#[derive(OpenApi)]
#[openapi()]
pub struct V1Api;

pub fn api_docs() -> utoipa::openapi::OpenApi {
    let mut spec = V1Api::openapi();
    spec.merge(accounts::AccountsApi::openapi());
    spec.merge(portfolio::PortfolioApi::openapi());
    spec.merge(chat::ChatApi::openapi());
    spec.merge(ai_chat::AiChatApi::openapi());
    spec
}
