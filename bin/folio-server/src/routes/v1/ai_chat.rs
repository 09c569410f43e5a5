use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::post;
use axum::Router;
use utoipa::OpenApi;

use crate::entities::{AiChatMessage, AiChatStore};
use crate::error::ServerError;
use crate::handlers::assistant;
use crate::middleware::{Json, MaybeUser, Operation};
use crate::schemas::v1::ai_chat::{
    AiChatHistoryResponse, AiChatQuery, AiChatRequest, AiChatResponse, AiChatTurn,
};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(talk, history),
    components(schemas(AiChatRequest, AiChatResponse, AiChatTurn, AiChatHistoryResponse))
)]
pub struct AiChatApi;

/// Register chatbot routes.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/ai-chat/", post(talk).get(history))
        .route("/ai-chat", post(talk).get(history))
}

/// Ask the portfolio chatbot a question.
///
/// Anonymous visitors are welcome; signed-in users have their turns linked to
/// their account. While the hosted model warms up the reply is a fixed
/// notice with `error` set.
#[utoipa::path(
    post,
    path = "/api/v1/chat/ai-chat/",
    tag = "ai-chat",
    request_body = AiChatRequest,
    responses(
        (status = 200, description = "Reply from the model, a canned answer or a loading notice", body = AiChatResponse),
        (status = 400, description = "Empty message"),
    )
)]
pub async fn talk(
    State(state): State<Arc<AppState>>,
    caller: MaybeUser,
    Json(req): Json<AiChatRequest>,
) -> Result<Json<AiChatResponse>, ServerError> {
    Operation::ChatbotTalk.authorize(caller.role())?;
    let user_id = caller.user_id().map(str::to_owned);
    let reply = assistant::respond(&state, &req.message, req.session_id, user_id).await?;
    Ok(Json(AiChatResponse {
        response: reply.response,
        session_id: reply.session_id,
        error: reply.error.map(str::to_owned),
    }))
}

/// Transcript of a chatbot session, oldest turn first.
#[utoipa::path(
    get,
    path = "/api/v1/chat/ai-chat/",
    tag = "ai-chat",
    params(AiChatQuery),
    responses(
        (status = 200, description = "Session transcript", body = AiChatHistoryResponse),
        (status = 400, description = "session_id missing"),
    )
)]
pub async fn history(
    State(state): State<Arc<AppState>>,
    caller: MaybeUser,
    Query(query): Query<AiChatQuery>,
) -> Result<Json<AiChatHistoryResponse>, ServerError> {
    Operation::ChatbotTalk.authorize(caller.role())?;
    let session_id = query
        .session_id
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| ServerError::BadRequest("session_id is required".into()))?;
    let turns = state.store.list_ai_messages(&session_id, caller.user_id()).await?;
    Ok(Json(AiChatHistoryResponse {
        session_id,
        messages: turns.iter().map(AiChatMessage::to_response).collect(),
    }))
}

#[cfg(test)]
mod test {
    use super::*;
    use axum::http::StatusCode;
    use crate::entities::user::test::new_user;
    use crate::handlers::assistant::{LOADING_ERROR, LOADING_REPLY};
    use crate::inference::InferenceError;
    use crate::inference::fake::ScriptedClient;
    use crate::mail::fake::RecordingMailer;
    use crate::routes::test_support::{body_json, call, get, json_request, login_as};
    use crate::state::test_support::{state, state_with};
    use serde_json::json;

    #[tokio::test]
    async fn loading_model_is_a_normal_reply_and_is_stored() {
        let state = state_with(
            Arc::new(RecordingMailer::default()),
            Arc::new(ScriptedClient::new(vec![Err(InferenceError::Loading)])),
        )
        .await;
        let resp = call(
            &state,
            json_request("POST", "/api/v1/chat/ai-chat/", None, json!({ "message": "hi there" })),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        assert_eq!(body["response"], LOADING_REPLY);
        assert_eq!(body["error"], LOADING_ERROR);

        let session = body["session_id"].as_str().unwrap();
        let turns = state.store.list_ai_messages(session, None).await.unwrap();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[1].role, "assistant");
        assert_eq!(turns[1].content, LOADING_REPLY);
    }

    #[tokio::test]
    async fn model_reply_is_returned_without_error() {
        let state = state_with(
            Arc::new(RecordingMailer::default()),
            Arc::new(ScriptedClient::new(vec![Ok("Hello from the model".into())])),
        )
        .await;
        let resp = call(
            &state,
            json_request(
                "POST",
                "/api/v1/chat/ai-chat",
                None,
                json!({ "message": "hello", "session_id": "s-1" }),
            ),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        assert_eq!(body["response"], "Hello from the model");
        assert_eq!(body["session_id"], "s-1");
        assert!(body.get("error").is_none());
    }

    #[tokio::test]
    async fn empty_message_is_rejected() {
        let state = state().await;
        let resp = call(&state, json_request("POST", "/api/v1/chat/ai-chat/", None, json!({ "message": " " }))).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn history_is_scoped_to_the_caller() {
        let state = state().await;
        let user = new_user("ann");
        let token = login_as(&state, &user).await;

        let resp = call(
            &state,
            json_request(
                "POST",
                "/api/v1/chat/ai-chat/",
                Some(&token),
                json!({ "message": "what services do you offer", "session_id": "shared" }),
            ),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        call(
            &state,
            json_request(
                "POST",
                "/api/v1/chat/ai-chat/",
                None,
                json!({ "message": "hello", "session_id": "shared" }),
            ),
        )
        .await;

        let mine = body_json(call(&state, get("/api/v1/chat/ai-chat/?session_id=shared", Some(&token))).await).await;
        assert_eq!(mine["messages"].as_array().unwrap().len(), 2);
        assert_eq!(mine["messages"][0]["content"], "what services do you offer");

        let anon = body_json(call(&state, get("/api/v1/chat/ai-chat/?session_id=shared", None)).await).await;
        assert_eq!(anon["messages"].as_array().unwrap().len(), 2);
        assert_eq!(anon["messages"][0]["content"], "hello");

        let missing = call(&state, get("/api/v1/chat/ai-chat/", None)).await;
        assert_eq!(missing.status(), StatusCode::BAD_REQUEST);
    }
}
