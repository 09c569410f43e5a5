//! Two-party chat: conversations, messages with optional attachments, and
//! in-app notifications.

use std::sync::Arc;

use axum::extract::{FromRequest, Multipart, Path, Request, State};
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;
use chrono::Utc;
use tracing::info;
use utoipa::OpenApi;
use uuid::Uuid;

use crate::entities::{
    Conversation, ConversationStore, Message, MessageStore, Notification, NotificationStore,
    UserStore,
};
use crate::error::ServerError;
use crate::handlers::notify;
use crate::handlers::uploads::{self, Upload, sanitize_filename};
use crate::middleware::{AuthUser, Json, Operation};
use crate::schemas::v1::chat::{
    ConversationResponse, CreateConversationRequest, MarkAllReadResponse, MessageResponse,
    NotificationResponse, ParticipantResponse, SendMessageRequest, SendMessageUpload,
    UnreadCountResponse,
};
use crate::state::AppState;

/// Attachments live under this directory inside the upload root.
const CHAT_FILES_DIR: &str = "chat_files";

#[derive(OpenApi)]
#[openapi(
    paths(
        list_conversations, create_conversation, available_users, get_conversation,
        list_messages, send_message, mark_message_read, download_file,
        list_notifications, unread_count, mark_notification_read, mark_all_read, list_users
    ),
    components(schemas(
        ConversationResponse, CreateConversationRequest, MessageResponse, SendMessageRequest,
        SendMessageUpload, ParticipantResponse, NotificationResponse, UnreadCountResponse,
        MarkAllReadResponse
    ))
)]
pub struct ChatApi;

/// Register chat routes.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/conversations", get(list_conversations).post(create_conversation))
        .route("/conversations/available_users", get(available_users))
        .route("/conversations/{id}", get(get_conversation))
        .route("/conversations/{id}/messages", get(list_messages))
        .route("/conversations/{id}/send_message", post(send_message))
        .route("/messages/{id}/mark_as_read", post(mark_message_read))
        .route("/messages/{id}/download_file", get(download_file))
        .route("/notifications", get(list_notifications))
        .route("/notifications/unread_count", get(unread_count))
        .route("/notifications/mark_all_as_read", post(mark_all_read))
        .route("/notifications/{id}/mark_as_read", post(mark_notification_read))
        .route("/users", get(list_users))
}

// ── helpers ───────────────────────────────────────────────────────────────────

/// Load a conversation the caller takes part in.
async fn joined_conversation(
    state: &AppState,
    id: &str,
    user_id: &str,
) -> Result<Conversation, ServerError> {
    let conversation = state
        .store
        .get_conversation(id)
        .await?
        .ok_or_else(|| ServerError::NotFound(format!("conversation {id} not found")))?;
    if !state.store.is_participant(id, user_id).await? {
        return Err(ServerError::PermissionDenied(
            "You are not a participant in this conversation.".into(),
        ));
    }
    Ok(conversation)
}

async fn conversation_view(
    state: &AppState,
    conversation: &Conversation,
    viewer_id: &str,
) -> Result<ConversationResponse, ServerError> {
    let participants = state.store.participants(&conversation.id).await?;
    let last = state.store.last_message(&conversation.id).await?;
    let unread = state.store.unread_message_count(&conversation.id, viewer_id).await?;
    Ok(conversation.to_response(&participants, last.as_ref(), unread))
}

async fn message_view(state: &AppState, message: &Message) -> Result<MessageResponse, ServerError> {
    let sender_name = state
        .store
        .get_user(&message.sender_id)
        .await?
        .map(|u| u.display_name())
        .unwrap_or_default();
    Ok(message.to_response(sender_name))
}

/// Read the `content` and `file` fields of a multipart message.
async fn read_multipart(
    mut multipart: Multipart,
    max_bytes: usize,
) -> Result<(String, Option<Upload>), ServerError> {
    let mut content = String::new();
    let mut upload = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::BadRequest(format!("Failed to read multipart field: {e}")))?
    {
        let field_name = field.name().unwrap_or_default().to_owned();
        match field_name.as_str() {
            "content" => {
                content = field
                    .text()
                    .await
                    .map_err(|e| ServerError::BadRequest(format!("Failed to read content: {e}")))?;
            }
            "file" => upload = uploads::read_file(field, max_bytes).await?,
            other => return Err(ServerError::BadRequest(format!("Unknown field: {other}"))),
        }
    }
    Ok((content, upload))
}

// ── conversations ─────────────────────────────────────────────────────────────

#[utoipa::path(
    get,
    path = "/api/v1/chat/conversations",
    tag = "chat",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Caller's conversations, newest activity first", body = Vec<ConversationResponse>),
        (status = 401, description = "Not signed in"),
    )
)]
pub async fn list_conversations(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<Vec<ConversationResponse>>, ServerError> {
    auth.authorize(Operation::ListConversations)?;
    let conversations = state.store.list_conversations_for(&auth.user.id).await?;
    let mut out = Vec::with_capacity(conversations.len());
    for conversation in &conversations {
        out.push(conversation_view(&state, conversation, &auth.user.id).await?);
    }
    Ok(Json(out))
}

/// Start a conversation with another user, or return the existing one.
#[utoipa::path(
    post,
    path = "/api/v1/chat/conversations",
    tag = "chat",
    security(("bearer" = [])),
    request_body = CreateConversationRequest,
    responses(
        (status = 201, description = "Conversation created", body = ConversationResponse),
        (status = 200, description = "Existing conversation with that user", body = ConversationResponse),
        (status = 400, description = "Unknown participant"),
    )
)]
pub async fn create_conversation(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(req): Json<CreateConversationRequest>,
) -> Result<(StatusCode, Json<ConversationResponse>), ServerError> {
    auth.authorize(Operation::CreateConversation)?;
    let me = auth.user.id.clone();
    let other = req.participant_id.filter(|id| *id != me);

    let mut participant_ids = vec![me.clone()];
    if let Some(other) = other {
        match state.store.get_user(&other).await? {
            Some(user) if user.is_active => {}
            _ => return Err(ServerError::BadRequest("Participant not found.".into())),
        }
        if let Some(existing) = state.store.find_direct_conversation(&me, &other).await? {
            let view = conversation_view(&state, &existing, &me).await?;
            return Ok((StatusCode::OK, Json(view)));
        }
        participant_ids.push(other);
    }

    let now = Utc::now();
    let conversation = Conversation { id: Uuid::new_v4().to_string(), created_at: now, updated_at: now };
    state.store.create_conversation(conversation.clone(), &participant_ids).await?;
    info!(conversation = %conversation.id, participants = participant_ids.len(), "conversation created");
    let view = conversation_view(&state, &conversation, &me).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

#[utoipa::path(
    get,
    path = "/api/v1/chat/conversations/available_users",
    tag = "chat",
    security(("bearer" = [])),
    responses((status = 200, description = "Everyone the caller can talk to", body = Vec<ParticipantResponse>))
)]
pub async fn available_users(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<Vec<ParticipantResponse>>, ServerError> {
    auth.authorize(Operation::ListAvailableUsers)?;
    let users = state.store.list_other_users(&auth.user.id).await?;
    Ok(Json(users.iter().filter(|u| u.is_active).map(|u| u.to_participant()).collect()))
}

#[utoipa::path(
    get,
    path = "/api/v1/chat/conversations/{id}",
    tag = "chat",
    security(("bearer" = [])),
    params(("id" = String, Path, description = "Conversation id")),
    responses(
        (status = 200, description = "Conversation", body = ConversationResponse),
        (status = 403, description = "Caller is not a participant"),
        (status = 404, description = "Unknown conversation"),
    )
)]
pub async fn get_conversation(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<ConversationResponse>, ServerError> {
    auth.authorize(Operation::ViewConversation)?;
    let conversation = joined_conversation(&state, &id, &auth.user.id).await?;
    Ok(Json(conversation_view(&state, &conversation, &auth.user.id).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/chat/conversations/{id}/messages",
    tag = "chat",
    security(("bearer" = [])),
    params(("id" = String, Path, description = "Conversation id")),
    responses(
        (status = 200, description = "Messages in send order", body = Vec<MessageResponse>),
        (status = 403, description = "Caller is not a participant"),
        (status = 404, description = "Unknown conversation"),
    )
)]
pub async fn list_messages(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Vec<MessageResponse>>, ServerError> {
    auth.authorize(Operation::ViewConversation)?;
    joined_conversation(&state, &id, &auth.user.id).await?;
    let participants = state.store.participants(&id).await?;
    let messages = state.store.list_messages(&id).await?;
    let name_of = |sender_id: &str| {
        participants
            .iter()
            .find(|u| u.id == sender_id)
            .map(|u| u.display_name())
            .unwrap_or_default()
    };
    Ok(Json(messages.iter().map(|m| m.to_response(name_of(&m.sender_id))).collect()))
}

// ── messages ──────────────────────────────────────────────────────────────────

/// Post a message, as JSON or as a multipart form carrying a file.
///
/// The message row is committed before any notification work. Fan-out
/// failures are logged and never change the response.
#[utoipa::path(
    post,
    path = "/api/v1/chat/conversations/{id}/send_message",
    tag = "chat",
    security(("bearer" = [])),
    params(("id" = String, Path, description = "Conversation id")),
    request_body(content(
        (SendMessageRequest = "application/json"),
        (SendMessageUpload = "multipart/form-data")
    )),
    responses(
        (status = 200, description = "Message stored", body = MessageResponse),
        (status = 400, description = "Empty message or oversized file"),
        (status = 403, description = "Caller is not a participant"),
        (status = 404, description = "Unknown conversation"),
    )
)]
pub async fn send_message(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
    req: Request,
) -> Result<Json<MessageResponse>, ServerError> {
    auth.authorize(Operation::SendMessage)?;
    joined_conversation(&state, &id, &auth.user.id).await?;

    let is_multipart = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("multipart/form-data"));
    let (content, upload) = if is_multipart {
        let multipart = Multipart::from_request(req, &state)
            .await
            .map_err(|e| ServerError::BadRequest(e.body_text()))?;
        read_multipart(multipart, state.config.max_upload_bytes).await?
    } else {
        let Json(body) = Json::<SendMessageRequest>::from_request(req, &state).await?;
        (body.content, None)
    };

    if content.trim().is_empty() && upload.is_none() {
        return Err(ServerError::BadRequest("Message must contain text or a file.".into()));
    }

    let file_path = match &upload {
        Some(upload) => Some(uploads::store(&state.config.upload_dir, CHAT_FILES_DIR, upload).await?),
        None => None,
    };
    let now = Utc::now();
    let message = Message {
        id: Uuid::new_v4().to_string(),
        conversation_id: id.clone(),
        sender_id: auth.user.id.clone(),
        content,
        file_path,
        file_name: upload.as_ref().map(|u| u.name.clone()),
        file_type: upload.map(|u| u.content_type),
        is_read: false,
        read_at: None,
        created_at: now,
    };
    state.store.insert_message(message.clone()).await?;
    state.store.touch_conversation(&id, now).await?;

    let fan_out = notify::fan_out(&state, &auth.user, &message).await;
    info!(
        conversation = %id,
        message = %message.id,
        notified = fan_out.notified.len(),
        emails_sent = fan_out.emails_sent,
        emails_failed = fan_out.emails_failed,
        "message sent"
    );

    Ok(Json(message.to_response(auth.user.display_name())))
}

/// Mark a message from someone else as read. Repeated calls keep the first
/// read time.
#[utoipa::path(
    post,
    path = "/api/v1/chat/messages/{id}/mark_as_read",
    tag = "chat",
    security(("bearer" = [])),
    params(("id" = String, Path, description = "Message id")),
    responses(
        (status = 200, description = "Message with its read state", body = MessageResponse),
        (status = 403, description = "Caller is not a participant"),
        (status = 404, description = "Unknown message"),
    )
)]
pub async fn mark_message_read(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ServerError> {
    auth.authorize(Operation::MarkMessageRead)?;
    let message = state
        .store
        .get_message(&id)
        .await?
        .ok_or_else(|| ServerError::NotFound(format!("message {id} not found")))?;
    joined_conversation(&state, &message.conversation_id, &auth.user.id).await?;

    if message.sender_id == auth.user.id || message.is_read {
        return Ok(Json(message_view(&state, &message).await?));
    }
    state.store.mark_message_read(&id, Utc::now()).await?;
    let message = state
        .store
        .get_message(&id)
        .await?
        .ok_or_else(|| ServerError::NotFound(format!("message {id} not found")))?;
    Ok(Json(message_view(&state, &message).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/chat/messages/{id}/download_file",
    tag = "chat",
    security(("bearer" = [])),
    params(("id" = String, Path, description = "Message id")),
    responses(
        (status = 200, description = "The attachment", content_type = "application/octet-stream"),
        (status = 400, description = "Message has no file"),
        (status = 403, description = "Caller is not a participant"),
        (status = 404, description = "Unknown message or missing file"),
    )
)]
pub async fn download_file(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ServerError> {
    auth.authorize(Operation::DownloadFile)?;
    let message = state
        .store
        .get_message(&id)
        .await?
        .ok_or_else(|| ServerError::NotFound(format!("message {id} not found")))?;
    joined_conversation(&state, &message.conversation_id, &auth.user.id).await?;

    let Some(relative) = message.file_path.as_deref() else {
        return Err(ServerError::BadRequest("No file attached to this message.".into()));
    };
    let bytes = uploads::load(&state.config.upload_dir, relative).await?;

    let name = sanitize_filename(message.file_name.as_deref().unwrap_or("download"));
    let content_type = message
        .file_type
        .clone()
        .unwrap_or_else(|| "application/octet-stream".to_owned());
    let headers = [
        (header::CONTENT_TYPE, content_type),
        (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{name}\"")),
    ];
    Ok((headers, bytes))
}

// ── notifications ─────────────────────────────────────────────────────────────

#[utoipa::path(
    get,
    path = "/api/v1/chat/notifications",
    tag = "chat",
    security(("bearer" = [])),
    responses((status = 200, description = "Caller's notifications, newest first", body = Vec<NotificationResponse>))
)]
pub async fn list_notifications(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<Vec<NotificationResponse>>, ServerError> {
    auth.authorize(Operation::ViewNotifications)?;
    let notifications = state.store.list_notifications(&auth.user.id, false).await?;
    Ok(Json(notifications.iter().map(Notification::to_response).collect()))
}

#[utoipa::path(
    get,
    path = "/api/v1/chat/notifications/unread_count",
    tag = "chat",
    security(("bearer" = [])),
    responses((status = 200, description = "Unread notifications", body = UnreadCountResponse))
)]
pub async fn unread_count(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<UnreadCountResponse>, ServerError> {
    auth.authorize(Operation::ViewNotifications)?;
    let unread_count = state.store.unread_notification_count(&auth.user.id).await?;
    Ok(Json(UnreadCountResponse { unread_count }))
}

#[utoipa::path(
    post,
    path = "/api/v1/chat/notifications/{id}/mark_as_read",
    tag = "chat",
    security(("bearer" = [])),
    params(("id" = String, Path, description = "Notification id")),
    responses(
        (status = 200, description = "Notification with its read state", body = NotificationResponse),
        (status = 404, description = "Unknown notification or someone else's"),
    )
)]
pub async fn mark_notification_read(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<NotificationResponse>, ServerError> {
    auth.authorize(Operation::MarkNotificationRead)?;
    let owned = |n: &Notification| n.recipient_id == auth.user.id;
    let not_found = || ServerError::NotFound(format!("notification {id} not found"));

    let notification = state.store.get_notification(&id).await?.filter(owned).ok_or_else(not_found)?;
    if notification.is_read {
        return Ok(Json(notification.to_response()));
    }
    state.store.mark_notification_read(&id, Utc::now()).await?;
    let notification = state.store.get_notification(&id).await?.ok_or_else(not_found)?;
    Ok(Json(notification.to_response()))
}

#[utoipa::path(
    post,
    path = "/api/v1/chat/notifications/mark_all_as_read",
    tag = "chat",
    security(("bearer" = [])),
    responses((status = 200, description = "Everything marked read", body = MarkAllReadResponse))
)]
pub async fn mark_all_read(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<MarkAllReadResponse>, ServerError> {
    auth.authorize(Operation::MarkNotificationRead)?;
    let updated = state.store.mark_all_notifications_read(&auth.user.id, Utc::now()).await?;
    Ok(Json(MarkAllReadResponse {
        message: format!("{updated} notifications marked as read"),
        updated,
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/chat/users",
    tag = "chat",
    security(("bearer" = [])),
    responses((status = 200, description = "Every other active user", body = Vec<ParticipantResponse>))
)]
pub async fn list_users(
    state: State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<Vec<ParticipantResponse>>, ServerError> {
    available_users(state, auth).await
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::Config;
    use crate::entities::User;
    use crate::entities::message::test::new_message;
    use crate::entities::user::test::new_user;
    use crate::inference::fake::ScriptedClient;
    use crate::mail::fake::RecordingMailer;
    use crate::routes::test_support::{body_json, call, get, json_request, login_as};
    use crate::state::test_support::{state, state_with};
    use axum::body::Body;
    use http_body_util::BodyExt;
    use serde_json::json;
    use tracing_test::traced_test;

    /// A conversation between `users`, each logged in. Returns the tokens in
    /// the same order.
    async fn conversation_with(state: &Arc<AppState>, users: &[User]) -> (String, Vec<String>) {
        let mut tokens = Vec::new();
        for user in users {
            tokens.push(login_as(state, user).await);
        }
        let now = Utc::now();
        let conversation = Conversation { id: Uuid::new_v4().to_string(), created_at: now, updated_at: now };
        let ids: Vec<String> = users.iter().map(|u| u.id.clone()).collect();
        state.store.create_conversation(conversation.clone(), &ids).await.unwrap();
        (conversation.id, tokens)
    }

    fn send(conversation: &str, token: &str, content: &str) -> Request {
        json_request(
            "POST",
            &format!("/api/v1/chat/conversations/{conversation}/send_message"),
            Some(token),
            json!({ "content": content }),
        )
    }

    #[tokio::test]
    async fn message_notifies_everyone_but_the_sender() {
        let mailer = Arc::new(RecordingMailer::default());
        let state = state_with(mailer.clone(), Arc::new(ScriptedClient::unconfigured())).await;
        let (a, b, c) = (new_user("ann"), new_user("bob"), new_user("cy"));
        let (conversation, tokens) = conversation_with(&state, &[a.clone(), b.clone(), c.clone()]).await;

        let resp = call(&state, send(&conversation, &tokens[0], "hello all")).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        assert_eq!(body["content"], "hello all");
        assert_eq!(body["sender_id"], a.id);

        for (user, expected) in [(&a, 0), (&b, 1), (&c, 1)] {
            let rows = state.store.list_notifications(&user.id, false).await.unwrap();
            assert_eq!(rows.len(), expected, "notifications for {}", user.username);
        }
        assert_eq!(mailer.emails().len(), 2);
        assert!(mailer.emails().iter().all(|e| !e.to.contains(&a.email)));
    }

    #[tokio::test]
    #[traced_test]
    async fn broken_mailer_still_stores_the_message() {
        let state = state_with(
            Arc::new(RecordingMailer::failing()),
            Arc::new(ScriptedClient::unconfigured()),
        )
        .await;
        let (conversation, tokens) = conversation_with(&state, &[new_user("ann"), new_user("bob")]).await;

        let resp = call(&state, send(&conversation, &tokens[0], "still here")).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["content"], "still here");

        let stored = state.store.list_messages(&conversation).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert!(logs_contain("email not sent"));
    }

    #[tokio::test]
    async fn outsiders_cannot_read_or_post() {
        let state = state().await;
        let (conversation, _) = conversation_with(&state, &[new_user("ann"), new_user("bob")]).await;
        let outsider = login_as(&state, &new_user("eve")).await;

        let resp = call(&state, send(&conversation, &outsider, "hi")).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        let resp = call(
            &state,
            get(&format!("/api/v1/chat/conversations/{conversation}/messages"), Some(&outsider)),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        let resp = call(&state, get("/api/v1/chat/conversations/nope", Some(&outsider))).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert!(state.store.list_messages(&conversation).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_message_is_rejected() {
        let state = state().await;
        let (conversation, tokens) = conversation_with(&state, &[new_user("ann"), new_user("bob")]).await;
        let resp = call(&state, send(&conversation, &tokens[0], "   ")).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn mark_as_read_keeps_the_first_timestamp() {
        let state = state().await;
        let (a, b) = (new_user("ann"), new_user("bob"));
        let (conversation, tokens) = conversation_with(&state, &[a.clone(), b.clone()]).await;
        let message = new_message(&conversation, &a.id, "ping");
        state.store.insert_message(message.clone()).await.unwrap();
        let uri = format!("/api/v1/chat/messages/{}/mark_as_read", message.id);

        // The sender reading their own message changes nothing.
        let own = body_json(call(&state, json_request("POST", &uri, Some(&tokens[0]), json!({}))).await).await;
        assert_eq!(own["is_read"], false);

        let first = body_json(call(&state, json_request("POST", &uri, Some(&tokens[1]), json!({}))).await).await;
        assert_eq!(first["is_read"], true);
        let second = body_json(call(&state, json_request("POST", &uri, Some(&tokens[1]), json!({}))).await).await;
        assert_eq!(second["is_read"], true);
        assert_eq!(first["read_at"], second["read_at"]);
    }

    #[tokio::test]
    async fn conversation_listing_counts_unread() {
        let state = state().await;
        let (a, b) = (new_user("ann"), new_user("bob"));
        let (conversation, tokens) = conversation_with(&state, &[a.clone(), b.clone()]).await;
        call(&state, send(&conversation, &tokens[0], "one")).await;
        call(&state, send(&conversation, &tokens[0], "two")).await;

        let list = body_json(call(&state, get("/api/v1/chat/conversations", Some(&tokens[1]))).await).await;
        assert_eq!(list.as_array().unwrap().len(), 1);
        assert_eq!(list[0]["unread_count"], 2);
        assert_eq!(list[0]["last_message"]["content"], "two");
        assert_eq!(list[0]["participants"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn creating_a_conversation_twice_reuses_it() {
        let state = state().await;
        let bob = new_user("bob");
        state.store.create_user(bob.clone()).await.unwrap();
        let token = login_as(&state, &new_user("ann")).await;
        let body = json!({ "participant_id": bob.id });

        let first = call(&state, json_request("POST", "/api/v1/chat/conversations", Some(&token), body.clone())).await;
        assert_eq!(first.status(), StatusCode::CREATED);
        let first = body_json(first).await;
        let second = call(&state, json_request("POST", "/api/v1/chat/conversations", Some(&token), body)).await;
        assert_eq!(second.status(), StatusCode::OK);
        assert_eq!(body_json(second).await["id"], first["id"]);

        let unknown = call(
            &state,
            json_request("POST", "/api/v1/chat/conversations", Some(&token), json!({ "participant_id": "ghost" })),
        )
        .await;
        assert_eq!(unknown.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn available_users_excludes_the_caller() {
        let state = state().await;
        let ann = new_user("ann");
        state.store.create_user(new_user("bob")).await.unwrap();
        let token = login_as(&state, &ann).await;
        for uri in ["/api/v1/chat/conversations/available_users", "/api/v1/chat/users"] {
            let users = body_json(call(&state, get(uri, Some(&token))).await).await;
            let names: Vec<&str> = users.as_array().unwrap().iter().filter_map(|u| u["username"].as_str()).collect();
            assert_eq!(names, ["bob"]);
        }
    }

    #[tokio::test]
    async fn attachment_upload_and_download() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = state().await;
        let mut config = Config::for_tests();
        config.upload_dir = dir.path().to_path_buf();
        Arc::get_mut(&mut state).unwrap().config = Arc::new(config);
        let (conversation, tokens) = conversation_with(&state, &[new_user("ann"), new_user("bob")]).await;

        let boundary = "folio-boundary";
        let body = format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"content\"\r\n\r\nmy cv\r\n\
             --{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"my cv.pdf\"\r\n\
             Content-Type: application/pdf\r\n\r\nPDFDATA\r\n--{boundary}--\r\n"
        );
        let req = Request::builder()
            .method("POST")
            .uri(format!("/api/v1/chat/conversations/{conversation}/send_message"))
            .header(header::AUTHORIZATION, format!("Bearer {}", tokens[0]))
            .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={boundary}"))
            .body(Body::from(body))
            .unwrap();
        let resp = call(&state, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let sent = body_json(resp).await;
        assert_eq!(sent["has_file"], true);
        assert_eq!(sent["file_name"], "my cv.pdf");
        assert_eq!(sent["content"], "my cv");

        let stored = state.store.list_messages(&conversation).await.unwrap();
        let path = stored[0].file_path.clone().unwrap();
        assert!(path.starts_with("chat_files/"));
        assert!(path.ends_with("_my_cv.pdf"));

        let uri = sent["file_url"].as_str().unwrap().to_owned();
        let resp = call(&state, get(&uri, Some(&tokens[1]))).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"my_cv.pdf\""
        );
        assert_eq!(resp.headers()[header::CONTENT_TYPE], "application/pdf");
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"PDFDATA");
    }

    #[tokio::test]
    async fn download_without_file_is_400() {
        let state = state().await;
        let ann = new_user("ann");
        let (conversation, tokens) = conversation_with(&state, &[ann.clone()]).await;
        let message = new_message(&conversation, &ann.id, "text only");
        state.store.insert_message(message.clone()).await.unwrap();
        let resp = call(
            &state,
            get(&format!("/api/v1/chat/messages/{}/download_file", message.id), Some(&tokens[0])),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn notifications_are_private_and_can_be_cleared() {
        let state = state().await;
        let (a, b) = (new_user("ann"), new_user("bob"));
        let (conversation, tokens) = conversation_with(&state, &[a.clone(), b.clone()]).await;
        call(&state, send(&conversation, &tokens[0], "one")).await;
        call(&state, send(&conversation, &tokens[0], "two")).await;

        let count = body_json(call(&state, get("/api/v1/chat/notifications/unread_count", Some(&tokens[1]))).await).await;
        assert_eq!(count["unread_count"], 2);

        let list = body_json(call(&state, get("/api/v1/chat/notifications", Some(&tokens[1]))).await).await;
        let first_id = list[0]["id"].as_str().unwrap().to_owned();
        assert_eq!(list[0]["type"], "message");
        let uri = format!("/api/v1/chat/notifications/{first_id}/mark_as_read");

        let foreign = call(&state, json_request("POST", &uri, Some(&tokens[0]), json!({}))).await;
        assert_eq!(foreign.status(), StatusCode::NOT_FOUND);
        let own = call(&state, json_request("POST", &uri, Some(&tokens[1]), json!({}))).await;
        assert_eq!(body_json(own).await["is_read"], true);

        let all = call(
            &state,
            json_request("POST", "/api/v1/chat/notifications/mark_all_as_read", Some(&tokens[1]), json!({})),
        )
        .await;
        assert_eq!(body_json(all).await["updated"], 1);
        let count = body_json(call(&state, get("/api/v1/chat/notifications/unread_count", Some(&tokens[1]))).await).await;
        assert_eq!(count["unread_count"], 0);
    }
}
