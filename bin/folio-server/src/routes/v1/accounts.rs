//! Account routes: registration, login/logout, profile, password flows,
//! email verification and the admin user views.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Router;
use chrono::Utc;
use tracing::{info, warn};
use utoipa::OpenApi;
use uuid::Uuid;
use validator::Validate;

use crate::entities::user::ProfileUpdate;
use crate::entities::{ActivityStore, ActivityType, TokenStore, User, UserActivity, UserStore};
use crate::error::ServerError;
use crate::handlers::credentials::{
    generate_token, hash_password_blocking, hash_token, verify_password_blocking,
};
use crate::mail::{self, Mailer};
use crate::middleware::{AuthUser, ClientMeta, Json, MaybeUser, Operation};
use crate::schemas::v1::MessageBody;
use crate::schemas::v1::accounts::{
    ActivityQuery, ActivityResponse, AdminUserUpdate, ChangePasswordRequest, EmailRequest,
    LoginRequest, LoginResponse, ProfileUpdateRequest, RegisterRequest, RegisterResponse,
    ResetPasswordRequest, UserResponse, VerifyEmailResponse,
};
use crate::state::AppState;

const DEFAULT_ACTIVITY_LIMIT: i64 = 100;
const INVALID_CREDENTIALS: &str = "Invalid credentials or account issue. Please try again.";
const INVALID_RESET: &str = "Invalid or expired token";

#[derive(OpenApi)]
#[openapi(
    paths(
        register, login, logout, get_me, update_me, change_password, forgot_password,
        reset_password, verify_email, resend_verification, list_users, get_user,
        update_user, deactivate_user, list_activities
    ),
    components(schemas(
        RegisterRequest, RegisterResponse, LoginRequest, LoginResponse, UserResponse,
        ProfileUpdateRequest, ChangePasswordRequest, EmailRequest, ResetPasswordRequest,
        VerifyEmailResponse, AdminUserUpdate, ActivityResponse, MessageBody
    ))
)]
pub struct AccountsApi;

/// Register account routes.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(get_me).patch(update_me))
        .route("/change-password", post(change_password))
        .route("/forgot-password", post(forgot_password))
        .route("/reset-password", post(reset_password))
        .route("/verify-email/{token}", get(verify_email))
        .route("/resend-verification", post(resend_verification))
        .route("/users", get(list_users))
        .route("/users/{id}", get(get_user).patch(update_user).delete(deactivate_user))
        .route("/activities", get(list_activities))
}

// ── helpers ───────────────────────────────────────────────────────────────────

/// Append an audit row. A failed insert is logged, never surfaced.
async fn record(
    state: &AppState,
    user_id: &str,
    kind: ActivityType,
    meta: &ClientMeta,
    details: &str,
) {
    let activity = UserActivity {
        id: Uuid::new_v4().to_string(),
        user_id: user_id.to_owned(),
        activity_type: kind.to_string(),
        ip_address: meta.ip.clone(),
        user_agent: meta.user_agent.clone(),
        details: details.to_owned(),
        created_at: Utc::now(),
    };
    if let Err(e) = state.store.record_activity(activity).await {
        warn!(user = %user_id, activity = %kind, error = %e, "failed to record user activity");
    }
}

/// Create a login token for `user_id` and return the raw value.
async fn issue_token(state: &AppState, user_id: &str) -> Result<String, ServerError> {
    let token = generate_token();
    let expires_at = Utc::now() + state.config.auth.token_ttl;
    state
        .store
        .insert_auth_token(&hash_token(&token), user_id, expires_at)
        .await?;
    Ok(token)
}

async fn load_user(state: &AppState, id: &str) -> Result<User, ServerError> {
    state
        .store
        .get_user(id)
        .await?
        .ok_or_else(|| ServerError::NotFound(format!("user {id} not found")))
}

// ── registration & login ──────────────────────────────────────────────────────

#[utoipa::path(
    post,
    path = "/api/v1/accounts/register",
    tag = "accounts",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = RegisterResponse),
        (status = 400, description = "Validation error or duplicate account"),
    )
)]
pub async fn register(
    State(state): State<Arc<AppState>>,
    caller: MaybeUser,
    meta: ClientMeta,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), ServerError> {
    Operation::Register.authorize(caller.role())?;
    req.validate()?;
    if state.store.find_user_by_email(&req.email).await?.is_some() {
        return Err(ServerError::BadRequest("A user with this email already exists.".into()));
    }

    let password_hash =
        hash_password_blocking(req.password, state.config.auth.password_iterations).await?;
    let verification_token = Uuid::new_v4().to_string();
    let now = Utc::now();
    let user = User {
        id: Uuid::new_v4().to_string(),
        email: req.email.trim().to_lowercase(),
        username: req.username,
        first_name: req.first_name,
        last_name: req.last_name,
        password_hash,
        is_staff: false,
        is_active: true,
        is_email_verified: false,
        email_verification_token: Some(verification_token.clone()),
        email_notifications_enabled: true,
        created_at: now,
        updated_at: now,
    };
    state.store.create_user(user.clone()).await?;
    info!(user = %user.id, "user registered");

    let sent = match state
        .templates
        .verify_email(&user.email, user.greeting_name(), &verification_token)
    {
        Ok(email) => state.mailer.send(email).await,
        Err(e) => Err(e),
    };
    let email_sent = mail::log_outcome("verify_email", &sent);

    record(&state, &user.id, ActivityType::Registration, &meta, "").await;

    let message = if email_sent {
        "Registration successful. Please check your email to verify your account."
    } else {
        "Registration successful. Your account has been created, but we could not send a verification email. You can still log in."
    };
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse { message: message.into(), email: user.email }),
    ))
}

#[utoipa::path(
    post,
    path = "/api/v1/accounts/login",
    tag = "accounts",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = LoginResponse),
        (status = 401, description = "Invalid credentials"),
    )
)]
pub async fn login(
    State(state): State<Arc<AppState>>,
    caller: MaybeUser,
    meta: ClientMeta,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ServerError> {
    Operation::Login.authorize(caller.role())?;
    req.validate()?;
    let Some(user) = state.store.find_user_by_email(&req.email).await? else {
        return Err(ServerError::Unauthorized(INVALID_CREDENTIALS.into()));
    };
    let valid = verify_password_blocking(req.password, user.password_hash.clone()).await?;
    if !valid || !user.is_active {
        warn!(user = %user.id, "login rejected");
        return Err(ServerError::Unauthorized(INVALID_CREDENTIALS.into()));
    }
    if state.config.auth.require_email_verification && !user.is_email_verified {
        return Err(ServerError::Unauthorized(
            "Please verify your email address before logging in.".into(),
        ));
    }

    let access = issue_token(&state, &user.id).await?;
    record(&state, &user.id, ActivityType::Login, &meta, "").await;
    info!(user = %user.id, "user logged in");
    Ok(Json(LoginResponse { access, user: user.to_response() }))
}

#[utoipa::path(
    post,
    path = "/api/v1/accounts/logout",
    tag = "accounts",
    security(("bearer" = [])),
    responses(
        (status = 205, description = "Token revoked"),
        (status = 401, description = "Not authenticated"),
    )
)]
pub async fn logout(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    meta: ClientMeta,
) -> Result<StatusCode, ServerError> {
    auth.authorize(Operation::Logout)?;
    state.store.delete_auth_token(&auth.token_hash).await?;
    record(&state, &auth.user.id, ActivityType::Logout, &meta, "").await;
    Ok(StatusCode::RESET_CONTENT)
}

// ── profile ───────────────────────────────────────────────────────────────────

#[utoipa::path(
    get,
    path = "/api/v1/accounts/me",
    tag = "accounts",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Current user", body = UserResponse),
        (status = 401, description = "Not authenticated"),
    )
)]
pub async fn get_me(auth: AuthUser) -> Result<Json<UserResponse>, ServerError> {
    auth.authorize(Operation::ViewProfile)?;
    Ok(Json(auth.user.to_response()))
}

#[utoipa::path(
    patch,
    path = "/api/v1/accounts/me",
    tag = "accounts",
    security(("bearer" = [])),
    request_body = ProfileUpdateRequest,
    responses(
        (status = 200, description = "Profile updated", body = UserResponse),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Not authenticated"),
    )
)]
pub async fn update_me(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    meta: ClientMeta,
    Json(req): Json<ProfileUpdateRequest>,
) -> Result<Json<UserResponse>, ServerError> {
    auth.authorize(Operation::UpdateProfile)?;
    req.validate()?;
    let update = ProfileUpdate {
        username: req.username,
        first_name: req.first_name,
        last_name: req.last_name,
        email_notifications_enabled: req.email_notifications_enabled,
    };
    state.store.update_profile(&auth.user.id, update).await?;
    record(&state, &auth.user.id, ActivityType::ProfileUpdate, &meta, "").await;
    Ok(Json(load_user(&state, &auth.user.id).await?.to_response()))
}

#[utoipa::path(
    post,
    path = "/api/v1/accounts/change-password",
    tag = "accounts",
    security(("bearer" = [])),
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = MessageBody),
        (status = 400, description = "Wrong old password or weak new password"),
    )
)]
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    meta: ClientMeta,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<Json<MessageBody>, ServerError> {
    auth.authorize(Operation::ChangePassword)?;
    req.validate()?;
    if !verify_password_blocking(req.old_password, auth.user.password_hash.clone()).await? {
        return Err(ServerError::BadRequest("Incorrect old password".into()));
    }
    let hash = hash_password_blocking(req.new_password, state.config.auth.password_iterations).await?;
    state.store.set_password_hash(&auth.user.id, &hash).await?;
    record(&state, &auth.user.id, ActivityType::PasswordChange, &meta, "").await;
    Ok(Json(MessageBody::new("Password updated successfully")))
}

// ── password reset ────────────────────────────────────────────────────────────

#[utoipa::path(
    post,
    path = "/api/v1/accounts/forgot-password",
    tag = "accounts",
    request_body = EmailRequest,
    responses(
        (status = 200, description = "Generic acknowledgement", body = MessageBody),
        (status = 400, description = "Email missing"),
    )
)]
pub async fn forgot_password(
    State(state): State<Arc<AppState>>,
    caller: MaybeUser,
    Json(req): Json<EmailRequest>,
) -> Result<Json<MessageBody>, ServerError> {
    Operation::ForgotPassword.authorize(caller.role())?;
    if req.email.trim().is_empty() {
        return Err(ServerError::BadRequest("Email is required".into()));
    }
    let ack = MessageBody::new(
        "If an account with this email exists, a password reset link has been sent.",
    );

    let Some(user) = state.store.find_user_by_email(&req.email).await?.filter(|u| u.is_active)
    else {
        info!("password reset requested for unknown or inactive account");
        return Ok(Json(ack));
    };

    let token = generate_token();
    let ttl = state.config.auth.reset_token_ttl;
    state
        .store
        .insert_reset_token(&hash_token(&token), &user.id, Utc::now() + ttl)
        .await?;
    let sent = match state.templates.password_reset(
        &user.email,
        user.greeting_name(),
        &token,
        ttl.num_hours(),
    ) {
        Ok(email) => state.mailer.send(email).await,
        Err(e) => Err(e),
    };
    mail::log_outcome("password_reset", &sent);
    Ok(Json(ack))
}

#[utoipa::path(
    post,
    path = "/api/v1/accounts/reset-password",
    tag = "accounts",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password reset", body = MessageBody),
        (status = 400, description = "Missing field, weak password or invalid token"),
    )
)]
pub async fn reset_password(
    State(state): State<Arc<AppState>>,
    caller: MaybeUser,
    meta: ClientMeta,
    Json(req): Json<ResetPasswordRequest>,
) -> Result<Json<MessageBody>, ServerError> {
    Operation::ResetPassword.authorize(caller.role())?;
    if req.email.trim().is_empty() || req.token.is_empty() || req.new_password.is_empty() {
        return Err(ServerError::BadRequest(
            "Email, token and new password are required".into(),
        ));
    }
    req.validate()?;

    let Some(user) = state.store.find_user_by_email(&req.email).await? else {
        return Err(ServerError::BadRequest(INVALID_RESET.into()));
    };
    let now = Utc::now();
    let token_hash = hash_token(&req.token);
    let owner = state.store.reset_token_owner(&token_hash, now).await?;
    if owner.as_deref() != Some(user.id.as_str()) {
        warn!(user = %user.id, "invalid password reset token");
        return Err(ServerError::BadRequest(INVALID_RESET.into()));
    }

    let hash = hash_password_blocking(req.new_password, state.config.auth.password_iterations).await?;
    if !state.store.redeem_reset_token(&token_hash, &user.id, &hash, now).await? {
        warn!(user = %user.id, "password reset token redeemed concurrently");
        return Err(ServerError::BadRequest(INVALID_RESET.into()));
    }
    let revoked = state.store.delete_user_tokens(&user.id).await?;
    info!(user = %user.id, revoked, "password reset");
    record(&state, &user.id, ActivityType::PasswordReset, &meta, "").await;

    let sent = match state.templates.password_reset_success(&user.email, user.greeting_name()) {
        Ok(email) => state.mailer.send(email).await,
        Err(e) => Err(e),
    };
    mail::log_outcome("password_reset_success", &sent);
    Ok(Json(MessageBody::new("Password reset successful")))
}

// ── email verification ────────────────────────────────────────────────────────

#[utoipa::path(
    get,
    path = "/api/v1/accounts/verify-email/{token}",
    tag = "accounts",
    params(("token" = String, Path, description = "Verification token from the email link")),
    responses(
        (status = 200, description = "Email verified; login token issued", body = VerifyEmailResponse),
        (status = 400, description = "Unknown or already used token"),
    )
)]
pub async fn verify_email(
    State(state): State<Arc<AppState>>,
    caller: MaybeUser,
    meta: ClientMeta,
    Path(token): Path<String>,
) -> Result<Json<VerifyEmailResponse>, ServerError> {
    Operation::VerifyEmail.authorize(caller.role())?;
    let Some(user) = state.store.find_user_by_verification_token(&token).await? else {
        return Err(ServerError::BadRequest(
            "Invalid or expired verification link. Please request a new verification email."
                .into(),
        ));
    };
    state.store.mark_email_verified(&user.id).await?;
    info!(user = %user.id, "email verified");

    let sent = match state.templates.verification_success(&user.email, user.greeting_name()) {
        Ok(email) => state.mailer.send(email).await,
        Err(e) => Err(e),
    };
    mail::log_outcome("verification_success", &sent);

    let access = issue_token(&state, &user.id).await?;
    record(&state, &user.id, ActivityType::EmailVerification, &meta, "").await;
    let user = load_user(&state, &user.id).await?;
    Ok(Json(VerifyEmailResponse {
        message: "Email verified successfully. You can now login.".into(),
        token: access,
        user: user.to_response(),
    }))
}

#[utoipa::path(
    post,
    path = "/api/v1/accounts/resend-verification",
    tag = "accounts",
    request_body = EmailRequest,
    responses(
        (status = 200, description = "Verification email sent (or generic acknowledgement)", body = MessageBody),
        (status = 400, description = "Email missing"),
        (status = 500, description = "Email could not be sent"),
    )
)]
pub async fn resend_verification(
    State(state): State<Arc<AppState>>,
    caller: MaybeUser,
    meta: ClientMeta,
    Json(req): Json<EmailRequest>,
) -> Result<Json<MessageBody>, ServerError> {
    Operation::ResendVerification.authorize(caller.role())?;
    if req.email.trim().is_empty() {
        return Err(ServerError::BadRequest("Email is required".into()));
    }
    let Some(user) = state.store.find_user_by_email(&req.email).await? else {
        return Ok(Json(MessageBody::new(
            "If an account with this email exists, a verification email has been sent",
        )));
    };
    if user.is_email_verified {
        return Ok(Json(MessageBody::new("Email already verified. Please login.")));
    }

    let token = Uuid::new_v4().to_string();
    state.store.set_verification_token(&user.id, &token).await?;
    let sent = match state.templates.verify_email(&user.email, user.greeting_name(), &token) {
        Ok(email) => state.mailer.send(email).await,
        Err(e) => Err(e),
    };
    if !mail::log_outcome("verify_email", &sent) {
        return Err(ServerError::Internal("failed to resend verification email".into()));
    }
    record(
        &state,
        &user.id,
        ActivityType::EmailVerification,
        &meta,
        "Verification email resent",
    )
    .await;
    Ok(Json(MessageBody::new("Verification email has been resent")))
}

// ── admin ─────────────────────────────────────────────────────────────────────

#[utoipa::path(
    get,
    path = "/api/v1/accounts/users",
    tag = "accounts",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "All users", body = Vec<UserResponse>),
        (status = 403, description = "Staff only"),
    )
)]
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<Vec<UserResponse>>, ServerError> {
    auth.authorize(Operation::ListUsers)?;
    let users = state.store.list_users().await?;
    Ok(Json(users.iter().map(User::to_response).collect()))
}

#[utoipa::path(
    get,
    path = "/api/v1/accounts/users/{id}",
    tag = "accounts",
    security(("bearer" = [])),
    params(("id" = String, Path, description = "User id")),
    responses(
        (status = 200, description = "User", body = UserResponse),
        (status = 403, description = "Staff only"),
        (status = 404, description = "Unknown user"),
    )
)]
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<UserResponse>, ServerError> {
    auth.authorize(Operation::ManageUser)?;
    Ok(Json(load_user(&state, &id).await?.to_response()))
}

#[utoipa::path(
    patch,
    path = "/api/v1/accounts/users/{id}",
    tag = "accounts",
    security(("bearer" = [])),
    params(("id" = String, Path, description = "User id")),
    request_body = AdminUserUpdate,
    responses(
        (status = 200, description = "User updated", body = UserResponse),
        (status = 403, description = "Staff only"),
        (status = 404, description = "Unknown user"),
    )
)]
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
    Json(req): Json<AdminUserUpdate>,
) -> Result<Json<UserResponse>, ServerError> {
    auth.authorize(Operation::ManageUser)?;
    req.validate()?;
    load_user(&state, &id).await?;
    let update = ProfileUpdate {
        username: req.username,
        first_name: req.first_name,
        last_name: req.last_name,
        email_notifications_enabled: req.email_notifications_enabled,
    };
    state.store.update_profile(&id, update).await?;
    state.store.set_account_flags(&id, req.is_active, req.is_staff).await?;
    if req.is_active == Some(false) {
        state.store.delete_user_tokens(&id).await?;
    }
    Ok(Json(load_user(&state, &id).await?.to_response()))
}

/// Accounts are never hard-deleted: the user is deactivated and logged out.
#[utoipa::path(
    delete,
    path = "/api/v1/accounts/users/{id}",
    tag = "accounts",
    security(("bearer" = [])),
    params(("id" = String, Path, description = "User id")),
    responses(
        (status = 204, description = "User deactivated"),
        (status = 403, description = "Staff only"),
        (status = 404, description = "Unknown user"),
    )
)]
pub async fn deactivate_user(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ServerError> {
    auth.authorize(Operation::ManageUser)?;
    load_user(&state, &id).await?;
    state.store.set_account_flags(&id, Some(false), None).await?;
    let revoked = state.store.delete_user_tokens(&id).await?;
    info!(user = %id, by = %auth.user.id, revoked, "user deactivated");
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/v1/accounts/activities",
    tag = "accounts",
    security(("bearer" = [])),
    params(ActivityQuery),
    responses(
        (status = 200, description = "Activity log, newest first", body = Vec<ActivityResponse>),
        (status = 403, description = "Staff only"),
    )
)]
pub async fn list_activities(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Query(query): Query<ActivityQuery>,
) -> Result<Json<Vec<ActivityResponse>>, ServerError> {
    auth.authorize(Operation::ListActivities)?;
    let limit = query.limit.unwrap_or(DEFAULT_ACTIVITY_LIMIT).clamp(1, 1000);
    let rows = state
        .store
        .list_activities(query.user_id.as_deref(), limit)
        .await?;
    Ok(Json(rows.iter().map(UserActivity::to_response).collect()))
}

// ── Tests ──────────────────────────────────────────────────────────────────────
