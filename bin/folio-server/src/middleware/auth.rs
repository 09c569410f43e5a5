//! Bearer-token authentication extractors.
//!
//! Tokens are opaque strings sent as `Authorization: Bearer <token>`; the
//! SHA-256 digest is looked up in `auth_tokens`. Handlers pick the extractor
//! that matches their access rule: [`AuthUser`] rejects anonymous callers
//! with 401, [`MaybeUser`] does not.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::header;
use axum::http::request::Parts;
use chrono::Utc;

use crate::entities::{TokenStore, User};
use crate::error::ServerError;
use crate::handlers::credentials::hash_token;
use crate::middleware::access::{Operation, Role};
use crate::state::AppState;

/// An authenticated, active user.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user: User,
    /// Digest of the token that authenticated this request.
    pub token_hash: String,
}

impl AuthUser {
    pub fn role(&self) -> Role {
        if self.user.is_staff { Role::Admin } else { Role::User }
    }

    /// Fail with 403 unless this user may perform `op`.
    pub fn authorize(&self, op: Operation) -> Result<(), ServerError> {
        op.authorize(self.role())
    }
}

/// The caller's user, if a valid token was sent.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<AuthUser>);

impl MaybeUser {
    pub fn role(&self) -> Role {
        self.0.as_ref().map_or(Role::Anonymous, AuthUser::role)
    }

    pub fn user_id(&self) -> Option<&str> {
        self.0.as_ref().map(|u| u.user.id.as_str())
    }
}

fn bearer(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer ").or_else(|| v.strip_prefix("Token ")))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

async fn resolve(state: &AppState, token: &str) -> Result<Option<AuthUser>, ServerError> {
    let token_hash = hash_token(token);
    let user = state.store.find_user_by_token_hash(&token_hash, Utc::now()).await?;
    Ok(user
        .filter(|u| u.is_active)
        .map(|user| AuthUser { user, token_hash }))
}

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ServerError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer(parts).ok_or_else(|| {
            ServerError::Unauthorized("Authentication credentials were not provided.".into())
        })?;
        resolve(state, token)
            .await?
            .ok_or_else(|| ServerError::Unauthorized("Invalid or expired token.".into()))
    }
}

impl FromRequestParts<Arc<AppState>> for MaybeUser {
    type Rejection = ServerError;

    /// An invalid token is treated like no token at all.
    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        match bearer(parts) {
            Some(token) => Ok(MaybeUser(resolve(state, token).await?)),
            None => Ok(MaybeUser(None)),
        }
    }
}

/// Client address and user agent, recorded on contacts and activity rows.
#[derive(Debug, Clone, Default)]
pub struct ClientMeta {
    pub ip: Option<String>,
    pub user_agent: String,
}

impl<S: Send + Sync> FromRequestParts<S> for ClientMeta {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let forwarded = parts
            .headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(|ip| ip.trim().to_owned())
            .filter(|ip| !ip.is_empty());
        let ip = forwarded.or_else(|| {
            parts
                .extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        });
        let user_agent = parts
            .headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_owned();
        Ok(ClientMeta { ip, user_agent })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::entities::UserStore;
    use crate::entities::user::test::new_user;
    use crate::state::test_support::state;
    use axum::http::Request;

    fn parts(headers: &[(&str, &str)]) -> Parts {
        let mut req = Request::builder().uri("/");
        for (k, v) in headers {
            req = req.header(*k, *v);
        }
        req.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn missing_token_is_401() {
        let state = state().await;
        let err = AuthUser::from_request_parts(&mut parts(&[]), &state).await.unwrap_err();
        assert!(matches!(err, ServerError::Unauthorized(_)));
        let maybe = MaybeUser::from_request_parts(&mut parts(&[]), &state).await.unwrap();
        assert_eq!(maybe.role(), Role::Anonymous);
    }

    #[tokio::test]
    async fn valid_token_resolves_user() {
        let state = state().await;
        let user = new_user("ann");
        state.store.create_user(user.clone()).await.unwrap();
        state
            .store
            .insert_auth_token(&hash_token("tok"), &user.id, Utc::now() + chrono::Duration::hours(1))
            .await
            .unwrap();

        let auth = AuthUser::from_request_parts(&mut parts(&[("authorization", "Bearer tok")]), &state)
            .await
            .unwrap();
        assert_eq!(auth.user.id, user.id);
        assert_eq!(auth.role(), Role::User);
    }

    #[tokio::test]
    async fn expired_or_inactive_is_rejected() {
        let state = state().await;
        let user = new_user("ann");
        state.store.create_user(user.clone()).await.unwrap();
        state
            .store
            .insert_auth_token(&hash_token("old"), &user.id, Utc::now() - chrono::Duration::seconds(1))
            .await
            .unwrap();
        let err = AuthUser::from_request_parts(&mut parts(&[("authorization", "Bearer old")]), &state)
            .await
            .unwrap_err();
        assert!(matches!(err, ServerError::Unauthorized(_)));

        state
            .store
            .insert_auth_token(&hash_token("new"), &user.id, Utc::now() + chrono::Duration::hours(1))
            .await
            .unwrap();
        state.store.set_account_flags(&user.id, Some(false), None).await.unwrap();
        let maybe = MaybeUser::from_request_parts(&mut parts(&[("authorization", "Bearer new")]), &state)
            .await
            .unwrap();
        assert!(maybe.0.is_none());
    }

    #[tokio::test]
    async fn forwarded_for_wins_over_peer_address() {
        let mut p = parts(&[("x-forwarded-for", "203.0.113.7, 10.0.0.1"), ("user-agent", "curl/8")]);
        let meta = ClientMeta::from_request_parts(&mut p, &()).await.unwrap();
        assert_eq!(meta.ip.as_deref(), Some("203.0.113.7"));
        assert_eq!(meta.user_agent, "curl/8");
    }
}
