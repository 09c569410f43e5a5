use crate::entities::{User, UserActivity};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

/// Letters, digits and `@ . + - _`.
pub fn validate_username(value: &str) -> Result<(), ValidationError> {
    if value.chars().all(|c| c.is_alphanumeric() || "@.+-_".contains(c)) {
        Ok(())
    } else {
        Err(ValidationError::new("username")
            .with_message("Enter a valid username. Letters, digits and @/./+/-/_ only.".into()))
    }
}

fn validate_password_strength(value: &str) -> Result<(), ValidationError> {
    if value.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::new("password_numeric")
            .with_message("This password is entirely numeric.".into()));
    }
    Ok(())
}

#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "Enter a valid email address."))]
    pub email: String,
    #[validate(
        length(min = 1, max = 150, message = "Username must be 1-150 characters."),
        custom(function = "validate_username")
    )]
    pub username: String,
    #[validate(
        length(min = 8, message = "This password is too short. It must contain at least 8 characters."),
        custom(function = "validate_password_strength")
    )]
    pub password: String,
    #[validate(must_match(other = "password", message = "Password fields didn't match."))]
    pub password2: String,
    #[serde(default)]
    #[validate(length(max = 150))]
    pub first_name: String,
    #[serde(default)]
    #[validate(length(max = 150))]
    pub last_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RegisterResponse {
    pub message: String,
    pub email: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "This field is required."))]
    pub email: String,
    #[validate(length(min = 1, message = "This field is required."))]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    /// Opaque bearer token.
    pub access: String,
    pub user: UserResponse,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_staff: bool,
    pub is_active: bool,
    pub is_email_verified: bool,
    pub email_notifications_enabled: bool,
    pub date_joined: String,
}

/// `PATCH /accounts/me`; absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize, ToSchema, Validate)]
pub struct ProfileUpdateRequest {
    #[validate(length(min = 1, max = 150), custom(function = "validate_username"))]
    pub username: Option<String>,
    #[validate(length(max = 150))]
    pub first_name: Option<String>,
    #[validate(length(max = 150))]
    pub last_name: Option<String>,
    pub email_notifications_enabled: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    #[validate(
        length(min = 8, message = "This password is too short. It must contain at least 8 characters."),
        custom(function = "validate_password_strength")
    )]
    pub new_password: String,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct EmailRequest {
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema, Validate)]
pub struct ResetPasswordRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    #[validate(
        length(min = 8, message = "This password is too short. It must contain at least 8 characters."),
        custom(function = "validate_password_strength")
    )]
    pub new_password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VerifyEmailResponse {
    pub message: String,
    pub token: String,
    pub user: UserResponse,
}

/// Admin update of another account.
#[derive(Debug, Clone, Default, Deserialize, ToSchema, Validate)]
pub struct AdminUserUpdate {
    #[validate(length(min = 1, max = 150), custom(function = "validate_username"))]
    pub username: Option<String>,
    #[validate(length(max = 150))]
    pub first_name: Option<String>,
    #[validate(length(max = 150))]
    pub last_name: Option<String>,
    pub email_notifications_enabled: Option<bool>,
    pub is_active: Option<bool>,
    pub is_staff: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize, utoipa::IntoParams)]
pub struct ActivityQuery {
    /// Restrict to one user; the caller's own rows when absent.
    pub user_id: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ActivityResponse {
    pub id: String,
    pub user_id: String,
    pub activity_type: String,
    pub ip_address: Option<String>,
    pub user_agent: String,
    pub details: String,
    pub created_at: String,
}

impl User {
    pub fn to_response(&self) -> UserResponse {
        UserResponse {
            id: self.id.clone(),
            email: self.email.clone(),
            username: self.username.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            is_staff: self.is_staff,
            is_active: self.is_active,
            is_email_verified: self.is_email_verified,
            email_notifications_enabled: self.email_notifications_enabled,
            date_joined: self.created_at.to_rfc3339(),
        }
    }
}

impl UserActivity {
    pub fn to_response(&self) -> ActivityResponse {
        ActivityResponse {
            id: self.id.clone(),
            user_id: self.user_id.clone(),
            activity_type: self.activity_type.clone(),
            ip_address: self.ip_address.clone(),
            user_agent: self.user_agent.clone(),
            details: self.details.clone(),
            created_at: self.created_at.to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn register(password: &str, password2: &str) -> RegisterRequest {
        RegisterRequest {
            email: "new@example.com".into(),
            username: "new.user".into(),
            password: password.into(),
            password2: password2.into(),
            first_name: String::new(),
            last_name: String::new(),
        }
    }

    #[test]
    fn matching_passwords_validate() {
        assert!(register("s3cret-pass", "s3cret-pass").validate().is_ok());
    }

    #[test]
    fn mismatch_short_and_numeric_passwords_fail() {
        let errs = register("s3cret-pass", "other-pass").validate().unwrap_err();
        assert!(errs.field_errors().contains_key("password2"));
        let errs = register("short", "short").validate().unwrap_err();
        assert!(errs.field_errors().contains_key("password"));
        let errs = register("1234567890", "1234567890").validate().unwrap_err();
        assert!(errs.field_errors().contains_key("password"));
    }

    #[test]
    fn usernames_reject_spaces() {
        assert!(validate_username("ann_b+c@d.e-f").is_ok());
        assert!(validate_username("ann b").is_err());
    }
}
