use chrono::{DateTime, Utc};

/// A row in the `users` table.
#[derive(Debug, Clone)]
pub struct User {
    pub id: String,
    /// Always stored lower-cased.
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
    pub is_staff: bool,
    pub is_active: bool,
    pub is_email_verified: bool,
    /// One-time token; cleared once the address is verified.
    pub email_verification_token: Option<String>,
    pub email_notifications_enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_owned()
    }

    /// Name shown to other users in chat notifications.
    ///
    /// Staff accounts always appear as "Admin"; everyone else falls back from
    /// full name to username to email.
    pub fn display_name(&self) -> String {
        if self.is_staff {
            return "Admin".to_owned();
        }
        let full = self.full_name();
        if !full.is_empty() {
            full
        } else if !self.username.is_empty() {
            self.username.clone()
        } else {
            self.email.clone()
        }
    }

    /// Greeting name for emails.
    pub fn greeting_name(&self) -> &str {
        if self.first_name.is_empty() { &self.username } else { &self.first_name }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString, strum::AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum ActivityType {
    Registration,
    Login,
    Logout,
    PasswordChange,
    PasswordReset,
    ProfileUpdate,
    EmailVerification,
}

/// A row in the `user_activities` audit table.
#[derive(Debug, Clone)]
pub struct UserActivity {
    pub id: String,
    pub user_id: String,
    pub activity_type: String,
    pub ip_address: Option<String>,
    pub user_agent: String,
    pub details: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod test {
    use super::*;

    fn user(first: &str, last: &str, username: &str, staff: bool) -> User {
        let now = Utc::now();
        User {
            id: "u".into(),
            email: "someone@example.com".into(),
            username: username.into(),
            first_name: first.into(),
            last_name: last.into(),
            password_hash: String::new(),
            is_staff: staff,
            is_active: true,
            is_email_verified: true,
            email_verification_token: None,
            email_notifications_enabled: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn staff_display_as_admin() {
        assert_eq!(user("Jo", "Doe", "jo", true).display_name(), "Admin");
    }

    #[test]
    fn display_name_falls_back_to_username_then_email() {
        assert_eq!(user("Jo", "Doe", "jo", false).display_name(), "Jo Doe");
        assert_eq!(user("", "", "jo", false).display_name(), "jo");
        assert_eq!(user("", "", "", false).display_name(), "someone@example.com");
    }

    #[test]
    fn activity_type_is_snake_case() {
        assert_eq!(ActivityType::PasswordChange.as_ref(), "password_change");
        assert_eq!("email_verification".parse::<ActivityType>().ok(), Some(ActivityType::EmailVerification));
    }
}
