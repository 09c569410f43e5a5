//! Server configuration, loaded from environment variables at startup.
//!
//! The top-level [`Config`] is split into sections that are handed to the
//! collaborator that needs them (`SmtpConfig` to the mailer,
//! `InferenceConfig` to the inference client, `AuthConfig` to the account
//! handlers). Nothing reads the environment after startup.

use std::path::PathBuf;
use std::time::Duration;

/// Runtime configuration for folio-server.
///
/// Every field has a sensible default so the server works out-of-the-box
/// without any environment variables set.
#[derive(Debug, Clone)]
pub struct Config {
    /// TCP address to bind (default: `"0.0.0.0:8000"`).
    pub bind_address: String,

    /// SQLite database URL (default: `"sqlite://folio.db"`).
    pub database_url: String,

    /// `tracing` filter string, e.g. `"info"` or `"debug,tower_http=warn"`.
    pub log_level: String,

    /// When `true`, emit log records as newline-delimited JSON.
    pub log_json: bool,

    /// Directory for daily-rolling log files. Logs go to stdout only when unset.
    pub log_dir: Option<String>,

    /// Serve Swagger UI at `/swagger-ui`.
    pub enable_swagger: bool,

    /// Comma-separated list of allowed CORS origins; `None` allows any origin.
    pub cors_allowed_origins: Option<String>,

    /// Human-readable site name used in email subjects and bodies.
    pub site_name: String,

    /// Public front-end URL used to build links embedded in emails.
    pub site_url: String,

    /// Name the chatbot talks about.
    pub owner_name: String,

    /// Recipient of contact-form notices. No notice is sent when unset.
    pub admin_email: Option<String>,

    /// Root directory for uploaded chat files.
    pub upload_dir: PathBuf,

    /// Largest accepted chat attachment in bytes.
    pub max_upload_bytes: usize,

    pub smtp: SmtpConfig,
    pub inference: InferenceConfig,
    pub auth: AuthConfig,
}

/// How the SMTP connection is secured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumString, strum::Display)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum SmtpSecurity {
    /// Plain connection upgraded with `STARTTLS` (port 587).
    StartTls,
    /// Implicit TLS (port 465).
    Tls,
    /// No encryption. Local relays and test servers only.
    None,
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    /// SMTP relay host. When unset, outgoing mail is only logged.
    pub host: Option<String>,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub security: SmtpSecurity,
    /// `From:` address for every outgoing email.
    pub from_address: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct InferenceConfig {
    /// Bearer key for the inference API. The chatbot answers from canned
    /// responses only when unset.
    pub api_key: Option<String>,
    /// Base URL of an OpenAI-compatible API (`…/v1`).
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
    /// Number of earlier turns sent along with the current message.
    pub history_limit: i64,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Lifetime of a login token.
    pub token_ttl: chrono::Duration,
    /// Lifetime of a password-reset token.
    pub reset_token_ttl: chrono::Duration,
    /// PBKDF2 iteration count for new password hashes.
    pub password_iterations: u32,
    /// Refuse logins from accounts that have not verified their email.
    pub require_email_verification: bool,
}

impl Config {
    /// Build [`Config`] from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            bind_address: env_or("FOLIO_BIND", "0.0.0.0:8000"),
            database_url: env_or("FOLIO_DATABASE_URL", "sqlite://folio.db"),
            log_level: env_or("FOLIO_LOG", "info"),
            log_json: env_flag("FOLIO_LOG_JSON", false),
            log_dir: env_opt("FOLIO_LOG_DIR"),
            enable_swagger: env_flag("FOLIO_ENABLE_SWAGGER", true),
            cors_allowed_origins: env_opt("FOLIO_CORS_ORIGINS"),
            site_name: env_or("FOLIO_SITE_NAME", "Portfolio"),
            site_url: env_or("FOLIO_SITE_URL", "http://localhost:3000")
                .trim_end_matches('/')
                .to_owned(),
            owner_name: env_or("FOLIO_OWNER_NAME", "the site owner"),
            admin_email: env_opt("FOLIO_ADMIN_EMAIL"),
            upload_dir: PathBuf::from(env_or("FOLIO_UPLOAD_DIR", "uploads")),
            max_upload_bytes: parse_env("FOLIO_MAX_UPLOAD_MB", 10usize) * 1024 * 1024,
            smtp: SmtpConfig {
                host: env_opt("FOLIO_SMTP_HOST"),
                port: parse_env("FOLIO_SMTP_PORT", 587),
                username: env_opt("FOLIO_SMTP_USER"),
                password: env_opt("FOLIO_SMTP_PASSWORD"),
                security: parse_env("FOLIO_SMTP_SECURITY", SmtpSecurity::StartTls),
                from_address: env_or("FOLIO_EMAIL_FROM", "noreply@localhost"),
                timeout: Duration::from_secs(parse_env("FOLIO_SMTP_TIMEOUT_SECS", 30)),
            },
            inference: InferenceConfig {
                api_key: env_opt("FOLIO_INFERENCE_API_KEY"),
                base_url: env_or("FOLIO_INFERENCE_URL", "https://router.huggingface.co/v1")
                    .trim_end_matches('/')
                    .to_owned(),
                model: env_or("FOLIO_INFERENCE_MODEL", "mistralai/Mistral-7B-Instruct-v0.2"),
                timeout: Duration::from_secs(parse_env("FOLIO_INFERENCE_TIMEOUT_SECS", 30)),
                history_limit: parse_env("FOLIO_INFERENCE_HISTORY", 10),
            },
            auth: AuthConfig {
                token_ttl: chrono::Duration::hours(parse_env("FOLIO_TOKEN_TTL_HOURS", 24 * 7)),
                reset_token_ttl: chrono::Duration::hours(parse_env("FOLIO_RESET_TTL_HOURS", 24)),
                password_iterations: parse_env("FOLIO_PASSWORD_ITERATIONS", 600_000),
                require_email_verification: env_flag("FOLIO_REQUIRE_EMAIL_VERIFICATION", false),
            },
        }
    }
}

// ── private helpers ──────────────────────────────────────────────────────────

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_flag(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(default)
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
impl Config {
    /// Configuration used by unit tests: in-memory database, cheap password
    /// hashing, no SMTP, no inference key.
    pub fn for_tests() -> Self {
        Self {
            bind_address: "127.0.0.1:0".into(),
            database_url: "sqlite::memory:".into(),
            log_level: "debug".into(),
            log_json: false,
            log_dir: None,
            enable_swagger: false,
            cors_allowed_origins: None,
            site_name: "Test Portfolio".into(),
            site_url: "https://portfolio.test".into(),
            owner_name: "Alex".into(),
            admin_email: Some("owner@portfolio.test".into()),
            upload_dir: std::env::temp_dir().join("folio-test-uploads"),
            max_upload_bytes: 1024 * 1024,
            smtp: SmtpConfig {
                host: None,
                port: 587,
                username: None,
                password: None,
                security: SmtpSecurity::StartTls,
                from_address: "noreply@portfolio.test".into(),
                timeout: Duration::from_secs(5),
            },
            inference: InferenceConfig {
                api_key: Some("test-key".into()),
                base_url: "http://127.0.0.1:9/v1".into(),
                model: "test-model".into(),
                timeout: Duration::from_secs(5),
                history_limit: 10,
            },
            auth: AuthConfig {
                token_ttl: chrono::Duration::hours(1),
                reset_token_ttl: chrono::Duration::hours(1),
                password_iterations: 1_000,
                require_email_verification: false,
            },
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn smtp_security_parses_case_insensitively() {
        assert_eq!("STARTTLS".parse::<SmtpSecurity>().ok(), Some(SmtpSecurity::StartTls));
        assert_eq!("tls".parse::<SmtpSecurity>().ok(), Some(SmtpSecurity::Tls));
        assert_eq!("none".parse::<SmtpSecurity>().ok(), Some(SmtpSecurity::None));
        assert!("ssl3".parse::<SmtpSecurity>().is_err());
    }

    #[test]
    fn parse_env_falls_back_on_missing_key() {
        let v: u16 = parse_env("FOLIO_TEST_SURELY_UNSET_KEY", 42);
        assert_eq!(v, 42);
    }
}
