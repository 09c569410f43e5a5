//! Password hashing and opaque bearer tokens.
//!
//! Password hashes use the `pbkdf2_sha256$<iterations>$<salt>$<base64 hash>`
//! layout, so hashes imported from an existing user table in that format
//! verify unchanged. Tokens are 32 random bytes, base64url-encoded for the client;
//! only their SHA-256 digest is ever stored.

use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use pbkdf2::pbkdf2_hmac;
use rand::distributions::Alphanumeric;
use rand::{Rng, RngCore};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

const ALGORITHM: &str = "pbkdf2_sha256";
const HASH_LEN: usize = 32;
const SALT_LEN: usize = 22;
const TOKEN_BYTES: usize = 32;

/// Hash `password` with a fresh random salt.
pub fn hash_password(password: &str, iterations: u32) -> String {
    let salt: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SALT_LEN)
        .map(char::from)
        .collect();
    encode(password, &salt, iterations)
}

fn encode(password: &str, salt: &str, iterations: u32) -> String {
    let mut out = [0u8; HASH_LEN];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt.as_bytes(), iterations, &mut out);
    format!("{ALGORITHM}${iterations}${salt}${}", STANDARD.encode(out))
}

/// Check `password` against a stored hash. Malformed hashes never verify.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let mut parts = stored.splitn(4, '$');
    let (Some(ALGORITHM), Some(iterations), Some(salt), Some(_)) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return false;
    };
    let Ok(iterations) = iterations.parse::<u32>() else {
        return false;
    };
    if iterations == 0 {
        return false;
    }
    let candidate = encode(password, salt, iterations);
    candidate.as_bytes().ct_eq(stored.as_bytes()).into()
}

/// A new random bearer token as handed to the client.
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Digest under which a token is stored.
pub fn hash_token(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

/// Runs the CPU-heavy PBKDF2 work off the async runtime.
pub async fn hash_password_blocking(password: String, iterations: u32) -> anyhow::Result<String> {
    Ok(tokio::task::spawn_blocking(move || hash_password(&password, iterations)).await?)
}

pub async fn verify_password_blocking(password: String, stored: String) -> anyhow::Result<bool> {
    Ok(tokio::task::spawn_blocking(move || verify_password(&password, &stored)).await?)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn hash_round_trips_and_rejects_wrong_password() {
        let stored = hash_password("correct horse", 1_000);
        assert!(stored.starts_with("pbkdf2_sha256$1000$"));
        assert!(verify_password("correct horse", &stored));
        assert!(!verify_password("battery staple", &stored));
    }

    #[test]
    fn salts_differ_between_hashes() {
        assert_ne!(hash_password("same", 1_000), hash_password("same", 1_000));
    }

    #[test]
    fn malformed_hashes_never_verify() {
        for stored in ["", "plain", "md5$1$salt$abc", "pbkdf2_sha256$zero$salt$abc", "pbkdf2_sha256$0$s$x"] {
            assert!(!verify_password("anything", stored), "{stored}");
        }
    }

    #[test]
    fn tokens_are_url_safe_and_hash_to_hex() {
        let token = generate_token();
        assert_eq!(token.len(), 43);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        let digest = hash_token(&token);
        assert_eq!(digest.len(), 64);
        assert_eq!(digest, hash_token(&token));
        assert_ne!(digest, hash_token(&generate_token()));
    }
}
