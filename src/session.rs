//! # Session — Saved Credentials and Viewer Identity
//!
//! Login stores the backend URL, bearer token, and email in
//! `~/.bidreach/config.toml`. The viewer's identity (user ID and role) is
//! read back out of the JWT claims client-side — the token is decoded
//! without signature verification, since the client holds no secret and the
//! backend re-validates every request anyway.
//!
//! Token or claim extraction failures degrade to a minimal anonymous-role
//! identity instead of hard-failing: the tracker and bid affordances stay
//! usable, just scoped to the plain "user" role.

use anyhow::Result;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Saved session, written after a successful login.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionConfig {
    pub server: String,
    pub token: String,
    pub email: String,
}

/// Who is looking at the data, as derived from the saved session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    pub email: String,
    pub role: String,
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        self.role == "admin" || self.role == "super-admin"
    }
}

/// Claims carried in the backend-issued JWT.
#[derive(Debug, Deserialize)]
struct Claims {
    #[serde(default)]
    id: String,
    #[serde(default)]
    role: String,
}

fn config_path() -> Result<PathBuf> {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map_err(|_| anyhow::anyhow!("Cannot determine home directory"))?;
    Ok(PathBuf::from(home).join(".bidreach").join("config.toml"))
}

/// Load the saved session from `~/.bidreach/config.toml`.
pub fn load_config() -> Result<SessionConfig> {
    let path = config_path()?;
    let content = std::fs::read_to_string(&path)
        .map_err(|_| anyhow::anyhow!("Not logged in. Run `bidreach login` first."))?;
    let config: SessionConfig = toml::from_str(&content)?;
    Ok(config)
}

/// Save the session to `~/.bidreach/config.toml`.
pub fn save_config(config: &SessionConfig) -> Result<()> {
    let path = config_path()?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = toml::to_string_pretty(config)?;
    std::fs::write(&path, content)?;
    Ok(())
}

/// Remove the saved session.
pub fn clear_config() -> Result<()> {
    let path = config_path()?;
    let _ = std::fs::remove_file(path);
    Ok(())
}

/// Decode the JWT without signature validation. The client has no secret;
/// the claims only steer which snapshot shape and affordances to request.
fn decode_claims(token: &str) -> Option<Claims> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.required_spec_claims.clear();
    decode::<Claims>(token, &DecodingKey::from_secret(b""), &validation)
        .map(|data| data.claims)
        .ok()
}

/// Derive the viewer identity from a token and email, degrading to an
/// anonymous "user" role when the token cannot be decoded.
pub fn identity_from_token(token: &str, email: &str) -> Identity {
    match decode_claims(token) {
        Some(claims) if !claims.id.is_empty() => Identity {
            user_id: claims.id,
            email: email.to_string(),
            role: if claims.role.is_empty() {
                "user".to_string()
            } else {
                claims.role
            },
        },
        _ => Identity {
            // Fall back to an email-derived identity so the UI stays usable.
            user_id: email.split('@').next().unwrap_or(email).to_string(),
            email: email.to_string(),
            role: "user".to_string(),
        },
    }
}
