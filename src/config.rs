//! Runtime configuration from environment variables.
//!
//! `PORT` (default 8080), `STATE_FILE` (optional snapshot path), plus the
//! auth settings consumed by [`crate::auth::AuthConfig::from_env`]
//! (`DISABLE_AUTH`, `API_KEYS`).

use crate::auth::AuthConfig;
use std::path::PathBuf;

/// Fully-resolved runtime configuration for the binary.
#[derive(Clone)]
pub struct Config {
    pub port: u16,
    pub state_file: Option<PathBuf>,
    pub auth: AuthConfig,
}

impl Config {
    pub fn from_env() -> Self {
        let port: u16 = std::env::var("PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(8080);
        let state_file = std::env::var("STATE_FILE").ok().map(PathBuf::from);
        Self {
            port,
            state_file,
            auth: AuthConfig::from_env(),
        }
    }
}
