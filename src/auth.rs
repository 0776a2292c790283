//! API-key authentication: injected config from env, dev bypass, roles.
//!
//! When `DISABLE_AUTH=true` or `API_KEYS` is unset, all requests are accepted
//! with a default client role. Otherwise, validate `Authorization: Bearer <key>`
//! or `X-API-Key: <key>` against the configured key map (format:
//! `key1:role1,key2:role2`; roles: client, manager, admin). There is no
//! hardcoded secret anywhere; the key set is configuration.

use axum::{
    body::Body,
    extract::Request,
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::collections::HashMap;
use std::sync::Arc;

/// Caller role. Deal deletion and settlement status transitions require
/// manager or admin.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    Client,
    Manager,
    Admin,
}

impl Role {
    pub fn from_str(s: &str) -> Option<Self> {
        if s.eq_ignore_ascii_case("client") {
            Some(Role::Client)
        } else if s.eq_ignore_ascii_case("manager") {
            Some(Role::Manager)
        } else if s.eq_ignore_ascii_case("admin") {
            Some(Role::Admin)
        } else {
            None
        }
    }
}

/// Authenticated caller (key id + role). Injected by the middleware when auth
/// succeeds or is disabled.
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub key_id: Option<String>,
    pub role: Role,
}

impl Default for AuthUser {
    fn default() -> Self {
        Self {
            key_id: None,
            role: Role::Client,
        }
    }
}

impl AuthUser {
    /// Actor label for audit events.
    pub fn actor(&self) -> String {
        self.key_id.clone().unwrap_or_else(|| "anonymous".into())
    }
}

/// Returns `Ok(())` if `user.role` is Manager or Admin; otherwise a 403 Response.
/// Use in privileged handlers: `require_manager_or_admin(&auth)?`.
pub fn require_manager_or_admin(user: &AuthUser) -> Result<(), Response> {
    match user.role {
        Role::Manager | Role::Admin => Ok(()),
        Role::Client => {
            Err((StatusCode::FORBIDDEN, "manager or admin role required").into_response())
        }
    }
}

/// Auth configuration: disable flag and key → role map. Built from env.
#[derive(Clone)]
pub struct AuthConfig {
    pub disable: bool,
    keys: Arc<HashMap<String, Role>>,
}

impl AuthConfig {
    /// Auth disabled: all requests accepted with default client role.
    pub fn disabled() -> Self {
        Self {
            disable: true,
            keys: Arc::new(HashMap::new()),
        }
    }

    /// Build from a key:role string (e.g. "key1:client,key2:manager"). For tests.
    pub fn from_keys(keys: &str) -> Self {
        let map = parse_key_map(keys);
        Self {
            disable: map.is_empty(),
            keys: Arc::new(map),
        }
    }

    /// Load from env: `DISABLE_AUTH=true` or unset `API_KEYS` => auth disabled.
    /// `API_KEYS=secret1:client,secret2:manager` => comma-separated key:role pairs.
    pub fn from_env() -> Self {
        let disable = std::env::var("DISABLE_AUTH")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let keys = std::env::var("API_KEYS")
            .ok()
            .map(|s| parse_key_map(&s))
            .unwrap_or_default();

        let disable = disable || keys.is_empty();

        Self {
            disable,
            keys: Arc::new(keys),
        }
    }

    pub fn lookup(&self, key: &str) -> Option<Role> {
        self.keys.get(key).copied()
    }
}

fn parse_key_map(s: &str) -> HashMap<String, Role> {
    s.split(',')
        .filter_map(|part| {
            let part = part.trim();
            let mut split = part.splitn(2, ':');
            let key = split.next()?.trim().to_string();
            let role = Role::from_str(split.next()?.trim())?;
            if key.is_empty() {
                return None;
            }
            Some((key, role))
        })
        .collect()
}

/// Returns the API key from `Authorization: Bearer <key>` or `X-API-Key: <key>`.
fn get_api_key_from_request(req: &Request) -> Option<String> {
    if let Some(v) = req.headers().get(header::AUTHORIZATION) {
        if let Ok(s) = v.to_str() {
            let s = s.trim();
            if s.len() >= 7
                && s.get(..7)
                    .map(|p| p.eq_ignore_ascii_case("bearer "))
                    .unwrap_or(false)
            {
                return Some(s.get(7..).unwrap_or("").trim().to_string());
            }
        }
    }
    if let Some(v) = req.headers().get("X-API-Key") {
        if let Ok(s) = v.to_str() {
            return Some(s.trim().to_string());
        }
    }
    None
}

/// Auth middleware: when auth is disabled, injects a default [`AuthUser`] and
/// continues. Otherwise, requires a valid API key and injects the caller's
/// key id and role; returns 401 if the key is missing or unknown.
pub async fn require_api_key_or_anonymous(
    mut req: Request<Body>,
    next: Next,
    config: AuthConfig,
) -> Response {
    if config.disable {
        req.extensions_mut().insert(AuthUser::default());
        return next.run(req).await;
    }

    let key = match get_api_key_from_request(&req) {
        Some(k) if !k.is_empty() => k,
        _ => {
            return (
                StatusCode::UNAUTHORIZED,
                "missing or invalid Authorization or X-API-Key",
            )
                .into_response();
        }
    };

    match config.lookup(&key) {
        Some(role) => {
            req.extensions_mut().insert(AuthUser {
                key_id: Some(key),
                role,
            });
            next.run(req).await
        }
        None => (StatusCode::UNAUTHORIZED, "invalid API key").into_response(),
    }
}
