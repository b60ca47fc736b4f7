//! Server configuration.

use std::env;

use anyhow::Context;

/// How callers prove who they are.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    /// Trust the `X-User-Id` header set by an authenticating proxy.
    Header,
    /// Require a Bearer JWT whose `sub` is the user id.
    Jwt,
}

impl AuthMode {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "header" => Some(Self::Header),
            "jwt" => Some(Self::Jwt),
            _ => None,
        }
    }
}

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host address.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// SQLite database URL. `None` selects the in-memory store.
    pub database_url: Option<String>,
    /// Authentication mode.
    pub auth_mode: AuthMode,
    /// JWT secret (required in JWT mode).
    pub jwt_secret: Option<String>,
    /// JWT issuer.
    pub jwt_issuer: String,
    /// JWT expiration in hours.
    pub jwt_expiration_hours: u64,
    /// Webhook endpoint for notifications. `None` logs them instead.
    pub webhook_url: Option<String>,
    /// Email of the admin account created at startup.
    pub bootstrap_admin_email: Option<String>,
    /// Log level.
    pub log_level: String,
    /// Emit logs as JSON lines.
    pub log_json: bool,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Loads configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let auth_mode = match get("INCIDENTS_AUTH_MODE") {
            Some(value) => AuthMode::parse(&value)
                .with_context(|| format!("INCIDENTS_AUTH_MODE must be 'header' or 'jwt', got '{value}'"))?,
            None => AuthMode::Header,
        };

        let jwt_secret = get("INCIDENTS_JWT_SECRET");
        if auth_mode == AuthMode::Jwt && jwt_secret.is_none() {
            anyhow::bail!("INCIDENTS_JWT_SECRET is required when INCIDENTS_AUTH_MODE=jwt");
        }

        let port = match get("INCIDENTS_SERVER_PORT") {
            Some(value) => value
                .parse()
                .with_context(|| format!("invalid INCIDENTS_SERVER_PORT '{value}'"))?,
            None => 8080,
        };

        let jwt_expiration_hours = match get("INCIDENTS_JWT_EXPIRATION_HOURS") {
            Some(value) => value
                .parse()
                .with_context(|| format!("invalid INCIDENTS_JWT_EXPIRATION_HOURS '{value}'"))?,
            None => auth::DEFAULT_JWT_EXPIRATION_HOURS,
        };

        Ok(Self {
            host: get("INCIDENTS_SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            database_url: get("DATABASE_URL"),
            auth_mode,
            jwt_secret,
            jwt_issuer: get("INCIDENTS_JWT_ISSUER")
                .unwrap_or_else(|| auth::DEFAULT_JWT_ISSUER.to_string()),
            jwt_expiration_hours,
            webhook_url: get("INCIDENTS_WEBHOOK_URL"),
            bootstrap_admin_email: get("INCIDENTS_BOOTSTRAP_ADMIN_EMAIL"),
            log_level: get("INCIDENTS_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            log_json: get("INCIDENTS_LOG_JSON")
                .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
                .unwrap_or(false),
        })
    }

    /// Returns the server address.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Returns true if callers must present a JWT.
    pub fn jwt_enabled(&self) -> bool {
        self.auth_mode == AuthMode::Jwt
    }
}
