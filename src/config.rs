/*
 * Responsibility
 * - Load settings from the environment (DATABASE_URL, JWT secret, internal key, cache)
 * - Validate values up front (missing or malformed settings abort startup)
 */
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

use base64::Engine as _;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Production,
}

impl AppEnv {
    pub fn from_env() -> Self {
        match std::env::var("APP_ENV")
            .unwrap_or_else(|_| "development".to_string())
            .to_ascii_lowercase()
            .as_str()
        {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "missing configuration: {}", key),
            ConfigError::Invalid(key) => write!(f, "invalid configuration: {}", key),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Expired means expired unless clock skew is explicitly allowed.
pub const DEFAULT_ACCESS_TOKEN_LEEWAY_SECONDS: u64 = 0;

/// HS256 needs at least 256 bits of key material.
const MIN_JWT_SECRET_BYTES: usize = 32;

pub struct Config {
    pub addr: SocketAddr,
    pub app_env: AppEnv,
    pub cors_allowed_origins: Vec<String>,

    pub database_url: String,
    pub database_max_connections: u32,

    pub jwt_secret: Vec<u8>,
    pub access_token_leeway_seconds: u64,
    pub internal_api_key: String,

    // None => in-process cache
    pub valkey_url: Option<String>,
    pub identity_cache_ttl_seconds: u64,
}

// Key material must never end up in logs.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("addr", &self.addr)
            .field("app_env", &self.app_env)
            .field("cors_allowed_origins", &self.cors_allowed_origins)
            .field("database_max_connections", &self.database_max_connections)
            .field("access_token_leeway_seconds", &self.access_token_leeway_seconds)
            .field("valkey_url", &self.valkey_url.is_some())
            .field("identity_cache_ttl_seconds", &self.identity_cache_ttl_seconds)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let port: u16 = std::env::var("PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(8080);

        let addr: SocketAddr = SocketAddr::from_str(&format!("0.0.0.0:{}", port))
            .map_err(|_| ConfigError::Invalid("PORT"))?;

        let app_env = AppEnv::from_env();

        let cors_allowed_origins = std::env::var("CORS_ALLOWED_ORIGINS")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>();

        let database_url =
            std::env::var("DATABASE_URL").map_err(|_| ConfigError::Missing("DATABASE_URL"))?;

        let database_max_connections = std::env::var("DATABASE_MAX_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(10);

        let jwt_secret = std::env::var("JWT_SECRET")
            .map_err(|_| ConfigError::Missing("JWT_SECRET"))
            .and_then(|raw| decode_jwt_secret(&raw))?;

        let access_token_leeway_seconds = std::env::var("ACCESS_TOKEN_LEEWAY_SECONDS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(DEFAULT_ACCESS_TOKEN_LEEWAY_SECONDS);

        let internal_api_key = std::env::var("INTERNAL_API_KEY")
            .map_err(|_| ConfigError::Missing("INTERNAL_API_KEY"))?;
        if internal_api_key.trim().is_empty() {
            return Err(ConfigError::Invalid("INTERNAL_API_KEY"));
        }

        let valkey_url = std::env::var("VALKEY_URL")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let identity_cache_ttl_seconds = std::env::var("IDENTITY_CACHE_TTL_SECONDS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(600);

        Ok(Self {
            addr,
            app_env,
            cors_allowed_origins,
            database_url,
            database_max_connections,
            jwt_secret,
            access_token_leeway_seconds,
            internal_api_key,
            valkey_url,
            identity_cache_ttl_seconds,
        })
    }
}

/// The signing secret is shared with the token issuer as standard base64.
pub fn decode_jwt_secret(raw: &str) -> Result<Vec<u8>, ConfigError> {
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(raw.trim())
        .map_err(|_| ConfigError::Invalid("JWT_SECRET"))?;

    if bytes.len() < MIN_JWT_SECRET_BYTES {
        return Err(ConfigError::Invalid("JWT_SECRET"));
    }

    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_a_long_enough_base64_secret() {
        let raw = "M3BIWW9iS2kzV1dhVkNDcFpJTGxWblRaaEYwcTdIeXZaUjBXdERPOUtUSmthVmQ3REgK";
        let secret = decode_jwt_secret(raw).unwrap();
        assert!(secret.len() >= MIN_JWT_SECRET_BYTES);
    }

    #[test]
    fn rejects_short_or_garbled_secrets() {
        assert!(matches!(
            decode_jwt_secret("c2hvcnQ="),
            Err(ConfigError::Invalid("JWT_SECRET"))
        ));
        assert!(matches!(
            decode_jwt_secret("not base64 at all!"),
            Err(ConfigError::Invalid("JWT_SECRET"))
        ));
    }
}
