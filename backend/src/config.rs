//! Server configuration and environment variable handling.

use std::env;
use std::time::Duration;

use crate::services::auth::{AuthConfig, LoaderConfig, MAX_SESSION_TTL_HOURS};

/// Email/token pair seeded at start-up so a fresh deployment can log in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapAdmin {
    pub email: String,
    pub token: String,
}

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind host (default: 0.0.0.0)
    pub host: String,
    /// Bind port (default: 8080)
    pub port: u16,
    /// Lifetime of issued sessions in hours; 0 means sessions never expire
    pub session_ttl_hours: u32,
    /// How long an authenticated token is served from memory
    pub auth_cache_ttl_secs: u64,
    /// Profile load attempts before falling back to the session role
    pub profile_load_attempts: u32,
    /// Seeded admin, if configured
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            session_ttl_hours: 12,
            auth_cache_ttl_secs: 30,
            profile_load_attempts: 3,
            bootstrap_admin: None,
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T, String> {
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|_| format!("{} must be a valid number, got '{}'", name, raw)),
        _ => Ok(default),
    }
}

impl ServerConfig {
    /// Create a configuration from environment variables.
    ///
    /// # Environment Variables
    /// - `HOST` (optional, default: 0.0.0.0)
    /// - `PORT` (optional, default: 8080)
    /// - `SESSION_TTL_HOURS` (optional, default: 12; 0 disables expiry)
    /// - `AUTH_CACHE_TTL_SECS` (optional, default: 30)
    /// - `PROFILE_LOAD_ATTEMPTS` (optional, default: 3)
    /// - `BOOTSTRAP_ADMIN_EMAIL` / `BOOTSTRAP_ADMIN_TOKEN` (optional, both or neither)
    ///
    /// # Errors
    /// Returns an error if a numeric variable does not parse, the session
    /// lifetime exceeds a year, or only one of the bootstrap variables is set.
    pub fn from_env() -> Result<Self, String> {
        let defaults = Self::default();
        let host = env::var("HOST")
            .ok()
            .filter(|h| !h.trim().is_empty())
            .unwrap_or(defaults.host);
        let port = parse_var("PORT", defaults.port)?;
        let session_ttl_hours = parse_var("SESSION_TTL_HOURS", defaults.session_ttl_hours)?;
        if session_ttl_hours > MAX_SESSION_TTL_HOURS {
            return Err(format!(
                "SESSION_TTL_HOURS must be at most {}",
                MAX_SESSION_TTL_HOURS
            ));
        }
        let auth_cache_ttl_secs = parse_var("AUTH_CACHE_TTL_SECS", defaults.auth_cache_ttl_secs)?;
        let profile_load_attempts =
            parse_var("PROFILE_LOAD_ATTEMPTS", defaults.profile_load_attempts)?;

        let email = env::var("BOOTSTRAP_ADMIN_EMAIL").ok().filter(|v| !v.trim().is_empty());
        let token = env::var("BOOTSTRAP_ADMIN_TOKEN").ok().filter(|v| !v.trim().is_empty());
        let bootstrap_admin = match (email, token) {
            (Some(email), Some(token)) => Some(BootstrapAdmin { email, token }),
            (None, None) => None,
            _ => {
                return Err(
                    "BOOTSTRAP_ADMIN_EMAIL and BOOTSTRAP_ADMIN_TOKEN must be set together"
                        .to_string(),
                )
            }
        };

        Ok(Self {
            host,
            port,
            session_ttl_hours,
            auth_cache_ttl_secs,
            profile_load_attempts,
            bootstrap_admin,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn auth_config(&self) -> AuthConfig {
        AuthConfig {
            session_ttl: (self.session_ttl_hours > 0)
                .then(|| chrono::Duration::hours(i64::from(self.session_ttl_hours))),
            cache_ttl: Duration::from_secs(self.auth_cache_ttl_secs),
            loader: LoaderConfig {
                attempts: self.profile_load_attempts.max(1),
                ..LoaderConfig::default()
            },
            ..AuthConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_config_from_defaults() {
        let auth = ServerConfig::default().auth_config();
        assert_eq!(auth.session_ttl, Some(chrono::Duration::hours(12)));
        assert_eq!(auth.cache_ttl, Duration::from_secs(30));
        assert_eq!(auth.loader.attempts, 3);
    }

    #[test]
    fn test_zero_ttl_disables_expiry() {
        let config = ServerConfig {
            session_ttl_hours: 0,
            ..ServerConfig::default()
        };
        assert!(config.auth_config().session_ttl.is_none());
        assert_eq!(config.bind_address(), "0.0.0.0:8080");
    }
}
