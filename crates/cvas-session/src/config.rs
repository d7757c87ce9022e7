// CVAS Session
// Copyright (C) 2025 Synerthink

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Configuration management for the session layer

use crate::error::{SessionError, SessionResult};
use chrono::Duration;
use std::env;
use url::Url;

/// Name of the cookie holding the session token
pub const TOKEN_COOKIE: &str = "cvas_token";

/// Durable key holding the serialized identity
pub const USER_KEY: &str = "cvas_user";

/// Longest session lifetime accepted by [`Config::validate`]
pub const MAX_SESSION_TTL_DAYS: i64 = 3650;

/// Fallback authority address when nothing was configured at build or run time
const FALLBACK_BASE_URL: &str = "http://localhost:3000/api";

/// Configuration for the session layer
#[derive(Debug, Clone)]
pub struct Config {
    /// Base address of the credential exchange authority
    pub api_base_url: String,

    /// Request timeout in seconds
    pub request_timeout_secs: u64,

    /// Lifetime of the session cookie in days
    pub session_ttl_days: i64,

    /// Whether the cookie jar may hold secure-only cookies
    pub secure_context: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: build_time_base_url().to_string(),
            request_timeout_secs: 30,
            session_ttl_days: 7,
            secure_context: true,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        Self {
            api_base_url: lookup("CVAS_API_BASE_URL").unwrap_or(defaults.api_base_url),

            request_timeout_secs: lookup("CVAS_REQUEST_TIMEOUT_SECS").and_then(|v| v.parse().ok()).unwrap_or(defaults.request_timeout_secs),

            session_ttl_days: lookup("CVAS_SESSION_TTL_DAYS").and_then(|v| v.parse().ok()).unwrap_or(defaults.session_ttl_days),

            secure_context: lookup("CVAS_SECURE_CONTEXT").and_then(|v| v.parse().ok()).unwrap_or(defaults.secure_context),
        }
    }

    /// Check that the configuration can actually be used
    pub fn validate(&self) -> SessionResult<()> {
        let url = Url::parse(&self.api_base_url)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(SessionError::Config {
                message: format!("Unsupported scheme for authority address: {}", url.scheme()),
            });
        }
        if self.session_ttl_days <= 0 {
            return Err(SessionError::Config {
                message: "Session lifetime must be at least one day".to_string(),
            });
        }
        if self.session_ttl_days > MAX_SESSION_TTL_DAYS {
            return Err(SessionError::Config {
                message: format!("Session lifetime must be at most {} days", MAX_SESSION_TTL_DAYS),
            });
        }
        Ok(())
    }

    /// Session cookie lifetime, saturating when the day count does not fit
    pub fn session_ttl(&self) -> Duration {
        Duration::try_days(self.session_ttl_days).unwrap_or(if self.session_ttl_days < 0 { Duration::MIN } else { Duration::MAX })
    }

    /// Base address with any trailing slash removed
    pub fn base_url(&self) -> &str {
        self.api_base_url.trim_end_matches('/')
    }
}

fn build_time_base_url() -> &'static str {
    option_env!("CVAS_API_BASE_URL").unwrap_or(FALLBACK_BASE_URL)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup_from(&[]));
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.session_ttl_days, 7);
        assert_eq!(config.session_ttl(), Duration::days(7));
        assert!(config.secure_context);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("CVAS_API_BASE_URL", "https://cvas.example.org/api/"),
            ("CVAS_REQUEST_TIMEOUT_SECS", "5"),
            ("CVAS_SESSION_TTL_DAYS", "1"),
            ("CVAS_SECURE_CONTEXT", "false"),
        ]));
        assert_eq!(config.base_url(), "https://cvas.example.org/api");
        assert_eq!(config.request_timeout_secs, 5);
        assert_eq!(config.session_ttl_days, 1);
        assert!(!config.secure_context);
    }

    #[test]
    fn test_unparsable_values_fall_back() {
        let config = Config::from_lookup(lookup_from(&[("CVAS_REQUEST_TIMEOUT_SECS", "soon")]));
        assert_eq!(config.request_timeout_secs, 30);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.api_base_url = "not a url".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.api_base_url = "ftp://cvas.example.org".to_string();
        assert!(matches!(config.validate(), Err(SessionError::Config { .. })));

        let mut config = Config::default();
        config.session_ttl_days = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_bounds_session_lifetime() {
        let config = Config::from_lookup(lookup_from(&[("CVAS_SESSION_TTL_DAYS", "100000000")]));
        assert!(matches!(config.validate(), Err(SessionError::Config { .. })));

        let config = Config::from_lookup(lookup_from(&[("CVAS_SESSION_TTL_DAYS", "3650")]));
        assert!(config.validate().is_ok());

        // Day counts chrono cannot hold saturate instead of panicking.
        let mut config = Config::default();
        config.session_ttl_days = i64::MAX;
        assert!(config.validate().is_err());
        assert_eq!(config.session_ttl(), Duration::MAX);
    }
}
