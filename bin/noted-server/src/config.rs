//! Server configuration, loaded from environment variables at startup.

use noted_core::PersistPolicy;
use tracing::warn;

/// Runtime configuration for noted-server.
///
/// Every field has a default so the server starts without any environment
/// variables set.
#[derive(Debug, Clone)]
pub struct Config {
    /// TCP address to bind (default: `"0.0.0.0:3000"`).
    pub bind_address: String,

    /// sqlx SQLite URL (default: `"sqlite://noted.db"`).
    pub database_url: String,

    /// `tracing` filter string, e.g. `"info"` or `"debug,tower_http=warn"`.
    pub log_level: String,

    /// When `true`, emit log records as newline-delimited JSON.
    pub log_json: bool,

    /// Model name handed to the completion provider.
    pub chat_model: String,

    /// Overrides the built-in assistant system prompt.
    pub system_prompt: Option<String>,

    /// What reconciliation does when a store write fails.
    pub persist_policy: PersistPolicy,

    /// Comma-separated list of allowed CORS origins; `None` allows any.
    pub cors_allowed_origins: Option<String>,

    /// Serve Swagger UI at `/swagger-ui`.
    pub enable_swagger: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".into(),
            database_url: "sqlite://noted.db".into(),
            log_level: "info".into(),
            log_json: false,
            chat_model: "gpt-4o-mini".into(),
            system_prompt: None,
            persist_policy: PersistPolicy::BestEffort,
            cors_allowed_origins: None,
            enable_swagger: true,
        }
    }
}

impl Config {
    /// Build [`Config`] from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            bind_address: env_or("NOTED_BIND", &defaults.bind_address),
            database_url: env_or("NOTED_DATABASE_URL", &defaults.database_url),
            log_level: env_or("NOTED_LOG", &defaults.log_level),
            log_json: env_flag("NOTED_LOG_JSON", defaults.log_json),
            chat_model: env_or("NOTED_CHAT_MODEL", &defaults.chat_model),
            system_prompt: env_non_empty("NOTED_SYSTEM_PROMPT"),
            persist_policy: parse_env("NOTED_PERSIST_POLICY", defaults.persist_policy),
            cors_allowed_origins: env_non_empty("NOTED_CORS_ORIGINS"),
            enable_swagger: env_flag("NOTED_ENABLE_SWAGGER", defaults.enable_swagger),
        }
    }
}

// ── private helpers ──────────────────────────────────────────────────────────

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_flag(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(default)
}

fn parse_env<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!(key, value = %raw, fallback = %default, "ignoring unparsable setting");
            default
        }),
        Err(_) => default,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults_are_usable() {
        let cfg = Config::default();
        assert_eq!(cfg.bind_address, "0.0.0.0:3000");
        assert_eq!(cfg.persist_policy, PersistPolicy::BestEffort);
        assert!(cfg.enable_swagger);
        assert!(cfg.system_prompt.is_none());
    }

    #[test]
    fn blank_optional_settings_count_as_unset() {
        let key = "NOTED_TEST_BLANK_PROMPT";
        unsafe { std::env::set_var(key, "  ") };
        assert_eq!(env_non_empty(key), None);
        unsafe { std::env::set_var(key, "be brief") };
        assert_eq!(env_non_empty(key).as_deref(), Some("be brief"));
        unsafe { std::env::remove_var(key) };
    }

    #[test]
    fn unparsable_value_falls_back() {
        // Key is unique to this test so parallel tests never race on it.
        let key = "NOTED_TEST_POLICY_FALLBACK";
        unsafe { std::env::set_var(key, "sometimes") };
        assert_eq!(parse_env(key, PersistPolicy::Strict), PersistPolicy::Strict);
        unsafe { std::env::remove_var(key) };
    }
}
