use crate::constants::{
    DEFAULT_CORS_ALLOWED_ORIGIN, DEFAULT_DB_MAX_CONNECTIONS, DEFAULT_SERVICE_ADDRESS,
    LOGIN_RATE_LIMIT_MAX_REQUESTS, LOGIN_RATE_LIMIT_WINDOW_SECS, MAX_RATE_LIMIT_WINDOW_SECS,
    REGISTER_RATE_LIMIT_MAX_REQUESTS, REGISTER_RATE_LIMIT_WINDOW_SECS,
};
use std::env;
use std::fs;

#[derive(Clone)]
pub struct Config {
    pub service_address: String,
    pub debug_mode: bool,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub cors_allowed_origin: String,
    pub trust_forwarded_for: bool,
    pub login_rate_limit_max: u32,
    pub login_rate_limit_window_secs: u64,
    pub register_rate_limit_max: u32,
    pub register_rate_limit_window_secs: u64,
}

// The database URL carries credentials, so it is kept out of debug output.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("service_address", &self.service_address)
            .field("debug_mode", &self.debug_mode)
            .field("database_url", &self.database_url.as_ref().map(|_| "<redacted>"))
            .field("db_max_connections", &self.db_max_connections)
            .field("cors_allowed_origin", &self.cors_allowed_origin)
            .field("trust_forwarded_for", &self.trust_forwarded_for)
            .field("login_rate_limit_max", &self.login_rate_limit_max)
            .field("login_rate_limit_window_secs", &self.login_rate_limit_window_secs)
            .field("register_rate_limit_max", &self.register_rate_limit_max)
            .field(
                "register_rate_limit_window_secs",
                &self.register_rate_limit_window_secs,
            )
            .finish()
    }
}

/// Load configuration from a JSON config file (if present) and environment variables.
/// Environment variables take precedence over config file values.
///
/// Config file path is read from `CONFIG_FILE` env var (default: `config.json`).
pub fn load_config() -> Config {
    let config_path = env::var("CONFIG_FILE").unwrap_or_else(|_| "config.json".to_string());
    let file_values: serde_json::Value = fs::read_to_string(&config_path)
        .ok()
        .and_then(|contents| serde_json::from_str(&contents).ok())
        .unwrap_or(serde_json::Value::Null);

    resolve(&file_values, |key| env::var(key).ok())
}

/// Build a [`Config`] from parsed file values and an environment lookup.
fn resolve(file_values: &serde_json::Value, env_var: impl Fn(&str) -> Option<String>) -> Config {
    // Scalars in the file may be strings, numbers or booleans.
    let from_file = |key: &str| -> Option<String> {
        file_values.get(key).and_then(|v| match v {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            serde_json::Value::Bool(b) => Some(b.to_string()),
            _ => None,
        })
    };
    let lookup = |env_key: &str, file_key: &str| env_var(env_key).or_else(|| from_file(file_key));
    let flag = |env_key: &str, file_key: &str| {
        lookup(env_key, file_key)
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false)
    };

    let service_address = lookup("SERVICE_ADDRESS", "service_address")
        .unwrap_or_else(|| DEFAULT_SERVICE_ADDRESS.to_string());

    let debug_mode = flag("DEBUG_MODE", "debug_mode");

    let database_url = lookup("DATABASE_URL", "database_url");

    let db_max_connections = lookup("DB_MAX_CONNECTIONS", "db_max_connections")
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS);

    let cors_allowed_origin = lookup("CORS_ALLOWED_ORIGIN", "cors_allowed_origin")
        .unwrap_or_else(|| DEFAULT_CORS_ALLOWED_ORIGIN.to_string());

    let trust_forwarded_for = flag("TRUST_FORWARDED_FOR", "trust_forwarded_for");

    let login_rate_limit_max = lookup("LOGIN_RATE_LIMIT_MAX", "login_rate_limit_max")
        .and_then(|v| v.parse().ok())
        .unwrap_or(LOGIN_RATE_LIMIT_MAX_REQUESTS);

    let login_rate_limit_window_secs = window_secs(
        "LOGIN_RATE_LIMIT_WINDOW_SECS",
        lookup("LOGIN_RATE_LIMIT_WINDOW_SECS", "login_rate_limit_window_secs"),
        LOGIN_RATE_LIMIT_WINDOW_SECS,
    );

    let register_rate_limit_max = lookup("REGISTER_RATE_LIMIT_MAX", "register_rate_limit_max")
        .and_then(|v| v.parse().ok())
        .unwrap_or(REGISTER_RATE_LIMIT_MAX_REQUESTS);

    let register_rate_limit_window_secs = window_secs(
        "REGISTER_RATE_LIMIT_WINDOW_SECS",
        lookup("REGISTER_RATE_LIMIT_WINDOW_SECS", "register_rate_limit_window_secs"),
        REGISTER_RATE_LIMIT_WINDOW_SECS,
    );

    Config {
        service_address,
        debug_mode,
        database_url,
        db_max_connections,
        cors_allowed_origin,
        trust_forwarded_for,
        login_rate_limit_max,
        login_rate_limit_window_secs,
        register_rate_limit_max,
        register_rate_limit_window_secs,
    }
}

/// Parse a rate-limit window, falling back to `default` when the value is not
/// a number in `1..=MAX_RATE_LIMIT_WINDOW_SECS`.
fn window_secs(key: &str, raw: Option<String>, default: u64) -> u64 {
    let Some(raw) = raw else {
        return default;
    };
    match raw.parse::<u64>() {
        Ok(secs) if (1..=MAX_RATE_LIMIT_WINDOW_SECS).contains(&secs) => secs,
        _ => {
            // Logging is not initialised while config loads.
            eprintln!(
                "config: {}={} is outside 1..={} seconds, using {}",
                key, raw, MAX_RATE_LIMIT_WINDOW_SECS, default
            );
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_file_or_env() {
        let config = resolve(&serde_json::Value::Null, env_from(&[]));
        assert_eq!(config.service_address, "0.0.0.0:3000");
        assert!(!config.debug_mode);
        assert!(config.database_url.is_none());
        assert_eq!(config.db_max_connections, 5);
        assert_eq!(config.cors_allowed_origin, "http://localhost:3001");
        assert!(!config.trust_forwarded_for);
        assert_eq!(config.login_rate_limit_max, 5);
        assert_eq!(config.login_rate_limit_window_secs, 300);
        assert_eq!(config.register_rate_limit_max, 5);
        assert_eq!(config.register_rate_limit_window_secs, 300);
    }

    #[test]
    fn test_file_values_are_used() {
        let file = json!({
            "service_address": "127.0.0.1:9000",
            "debug_mode": true,
            "database_url": "postgres://localhost/apds",
            "login_rate_limit_max": 3,
            "register_rate_limit_window_secs": "60"
        });
        let config = resolve(&file, env_from(&[]));
        assert_eq!(config.service_address, "127.0.0.1:9000");
        assert!(config.debug_mode);
        assert_eq!(config.database_url.as_deref(), Some("postgres://localhost/apds"));
        assert_eq!(config.login_rate_limit_max, 3);
        assert_eq!(config.register_rate_limit_window_secs, 60);
    }

    #[test]
    fn test_env_overrides_file() {
        let file = json!({ "service_address": "127.0.0.1:9000", "db_max_connections": 2 });
        let config = resolve(
            &file,
            env_from(&[("SERVICE_ADDRESS", "0.0.0.0:8443"), ("TRUST_FORWARDED_FOR", "1")]),
        );
        assert_eq!(config.service_address, "0.0.0.0:8443");
        assert_eq!(config.db_max_connections, 2);
        assert!(config.trust_forwarded_for);
    }

    #[test]
    fn test_unparseable_numbers_fall_back_to_defaults() {
        let config = resolve(
            &serde_json::Value::Null,
            env_from(&[("LOGIN_RATE_LIMIT_MAX", "lots")]),
        );
        assert_eq!(config.login_rate_limit_max, 5);
    }

    #[test]
    fn test_out_of_range_windows_fall_back_to_defaults() {
        let config = resolve(
            &json!({ "register_rate_limit_window_secs": 0 }),
            env_from(&[("LOGIN_RATE_LIMIT_WINDOW_SECS", "18446744073709551615")]),
        );
        assert_eq!(config.login_rate_limit_window_secs, 300);
        assert_eq!(config.register_rate_limit_window_secs, 300);

        let config = resolve(
            &serde_json::Value::Null,
            env_from(&[("LOGIN_RATE_LIMIT_WINDOW_SECS", "86400")]),
        );
        assert_eq!(config.login_rate_limit_window_secs, 86_400);
    }

    #[test]
    fn test_debug_output_redacts_database_url() {
        let config = resolve(
            &serde_json::Value::Null,
            env_from(&[("DATABASE_URL", "postgres://user:hunter2@db/apds")]),
        );
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("<redacted>"));
    }
}
