/// Default listen address for the HTTP server.
pub const DEFAULT_SERVICE_ADDRESS: &str = "0.0.0.0:3000";

/// Default database connection pool size.
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;

/// Origin of the registration/login web form.
pub const DEFAULT_CORS_ALLOWED_ORIGIN: &str = "http://localhost:3001";

/// Login rate limit: maximum requests per window.
pub const LOGIN_RATE_LIMIT_MAX_REQUESTS: u32 = 5;

/// Login rate limit: window duration in seconds (5 minutes).
pub const LOGIN_RATE_LIMIT_WINDOW_SECS: u64 = 5 * 60;

/// Registration rate limit: maximum requests per window.
pub const REGISTER_RATE_LIMIT_MAX_REQUESTS: u32 = 5;

/// Registration rate limit: window duration in seconds (5 minutes).
pub const REGISTER_RATE_LIMIT_WINDOW_SECS: u64 = 5 * 60;

/// Longest accepted rate-limit window (one day). Larger configured values
/// fall back to the default.
pub const MAX_RATE_LIMIT_WINDOW_SECS: u64 = 24 * 60 * 60;

/// How often expired rate-limit windows are swept from memory.
pub const RATE_LIMIT_SWEEP_INTERVAL_SECS: u64 = 60;

/// Client key used when no peer address can be determined.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Body returned by the `GET /get` liveness probe.
pub const LIVENESS_MESSAGE: &str = "This is a get response from the APDS API";

/// Postgres SQLSTATE for unique constraint violations.
pub const PG_UNIQUE_VIOLATION: &str = "23505";
