use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ── Customer ───────────────────────────────────────────────────────────

/// A stored customer record. Holds the password hash only.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Customer {
    pub id: Uuid,
    pub full_name: String,
    // Stored for the account record; no route reads it back.
    #[allow(dead_code)]
    pub id_number: String,
    pub account_number: String,
    pub username: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Fields for a customer that has not been persisted yet.
#[derive(Debug, Clone)]
pub struct NewCustomer {
    pub full_name: String,
    pub id_number: String,
    pub account_number: String,
    pub username: String,
    pub password_hash: String,
}

// ── Register ───────────────────────────────────────────────────────────

// Missing fields deserialize as empty strings so they fail validation with a
// field-specific message instead of a generic body rejection.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub id_number: String,
    #[serde(default)]
    pub account_number: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

// ── Login ──────────────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub account_number: String,
}

/// The minimal profile returned after a successful login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub full_name: String,
    pub username: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub message: String,
    pub user: Profile,
}

// ── Shared ─────────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

// ── Health ──────────────────────────────────────────────────────────────

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub database: String,
}
