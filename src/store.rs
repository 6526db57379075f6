use async_trait::async_trait;
use chrono::Utc;
use log::{debug, error, info};
use sqlx::postgres::{PgPool, PgPoolOptions};
use uuid::Uuid;

use crate::constants::PG_UNIQUE_VIOLATION;
use crate::models::{Customer, NewCustomer};

/// Lookup criteria understood by [`CustomerStore::find_one`].
#[derive(Debug, Clone)]
pub enum CustomerFilter {
    Username(String),
    UsernameOrAccountNumber {
        username: String,
        account_number: String,
    },
}

#[derive(Debug)]
pub enum StoreError {
    Unavailable(String),
    /// A unique constraint on username or account number rejected the write.
    Duplicate,
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Unavailable(msg) => write!(f, "Store unavailable: {}", msg),
            StoreError::Duplicate => write!(f, "Duplicate customer"),
        }
    }
}

impl std::error::Error for StoreError {}

/// Persistence collaborator for customer records.
///
/// Each call is a single-record atomic operation. Uniqueness of `username`
/// and `account_number` must be enforced by the implementation itself; the
/// lookup callers do before `create` is only a fast path.
#[async_trait]
pub trait CustomerStore: Send + Sync {
    async fn find_one(&self, filter: CustomerFilter) -> Result<Option<Customer>, StoreError>;
    async fn create(&self, customer: NewCustomer) -> Result<Customer, StoreError>;
    async fn ping(&self) -> Result<(), StoreError>;
}

// ── Postgres ───────────────────────────────────────────────────────────

const CUSTOMER_COLUMNS: &str =
    "id, full_name, id_number, account_number, username, password_hash, created_at";

pub struct PgCustomerStore {
    pool: PgPool,
}

impl PgCustomerStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        info!("store: database connection pool established");
        Ok(Self { pool })
    }

    /// Create the customer table if it does not exist yet.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS apds_customer (
                id              UUID PRIMARY KEY,
                full_name       TEXT NOT NULL,
                id_number       TEXT NOT NULL,
                account_number  TEXT NOT NULL UNIQUE,
                username        TEXT NOT NULL UNIQUE,
                password_hash   TEXT NOT NULL,
                created_at      TIMESTAMPTZ NOT NULL DEFAULT now()
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!("store: failed to ensure schema: {}", e);
            StoreError::Unavailable(e.to_string())
        })?;
        debug!("store: schema ready");
        Ok(())
    }
}

fn map_sqlx_error(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = e {
        if db_err.code().as_deref() == Some(PG_UNIQUE_VIOLATION) {
            return StoreError::Duplicate;
        }
    }
    StoreError::Unavailable(e.to_string())
}

#[async_trait]
impl CustomerStore for PgCustomerStore {
    async fn find_one(&self, filter: CustomerFilter) -> Result<Option<Customer>, StoreError> {
        let row = match filter {
            CustomerFilter::Username(username) => {
                let sql = format!(
                    "SELECT {} FROM apds_customer WHERE username = $1",
                    CUSTOMER_COLUMNS
                );
                sqlx::query_as::<_, Customer>(&sql)
                    .bind(username)
                    .fetch_optional(&self.pool)
                    .await
            }
            CustomerFilter::UsernameOrAccountNumber {
                username,
                account_number,
            } => {
                let sql = format!(
                    "SELECT {} FROM apds_customer WHERE username = $1 OR account_number = $2 LIMIT 1",
                    CUSTOMER_COLUMNS
                );
                sqlx::query_as::<_, Customer>(&sql)
                    .bind(username)
                    .bind(account_number)
                    .fetch_optional(&self.pool)
                    .await
            }
        };

        row.map_err(map_sqlx_error)
    }

    async fn create(&self, customer: NewCustomer) -> Result<Customer, StoreError> {
        let sql = format!(
            r#"
            INSERT INTO apds_customer
                (id, full_name, id_number, account_number, username, password_hash, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            CUSTOMER_COLUMNS
        );
        sqlx::query_as::<_, Customer>(&sql)
            .bind(Uuid::new_v4())
            .bind(&customer.full_name)
            .bind(&customer.id_number)
            .bind(&customer.account_number)
            .bind(&customer.username)
            .bind(&customer.password_hash)
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| ())
            .map_err(map_sqlx_error)
    }
}

// ── In-memory (tests) ──────────────────────────────────────────────────

#[cfg(test)]
pub use memory::MemoryCustomerStore;

#[cfg(test)]
mod memory {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use tokio::sync::RwLock;

    /// Store used by tests. Enforces the same unique constraints as the table.
    #[derive(Default)]
    pub struct MemoryCustomerStore {
        customers: RwLock<Vec<Customer>>,
        lookups: AtomicUsize,
        offline: AtomicBool,
        blind_lookups: AtomicBool,
    }

    impl MemoryCustomerStore {
        pub fn new() -> Self {
            Self::default()
        }

        /// Number of `find_one` calls served so far.
        pub fn lookups(&self) -> usize {
            self.lookups.load(Ordering::SeqCst)
        }

        /// Make every operation fail as if the database were unreachable.
        pub fn set_offline(&self, offline: bool) {
            self.offline.store(offline, Ordering::SeqCst);
        }

        /// Make `find_one` miss everything, reproducing the check-then-insert race.
        pub fn set_blind_lookups(&self, blind: bool) {
            self.blind_lookups.store(blind, Ordering::SeqCst);
        }

        pub async fn all(&self) -> Vec<Customer> {
            self.customers.read().await.clone()
        }

        fn check_online(&self) -> Result<(), StoreError> {
            if self.offline.load(Ordering::SeqCst) {
                Err(StoreError::Unavailable("connection refused".to_string()))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl CustomerStore for MemoryCustomerStore {
        async fn find_one(&self, filter: CustomerFilter) -> Result<Option<Customer>, StoreError> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            self.check_online()?;
            if self.blind_lookups.load(Ordering::SeqCst) {
                return Ok(None);
            }
            let customers = self.customers.read().await;
            let found = customers.iter().find(|c| match &filter {
                CustomerFilter::Username(username) => &c.username == username,
                CustomerFilter::UsernameOrAccountNumber {
                    username,
                    account_number,
                } => &c.username == username || &c.account_number == account_number,
            });
            Ok(found.cloned())
        }

        async fn create(&self, customer: NewCustomer) -> Result<Customer, StoreError> {
            self.check_online()?;
            let mut customers = self.customers.write().await;
            if customers.iter().any(|c| {
                c.username == customer.username || c.account_number == customer.account_number
            }) {
                return Err(StoreError::Duplicate);
            }
            let record = Customer {
                id: Uuid::new_v4(),
                full_name: customer.full_name,
                id_number: customer.id_number,
                account_number: customer.account_number,
                username: customer.username,
                password_hash: customer.password_hash,
                created_at: Utc::now(),
            };
            customers.push(record.clone());
            Ok(record)
        }

        async fn ping(&self) -> Result<(), StoreError> {
            self.check_online()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_customer(username: &str, account_number: &str) -> NewCustomer {
        NewCustomer {
            full_name: "Jane Doe".to_string(),
            id_number: "AB12345678".to_string(),
            account_number: account_number.to_string(),
            username: username.to_string(),
            password_hash: "$argon2id$v=19$stub".to_string(),
        }
    }

    #[tokio::test]
    async fn test_memory_store_create_then_find() {
        let store = MemoryCustomerStore::new();
        let created = store.create(new_customer("jane_d", "123456789")).await.unwrap();

        let found = store
            .find_one(CustomerFilter::Username("jane_d".to_string()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, created.id);

        let missing = store
            .find_one(CustomerFilter::Username("john".to_string()))
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_memory_store_or_filter_matches_either_field() {
        let store = MemoryCustomerStore::new();
        store.create(new_customer("jane_d", "123456789")).await.unwrap();

        let by_account = store
            .find_one(CustomerFilter::UsernameOrAccountNumber {
                username: "someone_else".to_string(),
                account_number: "123456789".to_string(),
            })
            .await
            .unwrap();
        assert!(by_account.is_some());
    }

    #[tokio::test]
    async fn test_memory_store_enforces_unique_constraints() {
        let store = MemoryCustomerStore::new();
        store.create(new_customer("jane_d", "123456789")).await.unwrap();

        let same_username = store.create(new_customer("jane_d", "987654321")).await;
        assert!(matches!(same_username, Err(StoreError::Duplicate)));

        let same_account = store.create(new_customer("john_d", "123456789")).await;
        assert!(matches!(same_account, Err(StoreError::Duplicate)));
    }

    #[tokio::test]
    async fn test_memory_store_offline() {
        let store = MemoryCustomerStore::new();
        store.set_offline(true);
        assert!(matches!(store.ping().await, Err(StoreError::Unavailable(_))));
    }
}
