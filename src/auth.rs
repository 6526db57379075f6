use log::{debug, error, info, warn};
use password_auth::{generate_hash, verify_password, VerifyError};
use std::sync::{Arc, LazyLock};
use subtle::ConstantTimeEq;
use uuid::Uuid;

use crate::error::{AppError, AuthFailure};
use crate::models::{LoginRequest, NewCustomer, Profile, RegisterRequest};
use crate::store::{CustomerFilter, CustomerStore, StoreError};
use crate::validate::{validate_login, validate_registration};

/// Hash verified against when the username is unknown, so a miss costs the
/// same as a wrong password. Only dereferenced inside blocking tasks, since
/// the first access runs argon2.
static DUMMY_HASH: LazyLock<String> =
    LazyLock::new(|| generate_hash("dummy-password-for-timing"));

/// Result of a successful registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Created {
    pub id: Uuid,
    pub username: String,
}

/// Result of a successful login. No session is issued; every request
/// authenticates on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authenticated(pub Profile);

/// Validates, registers and logs in customers against a [`CustomerStore`].
pub struct Authenticator {
    store: Arc<dyn CustomerStore>,
}

impl Authenticator {
    pub fn new(store: Arc<dyn CustomerStore>) -> Self {
        Self { store }
    }

    /// Register a new customer.
    ///
    /// Fields are whitelisted before the store is touched. The lookup on
    /// username/account number is a fast path; the store's unique
    /// constraints decide when two registrations race.
    pub async fn register(&self, req: RegisterRequest) -> Result<Created, AppError> {
        validate_registration(&req)?;

        let existing = self
            .store
            .find_one(CustomerFilter::UsernameOrAccountNumber {
                username: req.username.clone(),
                account_number: req.account_number.clone(),
            })
            .await
            .map_err(|e| {
                error!("register: lookup failed for username={}: {}", req.username, e);
                AppError::from(e)
            })?;

        if existing.is_some() {
            warn!(
                "register: username or account number already taken for username={}",
                req.username
            );
            return Err(StoreError::Duplicate.into());
        }

        let password_hash = hash_password(req.password).await?;

        let customer = self
            .store
            .create(NewCustomer {
                full_name: req.full_name,
                id_number: req.id_number,
                account_number: req.account_number,
                username: req.username.clone(),
                password_hash,
            })
            .await
            .map_err(|e| {
                match e {
                    StoreError::Duplicate => warn!(
                        "register: unique constraint rejected username={}",
                        req.username
                    ),
                    StoreError::Unavailable(ref msg) => {
                        error!("register: insert failed for username={}: {}", req.username, msg)
                    }
                }
                AppError::from(e)
            })?;

        info!(
            "register: created customer username={} at {}",
            customer.username, customer.created_at
        );
        Ok(Created {
            id: customer.id,
            username: customer.username,
        })
    }

    /// Check a customer's username, account number and password.
    pub async fn login(&self, req: LoginRequest) -> Result<Authenticated, AppError> {
        validate_login(&req)?;

        let customer = self
            .store
            .find_one(CustomerFilter::Username(req.username.clone()))
            .await
            .map_err(|e| {
                error!("login: lookup failed for username={}: {}", req.username, e);
                AppError::from(e)
            })?;

        let customer = match customer {
            Some(customer) => customer,
            None => {
                let _ = check_dummy_password(req.password).await;
                debug!("login: unknown username={}", req.username);
                return Err(AppError::Auth(AuthFailure::UnknownUser));
            }
        };

        let account_matches: bool = customer
            .account_number
            .as_bytes()
            .ct_eq(req.account_number.as_bytes())
            .into();
        if !account_matches {
            warn!("login: account number mismatch for username={}", req.username);
            return Err(AppError::Auth(AuthFailure::AccountMismatch));
        }

        if !check_password(req.password, customer.password_hash).await? {
            warn!("login: invalid password for username={}", req.username);
            return Err(AppError::Auth(AuthFailure::BadPassword));
        }

        info!("login: successful login for username={}", customer.username);
        Ok(Authenticated(Profile {
            full_name: customer.full_name,
            username: customer.username,
        }))
    }
}

/// Salt and hash a password off the async runtime.
async fn hash_password(password: String) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || generate_hash(password))
        .await
        .map_err(|e| {
            error!("hash_password: hashing task failed: {}", e);
            AppError::Internal("Password hashing failed".to_string())
        })
}

/// Verify a password against a stored PHC hash off the async runtime.
/// `Ok(false)` means the password is wrong; an unreadable hash is an error.
async fn check_password(password: String, hash: String) -> Result<bool, AppError> {
    verify_blocking(move || verify_password(password, &hash)).await
}

/// Burn one verification for a username that does not exist.
async fn check_dummy_password(password: String) -> Result<bool, AppError> {
    verify_blocking(move || verify_password(password, DUMMY_HASH.as_str())).await
}

async fn verify_blocking<F>(verify: F) -> Result<bool, AppError>
where
    F: FnOnce() -> Result<(), VerifyError> + Send + 'static,
{
    let outcome = tokio::task::spawn_blocking(verify).await.map_err(|e| {
        error!("check_password: verification task failed: {}", e);
        AppError::Internal("Password verification failed".to_string())
    })?;

    match outcome {
        Ok(()) => Ok(true),
        Err(VerifyError::PasswordInvalid) => Ok(false),
        Err(e) => {
            error!("check_password: stored hash is unreadable: {}", e);
            Err(AppError::Internal("Stored password hash is invalid".to_string()))
        }
    }
}
