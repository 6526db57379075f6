use crate::error::AppError;
use crate::models::{LoginRequest, RegisterRequest};
use regex::Regex;
use std::sync::LazyLock;

/// The kinds of customer input that are whitelisted before any business logic runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    FullName,
    IdNumber,
    AccountNumber,
    Username,
    Password,
}

static FULL_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z\s\-']{3,100}$").expect("full name pattern"));
static ID_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9]{10,13}$").expect("id number pattern"));
static ACCOUNT_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{8,12}$").expect("account number pattern"));
static USERNAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_]{3,30}$").expect("username pattern"));
static PASSWORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9!@£$%^&*]{6,50}$").expect("password pattern"));

impl FieldKind {
    fn pattern(self) -> &'static Regex {
        match self {
            FieldKind::FullName => &*FULL_NAME,
            FieldKind::IdNumber => &*ID_NUMBER,
            FieldKind::AccountNumber => &*ACCOUNT_NUMBER,
            FieldKind::Username => &*USERNAME,
            FieldKind::Password => &*PASSWORD,
        }
    }
}

/// Whitelist check: `true` only if `value` is non-empty and fully matches the
/// pattern for `kind`.
pub fn validate(value: &str, kind: FieldKind) -> bool {
    !value.is_empty() && kind.pattern().is_match(value)
}

fn require(value: &str, kind: FieldKind, message: &str) -> Result<(), AppError> {
    if validate(value, kind) {
        Ok(())
    } else {
        Err(AppError::Validation(message.to_string()))
    }
}

/// Validate a registration payload, stopping at the first bad field.
pub fn validate_registration(req: &RegisterRequest) -> Result<(), AppError> {
    require(&req.full_name, FieldKind::FullName, "Invalid full name format.")?;
    require(&req.id_number, FieldKind::IdNumber, "Invalid ID number format.")?;
    require(
        &req.account_number,
        FieldKind::AccountNumber,
        "Invalid account number format.",
    )?;
    require(&req.username, FieldKind::Username, "Invalid username format.")?;
    require(&req.password, FieldKind::Password, "Invalid password format.")
}

/// Validate a login payload, stopping at the first bad field.
pub fn validate_login(req: &LoginRequest) -> Result<(), AppError> {
    require(&req.username, FieldKind::Username, "Invalid username.")?;
    require(&req.password, FieldKind::Password, "Invalid password.")?;
    require(
        &req.account_number,
        FieldKind::AccountNumber,
        "Invalid account number.",
    )
}
