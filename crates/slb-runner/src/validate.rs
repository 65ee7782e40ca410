use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

static ACCOUNT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-z0-9]{3,24}$").unwrap());
static SHARE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-z0-9]([a-z0-9-]{1,61}[a-z0-9])?$").unwrap());

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid storage account name '{0}': must be 3-24 lowercase letters/numbers.")]
    Account(String),

    #[error("Invalid file share name '{0}': must be 3-63 chars, lowercase letters/numbers/hyphens, start/end alphanumeric.")]
    Share(String),

    #[error("Invalid cutoff days '{0}': must be a positive integer.")]
    Days(i64),

    #[error("Invalid parallelism '{0}': must be at least 1.")]
    Parallel(usize),
}

pub fn validate_account(s: &str) -> Result<String, ValidationError> {
    if ACCOUNT_RE.is_match(s) {
        Ok(s.to_string())
    } else {
        Err(ValidationError::Account(s.to_string()))
    }
}

pub fn validate_share(s: &str) -> Result<String, ValidationError> {
    if SHARE_RE.is_match(s) {
        Ok(s.to_string())
    } else {
        Err(ValidationError::Share(s.to_string()))
    }
}

pub fn validate_days(n: i64) -> Result<u32, ValidationError> {
    match u32::try_from(n) {
        Ok(d) if d > 0 => Ok(d),
        _ => Err(ValidationError::Days(n)),
    }
}

/// Values gathered from flags, env and config; any may still be missing.
#[derive(Clone, Debug, Default)]
pub struct RawInputs {
    pub account: Option<String>,
    pub share: Option<String>,
    pub days: Option<i64>,
    pub parallel: usize,
}

/// Validated values; `None` means the operator has to be asked.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CheckedInputs {
    pub account: Option<String>,
    pub share: Option<String>,
    pub days: Option<u32>,
    pub parallel: usize,
}

/// Check everything that was supplied and report every problem at once.
pub fn validate_inputs(raw: &RawInputs) -> Result<CheckedInputs, Vec<ValidationError>> {
    let mut errors = vec![];

    let account = raw.account.as_deref().and_then(|a| validate_account(a).map_err(|e| errors.push(e)).ok());
    let share = raw.share.as_deref().and_then(|s| validate_share(s).map_err(|e| errors.push(e)).ok());
    let days = raw.days.and_then(|d| validate_days(d).map_err(|e| errors.push(e)).ok());
    if raw.parallel == 0 {
        errors.push(ValidationError::Parallel(raw.parallel));
    }

    if errors.is_empty() {
        Ok(CheckedInputs { account, share, days, parallel: raw.parallel })
    } else {
        Err(errors)
    }
}

pub fn format_validation_errors(errors: &[ValidationError]) -> String {
    let mut s = String::from("ERROR: Invalid arguments:\n\n");
    for e in errors {
        s.push_str(&format!("- {e}\n"));
    }
    s
}
