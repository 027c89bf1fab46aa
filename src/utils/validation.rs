//! Validation helpers for incoming records

use crate::types::{ReconcileError, ReconcileResult};

/// Whether a currency code looks like ISO 4217 (three ASCII letters)
pub fn is_valid_currency(code: &str) -> bool {
    code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic())
}

/// Validate a caller-supplied idempotency key
pub fn validate_idempotency_key(key: &str) -> ReconcileResult<()> {
    if key.trim().is_empty() {
        return Err(ReconcileError::Configuration(
            "idempotency key cannot be empty".to_string(),
        ));
    }
    if key.len() > 128 {
        return Err(ReconcileError::Configuration(
            "idempotency key cannot exceed 128 characters".to_string(),
        ));
    }
    Ok(())
}
