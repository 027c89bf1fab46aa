//! Deterministic payload hashing for idempotent imports

use sha2::{Digest, Sha256};

use crate::import::guard::ImportItem;
use crate::types::{ReconcileError, ReconcileResult};

/// Order-insensitive SHA-256 hash of an import payload
///
/// Each item is serialized to canonical JSON, the serialized items are
/// sorted, and the joined sequence is hashed. Reordering an otherwise
/// identical batch therefore yields the same hash and never triggers a false
/// idempotency conflict.
pub fn payload_hash(items: &[ImportItem]) -> ReconcileResult<String> {
    let mut parts = items
        .iter()
        .map(|item| {
            serde_json::to_string(item)
                .map_err(|err| ReconcileError::PayloadEncoding(err.to_string()))
        })
        .collect::<ReconcileResult<Vec<String>>>()?;
    parts.sort();

    let mut hasher = Sha256::new();
    for part in &parts {
        hasher.update(part.as_bytes());
        hasher.update(b"\n");
    }
    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;
    use chrono::NaiveDate;
    use std::str::FromStr;

    fn item(external_ref: &str, amount: &str) -> ImportItem {
        ImportItem {
            external_ref: Some(external_ref.to_string()),
            amount: BigDecimal::from_str(amount).unwrap(),
            currency: "USD".to_string(),
            posted_at: NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
            description: None,
        }
    }

    #[test]
    fn hash_is_stable_for_identical_payloads() {
        let payload = vec![item("t1", "50"), item("t2", "75")];
        assert_eq!(payload_hash(&payload).unwrap(), payload_hash(&payload).unwrap());
    }

    #[test]
    fn hash_ignores_item_order() {
        let forward = vec![item("t1", "50"), item("t2", "75")];
        let reversed = vec![item("t2", "75"), item("t1", "50")];
        assert_eq!(
            payload_hash(&forward).unwrap(),
            payload_hash(&reversed).unwrap()
        );
    }

    #[test]
    fn hash_changes_with_content() {
        let original = vec![item("t1", "50")];
        let altered = vec![item("t1", "51")];
        assert_ne!(
            payload_hash(&original).unwrap(),
            payload_hash(&altered).unwrap()
        );
    }
}
