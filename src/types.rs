//! Core types and data structures for the reconciliation system
//!
//! Every entity is scoped to a tenant; no operation in this crate ever reads
//! or mutates data across tenant boundaries.

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::matching::scoring::CompositeScore;

/// Lifecycle states for invoices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    /// Awaiting payment; eligible for reconciliation
    Open,
    /// Matched against a bank transaction via a confirmed candidate
    Matched,
    /// Settled outside reconciliation
    Paid,
    /// Cancelled; never reconciled
    Void,
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            InvoiceStatus::Open => "open",
            InvoiceStatus::Matched => "matched",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Void => "void",
        };
        f.write_str(label)
    }
}

/// Lifecycle states for bank transactions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    /// Not yet claimed by a confirmed match
    Unmatched,
    /// Claimed by a confirmed match
    Matched,
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TransactionStatus::Unmatched => "unmatched",
            TransactionStatus::Matched => "matched",
        };
        f.write_str(label)
    }
}

/// States for match candidates
///
/// `Proposed` moves to `Confirmed` or `Rejected`, both terminal. `Superseded`
/// is applied by a later reconciliation run to proposed candidates it
/// replaces; superseded candidates are kept for audit but accept no further
/// transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    Proposed,
    Confirmed,
    Rejected,
    Superseded,
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            MatchStatus::Proposed => "proposed",
            MatchStatus::Confirmed => "confirmed",
            MatchStatus::Rejected => "rejected",
            MatchStatus::Superseded => "superseded",
        };
        f.write_str(label)
    }
}

/// Vendor associated with a tenant, used for text-similarity boosts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vendor {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Vendor {
    pub fn new(tenant_id: Uuid, name: String) -> Self {
        let now = chrono::Utc::now().naive_utc();
        Self {
            id: Uuid::new_v4(),
            tenant_id,
            name,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Invoice issued within a tenant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: Uuid,
    pub tenant_id: Uuid,
    /// Optional vendor reference used for the vendor-name boost
    pub vendor_id: Option<Uuid>,
    /// Optional human-facing invoice number, unique per tenant when present
    pub invoice_number: Option<String>,
    pub amount: BigDecimal,
    /// ISO 4217 currency code, uppercase
    pub currency: String,
    /// Issue date; when absent the date component receives partial credit
    pub invoice_date: Option<NaiveDate>,
    pub description: Option<String>,
    pub status: InvoiceStatus,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Invoice {
    /// Create a new open invoice
    pub fn new(tenant_id: Uuid, amount: BigDecimal, currency: &str) -> Self {
        let now = chrono::Utc::now().naive_utc();
        Self {
            id: Uuid::new_v4(),
            tenant_id,
            vendor_id: None,
            invoice_number: None,
            amount,
            currency: currency.to_uppercase(),
            invoice_date: None,
            description: None,
            status: InvoiceStatus::Open,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_vendor(mut self, vendor_id: Uuid) -> Self {
        self.vendor_id = Some(vendor_id);
        self
    }

    pub fn with_invoice_number(mut self, invoice_number: impl Into<String>) -> Self {
        self.invoice_number = Some(invoice_number.into());
        self
    }

    pub fn with_date(mut self, invoice_date: NaiveDate) -> Self {
        self.invoice_date = Some(invoice_date);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Bank transaction imported for reconciliation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankTransaction {
    pub id: Uuid,
    pub tenant_id: Uuid,
    /// Natural key from the originating bank feed, unique per tenant when present
    pub external_ref: Option<String>,
    pub amount: BigDecimal,
    /// ISO 4217 currency code, uppercase
    pub currency: String,
    pub posted_at: NaiveDate,
    pub description: Option<String>,
    pub status: TransactionStatus,
    pub created_at: NaiveDateTime,
}

impl BankTransaction {
    /// Create a new unmatched transaction
    pub fn new(tenant_id: Uuid, amount: BigDecimal, currency: &str, posted_at: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant_id,
            external_ref: None,
            amount,
            currency: currency.to_uppercase(),
            posted_at,
            description: None,
            status: TransactionStatus::Unmatched,
            created_at: chrono::Utc::now().naive_utc(),
        }
    }

    pub fn with_external_ref(mut self, external_ref: impl Into<String>) -> Self {
        self.external_ref = Some(external_ref.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Proposed or finalized match between one invoice and one bank transaction
///
/// Created by the candidate generator, thinned by the greedy allocator, and
/// mutated only through the match lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchCandidate {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub invoice_id: Uuid,
    pub transaction_id: Uuid,
    pub score: CompositeScore,
    pub status: MatchStatus,
    /// Stable rendering of the score breakdown, consumed verbatim by the
    /// explanation layer
    pub reasoning: String,
    pub created_at: NaiveDateTime,
}

impl MatchCandidate {
    pub fn proposed(
        tenant_id: Uuid,
        invoice_id: Uuid,
        transaction_id: Uuid,
        score: CompositeScore,
    ) -> Self {
        let reasoning = score.reasoning_text();
        Self {
            id: Uuid::new_v4(),
            tenant_id,
            invoice_id,
            transaction_id,
            score,
            status: MatchStatus::Proposed,
            reasoning,
            created_at: chrono::Utc::now().naive_utc(),
        }
    }
}

/// Stored outcome of a bulk import keyed by (tenant, idempotency key)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportRecord {
    pub tenant_id: Uuid,
    pub key: String,
    /// Order-insensitive SHA-256 hash of the submitted payload
    pub payload_hash: String,
    pub created: u32,
    pub ignored: u32,
    pub created_at: NaiveDateTime,
}

/// Errors surfaced by the reconciliation core
///
/// A currency mismatch is deliberately absent: mismatched currencies hard-gate
/// the score to zero rather than failing.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("storage error: {0}")]
    Storage(String),
    /// Absent entities and cross-tenant references are reported identically
    /// so existence never leaks across tenants.
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("invalid state transition: {entity} is '{current}', requested '{requested}'")]
    InvalidStateTransition {
        entity: &'static str,
        current: String,
        requested: String,
    },
    #[error("idempotency key '{key}' re-used with a different payload (stored hash {stored_hash}, submitted hash {submitted_hash})")]
    IdempotencyConflict {
        key: String,
        stored_hash: String,
        submitted_hash: String,
    },
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("failed to encode import payload: {0}")]
    PayloadEncoding(String),
}

/// Result type for reconciliation operations
pub type ReconcileResult<T> = Result<T, ReconcileError>;
