//! # Reconciliation Core
//!
//! A deterministic engine that reconciles invoices against bank transactions
//! for many isolated tenants.
//!
//! ## Features
//!
//! - **Deterministic scoring**: composite amount/date/text scores with a
//!   vendor-name boost; identical inputs always yield identical scores
//! - **Candidate generation**: per-invoice top-N proposals above a threshold
//! - **Greedy allocation**: single-pass, score-descending conflict resolution
//!   so no invoice or transaction is ever double-booked
//! - **Match lifecycle**: `proposed -> confirmed` / `proposed -> rejected`
//!   transitions with atomic invoice/transaction status updates
//! - **Idempotent imports**: keyed bulk ingestion that replays identical
//!   retries and rejects divergent resubmission
//! - **Storage abstraction**: database-agnostic design with trait-based,
//!   tenant-scoped storage
//!
//! ## Quick Start
//!
//! ```rust
//! use reconciliation_core::{ReconciliationEngine, MemoryStore, Invoice, BankTransaction};
//! use bigdecimal::BigDecimal;
//! use chrono::NaiveDate;
//! use uuid::Uuid;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> reconciliation_core::ReconcileResult<()> {
//! let store = MemoryStore::new();
//! let tenant = Uuid::new_v4();
//! let date = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
//!
//! store.insert_invoice(
//!     Invoice::new(tenant, BigDecimal::from(100), "USD").with_date(date),
//! );
//! store.insert_transaction(BankTransaction::new(
//!     tenant,
//!     BigDecimal::from(100),
//!     "USD",
//!     date,
//! ));
//!
//! let mut engine = ReconciliationEngine::new(store);
//! let proposed = engine.reconcile(tenant).await?;
//! assert_eq!(proposed.len(), 1);
//! # Ok(())
//! # }
//! ```

pub mod explain;
pub mod import;
pub mod matching;
pub mod traits;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use explain::*;
pub use import::*;
pub use matching::*;
pub use traits::*;
pub use types::*;
pub use utils::memory_store::MemoryStore;
