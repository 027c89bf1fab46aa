//! Traits for storage abstraction and extensibility
//!
//! The reconciliation core works against any backend (PostgreSQL, SQLite,
//! in-memory, etc.) implementing these traits. Every method is tenant-scoped;
//! implementors must treat ids belonging to another tenant exactly like
//! absent ids so cross-tenant existence never leaks.

use async_trait::async_trait;
use std::collections::HashSet;
use uuid::Uuid;

use crate::types::*;

/// Storage abstraction for reconciliation runs and the match lifecycle
///
/// Concurrency contract: two reconciliation runs for the same tenant must not
/// interleave their commits — implementors serialize them (per-tenant lock or
/// transaction isolation). Runs for different tenants are independent and may
/// execute in parallel.
#[async_trait]
pub trait MatchStorage: Send + Sync {
    /// Invoices in `open` status for the tenant
    async fn open_invoices(&self, tenant_id: Uuid) -> ReconcileResult<Vec<Invoice>>;

    /// Transactions in `unmatched` status for the tenant
    async fn unmatched_transactions(&self, tenant_id: Uuid)
        -> ReconcileResult<Vec<BankTransaction>>;

    /// All vendors for the tenant
    async fn vendors(&self, tenant_id: Uuid) -> ReconcileResult<Vec<Vendor>>;

    async fn load_invoice(&self, tenant_id: Uuid, id: Uuid) -> ReconcileResult<Option<Invoice>>;

    async fn load_transaction(
        &self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> ReconcileResult<Option<BankTransaction>>;

    async fn load_candidate(
        &self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> ReconcileResult<Option<MatchCandidate>>;

    /// List candidates for the tenant, optionally filtered by status
    async fn list_candidates(
        &self,
        tenant_id: Uuid,
        status: Option<MatchStatus>,
    ) -> ReconcileResult<Vec<MatchCandidate>>;

    /// (invoice, transaction) pairs already confirmed or rejected; these are
    /// never re-proposed by a later run
    async fn settled_pairs(&self, tenant_id: Uuid) -> ReconcileResult<HashSet<(Uuid, Uuid)>>;

    /// Mark the tenant's proposed candidates as superseded ahead of a new run
    async fn supersede_proposed(&mut self, tenant_id: Uuid) -> ReconcileResult<()>;

    /// Persist the accepted candidates of one reconciliation run
    async fn save_candidates(&mut self, candidates: &[MatchCandidate]) -> ReconcileResult<()>;

    /// Atomically persist a confirmation: candidate, invoice, and transaction
    /// status changes commit together or not at all
    async fn commit_confirmation(
        &mut self,
        candidate: &MatchCandidate,
        invoice: &Invoice,
        transaction: &BankTransaction,
    ) -> ReconcileResult<()>;

    /// Persist a rejected candidate; invoice and transaction are untouched
    async fn commit_rejection(&mut self, candidate: &MatchCandidate) -> ReconcileResult<()>;

    /// Reject every other proposed candidate referencing the given invoice or
    /// transaction, keeping `keep_id`
    async fn reject_other_candidates(
        &mut self,
        tenant_id: Uuid,
        invoice_id: Uuid,
        transaction_id: Uuid,
        keep_id: Uuid,
    ) -> ReconcileResult<()>;
}

/// Outcome of [`ImportStorage::persist_import`]
#[derive(Debug, Clone, PartialEq)]
pub enum ImportOutcome {
    /// Transactions and record were written
    Committed,
    /// A concurrent caller stored a record for the same (tenant, key) first;
    /// nothing was written, the winner's record is returned
    Lost(ImportRecord),
}

/// Storage abstraction for idempotent bulk imports
///
/// Concurrency contract: `persist_import` must be atomic with respect to
/// concurrent callers using the same (tenant, key) — a unique constraint,
/// lock, or compare-and-swap — so two racing submissions can never both
/// write.
#[async_trait]
pub trait ImportStorage: Send + Sync {
    /// Fetch the stored import record for (tenant, key), if any
    async fn find_import_record(
        &self,
        tenant_id: Uuid,
        key: &str,
    ) -> ReconcileResult<Option<ImportRecord>>;

    /// Which of the given external references already exist for the tenant
    async fn existing_external_refs(
        &self,
        tenant_id: Uuid,
        refs: &[String],
    ) -> ReconcileResult<HashSet<String>>;

    /// Atomically insert the transactions and the import record
    async fn persist_import(
        &mut self,
        transactions: &[BankTransaction],
        record: &ImportRecord,
    ) -> ReconcileResult<ImportOutcome>;
}
