//! In-memory storage implementation for testing and development
//!
//! A single lock guards the whole store, which also provides the per-tenant
//! serialization and (tenant, key) exclusivity the storage traits require.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};
use uuid::Uuid;

use crate::traits::*;
use crate::types::*;

#[derive(Debug, Default)]
struct Inner {
    vendors: HashMap<Uuid, Vendor>,
    invoices: HashMap<Uuid, Invoice>,
    transactions: HashMap<Uuid, BankTransaction>,
    candidates: HashMap<Uuid, MatchCandidate>,
    import_records: HashMap<(Uuid, String), ImportRecord>,
}

/// In-memory storage backend
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all data (useful for testing)
    pub fn clear(&self) {
        let mut inner = self.inner.write().unwrap();
        inner.vendors.clear();
        inner.invoices.clear();
        inner.transactions.clear();
        inner.candidates.clear();
        inner.import_records.clear();
    }

    pub fn insert_vendor(&self, vendor: Vendor) {
        self.inner.write().unwrap().vendors.insert(vendor.id, vendor);
    }

    pub fn insert_invoice(&self, invoice: Invoice) {
        self.inner
            .write()
            .unwrap()
            .invoices
            .insert(invoice.id, invoice);
    }

    pub fn insert_transaction(&self, transaction: BankTransaction) {
        self.inner
            .write()
            .unwrap()
            .transactions
            .insert(transaction.id, transaction);
    }

    /// Number of stored transactions for the tenant
    pub fn transaction_count(&self, tenant_id: Uuid) -> usize {
        self.inner
            .read()
            .unwrap()
            .transactions
            .values()
            .filter(|t| t.tenant_id == tenant_id)
            .count()
    }

    /// Fetch a stored import record outside the trait, for tests
    pub fn import_record(&self, tenant_id: Uuid, key: &str) -> Option<ImportRecord> {
        self.inner
            .read()
            .unwrap()
            .import_records
            .get(&(tenant_id, key.to_string()))
            .cloned()
    }
}

#[async_trait]
impl MatchStorage for MemoryStore {
    async fn open_invoices(&self, tenant_id: Uuid) -> ReconcileResult<Vec<Invoice>> {
        let inner = self.inner.read().unwrap();
        let mut invoices: Vec<Invoice> = inner
            .invoices
            .values()
            .filter(|i| i.tenant_id == tenant_id && i.status == InvoiceStatus::Open)
            .cloned()
            .collect();
        invoices.sort_by_key(|i| i.id);
        Ok(invoices)
    }

    async fn unmatched_transactions(
        &self,
        tenant_id: Uuid,
    ) -> ReconcileResult<Vec<BankTransaction>> {
        let inner = self.inner.read().unwrap();
        let mut transactions: Vec<BankTransaction> = inner
            .transactions
            .values()
            .filter(|t| t.tenant_id == tenant_id && t.status == TransactionStatus::Unmatched)
            .cloned()
            .collect();
        transactions.sort_by_key(|t| t.id);
        Ok(transactions)
    }

    async fn vendors(&self, tenant_id: Uuid) -> ReconcileResult<Vec<Vendor>> {
        let inner = self.inner.read().unwrap();
        let mut vendors: Vec<Vendor> = inner
            .vendors
            .values()
            .filter(|v| v.tenant_id == tenant_id)
            .cloned()
            .collect();
        vendors.sort_by_key(|v| v.id);
        Ok(vendors)
    }

    async fn load_invoice(&self, tenant_id: Uuid, id: Uuid) -> ReconcileResult<Option<Invoice>> {
        Ok(self
            .inner
            .read()
            .unwrap()
            .invoices
            .get(&id)
            .filter(|i| i.tenant_id == tenant_id)
            .cloned())
    }

    async fn load_transaction(
        &self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> ReconcileResult<Option<BankTransaction>> {
        Ok(self
            .inner
            .read()
            .unwrap()
            .transactions
            .get(&id)
            .filter(|t| t.tenant_id == tenant_id)
            .cloned())
    }

    async fn load_candidate(
        &self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> ReconcileResult<Option<MatchCandidate>> {
        Ok(self
            .inner
            .read()
            .unwrap()
            .candidates
            .get(&id)
            .filter(|c| c.tenant_id == tenant_id)
            .cloned())
    }

    async fn list_candidates(
        &self,
        tenant_id: Uuid,
        status: Option<MatchStatus>,
    ) -> ReconcileResult<Vec<MatchCandidate>> {
        let inner = self.inner.read().unwrap();
        let mut candidates: Vec<MatchCandidate> = inner
            .candidates
            .values()
            .filter(|c| c.tenant_id == tenant_id && status.is_none_or(|s| c.status == s))
            .cloned()
            .collect();
        candidates.sort_by_key(|c| c.id);
        Ok(candidates)
    }

    async fn settled_pairs(&self, tenant_id: Uuid) -> ReconcileResult<HashSet<(Uuid, Uuid)>> {
        let inner = self.inner.read().unwrap();
        Ok(inner
            .candidates
            .values()
            .filter(|c| {
                c.tenant_id == tenant_id
                    && matches!(c.status, MatchStatus::Confirmed | MatchStatus::Rejected)
            })
            .map(|c| (c.invoice_id, c.transaction_id))
            .collect())
    }

    async fn supersede_proposed(&mut self, tenant_id: Uuid) -> ReconcileResult<()> {
        let mut inner = self.inner.write().unwrap();
        for candidate in inner.candidates.values_mut() {
            if candidate.tenant_id == tenant_id && candidate.status == MatchStatus::Proposed {
                candidate.status = MatchStatus::Superseded;
            }
        }
        Ok(())
    }

    async fn save_candidates(&mut self, candidates: &[MatchCandidate]) -> ReconcileResult<()> {
        let mut inner = self.inner.write().unwrap();
        for candidate in candidates {
            inner.candidates.insert(candidate.id, candidate.clone());
        }
        Ok(())
    }

    async fn commit_confirmation(
        &mut self,
        candidate: &MatchCandidate,
        invoice: &Invoice,
        transaction: &BankTransaction,
    ) -> ReconcileResult<()> {
        let mut inner = self.inner.write().unwrap();
        if !inner.candidates.contains_key(&candidate.id) {
            return Err(ReconcileError::NotFound("match candidate"));
        }
        if !inner.invoices.contains_key(&invoice.id) {
            return Err(ReconcileError::NotFound("invoice"));
        }
        if !inner.transactions.contains_key(&transaction.id) {
            return Err(ReconcileError::NotFound("bank transaction"));
        }
        inner.candidates.insert(candidate.id, candidate.clone());
        inner.invoices.insert(invoice.id, invoice.clone());
        inner
            .transactions
            .insert(transaction.id, transaction.clone());
        Ok(())
    }

    async fn commit_rejection(&mut self, candidate: &MatchCandidate) -> ReconcileResult<()> {
        let mut inner = self.inner.write().unwrap();
        if !inner.candidates.contains_key(&candidate.id) {
            return Err(ReconcileError::NotFound("match candidate"));
        }
        inner.candidates.insert(candidate.id, candidate.clone());
        Ok(())
    }

    async fn reject_other_candidates(
        &mut self,
        tenant_id: Uuid,
        invoice_id: Uuid,
        transaction_id: Uuid,
        keep_id: Uuid,
    ) -> ReconcileResult<()> {
        let mut inner = self.inner.write().unwrap();
        for candidate in inner.candidates.values_mut() {
            if candidate.tenant_id == tenant_id
                && candidate.id != keep_id
                && candidate.status == MatchStatus::Proposed
                && (candidate.invoice_id == invoice_id
                    || candidate.transaction_id == transaction_id)
            {
                candidate.status = MatchStatus::Rejected;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ImportStorage for MemoryStore {
    async fn find_import_record(
        &self,
        tenant_id: Uuid,
        key: &str,
    ) -> ReconcileResult<Option<ImportRecord>> {
        Ok(self.import_record(tenant_id, key))
    }

    async fn existing_external_refs(
        &self,
        tenant_id: Uuid,
        refs: &[String],
    ) -> ReconcileResult<HashSet<String>> {
        let wanted: HashSet<&String> = refs.iter().collect();
        let inner = self.inner.read().unwrap();
        Ok(inner
            .transactions
            .values()
            .filter(|t| t.tenant_id == tenant_id)
            .filter_map(|t| t.external_ref.clone())
            .filter(|r| wanted.contains(r))
            .collect())
    }

    async fn persist_import(
        &mut self,
        transactions: &[BankTransaction],
        record: &ImportRecord,
    ) -> ReconcileResult<ImportOutcome> {
        let mut inner = self.inner.write().unwrap();
        let record_key = (record.tenant_id, record.key.clone());

        // Check-then-write happens under one lock, so racing callers with
        // the same key cannot both commit.
        if let Some(existing) = inner.import_records.get(&record_key) {
            return Ok(ImportOutcome::Lost(existing.clone()));
        }

        for transaction in transactions {
            inner.transactions.insert(transaction.id, transaction.clone());
        }
        inner.import_records.insert(record_key, record.clone());
        Ok(ImportOutcome::Committed)
    }
}
