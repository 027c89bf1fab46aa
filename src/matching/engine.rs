//! Tenant-scoped reconciliation orchestrator
//!
//! Composes the scoring engine, candidate generator, greedy allocator, and
//! match lifecycle into one run. The computation itself is pure and
//! synchronous; only the surrounding storage calls suspend. Storage
//! implementors serialize same-tenant runs (see [`MatchStorage`]); runs for
//! different tenants share no mutable state and may execute in parallel.

use log::debug;
use std::collections::HashMap;
use uuid::Uuid;

use crate::explain::{ConfidenceBand, InvoiceSummary, MatchContext, TransactionSummary};
use crate::matching::allocator::allocate;
use crate::matching::candidates::CandidateGenerator;
use crate::matching::lifecycle::{ConfirmedMatch, MatchLifecycle};
use crate::matching::scoring::ScoringConfig;
use crate::traits::MatchStorage;
use crate::types::*;

/// Reconciliation engine bound to a storage backend
pub struct ReconciliationEngine<S: MatchStorage> {
    storage: S,
    generator: CandidateGenerator,
    lifecycle: MatchLifecycle<S>,
}

impl<S: MatchStorage + Clone> ReconciliationEngine<S> {
    /// Create an engine with default scoring configuration
    pub fn new(storage: S) -> Self {
        Self {
            lifecycle: MatchLifecycle::new(storage.clone()),
            generator: CandidateGenerator::default(),
            storage,
        }
    }

    /// Create an engine with a custom, validated scoring configuration
    pub fn with_config(storage: S, config: ScoringConfig) -> ReconcileResult<Self> {
        config.validate()?;
        Ok(Self {
            lifecycle: MatchLifecycle::new(storage.clone()),
            generator: CandidateGenerator::new(config),
            storage,
        })
    }

    pub fn config(&self) -> &ScoringConfig {
        self.generator.config()
    }

    /// Run one reconciliation pass for the tenant
    ///
    /// Prior proposed candidates are superseded, fresh candidates are
    /// generated and conflict-resolved, and the accepted set is persisted and
    /// returned. Output is reproducible for a fixed tenant snapshot.
    pub async fn reconcile(&mut self, tenant_id: Uuid) -> ReconcileResult<Vec<MatchCandidate>> {
        let invoices = self.storage.open_invoices(tenant_id).await?;
        let transactions = self.storage.unmatched_transactions(tenant_id).await?;

        self.storage.supersede_proposed(tenant_id).await?;

        if invoices.is_empty() || transactions.is_empty() {
            debug!("tenant {tenant_id}: nothing to reconcile");
            return Ok(Vec::new());
        }

        let vendor_names: HashMap<Uuid, String> = self
            .storage
            .vendors(tenant_id)
            .await?
            .into_iter()
            .map(|vendor| (vendor.id, vendor.name))
            .collect();
        let settled = self.storage.settled_pairs(tenant_id).await?;

        let pool = self.generator.generate(
            tenant_id,
            &invoices,
            &transactions,
            &vendor_names,
            &settled,
        );
        let accepted = allocate(pool);

        debug!(
            "tenant {tenant_id}: {} invoices x {} transactions -> {} accepted candidates",
            invoices.len(),
            transactions.len(),
            accepted.len()
        );

        if !accepted.is_empty() {
            self.storage.save_candidates(&accepted).await?;
        }
        Ok(accepted)
    }

    /// Confirm a proposed candidate (see [`MatchLifecycle::confirm`])
    pub async fn confirm(
        &mut self,
        tenant_id: Uuid,
        candidate_id: Uuid,
    ) -> ReconcileResult<ConfirmedMatch> {
        self.lifecycle.confirm(tenant_id, candidate_id).await
    }

    /// Reject a proposed candidate (see [`MatchLifecycle::reject`])
    pub async fn reject(
        &mut self,
        tenant_id: Uuid,
        candidate_id: Uuid,
    ) -> ReconcileResult<MatchCandidate> {
        self.lifecycle.reject(tenant_id, candidate_id).await
    }

    /// List the tenant's candidates, optionally filtered by status
    pub async fn list_candidates(
        &self,
        tenant_id: Uuid,
        status: Option<MatchStatus>,
    ) -> ReconcileResult<Vec<MatchCandidate>> {
        self.storage.list_candidates(tenant_id, status).await
    }

    /// Build the value object consumed by the explanation layer
    pub async fn match_context(
        &self,
        tenant_id: Uuid,
        candidate_id: Uuid,
    ) -> ReconcileResult<MatchContext> {
        let candidate = self
            .storage
            .load_candidate(tenant_id, candidate_id)
            .await?
            .ok_or(ReconcileError::NotFound("match candidate"))?;
        let invoice = self
            .storage
            .load_invoice(tenant_id, candidate.invoice_id)
            .await?
            .ok_or(ReconcileError::NotFound("invoice"))?;
        let transaction = self
            .storage
            .load_transaction(tenant_id, candidate.transaction_id)
            .await?
            .ok_or(ReconcileError::NotFound("bank transaction"))?;

        let vendor_name = match invoice.vendor_id {
            Some(vendor_id) => self
                .storage
                .vendors(tenant_id)
                .await?
                .into_iter()
                .find(|vendor| vendor.id == vendor_id)
                .map(|vendor| vendor.name),
            None => None,
        };

        let confidence = ConfidenceBand::from_total(candidate.score.total, self.config());
        Ok(MatchContext {
            invoice: InvoiceSummary::from_invoice(&invoice, vendor_name),
            transaction: TransactionSummary::from_transaction(&transaction),
            reasoning: candidate.reasoning.clone(),
            score: candidate.score,
            confidence,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::memory_store::MemoryStore;
    use bigdecimal::BigDecimal;
    use chrono::NaiveDate;
    use std::str::FromStr;

    fn amount(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    async fn seeded_store() -> (MemoryStore, Uuid, Invoice, BankTransaction) {
        let store = MemoryStore::new();
        let tenant = Uuid::new_v4();
        let date = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();

        let invoice = Invoice::new(tenant, amount("100.00"), "USD")
            .with_date(date)
            .with_description("January retainer");
        let transaction = BankTransaction::new(tenant, amount("100.00"), "USD", date)
            .with_description("retainer january");

        store.insert_invoice(invoice.clone());
        store.insert_transaction(transaction.clone());
        (store, tenant, invoice, transaction)
    }

    #[tokio::test]
    async fn reconcile_proposes_and_persists_candidates() {
        let (store, tenant, invoice, transaction) = seeded_store().await;
        let mut engine = ReconciliationEngine::new(store.clone());

        let accepted = engine.reconcile(tenant).await.unwrap();
        assert_eq!(accepted.len(), 1);
        assert_eq!(accepted[0].invoice_id, invoice.id);
        assert_eq!(accepted[0].transaction_id, transaction.id);

        let stored = engine
            .list_candidates(tenant, Some(MatchStatus::Proposed))
            .await
            .unwrap();
        assert_eq!(stored.len(), 1);
    }

    #[tokio::test]
    async fn rerun_supersedes_prior_proposed_candidates() {
        let (store, tenant, _, _) = seeded_store().await;
        let mut engine = ReconciliationEngine::new(store.clone());

        let first = engine.reconcile(tenant).await.unwrap();
        let second = engine.reconcile(tenant).await.unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 1);

        let superseded = engine
            .list_candidates(tenant, Some(MatchStatus::Superseded))
            .await
            .unwrap();
        assert_eq!(superseded.len(), 1);
        assert_eq!(superseded[0].id, first[0].id);

        let proposed = engine
            .list_candidates(tenant, Some(MatchStatus::Proposed))
            .await
            .unwrap();
        assert_eq!(proposed.len(), 1);
        assert_eq!(proposed[0].id, second[0].id);
    }

    #[tokio::test]
    async fn reconcile_output_is_deterministic() {
        let (store, tenant, _, _) = seeded_store().await;
        let date = NaiveDate::from_ymd_opt(2024, 1, 12).unwrap();
        store.insert_transaction(
            BankTransaction::new(tenant, amount("100.50"), "USD", date)
                .with_description("retainer partial"),
        );
        let mut engine = ReconciliationEngine::new(store.clone());

        let snapshot = |candidates: &[MatchCandidate]| {
            candidates
                .iter()
                .map(|c| (c.invoice_id, c.transaction_id, c.score.clone(), c.reasoning.clone()))
                .collect::<Vec<_>>()
        };

        let first = snapshot(&engine.reconcile(tenant).await.unwrap());
        let second = snapshot(&engine.reconcile(tenant).await.unwrap());
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn rejected_pairs_are_not_reproposed() {
        let (store, tenant, _, _) = seeded_store().await;
        let mut engine = ReconciliationEngine::new(store.clone());

        let accepted = engine.reconcile(tenant).await.unwrap();
        engine.reject(tenant, accepted[0].id).await.unwrap();

        let rerun = engine.reconcile(tenant).await.unwrap();
        assert!(rerun.is_empty());
    }

    #[tokio::test]
    async fn tenants_never_see_each_other() {
        let (store, tenant, _, _) = seeded_store().await;
        let other_tenant = Uuid::new_v4();
        let mut engine = ReconciliationEngine::new(store.clone());

        let accepted = engine.reconcile(other_tenant).await.unwrap();
        assert!(accepted.is_empty());

        let accepted = engine.reconcile(tenant).await.unwrap();
        let err = engine
            .match_context(other_tenant, accepted[0].id)
            .await
            .unwrap_err();
        assert!(matches!(err, ReconcileError::NotFound("match candidate")));
    }

    #[tokio::test]
    async fn match_context_carries_score_and_band() {
        let (store, tenant, _, _) = seeded_store().await;
        let mut engine = ReconciliationEngine::new(store.clone());

        let accepted = engine.reconcile(tenant).await.unwrap();
        let context = engine.match_context(tenant, accepted[0].id).await.unwrap();

        assert_eq!(context.score, accepted[0].score);
        assert_eq!(context.reasoning, accepted[0].reasoning);
        assert_eq!(
            context.confidence,
            ConfidenceBand::from_total(accepted[0].score.total, engine.config())
        );
    }

    #[tokio::test]
    async fn invalid_config_is_rejected_at_construction() {
        let (store, _, _, _) = seeded_store().await;
        let mut config = ScoringConfig::default();
        config.score_threshold = 2.0;
        assert!(matches!(
            ReconciliationEngine::with_config(store, config),
            Err(ReconcileError::Configuration(_))
        ));
    }
}
