//! Finite-state lifecycle for match candidates
//!
//! `proposed -> confirmed` and `proposed -> rejected` are the only legal
//! transitions; both are terminal. Confirmation also flips the invoice to
//! `matched` and the transaction to `matched` in one atomic commit.

use log::debug;
use uuid::Uuid;

use crate::traits::MatchStorage;
use crate::types::*;

/// Outcome of a successful confirmation
#[derive(Debug, Clone, PartialEq)]
pub struct ConfirmedMatch {
    pub candidate: MatchCandidate,
    pub invoice: Invoice,
    pub transaction: BankTransaction,
}

/// Manages status transitions for match candidates
pub struct MatchLifecycle<S: MatchStorage> {
    storage: S,
}

impl<S: MatchStorage> MatchLifecycle<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Confirm a proposed candidate
    ///
    /// Requires the candidate to be `proposed`, its invoice `open`, and its
    /// transaction `unmatched`. On success the candidate becomes `confirmed`,
    /// the invoice `matched`, the transaction `matched`, and every sibling
    /// proposed candidate referencing the same invoice or transaction is
    /// rejected.
    pub async fn confirm(
        &mut self,
        tenant_id: Uuid,
        candidate_id: Uuid,
    ) -> ReconcileResult<ConfirmedMatch> {
        let mut candidate = self
            .storage
            .load_candidate(tenant_id, candidate_id)
            .await?
            .ok_or(ReconcileError::NotFound("match candidate"))?;

        if candidate.status != MatchStatus::Proposed {
            return Err(ReconcileError::InvalidStateTransition {
                entity: "match candidate",
                current: candidate.status.to_string(),
                requested: MatchStatus::Confirmed.to_string(),
            });
        }

        let mut invoice = self
            .storage
            .load_invoice(tenant_id, candidate.invoice_id)
            .await?
            .ok_or(ReconcileError::NotFound("invoice"))?;
        if invoice.status != InvoiceStatus::Open {
            return Err(ReconcileError::InvalidStateTransition {
                entity: "invoice",
                current: invoice.status.to_string(),
                requested: InvoiceStatus::Matched.to_string(),
            });
        }

        let mut transaction = self
            .storage
            .load_transaction(tenant_id, candidate.transaction_id)
            .await?
            .ok_or(ReconcileError::NotFound("bank transaction"))?;
        if transaction.status != TransactionStatus::Unmatched {
            return Err(ReconcileError::InvalidStateTransition {
                entity: "bank transaction",
                current: transaction.status.to_string(),
                requested: TransactionStatus::Matched.to_string(),
            });
        }

        candidate.status = MatchStatus::Confirmed;
        invoice.status = InvoiceStatus::Matched;
        invoice.updated_at = chrono::Utc::now().naive_utc();
        transaction.status = TransactionStatus::Matched;

        self.storage
            .commit_confirmation(&candidate, &invoice, &transaction)
            .await?;
        self.storage
            .reject_other_candidates(
                tenant_id,
                candidate.invoice_id,
                candidate.transaction_id,
                candidate.id,
            )
            .await?;

        debug!(
            "confirmed candidate {} (invoice {}, transaction {})",
            candidate.id, candidate.invoice_id, candidate.transaction_id
        );

        Ok(ConfirmedMatch {
            candidate,
            invoice,
            transaction,
        })
    }

    /// Reject a proposed candidate
    ///
    /// The invoice and transaction keep their statuses and remain eligible
    /// for future reconciliation runs.
    pub async fn reject(
        &mut self,
        tenant_id: Uuid,
        candidate_id: Uuid,
    ) -> ReconcileResult<MatchCandidate> {
        let mut candidate = self
            .storage
            .load_candidate(tenant_id, candidate_id)
            .await?
            .ok_or(ReconcileError::NotFound("match candidate"))?;

        if candidate.status != MatchStatus::Proposed {
            return Err(ReconcileError::InvalidStateTransition {
                entity: "match candidate",
                current: candidate.status.to_string(),
                requested: MatchStatus::Rejected.to_string(),
            });
        }

        candidate.status = MatchStatus::Rejected;
        self.storage.commit_rejection(&candidate).await?;

        debug!("rejected candidate {}", candidate.id);
        Ok(candidate)
    }
}
