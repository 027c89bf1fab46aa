//! Greedy conflict resolution across generated candidates
//!
//! A single score-descending pass over the pool, accepting a candidate only
//! when neither its invoice nor its transaction has been claimed yet. This is
//! an O(n log n) approximation of the optimal bipartite assignment; the
//! trade-off is deliberate and the pass must stay single and greedy.

use std::collections::HashSet;
use uuid::Uuid;

use crate::types::MatchCandidate;

/// Resolve double-allocation conflicts in a candidate pool
///
/// Candidates are ordered by descending total, ties broken by (invoice id,
/// transaction id) ascending so the output is reproducible. Accepted
/// candidates stay `proposed`; conflicting ones are dropped and can be
/// regenerated by a later run.
pub fn allocate(mut candidates: Vec<MatchCandidate>) -> Vec<MatchCandidate> {
    candidates.sort_by(|a, b| {
        b.score
            .total
            .total_cmp(&a.score.total)
            .then(a.invoice_id.cmp(&b.invoice_id))
            .then(a.transaction_id.cmp(&b.transaction_id))
    });

    let mut claimed_invoices: HashSet<Uuid> = HashSet::new();
    let mut claimed_transactions: HashSet<Uuid> = HashSet::new();
    let mut accepted = Vec::new();

    for candidate in candidates {
        if claimed_invoices.contains(&candidate.invoice_id)
            || claimed_transactions.contains(&candidate.transaction_id)
        {
            continue;
        }
        claimed_invoices.insert(candidate.invoice_id);
        claimed_transactions.insert(candidate.transaction_id);
        accepted.push(candidate);
    }

    accepted
}
