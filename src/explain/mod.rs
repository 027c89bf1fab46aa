//! Explanation boundary: match context, confidence bands, and pluggable
//! backends
//!
//! The core hands the explanation layer a [`MatchContext`] built from factual
//! engine output. Backends render that context into prose; they never
//! re-score or fabricate values. Which backend runs is decided once at
//! startup from configuration, never by runtime type inspection.

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::matching::scoring::{CompositeScore, ScoringConfig};
use crate::types::{BankTransaction, Invoice};

/// Confidence classification derived purely from the composite total
///
/// Thresholding lives in the core contract so it is reproducible no matter
/// which explanation backend is plugged in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceBand {
    High,
    Medium,
    Low,
}

impl ConfidenceBand {
    pub fn from_total(total: f64, config: &ScoringConfig) -> Self {
        if total >= config.confidence_high {
            ConfidenceBand::High
        } else if total >= config.confidence_medium {
            ConfidenceBand::Medium
        } else {
            ConfidenceBand::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidenceBand::High => "high",
            ConfidenceBand::Medium => "medium",
            ConfidenceBand::Low => "low",
        }
    }
}

/// Invoice facts exposed to the explanation layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceSummary {
    pub id: Uuid,
    pub amount: BigDecimal,
    pub currency: String,
    pub invoice_date: Option<NaiveDate>,
    pub description: Option<String>,
    pub vendor_name: Option<String>,
}

impl InvoiceSummary {
    pub fn from_invoice(invoice: &Invoice, vendor_name: Option<String>) -> Self {
        Self {
            id: invoice.id,
            amount: invoice.amount.clone(),
            currency: invoice.currency.clone(),
            invoice_date: invoice.invoice_date,
            description: invoice.description.clone(),
            vendor_name,
        }
    }
}

/// Transaction facts exposed to the explanation layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionSummary {
    pub id: Uuid,
    pub amount: BigDecimal,
    pub currency: String,
    pub posted_at: NaiveDate,
    pub description: Option<String>,
}

impl TransactionSummary {
    pub fn from_transaction(transaction: &BankTransaction) -> Self {
        Self {
            id: transaction.id,
            amount: transaction.amount.clone(),
            currency: transaction.currency.clone(),
            posted_at: transaction.posted_at,
            description: transaction.description.clone(),
        }
    }
}

/// Everything an explanation backend may consume
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchContext {
    pub invoice: InvoiceSummary,
    pub transaction: TransactionSummary,
    pub score: CompositeScore,
    pub confidence: ConfidenceBand,
    /// Stable score breakdown rendered by the engine, passed through verbatim
    pub reasoning: String,
}

/// Renders a match context into human-readable text
///
/// Remote (e.g. AI-assisted) backends implement this trait in the embedding
/// application; the core ships two deterministic implementations.
pub trait ExplanationBackend: Send + Sync {
    fn explain(&self, context: &MatchContext) -> String;
}

/// Which in-crate backend to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExplainerKind {
    /// Band-keyed prose templates
    #[default]
    Narrative,
    /// Plain rendering of the factual breakdown
    Breakdown,
}

/// Explanation layer configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExplainConfig {
    pub backend: ExplainerKind,
}

/// Select the configured backend once at startup
pub fn resolve_backend(config: &ExplainConfig) -> Box<dyn ExplanationBackend> {
    match config.backend {
        ExplainerKind::Narrative => Box::new(NarrativeExplainer),
        ExplainerKind::Breakdown => Box::new(BreakdownExplainer),
    }
}

/// Deterministic prose templates keyed by confidence band
pub struct NarrativeExplainer;

impl ExplanationBackend for NarrativeExplainer {
    fn explain(&self, context: &MatchContext) -> String {
        let template = match context.confidence {
            ConfidenceBand::High => {
                "The invoice and transaction align strongly: tight amount match, \
                 date proximity, and descriptive similarity."
            }
            ConfidenceBand::Medium => {
                "The match appears plausible with reasonable amount alignment \
                 and some context overlap."
            }
            ConfidenceBand::Low => {
                "The evidence is weak; consider manual review before confirming."
            }
        };
        format!(
            "{template} Invoice {amount} {currency} vs transaction {txn_amount} {txn_currency} \
             posted {posted}. Breakdown: {reasoning}",
            amount = context.invoice.amount,
            currency = context.invoice.currency,
            txn_amount = context.transaction.amount,
            txn_currency = context.transaction.currency,
            posted = context.transaction.posted_at,
            reasoning = context.reasoning,
        )
    }
}

/// Renders the factual breakdown with no narrative framing
pub struct BreakdownExplainer;

impl ExplanationBackend for BreakdownExplainer {
    fn explain(&self, context: &MatchContext) -> String {
        format!(
            "confidence: {}; {}",
            context.confidence.as_str(),
            context.reasoning
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matching::scoring::CompositeScore;
    use std::str::FromStr;

    fn context(total: f64) -> MatchContext {
        let config = ScoringConfig::default();
        let score = CompositeScore {
            amount: 1.0,
            date: 1.0,
            text: 0.5,
            vendor: 0.0,
            amount_exact: true,
            total,
        };
        MatchContext {
            invoice: InvoiceSummary {
                id: Uuid::new_v4(),
                amount: BigDecimal::from_str("100.00").unwrap(),
                currency: "USD".to_string(),
                invoice_date: NaiveDate::from_ymd_opt(2024, 1, 10),
                description: Some("hosting".to_string()),
                vendor_name: Some("CloudHost".to_string()),
            },
            transaction: TransactionSummary {
                id: Uuid::new_v4(),
                amount: BigDecimal::from_str("100.00").unwrap(),
                currency: "USD".to_string(),
                posted_at: NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
                description: Some("CLOUDHOST".to_string()),
            },
            reasoning: score.reasoning_text(),
            confidence: ConfidenceBand::from_total(total, &config),
            score,
        }
    }

    #[test]
    fn bands_follow_configured_thresholds() {
        let config = ScoringConfig::default();
        assert_eq!(ConfidenceBand::from_total(0.70, &config), ConfidenceBand::High);
        assert_eq!(ConfidenceBand::from_total(0.69, &config), ConfidenceBand::Medium);
        assert_eq!(ConfidenceBand::from_total(0.45, &config), ConfidenceBand::Medium);
        assert_eq!(ConfidenceBand::from_total(0.44, &config), ConfidenceBand::Low);
    }

    #[test]
    fn bare_exact_amount_same_day_pair_is_high_confidence() {
        // No description, no vendor: only the exact amount and same-day date
        // contribute, and that alone must classify as high.
        use crate::matching::scoring::score_pair;

        let config = ScoringConfig::default();
        let date = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        let invoice = Invoice::new(
            Uuid::new_v4(),
            BigDecimal::from_str("100.00").unwrap(),
            "USD",
        )
        .with_date(date);
        let transaction = BankTransaction::new(
            invoice.tenant_id,
            BigDecimal::from_str("100.00").unwrap(),
            "USD",
            date,
        );

        let score = score_pair(&config, &invoice, None, &transaction).unwrap();
        assert!((score.total - 0.7).abs() < 1e-9, "total was {}", score.total);
        assert_eq!(
            ConfidenceBand::from_total(score.total, &config),
            ConfidenceBand::High
        );
    }

    #[test]
    fn narrative_backend_embeds_the_reasoning_verbatim() {
        let ctx = context(0.9);
        let text = NarrativeExplainer.explain(&ctx);
        assert!(text.contains(&ctx.reasoning));
        assert!(text.contains("align strongly"));
    }

    #[test]
    fn breakdown_backend_reports_band_and_components() {
        let ctx = context(0.5);
        let text = BreakdownExplainer.explain(&ctx);
        assert!(text.starts_with("confidence: medium;"));
        assert!(text.contains("total:"));
    }

    #[test]
    fn backend_selection_is_config_driven() {
        let ctx = context(0.9);
        let narrative = resolve_backend(&ExplainConfig {
            backend: ExplainerKind::Narrative,
        });
        let breakdown = resolve_backend(&ExplainConfig {
            backend: ExplainerKind::Breakdown,
        });
        assert_ne!(narrative.explain(&ctx), breakdown.explain(&ctx));
    }

    #[test]
    fn explanations_are_deterministic() {
        let ctx = context(0.6);
        let backend = resolve_backend(&ExplainConfig::default());
        assert_eq!(backend.explain(&ctx), backend.explain(&ctx));
    }
}
