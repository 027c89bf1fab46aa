//! Deterministic scoring heuristics for invoice/transaction pairs
//!
//! A composite score is the weighted sum of amount, date, and text components
//! plus an additive vendor-name boost, clamped to [0, 1]. Identical inputs
//! always produce an identical score and breakdown; there is no randomness and
//! no wall-clock dependence.

use bigdecimal::{BigDecimal, ToPrimitive};
use serde::{Deserialize, Serialize};

use crate::types::{BankTransaction, Invoice, ReconcileError, ReconcileResult};

/// Weights, windows, and thresholds driving the scoring engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    /// Weight awarded when amounts match exactly
    pub amount_exact_weight: f64,
    /// Weight awarded for amounts inside the tolerance window; mutually
    /// exclusive with the exact-match weight
    pub amount_tolerance_weight: f64,
    /// Tolerance window as a percentage of the invoice amount
    pub amount_tolerance_pct: f64,
    pub date_weight: f64,
    /// Days at which the date component decays to zero
    pub date_window_days: i64,
    pub text_weight: f64,
    /// Additive boost when the transaction memo mentions the vendor name
    pub vendor_boost_weight: f64,
    /// Minimum total for a pair to become a candidate
    pub score_threshold: f64,
    /// Candidates kept per invoice before allocation
    pub max_candidates_per_invoice: usize,
    /// Total at or above which confidence is `High`
    pub confidence_high: f64,
    /// Total at or above which confidence is `Medium`
    pub confidence_medium: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            amount_exact_weight: 0.5,
            amount_tolerance_weight: 0.2,
            amount_tolerance_pct: 1.0,
            date_weight: 0.2,
            date_window_days: 30,
            text_weight: 0.1,
            vendor_boost_weight: 0.05,
            score_threshold: 0.3,
            max_candidates_per_invoice: 5,
            confidence_high: 0.70,
            confidence_medium: 0.45,
        }
    }
}

impl ScoringConfig {
    /// Validate weights, windows, and thresholds
    pub fn validate(&self) -> ReconcileResult<()> {
        let weights = [
            ("amount_exact_weight", self.amount_exact_weight),
            ("amount_tolerance_weight", self.amount_tolerance_weight),
            ("date_weight", self.date_weight),
            ("text_weight", self.text_weight),
            ("vendor_boost_weight", self.vendor_boost_weight),
        ];
        for (name, value) in weights {
            if !(0.0..=1.0).contains(&value) {
                return Err(ReconcileError::Configuration(format!(
                    "{name} must be within [0, 1], got {value}"
                )));
            }
        }

        let base = self.amount_exact_weight + self.date_weight + self.text_weight;
        if base > 1.0 {
            return Err(ReconcileError::Configuration(format!(
                "base weights must not exceed 1.0, got {base}"
            )));
        }

        if self.amount_tolerance_pct <= 0.0 {
            return Err(ReconcileError::Configuration(format!(
                "amount_tolerance_pct must be positive, got {}",
                self.amount_tolerance_pct
            )));
        }

        if self.date_window_days < 1 {
            return Err(ReconcileError::Configuration(format!(
                "date_window_days must be at least 1, got {}",
                self.date_window_days
            )));
        }

        if !(0.0..=1.0).contains(&self.score_threshold) {
            return Err(ReconcileError::Configuration(format!(
                "score_threshold must be within [0, 1], got {}",
                self.score_threshold
            )));
        }

        if self.max_candidates_per_invoice == 0 {
            return Err(ReconcileError::Configuration(
                "max_candidates_per_invoice must be at least 1".to_string(),
            ));
        }

        if self.confidence_medium > self.confidence_high
            || !(0.0..=1.0).contains(&self.confidence_high)
            || !(0.0..=1.0).contains(&self.confidence_medium)
        {
            return Err(ReconcileError::Configuration(format!(
                "confidence thresholds must satisfy 0 <= medium <= high <= 1, got medium {} high {}",
                self.confidence_medium, self.confidence_high
            )));
        }

        Ok(())
    }
}

/// Composite score with its component breakdown
///
/// All sub-scores are in [0, 1]. `amount` holds the exact-match sub-score when
/// `amount_exact` is set, otherwise the tolerance decay; only the applicable
/// amount weight contributes to `total`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeScore {
    pub amount: f64,
    pub date: f64,
    pub text: f64,
    pub vendor: f64,
    pub amount_exact: bool,
    pub total: f64,
}

impl CompositeScore {
    /// Score carrying all-zero components, used for hard-gated pairs
    pub fn zero() -> Self {
        Self {
            amount: 0.0,
            date: 0.0,
            text: 0.0,
            vendor: 0.0,
            amount_exact: false,
            total: 0.0,
        }
    }

    /// Render the breakdown as a stable, human-diffable summary
    ///
    /// The output is factual context for the explanation layer; it formats the
    /// computed values and nothing else.
    pub fn reasoning_text(&self) -> String {
        let amount_kind = if self.amount_exact {
            "exact"
        } else {
            "tolerance"
        };
        format!(
            "amount ({amount_kind}): {:.4}; date: {:.4}; text: {:.4}; vendor: {:.4}; total: {:.4}",
            self.amount, self.date, self.text, self.vendor, self.total
        )
    }
}

/// Compute the composite score for one invoice/transaction pair
///
/// Pairs with mismatched currencies score zero regardless of every other
/// field. `vendor_name` is the display name of the invoice's vendor, when one
/// exists.
pub fn score_pair(
    config: &ScoringConfig,
    invoice: &Invoice,
    vendor_name: Option<&str>,
    transaction: &BankTransaction,
) -> Option<CompositeScore> {
    if invoice.currency != transaction.currency {
        return Some(CompositeScore::zero());
    }

    let diff = (&invoice.amount - &transaction.amount).abs();
    let diff_f64 = diff.to_f64()?;
    let invoice_amount = invoice.amount.abs().to_f64()?;

    let (amount, amount_exact) = amount_component(config, &diff, diff_f64, invoice_amount);
    let date = date_component(config, invoice, transaction);
    let text = text_component(invoice, vendor_name, transaction);
    let vendor = vendor_component(vendor_name, transaction);

    let amount_weight = if amount_exact {
        config.amount_exact_weight
    } else {
        config.amount_tolerance_weight
    };
    let total = amount_weight * amount
        + config.date_weight * date
        + config.text_weight * text
        + config.vendor_boost_weight * vendor;
    let total = round4(total.clamp(0.0, 1.0));

    Some(CompositeScore {
        amount: round4(amount),
        date: round4(date),
        text: round4(text),
        vendor: round4(vendor),
        amount_exact,
        total,
    })
}

fn amount_component(
    config: &ScoringConfig,
    diff: &BigDecimal,
    diff_f64: f64,
    invoice_amount: f64,
) -> (f64, bool) {
    use bigdecimal::Zero;

    if diff.is_zero() {
        return (1.0, true);
    }

    let window = invoice_amount * config.amount_tolerance_pct / 100.0;
    if window > 0.0 && diff_f64 < window {
        ((1.0 - diff_f64 / window).clamp(0.0, 1.0), false)
    } else {
        (0.0, false)
    }
}

fn date_component(
    config: &ScoringConfig,
    invoice: &Invoice,
    transaction: &BankTransaction,
) -> f64 {
    match invoice.invoice_date {
        // Partial credit keeps undated invoices matchable without letting
        // them outrank dated ones.
        None => 0.3,
        Some(invoice_date) => {
            let days = (transaction.posted_at - invoice_date).num_days().abs();
            (1.0 - days as f64 / config.date_window_days as f64).clamp(0.0, 1.0)
        }
    }
}

fn text_component(
    invoice: &Invoice,
    vendor_name: Option<&str>,
    transaction: &BankTransaction,
) -> f64 {
    let invoice_text = invoice
        .description
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .or(vendor_name);

    match (invoice_text, transaction.description.as_deref()) {
        (Some(a), Some(b)) => bigram_similarity(a, b),
        (None, None) => 0.0,
        _ => 0.3,
    }
}

fn vendor_component(vendor_name: Option<&str>, transaction: &BankTransaction) -> f64 {
    let Some(name) = vendor_name.filter(|n| !n.trim().is_empty()) else {
        return 0.0;
    };
    match transaction.description.as_deref() {
        // Vendor known but the feed carried no memo; small credit so a bare
        // memo does not zero out an otherwise strong pair.
        None => 0.2,
        Some(memo) => {
            if memo.to_lowercase().contains(&name.to_lowercase()) {
                1.0
            } else {
                0.0
            }
        }
    }
}

/// Normalized character-bigram Dice similarity over lowercased text
fn bigram_similarity(a: &str, b: &str) -> f64 {
    let a = normalize(a);
    let b = normalize(b);
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }

    let bigrams = |s: &[char]| -> Vec<(char, char)> {
        s.windows(2).map(|w| (w[0], w[1])).collect()
    };
    let chars_a: Vec<char> = a.chars().collect();
    let chars_b: Vec<char> = b.chars().collect();
    if chars_a.len() < 2 || chars_b.len() < 2 {
        return 0.0;
    }

    let mut grams_a = bigrams(&chars_a);
    let grams_b = bigrams(&chars_b);
    let total = grams_a.len() + grams_b.len();

    let mut overlap = 0usize;
    for gram in &grams_b {
        if let Some(pos) = grams_a.iter().position(|g| g == gram) {
            grams_a.swap_remove(pos);
            overlap += 1;
        }
    }

    2.0 * overlap as f64 / total as f64
}

fn normalize(s: &str) -> String {
    s.to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}
