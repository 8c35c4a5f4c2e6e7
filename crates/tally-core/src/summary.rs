//! # Summary Calculator
//!
//! Totals and status counts over a normalized ledger.
//!
//! The input must be in ascending chronological order, as produced by
//! [`crate::normalizer::normalize`]. The order is not re-checked: given any
//! other order, `outstanding_balance` reports the balance of whichever
//! transaction happens to be last.

use crate::money::Money;
use crate::types::{LedgerSummary, NormalizedTransaction, PaymentStatus, TransactionType};

/// Summarizes an ascending ledger.
///
/// ## Example
/// ```rust
/// use tally_core::normalizer::normalize;
/// use tally_core::summary::compute_ledger_summary;
/// use tally_core::RawTransactionRecord;
///
/// let ledger = normalize(vec![
///     RawTransactionRecord::new("s1").with_date("2024-01-01").with_amount(100.0).with_paid(40.0),
/// ]);
/// let summary = compute_ledger_summary(&ledger);
/// assert_eq!(summary.outstanding_balance.cents(), 6_000);
/// assert_eq!(summary.partial_transactions, 1);
/// ```
pub fn compute_ledger_summary(transactions: &[NormalizedTransaction]) -> LedgerSummary {
    let mut summary = LedgerSummary {
        total_transactions: transactions.len(),
        outstanding_balance: transactions.last().map(|t| t.balance).unwrap_or_default(),
        ..LedgerSummary::default()
    };

    for txn in transactions {
        summary.total_amount += txn.amount;
        summary.total_paid += txn.corrected_paid;

        match txn.payment_status {
            PaymentStatus::Completed => summary.completed_transactions += 1,
            PaymentStatus::Pending => summary.pending_transactions += 1,
            PaymentStatus::Partial => summary.partial_transactions += 1,
            PaymentStatus::Outstanding => {}
        }
    }

    summary
}

/// Sum of explicit credit amounts over SALE transactions.
pub fn sale_credit_total(transactions: &[NormalizedTransaction]) -> Money {
    transactions
        .iter()
        .filter(|t| t.transaction_type == TransactionType::Sale)
        .filter_map(|t| t.credit_amount)
        .sum()
}
