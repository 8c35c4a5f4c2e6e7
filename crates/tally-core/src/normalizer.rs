//! # Chronological Normalizer
//!
//! Orders one customer's raw records by date and folds them into normalized
//! transactions carrying a running balance.
//!
//! ## The Fold
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  records ──► sort ascending by (date, id) ──► fold                      │
//! │                                                                         │
//! │  LedgerState { running_balance: 0 }                                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  step(state, record) ──► (state', NormalizedTransaction)                │
//! │       │                                                                 │
//! │       ├── SETTLEMENT: posted balance ?? explicit credit                 │
//! │       │               ?? old_balance - paid                             │
//! │       ├── RETURN:     old_balance - |amount|                            │
//! │       └── SALE:       old_balance + amount - actual_payment             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each running balance depends only on the previous balance and the current
//! record. Normalization is one-shot: output is not meant to be fed back in.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::coerce::{
    first_defined, money_from_chain, money_from_first_numeric, timestamp_from_chain, LooseField,
};
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::money::Money;
use crate::types::{
    NormalizedTransaction, PaymentMethod, PaymentStatus, PaymentType, RawTransactionRecord,
    TransactionType,
};

/// State carried between fold steps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LedgerState {
    pub running_balance: Money,
}

/// Normalizes a ledger, discarding diagnostics.
pub fn normalize(records: Vec<RawTransactionRecord>) -> Vec<NormalizedTransaction> {
    let mut diags = Diagnostics::new();
    normalize_with(records, &mut diags)
}

/// Normalizes a ledger, recording every default substitution into `diags`.
///
/// ## Example
/// ```rust
/// use tally_core::normalizer::normalize;
/// use tally_core::RawTransactionRecord;
///
/// let ledger = normalize(vec![
///     RawTransactionRecord::new("s2").with_date("2024-01-02").with_amount(50.0),
///     RawTransactionRecord::new("s1").with_date("2024-01-01").with_amount(100.0).with_paid(40.0),
/// ]);
/// let balances: Vec<i64> = ledger.iter().map(|t| t.balance.cents()).collect();
/// assert_eq!(balances, vec![6_000, 11_000]);
/// ```
pub fn normalize_with(
    records: Vec<RawTransactionRecord>,
    diags: &mut Diagnostics,
) -> Vec<NormalizedTransaction> {
    let count = records.len();
    let mut dated: Vec<(DateTime<Utc>, Option<String>, RawTransactionRecord)> = records
        .into_iter()
        .map(|record| {
            let id = record.id_text();
            (resolve_date(&record, id.as_deref(), diags), id, record)
        })
        .collect();

    // Stable: fully tied records keep their input order.
    dated.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));

    let (state, ledger) = dated.into_iter().fold(
        (LedgerState::default(), Vec::with_capacity(count)),
        |(state, mut ledger), (date, _, record)| {
            let (next, txn) = step(state, record, date, diags);
            ledger.push(txn);
            (next, ledger)
        },
    );

    debug!(
        records = count,
        closing_balance = state.running_balance.cents(),
        "Ledger normalized"
    );
    ledger
}

/// Transaction date: `transaction_date ?? created_at ?? date ?? epoch`.
pub fn resolve_date(
    record: &RawTransactionRecord,
    transaction_id: Option<&str>,
    diags: &mut Diagnostics,
) -> DateTime<Utc> {
    timestamp_from_chain(
        transaction_id,
        &[
            ("transaction_date", record.transaction_date.as_ref()),
            ("created_at", record.created_at.as_ref()),
            ("date", record.date.as_ref()),
        ],
        diags,
    )
    .unwrap_or_default()
}

/// One fold step: applies `record` to `state`.
pub fn step(
    state: LedgerState,
    record: RawTransactionRecord,
    transaction_date: DateTime<Utc>,
    diags: &mut Diagnostics,
) -> (LedgerState, NormalizedTransaction) {
    let id = record.id_text();
    let tid = id.as_deref();

    let paid = money_from_chain(
        tid,
        &[
            ("corrected_paid", record.corrected_paid.as_ref()),
            ("paid_amount", record.paid_amount.as_ref()),
            ("payment_amount", record.payment_amount.as_ref()),
        ],
        diags,
    )
    .unwrap_or_default();

    let explicit_credit = money_from_chain(
        tid,
        &[("credit_amount", record.credit_amount.as_ref())],
        diags,
    );

    let amount = money_from_chain(
        tid,
        &[
            ("amount", record.amount.as_ref()),
            ("subtotal", record.subtotal.as_ref()),
            ("total", record.total.as_ref()),
        ],
        diags,
    )
    .unwrap_or_default();

    let method = record
        .payment_method
        .as_ref()
        .and_then(LooseField::as_text)
        .map(|m| PaymentMethod::parse(&m));
    let payment_type = record
        .payment_type
        .as_ref()
        .and_then(LooseField::as_text)
        .map(|t| PaymentType::parse(&t));

    let fully_credit = method.as_ref().is_some_and(PaymentMethod::is_fully_credit);
    let refund = method.as_ref().is_some_and(PaymentMethod::is_refund);
    let outstanding_settlement = payment_type
        .as_ref()
        .is_some_and(PaymentType::is_outstanding_settlement);

    let old_balance = state.running_balance;
    let mut current_bill_amount = amount;
    let mut total_amount = old_balance + amount;
    let mut actual_payment = paid;

    if fully_credit && !outstanding_settlement {
        actual_payment = Money::zero();
    }

    let declared = declared_type(&record, tid, diags);
    let fallback = if refund {
        TransactionType::Return
    } else {
        TransactionType::Sale
    };
    let kind = declared.unwrap_or(fallback);

    let (running_balance, transaction_type) =
        if outstanding_settlement || kind == TransactionType::Settlement {
            current_bill_amount = Money::zero();
            total_amount = old_balance;
            actual_payment = paid;

            let posted = money_from_first_numeric(
                tid,
                &[
                    ("running_balance", record.running_balance.as_ref()),
                    ("new_balance", record.new_balance.as_ref()),
                    ("post_balance", record.post_balance.as_ref()),
                ],
                diags,
            );
            let balance = first_defined([posted, explicit_credit])
                .unwrap_or(old_balance - actual_payment);
            (balance, TransactionType::Settlement)
        } else if kind == TransactionType::Return || refund {
            (old_balance - amount.abs(), TransactionType::Return)
        } else {
            (
                old_balance + current_bill_amount - actual_payment,
                TransactionType::Sale,
            )
        };

    let payment_status = PaymentStatus::classify(running_balance, actual_payment, method.as_ref());

    let txn = NormalizedTransaction {
        id,
        transaction_date,
        customer_name: record.customer_name.as_ref().and_then(LooseField::as_text),
        customer_phone: record.customer_phone.as_ref().and_then(LooseField::as_text),
        payment_method: method,
        payment_type,
        amount,
        old_balance,
        current_bill_amount,
        total_amount,
        corrected_paid: paid,
        paid_amount: paid,
        actual_payment,
        credit_amount: explicit_credit,
        running_balance,
        balance: running_balance,
        transaction_type,
        transaction_type_display: transaction_type.display_name().to_string(),
        payment_status,
        payment_status_display: payment_status.display_name().to_string(),
        line_items: Vec::new(),
        source: record,
    };

    (LedgerState { running_balance }, txn)
}

fn declared_type(
    record: &RawTransactionRecord,
    transaction_id: Option<&str>,
    diags: &mut Diagnostics,
) -> Option<TransactionType> {
    let declared = record.transaction_type.as_ref().and_then(LooseField::as_text)?;
    let parsed = TransactionType::parse(&declared);
    if parsed.is_none() {
        diags.record(Diagnostic::UnknownTransactionType {
            transaction_id: transaction_id.map(str::to_string),
            declared,
        });
    }
    parsed
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn cents(ledger: &[NormalizedTransaction]) -> Vec<i64> {
        ledger.iter().map(|t| t.balance.cents()).collect()
    }

    fn sale(id: &str, date: &str, amount: f64, paid: f64) -> RawTransactionRecord {
        RawTransactionRecord::new(id)
            .with_date(date)
            .with_method("CASH")
            .with_amount(amount)
            .with_paid(paid)
    }

    #[test]
    fn test_empty_input() {
        assert!(normalize(Vec::new()).is_empty());
    }

    #[test]
    fn test_plain_cash_sale() {
        let ledger = normalize(vec![sale("s1", "2024-01-01", 100.0, 40.0)]);
        let txn = &ledger[0];

        assert_eq!(txn.old_balance, Money::zero());
        assert_eq!(txn.total_amount.cents(), 10_000);
        assert_eq!(txn.balance.cents(), 6_000);
        assert_eq!(txn.running_balance, txn.balance);
        assert_eq!(txn.transaction_type, TransactionType::Sale);
        assert_eq!(txn.payment_status, PaymentStatus::Partial);
        assert_eq!(txn.payment_status_display, "Partially Paid");
    }

    #[test]
    fn test_fully_credit_sale_ignores_payment() {
        let record = RawTransactionRecord::new("s1")
            .with_date("2024-01-01")
            .with_method("FULLY_CREDIT")
            .with_amount(100.0)
            .with_paid(25.0);
        let ledger = normalize(vec![record]);

        assert_eq!(ledger[0].actual_payment, Money::zero());
        assert_eq!(ledger[0].corrected_paid.cents(), 2_500);
        assert_eq!(ledger[0].balance.cents(), 10_000);
        assert_eq!(ledger[0].payment_status, PaymentStatus::Pending);
    }

    #[test]
    fn test_settlement_uses_posted_balance() {
        let settlement = RawTransactionRecord::new("p1")
            .with_date("2024-01-05")
            .with_method("CASH")
            .with_payment_type("OUTSTANDING_SETTLEMENT")
            .with_paid(50.0)
            .with_posted_balance(10.0);
        let ledger = normalize(vec![sale("s1", "2024-01-01", 100.0, 40.0), settlement]);

        assert_eq!(cents(&ledger), vec![6_000, 1_000]);
        let txn = &ledger[1];
        assert_eq!(txn.transaction_type, TransactionType::Settlement);
        assert_eq!(txn.transaction_type_display, "Settlement");
        assert_eq!(txn.current_bill_amount, Money::zero());
        assert_eq!(txn.total_amount.cents(), 6_000);
    }

    #[test]
    fn test_settlement_fallbacks() {
        // explicit credit when no posted balance
        let with_credit = RawTransactionRecord::new("p1")
            .with_date("2024-01-05")
            .with_declared_type("settlement")
            .with_paid(50.0)
            .with_credit(5.0);
        let ledger = normalize(vec![sale("s1", "2024-01-01", 100.0, 40.0), with_credit]);
        assert_eq!(cents(&ledger), vec![6_000, 500]);

        // otherwise old balance minus payment, even for fully credit
        let derived = RawTransactionRecord::new("p1")
            .with_date("2024-01-05")
            .with_method("FULLY_CREDIT")
            .with_payment_type("OUTSTANDING_SETTLEMENT")
            .with_paid(20.0);
        let ledger = normalize(vec![sale("s1", "2024-01-01", 100.0, 40.0), derived]);
        assert_eq!(cents(&ledger), vec![6_000, 4_000]);
        assert_eq!(ledger[1].actual_payment.cents(), 2_000);
        assert_eq!(ledger[1].payment_status, PaymentStatus::Pending);
        assert_eq!(ledger[1].payment_status_display, "Pending");
    }

    #[test]
    fn test_settlement_posted_balance_skips_non_numeric() {
        let mut settlement = RawTransactionRecord::new("p1")
            .with_date("2024-01-05")
            .with_payment_type("OUTSTANDING_SETTLEMENT")
            .with_paid(50.0)
            .with_credit(5.0);
        settlement.running_balance = Some(LooseField::Text("n/a".into()));
        settlement.new_balance = Some(LooseField::Number(12.0));

        let mut diags = Diagnostics::new();
        let ledger = normalize_with(
            vec![sale("s1", "2024-01-01", 100.0, 40.0), settlement],
            &mut diags,
        );

        assert_eq!(cents(&ledger), vec![6_000, 1_200]);
        assert_eq!(diags.count_kind("non_numeric_field"), 1);
    }

    #[test]
    fn test_huge_amounts_clamp_instead_of_overflowing() {
        let ledger = normalize(vec![
            RawTransactionRecord::new("s1").with_date("2024-01-01").with_amount(5e16),
            RawTransactionRecord::new("s2").with_date("2024-01-02").with_amount(5e16),
        ]);
        assert_eq!(ledger[1].balance.cents(), i64::MAX);
        assert_eq!(ledger[1].total_amount.cents(), i64::MAX);

        let summary = crate::summary::compute_ledger_summary(&ledger);
        assert_eq!(summary.total_amount.cents(), i64::MAX);
        assert_eq!(summary.outstanding_balance.cents(), i64::MAX);

        let ret = RawTransactionRecord::new("r1")
            .with_date("2024-01-03")
            .with_declared_type("RETURN")
            .with_amount(-92_233_720_368_547_758.08);
        let ledger = normalize(vec![ret]);
        assert_eq!(ledger[0].transaction_type, TransactionType::Return);
        assert_eq!(ledger[0].balance.cents(), -i64::MAX);
    }

    #[test]
    fn test_return_subtracts_magnitude() {
        for refund in [-20.0, 20.0] {
            let ret = RawTransactionRecord::new("r1")
                .with_date("2024-01-03")
                .with_declared_type("RETURN")
                .with_amount(refund);
            let ledger = normalize(vec![sale("s1", "2024-01-01", 100.0, 40.0), ret]);
            assert_eq!(cents(&ledger), vec![6_000, 4_000]);
            assert_eq!(ledger[1].transaction_type, TransactionType::Return);
        }
    }

    #[test]
    fn test_refund_method_implies_return() {
        let refund = RawTransactionRecord::new("r1")
            .with_date("2024-01-03")
            .with_method("REFUND")
            .with_amount(30.0);
        let ledger = normalize(vec![sale("s1", "2024-01-01", 100.0, 40.0), refund]);
        assert_eq!(ledger[1].transaction_type, TransactionType::Return);
        assert_eq!(ledger[1].balance.cents(), 3_000);
    }

    #[test]
    fn test_unknown_declared_type_falls_back() {
        let record = sale("s1", "2024-01-01", 10.0, 0.0).with_declared_type("EXCHANGE");
        let mut diags = Diagnostics::new();
        let ledger = normalize_with(vec![record], &mut diags);

        assert_eq!(ledger[0].transaction_type, TransactionType::Sale);
        assert_eq!(diags.count_kind("unknown_transaction_type"), 1);
    }

    #[test]
    fn test_order_independent() {
        let records = vec![
            sale("s1", "2024-01-01", 100.0, 40.0),
            sale("s2", "2024-01-02", 50.0, 50.0),
            sale("s3", "2024-01-02", 30.0, 0.0),
            RawTransactionRecord::new("r1")
                .with_date("2024-01-04")
                .with_method("REFUND")
                .with_amount(-20.0),
        ];
        let expected = normalize(records.clone());
        let expected_ids: Vec<_> = expected.iter().map(|t| t.id.clone()).collect();

        let permutations = [[3, 2, 1, 0], [1, 3, 0, 2], [2, 0, 3, 1], [0, 2, 1, 3]];
        for order in permutations {
            let shuffled: Vec<_> = order.iter().map(|&i| records[i].clone()).collect();
            let ledger = normalize(shuffled);
            let ids: Vec<_> = ledger.iter().map(|t| t.id.clone()).collect();
            assert_eq!(ids, expected_ids);
            assert_eq!(cents(&ledger), cents(&expected));
        }
    }

    #[test]
    fn test_date_fallback_chain() {
        let mut late = RawTransactionRecord::new("a").with_amount(5.0);
        late.transaction_date = Some("garbage".into());
        late.created_at = Some("2024-02-01T09:00:00Z".into());

        let mut early = RawTransactionRecord::new("b").with_amount(7.0);
        early.date = Some("2024-01-15".into());

        let undated = RawTransactionRecord::new("c").with_amount(1.0);

        let mut diags = Diagnostics::new();
        let ledger = normalize_with(vec![late, early, undated], &mut diags);
        let ids: Vec<_> = ledger.iter().filter_map(|t| t.id.as_deref()).collect();

        assert_eq!(ids, vec!["c", "b", "a"]);
        assert_eq!(ledger[0].transaction_date, DateTime::<Utc>::default());
        assert_eq!(diags.count_kind("unparseable_date"), 1);
    }

    #[test]
    fn test_non_numeric_amount_defaults_to_zero() {
        let mut record = sale("s1", "2024-01-01", 0.0, 0.0);
        record.amount = Some("twelve".into());
        record.subtotal = Some(LooseField::Number(12.0));

        let mut diags = Diagnostics::new();
        let ledger = normalize_with(vec![record], &mut diags);

        assert_eq!(ledger[0].amount, Money::zero());
        assert_eq!(ledger[0].payment_status, PaymentStatus::Completed);
        assert_eq!(diags.count_kind("non_numeric_field"), 1);
    }

    #[test]
    fn test_source_record_preserved() {
        let record = sale("s1", "2024-01-01", 10.0, 10.0);
        let ledger = normalize(vec![record.clone()]);
        assert_eq!(ledger[0].source, record);
    }

    #[test]
    fn test_serialized_field_names() {
        let ledger = normalize(vec![sale("s1", "2024-01-01", 100.0, 40.0)]);
        let json = serde_json::to_value(&ledger[0]).unwrap();

        for field in [
            "old_balance",
            "amount",
            "total_amount",
            "corrected_paid",
            "paid_amount",
            "running_balance",
            "balance",
            "transaction_type",
            "transaction_type_display",
            "payment_status_display",
        ] {
            assert!(json.get(field).is_some(), "missing {field}");
        }
        assert_eq!(json["balance"], 6_000);
        assert_eq!(json["transaction_type"], "SALE");
        assert_eq!(json["payment_method"], "CASH");
        assert_eq!(json["source"]["id"], "s1");
    }
}
