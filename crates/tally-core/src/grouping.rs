//! # Grouping Aggregator
//!
//! Splits a mixed batch of records into one ledger per customer.
//!
//! ## Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  records                                                                │
//! │     │ resolve_identity → key "name|||phone"                             │
//! │     ▼                                                                   │
//! │  BTreeMap<key, Bucket>            (ordered, deterministic)              │
//! │     │ rayon: one task per bucket, own Diagnostics                       │
//! │     ▼                                                                   │
//! │  normalize → fill identity → summarize (+ totalCredit) → descending     │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  groups sorted by latest date desc, ties by key                         │
//! │  aggregated summary = field-wise sum of group summaries                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Records with the same name but different phones are different customers.
//! Records with the same name and no phone share one `name|||` group.

use std::collections::BTreeMap;

use rayon::prelude::*;
use tracing::debug;

use crate::diagnostics::Diagnostics;
use crate::identity::resolve_identity;
use crate::normalizer::normalize_with;
use crate::summary::{compute_ledger_summary, sale_credit_total};
use crate::types::{
    CustomerIdentity, CustomerLedgerGroup, LedgerSummary, NormalizedTransaction,
    RawTransactionRecord,
};

/// Tuning for [`aggregate_by_customer_with`].
#[derive(Debug, Clone, Copy)]
pub struct GroupingOptions {
    /// Process buckets on the rayon pool.
    pub parallel: bool,
}

impl Default for GroupingOptions {
    fn default() -> Self {
        GroupingOptions { parallel: true }
    }
}

/// Output of the grouping aggregator.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupedLedgers {
    /// Most recently active customer first.
    pub groups: Vec<CustomerLedgerGroup>,
    pub aggregated_summary: LedgerSummary,
    /// Per-bucket diagnostics merged in key order.
    pub diagnostics: Diagnostics,
}

struct Bucket {
    identity: CustomerIdentity,
    records: Vec<RawTransactionRecord>,
    diagnostics: Diagnostics,
}

/// Groups by customer with default options.
pub fn aggregate_by_customer(records: Vec<RawTransactionRecord>) -> GroupedLedgers {
    aggregate_by_customer_with(records, GroupingOptions::default())
}

pub fn aggregate_by_customer_with(
    records: Vec<RawTransactionRecord>,
    options: GroupingOptions,
) -> GroupedLedgers {
    let record_count = records.len();
    let mut buckets: BTreeMap<String, Bucket> = BTreeMap::new();

    for record in records {
        let mut diags = Diagnostics::new();
        let identity = resolve_identity(&record, &mut diags);
        let bucket = buckets.entry(identity.key()).or_insert_with(|| Bucket {
            identity,
            records: Vec::new(),
            diagnostics: Diagnostics::new(),
        });
        bucket.diagnostics.absorb(diags);
        bucket.records.push(record);
    }

    let buckets: Vec<Bucket> = buckets.into_values().collect();
    let built: Vec<(CustomerLedgerGroup, Diagnostics)> = if options.parallel {
        buckets.into_par_iter().map(build_group).collect()
    } else {
        buckets.into_iter().map(build_group).collect()
    };

    let mut diagnostics = Diagnostics::new();
    let mut aggregated_summary = LedgerSummary::default();
    let mut groups = Vec::with_capacity(built.len());
    for (group, diags) in built {
        diagnostics.absorb(diags);
        aggregated_summary = aggregated_summary.merge(group.summary);
        groups.push(group);
    }

    groups.sort_by(|a, b| {
        b.latest_date()
            .cmp(&a.latest_date())
            .then_with(|| a.identity.key().cmp(&b.identity.key()))
    });

    debug!(
        records = record_count,
        groups = groups.len(),
        diagnostics = diagnostics.len(),
        parallel = options.parallel,
        "Ledgers grouped by customer"
    );

    GroupedLedgers {
        groups,
        aggregated_summary,
        diagnostics,
    }
}

fn build_group(bucket: Bucket) -> (CustomerLedgerGroup, Diagnostics) {
    let Bucket {
        identity,
        records,
        mut diagnostics,
    } = bucket;

    let mut transactions = normalize_with(records, &mut diagnostics);
    for txn in &mut transactions {
        if txn.customer_name.is_none() {
            txn.customer_name = Some(identity.name.clone());
        }
        if txn.customer_phone.is_none() {
            txn.customer_phone = identity.phone.clone();
        }
    }

    let mut summary = compute_ledger_summary(&transactions);
    summary.total_credit = Some(sale_credit_total(&transactions));

    // Exact mirror of ledger order: the first row carries the closing balance.
    transactions.reverse();

    (
        CustomerLedgerGroup {
            identity,
            summary,
            transactions,
        },
        diagnostics,
    )
}

/// All transactions of all groups, most recent first (ties by id, descending).
pub fn merge_descending(groups: &[CustomerLedgerGroup]) -> Vec<NormalizedTransaction> {
    let mut merged: Vec<NormalizedTransaction> = groups
        .iter()
        .flat_map(|g| g.transactions.iter().cloned())
        .collect();
    merged.sort_by(|a, b| {
        b.transaction_date
            .cmp(&a.transaction_date)
            .then_with(|| b.id.cmp(&a.id))
    });
    merged
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::money::Money;

    fn sale(id: &str, date: &str, name: &str, phone: Option<&str>, amount: f64) -> RawTransactionRecord {
        RawTransactionRecord::new(id)
            .with_date(date)
            .with_method("CASH")
            .with_customer(name, phone)
            .with_amount(amount)
    }

    fn keys(grouped: &GroupedLedgers) -> Vec<String> {
        grouped.groups.iter().map(|g| g.identity.key()).collect()
    }

    #[test]
    fn test_empty_input() {
        let grouped = aggregate_by_customer(Vec::new());
        assert!(grouped.groups.is_empty());
        assert_eq!(grouped.aggregated_summary, LedgerSummary::default());
        assert!(grouped.diagnostics.is_empty());
    }

    #[test]
    fn test_same_name_distinct_phones_are_separate() {
        let grouped = aggregate_by_customer(vec![
            sale("s1", "2024-01-01", "Ali", Some("0300"), 10.0),
            sale("s2", "2024-01-02", "Ali", Some("0311"), 20.0),
        ]);
        assert_eq!(keys(&grouped), vec!["Ali|||0311", "Ali|||0300"]);
    }

    #[test]
    fn test_missing_phone_merges_with_other_phoneless_records() {
        let mut blank_phone = sale("s2", "2024-01-02", "Sana", None, 20.0);
        blank_phone.customer_phone = Some("   ".into());

        let grouped = aggregate_by_customer(vec![
            sale("s1", "2024-01-01", "Sana", None, 10.0),
            blank_phone,
            sale("s3", "2024-01-03", "Sana", Some("0345"), 5.0),
        ]);

        assert_eq!(grouped.groups.len(), 2);
        let phoneless = grouped
            .groups
            .iter()
            .find(|g| g.identity.phone.is_none())
            .unwrap();
        assert_eq!(phoneless.transactions.len(), 2);
        assert_eq!(phoneless.summary.outstanding_balance.cents(), 3_000);
    }

    #[test]
    fn test_group_transactions_descending_and_identity_filled() {
        let mut embedded = RawTransactionRecord::new("s2")
            .with_date("2024-01-05")
            .with_amount(5.0);
        embedded.customer_details = Some(r#"{"name":"Omar","phone":"0333"}"#.into());

        let grouped = aggregate_by_customer(vec![
            sale("s1", "2024-01-01", "Omar", Some("0333"), 10.0),
            embedded,
        ]);

        let group = &grouped.groups[0];
        let ids: Vec<_> = group.transactions.iter().filter_map(|t| t.id.as_deref()).collect();
        assert_eq!(ids, vec!["s2", "s1"]);
        assert_eq!(group.transactions[0].customer_name.as_deref(), Some("Omar"));
        assert_eq!(group.transactions[0].customer_phone.as_deref(), Some("0333"));
        assert_eq!(group.transactions[0].balance.cents(), 1_500);
    }

    #[test]
    fn test_groups_sorted_by_most_recent_activity() {
        let grouped = aggregate_by_customer(vec![
            sale("a1", "2024-03-01", "Bina", None, 1.0),
            sale("b1", "2024-05-01", "Adil", None, 1.0),
            sale("c1", "2024-03-01", "Asad", None, 1.0),
        ]);
        assert_eq!(keys(&grouped), vec!["Adil|||", "Asad|||", "Bina|||"]);
    }

    #[test]
    fn test_aggregate_equals_sum_of_groups() {
        let grouped = aggregate_by_customer(vec![
            sale("s1", "2024-01-01", "Ali", None, 100.0).with_paid(40.0),
            sale("s2", "2024-01-02", "Ali", None, 50.0).with_credit(50.0),
            sale("s3", "2024-01-01", "Hira", None, 30.0).with_paid(30.0),
            RawTransactionRecord::new("r1")
                .with_date("2024-01-03")
                .with_customer("Hira", None)
                .with_method("REFUND")
                .with_amount(-10.0),
        ]);

        let agg = grouped.aggregated_summary;
        let sum = |f: fn(&LedgerSummary) -> i64| -> i64 {
            grouped.groups.iter().map(|g| f(&g.summary)).sum()
        };

        assert_eq!(agg.total_transactions, 4);
        assert_eq!(agg.total_amount.cents(), sum(|s| s.total_amount.cents()));
        assert_eq!(agg.total_paid.cents(), sum(|s| s.total_paid.cents()));
        assert_eq!(agg.outstanding_balance.cents(), sum(|s| s.outstanding_balance.cents()));
        assert_eq!(agg.outstanding_balance.cents(), 11_000 - 1_000);
        assert_eq!(agg.total_credit, Some(Money::from_cents(5_000)));
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let records: Vec<_> = (0..40)
            .map(|i| {
                sale(
                    &format!("s{i:02}"),
                    &format!("2024-01-{:02}", i % 28 + 1),
                    ["Ali", "Sara", "Omar", "Zain"][i % 4],
                    None,
                    10.0 + i as f64,
                )
            })
            .collect();

        let parallel = aggregate_by_customer_with(records.clone(), GroupingOptions { parallel: true });
        let sequential = aggregate_by_customer_with(records, GroupingOptions { parallel: false });
        assert_eq!(parallel, sequential);
    }

    #[test]
    fn test_malformed_identity_goes_to_unknown_group() {
        let mut broken = RawTransactionRecord::new("x1")
            .with_date("2024-01-01")
            .with_amount(9.0);
        broken.customer_details = Some("{broken".into());

        let grouped = aggregate_by_customer(vec![broken]);
        assert_eq!(keys(&grouped), vec!["Unknown Customer|||"]);
        assert_eq!(grouped.diagnostics.count_kind("malformed_embedded_document"), 1);
        assert_eq!(grouped.diagnostics.count_kind("missing_identity"), 1);
    }

    #[test]
    fn test_merge_descending() {
        let grouped = aggregate_by_customer(vec![
            sale("s1", "2024-01-01", "Ali", None, 1.0),
            sale("s2", "2024-01-03", "Sara", None, 1.0),
            sale("s3", "2024-01-02", "Ali", None, 1.0),
        ]);
        let merged = merge_descending(&grouped.groups);
        let ids: Vec<_> = merged.iter().filter_map(|t| t.id.as_deref()).collect();
        assert_eq!(ids, vec!["s2", "s3", "s1"]);
    }
}
