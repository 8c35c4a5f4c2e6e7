//! # Snapshot Source
//!
//! An in-memory [`TransactionSource`] + [`LineItemSource`] over a JSON
//! snapshot, for replaying exports and for tests.
//!
//! ## Snapshot Format
//! ```json
//! {
//!   "sales":   [ { "id": "s1", "transaction_date": "2024-01-01", ... } ],
//!   "returns": [ { "id": "r1", "amount": -20, ... } ],
//!   "line_items": {
//!     "s1": [ { "product_name": "Tea", "quantity": 2, "unit_price": 250, "line_total": 500 } ]
//!   }
//! }
//! ```
//! Line-item money is in cents.
//!
//! ## Filtering
//! ```text
//! sales + returns
//!   │ customer filter  (resolved identity)
//!   │ access scope     (branch_id / warehouse_id extra fields)
//!   │ date range       (resolved transaction date, inclusive)
//!   ▼
//! merged, ordered by (date, id) ──► page slice ──► split back into lists
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use tally_core::normalizer::resolve_date;
use tally_core::{
    resolve_identity, AccessScope, Diagnostics, LedgerQuery, LineItem, RawTransactionRecord, Role,
};

use crate::config::DEFAULT_PAGE_SIZE;
use crate::error::{ServiceError, ServiceResult};
use crate::source::{FetchedTransactions, LineItemSource, TransactionSource};

/// Snapshot file contents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    #[serde(default)]
    pub sales: Vec<RawTransactionRecord>,
    #[serde(default)]
    pub returns: Vec<RawTransactionRecord>,
    #[serde(default)]
    pub line_items: BTreeMap<String, Vec<LineItem>>,
}

#[derive(Debug, Clone, Default)]
pub struct SnapshotSource {
    snapshot: LedgerSnapshot,
}

impl SnapshotSource {
    pub fn new(snapshot: LedgerSnapshot) -> Self {
        SnapshotSource { snapshot }
    }

    pub fn from_json(json: &str) -> ServiceResult<Self> {
        let snapshot: LedgerSnapshot = serde_json::from_str(json)
            .map_err(|e| ServiceError::SnapshotLoadFailed(e.to_string()))?;
        Ok(Self::new(snapshot))
    }

    pub fn from_path(path: &Path) -> ServiceResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ServiceError::SnapshotLoadFailed(format!("{}: {}", path.display(), e))
        })?;
        let source = Self::from_json(&contents)?;
        info!(
            path = %path.display(),
            sales = source.snapshot.sales.len(),
            returns = source.snapshot.returns.len(),
            "Snapshot loaded"
        );
        Ok(source)
    }

    pub fn snapshot(&self) -> &LedgerSnapshot {
        &self.snapshot
    }

    fn select(&self, query: &LedgerQuery) -> FetchedTransactions {
        // Identity and date resolution here is for filtering only; the
        // engine records its own diagnostics when it normalizes.
        let mut scratch = Diagnostics::new();

        let candidates = self
            .snapshot
            .sales
            .iter()
            .map(|r| (r, false))
            .chain(self.snapshot.returns.iter().map(|r| (r, true)));

        let mut matching: Vec<(DateTime<Utc>, Option<String>, bool, &RawTransactionRecord)> =
            Vec::new();
        for (record, is_return) in candidates {
            if !permits(&query.scope, record) {
                continue;
            }
            if !query.customer.matches(&resolve_identity(record, &mut scratch)) {
                continue;
            }
            let id = record.id_text();
            let date = resolve_date(record, id.as_deref(), &mut scratch);
            if query.date_range.contains(date) {
                matching.push((date, id, is_return, record));
            }
        }

        matching.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));

        let total_records = matching.len();
        let size = query.page.size_or(DEFAULT_PAGE_SIZE) as usize;
        let offset = query.page.offset(DEFAULT_PAGE_SIZE);

        let mut fetched = FetchedTransactions {
            total_records,
            ..FetchedTransactions::default()
        };
        for (_, _, is_return, record) in matching.into_iter().skip(offset).take(size) {
            if is_return {
                fetched.returns.push(record.clone());
            } else {
                fetched.sales.push(record.clone());
            }
        }
        fetched
    }
}

/// Whether the caller's scope may see a record.
fn permits(scope: &AccessScope, record: &RawTransactionRecord) -> bool {
    match scope.role {
        Role::Admin => true,
        Role::Manager => scope.branch_id.is_some() && record.extra_text("branch_id") == scope.branch_id,
        Role::Cashier => {
            scope.warehouse_id.is_some() && record.extra_text("warehouse_id") == scope.warehouse_id
        }
    }
}

impl TransactionSource for SnapshotSource {
    async fn fetch_transactions(&self, query: &LedgerQuery) -> ServiceResult<FetchedTransactions> {
        let fetched = self.select(query);
        debug!(
            sales = fetched.sales.len(),
            returns = fetched.returns.len(),
            total_records = fetched.total_records,
            "Snapshot page selected"
        );
        Ok(fetched)
    }
}

impl LineItemSource for SnapshotSource {
    async fn fetch_line_items(&self, transaction_id: &str) -> ServiceResult<Vec<LineItem>> {
        Ok(self
            .snapshot
            .line_items
            .get(transaction_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tally_core::{DateRange, PageRequest};

    const SNAPSHOT: &str = r#"{
        "sales": [
            {"id": "s1", "transaction_date": "2024-01-01", "customer_name": "Ali",
             "amount": 100, "paid_amount": 40, "branch_id": "LHR", "warehouse_id": "W1"},
            {"id": "s2", "transaction_date": "2024-01-10", "customer_name": "Sara",
             "amount": 50, "branch_id": "KHI", "warehouse_id": "W2"},
            {"id": "s3", "created_at": "2024-02-01T08:00:00Z",
             "customer_details": "{\"name\":\"Ali\"}", "amount": 30, "branch_id": "LHR"}
        ],
        "returns": [
            {"id": "r1", "transaction_date": "2024-01-05", "customer_name": "Ali",
             "amount": -20, "branch_id": "LHR", "warehouse_id": "W1"}
        ],
        "line_items": {
            "s1": [{"product_name": "Tea", "sku": "TEA-1", "quantity": 2, "unit_price": 2500, "line_total": 5000}]
        }
    }"#;

    fn source() -> SnapshotSource {
        SnapshotSource::from_json(SNAPSHOT).unwrap()
    }

    fn ids(fetched: &FetchedTransactions) -> Vec<String> {
        fetched
            .sales
            .iter()
            .chain(fetched.returns.iter())
            .filter_map(|r| r.id_text())
            .collect()
    }

    #[tokio::test]
    async fn test_customer_filter_uses_resolved_identity() {
        let fetched = source()
            .fetch_transactions(&LedgerQuery::for_customer("ali", None))
            .await
            .unwrap();

        assert_eq!(fetched.total_records, 3);
        assert_eq!(ids(&fetched), vec!["s1", "s3", "r1"]);
        assert_eq!(fetched.returns.len(), 1);
    }

    #[tokio::test]
    async fn test_scope_filters_by_branch_and_warehouse() {
        let src = source();

        let manager = LedgerQuery::all_customers().with_scope(AccessScope::manager("KHI"));
        assert_eq!(ids(&src.fetch_transactions(&manager).await.unwrap()), vec!["s2"]);

        let cashier = LedgerQuery::all_customers().with_scope(AccessScope::cashier("W1"));
        assert_eq!(ids(&src.fetch_transactions(&cashier).await.unwrap()), vec!["s1", "r1"]);

        let admin = LedgerQuery::all_customers();
        assert_eq!(src.fetch_transactions(&admin).await.unwrap().total_records, 4);
    }

    #[tokio::test]
    async fn test_date_range_filter() {
        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2024, 1, 5),
            NaiveDate::from_ymd_opt(2024, 1, 31),
        );
        let query = LedgerQuery::all_customers().with_date_range(range);
        let fetched = source().fetch_transactions(&query).await.unwrap();
        assert_eq!(ids(&fetched), vec!["s2", "r1"]);
    }

    #[tokio::test]
    async fn test_pagination_over_merged_order() {
        let src = source();

        let first = LedgerQuery::all_customers().with_page(PageRequest::new(1, 2));
        let fetched = src.fetch_transactions(&first).await.unwrap();
        // s1 (01-01), r1 (01-05)
        assert_eq!(ids(&fetched), vec!["s1", "r1"]);
        assert_eq!(fetched.total_records, 4);

        let second = LedgerQuery::all_customers().with_page(PageRequest::new(2, 2));
        assert_eq!(ids(&src.fetch_transactions(&second).await.unwrap()), vec!["s2", "s3"]);

        let beyond = LedgerQuery::all_customers().with_page(PageRequest::new(9, 2));
        let fetched = src.fetch_transactions(&beyond).await.unwrap();
        assert!(fetched.is_empty());
        assert_eq!(fetched.total_records, 4);
    }

    #[tokio::test]
    async fn test_line_items() {
        let src = source();
        let items = src.fetch_line_items("s1").await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].line_total.cents(), 5000);
        assert!(src.fetch_line_items("nope").await.unwrap().is_empty());
    }

    #[test]
    fn test_bad_snapshot() {
        let err = SnapshotSource::from_json("{\"sales\": 5}").unwrap_err();
        assert!(matches!(err, ServiceError::SnapshotLoadFailed(_)));

        let err = SnapshotSource::from_path(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.json"));
    }
}
