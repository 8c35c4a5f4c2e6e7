//! # Line-Item Enrichment
//!
//! Attaches item detail to finalized transactions.
//!
//! ```text
//! distinct transaction ids
//!     │ stream::iter(..).buffer_unordered(concurrency)
//!     ▼
//! LineItemSource::fetch_line_items(id)   (order-independent)
//!     │ Ok(items)  → index[id] = items
//!     │ Err(e)     → warn!, id left out (items stay empty)
//!     ▼
//! apply_line_items(&mut transactions, &index)
//! ```
//!
//! Enrichment only writes `line_items`. Balances and summaries are already
//! final when it runs.

use std::collections::{BTreeMap, BTreeSet};

use futures::stream::{self, StreamExt};
use tally_core::{LineItem, NormalizedTransaction};
use tracing::{debug, warn};

use crate::source::LineItemSource;

/// Fetched line items by transaction id.
pub type LineItemIndex = BTreeMap<String, Vec<LineItem>>;

/// Distinct ids of the given transactions, skipping those without one.
pub fn distinct_ids<'a>(
    transactions: impl IntoIterator<Item = &'a NormalizedTransaction>,
) -> BTreeSet<String> {
    transactions
        .into_iter()
        .filter_map(|t| t.id.clone())
        .collect()
}

/// Fetches line items for every id, at most `concurrency` at a time.
///
/// Failed fetches are logged and omitted from the index.
pub async fn fetch_line_items<S: LineItemSource>(
    source: &S,
    ids: BTreeSet<String>,
    concurrency: usize,
) -> LineItemIndex {
    let requested = ids.len();

    let results: Vec<_> = stream::iter(ids)
        .map(|id| async move {
            let result = source.fetch_line_items(&id).await;
            (id, result)
        })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    let mut index = LineItemIndex::new();
    let mut failed = 0usize;
    for (id, result) in results {
        match result {
            Ok(items) => {
                index.insert(id, items);
            }
            Err(e) => {
                failed += 1;
                warn!(transaction_id = %id, error = %e, "Line-item fetch failed");
            }
        }
    }

    debug!(requested, fetched = index.len(), failed, "Line items fetched");
    index
}

/// Writes fetched items onto matching transactions.
pub fn apply_line_items(transactions: &mut [NormalizedTransaction], index: &LineItemIndex) {
    for txn in transactions {
        if let Some(items) = txn.id.as_ref().and_then(|id| index.get(id)) {
            txn.line_items = items.clone();
        }
    }
}
