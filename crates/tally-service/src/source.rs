//! # Collaborator Traits
//!
//! The engine never fetches anything itself. A source implements these two
//! traits; [`crate::snapshot::SnapshotSource`] is the in-memory one.
//!
//! ```text
//! LedgerService ──fetch_transactions(&LedgerQuery)──► TransactionSource
//!               ◄── FetchedTransactions { sales, returns, total_records }
//!
//! enrich        ──fetch_line_items(id)──────────────► LineItemSource
//!               ◄── Vec<LineItem>
//! ```

use std::future::Future;

use tally_core::coerce::LooseField;
use tally_core::{LedgerQuery, LineItem, RawTransactionRecord, TransactionType};

use crate::error::ServiceResult;

/// One page of raw records, as returned by a source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchedTransactions {
    pub sales: Vec<RawTransactionRecord>,
    pub returns: Vec<RawTransactionRecord>,
    /// Matching records across all pages.
    pub total_records: usize,
}

impl FetchedTransactions {
    /// Flattens both lists into one batch.
    ///
    /// Records from the returns list with no declared type are tagged
    /// `RETURN`; a declared type is never overwritten.
    pub fn into_records(self) -> Vec<RawTransactionRecord> {
        let returns = self.returns.into_iter().map(|mut record| {
            if !record.has_declared_type() {
                record.transaction_type =
                    Some(LooseField::Text(TransactionType::Return.to_string()));
            }
            record
        });
        self.sales.into_iter().chain(returns).collect()
    }

    pub fn len(&self) -> usize {
        self.sales.len() + self.returns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sales.is_empty() && self.returns.is_empty()
    }
}

/// Fetches the raw records matching a query.
pub trait TransactionSource: Send + Sync {
    /// Returns the requested page. The page size is already resolved.
    fn fetch_transactions(
        &self,
        query: &LedgerQuery,
    ) -> impl Future<Output = ServiceResult<FetchedTransactions>> + Send;
}

/// Fetches item detail for one transaction.
pub trait LineItemSource: Send + Sync {
    fn fetch_line_items(
        &self,
        transaction_id: &str,
    ) -> impl Future<Output = ServiceResult<Vec<LineItem>>> + Send;
}
