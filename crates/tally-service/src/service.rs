//! # Ledger Service
//!
//! Builds a [`LedgerReport`] for one query.
//!
//! ## Request Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  customer_ledger(query)            span: request_id = uuid v4           │
//! │                                                                         │
//! │  1. validate_query (page bounds from LedgerConfig)                      │
//! │  2. source.fetch_transactions ──► into_records (returns tagged RETURN)  │
//! │  3. ┌─ single customer ─────────────┐  ┌─ all customers ─────────────┐  │
//! │     │ normalize as one ledger       │  │ aggregate_by_customer       │  │
//! │     │ summary of that ledger        │  │ summary = aggregated        │  │
//! │     │ grouped ledgers (optional)    │  │ transactions = merged desc  │  │
//! │     └───────────────────────────────┘  └─────────────────────────────┘  │
//! │  4. enrichment (optional, bounded concurrency)                          │
//! │  5. pagination                                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Running balances are computed over the records of the fetched page only.

use std::sync::Arc;

use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use tally_core::grouping::{aggregate_by_customer_with, merge_descending, GroupingOptions};
use tally_core::validation::validate_query;
use tally_core::{
    compute_ledger_summary, normalize_with, CustomerFilter, Diagnostics, LedgerQuery,
    RawTransactionRecord,
};

use crate::config::LedgerConfig;
use crate::enrich::{apply_line_items, distinct_ids, fetch_line_items};
use crate::error::ServiceResult;
use crate::report::{CustomerSummary, LedgerReport, PaginationInfo};
use crate::source::{LineItemSource, TransactionSource};

pub struct LedgerService<S> {
    source: Arc<S>,
    config: Arc<LedgerConfig>,
}

impl<S> Clone for LedgerService<S> {
    fn clone(&self) -> Self {
        LedgerService {
            source: Arc::clone(&self.source),
            config: Arc::clone(&self.config),
        }
    }
}

impl<S> LedgerService<S>
where
    S: TransactionSource + LineItemSource,
{
    pub fn new(source: S, config: LedgerConfig) -> Self {
        LedgerService {
            source: Arc::new(source),
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Builds the ledger report for `query`.
    pub async fn customer_ledger(&self, query: LedgerQuery) -> ServiceResult<LedgerReport> {
        let request_id = Uuid::new_v4();
        let span = info_span!(
            "customer_ledger",
            %request_id,
            all_customers = query.customer.is_all()
        );
        self.build_report(query).instrument(span).await
    }

    async fn build_report(&self, mut query: LedgerQuery) -> ServiceResult<LedgerReport> {
        validate_query(&query, self.config.report.max_page_size)?;

        let page_size = query.page.size_or(self.config.report.default_page_size);
        query.page.page_size = Some(page_size);

        let fetched = self.source.fetch_transactions(&query).await?;
        let total_records = fetched.total_records;
        let records = fetched.into_records();
        let fetched_count = records.len();

        let mut report = match &query.customer {
            CustomerFilter::AllCustomers => self.all_customers_report(records),
            CustomerFilter::Customer { name, phone } => {
                self.single_customer_report(name, phone.as_deref(), records)
            }
        };

        if self.config.enrichment.enabled {
            self.enrich(&mut report).await;
        }

        report.pagination = PaginationInfo::new(query.page.page, page_size, total_records);

        info!(
            fetched = fetched_count,
            total_records,
            groups = report.grouped_ledgers.len(),
            diagnostics = report.diagnostics.len(),
            outstanding_balance = report.summary.outstanding_balance.cents(),
            "Ledger report built"
        );
        Ok(report)
    }

    fn grouping_options(&self) -> GroupingOptions {
        GroupingOptions {
            parallel: self.config.engine.parallel_groups,
        }
    }

    fn single_customer_report(
        &self,
        name: &str,
        phone: Option<&str>,
        records: Vec<RawTransactionRecord>,
    ) -> LedgerReport {
        let mut diagnostics = Diagnostics::new();

        let grouped = self
            .config
            .report
            .include_grouped_ledgers
            .then(|| aggregate_by_customer_with(records.clone(), self.grouping_options()));

        let mut transactions = normalize_with(records, &mut diagnostics);
        let summary = compute_ledger_summary(&transactions);
        transactions.reverse();

        // Grouping sees every record the single ledger saw, plus identity.
        let (grouped_ledgers, diagnostics) = match grouped {
            Some(grouped) => (grouped.groups, grouped.diagnostics),
            None => (Vec::new(), diagnostics),
        };

        LedgerReport {
            customer: CustomerSummary::for_customer(name, phone, &summary),
            transactions,
            grouped_ledgers,
            pagination: PaginationInfo::new(1, 1, 0),
            summary,
            diagnostics: diagnostics.into_vec(),
        }
    }

    fn all_customers_report(&self, records: Vec<RawTransactionRecord>) -> LedgerReport {
        let grouped = aggregate_by_customer_with(records, self.grouping_options());
        let transactions = merge_descending(&grouped.groups);

        LedgerReport {
            customer: CustomerSummary::all_customers(&grouped.aggregated_summary),
            transactions,
            grouped_ledgers: grouped.groups,
            pagination: PaginationInfo::new(1, 1, 0),
            summary: grouped.aggregated_summary,
            diagnostics: grouped.diagnostics.into_vec(),
        }
    }

    async fn enrich(&self, report: &mut LedgerReport) {
        let ids = distinct_ids(
            report
                .transactions
                .iter()
                .chain(report.grouped_ledgers.iter().flat_map(|g| g.transactions.iter())),
        );
        if ids.is_empty() {
            return;
        }

        let index =
            fetch_line_items(self.source.as_ref(), ids, self.config.enrichment.concurrency).await;

        apply_line_items(&mut report.transactions, &index);
        for group in &mut report.grouped_ledgers {
            apply_line_items(&mut group.transactions, &index);
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
