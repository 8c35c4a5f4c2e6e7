//! # Ledger Report
//!
//! The response shape shared by single-customer and all-customers requests.
//!
//! ```text
//! LedgerReport
//! ├── customer        CustomerSummary   (requested identity, or "All Customers")
//! ├── transactions    most recent first
//! ├── groupedLedgers  one CustomerLedgerGroup per identity
//! ├── pagination      { page, pageSize, totalRecords, totalPages, hasMore }
//! ├── summary         LedgerSummary
//! └── diagnostics     default substitutions made while building it
//! ```

use serde::Serialize;
use ts_rs::TS;

use tally_core::{
    CustomerLedgerGroup, Diagnostic, LedgerSummary, Money, NormalizedTransaction,
    ALL_CUSTOMERS_LABEL,
};

/// Header of a report: who it is about.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CustomerSummary {
    pub name: String,
    pub phone: Option<String>,
    pub is_all_customers: bool,
    pub total_transactions: usize,
    pub outstanding_balance: Money,
}

impl CustomerSummary {
    pub fn for_customer(name: &str, phone: Option<&str>, summary: &LedgerSummary) -> Self {
        CustomerSummary {
            name: name.to_string(),
            phone: phone.map(str::to_string),
            is_all_customers: false,
            total_transactions: summary.total_transactions,
            outstanding_balance: summary.outstanding_balance,
        }
    }

    pub fn all_customers(summary: &LedgerSummary) -> Self {
        CustomerSummary {
            name: ALL_CUSTOMERS_LABEL.to_string(),
            phone: None,
            is_all_customers: true,
            total_transactions: summary.total_transactions,
            outstanding_balance: summary.outstanding_balance,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PaginationInfo {
    pub page: u32,
    pub page_size: u32,
    pub total_records: usize,
    pub total_pages: usize,
    pub has_more: bool,
}

impl PaginationInfo {
    /// ## Example
    /// ```rust
    /// use tally_service::report::PaginationInfo;
    ///
    /// let info = PaginationInfo::new(2, 20, 45);
    /// assert_eq!(info.total_pages, 3);
    /// assert!(info.has_more);
    /// assert!(!PaginationInfo::new(3, 20, 45).has_more);
    /// ```
    pub fn new(page: u32, page_size: u32, total_records: usize) -> Self {
        let size = page_size.max(1) as usize;
        let total_pages = total_records.div_ceil(size);
        PaginationInfo {
            page,
            page_size,
            total_records,
            total_pages,
            has_more: (page as usize) < total_pages,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct LedgerReport {
    pub customer: CustomerSummary,
    pub transactions: Vec<NormalizedTransaction>,
    pub grouped_ledgers: Vec<CustomerLedgerGroup>,
    pub pagination: PaginationInfo,
    pub summary: LedgerSummary,
    pub diagnostics: Vec<Diagnostic>,
}
