//! # tally-core: Customer Ledger Reconciliation Engine
//!
//! Turns a snapshot of raw sales, returns and settlements into chronologically
//! ordered ledgers with running balances, payment statuses and summaries.
//! Everything here is pure: no I/O, and no state kept between calls.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tally Architecture                               │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    tally-cli (binary)                           │   │
//! │  │        args ──► LedgerQuery ──► JSON report on stdout           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 tally-service (async orchestration)             │   │
//! │  │    config, sources, enrichment, pagination, LedgerReport        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ tally-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌────────────┐  ┌───────────┐  ┌──────────┐   │   │
//! │  │   │ identity  │  │ normalizer │  │  summary  │  │ grouping │   │   │
//! │  │   │ who?      │  │ balances   │  │ totals    │  │ per-cust │   │   │
//! │  │   └───────────┘  └────────────┘  └───────────┘  └──────────┘   │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (raw record, normalized transaction, summaries)
//! - [`money`] - Money type with integer arithmetic
//! - [`coerce`] - Loose input fields and the `first_defined` coalescing rule
//! - [`identity`] - Identity Resolver
//! - [`normalizer`] - Chronological Normalizer (the running-balance fold)
//! - [`summary`] - Summary Calculator
//! - [`grouping`] - Grouping Aggregator
//! - [`diagnostics`] - Default-substitution events
//! - [`query`] / [`validation`] - What callers may ask for
//! - [`error`] - Domain error types
//!
//! ## Design Principles
//!
//! 1. **Never fail on data**: malformed records degrade to defaults and are
//!    reported through [`Diagnostics`]
//! 2. **Integer Money**: all balances are cents (i64)
//! 3. **Deterministic**: ordering ties are broken by id, groups by key
//!
//! ## Example Usage
//!
//! ```rust
//! use tally_core::grouping::aggregate_by_customer;
//! use tally_core::RawTransactionRecord;
//!
//! let grouped = aggregate_by_customer(vec![
//!     RawTransactionRecord::new("s1")
//!         .with_date("2024-01-01")
//!         .with_customer("Ayesha", Some("0300"))
//!         .with_method("CASH")
//!         .with_amount(100.0)
//!         .with_paid(40.0),
//!     RawTransactionRecord::new("s2")
//!         .with_date("2024-01-02")
//!         .with_customer("Bilal", None)
//!         .with_method("FULLY_CREDIT")
//!         .with_amount(25.0),
//! ]);
//!
//! assert_eq!(grouped.groups.len(), 2);
//! assert_eq!(grouped.aggregated_summary.outstanding_balance.cents(), 8_500);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod coerce;
pub mod diagnostics;
pub mod error;
pub mod grouping;
pub mod identity;
pub mod money;
pub mod normalizer;
pub mod query;
pub mod summary;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use diagnostics::{Diagnostic, Diagnostics};
pub use error::{CoreError, CoreResult, ValidationError};
pub use grouping::{aggregate_by_customer, GroupedLedgers};
pub use identity::resolve_identity;
pub use money::Money;
pub use normalizer::{normalize, normalize_with};
pub use query::{AccessScope, CustomerFilter, DateRange, LedgerQuery, PageRequest, Role};
pub use summary::compute_ledger_summary;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Label of the synthetic customer shown on all-customers reports.
pub const ALL_CUSTOMERS_LABEL: &str = "All Customers";
