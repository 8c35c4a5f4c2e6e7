//! # tally-service: Ledger Reports for Tally
//!
//! This crate wraps the pure `tally-core` engine with everything a caller
//! needs to serve a customer ledger: fetching raw records from a source,
//! configuration, optional line-item enrichment and the paginated report
//! shape.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Ledger Service Layer                            │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                 LedgerService (Main Orchestrator)                │  │
//! │  │                                                                  │  │
//! │  │  customer_ledger(LedgerQuery) → LedgerReport                    │  │
//! │  └────────────────────────────┬─────────────────────────────────────┘  │
//! │                               │                                         │
//! │         ┌─────────────────────┼─────────────────────┐                  │
//! │         ▼                     ▼                     ▼                   │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────┐    │
//! │  │ Sources        │  │ tally-core     │  │ Enrichment             │    │
//! │  │                │  │                │  │                        │    │
//! │  │ Transaction +  │  │ normalize,     │  │ Line items per         │    │
//! │  │ LineItem traits│  │ group, summary │  │ transaction, bounded   │    │
//! │  │ JSON snapshot  │  │                │  │ concurrency            │    │
//! │  └────────────────┘  └────────────────┘  └────────────────────────┘    │
//! │                                                                         │
//! │  CONFIG: ledger.toml + TALLY_* environment overrides                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//! - [`config`] - Report, enrichment and engine settings
//! - [`enrich`] - Concurrent line-item fetching
//! - [`error`] - Service error types
//! - [`report`] - Report, pagination and customer header types
//! - [`service`] - The `LedgerService` orchestrator
//! - [`snapshot`] - In-memory source over a JSON export
//! - [`source`] - Collaborator traits
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tally_service::{LedgerConfig, LedgerService, SnapshotSource};
//! use tally_core::LedgerQuery;
//!
//! let config = LedgerConfig::load_or_default(None);
//! let source = SnapshotSource::from_path("export.json".as_ref())?;
//! let service = LedgerService::new(source, config);
//!
//! let report = service
//!     .customer_ledger(LedgerQuery::for_customer("Ayesha", Some("0300-1234567")))
//!     .await?;
//! println!("Outstanding: {}", report.summary.outstanding_balance);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod enrich;
pub mod error;
pub mod report;
pub mod service;
pub mod snapshot;
pub mod source;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use config::LedgerConfig;
pub use error::{ServiceError, ServiceResult};
pub use report::{CustomerSummary, LedgerReport, PaginationInfo};
pub use service::LedgerService;
pub use snapshot::{LedgerSnapshot, SnapshotSource};
pub use source::{FetchedTransactions, LineItemSource, TransactionSource};
