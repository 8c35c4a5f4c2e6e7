//! # Error Types
//!
//! Domain-specific error types for tally-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  tally-core errors (this file)                                         │
//! │  ├── CoreError        - Query-level domain errors                      │
//! │  └── ValidationError  - Ledger query validation failures               │
//! │                                                                         │
//! │  tally-service errors (separate crate)                                 │
//! │  └── ServiceError     - Source, snapshot and config failures           │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → ServiceError → CLI (anyhow)       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## What Is NOT an Error Here
//! The reconciliation engine itself never fails. Malformed records are
//! resolved by default substitution and reported through
//! [`crate::diagnostics::Diagnostics`]. Only the *query* a caller builds
//! can be rejected.

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core domain errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The caller's role does not carry the scope it needs.
    ///
    /// ## When This Occurs
    /// - A manager without a branch
    /// - A cashier without a warehouse
    #[error("Role {role} requires a {scope} restriction")]
    MissingScope { role: String, scope: String },

    #[error("Invalid ledger query: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors for ledger queries.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// Blank customer name, missing page number.
    #[error("{field} is required")]
    Required { field: String },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Page number or page size outside what the service serves.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Unknown role name.
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Range bounds are reversed.
    #[error("{field} start {start} is after end {end}")]
    InvertedRange {
        field: String,
        start: String,
        end: String,
    },
}

// =============================================================================
// Result Type Alias
// =============================================================================

pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
