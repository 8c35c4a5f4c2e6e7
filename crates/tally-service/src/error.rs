//! # Service Error Types
//!
//! Error types for report assembly.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Service Error Categories                           │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │     Query       │  │     Collaborators       │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidConfig  │  │  InvalidQuery   │  │  SourceFailed           │ │
//! │  │  ConfigLoad     │  │                 │  │  LineItemsFailed        │ │
//! │  │  ConfigSave     │  │                 │  │  SnapshotLoadFailed     │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Malformed *records* are not errors; the engine absorbs them. Only a bad
//! query, a broken collaborator or a bad config file stops a request.

use tally_core::{CoreError, ValidationError};
use thiserror::Error;

/// Result type alias for service operations.
pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug, Error)]
pub enum ServiceError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid ledger configuration.
    #[error("Invalid ledger configuration: {0}")]
    InvalidConfig(String),

    /// Failed to load config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    /// Failed to save config file.
    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    // =========================================================================
    // Query Errors
    // =========================================================================
    /// The caller's query was rejected.
    #[error("Invalid query: {0}")]
    InvalidQuery(#[from] CoreError),

    // =========================================================================
    // Collaborator Errors
    // =========================================================================
    /// The transaction fetch failed.
    #[error("Transaction source failed: {0}")]
    SourceFailed(String),

    /// A line-item fetch failed. Enrichment logs and skips these.
    #[error("Line items for {transaction_id} unavailable: {reason}")]
    LineItemsFailed {
        transaction_id: String,
        reason: String,
    },

    /// The snapshot file could not be read or parsed.
    #[error("Failed to load snapshot: {0}")]
    SnapshotLoadFailed(String),

    /// Failed to serialize a report.
    #[error("Serialization failed: {0}")]
    SerializationFailed(String),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<ValidationError> for ServiceError {
    fn from(err: ValidationError) -> Self {
        ServiceError::InvalidQuery(CoreError::Validation(err))
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        ServiceError::SerializationFailed(err.to_string())
    }
}

impl From<std::io::Error> for ServiceError {
    fn from(err: std::io::Error) -> Self {
        ServiceError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for ServiceError {
    fn from(err: toml::de::Error) -> Self {
        ServiceError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for ServiceError {
    fn from(err: toml::ser::Error) -> Self {
        ServiceError::ConfigSaveFailed(err.to_string())
    }
}

// =============================================================================
// Error Categorization
// =============================================================================

impl ServiceError {
    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            ServiceError::InvalidConfig(_)
                | ServiceError::ConfigLoadFailed(_)
                | ServiceError::ConfigSaveFailed(_)
        )
    }

    /// Returns true if the caller can fix this by changing the query.
    pub fn is_query_error(&self) -> bool {
        matches!(self, ServiceError::InvalidQuery(_))
    }
}
