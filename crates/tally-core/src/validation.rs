//! # Validation Module
//!
//! Rejects ledger queries that cannot be served.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: CLI / caller                                                  │
//! │  ├── Type validation (clap, serde)                                      │
//! │  └── "all" sentinel parsed into CustomerFilter::AllCustomers            │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                   │
//! │  ├── customer name, date range, page bounds                             │
//! │  └── role ↔ scope consistency                                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Engine                                                        │
//! │  └── never rejects: bad records degrade to defaults + diagnostics       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use tally_core::query::LedgerQuery;
//! use tally_core::validation::{validate_customer_name, validate_query};
//!
//! validate_customer_name("Ayesha Khan").unwrap();
//! validate_query(&LedgerQuery::all_customers(), 500).unwrap();
//! ```

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::query::{AccessScope, CustomerFilter, DateRange, LedgerQuery, PageRequest, Role};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Longest accepted customer name.
pub const MAX_CUSTOMER_NAME_LEN: usize = 200;

/// Validates a requested customer name.
///
/// ## Rules
/// - Must not be empty
/// - At most 200 characters
///
/// ## Example
/// ```rust
/// use tally_core::validation::validate_customer_name;
///
/// assert!(validate_customer_name("Bilal").is_ok());
/// assert!(validate_customer_name("   ").is_err());
/// assert!(validate_customer_name(&"x".repeat(201)).is_err());
/// ```
pub fn validate_customer_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "customer_name".to_string(),
        });
    }

    if name.chars().count() > MAX_CUSTOMER_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: "customer_name".to_string(),
            max: MAX_CUSTOMER_NAME_LEN,
        });
    }

    Ok(())
}

/// Validates that a date range is not reversed.
pub fn validate_date_range(range: &DateRange) -> ValidationResult<()> {
    if let (Some(from), Some(to)) = (range.from, range.to) {
        if from > to {
            return Err(ValidationError::InvertedRange {
                field: "date_range".to_string(),
                start: from.to_string(),
                end: to.to_string(),
            });
        }
    }
    Ok(())
}

/// Validates page number and page size.
///
/// ## Rules
/// - `page >= 1`
/// - `1 <= page_size <= max_page_size` when a size is given
pub fn validate_page(page: &PageRequest, max_page_size: u32) -> ValidationResult<()> {
    if page.page == 0 {
        return Err(ValidationError::OutOfRange {
            field: "page".to_string(),
            min: 1,
            max: i64::from(u32::MAX),
        });
    }

    if let Some(size) = page.page_size {
        if size == 0 || size > max_page_size {
            return Err(ValidationError::OutOfRange {
                field: "page_size".to_string(),
                min: 1,
                max: i64::from(max_page_size),
            });
        }
    }

    Ok(())
}

/// Validates that the role carries the restriction it needs.
///
/// ## Rules
/// ```text
/// admin   → nothing required
/// manager → branch_id
/// cashier → warehouse_id
/// ```
pub fn validate_scope(scope: &AccessScope) -> CoreResult<()> {
    let present = |value: &Option<String>| value.as_deref().is_some_and(|v| !v.trim().is_empty());

    let missing = match scope.role {
        Role::Admin => None,
        Role::Manager if !present(&scope.branch_id) => Some("branch"),
        Role::Cashier if !present(&scope.warehouse_id) => Some("warehouse"),
        _ => None,
    };

    match missing {
        Some(scope_name) => Err(CoreError::MissingScope {
            role: scope.role.to_string(),
            scope: scope_name.to_string(),
        }),
        None => Ok(()),
    }
}

/// Validates a complete query.
pub fn validate_query(query: &LedgerQuery, max_page_size: u32) -> CoreResult<()> {
    if let CustomerFilter::Customer { name, .. } = &query.customer {
        validate_customer_name(name)?;
    }
    validate_date_range(&query.date_range)?;
    validate_page(&query.page, max_page_size)?;
    validate_scope(&query.scope)
}

// =============================================================================
// Unit Tests
// =============================================================================
