//! # Ledger Query
//!
//! What a caller asks for: which customer, seen by whom, over which dates,
//! and which page.
//!
//! ```text
//! LedgerQuery
//! ├── customer:   CustomerFilter  (one customer, or "all")
//! ├── scope:      AccessScope     (role + branch / warehouse)
//! ├── date_range: DateRange       (inclusive calendar dates)
//! └── page:       PageRequest     (1-based page, optional size)
//! ```
//!
//! These types carry no behaviour beyond matching; sources decide how to
//! apply them and [`crate::validation`] decides whether they are acceptable.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::types::CustomerIdentity;

/// Sentinel customer name meaning "every customer".
pub const ALL_CUSTOMERS: &str = "all";

// =============================================================================
// Customer Filter
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CustomerFilter {
    Customer { name: String, phone: Option<String> },
    AllCustomers,
}

impl CustomerFilter {
    /// Builds a filter from user input; `"all"` (any case) selects everyone.
    ///
    /// ## Example
    /// ```rust
    /// use tally_core::query::CustomerFilter;
    ///
    /// assert_eq!(CustomerFilter::parse("ALL", None), CustomerFilter::AllCustomers);
    /// assert!(!CustomerFilter::parse("Ayesha", Some("0300")).is_all());
    /// ```
    pub fn parse(name: &str, phone: Option<&str>) -> Self {
        let name = name.trim();
        if name.eq_ignore_ascii_case(ALL_CUSTOMERS) {
            return CustomerFilter::AllCustomers;
        }
        CustomerFilter::Customer {
            name: name.to_string(),
            phone: phone
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string),
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, CustomerFilter::AllCustomers)
    }

    /// Whether a resolved identity satisfies this filter.
    ///
    /// Names compare case-insensitively. A filter without a phone matches
    /// every phone.
    pub fn matches(&self, identity: &CustomerIdentity) -> bool {
        match self {
            CustomerFilter::AllCustomers => true,
            CustomerFilter::Customer { name, phone } => {
                identity.name.trim().eq_ignore_ascii_case(name.trim())
                    && phone
                        .as_deref()
                        .map_or(true, |p| identity.phone.as_deref() == Some(p))
            }
        }
    }
}

// =============================================================================
// Access Scope
// =============================================================================

/// Caller's role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Sees every branch and warehouse.
    Admin,
    /// Restricted to one branch.
    Manager,
    /// Restricted to one warehouse.
    Cashier,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => write!(f, "admin"),
            Role::Manager => write!(f, "manager"),
            Role::Cashier => write!(f, "cashier"),
        }
    }
}

impl FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "manager" => Ok(Role::Manager),
            "cashier" => Ok(Role::Cashier),
            other => Err(ValidationError::InvalidFormat {
                field: "role".to_string(),
                reason: format!("unknown role '{}'", other),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessScope {
    pub role: Role,
    #[serde(default)]
    pub branch_id: Option<String>,
    #[serde(default)]
    pub warehouse_id: Option<String>,
}

impl AccessScope {
    pub fn admin() -> Self {
        AccessScope {
            role: Role::Admin,
            branch_id: None,
            warehouse_id: None,
        }
    }

    pub fn manager(branch_id: impl Into<String>) -> Self {
        AccessScope {
            role: Role::Manager,
            branch_id: Some(branch_id.into()),
            warehouse_id: None,
        }
    }

    pub fn cashier(warehouse_id: impl Into<String>) -> Self {
        AccessScope {
            role: Role::Cashier,
            branch_id: None,
            warehouse_id: Some(warehouse_id.into()),
        }
    }
}

impl Default for AccessScope {
    fn default() -> Self {
        AccessScope::admin()
    }
}

// =============================================================================
// Date Range
// =============================================================================

/// Inclusive range of calendar dates (UTC). Either bound may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        DateRange { from, to }
    }

    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        let day = timestamp.date_naive();
        self.from.map_or(true, |from| day >= from) && self.to.map_or(true, |to| day <= to)
    }
}

// =============================================================================
// Page Request
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// 1-based.
    pub page: u32,
    /// `None` means the configured default.
    pub page_size: Option<u32>,
}

impl PageRequest {
    pub fn new(page: u32, page_size: u32) -> Self {
        PageRequest {
            page,
            page_size: Some(page_size),
        }
    }

    pub fn size_or(&self, default_page_size: u32) -> u32 {
        self.page_size.unwrap_or(default_page_size)
    }

    /// Number of records skipped before this page.
    pub fn offset(&self, default_page_size: u32) -> usize {
        self.page.saturating_sub(1) as usize * self.size_or(default_page_size) as usize
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        PageRequest {
            page: 1,
            page_size: None,
        }
    }
}

// =============================================================================
// Ledger Query
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerQuery {
    pub customer: CustomerFilter,
    #[serde(default)]
    pub scope: AccessScope,
    #[serde(default)]
    pub date_range: DateRange,
    #[serde(default)]
    pub page: PageRequest,
}

impl LedgerQuery {
    pub fn new(customer: CustomerFilter) -> Self {
        LedgerQuery {
            customer,
            scope: AccessScope::default(),
            date_range: DateRange::default(),
            page: PageRequest::default(),
        }
    }

    pub fn for_customer(name: &str, phone: Option<&str>) -> Self {
        Self::new(CustomerFilter::parse(name, phone))
    }

    pub fn all_customers() -> Self {
        Self::new(CustomerFilter::AllCustomers)
    }

    pub fn with_scope(mut self, scope: AccessScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_date_range(mut self, date_range: DateRange) -> Self {
        self.date_range = date_range;
        self
    }

    pub fn with_page(mut self, page: PageRequest) -> Self {
        self.page = page;
        self
    }
}
