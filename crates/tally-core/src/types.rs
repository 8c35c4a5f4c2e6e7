//! # Domain Types
//!
//! Core types flowing through the reconciliation engine.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  INPUT (loose)               OUTPUT (typed, ephemeral)                  │
//! │  ┌──────────────────────┐    ┌──────────────────────────┐              │
//! │  │ RawTransactionRecord │───►│ NormalizedTransaction    │              │
//! │  │  amount / subtotal   │    │  old_balance             │              │
//! │  │  paid_amount / ...   │    │  total_amount            │              │
//! │  │  customer_details    │    │  running_balance/balance │              │
//! │  └──────────────────────┘    └────────────┬─────────────┘              │
//! │                                           │                             │
//! │  ┌─────────────────┐   ┌──────────────────▼──────┐   ┌──────────────┐  │
//! │  │CustomerIdentity │──►│  CustomerLedgerGroup    │◄──│LedgerSummary │  │
//! │  │ name, phone     │   │  identity/summary/txns  │   │ counts, sums │  │
//! │  └─────────────────┘   └─────────────────────────┘   └──────────────┘  │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │ TransactionType │   │  PaymentMethod  │   │  PaymentStatus  │       │
//! │  │  Sale           │   │  Cash, Card     │   │  Completed      │       │
//! │  │  Return         │   │  FullyCredit    │   │  Pending        │       │
//! │  │  Settlement     │   │  Refund, ...    │   │  Partial        │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! None of these are persisted by the engine. They are recomputed from the
//! current snapshot on every request.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use ts_rs::TS;

use crate::coerce::LooseField;
use crate::money::Money;

/// Identity label used when no customer name can be found anywhere.
pub const UNKNOWN_CUSTOMER: &str = "Unknown Customer";

/// Separator between name and phone in an identity key.
pub const IDENTITY_KEY_SEPARATOR: &str = "|||";

/// Canonical token form: trimmed, upper-case, spaces and hyphens as `_`.
fn canonical_token(raw: &str) -> String {
    raw.trim()
        .chars()
        .map(|c| match c {
            ' ' | '-' => '_',
            other => other.to_ascii_uppercase(),
        })
        .collect()
}

// =============================================================================
// Transaction Type
// =============================================================================

/// The normalized kind of a ledger event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    /// Purchase: increases the balance by the bill net of payment.
    Sale,
    /// Refund: decreases the balance by the refunded amount.
    Return,
    /// Payment against a previously accrued balance.
    Settlement,
}

impl TransactionType {
    /// Parses a declared type hint, case-insensitively.
    ///
    /// ## Example
    /// ```rust
    /// use tally_core::TransactionType;
    ///
    /// assert_eq!(TransactionType::parse(" return "), Some(TransactionType::Return));
    /// assert_eq!(TransactionType::parse("EXCHANGE"), None);
    /// ```
    pub fn parse(raw: &str) -> Option<Self> {
        match canonical_token(raw).as_str() {
            "SALE" => Some(TransactionType::Sale),
            "RETURN" => Some(TransactionType::Return),
            "SETTLEMENT" => Some(TransactionType::Settlement),
            _ => None,
        }
    }

    /// Label shown by renderers (`transaction_type_display`).
    pub fn display_name(&self) -> &'static str {
        match self {
            TransactionType::Sale => "Sale",
            TransactionType::Return => "Return",
            TransactionType::Settlement => "Settlement",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionType::Sale => write!(f, "SALE"),
            TransactionType::Return => write!(f, "RETURN"),
            TransactionType::Settlement => write!(f, "SETTLEMENT"),
        }
    }
}

// =============================================================================
// Payment Method
// =============================================================================

/// How a transaction was paid at the till.
///
/// Unrecognised methods are kept as `Other` with their canonical spelling, so
/// nothing a collaborator sends is lost.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PaymentMethod {
    Cash,
    Card,
    BankTransfer,
    /// Nothing paid at sale time; the whole bill becomes owed balance.
    FullyCredit,
    /// Money handed back to the customer.
    Refund,
    Other(String),
}

impl PaymentMethod {
    pub fn parse(raw: &str) -> Self {
        match canonical_token(raw).as_str() {
            "CASH" => PaymentMethod::Cash,
            "CARD" | "CREDIT_CARD" | "DEBIT_CARD" | "EXTERNAL_CARD" => PaymentMethod::Card,
            "BANK_TRANSFER" | "TRANSFER" => PaymentMethod::BankTransfer,
            "FULLY_CREDIT" => PaymentMethod::FullyCredit,
            "REFUND" => PaymentMethod::Refund,
            other => PaymentMethod::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            PaymentMethod::Cash => "CASH",
            PaymentMethod::Card => "CARD",
            PaymentMethod::BankTransfer => "BANK_TRANSFER",
            PaymentMethod::FullyCredit => "FULLY_CREDIT",
            PaymentMethod::Refund => "REFUND",
            PaymentMethod::Other(other) => other,
        }
    }

    #[inline]
    pub fn is_fully_credit(&self) -> bool {
        matches!(self, PaymentMethod::FullyCredit)
    }

    #[inline]
    pub fn is_refund(&self) -> bool {
        matches!(self, PaymentMethod::Refund)
    }
}

impl From<String> for PaymentMethod {
    fn from(raw: String) -> Self {
        PaymentMethod::parse(&raw)
    }
}

impl From<PaymentMethod> for String {
    fn from(method: PaymentMethod) -> Self {
        method.as_str().to_string()
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Payment Type
// =============================================================================

/// What a payment was applied to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PaymentType {
    FullPayment,
    PartialPayment,
    /// Settles a balance accrued by earlier transactions.
    OutstandingSettlement,
    Other(String),
}

impl PaymentType {
    pub fn parse(raw: &str) -> Self {
        match canonical_token(raw).as_str() {
            "FULL_PAYMENT" | "FULL" => PaymentType::FullPayment,
            "PARTIAL_PAYMENT" | "PARTIAL" => PaymentType::PartialPayment,
            "OUTSTANDING_SETTLEMENT" => PaymentType::OutstandingSettlement,
            other => PaymentType::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            PaymentType::FullPayment => "FULL_PAYMENT",
            PaymentType::PartialPayment => "PARTIAL_PAYMENT",
            PaymentType::OutstandingSettlement => "OUTSTANDING_SETTLEMENT",
            PaymentType::Other(other) => other,
        }
    }

    #[inline]
    pub fn is_outstanding_settlement(&self) -> bool {
        matches!(self, PaymentType::OutstandingSettlement)
    }
}

impl From<String> for PaymentType {
    fn from(raw: String) -> Self {
        PaymentType::parse(&raw)
    }
}

impl From<PaymentType> for String {
    fn from(kind: PaymentType) -> Self {
        kind.as_str().to_string()
    }
}

// =============================================================================
// Payment Status
// =============================================================================

/// Classified payment state of one normalized transaction.
///
/// ## Classification
/// ```text
/// balance <= 0                                  → Completed
/// balance >  0  &&  (FULLY_CREDIT || paid == 0) → Pending
/// balance >  0  &&  paid > 0                    → Partial
/// balance >  0  &&  paid < 0                    → Outstanding
/// ```
/// The FULLY_CREDIT check runs before the payment check, so a fully credit
/// sale carrying a stray non-zero payment is still Pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Completed,
    Pending,
    Partial,
    /// Positive balance with a negative payment; counted in no bucket.
    Outstanding,
}

impl PaymentStatus {
    pub fn classify(
        balance: Money,
        actual_payment: Money,
        method: Option<&PaymentMethod>,
    ) -> PaymentStatus {
        let fully_credit = method.is_some_and(PaymentMethod::is_fully_credit);

        if !balance.is_positive() {
            PaymentStatus::Completed
        } else if fully_credit || actual_payment.is_zero() {
            PaymentStatus::Pending
        } else if actual_payment.is_positive() {
            PaymentStatus::Partial
        } else {
            PaymentStatus::Outstanding
        }
    }

    /// Label shown by renderers (`payment_status_display`).
    pub fn display_name(&self) -> &'static str {
        match self {
            PaymentStatus::Completed => "Paid",
            PaymentStatus::Pending => "Pending",
            PaymentStatus::Partial => "Partially Paid",
            PaymentStatus::Outstanding => "Outstanding",
        }
    }
}

// =============================================================================
// Raw Transaction Record
// =============================================================================

/// A transaction as delivered by an external collaborator.
///
/// Every scalar is a [`LooseField`], so deserializing a record never fails on
/// field shape. Fields this engine does not know (branch, warehouse, invoice
/// numbers, ...) are preserved in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawTransactionRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<LooseField>,

    /// Declared type hint: SALE / RETURN / SETTLEMENT.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_type: Option<LooseField>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_date: Option<LooseField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<LooseField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<LooseField>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<LooseField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_type: Option<LooseField>,

    // Bill amount chain: amount ?? subtotal ?? total
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<LooseField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtotal: Option<LooseField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<LooseField>,

    // Payment chain: corrected_paid ?? paid_amount ?? payment_amount
    #[serde(skip_serializing_if = "Option::is_none")]
    pub corrected_paid: Option<LooseField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paid_amount: Option<LooseField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_amount: Option<LooseField>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub credit_amount: Option<LooseField>,

    // Posted balance chain: running_balance ?? new_balance ?? post_balance
    #[serde(skip_serializing_if = "Option::is_none")]
    pub running_balance: Option<LooseField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_balance: Option<LooseField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_balance: Option<LooseField>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<LooseField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_phone: Option<LooseField>,

    /// Embedded customer sub-document, as an object or a JSON-encoded string.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_details: Option<LooseField>,

    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl RawTransactionRecord {
    /// Creates a record with only an id. Used with the `with_*` setters by
    /// sources and tests.
    pub fn new(id: impl Into<String>) -> Self {
        RawTransactionRecord {
            id: Some(LooseField::Text(id.into())),
            ..Default::default()
        }
    }

    pub fn with_date(mut self, date: &str) -> Self {
        self.transaction_date = Some(date.into());
        self
    }

    pub fn with_declared_type(mut self, kind: &str) -> Self {
        self.transaction_type = Some(kind.into());
        self
    }

    pub fn with_method(mut self, method: &str) -> Self {
        self.payment_method = Some(method.into());
        self
    }

    pub fn with_payment_type(mut self, kind: &str) -> Self {
        self.payment_type = Some(kind.into());
        self
    }

    pub fn with_amount(mut self, amount: f64) -> Self {
        self.amount = Some(amount.into());
        self
    }

    pub fn with_paid(mut self, paid: f64) -> Self {
        self.paid_amount = Some(paid.into());
        self
    }

    pub fn with_credit(mut self, credit: f64) -> Self {
        self.credit_amount = Some(credit.into());
        self
    }

    pub fn with_posted_balance(mut self, balance: f64) -> Self {
        self.running_balance = Some(balance.into());
        self
    }

    pub fn with_customer(mut self, name: &str, phone: Option<&str>) -> Self {
        self.customer_name = Some(name.into());
        self.customer_phone = phone.map(LooseField::from);
        self
    }

    /// The record id as text, if it has a usable one.
    pub fn id_text(&self) -> Option<String> {
        self.id.as_ref().and_then(LooseField::as_text)
    }

    /// Whether a non-blank declared type is present.
    pub fn has_declared_type(&self) -> bool {
        self.transaction_type
            .as_ref()
            .and_then(LooseField::as_text)
            .is_some()
    }

    /// Reads a preserved extra field as text (e.g. `branch_id`).
    pub fn extra_text(&self, key: &str) -> Option<String> {
        match self.extra.get(key)? {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

// =============================================================================
// Customer Identity
// =============================================================================

/// Who a transaction is believed to belong to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CustomerIdentity {
    pub name: String,
    pub phone: Option<String>,
}

impl CustomerIdentity {
    pub fn new(name: impl Into<String>, phone: Option<String>) -> Self {
        CustomerIdentity {
            name: name.into(),
            phone,
        }
    }

    /// Grouping key: `name|||phone`, with a missing phone as empty.
    ///
    /// ## Example
    /// ```rust
    /// use tally_core::CustomerIdentity;
    ///
    /// let id = CustomerIdentity::new("Ayesha", Some("0300".into()));
    /// assert_eq!(id.key(), "Ayesha|||0300");
    /// assert_eq!(CustomerIdentity::new("Ayesha", None).key(), "Ayesha|||");
    /// ```
    pub fn key(&self) -> String {
        format!(
            "{}{}{}",
            self.name,
            IDENTITY_KEY_SEPARATOR,
            self.phone.as_deref().unwrap_or("")
        )
    }

    pub fn is_unknown(&self) -> bool {
        self.name == UNKNOWN_CUSTOMER
    }
}

// =============================================================================
// Line Item
// =============================================================================

/// Item detail attached to a transaction by enrichment.
///
/// Monetary values are in cents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LineItem {
    pub product_name: String,
    #[serde(default)]
    pub sku: Option<String>,
    pub quantity: i64,
    pub unit_price: Money,
    pub line_total: Money,
}

// =============================================================================
// Normalized Transaction
// =============================================================================

/// A transaction after the balance fold.
///
/// Field names are a contract with downstream renderers and must not change:
/// `old_balance`, `amount`, `total_amount`, `corrected_paid`/`paid_amount`,
/// `running_balance`/`balance`, `transaction_type`,
/// `transaction_type_display`, `payment_status_display`.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export)]
pub struct NormalizedTransaction {
    pub id: Option<String>,

    #[ts(as = "String")]
    pub transaction_date: DateTime<Utc>,

    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,

    #[ts(as = "Option<String>")]
    pub payment_method: Option<PaymentMethod>,
    #[ts(as = "Option<String>")]
    pub payment_type: Option<PaymentType>,

    /// Resolved bill amount (`amount ?? subtotal ?? total`).
    pub amount: Money,
    /// Balance before this transaction.
    pub old_balance: Money,
    /// What this transaction adds to the bill (0 for settlements).
    pub current_bill_amount: Money,
    /// Total amount due: `old_balance + current_bill_amount`.
    pub total_amount: Money,
    /// Payment counted by the ledger.
    pub corrected_paid: Money,
    /// Alias of `corrected_paid`.
    pub paid_amount: Money,
    pub actual_payment: Money,
    /// Explicit credit amount, when one was given.
    pub credit_amount: Option<Money>,
    /// Balance after this transaction.
    pub running_balance: Money,
    /// Alias of `running_balance`.
    pub balance: Money,

    pub transaction_type: TransactionType,
    pub transaction_type_display: String,
    pub payment_status: PaymentStatus,
    pub payment_status_display: String,

    pub line_items: Vec<LineItem>,

    /// The record exactly as received.
    #[ts(skip)]
    pub source: RawTransactionRecord,
}

impl NormalizedTransaction {
    #[inline]
    pub fn is_fully_credit(&self) -> bool {
        self.payment_method
            .as_ref()
            .is_some_and(PaymentMethod::is_fully_credit)
    }
}

// =============================================================================
// Ledger Summary
// =============================================================================

/// Count, amount and status totals for a ledger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct LedgerSummary {
    pub total_transactions: usize,
    pub total_amount: Money,
    pub total_paid: Money,
    /// Balance of the most recent transaction (see `summary::compute_ledger_summary`).
    pub outstanding_balance: Money,
    pub completed_transactions: usize,
    pub pending_transactions: usize,
    pub partial_transactions: usize,
    /// Only set by the grouping aggregator.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_credit: Option<Money>,
}

impl LedgerSummary {
    /// Field-wise sum of two summaries.
    ///
    /// `outstanding_balance` is summed too, so a merged summary holds the sum
    /// of each ledger's own ending balance. `total_credit` stays `None` only
    /// if both sides are `None`.
    pub fn merge(self, other: LedgerSummary) -> LedgerSummary {
        let total_credit = match (self.total_credit, other.total_credit) {
            (None, None) => None,
            (a, b) => Some(a.unwrap_or_default() + b.unwrap_or_default()),
        };
        LedgerSummary {
            total_transactions: self.total_transactions + other.total_transactions,
            total_amount: self.total_amount + other.total_amount,
            total_paid: self.total_paid + other.total_paid,
            outstanding_balance: self.outstanding_balance + other.outstanding_balance,
            completed_transactions: self.completed_transactions + other.completed_transactions,
            pending_transactions: self.pending_transactions + other.pending_transactions,
            partial_transactions: self.partial_transactions + other.partial_transactions,
            total_credit,
        }
    }
}

// =============================================================================
// Customer Ledger Group
// =============================================================================

/// One customer's ledger, as shown by the grouped report.
#[derive(Debug, Clone, PartialEq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CustomerLedgerGroup {
    pub identity: CustomerIdentity,
    pub summary: LedgerSummary,
    /// Most recent first.
    pub transactions: Vec<NormalizedTransaction>,
}

impl CustomerLedgerGroup {
    /// Date of the most recent transaction, if any.
    pub fn latest_date(&self) -> Option<DateTime<Utc>> {
        self.transactions.iter().map(|t| t.transaction_date).max()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
