//! # Field Coercion
//!
//! Raw transaction records come from several collaborators (SQL rows, Excel
//! imports, older API clients) and the same logical field may arrive as a
//! number, a string, `null`, or something else entirely. This module is the
//! single place where those loose values become typed ones.
//!
//! ## Coalescing Rule
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  first_defined(corrected_paid, paid_amount, payment_amount)             │
//! │                                                                         │
//! │  1. Walk the chain left to right                                        │
//! │  2. The FIRST field that is present (not missing, not null) wins        │
//! │  3. The winner is coerced; if it is not numeric → NonNumericField,      │
//! │     and the caller falls back to its default (0)                        │
//! │                                                                         │
//! │  A non-numeric winner does NOT fall through to the next field.          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::money::Money;

/// Date-time layouts accepted besides RFC 3339. The fraction is optional.
const DATE_TIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

// =============================================================================
// Loose Field
// =============================================================================

/// A scalar input field whose JSON shape is not guaranteed.
///
/// Deserializing into `LooseField` never fails: anything that is neither a
/// number nor a string is kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LooseField {
    Number(f64),
    Text(String),
    Other(Value),
}

impl LooseField {
    /// Trimmed, non-empty text. Numbers are rendered without a trailing `.0`
    /// when integral (a phone stored as a number stays readable).
    pub fn as_text(&self) -> Option<String> {
        match self {
            LooseField::Text(s) => {
                let trimmed = s.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            LooseField::Number(n) if n.is_finite() => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    Some(format!("{}", *n as i64))
                } else {
                    Some(n.to_string())
                }
            }
            _ => None,
        }
    }

    /// Numeric value in major units, if the field is numeric and finite.
    pub fn as_decimal(&self) -> Option<f64> {
        let value = match self {
            LooseField::Number(n) => *n,
            LooseField::Text(s) => s.trim().parse::<f64>().ok()?,
            LooseField::Other(_) => return None,
        };
        value.is_finite().then_some(value)
    }

    /// Money in cents, if the field is numeric.
    pub fn as_money(&self) -> Option<Money> {
        self.as_decimal().and_then(Money::from_decimal)
    }

    /// Timestamp, if the field holds a supported date.
    ///
    /// Numbers are read as epoch milliseconds.
    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            LooseField::Number(ms) if ms.is_finite() => {
                DateTime::from_timestamp_millis(*ms as i64)
            }
            LooseField::Text(s) => parse_date_text(s.trim()),
            _ => None,
        }
    }
}

impl From<&str> for LooseField {
    fn from(value: &str) -> Self {
        LooseField::Text(value.to_string())
    }
}

impl From<f64> for LooseField {
    fn from(value: f64) -> Self {
        LooseField::Number(value)
    }
}

fn parse_date_text(text: &str) -> Option<DateTime<Utc>> {
    if text.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in DATE_TIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

// =============================================================================
// Coalescing
// =============================================================================

/// Returns the first candidate that is defined.
///
/// This is the coalescing primitive of the engine; fallback chains such as
/// `amount ?? subtotal ?? total` go through it.
///
/// ## Example
/// ```rust
/// use tally_core::coerce::first_defined;
///
/// assert_eq!(first_defined([None, Some(2), Some(3)]), Some(2));
/// assert_eq!(first_defined::<_, i32>([None, None]), None);
/// ```
pub fn first_defined<I, T>(candidates: I) -> Option<T>
where
    I: IntoIterator<Item = Option<T>>,
{
    candidates.into_iter().flatten().next()
}

/// A named link in a fallback chain.
pub type FieldRef<'a> = (&'static str, Option<&'a LooseField>);

/// Coalesces a chain of monetary fields and coerces the winner.
///
/// Returns `None` when no field is defined, or when the winner is not
/// numeric (recorded as [`Diagnostic::NonNumericField`]).
pub fn money_from_chain(
    transaction_id: Option<&str>,
    chain: &[FieldRef<'_>],
    diags: &mut Diagnostics,
) -> Option<Money> {
    let (name, field) = first_defined(chain.iter().map(|(name, field)| field.map(|f| (*name, f))))?;
    let money = field.as_money();
    if money.is_none() {
        diags.record(Diagnostic::NonNumericField {
            transaction_id: transaction_id.map(str::to_string),
            field: name.to_string(),
        });
    }
    money
}

/// Walks a chain of monetary fields and returns the first numeric one.
///
/// Used where later fields are independent reports of the same value
/// (posted balances); a non-numeric field is recorded as
/// [`Diagnostic::NonNumericField`] and the next one is tried.
pub fn money_from_first_numeric(
    transaction_id: Option<&str>,
    chain: &[FieldRef<'_>],
    diags: &mut Diagnostics,
) -> Option<Money> {
    for (name, field) in chain {
        let Some(field) = field else { continue };
        match field.as_money() {
            Some(money) => return Some(money),
            None => diags.record(Diagnostic::NonNumericField {
                transaction_id: transaction_id.map(str::to_string),
                field: name.to_string(),
            }),
        }
    }
    None
}

/// Walks a chain of date fields and returns the first one that parses.
///
/// Unlike money chains, an unparseable date falls through to the next
/// candidate (recorded as [`Diagnostic::UnparseableDate`]).
pub fn timestamp_from_chain(
    transaction_id: Option<&str>,
    chain: &[FieldRef<'_>],
    diags: &mut Diagnostics,
) -> Option<DateTime<Utc>> {
    for (name, field) in chain {
        let Some(field) = field else { continue };
        match field.as_timestamp() {
            Some(ts) => return Some(ts),
            None => diags.record(Diagnostic::UnparseableDate {
                transaction_id: transaction_id.map(str::to_string),
                field: name.to_string(),
            }),
        }
    }
    None
}

// =============================================================================
// Unit Tests
// =============================================================================
