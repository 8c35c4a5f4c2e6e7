//! # Identity Resolver
//!
//! Decides which customer a raw record belongs to.
//!
//! ## Resolution Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  customer_name / customer_phone   (blank strings count as absent)       │
//! │        │ whichever is still missing                                     │
//! │        ▼                                                                │
//! │  customer_details                                                       │
//! │    ├── object          → read name / phone directly                     │
//! │    ├── JSON string     → decode, then read                              │
//! │    └── anything else   → MalformedEmbeddedDocument, field left unset    │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  name unset  → "Unknown Customer" (MissingIdentity)                     │
//! │  phone unset → None                                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Resolution never fails and never panics.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::coerce::LooseField;
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::types::{CustomerIdentity, RawTransactionRecord, UNKNOWN_CUSTOMER};

/// Why an embedded customer document could not be read.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EmbeddedDocumentError {
    #[error("embedded customer is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("embedded customer is not an object")]
    NotAnObject,
}

/// The `customer_details` sub-document.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct EmbeddedCustomer {
    #[serde(default)]
    name: Option<LooseField>,
    #[serde(default)]
    phone: Option<LooseField>,
}

impl EmbeddedCustomer {
    /// Reads the sub-document from a loose field.
    ///
    /// ## Example
    /// ```rust
    /// use tally_core::coerce::LooseField;
    /// use tally_core::identity::EmbeddedCustomer;
    ///
    /// let field = LooseField::Text(r#"{"name":"Hina","phone":"0321"}"#.into());
    /// let embedded = EmbeddedCustomer::parse(&field).unwrap();
    /// assert_eq!(embedded.name().as_deref(), Some("Hina"));
    ///
    /// assert!(EmbeddedCustomer::parse(&LooseField::Text("{oops".into())).is_err());
    /// ```
    pub fn parse(field: &LooseField) -> Result<Self, EmbeddedDocumentError> {
        let value = match field {
            LooseField::Text(text) => serde_json::from_str::<Value>(text)
                .map_err(|e| EmbeddedDocumentError::InvalidJson(e.to_string()))?,
            LooseField::Other(value) => value.clone(),
            LooseField::Number(_) => return Err(EmbeddedDocumentError::NotAnObject),
        };

        if !value.is_object() {
            return Err(EmbeddedDocumentError::NotAnObject);
        }
        // Properties are loose fields, so an object can always be read.
        serde_json::from_value(value).map_err(|_| EmbeddedDocumentError::NotAnObject)
    }

    pub fn name(&self) -> Option<String> {
        self.name.as_ref().and_then(LooseField::as_text)
    }

    pub fn phone(&self) -> Option<String> {
        self.phone.as_ref().and_then(LooseField::as_text)
    }
}

/// Resolves the customer identity of a raw record.
pub fn resolve_identity(record: &RawTransactionRecord, diags: &mut Diagnostics) -> CustomerIdentity {
    let mut name = record.customer_name.as_ref().and_then(LooseField::as_text);
    let mut phone = record.customer_phone.as_ref().and_then(LooseField::as_text);

    if name.is_none() || phone.is_none() {
        if let Some(details) = record.customer_details.as_ref().filter(|d| !is_blank(d)) {
            match EmbeddedCustomer::parse(details) {
                Ok(embedded) => {
                    name = name.or_else(|| embedded.name());
                    phone = phone.or_else(|| embedded.phone());
                }
                Err(err) => diags.record(Diagnostic::MalformedEmbeddedDocument {
                    transaction_id: record.id_text(),
                    reason: err.to_string(),
                }),
            }
        }
    }

    let name = name.unwrap_or_else(|| {
        diags.record(Diagnostic::MissingIdentity {
            transaction_id: record.id_text(),
        });
        UNKNOWN_CUSTOMER.to_string()
    });

    CustomerIdentity { name, phone }
}

fn is_blank(field: &LooseField) -> bool {
    matches!(field, LooseField::Text(text) if text.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(json: &str) -> RawTransactionRecord {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_direct_fields_win() {
        let rec = record(
            r#"{"id":"s1","customer_name":"Ali","customer_phone":"0300",
                "customer_details":{"name":"Other","phone":"999"}}"#,
        );
        let mut diags = Diagnostics::new();
        let id = resolve_identity(&rec, &mut diags);
        assert_eq!(id, CustomerIdentity::new("Ali", Some("0300".into())));
        assert!(diags.is_empty());
    }

    #[test]
    fn test_blank_direct_name_falls_back_to_embedded_object() {
        let rec = record(
            r#"{"id":"s1","customer_name":"  ","customer_details":{"name":"Zara","phone":3001112222}}"#,
        );
        let mut diags = Diagnostics::new();
        let id = resolve_identity(&rec, &mut diags);
        assert_eq!(id.name, "Zara");
        assert_eq!(id.phone.as_deref(), Some("3001112222"));
    }

    #[test]
    fn test_embedded_json_string_only_fills_missing_phone() {
        let rec = record(
            r#"{"id":"s1","customer_name":"Ali",
                "customer_details":"{\"name\":\"Ignored\",\"phone\":\"0312\"}"}"#,
        );
        let mut diags = Diagnostics::new();
        let id = resolve_identity(&rec, &mut diags);
        assert_eq!(id, CustomerIdentity::new("Ali", Some("0312".into())));
    }

    #[test]
    fn test_malformed_embedded_document() {
        let rec = record(r#"{"id":"s7","customer_details":"{not json"}"#);
        let mut diags = Diagnostics::new();
        let id = resolve_identity(&rec, &mut diags);

        assert_eq!(id.name, UNKNOWN_CUSTOMER);
        assert_eq!(id.phone, None);
        assert_eq!(diags.count_kind("malformed_embedded_document"), 1);
        assert_eq!(diags.count_kind("missing_identity"), 1);
    }

    #[test]
    fn test_embedded_document_of_wrong_shape() {
        let rec = record(r#"{"id":"s8","customer_name":"Ali","customer_details":[1,2]}"#);
        let mut diags = Diagnostics::new();
        let id = resolve_identity(&rec, &mut diags);
        assert_eq!(id.name, "Ali");
        assert_eq!(diags.count_kind("malformed_embedded_document"), 1);
        assert_eq!(
            EmbeddedCustomer::parse(&LooseField::Text("\"just text\"".into())),
            Err(EmbeddedDocumentError::NotAnObject)
        );
    }

    #[test]
    fn test_embedded_document_missing_properties() {
        let rec = record(r#"{"id":"s9","customer_details":{"email":"x@y.z"}}"#);
        let mut diags = Diagnostics::new();
        let id = resolve_identity(&rec, &mut diags);
        assert!(id.is_unknown());
        assert_eq!(diags.count_kind("malformed_embedded_document"), 0);
        assert_eq!(diags.count_kind("missing_identity"), 1);
    }

    #[test]
    fn test_nothing_at_all() {
        let mut diags = Diagnostics::new();
        let id = resolve_identity(&RawTransactionRecord::default(), &mut diags);
        assert_eq!(id.key(), "Unknown Customer|||");
    }
}
