//! # Diagnostics
//!
//! The engine never fails on bad input; it substitutes a default and moves on.
//! Each substitution is recorded here so the degraded paths stay observable.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  identity / coerce / normalizer                                         │
//! │       │ default substituted                                             │
//! │       ▼                                                                 │
//! │  Diagnostics::record(Diagnostic) ──► tracing::debug! event              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  one collector per customer group ──► merged in group order             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  LedgerReport.diagnostics                                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;
use tracing::debug;
use ts_rs::TS;

/// A single default-substitution event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// No customer name anywhere; "Unknown Customer" was used.
    MissingIdentity { transaction_id: Option<String> },

    /// The embedded customer sub-document could not be read.
    MalformedEmbeddedDocument {
        transaction_id: Option<String>,
        reason: String,
    },

    /// A monetary field was present but not a number; 0 was used.
    NonNumericField {
        transaction_id: Option<String>,
        field: String,
    },

    /// The declared type was not SALE/RETURN/SETTLEMENT.
    UnknownTransactionType {
        transaction_id: Option<String>,
        declared: String,
    },

    /// A date candidate was present but could not be parsed.
    UnparseableDate {
        transaction_id: Option<String>,
        field: String,
    },
}

impl Diagnostic {
    /// Short machine name, matches the serialized `kind`.
    pub fn kind(&self) -> &'static str {
        match self {
            Diagnostic::MissingIdentity { .. } => "missing_identity",
            Diagnostic::MalformedEmbeddedDocument { .. } => "malformed_embedded_document",
            Diagnostic::NonNumericField { .. } => "non_numeric_field",
            Diagnostic::UnknownTransactionType { .. } => "unknown_transaction_type",
            Diagnostic::UnparseableDate { .. } => "unparseable_date",
        }
    }

    /// The record the event belongs to, when it has an id.
    pub fn transaction_id(&self) -> Option<&str> {
        match self {
            Diagnostic::MissingIdentity { transaction_id }
            | Diagnostic::MalformedEmbeddedDocument { transaction_id, .. }
            | Diagnostic::NonNumericField { transaction_id, .. }
            | Diagnostic::UnknownTransactionType { transaction_id, .. }
            | Diagnostic::UnparseableDate { transaction_id, .. } => transaction_id.as_deref(),
        }
    }
}

/// Collector for diagnostics produced during one engine call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a diagnostic and emits it as a tracing event.
    pub fn record(&mut self, diagnostic: Diagnostic) {
        debug!(
            kind = diagnostic.kind(),
            transaction_id = diagnostic.transaction_id().unwrap_or("-"),
            "Default substituted for malformed input"
        );
        self.entries.push(diagnostic);
    }

    /// Appends everything `other` collected, keeping its order.
    pub fn absorb(&mut self, other: Diagnostics) {
        self.entries.extend(other.entries);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    /// Number of entries of the given kind.
    pub fn count_kind(&self, kind: &str) -> usize {
        self.entries.iter().filter(|d| d.kind() == kind).count()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_count() {
        let mut diags = Diagnostics::new();
        assert!(diags.is_empty());

        diags.record(Diagnostic::MissingIdentity {
            transaction_id: Some("s-1".into()),
        });
        diags.record(Diagnostic::NonNumericField {
            transaction_id: None,
            field: "amount".into(),
        });

        assert_eq!(diags.len(), 2);
        assert_eq!(diags.count_kind("missing_identity"), 1);
        assert_eq!(diags.count_kind("non_numeric_field"), 1);
        assert_eq!(diags.iter().next().and_then(|d| d.transaction_id()), Some("s-1"));
    }

    #[test]
    fn test_absorb_keeps_order() {
        let mut first = Diagnostics::new();
        first.record(Diagnostic::MissingIdentity { transaction_id: Some("a".into()) });
        let mut second = Diagnostics::new();
        second.record(Diagnostic::MissingIdentity { transaction_id: Some("b".into()) });

        first.absorb(second);
        let ids: Vec<_> = first.iter().filter_map(|d| d.transaction_id()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_serialized_kind_tag() {
        let diag = Diagnostic::UnknownTransactionType {
            transaction_id: Some("x".into()),
            declared: "EXCHANGE".into(),
        };
        let json = serde_json::to_value(&diag).unwrap();
        assert_eq!(json["kind"], "unknown_transaction_type");
        assert_eq!(json["declared"], "EXCHANGE");
        assert_eq!(diag.kind(), "unknown_transaction_type");
    }
}
