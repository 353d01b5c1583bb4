//! Error types for the taxonomy builder.
//!
//! Library crates use [`TaxonomyError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::types::EntityKind;

/// Top-level error type for all taxonomy operations.
#[derive(Debug, thiserror::Error)]
pub enum TaxonomyError {
    /// The markup carries no recognizable directory structure.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// An observation's name is empty after cleaning.
    #[error("empty name: {raw:?} is blank after cleaning")]
    EmptyName { raw: String },

    /// An observation's href cannot be resolved to an http(s) URL.
    #[error("invalid url {href:?}: {reason}")]
    InvalidUrl { href: String, reason: String },

    /// A child observation appeared before any category.
    #[error("orphan {kind} {name:?} at position {index}: no preceding category")]
    Orphan {
        index: usize,
        kind: EntityKind,
        name: String,
    },

    /// The assembled document broke one or more structural rules.
    #[error("{}", format_violations(violations))]
    Schema { violations: Vec<Violation> },

    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// JSON/TOML encoding or decoding error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, TaxonomyError>;

impl TaxonomyError {
    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create an invalid-url error for `href`.
    pub fn invalid_url(href: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidUrl {
            href: href.into(),
            reason: reason.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Violations carried by a schema error (empty for every other variant).
    pub fn violations(&self) -> &[Violation] {
        match self {
            Self::Schema { violations } => violations,
            _ => &[],
        }
    }
}

fn format_violations(violations: &[Violation]) -> String {
    let mut out = format!("schema error: {} violation(s)", violations.len());
    for v in violations {
        out.push_str("\n  - ");
        out.push_str(&v.to_string());
    }
    out
}

// ---------------------------------------------------------------------------
// Violation
// ---------------------------------------------------------------------------

/// Which structural rule a [`Violation`] broke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationRule {
    MissingField,
    InvalidKind,
    MalformedSlug,
    InvalidUrl,
    DanglingParent,
    DuplicateId,
    KindParentMismatch,
    Cycle,
    MissingDocumentField,
    Malformed,
}

impl ViolationRule {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MissingField => "missing_field",
            Self::InvalidKind => "invalid_kind",
            Self::MalformedSlug => "malformed_slug",
            Self::InvalidUrl => "invalid_url",
            Self::DanglingParent => "dangling_parent",
            Self::DuplicateId => "duplicate_id",
            Self::KindParentMismatch => "kind_parent_mismatch",
            Self::Cycle => "cycle",
            Self::MissingDocumentField => "missing_document_field",
            Self::Malformed => "malformed",
        }
    }
}

impl fmt::Display for ViolationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single failed check, located by item position and id where known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// Position of the offending item in `items`; `None` for document-level checks.
    pub index: Option<usize>,
    /// Id of the offending item, when it has one.
    pub item_id: Option<String>,
    pub rule: ViolationRule,
    pub message: String,
}

impl Violation {
    /// Violation attached to the item at `index`.
    pub fn item(
        index: usize,
        item_id: Option<&str>,
        rule: ViolationRule,
        message: impl Into<String>,
    ) -> Self {
        Self {
            index: Some(index),
            item_id: item_id.filter(|id| !id.is_empty()).map(String::from),
            rule,
            message: message.into(),
        }
    }

    /// Violation of a document-level field.
    pub fn document(rule: ViolationRule, message: impl Into<String>) -> Self {
        Self {
            index: None,
            item_id: None,
            rule,
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.index, &self.item_id) {
            (Some(i), Some(id)) => write!(f, "items[{i}] ({id}): {}: {}", self.rule, self.message),
            (Some(i), None) => write!(f, "items[{i}]: {}: {}", self.rule, self.message),
            _ => write!(f, "document: {}: {}", self.rule, self.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = TaxonomyError::config("unknown strategy 'fancy'");
        assert_eq!(err.to_string(), "config error: unknown strategy 'fancy'");

        let err = TaxonomyError::Orphan {
            index: 0,
            kind: EntityKind::Subcategory,
            name: "SEO".into(),
        };
        assert!(err.to_string().contains("orphan subcategory \"SEO\""));
    }

    #[test]
    fn schema_error_lists_every_violation() {
        let err = TaxonomyError::Schema {
            violations: vec![
                Violation::item(
                    3,
                    Some("subcategory:x:seo"),
                    ViolationRule::DanglingParent,
                    "parent_id category:x not found",
                ),
                Violation::document(ViolationRule::MissingDocumentField, "version is empty"),
            ],
        };
        let text = err.to_string();
        assert!(text.starts_with("schema error: 2 violation(s)"));
        assert!(text.contains("items[3] (subcategory:x:seo): dangling_parent"));
        assert!(text.contains("document: missing_document_field"));
        assert_eq!(err.violations().len(), 2);
    }

    #[test]
    fn non_schema_errors_have_no_violations() {
        assert!(TaxonomyError::parse("nothing").violations().is_empty());
    }
}
