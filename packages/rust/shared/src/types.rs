//! Core domain types for taxonomy documents.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// EntityKind
// ---------------------------------------------------------------------------

/// The three node kinds a directory page exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// Top-level node; never has a parent.
    Category,
    /// Node nested directly under one category.
    Subcategory,
    /// "All in …" browse link, structurally a child of a category.
    AllIn,
}

impl EntityKind {
    /// Wire name (`category`, `subcategory`, `all_in`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Category => "category",
            Self::Subcategory => "subcategory",
            Self::AllIn => "all_in",
        }
    }

    /// Whether entities of this kind must carry a parent.
    pub fn is_child(self) -> bool {
        !matches!(self, Self::Category)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// EntityId
// ---------------------------------------------------------------------------

/// Deterministic entity identifier derived from `(kind, slug, parent)`.
///
/// Categories are `category:<slug>`; children are `<kind>:<parent scope>:<slug>`
/// where the parent scope is the parent id without its kind prefix
/// (e.g. `subcategory:advertising-marketing:seo`). Slugs never contain `:`,
/// so distinct tuples always map to distinct ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    /// Derive the id for an entity. Same inputs always give the same id.
    pub fn derive(kind: EntityKind, slug: &str, parent: Option<&EntityId>) -> Self {
        match parent {
            None => Self(format!("{kind}:{slug}")),
            Some(parent) => Self(format!("{kind}:{}:{slug}", parent.scope())),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn scope(&self) -> &str {
        self.0.split_once(':').map_or(self.0.as_str(), |(_, rest)| rest)
    }
}

impl From<String> for EntityId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for EntityId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Observations
// ---------------------------------------------------------------------------

/// One anchor/label pulled from the markup, before any cleaning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawObservation {
    #[serde(rename = "type")]
    pub kind: EntityKind,
    pub raw_name: String,
    /// Raw `href` attribute; empty when the element had none.
    pub raw_href: String,
}

impl RawObservation {
    pub fn new(kind: EntityKind, raw_name: impl Into<String>, raw_href: impl Into<String>) -> Self {
        Self {
            kind,
            raw_name: raw_name.into(),
            raw_href: raw_href.into(),
        }
    }
}

/// An observation with a clean display name, slug, and canonical URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedObservation {
    pub kind: EntityKind,
    pub clean_name: String,
    /// Non-empty lowercase ASCII dash-delimited token.
    pub slug: String,
    pub absolute_url: String,
}

/// Why an observation was routed to the rejected channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    EmptyName,
    InvalidUrl,
    /// The category this child follows was itself rejected.
    ParentRejected,
}

/// A raw observation set aside instead of failing the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedObservation {
    /// Position in the extracted sequence.
    pub index: usize,
    pub observation: RawObservation,
    pub reason: RejectReason,
    pub detail: String,
}

// ---------------------------------------------------------------------------
// TaxonomyEntity
// ---------------------------------------------------------------------------

/// A final taxonomy node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxonomyEntity {
    pub id: EntityId,
    #[serde(rename = "type")]
    pub kind: EntityKind,
    pub name: String,
    pub slug: String,
    pub url: String,
    /// Serialized as `null` for categories.
    pub parent_id: Option<EntityId>,
}

// ---------------------------------------------------------------------------
// TaxonomyDocument
// ---------------------------------------------------------------------------

/// Caller-supplied provenance for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunMetadata {
    pub version: String,
    pub source: String,
    pub collected_at: DateTime<Utc>,
}

/// The assembled taxonomy. Fields are read-only once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxonomyDocument {
    version: String,
    source: String,
    collected_at: DateTime<Utc>,
    items: Vec<TaxonomyEntity>,
}

impl TaxonomyDocument {
    pub fn new(metadata: RunMetadata, items: Vec<TaxonomyEntity>) -> Self {
        Self {
            version: metadata.version,
            source: metadata.source,
            collected_at: metadata.collected_at,
            items,
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn collected_at(&self) -> DateTime<Utc> {
        self.collected_at
    }

    /// Items in document order.
    pub fn items(&self) -> &[TaxonomyEntity] {
        &self.items
    }

    /// Number of items of the given kind.
    pub fn count(&self, kind: EntityKind) -> usize {
        self.items.iter().filter(|item| item.kind == kind).count()
    }
}
