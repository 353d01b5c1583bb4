//! Run provenance attached to written documents.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Where and when a written document came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    /// Time-ordered id, unique per run.
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    /// Version of the builder that produced the document.
    pub parser_version: String,
    pub profile: String,
    pub source: String,
}

impl Provenance {
    /// Provenance for a run starting now.
    pub fn new(profile: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            run_id: Uuid::now_v7(),
            generated_at: Utc::now(),
            parser_version: env!("CARGO_PKG_VERSION").to_string(),
            profile: profile.into(),
            source: source.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_ids_are_unique() {
        let a = Provenance::new("dev", "fixture");
        let b = Provenance::new("dev", "fixture");
        assert_ne!(a.run_id, b.run_id);
        assert_eq!(a.parser_version, env!("CARGO_PKG_VERSION"));
    }
}
