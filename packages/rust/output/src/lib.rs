//! Persistence for finished taxonomy runs.
//!
//! The core crates stop at an in-memory document. This crate writes it:
//! - [`write_document`]: atomic JSON write with optional [`Provenance`]
//! - [`build_choices`] / [`write_choices`]: compact category menu
//! - [`append_rejected`]: JSON-lines log of rejected observations

pub mod choices;
pub mod provenance;
pub mod rejected;
pub mod writer;

use std::path::{Path, PathBuf};

pub use choices::{ChoiceCategory, ChoiceItem, Choices, build_choices, write_choices};
pub use provenance::Provenance;
pub use rejected::{append_rejected, read_rejected};
pub use writer::{WrittenFile, read_json, write_atomic, write_document};

/// File locations for one run's outputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub taxonomy: PathBuf,
    pub choices: PathBuf,
    pub rejected: PathBuf,
}

impl OutputPaths {
    /// `taxonomy.json`, `choices.json` and `rejected.jsonl` inside `dir`.
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            taxonomy: dir.join("taxonomy.json"),
            choices: dir.join("choices.json"),
            rejected: dir.join("rejected.jsonl"),
        }
    }

    /// Outputs named after an input file stem, e.g. `it.taxonomy.json`.
    pub fn for_stem(dir: &Path, stem: &str) -> Self {
        Self {
            taxonomy: dir.join(format!("{stem}.taxonomy.json")),
            choices: dir.join(format!("{stem}.choices.json")),
            rejected: dir.join(format!("{stem}.rejected.jsonl")),
        }
    }

    /// Outputs placed next to an explicit taxonomy path.
    pub fn beside(taxonomy: &Path) -> Self {
        let dir = taxonomy.parent().unwrap_or_else(|| Path::new(""));
        Self {
            taxonomy: taxonomy.to_path_buf(),
            choices: dir.join("choices.json"),
            rejected: dir.join("rejected.jsonl"),
        }
    }
}
