//! Shared types, error model, and configuration for the taxonomy builder.
//!
//! This crate is the foundation depended on by all other taxonomy crates.
//! It provides:
//! - [`TaxonomyError`]: the unified error type, including [`Violation`] reports
//! - Domain types ([`RawObservation`], [`NormalizedObservation`], [`TaxonomyEntity`],
//!   [`TaxonomyDocument`], [`EntityId`])
//! - Configuration ([`AppConfig`], [`RunConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DefaultsConfig, ExtractConfig, ProfileConfig, ProfileOverrides, RejectMode,
    RunConfig, UrlPolicy, config_dir, config_file_path, init_config, load_config, load_config_from,
};
pub use error::{Result, TaxonomyError, Violation, ViolationRule};
pub use types::{
    EntityId, EntityKind, NormalizedObservation, RawObservation, RejectReason,
    RejectedObservation, RunMetadata, TaxonomyDocument, TaxonomyEntity,
};
