//! Taxonomy assembly engine.
//!
//! This crate ties extraction and normalization together with the stages
//! that turn a flat observation sequence into a validated document:
//! - [`lineage`]: single-register parent reconstruction and id assignment
//! - [`dedupe`]: first-occurrence-wins collapse by id
//! - [`validate`]: whole-document structural checks
//! - [`assemble`]: provenance stamping
//! - [`pipeline`]: the end-to-end [`run`]
//! - [`index`]: read-only views over finished documents
//!
//! Nothing here performs I/O; callers supply markup and metadata and receive
//! a document or a typed error.

pub mod assemble;
pub mod dedupe;
pub mod index;
pub mod lineage;
pub mod pipeline;
pub mod validate;

pub use assemble::assemble;
pub use dedupe::{DedupeOutcome, dedupe};
pub use index::{CategoryGroup, group_by_category, index_by_slug};
pub use lineage::{LineageBuilder, build_lineage};
pub use pipeline::{PipelineOptions, PipelineOutput, RunStats, process, run};
pub use validate::{validate, validate_value, violations};
