//! Directory-page extraction.
//!
//! This crate provides:
//! - [`strategies`]: selector strategies for each known directory layout
//! - [`StrategyRegistry`]: picks the first strategy whose blocks match
//! - [`extract`]: markup → ordered raw observations
//!
//! Directory markup is flat: a category's children are siblings of its title,
//! not nested under it. Document order is therefore the only lineage signal,
//! and observations are returned strictly in that order.

pub mod strategies;

use scraper::Html;
use tracing::{debug, instrument};

use taxonomy_shared::{EntityKind, RawObservation, Result, TaxonomyError};

pub use strategies::{
    DirectoryStrategy, GenericStrategy, ListStrategy, SectionStrategy, SelectorSet,
    StrategyRegistry, looks_like_all_in,
};

/// Observations pulled from one document.
#[derive(Debug, Clone)]
pub struct Extraction {
    /// Name of the strategy that matched.
    pub strategy: String,
    /// Observations in document order.
    pub observations: Vec<RawObservation>,
}

impl Extraction {
    /// Number of observations of the given kind.
    pub fn count(&self, kind: EntityKind) -> usize {
        self.observations.iter().filter(|o| o.kind == kind).count()
    }
}

/// Extract observations using the built-in strategies.
pub fn extract(markup: &str) -> Result<Extraction> {
    StrategyRegistry::new().extract(markup)
}

impl StrategyRegistry {
    /// Parse `markup` and read observations with the first matching strategy.
    ///
    /// Fails with a parse error when no strategy finds category blocks, or when
    /// the blocks found contain no titled category.
    #[instrument(skip_all, fields(markup_len = markup.len()))]
    pub fn extract(&self, markup: &str) -> Result<Extraction> {
        if !markup.contains('<') {
            return Err(TaxonomyError::parse("input contains no markup"));
        }

        let doc = Html::parse_document(markup);

        let Some((strategy, blocks)) = self.detect(&doc) else {
            return Err(TaxonomyError::parse(format!(
                "no category blocks matched (tried: {})",
                self.names().join(", ")
            )));
        };

        let observations: Vec<RawObservation> = blocks
            .into_iter()
            .flat_map(|block| strategy.observe_block(block))
            .collect();

        if !observations.iter().any(|o| o.kind == EntityKind::Category) {
            return Err(TaxonomyError::parse(format!(
                "strategy '{}' matched blocks but none had a category title",
                strategy.name()
            )));
        }

        let extraction = Extraction {
            strategy: strategy.name().to_string(),
            observations,
        };

        debug!(
            strategy = %extraction.strategy,
            categories = extraction.count(EntityKind::Category),
            subcategories = extraction.count(EntityKind::Subcategory),
            all_in = extraction.count(EntityKind::AllIn),
            "extraction complete"
        );

        Ok(extraction)
    }
}
