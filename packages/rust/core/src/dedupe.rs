//! Identity-based deduplication.

use std::collections::HashSet;

use tracing::{debug, warn};

use taxonomy_shared::TaxonomyEntity;

/// Entities kept after deduplication plus how many were dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DedupeOutcome {
    pub kept: Vec<TaxonomyEntity>,
    pub dropped: usize,
}

/// Keep the first entity for every id, in document order.
///
/// Ids are derived from `(kind, slug, parent)`, so equal ids mean equal
/// tuples. Duplicates are routine on directory pages and are not an error.
pub fn dedupe(entities: Vec<TaxonomyEntity>) -> DedupeOutcome {
    let total = entities.len();
    let mut seen = HashSet::with_capacity(total);
    let mut kept = Vec::with_capacity(total);

    for entity in entities {
        if seen.contains(&entity.id) {
            warn!(id = %entity.id, name = %entity.name, "dropping duplicate entity");
            continue;
        }
        seen.insert(entity.id.clone());
        kept.push(entity);
    }

    let dropped = total - kept.len();
    debug!(kept = kept.len(), dropped, "dedupe complete");
    DedupeOutcome { kept, dropped }
}
