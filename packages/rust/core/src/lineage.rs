//! Parent/child reconstruction from flat, ordered observations.
//!
//! Directory markup has exactly two levels: a category, then its
//! subcategories and all-in links. A single "current category" register is
//! therefore enough. If a source ever nests deeper, the register becomes a
//! depth stack keyed by level; nothing else in the builder changes.

use tracing::{debug, instrument};

use taxonomy_shared::{
    EntityId, EntityKind, NormalizedObservation, Result, TaxonomyEntity, TaxonomyError,
};

/// Single-register state machine assigning parents and ids.
#[derive(Debug, Default)]
pub struct LineageBuilder {
    current: Option<EntityId>,
    position: usize,
}

impl LineageBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id of the category that following children attach to.
    pub fn current_category(&self) -> Option<&EntityId> {
        self.current.as_ref()
    }

    /// Consume the next observation in document order.
    ///
    /// A category resets the register to itself. A child takes the register
    /// as its parent, or fails with [`TaxonomyError::Orphan`] when no category
    /// has been seen yet.
    pub fn push(&mut self, obs: &NormalizedObservation) -> Result<TaxonomyEntity> {
        let index = self.position;
        self.position += 1;

        let parent_id = match obs.kind {
            EntityKind::Category => None,
            EntityKind::Subcategory | EntityKind::AllIn => {
                let Some(parent) = &self.current else {
                    return Err(TaxonomyError::Orphan {
                        index,
                        kind: obs.kind,
                        name: obs.clean_name.clone(),
                    });
                };
                Some(parent.clone())
            }
        };

        let id = EntityId::derive(obs.kind, &obs.slug, parent_id.as_ref());
        if obs.kind == EntityKind::Category {
            self.current = Some(id.clone());
        }

        Ok(TaxonomyEntity {
            id,
            kind: obs.kind,
            name: obs.clean_name.clone(),
            slug: obs.slug.clone(),
            url: obs.absolute_url.clone(),
            parent_id,
        })
    }
}

/// Build entities for a whole sequence. Output order equals input order.
#[instrument(skip_all, fields(observations = observations.len()))]
pub fn build_lineage(observations: &[NormalizedObservation]) -> Result<Vec<TaxonomyEntity>> {
    let mut builder = LineageBuilder::new();
    let entities = observations
        .iter()
        .map(|obs| builder.push(obs))
        .collect::<Result<Vec<_>>>()?;

    debug!(entities = entities.len(), "lineage built");
    Ok(entities)
}
