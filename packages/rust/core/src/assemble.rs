//! Document assembly.

use tracing::debug;

use taxonomy_shared::{RunMetadata, TaxonomyDocument, TaxonomyEntity};

/// Stamp caller-supplied run metadata onto the final entities.
///
/// Nothing is computed here: version, source and timestamp all come from the
/// caller, so identical inputs give identical documents.
pub fn assemble(entities: Vec<TaxonomyEntity>, metadata: RunMetadata) -> TaxonomyDocument {
    debug!(items = entities.len(), version = %metadata.version, "assembling document");
    TaxonomyDocument::new(metadata, entities)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use taxonomy_shared::{EntityId, EntityKind};

    #[test]
    fn metadata_is_copied_verbatim() {
        let collected_at = Utc.with_ymd_and_hms(2025, 3, 14, 9, 26, 53).unwrap();
        let items = vec![TaxonomyEntity {
            id: EntityId::derive(EntityKind::Category, "it", None),
            kind: EntityKind::Category,
            name: "IT".into(),
            slug: "it".into(),
            url: "https://clutch.co/it".into(),
            parent_id: None,
        }];
        let doc = assemble(
            items.clone(),
            RunMetadata {
                version: "2.0.0".into(),
                source: "fixture:list".into(),
                collected_at,
            },
        );

        assert_eq!(doc.version(), "2.0.0");
        assert_eq!(doc.source(), "fixture:list");
        assert_eq!(doc.collected_at(), collected_at);
        assert_eq!(doc.items(), items.as_slice());
    }
}
