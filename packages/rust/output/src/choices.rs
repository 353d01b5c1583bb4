//! Compact category/subcategory menu derived from a document.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use taxonomy_core::group_by_category;
use taxonomy_shared::{EntityKind, Result, TaxonomyDocument, TaxonomyEntity};

use crate::writer::{WrittenFile, write_json};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choices {
    pub generated_at: DateTime<Utc>,
    pub version: String,
    pub categories: Vec<ChoiceCategory>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceCategory {
    pub name: String,
    pub slug: String,
    pub url: String,
    pub subs: Vec<ChoiceItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceItem {
    pub name: String,
    pub slug: String,
    pub url: String,
}

impl From<&TaxonomyEntity> for ChoiceItem {
    fn from(entity: &TaxonomyEntity) -> Self {
        Self {
            name: entity.name.clone(),
            slug: entity.slug.clone(),
            url: entity.url.clone(),
        }
    }
}

/// Categories with their children, in document order.
///
/// All-in links are listed among the children only when `include_all_in` is
/// set. The timestamp is the document's collection time, so the same document
/// always yields the same choices.
pub fn build_choices(doc: &TaxonomyDocument, include_all_in: bool) -> Choices {
    let categories = group_by_category(doc)
        .into_iter()
        .map(|group| {
            let item = ChoiceItem::from(group.category);
            ChoiceCategory {
                name: item.name,
                slug: item.slug,
                url: item.url,
                subs: group
                    .children
                    .iter()
                    .filter(|c| include_all_in || c.kind != EntityKind::AllIn)
                    .map(|c| ChoiceItem::from(*c))
                    .collect(),
            }
        })
        .collect();

    Choices {
        generated_at: doc.collected_at(),
        version: doc.version().to_string(),
        categories,
    }
}

/// Write choices atomically to `path`.
pub fn write_choices(path: &Path, choices: &Choices, pretty: bool) -> Result<WrittenFile> {
    write_json(path, choices, pretty)
}
