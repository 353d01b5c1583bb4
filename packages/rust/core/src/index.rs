//! Read-only views over a finished document.

use std::collections::{BTreeMap, HashMap};

use taxonomy_shared::{EntityId, EntityKind, TaxonomyDocument, TaxonomyEntity};

/// A category with its children in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryGroup<'a> {
    pub category: &'a TaxonomyEntity,
    pub children: Vec<&'a TaxonomyEntity>,
}

impl<'a> CategoryGroup<'a> {
    /// Children of one kind, in document order.
    pub fn children_of_kind(&self, kind: EntityKind) -> impl Iterator<Item = &'a TaxonomyEntity> + '_ {
        self.children.iter().copied().filter(move |c| c.kind == kind)
    }
}

/// Group every child under its category. Categories keep document order.
///
/// Children whose parent is not a category in `doc` are left out; a validated
/// document has none.
pub fn group_by_category(doc: &TaxonomyDocument) -> Vec<CategoryGroup<'_>> {
    let mut groups: Vec<CategoryGroup<'_>> = Vec::new();
    let mut position: HashMap<&EntityId, usize> = HashMap::new();

    for item in doc.items() {
        if item.kind == EntityKind::Category && !position.contains_key(&item.id) {
            position.insert(&item.id, groups.len());
            groups.push(CategoryGroup {
                category: item,
                children: Vec::new(),
            });
        }
    }

    for item in doc.items() {
        if let Some(&slot) = item.parent_id.as_ref().and_then(|p| position.get(p)) {
            groups[slot].children.push(item);
        }
    }

    groups
}

/// Items keyed by slug. A slug can repeat under different parents.
pub fn index_by_slug(doc: &TaxonomyDocument) -> BTreeMap<&str, Vec<&TaxonomyEntity>> {
    let mut index: BTreeMap<&str, Vec<&TaxonomyEntity>> = BTreeMap::new();
    for item in doc.items() {
        index.entry(item.slug.as_str()).or_default().push(item);
    }
    index
}
