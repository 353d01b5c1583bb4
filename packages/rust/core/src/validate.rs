//! Structural validation of assembled documents.
//!
//! Every check runs over the whole document and all violations are collected
//! before failing, so a caller always gets the complete report.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde_json::{Map, Value};
use tracing::{debug, instrument};
use url::Url;

use taxonomy_shared::{
    EntityId, EntityKind, Result, RunMetadata, TaxonomyDocument, TaxonomyEntity, TaxonomyError,
    Violation, ViolationRule,
};

static SLUG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").expect("slug regex"));

/// Validate an assembled document.
///
/// Fails with [`TaxonomyError::Schema`] carrying every violation found.
#[instrument(skip_all, fields(items = doc.items().len()))]
pub fn validate(doc: &TaxonomyDocument) -> Result<()> {
    let violations = violations(doc);
    if violations.is_empty() {
        debug!("document valid");
        Ok(())
    } else {
        debug!(violations = violations.len(), "document invalid");
        Err(TaxonomyError::Schema { violations })
    }
}

/// All violations in `doc`; empty when it is valid.
pub fn violations(doc: &TaxonomyDocument) -> Vec<Violation> {
    let mut out = Vec::new();
    if doc.version().trim().is_empty() {
        out.push(Violation::document(ViolationRule::MissingDocumentField, "version is empty"));
    }
    if doc.source().trim().is_empty() {
        out.push(Violation::document(ViolationRule::MissingDocumentField, "source is empty"));
    }

    let items: Vec<(usize, &TaxonomyEntity)> = doc.items().iter().enumerate().collect();
    out.extend(check_items(&items, &HashSet::new()));
    out
}

/// Validate a document read as untyped JSON, e.g. from disk.
///
/// Items that cannot be read as entities are reported as violations alongside
/// the structural checks of every readable item. Returns the typed document
/// when nothing is wrong.
#[instrument(skip_all)]
pub fn validate_value(value: &Value) -> Result<TaxonomyDocument> {
    let Some(root) = value.as_object() else {
        return Err(TaxonomyError::Schema {
            violations: vec![Violation::document(
                ViolationRule::Malformed,
                "document must be a JSON object",
            )],
        });
    };

    let mut violations = Vec::new();
    let version = document_str(root, "version", &mut violations);
    let source = document_str(root, "source", &mut violations);
    let collected_at = document_str(root, "collected_at", &mut violations).and_then(|raw| {
        match DateTime::parse_from_rfc3339(raw) {
            Ok(ts) => Some(ts.with_timezone(&Utc)),
            Err(e) => {
                violations.push(Violation::document(
                    ViolationRule::Malformed,
                    format!("collected_at {raw:?} is not an ISO-8601 timestamp: {e}"),
                ));
                None
            }
        }
    });

    let mut parsed: Vec<(usize, TaxonomyEntity)> = Vec::new();
    // Ids of items already reported as unreadable; children may still point at them.
    let mut unreadable: HashSet<&str> = HashSet::new();
    match root.get("items").and_then(Value::as_array) {
        Some(items) => {
            for (index, item) in items.iter().enumerate() {
                match parse_item(index, item) {
                    Ok(entity) => parsed.push((index, entity)),
                    Err(mut item_violations) => {
                        violations.append(&mut item_violations);
                        if let Some(id) = item.get("id").and_then(Value::as_str) {
                            unreadable.insert(id);
                        }
                    }
                }
            }
        }
        None => violations.push(Violation::document(
            ViolationRule::MissingDocumentField,
            "items is missing or not an array",
        )),
    }

    let refs: Vec<(usize, &TaxonomyEntity)> = parsed.iter().map(|(i, e)| (*i, e)).collect();
    violations.extend(check_items(&refs, &unreadable));

    match (version, source, collected_at) {
        (Some(version), Some(source), Some(collected_at)) if violations.is_empty() => {
            let metadata = RunMetadata {
                version: version.to_string(),
                source: source.to_string(),
                collected_at,
            };
            Ok(TaxonomyDocument::new(
                metadata,
                parsed.into_iter().map(|(_, e)| e).collect(),
            ))
        }
        _ => Err(TaxonomyError::Schema { violations }),
    }
}

// ---------------------------------------------------------------------------
// Item checks
// ---------------------------------------------------------------------------

/// Structural checks over readable items. A parent listed in `unreadable`
/// exists but could not be typed, so it is neither dangling nor checked.
fn check_items(items: &[(usize, &TaxonomyEntity)], unreadable: &HashSet<&str>) -> Vec<Violation> {
    let mut out = Vec::new();

    // First occurrence of every id, with its kind.
    let mut by_id: HashMap<&EntityId, (usize, EntityKind)> = HashMap::with_capacity(items.len());
    for &(index, entity) in items {
        if let Some((first, _)) = by_id.get(&entity.id) {
            out.push(Violation::item(
                index,
                Some(entity.id.as_str()),
                ViolationRule::DuplicateId,
                format!("id already used by items[{first}]"),
            ));
        } else {
            by_id.insert(&entity.id, (index, entity.kind));
        }
    }

    for &(index, entity) in items {
        let id = Some(entity.id.as_str());
        let mut push = |rule: ViolationRule, message: String| {
            out.push(Violation::item(index, id, rule, message));
        };

        for (field, value) in [
            ("id", entity.id.as_str()),
            ("name", entity.name.as_str()),
            ("slug", entity.slug.as_str()),
            ("url", entity.url.as_str()),
        ] {
            if value.trim().is_empty() {
                push(ViolationRule::MissingField, format!("{field} is empty"));
            }
        }

        if !entity.slug.is_empty() && !SLUG_RE.is_match(&entity.slug) {
            push(
                ViolationRule::MalformedSlug,
                format!("slug {:?} is not lowercase dash-delimited ASCII", entity.slug),
            );
        }

        if !entity.url.is_empty() && !is_absolute_http(&entity.url) {
            push(
                ViolationRule::InvalidUrl,
                format!("url {:?} is not an absolute http(s) URL", entity.url),
            );
        }

        match (entity.kind, &entity.parent_id) {
            (EntityKind::Category, Some(parent)) => push(
                ViolationRule::KindParentMismatch,
                format!("category must not have a parent (has {parent})"),
            ),
            (kind, None) if kind.is_child() => push(
                ViolationRule::KindParentMismatch,
                format!("{kind} must have a parent"),
            ),
            (_, Some(parent)) => match by_id.get(parent) {
                None if unreadable.contains(parent.as_str()) => {}
                None => push(
                    ViolationRule::DanglingParent,
                    format!("parent_id {parent} does not match any item"),
                ),
                Some((_, parent_kind)) if *parent_kind != EntityKind::Category => push(
                    ViolationRule::KindParentMismatch,
                    format!("parent {parent} is a {parent_kind}, not a category"),
                ),
                Some(_) => {}
            },
            _ => {}
        }
    }

    out.extend(find_cycles(items));
    out
}

/// Items that are their own ancestor.
fn find_cycles(items: &[(usize, &TaxonomyEntity)]) -> Vec<Violation> {
    let mut parents: HashMap<&EntityId, Option<&EntityId>> = HashMap::with_capacity(items.len());
    for &(_, entity) in items {
        parents.entry(&entity.id).or_insert(entity.parent_id.as_ref());
    }

    let mut out = Vec::new();
    for &(index, entity) in items {
        let mut visited: HashSet<&EntityId> = HashSet::new();
        let mut cursor = entity.parent_id.as_ref();
        while let Some(ancestor) = cursor {
            if ancestor == &entity.id {
                out.push(Violation::item(
                    index,
                    Some(entity.id.as_str()),
                    ViolationRule::Cycle,
                    "item is its own ancestor",
                ));
                break;
            }
            if !visited.insert(ancestor) {
                break;
            }
            cursor = parents.get(ancestor).copied().flatten();
        }
    }
    out
}

fn is_absolute_http(raw: &str) -> bool {
    Url::parse(raw).is_ok_and(|url| matches!(url.scheme(), "http" | "https") && url.has_host())
}

// ---------------------------------------------------------------------------
// Untyped input
// ---------------------------------------------------------------------------

fn document_str<'a>(
    root: &'a Map<String, Value>,
    field: &str,
    violations: &mut Vec<Violation>,
) -> Option<&'a str> {
    match root.get(field).and_then(Value::as_str) {
        Some(s) if !s.trim().is_empty() => Some(s),
        Some(_) => {
            violations.push(Violation::document(
                ViolationRule::MissingDocumentField,
                format!("{field} is empty"),
            ));
            None
        }
        None => {
            violations.push(Violation::document(
                ViolationRule::MissingDocumentField,
                format!("{field} is missing or not a string"),
            ));
            None
        }
    }
}

fn parse_item(index: usize, item: &Value) -> std::result::Result<TaxonomyEntity, Vec<Violation>> {
    let Some(obj) = item.as_object() else {
        return Err(vec![Violation::item(
            index,
            None,
            ViolationRule::Malformed,
            "item must be a JSON object",
        )]);
    };
    let id = obj.get("id").and_then(Value::as_str);
    let mut violations = Vec::new();

    for field in ["id", "name", "slug", "url"] {
        if !obj.get(field).is_some_and(Value::is_string) {
            violations.push(Violation::item(
                index,
                id,
                ViolationRule::MissingField,
                format!("{field} is missing or not a string"),
            ));
        }
    }

    match obj.get("type") {
        None => violations.push(Violation::item(
            index,
            id,
            ViolationRule::MissingField,
            "type is missing",
        )),
        Some(kind) if serde_json::from_value::<EntityKind>(kind.clone()).is_err() => {
            violations.push(Violation::item(
                index,
                id,
                ViolationRule::InvalidKind,
                format!("type {kind} is not one of category, subcategory, all_in"),
            ));
        }
        Some(_) => {}
    }

    if obj.get("parent_id").is_some_and(|p| !p.is_null() && !p.is_string()) {
        violations.push(Violation::item(
            index,
            id,
            ViolationRule::Malformed,
            "parent_id must be a string or null",
        ));
    }

    if !violations.is_empty() {
        return Err(violations);
    }
    serde_json::from_value(item.clone())
        .map_err(|e| vec![Violation::item(index, id, ViolationRule::Malformed, e.to_string())])
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn metadata() -> RunMetadata {
        RunMetadata {
            version: "0.1.0".into(),
            source: "https://clutch.co/categories".into(),
            collected_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    fn entity(kind: EntityKind, slug: &str, parent: Option<&str>) -> TaxonomyEntity {
        let parent_id = parent.map(EntityId::from);
        TaxonomyEntity {
            id: EntityId::derive(kind, slug, parent_id.as_ref()),
            kind,
            name: slug.to_uppercase(),
            slug: slug.into(),
            url: format!("https://clutch.co/{slug}"),
            parent_id,
        }
    }

    fn valid_items() -> Vec<TaxonomyEntity> {
        vec![
            entity(EntityKind::Category, "ads", None),
            entity(EntityKind::Subcategory, "seo", Some("category:ads")),
            entity(EntityKind::AllIn, "all-in-ads", Some("category:ads")),
        ]
    }

    fn rules(err: &TaxonomyError) -> Vec<ViolationRule> {
        err.violations().iter().map(|v| v.rule).collect()
    }

    #[test]
    fn valid_document_passes() {
        let doc = TaxonomyDocument::new(metadata(), valid_items());
        validate(&doc).unwrap();
    }

    #[test]
    fn empty_document_is_valid() {
        let doc = TaxonomyDocument::new(metadata(), Vec::new());
        validate(&doc).unwrap();
    }

    #[test]
    fn dangling_parent_names_the_item() {
        let mut items = valid_items();
        items.push(entity(EntityKind::Subcategory, "ppc", Some("category:missing")));
        let err = validate(&TaxonomyDocument::new(metadata(), items)).unwrap_err();

        let violations = err.violations();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].rule, ViolationRule::DanglingParent);
        assert_eq!(violations[0].index, Some(3));
        assert_eq!(violations[0].item_id.as_deref(), Some("subcategory:missing:ppc"));
    }

    #[test]
    fn all_violations_are_accumulated() {
        let mut items = valid_items();
        items.push(items[1].clone());
        items.push(TaxonomyEntity {
            id: "category:bad".into(),
            kind: EntityKind::Category,
            name: "  ".into(),
            slug: "Bad Slug".into(),
            url: "/relative".into(),
            parent_id: Some("category:ads".into()),
        });
        items.push(TaxonomyEntity {
            parent_id: None,
            ..entity(EntityKind::Subcategory, "loose", None)
        });

        let doc = TaxonomyDocument::new(
            RunMetadata {
                version: String::new(),
                ..metadata()
            },
            items,
        );
        let err = validate(&doc).unwrap_err();
        let got = rules(&err);

        for expected in [
            ViolationRule::MissingDocumentField,
            ViolationRule::DuplicateId,
            ViolationRule::MissingField,
            ViolationRule::MalformedSlug,
            ViolationRule::InvalidUrl,
            ViolationRule::KindParentMismatch,
        ] {
            assert!(got.contains(&expected), "missing {expected} in {got:?}");
        }
        assert_eq!(
            got.iter().filter(|r| **r == ViolationRule::KindParentMismatch).count(),
            2
        );
    }

    #[test]
    fn child_of_child_is_rejected() {
        let mut items = valid_items();
        items.push(entity(
            EntityKind::Subcategory,
            "local-seo",
            Some("subcategory:ads:seo"),
        ));
        let err = validate(&TaxonomyDocument::new(metadata(), items)).unwrap_err();
        assert_eq!(rules(&err), vec![ViolationRule::KindParentMismatch]);
    }

    #[test]
    fn cycles_are_detected() {
        let a = TaxonomyEntity {
            id: "subcategory:a".into(),
            kind: EntityKind::Subcategory,
            name: "A".into(),
            slug: "a".into(),
            url: "https://clutch.co/a".into(),
            parent_id: Some("subcategory:b".into()),
        };
        let b = TaxonomyEntity {
            id: "subcategory:b".into(),
            parent_id: Some("subcategory:a".into()),
            slug: "b".into(),
            ..a.clone()
        };
        let err = validate(&TaxonomyDocument::new(metadata(), vec![a, b])).unwrap_err();
        let cycles = err
            .violations()
            .iter()
            .filter(|v| v.rule == ViolationRule::Cycle)
            .count();
        assert_eq!(cycles, 2);
    }

    #[test]
    fn value_round_trip_is_valid() {
        let doc = TaxonomyDocument::new(metadata(), valid_items());
        let value = serde_json::to_value(&doc).unwrap();
        let parsed = validate_value(&value).unwrap();
        assert_eq!(parsed, doc);
    }

    #[test]
    fn malformed_items_are_reported_not_fatal() {
        let value = json!({
            "version": "0.1.0",
            "source": "https://clutch.co/categories",
            "collected_at": "2025-01-01T00:00:00Z",
            "items": [
                {"id": "category:ads", "type": "category", "name": "Ads", "slug": "ads",
                 "url": "https://clutch.co/ads", "parent_id": null},
                {"id": "subcategory:ads:seo", "type": "widget", "name": "SEO", "slug": "seo",
                 "url": "https://clutch.co/seo", "parent_id": "category:ads"},
                "not an object",
                {"id": "subcategory:ads:ppc", "type": "subcategory", "slug": "ppc",
                 "url": "https://clutch.co/ppc", "parent_id": "category:gone"}
            ]
        });

        let err = validate_value(&value).unwrap_err();
        let violations = err.violations();
        let located: Vec<(Option<usize>, ViolationRule)> =
            violations.iter().map(|v| (v.index, v.rule)).collect();

        assert!(located.contains(&(Some(1), ViolationRule::InvalidKind)));
        assert!(located.contains(&(Some(2), ViolationRule::Malformed)));
        assert!(located.contains(&(Some(3), ViolationRule::MissingField)));
    }

    #[test]
    fn dangling_parent_in_value_is_reported() {
        let value = json!({
            "version": "0.1.0",
            "source": "fixture",
            "collected_at": "2025-01-01T00:00:00Z",
            "items": [
                {"id": "subcategory:ads:seo", "type": "subcategory", "name": "SEO", "slug": "seo",
                 "url": "https://clutch.co/seo", "parent_id": "category:ads"}
            ]
        });
        let err = validate_value(&value).unwrap_err();
        assert_eq!(rules(&err), vec![ViolationRule::DanglingParent]);
        assert_eq!(err.violations()[0].item_id.as_deref(), Some("subcategory:ads:seo"));
    }

    #[test]
    fn children_of_unreadable_category_are_not_dangling() {
        let value = json!({
            "version": "0.1.0",
            "source": "fixture",
            "collected_at": "2025-01-01T00:00:00Z",
            "items": [
                {"id": "category:ads", "type": "category", "slug": "ads",
                 "url": "https://clutch.co/ads", "parent_id": null},
                {"id": "subcategory:ads:seo", "type": "subcategory", "name": "SEO", "slug": "seo",
                 "url": "https://clutch.co/seo", "parent_id": "category:ads"},
                {"id": "all_in:ads:all-in-ads", "type": "all_in", "name": "All in Ads",
                 "slug": "all-in-ads", "url": "https://clutch.co/ads", "parent_id": "category:ads"}
            ]
        });
        let err = validate_value(&value).unwrap_err();
        let located: Vec<(Option<usize>, ViolationRule)> =
            err.violations().iter().map(|v| (v.index, v.rule)).collect();
        assert_eq!(located, vec![(Some(0), ViolationRule::MissingField)]);
    }

    #[test]
    fn document_fields_are_checked() {
        let value = json!({"version": "", "collected_at": "yesterday", "items": []});
        let err = validate_value(&value).unwrap_err();
        let violations = err.violations();
        assert_eq!(violations.len(), 3);
        assert!(violations.iter().all(|v| v.index.is_none()));

        let err = validate_value(&json!([1, 2, 3])).unwrap_err();
        assert_eq!(rules(&err), vec![ViolationRule::Malformed]);
    }
}
