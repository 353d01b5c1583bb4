//! Selector strategies and the registry that picks one per document.
//!
//! Each strategy recognizes one family of directory markup (section-based,
//! list-based, or anything at all). Strategies are tried in priority order and
//! the first one whose block selectors match wins for the whole document.

mod generic;
mod list;
mod section;

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use taxonomy_shared::{EntityKind, RawObservation, Result, TaxonomyError};

pub use generic::GenericStrategy;
pub use list::ListStrategy;
pub use section::SectionStrategy;

// ---------------------------------------------------------------------------
// Selector sets
// ---------------------------------------------------------------------------

/// Ordered CSS candidates for each structural role.
///
/// Within every list the first selector that yields a match is used.
pub struct SelectorSet {
    /// Blocks grouping one category with its children.
    pub category_blocks: Vec<Selector>,
    /// Heading/title inside a block.
    pub category_titles: Vec<Selector>,
    /// One row per subcategory inside a block.
    pub subcategory_items: Vec<Selector>,
    /// The anchor inside a subcategory row.
    pub subcategory_links: Vec<Selector>,
    /// Anchors marked as "all in" by attribute rather than text.
    pub all_in_anchors: Vec<Selector>,
}

impl SelectorSet {
    pub(crate) fn compile(
        category_blocks: &[&str],
        category_titles: &[&str],
        subcategory_items: &[&str],
        subcategory_links: &[&str],
        all_in_anchors: &[&str],
    ) -> Self {
        Self {
            category_blocks: compile_all(category_blocks),
            category_titles: compile_all(category_titles),
            subcategory_items: compile_all(subcategory_items),
            subcategory_links: compile_all(subcategory_links),
            all_in_anchors: compile_all(all_in_anchors),
        }
    }
}

fn compile_all(list: &[&str]) -> Vec<Selector> {
    list.iter()
        .map(|css| Selector::parse(css).expect("built-in selector"))
        .collect()
}

static ANCHOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").expect("anchor selector"));

/// "all in" as whole words, e.g. "All in Development" but not "Firewall installation".
static ALL_IN_TEXT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\ball\s+in\b").expect("all-in regex"));

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Strategy for locating category blocks and reading observations out of them.
///
/// Strategies are tried in priority order; `GenericStrategy` is the last resort.
pub trait DirectoryStrategy: Send + Sync {
    /// Human-readable strategy name for tracing and configuration.
    fn name(&self) -> &str;

    /// The selector candidates this strategy uses.
    fn selectors(&self) -> &SelectorSet;

    /// Category blocks in document order, from the first block selector that matches.
    fn category_blocks<'a>(&self, doc: &'a Html) -> Vec<ElementRef<'a>> {
        for sel in &self.selectors().category_blocks {
            let blocks: Vec<_> = doc.select(sel).collect();
            if !blocks.is_empty() {
                return blocks;
            }
        }
        Vec::new()
    }

    /// Observations for one block: the category, then its children in markup order.
    ///
    /// Blocks without a title yield nothing.
    fn observe_block(&self, block: ElementRef<'_>) -> Vec<RawObservation> {
        let sels = self.selectors();
        let Some(title) = category_title(block, sels) else {
            return Vec::new();
        };

        let mut out = vec![RawObservation::new(
            EntityKind::Category,
            title.text,
            title.href,
        )];

        let item_links = subcategory_links(block, sels);
        let marked_all_in: Vec<ElementRef<'_>> = sels
            .all_in_anchors
            .iter()
            .flat_map(|sel| block.select(sel))
            .collect();

        // Children are read in a single pass over the block's anchors so that
        // subcategories and all-in links keep their relative markup order.
        for anchor in block.select(&ANCHOR) {
            if title.anchors.contains(&anchor) {
                continue;
            }
            let text = element_text(anchor);
            let href = anchor.value().attr("href").unwrap_or_default();

            let is_item = item_links.contains(&anchor);
            let kind = if marked_all_in.contains(&anchor) || looks_like_all_in(&text, href) {
                EntityKind::AllIn
            } else if is_item {
                EntityKind::Subcategory
            } else {
                continue;
            };

            out.push(RawObservation::new(kind, text, href));
        }

        out
    }
}

/// A block's title text plus the href of the anchor it wraps (if any).
pub(crate) struct BlockTitle<'a> {
    pub text: String,
    pub href: String,
    /// Anchors inside the title element; never reported as children.
    pub anchors: Vec<ElementRef<'a>>,
}

/// First non-empty title among the title selectors.
pub(crate) fn category_title<'a>(block: ElementRef<'a>, sels: &SelectorSet) -> Option<BlockTitle<'a>> {
    for sel in &sels.category_titles {
        for el in block.select(sel) {
            let text = element_text(el);
            if text.trim().is_empty() {
                continue;
            }

            let mut anchors: Vec<ElementRef<'a>> = el.select(&ANCHOR).collect();
            if el.value().name() == "a" && el.value().attr("href").is_some() {
                anchors.insert(0, el);
            }
            let href = anchors
                .first()
                .and_then(|a| a.value().attr("href"))
                .unwrap_or_default()
                .to_string();

            return Some(BlockTitle { text, href, anchors });
        }
    }
    None
}

/// The link anchor of every subcategory row, using the first item selector that matches.
fn subcategory_links<'a>(block: ElementRef<'a>, sels: &SelectorSet) -> Vec<ElementRef<'a>> {
    for item_sel in &sels.subcategory_items {
        let items: Vec<_> = block.select(item_sel).collect();
        if items.is_empty() {
            continue;
        }
        return items
            .into_iter()
            .filter_map(|item| {
                sels.subcategory_links
                    .iter()
                    .find_map(|link_sel| item.select(link_sel).next())
            })
            .collect();
    }
    Vec::new()
}

/// Text of an element with child text nodes separated by spaces.
pub(crate) fn element_text(el: ElementRef<'_>) -> String {
    el.text().collect::<Vec<_>>().join(" ")
}

/// Whether an anchor reads like an "All in …" browse link.
///
/// Looks at the label first, then at common href shapes (`all-in`, a trailing
/// `/all` segment, or an `all=` query flag).
pub fn looks_like_all_in(text: &str, href: &str) -> bool {
    if ALL_IN_TEXT_RE.is_match(text) {
        return true;
    }

    let h = href.trim().to_ascii_lowercase();
    if h.is_empty() {
        return false;
    }
    let path = h.split(['?', '#']).next().unwrap_or_default();
    h.contains("all-in")
        || path.ends_with("/all")
        || path.contains("/all/")
        || h.contains("?all=")
        || h.contains("&all=")
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Holds registered strategies in priority order.
pub struct StrategyRegistry {
    strategies: Vec<Box<dyn DirectoryStrategy>>,
}

impl StrategyRegistry {
    /// Create a registry with all built-in strategies (specific first, generic last).
    pub fn new() -> Self {
        Self {
            strategies: vec![
                Box::new(SectionStrategy),
                Box::new(ListStrategy),
                Box::new(GenericStrategy),
            ],
        }
    }

    /// Build a registry from configured strategy names, keeping their order.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self> {
        let mut strategies: Vec<Box<dyn DirectoryStrategy>> = Vec::with_capacity(names.len());
        for name in names {
            let strategy: Box<dyn DirectoryStrategy> = match name.as_ref().trim() {
                "section" => Box::new(SectionStrategy),
                "list" => Box::new(ListStrategy),
                "generic" => Box::new(GenericStrategy),
                other => {
                    return Err(TaxonomyError::config(format!(
                        "unknown extract strategy '{other}': expected 'section', 'list', or 'generic'"
                    )));
                }
            };
            strategies.push(strategy);
        }

        if strategies.is_empty() {
            return Err(TaxonomyError::config("at least one extract strategy is required"));
        }
        Ok(Self { strategies })
    }

    /// Names of the registered strategies, in priority order.
    pub fn names(&self) -> Vec<&str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Find the first strategy with at least one category block.
    ///
    /// Returns the strategy together with its blocks; strategies are never mixed.
    pub fn detect<'a>(&self, doc: &'a Html) -> Option<(&dyn DirectoryStrategy, Vec<ElementRef<'a>>)> {
        for strategy in &self.strategies {
            let blocks = strategy.category_blocks(doc);
            if !blocks.is_empty() {
                return Some((strategy.as_ref(), blocks));
            }
        }
        None
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_in_by_label() {
        assert!(looks_like_all_in("All in Development", "/developers"));
        assert!(looks_like_all_in("  all   IN design ", ""));
        assert!(!looks_like_all_in("Firewall installation", "/it/firewall"));
        assert!(!looks_like_all_in("Small Business", "/small-business"));
    }

    #[test]
    fn all_in_by_href() {
        assert!(looks_like_all_in("Browse everything", "/it-services/all"));
        assert!(looks_like_all_in("Browse", "/it-services/all/?page=1"));
        assert!(looks_like_all_in("Browse", "/agencies/all-in-marketing"));
        assert!(looks_like_all_in("Browse", "/search?all=1"));
        assert!(looks_like_all_in("Browse", "/search?q=x&all=true"));
        assert!(!looks_like_all_in("Install", "/software/install"));
        assert!(!looks_like_all_in("Calls", "/call-centers/"));
    }

    #[test]
    fn registry_from_names_keeps_order() {
        let registry = StrategyRegistry::from_names(&["generic", "section"]).unwrap();
        assert_eq!(registry.names(), vec!["generic", "section"]);
    }

    #[test]
    fn registry_rejects_unknown_names() {
        let err = StrategyRegistry::from_names(&["section", "xpath"]).err().unwrap();
        assert!(err.to_string().contains("unknown extract strategy 'xpath'"));

        let empty: [&str; 0] = [];
        assert!(StrategyRegistry::from_names(&empty).is_err());
    }

    #[test]
    fn title_anchor_is_not_a_child() {
        let html = Html::parse_document(
            r#"<section class="category">
                 <h2><a href="/agencies">Agencies</a></h2>
                 <ul class="subcategories"><li><a href="/agencies/seo">SEO</a></li></ul>
               </section>"#,
        );
        let strategy = SectionStrategy;
        let blocks = strategy.category_blocks(&html);
        let obs = strategy.observe_block(blocks[0]);
        assert_eq!(obs.len(), 2);
        assert_eq!(obs[0].kind, EntityKind::Category);
        assert_eq!(obs[0].raw_href, "/agencies");
        assert_eq!(obs[1].kind, EntityKind::Subcategory);
        assert_eq!(obs[1].raw_name, "SEO");
    }
}
