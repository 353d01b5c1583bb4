//! Generic (last resort) strategy.
//!
//! Matches any `section`/`div`/`li` container. Because those selectors also
//! match page wrappers, only the innermost titled containers are kept as
//! category blocks.

use std::sync::LazyLock;

use scraper::{ElementRef, Html};

use super::{DirectoryStrategy, SelectorSet, category_title};

static SELECTORS: LazyLock<SelectorSet> = LazyLock::new(|| {
    SelectorSet::compile(
        &["section", "div", "li"],
        &["h2", "h3", "strong", ".title"],
        &["li", "div", ".item"],
        &["a[href]"],
        &[r#"a[href][class*="all-in"]"#],
    )
});

/// Generic strategy that accepts arbitrary container markup.
pub struct GenericStrategy;

impl DirectoryStrategy for GenericStrategy {
    fn name(&self) -> &str {
        "generic"
    }

    fn selectors(&self) -> &SelectorSet {
        &SELECTORS
    }

    fn category_blocks<'a>(&self, doc: &'a Html) -> Vec<ElementRef<'a>> {
        for sel in &SELECTORS.category_blocks {
            let titled: Vec<ElementRef<'a>> = doc
                .select(sel)
                .filter(|block| category_title(*block, &SELECTORS).is_some())
                .collect();
            if titled.is_empty() {
                continue;
            }

            // Drop wrappers: a block that contains another titled block is not a category.
            return titled
                .iter()
                .copied()
                .filter(|outer| {
                    !titled.iter().any(|inner| {
                        inner != outer && inner.ancestors().any(|a| a.id() == outer.id())
                    })
                })
                .collect();
        }
        Vec::new()
    }
}
