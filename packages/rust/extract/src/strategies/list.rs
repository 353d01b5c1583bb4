//! List-based directory markup found on older page layouts.

use std::sync::LazyLock;

use super::{DirectoryStrategy, SelectorSet};

static SELECTORS: LazyLock<SelectorSet> = LazyLock::new(|| {
    SelectorSet::compile(
        &[
            "ul.categories > li",
            "div.categories > div",
            "section.categories > div",
        ],
        &["h2", "h3", ".title", "header .title"],
        &["ul > li", ".items > .item", ".links > li"],
        &["a[href]", "a.link"],
        &[r#"a[href][class*="all-in"]"#, r#"a[href][data-test="all-in"]"#],
    )
});

/// Fallback for `ul.categories > li` style pages.
pub struct ListStrategy;

impl DirectoryStrategy for ListStrategy {
    fn name(&self) -> &str {
        "list"
    }

    fn selectors(&self) -> &SelectorSet {
        &SELECTORS
    }
}
