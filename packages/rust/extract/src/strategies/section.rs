//! Section-based directory markup (the current page layout).

use std::sync::LazyLock;

use super::{DirectoryStrategy, SelectorSet};

static SELECTORS: LazyLock<SelectorSet> = LazyLock::new(|| {
    SelectorSet::compile(
        &[
            "section.category",
            "section.directory-category",
            "div.directory-categories > section",
            r#"[data-test="category-block"]"#,
            "div.category",
            "li.category",
        ],
        &[".category--title", ".category-title", "header h2", "h2", "h3"],
        &[
            "ul.subcategories > li",
            "div.subcategories > div",
            "ul > li",
            ".subcategory",
            ".field--item",
            ".list-item",
        ],
        &["a.subcategory-link[href]", "a[href].subcategory", "a[href]"],
        &[
            "a[href].all-in",
            r#"a[href][data-test="all-in"]"#,
            r#"a[href][class*="all-in"]"#,
            r#"a[href][aria-label*="All in"]"#,
            r#"a[href][title*="All in"]"#,
        ],
    )
});

/// Primary strategy: one `<section>` (or equivalent) per category.
pub struct SectionStrategy;

impl DirectoryStrategy for SectionStrategy {
    fn name(&self) -> &str {
        "section"
    }

    fn selectors(&self) -> &SelectorSet {
        &SELECTORS
    }
}
