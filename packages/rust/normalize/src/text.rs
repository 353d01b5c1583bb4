//! Display-name cleanup and slug generation.
//!
//! Each pass is a small `&str -> String` step applied in sequence, so a name
//! that is already clean passes through unchanged.

use std::sync::LazyLock;

use regex::Regex;
use scraper::Html;
use sha2::{Digest, Sha256};

use taxonomy_shared::{Result, TaxonomyError};

/// Clean a raw label into a display name.
///
/// Decodes HTML entities, drops control characters, collapses whitespace runs
/// (including non-breaking spaces) to one space, and trims. Fails with
/// [`TaxonomyError::EmptyName`] when nothing is left.
pub fn clean_name(raw: &str) -> Result<String> {
    let mut name = decode_entities(raw);
    name = strip_control_chars(&name);
    name = collapse_whitespace(&name);

    if name.is_empty() {
        return Err(TaxonomyError::EmptyName {
            raw: raw.to_string(),
        });
    }
    Ok(name)
}

/// Derive a URL-safe slug from a clean name.
///
/// Transliterates to ASCII, lowercases, turns every run of non-alphanumerics
/// into one dash and trims dashes from the ends. Names with no ASCII-mappable
/// characters get a stable `item-<hash>` token so the slug is never empty.
pub fn slugify(name: &str) -> String {
    static NON_ALNUM_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("slug regex"));

    let ascii = deunicode::deunicode(name).to_ascii_lowercase();
    let slug = NON_ALNUM_RE.replace_all(&ascii, "-");
    let slug = slug.trim_matches('-');

    if slug.is_empty() {
        fallback_slug(name)
    } else {
        slug.to_string()
    }
}

// ---------------------------------------------------------------------------
// Passes
// ---------------------------------------------------------------------------

/// Decode named and numeric character references.
///
/// Labels read through the DOM are usually decoded already; this catches
/// double-escaped text such as `&amp;amp;` or labels passed in by callers.
/// Literal `<` and `>` are escaped first so the parser never sees a tag.
fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    let escaped = text.replace('<', "&lt;").replace('>', "&gt;");
    let fragment = Html::parse_fragment(&escaped);
    fragment.root_element().text().collect()
}

fn strip_control_chars(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_control() || c.is_whitespace())
        .collect()
}

fn collapse_whitespace(text: &str) -> String {
    static WS_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\s+").expect("whitespace regex"));

    WS_RE.replace_all(text, " ").trim().to_string()
}

/// `item-` plus the first 12 hex chars of the name's SHA-256.
fn fallback_slug(name: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(name.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    format!("item-{}", &digest[..12])
}
