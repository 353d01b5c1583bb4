//! Canonical absolute URLs for observed hrefs.

use std::sync::LazyLock;

use regex::Regex;
use url::{Url, form_urlencoded};

use taxonomy_shared::{Result, TaxonomyError, UrlPolicy};

static DUP_SLASH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/{2,}").expect("slash regex"));

/// Resolve `href` against `base` and canonicalize it.
///
/// The result is an absolute http(s) URL with a lowercase scheme and host, no
/// default port, no fragment, no tracking parameters, no repeated slashes and
/// no trailing slash (the root path `/` excepted). An empty href resolves to
/// the base itself.
pub fn canonicalize_url(base: &Url, href: &str, policy: &UrlPolicy) -> Result<String> {
    let mut url = base
        .join(href.trim())
        .map_err(|e| TaxonomyError::invalid_url(href, e.to_string()))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(TaxonomyError::invalid_url(
            href,
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }
    url.set_fragment(None);
    strip_tracking_params(&mut url, policy);

    let path = canonical_path(url.path());
    url.set_path(&path);

    Ok(url.to_string())
}

/// Collapse repeated slashes and drop the trailing slash of non-root paths.
fn canonical_path(path: &str) -> String {
    let collapsed = DUP_SLASH_RE.replace_all(path, "/");
    let trimmed = collapsed.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Remove tracking pairs. Kept segments are re-joined exactly as written so
/// the same query canonicalizes the same way with or without tracking keys.
fn strip_tracking_params(url: &mut Url, policy: &UrlPolicy) {
    let Some(query) = url.query() else {
        return;
    };

    let kept: Vec<&str> = query
        .split('&')
        .filter(|segment| !segment.is_empty())
        .filter(|segment| {
            let key = form_urlencoded::parse(segment.as_bytes())
                .next()
                .map(|(k, _)| k.into_owned())
                .unwrap_or_default();
            !policy.is_tracking(&key)
        })
        .collect();

    let joined = kept.join("&");
    if joined.is_empty() {
        url.set_query(None);
    } else {
        url.set_query(Some(&joined));
    }
}
