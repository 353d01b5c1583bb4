//! Observation normalization.
//!
//! Turns a [`RawObservation`] into a [`NormalizedObservation`]: a clean display
//! name, a slug derived from it, and a canonical absolute URL. Every step is
//! deterministic and idempotent, so running it on already-clean values is a
//! no-op.

mod text;
mod urls;

use tracing::trace;
use url::Url;

use taxonomy_shared::{NormalizedObservation, RawObservation, Result, UrlPolicy};

pub use text::{clean_name, slugify};
pub use urls::canonicalize_url;

/// Normalize one observation against `base`.
///
/// The name is cleaned before the URL is resolved, so an observation that is
/// both blank and badly linked reports [`EmptyName`](taxonomy_shared::TaxonomyError::EmptyName).
pub fn normalize(raw: &RawObservation, base: &Url, policy: &UrlPolicy) -> Result<NormalizedObservation> {
    let clean_name = clean_name(&raw.raw_name)?;
    let slug = slugify(&clean_name);
    let absolute_url = canonicalize_url(base, &raw.raw_href, policy)?;

    trace!(kind = %raw.kind, %slug, url = %absolute_url, "normalized");

    Ok(NormalizedObservation {
        kind: raw.kind,
        clean_name,
        slug,
        absolute_url,
    })
}

/// A base URL and tracking policy bundled for repeated use.
#[derive(Debug, Clone)]
pub struct Normalizer {
    base: Url,
    policy: UrlPolicy,
}

impl Normalizer {
    pub fn new(base: Url, policy: UrlPolicy) -> Self {
        Self { base, policy }
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    pub fn normalize(&self, raw: &RawObservation) -> Result<NormalizedObservation> {
        normalize(raw, &self.base, &self.policy)
    }
}
