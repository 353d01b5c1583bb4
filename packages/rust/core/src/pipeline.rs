//! End-to-end run: markup → observations → entities → validated document.

use std::time::Instant;

use serde::Serialize;
use tracing::{info, instrument, warn};
use url::Url;

use taxonomy_extract::{Extraction, StrategyRegistry};
use taxonomy_normalize::Normalizer;
use taxonomy_shared::{
    EntityKind, NormalizedObservation, RejectMode, RejectReason, RejectedObservation, Result,
    RunConfig, RunMetadata, TaxonomyDocument, TaxonomyError, UrlPolicy,
};

use crate::assemble::assemble;
use crate::dedupe::{DedupeOutcome, dedupe};
use crate::lineage::build_lineage;
use crate::validate::validate;

/// Per-run settings passed in by the orchestrator.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub reject_mode: RejectMode,
    pub url_policy: UrlPolicy,
    /// Strategy names in priority order.
    pub strategies: Vec<String>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            reject_mode: RejectMode::default(),
            url_policy: UrlPolicy::default(),
            strategies: ["section", "list", "generic"].map(String::from).to_vec(),
        }
    }
}

impl From<&RunConfig> for PipelineOptions {
    fn from(config: &RunConfig) -> Self {
        Self {
            reject_mode: config.reject_mode,
            url_policy: config.url_policy.clone(),
            strategies: config.strategies.clone(),
        }
    }
}

/// Counters describing one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    pub strategy: String,
    pub extracted: usize,
    pub rejected: usize,
    pub duplicates_dropped: usize,
    pub categories: usize,
    pub subcategories: usize,
    pub all_in: usize,
}

/// Everything a successful run produces.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub document: TaxonomyDocument,
    /// Observations set aside in [`RejectMode::Collect`]; always empty in fail-fast mode.
    pub rejected: Vec<RejectedObservation>,
    pub stats: RunStats,
}

/// Run the whole pipeline over one markup string.
#[instrument(skip_all, fields(base = %base, source = %metadata.source, markup_len = markup.len()))]
pub fn run(
    markup: &str,
    base: &Url,
    metadata: RunMetadata,
    options: &PipelineOptions,
) -> Result<PipelineOutput> {
    let registry = StrategyRegistry::from_names(&options.strategies)?;
    let extraction = registry.extract(markup)?;
    process(extraction, base, metadata, options)
}

/// Run every stage after extraction.
#[instrument(skip_all, fields(strategy = %extraction.strategy, observations = extraction.observations.len()))]
pub fn process(
    extraction: Extraction,
    base: &Url,
    metadata: RunMetadata,
    options: &PipelineOptions,
) -> Result<PipelineOutput> {
    let start = Instant::now();
    let normalizer = Normalizer::new(base.clone(), options.url_policy.clone());

    let Normalized {
        observations,
        rejected,
    } = normalize_all(&extraction, &normalizer, options.reject_mode)?;

    let entities = build_lineage(&observations)?;

    let DedupeOutcome { kept, dropped } = dedupe(entities);
    let document = assemble(kept, metadata);
    validate(&document)?;

    let stats = RunStats {
        strategy: extraction.strategy,
        extracted: extraction.observations.len(),
        rejected: rejected.len(),
        duplicates_dropped: dropped,
        categories: document.count(EntityKind::Category),
        subcategories: document.count(EntityKind::Subcategory),
        all_in: document.count(EntityKind::AllIn),
    };

    info!(
        strategy = %stats.strategy,
        items = document.items().len(),
        rejected = stats.rejected,
        duplicates = stats.duplicates_dropped,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "pipeline complete"
    );

    Ok(PipelineOutput {
        document,
        rejected,
        stats,
    })
}

// ---------------------------------------------------------------------------
// Normalization with reject handling
// ---------------------------------------------------------------------------

struct Normalized {
    observations: Vec<NormalizedObservation>,
    rejected: Vec<RejectedObservation>,
}

/// Fail when the sequence opens with a child, which then precedes every category.
///
/// Runs on the raw sequence so a malformed orphan is never routed to the
/// rejected list instead.
fn check_orphans(extraction: &Extraction) -> Result<()> {
    match extraction.observations.first() {
        Some(raw) if raw.kind != EntityKind::Category => Err(TaxonomyError::Orphan {
            index: 0,
            kind: raw.kind,
            name: raw.raw_name.trim().to_string(),
        }),
        _ => Ok(()),
    }
}

fn normalize_all(
    extraction: &Extraction,
    normalizer: &Normalizer,
    mode: RejectMode,
) -> Result<Normalized> {
    check_orphans(extraction)?;

    let mut out = Normalized {
        observations: Vec::with_capacity(extraction.observations.len()),
        rejected: Vec::new(),
    };
    // Position of the last category, when it was rejected.
    let mut rejected_category: Option<usize> = None;

    for (index, raw) in extraction.observations.iter().enumerate() {
        if raw.kind == EntityKind::Category {
            rejected_category = None;
        } else if let Some(category_index) = rejected_category {
            let detail = format!("category at position {category_index} was rejected");
            warn!(index, kind = %raw.kind, name = %raw.raw_name, "{detail}");
            out.rejected.push(RejectedObservation {
                index,
                observation: raw.clone(),
                reason: RejectReason::ParentRejected,
                detail,
            });
            continue;
        }

        match normalizer.normalize(raw) {
            Ok(obs) => out.observations.push(obs),
            Err(err) if mode == RejectMode::Collect => {
                let reason = match &err {
                    TaxonomyError::EmptyName { .. } => RejectReason::EmptyName,
                    TaxonomyError::InvalidUrl { .. } => RejectReason::InvalidUrl,
                    _ => return Err(err),
                };
                warn!(index, kind = %raw.kind, %err, "rejecting observation");
                if raw.kind == EntityKind::Category {
                    rejected_category = Some(index);
                }
                out.rejected.push(RejectedObservation {
                    index,
                    observation: raw.clone(),
                    reason,
                    detail: err.to_string(),
                });
            }
            Err(err) => return Err(err),
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use taxonomy_shared::RawObservation;

    fn load_fixture(name: &str) -> String {
        let path = format!("../../../fixtures/html/{name}");
        std::fs::read_to_string(&path).unwrap_or_else(|_| panic!("missing fixture: {path}"))
    }

    fn base() -> Url {
        Url::parse("https://clutch.co").unwrap()
    }

    fn metadata() -> RunMetadata {
        RunMetadata {
            version: "0.1.0".into(),
            source: "https://clutch.co/categories".into(),
            collected_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    fn collect() -> PipelineOptions {
        PipelineOptions::default()
    }

    fn fail_fast() -> PipelineOptions {
        PipelineOptions {
            reject_mode: RejectMode::FailFast,
            ..PipelineOptions::default()
        }
    }

    fn summary(doc: &TaxonomyDocument) -> Vec<(String, Option<String>, String)> {
        doc.items()
            .iter()
            .map(|i| {
                (
                    i.id.to_string(),
                    i.parent_id.as_ref().map(ToString::to_string),
                    i.url.clone(),
                )
            })
            .collect()
    }

    // -----------------------------------------------------------------------
    // Full runs
    // -----------------------------------------------------------------------

    #[test]
    fn directory_sample_end_to_end() {
        let out = run(&load_fixture("directory_sample.html"), &base(), metadata(), &collect()).unwrap();

        let expected: Vec<(&str, Option<&str>, &str)> = vec![
            ("category:advertising-marketing", None, "https://clutch.co/agencies"),
            (
                "subcategory:advertising-marketing:seo",
                Some("category:advertising-marketing"),
                "https://clutch.co/agencies/seo",
            ),
            (
                "subcategory:advertising-marketing:social-media-marketing",
                Some("category:advertising-marketing"),
                "https://clutch.co/agencies/social-media-marketing",
            ),
            (
                "subcategory:advertising-marketing:email-marketing",
                Some("category:advertising-marketing"),
                "https://clutch.co/agencies/email-marketing",
            ),
            (
                "all_in:advertising-marketing:all-in-advertising-marketing",
                Some("category:advertising-marketing"),
                "https://clutch.co/agencies",
            ),
            ("category:development", None, "https://clutch.co/"),
            (
                "subcategory:development:overview",
                Some("category:development"),
                "https://clutch.co/developers/overview",
            ),
            (
                "subcategory:development:mobile-app-development",
                Some("category:development"),
                "https://clutch.co/developers/mobile?page=2",
            ),
            (
                "all_in:development:all-in-development",
                Some("category:development"),
                "https://clutch.co/developers",
            ),
            ("category:design-production", None, "https://clutch.co/"),
            (
                "subcategory:design-production:overview",
                Some("category:design-production"),
                "https://clutch.co/design/overview",
            ),
            (
                "subcategory:design-production:ux-design",
                Some("category:design-production"),
                "https://clutch.co/design/ux",
            ),
            (
                "all_in:design-production:all-in-design",
                Some("category:design-production"),
                "https://clutch.co/design",
            ),
        ];
        let expected: Vec<(String, Option<String>, String)> = expected
            .into_iter()
            .map(|(id, parent, url)| (id.into(), parent.map(String::from), url.into()))
            .collect();

        assert_eq!(summary(&out.document), expected);
        assert!(out.rejected.is_empty());
        assert_eq!(
            out.stats,
            RunStats {
                strategy: "section".into(),
                extracted: 14,
                rejected: 0,
                duplicates_dropped: 1,
                categories: 3,
                subcategories: 7,
                all_in: 3,
            }
        );
    }

    #[test]
    fn runs_are_deterministic() {
        let markup = load_fixture("directory_sample.html");
        let a = run(&markup, &base(), metadata(), &collect()).unwrap();
        let b = run(&markup, &base(), metadata(), &collect()).unwrap();
        assert_eq!(
            serde_json::to_string(&a.document).unwrap(),
            serde_json::to_string(&b.document).unwrap()
        );
    }

    #[test]
    fn overview_under_two_categories_survives() {
        let out = run(&load_fixture("directory_sample.html"), &base(), metadata(), &collect()).unwrap();
        let overviews: Vec<_> = out
            .document
            .items()
            .iter()
            .filter(|i| i.slug == "overview")
            .collect();
        assert_eq!(overviews.len(), 2);
        assert_ne!(overviews[0].id, overviews[1].id);
    }

    #[test]
    fn fallback_strategy_is_reported() {
        let out = run(&load_fixture("list_markup.html"), &base(), metadata(), &collect()).unwrap();
        assert_eq!(out.stats.strategy, "list");
        assert_eq!(out.stats.categories, 2);
        assert_eq!(out.stats.all_in, 1);
    }

    #[test]
    fn no_structure_is_parse_error() {
        let err = run(&load_fixture("no_structure.html"), &base(), metadata(), &collect()).unwrap_err();
        assert!(matches!(err, TaxonomyError::Parse { .. }));
    }

    // -----------------------------------------------------------------------
    // Reject modes
    // -----------------------------------------------------------------------

    #[test]
    fn collect_mode_routes_bad_rows_aside() {
        let out = run(&load_fixture("malformed_items.html"), &base(), metadata(), &collect()).unwrap();

        let names: Vec<&str> = out.document.items().iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["Marketing", "SEO", "PPC"]);

        let rejected: Vec<(usize, RejectReason)> =
            out.rejected.iter().map(|r| (r.index, r.reason)).collect();
        assert_eq!(
            rejected,
            vec![(2, RejectReason::EmptyName), (3, RejectReason::InvalidUrl)]
        );
        assert_eq!(out.rejected[1].observation.raw_href, "javascript:void(0)");
        assert_eq!(out.stats.rejected, 2);
    }

    #[test]
    fn fail_fast_mode_stops_on_first_bad_row() {
        let err = run(&load_fixture("malformed_items.html"), &base(), metadata(), &fail_fast()).unwrap_err();
        assert!(matches!(err, TaxonomyError::EmptyName { .. }));
    }

    #[test]
    fn children_of_rejected_category_are_not_reattached() {
        let extraction = Extraction {
            strategy: "section".into(),
            observations: vec![
                RawObservation::new(EntityKind::Category, "Marketing", "/marketing"),
                RawObservation::new(EntityKind::Subcategory, "SEO", "/marketing/seo"),
                RawObservation::new(EntityKind::Category, "Broken", "mailto:x@clutch.co"),
                RawObservation::new(EntityKind::Subcategory, "Orphaned", "/broken/orphaned"),
                RawObservation::new(EntityKind::AllIn, "All in Broken", "/broken"),
                RawObservation::new(EntityKind::Category, "Design", "/design"),
                RawObservation::new(EntityKind::Subcategory, "UX", "/design/ux"),
            ],
        };
        let out = process(extraction, &base(), metadata(), &collect()).unwrap();

        let ids: Vec<&str> = out.document.items().iter().map(|i| i.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "category:marketing",
                "subcategory:marketing:seo",
                "category:design",
                "subcategory:design:ux",
            ]
        );
        let reasons: Vec<(usize, RejectReason)> =
            out.rejected.iter().map(|r| (r.index, r.reason)).collect();
        assert_eq!(
            reasons,
            vec![
                (2, RejectReason::InvalidUrl),
                (3, RejectReason::ParentRejected),
                (4, RejectReason::ParentRejected),
            ]
        );
    }

    #[test]
    fn orphan_is_fatal_in_both_modes() {
        for options in [collect(), fail_fast()] {
            let extraction = Extraction {
                strategy: "section".into(),
                observations: vec![
                    RawObservation::new(EntityKind::Subcategory, " SEO ", "/seo"),
                    RawObservation::new(EntityKind::Category, "Marketing", "/marketing"),
                ],
            };
            let err = process(extraction, &base(), metadata(), &options).unwrap_err();
            match err {
                TaxonomyError::Orphan { index, kind, name } => {
                    assert_eq!(index, 0);
                    assert_eq!(kind, EntityKind::Subcategory);
                    assert_eq!(name, "SEO");
                }
                other => panic!("unexpected {other:?} in {} mode", options.reject_mode),
            }
        }
    }

    #[test]
    fn malformed_orphan_is_not_collected() {
        for (name, href) in [("SEO", "javascript:void(0)"), ("   ", "/blank")] {
            let extraction = Extraction {
                strategy: "section".into(),
                observations: vec![
                    RawObservation::new(EntityKind::Subcategory, name, href),
                    RawObservation::new(EntityKind::Category, "Marketing", "/marketing"),
                ],
            };
            let err = process(extraction, &base(), metadata(), &collect()).unwrap_err();
            assert!(
                matches!(err, TaxonomyError::Orphan { index: 0, .. }),
                "expected Orphan for {name:?} -> {href:?}, got {err:?}"
            );
        }
    }

    #[test]
    fn empty_metadata_fails_validation() {
        let err = run(
            &load_fixture("list_markup.html"),
            &base(),
            RunMetadata {
                source: "  ".into(),
                ..metadata()
            },
            &collect(),
        )
        .unwrap_err();
        assert_eq!(err.violations().len(), 1);
    }
}
