//! Candidate classification and ordering.
//!
//! Every candidate lands in exactly one of the four buckets. The parser's
//! output drives the decision when available; otherwise the raw title is
//! scanned for season/episode tokens. Within a bucket candidates are ordered
//! by descending parser confidence, keeping provider order on ties.

mod heuristics;

pub use heuristics::{scan_title, TitleTags};

use std::sync::Arc;

use tracing::trace;

use crate::parser::{ParsedInfo, TitleParser};
use crate::provider::{Bucket, CandidateTorrent, CategoryBuckets, ContentType, SearchQuery};

/// Buckets candidates using a pluggable title parser.
#[derive(Clone)]
pub struct Classifier {
    parser: Arc<dyn TitleParser>,
}

impl std::fmt::Debug for Classifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Classifier").finish_non_exhaustive()
    }
}

impl Classifier {
    pub fn new(parser: Arc<dyn TitleParser>) -> Self {
        Self { parser }
    }

    /// Parse every candidate, attach its parse result and confidence, and
    /// bucket it for `query`. Buckets keep provider order.
    pub fn classify(
        &self,
        candidates: Vec<CandidateTorrent>,
        query: &SearchQuery,
    ) -> CategoryBuckets {
        let mut buckets = CategoryBuckets::default();
        for mut candidate in candidates {
            candidate.parsed = self.parser.parse(&candidate.title);
            candidate.confidence = candidate.parsed.as_ref().map_or(0.0, |p| p.score);
            let bucket = bucket_for(&candidate, query);
            trace!(title = %candidate.title, ?bucket, "Classified candidate");
            buckets.push(bucket, candidate);
        }
        buckets
    }
}

/// Season/episode view of a candidate, from the parser or the heuristics.
fn tags_for(candidate: &CandidateTorrent) -> TitleTags {
    match &candidate.parsed {
        Some(parsed) => tags_from_parsed(parsed),
        None => scan_title(&candidate.title),
    }
}

fn tags_from_parsed(parsed: &ParsedInfo) -> TitleTags {
    TitleTags {
        season: parsed.season,
        episode: parsed.episode,
        complete: parsed.is_complete_bundle,
    }
}

/// Decide the bucket of one candidate.
///
/// Ambiguous series candidates default to [`Bucket::Episode`]; a garbled
/// season pack can therefore end up there.
pub fn bucket_for(candidate: &CandidateTorrent, query: &SearchQuery) -> Bucket {
    if query.content_type == ContentType::Movie {
        return Bucket::Movie;
    }

    let tags = tags_for(candidate);

    if tags.complete {
        return Bucket::CompleteSeries;
    }

    if let Some((season, episode)) = query.wanted_episode() {
        if tags.season == Some(season) && tags.episode == Some(episode) {
            return Bucket::Episode;
        }
    }

    if let Some(season) = query.season {
        if tags.season == Some(season) && tags.episode.is_none() {
            return Bucket::CompleteSeason;
        }
    }

    if tags.season.is_none() && tags.episode.is_none() {
        return Bucket::CompleteSeries;
    }

    Bucket::Episode
}

/// Stable sort by descending confidence.
pub fn sort_by_confidence(mut candidates: Vec<CandidateTorrent>) -> Vec<CandidateTorrent> {
    candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    candidates
}

/// Keep candidates whose confidence is at least `threshold`.
pub fn filter_by_min_confidence(
    candidates: Vec<CandidateTorrent>,
    threshold: f64,
) -> Vec<CandidateTorrent> {
    candidates
        .into_iter()
        .filter(|c| c.confidence >= threshold)
        .collect()
}

/// Filter then sort every bucket.
///
/// A non-positive `min_confidence` keeps everything, unparsed candidates included.
pub fn rank_buckets(buckets: CategoryBuckets, min_confidence: f64) -> CategoryBuckets {
    buckets.map_buckets(|items| {
        let items = if min_confidence > 0.0 {
            filter_by_min_confidence(items, min_confidence)
        } else {
            items
        };
        sort_by_confidence(items)
    })
}
