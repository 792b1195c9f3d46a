//! Filename heuristics used when the parser could not make sense of a title.

use once_cell::sync::Lazy;
use regex_lite::Regex;

/// `S01E02`, `s1.e2`, `S01-E02`
static SXXEYY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:^|[^a-z0-9])s(\d{1,2})[ ._-]?e(\d{1,3})(?:[^0-9]|$)").unwrap()
});

/// `1x02`, `01x02`
static NXNN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:^|[^a-z0-9])(\d{1,2})x(\d{2,3})(?:[^a-z0-9]|$)").unwrap());

/// `S2 - 05`, the release-group form of an episode
static DASHED_EPISODE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:^|[^a-z0-9])s(\d{1,2})[ ._]+-[ ._]+(\d{2,3})(?:[^0-9]|$)").unwrap()
});

/// `S01` on its own (season pack)
static SEASON_ONLY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:^|[^a-z0-9])s(\d{1,2})(?:[^a-z0-9]|$)").unwrap());

/// `Season 1`, `Saison 01`
static VERBOSE_SEASON_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:^|[^a-z])(?:season|saison)[ ._-]?(\d{1,2})(?:[^0-9]|$)").unwrap());

/// `Episode 3`, `Épisode 3`
static VERBOSE_EPISODE_RE: Lazy<Regex> =
    Lazy::new(|| {
        Regex::new(r"(?i)(?:^|[^a-z])(?:episode|épisode|ep)[ ._-]?(\d{1,3})(?:[^0-9]|$)").unwrap()
    });

/// `S01-S05`, `Seasons 1-5`. The second bound of the short form needs its own
/// `S` so that `S2 - 05` stays an episode.
static SEASON_RANGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(?:^|[^a-z0-9])(?:s\d{1,2}[ ._]?-[ ._]?s\d{1,2}|(?:seasons?|saisons?)[ ._-]?\d{1,2}[ ._]?-[ ._]?\d{1,2})(?:[^0-9]|$)",
    )
    .unwrap()
});

/// Explicit complete-collection markers.
static COMPLETE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(?:^|[^a-z])(complete|completa|integrale|intégrale|collection|all[ ._-]seasons)(?:[^a-z]|$)",
    )
    .unwrap()
});

/// Season/episode tags found in a raw title.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TitleTags {
    pub season: Option<u32>,
    pub episode: Option<u32>,
    /// Multi-season range or a "complete" marker without a single season.
    pub complete: bool,
}

fn capture_u32(caps: &regex_lite::Captures<'_>, idx: usize) -> Option<u32> {
    caps.get(idx).and_then(|m| m.as_str().parse().ok())
}

/// Extract season/episode tags from a title by pattern matching alone.
pub fn scan_title(title: &str) -> TitleTags {
    if SEASON_RANGE_RE.is_match(title) {
        return TitleTags {
            season: None,
            episode: None,
            complete: true,
        };
    }

    if let Some(caps) = SXXEYY_RE
        .captures(title)
        .or_else(|| NXNN_RE.captures(title))
        .or_else(|| DASHED_EPISODE_RE.captures(title))
    {
        return TitleTags {
            season: capture_u32(&caps, 1),
            episode: capture_u32(&caps, 2),
            complete: false,
        };
    }

    let season = SEASON_ONLY_RE
        .captures(title)
        .or_else(|| VERBOSE_SEASON_RE.captures(title))
        .and_then(|caps| capture_u32(&caps, 1));
    let episode = VERBOSE_EPISODE_RE
        .captures(title)
        .and_then(|caps| capture_u32(&caps, 1));

    TitleTags {
        season,
        episode,
        complete: season.is_none() && COMPLETE_RE.is_match(title),
    }
}
