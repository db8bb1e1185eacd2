//! Ranking of search results for a requested book.
//!
//! [`rank`] is a pure function: the same results, config and context always
//! produce the same ordered output, whatever order the results came in.

mod config;
mod matching;

pub use config::{BitrateRange, FlagBonus, QualityRanges, RankingConfig, SizeBand};
pub use matching::{extract_keywords, keyword_ratio, AudioFormat};

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;

use crate::searcher::SearchResult;

/// What the results are ranked against.
#[derive(Debug, Clone, Default)]
pub struct RankContext {
    pub title: String,
    pub authors: Vec<String>,
    pub runtime_minutes: Option<u32>,
    /// Indexer name to priority (lower is preferred).
    pub indexer_priorities: HashMap<String, i64>,
}

impl RankContext {
    fn priority_of(&self, indexer: &str) -> i64 {
        self.indexer_priorities
            .get(indexer)
            .copied()
            .unwrap_or(i64::MAX)
    }
}

/// Contribution of each factor to a score. Penalties are negative.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub seeders: f64,
    pub freeleech: f64,
    pub flags: f64,
    pub title: f64,
    pub author: f64,
    pub mismatch: f64,
    pub size: f64,
}

impl ScoreBreakdown {
    pub fn total(&self) -> f64 {
        self.seeders + self.freeleech + self.flags + self.title + self.author + self.mismatch
            + self.size
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedResult {
    pub result: SearchResult,
    pub score: f64,
    pub breakdown: ScoreBreakdown,
}

/// Score and sort results, best first.
///
/// Ties on score go to more seeders, then to the indexer with the lower
/// priority value, then to title and link so the order is total.
pub fn rank(
    results: Vec<SearchResult>,
    config: &RankingConfig,
    context: &RankContext,
) -> Vec<RankedResult> {
    let title_keywords = extract_keywords(&context.title);
    let author_keywords: Vec<_> = context
        .authors
        .iter()
        .map(|a| extract_keywords(a))
        .filter(|k| !k.is_empty())
        .collect();

    let mut ranked: Vec<RankedResult> = results
        .into_iter()
        .map(|result| {
            let release_keywords = extract_keywords(&result.title);
            let title_ratio = keyword_ratio(&title_keywords, &release_keywords);
            // Any one of the authors matching is enough
            let author_ratio = author_keywords
                .iter()
                .map(|a| keyword_ratio(a, &release_keywords))
                .fold(None, |best: Option<f64>, r| Some(best.map_or(r, |b| b.max(r))))
                .unwrap_or(1.0);

            let breakdown = ScoreBreakdown {
                seeders: seeder_score(result.seeders, config),
                freeleech: if result.freeleech {
                    config.freeleech_bonus
                } else {
                    0.0
                },
                flags: config
                    .flag_bonuses
                    .iter()
                    .filter(|bonus| result.has_flag(&bonus.flag))
                    .map(|bonus| bonus.score)
                    .sum(),
                title: config.title_weight * title_ratio,
                author: config.author_weight * author_ratio,
                mismatch: if title_ratio * 100.0 < f64::from(config.title_exists_ratio)
                    || author_ratio * 100.0 < f64::from(config.name_exists_ratio)
                {
                    -config.mismatch_penalty
                } else {
                    0.0
                },
                size: if size_acceptable(&result, config, context.runtime_minutes) {
                    0.0
                } else {
                    -config.size_penalty
                },
            };

            RankedResult {
                score: breakdown.total(),
                result,
                breakdown,
            }
        })
        .collect();

    ranked.sort_by(|a, b| compare(a, b, context));
    ranked
}

fn compare(a: &RankedResult, b: &RankedResult, context: &RankContext) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| b.result.seeders.cmp(&a.result.seeders))
        .then_with(|| {
            context
                .priority_of(&a.result.indexer)
                .cmp(&context.priority_of(&b.result.indexer))
        })
        .then_with(|| a.result.title.cmp(&b.result.title))
        .then_with(|| a.result.download_link.cmp(&b.result.download_link))
        .then_with(|| a.result.indexer.cmp(&b.result.indexer))
}

fn seeder_score(seeders: u32, config: &RankingConfig) -> f64 {
    if seeders < config.min_seeders {
        return 0.0;
    }
    let ideal = f64::from(config.ideal_seeders.max(1));
    let factor = (1.0 + f64::from(seeders)).ln() / (1.0 + ideal).ln();
    config.seeder_weight * factor.min(1.0)
}

/// Average bitrate in kbit/s for a release of `size_bytes` lasting `minutes`.
pub fn bitrate_kbps(size_bytes: u64, minutes: u32) -> f64 {
    size_bytes as f64 * 8.0 / 1000.0 / (f64::from(minutes) * 60.0)
}

fn size_acceptable(result: &SearchResult, config: &RankingConfig, runtime: Option<u32>) -> bool {
    // Unknown size is not penalized
    if result.size_bytes == 0 {
        return true;
    }
    match runtime.filter(|m| *m > 0) {
        Some(minutes) => {
            let range = match AudioFormat::detect(&result.title) {
                AudioFormat::Flac => &config.quality.flac,
                AudioFormat::M4b => &config.quality.m4b,
                AudioFormat::Mp3 => &config.quality.mp3,
                AudioFormat::OtherAudio => &config.quality.unknown_audio,
                AudioFormat::Unknown => &config.quality.unknown,
            };
            range.contains(bitrate_kbps(result.size_bytes, minutes))
        }
        None => config.size_band.contains(result.size_bytes),
    }
}
