//! Lenient conversion of Prowlarr releases into [`SearchResult`]s.
//!
//! Indexers disagree on types and omit fields freely, so every numeric field
//! accepts numbers, numeric strings or nothing, and a release that still
//! cannot be used is skipped on its own.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::debug;

use super::SearchResult;
use crate::download::{magnet_info_hash, normalize_info_hash};
use crate::indexer::{IndexerConfig, IndexerKind};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProwlarrRelease {
    title: Option<String>,
    #[serde(default, deserialize_with = "lenient_u64")]
    size: u64,
    #[serde(default, deserialize_with = "lenient_u64")]
    seeders: u64,
    #[serde(default, deserialize_with = "lenient_u64")]
    leechers: u64,
    magnet_url: Option<String>,
    download_url: Option<String>,
    guid: Option<String>,
    info_hash: Option<String>,
    info_url: Option<String>,
    #[serde(default, deserialize_with = "lenient_flags")]
    indexer_flags: Vec<Value>,
    #[serde(default, deserialize_with = "lenient_f64")]
    download_volume_factor: Option<f64>,
    publish_date: Option<String>,
}

fn lenient_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f > 0.0).map(|f| f as u64))
            .unwrap_or(0),
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|f| *f > 0.0)
            .map(|f| f as u64)
            .unwrap_or(0),
        _ => 0,
    })
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Null means no flags; a lone flag is treated as a one-element list.
fn lenient_flags<'de, D>(deserializer: D) -> Result<Vec<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Array(flags)) => flags,
        None => Vec::new(),
        Some(flag) => vec![flag],
    })
}

/// Names for Prowlarr's numeric flag bits.
const FLAG_BITS: [(u64, &str); 8] = [
    (1, "freeleech"),
    (2, "halfleech"),
    (4, "doubleupload"),
    (32, "internal"),
    (64, "internal"),
    (128, "scene"),
    (256, "freeleech75"),
    (512, "freeleech25"),
];

fn normalize_flags(raw: &[Value]) -> Vec<String> {
    let mut flags: Vec<String> = Vec::new();
    let mut push = |flag: String| {
        if !flag.is_empty() && !flags.contains(&flag) {
            flags.push(flag);
        }
    };

    for value in raw {
        match value {
            Value::String(s) => push(s.trim().to_lowercase()),
            Value::Number(n) => {
                if let Some(bits) = n.as_u64() {
                    for (bit, name) in FLAG_BITS {
                        if bits & bit != 0 {
                            push(name.to_string());
                        }
                    }
                }
            }
            Value::Object(obj) => {
                if let Some(Value::String(name)) = obj.get("name") {
                    push(name.trim().to_lowercase());
                }
            }
            _ => {}
        }
    }

    flags
}

fn parse_date(date_str: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(date_str)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|| {
            chrono::NaiveDateTime::parse_from_str(date_str, "%Y-%m-%dT%H:%M:%S")
                .ok()
                .map(|ndt| ndt.and_utc())
        })
}

fn clamp_u32(value: u64) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

/// Convert one raw release. Returns `None` for releases that cannot be used.
pub(crate) fn normalize_release(raw: Value, indexer: &IndexerConfig) -> Option<SearchResult> {
    let release: ProwlarrRelease = match serde_json::from_value(raw) {
        Ok(release) => release,
        Err(e) => {
            debug!(indexer = indexer.name(), error = %e, "Skipping unparsable release");
            return None;
        }
    };

    let title = release.title.map(|t| t.trim().to_string()).unwrap_or_default();
    if title.is_empty() {
        debug!(indexer = indexer.name(), "Skipping release without title");
        return None;
    }

    let magnet = [release.magnet_url.as_ref(), release.guid.as_ref()]
        .into_iter()
        .flatten()
        .find(|link| link.starts_with("magnet:"))
        .cloned();
    let download_link = match magnet.or(release.download_url.filter(|u| !u.is_empty())) {
        Some(link) => link,
        None => {
            debug!(indexer = indexer.name(), title = %title, "Skipping release without link");
            return None;
        }
    };

    let info_hash = release
        .info_hash
        .as_deref()
        .and_then(normalize_info_hash)
        .or_else(|| magnet_info_hash(&download_link).ok());

    let flags = normalize_flags(&release.indexer_flags);
    let vip_counts = indexer.kind == IndexerKind::MyAnonamouse
        && indexer.bool_value("vip_as_freeleech")
        && flags.iter().any(|f| f == "vip");
    let freeleech = flags.iter().any(|f| f == "freeleech")
        || release.download_volume_factor == Some(0.0)
        || vip_counts;

    Some(SearchResult {
        title,
        size_bytes: release.size,
        seeders: clamp_u32(release.seeders),
        leechers: clamp_u32(release.leechers),
        freeleech,
        flags,
        download_link,
        info_hash,
        indexer: indexer.name().to_string(),
        publish_date: release.publish_date.as_deref().and_then(parse_date),
        info_url: release.info_url,
    })
}

/// Apply the per-indexer result filters.
pub(crate) fn passes_indexer_filters(result: &SearchResult, indexer: &IndexerConfig) -> bool {
    match indexer.kind {
        IndexerKind::MyAnonamouse => !indexer.bool_value("freeleech_only") || result.freeleech,
        IndexerKind::AudioBookBay => !indexer.bool_value("magnet_only") || result.is_magnet(),
        IndexerKind::Torznab => {
            let minimum = indexer.int_value("minimum_seeders").unwrap_or(0).max(0);
            i64::from(result.seeders) >= minimum
        }
    }
}
