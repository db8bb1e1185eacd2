//! Ranking weights and quality bands.

use serde::{Deserialize, Serialize};

/// Extra score for results carrying an indexer flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlagBonus {
    /// Flag name, compared case-insensitively.
    pub flag: String,
    /// May be negative to penalize a flag.
    pub score: f64,
}

/// Byte range used when the book runtime is unknown.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SizeBand {
    #[serde(default)]
    pub min_bytes: Option<u64>,
    #[serde(default)]
    pub max_bytes: Option<u64>,
}

impl SizeBand {
    pub fn contains(&self, bytes: u64) -> bool {
        self.min_bytes.map_or(true, |min| bytes >= min)
            && self.max_bytes.map_or(true, |max| bytes <= max)
    }
}

/// Acceptable average bitrate in kbit/s.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BitrateRange {
    pub min_kbps: f64,
    pub max_kbps: f64,
}

impl BitrateRange {
    pub const fn new(min_kbps: f64, max_kbps: f64) -> Self {
        Self { min_kbps, max_kbps }
    }

    pub fn contains(&self, kbps: f64) -> bool {
        kbps >= self.min_kbps && kbps <= self.max_kbps
    }
}

/// Bitrate ranges per detected audio format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityRanges {
    pub flac: BitrateRange,
    pub m4b: BitrateRange,
    pub mp3: BitrateRange,
    /// Audio of a format not listed above (aac, ogg, opus...).
    pub unknown_audio: BitrateRange,
    /// No format could be detected from the title.
    pub unknown: BitrateRange,
}

impl Default for QualityRanges {
    fn default() -> Self {
        Self {
            flac: BitrateRange::new(300.0, 2000.0),
            m4b: BitrateRange::new(32.0, 256.0),
            mp3: BitrateRange::new(32.0, 320.0),
            unknown_audio: BitrateRange::new(32.0, 320.0),
            unknown: BitrateRange::new(20.0, 1000.0),
        }
    }
}

impl QualityRanges {
    fn iter(&self) -> [(&'static str, &BitrateRange); 5] {
        [
            ("flac", &self.flac),
            ("m4b", &self.m4b),
            ("mp3", &self.mp3),
            ("unknown_audio", &self.unknown_audio),
            ("unknown", &self.unknown),
        ]
    }
}

/// Weights used by [`rank`](super::rank).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingConfig {
    pub seeder_weight: f64,
    /// Seeder count at which the seeder term saturates.
    pub ideal_seeders: u32,
    /// Below this the seeder term is zero.
    pub min_seeders: u32,
    pub freeleech_bonus: f64,
    pub flag_bonuses: Vec<FlagBonus>,
    pub title_weight: f64,
    pub author_weight: f64,
    /// Percentage of title words that must appear in the release title.
    pub title_exists_ratio: u32,
    /// Percentage of author name words that must appear in the release title.
    pub name_exists_ratio: u32,
    pub mismatch_penalty: f64,
    pub size_penalty: f64,
    pub size_band: SizeBand,
    pub quality: QualityRanges,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            seeder_weight: 1.0,
            ideal_seeders: 50,
            min_seeders: 2,
            freeleech_bonus: 0.5,
            flag_bonuses: Vec::new(),
            title_weight: 1.0,
            author_weight: 0.5,
            title_exists_ratio: 50,
            name_exists_ratio: 75,
            mismatch_penalty: 2.0,
            size_penalty: 1.0,
            size_band: SizeBand::default(),
            quality: QualityRanges::default(),
        }
    }
}

impl RankingConfig {
    /// Check weights and ranges. The error names the offending field.
    pub fn validate(&self) -> Result<(), String> {
        let weights = [
            ("seeder_weight", self.seeder_weight),
            ("freeleech_bonus", self.freeleech_bonus),
            ("title_weight", self.title_weight),
            ("author_weight", self.author_weight),
            ("mismatch_penalty", self.mismatch_penalty),
            ("size_penalty", self.size_penalty),
        ];
        for (name, value) in weights {
            if !value.is_finite() || value < 0.0 {
                return Err(format!("{} must be a non-negative number, got {}", name, value));
            }
        }

        if self.ideal_seeders == 0 {
            return Err("ideal_seeders must be at least 1".to_string());
        }

        for (name, value) in [
            ("title_exists_ratio", self.title_exists_ratio),
            ("name_exists_ratio", self.name_exists_ratio),
        ] {
            if value > 100 {
                return Err(format!("{} is a percentage, got {}", name, value));
            }
        }

        for bonus in &self.flag_bonuses {
            if bonus.flag.trim().is_empty() {
                return Err("flag_bonuses entries need a flag name".to_string());
            }
            if !bonus.score.is_finite() {
                return Err(format!("flag_bonuses score for '{}' must be finite", bonus.flag));
            }
        }

        if let (Some(min), Some(max)) = (self.size_band.min_bytes, self.size_band.max_bytes) {
            if min > max {
                return Err("size_band.min_bytes exceeds size_band.max_bytes".to_string());
            }
        }

        for (name, range) in self.quality.iter() {
            if !range.min_kbps.is_finite()
                || !range.max_kbps.is_finite()
                || range.min_kbps < 0.0
                || range.min_kbps > range.max_kbps
            {
                return Err(format!("quality.{} is not a valid kbps range", name));
            }
        }

        Ok(())
    }
}
