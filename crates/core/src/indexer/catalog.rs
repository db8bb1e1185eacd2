//! Static catalog of supported indexer types and their settings.

use std::fmt;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use super::SettingValue;

/// Reserved field present on every indexer; stored on [`super::IndexerConfig::enabled`].
pub const ENABLED_FIELD: &str = "enabled";
pub const PROWLARR_ID_FIELD: &str = "prowlarr_indexer_id";
pub const PRIORITY_FIELD: &str = "priority";
pub const CATEGORY_FIELD: &str = "category";

pub const DEFAULT_PRIORITY: i64 = 25;
/// Newznab "Audio/Audiobook" category.
pub const DEFAULT_CATEGORY: i64 = 3030;

/// Supported indexer types. The variant name is the public, case-sensitive
/// indexer name used in the API and the settings file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum IndexerKind {
    MyAnonamouse,
    AudioBookBay,
    Torznab,
}

impl IndexerKind {
    pub const ALL: [IndexerKind; 3] = [
        IndexerKind::MyAnonamouse,
        IndexerKind::AudioBookBay,
        IndexerKind::Torznab,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            IndexerKind::MyAnonamouse => "MyAnonamouse",
            IndexerKind::AudioBookBay => "AudioBookBay",
            IndexerKind::Torznab => "Torznab",
        }
    }

    /// Exact, case-sensitive lookup.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    pub fn definition(&self) -> &'static IndexerDefinition {
        &DEFINITIONS[*self as usize]
    }
}

impl fmt::Display for IndexerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Value type of a setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldType {
    #[serde(rename = "str")]
    Str,
    #[serde(rename = "bool")]
    Bool,
    #[serde(rename = "int")]
    Int,
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FieldType::Str => "str",
            FieldType::Bool => "bool",
            FieldType::Int => "int",
        })
    }
}

/// Declaration of one configurable setting.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub name: &'static str,
    pub description: Option<&'static str>,
    pub default: Option<SettingValue>,
    pub required: bool,
    pub field_type: FieldType,
}

/// Everything known about an indexer type.
#[derive(Debug, Clone)]
pub struct IndexerDefinition {
    pub kind: IndexerKind,
    pub description: &'static str,
    /// Always starts with the `enabled` field.
    pub fields: Vec<FieldSpec>,
}

impl IndexerDefinition {
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }
}

static DEFINITIONS: Lazy<Vec<IndexerDefinition>> = Lazy::new(|| {
    // Order must follow the enum discriminants.
    IndexerKind::ALL
        .into_iter()
        .map(|kind| IndexerDefinition {
            kind,
            description: describe(kind),
            fields: common_fields()
                .into_iter()
                .chain(specific_fields(kind))
                .collect(),
        })
        .collect()
});

fn describe(kind: IndexerKind) -> &'static str {
    match kind {
        IndexerKind::MyAnonamouse => "Private tracker with a large audiobook catalog",
        IndexerKind::AudioBookBay => "Public audiobook tracker distributing magnet links",
        IndexerKind::Torznab => "Any other Torznab indexer proxied through Prowlarr",
    }
}

fn common_fields() -> Vec<FieldSpec> {
    vec![
        FieldSpec {
            name: ENABLED_FIELD,
            description: Some("Include this indexer in searches"),
            default: Some(SettingValue::Bool(false)),
            required: false,
            field_type: FieldType::Bool,
        },
        FieldSpec {
            name: PROWLARR_ID_FIELD,
            description: Some("Indexer id in Prowlarr"),
            default: None,
            required: true,
            field_type: FieldType::Int,
        },
        FieldSpec {
            name: PRIORITY_FIELD,
            description: Some("Tie-breaker between equally ranked results, lower wins"),
            default: Some(SettingValue::Int(DEFAULT_PRIORITY)),
            required: false,
            field_type: FieldType::Int,
        },
        FieldSpec {
            name: CATEGORY_FIELD,
            description: Some("Newznab category searched on this indexer"),
            default: Some(SettingValue::Int(DEFAULT_CATEGORY)),
            required: false,
            field_type: FieldType::Int,
        },
    ]
}

fn specific_fields(kind: IndexerKind) -> Vec<FieldSpec> {
    match kind {
        IndexerKind::MyAnonamouse => vec![
            FieldSpec {
                name: "freeleech_only",
                description: Some("Drop results that are not freeleech"),
                default: Some(SettingValue::Bool(false)),
                required: false,
                field_type: FieldType::Bool,
            },
            FieldSpec {
                name: "vip_as_freeleech",
                description: Some("Treat VIP torrents as freeleech"),
                default: Some(SettingValue::Bool(true)),
                required: false,
                field_type: FieldType::Bool,
            },
        ],
        IndexerKind::AudioBookBay => vec![FieldSpec {
            name: "magnet_only",
            description: Some("Drop results without a magnet link"),
            default: Some(SettingValue::Bool(true)),
            required: false,
            field_type: FieldType::Bool,
        }],
        IndexerKind::Torznab => vec![FieldSpec {
            name: "minimum_seeders",
            description: Some("Drop results with fewer seeders"),
            default: Some(SettingValue::Int(0)),
            required: false,
            field_type: FieldType::Int,
        }],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name_is_case_sensitive() {
        assert_eq!(
            IndexerKind::from_name("MyAnonamouse"),
            Some(IndexerKind::MyAnonamouse)
        );
        assert_eq!(IndexerKind::from_name("myanonamouse"), None);
        assert_eq!(IndexerKind::from_name("Unknown"), None);
    }

    #[test]
    fn test_definitions_follow_enum_order() {
        for kind in IndexerKind::ALL {
            assert_eq!(kind.definition().kind, kind);
        }
    }

    #[test]
    fn test_every_definition_starts_with_enabled() {
        for kind in IndexerKind::ALL {
            let first = &kind.definition().fields[0];
            assert_eq!(first.name, ENABLED_FIELD);
            assert_eq!(first.field_type, FieldType::Bool);
        }
    }

    #[test]
    fn test_field_names_are_unique() {
        for kind in IndexerKind::ALL {
            let fields = &kind.definition().fields;
            let mut names: Vec<_> = fields.iter().map(|f| f.name).collect();
            names.sort_unstable();
            names.dedup();
            assert_eq!(names.len(), fields.len(), "duplicate field in {}", kind);
        }
    }

    #[test]
    fn test_specific_fields() {
        let mam = IndexerKind::MyAnonamouse.definition();
        assert!(mam.field("vip_as_freeleech").is_some());
        assert!(mam.field("magnet_only").is_none());

        let torznab = IndexerKind::Torznab.definition();
        let min_seeders = torznab.field("minimum_seeders").unwrap();
        assert_eq!(min_seeders.field_type, FieldType::Int);
        assert_eq!(min_seeders.default, Some(SettingValue::Int(0)));
    }

    #[test]
    fn test_field_type_serialization() {
        assert_eq!(serde_json::to_string(&FieldType::Str).unwrap(), "\"str\"");
        assert_eq!(serde_json::to_string(&FieldType::Int).unwrap(), "\"int\"");
    }
}
