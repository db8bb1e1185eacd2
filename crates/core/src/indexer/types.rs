//! Indexer configuration values.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::catalog::{
    FieldSpec, FieldType, IndexerKind, CATEGORY_FIELD, DEFAULT_CATEGORY, DEFAULT_PRIORITY,
    PRIORITY_FIELD, PROWLARR_ID_FIELD,
};

/// A typed setting value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl SettingValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SettingValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            SettingValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            SettingValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn field_type(&self) -> FieldType {
        match self {
            SettingValue::Bool(_) => FieldType::Bool,
            SettingValue::Int(_) => FieldType::Int,
            SettingValue::Str(_) => FieldType::Str,
        }
    }

    /// Convert a raw JSON value into a value of `field_type`.
    ///
    /// Strings are accepted for every type, numbers and bools are stringified
    /// for `str` fields. Anything that cannot be converted is an error message.
    pub fn coerce(field_type: FieldType, raw: &Value) -> Result<SettingValue, String> {
        match (field_type, raw) {
            (FieldType::Str, Value::String(s)) => Ok(SettingValue::Str(s.clone())),
            (FieldType::Str, Value::Number(n)) => Ok(SettingValue::Str(n.to_string())),
            (FieldType::Str, Value::Bool(b)) => Ok(SettingValue::Str(b.to_string())),
            (FieldType::Int, Value::Number(n)) => n
                .as_i64()
                .map(SettingValue::Int)
                .ok_or_else(|| format!("expected an integer, got {}", n)),
            (FieldType::Int, Value::String(s)) => s
                .trim()
                .parse::<i64>()
                .map(SettingValue::Int)
                .map_err(|_| format!("expected an integer, got \"{}\"", s)),
            (FieldType::Bool, Value::Bool(b)) => Ok(SettingValue::Bool(*b)),
            (FieldType::Bool, Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "on" | "1" => Ok(SettingValue::Bool(true)),
                "false" | "off" | "0" => Ok(SettingValue::Bool(false)),
                _ => Err(format!("expected a boolean, got \"{}\"", s)),
            },
            (FieldType::Bool, Value::Number(n)) => match n.as_i64() {
                Some(0) => Ok(SettingValue::Bool(false)),
                Some(1) => Ok(SettingValue::Bool(true)),
                _ => Err(format!("expected a boolean, got {}", n)),
            },
            (expected, other) => Err(format!(
                "expected {}, got {}",
                expected,
                json_type_name(other)
            )),
        }
    }
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingValue::Bool(b) => write!(f, "{}", b),
            SettingValue::Int(i) => write!(f, "{}", i),
            SettingValue::Str(s) => f.write_str(s),
        }
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Current configuration of one indexer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexerConfig {
    #[serde(rename = "name")]
    pub kind: IndexerKind,
    pub enabled: bool,
    /// Explicitly set values. Unset fields fall back to their defaults.
    pub settings: BTreeMap<String, SettingValue>,
}

impl IndexerConfig {
    /// A disabled indexer with every field at its default.
    pub fn new(kind: IndexerKind) -> Self {
        Self {
            kind,
            enabled: false,
            settings: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    /// Effective value of a field: the explicit setting, else the default.
    pub fn value(&self, key: &str) -> Option<SettingValue> {
        self.settings.get(key).cloned().or_else(|| {
            self.kind
                .definition()
                .field(key)
                .and_then(|f| f.default.clone())
        })
    }

    pub fn bool_value(&self, key: &str) -> bool {
        self.value(key).and_then(|v| v.as_bool()).unwrap_or(false)
    }

    pub fn int_value(&self, key: &str) -> Option<i64> {
        self.value(key).and_then(|v| v.as_int())
    }

    pub fn prowlarr_id(&self) -> Option<i64> {
        self.int_value(PROWLARR_ID_FIELD)
    }

    pub fn priority(&self) -> i64 {
        self.int_value(PRIORITY_FIELD).unwrap_or(DEFAULT_PRIORITY)
    }

    pub fn category(&self) -> i64 {
        self.int_value(CATEGORY_FIELD).unwrap_or(DEFAULT_CATEGORY)
    }

    /// Required fields that have neither a value nor a default.
    pub fn missing_required(&self) -> Vec<&'static str> {
        self.kind
            .definition()
            .fields
            .iter()
            .filter(|f| f.required && self.value(f.name).is_none())
            .map(|f| f.name)
            .collect()
    }
}

/// API view of one field: its declaration plus the current value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfiguredField {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Default rendered as a string, as displayed in settings forms.
    pub default: Option<String>,
    pub required: bool,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub value: Option<SettingValue>,
}

impl ConfiguredField {
    pub fn new(spec: &FieldSpec, value: Option<SettingValue>) -> Self {
        Self {
            name: spec.name.to_string(),
            description: spec.description.map(str::to_string),
            default: spec.default.as_ref().map(|d| d.to_string()),
            required: spec.required,
            field_type: spec.field_type,
            value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_coerce_str() {
        assert_eq!(
            SettingValue::coerce(FieldType::Str, &json!("abc")).unwrap(),
            SettingValue::Str("abc".to_string())
        );
        assert_eq!(
            SettingValue::coerce(FieldType::Str, &json!(42)).unwrap(),
            SettingValue::Str("42".to_string())
        );
        assert!(SettingValue::coerce(FieldType::Str, &json!(["a"])).is_err());
    }

    #[test]
    fn test_coerce_int() {
        assert_eq!(
            SettingValue::coerce(FieldType::Int, &json!(7)).unwrap(),
            SettingValue::Int(7)
        );
        assert_eq!(
            SettingValue::coerce(FieldType::Int, &json!(" 12 ")).unwrap(),
            SettingValue::Int(12)
        );
        assert!(SettingValue::coerce(FieldType::Int, &json!(1.5)).is_err());
        assert!(SettingValue::coerce(FieldType::Int, &json!("twelve")).is_err());
        assert!(SettingValue::coerce(FieldType::Int, &json!(true)).is_err());
    }

    #[test]
    fn test_coerce_bool() {
        assert_eq!(
            SettingValue::coerce(FieldType::Bool, &json!(true)).unwrap(),
            SettingValue::Bool(true)
        );
        assert_eq!(
            SettingValue::coerce(FieldType::Bool, &json!("on")).unwrap(),
            SettingValue::Bool(true)
        );
        assert_eq!(
            SettingValue::coerce(FieldType::Bool, &json!("False")).unwrap(),
            SettingValue::Bool(false)
        );
        assert_eq!(
            SettingValue::coerce(FieldType::Bool, &json!(0)).unwrap(),
            SettingValue::Bool(false)
        );
        assert!(SettingValue::coerce(FieldType::Bool, &json!(2)).is_err());
        assert!(SettingValue::coerce(FieldType::Bool, &json!("maybe")).is_err());
    }

    #[test]
    fn test_untagged_roundtrip_keeps_types() {
        let values = vec![
            SettingValue::Bool(true),
            SettingValue::Int(3),
            SettingValue::Str("x".to_string()),
        ];
        let json = serde_json::to_string(&values).unwrap();
        assert_eq!(json, r#"[true,3,"x"]"#);
        let parsed: Vec<SettingValue> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, values);
    }

    #[test]
    fn test_value_falls_back_to_default() {
        let mut config = IndexerConfig::new(IndexerKind::MyAnonamouse);
        assert_eq!(config.priority(), DEFAULT_PRIORITY);
        assert!(config.bool_value("vip_as_freeleech"));
        assert_eq!(config.prowlarr_id(), None);

        config
            .settings
            .insert(PRIORITY_FIELD.to_string(), SettingValue::Int(5));
        assert_eq!(config.priority(), 5);
    }

    #[test]
    fn test_missing_required() {
        let mut config = IndexerConfig::new(IndexerKind::Torznab);
        assert_eq!(config.missing_required(), vec![PROWLARR_ID_FIELD]);

        config
            .settings
            .insert(PROWLARR_ID_FIELD.to_string(), SettingValue::Int(9));
        assert!(config.missing_required().is_empty());
    }

    #[test]
    fn test_configured_field_stringifies_default() {
        let spec = IndexerKind::Torznab
            .definition()
            .field(PRIORITY_FIELD)
            .unwrap();
        let field = ConfiguredField::new(spec, Some(SettingValue::Int(3)));
        let json = serde_json::to_value(&field).unwrap();
        assert_eq!(json["default"], json!("25"));
        assert_eq!(json["type"], json!("int"));
        assert_eq!(json["value"], json!(3));
        assert_eq!(json["required"], json!(false));
    }
}
