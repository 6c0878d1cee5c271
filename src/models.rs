use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Text form of a YAML-ish scalar: strings as-is, numbers and booleans via
/// their JSON rendering. Null, arrays and objects have none.
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Deserializers that accept whatever scalar the server's YAML produced
/// instead of failing the whole payload.
mod lenient {
    use super::*;

    pub fn text<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        Ok(scalar_text(&Value::deserialize(d)?).unwrap_or_default())
    }

    pub fn opt_text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Ok(scalar_text(&Value::deserialize(d)?))
    }

    pub fn opt_number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        })
    }

    pub fn flag<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::Bool(b) => b,
            Value::String(s) => s.eq_ignore_ascii_case("true"),
            Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
            _ => false,
        })
    }

    pub fn options<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<FieldOption>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::Array(items) => items.iter().filter_map(FieldOption::from_value).collect(),
            _ => Vec::new(),
        })
    }
}

/// A remotely defined script as listed by the catalog endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Script {
    pub name: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub description: String,
    #[serde(
        default,
        deserialize_with = "lenient::opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub version: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub author: Option<String>,
}

/// Metadata block of a script configuration. `name` is the display title.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptMetadata {
    #[serde(default, deserialize_with = "lenient::text")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub description: String,
    #[serde(
        default,
        deserialize_with = "lenient::opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub version: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub author: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptConfig {
    pub metadata: ScriptMetadata,
    #[serde(default)]
    pub form: Vec<FieldDescriptor>,
}

/// Type recorded for a form entry that is not a field object at all.
pub const MALFORMED_FIELD_TYPE: &str = "malformed";

/// One form input as declared by the backend.
///
/// `field_type` is kept as the raw string so unknown or missing types survive
/// deserialization and can be reported by the renderer. Scalars of the wrong
/// type are coerced or dropped rather than rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    #[serde(deserialize_with = "lenient::text")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub label: String,
    #[serde(rename = "type", default, deserialize_with = "lenient::text")]
    pub field_type: String,
    #[serde(default, deserialize_with = "lenient::flag")]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(
        default,
        deserialize_with = "lenient::opt_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub placeholder: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient::opt_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub min: Option<f64>,
    #[serde(
        default,
        deserialize_with = "lenient::opt_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub max: Option<f64>,
    #[serde(
        default,
        deserialize_with = "lenient::options",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub options: Vec<FieldOption>,
}

impl FieldDescriptor {
    /// Decodes one form entry. An entry that is not a usable field object
    /// becomes a placeholder with [`MALFORMED_FIELD_TYPE`], so the rest of
    /// the form still renders.
    pub fn from_entry(position: usize, entry: Value) -> Self {
        let name = entry
            .get("name")
            .and_then(scalar_text)
            .unwrap_or_else(|| format!("field_{}", position + 1));
        serde_json::from_value(entry).unwrap_or_else(|_| FieldDescriptor {
            label: name.clone(),
            name,
            field_type: MALFORMED_FIELD_TYPE.to_string(),
            required: false,
            default: None,
            placeholder: None,
            min: None,
            max: None,
            options: Vec::new(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Number,
    Checkbox,
    Select,
    MultiSelect,
    TextArea,
}

impl FieldKind {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "text" => Some(Self::Text),
            "number" => Some(Self::Number),
            "checkbox" => Some(Self::Checkbox),
            "select" => Some(Self::Select),
            "multiselect" => Some(Self::MultiSelect),
            "textarea" => Some(Self::TextArea),
            _ => None,
        }
    }
}

/// A select option, either a bare scalar or a `{value, label}` pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldOption {
    Literal(String),
    Pair {
        value: String,
        label: Option<String>,
    },
}

impl<'de> Deserialize<'de> for FieldOption {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(d)?;
        FieldOption::from_value(&value)
            .ok_or_else(|| serde::de::Error::custom("expected a scalar or a {value, label} object"))
    }
}

impl FieldOption {
    /// Numeric and boolean values are stringified; entries without a usable
    /// value yield `None`.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(FieldOption::Pair {
                value: map.get("value").and_then(scalar_text)?,
                label: map.get("label").and_then(scalar_text),
            }),
            other => scalar_text(other).map(FieldOption::Literal),
        }
    }

    /// Returns the `(value, label)` pair; a missing label falls back to the value.
    pub fn normalize(&self) -> (String, String) {
        match self {
            FieldOption::Literal(s) => (s.clone(), s.clone()),
            FieldOption::Pair { value, label } => (
                value.clone(),
                label.clone().unwrap_or_else(|| value.clone()),
            ),
        }
    }
}

/// Value submitted for one field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Flag(bool),
    Choices(Vec<String>),
}

/// Request body of the execution endpoint: field name to value.
pub type FormValues = BTreeMap<String, FieldValue>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    #[serde(default)]
    pub result: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<BTreeMap<String, Value>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub scripts_available: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}
