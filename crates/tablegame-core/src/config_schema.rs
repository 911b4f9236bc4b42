//! Host-editable game settings: field descriptions for the lobby UI and the
//! validation applied before settings are stored on a room.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::game_registry::GameId;
use crate::game_trait::PlayerId;

/// Widget used to edit a setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlType {
    Input,
    Number,
    Select,
    Switch,
    Slider,
    Checkbox,
    Textarea,
    Radio,
}

/// One choice of a `Select` or `Radio` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectOption {
    pub value: Value,
    pub label: String,
}

impl SelectOption {
    pub fn new(value: impl Into<Value>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

/// Acceptance rule checked on save.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ValidationRule {
    /// Inclusive numeric range.
    Range { min: f64, max: f64 },
}

impl ValidationRule {
    fn accepts(&self, value: Option<&Value>) -> bool {
        match self {
            Self::Range { min, max } => value
                .and_then(Value::as_f64)
                .is_some_and(|v| v >= *min && v <= *max),
        }
    }
}

/// A single editable setting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigField {
    pub key: String,
    pub control: ControlType,
    pub label: String,
    pub description: String,
    pub default: Value,
    #[serde(default)]
    pub options: Vec<SelectOption>,
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
    #[serde(default)]
    pub step: Option<f64>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub rule: Option<ValidationRule>,
}

impl ConfigField {
    pub fn new(
        key: &str,
        control: ControlType,
        label: &str,
        description: &str,
        default: impl Into<Value>,
    ) -> Self {
        Self {
            key: key.to_string(),
            control,
            label: label.to_string(),
            description: description.to_string(),
            default: default.into(),
            options: Vec::new(),
            min: None,
            max: None,
            step: None,
            unit: None,
            required: false,
            rule: None,
        }
    }

    pub fn with_options(mut self, options: Vec<SelectOption>) -> Self {
        self.options = options;
        self
    }

    pub fn with_range(mut self, min: f64, max: f64) -> Self {
        self.rule = Some(ValidationRule::Range { min, max });
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

/// All settings of one game, in display order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigSchema {
    pub fields: Vec<ConfigField>,
}

impl ConfigSchema {
    pub fn new(fields: Vec<ConfigField>) -> Self {
        Self { fields }
    }

    pub fn field(&self, key: &str) -> Option<&ConfigField> {
        self.fields.iter().find(|f| f.key == key)
    }

    /// Default value for every field.
    pub fn defaults(&self) -> HashMap<String, Value> {
        self.fields
            .iter()
            .map(|f| (f.key.clone(), f.default.clone()))
            .collect()
    }

    /// Defaults overlaid with the provided values.
    pub fn resolve(&self, settings: &HashMap<String, Value>) -> HashMap<String, Value> {
        let mut resolved = self.defaults();
        for (key, value) in settings {
            resolved.insert(key.clone(), value.clone());
        }
        resolved
    }

    /// Check settings against the schema. Every failure is reported.
    pub fn validate(&self, settings: &HashMap<String, Value>) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        for key in settings.keys() {
            if self.field(key).is_none() {
                errors.push(format!("unknown setting: {key}"));
            }
        }

        for field in &self.fields {
            let value = settings.get(&field.key);
            let type_ok = value.is_none_or(|v| same_json_type(v, &field.default));
            let rule_ok = field.rule.is_none_or(|rule| rule.accepts(value));
            let present_ok = !field.required || value.is_some();
            if !(type_ok && rule_ok && present_ok) {
                tracing::debug!(key = %field.key, ?value, "Setting failed validation");
                errors.push(format!("{} failed validation", field.label));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Numbers must also match the default's integer-ness: a field defaulting to
/// `4` rejects `2.5`.
fn same_json_type(a: &Value, b: &Value) -> bool {
    if let (Value::Number(a), Value::Number(b)) = (a, b) {
        return !is_integer(b) || is_integer(a);
    }
    matches!(
        (a, b),
        (Value::Bool(_), Value::Bool(_))
            | (Value::String(_), Value::String(_))
            | (Value::Array(_), Value::Array(_))
            | (Value::Object(_), Value::Object(_))
            | (Value::Null, Value::Null)
    )
}

fn is_integer(n: &serde_json::Number) -> bool {
    n.is_i64() || n.is_u64()
}

/// The game a room has selected plus its current settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameSettings {
    pub game_id: GameId,
    pub values: HashMap<String, Value>,
    /// Unix epoch milliseconds of the last save, `None` while on defaults.
    pub updated_at: Option<u64>,
    pub updated_by: Option<PlayerId>,
}

impl GameSettings {
    /// Settings at their defaults for `game_id`.
    pub fn defaults_for(game_id: GameId, schema: &ConfigSchema) -> Self {
        Self {
            game_id,
            values: schema.defaults(),
            updated_at: None,
            updated_by: None,
        }
    }
}
