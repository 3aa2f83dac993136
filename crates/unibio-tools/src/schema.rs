//! Declarative tool schemas
//!
//! A `ToolSchema` is the single description of a tool: it is rendered into
//! the function declaration advertised to the model, and it drives the
//! argument decode step that runs before any handler sees its input.

use serde::Serialize;
use serde_json::{json, Map, Number, Value};
use thiserror::Error;

/// Parameter value types understood by the decoder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    String,
    Number,
    Integer,
    Boolean,
}

impl ParamKind {
    fn json_type(&self) -> &'static str {
        match self {
            ParamKind::String => "string",
            ParamKind::Number => "number",
            ParamKind::Integer => "integer",
            ParamKind::Boolean => "boolean",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub description: &'static str,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl ParamSpec {
    pub fn required(name: &'static str, kind: ParamKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            description,
            required: true,
            default: None,
        }
    }

    pub fn optional(
        name: &'static str,
        kind: ParamKind,
        description: &'static str,
        default: Value,
    ) -> Self {
        Self {
            name,
            kind,
            description,
            required: false,
            default: Some(default),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ArgumentError {
    #[error("missing required parameter '{0}'")]
    Missing(&'static str),

    #[error("parameter '{name}' must be {expected}, got {found}")]
    WrongType {
        name: &'static str,
        expected: &'static str,
        found: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub params: Vec<ParamSpec>,
}

impl ToolSchema {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            params: Vec::new(),
        }
    }

    pub fn param(mut self, spec: ParamSpec) -> Self {
        self.params.push(spec);
        self
    }

    /// JSON-schema object used as the function declaration's `parameters`.
    ///
    /// Defaults go into the description text; the model API rejects a
    /// `default` keyword.
    pub fn parameters_json(&self) -> Value {
        let mut properties = Map::new();
        for spec in &self.params {
            let description = match &spec.default {
                Some(default) => format!("{} (default: {})", spec.description, default),
                None => spec.description.to_string(),
            };
            properties.insert(
                spec.name.to_string(),
                json!({ "type": spec.kind.json_type(), "description": description }),
            );
        }
        let required: Vec<&str> = self
            .params
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name)
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// Validate and normalize raw call arguments.
    ///
    /// - required parameters must be present and non-null
    /// - optional parameters fall back to their default
    /// - integers accept whole floats (`5.0` becomes `5`) and numeric strings
    /// - numbers accept numeric strings
    /// - strings accept numbers (identifiers such as PMIDs often arrive numeric)
    /// - unknown parameters are dropped
    pub fn decode(&self, args: &Map<String, Value>) -> Result<Map<String, Value>, ArgumentError> {
        let mut decoded = Map::new();
        for spec in &self.params {
            let value = match args.get(spec.name) {
                Some(Value::Null) | None => match (&spec.default, spec.required) {
                    (_, true) => return Err(ArgumentError::Missing(spec.name)),
                    (Some(default), false) => default.clone(),
                    (None, false) => continue,
                },
                Some(value) => coerce(spec, value)?,
            };
            decoded.insert(spec.name.to_string(), value);
        }
        Ok(decoded)
    }
}

fn describe(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(_) => "a boolean".to_string(),
        Value::Number(n) => format!("the number {}", n),
        Value::String(s) => format!("the string {:?}", s),
        Value::Array(_) => "an array".to_string(),
        Value::Object(_) => "an object".to_string(),
    }
}

fn coerce(spec: &ParamSpec, value: &Value) -> Result<Value, ArgumentError> {
    let wrong = |expected| ArgumentError::WrongType {
        name: spec.name,
        expected,
        found: describe(value),
    };

    match spec.kind {
        ParamKind::String => match value {
            Value::String(_) => Ok(value.clone()),
            Value::Number(n) => Ok(Value::String(integral(n).map_or_else(|| n.to_string(), |i| i.to_string()))),
            _ => Err(wrong("a string")),
        },
        ParamKind::Number => match value {
            Value::Number(_) => Ok(value.clone()),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number)
                .ok_or_else(|| wrong("a number")),
            _ => Err(wrong("a number")),
        },
        ParamKind::Integer => {
            let parsed = match value {
                Value::Number(n) => integral(n),
                Value::String(s) => s.trim().parse::<f64>().ok().and_then(whole),
                _ => None,
            };
            parsed.map(Value::from).ok_or_else(|| wrong("an integer"))
        }
        ParamKind::Boolean => match value {
            Value::Bool(_) => Ok(value.clone()),
            Value::String(s) => match s.trim().to_lowercase().as_str() {
                "true" => Ok(Value::Bool(true)),
                "false" => Ok(Value::Bool(false)),
                _ => Err(wrong("a boolean")),
            },
            _ => Err(wrong("a boolean")),
        },
    }
}

fn integral(n: &Number) -> Option<i64> {
    n.as_i64().or_else(|| n.as_f64().and_then(whole))
}

fn whole(f: f64) -> Option<i64> {
    (f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64).then_some(f as i64)
}
