use crate::constants::limits::DEFAULT_LIMIT;
use crate::errors::ToolError;
use crate::services::appstore_client::QueryParams;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Argument checks and JSON-API projection builders shared by every manager.
#[derive(Clone)]
pub struct Validation;

impl Validation {
    pub fn new() -> Self {
        Self
    }

    /// Names of `fields` that are absent or falsy in `args`, in declared order.
    pub fn missing_required(&self, args: &Value, fields: &[&str]) -> Vec<String> {
        fields
            .iter()
            .filter(|field| is_falsy(args.get(**field)))
            .map(|field| field.to_string())
            .collect()
    }

    /// Fails when any required field is missing, `null`, `false`, `0` or `""`.
    /// Every offending field is listed, not only the first.
    pub fn validate_required(&self, args: &Value, fields: &[&str]) -> Result<(), ToolError> {
        let missing = self.missing_required(args, fields);
        if missing.is_empty() {
            return Ok(());
        }
        Err(ToolError::missing_parameter(format!(
            "Missing required parameters: {}",
            missing.join(", ")
        ))
        .with_details(serde_json::json!({ "missing": missing })))
    }

    pub fn validate_enum(
        &self,
        value: Option<&str>,
        allowed: &[&str],
        field: &str,
    ) -> Result<Option<String>, ToolError> {
        let Some(value) = value.filter(|v| !v.is_empty()) else {
            return Ok(None);
        };
        if allowed.contains(&value) {
            return Ok(Some(value.to_string()));
        }
        Err(ToolError::invalid_parameter(format!(
            "Invalid {}: {}. Valid values are: {}",
            field,
            value,
            allowed.join(", ")
        )))
    }

    /// Clamps a caller-supplied page size into `[1, max]`. Absent or blank
    /// input yields the default of 100; non-numeric input is rejected.
    pub fn sanitize_limit(&self, limit: Option<&Value>, max: u32) -> Result<u32, ToolError> {
        let numeric = match limit {
            None | Some(Value::Null) | Some(Value::Bool(false)) => return Ok(DEFAULT_LIMIT),
            Some(Value::String(text)) if text.trim().is_empty() => return Ok(DEFAULT_LIMIT),
            Some(Value::Number(n)) => n.as_f64(),
            Some(Value::String(text)) => text.trim().parse::<f64>().ok(),
            Some(_) => None,
        };
        let numeric = numeric.filter(|n| !n.is_nan()).ok_or_else(|| {
            ToolError::invalid_parameter(format!(
                "Invalid limit: {}. Expected a number between 1 and {}",
                limit.map(render_scalar).unwrap_or_default(),
                max
            ))
        })?;
        let clamped = numeric.floor().max(1.0).min(max as f64);
        Ok(clamped as u32)
    }

    /// `{platform: "IOS", roles: ["A", "B"]}` → `filter[platform]=IOS`,
    /// `filter[roles]=A,B`. Null values produce no key.
    pub fn build_filter_params(&self, filter: Option<&Value>) -> QueryParams {
        let mut params = QueryParams::new();
        let Some(obj) = filter.and_then(|v| v.as_object()) else {
            return params;
        };
        for (key, value) in obj {
            if value.is_null() {
                continue;
            }
            let rendered = match value.as_array() {
                Some(items) => join_values(items),
                None => render_scalar(value),
            };
            params.insert(format!("filter[{}]", key), rendered);
        }
        params
    }

    /// Emits `fields[type]` only for non-empty arrays.
    pub fn build_field_params(&self, fields: Option<&Value>) -> QueryParams {
        let mut params = QueryParams::new();
        let Some(obj) = fields.and_then(|v| v.as_object()) else {
            return params;
        };
        for (key, value) in obj {
            if let Some(items) = value.as_array().filter(|items| !items.is_empty()) {
                params.insert(format!("fields[{}]", key), join_values(items));
            }
        }
        params
    }

    pub fn build_include_param(&self, include: Option<&Value>) -> Option<String> {
        include
            .and_then(|v| v.as_array())
            .filter(|items| !items.is_empty())
            .map(|items| join_values(items))
    }

    /// Deserializes a tool's argument bag into its typed request struct.
    pub fn parse_args<T: DeserializeOwned>(&self, tool: &str, args: &Value) -> Result<T, ToolError> {
        let source = if args.is_null() {
            Value::Object(Default::default())
        } else {
            args.clone()
        };
        serde_json::from_value(source).map_err(|err| {
            ToolError::invalid_parameter(format!("Invalid arguments for {}: {}", tool, err))
        })
    }
}

impl Default for Validation {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn is_falsy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::Bool(flag)) => !flag,
        Some(Value::Number(n)) => n.as_f64().map(|f| f == 0.0).unwrap_or(false),
        Some(Value::String(text)) => text.is_empty(),
        Some(_) => false,
    }
}

fn render_scalar(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn join_values(items: &[Value]) -> String {
    items.iter().map(render_scalar).collect::<Vec<_>>().join(",")
}
