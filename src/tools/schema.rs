//! Explicit parameter schemas for tools.
//!
//! Each tool declares its parameters as plain `ParamSpec` data. A generic
//! routine validates incoming arguments against the declared specs before a
//! handler ever runs, and the same specs generate the JSON Schema
//! `inputSchema` advertised over MCP.

use rmcp::model::JsonObject;
use serde_json::{Value, json};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    String,
    Integer,
    Number,
    Boolean,
}

impl ParamKind {
    pub fn json_type(self) -> &'static str {
        match self {
            ParamKind::String => "string",
            ParamKind::Integer => "integer",
            ParamKind::Number => "number",
            ParamKind::Boolean => "boolean",
        }
    }

    fn matches(self, value: &Value) -> bool {
        match self {
            ParamKind::String => value.is_string(),
            ParamKind::Integer => value.is_i64() || value.is_u64(),
            ParamKind::Number => value.is_number(),
            ParamKind::Boolean => value.is_boolean(),
        }
    }
}

/// Declaration of one tool parameter.
#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub required: bool,
    pub description: &'static str,
}

impl ParamSpec {
    pub const fn required(name: &'static str, kind: ParamKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            required: true,
            description,
        }
    }

    pub const fn optional(name: &'static str, kind: ParamKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            required: false,
            description,
        }
    }
}

/// Structural validation failure: every offending field, in one error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub missing: Vec<String>,
    pub mismatched: Vec<String>,
}

impl ValidationError {
    fn is_empty(&self) -> bool {
        self.missing.is_empty() && self.mismatched.is_empty()
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid parameters")?;
        if !self.missing.is_empty() {
            write!(f, "; missing required: {}", self.missing.join(", "))?;
        }
        if !self.mismatched.is_empty() {
            write!(f, "; wrong type: {}", self.mismatched.join(", "))?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// Check `args` against `specs`. Purely structural; domain validity (e.g.
/// whether a node exists) is the handler's concern.
pub fn validate(specs: &[ParamSpec], args: &JsonObject) -> Result<(), ValidationError> {
    let mut error = ValidationError {
        missing: Vec::new(),
        mismatched: Vec::new(),
    };

    for spec in specs {
        match args.get(spec.name) {
            None | Some(Value::Null) => {
                if spec.required {
                    error.missing.push(spec.name.to_string());
                }
            }
            Some(value) => {
                if !spec.kind.matches(value) {
                    error.mismatched.push(format!(
                        "{} (expected {})",
                        spec.name,
                        spec.kind.json_type()
                    ));
                }
            }
        }
    }

    if error.is_empty() { Ok(()) } else { Err(error) }
}

/// Build the JSON Schema object advertised as the tool's `inputSchema`.
/// The `required` list follows the declaration order of `specs`.
pub fn input_schema(specs: &[ParamSpec]) -> JsonObject {
    let mut schema = JsonObject::new();
    schema.insert("type".to_string(), json!("object"));

    let mut properties = serde_json::Map::new();
    let mut required = Vec::new();
    for spec in specs {
        properties.insert(
            spec.name.to_string(),
            json!({
                "type": spec.kind.json_type(),
                "description": spec.description,
            }),
        );
        if spec.required {
            required.push(spec.name);
        }
    }

    schema.insert("properties".to_string(), json!(properties));
    schema.insert("required".to_string(), json!(required));
    schema
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPECS: [ParamSpec; 3] = [
        ParamSpec::required("node", ParamKind::String, "Node name"),
        ParamSpec::required("vmid", ParamKind::String, "VM ID"),
        ParamSpec::optional("timeout", ParamKind::Integer, "Timeout in seconds"),
    ];

    fn args(raw: &str) -> JsonObject {
        serde_json::from_str(raw).unwrap()
    }

    #[test]
    fn test_validate_ok() {
        assert!(validate(&SPECS, &args(r#"{"node":"pve1","vmid":"100"}"#)).is_ok());
        assert!(
            validate(&SPECS, &args(r#"{"node":"pve1","vmid":"100","timeout":5}"#)).is_ok()
        );
    }

    #[test]
    fn test_validate_reports_all_missing() {
        let err = validate(&SPECS, &args("{}")).unwrap_err();
        assert_eq!(err.missing, vec!["node", "vmid"]);
        assert!(err.mismatched.is_empty());
    }

    #[test]
    fn test_validate_null_counts_as_missing() {
        let err = validate(&SPECS, &args(r#"{"node":null,"vmid":"100"}"#)).unwrap_err();
        assert_eq!(err.missing, vec!["node"]);
    }

    #[test]
    fn test_validate_wrong_type_no_coercion() {
        // vmid must be a string; a number is not coerced.
        let err = validate(&SPECS, &args(r#"{"node":"pve1","vmid":100}"#)).unwrap_err();
        assert!(err.missing.is_empty());
        assert_eq!(err.mismatched, vec!["vmid (expected string)"]);
    }

    #[test]
    fn test_validate_optional_wrong_type() {
        let err =
            validate(&SPECS, &args(r#"{"node":"pve1","vmid":"100","timeout":"soon"}"#))
                .unwrap_err();
        assert_eq!(err.mismatched, vec!["timeout (expected integer)"]);
    }

    #[test]
    fn test_validate_integer_accepts_unsigned_and_signed() {
        let specs = [ParamSpec::required("n", ParamKind::Integer, "count")];
        assert!(validate(&specs, &args(r#"{"n":3}"#)).is_ok());
        assert!(validate(&specs, &args(r#"{"n":-3}"#)).is_ok());
        assert!(validate(&specs, &args(r#"{"n":3.5}"#)).is_err());
    }

    #[test]
    fn test_error_message_lists_fields() {
        let err = validate(&SPECS, &args(r#"{"vmid":100}"#)).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("missing required: node"));
        assert!(msg.contains("wrong type: vmid (expected string)"));
    }

    #[test]
    fn test_input_schema_shape() {
        let schema = input_schema(&SPECS);
        assert_eq!(schema.get("type").unwrap(), "object");

        let properties = schema.get("properties").unwrap().as_object().unwrap();
        assert_eq!(properties.len(), 3);
        assert_eq!(
            properties.get("timeout").unwrap().get("type").unwrap(),
            "integer"
        );

        let required = schema.get("required").unwrap().as_array().unwrap();
        assert_eq!(required, &[json!("node"), json!("vmid")]);
    }

    #[test]
    fn test_input_schema_empty_specs() {
        let schema = input_schema(&[]);
        assert_eq!(schema.get("type").unwrap(), "object");
        assert!(schema.get("properties").unwrap().as_object().unwrap().is_empty());
        assert!(schema.get("required").unwrap().as_array().unwrap().is_empty());
    }
}
