//! Tool input contracts: declaration, JSON Schema rendering and argument validation.

use super::error::{ToolError, ToolResult};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Number,
    Integer,
    Boolean,
    Array,
    Object,
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ParamType::String => "string",
            ParamType::Number => "number",
            ParamType::Integer => "integer",
            ParamType::Boolean => "boolean",
            ParamType::Array => "array",
            ParamType::Object => "object",
        };
        f.write_str(s)
    }
}

/// One entry of a tool's ordered input schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    pub kind: ParamType,
    pub required: bool,
    pub description: String,
}

impl ParamSpec {
    pub fn required(name: &str, kind: ParamType, description: &str) -> Self {
        Self {
            name: name.to_string(),
            kind,
            required: true,
            description: description.to_string(),
        }
    }

    pub fn optional(name: &str, kind: ParamType, description: &str) -> Self {
        Self {
            required: false,
            ..Self::required(name, kind, description)
        }
    }
}

/// Render an ordered schema as a JSON Schema object
pub fn to_json_schema(params: &[ParamSpec]) -> Value {
    let mut properties = Map::new();
    let mut required = Vec::new();
    for p in params {
        properties.insert(
            p.name.clone(),
            json!({"type": p.kind.to_string(), "description": p.description}),
        );
        if p.required {
            required.push(Value::String(p.name.clone()));
        }
    }
    json!({
        "type": "object",
        "properties": properties,
        "required": required
    })
}

/// Bind positional values (the `["London"]` list form) to schema names in order
pub fn bind_positional(params: &[ParamSpec], values: &[Value]) -> ToolResult<Value> {
    if values.len() > params.len() {
        return Err(ToolError::InvalidArguments(format!(
            "expected at most {} positional arguments, got {}",
            params.len(),
            values.len()
        )));
    }
    let map: Map<String, Value> = params
        .iter()
        .zip(values.iter())
        .map(|(p, v)| (p.name.clone(), v.clone()))
        .collect();
    Ok(Value::Object(map))
}

/// Check arguments against a schema (required fields + types).
///
/// Numeric strings are accepted for `number`/`integer` parameters and coerced,
/// since models frequently quote numbers. Arguments not named by the schema are
/// passed through untouched.
pub fn validate(params: &[ParamSpec], arguments: &Value) -> ToolResult<Value> {
    let mut args = match arguments {
        Value::Object(m) => m.clone(),
        Value::Null => Map::new(),
        Value::Array(values) => match bind_positional(params, values)? {
            Value::Object(m) => m,
            _ => Map::new(),
        },
        other => {
            return Err(ToolError::InvalidArguments(format!(
                "arguments must be an object, got {}",
                type_name(other)
            )))
        }
    };

    for p in params {
        let present = args.get(&p.name).filter(|v| !v.is_null()).cloned();
        match present {
            None if p.required => {
                return Err(ToolError::InvalidArguments(format!(
                    "missing required argument '{}'",
                    p.name
                )))
            }
            None => {
                args.remove(&p.name);
            }
            Some(v) => {
                let coerced = coerce(p, v)?;
                args.insert(p.name.clone(), coerced);
            }
        }
    }

    Ok(Value::Object(args))
}

fn coerce(p: &ParamSpec, v: Value) -> ToolResult<Value> {
    let mismatch = |v: &Value| {
        ToolError::InvalidArguments(format!(
            "argument '{}' must be {}, got {}",
            p.name,
            p.kind,
            type_name(v)
        ))
    };
    match (p.kind, v) {
        (ParamType::String, Value::String(s)) => {
            if p.required && s.trim().is_empty() {
                Err(ToolError::InvalidArguments(format!(
                    "argument '{}' must not be empty",
                    p.name
                )))
            } else {
                Ok(Value::String(s))
            }
        }
        (ParamType::Number, Value::Number(n)) => Ok(Value::Number(n)),
        (ParamType::Number, Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| mismatch(&Value::String(s))),
        (ParamType::Integer, Value::Number(n)) => {
            if n.is_i64() || n.is_u64() {
                Ok(Value::Number(n))
            } else {
                match n.as_f64() {
                    Some(f) if f.fract() == 0.0 => Ok(json!(f as i64)),
                    _ => Err(mismatch(&Value::Number(n))),
                }
            }
        }
        (ParamType::Integer, Value::String(s)) => s
            .trim()
            .parse::<i64>()
            .map(|i| json!(i))
            .map_err(|_| mismatch(&Value::String(s))),
        (ParamType::Boolean, Value::Bool(b)) => Ok(Value::Bool(b)),
        (ParamType::Array, Value::Array(a)) => Ok(Value::Array(a)),
        (ParamType::Object, Value::Object(o)) => Ok(Value::Object(o)),
        (_, other) => Err(mismatch(&other)),
    }
}

fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calc_schema() -> Vec<ParamSpec> {
        vec![
            ParamSpec::required("num1", ParamType::Number, "first operand"),
            ParamSpec::required("num2", ParamType::Number, "second operand"),
            ParamSpec::required("operation", ParamType::String, "operation"),
            ParamSpec::optional("precision", ParamType::Integer, "digits"),
        ]
    }

    #[test]
    fn missing_required_field_is_rejected() {
        let err = validate(&calc_schema(), &json!({"num1": 1, "operation": "add"})).unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(ref m) if m.contains("num2")));
    }

    #[test]
    fn wrong_type_is_rejected() {
        let err = validate(
            &calc_schema(),
            &json!({"num1": true, "num2": 2, "operation": "add"}),
        )
        .unwrap_err();
        assert!(err.to_string().contains("must be number"));
    }

    #[test]
    fn numeric_strings_are_coerced() {
        let args = validate(
            &calc_schema(),
            &json!({"num1": "2.5", "num2": 4, "operation": "add", "precision": "2"}),
        )
        .unwrap();
        assert_eq!(args["num1"], json!(2.5));
        assert_eq!(args["precision"], json!(2));
    }

    #[test]
    fn positional_list_binds_in_schema_order() {
        let args = validate(&calc_schema(), &json!([1, 2, "multiply"])).unwrap();
        assert_eq!(args["num1"], json!(1));
        assert_eq!(args["operation"], json!("multiply"));
    }

    #[test]
    fn too_many_positional_values_are_rejected() {
        let schema = vec![ParamSpec::required("location", ParamType::String, "city")];
        assert!(validate(&schema, &json!(["Paris", "Lyon"])).is_err());
    }

    #[test]
    fn json_schema_lists_required_in_order() {
        let schema = to_json_schema(&calc_schema());
        assert_eq!(schema["required"], json!(["num1", "num2", "operation"]));
        assert_eq!(schema["properties"]["precision"]["type"], "integer");
    }
}
