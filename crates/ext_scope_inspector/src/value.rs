//! Debuggee values as seen through an environment.
//!
//! Values arrive from the interpreter (via [`VariableLookup`](crate::environment::VariableLookup))
//! and from clients (the `value` parameter of an `assign` request). Both sides
//! share the JSON shape produced by [`Grip`](crate::grip::Grip), so the decoder
//! here accepts bare JSON primitives as well as typed grip objects.

use serde_json::Value;

use crate::ScopeInspectorError;

/// Reference to a debuggee object. The inspector never looks inside it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectRef {
    /// Interpreter-assigned identity of the object
    pub id: u64,
    /// Class name reported to the client (e.g. "Object", "Window")
    pub class: String,
}

/// A runtime value held by a binding.
#[derive(Debug, Clone, PartialEq)]
pub enum DebuggeeValue {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Object(ObjectRef),
    /// The engine optimized the binding away and cannot materialize it.
    OptimizedOut,
    /// A `let`/`const`/class binding read before its declaration ran.
    Uninitialized,
    /// `arguments` was requested in a frame that never created it.
    MissingArguments,
}

impl DebuggeeValue {
    pub fn is_optimized_out(&self) -> bool {
        matches!(self, DebuggeeValue::OptimizedOut)
    }

    /// True for the sentinel markers that make a variable non-writable.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            DebuggeeValue::OptimizedOut
                | DebuggeeValue::Uninitialized
                | DebuggeeValue::MissingArguments
        )
    }

    /// Decode a JSON value in grip shape.
    ///
    /// Accepted forms:
    /// - JSON `null`, booleans, numbers and strings map directly
    /// - `{"type": "undefined"}`, `{"type": "null"}`
    /// - `{"type": "NaN" | "Infinity" | "-Infinity" | "-0"}`
    /// - `{"type": "null", "optimizedOut": true}` and the `uninitialized` /
    ///   `missingArguments` variants
    /// - `{"type": "object", "id": <u64>, "class": <string>}`
    pub fn from_json(value: &Value) -> Result<Self, ScopeInspectorError> {
        match value {
            Value::Null => Ok(DebuggeeValue::Null),
            Value::Bool(b) => Ok(DebuggeeValue::Bool(*b)),
            Value::Number(n) => n.as_f64().map(DebuggeeValue::Number).ok_or_else(|| {
                ScopeInspectorError::invalid_value(format!("Unrepresentable number: {}", n))
            }),
            Value::String(s) => Ok(DebuggeeValue::String(s.clone())),
            Value::Array(_) => Err(ScopeInspectorError::invalid_value(
                "Arrays must be passed as object references",
            )),
            Value::Object(map) => {
                let kind = map.get("type").and_then(Value::as_str).ok_or_else(|| {
                    ScopeInspectorError::invalid_value("Typed value is missing its \"type\" field")
                })?;
                let flag = |key: &str| map.get(key).and_then(Value::as_bool).unwrap_or(false);

                match kind {
                    "undefined" => Ok(DebuggeeValue::Undefined),
                    "null" if flag("optimizedOut") => Ok(DebuggeeValue::OptimizedOut),
                    "null" if flag("uninitialized") => Ok(DebuggeeValue::Uninitialized),
                    "null" if flag("missingArguments") => Ok(DebuggeeValue::MissingArguments),
                    "null" => Ok(DebuggeeValue::Null),
                    "NaN" => Ok(DebuggeeValue::Number(f64::NAN)),
                    "Infinity" => Ok(DebuggeeValue::Number(f64::INFINITY)),
                    "-Infinity" => Ok(DebuggeeValue::Number(f64::NEG_INFINITY)),
                    "-0" => Ok(DebuggeeValue::Number(-0.0)),
                    "object" => {
                        let id = map.get("id").and_then(Value::as_u64).ok_or_else(|| {
                            ScopeInspectorError::invalid_value(
                                "Object values need a numeric \"id\"",
                            )
                        })?;
                        let class = map
                            .get("class")
                            .and_then(Value::as_str)
                            .unwrap_or("Object")
                            .to_string();
                        Ok(DebuggeeValue::Object(ObjectRef { id, class }))
                    }
                    other => Err(ScopeInspectorError::invalid_value(format!(
                        "Unknown value type: {}",
                        other
                    ))),
                }
            }
        }
    }
}

impl From<bool> for DebuggeeValue {
    fn from(b: bool) -> Self {
        DebuggeeValue::Bool(b)
    }
}

impl From<f64> for DebuggeeValue {
    fn from(n: f64) -> Self {
        DebuggeeValue::Number(n)
    }
}

impl From<&str> for DebuggeeValue {
    fn from(s: &str) -> Self {
        DebuggeeValue::String(s.to_string())
    }
}
