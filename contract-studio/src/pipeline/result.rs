//! Pipeline result shapes
//!
//! The agent pipeline hands back a loosely typed value: usually a contract
//! object, sometimes a plain mapping, occasionally something else entirely.
//! Backends convert whatever they receive into [`RawResult`] once, and
//! [`RawResult::into_contract`] decides whether it is a usable contract.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Result value exactly as the pipeline produced it
#[derive(Debug, Clone, PartialEq)]
pub enum RawResult {
    /// An object exposing contract attributes
    Object {
        type_name: String,
        fields: ResultFields,
    },
    /// A key/value mapping. Mappings carry no attributes, so they are never a valid contract.
    Mapping { type_name: String, keys: Vec<String> },
    /// Anything else (strings, lists, nothing at all)
    Other { type_name: String },
}

/// Attributes read from an object-like result.
///
/// `None` means the attribute was absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultFields {
    pub contract_code: Option<String>,
    pub clauses: Vec<RawClause>,
    pub is_compilable: Option<bool>,
    pub is_deployable: Option<bool>,
    pub compiler_errors: Option<String>,
    pub deploy_errors: Option<String>,
}

/// A single clause, which may itself be object-like or a mapping
#[derive(Debug, Clone, PartialEq)]
pub enum RawClause {
    Object {
        title: Option<String>,
        description: Option<String>,
    },
    Mapping(Map<String, Value>),
}

/// A clause ready for display
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Clause {
    pub title: Option<String>,
    pub description: Option<String>,
}

/// A generated contract together with its validation status
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContractResult {
    pub contract_code: String,
    pub clauses: Vec<Clause>,
    pub is_compilable: bool,
    pub is_deployable: bool,
    pub compiler_errors: String,
    pub deploy_errors: String,
}

/// The pipeline returned something without a contract-code attribute
#[derive(Error, Debug, Clone, PartialEq)]
#[error("No valid contract returned. Result type: {type_name}")]
pub struct ResultShapeError {
    pub type_name: String,
    /// Keys of the returned value, when it was a mapping
    pub keys: Option<Vec<String>>,
}

impl ResultShapeError {
    /// "Available keys: ['a', 'b']" line for mapping results, keys in the
    /// order the pipeline produced them
    pub fn keys_message(&self) -> Option<String> {
        self.keys.as_ref().map(|keys| {
            let listed: Vec<String> = keys.iter().map(|key| quote_key(key)).collect();
            format!("Available keys: [{}]", listed.join(", "))
        })
    }
}

/// Quote a key the way a Python list repr shows strings
fn quote_key(key: &str) -> String {
    let quote = if key.contains('\'') && !key.contains('"') {
        '"'
    } else {
        '\''
    };

    let mut quoted = String::with_capacity(key.len() + 2);
    quoted.push(quote);
    for c in key.chars() {
        match c {
            '\\' => quoted.push_str("\\\\"),
            '\n' => quoted.push_str("\\n"),
            '\r' => quoted.push_str("\\r"),
            '\t' => quoted.push_str("\\t"),
            c if c == quote => {
                quoted.push('\\');
                quoted.push(c);
            }
            c => quoted.push(c),
        }
    }
    quoted.push(quote);
    quoted
}

impl RawResult {
    /// Name of the value's type as reported by the pipeline
    pub fn type_name(&self) -> &str {
        match self {
            RawResult::Object { type_name, .. }
            | RawResult::Mapping { type_name, .. }
            | RawResult::Other { type_name } => type_name,
        }
    }

    /// Resolve into a displayable contract.
    ///
    /// Missing booleans count as failures and missing error texts as empty.
    pub fn into_contract(self) -> Result<ContractResult, ResultShapeError> {
        match self {
            RawResult::Object { type_name, fields } => {
                let Some(contract_code) = fields.contract_code else {
                    return Err(ResultShapeError {
                        type_name,
                        keys: None,
                    });
                };

                Ok(ContractResult {
                    contract_code,
                    clauses: fields.clauses.into_iter().map(RawClause::resolve).collect(),
                    is_compilable: fields.is_compilable.unwrap_or(false),
                    is_deployable: fields.is_deployable.unwrap_or(false),
                    compiler_errors: fields.compiler_errors.unwrap_or_default(),
                    deploy_errors: fields.deploy_errors.unwrap_or_default(),
                })
            }
            RawResult::Mapping { type_name, keys } => Err(ResultShapeError {
                type_name,
                keys: Some(keys),
            }),
            RawResult::Other { type_name } => Err(ResultShapeError {
                type_name,
                keys: None,
            }),
        }
    }

    /// Interpret a JSON value received from a remote pipeline.
    ///
    /// JSON objects that carry `contract_code` are treated as contract
    /// objects; other objects are mappings.
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::Object(map) if map.contains_key("contract_code") => RawResult::Object {
                type_name: "contract".to_string(),
                fields: ResultFields::from_json_map(map),
            },
            Value::Object(map) => RawResult::Mapping {
                type_name: "object".to_string(),
                keys: map.keys().cloned().collect(),
            },
            other => RawResult::Other {
                type_name: json_type_name(&other),
            },
        }
    }
}

impl ResultFields {
    fn from_json_map(mut map: Map<String, Value>) -> Self {
        let clauses = match map.remove("clauses") {
            Some(Value::Array(items)) => items.into_iter().map(RawClause::from_json).collect(),
            _ => Vec::new(),
        };

        Self {
            contract_code: map.remove("contract_code").map(|v| display_value(&v).unwrap_or_default()),
            clauses,
            is_compilable: map.get("is_compilable").map(is_truthy),
            is_deployable: map.get("is_deployable").map(is_truthy),
            compiler_errors: map.get("compiler_errors").and_then(display_value),
            deploy_errors: map.get("deploy_errors").and_then(display_value),
        }
    }
}

impl RawClause {
    /// Read title and description by attribute or by key, whichever applies
    pub fn resolve(self) -> Clause {
        match self {
            RawClause::Object { title, description } => Clause { title, description },
            RawClause::Mapping(map) => Clause {
                title: map.get("title").and_then(display_value),
                description: map.get("description").and_then(display_value),
            },
        }
    }

    fn from_json(value: Value) -> Self {
        match value {
            Value::Object(map) => RawClause::Mapping(map),
            // a bare value has neither a title nor a description
            _ => RawClause::Object {
                title: None,
                description: None,
            },
        }
    }
}

/// Text form of a JSON scalar; `null` has none
fn display_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

fn json_type_name(value: &Value) -> String {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
    .to_string()
}
