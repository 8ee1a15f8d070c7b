//! Bridge between [`Value`] and `serde_json::Value`.
//!
//! Lets a dictionary be seeded from a JSON document, or encoded output be
//! inspected as JSON.

use num_bigint::BigInt;
use num_traits::ToPrimitive;
use serde_json::{Map, Number};

use crate::value::{Dict, Value};

#[derive(Debug, thiserror::Error)]
pub enum JsonError {
    #[error("invalid json: {0}")]
    Syntax(#[from] serde_json::Error),

    #[error("json document is not an object")]
    NotAnObject,

    #[error("float {0} has no json representation")]
    NonFinite(f64),

    #[error("integer {0} does not fit a json number")]
    IntRange(BigInt),
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::None,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => number(&n),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => Value::Dict(object(map)),
        }
    }
}

fn object(map: Map<String, serde_json::Value>) -> Dict {
    map.into_iter().map(|(k, v)| (k, Value::from(v))).collect()
}

fn number(n: &Number) -> Value {
    if let Some(i) = n.as_i64() {
        Value::Int(BigInt::from(i))
    } else if let Some(u) = n.as_u64() {
        Value::Int(BigInt::from(u))
    } else {
        Value::Float(n.as_f64().unwrap_or(f64::NAN))
    }
}

impl Value {
    pub fn from_json(json: serde_json::Value) -> Self {
        json.into()
    }

    /// Bytes become arrays of integers; tuples and sets become arrays.
    pub fn to_json(&self) -> Result<serde_json::Value, JsonError> {
        Ok(match self {
            Value::None => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => {
                let n = match (i.to_i64(), i.to_u64()) {
                    (Some(v), _) => Number::from(v),
                    (None, Some(v)) => Number::from(v),
                    (None, None) => return Err(JsonError::IntRange(i.clone())),
                };
                serde_json::Value::Number(n)
            }
            Value::Float(f) => {
                let n = Number::from_f64(*f).ok_or(JsonError::NonFinite(*f))?;
                serde_json::Value::Number(n)
            }
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Bytes(bytes) => serde_json::Value::Array(
                bytes.iter().map(|b| serde_json::Value::from(*b)).collect(),
            ),
            Value::List(items) | Value::Tuple(items) => array(items)?,
            Value::Set(set) => array(set)?,
            Value::Dict(dict) => dict_to_json(dict)?,
        })
    }
}

fn array<'a>(items: impl IntoIterator<Item = &'a Value>) -> Result<serde_json::Value, JsonError> {
    let items = items
        .into_iter()
        .map(Value::to_json)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(serde_json::Value::Array(items))
}

/// Renders a dictionary as a JSON object, keeping key order.
pub fn dict_to_json(dict: &Dict) -> Result<serde_json::Value, JsonError> {
    let mut map = Map::with_capacity(dict.len());
    for (k, v) in dict {
        map.insert(k.clone(), v.to_json()?);
    }
    Ok(serde_json::Value::Object(map))
}

/// Parses a JSON object into a dictionary.
pub fn parse_dict(json: &str) -> Result<Dict, JsonError> {
    match serde_json::from_str::<serde_json::Value>(json)? {
        serde_json::Value::Object(map) => Ok(object(map)),
        _ => Err(JsonError::NotAnObject),
    }
}
