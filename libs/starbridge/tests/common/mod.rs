#![allow(dead_code)]

use starbridge::{Dict, Set, Value};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_test_writer()
        .try_init();
}

pub fn dict<const N: usize>(entries: [(&str, Value); N]) -> Dict {
    entries
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

pub fn list<const N: usize>(items: [Value; N]) -> Value {
    Value::List(items.into())
}

pub fn tuple<const N: usize>(items: [Value; N]) -> Value {
    Value::Tuple(items.into())
}

pub fn set<const N: usize>(items: [Value; N]) -> Value {
    Value::Set(Set::try_from(Vec::from(items)).unwrap())
}

pub fn int(v: i64) -> Value {
    Value::from(v)
}

pub fn string(s: &str) -> Value {
    Value::from(s)
}

pub fn bytes(b: &[u8]) -> Value {
    Value::Bytes(b.to_vec())
}

/// Messages of every collected error, in order.
pub fn messages(err: &starbridge::AggregateError) -> Vec<String> {
    err.iter().map(ToString::to_string).collect()
}
