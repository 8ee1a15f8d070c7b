//! Error paths: `Parent.Child`, `List[0]`, `Set[key]`.

use crate::reflect::{Peek, Reflect};

pub(crate) fn join_field(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_owned()
    } else {
        format!("{parent}.{name}")
    }
}

pub(crate) fn join_index(parent: &str, index: usize) -> String {
    format!("{parent}[{index}]")
}

/// Text and numeric keys render bare; anything else uses its debug form.
pub(crate) fn join_key(parent: &str, key: &dyn Reflect) -> String {
    match key.peek() {
        Peek::Str(s) => format!("{parent}[{s}]"),
        Peek::Int(i) => format!("{parent}[{i}]"),
        Peek::Bool(b) => format!("{parent}[{b}]"),
        _ => format!("{parent}[{key:?}]"),
    }
}
