use crate::error::BoxError;
use crate::reflect::Reflect;
use crate::value::Value;

/// Custom encoding for values the built-in rules do not cover (or cover
/// differently).
///
/// Consulted at every value position before the built-in rules, with the
/// options of the current nesting level first in `options`.
/// `Ok(None)` means "not handled".
///
/// Any `Fn(&str, &dyn Reflect, &[&str]) -> Result<Option<Value>, BoxError>`
/// closure is a converter.
pub trait EncodeConverter {
    fn to_value(
        &self,
        path: &str,
        value: &dyn Reflect,
        options: &[&str],
    ) -> Result<Option<Value>, BoxError>;
}

impl<F> EncodeConverter for F
where
    F: Fn(&str, &dyn Reflect, &[&str]) -> Result<Option<Value>, BoxError>,
{
    fn to_value(
        &self,
        path: &str,
        value: &dyn Reflect,
        options: &[&str],
    ) -> Result<Option<Value>, BoxError> {
        self(path, value, options)
    }
}

/// Custom decoding into destinations the built-in rules do not cover.
///
/// Returns `Ok(true)` once it has populated `dst`, `Ok(false)` to fall
/// through to the built-in rules.
pub trait DecodeConverter {
    fn from_value(
        &self,
        path: &str,
        value: &Value,
        dst: &mut dyn Reflect,
    ) -> Result<bool, BoxError>;
}

impl<F> DecodeConverter for F
where
    F: Fn(&str, &Value, &mut dyn Reflect) -> Result<bool, BoxError>,
{
    fn from_value(
        &self,
        path: &str,
        value: &Value,
        dst: &mut dyn Reflect,
    ) -> Result<bool, BoxError> {
        self(path, value, dst)
    }
}
