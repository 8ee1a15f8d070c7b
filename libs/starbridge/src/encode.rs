//! Static records to dynamic dictionaries.

use crate::config::ConvertConfig;
use crate::converter::EncodeConverter;
use crate::directive::{ShapeOption, current, inner};
use crate::error::{
    AggregateError, BoxError, Collector, ContainerError, CustomError, Op, TypeError, Walk,
};
use crate::path::{join_field, join_index, join_key};
use crate::record::Record;
use crate::reflect::{Peek, Reflect, Sequence, SetMap, Shape};
use crate::value::{Dict, Set, Value};

/// Encodes records into a [`Dict`], collecting every failure.
///
/// ```ignore
/// let mut globals = Dict::new();
/// Encoder::new()
///     .max_errors(10)
///     .encode(&settings, &mut globals)?;
/// ```
#[derive(Default)]
pub struct Encoder<'h> {
    config: ConvertConfig,
    hook: Option<Box<dyn EncodeConverter + 'h>>,
}

impl<'h> Encoder<'h> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: ConvertConfig) -> Self {
        self.config = config;
        self
    }

    pub fn max_errors(mut self, max: usize) -> Self {
        self.config.max_errors = max;
        self
    }

    /// Installs a custom converter closure. See [`EncodeConverter`].
    pub fn hook<F>(self, hook: F) -> Self
    where
        F: Fn(&str, &dyn Reflect, &[&str]) -> Result<Option<Value>, BoxError> + 'h,
    {
        self.converter(hook)
    }

    pub fn converter(mut self, converter: impl EncodeConverter + 'h) -> Self {
        self.hook = Some(Box::new(converter));
        self
    }

    /// Writes every exported field of `src` into `dst`, overwriting existing
    /// keys. Fields that fail are reported and left out.
    pub fn encode<R: Record>(&self, src: &R, dst: &mut Dict) -> Result<(), AggregateError> {
        self.run(src, dst)
    }

    /// Like [`Encoder::encode`] for a value only known at runtime.
    ///
    /// # Panics
    ///
    /// If `src` is neither a record nor a present optional record.
    pub fn encode_dyn(&self, src: &dyn Reflect, dst: &mut Dict) -> Result<(), AggregateError> {
        let record = match src.peek() {
            Peek::Record(record) => Some(record),
            Peek::Optional(Some(inner)) => match inner.peek() {
                Peek::Record(record) => Some(record),
                _ => None,
            },
            _ => None,
        };
        match record {
            Some(record) => self.run(record, dst),
            None => panic!(
                "source value is not a record or an optional record: {}",
                src.shape()
            ),
        }
    }

    fn run(&self, src: &dyn Record, dst: &mut Dict) -> Result<(), AggregateError> {
        tracing::debug!(record = %src.shape(), "encoding record");
        let mut walk = EncodeWalk {
            hook: self.hook.as_deref(),
            errors: Collector::new(Op::Encode, self.config.max_errors),
        };
        // On Halt the collector already ends with the cap sentinel.
        let _ = walk.record("", src, dst);
        walk.errors.finish()
    }
}

/// Encodes `src` into `dst` with the default configuration.
pub fn encode<R: Record>(src: &R, dst: &mut Dict) -> Result<(), AggregateError> {
    Encoder::new().encode(src, dst)
}

enum Target {
    List,
    Tuple,
    Set,
}

impl Target {
    fn for_options(options: &[&str]) -> Self {
        match current(options) {
            Some(ShapeOption::AsTuple) => Target::Tuple,
            Some(ShapeOption::AsSet) => Target::Set,
            _ => Target::List,
        }
    }
}

struct EncodeWalk<'w> {
    hook: Option<&'w dyn EncodeConverter>,
    errors: Collector,
}

impl EncodeWalk<'_> {
    fn record(&mut self, path: &str, src: &dyn Record, dst: &mut Dict) -> Walk {
        for (index, field) in src.fields().iter().enumerate() {
            if field.is_ignored() {
                continue;
            }
            let Some(value) = src.field(index) else {
                continue;
            };
            let path = join_field(path, field.name);
            tracing::trace!(path = %path, shape = %field.shape, "encode field");

            if field.flattens() {
                self.embedded(&path, value, dst)?;
                continue;
            }
            if let Some(value) = self.value(&path, value, field.options())? {
                dst.insert(field.key().to_owned(), value);
            }
        }
        Ok(())
    }

    /// Flattens an embedded record (or present optional record) into `dst`.
    fn embedded(&mut self, path: &str, src: &dyn Reflect, dst: &mut Dict) -> Walk {
        let shape = src.shape();
        if shape.is_valid() && matches!(shape.unwrap_optional(), Shape::Record(_)) {
            match src.peek() {
                Peek::Record(record) => return self.record(path, record, dst),
                Peek::Optional(None) => return Ok(()),
                Peek::Optional(Some(inner)) => {
                    if let Peek::Record(record) = inner.peek() {
                        return self.record(path, record, dst);
                    }
                }
                _ => {}
            }
        }
        self.errors.record(TypeError::encode(path, shape, true))
    }

    /// `Ok(None)` means the value failed and was reported.
    fn value(&mut self, path: &str, src: &dyn Reflect, options: &[&str]) -> Walk<Option<Value>> {
        if let Some(hook) = self.hook {
            match hook.to_value(path, src, options) {
                Ok(Some(value)) => return Ok(Some(value)),
                Ok(None) => {}
                Err(source) => {
                    self.errors.record(CustomError {
                        op: Op::Encode,
                        path: path.to_owned(),
                        source,
                    })?;
                    return Ok(Some(Value::None));
                }
            }
        }

        let shape = src.shape();
        if !shape.is_valid() {
            self.errors.record(TypeError::encode(path, shape, false))?;
            return Ok(None);
        }
        match src.peek() {
            Peek::Optional(None) => Ok(Some(Value::None)),
            Peek::Optional(Some(inner)) => self.concrete(path, inner, options),
            _ => self.concrete(path, src, options),
        }
    }

    fn concrete(&mut self, path: &str, src: &dyn Reflect, options: &[&str]) -> Walk<Option<Value>> {
        let value = match src.peek() {
            Peek::Bool(b) => Value::Bool(b),
            Peek::Int(i) => Value::Int(i),
            Peek::Float(f) => Value::Float(f),
            Peek::Str(s) => match current(options) {
                Some(ShapeOption::AsBytes) => Value::Bytes(s.as_bytes().to_vec()),
                _ => Value::String(s.to_owned()),
            },
            Peek::Bytes(bytes) => return self.bytes(path, src, bytes, options),
            Peek::Seq(seq) => return self.sequence(path, seq, options),
            Peek::SetMap(set) => return self.set_map(path, set, options),
            Peek::Record(record) => {
                let mut dict = Dict::new();
                self.record(path, record, &mut dict)?;
                Value::Dict(dict)
            }
            Peek::Value(value) => value.clone(),
            Peek::Optional(_) | Peek::Opaque => {
                self.errors.record(TypeError::encode(path, src.shape(), false))?;
                return Ok(None);
            }
        };
        Ok(Some(value))
    }

    fn bytes(
        &mut self,
        path: &str,
        src: &dyn Reflect,
        bytes: &[u8],
        options: &[&str],
    ) -> Walk<Option<Value>> {
        match current(options) {
            Some(ShapeOption::AsString) => match std::str::from_utf8(bytes) {
                Ok(s) => Ok(Some(Value::String(s.to_owned()))),
                Err(e) => {
                    self.errors
                        .record(TypeError::encode(path, src.shape(), false).with_detail(e))?;
                    Ok(None)
                }
            },
            Some(ShapeOption::AsList | ShapeOption::AsTuple | ShapeOption::AsSet) => {
                let items = bytes
                    .iter()
                    .enumerate()
                    .map(|(i, b)| (join_index(path, i), b as &dyn Reflect));
                self.collect(Target::for_options(options), items, inner(options))
            }
            _ => Ok(Some(Value::Bytes(bytes.to_vec()))),
        }
    }

    fn sequence(
        &mut self,
        path: &str,
        seq: &dyn Sequence,
        options: &[&str],
    ) -> Walk<Option<Value>> {
        let items = (0..seq.len())
            .filter_map(|i| seq.element(i).map(|elem| (join_index(path, i), elem)));
        self.collect(Target::for_options(options), items, inner(options))
    }

    fn set_map(&mut self, path: &str, set: &dyn SetMap, options: &[&str]) -> Walk<Option<Value>> {
        let items = set
            .members()
            .into_iter()
            .map(|key| (join_key(path, key), key));
        self.collect(Target::Set, items, inner(options))
    }

    /// Builds a container from already-pathed elements. A container with any
    /// failed element is left out as a whole.
    fn collect<'a>(
        &mut self,
        target: Target,
        items: impl Iterator<Item = (String, &'a dyn Reflect)>,
        options: &[&str],
    ) -> Walk<Option<Value>> {
        let before = self.errors.len();
        let mut list = Vec::new();
        let mut set = Set::new();
        for (path, item) in items {
            let Some(value) = self.value(&path, item, options)? else {
                continue;
            };
            match target {
                Target::Set => {
                    let value_kind = value.type_name();
                    if let Err(source) = set.insert(value) {
                        self.errors.record(ContainerError {
                            path,
                            value_kind,
                            container: "set",
                            source,
                        })?;
                    }
                }
                Target::List | Target::Tuple => list.push(value),
            }
        }
        if self.errors.len() > before {
            return Ok(None);
        }
        Ok(Some(match target {
            Target::List => Value::List(list),
            Target::Tuple => Value::Tuple(list),
            Target::Set => Value::Set(set),
        }))
    }
}
