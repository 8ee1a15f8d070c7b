//! Dynamic dictionaries onto static records.
//!
//! Decoding is an overlay: fields without a matching key keep their current
//! value, containers are replaced (sequences) or extended (set maps).

use crate::config::ConvertConfig;
use crate::converter::DecodeConverter;
use crate::error::{
    AggregateError, BoxError, Collector, CustomError, Error, NumberError, Op, TypeError, Walk,
};
use crate::numeric::NumberFailReason;
use crate::path::{join_field, join_index};
use crate::record::{Field, Record};
use crate::reflect::{Poke, Reflect, Sequence, Shape};
use crate::value::{Dict, Set, Value};

/// Decodes a [`Dict`] onto records, collecting every failure.
#[derive(Default)]
pub struct Decoder<'h> {
    config: ConvertConfig,
    hook: Option<Box<dyn DecodeConverter + 'h>>,
}

impl<'h> Decoder<'h> {
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

    pub fn lowercase_fallback(mut self, enabled: bool) -> Self {
        self.config.lowercase_fallback = enabled;
        self
    }

    /// Installs a custom converter closure. See [`DecodeConverter`].
    pub fn hook<F>(self, hook: F) -> Self
    where
        F: Fn(&str, &Value, &mut dyn Reflect) -> Result<bool, BoxError> + 'h,
    {
        self.converter(hook)
    }

    pub fn converter(mut self, converter: impl DecodeConverter + 'h) -> Self {
        self.hook = Some(Box::new(converter));
        self
    }

    /// Overlays `src` onto `dst`. On error, `dst` still holds every field that
    /// decoded successfully.
    pub fn decode<R: Record>(&self, src: &Dict, dst: &mut R) -> Result<(), AggregateError> {
        self.run(src, dst)
    }

    /// Like [`Decoder::decode`] for a destination only known at runtime.
    ///
    /// # Panics
    ///
    /// If `dst` is neither a record nor a present optional record.
    pub fn decode_dyn(&self, src: &Dict, dst: &mut dyn Reflect) -> Result<(), AggregateError> {
        let shape = dst.shape();
        let record = match dst.poke() {
            Poke::Record(record) => Some(record),
            Poke::Optional(opt) if !opt.is_none() => match opt.get_or_insert_default().poke() {
                Poke::Record(record) => Some(record),
                _ => None,
            },
            _ => None,
        };
        match record {
            Some(record) => self.run(src, record),
            None => panic!(
                "destination value is not a record or a present optional record: {shape}"
            ),
        }
    }

    fn run(&self, src: &Dict, dst: &mut dyn Record) -> Result<(), AggregateError> {
        tracing::debug!(record = %dst.shape(), keys = src.len(), "decoding record");
        let mut walk = DecodeWalk {
            hook: self.hook.as_deref(),
            lowercase_fallback: self.config.lowercase_fallback,
            errors: Collector::new(Op::Decode, self.config.max_errors),
        };
        // On Halt the collector already ends with the cap sentinel.
        let _ = walk.record("", src, dst);
        walk.errors.finish()
    }
}

/// Decodes `src` onto `dst` with the default configuration.
pub fn decode<R: Record>(src: &Dict, dst: &mut R) -> Result<(), AggregateError> {
    Decoder::new().decode(src, dst)
}

/// Steps through one optionality level, allocating the wrapped value.
fn allocate(poke: Poke<'_>) -> Poke<'_> {
    match poke {
        Poke::Optional(opt) => opt.get_or_insert_default().poke(),
        other => other,
    }
}

fn mismatch(path: &str, kind: &'static str, shape: &Shape) -> Error {
    TypeError::decode(path, kind, shape).into()
}

struct DecodeWalk<'w> {
    hook: Option<&'w dyn DecodeConverter>,
    lowercase_fallback: bool,
    errors: Collector,
}

impl DecodeWalk<'_> {
    /// Returns whether any field had a matching key.
    fn record(&mut self, path: &str, src: &Dict, dst: &mut dyn Record) -> Walk<bool> {
        let mut did_set = false;
        for (index, field) in dst.fields().iter().enumerate() {
            if field.is_ignored() {
                continue;
            }
            let path = join_field(path, field.name);
            tracing::trace!(path = %path, shape = %field.shape, "decode field");
            if field.flattens() {
                if let Some(slot) = dst.field_mut(index) {
                    did_set |= self.dict(&path, src, slot)?;
                }
                continue;
            }

            let Some(value) = self.lookup(src, field) else {
                continue;
            };
            let Some(slot) = dst.field_mut(index) else {
                continue;
            };
            did_set = true;
            self.value(&path, value, slot)?;
        }
        Ok(did_set)
    }

    fn lookup<'d>(&self, src: &'d Dict, field: &Field) -> Option<&'d Value> {
        if !field.directive.name.is_empty() {
            return src.get(field.directive.name);
        }
        src.get(field.name).or_else(|| {
            if self.lowercase_fallback {
                src.get(&field.name.to_lowercase())
            } else {
                None
            }
        })
    }

    fn value(&mut self, path: &str, src: &Value, dst: &mut dyn Reflect) -> Walk {
        if let Some(hook) = self.hook {
            match hook.from_value(path, src, &mut *dst) {
                Ok(true) => return Ok(()),
                Ok(false) => {}
                Err(source) => {
                    return self.errors.record(CustomError {
                        op: Op::Decode,
                        path: path.to_owned(),
                        source,
                    });
                }
            }
        }

        let shape = dst.shape();
        let kind = src.type_name();
        if !shape.is_valid() {
            return self.errors.record(mismatch(path, kind, &shape));
        }
        if matches!(shape.unwrap_optional(), Shape::Value) {
            if let Poke::Value(slot) = allocate(dst.poke()) {
                *slot = src.clone();
            }
            return Ok(());
        }

        let number = |reason: NumberFailReason| -> Error {
            NumberError {
                path: path.to_owned(),
                value_kind: kind,
                type_name: shape.to_string(),
                reason,
            }
            .into()
        };

        match src {
            Value::None => {
                let result = match dst.poke() {
                    Poke::Optional(opt) => {
                        opt.set_none();
                        Ok(())
                    }
                    Poke::Seq(seq) => {
                        seq.reset(0);
                        Ok(())
                    }
                    Poke::Bytes(bytes) => {
                        *bytes = Vec::new();
                        Ok(())
                    }
                    Poke::SetMap(set) => {
                        set.clear();
                        Ok(())
                    }
                    _ => Err(mismatch(path, kind, &shape)),
                };
                match result {
                    Ok(()) => Ok(()),
                    Err(err) => self.errors.record(err),
                }
            }
            Value::Bool(b) => self.assign(dst, |poke| match poke {
                Poke::Bool(slot) => {
                    *slot = *b;
                    Ok(())
                }
                _ => Err(mismatch(path, kind, &shape)),
            }),
            Value::Int(i) => self.assign(dst, |poke| match poke {
                Poke::Int(mut slot) => slot.assign_int(i).map_err(number),
                Poke::Float(mut slot) => slot.assign_int(i).map_err(number),
                _ => Err(mismatch(path, kind, &shape)),
            }),
            Value::Float(f) => self.assign(dst, |poke| match poke {
                Poke::Int(mut slot) => slot.assign_float(*f).map_err(number),
                Poke::Float(mut slot) => slot.assign_float(*f).map_err(number),
                _ => Err(mismatch(path, kind, &shape)),
            }),
            Value::String(s) => self.text(path, kind, &shape, s.as_bytes(), dst),
            Value::Bytes(b) => self.text(path, kind, &shape, b, dst),
            Value::Dict(dict) => self.dict(path, dict, dst).map(|_| ()),
            Value::List(items) | Value::Tuple(items) => {
                if !shape.unwrap_optional().is_sequence() {
                    return self.errors.record(mismatch(path, kind, &shape));
                }
                self.fill(path, items, allocate(dst.poke()))
            }
            Value::Set(set) => {
                if shape.unwrap_optional().is_sequence() {
                    return self.fill(path, set.iter(), allocate(dst.poke()));
                }
                if !matches!(shape.unwrap_optional(), Shape::SetMap { .. }) {
                    return self.errors.record(mismatch(path, kind, &shape));
                }
                self.set_map(path, set, allocate(dst.poke()))
            }
        }
    }

    /// Writes through one optionality level. A newly allocated optional is
    /// reset to absent when the write fails.
    fn assign(
        &mut self,
        dst: &mut dyn Reflect,
        write: impl FnOnce(Poke<'_>) -> Result<(), Error>,
    ) -> Walk {
        let result = match dst.poke() {
            Poke::Optional(opt) => {
                let was_none = opt.is_none();
                let result = write(opt.get_or_insert_default().poke());
                if result.is_err() && was_none {
                    opt.set_none();
                }
                result
            }
            poke => write(poke),
        };
        match result {
            Ok(()) => Ok(()),
            Err(err) => self.errors.record(err),
        }
    }

    /// Text and byte values both fill either kind of destination.
    fn text(
        &mut self,
        path: &str,
        kind: &'static str,
        shape: &Shape,
        bytes: &[u8],
        dst: &mut dyn Reflect,
    ) -> Walk {
        self.assign(dst, |poke| match poke {
            Poke::Str(slot) => match std::str::from_utf8(bytes) {
                Ok(s) => {
                    *slot = s.to_owned();
                    Ok(())
                }
                Err(e) => Err(TypeError::decode(path, kind, shape).with_detail(e).into()),
            },
            Poke::Bytes(slot) => {
                *slot = bytes.to_vec();
                Ok(())
            }
            _ => Err(mismatch(path, kind, shape)),
        })
    }

    /// Decodes into a record or optional record. An absent optional is only
    /// attached when at least one of its fields was set.
    fn dict(&mut self, path: &str, src: &Dict, dst: &mut dyn Reflect) -> Walk<bool> {
        let shape = dst.shape();
        match dst.poke() {
            Poke::Record(record) => self.record(path, src, record),
            Poke::Optional(opt)
                if shape.is_valid() && matches!(shape.unwrap_optional(), Shape::Record(_)) =>
            {
                let was_none = opt.is_none();
                let result = match opt.get_or_insert_default().poke() {
                    Poke::Record(record) => self.record(path, src, record),
                    _ => Ok(false),
                };
                if was_none && !matches!(result, Ok(true)) {
                    opt.set_none();
                }
                result
            }
            _ => {
                self.errors.record(mismatch(path, "dict", &shape))?;
                Ok(false)
            }
        }
    }

    /// Replaces a sequence's contents with the decoded items.
    fn fill<'v>(
        &mut self,
        path: &str,
        items: impl IntoIterator<Item = &'v Value, IntoIter: ExactSizeIterator>,
        target: Poke<'_>,
    ) -> Walk {
        let items = items.into_iter();
        match target {
            Poke::Seq(seq) => {
                seq.reset(items.len());
                for (i, item) in items.enumerate() {
                    let elem = seq.push_default();
                    self.value(&join_index(path, i), item, elem)?;
                }
            }
            Poke::Bytes(bytes) => {
                Sequence::reset(bytes, items.len());
                for (i, item) in items.enumerate() {
                    let mut byte = 0u8;
                    self.value(&join_index(path, i), item, &mut byte)?;
                    bytes.push(byte);
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Adds set members to a set map, keeping existing entries. Members that
    /// fail to decode are not inserted.
    fn set_map(&mut self, path: &str, src: &Set, target: Poke<'_>) -> Walk {
        let Poke::SetMap(map) = target else {
            return Ok(());
        };
        for (i, member) in src.iter().enumerate() {
            let mut key = map.new_key();
            let before = self.errors.len();
            self.value(&join_index(path, i), member, &mut *key)?;
            if self.errors.len() == before {
                map.insert_member(key);
            }
        }
        Ok(())
    }
}
