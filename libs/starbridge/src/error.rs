use std::fmt;

use crate::numeric::NumberFailReason;
use crate::value::UnhashableError;

/// Error type returned by custom converters.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Direction of the conversion that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Encode,
    Decode,
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Op::Encode => f.write_str("encode"),
            Op::Decode => f.write_str("decode"),
        }
    }
}

/// A value kind that cannot populate a type, or a type with no dynamic shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeError {
    pub op: Op,
    pub path: String,
    /// Kind of the offending dynamic value. Set when decoding.
    pub value_kind: Option<&'static str>,
    pub type_name: String,
    /// The field was an embedded record. Set when encoding.
    pub embedded: bool,
    pub detail: Option<String>,
}

impl TypeError {
    pub(crate) fn encode(path: &str, type_name: impl fmt::Display, embedded: bool) -> Self {
        Self {
            op: Op::Encode,
            path: path.to_owned(),
            value_kind: None,
            type_name: type_name.to_string(),
            embedded,
            detail: None,
        }
    }

    pub(crate) fn decode(
        path: &str,
        value_kind: &'static str,
        type_name: impl fmt::Display,
    ) -> Self {
        Self {
            op: Op::Decode,
            path: path.to_owned(),
            value_kind: Some(value_kind),
            type_name: type_name.to_string(),
            embedded: false,
            detail: None,
        }
    }

    pub(crate) fn with_detail(mut self, detail: impl fmt::Display) -> Self {
        self.detail = Some(detail.to_string());
        self
    }
}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.op, self.value_kind) {
            (Op::Decode, Some(kind)) => write!(
                f,
                "{}: cannot convert {kind} to type {}",
                self.path, self.type_name
            )?,
            _ if self.embedded => {
                write!(f, "{}: unsupported embedded type {}", self.path, self.type_name)?
            }
            _ => write!(f, "{}: unsupported type {}", self.path, self.type_name)?,
        }
        if let Some(detail) = &self.detail {
            write!(f, ": {detail}")?;
        }
        Ok(())
    }
}

impl std::error::Error for TypeError {}

/// A numeric value that cannot be assigned without loss.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{path}: cannot assign {value_kind} to type {type_name}: {reason}")]
pub struct NumberError {
    pub path: String,
    pub value_kind: &'static str,
    pub type_name: String,
    pub reason: NumberFailReason,
}

/// A value could not be added to a dynamic container.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{path}: failed to insert {value_kind} into {container}: {source}")]
pub struct ContainerError {
    pub path: String,
    pub value_kind: &'static str,
    pub container: &'static str,
    pub source: UnhashableError,
}

/// A custom converter reported a failure.
#[derive(Debug, thiserror::Error)]
#[error("{path}: custom converter error: {source}")]
pub struct CustomError {
    pub op: Op,
    pub path: String,
    pub source: BoxError,
}

/// One entry of an [`AggregateError`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Type(#[from] TypeError),

    #[error(transparent)]
    Number(#[from] NumberError),

    #[error(transparent)]
    Container(#[from] ContainerError),

    #[error(transparent)]
    Custom(#[from] CustomError),

    /// Appended when the error cap stopped the walk.
    #[error("maximum number of errors reached")]
    MaxErrors,
}

impl Error {
    /// Path of the failing value. `None` for [`Error::MaxErrors`].
    pub fn path(&self) -> Option<&str> {
        match self {
            Error::Type(e) => Some(&e.path),
            Error::Number(e) => Some(&e.path),
            Error::Container(e) => Some(&e.path),
            Error::Custom(e) => Some(&e.path),
            Error::MaxErrors => None,
        }
    }
}

/// Every failure collected by one encode or decode call, in walk order.
#[derive(Debug)]
pub struct AggregateError(Vec<Error>);

impl AggregateError {
    pub fn errors(&self) -> &[Error] {
        &self.0
    }

    pub fn into_errors(self) -> Vec<Error> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Error> {
        self.0.iter()
    }

    /// True when the walk was cut short by the error cap.
    pub fn truncated(&self) -> bool {
        matches!(self.0.last(), Some(Error::MaxErrors))
    }
}

impl fmt::Display for AggregateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{err}")?;
        }
        Ok(())
    }
}

impl std::error::Error for AggregateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.first().map(|e| e as &(dyn std::error::Error + 'static))
    }
}

impl IntoIterator for AggregateError {
    type Item = Error;
    type IntoIter = std::vec::IntoIter<Error>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a AggregateError {
    type Item = &'a Error;
    type IntoIter = std::slice::Iter<'a, Error>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// The error cap was reached; unwinds the walk.
#[derive(Debug)]
pub(crate) struct Halt;

pub(crate) type Walk<T = ()> = Result<T, Halt>;

/// Ordered error collection with an optional cap.
pub(crate) struct Collector {
    op: Op,
    errors: Vec<Error>,
    max: usize,
}

impl Collector {
    pub(crate) fn new(op: Op, max: usize) -> Self {
        Self {
            op,
            errors: Vec::new(),
            max,
        }
    }

    pub(crate) fn record(&mut self, err: impl Into<Error>) -> Walk {
        let err = err.into();
        tracing::debug!(op = %self.op, error = %err, "conversion error");
        self.errors.push(err);
        if self.max > 0 && self.errors.len() >= self.max {
            tracing::warn!(
                op = %self.op,
                max_errors = self.max,
                "maximum number of errors reached, stopping"
            );
            self.errors.push(Error::MaxErrors);
            return Err(Halt);
        }
        Ok(())
    }

    pub(crate) fn len(&self) -> usize {
        self.errors.len()
    }

    pub(crate) fn finish(self) -> Result<(), AggregateError> {
        tracing::debug!(op = %self.op, errors = self.errors.len(), "conversion finished");
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(AggregateError(self.errors))
        }
    }
}
