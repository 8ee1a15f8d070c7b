//! Conversion between typed Rust records and dynamic script values.
//!
//! ```ignore
//! use starbridge::{Dict, Record};
//!
//! #[derive(Debug, Default, Record)]
//! pub struct Build {
//!     pub name: String,
//!     #[star("srcs,astuple")]
//!     pub sources: Vec<String>,
//!     pub jobs: Option<u32>,
//! }
//!
//! let mut globals = Dict::new();
//! starbridge::encode(&build, &mut globals)?;
//! // ... run a script against `globals` ...
//! starbridge::decode(&globals, &mut build)?;
//! ```

extern crate self as starbridge;

pub mod config;
pub mod converter;
pub mod decode;
pub mod directive;
pub mod encode;
pub mod error;
pub mod json;
pub mod numeric;
mod path;
pub mod record;
pub mod reflect;
pub mod value;

pub use starbridge_derive::Record;

pub use config::{ConfigError, ConvertConfig};
pub use converter::{DecodeConverter, EncodeConverter};
pub use decode::{Decoder, decode};
pub use directive::{Directive, ShapeOption};
pub use encode::{Encoder, encode};
pub use error::{
    AggregateError, BoxError, ContainerError, CustomError, Error, NumberError, Op, TypeError,
};
pub use numeric::NumberFailReason;
pub use record::{Field, Record};
pub use reflect::{
    AsAny, FloatWidth, IntWidth, Optional, Peek, Poke, Reflect, Sequence, SetMap, Shape,
};
pub use value::{Dict, Set, UnhashableError, Value};
