//! Precision-checked numeric assignment.
//!
//! Dynamic integers are arbitrary precision and dynamic floats are `f64`; a
//! write into a fixed-width destination succeeds only when it loses nothing.

use std::fmt;

use num_bigint::BigInt;
use num_traits::{FromPrimitive, Signed, ToPrimitive};

/// Why a numeric assignment was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberFailReason {
    CannotExactlyRepresent,
    OutOfRange,
}

impl fmt::Display for NumberFailReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NumberFailReason::CannotExactlyRepresent => {
                f.write_str("value cannot be exactly represented")
            }
            NumberFailReason::OutOfRange => f.write_str("value out of range"),
        }
    }
}

/// Mutable handle to an integer destination of any width.
pub enum IntMut<'a> {
    I8(&'a mut i8),
    I16(&'a mut i16),
    I32(&'a mut i32),
    I64(&'a mut i64),
    I128(&'a mut i128),
    Isize(&'a mut isize),
    U8(&'a mut u8),
    U16(&'a mut u16),
    U32(&'a mut u32),
    U64(&'a mut u64),
    U128(&'a mut u128),
    Usize(&'a mut usize),
}

macro_rules! store {
    ($dst:expr, $value:expr, $conv:ident) => {{
        **$dst = $value.$conv().ok_or(NumberFailReason::OutOfRange)?;
        Ok(())
    }};
}

impl IntMut<'_> {
    pub fn assign_int(&mut self, value: &BigInt) -> Result<(), NumberFailReason> {
        match self {
            IntMut::I8(dst) => store!(dst, value, to_i8),
            IntMut::I16(dst) => store!(dst, value, to_i16),
            IntMut::I32(dst) => store!(dst, value, to_i32),
            IntMut::I64(dst) => store!(dst, value, to_i64),
            IntMut::I128(dst) => store!(dst, value, to_i128),
            IntMut::Isize(dst) => store!(dst, value, to_isize),
            IntMut::U8(dst) => store!(dst, value, to_u8),
            IntMut::U16(dst) => store!(dst, value, to_u16),
            IntMut::U32(dst) => store!(dst, value, to_u32),
            IntMut::U64(dst) => store!(dst, value, to_u64),
            IntMut::U128(dst) => store!(dst, value, to_u128),
            IntMut::Usize(dst) => store!(dst, value, to_usize),
        }
    }

    /// Accepts only finite floats without a fractional part.
    pub fn assign_float(&mut self, value: f64) -> Result<(), NumberFailReason> {
        if !value.is_finite() || value.fract() != 0.0 {
            return Err(NumberFailReason::CannotExactlyRepresent);
        }
        let int = BigInt::from_f64(value).ok_or(NumberFailReason::CannotExactlyRepresent)?;
        self.assign_int(&int)
    }
}

/// Mutable handle to a float destination.
pub enum FloatMut<'a> {
    F32(&'a mut f32),
    F64(&'a mut f64),
}

/// Largest magnitude below which every integer is exact in the mantissa.
const F32_EXACT_BITS: u64 = 24;
const F64_EXACT_BITS: u64 = 53;

impl FloatMut<'_> {
    /// Integers are accepted while their magnitude fits the mantissa. The
    /// bound itself (2^24 or 2^53) is exact; anything above is refused.
    pub fn assign_int(&mut self, value: &BigInt) -> Result<(), NumberFailReason> {
        let bits = match self {
            FloatMut::F32(_) => F32_EXACT_BITS,
            FloatMut::F64(_) => F64_EXACT_BITS,
        };
        let limit = BigInt::from(1u64) << bits;
        if value.abs() > limit {
            return Err(NumberFailReason::CannotExactlyRepresent);
        }
        match self {
            FloatMut::F32(dst) => {
                **dst = value.to_f32().ok_or(NumberFailReason::OutOfRange)?;
            }
            FloatMut::F64(dst) => {
                **dst = value.to_f64().ok_or(NumberFailReason::OutOfRange)?;
            }
        }
        Ok(())
    }

    /// Narrowing to `f32` tolerates a rounding error up to `f32::EPSILON`.
    /// Non-finite values pass through.
    pub fn assign_float(&mut self, value: f64) -> Result<(), NumberFailReason> {
        match self {
            FloatMut::F32(dst) => {
                let narrowed = value as f32;
                let error = (f64::from(narrowed) - value).abs();
                if value.is_finite() && error > f64::from(f32::EPSILON) {
                    return Err(NumberFailReason::CannotExactlyRepresent);
                }
                **dst = narrowed;
            }
            FloatMut::F64(dst) => **dst = value,
        }
        Ok(())
    }
}
