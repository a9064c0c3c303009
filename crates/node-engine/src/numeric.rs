//! Lossless numeric coercion
//!
//! Every conversion out of a dynamic [`Value`](crate::Value) goes through
//! [`Numeric`]. A conversion succeeds only if converting the result back
//! reproduces the source: exactly for integers, within one unit for
//! scalar-to-integer. Unsigned targets reject negative sources and
//! non-finite scalars never become integers.

use crate::error::{NodeError, Result};

/// A Rust numeric type that can be safely produced from an integer or
/// scalar value.
pub trait Numeric: Copy + Sized {
    /// Convert from a 64-bit signed integer
    fn from_integer(i: i64) -> Result<Self>;

    /// Convert from a 64-bit float
    fn from_scalar(f: f64) -> Result<Self>;
}

fn underflow() -> NodeError {
    NodeError::RangeOrPrecision("integer underflow".to_string())
}

fn out_of_range() -> NodeError {
    NodeError::RangeOrPrecision("integer out of range".to_string())
}

fn bad_precision() -> NodeError {
    NodeError::RangeOrPrecision("bad precision while conversion of floating point".to_string())
}

macro_rules! impl_numeric_integer {
    ($($t:ty),* $(,)?) => {$(
        impl Numeric for $t {
            fn from_integer(i: i64) -> Result<Self> {
                if <$t>::MIN == 0 && i < 0 {
                    return Err(underflow());
                }
                <$t>::try_from(i).map_err(|_| out_of_range())
            }

            fn from_scalar(f: f64) -> Result<Self> {
                if !f.is_finite() {
                    return Err(bad_precision());
                }
                if <$t>::MIN == 0 && f < 0.0 {
                    return Err(underflow());
                }
                // `as` saturates; the round trip below catches it
                let ret = f as $t;
                if (ret as f64 - f).abs() > 1.0 {
                    return Err(bad_precision());
                }
                Ok(ret)
            }
        }
    )*};
}

impl_numeric_integer!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl Numeric for f64 {
    fn from_integer(i: i64) -> Result<Self> {
        let f = i as f64;
        if f as i128 != i128::from(i) {
            return Err(bad_precision());
        }
        Ok(f)
    }

    fn from_scalar(f: f64) -> Result<Self> {
        Ok(f)
    }
}

impl Numeric for f32 {
    fn from_integer(i: i64) -> Result<Self> {
        let f = i as f32;
        if f as i128 != i128::from(i) {
            return Err(bad_precision());
        }
        Ok(f)
    }

    fn from_scalar(f: f64) -> Result<Self> {
        let ret = f as f32;
        if f.is_finite() && ret.is_infinite() {
            return Err(NodeError::RangeOrPrecision("scalar out of range".to_string()));
        }
        Ok(ret)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLES: &[i64] = &[
        i64::MIN,
        i64::MIN + 1,
        -(1 << 32) - 1,
        i32::MIN as i64 - 1,
        i32::MIN as i64,
        -32769,
        -32768,
        -129,
        -128,
        -1,
        0,
        1,
        127,
        128,
        255,
        256,
        32767,
        32768,
        65535,
        65536,
        i32::MAX as i64,
        i32::MAX as i64 + 1,
        u32::MAX as i64,
        u32::MAX as i64 + 1,
        i64::MAX - 1,
        i64::MAX,
    ];

    fn check_width<T>(min: i128, max: i128, back: impl Fn(T) -> i128)
    where
        T: Numeric,
    {
        for &i in SAMPLES {
            let in_range = (min..=max).contains(&i128::from(i));
            match T::from_integer(i) {
                Ok(v) => {
                    assert!(in_range, "{} should have been rejected", i);
                    assert_eq!(back(v), i128::from(i));
                }
                Err(e) => {
                    assert!(!in_range, "{} should have been accepted: {}", i, e);
                    assert!(matches!(e, NodeError::RangeOrPrecision(_)));
                }
            }
        }
    }

    #[test]
    fn test_integer_narrowing_round_trips() {
        check_width::<i8>(i8::MIN.into(), i8::MAX.into(), i128::from);
        check_width::<u8>(0, u8::MAX.into(), i128::from);
        check_width::<i16>(i16::MIN.into(), i16::MAX.into(), i128::from);
        check_width::<u16>(0, u16::MAX.into(), i128::from);
        check_width::<i32>(i32::MIN.into(), i32::MAX.into(), i128::from);
        check_width::<u32>(0, u32::MAX.into(), i128::from);
        check_width::<i64>(i64::MIN.into(), i64::MAX.into(), i128::from);
        check_width::<u64>(0, u64::MAX.into(), i128::from);
    }

    #[test]
    fn test_unsigned_rejects_negative() {
        let err = u32::from_integer(-1).unwrap_err();
        assert_eq!(err.to_string(), "integer underflow");
        let err = u64::from_scalar(-0.5).unwrap_err();
        assert_eq!(err.to_string(), "integer underflow");
    }

    #[test]
    fn test_scalar_to_integer_tolerance() {
        assert_eq!(i32::from_scalar(3.0).unwrap(), 3);
        assert_eq!(i32::from_scalar(3.9).unwrap(), 3);
        assert_eq!(i64::from_scalar(-2.5).unwrap(), -2);
        assert!(i8::from_scalar(300.0).is_err());
        assert!(i64::from_scalar(1e30).is_err());
        assert!(i64::from_scalar(f64::NAN).is_err());
        assert!(u8::from_scalar(f64::INFINITY).is_err());
    }

    #[test]
    fn test_integer_to_scalar_precision() {
        assert_eq!(f64::from_integer(1 << 53).unwrap(), 9007199254740992.0);
        assert!(f64::from_integer((1 << 53) + 1).is_err());
        assert!(f64::from_integer(i64::MAX).is_err());
        assert_eq!(f32::from_integer(1 << 24).unwrap(), 16777216.0);
        assert!(f32::from_integer((1 << 24) + 1).is_err());
    }

    #[test]
    fn test_scalar_to_f32_range() {
        assert_eq!(f32::from_scalar(1.5).unwrap(), 1.5);
        assert!(f32::from_scalar(1e300).is_err());
        assert!(f32::from_scalar(f64::INFINITY).unwrap().is_infinite());
    }
}
