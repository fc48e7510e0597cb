//! Safe and exact numeric conversions.
//!
//! `safe_cast` is value-preserving at the type level: it exists only for
//! `(Source, Target)` pairs where every value of `Source` is exactly
//! representable in `Target`. Rust's standard library already draws this
//! line for us via `From`/`Into` impls between the numeric primitives, so
//! `safe_cast` is nothing more than `Target::from`; the capability table
//! lives in the trait bound, not in a bespoke marker trait.
//!
//! `exact_cast_*` functions are the runtime-checked counterpart used at
//! the tile/cell-coordinate boundary, where the conversion is usually
//! value-preserving for the values that actually occur but is not
//! provable at the type level (`i64 -> f64`, `f64 -> i64`, `i64 -> u16`).
//! A failing check is a contract violation, not a recoverable error.

use crate::ar_assert;

/// Value-preserving conversion that always succeeds.
#[inline]
pub fn safe_cast<S, T>(value: S) -> T
where
    T: From<S>,
{
    T::from(value)
}

/// Checked conversion from `f64` to `i64`: fails unless `value` has no
/// fractional part and is in range.
#[inline]
pub fn exact_cast_f64_to_i64(value: f64) -> i64 {
    // 2^63, the smallest power of two exceeding `i64::MAX`; exactly
    // representable in `f64`, unlike `i64::MAX as f64` (which rounds up
    // to this same value, making `value <= i64::MAX as f64` wrongly
    // admit `value == 2^63`).
    const EXCLUSIVE_UPPER_BOUND: f64 = 9_223_372_036_854_775_808.0;
    ar_assert!(value.is_finite());
    ar_assert!(value >= i64::MIN as f64 && value < EXCLUSIVE_UPPER_BOUND);
    let truncated = value as i64;
    ar_assert!(truncated as f64 == value);
    truncated
}

/// Checked conversion from `i64` to `f64`: fails if the value is not
/// exactly representable in 53 bits of mantissa.
#[inline]
pub fn exact_cast_i64_to_f64(value: i64) -> f64 {
    let result = value as f64;
    ar_assert!(result as i64 == value);
    result
}

/// Checked conversion from `i64` to `u16`.
#[inline]
pub fn exact_cast_i64_to_u16(value: i64) -> u16 {
    ar_assert!(value >= 0 && value <= u16::MAX as i64);
    value as u16
}

/// Conversion from `u16` to `i64`. Always exact; kept for symmetry with
/// the other `exact_cast_*` functions and to centralize the `as` cast at
/// one call site.
#[inline]
pub fn exact_cast_u16_to_i64(value: u16) -> i64 {
    i64::from(value)
}

/// Conversion from `i16` to `i64`. Always exact; same symmetry reasoning
/// as [`exact_cast_u16_to_i64`].
#[inline]
pub fn exact_cast_i16_to_i64(value: i16) -> i64 {
    i64::from(value)
}
