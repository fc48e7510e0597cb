//! Exact rational arithmetic for computing `GridParameters` constants and
//! for parsing the CLI's numeric literals.
//!
//! Every computation here goes through [`num_rational::BigRational`]
//! before ever touching an `f64` again, so the only rounding that
//! happens is the one explicit [`round_toward`]/[`round_nearest`] call a
//! caller asked for. `f64` bit patterns are ordered the same as the
//! values they represent for non-negative finite floats, which is what
//! makes the bisection in [`round_toward`] correct: the smallest
//! representable value greater than a target and the largest
//! representable value not greater than it are adjacent bit patterns.

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{Float, Zero};
use std::cmp::Ordering;

/// Converts a finite, non-negative `f64` to the exact rational it
/// represents.
pub fn exact_rational_from_f64(value: f64) -> BigRational {
    assert!(value.is_finite(), "exact_rational_from_f64: {value} is not finite");
    let (mantissa, exponent, sign) = Float::integer_decode(value);
    let magnitude = if exponent >= 0 {
        BigRational::from_integer(BigInt::from(mantissa) * num_traits::pow(BigInt::from(2u32), exponent as usize))
    } else {
        BigRational::new(BigInt::from(mantissa), num_traits::pow(BigInt::from(2u32), (-exponent) as usize))
    };
    if sign < 0 {
        -magnitude
    } else {
        magnitude
    }
}

const POSITIVE_INFINITY_BITS: u64 = 0x7ff0_0000_0000_0000;

/// `None` stands for "value at this bit pattern is +infinity", which is
/// not itself representable as a finite rational.
fn value_at(bits: u64) -> Option<BigRational> {
    let value = f64::from_bits(bits);
    if value.is_finite() {
        Some(exact_rational_from_f64(value))
    } else {
        None
    }
}

/// The largest (if `round_up` is false) or smallest (if `round_up` is
/// true) representable `f64` that is, respectively, not greater than or
/// not less than `target`.
///
/// # Preconditions
/// `target` is non-negative and small enough to be bracketed by a
/// finite double (callers only ever feed grid-scale quantities through
/// this).
pub fn round_toward(target: &BigRational, round_up: bool) -> f64 {
    assert!(!target.is_negative_value(), "round_toward: {target} is negative");
    if target.is_zero() {
        return 0.0;
    }

    let mut lo: u64 = 0;
    let mut hi: u64 = POSITIVE_INFINITY_BITS;
    while hi - lo > 1 {
        let mid = lo + (hi - lo) / 2;
        let mid_not_greater = value_at(mid).map(|v| v <= *target).unwrap_or(false);
        if mid_not_greater {
            lo = mid;
        } else {
            hi = mid;
        }
    }

    if round_up {
        let lo_is_exact = value_at(lo).map(|v| v == *target).unwrap_or(false);
        if lo_is_exact {
            f64::from_bits(lo)
        } else {
            f64::from_bits(hi)
        }
    } else {
        f64::from_bits(lo)
    }
}

/// The representable `f64` closest to `target`, ties broken toward the
/// candidate with an even mantissa bit pattern.
pub fn round_nearest(target: &BigRational) -> f64 {
    if target.is_zero() {
        return 0.0;
    }
    if target.is_negative_value() {
        return -round_nearest(&(-target.clone()));
    }

    let down = round_toward(target, false);
    let up = round_toward(target, true);
    if down == up {
        return down;
    }

    let down_diff = target - exact_rational_from_f64(down);
    let up_diff = exact_rational_from_f64(up) - target;
    match down_diff.cmp(&up_diff) {
        Ordering::Less => down,
        Ordering::Greater => up,
        Ordering::Equal => {
            if down.to_bits() % 2 == 0 {
                down
            } else {
                up
            }
        }
    }
}

trait NegativeCheck {
    fn is_negative_value(&self) -> bool;
}
impl NegativeCheck for BigRational {
    fn is_negative_value(&self) -> bool {
        *self < BigRational::zero()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("'{0}' is not a valid decimal or hex-float literal")]
    Malformed(String),
    #[error("'{0}' is not exactly representable as a double; prefix with inexact: to allow rounding")]
    InexactLiteral(String),
}

fn digits_to_big_int(digits: &str, radix: u32) -> Option<BigInt> {
    if digits.is_empty() {
        return None;
    }
    BigInt::parse_bytes(digits.as_bytes(), radix)
}

/// Parses a plain decimal literal (`123`, `-1.5`, `2.5e10`) into the
/// exact rational it denotes.
fn parse_decimal(literal: &str) -> Result<BigRational, ParseError> {
    let malformed = || ParseError::Malformed(literal.to_string());

    let (negative, body) = match literal.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, literal.strip_prefix('+').unwrap_or(literal)),
    };
    let (mantissa, exponent_digits) = match body.split_once(['e', 'E']) {
        Some((m, e)) => (m, Some(e)),
        None => (body, None),
    };
    let (int_part, frac_part) = match mantissa.split_once('.') {
        Some((i, f)) => (i, f),
        None => (mantissa, ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return Err(malformed());
    }

    let digits: String = int_part.chars().chain(frac_part.chars()).collect();
    let numerator = digits_to_big_int(&digits, 10).ok_or_else(malformed)?;
    let exponent: i64 = match exponent_digits {
        Some(e) => e.parse().map_err(|_| malformed())?,
        None => 0,
    };
    let total_exponent = exponent - frac_part.len() as i64;

    let mut value = BigRational::from_integer(numerator);
    if total_exponent >= 0 {
        value *= BigRational::from_integer(num_traits::pow(BigInt::from(10u32), total_exponent as usize));
    } else {
        value /= BigRational::from_integer(num_traits::pow(BigInt::from(10u32), (-total_exponent) as usize));
    }
    Ok(if negative { -value } else { value })
}

/// Parses a C99-style hex-float literal (`0x1p32`, `0x1.8p-3`) into the
/// exact rational it denotes. Always exact: every hex digit is exactly
/// 4 bits and the exponent is a power of two.
fn parse_hex_float(literal: &str) -> Result<BigRational, ParseError> {
    let malformed = || ParseError::Malformed(literal.to_string());

    let (negative, body) = match literal.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, literal.strip_prefix('+').unwrap_or(literal)),
    };
    let body = body.strip_prefix("0x").or_else(|| body.strip_prefix("0X")).ok_or_else(malformed)?;
    let (mantissa, exponent_digits) = body.split_once(['p', 'P']).ok_or_else(malformed)?;
    let (int_part, frac_part) = match mantissa.split_once('.') {
        Some((i, f)) => (i, f),
        None => (mantissa, ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return Err(malformed());
    }

    let digits: String = int_part.chars().chain(frac_part.chars()).collect();
    let numerator = digits_to_big_int(&digits, 16).ok_or_else(malformed)?;
    let exponent: i64 = exponent_digits.parse().map_err(|_| malformed())?;
    let total_exponent = exponent - 4 * frac_part.len() as i64;

    let mut value = BigRational::from_integer(numerator);
    if total_exponent >= 0 {
        value *= BigRational::from_integer(num_traits::pow(BigInt::from(2u32), total_exponent as usize));
    } else {
        value /= BigRational::from_integer(num_traits::pow(BigInt::from(2u32), (-total_exponent) as usize));
    }
    Ok(if negative { -value } else { value })
}

fn is_hex_float(body: &str) -> bool {
    let unsigned = body.strip_prefix(['-', '+']).unwrap_or(body);
    unsigned.starts_with("0x") || unsigned.starts_with("0X")
}

/// Parses one of the generator's numeric CLI arguments: a decimal or
/// hex-float literal, optionally prefixed with `inexact:` to allow the
/// literal to round to the nearest representable `f64` instead of
/// requiring it to be exact.
pub fn parse_float(argument: &str) -> Result<f64, ParseError> {
    let (allow_inexact, literal) = match argument.strip_prefix("inexact:") {
        Some(rest) => (true, rest),
        None => (false, argument),
    };

    let exact = if is_hex_float(literal) { parse_hex_float(literal)? } else { parse_decimal(literal)? };
    let rounded = round_nearest(&exact);
    if !allow_inexact && exact_rational_from_f64(rounded) != exact {
        return Err(ParseError::InexactLiteral(argument.to_string()));
    }
    Ok(rounded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_rational_round_trips_simple_values() {
        assert_eq!(exact_rational_from_f64(0.5), BigRational::new(1.into(), 2.into()));
        assert_eq!(exact_rational_from_f64(2.0), BigRational::from_integer(2.into()));
    }

    #[test]
    fn round_toward_brackets_an_irrational_seeming_decimal() {
        // world_size / world_cells = 1.0e9 / 3, which f64 cannot hold exactly.
        let target = BigRational::new(BigInt::from(1_000_000_000u64), BigInt::from(3u64));
        let down = round_toward(&target, false);
        let up = round_toward(&target, true);
        assert!(down < up);
        assert!(exact_rational_from_f64(down) <= target);
        assert!(exact_rational_from_f64(up) >= target);
        // No representable double strictly between them.
        assert_eq!(up.to_bits(), down.to_bits() + 1);
    }

    #[test]
    fn round_toward_is_exact_for_powers_of_two() {
        let target = BigRational::from_integer(num_traits::pow(BigInt::from(2u32), 40));
        assert_eq!(round_toward(&target, false), round_toward(&target, true));
        assert_eq!(round_toward(&target, false), (1u64 << 40) as f64);
    }

    #[test]
    fn parse_float_accepts_exact_decimal() {
        assert_eq!(parse_float("1.5").unwrap(), 1.5);
        assert_eq!(parse_float("-2").unwrap(), -2.0);
    }

    #[test]
    fn parse_float_accepts_exact_hex_float() {
        assert_eq!(parse_float("0x1p32").unwrap(), (1u64 << 32) as f64);
        assert_eq!(parse_float("0x1.8p1").unwrap(), 3.0);
    }

    #[test]
    fn parse_float_rejects_inexact_decimal_without_prefix() {
        assert!(parse_float("0.1").is_err());
        assert!(parse_float("inexact:0.1").is_ok());
    }

    #[test]
    fn parse_float_rejects_malformed_literal() {
        assert!(parse_float("not-a-number").is_err());
        assert!(parse_float("0x").is_err());
    }
}
