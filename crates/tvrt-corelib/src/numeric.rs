//! Integer and float primitives with the dynamic language's semantics.
//!
//! Division rounds toward negative infinity, shifts accept any amount, and float to
//! integer conversions fail instead of saturating.

use tvrt_contracts::INT_BITS;

use crate::error::{ErrorKind, RuntimeError, SrcLoc};

const TWO_POW_63: f64 = 9_223_372_036_854_775_808.0;

/// Floor division. `n == -1` is handled by wrapping negation so `i64::MIN // -1`
/// does not trap.
#[inline]
pub fn int_div(m: i64, n: i64, loc: SrcLoc<'_>) -> Result<i64, RuntimeError> {
    if (n as u64).wrapping_add(1) <= 1 {
        if n == 0 {
            return Err(RuntimeError::new(ErrorKind::DivideByZero, loc));
        }
        return Ok(m.wrapping_neg());
    }
    let mut q = m / n;
    if (m ^ n) < 0 && m % n != 0 {
        q -= 1;
    }
    Ok(q)
}

/// Floor modulo; the result has the sign of `n`. Satisfies
/// `m == n * int_div(m, n) + int_mod(m, n)`.
#[inline]
pub fn int_mod(m: i64, n: i64, loc: SrcLoc<'_>) -> Result<i64, RuntimeError> {
    if (n as u64).wrapping_add(1) <= 1 {
        if n == 0 {
            return Err(RuntimeError::new(ErrorKind::ModuloByZero, loc));
        }
        return Ok(0);
    }
    let mut r = m % n;
    if r != 0 && (m ^ n) < 0 {
        r += n;
    }
    Ok(r)
}

// Negative amounts shift the other way; amounts of a full width or more give zero.

#[inline]
pub fn shl(x: i64, y: i64) -> i64 {
    if (y as u64) < INT_BITS as u64 {
        ((x as u64) << y) as i64
    } else if (y.wrapping_neg() as u64) < INT_BITS as u64 {
        ((x as u64) >> y.wrapping_neg()) as i64
    } else {
        0
    }
}

#[inline]
pub fn shr(x: i64, y: i64) -> i64 {
    if (y as u64) < INT_BITS as u64 {
        ((x as u64) >> y) as i64
    } else if (y.wrapping_neg() as u64) < INT_BITS as u64 {
        ((x as u64) << y.wrapping_neg()) as i64
    } else {
        0
    }
}

/// Exact float to integer conversion.
#[inline]
pub fn checked_to_int(d: f64, loc: SrcLoc<'_>) -> Result<i64, RuntimeError> {
    if libm::floor(d) == d && (-TWO_POW_63..TWO_POW_63).contains(&d) {
        Ok(d as i64)
    } else {
        Err(RuntimeError::new(ErrorKind::NumberToInteger, loc))
    }
}

#[inline]
pub fn ceil_to_int(n: f64, loc: SrcLoc<'_>) -> Result<i64, RuntimeError> {
    checked_to_int(libm::ceil(n), loc)
}

#[inline]
pub fn floor_to_int(n: f64, loc: SrcLoc<'_>) -> Result<i64, RuntimeError> {
    checked_to_int(libm::floor(n), loc)
}

/// Bases 10 and 2 use the dedicated routines, which are exact on powers of the base.
#[inline]
pub fn log(x: f64, base: f64) -> f64 {
    if base == 10.0 {
        libm::log10(x)
    } else if base == 2.0 {
        libm::log2(x)
    } else {
        libm::log(x) / libm::log(base)
    }
}

/// Splits `n` into its integral part (rounded toward zero) and fractional part.
#[inline]
pub fn modf(n: f64, loc: SrcLoc<'_>) -> Result<(i64, f64), RuntimeError> {
    let ip = if n < 0.0 { libm::ceil(n) } else { libm::floor(n) };
    // inf - inf would be NaN
    let frac = if n == ip { 0.0 } else { n - ip };
    Ok((checked_to_int(ip, loc)?, frac))
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOC: SrcLoc<'static> = SrcLoc::new("numeric.tl", 1);

    const SAMPLES: &[i64] = &[
        i64::MIN,
        i64::MIN + 1,
        -1_000_000_007,
        -65,
        -64,
        -7,
        -3,
        -2,
        -1,
        0,
        1,
        2,
        3,
        7,
        63,
        64,
        65,
        1_000_000_007,
        i64::MAX - 1,
        i64::MAX,
    ];

    #[test]
    fn div_mod_identity_and_mod_sign() {
        for &m in SAMPLES {
            for &n in SAMPLES {
                if n == 0 || n == -1 {
                    continue;
                }
                let q = int_div(m, n, LOC).unwrap();
                let r = int_mod(m, n, LOC).unwrap();
                assert_eq!(m, n.wrapping_mul(q).wrapping_add(r), "m={m} n={n}");
                assert!(r == 0 || (r < 0) == (n < 0), "m={m} n={n} r={r}");
                assert!(r.unsigned_abs() < n.unsigned_abs(), "m={m} n={n} r={r}");
            }
        }
    }

    #[test]
    fn floor_rounding_examples() {
        assert_eq!(int_div(7, 2, LOC).unwrap(), 3);
        assert_eq!(int_div(-7, 2, LOC).unwrap(), -4);
        assert_eq!(int_div(7, -2, LOC).unwrap(), -4);
        assert_eq!(int_div(-7, -2, LOC).unwrap(), 3);
        assert_eq!(int_mod(-7, 2, LOC).unwrap(), 1);
        assert_eq!(int_mod(7, -2, LOC).unwrap(), -1);
        assert_eq!(int_mod(-6, 3, LOC).unwrap(), 0);
    }

    #[test]
    fn zero_divisor_fails() {
        for &m in SAMPLES {
            let err = int_div(m, 0, LOC).unwrap_err();
            assert_eq!(err.kind, ErrorKind::DivideByZero);
            assert_eq!(err.line, 1);
            let err = int_mod(m, 0, LOC).unwrap_err();
            assert_eq!(err.kind, ErrorKind::ModuloByZero);
        }
    }

    #[test]
    fn minus_one_divisor_wraps() {
        assert_eq!(int_div(i64::MIN, -1, LOC).unwrap(), i64::MIN);
        assert_eq!(int_div(5, -1, LOC).unwrap(), -5);
        assert_eq!(int_mod(i64::MIN, -1, LOC).unwrap(), 0);
        assert_eq!(int_mod(5, -1, LOC).unwrap(), 0);
    }

    #[test]
    fn shifts_saturate_outside_width() {
        for &x in SAMPLES {
            for y in [64, 65, 1000, i64::MAX, -64, -65, -1000, i64::MIN] {
                assert_eq!(shl(x, y), 0, "x={x} y={y}");
                assert_eq!(shr(x, y), 0, "x={x} y={y}");
            }
        }
    }

    #[test]
    fn negative_shift_reverses_direction() {
        for &x in SAMPLES {
            for y in -63..=63 {
                assert_eq!(shl(x, y), shr(x, -y), "x={x} y={y}");
                assert_eq!(shr(x, y), shl(x, -y), "x={x} y={y}");
            }
        }
    }

    #[test]
    fn shifts_are_logical() {
        assert_eq!(shr(-1, 1), i64::MAX);
        assert_eq!(shr(-1, 63), 1);
        assert_eq!(shl(1, 63), i64::MIN);
        assert_eq!(shl(3, 1), 6);
        assert_eq!(shl(-1, 0), -1);
    }

    #[test]
    fn checked_to_int_rejects_inexact() {
        for d in [
            f64::NAN,
            f64::INFINITY,
            f64::NEG_INFINITY,
            0.5,
            -1.25,
            TWO_POW_63,
            -TWO_POW_63 * 2.0,
            1e300,
        ] {
            let err = checked_to_int(d, LOC).unwrap_err();
            assert_eq!(err.kind, ErrorKind::NumberToInteger, "d={d}");
        }
        assert_eq!(checked_to_int(-TWO_POW_63, LOC).unwrap(), i64::MIN);
        assert_eq!(checked_to_int(42.0, LOC).unwrap(), 42);
        assert_eq!(checked_to_int(-0.0, LOC).unwrap(), 0);
        assert_eq!(checked_to_int(9_007_199_254_740_992.0, LOC).unwrap(), 1 << 53);
    }

    #[test]
    fn ceil_and_floor() {
        assert_eq!(ceil_to_int(1.2, LOC).unwrap(), 2);
        assert_eq!(ceil_to_int(-1.2, LOC).unwrap(), -1);
        assert_eq!(floor_to_int(1.8, LOC).unwrap(), 1);
        assert_eq!(floor_to_int(-1.2, LOC).unwrap(), -2);
        assert!(floor_to_int(f64::NAN, LOC).is_err());
        assert!(ceil_to_int(1e19, LOC).is_err());
    }

    #[test]
    fn log_bases() {
        assert_eq!(log(1000.0, 10.0), 3.0);
        assert_eq!(log(1024.0, 2.0), 10.0);
        assert!((log(81.0, 3.0) - 4.0).abs() < 1e-12);
        assert_eq!(log(1.0, 7.0), 0.0);
    }

    #[test]
    fn modf_splits_toward_zero() {
        assert_eq!(modf(3.75, LOC).unwrap(), (3, 0.75));
        assert_eq!(modf(-3.75, LOC).unwrap(), (-3, -0.75));
        assert_eq!(modf(5.0, LOC).unwrap(), (5, 0.0));
        assert!(modf(f64::INFINITY, LOC).is_err());
        assert!(modf(f64::NAN, LOC).is_err());
    }
}
