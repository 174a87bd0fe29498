//! Numeric `for` loops.
//!
//! The integer iteration count is computed up front in unsigned arithmetic, so loops
//! that run up to `i64::MAX` or down to `i64::MIN` end without overflowing the loop
//! variable. Bounds are read once when the range is built.

use std::iter::FusedIterator;
use std::ops::ControlFlow;

use crate::error::{ErrorKind, RuntimeError, SrcLoc};

#[derive(Clone, Debug)]
pub struct IntRange {
    value: i64,
    step: i64,
    /// Values left after `value`; `None` once exhausted.
    remaining: Option<u64>,
}

impl IntRange {
    pub fn new(
        init: i64,
        limit: i64,
        step: i64,
        loc: SrcLoc<'_>,
    ) -> Result<IntRange, RuntimeError> {
        if step == 0 {
            return Err(RuntimeError::new(ErrorKind::ZeroStep, loc));
        }
        let remaining = if step > 0 {
            (init <= limit).then(|| (limit as u64).wrapping_sub(init as u64) / step as u64)
        } else {
            // -(step + 1) cannot overflow, even for i64::MIN
            let divisor = (-(step + 1)) as u64 + 1;
            (init >= limit).then(|| (init as u64).wrapping_sub(limit as u64) / divisor)
        };
        Ok(IntRange {
            value: init,
            step,
            remaining,
        })
    }
}

impl Iterator for IntRange {
    type Item = i64;

    #[inline]
    fn next(&mut self) -> Option<i64> {
        let remaining = self.remaining?;
        let v = self.value;
        if remaining == 0 {
            self.remaining = None;
        } else {
            self.remaining = Some(remaining - 1);
            self.value = v.wrapping_add(self.step);
        }
        Some(v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self.remaining {
            None => (0, Some(0)),
            Some(r) => match usize::try_from(r).ok().and_then(|r| r.checked_add(1)) {
                Some(n) => (n, Some(n)),
                None => (usize::MAX, None),
            },
        }
    }
}

impl FusedIterator for IntRange {}

#[derive(Clone, Debug)]
pub struct FloatRange {
    value: f64,
    limit: f64,
    step: f64,
}

impl FloatRange {
    pub fn new(
        init: f64,
        limit: f64,
        step: f64,
        loc: SrcLoc<'_>,
    ) -> Result<FloatRange, RuntimeError> {
        if step == 0.0 {
            return Err(RuntimeError::new(ErrorKind::ZeroStep, loc));
        }
        Ok(FloatRange {
            value: init,
            limit,
            step,
        })
    }

    fn in_range(&self) -> bool {
        if self.step > 0.0 {
            self.value <= self.limit
        } else {
            self.value >= self.limit
        }
    }
}

impl Iterator for FloatRange {
    type Item = f64;

    #[inline]
    fn next(&mut self) -> Option<f64> {
        if !self.in_range() {
            return None;
        }
        let v = self.value;
        self.value += self.step;
        Some(v)
    }
}

/// Runs `body` for each value of `for i = init, limit, step`. A `Break` from the body
/// stops the loop and is handed back to the caller.
pub fn int_for<B>(
    init: i64,
    limit: i64,
    step: i64,
    loc: SrcLoc<'_>,
    body: impl FnMut(i64) -> ControlFlow<B>,
) -> Result<ControlFlow<B>, RuntimeError> {
    Ok(IntRange::new(init, limit, step, loc)?.try_for_each(body))
}

pub fn float_for<B>(
    init: f64,
    limit: f64,
    step: f64,
    loc: SrcLoc<'_>,
    body: impl FnMut(f64) -> ControlFlow<B>,
) -> Result<ControlFlow<B>, RuntimeError> {
    Ok(FloatRange::new(init, limit, step, loc)?.try_for_each(body))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ints(init: i64, limit: i64, step: i64) -> Vec<i64> {
        IntRange::new(init, limit, step, SrcLoc::NONE).unwrap().collect()
    }

    #[test]
    fn counts_down_by_two() {
        assert_eq!(ints(5, 1, -2), vec![5, 3, 1]);
        assert_eq!(ints(1, 10, 3), vec![1, 4, 7, 10]);
        assert_eq!(ints(1, 3, 1), vec![1, 2, 3]);
    }

    #[test]
    fn empty_when_bounds_are_reversed() {
        assert!(ints(1, 0, 1).is_empty());
        assert!(ints(0, 1, -1).is_empty());
        let r = IntRange::new(3, 2, 1, SrcLoc::NONE).unwrap();
        assert_eq!(r.size_hint(), (0, Some(0)));
    }

    #[test]
    fn zero_step_fails_before_any_value() {
        let mut calls = 0;
        let err = int_for(1, 10, 0, SrcLoc::new("loop.tl", 4), |_| {
            calls += 1;
            ControlFlow::<()>::Continue(())
        })
        .unwrap_err();
        assert_eq!(calls, 0);
        assert_eq!(err.kind, ErrorKind::ZeroStep);
        assert_eq!(err.to_string(), "file loop.tl: line 4: 'for' step is zero");

        let err = FloatRange::new(0.0, 1.0, 0.0, SrcLoc::NONE).unwrap_err();
        assert_eq!(err.kind, ErrorKind::ZeroStep);
    }

    #[test]
    fn extreme_bounds_terminate() {
        assert_eq!(ints(i64::MAX - 1, i64::MAX, 1), vec![i64::MAX - 1, i64::MAX]);
        assert_eq!(ints(i64::MIN + 1, i64::MIN, -1), vec![i64::MIN + 1, i64::MIN]);
        assert_eq!(ints(i64::MAX - 5, i64::MAX, 4), vec![i64::MAX - 5, i64::MAX - 1]);
        assert_eq!(ints(i64::MIN, i64::MIN, i64::MIN), vec![i64::MIN]);
        assert_eq!(ints(0, i64::MIN, i64::MIN), vec![0, i64::MIN]);
        assert_eq!(ints(i64::MAX, i64::MIN, i64::MIN), vec![i64::MAX, -1]);
        assert_eq!(ints(i64::MIN, i64::MAX, i64::MAX), vec![i64::MIN, -1, i64::MAX - 1]);
    }

    #[test]
    fn size_hint_is_exact() {
        let r = IntRange::new(1, 100, 7, SrcLoc::NONE).unwrap();
        assert_eq!(r.size_hint(), (15, Some(15)));
        assert_eq!(r.count(), 15);
    }

    #[test]
    fn float_steps_within_tolerance() {
        let got: Vec<f64> = FloatRange::new(0.0, 1.0, 0.3, SrcLoc::NONE)
            .unwrap()
            .collect();
        let want = [0.0, 0.3, 0.6, 0.9];
        assert_eq!(got.len(), want.len());
        for (g, w) in got.iter().zip(want) {
            assert!((g - w).abs() < 1e-9, "{g} vs {w}");
        }

        let down: Vec<f64> = FloatRange::new(1.0, 0.0, -0.5, SrcLoc::NONE)
            .unwrap()
            .collect();
        assert_eq!(down, vec![1.0, 0.5, 0.0]);
        assert_eq!(FloatRange::new(f64::NAN, 1.0, 1.0, SrcLoc::NONE).unwrap().count(), 0);
    }

    #[test]
    fn break_stops_iteration() {
        let mut seen = Vec::new();
        let out = int_for(1, 1_000_000, 1, SrcLoc::NONE, |i| {
            seen.push(i);
            if i == 3 {
                ControlFlow::Break("found")
            } else {
                ControlFlow::Continue(())
            }
        })
        .unwrap();
        assert_eq!(out, ControlFlow::Break("found"));
        assert_eq!(seen, vec![1, 2, 3]);

        let mut sum = 0.0;
        let out = float_for(0.5, 2.0, 0.5, SrcLoc::NONE, |x| {
            sum += x;
            ControlFlow::<()>::Continue(())
        })
        .unwrap();
        assert_eq!(out, ControlFlow::Continue(()));
        assert_eq!(sum, 5.0);
    }
}
