//! One-dimensional searches along a direction, shared by the direction-based minimizers.

use log::trace;
use ndarray::prelude::*;

use crate::error::{Error, Result};
use crate::minimizer::Minimizer;
use crate::scalar::{Brent, BrentMinimizer};

/// Finds `b > start` where `g(b)` has the opposite sign of `g(start)`.
///
/// The step grows by at least a factor of two every probe, and by `g(a) / g(b)` when the values
/// shrink only slowly. Gives up with [`Error::BracketingFailed`] once the step overflows.
pub fn find_upper_bound<G>(mut g: G, start: f64, initial_step: f64) -> Result<f64>
where
    G: FnMut(f64) -> Result<f64>,
{
    let ya = g(start)?;
    let mut step = initial_step;
    while step < f64::MAX {
        let b = start + step;
        let yb = g(b)?;
        if ya * yb <= 0.0 {
            trace!("sign change bracketed in [{}, {}]", start, b);
            return Ok(b);
        }
        step *= f64::max(2.0, ya / yb);
    }
    Err(Error::BracketingFailed)
}

/// Range of `alpha` for which `point + alpha * direction` stays inside `[lower, upper]`,
/// intersected with `[-range, range]`.
pub fn feasible_interval(
    point: ArrayView1<f64>,
    direction: ArrayView1<f64>,
    lower: ArrayView1<f64>,
    upper: ArrayView1<f64>,
    range: f64,
) -> (f64, f64) {
    let mut lo = -range;
    let mut hi = range;
    for i in 0..point.len() {
        let d = direction[i];
        if d == 0.0 {
            continue;
        }
        let a = (lower[i] - point[i]) / d;
        let b = (upper[i] - point[i]) / d;
        lo = lo.max(a.min(b));
        hi = hi.min(a.max(b));
    }
    (lo, hi)
}

/// Minimizes `func` along `point + alpha * direction` for `alpha` in `interval` with Brent's
/// method. Returns the step and the value there, or `(0.0, current)` when no step improves on
/// `current`.
pub fn line_minimize<F>(
    func: F,
    point: ArrayView1<f64>,
    direction: ArrayView1<f64>,
    interval: (f64, f64),
    current: f64,
    config: &Brent,
) -> Result<(f64, f64)>
where
    F: Fn(ArrayView1<f64>) -> Result<f64>,
{
    let (lo, hi) = interval;
    if !(lo < hi) {
        return Ok((0.0, current));
    }
    let along = |alpha: f64| {
        let x = &point + &(&direction * alpha);
        func(x.view())
    };
    let res = BrentMinimizer::new(along, lo, hi, config)?.minimize()?;
    trace!(
        "line minimum at alpha = {} in [{}, {}]: {} -> {}",
        res.minimum,
        lo,
        hi,
        current,
        res.minimum_value
    );
    if res.minimum_value < current {
        Ok((res.minimum, res.minimum_value))
    } else {
        Ok((0.0, current))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::approx_eq;

    #[test]
    fn upper_bound_brackets_sign_change() {
        let ub = find_upper_bound(|a| Ok(a - 3.0), 0.0, 1.0).unwrap();
        assert!(ub >= 3.0);
        let ub = find_upper_bound(|a| Ok(a - 0.25), 0.0, 1.0).unwrap();
        assert_eq!(ub, 1.0);
    }

    #[test]
    fn upper_bound_fails_without_sign_change() {
        let res = find_upper_bound(|_| Ok(-1.0), 0.0, 1.0);
        assert!(matches!(res, Err(Error::BracketingFailed)));
    }

    #[test]
    fn interval_respects_bounds_and_range() {
        let x = arr1(&[0.5, 0.0]);
        let lower = arr1(&[0.0, f64::NEG_INFINITY]);
        let upper = arr1(&[1.0, f64::INFINITY]);
        let dir = arr1(&[1.0, 0.0]);
        let (lo, hi) = feasible_interval(x.view(), dir.view(), lower.view(), upper.view(), 1e3);
        assert_eq!((lo, hi), (-0.5, 0.5));

        let dir = arr1(&[0.0, -2.0]);
        let (lo, hi) = feasible_interval(x.view(), dir.view(), lower.view(), upper.view(), 1e3);
        assert_eq!((lo, hi), (-1e3, 1e3));
    }

    #[test]
    fn line_minimum_of_a_quadratic() {
        let x = arr1(&[0.0, 0.0]);
        let dir = arr1(&[1.0, 1.0]);
        let (alpha, value) = line_minimize(
            |x| Ok((x[0] - 2.0).powi(2) + (x[1] - 2.0).powi(2)),
            x.view(),
            dir.view(),
            (-10.0, 10.0),
            8.0,
            &Brent::default(),
        )
        .unwrap();
        assert!(approx_eq!(f64, alpha, 2.0, epsilon = 1e-5));
        assert!(value < 1e-9);
    }

    #[test]
    fn no_improvement_keeps_the_point() {
        let x = arr1(&[0.0]);
        let dir = arr1(&[1.0]);
        let res = line_minimize(
            |x| Ok(x[0].abs()),
            x.view(),
            dir.view(),
            (-1.0, 1.0),
            0.0,
            &Brent::default(),
        );
        assert_eq!(res.unwrap(), (0.0, 0.0));
    }
}
