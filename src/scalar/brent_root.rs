//! Brent–Dekker root finder.
//!
//! Combines bisection, secant steps and inverse quadratic interpolation. The caller supplies an
//! interval whose end values differ in sign; every step keeps a sign change between the current
//! estimate `b` and the contrapoint `c`, so the bracket never widens. Interpolated steps are
//! accepted only when they stay inside the bracket and shrink faster than bisection would.
//!
//! The conjugate-gradient minimizer uses this to find where the directional derivative vanishes.

use std::convert::Infallible;

use log::{trace, warn};

use crate::error::Error;
use crate::minimizer::Status;
use crate::utils::{check_limit, check_tolerance};

const DEFAULT_ACCURACY: f64 = 1e-9;
const DEFAULT_MAX_ITERATIONS: usize = 10_000;

/// Settings for [`BrentRootFinder::find_root`].
#[derive(Builder, Debug, Clone, PartialEq)]
#[builder(default, build_fn(validate = "Self::validate", error = "Error"))]
pub struct BrentRootFinder {
    /// Absolute accuracy on the root location.
    pub absolute_accuracy: f64,
    /// Accuracy relative to the magnitude of the estimate.
    pub relative_accuracy: f64,
    /// A function value below this in magnitude counts as a root.
    pub function_epsilon: f64,
    pub max_iterations: usize,
}

impl Default for BrentRootFinder {
    fn default() -> Self {
        BrentRootFinder {
            absolute_accuracy: DEFAULT_ACCURACY,
            relative_accuracy: DEFAULT_ACCURACY,
            function_epsilon: DEFAULT_ACCURACY,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

impl BrentRootFinderBuilder {
    fn validate(&self) -> Result<(), String> {
        check_tolerance("absolute_accuracy", self.absolute_accuracy)?;
        check_tolerance("relative_accuracy", self.relative_accuracy)?;
        check_tolerance("function_epsilon", self.function_epsilon)?;
        check_limit("max_iterations", self.max_iterations)
    }
}

/// The outcome of a root search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Root {
    pub x: f64,
    /// Function value at `x`.
    pub value: f64,
    pub iterations: usize,
    pub evaluations: usize,
    /// Whether the end values differed in sign. When they did not, `status` can still be
    /// `Converged` because the bracket collapsed, but `x` need not be a root; check `value`.
    pub bracketed: bool,
    /// `IterationLimitReached` when the search was cut short; `x` is then the best estimate.
    pub status: Status,
}

impl BrentRootFinder {
    /// Finds a root of `func` in `[lower, upper]`.
    ///
    /// The end values should differ in sign. When they do not, the search still terminates but
    /// the estimate is only the end with the smaller magnitude and [`Root::bracketed`] is false.
    pub fn find_root<F>(&self, func: F, lower: f64, upper: f64) -> Root
    where
        F: Fn(f64) -> f64,
    {
        match self.try_find_root(|x| Ok::<f64, Infallible>(func(x)), lower, upper) {
            Ok(root) => root,
            Err(never) => match never {},
        }
    }

    /// Like [`find_root`](BrentRootFinder::find_root) for a fallible function. The first error
    /// returned by `func` aborts the search and is passed through unchanged.
    pub fn try_find_root<F, E>(&self, mut func: F, lower: f64, upper: f64) -> Result<Root, E>
    where
        F: FnMut(f64) -> Result<f64, E>,
    {
        let mut a = lower;
        let mut fa = func(a)?;
        let mut b = upper;
        let mut fb = func(b)?;
        let bracketed = fa * fb <= 0.0;
        if !bracketed {
            warn!("no sign change between f({}) = {} and f({}) = {}", a, fa, b, fb);
        }
        let mut c = a;
        let mut fc = fa;
        let mut d = b - a;
        let mut e = d;
        let mut evaluations = 2;
        let mut iterations = 0;

        loop {
            if fc.abs() < fb.abs() {
                a = b;
                b = c;
                c = a;
                fa = fb;
                fb = fc;
                fc = fa;
            }

            let tolerance = 2.0 * self.relative_accuracy * b.abs() + self.absolute_accuracy;
            let m = 0.5 * (c - b);

            if m.abs() <= tolerance || fb.abs() < self.function_epsilon {
                trace!("root {} found after {} iterations", b, iterations);
                return Ok(Root {
                    x: b,
                    value: fb,
                    iterations,
                    evaluations,
                    bracketed,
                    status: Status::Converged,
                });
            }
            if iterations >= self.max_iterations {
                warn!(
                    "root search stopped after {} iterations with bracket half-width {}",
                    iterations,
                    m.abs()
                );
                return Ok(Root {
                    x: b,
                    value: fb,
                    iterations,
                    evaluations,
                    bracketed,
                    status: Status::IterationLimitReached,
                });
            }
            iterations += 1;

            if e.abs() < tolerance || fa.abs() <= fb.abs() {
                // bisection
                d = m;
                e = d;
            } else {
                let mut s = fb / fa;
                let mut p;
                let mut q;
                if a == c {
                    // secant
                    p = 2.0 * m * s;
                    q = 1.0 - s;
                } else {
                    // inverse quadratic interpolation
                    q = fa / fc;
                    let r = fb / fc;
                    p = s * (2.0 * m * q * (q - r) - (b - a) * (r - 1.0));
                    q = (q - 1.0) * (r - 1.0) * (s - 1.0);
                }
                if p > 0.0 {
                    q = -q;
                } else {
                    p = -p;
                }
                s = e;
                e = d;
                if p >= 1.5 * m * q - (tolerance * q).abs() || p >= (0.5 * s * q).abs() {
                    // interpolation would leave the bracket or converge too slowly
                    d = m;
                    e = d;
                } else {
                    d = p / q;
                }
            }

            a = b;
            fa = fb;
            if d.abs() > tolerance {
                b += d;
            } else if m > 0.0 {
                b += tolerance;
            } else {
                b -= tolerance;
            }
            fb = func(b)?;
            evaluations += 1;

            if (fb > 0.0 && fc > 0.0) || (fb <= 0.0 && fc <= 0.0) {
                c = a;
                fc = fa;
                d = b - a;
                e = d;
            }
        }
    }
}
