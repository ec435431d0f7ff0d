//! Brent's method for bounded one-dimensional minimization.
//!
//! The solver keeps a bracket `[x_lower, x_upper]` around the current estimate `x_minimum` and
//! remembers the two previous best points `w` and `v`. Each iteration tries a parabola through
//! `(v, w, x_minimum)`; when the parabolic step would leave the bracket or is not shrinking fast
//! enough, it falls back to a golden-section step into the larger half.
//!
//! Before refining, the solver looks for an interior point whose value is below both ends of
//! the interval. The probes never leave `[lower, upper]`. If none is found within the probe
//! budget the last probe is used as the starting estimate anyway.
//!
//! ```
//! use minimization::scalar::Brent;
//! use minimization::Status;
//!
//! let res = Brent::default()
//!     .minimize(|x| (x - 3.5872).powi(2), 0.0, 5.0)
//!     .unwrap();
//! assert!((res.minimum - 3.5872).abs() < 1e-5);
//! assert_eq!(res.status, Status::Converged);
//! ```

use log::{debug, warn};

use crate::error::{Error, Result};
use crate::minimizer::{Minimizer, OptimResult, Status};
use crate::record::{IterationRecord, Recorder};
use crate::utils::{check_limit, check_tolerance};

/// `(3 - sqrt(5)) / 2`, the fraction of the interval a golden-section step moves.
pub(crate) const GOLDEN: f64 = 0.381_966_011_250_105_1;
const SQRT_EPSILON: f64 = 1.490_116_119_384_765_6e-8;

/// Configuration for Brent's minimizer.
#[derive(Builder, Debug, Clone, PartialEq)]
#[builder(default, build_fn(validate = "Self::validate", error = "Error"))]
pub struct Brent {
    /// Absolute tolerance on the width of the final bracket.
    pub epsilon: f64,
    /// Refinement iterations before the best estimate is returned as is.
    pub max_iterations: usize,
    /// Probes spent looking for an interior point below both ends of the interval.
    pub max_bracketing_evaluations: usize,
}

impl Default for Brent {
    fn default() -> Self {
        Brent {
            epsilon: 1e-6,
            max_iterations: 100,
            max_bracketing_evaluations: 10,
        }
    }
}

impl BrentBuilder {
    fn validate(&self) -> std::result::Result<(), String> {
        check_tolerance("epsilon", self.epsilon)?;
        check_limit("max_iterations", self.max_iterations)?;
        check_limit("max_bracketing_evaluations", self.max_bracketing_evaluations)
    }
}

impl Brent {
    /// Sets up a minimizer for an infallible function on `[lower, upper]`.
    pub fn minimizer<F>(
        &self,
        func: F,
        lower: f64,
        upper: f64,
    ) -> Result<BrentMinimizer<impl FnMut(f64) -> Result<f64>>>
    where
        F: Fn(f64) -> f64,
    {
        BrentMinimizer::new(move |x| Ok(func(x)), lower, upper, self)
    }

    /// Minimizes `func` on `[lower, upper]`.
    pub fn minimize<F>(&self, func: F, lower: f64, upper: f64) -> Result<OptimResult<f64>>
    where
        F: Fn(f64) -> f64,
    {
        self.minimizer(func, lower, upper)?.minimize()
    }
}

/// Stepping state of Brent's method.
///
/// The objective is fallible so that callers can thread their own budget through it; the first
/// error it returns aborts the current step.
pub struct BrentMinimizer<F, R = ()> {
    func: F,
    recorder: R,
    epsilon: f64,
    max_iterations: usize,
    max_bracketing_evaluations: usize,
    do_bracketing: bool,

    x_lower: f64,
    x_upper: f64,
    f_lower: f64,
    f_upper: f64,
    x_minimum: f64,
    f_minimum: f64,
    v: f64,
    w: f64,
    f_v: f64,
    f_w: f64,
    // last and second-to-last step lengths
    d: f64,
    e: f64,

    iterations: usize,
    evaluations: usize,
    status: Status,
}

impl<F> BrentMinimizer<F>
where
    F: FnMut(f64) -> Result<f64>,
{
    /// Evaluates both ends of the interval and a golden-section point inside it.
    pub fn new(func: F, lower: f64, upper: f64, config: &Brent) -> Result<Self> {
        if !(lower < upper) || !lower.is_finite() || !upper.is_finite() {
            return Err(Error::InvalidBounds { lower, upper });
        }
        let mut minimizer = BrentMinimizer {
            func,
            recorder: (),
            epsilon: config.epsilon,
            max_iterations: config.max_iterations,
            max_bracketing_evaluations: config.max_bracketing_evaluations,
            do_bracketing: true,
            x_lower: lower,
            x_upper: upper,
            f_lower: f64::NAN,
            f_upper: f64::NAN,
            x_minimum: f64::NAN,
            f_minimum: f64::NAN,
            v: f64::NAN,
            w: f64::NAN,
            f_v: f64::NAN,
            f_w: f64::NAN,
            d: 0.0,
            e: 0.0,
            iterations: 0,
            evaluations: 0,
            status: Status::Running,
        };
        minimizer.f_lower = minimizer.evaluate(lower)?;
        minimizer.f_upper = minimizer.evaluate(upper)?;
        let x = lower + GOLDEN * (upper - lower);
        let f_x = minimizer.evaluate(x)?;
        minimizer.restart_at(x, f_x);
        Ok(minimizer)
    }
}

impl<F, R> BrentMinimizer<F, R>
where
    F: FnMut(f64) -> Result<f64>,
    R: Recorder,
{
    /// Starts the refinement from `expected` instead of searching for an interior point.
    pub fn with_expected(mut self, expected: f64) -> Result<Self> {
        if !(self.x_lower < expected && expected < self.x_upper) {
            return Err(Error::InvalidConfig(format!(
                "expected point {} must lie strictly inside ({}, {})",
                expected, self.x_lower, self.x_upper
            )));
        }
        let f_expected = self.evaluate(expected)?;
        self.restart_at(expected, f_expected);
        self.do_bracketing = false;
        Ok(self)
    }

    /// Attaches a recorder that receives the bracket after every step.
    pub fn with_recorder<Q: Recorder>(self, recorder: Q) -> BrentMinimizer<F, Q> {
        BrentMinimizer {
            func: self.func,
            recorder,
            epsilon: self.epsilon,
            max_iterations: self.max_iterations,
            max_bracketing_evaluations: self.max_bracketing_evaluations,
            do_bracketing: self.do_bracketing,
            x_lower: self.x_lower,
            x_upper: self.x_upper,
            f_lower: self.f_lower,
            f_upper: self.f_upper,
            x_minimum: self.x_minimum,
            f_minimum: self.f_minimum,
            v: self.v,
            w: self.w,
            f_v: self.f_v,
            f_w: self.f_w,
            d: self.d,
            e: self.e,
            iterations: self.iterations,
            evaluations: self.evaluations,
            status: self.status,
        }
    }

    /// Current bracket around the minimum.
    pub fn bracket(&self) -> (f64, f64) {
        (self.x_lower, self.x_upper)
    }

    fn evaluate(&mut self, x: f64) -> Result<f64> {
        self.evaluations += 1;
        (self.func)(x)
    }

    fn restart_at(&mut self, x: f64, f_x: f64) {
        self.x_minimum = x;
        self.f_minimum = f_x;
        self.v = x;
        self.w = x;
        self.f_v = f_x;
        self.f_w = f_x;
        self.d = 0.0;
        self.e = 0.0;
        if self.is_converged() {
            self.status = Status::Converged;
        }
    }

    fn is_converged(&self) -> bool {
        let half_width = 0.5 * (self.x_upper - self.x_lower);
        half_width <= SQRT_EPSILON * self.x_minimum.abs() + 0.5 * self.epsilon
    }

    /// Shrinks the interval with golden-section probes until one probe lies below both ends.
    fn find_bracket(&mut self) -> Result<bool> {
        let (mut x_left, mut f_left) = (self.x_lower, self.f_lower);
        let (mut x_right, mut f_right) = (self.x_upper, self.f_upper);
        let mut x_center = x_left + GOLDEN * (x_right - x_left);
        let mut f_center = if x_center == self.x_minimum {
            self.f_minimum
        } else {
            self.evaluate(x_center)?
        };
        let mut probes = 1;

        let found = loop {
            if f_center < f_left && f_center < f_right {
                break true;
            }
            if probes >= self.max_bracketing_evaluations {
                break false;
            }
            if f_center < f_left {
                // the right end is at least as low: the minimum lies right of center
                x_left = x_center;
                f_left = f_center;
                x_center = x_right - GOLDEN * (x_right - x_left);
            } else {
                x_right = x_center;
                f_right = f_center;
                x_center = x_left + GOLDEN * (x_right - x_left);
            }
            f_center = self.evaluate(x_center)?;
            probes += 1;
        };

        debug!(
            "bracketing {} after {} probes: [{}, {}] around {}",
            if found { "succeeded" } else { "gave up" },
            probes,
            x_left,
            x_right,
            x_center
        );
        self.x_lower = x_left;
        self.f_lower = f_left;
        self.x_upper = x_right;
        self.f_upper = f_right;
        self.restart_at(x_center, f_center);
        Ok(found)
    }

    fn iterate(&mut self) -> Result<()> {
        let (x_left, x_right) = (self.x_lower, self.x_upper);
        let z = self.x_minimum;
        let (v, w) = (self.v, self.w);
        let (f_v, f_w, f_z) = (self.f_v, self.f_w, self.f_minimum);
        let mut d = self.e;
        let mut e = self.d;

        let w_lower = z - x_left;
        let w_upper = x_right - z;
        let tolerance = SQRT_EPSILON * z.abs();
        let midpoint = 0.5 * (x_left + x_right);

        let mut p = 0.0;
        let mut q = 0.0;
        let mut r = 0.0;
        if e.abs() > tolerance {
            // fit a parabola through v, w and z
            r = (z - w) * (f_z - f_v);
            q = (z - v) * (f_z - f_w);
            p = (z - v) * q - (z - w) * r;
            q = 2.0 * (q - r);
            if q > 0.0 {
                p = -p;
            } else {
                q = -q;
            }
            r = e;
            e = d;
        }

        if q != 0.0 && p.abs() < (0.5 * q * r).abs() && p < q * w_lower && p < q * w_upper {
            let t2 = 2.0 * tolerance;
            d = p / q;
            let u = z + d;
            if (u - x_left) < t2 || (x_right - u) < t2 {
                d = if z < midpoint { tolerance } else { -tolerance };
            }
        } else {
            e = if z < midpoint { x_right - z } else { -w_lower };
            d = GOLDEN * e;
        }

        let u = if d.abs() >= tolerance {
            z + d
        } else if d > 0.0 {
            z + tolerance
        } else {
            z - tolerance
        };
        self.e = e;
        self.d = d;

        let f_u = self.evaluate(u)?;

        if f_u <= f_z {
            if u < z {
                self.x_upper = z;
                self.f_upper = f_z;
            } else {
                self.x_lower = z;
                self.f_lower = f_z;
            }
            self.v = w;
            self.f_v = f_w;
            self.w = z;
            self.f_w = f_z;
            self.x_minimum = u;
            self.f_minimum = f_u;
        } else {
            if u < z {
                self.x_lower = u;
                self.f_lower = f_u;
            } else {
                self.x_upper = u;
                self.f_upper = f_u;
            }
            if f_u <= f_w || w == z {
                self.v = w;
                self.f_v = f_w;
                self.w = u;
                self.f_w = f_u;
            } else if f_u <= f_v || v == z || v == w {
                self.v = u;
                self.f_v = f_u;
            }
        }
        Ok(())
    }
}

impl<F, R> Minimizer for BrentMinimizer<F, R>
where
    F: FnMut(f64) -> Result<f64>,
    R: Recorder,
{
    type Point = f64;

    fn step(&mut self) -> Result<()> {
        if self.iterations >= self.max_iterations {
            self.status = Status::IterationLimitReached;
            return Ok(());
        }
        if self.do_bracketing {
            self.do_bracketing = false;
            self.find_bracket()?;
            if self.status == Status::Converged {
                return Ok(());
            }
        }
        self.iterations += 1;
        self.iterate()?;

        let width = self.x_upper - self.x_lower;
        debug!(
            "brent iteration {}: x = {}, f = {}, width = {}",
            self.iterations, self.x_minimum, self.f_minimum, width
        );
        self.recorder.record(IterationRecord::scalar(
            self.iterations,
            &[self.x_lower, self.x_upper],
            vec![self.f_lower, self.f_upper],
            vec![width, (self.f_upper - self.f_lower).abs()],
        ));

        if self.is_converged() {
            self.status = Status::Converged;
        } else if self.iterations >= self.max_iterations {
            warn!(
                "brent stopped after {} iterations with bracket width {}",
                self.iterations, width
            );
            self.status = Status::IterationLimitReached;
        }
        Ok(())
    }

    fn converging(&self) -> bool {
        self.status == Status::Running
    }

    fn minimum_point(&self) -> f64 {
        self.x_minimum
    }

    fn minimum_value(&self) -> f64 {
        self.f_minimum
    }

    fn iterations(&self) -> usize {
        self.iterations
    }

    fn evaluations(&self) -> usize {
        self.evaluations
    }

    fn status(&self) -> Status {
        self.status
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::approx_eq;

    fn shifted(x: f64) -> f64 {
        (x - 3.5872).powi(2)
    }

    #[test]
    fn quadratic() {
        let res = Brent::default().minimize(shifted, 0.0, 5.0).unwrap();
        assert_eq!(res.status, Status::Converged);
        assert!(approx_eq!(f64, res.minimum, 3.5872, epsilon = 1e-5));
        assert!(res.minimum_value < 1e-10);
    }

    #[test]
    fn final_bracket_satisfies_tolerance() {
        let config = BrentBuilder::default().epsilon(1e-8).build().unwrap();
        let mut minimizer = config.minimizer(|x: f64| x.cos(), 2.0, 5.0).unwrap();
        let res = minimizer.minimize().unwrap();
        let (lower, upper) = minimizer.bracket();
        assert!(lower <= res.minimum && res.minimum <= upper);
        assert!(0.5 * (upper - lower) <= SQRT_EPSILON * res.minimum.abs() + 0.5e-8);
        assert!(approx_eq!(
            f64,
            res.minimum,
            std::f64::consts::PI,
            epsilon = 1e-6
        ));
    }

    #[test]
    fn expected_point_skips_bracketing() {
        let config = Brent::default();
        let mut minimizer = config
            .minimizer(shifted, 0.0, 5.0)
            .unwrap()
            .with_expected(3.0)
            .unwrap();
        assert_eq!(minimizer.evaluations(), 4);
        assert_eq!(minimizer.minimum_point(), 3.0);
        let res = minimizer.minimize().unwrap();
        assert!(approx_eq!(f64, res.minimum, 3.5872, epsilon = 1e-5));

        let outside = config.minimizer(shifted, 0.0, 5.0).unwrap().with_expected(7.0);
        assert!(matches!(outside, Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn equal_end_values() {
        let res = Brent::default().minimize(|x| x * x, -1.0, 1.0).unwrap();
        assert_eq!(res.status, Status::Converged);
        assert!(approx_eq!(f64, res.minimum, 0.0, epsilon = 1e-6));
        assert!(res.minimum_value < 1e-12);
    }

    #[test]
    fn ties_move_the_estimate_to_the_new_point() {
        let mut minimizer = Brent::default()
            .minimizer(|_: f64| 2.0, 0.0, 1.0)
            .unwrap()
            .with_expected(0.5)
            .unwrap();
        minimizer.step().unwrap();
        // a golden step to the left with an equal value replaces the estimate
        assert_eq!(minimizer.bracket(), (0.0, 0.5));
        assert!(approx_eq!(
            f64,
            minimizer.minimum_point(),
            0.5 - GOLDEN * 0.5,
            epsilon = 1e-12
        ));
        assert_eq!(minimizer.minimum_value(), 2.0);

        let res = minimizer.minimize().unwrap();
        assert_eq!(res.status, Status::Converged);
        assert_eq!(res.minimum_value, 2.0);
    }

    #[test]
    fn monotone_function_runs_into_the_boundary() {
        let res = Brent::default().minimize(|x| x, -1.0, 1.0).unwrap();
        assert!(res.minimum < -1.0 + 1e-5);
        assert!(res.minimum >= -1.0);
    }

    #[test]
    fn iteration_cap_is_not_an_error() {
        let config = BrentBuilder::default().max_iterations(2).build().unwrap();
        let res = config.minimize(|x| (x - 0.1).abs().sqrt(), -10.0, 10.0).unwrap();
        assert_eq!(res.status, Status::IterationLimitReached);
        assert_eq!(res.iterations, 2);
    }

    #[test]
    fn records_one_bracket_per_iteration() {
        let mut log = Vec::new();
        let res = Brent::default()
            .minimizer(shifted, 0.0, 5.0)
            .unwrap()
            .with_recorder(&mut log)
            .minimize()
            .unwrap();
        assert_eq!(log.len(), res.iterations);
        let widths: Vec<f64> = log.iter().map(|r| r.deltas[0]).collect();
        assert!(widths.windows(2).all(|w| w[1] <= w[0]));
    }

    #[test]
    fn objective_errors_abort() {
        let mut calls = 0;
        let mut minimizer = BrentMinimizer::new(
            |x| {
                calls += 1;
                if calls > 5 {
                    Err(Error::EvaluationLimit(5))
                } else {
                    Ok(x * x)
                }
            },
            -1.0,
            2.0,
            &Brent::default(),
        )
        .unwrap();
        assert!(matches!(
            minimizer.minimize(),
            Err(Error::EvaluationLimit(5))
        ));
    }

    #[test]
    fn user_errors_surface_as_objective_errors() {
        let mut minimizer = BrentMinimizer::new(
            |x: f64| {
                if x > 1.0 {
                    Err(Error::Objective("outside the model's domain".into()))
                } else {
                    Ok(x * x)
                }
            },
            -1.0,
            1.0,
            &Brent::default(),
        )
        .unwrap()
        .with_expected(0.5)
        .unwrap();
        assert!(minimizer.minimize().is_ok());

        let res = BrentMinimizer::new(
            |x: f64| {
                if x > 1.0 {
                    Err(Error::Objective("outside the model's domain".into()))
                } else {
                    Ok(x * x)
                }
            },
            -1.0,
            2.0,
            &Brent::default(),
        );
        assert!(matches!(res, Err(Error::Objective(_))));
    }

    #[test]
    fn empty_interval_is_rejected() {
        assert!(matches!(
            Brent::default().minimize(shifted, 1.0, 1.0),
            Err(Error::InvalidBounds { .. })
        ));
    }
}
