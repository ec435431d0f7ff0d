//! Powell's conjugate-direction method.
//!
//! No derivatives are needed. An iteration minimizes along each of `n` directions in turn,
//! starting from the coordinate axes. It then tries the net displacement of the sweep as a new
//! direction: if extrapolating along it looks promising, the method minimizes along it and
//! swaps it in for the direction that produced the largest decrease.
//!
//! Line minimizations use Brent's method on the step length. Optional box bounds limit each
//! line search to the part of the line inside the box.

use log::debug;
use ndarray::prelude::*;

use crate::error::{Error, Result};
use crate::minimizer::{Minimizer, OptimResult, Status};
use crate::record::{IterationRecord, Recorder};
use crate::scalar::Brent;
use crate::utils::{check_limit, check_tolerance, WrappedFunction};
use crate::vector::line_search::{feasible_interval, line_minimize};

#[derive(Builder, Debug, Clone, PartialEq)]
#[builder(default, build_fn(validate = "Self::validate", error = "Error"))]
pub struct Powell {
    /// Relative decrease of the objective over one iteration that counts as converged.
    pub relative_threshold: f64,
    /// Absolute decrease of the objective over one iteration that counts as converged.
    pub absolute_threshold: f64,
    pub max_iterations: usize,
    #[builder(setter(into))]
    pub max_evaluations: Option<usize>,
    /// Largest step length tried along a direction in either sense.
    pub line_search_range: f64,
    /// Settings of the line minimizations.
    pub line_search: Brent,
}

impl Default for Powell {
    fn default() -> Self {
        Powell {
            relative_threshold: 0.1,
            absolute_threshold: 0.1,
            max_iterations: 100,
            max_evaluations: Some(100_000),
            line_search_range: 1e3,
            line_search: Brent {
                epsilon: 1e-8,
                ..Brent::default()
            },
        }
    }
}

impl PowellBuilder {
    fn validate(&self) -> std::result::Result<(), String> {
        check_tolerance("relative_threshold", self.relative_threshold)?;
        check_tolerance("absolute_threshold", self.absolute_threshold)?;
        check_limit("max_iterations", self.max_iterations)?;
        check_limit("max_evaluations", self.max_evaluations.flatten())?;
        match self.line_search_range {
            Some(range) if !(range > 0.0) => Err(format!(
                "line_search_range must be positive, got {}",
                range
            )),
            _ => Ok(()),
        }
    }
}

impl Powell {
    /// Sets up a search from `start`. Bounds default to the whole real line in every
    /// coordinate.
    pub fn minimizer<F>(
        &self,
        func: F,
        start: ArrayView1<f64>,
        lower: Option<ArrayView1<f64>>,
        upper: Option<ArrayView1<f64>>,
    ) -> Result<PowellMinimizer<F>>
    where
        F: Fn(ArrayView1<f64>) -> f64,
    {
        PowellMinimizer::new(func, start, lower, upper, self)
    }

    pub fn minimize<F>(
        &self,
        func: F,
        start: ArrayView1<f64>,
        lower: Option<ArrayView1<f64>>,
        upper: Option<ArrayView1<f64>>,
    ) -> Result<OptimResult<Array1<f64>>>
    where
        F: Fn(ArrayView1<f64>) -> f64,
    {
        self.minimizer(func, start, lower, upper)?.minimize()
    }
}

pub struct PowellMinimizer<F, R = ()> {
    func: WrappedFunction<F>,
    recorder: R,
    relative_threshold: f64,
    absolute_threshold: f64,
    max_iterations: usize,
    line_search_range: f64,
    line_search: Brent,
    lower: Array1<f64>,
    upper: Array1<f64>,

    /// One search direction per row.
    directions: Array2<f64>,
    x: Array1<f64>,
    f_val: f64,
    // start of the current sweep
    x1: Array1<f64>,
    x_minimum: Array1<f64>,
    f_minimum: f64,
    iterations: usize,
    converging: bool,
}

impl<F> PowellMinimizer<F>
where
    F: Fn(ArrayView1<f64>) -> f64,
{
    pub fn new(
        func: F,
        start: ArrayView1<f64>,
        lower: Option<ArrayView1<f64>>,
        upper: Option<ArrayView1<f64>>,
        config: &Powell,
    ) -> Result<Self> {
        let n = start.len();
        if n == 0 {
            return Err(Error::InvalidConfig(
                "start point must have at least one coordinate".to_string(),
            ));
        }
        let lower = lower.map_or_else(|| Array1::from_elem(n, f64::NEG_INFINITY), |l| l.to_owned());
        let upper = upper.map_or_else(|| Array1::from_elem(n, f64::INFINITY), |u| u.to_owned());
        for found in [lower.len(), upper.len()] {
            if found != n {
                return Err(Error::DimensionMismatch { expected: n, found });
            }
        }
        for i in 0..n {
            if !(lower[i] < upper[i]) {
                return Err(Error::InvalidBounds {
                    lower: lower[i],
                    upper: upper[i],
                });
            }
            if !(lower[i] <= start[i] && start[i] <= upper[i]) {
                return Err(Error::StartOutOfBounds {
                    index: i,
                    value: start[i],
                });
            }
        }

        let func = WrappedFunction::new(func, config.max_evaluations);
        let f_val = func.call(start)?;
        Ok(PowellMinimizer {
            func,
            recorder: (),
            relative_threshold: config.relative_threshold,
            absolute_threshold: config.absolute_threshold,
            max_iterations: config.max_iterations,
            line_search_range: config.line_search_range,
            line_search: config.line_search.clone(),
            lower,
            upper,
            directions: Array2::eye(n),
            x: start.to_owned(),
            f_val,
            x1: start.to_owned(),
            x_minimum: start.to_owned(),
            f_minimum: f_val,
            iterations: 0,
            converging: true,
        })
    }
}

impl<F, R> PowellMinimizer<F, R>
where
    F: Fn(ArrayView1<f64>) -> f64,
    R: Recorder,
{
    pub fn with_recorder<Q: Recorder>(self, recorder: Q) -> PowellMinimizer<F, Q> {
        PowellMinimizer {
            func: self.func,
            recorder,
            relative_threshold: self.relative_threshold,
            absolute_threshold: self.absolute_threshold,
            max_iterations: self.max_iterations,
            line_search_range: self.line_search_range,
            line_search: self.line_search,
            lower: self.lower,
            upper: self.upper,
            directions: self.directions,
            x: self.x,
            f_val: self.f_val,
            x1: self.x1,
            x_minimum: self.x_minimum,
            f_minimum: self.f_minimum,
            iterations: self.iterations,
            converging: self.converging,
        }
    }

    /// The current search directions, one per row.
    pub fn directions(&self) -> ArrayView2<f64> {
        self.directions.view()
    }

    /// Minimizes along `direction` from the current point and moves there. Returns the step.
    fn line_minimize(&mut self, direction: ArrayView1<f64>) -> Result<f64> {
        if direction.iter().all(|&d| d == 0.0) {
            return Ok(0.0);
        }
        let interval = feasible_interval(
            self.x.view(),
            direction,
            self.lower.view(),
            self.upper.view(),
            self.line_search_range,
        );
        let func = &self.func;
        let (alpha, value) = line_minimize(
            |x| func.call(x),
            self.x.view(),
            direction,
            interval,
            self.f_val,
            &self.line_search,
        )?;
        if alpha != 0.0 {
            self.x.scaled_add(alpha, &direction);
            self.f_val = value;
        }
        Ok(alpha)
    }
}

impl<F, R> Minimizer for PowellMinimizer<F, R>
where
    F: Fn(ArrayView1<f64>) -> f64,
    R: Recorder,
{
    type Point = Array1<f64>;

    fn step(&mut self) -> Result<()> {
        if self.iterations >= self.max_iterations {
            return Err(Error::IterationLimit(self.max_iterations));
        }
        self.iterations += 1;

        let n = self.x.len();
        let fx = self.f_val;
        let mut delta = 0.0;
        let mut big_ind = 0;
        for i in 0..n {
            let direction = self.directions.row(i).to_owned();
            let f_before = self.f_val;
            self.line_minimize(direction.view())?;
            if f_before - self.f_val > delta {
                delta = f_before - self.f_val;
                big_ind = i;
            }
        }

        self.converging = !(2.0 * (fx - self.f_val)
            <= self.relative_threshold * (fx.abs() + self.f_val.abs()) + self.absolute_threshold);
        if self.f_val < fx {
            self.x_minimum = self.x.clone();
            self.f_minimum = self.f_val;
        } else {
            self.x_minimum = self.x1.clone();
            self.f_minimum = fx;
        }

        let new_direction = &self.x - &self.x1;
        let extrapolated = &self.x * 2.0 - &self.x1;
        self.x1 = self.x.clone();
        let fx2 = self.func.call(extrapolated.view())?;

        if fx > fx2 {
            let a = fx - self.f_val - delta;
            let b = fx - fx2;
            let t = 2.0 * (fx - 2.0 * self.f_val + fx2) * a * a - delta * b * b;
            if t < 0.0 {
                let alpha = self.line_minimize(new_direction.view())?;
                if alpha != 0.0 {
                    let last = self.directions.row(n - 1).to_owned();
                    self.directions.row_mut(big_ind).assign(&last);
                    self.directions
                        .row_mut(n - 1)
                        .assign(&(&new_direction * alpha));
                }
                if self.f_val < self.f_minimum {
                    self.x_minimum = self.x.clone();
                    self.f_minimum = self.f_val;
                }
            }
        }

        debug!(
            "powell iteration {}: f = {}, largest decrease {} along direction {}",
            self.iterations, self.f_val, delta, big_ind
        );
        self.recorder.record(IterationRecord::vector(
            self.iterations,
            &[self.x.view(), extrapolated.view()],
            vec![self.f_val, fx2],
            vec![fx - self.f_val, delta],
        ));
        Ok(())
    }

    fn converging(&self) -> bool {
        self.converging
    }

    fn minimum_point(&self) -> Array1<f64> {
        self.x_minimum.clone()
    }

    fn minimum_value(&self) -> f64 {
        self.f_minimum
    }

    fn iterations(&self) -> usize {
        self.iterations
    }

    fn evaluations(&self) -> usize {
        self.func.num()
    }

    fn status(&self) -> Status {
        if self.converging {
            Status::Running
        } else {
            Status::Converged
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::approx_eq;

    fn shifted(x: ArrayView1<f64>) -> f64 {
        (x[0] - 1.0).powi(2) + (x[1] + 2.0).powi(2) + (x[2] - 0.5).powi(2)
    }

    fn rosenbrock(x: ArrayView1<f64>) -> f64 {
        (1.0 - x[0]).powi(2) + 100.0 * (x[1] - x[0].powi(2)).powi(2)
    }

    #[test]
    fn separable_quadratic() {
        let res = Powell::default()
            .minimize(shifted, Array1::zeros(3).view(), None, None)
            .unwrap();
        assert_eq!(res.status, Status::Converged);
        for (found, expected) in res.minimum.iter().zip(&[1.0, -2.0, 0.5]) {
            assert!(approx_eq!(f64, *found, *expected, epsilon = 1e-6));
        }
    }

    #[test]
    fn rosenbrock_with_tight_thresholds() {
        let config = PowellBuilder::default()
            .relative_threshold(1e-12)
            .absolute_threshold(1e-14)
            .max_iterations(1000)
            .build()
            .unwrap();
        let res = config
            .minimize(rosenbrock, arr1(&[-1.2, 1.0]).view(), None, None)
            .unwrap();
        assert!(approx_eq!(f64, res.minimum[0], 1.0, epsilon = 1e-3));
        assert!(approx_eq!(f64, res.minimum[1], 1.0, epsilon = 1e-3));
    }

    #[test]
    fn bounds_clamp_the_line_searches() {
        let lower = arr1(&[2.0, -1.0, -1.0]);
        let upper = arr1(&[3.0, 1.0, 1.0]);
        let res = Powell::default()
            .minimize(
                shifted,
                arr1(&[2.5, 0.0, 0.0]).view(),
                Some(lower.view()),
                Some(upper.view()),
            )
            .unwrap();
        assert!(approx_eq!(f64, res.minimum[0], 2.0, epsilon = 1e-6));
        assert!(approx_eq!(f64, res.minimum[1], -1.0, epsilon = 1e-6));
        assert!(approx_eq!(f64, res.minimum[2], 0.5, epsilon = 1e-6));
    }

    #[test]
    fn invalid_input_is_rejected() {
        let config = Powell::default();
        let start = arr1(&[0.0, 0.0]);
        let res = config.minimizer(shifted, start.view(), Some(arr1(&[0.0]).view()), None);
        assert!(matches!(
            res,
            Err(Error::DimensionMismatch {
                expected: 2,
                found: 1
            })
        ));
        let res = config.minimizer(
            shifted,
            start.view(),
            Some(arr1(&[0.0, 1.0]).view()),
            Some(arr1(&[1.0, 1.0]).view()),
        );
        assert!(matches!(res, Err(Error::InvalidBounds { .. })));
        let res = config.minimizer(
            shifted,
            start.view(),
            Some(arr1(&[0.5, -1.0]).view()),
            Some(arr1(&[1.0, 1.0]).view()),
        );
        assert!(matches!(
            res,
            Err(Error::StartOutOfBounds { index: 0, .. })
        ));
    }

    #[test]
    fn evaluation_budget_aborts_line_search() {
        let config = PowellBuilder::default()
            .max_evaluations(15)
            .build()
            .unwrap();
        let res = config.minimize(rosenbrock, arr1(&[-1.2, 1.0]).view(), None, None);
        assert!(matches!(res, Err(Error::EvaluationLimit(15))));
    }

    #[test]
    fn iteration_budget_is_a_hard_limit() {
        let config = PowellBuilder::default()
            .relative_threshold(0.0)
            .absolute_threshold(0.0)
            .max_iterations(2)
            .build()
            .unwrap();
        let res = config.minimize(rosenbrock, arr1(&[-1.2, 1.0]).view(), None, None);
        assert!(matches!(res, Err(Error::IterationLimit(2))));
    }

    #[test]
    fn directions_stay_non_degenerate() {
        let config = PowellBuilder::default()
            .relative_threshold(1e-10)
            .absolute_threshold(1e-12)
            .build()
            .unwrap();
        let mut minimizer = config
            .minimizer(
                |x: ArrayView1<f64>| (x[0] + x[1] - 1.0).powi(2) + 0.1 * (x[0] - x[1]).powi(2),
                arr1(&[3.0, -4.0]).view(),
                None,
                None,
            )
            .unwrap();
        let res = minimizer.minimize().unwrap();
        for row in minimizer.directions().outer_iter() {
            assert!(row.iter().any(|&d| d != 0.0));
        }
        assert!(approx_eq!(f64, res.minimum[0], 0.5, epsilon = 1e-5));
        assert!(approx_eq!(f64, res.minimum[1], 0.5, epsilon = 1e-5));
    }
}
