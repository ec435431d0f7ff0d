//! Golden section is to minimization what bisection is to root finding.
//! It searches within an interval for a local minimum. At every iteration
//! the interval shrinks by a constant factor until it is narrower than the
//! requested precision.
//!
//! The target function is known at 4 points:
//!         +---------+----+---------+
//! iter 1  x0        x1   x2        x3
//! The interval for the next iteration is [x0,x2] if f(x1)<=f(x2), and
//! [x1,x3] otherwise. The spacing is chosen so that 3 of the 4 points are
//! reused and a single new evaluation is needed per iteration. If the
//! right inner point is lower this looks like:
//!         +---------+----+---------+
//! iter 1  x0        x1   x2        x3
//!                   +----+----+----+
//! iter 2            x0   x1   x2   x3

use log::debug;

use crate::error::{Error, Result};
use crate::minimizer::{Minimizer, OptimResult, Status};
use crate::record::{IterationRecord, Recorder};
use crate::scalar::brent::GOLDEN;
use crate::utils::{check_limit, check_tolerance};

#[derive(Builder, Debug, Clone, PartialEq)]
#[builder(default, build_fn(validate = "Self::validate", error = "Error"))]
pub struct GoldenSection {
    /// The width of the interval at which convergence is satisfactory.
    /// Smaller is more precise.
    pub epsilon: f64,

    /// The maximum number of iterations before the search terminates
    /// with its best estimate.
    pub max_iterations: usize,
}

impl Default for GoldenSection {
    fn default() -> Self {
        GoldenSection {
            epsilon: 1e-6,
            max_iterations: 100,
        }
    }
}

impl GoldenSectionBuilder {
    fn validate(&self) -> std::result::Result<(), String> {
        check_tolerance("epsilon", self.epsilon)?;
        check_limit("max_iterations", self.max_iterations)
    }
}

impl GoldenSection {
    /// Sets up a search for the minimum of `func` between `lower` and `upper`.
    pub fn minimizer<F>(&self, func: F, lower: f64, upper: f64) -> Result<GoldenSectionMinimizer<F>>
    where
        F: Fn(f64) -> f64,
    {
        GoldenSectionMinimizer::new(func, lower, upper, self)
    }

    /// The main minimization routine. Searches for the minimum of `func`
    /// between `lower` and `upper`.
    pub fn minimize<F>(&self, func: F, lower: f64, upper: f64) -> Result<OptimResult<f64>>
    where
        F: Fn(f64) -> f64,
    {
        self.minimizer(func, lower, upper)?.minimize()
    }
}

pub struct GoldenSectionMinimizer<F, R = ()> {
    func: F,
    recorder: R,
    epsilon: f64,
    max_iterations: usize,
    x: [f64; 4],
    f1: f64,
    f2: f64,
    iterations: usize,
    evaluations: usize,
}

impl<F: Fn(f64) -> f64> GoldenSectionMinimizer<F> {
    /// Places the inner points at the golden-section point of `[lower, upper]`.
    pub fn new(func: F, lower: f64, upper: f64, config: &GoldenSection) -> Result<Self> {
        if !(lower < upper) {
            return Err(Error::InvalidBounds { lower, upper });
        }
        Ok(Self::with_expected(
            func,
            lower,
            upper,
            lower + GOLDEN * (upper - lower),
            config,
        ))
    }

    /// Uses `expected` as one of the two inner points; the other one goes into the larger
    /// remaining part of the interval. `expected` is clamped into `[lower, upper]`.
    pub fn with_expected(
        func: F,
        lower: f64,
        upper: f64,
        expected: f64,
        config: &GoldenSection,
    ) -> Self {
        let expected = expected.max(lower).min(upper);
        let (x1, x2) = if (upper - expected).abs() > (expected - lower).abs() {
            (expected, expected + GOLDEN * (upper - expected))
        } else {
            (expected - GOLDEN * (expected - lower), expected)
        };
        let f1 = func(x1);
        let f2 = func(x2);
        GoldenSectionMinimizer {
            func,
            recorder: (),
            epsilon: config.epsilon,
            max_iterations: config.max_iterations,
            x: [lower, x1, x2, upper],
            f1,
            f2,
            iterations: 0,
            evaluations: 2,
        }
    }
}

impl<F: Fn(f64) -> f64, R: Recorder> GoldenSectionMinimizer<F, R> {
    pub fn with_recorder<Q: Recorder>(self, recorder: Q) -> GoldenSectionMinimizer<F, Q> {
        GoldenSectionMinimizer {
            func: self.func,
            recorder,
            epsilon: self.epsilon,
            max_iterations: self.max_iterations,
            x: self.x,
            f1: self.f1,
            f2: self.f2,
            iterations: self.iterations,
            evaluations: self.evaluations,
        }
    }

    fn width(&self) -> f64 {
        (self.x[3] - self.x[0]).abs()
    }
}

impl<F: Fn(f64) -> f64, R: Recorder> Minimizer for GoldenSectionMinimizer<F, R> {
    type Point = f64;

    fn step(&mut self) -> Result<()> {
        if !self.converging() {
            return Ok(());
        }
        self.iterations += 1;
        let [x0, x1, x2, x3] = self.x;
        if self.f2 < self.f1 {
            let x_new = (1.0 - GOLDEN) * x2 + GOLDEN * x3;
            self.x = [x1, x2, x_new, x3];
            self.f1 = self.f2;
            self.f2 = (self.func)(x_new);
        } else {
            let x_new = (1.0 - GOLDEN) * x1 + GOLDEN * x0;
            self.x = [x0, x_new, x1, x2];
            self.f2 = self.f1;
            self.f1 = (self.func)(x_new);
        }
        self.evaluations += 1;

        debug!(
            "golden section iteration {}: [{}, {}]",
            self.iterations, self.x[0], self.x[3]
        );
        self.recorder.record(IterationRecord::scalar(
            self.iterations,
            &self.x,
            vec![f64::NAN, self.f1, self.f2, f64::NAN],
            vec![self.width()],
        ));
        Ok(())
    }

    fn converging(&self) -> bool {
        self.width() > self.epsilon && self.iterations < self.max_iterations
    }

    fn minimum_point(&self) -> f64 {
        if self.f1 < self.f2 {
            self.x[1]
        } else {
            self.x[2]
        }
    }

    fn minimum_value(&self) -> f64 {
        self.f1.min(self.f2)
    }

    fn iterations(&self) -> usize {
        self.iterations
    }

    fn evaluations(&self) -> usize {
        self.evaluations
    }

    fn status(&self) -> Status {
        if self.width() <= self.epsilon {
            Status::Converged
        } else if self.iterations >= self.max_iterations {
            Status::IterationLimitReached
        } else {
            Status::Running
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::approx_eq;

    #[test]
    fn golden_section() {
        let minimizer = GoldenSectionBuilder::default()
            .epsilon(1e-7)
            .max_iterations(1000)
            .build()
            .unwrap();
        let f = |x: f64| (x - 0.2).powi(2);
        let res = minimizer.minimize(f, -1.0, 1.0).unwrap();

        assert_eq!(res.status, Status::Converged);
        assert!(approx_eq!(f64, res.minimum, 0.2, epsilon = 1e-7));
        assert_eq!(res.evaluations, res.iterations + 2);
    }

    #[test]
    fn interval_shrinks_by_the_golden_ratio() {
        let mut log = Vec::new();
        GoldenSection::default()
            .minimizer(|x: f64| x.sin(), 3.0, 6.0)
            .unwrap()
            .with_recorder(&mut log)
            .minimize()
            .unwrap();
        for pair in log.windows(2) {
            let ratio = pair[1].deltas[0] / pair[0].deltas[0];
            assert!(approx_eq!(f64, ratio, 1.0 - GOLDEN, epsilon = 1e-9));
        }
    }

    #[test]
    fn expected_point_is_an_inner_point() {
        let config = GoldenSection::default();
        let mut minimizer =
            GoldenSectionMinimizer::with_expected(|x: f64| (x - 1.5).powi(2), 0.0, 4.0, 1.5, &config);
        assert_eq!(minimizer.minimum_point(), 1.5);
        let res = minimizer.minimize().unwrap();
        assert!(approx_eq!(f64, res.minimum, 1.5, epsilon = 1e-6));
    }

    #[test]
    fn iteration_cap_keeps_best_estimate() {
        let config = GoldenSectionBuilder::default()
            .max_iterations(5)
            .build()
            .unwrap();
        let res = config.minimize(|x| (x - 0.7).powi(2), 0.0, 10.0).unwrap();
        assert_eq!(res.status, Status::IterationLimitReached);
        assert_eq!(res.iterations, 5);
        assert!(res.minimum_value <= (GOLDEN * 10.0 - 0.7f64).powi(2));
    }
}
