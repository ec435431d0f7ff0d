//! Newton–Raphson iteration on the first derivative.
//!
//! Each step moves to `x - f'(x) / f''(x)`. The caller provides both derivatives. The method
//! converges quadratically near a minimum with positive curvature. It does not bracket anything
//! and can diverge or land on a maximum; a vanishing second derivative produces a non-finite
//! iterate, which never passes the convergence test, so the run ends with
//! [`Error::IterationLimit`].

use log::debug;

use crate::error::{Error, Result};
use crate::minimizer::{Minimizer, OptimResult, Status};
use crate::record::{IterationRecord, Recorder};
use crate::utils::{check_limit, check_tolerance};

#[derive(Builder, Debug, Clone, PartialEq)]
#[builder(default, build_fn(validate = "Self::validate", error = "Error"))]
pub struct NewtonRaphson {
    /// Convergence is reached once successive iterates differ by at most this much.
    pub epsilon: f64,
    pub max_iterations: usize,
}

impl Default for NewtonRaphson {
    fn default() -> Self {
        NewtonRaphson {
            epsilon: 1e-6,
            max_iterations: 100,
        }
    }
}

impl NewtonRaphsonBuilder {
    fn validate(&self) -> std::result::Result<(), String> {
        check_tolerance("epsilon", self.epsilon)?;
        check_limit("max_iterations", self.max_iterations)
    }
}

impl NewtonRaphson {
    /// Iterates from `start` until two successive iterates agree.
    pub fn minimize<F, D, S>(
        &self,
        func: F,
        first: D,
        second: S,
        start: f64,
    ) -> Result<OptimResult<f64>>
    where
        F: Fn(f64) -> f64,
        D: Fn(f64) -> f64,
        S: Fn(f64) -> f64,
    {
        NewtonRaphsonMinimizer::new(func, first, second, start, self).minimize()
    }
}

pub struct NewtonRaphsonMinimizer<F, D, S, R = ()> {
    func: F,
    first: D,
    second: S,
    recorder: R,
    epsilon: f64,
    max_iterations: usize,
    x: f64,
    x_prev: f64,
    f_x: f64,
    iterations: usize,
    evaluations: usize,
}

impl<F, D, S> NewtonRaphsonMinimizer<F, D, S>
where
    F: Fn(f64) -> f64,
    D: Fn(f64) -> f64,
    S: Fn(f64) -> f64,
{
    pub fn new(func: F, first: D, second: S, start: f64, config: &NewtonRaphson) -> Self {
        let f_x = func(start);
        NewtonRaphsonMinimizer {
            func,
            first,
            second,
            recorder: (),
            epsilon: config.epsilon,
            max_iterations: config.max_iterations,
            x: start,
            x_prev: f64::NAN,
            f_x,
            iterations: 0,
            evaluations: 1,
        }
    }
}

impl<F, D, S, R> NewtonRaphsonMinimizer<F, D, S, R>
where
    F: Fn(f64) -> f64,
    D: Fn(f64) -> f64,
    S: Fn(f64) -> f64,
    R: Recorder,
{
    pub fn with_recorder<Q: Recorder>(self, recorder: Q) -> NewtonRaphsonMinimizer<F, D, S, Q> {
        NewtonRaphsonMinimizer {
            func: self.func,
            first: self.first,
            second: self.second,
            recorder,
            epsilon: self.epsilon,
            max_iterations: self.max_iterations,
            x: self.x,
            x_prev: self.x_prev,
            f_x: self.f_x,
            iterations: self.iterations,
            evaluations: self.evaluations,
        }
    }
}

impl<F, D, S, R> Minimizer for NewtonRaphsonMinimizer<F, D, S, R>
where
    F: Fn(f64) -> f64,
    D: Fn(f64) -> f64,
    S: Fn(f64) -> f64,
    R: Recorder,
{
    type Point = f64;

    fn step(&mut self) -> Result<()> {
        if self.iterations >= self.max_iterations {
            return Err(Error::IterationLimit(self.max_iterations));
        }
        self.iterations += 1;
        self.x_prev = self.x;
        self.x -= (self.first)(self.x) / (self.second)(self.x);
        self.f_x = (self.func)(self.x);
        self.evaluations += 1;

        debug!(
            "newton-raphson iteration {}: x = {}, f = {}",
            self.iterations, self.x, self.f_x
        );
        self.recorder.record(IterationRecord::scalar(
            self.iterations,
            &[self.x_prev, self.x],
            vec![f64::NAN, self.f_x],
            vec![(self.x - self.x_prev).abs()],
        ));
        Ok(())
    }

    fn converging(&self) -> bool {
        !((self.x - self.x_prev).abs() <= self.epsilon)
    }

    fn minimum_point(&self) -> f64 {
        self.x
    }

    fn minimum_value(&self) -> f64 {
        self.f_x
    }

    fn iterations(&self) -> usize {
        self.iterations
    }

    fn evaluations(&self) -> usize {
        self.evaluations
    }

    fn status(&self) -> Status {
        if self.converging() {
            Status::Running
        } else {
            Status::Converged
        }
    }
}
