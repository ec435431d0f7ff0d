//! Nonlinear conjugate gradient with exact line searches.
//!
//! Every iteration searches along the current direction for the step where the directional
//! derivative `grad f(x + alpha * d) . d` vanishes. The root is bracketed by
//! [`find_upper_bound`](crate::vector::line_search::find_upper_bound) and refined with the
//! Brent root finder. The next direction mixes the new steepest descent with the previous
//! direction using either the Fletcher–Reeves or the Polak–Ribière coefficient.
//!
//! The direction is reset to steepest descent every `n` iterations, whenever the coefficient
//! turns negative, and whenever the mixed direction is not a descent direction.
//!
//! Convergence is judged on successive objective values. Objective and gradient calls share
//! one evaluation budget.

use log::debug;
use ndarray::prelude::*;

use crate::error::{Error, Result};
use crate::minimizer::{Minimizer, OptimResult, Status};
use crate::record::{IterationRecord, Recorder};
use crate::scalar::BrentRootFinder;
use crate::utils::{check_limit, check_tolerance, converged, Budget};
use crate::vector::line_search::find_upper_bound;
use crate::vector::PointValue;

/// Update coefficient for the search direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BetaFormula {
    /// `beta = r_new . r_new / r_old . r_old`
    FletcherReeves,
    /// `beta = r_new . (r_new - r_old) / r_old . r_old`
    #[default]
    PolakRibiere,
}

#[derive(Builder, Debug, Clone, PartialEq)]
#[builder(default, build_fn(validate = "Self::validate", error = "Error"))]
pub struct ConjugateGradient {
    pub formula: BetaFormula,

    /// Base tolerance for the default relative threshold.
    pub epsilon: f64,

    /// Defaults to `100 * epsilon`.
    #[builder(setter(into))]
    pub relative_threshold: Option<f64>,

    /// Defaults to `100 * f64::MIN_POSITIVE`.
    #[builder(setter(into))]
    pub absolute_threshold: Option<f64>,

    pub max_iterations: usize,

    /// Cap on objective plus gradient evaluations, unlimited when `None`.
    #[builder(setter(into))]
    pub max_evaluations: Option<usize>,

    /// First trial step when bracketing the line minimum.
    pub initial_step: f64,

    /// Solver for the zero of the directional derivative. The default accepts a root only on
    /// the bracket width or once the derivative is below `1e-15`.
    pub root_finder: BrentRootFinder,
}

impl Default for ConjugateGradient {
    fn default() -> Self {
        ConjugateGradient {
            formula: BetaFormula::default(),
            epsilon: 1e-6,
            relative_threshold: None,
            absolute_threshold: None,
            max_iterations: 100_000,
            max_evaluations: Some(100_000),
            initial_step: 1.0,
            root_finder: BrentRootFinder {
                function_epsilon: 1e-15,
                ..BrentRootFinder::default()
            },
        }
    }
}

impl ConjugateGradientBuilder {
    fn validate(&self) -> std::result::Result<(), String> {
        check_tolerance("epsilon", self.epsilon)?;
        check_tolerance("relative_threshold", self.relative_threshold.flatten())?;
        check_tolerance("absolute_threshold", self.absolute_threshold.flatten())?;
        check_limit("max_iterations", self.max_iterations)?;
        check_limit("max_evaluations", self.max_evaluations.flatten())?;
        match self.initial_step {
            Some(step) if !(step > 0.0 && step.is_finite()) => Err(format!(
                "initial_step must be positive and finite, got {}",
                step
            )),
            _ => Ok(()),
        }
    }
}

impl ConjugateGradient {
    pub fn minimizer<F, G>(
        &self,
        func: F,
        gradient: G,
        start: ArrayView1<f64>,
    ) -> Result<ConjugateGradientMinimizer<F, G>>
    where
        F: Fn(ArrayView1<f64>) -> f64,
        G: Fn(ArrayView1<f64>) -> Array1<f64>,
    {
        ConjugateGradientMinimizer::new(func, gradient, start, self)
    }

    pub fn minimize<F, G>(
        &self,
        func: F,
        gradient: G,
        start: ArrayView1<f64>,
    ) -> Result<OptimResult<Array1<f64>>>
    where
        F: Fn(ArrayView1<f64>) -> f64,
        G: Fn(ArrayView1<f64>) -> Array1<f64>,
    {
        self.minimizer(func, gradient, start)?.minimize()
    }
}

pub struct ConjugateGradientMinimizer<F, G, R = ()> {
    func: F,
    gradient: G,
    budget: Budget,
    recorder: R,
    formula: BetaFormula,
    relative_threshold: f64,
    absolute_threshold: f64,
    max_iterations: usize,
    initial_step: f64,
    root_finder: BrentRootFinder,

    current: PointValue,
    previous: Option<PointValue>,
    // negated gradient at the current point
    residual: Array1<f64>,
    steepest_descent: Array1<f64>,
    search_direction: Array1<f64>,
    delta: f64,
    iterations: usize,
    converging: bool,
}

impl<F, G> ConjugateGradientMinimizer<F, G>
where
    F: Fn(ArrayView1<f64>) -> f64,
    G: Fn(ArrayView1<f64>) -> Array1<f64>,
{
    /// Evaluates the objective and the gradient at `start`.
    pub fn new(func: F, gradient: G, start: ArrayView1<f64>, config: &ConjugateGradient) -> Result<Self> {
        if start.is_empty() {
            return Err(Error::InvalidConfig(
                "start point must have at least one coordinate".to_string(),
            ));
        }
        let budget = Budget::new(config.max_evaluations);
        budget.charge()?;
        let value = func(start);
        budget.charge()?;
        let residual = -gradient(start);
        if residual.len() != start.len() {
            return Err(Error::DimensionMismatch {
                expected: start.len(),
                found: residual.len(),
            });
        }
        let steepest_descent = residual.clone();
        let search_direction = steepest_descent.clone();
        let delta = residual.dot(&search_direction);

        Ok(ConjugateGradientMinimizer {
            func,
            gradient,
            budget,
            recorder: (),
            formula: config.formula,
            relative_threshold: config
                .relative_threshold
                .unwrap_or(100.0 * config.epsilon),
            absolute_threshold: config
                .absolute_threshold
                .unwrap_or(100.0 * f64::MIN_POSITIVE),
            max_iterations: config.max_iterations,
            initial_step: config.initial_step,
            root_finder: config.root_finder.clone(),
            current: PointValue::new(start.to_owned(), value),
            previous: None,
            residual,
            steepest_descent,
            search_direction,
            delta,
            iterations: 0,
            converging: delta != 0.0,
        })
    }
}

impl<F, G, R> ConjugateGradientMinimizer<F, G, R>
where
    F: Fn(ArrayView1<f64>) -> f64,
    G: Fn(ArrayView1<f64>) -> Array1<f64>,
    R: Recorder,
{
    pub fn with_recorder<Q: Recorder>(self, recorder: Q) -> ConjugateGradientMinimizer<F, G, Q> {
        ConjugateGradientMinimizer {
            func: self.func,
            gradient: self.gradient,
            budget: self.budget,
            recorder,
            formula: self.formula,
            relative_threshold: self.relative_threshold,
            absolute_threshold: self.absolute_threshold,
            max_iterations: self.max_iterations,
            initial_step: self.initial_step,
            root_finder: self.root_finder,
            current: self.current,
            previous: self.previous,
            residual: self.residual,
            steepest_descent: self.steepest_descent,
            search_direction: self.search_direction,
            delta: self.delta,
            iterations: self.iterations,
            converging: self.converging,
        }
    }

    /// The iterate before the most recent step.
    pub fn previous(&self) -> Option<&PointValue> {
        self.previous.as_ref()
    }

    /// Step length along the search direction where the directional derivative vanishes.
    fn line_search(&self) -> Result<f64> {
        let x = &self.current.point;
        let direction = &self.search_direction;
        let derivative = |alpha: f64| -> Result<f64> {
            self.budget.charge()?;
            let gradient = (self.gradient)((x + &(direction * alpha)).view());
            Ok(gradient.dot(direction))
        };
        let upper = find_upper_bound(&derivative, 0.0, self.initial_step)?;
        let root = self.root_finder.try_find_root(&derivative, 0.0, upper)?;
        Ok(root.x)
    }
}

impl<F, G, R> Minimizer for ConjugateGradientMinimizer<F, G, R>
where
    F: Fn(ArrayView1<f64>) -> f64,
    G: Fn(ArrayView1<f64>) -> Array1<f64>,
    R: Recorder,
{
    type Point = Array1<f64>;

    fn step(&mut self) -> Result<()> {
        if self.iterations >= self.max_iterations {
            return Err(Error::IterationLimit(self.max_iterations));
        }
        self.iterations += 1;

        if self.residual.dot(&self.search_direction) <= 0.0 {
            self.search_direction = self.steepest_descent.clone();
        }
        let step = self.line_search()?;
        let point = &self.current.point + &(&self.search_direction * step);

        self.budget.charge()?;
        let value = (self.func)(point.view());
        self.budget.charge()?;
        self.residual = -(self.gradient)(point.view());

        let delta_old = self.delta;
        let steepest_descent = self.residual.clone();
        self.delta = self.residual.dot(&steepest_descent);
        let beta = if delta_old == 0.0 {
            0.0
        } else {
            match self.formula {
                BetaFormula::FletcherReeves => self.delta / delta_old,
                BetaFormula::PolakRibiere => {
                    let delta_mid = self.residual.dot(&self.steepest_descent);
                    (self.delta - delta_mid) / delta_old
                }
            }
        };
        self.steepest_descent = steepest_descent;

        if self.iterations % self.current.point.len() == 0 || beta < 0.0 {
            self.search_direction = self.steepest_descent.clone();
        } else {
            self.search_direction = &self.steepest_descent + &(&self.search_direction * beta);
        }

        let previous = std::mem::replace(&mut self.current, PointValue::new(point, value));
        self.converging = self.delta != 0.0
            && !converged(
                previous.value,
                self.current.value,
                self.relative_threshold,
                self.absolute_threshold,
            );
        debug!(
            "conjugate gradient iteration {}: step = {}, f = {}, beta = {}",
            self.iterations, step, self.current.value, beta
        );
        self.recorder.record(IterationRecord::vector(
            self.iterations,
            &[self.current.point.view(), previous.point.view()],
            vec![self.current.value, previous.value],
            vec![step, beta],
        ));
        self.previous = Some(previous);
        Ok(())
    }

    fn converging(&self) -> bool {
        self.converging
    }

    fn minimum_point(&self) -> Array1<f64> {
        self.current.point.clone()
    }

    fn minimum_value(&self) -> f64 {
        self.current.value
    }

    fn iterations(&self) -> usize {
        self.iterations
    }

    fn evaluations(&self) -> usize {
        self.budget.num()
    }

    fn status(&self) -> Status {
        if self.converging {
            Status::Running
        } else {
            Status::Converged
        }
    }
}
