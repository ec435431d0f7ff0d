//! Nelder–Mead downhill simplex search.
//!
//! The simplex has `n + 1` vertices in `n` dimensions, kept sorted from best to worst. Every
//! iteration reflects the worst vertex through the centroid of the others, then expands,
//! contracts or shrinks depending on how the reflected point compares with the simplex.
//!
//! The optional adaptive coefficients follow
//!
//! Gao, F and Han, L. Implementing the Nelder-Mead simplex algorithm with
//! adaptive parameters. 2012. Computational Optimization and Applications.
//! 51:1, pp 259--277
//!
//! which scales expansion, contraction and shrinkage with the dimension.
//!
//! # Use case
//!
//! The Nelder-Mead algorithm does not require a gradient or a hessian.
//! As a tradeoff it typically requires a lot of function evaluations to
//! find a minimum. Further, there are few theoretical results on the
//! convergence of Nelder-Mead iterations.
//!
//! # Examples
//!
//! ```
//! use ndarray::prelude::*;
//! use minimization::vector::NelderMeadBuilder;
//!
//! let function =
//!     |x: ArrayView1<f64>| (1.0 - x[0]).powi(2) + 100.0 * (x[1] - x[0].powi(2)).powi(2);
//! let minimizer = NelderMeadBuilder::default()
//!     .epsilon(1e-12)
//!     .build()
//!     .unwrap();
//! let args = Array::from_vec(vec![3.0, -8.3]);
//! let res = minimizer.minimize(function, args.view()).unwrap();
//! assert!((res.minimum[0] - 1.0).abs() < 1e-3);
//! ```

use std::cmp::Ordering;

use log::debug;
use ndarray::prelude::*;

use crate::error::{Error, Result};
use crate::minimizer::{Minimizer, OptimResult, Status};
use crate::record::{IterationRecord, Recorder};
use crate::utils::{check_limit, check_tolerance, converged, WrappedFunction};
use crate::vector::PointValue;

/// A minimizer for a scalar function of one or more variables using the Nelder-Mead algorithm.
#[derive(Builder, Debug, Clone, PartialEq)]
#[builder(default, build_fn(validate = "Self::validate", error = "Error"))]
pub struct NelderMead {
    /// The required number of floating point representations that separate two numbers to consider them
    /// equal. See crate float_cmp for more information.
    pub ulps: i64,

    /// Base tolerance for the default convergence thresholds.
    pub epsilon: f64,

    /// Relative change of every vertex value that counts as converged. Defaults to `100 * epsilon`.
    #[builder(setter(into))]
    pub relative_threshold: Option<f64>,

    /// Absolute change of every vertex value that counts as converged. Defaults to `epsilon`.
    #[builder(setter(into))]
    pub absolute_threshold: Option<f64>,

    /// Stepping past this many iterations fails with [`Error::IterationLimit`].
    pub max_iterations: usize,

    /// Cap on objective evaluations, unlimited when `None`.
    #[builder(setter(into))]
    pub max_evaluations: Option<usize>,

    /// Adapt algorithm parameters to dimensionality of the problem. Useful for high-dimensional minimization.
    pub adaptive: bool,

    /// Per-coordinate steps for the initial simplex. Vertex `i + 1` is the start point moved by
    /// the first `i + 1` steps, one coordinate each. Unit steps when `None`.
    #[builder(setter(into))]
    pub start_configuration: Option<Vec<f64>>,
}

impl Default for NelderMead {
    fn default() -> Self {
        NelderMead {
            ulps: 1,
            epsilon: 1e-6,
            relative_threshold: None,
            absolute_threshold: None,
            max_iterations: 1_000_000,
            max_evaluations: None,
            adaptive: false,
            start_configuration: None,
        }
    }
}

impl NelderMeadBuilder {
    fn validate(&self) -> std::result::Result<(), String> {
        if let Some(ulps) = self.ulps {
            if ulps < 0 {
                return Err(format!("ulps must be non-negative, got {}", ulps));
            }
        }
        check_tolerance("epsilon", self.epsilon)?;
        check_tolerance("relative_threshold", self.relative_threshold.flatten())?;
        check_tolerance("absolute_threshold", self.absolute_threshold.flatten())?;
        check_limit("max_iterations", self.max_iterations)?;
        check_limit("max_evaluations", self.max_evaluations.flatten())
    }
}

impl NelderMead {
    /// Builds the start simplex around `start` and evaluates it.
    pub fn minimizer<F>(&self, func: F, start: ArrayView1<f64>) -> Result<NelderMeadMinimizer<F>>
    where
        F: Fn(ArrayView1<f64>) -> f64,
    {
        NelderMeadMinimizer::new(func, start, self)
    }

    /// Search for the value minimizing `func` given an initial guess
    /// in the form of a point. The algorithm will explore the variable
    /// space without constraints.
    pub fn minimize<F>(&self, func: F, start: ArrayView1<f64>) -> Result<OptimResult<Array1<f64>>>
    where
        F: Fn(ArrayView1<f64>) -> f64,
    {
        self.minimizer(func, start)?.minimize()
    }

    /// Reflection, expansion, contraction and shrink coefficients for `dim` dimensions.
    fn coefficients(&self, dim: usize) -> (f64, f64, f64, f64) {
        if self.adaptive && dim > 1 {
            let dim = dim as f64;
            (1.0, 1.0 + 2.0 / dim, 0.75 - 1.0 / (2.0 * dim), 1.0 - 1.0 / dim)
        } else {
            (1.0, 2.0, 0.5, 0.5)
        }
    }
}

pub struct NelderMeadMinimizer<F, R = ()> {
    func: WrappedFunction<F>,
    recorder: R,
    simplex: Vec<PointValue>,
    previous: Option<Vec<f64>>,
    iterations: usize,
    max_iterations: usize,
    relative_threshold: f64,
    absolute_threshold: f64,
    ulps: i64,
    rho: f64,
    khi: f64,
    gamma: f64,
    sigma: f64,
}

impl<F> NelderMeadMinimizer<F>
where
    F: Fn(ArrayView1<f64>) -> f64,
{
    pub fn new(func: F, start: ArrayView1<f64>, config: &NelderMead) -> Result<Self> {
        let dim = start.len();
        if dim == 0 {
            return Err(Error::InvalidConfig(
                "start point must have at least one coordinate".to_string(),
            ));
        }
        let steps = match &config.start_configuration {
            Some(steps) => steps.clone(),
            None => vec![1.0; dim],
        };
        if steps.len() != dim {
            return Err(Error::DimensionMismatch {
                expected: dim,
                found: steps.len(),
            });
        }
        if let Some(j) = steps.iter().position(|&step| step == 0.0) {
            return Err(Error::DegenerateSimplex(j));
        }

        let mut simplex = Vec::with_capacity(dim + 1);
        let mut vertex = start.to_owned();
        simplex.push(PointValue::unevaluated(vertex.clone()));
        for (i, step) in steps.iter().enumerate() {
            vertex[i] += step;
            simplex.push(PointValue::unevaluated(vertex.clone()));
        }

        let (rho, khi, gamma, sigma) = config.coefficients(dim);
        let mut minimizer = NelderMeadMinimizer {
            func: WrappedFunction::new(func, config.max_evaluations),
            recorder: (),
            simplex,
            previous: None,
            iterations: 0,
            max_iterations: config.max_iterations,
            relative_threshold: config
                .relative_threshold
                .unwrap_or(100.0 * config.epsilon),
            absolute_threshold: config.absolute_threshold.unwrap_or(config.epsilon),
            ulps: config.ulps,
            rho,
            khi,
            gamma,
            sigma,
        };
        minimizer.evaluate_simplex()?;
        Ok(minimizer)
    }
}

impl<F, R> NelderMeadMinimizer<F, R>
where
    F: Fn(ArrayView1<f64>) -> f64,
    R: Recorder,
{
    pub fn with_recorder<Q: Recorder>(self, recorder: Q) -> NelderMeadMinimizer<F, Q> {
        NelderMeadMinimizer {
            func: self.func,
            recorder,
            simplex: self.simplex,
            previous: self.previous,
            iterations: self.iterations,
            max_iterations: self.max_iterations,
            relative_threshold: self.relative_threshold,
            absolute_threshold: self.absolute_threshold,
            ulps: self.ulps,
            rho: self.rho,
            khi: self.khi,
            gamma: self.gamma,
            sigma: self.sigma,
        }
    }

    /// The vertices, best first. Values are NaN for vertices moved by a shrink and not yet
    /// re-evaluated.
    pub fn simplex(&self) -> &[PointValue] {
        &self.simplex
    }

    fn evaluate(&self, point: Array1<f64>) -> Result<PointValue> {
        let value = self.func.call(point.view())?;
        Ok(PointValue::new(point, value))
    }

    /// Evaluates the vertices a shrink left behind, then sorts best first.
    fn evaluate_simplex(&mut self) -> Result<()> {
        for vertex in self.simplex.iter_mut().filter(|v| !v.is_evaluated()) {
            vertex.value = self.func.call(vertex.point.view())?;
        }
        self.simplex.sort_by(|a, b| a.value.total_cmp(&b.value));
        Ok(())
    }

    /// Centroid of all vertices but the worst one.
    fn centroid(&self) -> Array1<f64> {
        let n = self.simplex.len() - 1;
        let mut centroid = Array1::zeros(self.simplex[0].point.len());
        for vertex in &self.simplex[..n] {
            centroid += &vertex.point;
        }
        centroid / n as f64
    }

    fn iterate_simplex(&mut self) -> Result<&'static str> {
        let n = self.simplex.len() - 1;
        let ulps = self.ulps;
        let centroid = self.centroid();

        let reflected =
            self.evaluate(&centroid + &((&centroid - &self.simplex[n].point) * self.rho))?;

        if self.simplex[0].compare(&reflected, ulps) != Ordering::Greater
            && reflected.compare(&self.simplex[n - 1], ulps) == Ordering::Less
        {
            self.replace_worst(reflected);
            return Ok("reflection");
        }

        if reflected.compare(&self.simplex[0], ulps) == Ordering::Less {
            let expanded =
                self.evaluate(&centroid + &((&reflected.point - &centroid) * self.khi))?;
            if expanded.compare(&reflected, ulps) == Ordering::Less {
                self.replace_worst(expanded);
                return Ok("expansion");
            }
            self.replace_worst(reflected);
            return Ok("reflection");
        }

        if reflected.compare(&self.simplex[n], ulps) == Ordering::Less {
            let contracted =
                self.evaluate(&centroid + &((&reflected.point - &centroid) * self.gamma))?;
            if contracted.compare(&reflected, ulps) != Ordering::Greater {
                self.replace_worst(contracted);
                return Ok("outside contraction");
            }
        } else {
            let contracted =
                self.evaluate(&centroid - &((&centroid - &self.simplex[n].point) * self.gamma))?;
            if contracted.compare(&self.simplex[n], ulps) == Ordering::Less {
                self.replace_worst(contracted);
                return Ok("inside contraction");
            }
        }

        self.shrink();
        Ok("shrink")
    }

    /// Drops the worst vertex and inserts `vertex` at its sorted position.
    /// A single linear pass, since the rest of the simplex is already ordered.
    fn replace_worst(&mut self, mut vertex: PointValue) {
        let n = self.simplex.len() - 1;
        for i in 0..n {
            if self.simplex[i].compare(&vertex, self.ulps) == Ordering::Greater {
                std::mem::swap(&mut self.simplex[i], &mut vertex);
            }
        }
        self.simplex[n] = vertex;
    }

    /// Moves every vertex but the best towards the best one. The moved vertices are evaluated
    /// at the start of the next iteration.
    fn shrink(&mut self) {
        let best = self.simplex[0].point.clone();
        for vertex in self.simplex.iter_mut().skip(1) {
            let point = &best + &((&vertex.point - &best) * self.sigma);
            *vertex = PointValue::unevaluated(point);
        }
    }
}

impl<F, R> Minimizer for NelderMeadMinimizer<F, R>
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
        self.evaluate_simplex()?;
        self.previous = Some(self.simplex.iter().map(|v| v.value).collect());

        let operation = self.iterate_simplex()?;
        debug!(
            "nelder-mead iteration {}: {}, best = {}",
            self.iterations, operation, self.simplex[0].value
        );

        let points: Vec<_> = self.simplex.iter().map(|v| v.point.view()).collect();
        let values: Vec<f64> = self.simplex.iter().map(|v| v.value).collect();
        let spread = values[values.len() - 1] - values[0];
        self.recorder.record(IterationRecord::vector(
            self.iterations,
            &points,
            values,
            vec![spread],
        ));
        Ok(())
    }

    fn converging(&self) -> bool {
        match &self.previous {
            None => true,
            Some(previous) => !previous.iter().zip(&self.simplex).all(|(&prev, curr)| {
                converged(
                    prev,
                    curr.value,
                    self.relative_threshold,
                    self.absolute_threshold,
                )
            }),
        }
    }

    fn minimum_point(&self) -> Array1<f64> {
        self.simplex[0].point.clone()
    }

    fn minimum_value(&self) -> f64 {
        self.simplex[0].value
    }

    fn iterations(&self) -> usize {
        self.iterations
    }

    fn evaluations(&self) -> usize {
        self.func.num()
    }

    fn status(&self) -> Status {
        if self.converging() {
            Status::Running
        } else {
            Status::Converged
        }
    }
}
