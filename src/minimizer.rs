//! This module provides the base framework for all minimizers present in this crate, such as the
//! stepping trait and return type.
use crate::error::Result;

/// Minimizer states after the most recent step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// The convergence test has not been satisfied yet.
    Running,
    /// The convergence test was satisfied.
    Converged,
    /// The iteration budget ran out and the best estimate so far was kept.
    /// Only solvers with a silent truncation policy (Brent, golden section) end up here.
    IterationLimitReached,
}

/// A minimization result, storing various details of the run and the final results.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimResult<P> {
    /// The parameter values with the smallest value found.
    pub minimum: P,
    /// The function value at the found minimum.
    pub minimum_value: f64,
    /// The number of iterations run.
    pub iterations: usize,
    /// The number of function evaluations performed.
    pub evaluations: usize,
    /// The minimizer status at the end of the run.
    pub status: Status,
}

/// A general stepping minimizer.
///
/// Each solver owns its state for a single run. `step` advances it by one iteration, and
/// `minimize` keeps stepping while the solver reports it is still converging.
pub trait Minimizer {
    /// The type of a point in the search space.
    type Point: Clone;

    /// Performs one iteration.
    fn step(&mut self) -> Result<()>;

    /// Returns false once the convergence test passes or the solver can make no more progress.
    fn converging(&self) -> bool;

    /// The best point found so far.
    fn minimum_point(&self) -> Self::Point;

    /// The function value at [`minimum_point`](Minimizer::minimum_point).
    fn minimum_value(&self) -> f64;

    fn iterations(&self) -> usize;

    fn evaluations(&self) -> usize;

    fn status(&self) -> Status;

    /// Snapshot of the current results.
    fn result(&self) -> OptimResult<Self::Point> {
        OptimResult {
            minimum: self.minimum_point(),
            minimum_value: self.minimum_value(),
            iterations: self.iterations(),
            evaluations: self.evaluations(),
            status: self.status(),
        }
    }

    /// Steps until the solver stops converging. Calling this again on a finished solver does
    /// not perform any further steps.
    fn minimize(&mut self) -> Result<OptimResult<Self::Point>> {
        while self.converging() {
            self.step()?;
        }
        Ok(self.result())
    }
}
