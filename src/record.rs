//! Append-only iteration log.
//!
//! Stepping solvers hand one [`IterationRecord`] per step to their [`Recorder`]. Records are
//! purely observational: the solvers never read them back. The unit type `()` discards
//! everything and is the default recorder.

use ndarray::prelude::*;

/// What a solver looked like after one step.
#[derive(Debug, Clone, PartialEq)]
pub struct IterationRecord {
    /// One-based index of the step.
    pub iteration: usize,
    /// The tracked points, one per row: bracket ends for scalar solvers, vertices for the
    /// simplex, the current and previous iterate for the direction-based methods.
    pub snapshot: Array2<f64>,
    /// Function values at the rows of `snapshot`.
    pub values: Vec<f64>,
    /// Solver-specific step sizes, e.g. bracket width and value spread.
    pub deltas: Vec<f64>,
}

impl IterationRecord {
    /// Builds a record for a scalar solver whose snapshot holds bare coordinates.
    pub fn scalar(iteration: usize, points: &[f64], values: Vec<f64>, deltas: Vec<f64>) -> Self {
        let snapshot = Array2::from_shape_fn((points.len(), 1), |(i, _)| points[i]);
        IterationRecord {
            iteration,
            snapshot,
            values,
            deltas,
        }
    }

    /// Builds a record from a list of equally sized points.
    pub fn vector(
        iteration: usize,
        points: &[ArrayView1<f64>],
        values: Vec<f64>,
        deltas: Vec<f64>,
    ) -> Self {
        let dim = points.first().map_or(0, |p| p.len());
        let mut snapshot = Array2::zeros((points.len(), dim));
        for (mut row, p) in snapshot.outer_iter_mut().zip(points) {
            row.assign(p);
        }
        IterationRecord {
            iteration,
            snapshot,
            values,
            deltas,
        }
    }
}

/// Receives one record per solver step.
pub trait Recorder {
    fn record(&mut self, record: IterationRecord);
}

impl Recorder for () {
    #[inline]
    fn record(&mut self, _record: IterationRecord) {}
}

impl Recorder for Vec<IterationRecord> {
    fn record(&mut self, record: IterationRecord) {
        self.push(record);
    }
}

impl<R: Recorder + ?Sized> Recorder for &mut R {
    fn record(&mut self, record: IterationRecord) {
        (**self).record(record);
    }
}
