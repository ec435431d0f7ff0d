use std::cmp::Ordering;

use float_cmp::ApproxEqUlps;
use ndarray::prelude::*;

/// A point together with the objective value at that point.
///
/// A NaN value marks a point that has not been evaluated yet.
#[derive(Debug, Clone, PartialEq)]
pub struct PointValue {
    pub point: Array1<f64>,
    pub value: f64,
}

impl PointValue {
    pub fn new(point: Array1<f64>, value: f64) -> Self {
        PointValue { point, value }
    }

    /// A point whose value is still to be computed.
    pub fn unevaluated(point: Array1<f64>) -> Self {
        PointValue {
            point,
            value: f64::NAN,
        }
    }

    pub fn is_evaluated(&self) -> bool {
        !self.value.is_nan()
    }

    /// Orders by value, lower is better. Values within `ulps` representable floats of each
    /// other compare equal.
    pub fn compare(&self, other: &PointValue, ulps: i64) -> Ordering {
        if self.value.approx_eq_ulps(&other.value, ulps) {
            Ordering::Equal
        } else {
            self.value.total_cmp(&other.value)
        }
    }
}
