use std::cell::Cell;

use ndarray::prelude::*;
use num_traits::Float;

use crate::error::{Error, Result};

/// Evaluation counter with an optional cap.
///
/// The counter lives in a `Cell` so that line-search closures can charge it through a shared
/// reference.
#[derive(Debug)]
pub struct Budget {
    num: Cell<usize>,
    max: Option<usize>,
}

impl Budget {
    pub fn new(max: Option<usize>) -> Self {
        Budget {
            num: Cell::new(0),
            max,
        }
    }

    /// Number of evaluations performed so far.
    pub fn num(&self) -> usize {
        self.num.get()
    }

    /// Records one evaluation, failing instead once the cap has been reached.
    #[inline]
    pub fn charge(&self) -> Result<()> {
        let num = self.num.get() + 1;
        if let Some(max) = self.max {
            if num > max {
                return Err(Error::EvaluationLimit(max));
            }
        }
        self.num.set(num);
        Ok(())
    }
}

/// A function paired with its own evaluation budget.
pub struct WrappedFunction<F> {
    pub budget: Budget,
    pub func: F,
}

impl<F> WrappedFunction<F> {
    pub fn new(func: F, max: Option<usize>) -> Self {
        WrappedFunction {
            budget: Budget::new(max),
            func,
        }
    }

    pub fn num(&self) -> usize {
        self.budget.num()
    }
}

impl<F: Fn(ArrayView1<f64>) -> f64> WrappedFunction<F> {
    pub fn call(&self, arg: ArrayView1<f64>) -> Result<f64> {
        self.budget.charge()?;
        Ok((self.func)(arg))
    }
}

/// Value-stability test: `prev` and `curr` agree when their difference is small either relative
/// to their magnitude or in absolute terms. Any NaN makes the test fail.
#[inline]
pub fn converged<T: Float>(prev: T, curr: T, relative_threshold: T, absolute_threshold: T) -> bool {
    let difference = (prev - curr).abs();
    let size = prev.abs().max(curr.abs());
    difference <= size * relative_threshold || difference <= absolute_threshold
}

/// Checks that a tolerance is finite and non-negative. Used by the builders' `validate` hooks.
pub fn check_tolerance(name: &str, value: Option<f64>) -> std::result::Result<(), String> {
    match value {
        Some(v) if !v.is_finite() || v < 0.0 => Err(format!(
            "{} must be finite and non-negative, got {}",
            name, v
        )),
        _ => Ok(()),
    }
}

/// Checks that an iteration or evaluation cap is non-zero.
pub fn check_limit(name: &str, value: Option<usize>) -> std::result::Result<(), String> {
    match value {
        Some(0) => Err(format!("{} must be at least 1", name)),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    fn sum(x: ArrayView1<f64>) -> f64 {
        x.sum()
    }

    #[test]
    fn wrapped_function_enforces_budget() {
        let function = WrappedFunction::new(sum, Some(2));
        let x = Array::from_vec(vec![1.0, 1.0]);
        assert_eq!(function.call(x.view()).unwrap(), 2.0);
        assert_eq!(function.call(x.view()).unwrap(), 2.0);
        assert!(matches!(
            function.call(x.view()),
            Err(Error::EvaluationLimit(2))
        ));
        assert_eq!(function.num(), 2);
    }

    #[test]
    fn shared_budget_counts_every_charge() {
        let budget = Budget::new(Some(3));
        for _ in 0..3 {
            budget.charge().unwrap();
        }
        assert!(matches!(budget.charge(), Err(Error::EvaluationLimit(3))));
        assert_eq!(budget.num(), 3);
        assert!(Budget::new(None).charge().is_ok());
    }

    #[test]
    fn convergence_test() {
        assert!(converged(1.0, 1.0 + 1e-9, 1e-6, 0.0));
        assert!(converged(1e-12, 0.0, 0.0, 1e-9));
        assert!(!converged(1.0, 2.0, 1e-6, 1e-6));
        assert!(!converged(f64::NAN, 1.0, 1.0, 1.0));
    }

    #[test]
    fn tolerances_are_validated() {
        assert!(check_tolerance("epsilon", Some(1e-6)).is_ok());
        assert!(check_tolerance("epsilon", None).is_ok());
        assert!(check_tolerance("epsilon", Some(-1.0)).is_err());
        assert!(check_tolerance("epsilon", Some(f64::INFINITY)).is_err());
        assert!(check_limit("max_iterations", Some(0)).is_err());
    }
}
