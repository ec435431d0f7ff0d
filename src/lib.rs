//! Local minimization of real functions.
//!
//! Scalar solvers live in [`scalar`]: Brent's bounded minimizer and root finder, golden-section
//! search and Newton–Raphson. Multivariate solvers live in [`vector`]: the Nelder–Mead simplex,
//! nonlinear conjugate gradient and Powell's conjugate-direction method.
//!
//! Every solver is configured through a builder and produces a stepping state that implements
//! [`Minimizer`]. `step` advances it by one iteration; `minimize` steps until it converges.
//! Attach a [`Recorder`] with `with_recorder` to collect one [`IterationRecord`] per step.
//!
//! ```
//! use ndarray::prelude::*;
//! use minimization::vector::Powell;
//!
//! let res = Powell::default()
//!     .minimize(
//!         |x: ArrayView1<f64>| (x[0] - 1.0).powi(2) + (x[1] + 2.0).powi(2),
//!         arr1(&[0.0, 0.0]).view(),
//!         None,
//!         None,
//!     )
//!     .unwrap();
//! assert!((res.minimum[0] - 1.0).abs() < 1e-6);
//! assert!((res.minimum[1] + 2.0).abs() < 1e-6);
//! ```

#[macro_use]
extern crate derive_builder;

pub mod error;
pub mod minimizer;
pub mod record;
pub mod scalar;
pub mod vector;

mod utils;

pub use crate::error::{Error, Result};
pub use crate::minimizer::{Minimizer, OptimResult, Status};
pub use crate::record::{IterationRecord, Recorder};

#[cfg(test)]
mod tests {
    use float_cmp::approx_eq;
    use ndarray::prelude::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::scalar::{Brent, BrentRootFinder};
    use super::vector::{BetaFormula, ConjugateGradientBuilder, NelderMeadBuilder, PowellBuilder};
    use super::*;

    fn random_point(rng: &mut StdRng, n: usize) -> Array1<f64> {
        Array1::from_shape_fn(n, |_| rng.gen_range(-5.0..5.0))
    }

    fn assert_close(found: ArrayView1<f64>, expected: ArrayView1<f64>, epsilon: f64) {
        for (f, e) in found.iter().zip(expected) {
            assert!(
                approx_eq!(f64, *f, *e, epsilon = epsilon),
                "{} != {}",
                found,
                expected
            );
        }
    }

    #[test]
    fn multivariate_solvers_find_a_shifted_bowl() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..5 {
            let p = random_point(&mut rng, 3);
            let start = random_point(&mut rng, 3);
            let f = |x: ArrayView1<f64>| (&x - &p).mapv(|d| d * d).sum();
            let grad = |x: ArrayView1<f64>| (&x - &p) * 2.0;

            let nm = NelderMeadBuilder::default()
                .epsilon(1e-14)
                .build()
                .unwrap()
                .minimize(f, start.view())
                .unwrap();
            assert_close(nm.minimum.view(), p.view(), 1e-4);

            let fr = ConjugateGradientBuilder::default()
                .formula(BetaFormula::FletcherReeves)
                .absolute_threshold(1e-14)
                .build()
                .unwrap()
                .minimize(f, grad, start.view())
                .unwrap();
            let pr = ConjugateGradientBuilder::default()
                .formula(BetaFormula::PolakRibiere)
                .absolute_threshold(1e-14)
                .build()
                .unwrap()
                .minimize(f, grad, start.view())
                .unwrap();
            assert_close(fr.minimum.view(), p.view(), 1e-6);
            assert_close(pr.minimum.view(), fr.minimum.view(), 1e-6);

            let powell = PowellBuilder::default()
                .relative_threshold(1e-10)
                .absolute_threshold(1e-12)
                .build()
                .unwrap()
                .minimize(f, start.view(), None, None)
                .unwrap();
            assert_close(powell.minimum.view(), p.view(), 1e-6);
        }
    }

    #[test]
    fn singular_valley_reaches_its_floor() {
        // (a . x)^2 + k is minimal on a whole hyperplane
        let mut rng = StdRng::seed_from_u64(11);
        let a = random_point(&mut rng, 4);
        let k = rng.gen_range(-3.0..3.0);
        let start = random_point(&mut rng, 4);
        let f = |x: ArrayView1<f64>| a.dot(&x).powi(2) + k;
        let grad = |x: ArrayView1<f64>| &a * (2.0 * a.dot(&x));

        let nm = NelderMeadBuilder::default()
            .epsilon(1e-12)
            .build()
            .unwrap()
            .minimize(f, start.view())
            .unwrap();
        assert!(approx_eq!(f64, nm.minimum_value, k, epsilon = 1e-6));

        let cg = ConjugateGradientBuilder::default()
            .absolute_threshold(1e-12)
            .build()
            .unwrap()
            .minimize(f, grad, start.view())
            .unwrap();
        assert!(approx_eq!(f64, cg.minimum_value, k, epsilon = 1e-6));

        let powell = PowellBuilder::default()
            .relative_threshold(1e-10)
            .absolute_threshold(1e-12)
            .build()
            .unwrap()
            .minimize(f, start.view(), None, None)
            .unwrap();
        assert!(approx_eq!(f64, powell.minimum_value, k, epsilon = 1e-6));
    }

    #[test]
    fn scalar_reference_problems() {
        let res = Brent::default()
            .minimize(|x| (x - 3.5872).powi(2), 0.0, 5.0)
            .unwrap();
        assert!(approx_eq!(f64, res.minimum, 3.5872, epsilon = 1e-5));

        let solver = BrentRootFinder::default();
        for &c in &[0.01, 1.0, 1000.0] {
            let root = solver.find_root(|x| x * x - c, 0.0, 100.0);
            assert!(approx_eq!(f64, root.x, c.sqrt(), epsilon = 1e-6));
        }
    }

    #[test]
    fn simplex_from_the_reference_start() {
        let mut rng = StdRng::seed_from_u64(3);
        let config = NelderMeadBuilder::default().epsilon(1e-12).build().unwrap();
        for _ in 0..5 {
            let p1 = f64::from(rng.gen_range(0u32..100));
            let p2 = f64::from(rng.gen_range(0u32..100));
            let res = config
                .minimize(
                    |x: ArrayView1<f64>| (x[0] - p1).powi(2) + (x[1] - p2).powi(2),
                    arr1(&[1.0, 2.0]).view(),
                )
                .unwrap();
            assert_eq!(res.status, Status::Converged);
            assert!(res.iterations < config.max_iterations);
            assert_close(res.minimum.view(), arr1(&[p1, p2]).view(), 1e-4);
        }
    }

    #[test]
    fn finished_solvers_stay_finished() {
        let mut minimizer = Brent::default()
            .minimizer(|x: f64| x.cos(), 2.0, 5.0)
            .unwrap();
        let first = minimizer.minimize().unwrap();
        let second = minimizer.minimize().unwrap();
        assert_eq!(first, second);

        let f = |x: ArrayView1<f64>| x.mapv(|xi| (xi - 1.0).powi(2)).sum();
        let mut minimizer = PowellBuilder::default()
            .build()
            .unwrap()
            .minimizer(f, arr1(&[0.0, 3.0]).view(), None, None)
            .unwrap();
        let first = minimizer.minimize().unwrap();
        let second = minimizer.minimize().unwrap();
        assert_eq!(first, second);
    }
}
