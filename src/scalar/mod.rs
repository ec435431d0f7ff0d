//! This module contains algorithms that search for local minima of functions along a single
//! dimension, plus the bracketing root finder the conjugate-gradient line search relies on.

mod brent;
mod brent_root;
mod golden_section;
mod newton_raphson;

pub(crate) use self::brent::GOLDEN;
pub use self::brent::{Brent, BrentBuilder, BrentMinimizer};
pub use self::brent_root::{BrentRootFinder, BrentRootFinderBuilder, Root};
pub use self::golden_section::{GoldenSection, GoldenSectionBuilder, GoldenSectionMinimizer};
pub use self::newton_raphson::{NewtonRaphson, NewtonRaphsonBuilder, NewtonRaphsonMinimizer};
