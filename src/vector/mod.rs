//! Algorithms that search for local minima of functions along multiple dimensions.

mod conjugate_gradient;
pub mod line_search;
mod nelder_mead;
mod point_value;
mod powell;

pub use self::conjugate_gradient::{
    BetaFormula, ConjugateGradient, ConjugateGradientBuilder, ConjugateGradientMinimizer,
};
pub use self::nelder_mead::{NelderMead, NelderMeadBuilder, NelderMeadMinimizer};
pub use self::point_value::PointValue;
pub use self::powell::{Powell, PowellBuilder, PowellMinimizer};
