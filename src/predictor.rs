//! Implementations of different branch-direction predictors.

pub mod table;
pub mod simple;
pub mod perceptron;

pub use table::*;
pub use simple::*;
pub use perceptron::*;

use crate::Outcome;

/// Interface to a "trivial" predictor that guesses an outcome without
/// accepting feedback from the rest of the machine.
pub trait SimplePredictor {
    fn name(&self) -> &'static str;
    fn predict(&self) -> Outcome;
}
