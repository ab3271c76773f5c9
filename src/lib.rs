#![allow(unused_parens)]

pub mod branch;
pub mod error;
pub mod history;
pub mod predictor;
pub mod stats;

pub use branch::*;
pub use error::*;
pub use history::*;
pub use predictor::*;
