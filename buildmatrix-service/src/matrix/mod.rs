// Matrix module
// Domain model, YAML parsing, and combination expansion for the build matrix

pub mod expander;
pub mod models;
pub mod parser;

pub use expander::{Expansion, MatrixExpander};
pub use models::{
    Axis, AxisValue, BlacklistEntry, Combination, Matrix, OptionSpec, OptionValue, ResolvedOption,
};
pub use parser::MatrixParser;
