//! Dimensions, units, and the unit vocabulary

pub mod dimension;
pub mod unit;
pub mod vocabulary;

pub use dimension::{BaseDim, Dimension, Ratio};
pub use unit::{Unit, UnitTerm};
pub use vocabulary::{parse_target_unit, parse_unit, unknown_unit, Vocabulary, VOCABULARY};
