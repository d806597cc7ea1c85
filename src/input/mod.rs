//! Input handling module
//!
//! Maps raw window events to viewer actions.

mod input_mapper;

pub use input_mapper::{InputMapper, InputAction};
