//! sdfview application library
//!
//! Configuration, input mapping, and the systems the binary wires together.

pub mod config;
pub mod input;
pub mod systems;
