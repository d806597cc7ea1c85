//! Application systems
//!
//! Window, GPU presentation, and the viewer that drives the mode controller.

mod render;
mod viewer;
mod window;

pub use render::{RenderError, RenderSystem};
pub use viewer::{Controller, DataSource, ViewerSystem};
pub use window::{WindowError, WindowSystem};
