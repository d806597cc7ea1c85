//! Compositing and presentation for sdfview
//!
//! This crate turns the fields bound by the controller into pixels and puts
//! them on screen.
//!
//! ## Key Components
//!
//! - [`layout::Layout`] - SingleLayer letterboxing and TiledGrid slice tiling
//! - [`colormap::ColorLut`] - 1D color lookup with linear filtering
//! - [`compositor::Compositor`] - Per-pixel compositing into a [`framebuffer::Framebuffer`]
//! - [`picker::Picker`] - Pointer position to segment label
//! - [`context::RenderContext`] - WGPU device, queue, and surface management
//! - [`pipeline::PresentPipeline`] - Draws the framebuffer to the surface

pub mod layout;
pub mod colormap;
pub mod encoding;
pub mod framebuffer;
pub mod compositor;
pub mod picker;
pub mod context;
pub mod pipeline;

pub use layout::{GridDims, Layout, Placement};
pub use colormap::{Clim, ColorLut, Colormap};
pub use framebuffer::Framebuffer;
pub use compositor::{Compositor, Material, MaterialSource, Uniforms};
pub use picker::{PickedLabel, Picker};
pub use context::{ContextError, RenderContext};
pub use pipeline::PresentPipeline;
