//! GPU pipelines
//!
//! The compositor runs on the CPU; the GPU only presents its framebuffer.

pub mod present_pipeline;

pub use present_pipeline::{PresentPipeline, FRAME_FORMAT};
