//! Math types for the sdfview crates
//!
//! ## Core Types
//!
//! - [`Vec2`] - 2D vector used for fragment and pointer coordinates
//! - [`Vec3`] - 3D vector used for normalized volume sample coordinates
//! - [`Rgba`] - Linear RGBA color

mod vec2;
mod vec3;
mod color;

pub use vec2::Vec2;
pub use vec3::Vec3;
pub use color::Rgba;
