//! Core types for sdfview
//!
//! This crate owns everything between the data source and the compositor:
//!
//! - [`VolumeMeta`] / [`SegmentMeta`] - Per-layer clip regions and segment labels
//! - [`Params`] / [`ParamsDelta`] - Display parameters and validated edits
//! - [`Mode`] - Closed set of display modes, each with its own stage sequence
//! - [`VoxelGrid`] - 3D fields (volume intensity, segment labels, SDF)
//! - [`ResourceRegistry`] - Explicitly released field bindings
//! - [`VolumeSource`] - Asynchronous access to metadata and voxel buffers
//! - [`SdfDeriver`] - Segment clipping and signed distance derivation
//! - [`ModeController`] - The load → derive → render pipeline
//! - [`ControlPanel`] - Per-mode parameter controls

mod error;
mod meta;
mod params;
mod field;
mod resources;
mod busy;
mod frame;
mod sdf;
mod controls;
mod controller;
pub mod source;

pub use error::{SourceError, PipelineError};
pub use meta::{Clip, LayerMeta, VolumeMeta, SegmentMeta};
pub use params::{Mode, LayoutKind, LayerSelection, Params, ParamsDelta, ChangeFlags, SURFACE_MIN, SURFACE_MAX};
pub use field::{Extent3, Window, VoxelGrid, VolumeField, SegmentField, SdfField, SegmentMask};
pub use resources::{ResourceRegistry, ResourceKey, BoundResource};
pub use busy::{BusyIndicator, BusyGuard};
pub use frame::{slice_z, AspectState, Frame, FrameContent, RenderTarget};
pub use sdf::{SdfDeriver, DistanceTransform};
pub use controls::{ControlPanel, Control, ControlKind, ParamKey, SURFACE_STEP};
pub use controller::{ModeController, Outcome, PickScene};
pub use source::{VolumeSource, MemorySource, DiskSource, SyntheticSource};

// Re-export math types used in public signatures
pub use sdfview_math::{Vec2, Vec3, Rgba};
