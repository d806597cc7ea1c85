//! Data sources
//!
//! A [`VolumeSource`] supplies the metadata and voxel buffers the stage
//! sequences load. Three implementations ship with the crate:
//!
//! - [`MemorySource`] - Fields held in memory
//! - [`DiskSource`] - A directory of RON metadata and raw little-endian buffers
//! - [`SyntheticSource`] - Deterministic demo dataset of spheres and ellipsoids

mod memory;
mod disk;
mod synthetic;

pub use memory::MemorySource;
pub use disk::DiskSource;
pub use synthetic::{Shape, SyntheticLayer, SyntheticSource};

use crate::error::SourceError;
use crate::field::{SegmentField, VolumeField};
use crate::meta::{SegmentMeta, VolumeMeta};

/// Asynchronous access to volume data
///
/// Futures returned here are awaited by the controller on a single thread;
/// implementations need not be `Send`.
#[allow(async_fn_in_trait)]
pub trait VolumeSource {
    /// Layer ids and their clips
    async fn volume_meta(&self) -> Result<VolumeMeta, SourceError>;

    /// Shape of the shared segmentation grid and each layer's label
    async fn segment_meta(&self) -> Result<SegmentMeta, SourceError>;

    /// Intensity grid spanning the clip of layer `id`
    async fn load_volume(&self, id: &str) -> Result<VolumeField, SourceError>;

    /// Shared segmentation grid, as needed to show layer `id`
    async fn load_segment(&self, id: &str) -> Result<SegmentField, SourceError>;
}
