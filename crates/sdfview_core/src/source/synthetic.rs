//! Deterministic demo dataset
//!
//! Each layer is an analytic solid centred in its clip. The segment grid
//! labels the solid; the intensity grid is a soft blob over a faint
//! background pattern so the colormap has something to show outside the
//! surface too.

use sdfview_math::Vec3;

use super::MemorySource;
use crate::error::SourceError;
use crate::field::{Extent3, VoxelGrid};
use crate::meta::{Clip, SegmentMeta, VolumeMeta};

/// Analytic solid, sized in voxels
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Shape {
    Sphere { radius: f32 },
    Ellipsoid { radii: Vec3 },
}

impl Shape {
    /// Normalised radial distance of `p` (relative to the centre); `<= 1` is inside
    fn radial(&self, p: Vec3) -> f32 {
        match *self {
            Shape::Sphere { radius } => p.length() / radius.max(f32::EPSILON),
            Shape::Ellipsoid { radii } => Vec3::new(
                p.x / radii.x.max(f32::EPSILON),
                p.y / radii.y.max(f32::EPSILON),
                p.z / radii.z.max(f32::EPSILON),
            )
            .length(),
        }
    }
}

/// One synthetic layer
#[derive(Clone, Debug, PartialEq)]
pub struct SyntheticLayer {
    pub id: String,
    pub clip: Clip,
    pub shape: Shape,
}

/// Builder for an in-memory dataset of analytic solids
#[derive(Clone, Debug)]
pub struct SyntheticSource {
    extent: [u32; 3],
    layers: Vec<SyntheticLayer>,
}

impl SyntheticSource {
    pub fn new(extent: [u32; 3]) -> Self {
        Self {
            extent,
            layers: Vec::new(),
        }
    }

    pub fn with_layer(mut self, id: impl Into<String>, clip: Clip, shape: Shape) -> Self {
        self.layers.push(SyntheticLayer {
            id: id.into(),
            clip,
            shape,
        });
        self
    }

    /// Three layers stacked in a 96x64x48 space
    pub fn demo() -> Self {
        Self::new([96, 64, 48])
            .with_layer("L1", Clip::new(4, 4, 0, 56, 40, 16), Shape::Sphere { radius: 14.0 })
            .with_layer(
                "L2",
                Clip::new(30, 10, 16, 60, 44, 16),
                Shape::Ellipsoid {
                    radii: Vec3::new(26.0, 14.0, 7.0),
                },
            )
            .with_layer("L3", Clip::new(20, 20, 32, 40, 40, 16), Shape::Sphere { radius: 10.0 })
    }

    pub fn layers(&self) -> &[SyntheticLayer] {
        &self.layers
    }

    /// Rasterise every layer into a [`MemorySource`]
    ///
    /// Layers are labelled `1..` in insertion order; later layers overwrite
    /// earlier ones where their solids overlap.
    pub fn build(&self) -> Result<MemorySource, SourceError> {
        let extent = Extent3::from(self.extent);
        let mut segment = VoxelGrid::filled(extent, 0u16);
        let mut volume_meta = VolumeMeta::new();
        let mut segment_meta = SegmentMeta::new(self.extent);

        for (index, layer) in self.layers.iter().enumerate() {
            let label = u16::try_from(index + 1)
                .map_err(|_| SourceError::Format("too many synthetic layers".to_string()))?;
            let clip = layer.clip;
            if clip.x + clip.w > extent.w || clip.y + clip.h > extent.h || clip.z + clip.d > extent.d {
                return Err(SourceError::Format(format!(
                    "layer '{}' clip {:?} exceeds extent {:?}",
                    layer.id, clip, extent
                )));
            }

            for z in 0..clip.d {
                for y in 0..clip.h {
                    for x in 0..clip.w {
                        if layer.shape.radial(local(&clip, x, y, z)) <= 1.0 {
                            segment.set(clip.x + x, clip.y + y, clip.z + z, label);
                        }
                    }
                }
            }

            volume_meta = volume_meta.with_layer(layer.id.clone(), clip);
            segment_meta = segment_meta.with_label(layer.id.clone(), label);
        }

        let mut source = MemorySource::new(volume_meta, segment_meta, segment)?;
        for layer in &self.layers {
            let clip = layer.clip;
            let volume = VoxelGrid::from_fn(Extent3::new(clip.w, clip.h, clip.d), |x, y, z| {
                intensity(layer.shape.radial(local(&clip, x, y, z)), x, y)
            });
            source.insert_volume(&layer.id, volume)?;
        }

        log::debug!("Built synthetic dataset with {} layer(s)", self.layers.len());
        Ok(source)
    }
}

/// Voxel centre relative to the clip centre
fn local(clip: &Clip, x: u32, y: u32, z: u32) -> Vec3 {
    Vec3::new(
        x as f32 + 0.5 - clip.w as f32 * 0.5,
        y as f32 + 0.5 - clip.h as f32 * 0.5,
        z as f32 + 0.5 - clip.d as f32 * 0.5,
    )
}

fn intensity(radial: f32, x: u32, y: u32) -> f32 {
    let background = 0.15 + 0.05 * ((x as f32 * 0.35).sin() * (y as f32 * 0.27).cos());
    let blob = (1.0 - radial).max(0.0);
    background + 0.8 * blob.sqrt()
}
