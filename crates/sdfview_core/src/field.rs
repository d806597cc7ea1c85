//! 3D voxel fields
//!
//! All fields share one layout: x varies fastest, then y, then z.
//! Sampling takes normalized coordinates in `[0, 1]` and uses nearest-voxel
//! lookup with clamp-to-edge, like a 3D texture with nearest filtering.

use sdfview_math::Vec3;

use crate::error::SourceError;
use crate::meta::Clip;

/// Grid dimensions
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Extent3 {
    pub w: u32,
    pub h: u32,
    pub d: u32,
}

impl Extent3 {
    pub const fn new(w: u32, h: u32, d: u32) -> Self {
        Self { w, h, d }
    }

    pub fn voxel_count(&self) -> usize {
        self.w as usize * self.h as usize * self.d as usize
    }

    pub fn is_empty(&self) -> bool {
        self.voxel_count() == 0
    }
}

impl From<[u32; 3]> for Extent3 {
    fn from(e: [u32; 3]) -> Self {
        Self::new(e[0], e[1], e[2])
    }
}

/// A box-shaped view into a grid, used to sample a clip region of a larger field
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Window {
    pub origin: [u32; 3],
    pub extent: Extent3,
}

impl Window {
    /// Window covering a whole grid
    pub fn full(extent: Extent3) -> Self {
        Self { origin: [0; 3], extent }
    }

    pub fn from_clip(clip: &Clip) -> Self {
        Self {
            origin: [clip.x, clip.y, clip.z],
            extent: Extent3::new(clip.w, clip.h, clip.d),
        }
    }
}

/// Dense 3D grid of voxels
#[derive(Clone, Debug, PartialEq)]
pub struct VoxelGrid<T> {
    extent: Extent3,
    data: Vec<T>,
}

/// Raw intensity field
pub type VolumeField = VoxelGrid<f32>;
/// Segment label field (0 = background)
pub type SegmentField = VoxelGrid<u16>;
/// Signed distance field, positive outside the surface
pub type SdfField = VoxelGrid<f32>;
/// Binary inside/outside mask of one segment
pub type SegmentMask = VoxelGrid<bool>;

impl<T: Copy + Default> VoxelGrid<T> {
    /// Wrap a buffer, checking it matches the extent
    pub fn new(extent: Extent3, data: Vec<T>) -> Result<Self, SourceError> {
        if data.len() != extent.voxel_count() {
            return Err(SourceError::Format(format!(
                "expected {} voxels for {}x{}x{}, got {}",
                extent.voxel_count(),
                extent.w,
                extent.h,
                extent.d,
                data.len()
            )));
        }
        Ok(Self { extent, data })
    }

    /// Grid filled with `value`
    pub fn filled(extent: Extent3, value: T) -> Self {
        Self {
            extent,
            data: vec![value; extent.voxel_count()],
        }
    }

    /// Build a grid by evaluating `f(x, y, z)` for every voxel
    pub fn from_fn(extent: Extent3, mut f: impl FnMut(u32, u32, u32) -> T) -> Self {
        let mut data = Vec::with_capacity(extent.voxel_count());
        for z in 0..extent.d {
            for y in 0..extent.h {
                for x in 0..extent.w {
                    data.push(f(x, y, z));
                }
            }
        }
        Self { extent, data }
    }

    pub fn extent(&self) -> Extent3 {
        self.extent
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    #[inline]
    pub fn index(&self, x: u32, y: u32, z: u32) -> usize {
        (z as usize * self.extent.h as usize + y as usize) * self.extent.w as usize + x as usize
    }

    /// Voxel at integer coordinates, `None` outside the grid
    #[inline]
    pub fn get(&self, x: u32, y: u32, z: u32) -> Option<T> {
        if x >= self.extent.w || y >= self.extent.h || z >= self.extent.d {
            return None;
        }
        Some(self.data[self.index(x, y, z)])
    }

    #[inline]
    pub fn set(&mut self, x: u32, y: u32, z: u32, value: T) {
        let idx = self.index(x, y, z);
        self.data[idx] = value;
    }

    /// Nearest-voxel sample of the whole grid at normalized coordinates
    pub fn sample(&self, uvw: Vec3) -> T {
        self.sample_window(uvw, &Window::full(self.extent))
    }

    /// Nearest-voxel sample of a sub-box at coordinates normalized to that box
    ///
    /// Coordinates are clamped to the window; voxels of the window lying
    /// outside the grid read as `T::default()`.
    pub fn sample_window(&self, uvw: Vec3, window: &Window) -> T {
        let ext = window.extent;
        if ext.is_empty() {
            return T::default();
        }
        let x = window.origin[0] + texel(uvw.x, ext.w);
        let y = window.origin[1] + texel(uvw.y, ext.h);
        let z = window.origin[2] + texel(uvw.z, ext.d);
        self.get(x, y, z).unwrap_or_default()
    }
}

impl VoxelGrid<f32> {
    /// Minimum and maximum value (`(0, 0)` for an empty grid)
    pub fn value_range(&self) -> (f32, f32) {
        let mut iter = self.data.iter().copied().filter(|v| v.is_finite());
        let Some(first) = iter.next() else {
            return (0.0, 0.0);
        };
        iter.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v)))
    }
}

/// Nearest texel index for a normalized coordinate, clamped to the edge
#[inline]
fn texel(coord: f32, size: u32) -> u32 {
    let scaled = (coord * size as f32).floor();
    if scaled.is_nan() || scaled < 0.0 {
        0
    } else {
        (scaled as u32).min(size - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp() -> VolumeField {
        VoxelGrid::from_fn(Extent3::new(4, 2, 3), |x, y, z| (x + 10 * y + 100 * z) as f32)
    }

    #[test]
    fn test_new_checks_length() {
        assert!(VoxelGrid::new(Extent3::new(2, 2, 2), vec![0.0f32; 8]).is_ok());
        let err = VoxelGrid::new(Extent3::new(2, 2, 2), vec![0.0f32; 7]).unwrap_err();
        assert!(matches!(err, SourceError::Format(_)));
    }

    #[test]
    fn test_index_layout_x_fastest() {
        let grid = ramp();
        assert_eq!(grid.get(1, 0, 0), Some(1.0));
        assert_eq!(grid.get(0, 1, 0), Some(10.0));
        assert_eq!(grid.get(0, 0, 2), Some(200.0));
        assert_eq!(grid.get(4, 0, 0), None);
    }

    #[test]
    fn test_sample_nearest() {
        let grid = ramp();
        // x = 0.6 * 4 = 2.4 -> 2, y = 0.9 * 2 = 1.8 -> 1, z = 0.5 * 3 = 1.5 -> 1
        assert_eq!(grid.sample(Vec3::new(0.6, 0.9, 0.5)), 112.0);
    }

    #[test]
    fn test_sample_clamps_to_edge() {
        let grid = ramp();
        assert_eq!(grid.sample(Vec3::new(1.0, 1.0, 1.0)), 213.0);
        assert_eq!(grid.sample(Vec3::new(-0.5, -1.0, -2.0)), 0.0);
    }

    #[test]
    fn test_sample_window() {
        let grid = ramp();
        let window = Window {
            origin: [2, 1, 1],
            extent: Extent3::new(2, 1, 2),
        };
        assert_eq!(grid.sample_window(Vec3::new(0.0, 0.0, 0.0), &window), 112.0);
        assert_eq!(grid.sample_window(Vec3::new(0.99, 0.5, 0.99), &window), 213.0);
    }

    #[test]
    fn test_window_outside_grid_reads_default() {
        let grid = ramp();
        let window = Window {
            origin: [3, 0, 0],
            extent: Extent3::new(4, 2, 3),
        };
        assert_eq!(grid.sample_window(Vec3::new(0.9, 0.0, 0.0), &window), 0.0);
    }

    #[test]
    fn test_value_range() {
        assert_eq!(ramp().value_range(), (0.0, 213.0));
    }
}
