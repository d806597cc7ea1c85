//! Segment clipping and signed distance derivation
//!
//! [`SdfDeriver`] is the asynchronous seam the controller awaits.
//! [`DistanceTransform`] is the CPU implementation: an exact Euclidean
//! distance transform (Felzenszwalb & Huttenlocher lower envelope of
//! parabolas), applied separably along x, y and z.

use crate::error::PipelineError;
use crate::field::{Extent3, SdfField, SegmentField, SegmentMask, VoxelGrid, Window};
use crate::meta::Clip;

/// Stand-in for "no feature on this line"; finite so the envelope math stays NaN-free
const FAR: f64 = 1.0e20;

/// Derives the fields the compositing modes carve with
#[allow(async_fn_in_trait)]
pub trait SdfDeriver {
    /// Binary mask of the voxels of `segment` inside `clip` carrying `label`
    async fn clip_segment(
        &self,
        segment: &SegmentField,
        clip: &Clip,
        label: u16,
    ) -> Result<SegmentMask, PipelineError>;

    /// Signed distance field of a mask: positive outside, non-positive inside,
    /// normalised by the largest mask dimension
    async fn derive_sdf(&self, mask: &SegmentMask) -> Result<SdfField, PipelineError>;
}

/// Exact Euclidean distance transform on the CPU
#[derive(Clone, Copy, Debug, Default)]
pub struct DistanceTransform;

impl DistanceTransform {
    pub fn new() -> Self {
        Self
    }

    /// Synchronous body of [`SdfDeriver::clip_segment`]
    pub fn clip_mask(
        segment: &SegmentField,
        clip: &Clip,
        label: u16,
    ) -> Result<SegmentMask, PipelineError> {
        if label == 0 {
            return Err(PipelineError::DerivationFailure(
                "label 0 is reserved for background".to_string(),
            ));
        }
        let extent = segment.extent();
        let fits = clip.x as u64 + clip.w as u64 <= extent.w as u64
            && clip.y as u64 + clip.h as u64 <= extent.h as u64
            && clip.z as u64 + clip.d as u64 <= extent.d as u64;
        if !fits {
            return Err(PipelineError::DerivationFailure(format!(
                "clip {:?} exceeds segment extent {}x{}x{}",
                clip, extent.w, extent.h, extent.d
            )));
        }

        let window = Window::from_clip(clip);
        let mask = VoxelGrid::from_fn(window.extent, |x, y, z| {
            segment.get(clip.x + x, clip.y + y, clip.z + z) == Some(label)
        });
        if !mask.data().iter().any(|&inside| inside) {
            return Err(PipelineError::DerivationFailure(format!(
                "label {} has no voxels inside the clip",
                label
            )));
        }
        Ok(mask)
    }

    /// Synchronous body of [`SdfDeriver::derive_sdf`]
    pub fn signed_distance(mask: &SegmentMask) -> Result<SdfField, PipelineError> {
        let extent = mask.extent();
        if extent.is_empty() {
            return Err(PipelineError::DerivationFailure("mask has no voxels".to_string()));
        }
        if !mask.data().iter().any(|&inside| inside) {
            return Err(PipelineError::DerivationFailure("mask is empty".to_string()));
        }

        // Squared distance to the nearest inside voxel, and to the nearest outside voxel
        let to_inside = squared_distance(mask, true);
        let to_outside = squared_distance(mask, false);

        let scale = extent.w.max(extent.h).max(extent.d) as f64;
        let diagonal = ((extent.w as f64).powi(2)
            + (extent.h as f64).powi(2)
            + (extent.d as f64).powi(2))
        .sqrt();
        let distance = |sq: f64| if sq >= FAR * 0.5 { diagonal } else { sq.sqrt() };

        let data = to_inside
            .iter()
            .zip(&to_outside)
            .map(|(&inside, &outside)| ((distance(inside) - distance(outside)) / scale) as f32)
            .collect();
        VoxelGrid::new(extent, data).map_err(|e| PipelineError::DerivationFailure(e.to_string()))
    }
}

impl SdfDeriver for DistanceTransform {
    async fn clip_segment(
        &self,
        segment: &SegmentField,
        clip: &Clip,
        label: u16,
    ) -> Result<SegmentMask, PipelineError> {
        Self::clip_mask(segment, clip, label)
    }

    async fn derive_sdf(&self, mask: &SegmentMask) -> Result<SdfField, PipelineError> {
        Self::signed_distance(mask)
    }
}

/// Squared Euclidean distance from every voxel to the nearest voxel whose mask equals `feature`
fn squared_distance(mask: &SegmentMask, feature: bool) -> Vec<f64> {
    let extent = mask.extent();
    let mut grid: Vec<f64> = mask
        .data()
        .iter()
        .map(|&inside| if inside == feature { 0.0 } else { FAR })
        .collect();

    transform_axis(&mut grid, extent, Axis::X);
    transform_axis(&mut grid, extent, Axis::Y);
    transform_axis(&mut grid, extent, Axis::Z);
    grid
}

#[derive(Clone, Copy)]
enum Axis {
    X,
    Y,
    Z,
}

/// Run the 1D transform along every line parallel to `axis`
fn transform_axis(grid: &mut [f64], extent: Extent3, axis: Axis) {
    let (w, h, d) = (extent.w as usize, extent.h as usize, extent.d as usize);
    let (len, stride, lines): (usize, usize, Vec<usize>) = match axis {
        Axis::X => (w, 1, (0..h * d).map(|line| line * w).collect()),
        Axis::Y => (
            h,
            w,
            (0..d)
                .flat_map(|z| (0..w).map(move |x| z * w * h + x))
                .collect(),
        ),
        Axis::Z => (d, w * h, (0..w * h).collect()),
    };

    let mut f = vec![0.0; len];
    let mut out = vec![0.0; len];
    let mut v = vec![0usize; len];
    let mut z = vec![0.0; len + 1];

    for start in lines {
        for (i, slot) in f.iter_mut().enumerate() {
            *slot = grid[start + i * stride];
        }
        lower_envelope(&f, &mut out, &mut v, &mut z);
        for (i, value) in out.iter().enumerate() {
            grid[start + i * stride] = *value;
        }
    }
}

/// 1D squared distance transform of sampled function `f`
fn lower_envelope(f: &[f64], out: &mut [f64], v: &mut [usize], z: &mut [f64]) {
    let n = f.len();
    if n == 0 {
        return;
    }

    let mut k = 0;
    v[0] = 0;
    z[0] = f64::NEG_INFINITY;
    z[1] = f64::INFINITY;

    for q in 1..n {
        let qf = q as f64;
        loop {
            let p = v[k];
            let pf = p as f64;
            let s = ((f[q] + qf * qf) - (f[p] + pf * pf)) / (2.0 * qf - 2.0 * pf);
            if s <= z[k] {
                // z[0] is -inf, so this never steps below the first parabola
                k -= 1;
                continue;
            }
            k += 1;
            v[k] = q;
            z[k] = s;
            z[k + 1] = f64::INFINITY;
            break;
        }
    }

    k = 0;
    for (q, slot) in out.iter_mut().enumerate() {
        let qf = q as f64;
        while z[k + 1] < qf {
            k += 1;
        }
        let p = v[k] as f64;
        *slot = (qf - p) * (qf - p) + f[v[k]];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment() -> SegmentField {
        // 8x8x4 grid, label 2 fills x in 2..5, y in 2..5, z in 1..3
        VoxelGrid::from_fn(Extent3::new(8, 8, 4), |x, y, z| {
            if (2..5).contains(&x) && (2..5).contains(&y) && (1..3).contains(&z) {
                2
            } else if x == 7 {
                1
            } else {
                0
            }
        })
    }

    #[test]
    fn test_clip_mask_selects_label_inside_clip() {
        let clip = Clip::new(1, 1, 0, 6, 6, 4);
        let mask = DistanceTransform::clip_mask(&segment(), &clip, 2).unwrap();
        assert_eq!(mask.extent(), Extent3::new(6, 6, 4));
        assert_eq!(mask.get(1, 1, 1), Some(true));
        assert_eq!(mask.get(0, 0, 1), Some(false));
        assert_eq!(mask.data().iter().filter(|&&m| m).count(), 18);
    }

    #[test]
    fn test_clip_mask_empty_is_derivation_failure() {
        let clip = Clip::new(0, 0, 0, 2, 2, 2);
        let err = DistanceTransform::clip_mask(&segment(), &clip, 2).unwrap_err();
        assert!(matches!(err, PipelineError::DerivationFailure(_)));
    }

    #[test]
    fn test_clip_mask_out_of_bounds() {
        let clip = Clip::new(4, 0, 0, 8, 8, 4);
        assert!(DistanceTransform::clip_mask(&segment(), &clip, 2).is_err());
    }

    #[test]
    fn test_signed_distance_1d() {
        let mask = VoxelGrid::from_fn(Extent3::new(5, 1, 1), |x, _, _| x == 2);
        let sdf = DistanceTransform::signed_distance(&mask).unwrap();
        let expected = [2.0, 1.0, -1.0, 1.0, 2.0].map(|v: f32| v / 5.0);
        for (got, want) in sdf.data().iter().zip(expected) {
            assert!((got - want).abs() < 1e-6, "got {} want {}", got, want);
        }
    }

    #[test]
    fn test_signed_distance_is_euclidean() {
        let mask = VoxelGrid::from_fn(Extent3::new(5, 5, 1), |x, y, _| x == 0 && y == 0);
        let sdf = DistanceTransform::signed_distance(&mask).unwrap();
        let d = sdf.get(3, 4, 0).unwrap() * 5.0;
        assert!((d - 5.0).abs() < 1e-5);
    }

    #[test]
    fn test_signed_distance_sign() {
        let clip = Clip::new(0, 0, 0, 8, 8, 4);
        let mask = DistanceTransform::clip_mask(&segment(), &clip, 2).unwrap();
        let sdf = DistanceTransform::signed_distance(&mask).unwrap();
        assert!(sdf.get(3, 3, 1).unwrap() < 0.0);
        assert!(sdf.get(0, 0, 0).unwrap() > 0.0);
        // Deeper inside is more negative than the boundary
        assert!(sdf.get(3, 3, 1).unwrap() <= sdf.get(2, 2, 1).unwrap());
    }

    #[test]
    fn test_full_mask_is_all_inside() {
        let mask = VoxelGrid::filled(Extent3::new(3, 3, 3), true);
        let sdf = DistanceTransform::signed_distance(&mask).unwrap();
        assert!(sdf.data().iter().all(|&v| v < 0.0));
    }

    #[test]
    fn test_deriver_trait_is_async() {
        let clip = Clip::new(0, 0, 0, 8, 8, 4);
        let deriver = DistanceTransform::new();
        let sdf = pollster::block_on(async {
            let mask = deriver.clip_segment(&segment(), &clip, 2).await?;
            deriver.derive_sdf(&mask).await
        })
        .unwrap();
        assert_eq!(sdf.extent(), Extent3::new(8, 8, 4));
    }
}
