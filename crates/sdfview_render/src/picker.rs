//! Pointer picking
//!
//! Maps a pointer position to the segment label under it using the same
//! single-layer geometry the compositor draws with, so a pick succeeds
//! exactly where a fragment is drawn.

use sdfview_core::{Clip, PickScene};
use sdfview_math::Vec2;

use crate::layout::Layout;

/// Layer found under the pointer
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PickedLabel {
    pub id: String,
    pub clip: Clip,
}

/// Stateless picker over a [`PickScene`]
#[derive(Clone, Copy, Debug, Default)]
pub struct Picker;

impl Picker {
    /// Layer under normalised device coordinates `ndc` (`[-1, 1]`, y up)
    pub fn pick(scene: &PickScene, ndc: Vec2) -> Option<PickedLabel> {
        if !scene.params.mode.supports_picking() {
            return None;
        }
        let uv = ndc_to_uv(ndc);
        let placement = Layout::SingleLayer.place(uv, scene.aspect.ratio(), scene.slice_z)?;
        let label = scene.segment.sample_window(placement.coord, &scene.window());
        if label == 0 {
            return None;
        }
        let (id, clip) = scene.resolve(label)?;
        log::debug!("Picked label {} ({})", label, id);
        Some(PickedLabel { id, clip })
    }
}

/// NDC to viewport coordinate (origin top-left)
#[inline]
pub fn ndc_to_uv(ndc: Vec2) -> Vec2 {
    Vec2::new((ndc.x + 1.0) / 2.0, (1.0 - ndc.y) / 2.0)
}

/// Cursor position in physical pixels to NDC
#[inline]
pub fn cursor_to_ndc(x: f64, y: f64, width: u32, height: u32) -> Vec2 {
    let w = width.max(1) as f64;
    let h = height.max(1) as f64;
    Vec2::new((x / w * 2.0 - 1.0) as f32, (1.0 - y / h * 2.0) as f32)
}
