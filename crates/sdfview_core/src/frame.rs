//! Render inputs handed from the controller to a render target

use crate::error::PipelineError;
use crate::field::{SdfField, SegmentField, VolumeField, Window};
use crate::meta::Clip;
use crate::params::{LayoutKind, Mode, Params};

/// Aspect ratios the layout policies letterbox against
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AspectState {
    /// Width over height of the selected clip
    pub volume_aspect: f32,
    /// Width over height of the viewport
    pub screen_aspect: f32,
}

impl AspectState {
    pub fn new(volume_aspect: f32, screen_aspect: f32) -> Self {
        Self {
            volume_aspect,
            screen_aspect,
        }
    }

    /// Aspect state for a clip shown in a `width` x `height` viewport
    pub fn for_viewport(clip: &Clip, width: u32, height: u32) -> Self {
        let screen_aspect = if height == 0 {
            1.0
        } else {
            width as f32 / height as f32
        };
        Self::new(clip.aspect(), screen_aspect)
    }

    /// Screen aspect over volume aspect
    pub fn ratio(&self) -> f32 {
        if self.volume_aspect <= 0.0 {
            return self.screen_aspect;
        }
        self.screen_aspect / self.volume_aspect
    }
}

impl Default for AspectState {
    fn default() -> Self {
        Self::new(1.0, 1.0)
    }
}

/// Fields the current mode composites
#[derive(Clone, Copy, Debug)]
pub enum FrameContent<'a> {
    /// Segment labels seen through the selected clip
    Segment {
        segment: &'a SegmentField,
        window: Window,
        max_label: u16,
    },
    /// Raw intensity of the selected clip
    Volume { volume: &'a VolumeField },
    /// Intensity carved by the SDF of the selected segment
    Composite {
        volume: &'a VolumeField,
        sdf: &'a SdfField,
        layout: LayoutKind,
    },
}

/// Everything a render target needs for one frame
#[derive(Clone, Copy, Debug)]
pub struct Frame<'a> {
    pub params: &'a Params,
    pub aspect: AspectState,
    pub clip: Clip,
    /// Normalized Z sampled by the single-layer layout
    pub slice_z: f32,
    pub content: FrameContent<'a>,
}

/// Normalized slice coordinate for the current parameters
///
/// `layer` mode addresses the centre of the absolute slice within the clip,
/// so nearest sampling lands on exactly that slice. The top of the range
/// `z + d` shows the last slice. The other single-layer modes show the middle.
pub fn slice_z(params: &Params, clip: &Clip) -> f32 {
    match params.mode {
        Mode::Layer => {
            if clip.d == 0 {
                return 0.0;
            }
            let offset = params.layer.saturating_sub(clip.z).min(clip.d - 1);
            (offset as f32 + 0.5) / clip.d as f32
        }
        Mode::Segment | Mode::Volume | Mode::VolumeSegment | Mode::GridLayer => 0.5,
    }
}

/// Something that can draw a [`Frame`]
pub trait RenderTarget {
    fn render(&mut self, frame: &Frame<'_>) -> Result<(), PipelineError>;

    /// Viewport size changed
    fn resize(&mut self, width: u32, height: u32);
}
