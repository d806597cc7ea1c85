//! Per-pixel compositing
//!
//! A [`Material`] is built for every frame from the controller's [`Frame`]:
//! it fixes the layout strategy, the uniforms and the bound fields. Its
//! [`composite`](Material::composite) runs the fragment stage for one
//! viewport coordinate and returns `None` for discarded fragments.
//!
//! The SDF family samples intensity and distance at the same coordinate,
//! maps intensity through the colormap, then carves: fragments whose
//! distance lies beyond `surface` turn opaque black (or, with `inverse`,
//! fragments within it).

use sdfview_core::{
    Frame, FrameContent, PipelineError, RenderTarget, SdfField, SegmentField, VolumeField, Window,
};
use sdfview_math::{Rgba, Vec2};

use crate::colormap::{Clim, ColorLut, Colormap};
use crate::framebuffer::Framebuffer;
use crate::layout::Layout;

/// Scalar inputs of the fragment stage
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Uniforms {
    pub surface: f32,
    /// Normalised Z of the single-layer slice
    pub layer: f32,
    pub volume_aspect: f32,
    pub screen_aspect: f32,
    pub clim: Clim,
    pub inverse: bool,
}

impl Uniforms {
    /// Screen aspect over volume aspect
    pub fn ratio(&self) -> f32 {
        if self.volume_aspect <= 0.0 {
            return self.screen_aspect;
        }
        self.screen_aspect / self.volume_aspect
    }
}

/// Fields a material samples
#[derive(Clone, Copy, Debug)]
pub enum MaterialSource<'a> {
    Sdf {
        volume: &'a VolumeField,
        sdf: &'a SdfField,
    },
    Volume {
        volume: &'a VolumeField,
    },
    Segment {
        segment: &'a SegmentField,
        window: Window,
        max_label: u16,
    },
}

/// Layout, uniforms and fields for one frame
#[derive(Clone, Copy, Debug)]
pub struct Material<'a> {
    pub layout: Layout,
    pub uniforms: Uniforms,
    pub source: MaterialSource<'a>,
    pub lut: &'a ColorLut,
}

impl<'a> Material<'a> {
    /// Fragment color at viewport coordinate `uv`, `None` to discard
    pub fn composite(&self, uv: Vec2) -> Option<Rgba> {
        let u = &self.uniforms;
        let placement = self.layout.place(uv, u.ratio(), u.layer)?;
        if placement.border {
            return Some(Rgba::BLACK);
        }
        let coord = placement.coord;

        let color = match self.source {
            MaterialSource::Sdf { volume, sdf } => {
                let color = self.lut.sample(u.clim.normalize(volume.sample(coord)));
                let dist = sdf.sample(coord) - u.surface;
                let carved = if u.inverse { dist <= 0.0 } else { dist > 0.0 };
                if carved {
                    Rgba::BLACK
                } else {
                    color
                }
            }
            MaterialSource::Volume { volume } => self.lut.sample(u.clim.normalize(volume.sample(coord))),
            MaterialSource::Segment {
                segment,
                window,
                max_label,
            } => {
                let label = segment.sample_window(coord, &window);
                if label == 0 {
                    Rgba::BLACK
                } else {
                    self.lut.sample(label as f32 / max_label.max(1) as f32)
                }
            }
        };
        Some(color)
    }

    /// Composite every pixel centre into `target`; discarded pixels keep their value
    pub fn draw(&self, target: &mut Framebuffer) -> usize {
        let mut written = 0;
        for y in 0..target.height() {
            for x in 0..target.width() {
                if let Some(color) = self.composite(target.pixel_uv(x, y)) {
                    target.set(x, y, color);
                    written += 1;
                }
            }
        }
        written
    }
}

/// CPU render target: composites frames into a framebuffer
pub struct Compositor {
    lut: ColorLut,
    clim: Option<Clim>,
    background: Rgba,
    framebuffer: Framebuffer,
    frames: u64,
}

impl Compositor {
    pub fn new(width: u32, height: u32, colormap: Colormap) -> Self {
        Self {
            lut: ColorLut::preset(colormap),
            clim: None,
            background: Rgba::BLACK,
            framebuffer: Framebuffer::new(width, height, Rgba::BLACK),
            frames: 0,
        }
    }

    /// Fixed display range; without one the range of each volume is used
    pub fn with_clim(mut self, clim: Option<Clim>) -> Self {
        self.clim = clim;
        self
    }

    /// Clear color, showing through discarded fragments
    pub fn with_background(mut self, background: Rgba) -> Self {
        self.background = background;
        self.framebuffer.clear(background);
        self
    }

    pub fn framebuffer(&self) -> &Framebuffer {
        &self.framebuffer
    }

    /// Frames rendered so far
    pub fn frame_count(&self) -> u64 {
        self.frames
    }

    /// Material for a frame
    pub fn material<'a>(&'a self, frame: &Frame<'a>) -> Material<'a> {
        let (layout, source, volume) = match frame.content {
            FrameContent::Composite { volume, sdf, layout } => {
                (Layout::from(layout), MaterialSource::Sdf { volume, sdf }, Some(volume))
            }
            FrameContent::Volume { volume } => (Layout::SingleLayer, MaterialSource::Volume { volume }, Some(volume)),
            FrameContent::Segment {
                segment,
                window,
                max_label,
            } => (
                Layout::SingleLayer,
                MaterialSource::Segment {
                    segment,
                    window,
                    max_label,
                },
                None,
            ),
        };

        let clim = self.clim.unwrap_or_else(|| {
            volume
                .map(|v| {
                    let (lo, hi) = v.value_range();
                    Clim::new(lo, hi)
                })
                .unwrap_or_default()
        });

        Material {
            layout,
            uniforms: Uniforms {
                surface: frame.params.surface,
                layer: frame.slice_z,
                volume_aspect: frame.aspect.volume_aspect,
                screen_aspect: frame.aspect.screen_aspect,
                clim,
                inverse: frame.params.inverse,
            },
            source,
            lut: &self.lut,
        }
    }
}

impl RenderTarget for Compositor {
    fn render(&mut self, frame: &Frame<'_>) -> Result<(), PipelineError> {
        let (width, height) = self.framebuffer.size();
        if width == 0 || height == 0 {
            return Err(PipelineError::RenderPrecondition("framebuffer has zero size".to_string()));
        }

        // Draw into a detached buffer so the material can borrow the LUT
        let mut target = std::mem::replace(&mut self.framebuffer, Framebuffer::new(0, 0, self.background));
        target.clear(self.background);
        let written = self.material(frame).draw(&mut target);
        self.framebuffer = target;
        self.frames += 1;

        log::debug!(
            "Composited {} mode frame: {}/{} pixels written",
            frame.params.mode,
            written,
            width as u64 * height as u64
        );
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.framebuffer.resize(width, height, self.background);
    }
}
