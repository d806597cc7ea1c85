//! Display modes and parameters
//!
//! [`Params`] is an immutable snapshot. Edits arrive as a [`ParamsDelta`], are
//! validated against the volume metadata, and produce a new snapshot plus the
//! [`ChangeFlags`] that tell the controller whether to re-run the load pipeline
//! or only re-render.

use std::fmt;
use std::str::FromStr;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::meta::VolumeMeta;

/// Lower bound of the surface threshold
pub const SURFACE_MIN: f32 = 0.001;
/// Upper bound of the surface threshold
pub const SURFACE_MAX: f32 = 0.5;

const DEFAULT_SURFACE: f32 = 0.05;

/// Display mode
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mode {
    /// Segmentation labels only
    #[serde(rename = "segment")]
    Segment,
    /// Raw intensity only
    #[serde(rename = "volume")]
    Volume,
    /// Intensity carved by the segment SDF
    #[serde(rename = "volume-segment")]
    VolumeSegment,
    /// Like `VolumeSegment`, with a selectable slice
    #[default]
    #[serde(rename = "layer")]
    Layer,
    /// Like `VolumeSegment`, with every slice tiled into one viewport
    #[serde(rename = "grid layer")]
    GridLayer,
}

/// Layout policy a mode composites with
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LayoutKind {
    /// One slice fills the (letterboxed) viewport
    SingleLayer,
    /// Slices tiled row-major in a rectangular grid
    TiledGrid,
}

impl Mode {
    /// All modes, in the order the control panel lists them
    pub const ALL: [Mode; 5] = [
        Mode::Segment,
        Mode::Layer,
        Mode::GridLayer,
        Mode::Volume,
        Mode::VolumeSegment,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Mode::Segment => "segment",
            Mode::Volume => "volume",
            Mode::VolumeSegment => "volume-segment",
            Mode::Layer => "layer",
            Mode::GridLayer => "grid layer",
        }
    }

    /// Whether the stage sequence clips the segment and derives an SDF
    pub fn needs_sdf(self) -> bool {
        match self {
            Mode::Segment | Mode::Volume => false,
            Mode::VolumeSegment | Mode::Layer | Mode::GridLayer => true,
        }
    }

    pub fn layout(self) -> LayoutKind {
        match self {
            Mode::GridLayer => LayoutKind::TiledGrid,
            Mode::Segment | Mode::Volume | Mode::VolumeSegment | Mode::Layer => {
                LayoutKind::SingleLayer
            }
        }
    }

    /// Pointer picking is only meaningful where a single segment slice is shown
    pub fn supports_picking(self) -> bool {
        matches!(self, Mode::Segment | Mode::Layer)
    }

    /// Next mode in panel order (wraps)
    pub fn next(self) -> Mode {
        let idx = Mode::ALL.iter().position(|&m| m == self).unwrap_or(0);
        Mode::ALL[(idx + 1) % Mode::ALL.len()]
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Mode {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Mode::ALL
            .iter()
            .copied()
            .find(|m| m.name() == s)
            .ok_or_else(|| PipelineError::InvalidParam(format!("unknown mode '{}'", s)))
    }
}

bitflags! {
    /// Which parameters changed in an applied delta
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct ChangeFlags: u8 {
        const NONE = 0;
        const MODE = 1 << 0;
        const SELECT = 1 << 1;
        const SURFACE = 1 << 2;
        const INVERSE = 1 << 3;
        const LAYER = 1 << 4;
        /// Changes that invalidate the bound fields
        const RELOAD = Self::MODE.bits() | Self::SELECT.bits();
    }
}

impl ChangeFlags {
    /// True when the full stage sequence has to run again
    pub fn needs_pipeline(self) -> bool {
        self.intersects(ChangeFlags::RELOAD)
    }
}

/// Currently selected layer and the available choices
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LayerSelection {
    pub select: String,
    pub options: Vec<String>,
}

/// Snapshot of the display parameters
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Params {
    pub mode: Mode,
    pub layers: LayerSelection,
    /// SDF threshold, in `[SURFACE_MIN, SURFACE_MAX]`
    pub surface: f32,
    /// Show the exterior of the surface instead of the interior
    pub inverse: bool,
    /// Absolute slice index, in the selected clip's `[z, z + d]`
    pub layer: u32,
}

impl Params {
    /// Default parameters selecting the first layer of `meta`
    pub fn for_meta(meta: &VolumeMeta, mode: Mode) -> Result<Self, PipelineError> {
        let options = meta.layer_ids();
        let select = options
            .first()
            .cloned()
            .ok_or_else(|| PipelineError::UnknownLayer("<no layers in volume metadata>".to_string()))?;
        let layer = meta.clip(&select).map(|c| c.z).unwrap_or(0);

        Ok(Self {
            mode,
            layers: LayerSelection { select, options },
            surface: DEFAULT_SURFACE,
            inverse: false,
            layer,
        })
    }

    pub fn selected(&self) -> &str {
        &self.layers.select
    }

    /// Validate `delta` and produce the next snapshot
    ///
    /// Selecting a different layer (or entering `layer` mode) re-seeds `layer`
    /// to the new clip's `z` before any explicit `layer` in the delta applies.
    pub fn apply(
        &self,
        delta: &ParamsDelta,
        meta: &VolumeMeta,
    ) -> Result<(Params, ChangeFlags), PipelineError> {
        let mut next = self.clone();
        let mut flags = ChangeFlags::NONE;

        if let Some(mode) = delta.mode {
            if mode != next.mode {
                next.mode = mode;
                flags |= ChangeFlags::MODE;
            }
        }

        if let Some(select) = &delta.select {
            if !meta.contains(select) {
                return Err(PipelineError::UnknownLayer(select.clone()));
            }
            if *select != next.layers.select {
                next.layers.select = select.clone();
                flags |= ChangeFlags::SELECT;
            }
        }

        let clip = meta
            .clip(&next.layers.select)
            .ok_or_else(|| PipelineError::UnknownLayer(next.layers.select.clone()))?;

        let entering_layer_mode = flags.contains(ChangeFlags::MODE) && next.mode == Mode::Layer;
        if flags.contains(ChangeFlags::SELECT) || entering_layer_mode {
            if next.layer != clip.z {
                flags |= ChangeFlags::LAYER;
            }
            next.layer = clip.z;
        }

        if let Some(surface) = delta.surface {
            if !surface.is_finite() || !(SURFACE_MIN..=SURFACE_MAX).contains(&surface) {
                return Err(PipelineError::InvalidParam(format!(
                    "surface {} outside [{}, {}]",
                    surface, SURFACE_MIN, SURFACE_MAX
                )));
            }
            if surface != next.surface {
                next.surface = surface;
                flags |= ChangeFlags::SURFACE;
            }
        }

        if let Some(inverse) = delta.inverse {
            if inverse != next.inverse {
                next.inverse = inverse;
                flags |= ChangeFlags::INVERSE;
            }
        }

        if let Some(layer) = delta.layer {
            let (lo, hi) = clip.slice_range();
            if layer < lo || layer > hi {
                return Err(PipelineError::InvalidParam(format!(
                    "layer {} outside [{}, {}] of '{}'",
                    layer, lo, hi, next.layers.select
                )));
            }
            if layer != next.layer {
                next.layer = layer;
                flags |= ChangeFlags::LAYER;
            }
        }

        Ok((next, flags))
    }
}

/// A set of parameter edits; `None` fields are left unchanged
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParamsDelta {
    pub mode: Option<Mode>,
    pub select: Option<String>,
    pub surface: Option<f32>,
    pub inverse: Option<bool>,
    pub layer: Option<u32>,
}

impl ParamsDelta {
    pub fn mode(mode: Mode) -> Self {
        Self { mode: Some(mode), ..Self::default() }
    }

    pub fn select(id: impl Into<String>) -> Self {
        Self { select: Some(id.into()), ..Self::default() }
    }

    pub fn surface(surface: f32) -> Self {
        Self { surface: Some(surface), ..Self::default() }
    }

    pub fn inverse(inverse: bool) -> Self {
        Self { inverse: Some(inverse), ..Self::default() }
    }

    pub fn layer(layer: u32) -> Self {
        Self { layer: Some(layer), ..Self::default() }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
