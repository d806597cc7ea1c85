//! Colormap lookup tables
//!
//! A [`ColorLut`] behaves like a 1D texture with linear filtering and
//! clamp-to-edge addressing: texel `i` sits at `(i + 0.5) / len`.

use std::fmt;
use std::str::FromStr;

use sdfview_math::Rgba;
use serde::{Deserialize, Serialize};

use crate::encoding::srgb_to_linear;

/// Texels in a preset LUT
pub const LUT_SIZE: usize = 256;

/// Viridis control points (sRGB), evenly spaced
const VIRIDIS: [[f32; 3]; 9] = [
    [0.267004, 0.004874, 0.329415],
    [0.282623, 0.140926, 0.457517],
    [0.253935, 0.265254, 0.529983],
    [0.206756, 0.371758, 0.553117],
    [0.163625, 0.471133, 0.558148],
    [0.127568, 0.566949, 0.550556],
    [0.134692, 0.658636, 0.517649],
    [0.266941, 0.748751, 0.440573],
    [0.993248, 0.906157, 0.143936],
];

/// Named colormap presets
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Colormap {
    Gray,
    #[default]
    Viridis,
}

impl Colormap {
    pub fn name(self) -> &'static str {
        match self {
            Colormap::Gray => "gray",
            Colormap::Viridis => "viridis",
        }
    }
}

impl fmt::Display for Colormap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Colormap {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gray" | "grey" => Ok(Colormap::Gray),
            "viridis" => Ok(Colormap::Viridis),
            other => Err(format!("unknown colormap '{}'", other)),
        }
    }
}

/// Display range applied to values before lookup
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Clim {
    pub lo: f32,
    pub hi: f32,
}

impl Clim {
    pub fn new(lo: f32, hi: f32) -> Self {
        Self { lo, hi }
    }

    /// `(v - lo) / (hi - lo)`; a degenerate range maps everything to 0
    pub fn normalize(&self, value: f32) -> f32 {
        let span = self.hi - self.lo;
        if span == 0.0 || !span.is_finite() {
            return 0.0;
        }
        (value - self.lo) / span
    }
}

impl Default for Clim {
    fn default() -> Self {
        Self::new(0.0, 1.0)
    }
}

/// 1D strip of linear-space colors
#[derive(Clone, Debug, PartialEq)]
pub struct ColorLut {
    texels: Vec<Rgba>,
}

impl ColorLut {
    /// LUT with the given texels; an empty list yields a single black texel
    pub fn from_texels(texels: Vec<Rgba>) -> Self {
        if texels.is_empty() {
            return Self {
                texels: vec![Rgba::BLACK],
            };
        }
        Self { texels }
    }

    /// Resample evenly spaced stops into `size` texels
    pub fn from_stops(stops: &[Rgba], size: usize) -> Self {
        if stops.len() < 2 || size < 2 {
            return Self::from_texels(stops.to_vec());
        }
        let segments = (stops.len() - 1) as f32;
        let texels = (0..size)
            .map(|i| {
                let t = i as f32 / (size - 1) as f32 * segments;
                let idx = (t.floor() as usize).min(stops.len() - 2);
                stops[idx].lerp(stops[idx + 1], t - idx as f32)
            })
            .collect();
        Self { texels }
    }

    pub fn preset(colormap: Colormap) -> Self {
        match colormap {
            Colormap::Gray => Self::from_stops(&[Rgba::BLACK, Rgba::WHITE], LUT_SIZE),
            Colormap::Viridis => {
                let stops: Vec<Rgba> = VIRIDIS
                    .iter()
                    .map(|c| Rgba::rgb(srgb_to_linear(c[0]), srgb_to_linear(c[1]), srgb_to_linear(c[2])))
                    .collect();
                Self::from_stops(&stops, LUT_SIZE)
            }
        }
    }

    pub fn len(&self) -> usize {
        self.texels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.texels.is_empty()
    }

    pub fn texels(&self) -> &[Rgba] {
        &self.texels
    }

    /// Linearly filtered lookup at `t`, clamped to the edge texels
    pub fn sample(&self, t: f32) -> Rgba {
        let n = self.texels.len();
        if n == 1 || t.is_nan() {
            return self.texels[0];
        }
        let x = (t * n as f32 - 0.5).clamp(0.0, (n - 1) as f32);
        let i0 = x.floor() as usize;
        let i1 = (i0 + 1).min(n - 1);
        self.texels[i0].lerp(self.texels[i1], x - i0 as f32)
    }
}
