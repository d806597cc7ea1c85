//! Display encoding (sRGB transfer function and 8-bit quantisation)

use sdfview_math::Rgba;

/// Linear to sRGB-encoded component
#[inline]
pub fn linear_to_srgb(c: f32) -> f32 {
    let c = c.clamp(0.0, 1.0);
    if c <= 0.003_130_8 {
        c * 12.92
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    }
}

/// sRGB-encoded to linear component
#[inline]
pub fn srgb_to_linear(c: f32) -> f32 {
    let c = c.clamp(0.0, 1.0);
    if c <= 0.040_45 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

#[inline]
fn quantize(c: f32) -> u8 {
    (c.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Encode a linear color for an 8-bit sRGB framebuffer; alpha stays linear
pub fn encode(color: Rgba) -> [u8; 4] {
    [
        quantize(linear_to_srgb(color.r)),
        quantize(linear_to_srgb(color.g)),
        quantize(linear_to_srgb(color.b)),
        quantize(color.a),
    ]
}
