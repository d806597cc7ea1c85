//! CPU framebuffer of sRGB-encoded RGBA8 pixels

use sdfview_math::{Rgba, Vec2};

use crate::encoding::encode;

/// Row-major pixels, row 0 at the top
#[derive(Clone, Debug, PartialEq)]
pub struct Framebuffer {
    width: u32,
    height: u32,
    pixels: Vec<[u8; 4]>,
}

impl Framebuffer {
    pub fn new(width: u32, height: u32, clear: Rgba) -> Self {
        Self {
            width,
            height,
            pixels: vec![encode(clear); width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Reallocate for a new size, filled with `clear`
    pub fn resize(&mut self, width: u32, height: u32, clear: Rgba) {
        if (width, height) == (self.width, self.height) {
            return;
        }
        *self = Self::new(width, height, clear);
    }

    pub fn clear(&mut self, color: Rgba) {
        self.pixels.fill(encode(color));
    }

    /// Viewport coordinate of the centre of pixel `(x, y)`
    #[inline]
    pub fn pixel_uv(&self, x: u32, y: u32) -> Vec2 {
        Vec2::new(
            (x as f32 + 0.5) / self.width as f32,
            (y as f32 + 0.5) / self.height as f32,
        )
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.pixels[(y * self.width + x) as usize])
    }

    #[inline]
    pub fn set(&mut self, x: u32, y: u32, color: Rgba) {
        if x < self.width && y < self.height {
            self.pixels[(y * self.width + x) as usize] = encode(color);
        }
    }

    pub fn pixels(&self) -> &[[u8; 4]] {
        &self.pixels
    }

    /// Raw bytes for texture upload
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixel_uv_centres() {
        let fb = Framebuffer::new(4, 2, Rgba::BLACK);
        assert_eq!(fb.pixel_uv(0, 0), Vec2::new(0.125, 0.25));
        assert_eq!(fb.pixel_uv(3, 1), Vec2::new(0.875, 0.75));
    }

    #[test]
    fn test_set_and_bytes() {
        let mut fb = Framebuffer::new(2, 1, Rgba::BLACK);
        fb.set(1, 0, Rgba::WHITE);
        assert_eq!(fb.as_bytes(), &[0, 0, 0, 255, 255, 255, 255, 255]);
        assert_eq!(fb.get(2, 0), None);
    }

    #[test]
    fn test_resize_clears() {
        let mut fb = Framebuffer::new(2, 2, Rgba::WHITE);
        fb.resize(3, 1, Rgba::BLACK);
        assert_eq!(fb.size(), (3, 1));
        assert!(fb.pixels().iter().all(|p| *p == [0, 0, 0, 255]));
    }
}
