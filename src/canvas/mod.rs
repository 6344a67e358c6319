//! Raster canvas buffers and compositing primitives.

mod blend;
pub mod layers;

pub use blend::{composite_over, BlendMode};
pub use layers::LayerManager;

use image::RgbaImage;

use crate::color::Rgba8;
use crate::error::{EngineError, Result};
use crate::geometry::Rect;

/// A fixed-size straight-alpha RGBA8 raster buffer.
///
/// Canvas size is fixed for the session; the engine never reallocates a
/// buffer mid-stroke.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Canvas {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Canvas {
    /// Create a fully transparent canvas.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; (width * height * 4) as usize],
        }
    }

    /// Wrap raw RGBA bytes; the length must match `width * height * 4`.
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        if data.len() != (width * height * 4) as usize {
            return Err(EngineError::InvalidInput(format!(
                "buffer length {} does not match {}x{} RGBA",
                data.len(),
                width,
                height
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn from_image(image: &RgbaImage) -> Self {
        Self {
            width: image.width(),
            height: image.height(),
            data: image.as_raw().clone(),
        }
    }

    pub fn to_image(&self) -> Option<RgbaImage> {
        RgbaImage::from_raw(self.width, self.height, self.data.clone())
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        ((y * self.width + x) * 4) as usize
    }

    /// Read a pixel. Out-of-bounds reads return transparent.
    #[inline]
    pub fn pixel(&self, x: i32, y: i32) -> Rgba8 {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return Rgba8::TRANSPARENT;
        }
        let i = self.index(x as u32, y as u32);
        Rgba8::new(self.data[i], self.data[i + 1], self.data[i + 2], self.data[i + 3])
    }

    /// Read a pixel with wrap-around sampling for seamless tiling.
    #[inline]
    pub fn pixel_wrapped(&self, x: i32, y: i32) -> Rgba8 {
        let x = x.rem_euclid(self.width as i32) as u32;
        let y = y.rem_euclid(self.height as i32) as u32;
        let i = self.index(x, y);
        Rgba8::new(self.data[i], self.data[i + 1], self.data[i + 2], self.data[i + 3])
    }

    /// Write a pixel. Out-of-bounds writes are ignored.
    #[inline]
    pub fn set_pixel(&mut self, x: i32, y: i32, px: Rgba8) {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return;
        }
        let i = self.index(x as u32, y as u32);
        self.data[i] = px.r;
        self.data[i + 1] = px.g;
        self.data[i + 2] = px.b;
        self.data[i + 3] = px.a;
    }

    /// Write a pixel with wrap-around addressing for seamless tiling.
    #[inline]
    pub fn set_pixel_wrapped(&mut self, x: i32, y: i32, px: Rgba8) {
        let x = x.rem_euclid(self.width as i32);
        let y = y.rem_euclid(self.height as i32);
        self.set_pixel(x, y, px);
    }

    /// Reset every pixel to transparent black.
    pub fn clear(&mut self) {
        self.data.fill(0);
    }

    pub fn fill(&mut self, px: Rgba8) {
        for chunk in self.data.chunks_exact_mut(4) {
            chunk[0] = px.r;
            chunk[1] = px.g;
            chunk[2] = px.b;
            chunk[3] = px.a;
        }
    }

    /// Copy the whole buffer from another canvas of the same size.
    pub fn copy_from(&mut self, other: &Canvas) {
        debug_assert_eq!((self.width, self.height), (other.width, other.height));
        self.data.copy_from_slice(&other.data);
    }

    /// Copy one rectangle from another canvas of the same size.
    pub fn copy_rect_from(&mut self, other: &Canvas, rect: &Rect) {
        let rect = rect.clamp_to(self.width, self.height);
        if rect.is_empty() {
            return;
        }
        let row_bytes = (rect.width() * 4) as usize;
        for y in rect.top..rect.bottom {
            let start = self.index(rect.left as u32, y as u32);
            self.data[start..start + row_bytes]
                .copy_from_slice(&other.data[start..start + row_bytes]);
        }
    }
}
