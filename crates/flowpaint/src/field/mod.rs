//! Flow field storage - two f32 channels per texel, row-major

mod export;
mod tiles;

pub use export::*;
pub use tiles::*;

use glam::Vec2;
use thiserror::Error;
use tracing::info;

use crate::constants::NEUTRAL_TEXEL;
use crate::types::DirtyRect;

/// One encoded flow texel: `[(fx + 1) / 2, (fy + 1) / 2]`
pub type Texel = [f32; 2];

/// Largest accepted field side, in texels
pub const MAX_FIELD_SIZE: u32 = 16384;

#[derive(Debug, Error, PartialEq)]
pub enum FieldError {
    #[error("Invalid field size {width}x{height}")]
    InvalidSize { width: u32, height: u32 },
    #[error("Region {rect:?} lies outside the {width}x{height} field")]
    RegionOutOfBounds {
        rect: DirtyRect,
        width: u32,
        height: u32,
    },
    #[error("Region data has {actual} texels, expected {expected}")]
    RegionLength { expected: usize, actual: usize },
}

/// Encode a flow vector (components in -1..=1) into texel space
#[inline]
pub fn encode_flow(flow: Vec2) -> Texel {
    [
        ((flow.x + 1.0) * 0.5).clamp(0.0, 1.0),
        ((flow.y + 1.0) * 0.5).clamp(0.0, 1.0),
    ]
}

/// Decode a texel back into a flow vector
#[inline]
pub fn decode_flow(texel: Texel) -> Vec2 {
    Vec2::new(texel[0] * 2.0 - 1.0, texel[1] * 2.0 - 1.0)
}

/// The flow field buffer owned by the paint session
#[derive(Debug, Clone, PartialEq)]
pub struct FlowField {
    width: u32,
    height: u32,
    texels: Vec<Texel>,
}

impl FlowField {
    /// Create a field initialized to the zero vector
    pub fn new(width: u32, height: u32) -> Result<Self, FieldError> {
        if width == 0 || height == 0 || width > MAX_FIELD_SIZE || height > MAX_FIELD_SIZE {
            return Err(FieldError::InvalidSize { width, height });
        }
        info!("FlowField::new: {}x{}", width, height);
        Ok(Self {
            width,
            height,
            texels: vec![NEUTRAL_TEXEL; width as usize * height as usize],
        })
    }

    /// Wrap existing texel data (row-major, `width * height` entries)
    pub fn from_texels(width: u32, height: u32, texels: Vec<Texel>) -> Result<Self, FieldError> {
        let mut field = Self::new(width, height)?;
        if texels.len() != field.texels.len() {
            return Err(FieldError::RegionLength {
                expected: field.texels.len(),
                actual: texels.len(),
            });
        }
        field.texels = texels;
        Ok(field)
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Size as a float vector, handy for scene/texel conversion
    #[inline]
    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width as f32, self.height as f32)
    }

    /// The whole field as a rectangle
    #[inline]
    pub fn bounds(&self) -> DirtyRect {
        DirtyRect::new(0, 0, self.width, self.height)
    }

    #[inline]
    pub(crate) fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    /// Texel at (x, y), None if out of bounds
    #[inline]
    pub fn get(&self, x: u32, y: u32) -> Option<Texel> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.texels[self.index(x, y)])
    }

    /// Write a texel; out-of-bounds writes are ignored
    #[inline]
    pub fn set(&mut self, x: u32, y: u32, texel: Texel) {
        if x >= self.width || y >= self.height {
            return;
        }
        let index = self.index(x, y);
        self.texels[index] = texel;
    }

    /// Decoded flow vector at (x, y)
    pub fn flow_at(&self, x: u32, y: u32) -> Option<Vec2> {
        self.get(x, y).map(decode_flow)
    }

    /// Set every texel to the encoding of `flow`
    pub fn fill(&mut self, flow: Vec2) {
        self.texels.fill(encode_flow(flow));
    }

    /// Reset every texel to the zero vector
    pub fn clear(&mut self) {
        self.texels.fill(NEUTRAL_TEXEL);
    }

    #[inline]
    pub fn texels(&self) -> &[Texel] {
        &self.texels
    }

    #[inline]
    pub fn texels_mut(&mut self) -> &mut [Texel] {
        &mut self.texels
    }

    /// Raw buffer for GPU upload
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.texels)
    }

    fn check_region(&self, rect: DirtyRect) -> Result<(), FieldError> {
        if rect.right() > self.width || rect.bottom() > self.height {
            return Err(FieldError::RegionOutOfBounds {
                rect,
                width: self.width,
                height: self.height,
            });
        }
        Ok(())
    }

    /// Copy out a rectangle, row-major
    pub fn region(&self, rect: DirtyRect) -> Result<Vec<Texel>, FieldError> {
        self.check_region(rect)?;
        let mut data = Vec::with_capacity(rect.area() as usize);
        for y in rect.y..rect.bottom() {
            let start = self.index(rect.x, y);
            data.extend_from_slice(&self.texels[start..start + rect.width as usize]);
        }
        Ok(data)
    }

    /// Overwrite a rectangle with row-major data from [`FlowField::region`]
    pub fn write_region(&mut self, rect: DirtyRect, data: &[Texel]) -> Result<(), FieldError> {
        self.check_region(rect)?;
        if data.len() as u64 != rect.area() {
            return Err(FieldError::RegionLength {
                expected: rect.area() as usize,
                actual: data.len(),
            });
        }
        let row_len = rect.width as usize;
        for (row, src) in data.chunks_exact(row_len.max(1)).enumerate() {
            let start = self.index(rect.x, rect.y + row as u32);
            self.texels[start..start + row_len].copy_from_slice(src);
        }
        Ok(())
    }

    /// A rectangle packed as bytes for partial texture upload
    pub fn region_bytes(&self, rect: DirtyRect) -> Result<Vec<u8>, FieldError> {
        let data = self.region(rect)?;
        Ok(bytemuck::cast_slice(&data).to_vec())
    }
}
