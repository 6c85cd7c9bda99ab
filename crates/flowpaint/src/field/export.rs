//! Conversion between the flow field and image buffers
//!
//! Images store rows bottom-up relative to the field (vertical flip), with
//! channel 0 = X, channel 1 = Y and channel 2 unused. Channel inversion is a
//! presentation option applied to the image only.

use image::imageops::{self, FilterType};
use image::{Rgb, Rgb32FImage, RgbImage};
use tracing::{debug, info};

use super::{FieldError, FlowField, Texel};
use crate::config::ExportConfig;

/// Options applied when the field is written to or read from an image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportOptions {
    pub invert_x: bool,
    pub invert_y: bool,
    /// Store rows bottom-up
    pub flip_vertical: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            invert_x: false,
            invert_y: false,
            flip_vertical: true,
        }
    }
}

impl From<&ExportConfig> for ExportOptions {
    fn from(config: &ExportConfig) -> Self {
        Self {
            invert_x: config.invert_x,
            invert_y: config.invert_y,
            ..Default::default()
        }
    }
}

impl ExportOptions {
    #[inline]
    fn present(&self, texel: Texel) -> Texel {
        [
            if self.invert_x { 1.0 - texel[0] } else { texel[0] },
            if self.invert_y { 1.0 - texel[1] } else { texel[1] },
        ]
    }

    #[inline]
    fn source_row(&self, row: u32, height: u32) -> u32 {
        if self.flip_vertical {
            height - 1 - row
        } else {
            row
        }
    }
}

#[inline]
fn to_unorm8(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

impl FlowField {
    /// 8-bit image for export or preview
    pub fn to_rgb8(&self, options: &ExportOptions) -> RgbImage {
        debug!("FlowField::to_rgb8: {}x{} {:?}", self.width, self.height, options);
        RgbImage::from_fn(self.width, self.height, |x, y| {
            let row = options.source_row(y, self.height);
            let [r, g] = options.present(self.texels[self.index(x, row)]);
            Rgb([to_unorm8(r), to_unorm8(g), 0])
        })
    }

    /// Float image for lossless export
    pub fn to_rgb32f(&self, options: &ExportOptions) -> Rgb32FImage {
        debug!("FlowField::to_rgb32f: {}x{} {:?}", self.width, self.height, options);
        Rgb32FImage::from_fn(self.width, self.height, |x, y| {
            let row = options.source_row(y, self.height);
            let [r, g] = options.present(self.texels[self.index(x, row)]);
            Rgb([r, g, 0.0])
        })
    }

    /// Load a field from an 8-bit image written with the same options
    pub fn from_rgb8(image: &RgbImage, options: &ExportOptions) -> Result<Self, FieldError> {
        let mut field = Self::new(image.width(), image.height())?;
        for (x, y, pixel) in image.enumerate_pixels() {
            let row = options.source_row(y, field.height);
            let texel = options.present([pixel[0] as f32 / 255.0, pixel[1] as f32 / 255.0]);
            field.set(x, row, texel);
        }
        info!("FlowField::from_rgb8: loaded {}x{}", field.width, field.height);
        Ok(field)
    }

    /// Load a field from a float image written with the same options
    pub fn from_rgb32f(image: &Rgb32FImage, options: &ExportOptions) -> Result<Self, FieldError> {
        let mut field = Self::new(image.width(), image.height())?;
        for (x, y, pixel) in image.enumerate_pixels() {
            let row = options.source_row(y, field.height);
            let texel = options.present([pixel[0].clamp(0.0, 1.0), pixel[1].clamp(0.0, 1.0)]);
            field.set(x, row, texel);
        }
        info!("FlowField::from_rgb32f: loaded {}x{}", field.width, field.height);
        Ok(field)
    }

    /// Bilinear resample to a new size (export at a target resolution)
    pub fn resample(&self, width: u32, height: u32) -> Result<Self, FieldError> {
        if width == self.width && height == self.height {
            return Ok(self.clone());
        }
        let raw = ExportOptions {
            flip_vertical: false,
            ..Default::default()
        };
        let resized = imageops::resize(&self.to_rgb32f(&raw), width, height, FilterType::Triangle);
        debug!(
            "FlowField::resample: {}x{} -> {}x{}",
            self.width, self.height, width, height
        );
        Self::from_rgb32f(&resized, &raw)
    }
}
