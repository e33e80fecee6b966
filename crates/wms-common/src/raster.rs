//! Decoded raster images handed between the fetcher, the segmentation
//! adapter and the caller.

use std::io::Cursor;

use image::{ColorType, DynamicImage, GrayImage, ImageOutputFormat, RgbImage};
use serde::{Deserialize, Serialize};

use crate::error::{WmsError, WmsResult};

/// Channel layout of a [`RasterImage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelMode {
    Grayscale,
    Rgb,
}

#[derive(Debug, Clone, PartialEq)]
enum Pixels {
    Gray(GrayImage),
    Rgb(RgbImage),
}

/// An 8-bit raster, either single channel or RGB.
///
/// Grayscale sources are kept grayscale so segmentation sees the original
/// intensities; [`RasterImage::to_display_rgb`] expands them for display.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterImage {
    pixels: Pixels,
}

impl RasterImage {
    pub fn from_gray(image: GrayImage) -> Self {
        Self {
            pixels: Pixels::Gray(image),
        }
    }

    pub fn from_rgb(image: RgbImage) -> Self {
        Self {
            pixels: Pixels::Rgb(image),
        }
    }

    /// Normalize any decoded image into one of the two supported layouts.
    ///
    /// Luma variants (with or without alpha, 8 or 16 bit) become grayscale,
    /// everything else becomes RGB. Alpha is dropped.
    pub fn from_dynamic(image: DynamicImage) -> Self {
        match image.color() {
            ColorType::L8 | ColorType::La8 | ColorType::L16 | ColorType::La16 => {
                Self::from_gray(image.to_luma8())
            }
            _ => Self::from_rgb(image.to_rgb8()),
        }
    }

    /// Decode encoded image bytes (PNG, JPEG, GIF, ...).
    pub fn decode(bytes: &[u8]) -> WmsResult<Self> {
        if bytes.is_empty() {
            return Err(WmsError::Decode("empty image payload".to_string()));
        }
        let image = image::load_from_memory(bytes)?;
        Ok(Self::from_dynamic(image))
    }

    pub fn width(&self) -> u32 {
        match &self.pixels {
            Pixels::Gray(img) => img.width(),
            Pixels::Rgb(img) => img.width(),
        }
    }

    pub fn height(&self) -> u32 {
        match &self.pixels {
            Pixels::Gray(img) => img.height(),
            Pixels::Rgb(img) => img.height(),
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width(), self.height())
    }

    pub fn mode(&self) -> ChannelMode {
        match &self.pixels {
            Pixels::Gray(_) => ChannelMode::Grayscale,
            Pixels::Rgb(_) => ChannelMode::Rgb,
        }
    }

    /// RGB copy for display; grayscale is replicated across channels.
    pub fn to_display_rgb(&self) -> RgbImage {
        match &self.pixels {
            Pixels::Gray(img) => DynamicImage::ImageLuma8(img.clone()).to_rgb8(),
            Pixels::Rgb(img) => img.clone(),
        }
    }

    /// Single-channel copy; RGB input is reduced to luma.
    pub fn to_luma8(&self) -> GrayImage {
        match &self.pixels {
            Pixels::Gray(img) => img.clone(),
            Pixels::Rgb(img) => DynamicImage::ImageRgb8(img.clone()).to_luma8(),
        }
    }

    pub fn to_dynamic(&self) -> DynamicImage {
        match &self.pixels {
            Pixels::Gray(img) => DynamicImage::ImageLuma8(img.clone()),
            Pixels::Rgb(img) => DynamicImage::ImageRgb8(img.clone()),
        }
    }

    /// Encode as PNG, preserving the channel mode.
    pub fn encode_png(&self) -> WmsResult<Vec<u8>> {
        let mut out = Cursor::new(Vec::new());
        self.to_dynamic()
            .write_to(&mut out, ImageOutputFormat::Png)
            .map_err(|e| WmsError::Decode(format!("PNG encoding failed: {}", e)))?;
        Ok(out.into_inner())
    }
}
