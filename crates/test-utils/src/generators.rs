//! Synthetic images with predictable pixel patterns.

use std::io::Cursor;

use image::{DynamicImage, GrayImage, ImageOutputFormat, Luma, Rgb, RgbImage};

/// Grayscale image, dark (`20`) on the left half and bright (`230`) on the
/// right half.
///
/// Useful for segmentation tests: a mid-level threshold splits it exactly
/// down the middle.
pub fn split_gray_image(width: u32, height: u32) -> GrayImage {
    GrayImage::from_fn(width, height, |x, _| {
        if x < width / 2 {
            Luma([20])
        } else {
            Luma([230])
        }
    })
}

/// RGB image with a horizontal red ramp and a vertical green ramp.
pub fn gradient_rgb_image(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        let r = (x * 255 / width.max(1)) as u8;
        let g = (y * 255 / height.max(1)) as u8;
        Rgb([r, g, 128])
    })
}

/// Encode any image as PNG bytes.
pub fn encode_png(image: DynamicImage) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    image
        .write_to(&mut out, ImageOutputFormat::Png)
        .expect("PNG encoding of generated image");
    out.into_inner()
}

/// PNG bytes of [`gradient_rgb_image`].
pub fn rgb_png(width: u32, height: u32) -> Vec<u8> {
    encode_png(DynamicImage::ImageRgb8(gradient_rgb_image(width, height)))
}

/// PNG bytes of [`split_gray_image`].
pub fn gray_png(width: u32, height: u32) -> Vec<u8> {
    encode_png(DynamicImage::ImageLuma8(split_gray_image(width, height)))
}
