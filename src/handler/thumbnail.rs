//! Thumbnail encoding
//!
//! Decodes any format the `image` crate recognizes, fills and crops to an
//! exact square, and re-encodes as JPEG.

use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;

/// Edge length of each thumbnail in a directory listing
pub const DIRECTORY_THUMBNAIL_SIZE: u32 = 100;

/// Edge length of a single-file thumbnail
pub const FILE_THUMBNAIL_SIZE: u32 = 200;

/// Render `content` as a `size`×`size` JPEG
pub fn render(content: &[u8], size: u32) -> Result<Vec<u8>, image::ImageError> {
    let img = image::load_from_memory(content)?;
    let filled = img.resize_to_fill(size, size, FilterType::Lanczos3);

    // JPEG has no alpha channel
    let rgb = DynamicImage::ImageRgb8(filled.to_rgb8());
    let mut buffer = Vec::new();
    rgb.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Jpeg)?;
    Ok(buffer)
}
