//! Raster thumbnail rendering for image attachments.

use std::io::Cursor;

use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};

use crate::error::AttachResult;

/// Produce a resized derivative of `bytes`, preserving aspect ratio.
///
/// Sizing rules:
///
/// - neither dimension given: the original bytes are returned unresized
/// - one dimension given: the other is computed from the original aspect
///   ratio
/// - both given: the image is fit within the box
///
/// The result is re-encoded in the original format. JPEG cannot carry an
/// alpha channel, so RGBA input collapses to RGB before a JPEG re-encode.
pub fn render_thumbnail(
    bytes: &[u8],
    max_width: Option<u32>,
    max_height: Option<u32>,
) -> AttachResult<Vec<u8>> {
    if max_width.is_none() && max_height.is_none() {
        return Ok(bytes.to_vec());
    }

    let format = image::guess_format(bytes)?;
    let img = image::load_from_memory_with_format(bytes, format)?;
    let (original_width, original_height) = (img.width(), img.height());

    let resized = match (max_width, max_height) {
        (Some(width), None) => {
            let height =
                (u64::from(width) * u64::from(original_height) / u64::from(original_width)) as u32;
            img.resize_exact(width, height.max(1), FilterType::Lanczos3)
        }
        (None, Some(height)) => {
            let width =
                (u64::from(height) * u64::from(original_width) / u64::from(original_height)) as u32;
            img.resize_exact(width.max(1), height, FilterType::Lanczos3)
        }
        (Some(width), Some(height)) => img.resize(width, height, FilterType::Lanczos3),
        (None, None) => unreachable!("handled above"),
    };

    let output = if format == ImageFormat::Jpeg && resized.color().has_alpha() {
        DynamicImage::ImageRgb8(resized.to_rgb8())
    } else {
        resized
    };

    let mut encoded = Cursor::new(Vec::new());
    output.write_to(&mut encoded, format)?;
    Ok(encoded.into_inner())
}
