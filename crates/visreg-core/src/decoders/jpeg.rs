//! JPEG image decoder

use std::path::Path;

use super::ImageArray;

/// Decode a JPEG file. JPEG carries no alpha, so the result is always RGB.
pub(crate) fn decode_jpeg<P: AsRef<Path>>(path: P) -> Result<ImageArray, String> {
    let img = image::open(path.as_ref()).map_err(|e| format!("Failed to decode JPEG file: {}", e))?;
    let rgb = img.to_rgb8();
    let (width, height) = rgb.dimensions();
    let data: Vec<f32> = rgb.into_raw().into_iter().map(|v| v as f32).collect();

    ImageArray::new(width, height, 3, 255.0, data)
}
