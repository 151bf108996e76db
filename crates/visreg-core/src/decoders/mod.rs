//! Image decoders for the accepted reference formats
//!
//! Support for PNG, TIFF and JPEG files. Samples are kept in the source's
//! native scale and the alpha channel is preserved, so two decoded images
//! can be subtracted element by element.

mod jpeg;
mod png;
mod tiff;

#[cfg(test)]
mod tests;

use std::path::Path;

/// Extensions accepted under a reference case directory when no config overrides them
pub const SUPPORTED_EXTENSIONS: &[&str] = &["jpg", "png", "tif"];

/// Decoded image as a `(height, width, channels)` array of samples
#[derive(Debug, Clone, PartialEq)]
pub struct ImageArray {
    /// Image width in pixels
    pub width: u32,

    /// Image height in pixels
    pub height: u32,

    /// Samples per pixel (3 for RGB, 4 for RGB + alpha)
    pub channels: u8,

    /// Largest representable sample value (255 for 8-bit, 65535 for 16-bit sources)
    pub max_value: f32,

    /// Interleaved row-major samples in the source's native scale
    pub data: Vec<f32>,
}

impl ImageArray {
    /// Build an array, checking that the sample count matches the shape
    pub fn new(
        width: u32,
        height: u32,
        channels: u8,
        max_value: f32,
        data: Vec<f32>,
    ) -> Result<Self, String> {
        let expected = width as usize * height as usize * channels as usize;
        if data.len() != expected {
            return Err(format!(
                "Sample count mismatch for {}x{}x{}: expected {}, got {}",
                height,
                width,
                channels,
                expected,
                data.len()
            ));
        }

        Ok(Self {
            width,
            height,
            channels,
            max_value,
            data,
        })
    }

    /// Array with every sample set to `value`
    pub fn filled(width: u32, height: u32, channels: u8, max_value: f32, value: f32) -> Self {
        let len = width as usize * height as usize * channels as usize;
        Self {
            width,
            height,
            channels,
            max_value,
            data: vec![value; len],
        }
    }

    /// Shape as `(height, width, channels)`
    pub fn shape(&self) -> (u32, u32, u8) {
        (self.height, self.width, self.channels)
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Human readable `HxWxC` shape
    pub fn shape_label(&self) -> String {
        format!("{}x{}x{}", self.height, self.width, self.channels)
    }
}

/// Lowercased extension of a path, if any
pub fn file_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
}

/// Whether the path carries one of the given extensions (compared case-insensitively)
pub fn has_extension<S: AsRef<str>>(path: &Path, extensions: &[S]) -> bool {
    match file_extension(path) {
        Some(ext) => extensions.iter().any(|e| e.as_ref() == ext),
        None => false,
    }
}

/// Decode an image from a file path
pub fn decode_image<P: AsRef<Path>>(path: P) -> Result<ImageArray, String> {
    let path = path.as_ref();
    let extension =
        file_extension(path).ok_or_else(|| "No file extension found".to_string())?;

    match extension.as_str() {
        "tif" | "tiff" => tiff::decode_tiff(path),
        "png" => png::decode_png(path),
        "jpg" | "jpeg" => jpeg::decode_jpeg(path),
        _ => Err(format!("Unsupported file format: {}", extension)),
    }
}

/// Expand single-channel (or gray + alpha) samples to RGB (or RGBA).
///
/// Three and four channel data is returned unchanged.
pub(crate) fn expand_gray(samples: Vec<f32>, channels: u8) -> Result<(Vec<f32>, u8), String> {
    match channels {
        1 => {
            let mut rgb = Vec::with_capacity(samples.len() * 3);
            for &gray in &samples {
                rgb.push(gray);
                rgb.push(gray);
                rgb.push(gray);
            }
            Ok((rgb, 3))
        }
        2 => {
            let mut rgba = Vec::with_capacity(samples.len() * 2);
            for pair in samples.chunks_exact(2) {
                rgba.push(pair[0]);
                rgba.push(pair[0]);
                rgba.push(pair[0]);
                rgba.push(pair[1]);
            }
            Ok((rgba, 4))
        }
        3 | 4 => Ok((samples, channels)),
        _ => Err(format!("Unsupported channel count: {}", channels)),
    }
}
