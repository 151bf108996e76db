//! Image exporters for diff output
//!
//! Write an [`ImageArray`] back to disk in the format implied by the path's
//! extension. Samples are clamped to the output range and rounded; arrays with
//! `max_value > 255` are written with 16-bit samples where the format allows it,
//! and float arrays (`max_value` 1.0) are scaled up to 8 bits.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use crate::decoders::{file_extension, ImageArray};

/// Export an image, choosing the encoder from the file extension
pub fn export_image<P: AsRef<Path>>(image: &ImageArray, path: P) -> Result<(), String> {
    let path = path.as_ref();
    let extension =
        file_extension(path).ok_or_else(|| "No file extension found".to_string())?;

    match extension.as_str() {
        "png" => export_png(image, path),
        "tif" | "tiff" => export_tiff(image, path),
        "jpg" | "jpeg" => export_jpeg(image, path),
        _ => Err(format!("Unsupported export format: {}", extension)),
    }
}

fn is_wide(image: &ImageArray) -> bool {
    image.max_value > 255.0
}

fn to_u8(image: &ImageArray) -> Vec<u8> {
    let scale = rescale(image.max_value, 255.0);
    image
        .data
        .iter()
        .map(|&v| (v * scale).clamp(0.0, 255.0).round() as u8)
        .collect()
}

fn to_u16(image: &ImageArray) -> Vec<u16> {
    let scale = rescale(image.max_value, 65535.0);
    image
        .data
        .iter()
        .map(|&v| (v * scale).clamp(0.0, 65535.0).round() as u16)
        .collect()
}

/// Factor mapping `0..=max_value` onto `0..=target`; native 8/16-bit data is left as is
fn rescale(max_value: f32, target: f32) -> f32 {
    if max_value <= 0.0 || max_value == target || (max_value == 255.0 && target > 255.0) {
        1.0
    } else {
        target / max_value
    }
}

/// Export to PNG (8 or 16 bits per sample)
pub fn export_png<P: AsRef<Path>>(image: &ImageArray, path: P) -> Result<(), String> {
    let color_type = match image.channels {
        1 => png::ColorType::Grayscale,
        2 => png::ColorType::GrayscaleAlpha,
        3 => png::ColorType::Rgb,
        4 => png::ColorType::Rgba,
        n => return Err(format!("PNG export does not support {} channels", n)),
    };

    let file =
        File::create(path.as_ref()).map_err(|e| format!("Failed to create PNG file: {}", e))?;
    let mut encoder = png::Encoder::new(BufWriter::new(file), image.width, image.height);
    encoder.set_color(color_type);

    let bytes = if is_wide(image) {
        encoder.set_depth(png::BitDepth::Sixteen);
        to_u16(image)
            .into_iter()
            .flat_map(|v| v.to_be_bytes())
            .collect::<Vec<u8>>()
    } else {
        encoder.set_depth(png::BitDepth::Eight);
        to_u8(image)
    };

    let mut writer = encoder
        .write_header()
        .map_err(|e| format!("Failed to write PNG header: {}", e))?;
    writer
        .write_image_data(&bytes)
        .map_err(|e| format!("Failed to write PNG image: {}", e))?;
    writer
        .finish()
        .map_err(|e| format!("Failed to finish PNG file: {}", e))?;

    Ok(())
}

/// Export to TIFF (8 or 16 bits per sample)
pub fn export_tiff<P: AsRef<Path>>(image: &ImageArray, path: P) -> Result<(), String> {
    use tiff::encoder::colortype;

    let file =
        File::create(path.as_ref()).map_err(|e| format!("Failed to create TIFF file: {}", e))?;
    let mut encoder = tiff::encoder::TiffEncoder::new(BufWriter::new(file))
        .map_err(|e| format!("Failed to create TIFF encoder: {}", e))?;

    let (w, h) = (image.width, image.height);
    let result = match (image.channels, is_wide(image)) {
        (1, false) => encoder.write_image::<colortype::Gray8>(w, h, &to_u8(image)),
        (1, true) => encoder.write_image::<colortype::Gray16>(w, h, &to_u16(image)),
        (3, false) => encoder.write_image::<colortype::RGB8>(w, h, &to_u8(image)),
        (3, true) => encoder.write_image::<colortype::RGB16>(w, h, &to_u16(image)),
        (4, false) => encoder.write_image::<colortype::RGBA8>(w, h, &to_u8(image)),
        (4, true) => encoder.write_image::<colortype::RGBA16>(w, h, &to_u16(image)),
        (n, _) => return Err(format!("TIFF export does not support {} channels", n)),
    };

    result.map_err(|e| format!("Failed to write TIFF image: {}", e))
}

/// Export to JPEG (8-bit). JPEG is always opaque, so a fourth channel is dropped.
pub fn export_jpeg<P: AsRef<Path>>(image: &ImageArray, path: P) -> Result<(), String> {
    let samples = to_u8(image);
    let (w, h) = (image.width, image.height);

    match image.channels {
        1 => {
            let gray = image::GrayImage::from_raw(w, h, samples)
                .ok_or_else(|| "JPEG buffer does not match image size".to_string())?;
            gray.save_with_format(path.as_ref(), image::ImageFormat::Jpeg)
                .map_err(|e| format!("Failed to write JPEG image: {}", e))
        }
        3 | 4 => {
            let stride = image.channels as usize;
            let rgb_samples: Vec<u8> = samples
                .chunks_exact(stride)
                .flat_map(|px| [px[0], px[1], px[2]])
                .collect();
            let rgb = image::RgbImage::from_raw(w, h, rgb_samples)
                .ok_or_else(|| "JPEG buffer does not match image size".to_string())?;
            rgb.save_with_format(path.as_ref(), image::ImageFormat::Jpeg)
                .map_err(|e| format!("Failed to write JPEG image: {}", e))
        }
        n => Err(format!("JPEG export does not support {} channels", n)),
    }
}
