//! PNG image decoder

use std::path::Path;

use super::{expand_gray, ImageArray};

/// Decode a PNG file
pub(crate) fn decode_png<P: AsRef<Path>>(path: P) -> Result<ImageArray, String> {
    use std::fs::File;
    use std::io::BufReader;

    let file = File::open(path.as_ref()).map_err(|e| format!("Failed to open PNG file: {}", e))?;
    let mut decoder = png::Decoder::new(BufReader::new(file));
    // Palette and sub-byte images are widened to plain 8-bit samples
    decoder.set_transformations(png::Transformations::EXPAND);
    let mut reader = decoder
        .read_info()
        .map_err(|e| format!("Failed to read PNG info: {}", e))?;

    let (width, height) = {
        let info = reader.info();
        (info.width, info.height)
    };
    let (color_type, bit_depth) = reader.output_color_type();

    let buffer_size = reader
        .output_buffer_size()
        .ok_or_else(|| "Failed to determine PNG buffer size".to_string())?;
    let mut buf = vec![0u8; buffer_size];
    let frame_info = reader
        .next_frame(&mut buf)
        .map_err(|e| format!("Failed to read PNG frame: {}", e))?;
    let bytes = &buf[..frame_info.buffer_size()];

    let source_channels: u8 = match color_type {
        png::ColorType::Grayscale => 1,
        png::ColorType::GrayscaleAlpha => 2,
        png::ColorType::Rgb => 3,
        png::ColorType::Rgba => 4,
        png::ColorType::Indexed => {
            return Err("Indexed PNG was not expanded by the decoder".to_string());
        }
    };

    let (samples, max_value) = match bit_depth {
        png::BitDepth::Eight => (decode_png_samples8(bytes), 255.0),
        png::BitDepth::Sixteen => (decode_png_samples16(bytes), 65535.0),
        other => {
            return Err(format!("Unsupported PNG bit depth after expansion: {:?}", other));
        }
    };

    let expected_len = width as usize * height as usize * source_channels as usize;
    if samples.len() != expected_len {
        return Err(format!(
            "PNG buffer size mismatch: expected {}, got {}",
            expected_len,
            samples.len()
        ));
    }

    let (data, channels) = expand_gray(samples, source_channels)?;
    ImageArray::new(width, height, channels, max_value, data)
}

fn decode_png_samples8(bytes: &[u8]) -> Vec<f32> {
    bytes.iter().map(|&v| v as f32).collect()
}

/// PNG 16-bit samples are big-endian
fn decode_png_samples16(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(2)
        .map(|chunk| u16::from_be_bytes([chunk[0], chunk[1]]) as f32)
        .collect()
}
