//! TIFF image decoder

use std::path::Path;

use super::{expand_gray, ImageArray};

/// Decode a TIFF file
pub(crate) fn decode_tiff<P: AsRef<Path>>(path: P) -> Result<ImageArray, String> {
    use std::fs::File;
    use std::io::BufReader;
    use tiff::decoder::Limits;

    let file = File::open(path.as_ref()).map_err(|e| format!("Failed to open TIFF file: {}", e))?;

    // Rendered frames can be large; allow up to 1GB uncompressed
    let mut limits = Limits::default();
    limits.decoding_buffer_size = 1024 * 1024 * 1024;
    limits.ifd_value_size = 1024 * 1024 * 1024;
    limits.intermediate_buffer_size = 1024 * 1024 * 1024;

    let mut decoder = tiff::decoder::Decoder::new(BufReader::new(file))
        .map_err(|e| format!("Failed to create TIFF decoder: {}", e))?
        .with_limits(limits);

    let (width, height) = decoder
        .dimensions()
        .map_err(|e| format!("Failed to get TIFF dimensions: {}", e))?;

    let color_type = decoder
        .colortype()
        .map_err(|e| format!("Failed to get TIFF color type: {}", e))?;

    let image_data = decoder
        .read_image()
        .map_err(|e| format!("Failed to read TIFF image data: {}", e))?;

    match image_data {
        tiff::decoder::DecodingResult::U8(buf) => {
            decode_tiff_buffer(&buf, width, height, color_type)
        }
        tiff::decoder::DecodingResult::U16(buf) => {
            decode_tiff_buffer(&buf, width, height, color_type)
        }
        tiff::decoder::DecodingResult::U32(buf) => {
            decode_tiff_buffer(&buf, width, height, color_type)
        }
        tiff::decoder::DecodingResult::F32(buf) => {
            decode_tiff_buffer(&buf, width, height, color_type)
        }
        tiff::decoder::DecodingResult::F64(buf) => {
            decode_tiff_buffer(&buf, width, height, color_type)
        }
        _ => Err(format!(
            "Unsupported TIFF sample format for color type {:?}",
            color_type
        )),
    }
}

/// Trait for TIFF sample types that can be widened to f32 without rescaling
trait TiffValue: Copy {
    /// Largest value the sample type represents
    const MAX: f32;

    fn to_sample(self) -> f32;
}

impl TiffValue for u8 {
    const MAX: f32 = 255.0;

    #[inline]
    fn to_sample(self) -> f32 {
        self as f32
    }
}

impl TiffValue for u16 {
    const MAX: f32 = 65535.0;

    #[inline]
    fn to_sample(self) -> f32 {
        self as f32
    }
}

impl TiffValue for u32 {
    const MAX: f32 = u32::MAX as f32;

    #[inline]
    fn to_sample(self) -> f32 {
        self as f32
    }
}

impl TiffValue for f32 {
    const MAX: f32 = 1.0;

    #[inline]
    fn to_sample(self) -> f32 {
        self
    }
}

impl TiffValue for f64 {
    const MAX: f32 = 1.0;

    #[inline]
    fn to_sample(self) -> f32 {
        self as f32
    }
}

/// Generic TIFF buffer decoder - handles all supported numeric types
fn decode_tiff_buffer<T: TiffValue>(
    buf: &[T],
    width: u32,
    height: u32,
    color_type: tiff::ColorType,
) -> Result<ImageArray, String> {
    let channels: u8 = match color_type {
        tiff::ColorType::Gray(_) => 1,
        tiff::ColorType::GrayA(_) => 2,
        tiff::ColorType::RGB(_) => 3,
        tiff::ColorType::RGBA(_) => 4,
        tiff::ColorType::CMYK(_) => return Err("CMYK color type not supported".to_string()),
        tiff::ColorType::YCbCr(_) => return Err("YCbCr color type not supported".to_string()),
        tiff::ColorType::Palette(_) => return Err("Palette color type not supported".to_string()),
        _ => return Err(format!("Unknown TIFF color type: {:?}", color_type)),
    };

    let expected_len = width as usize * height as usize * channels as usize;
    if buf.len() != expected_len {
        return Err(format!(
            "TIFF buffer size mismatch: expected {}, got {}",
            expected_len,
            buf.len()
        ));
    }

    let samples: Vec<f32> = buf.iter().map(|&v| v.to_sample()).collect();
    let (data, channels) = expand_gray(samples, channels)?;
    ImageArray::new(width, height, channels, T::MAX, data)
}
