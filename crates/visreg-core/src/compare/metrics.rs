//! Scalar metrics over difference arrays and grayscale projections

use image::GrayImage;
use image_compare::Algorithm;

use crate::decoders::ImageArray;

/// Sum of absolute sample differences (Manhattan norm)
pub fn manhattan_norm(data: &[f32]) -> f64 {
    data.iter().map(|&v| (v as f64).abs()).sum()
}

/// Number of non-zero samples (zero norm)
pub fn zero_norm(data: &[f32]) -> u64 {
    data.iter().filter(|&&v| v != 0.0).count() as u64
}

/// Number of pixels with at least one non-zero channel
pub fn differing_pixels(data: &[f32], channels: u8) -> u64 {
    data.chunks_exact(channels.max(1) as usize)
        .filter(|px| px.iter().any(|&v| v != 0.0))
        .count() as u64
}

/// Whether every sample of the given channel range is zero
pub fn channels_all_zero(data: &[f32], channels: u8, range: std::ops::Range<usize>) -> bool {
    let stride = channels.max(1) as usize;
    let end = range.end.min(stride);
    if range.start >= end {
        return true;
    }
    data.chunks_exact(stride)
        .all(|px| px[range.start..end].iter().all(|&v| v == 0.0))
}

/// ITU-R BT.601 luma of the first three channels
pub fn to_grayscale(data: &[f32], channels: u8) -> Vec<f64> {
    let stride = channels as usize;
    if stride < 3 {
        return data.chunks_exact(stride.max(1)).map(|px| px[0] as f64).collect();
    }
    data.chunks_exact(stride)
        .map(|px| 0.299 * px[0] as f64 + 0.587 * px[1] as f64 + 0.114 * px[2] as f64)
        .collect()
}

/// 8-bit grayscale projection, luma rescaled from `max_value` to 255
pub fn to_gray_image(image: &ImageArray) -> Result<GrayImage, String> {
    let scale = if image.max_value > 0.0 {
        255.0 / image.max_value as f64
    } else {
        1.0
    };
    let pixels: Vec<u8> = to_grayscale(&image.data, image.channels)
        .into_iter()
        .map(|v| (v * scale).round().clamp(0.0, 255.0) as u8)
        .collect();

    GrayImage::from_raw(image.width, image.height, pixels).ok_or_else(|| {
        format!(
            "Failed to build grayscale image: buffer does not match {}x{}",
            image.width, image.height
        )
    })
}

/// Mean structural similarity of the grayscale projections of two images.
///
/// Scored by `image_compare` (simple MSSIM, 8x8 windows weighted by area).
/// The score lies in `[-1, 1]`; identical inputs score exactly 1.
pub fn structural_similarity(
    reference: &ImageArray,
    candidate: &ImageArray,
) -> Result<f64, String> {
    if (reference.width, reference.height) != (candidate.width, candidate.height) {
        return Err(format!(
            "SSIM input size mismatch: {}x{} vs {}x{}",
            reference.width, reference.height, candidate.width, candidate.height
        ));
    }
    if reference.pixel_count() == 0 {
        return Ok(1.0);
    }

    let first = to_gray_image(reference)?;
    let second = to_gray_image(candidate)?;
    let similarity =
        image_compare::gray_similarity_structure(&Algorithm::MSSIMSimple, &first, &second)
            .map_err(|e| format!("Failed to compute structural similarity: {}", e))?;

    // Degenerate windows (single row or column) have no variance to score
    if !similarity.score.is_finite() {
        return Err(format!(
            "Structural similarity undefined for a {}x{} image",
            reference.width, reference.height
        ));
    }
    Ok(similarity.score)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_norms_of_signed_differences() {
        let diff = [0.0, -3.0, 2.0, 0.0, 0.0, 1.0];

        assert_eq!(manhattan_norm(&diff), 6.0);
        assert_eq!(zero_norm(&diff), 3);
        assert_eq!(differing_pixels(&diff, 3), 2);
    }

    #[test]
    fn test_channels_all_zero_checks_every_pixel() {
        // Only the last pixel differs, and only in alpha
        let diff = [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 9.0];

        assert!(channels_all_zero(&diff, 4, 0..3));
        assert!(!channels_all_zero(&diff, 4, 3..4));
        // No alpha channel means nothing can differ there
        assert!(channels_all_zero(&diff[..6], 3, 3..4));
    }

    #[test]
    fn test_grayscale_uses_rec601_weights() {
        let gray = to_grayscale(&[255.0, 0.0, 0.0, 7.0, 0.0, 255.0, 0.0, 7.0], 4);

        assert!((gray[0] - 76.245).abs() < 1e-9);
        assert!((gray[1] - 149.685).abs() < 1e-9);
    }

    fn gray(width: u32, height: u32, values: Vec<f32>) -> ImageArray {
        ImageArray::new(width, height, 1, 255.0, values).unwrap()
    }

    #[test]
    fn test_gray_image_rescales_wide_samples() {
        let data = vec![65535.0, 65535.0, 65535.0, 0.0, 0.0, 0.0];
        let wide = ImageArray::new(2, 1, 3, 65535.0, data).unwrap();

        let gray = to_gray_image(&wide).unwrap();

        assert_eq!(gray.as_raw(), &vec![255u8, 0]);
    }

    #[test]
    fn test_ssim_identical_is_one() {
        let img = gray(10, 10, (0..100).map(|i| (i * 7 % 255) as f32).collect());

        let score = structural_similarity(&img, &img).unwrap();

        assert_eq!(score, 1.0);
    }

    #[test]
    fn test_ssim_uniform_black_is_one() {
        let img = gray(10, 10, vec![0.0; 100]);

        let score = structural_similarity(&img, &img).unwrap();

        assert_eq!(score, 1.0);
    }

    #[test]
    fn test_ssim_drops_for_inverted_image() {
        let a: Vec<f32> = (0..400).map(|i| ((i % 20) * 12) as f32).collect();
        let b: Vec<f32> = a.iter().map(|v| 255.0 - v).collect();

        let score = structural_similarity(&gray(20, 20, a), &gray(20, 20, b)).unwrap();

        assert!(score < 0.0, "inverted gradient should anti-correlate: {}", score);
        assert!(score >= -1.0);
    }

    #[test]
    fn test_ssim_small_image_is_scored() {
        let a = gray(2, 2, vec![10.0, 20.0, 30.0, 40.0]);
        let b = gray(2, 2, vec![10.0, 20.0, 30.0, 41.0]);

        let score = structural_similarity(&a, &b).unwrap();

        assert!(score > 0.99 && score < 1.0, "score {}", score);
    }

    #[test]
    fn test_ssim_size_mismatch() {
        let result = structural_similarity(&gray(2, 2, vec![0.0; 4]), &gray(3, 1, vec![0.0; 3]));

        assert!(result.unwrap_err().contains("size mismatch"));
    }
}
