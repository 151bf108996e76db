//! Reference/candidate image comparison
//!
//! Produces a [`Comparison`] for one image pair: shape check, signed
//! difference array, Manhattan and zero norms, structural similarity between
//! the grayscale projections of reference and candidate, and a classification
//! of which channel groups differ.

mod metrics;


use std::fmt;

use crate::decoders::ImageArray;

pub use metrics::{
    channels_all_zero, differing_pixels, manhattan_norm, structural_similarity, to_gray_image,
    to_grayscale, zero_norm,
};

/// Number of leading color channels; anything after them is alpha
pub const RGB_CHANNELS: usize = 3;

/// Which channel groups of a failing comparison carry the difference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelFailure {
    /// Arrays are identical
    None,
    /// Only the RGB channels differ
    RgbOnly,
    /// Only the alpha channel differs
    AlphaOnly,
    /// RGB and alpha differ (also used for shape mismatches)
    Both,
}

impl ChannelFailure {
    /// Stable identifier used as the report failure type
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelFailure::None => "none",
            ChannelFailure::RgbOnly => "rgb-only",
            ChannelFailure::AlphaOnly => "alpha-only",
            ChannelFailure::Both => "both",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ChannelFailure::None => "all channels match",
            ChannelFailure::RgbOnly => "RGB channels differ, alpha matches",
            ChannelFailure::AlphaOnly => "alpha channel differs, RGB matches",
            ChannelFailure::Both => "RGB and alpha channels differ",
        }
    }

    /// Classify from the two element-wise all-zero checks
    pub fn classify(rgb_all_zero: bool, alpha_all_zero: bool) -> Self {
        match (rgb_all_zero, alpha_all_zero) {
            (true, true) => ChannelFailure::None,
            (false, true) => ChannelFailure::RgbOnly,
            (true, false) => ChannelFailure::AlphaOnly,
            (false, false) => ChannelFailure::Both,
        }
    }
}

impl fmt::Display for ChannelFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of comparing one reference image against one candidate image
#[derive(Debug, Clone)]
pub struct Comparison {
    /// Whether reference and candidate have the same `(H, W, C)` shape
    pub equal_shape: bool,

    pub reference_shape: (u32, u32, u8),
    pub candidate_shape: (u32, u32, u8),

    /// `reference - candidate`, or the reference itself when shapes differ
    pub difference: ImageArray,

    /// Sum of absolute differences over every sample
    pub error_metric: f64,

    /// Count of non-zero samples in the difference
    pub differing_samples: u64,

    /// Count of pixels with any non-zero channel in the difference
    pub differing_pixels: u64,

    /// SSIM of the grayscale reference against the grayscale candidate.
    /// Not computed when the shapes differ or the image is too thin to score.
    pub similarity: Option<f64>,

    pub failure: ChannelFailure,
}

impl Comparison {
    pub fn failed(&self) -> bool {
        // Shape mismatches already classify as Both; the flag is checked as a guard
        !self.equal_shape || self.failure != ChannelFailure::None
    }

    pub fn passed(&self) -> bool {
        !self.failed()
    }

    /// One-line summary used as the report failure message
    pub fn summary(&self) -> String {
        if !self.equal_shape {
            return format!(
                "shape mismatch: reference {}, candidate {}",
                shape_label(self.reference_shape),
                shape_label(self.candidate_shape)
            );
        }
        format!(
            "{} pixels differ ({})",
            self.differing_pixels,
            self.failure.as_str()
        )
    }

    /// Multi-line failure details, one fact per line in a fixed order
    pub fn failure_details(&self) -> String {
        let (height, width, _) = self.difference.shape();
        let total_pixels = height as u64 * width as u64;
        let similarity = match self.similarity {
            Some(score) => format!("{:.6}", score),
            None => "n/a".to_string(),
        };

        let mut lines = Vec::with_capacity(6);
        if !self.equal_shape {
            lines.push(format!(
                "shape: reference {} vs candidate {}",
                shape_label(self.reference_shape),
                shape_label(self.candidate_shape)
            ));
        }
        lines.push(format!(
            "differing pixels: {} of {}",
            self.differing_pixels, total_pixels
        ));
        lines.push(format!("differing samples: {}", self.differing_samples));
        lines.push(format!(
            "channels: {} ({})",
            self.failure.as_str(),
            self.failure.description()
        ));
        lines.push(format!("error metric (manhattan norm): {:.2}", self.error_metric));
        lines.push(format!("structural similarity: {}", similarity));
        lines.join("\n")
    }

    /// Display-safe diff: absolute RGB differences plus a fully opaque alpha channel
    pub fn diff_composite(&self) -> ImageArray {
        let diff = &self.difference;
        let stride = diff.channels as usize;
        let color = stride.min(RGB_CHANNELS);
        let mut data = Vec::with_capacity(diff.pixel_count() * (RGB_CHANNELS + 1));
        for px in diff.data.chunks_exact(stride) {
            for c in 0..RGB_CHANNELS {
                data.push(px[c.min(color - 1)].abs());
            }
            data.push(diff.max_value);
        }

        ImageArray {
            width: diff.width,
            height: diff.height,
            channels: (RGB_CHANNELS + 1) as u8,
            max_value: diff.max_value,
            data,
        }
    }

    /// Absolute alpha differences, when the difference carries alpha channels
    pub fn alpha_difference(&self) -> Option<ImageArray> {
        let diff = &self.difference;
        let stride = diff.channels as usize;
        if stride <= RGB_CHANNELS {
            return None;
        }

        let data: Vec<f32> = diff
            .data
            .chunks_exact(stride)
            .flat_map(|px| px[RGB_CHANNELS..].iter().map(|v| v.abs()))
            .collect();

        Some(ImageArray {
            width: diff.width,
            height: diff.height,
            channels: (stride - RGB_CHANNELS) as u8,
            max_value: diff.max_value,
            data,
        })
    }
}

fn shape_label((height, width, channels): (u32, u32, u8)) -> String {
    format!("{}x{}x{}", height, width, channels)
}

/// Compare a reference image against a candidate image.
///
/// A shape mismatch is a failing outcome, not an error: the reference stands
/// in as the difference and no similarity score is computed.
pub fn compare_images(reference: &ImageArray, candidate: &ImageArray) -> Comparison {
    if reference.shape() != candidate.shape() {
        let difference = reference.clone();
        return Comparison {
            equal_shape: false,
            reference_shape: reference.shape(),
            candidate_shape: candidate.shape(),
            error_metric: manhattan_norm(&difference.data),
            differing_samples: zero_norm(&difference.data),
            differing_pixels: differing_pixels(&difference.data, difference.channels),
            similarity: None,
            failure: ChannelFailure::Both,
            difference,
        };
    }

    let data: Vec<f32> = reference
        .data
        .iter()
        .zip(&candidate.data)
        .map(|(r, t)| r - t)
        .collect();
    let difference = ImageArray {
        width: reference.width,
        height: reference.height,
        channels: reference.channels,
        max_value: reference.max_value,
        data,
    };

    let channels = difference.channels;
    let stride = channels as usize;
    let rgb_all_zero = channels_all_zero(&difference.data, channels, 0..RGB_CHANNELS);
    let alpha_all_zero = channels_all_zero(&difference.data, channels, RGB_CHANNELS..stride);

    let similarity = structural_similarity(reference, candidate).ok();

    Comparison {
        equal_shape: true,
        reference_shape: reference.shape(),
        candidate_shape: candidate.shape(),
        error_metric: manhattan_norm(&difference.data),
        differing_samples: zero_norm(&difference.data),
        differing_pixels: differing_pixels(&difference.data, channels),
        similarity,
        failure: ChannelFailure::classify(rgb_all_zero, alpha_all_zero),
        difference,
    }
}
