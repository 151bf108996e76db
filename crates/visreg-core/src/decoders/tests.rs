//! Tests for image decoders

use super::*;
use crate::exporters::export_image;
use tempfile::tempdir;

#[test]
fn test_image_array_rejects_wrong_length() {
    let result = ImageArray::new(2, 2, 3, 255.0, vec![0.0; 11]);

    assert!(result.unwrap_err().contains("Sample count mismatch"));
}

#[test]
fn test_shape_is_height_width_channels() {
    let image = ImageArray::filled(7, 3, 4, 255.0, 0.0);

    assert_eq!(image.shape(), (3, 7, 4));
    assert_eq!(image.shape_label(), "3x7x4");
    assert_eq!(image.pixel_count(), 21);
}

#[test]
fn test_has_extension_is_case_insensitive() {
    assert!(has_extension(Path::new("case/Frame.PNG"), SUPPORTED_EXTENSIONS));
    assert!(has_extension(Path::new("case/frame.tif"), SUPPORTED_EXTENSIONS));
    assert!(!has_extension(Path::new("case/frame.tiff"), SUPPORTED_EXTENSIONS));
    assert!(!has_extension(Path::new("case/notes.txt"), SUPPORTED_EXTENSIONS));
    assert!(!has_extension(Path::new("case/README"), SUPPORTED_EXTENSIONS));
}

#[test]
fn test_decode_unsupported_format() {
    let result = decode_image("frame.bmp");

    assert!(result.unwrap_err().contains("Unsupported file format"));
}

#[test]
fn test_decode_missing_file() {
    let result = decode_image("/nonexistent/frame.png");

    assert!(result.unwrap_err().contains("Failed to open PNG file"));
}

#[test]
fn test_decode_png_keeps_native_scale() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("rgb.png");
    let source = ImageArray::new(2, 1, 3, 255.0, vec![0.0, 128.0, 255.0, 10.0, 20.0, 30.0])
        .unwrap();
    export_image(&source, &path).unwrap();

    let decoded = decode_image(&path).unwrap();

    assert_eq!(decoded.max_value, 255.0);
    assert_eq!(decoded.data, source.data);
}

#[test]
fn test_decode_png_gray_expands_to_rgb() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("gray.png");
    let source = ImageArray::new(2, 2, 1, 255.0, vec![1.0, 2.0, 3.0, 4.0]).unwrap();
    export_image(&source, &path).unwrap();

    let decoded = decode_image(&path).unwrap();

    assert_eq!(decoded.channels, 3);
    assert_eq!(decoded.data[9..12], [4.0, 4.0, 4.0]);
}

#[test]
fn test_decode_png_gray_alpha_expands_to_rgba() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("gray_alpha.png");
    let source = ImageArray::new(1, 1, 2, 255.0, vec![50.0, 200.0]).unwrap();
    export_image(&source, &path).unwrap();

    let decoded = decode_image(&path).unwrap();

    assert_eq!(decoded.shape(), (1, 1, 4));
    assert_eq!(decoded.data, vec![50.0, 50.0, 50.0, 200.0]);
}

#[test]
fn test_expand_gray_rejects_unknown_layout() {
    let result = expand_gray(vec![0.0; 5], 5);

    assert!(result.unwrap_err().contains("Unsupported channel count"));
}
