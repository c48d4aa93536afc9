//! Integration tests for image decoding.

mod common;

use std::io::Cursor;

use common::*;
use idcard_ocr::decode_image;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};

fn encode(image: &DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut bytes = Cursor::new(Vec::new());
    image.write_to(&mut bytes, format).unwrap();
    bytes.into_inner()
}

#[test]
fn test_decode_png_as_rgb() {
    let gray = DynamicImage::ImageLuma8(back_photo().to_luma8());
    let decoded = decode_image(&encode(&gray, ImageFormat::Png)).unwrap();
    assert!(matches!(decoded, DynamicImage::ImageRgb8(_)));
    assert_eq!((decoded.width(), decoded.height()), BACK_PHOTO_SIZE);
}

#[test]
fn test_decode_jpeg() {
    let bytes = encode(&back_photo(), ImageFormat::Jpeg);
    let decoded = decode_image(&bytes).unwrap();
    assert_eq!((decoded.width(), decoded.height()), BACK_PHOTO_SIZE);
}

#[test]
fn test_decode_jpeg_without_end_marker() {
    let mut bytes = encode(&back_photo(), ImageFormat::Jpeg);
    assert_eq!(&bytes[bytes.len() - 2..], &[0xFF, 0xD9]);
    bytes.truncate(bytes.len() - 2);

    let decoded = decode_image(&bytes).unwrap();
    assert_eq!((decoded.width(), decoded.height()), BACK_PHOTO_SIZE);
}

/// Deterministic noise, so compressed size tracks the number of rows.
fn noise_image(width: u32, height: u32) -> DynamicImage {
    let mut state = 0x2545_f491_u32;
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |_, _| {
        let mut next = || {
            state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            (state >> 16) as u8
        };
        Rgb([next(), next(), next()])
    }))
}

fn cut(mut bytes: Vec<u8>, fraction: f64) -> Vec<u8> {
    bytes.truncate((bytes.len() as f64 * fraction) as usize);
    bytes
}

#[test]
fn test_decode_jpeg_cut_mid_stream() {
    let bytes = cut(encode(&back_photo(), ImageFormat::Jpeg), 0.7);
    let decoded = decode_image(&bytes).unwrap();
    assert_eq!((decoded.width(), decoded.height()), BACK_PHOTO_SIZE);
}

#[test]
fn test_decode_png_cut_mid_stream_keeps_leading_rows() {
    let original = noise_image(200, 100).to_rgb8();
    let bytes = cut(encode(&DynamicImage::ImageRgb8(original.clone()), ImageFormat::Png), 0.7);

    let decoded = decode_image(&bytes).unwrap().to_rgb8();
    assert_eq!(decoded.dimensions(), (200, 100));
    for x in 0..200 {
        assert_eq!(decoded.get_pixel(x, 0), original.get_pixel(x, 0));
    }
    // Rows past the cut never arrived.
    assert!((0..200).all(|x| decoded.get_pixel(x, 99).0 == [0, 0, 0]));
}

#[test]
fn test_decode_png_cut_in_header_is_decode_error() {
    let mut header_only = encode(&back_photo(), ImageFormat::Png);
    header_only.truncate(20);
    assert!(matches!(decode_image(&header_only), Err(ExtractError::Decode(_))));
}

#[test]
fn test_decode_garbage_is_decode_error() {
    let result = decode_image(b"definitely not an image");
    assert!(matches!(result, Err(ExtractError::Decode(_))));
}
