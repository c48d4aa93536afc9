//! Integration tests for back-face address extraction.

mod common;

use common::*;
use idcard_ocr::detection::Rotation;
use idcard_ocr::fields::address::{parse_address, region_of_interest, AddressExtractor};
use idcard_ocr::PipelineContext;
use image::{DynamicImage, RgbImage};

#[test]
fn test_parse_address_lines() {
    let text = ["Header", "Address:", "12 Main Street", "Some City 560001", "Footer"].join("\n");
    let fields = parse_address(&text);
    assert_eq!(fields.address.as_deref(), Some("12 Main Street Some City"));
    assert_eq!(fields.pincode.as_deref(), Some("560001"));
}

#[test]
fn test_parse_address_stops_at_pincode_line() {
    let text = "Address:\n12 Main Street\n\nSome City\n560001\nFooter 110011";
    let fields = parse_address(text);
    assert_eq!(fields.address.as_deref(), Some("12 Main Street Some City"));
    assert_eq!(fields.pincode.as_deref(), Some("560001"));
}

#[test]
fn test_parse_address_drops_text_after_pincode() {
    let fields = parse_address("Address:\n12 Main Street\nSome City, 560001 India");
    assert_eq!(fields.address.as_deref(), Some("12 Main Street Some City"));
    assert_eq!(fields.pincode.as_deref(), Some("560001"));
}

#[test]
fn test_parse_address_label_is_case_insensitive() {
    let fields = parse_address("ADDRESS\n  Flat 4, Lake View  \n110011");
    assert_eq!(fields.address.as_deref(), Some("Flat 4, Lake View"));
    assert_eq!(fields.pincode.as_deref(), Some("110011"));
}

#[test]
fn test_parse_address_without_label() {
    let fields = parse_address("12 Main Street\nSome City 560001");
    assert_eq!(fields.address, None);
    assert_eq!(fields.pincode, None);
}

#[test]
fn test_parse_address_without_pincode() {
    let fields = parse_address("Address:\n12 Main Street\nSome City");
    assert_eq!(fields.address.as_deref(), Some("12 Main Street Some City"));
    assert_eq!(fields.pincode, None);
}

#[test]
fn test_parse_address_ignores_longer_numbers() {
    let fields = parse_address("Address:\nPlot 1234567\nTown - 400001");
    assert_eq!(fields.address.as_deref(), Some("Plot 1234567 Town"));
    assert_eq!(fields.pincode.as_deref(), Some("400001"));
}

#[test]
fn test_parse_address_immediate_pincode_is_empty_address() {
    let fields = parse_address("Address: \n560001");
    assert_eq!(fields.address, None);
    assert_eq!(fields.pincode.as_deref(), Some("560001"));
}

#[test]
fn test_region_of_interest_landscape_takes_right_half() {
    let card = DynamicImage::ImageRgb8(RgbImage::new(299, 199));
    let roi = region_of_interest(&card);
    assert_eq!((roi.width(), roi.height()), (150, 199));
}

#[test]
fn test_region_of_interest_portrait_takes_bottom_half() {
    let card = DynamicImage::ImageRgb8(RgbImage::new(200, 301));
    let roi = region_of_interest(&card);
    assert_eq!((roi.width(), roi.height()), (200, 151));
}

#[test]
fn test_address_extractor_reads_back_photo() {
    let backend = card_backend();
    let fields = AddressExtractor::default()
        .extract(&back_photo(), &backend, &PipelineContext::default(), "back")
        .unwrap();
    assert_eq!(
        fields.address.as_deref(),
        Some("W/O Ramesh, 12 Main Street Bengaluru, Karnataka")
    );
    assert_eq!(fields.pincode.as_deref(), Some("560001"));
    assert_eq!(backend.seen_sizes(), vec![BACK_ROI_SIZE]);
}

#[test]
fn test_address_extractor_rotates_region() {
    // A quarter turn swaps the region's sides before OCR.
    let rotated_size = (BACK_ROI_SIZE.1, BACK_ROI_SIZE.0);
    let backend = ScriptedBackend::new()
        .with_page(rotated_size, BACK_TEXT, Vec::new())
        .with_orientation(Rotation::Clockwise90);
    let fields = AddressExtractor::default()
        .extract(&back_photo(), &backend, &PipelineContext::default(), "back")
        .unwrap();
    assert_eq!(fields.pincode.as_deref(), Some("560001"));
    assert_eq!(backend.seen_sizes(), vec![rotated_size]);
}

#[test]
fn test_address_extractor_ignores_orientation_failure() {
    let backend = card_backend().with_failing_orientation();
    let fields = AddressExtractor::default()
        .extract(&back_photo(), &backend, &PipelineContext::default(), "back")
        .unwrap();
    assert_eq!(fields.pincode.as_deref(), Some("560001"));
}

#[test]
fn test_address_extractor_without_card() {
    let result = AddressExtractor::default().extract(
        &dark_photo(),
        &card_backend(),
        &PipelineContext::default(),
        "back",
    );
    assert!(matches!(result, Err(ExtractError::CardNotFound)));
}
