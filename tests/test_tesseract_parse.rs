//! Integration tests for parsing Tesseract's TSV and OSD output.

use idcard_ocr::detection::tesseract::{parse_osd_rotation, parse_tsv_tokens};
use idcard_ocr::detection::{OcrError, Rotation};
use idcard_ocr::models::BoundingBox;

const TSV: &str = "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext
1\t1\t0\t0\t0\t0\t0\t0\t640\t400\t-1\t
2\t1\t1\t0\t0\t0\t36\t92\t531\t140\t-1\t
4\t1\t1\t1\t1\t0\t36\t92\t311\t24\t-1\t
5\t1\t1\t1\t1\t1\t36\t92\t90\t24\t96.063751\tSita
5\t1\t1\t1\t1\t2\t140\t92\t80\t24\t88.5\tDevi
5\t1\t1\t1\t1\t3\t230\t92\t10\t24\t-1\t
5\t1\t1\t1\t1\t4\t250\t92\t40\t24\t35.2\t
5\t1\t1\t1\t2\t1\t36\t130\t120\t24\t61.49\tFEMALE
";

#[test]
fn test_parse_tsv_keeps_words_only() {
    let tokens = parse_tsv_tokens(TSV).unwrap();
    let texts: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
    assert_eq!(texts, vec!["Sita", "Devi", "FEMALE"]);
}

#[test]
fn test_parse_tsv_rounds_confidence_and_reads_boxes() {
    let tokens = parse_tsv_tokens(TSV).unwrap();
    assert_eq!(tokens[0].confidence, 96);
    assert_eq!(tokens[1].confidence, 89);
    assert_eq!(tokens[2].confidence, 61);
    assert_eq!(
        tokens[1].bbox,
        BoundingBox {
            x: 140,
            y: 92,
            width: 80,
            height: 24
        }
    );
}

#[test]
fn test_parse_tsv_header_only() {
    let header = TSV.lines().next().unwrap();
    assert!(parse_tsv_tokens(header).unwrap().is_empty());
}

#[test]
fn test_parse_tsv_rejects_missing_columns() {
    let result = parse_tsv_tokens("level\tleft\ttop\n5\t1\t2\n");
    assert!(matches!(result, Err(OcrError::Parse(_))));
    assert!(matches!(parse_tsv_tokens(""), Err(OcrError::Parse(_))));
}

#[test]
fn test_parse_osd_rotation() {
    let osd = "Page number: 0\nOrientation in degrees: 270\nRotate: 90\nOrientation confidence: 2.76\nScript: Latin\n";
    assert_eq!(parse_osd_rotation(osd), Some(Rotation::Clockwise90));
    assert_eq!(parse_osd_rotation("Rotate: 0"), Some(Rotation::None));
    assert_eq!(parse_osd_rotation("Rotate: 45"), None);
    assert_eq!(parse_osd_rotation("Too few characters"), None);
}
