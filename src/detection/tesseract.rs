use image::DynamicImage;
use regex::Regex;
use std::io::Write;
use std::path::PathBuf;
use std::process::Command;
use std::sync::OnceLock;
use tracing::{debug, instrument, warn};

use crate::detection::ocr::{OcrBackend, OcrError, OcrMode};
use crate::detection::orientation::Rotation;
use crate::models::{BoundingBox, OcrToken, TokenStream};

/// Word-level rows in Tesseract's TSV output.
const TSV_WORD_LEVEL: u32 = 5;

/// Runs the `tesseract` command-line engine on a temporary PNG.
///
/// Unlike ocrs this reports real word confidences and supports
/// orientation and script detection (`--psm 0`).
pub struct TesseractBackend {
    command: PathBuf,
}

impl TesseractBackend {
    pub fn new(command: impl Into<PathBuf>) -> Self {
        Self {
            command: command.into(),
        }
    }

    fn run(&self, image: &DynamicImage, args: &[String]) -> Result<String, OcrError> {
        let mut tmp = tempfile::Builder::new().suffix(".png").tempfile()?;
        image
            .write_to(&mut tmp, image::ImageFormat::Png)
            .map_err(|e| OcrError::Engine(format!("failed to write temp image for OCR: {e}")))?;
        tmp.flush()?;

        let output = Command::new(&self.command)
            .arg(tmp.path())
            .arg("stdout")
            .args(args)
            .output()?;

        if !output.status.success() {
            return Err(OcrError::Engine(format!(
                "{} exited with {}: {}",
                self.command.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn mode_args(mode: &OcrMode) -> Vec<String> {
        vec![
            "--psm".to_string(),
            mode.page_segmentation.to_string(),
            "-l".to_string(),
            mode.language.clone(),
        ]
    }
}

impl OcrBackend for TesseractBackend {
    #[instrument(level = "debug", skip(self, image))]
    fn recognize_text(&self, image: &DynamicImage, mode: &OcrMode) -> Result<String, OcrError> {
        self.run(image, &Self::mode_args(mode))
    }

    #[instrument(level = "debug", skip(self, image))]
    fn recognize_tokens(
        &self,
        image: &DynamicImage,
        mode: &OcrMode,
    ) -> Result<TokenStream, OcrError> {
        let mut args = Self::mode_args(mode);
        args.push("tsv".to_string());
        let tsv = self.run(image, &args)?;
        parse_tsv_tokens(&tsv)
    }

    #[instrument(level = "debug", skip(self, image))]
    fn detect_orientation(&self, image: &DynamicImage) -> Result<Option<Rotation>, OcrError> {
        // OSD fails outright when there is too little text; that is not an error here.
        match self.run(image, &["--psm".to_string(), "0".to_string()]) {
            Ok(osd) => Ok(parse_osd_rotation(&osd)),
            Err(OcrError::Engine(message)) => {
                debug!(%message, "orientation detection gave no result");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn name(&self) -> &str {
        "tesseract"
    }
}

/// Parse the word rows of `tesseract ... tsv` output into tokens.
///
/// Rows that are not words, have no text, or carry a negative confidence are skipped.
pub fn parse_tsv_tokens(tsv: &str) -> Result<TokenStream, OcrError> {
    let mut lines = tsv.lines();
    let header = lines
        .next()
        .ok_or_else(|| OcrError::Parse("empty TSV output".to_string()))?;
    let columns: Vec<&str> = header.split('\t').collect();
    let column = |name: &str| {
        columns
            .iter()
            .position(|c| *c == name)
            .ok_or_else(|| OcrError::Parse(format!("TSV header has no {name:?} column")))
    };
    let level_col = column("level")?;
    let left_col = column("left")?;
    let top_col = column("top")?;
    let width_col = column("width")?;
    let height_col = column("height")?;
    let conf_col = column("conf")?;
    let text_col = column("text")?;

    let mut tokens = Vec::new();
    for row in lines {
        let fields: Vec<&str> = row.split('\t').collect();
        if fields.len() <= text_col {
            continue;
        }
        let level: u32 = fields[level_col].parse().unwrap_or(0);
        let text = fields[text_col].trim();
        if level != TSV_WORD_LEVEL || text.is_empty() {
            continue;
        }
        let confidence: f32 = fields[conf_col].trim().parse().unwrap_or(-1.0);
        if confidence < 0.0 {
            continue;
        }
        let number = |idx: usize| fields[idx].trim().parse::<u32>().unwrap_or(0);
        let bbox = BoundingBox {
            x: number(left_col),
            y: number(top_col),
            width: number(width_col),
            height: number(height_col),
        };
        tokens.push(OcrToken::new(
            text,
            confidence.round().clamp(0.0, 100.0) as u8,
            bbox,
        ));
    }
    Ok(tokens)
}

/// Read the `Rotate: N` line of Tesseract's orientation report.
pub fn parse_osd_rotation(osd: &str) -> Option<Rotation> {
    static ROTATE: OnceLock<Regex> = OnceLock::new();
    let re = ROTATE.get_or_init(|| Regex::new(r"Rotate:\s*(\d+)").expect("invalid regex"));
    let degrees: u32 = re.captures(osd)?.get(1)?.as_str().parse().ok()?;
    let rotation = Rotation::from_degrees(degrees);
    if rotation.is_none() {
        warn!(degrees, "orientation report is not a multiple of 90 degrees");
    }
    rotation
}
