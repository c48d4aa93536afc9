use std::sync::{Arc, OnceLock};

use image::DynamicImage;
use regex::Regex;
use tracing::{debug, instrument};

use crate::detection::ocr::OcrBackend;
use crate::detection::preprocessing::BilateralParams;
use crate::detection::steps::{BilateralSmoothStep, GrayscaleStep, OtsuBinarizeStep, StepChain};
use crate::error::ExtractError;
use crate::models::{FieldRecord, Gender, OcrToken};
use crate::pipeline::{stage, PipelineContext};

macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static R: OnceLock<Regex> = OnceLock::new();
            R.get_or_init(|| Regex::new($pat).expect("invalid regex"))
        }
    };
}

re!(re_id_run, r"\d[\d\s\-]{10,}");
re!(re_dob, r"\d{2}/\d{2}/\d{4}");

/// Lowercase fragments that disqualify a token pair from being the holder's name.
pub const NAME_STOPLIST: [&str; 6] = ["dob", "india", "government", "female", "male", "aadhaar"];

/// Tokens at or below this confidence are never taken as part of the name.
pub const NAME_MIN_CONFIDENCE: u8 = 60;

/// First digit run holding exactly twelve digits, grouped as `XXXX XXXX XXXX`.
pub fn extract_id_number(text: &str) -> Option<String> {
    re_id_run().find_iter(text).find_map(|run| {
        let digits: String = run.as_str().chars().filter(char::is_ascii_digit).collect();
        (digits.len() == 12).then(|| {
            format!("{} {} {}", &digits[..4], &digits[4..8], &digits[8..])
        })
    })
}

/// First `DD/MM/YYYY` looking date; the calendar is not checked.
pub fn extract_dob(text: &str) -> Option<String> {
    re_dob().find(text).map(|m| m.as_str().to_string())
}

/// `female` is tested before `male` since one contains the other.
pub fn extract_gender(text: &str) -> Option<Gender> {
    let lower = text.to_lowercase();
    if lower.contains("female") {
        Some(Gender::Female)
    } else if lower.contains("male") {
        Some(Gender::Male)
    } else if lower.contains("other") {
        Some(Gender::Other)
    } else {
        None
    }
}

/// First two adjacent, confident, purely alphabetic tokens that are not card boilerplate.
pub fn extract_name(tokens: &[OcrToken], min_confidence: u8) -> Option<String> {
    tokens.windows(2).find_map(|pair| {
        let first = pair[0].text.trim();
        let second = pair[1].text.trim();
        if !is_alphabetic_word(first) || !is_alphabetic_word(second) {
            return None;
        }
        if pair[0].confidence <= min_confidence || pair[1].confidence <= min_confidence {
            return None;
        }
        let candidate = format!("{first} {second}");
        let lower = candidate.to_lowercase();
        if NAME_STOPLIST.iter().any(|stop| lower.contains(stop)) {
            return None;
        }
        Some(candidate)
    })
}

fn is_alphabetic_word(word: &str) -> bool {
    !word.is_empty() && word.chars().all(char::is_alphabetic)
}

/// Reads name, date of birth, gender and number off a front-face photo.
///
/// The general pass (grayscale, bilateral smoothing) feeds the text and token
/// fields; the number pass (grayscale, Otsu) feeds the identity number only.
#[derive(Debug, Clone)]
pub struct FrontFieldExtractor {
    pub general: StepChain,
    pub number: StepChain,
    pub name_min_confidence: u8,
}

impl Default for FrontFieldExtractor {
    fn default() -> Self {
        Self {
            general: StepChain::new(stage::GENERAL_PASS)
                .add_step(Arc::new(GrayscaleStep))
                .add_step(Arc::new(BilateralSmoothStep {
                    params: BilateralParams::default(),
                })),
            number: StepChain::new(stage::NUMBER_PASS)
                .add_step(Arc::new(GrayscaleStep))
                .add_step(Arc::new(OtsuBinarizeStep)),
            name_min_confidence: NAME_MIN_CONFIDENCE,
        }
    }
}

impl FrontFieldExtractor {
    #[instrument(level = "debug", skip(self, image, backend, context))]
    pub fn extract(
        &self,
        image: &DynamicImage,
        backend: &dyn OcrBackend,
        context: &PipelineContext,
        label: &str,
    ) -> Result<FieldRecord, ExtractError> {
        let general = self.general.run(image, context, label)?;
        let text = backend.recognize_text(&general, &context.mode)?;
        let tokens = backend.recognize_tokens(&general, &context.mode)?;

        let number_image = self.number.run(image, context, label)?;
        let number_text = backend.recognize_text(&number_image, &context.mode)?;

        let record = FieldRecord {
            name: extract_name(&tokens, self.name_min_confidence),
            dob: extract_dob(&text),
            gender: extract_gender(&text),
            aadhaar_number: extract_id_number(&number_text),
            ..FieldRecord::default()
        };
        debug!(tokens = tokens.len(), fields = ?record.entries(), "front fields extracted");
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BoundingBox;

    fn token(text: &str, confidence: u8) -> OcrToken {
        OcrToken::new(text, confidence, BoundingBox::default())
    }

    #[test]
    fn id_number_skips_runs_with_wrong_digit_count() {
        let text = "Phone 98765 43210\nVID 1234 5678 9012";
        assert_eq!(extract_id_number(text), Some("1234 5678 9012".to_string()));
    }

    #[test]
    fn id_number_accepts_dashes() {
        assert_eq!(
            extract_id_number("No: 1234-5678-9012"),
            Some("1234 5678 9012".to_string())
        );
    }

    #[test]
    fn dob_is_not_calendar_checked() {
        assert_eq!(extract_dob("DOB: 31/02/1990"), Some("31/02/1990".to_string()));
        assert_eq!(extract_dob("Year of Birth 1990"), None);
    }

    #[test]
    fn gender_other() {
        assert_eq!(extract_gender("Sex: OTHER"), Some(Gender::Other));
        assert_eq!(extract_gender("nothing here"), None);
    }

    #[test]
    fn name_requires_two_confident_alphabetic_tokens() {
        let tokens = vec![
            token("Ravi", 95),
            token("Kumar", 55),
            token("Sita", 80),
            token("Devi", 81),
        ];
        assert_eq!(extract_name(&tokens, NAME_MIN_CONFIDENCE), Some("Sita Devi".to_string()));
    }

    #[test]
    fn name_confidence_threshold_is_exclusive() {
        let tokens = vec![token("Ravi", 60), token("Kumar", 99)];
        assert_eq!(extract_name(&tokens, NAME_MIN_CONFIDENCE), None);
    }
}
