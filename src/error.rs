use std::path::PathBuf;
use thiserror::Error;

use crate::detection::ocr::OcrError;
use crate::fields::classify::Ambiguity;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("no card-coloured region found in the image")]
    CardNotFound,
    #[error("could not tell front from back: {0}")]
    FrontBackUndetermined(Ambiguity),
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error(transparent)]
    Ocr(#[from] OcrError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to write debug image {}: {source}", path.display())]
    DebugOutput {
        path: PathBuf,
        source: image::ImageError,
    },
    #[error("debug directory is not empty: {}", .0.display())]
    DebugDirNotEmpty(PathBuf),
}
