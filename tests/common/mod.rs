#![allow(dead_code)]

mod fixtures;
pub use fixtures::*;

// Re-export commonly used types from idcard_ocr for tests
pub use idcard_ocr::core::db::{export_csv, NewRecord, RecordDb, RecordRepository, StoredRecord};
pub use idcard_ocr::detection::ocr::OcrMode;
pub use idcard_ocr::{ExtractError, FieldRecord, Gender, Pipeline};

/// Pipeline with default extractors around a scripted engine.
pub fn scripted_pipeline(backend: ScriptedBackend) -> Pipeline {
    Pipeline::with_backend(Box::new(backend), OcrMode::default())
}
