pub mod config;
pub mod core;
pub mod decode;
pub mod detection;
pub mod error;
pub mod fields;
pub mod models;
pub mod pipeline;

pub use config::{EngineConfig, PipelineConfig};
pub use decode::{decode_image, open_image};
pub use error::ExtractError;
pub use models::{AddressFields, FieldRecord, Gender, OcrToken, TokenStream};
pub use pipeline::{DebugConfig, Pipeline, PipelineContext};
