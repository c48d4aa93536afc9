use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use tracing_subscriber::EnvFilter;

use idcard_ocr::core::db::{export_csv, NewRecord, RecordDb, RecordRepository};
use idcard_ocr::core::intake::{latest_image_pair, IntakeStatus, TriggerGuard};
use idcard_ocr::detection::ocr::{default_model_dir, OcrMode};
use idcard_ocr::{open_image, EngineConfig, ExtractError, FieldRecord, Pipeline, PipelineConfig};
use image::DynamicImage;

#[derive(Parser)]
#[command(name = "idcard-ocr")]
#[command(about = "Read identity fields from photos of both faces of an ID card")]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Save debug outputs to directory (must be empty)
    #[arg(long, value_name = "DIR", global = true)]
    debug_out: Option<PathBuf>,

    /// OCR engine to use
    #[arg(long, value_enum, default_value_t = EngineKind::Ocrs, env = "IDCARD_OCR_ENGINE", global = true)]
    engine: EngineKind,

    /// Directory holding the ocrs models (default: ~/.cache/ocrs)
    #[arg(long, value_name = "DIR", env = "IDCARD_OCR_MODELS", global = true)]
    models: Option<PathBuf>,

    /// Tesseract executable
    #[arg(long, value_name = "PATH", default_value = "tesseract", global = true)]
    tesseract_cmd: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum EngineKind {
    Ocrs,
    Tesseract,
}

#[derive(Subcommand)]
enum Command {
    /// Extract all fields from two images given in any order
    Extract {
        #[arg(value_name = "IMAGE")]
        first: PathBuf,
        #[arg(value_name = "IMAGE")]
        second: PathBuf,
        /// Print the record as JSON
        #[arg(long)]
        json: bool,
        /// Also save the record to this database
        #[arg(long, value_name = "DB", env = "IDCARD_OCR_DB")]
        store: Option<PathBuf>,
        /// Sender to attach to the stored record
        #[arg(long, value_name = "ID")]
        sender: Option<String>,
    },
    /// Extract front-face fields from one image
    Front {
        #[arg(value_name = "IMAGE")]
        image: PathBuf,
    },
    /// Extract the address from one back-face image
    Back {
        #[arg(value_name = "IMAGE")]
        image: PathBuf,
    },
    /// Process the two newest `image_*` files in a directory
    Inbox {
        #[arg(value_name = "DIR")]
        dir: PathBuf,
        #[arg(long, value_name = "ID")]
        sender: String,
        #[arg(long, value_name = "DB", env = "IDCARD_OCR_DB")]
        store: Option<PathBuf>,
    },
    /// List stored records
    Records {
        #[arg(long, value_name = "DB", env = "IDCARD_OCR_DB")]
        store: PathBuf,
        /// Write CSV to stdout instead of a table
        #[arg(long)]
        csv: bool,
    },
}

impl Cli {
    fn pipeline_config(&self) -> anyhow::Result<PipelineConfig> {
        let engine = match self.engine {
            EngineKind::Ocrs => EngineConfig::Ocrs {
                model_dir: match &self.models {
                    Some(dir) => dir.clone(),
                    None => default_model_dir()?,
                },
            },
            EngineKind::Tesseract => EngineConfig::Tesseract {
                command: self.tesseract_cmd.clone(),
            },
        };
        Ok(PipelineConfig {
            ocr: OcrMode::default(),
            engine,
            debug_dir: self.debug_out.clone(),
        })
    }

    fn pipeline(&self) -> anyhow::Result<Pipeline> {
        Pipeline::from_config(self.pipeline_config()?).context("Failed to set up the pipeline")
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_fields(record: &FieldRecord, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(record)?);
        return Ok(());
    }
    if record.is_empty() {
        println!("No fields detected.");
    }
    for (key, value) in record.entries() {
        println!("{key}: {value}");
    }
    Ok(())
}

async fn extract_pair(pipeline: Pipeline, first: &Path, second: &Path) -> anyhow::Result<FieldRecord> {
    let (first, second) = (first.to_path_buf(), second.to_path_buf());
    let record = tokio::task::spawn_blocking(move || pipeline.extract_files(&first, &second))
        .await
        .context("Extraction task panicked")??;
    Ok(record)
}

/// Run one single-image extraction off the async runtime.
async fn extract_single<T, F>(pipeline: Pipeline, image: &Path, extract: F) -> anyhow::Result<T>
where
    T: Send + 'static,
    F: FnOnce(&Pipeline, &DynamicImage) -> Result<T, ExtractError> + Send + 'static,
{
    let image = image.to_path_buf();
    let result = tokio::task::spawn_blocking(move || {
        let img = open_image(&image)?;
        extract(&pipeline, &img)
    })
    .await
    .context("Extraction task panicked")??;
    Ok(result)
}

async fn store_record(db_file: &Path, sender: Option<String>, fields: FieldRecord) -> anyhow::Result<()> {
    let db = RecordDb::open(db_file).await?;
    let stored = db.add_record(&NewRecord { sender, fields }).await?;
    db.close().await?;
    println!("Stored record {}", stored.id);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();
    init_tracing(args.verbose);

    match &args.command {
        Command::Extract {
            first,
            second,
            json,
            store,
            sender,
        } => {
            let record = extract_pair(args.pipeline()?, first, second).await?;
            print_fields(&record, *json)?;
            if let Some(db_file) = store {
                store_record(db_file, sender.clone(), record).await?;
            }
        }
        Command::Front { image } => {
            let fields = extract_single(args.pipeline()?, image, Pipeline::extract_front).await?;
            print_fields(&fields, false)?;
        }
        Command::Back { image } => {
            let address = extract_single(args.pipeline()?, image, Pipeline::extract_back).await?;
            print_fields(&FieldRecord::default().with_address(address), false)?;
        }
        Command::Inbox { dir, sender, store } => {
            let [first, second] = match latest_image_pair(dir)? {
                IntakeStatus::Ready(pair) => pair,
                IntakeStatus::Waiting { found } => {
                    println!("Waiting for images: {found} of 2 received.");
                    return Ok(());
                }
            };

            let guard = TriggerGuard::default();
            if let Some(db_file) = store {
                let db = RecordDb::open(db_file).await?;
                if let Some(latest) = db.get_records_by_sender(sender).await?.last() {
                    guard.seed(sender, latest.created_at);
                }
                db.close().await?;
            }
            if !guard.try_acquire(sender, OffsetDateTime::now_utc()) {
                println!(
                    "Skipped: {sender} was processed less than {} seconds ago.",
                    guard.window().whole_seconds()
                );
                return Ok(());
            }

            let record = extract_pair(args.pipeline()?, &first, &second).await?;
            print_fields(&record, false)?;
            if let Some(db_file) = store {
                store_record(db_file, Some(sender.clone()), record).await?;
            }
        }
        Command::Records { store, csv } => {
            let db = RecordDb::open(store).await?;
            let records = db.get_records().await?;
            db.close().await?;
            if *csv {
                export_csv(&records, std::io::stdout().lock())?;
            } else if records.is_empty() {
                println!("No records stored.");
            } else {
                for record in &records {
                    let sender = record.sender.as_deref().unwrap_or("-");
                    println!("{} {} {}", record.id, record.created_at, sender);
                    for (key, value) in record.fields.entries() {
                        println!("    {key}: {value}");
                    }
                }
            }
        }
    }

    Ok(())
}
