mod record;

use std::path::Path;

use anyhow::Context;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use uuid::Uuid;

use crate::models::{FieldRecord, Gender};

pub use record::{NewRecord, RecordRepository, StoredRecord};

/// SQLite-backed store of extraction results.
#[derive(Debug, Clone)]
pub struct RecordDb {
    pool: SqlitePool,
}

impl RecordDb {
    /// Open (creating if needed) the database at `db_file` and apply migrations.
    pub async fn open<P: AsRef<Path>>(db_file: P) -> anyhow::Result<Self> {
        let db_file = db_file.as_ref();
        let connect_opts = SqliteConnectOptions::new()
            .filename(db_file)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_opts)
            .await
            .with_context(|| format!("Failed to open record database {:?}", db_file))?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    /// Flush the WAL and release the file handles.
    pub async fn close(&self) -> anyhow::Result<()> {
        sqlx::query("PRAGMA wal_checkpoint(TRUNCATE);")
            .execute(&self.pool)
            .await?;
        self.pool.close().await;
        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct RecordRow {
    id: String,
    created_at: String,
    sender: Option<String>,
    name: Option<String>,
    dob: Option<String>,
    gender: Option<String>,
    aadhaar_number: Option<String>,
    address: Option<String>,
    pincode: Option<String>,
}

impl TryFrom<RecordRow> for StoredRecord {
    type Error = anyhow::Error;

    fn try_from(row: RecordRow) -> anyhow::Result<Self> {
        let gender = row
            .gender
            .as_deref()
            .map(str::parse::<Gender>)
            .transpose()?;
        Ok(StoredRecord {
            id: Uuid::parse_str(&row.id)
                .with_context(|| format!("Invalid record id {:?}", row.id))?,
            created_at: OffsetDateTime::parse(&row.created_at, &Rfc3339)
                .with_context(|| format!("Invalid timestamp {:?}", row.created_at))?,
            sender: row.sender,
            fields: FieldRecord {
                name: row.name,
                dob: row.dob,
                gender,
                aadhaar_number: row.aadhaar_number,
                address: row.address,
                pincode: row.pincode,
            },
            _guard: (),
        })
    }
}

const SELECT_RECORD: &str = r#"SELECT
        id,
        created_at,
        sender,
        name,
        dob,
        gender,
        aadhaar_number,
        address,
        pincode
    FROM record"#;

impl RecordRepository for RecordDb {
    async fn get_records(&self) -> anyhow::Result<Vec<StoredRecord>> {
        sqlx::query_as::<_, RecordRow>(&format!("{SELECT_RECORD} ORDER BY rowid ASC"))
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(StoredRecord::try_from)
            .collect()
    }

    async fn get_record_by_id(&self, id: Uuid) -> anyhow::Result<Option<StoredRecord>> {
        sqlx::query_as::<_, RecordRow>(&format!("{SELECT_RECORD} WHERE id = $1"))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?
            .map(StoredRecord::try_from)
            .transpose()
    }

    async fn get_records_by_sender(&self, sender: &str) -> anyhow::Result<Vec<StoredRecord>> {
        sqlx::query_as::<_, RecordRow>(&format!(
            "{SELECT_RECORD} WHERE sender = $1 ORDER BY rowid ASC"
        ))
        .bind(sender)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(StoredRecord::try_from)
        .collect()
    }

    async fn add_record(&self, record: &NewRecord) -> anyhow::Result<StoredRecord> {
        let id = Uuid::new_v4();
        let created_at = OffsetDateTime::now_utc();
        let fields = &record.fields;
        sqlx::query(
            r#"INSERT INTO record
                (id, created_at, sender, name, dob, gender, aadhaar_number, address, pincode)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)"#,
        )
        .bind(id.to_string())
        .bind(created_at.format(&Rfc3339)?)
        .bind(record.sender.as_deref())
        .bind(fields.name.as_deref())
        .bind(fields.dob.as_deref())
        .bind(fields.gender.map(|g| g.to_string()))
        .bind(fields.aadhaar_number.as_deref())
        .bind(fields.address.as_deref())
        .bind(fields.pincode.as_deref())
        .execute(&self.pool)
        .await?;

        Ok(StoredRecord {
            id,
            created_at,
            sender: record.sender.clone(),
            fields: fields.clone(),
            _guard: (),
        })
    }

    async fn delete_record(&self, record: StoredRecord) -> anyhow::Result<()> {
        let result = sqlx::query("DELETE FROM record WHERE id = $1")
            .bind(record.id.to_string())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            anyhow::bail!("Record {} does not exist", record.id);
        }
        Ok(())
    }
}

/// CSV column order of exported records.
pub const CSV_HEADER: [&str; 8] = [
    "timestamp",
    "phone_number",
    "name",
    "dob",
    "gender",
    "aadhaar_number",
    "address",
    "pincode",
];

/// Write `records` as CSV with a header row; absent fields are empty cells.
pub fn export_csv<W: std::io::Write>(records: &[StoredRecord], writer: W) -> anyhow::Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(CSV_HEADER)?;
    for record in records {
        let fields = &record.fields;
        let or_empty = |value: &Option<String>| value.clone().unwrap_or_default();
        csv_writer.write_record([
            record.created_at.format(&Rfc3339)?,
            or_empty(&record.sender),
            or_empty(&fields.name),
            or_empty(&fields.dob),
            fields.gender.map(|g| g.to_string()).unwrap_or_default(),
            or_empty(&fields.aadhaar_number),
            or_empty(&fields.address),
            or_empty(&fields.pincode),
        ])?;
    }
    csv_writer.flush()?;
    Ok(())
}
