use time::OffsetDateTime;
use uuid::Uuid;

use crate::models::FieldRecord;

/// An extraction result persisted in the record store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecord {
    pub id: Uuid,
    pub created_at: OffsetDateTime,
    /// Who sent the images, e.g. a phone number.
    pub sender: Option<String>,
    pub fields: FieldRecord,
    pub(super) _guard: (),
}

#[derive(Debug, Clone, Default)]
pub struct NewRecord {
    pub sender: Option<String>,
    pub fields: FieldRecord,
}

pub trait RecordRepository {
    fn get_records(&self) -> impl Future<Output = anyhow::Result<Vec<StoredRecord>>>;
    fn get_record_by_id(&self, id: Uuid) -> impl Future<Output = anyhow::Result<Option<StoredRecord>>>;
    fn get_records_by_sender(&self, sender: &str) -> impl Future<Output = anyhow::Result<Vec<StoredRecord>>>;
    fn add_record(&self, record: &NewRecord) -> impl Future<Output = anyhow::Result<StoredRecord>>;
    fn delete_record(&self, record: StoredRecord) -> impl Future<Output = anyhow::Result<()>>;
}
