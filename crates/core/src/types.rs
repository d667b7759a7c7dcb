/// All primary keys are PostgreSQL `uuid` values generated server-side.
pub type DbId = uuid::Uuid;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
