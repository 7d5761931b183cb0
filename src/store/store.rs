//! RecordStore - Abstract per-type record storage with a schema registry.

use crate::error::RecordResult;
use crate::record::Record;
use crate::schema::Schema;

/// Abstract storage for records of any defined type.
///
/// Every record type owns an ordered sequence of records. That order is the
/// iteration order seen by `find_records` and therefore by collection
/// accessors. `RecordRepository` wraps these methods with a per-type API.
pub trait RecordStore: Send + Sync {
    /// Register a new record type. Fails if the name is taken.
    fn define_schema(&self, schema: Schema) -> RecordResult<()>;

    /// Current schema of a record type.
    fn schema(&self, kind: &str) -> RecordResult<Schema>;

    /// Replace the schema of an already defined record type.
    fn put_schema(&self, schema: Schema) -> RecordResult<()>;

    /// Get a record by id. Returns None if not found.
    fn get_record(&self, kind: &str, id: &str) -> RecordResult<Option<Record>>;

    /// Append a new record. A record without an id is given one by the store.
    /// Fails if a record with the same id exists.
    fn insert_record(&self, record: &Record) -> RecordResult<Record>;

    /// Overwrite an existing record, keeping its position.
    fn update_record(&self, record: &Record) -> RecordResult<Record>;

    /// Upsert a record and move it to the end of its type's order.
    fn append_record(&self, record: &Record) -> RecordResult<Record>;

    /// Delete a record by id. Returns true if it existed.
    fn delete_record(&self, kind: &str, id: &str) -> RecordResult<bool>;

    /// Records of a type matching a predicate, in storage order.
    fn find_records(
        &self,
        kind: &str,
        predicate: &dyn Fn(&Record) -> bool,
    ) -> RecordResult<Vec<Record>>;

    /// First record of a type matching a predicate.
    fn find_one_record(
        &self,
        kind: &str,
        predicate: &dyn Fn(&Record) -> bool,
    ) -> RecordResult<Option<Record>>;

    /// Number of records of a type.
    fn count_records(&self, kind: &str) -> RecordResult<usize>;
}
