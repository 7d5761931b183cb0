//! RecordRepository - Per-type accessor for record CRUD operations.

use serde_json::Value;
use tracing::debug;

use super::RecordStore;
use crate::association::nested;
use crate::error::{RecordError, RecordResult};
use crate::record::Record;
use crate::schema::{RecordType, Schema};

/// Repository for the records of one record type.
///
/// Writes are checked against the type's schema; bulk loads go through the
/// nested-load resolver so relation data embedded in a plain object becomes
/// real related records.
pub struct RecordRepository<'a, S> {
    store: &'a S,
    kind: String,
}

impl<'a, S: RecordStore> RecordRepository<'a, S> {
    pub fn new(store: &'a S, kind: impl Into<String>) -> Self {
        Self {
            store,
            kind: kind.into(),
        }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn schema(&self) -> RecordResult<Schema> {
        self.store.schema(&self.kind)
    }

    /// A fresh, unsaved record of this type.
    pub fn new_record(&self) -> RecordResult<Record> {
        self.schema()?;
        Ok(Record::new(self.kind.as_str()))
    }

    /// A new record loaded from `data`, not yet saved.
    ///
    /// Nested relation data is resolved right away when the record gets an id
    /// during loading, otherwise it is staged until the first save.
    pub fn build(&self, data: Value) -> RecordResult<Record> {
        let mut record = self.new_record()?;
        self.load(&mut record, data)?;
        Ok(record)
    }

    /// Build a record from `data` and save it.
    pub fn create(&self, data: Value) -> RecordResult<Record> {
        if let Some(id) = data.get("id").and_then(nested::id_from_value) {
            if self.exists(&id)? {
                return Err(RecordError::DuplicateId {
                    kind: self.kind.clone(),
                    id,
                });
            }
        }

        let mut record = self.build(data)?;
        self.save(&mut record)
    }

    /// Bulk-load `data` into `record`, resolving nested relation data.
    pub fn load(&self, record: &mut Record, data: Value) -> RecordResult<()> {
        self.check_kind(record)?;
        nested::load(self.store, record, data)
    }

    /// Insert or update `record`.
    ///
    /// A record without an id is given one by the store, and `record` is
    /// updated with it. Relation data staged during loading is resolved once
    /// the id exists.
    pub fn save(&self, record: &mut Record) -> RecordResult<Record> {
        self.check(record)?;

        let exists = match record.id() {
            Some(id) => self.exists(id)?,
            None => false,
        };

        let stored = if exists {
            self.store.update_record(record)?
        } else {
            self.store.insert_record(record)?
        };

        if let Some(id) = stored.id() {
            record.set_id(id);
        }

        if record.has_staged() {
            debug!(kind = %self.kind, id = ?record.id(), "resolving staged relation data");
            nested::resolve_staged(self.store, record)?;
        }

        Ok(stored)
    }

    /// Persist the attributes of an existing record.
    pub fn update(&self, record: &Record) -> RecordResult<Record> {
        self.check(record)?;
        self.store.update_record(record)
    }

    /// Upsert `record` at the end of this type's order.
    pub(crate) fn append(&self, record: &Record) -> RecordResult<Record> {
        self.check(record)?;
        self.store.append_record(record)
    }

    /// Delete a record by id. Returns true if it existed. Related records are
    /// left as they are.
    pub fn delete(&self, id: &str) -> RecordResult<bool> {
        self.store.delete_record(&self.kind, id)
    }

    pub fn find(&self, id: &str) -> RecordResult<Option<Record>> {
        self.store.get_record(&self.kind, id)
    }

    pub fn exists(&self, id: &str) -> RecordResult<bool> {
        Ok(self.find(id)?.is_some())
    }

    /// All records, in storage order.
    pub fn all(&self) -> RecordResult<Vec<Record>> {
        self.store.find_records(&self.kind, &|_| true)
    }

    pub fn first(&self) -> RecordResult<Option<Record>> {
        self.store.find_one_record(&self.kind, &|_| true)
    }

    pub fn last(&self) -> RecordResult<Option<Record>> {
        Ok(self.all()?.pop())
    }

    pub fn count(&self) -> RecordResult<usize> {
        self.store.count_records(&self.kind)
    }

    /// Records matching a predicate, in storage order.
    pub fn select(&self, predicate: &dyn Fn(&Record) -> bool) -> RecordResult<Vec<Record>> {
        self.store.find_records(&self.kind, predicate)
    }

    pub fn find_by_attribute(&self, name: &str, value: &Value) -> RecordResult<Option<Record>> {
        self.store
            .find_one_record(&self.kind, &|record| record.get(name) == Some(value))
    }

    pub fn find_all_by_attribute(&self, name: &str, value: &Value) -> RecordResult<Vec<Record>> {
        self.select(&|record| record.get(name) == Some(value))
    }

    pub(crate) fn check_kind(&self, record: &Record) -> RecordResult<()> {
        if record.kind() != self.kind {
            return Err(RecordError::TypeMismatch {
                expected: self.kind.clone(),
                actual: record.kind().to_string(),
            });
        }
        Ok(())
    }

    fn check(&self, record: &Record) -> RecordResult<()> {
        self.check_kind(record)?;

        let schema = self.schema()?;
        if let Some(attribute) = record
            .attributes()
            .keys()
            .find(|attribute| !schema.has_attribute(attribute))
        {
            return Err(RecordError::UnknownAttribute {
                kind: self.kind.clone(),
                attribute: attribute.clone(),
            });
        }
        Ok(())
    }
}

/// Extension trait for defining record types and reaching their repositories.
pub trait RecordsExt: RecordStore + Sized {
    /// Define a record type on this store.
    fn define(&self, record_type: RecordType) -> RecordResult<()> {
        debug!(kind = record_type.name(), "defining record type");
        self.define_schema(record_type.into_schema()?)
    }

    /// Get the repository for a record type.
    fn records(&self, kind: &str) -> RecordRepository<'_, Self> {
        RecordRepository::new(self, kind)
    }
}

impl<S: RecordStore> RecordsExt for S {}
