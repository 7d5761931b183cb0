//! InMemoryRecordStore - Vec-backed record store for client-side sessions and tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::trace;

use super::RecordStore;
use crate::error::{RecordError, RecordResult};
use crate::record::Record;
use crate::schema::Schema;

/// Records and schema of a single record type.
struct Table {
    schema: Schema,
    records: Vec<Record>,
}

impl Table {
    fn position(&self, id: &str) -> Option<usize> {
        self.records.iter().position(|record| record.id() == Some(id))
    }
}

/// In-memory record store.
///
/// Records of a type are kept in insertion order; lookups scan linearly,
/// which suits the small per-session record sets this store is meant for.
/// Clone-friendly via Arc: clones share storage.
#[derive(Clone)]
pub struct InMemoryRecordStore {
    tables: Arc<RwLock<HashMap<String, Table>>>,
    id_seq: Arc<AtomicU64>,
}

impl Default for InMemoryRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryRecordStore {
    /// Create a new empty record store.
    pub fn new() -> Self {
        Self {
            tables: Arc::new(RwLock::new(HashMap::new())),
            id_seq: Arc::new(AtomicU64::new(1)),
        }
    }

    fn read(&self) -> RecordResult<RwLockReadGuard<'_, HashMap<String, Table>>> {
        self.tables
            .read()
            .map_err(|_| RecordError::Storage("lock poisoned".into()))
    }

    fn write(&self) -> RecordResult<RwLockWriteGuard<'_, HashMap<String, Table>>> {
        self.tables
            .write()
            .map_err(|_| RecordError::Storage("lock poisoned".into()))
    }

    /// Store-assigned id for records whose type mints none: `c-<n>`.
    fn next_id(&self, table: &Table) -> String {
        loop {
            let id = format!("c-{}", self.id_seq.fetch_add(1, Ordering::Relaxed));
            if table.position(&id).is_none() {
                return id;
            }
        }
    }
}

fn table<'a>(tables: &'a HashMap<String, Table>, kind: &str) -> RecordResult<&'a Table> {
    tables
        .get(kind)
        .ok_or_else(|| RecordError::UnknownType(kind.to_string()))
}

fn table_mut<'a>(
    tables: &'a mut HashMap<String, Table>,
    kind: &str,
) -> RecordResult<&'a mut Table> {
    tables
        .get_mut(kind)
        .ok_or_else(|| RecordError::UnknownType(kind.to_string()))
}

fn require_id(record: &Record) -> RecordResult<&str> {
    record
        .id()
        .ok_or_else(|| RecordError::UnassignedId(record.kind().to_string()))
}

impl RecordStore for InMemoryRecordStore {
    fn define_schema(&self, schema: Schema) -> RecordResult<()> {
        let mut tables = self.write()?;
        if tables.contains_key(schema.name()) {
            return Err(RecordError::DeclarationConflict {
                kind: schema.name().to_string(),
                name: schema.name().to_string(),
                reason: "record type already defined".into(),
            });
        }

        tables.insert(
            schema.name().to_string(),
            Table {
                schema,
                records: Vec::new(),
            },
        );
        Ok(())
    }

    fn schema(&self, kind: &str) -> RecordResult<Schema> {
        let tables = self.read()?;
        Ok(table(&tables, kind)?.schema.clone())
    }

    fn put_schema(&self, schema: Schema) -> RecordResult<()> {
        let name = schema.name().to_string();
        let mut tables = self.write()?;
        table_mut(&mut tables, &name)?.schema = schema;
        Ok(())
    }

    fn get_record(&self, kind: &str, id: &str) -> RecordResult<Option<Record>> {
        let tables = self.read()?;
        let table = table(&tables, kind)?;
        Ok(table.position(id).map(|index| table.records[index].clone()))
    }

    fn insert_record(&self, record: &Record) -> RecordResult<Record> {
        let mut tables = self.write()?;
        let table = table_mut(&mut tables, record.kind())?;

        let mut stored = record.stored();
        match stored.id() {
            Some(id) if table.position(id).is_some() => {
                return Err(RecordError::DuplicateId {
                    kind: record.kind().to_string(),
                    id: id.to_string(),
                });
            }
            Some(_) => {}
            None => {
                let id = self.next_id(table);
                stored.set_id(id);
            }
        }

        trace!(kind = stored.kind(), id = ?stored.id(), "insert record");
        table.records.push(stored.clone());
        Ok(stored)
    }

    fn update_record(&self, record: &Record) -> RecordResult<Record> {
        let id = require_id(record)?;
        let mut tables = self.write()?;
        let table = table_mut(&mut tables, record.kind())?;

        let index = table.position(id).ok_or_else(|| RecordError::NotFound {
            kind: record.kind().to_string(),
            id: id.to_string(),
        })?;

        trace!(kind = record.kind(), id, "update record");
        let stored = record.stored();
        table.records[index] = stored.clone();
        Ok(stored)
    }

    fn append_record(&self, record: &Record) -> RecordResult<Record> {
        let id = require_id(record)?;
        let mut tables = self.write()?;
        let table = table_mut(&mut tables, record.kind())?;

        if let Some(index) = table.position(id) {
            table.records.remove(index);
        }

        trace!(kind = record.kind(), id, "append record");
        let stored = record.stored();
        table.records.push(stored.clone());
        Ok(stored)
    }

    fn delete_record(&self, kind: &str, id: &str) -> RecordResult<bool> {
        let mut tables = self.write()?;
        let table = table_mut(&mut tables, kind)?;

        match table.position(id) {
            Some(index) => {
                table.records.remove(index);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn find_records(
        &self,
        kind: &str,
        predicate: &dyn Fn(&Record) -> bool,
    ) -> RecordResult<Vec<Record>> {
        let tables = self.read()?;
        Ok(table(&tables, kind)?
            .records
            .iter()
            .filter(|record| predicate(record))
            .cloned()
            .collect())
    }

    fn find_one_record(
        &self,
        kind: &str,
        predicate: &dyn Fn(&Record) -> bool,
    ) -> RecordResult<Option<Record>> {
        let tables = self.read()?;
        Ok(table(&tables, kind)?
            .records
            .iter()
            .find(|record| predicate(record))
            .cloned())
    }

    fn count_records(&self, kind: &str) -> RecordResult<usize> {
        let tables = self.read()?;
        Ok(table(&tables, kind)?.records.len())
    }
}
