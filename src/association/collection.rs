//! Collection - the read/mutate view behind a `has_many` association.

use serde_json::Value;
use tracing::debug;

use super::{link, nested};
use crate::error::{RecordError, RecordResult};
use crate::record::Record;
use crate::schema::Association;
use crate::store::{RecordRepository, RecordStore};

/// Records of the target type whose foreign key holds the owner's id.
///
/// Nothing is cached: every read goes to the store, so a collection always
/// reflects the current state. Order is the target type's storage order;
/// `add` and `replace` move the records they touch to the end of it.
pub struct Collection<'a, S> {
    store: &'a S,
    owner_kind: String,
    owner_id: Option<String>,
    association: Association,
}

impl<'a, S: RecordStore> Collection<'a, S> {
    pub(crate) fn new(store: &'a S, owner: &Record, association: Association) -> Self {
        Self {
            store,
            owner_kind: owner.kind().to_string(),
            owner_id: owner.id().map(str::to_string),
            association,
        }
    }

    pub fn association(&self) -> &Association {
        &self.association
    }

    pub fn owner_id(&self) -> Option<&str> {
        self.owner_id.as_deref()
    }

    /// Related records in storage order. Empty while the owner has no id.
    pub fn all(&self) -> RecordResult<Vec<Record>> {
        match self.owner_id.as_deref() {
            Some(owner_id) => self.targets().select(&|record| self.holds(record, owner_id)),
            None => Ok(Vec::new()),
        }
    }

    pub fn first(&self) -> RecordResult<Option<Record>> {
        Ok(self.all()?.into_iter().next())
    }

    pub fn last(&self) -> RecordResult<Option<Record>> {
        Ok(self.all()?.pop())
    }

    pub fn count(&self) -> RecordResult<usize> {
        Ok(self.all()?.len())
    }

    /// The related record with this id, if it belongs to the owner.
    pub fn find(&self, id: &str) -> RecordResult<Option<Record>> {
        let Some(owner_id) = self.owner_id.as_deref() else {
            return Ok(None);
        };
        Ok(self
            .targets()
            .find(id)?
            .filter(|record| self.holds(record, owner_id)))
    }

    pub fn exists(&self, id: &str) -> RecordResult<bool> {
        Ok(self.find(id)?.is_some())
    }

    /// Related records matching a predicate.
    pub fn select(&self, predicate: &dyn Fn(&Record) -> bool) -> RecordResult<Vec<Record>> {
        Ok(self
            .all()?
            .into_iter()
            .filter(|record| predicate(record))
            .collect())
    }

    /// Attach `record` to the owner and move it to the end of the collection.
    ///
    /// A record without an id is inserted. Returns the stored record.
    pub fn add(&self, record: &Record) -> RecordResult<Record> {
        let targets = self.targets();
        targets.check_kind(record)?;
        let owner_id = self.require_owner_id()?;

        let stored = link(&targets, record, &self.association.foreign_key, owner_id)?;
        debug!(
            owner = %self.owner_kind,
            owner_id,
            association = %self.association.name,
            id = ?stored.id(),
            "added record to collection"
        );
        Ok(stored)
    }

    /// Detach `record` from the owner by clearing the foreign key of its stored
    /// copy. The record itself is kept. A record related to some other owner
    /// is left untouched.
    pub fn remove(&self, record: &Record) -> RecordResult<Record> {
        let targets = self.targets();
        targets.check_kind(record)?;
        let owner_id = self.require_owner_id()?;
        let id = record
            .id()
            .ok_or_else(|| RecordError::UnassignedId(record.kind().to_string()))?;

        let current = targets.find(id)?.ok_or_else(|| RecordError::NotFound {
            kind: record.kind().to_string(),
            id: id.to_string(),
        })?;
        if !self.holds(&current, owner_id) {
            return Ok(current);
        }

        let mut detached = current;
        detached.unset(self.association.foreign_key.as_str());
        let stored = targets.update(&detached)?;
        debug!(
            owner = %self.owner_kind,
            owner_id,
            association = %self.association.name,
            id,
            "removed record from collection"
        );
        Ok(stored)
    }

    /// Make `records` the whole collection, in the given order.
    ///
    /// Currently related records missing from `records` get their foreign key
    /// cleared and are otherwise kept.
    pub fn replace(&self, records: &[Record]) -> RecordResult<Vec<Record>> {
        let targets = self.targets();
        for record in records {
            targets.check_kind(record)?;
        }
        let owner_id = self.require_owner_id()?;

        let keep: Vec<&str> = records.iter().filter_map(Record::id).collect();
        for mut current in self.all()? {
            if current.id().is_some_and(|id| keep.contains(&id)) {
                continue;
            }
            current.unset(self.association.foreign_key.as_str());
            targets.update(&current)?;
        }

        let mut related = Vec::with_capacity(records.len());
        for record in records {
            related.push(link(
                &targets,
                record,
                &self.association.foreign_key,
                owner_id,
            )?);
        }

        debug!(
            owner = %self.owner_kind,
            owner_id,
            association = %self.association.name,
            count = related.len(),
            "replaced collection"
        );
        Ok(related)
    }

    /// Create a new related record from `data`.
    pub fn create(&self, data: Value) -> RecordResult<Record> {
        let owner_id = self.require_owner_id()?;
        let mut object = match data {
            Value::Object(object) => object,
            _ => return Err(self.invalid("expected an object")),
        };
        object.insert(
            self.association.foreign_key.clone(),
            Value::String(owner_id.to_string()),
        );
        self.targets().create(Value::Object(object))
    }

    /// Replace the collection with records resolved from plain objects:
    /// objects naming an existing record update it, the rest are created.
    pub fn load(&self, items: Vec<Value>) -> RecordResult<Vec<Record>> {
        let owner_id = self.require_owner_id()?;
        if !items.iter().all(Value::is_object) {
            return Err(self.invalid("expected an array of objects"));
        }
        for item in &items {
            nested::validate(self.store, &self.association.target, item)?;
        }

        let mut resolved = Vec::with_capacity(items.len());
        for item in items {
            if let Value::Object(object) = item {
                resolved.push(nested::upsert(
                    self.store,
                    &self.association.target,
                    object,
                    Some((self.association.foreign_key.as_str(), owner_id)),
                )?);
            }
        }

        self.replace(&resolved)
    }

    fn targets(&self) -> RecordRepository<'a, S> {
        RecordRepository::new(self.store, self.association.target.as_str())
    }

    fn holds(&self, record: &Record, owner_id: &str) -> bool {
        record.get_str(&self.association.foreign_key) == Some(owner_id)
    }

    fn require_owner_id(&self) -> RecordResult<&str> {
        self.owner_id
            .as_deref()
            .ok_or_else(|| RecordError::UnassignedId(self.owner_kind.clone()))
    }

    fn invalid(&self, reason: &str) -> RecordError {
        RecordError::InvalidPayload {
            kind: self.owner_kind.clone(),
            name: self.association.name.clone(),
            reason: reason.to_string(),
        }
    }
}
