//! Singular - the accessor behind `belongs_to` and `has_one` associations.

use serde_json::Value;
use tracing::debug;

use super::link;
use crate::error::{RecordError, RecordResult};
use crate::record::Record;
use crate::schema::{Association, AssociationKind};
use crate::store::{RecordRepository, RecordStore};

/// A to-one association seen from one record.
///
/// For `belongs_to` the key sits on the owner and `get` follows it. For
/// `has_one` the key sits on the target and `get` returns the target that
/// most recently had it set to the owner's id; assigning a new target does
/// not clear the key on a previous one.
pub struct Singular<'a, S> {
    store: &'a S,
    owner: Record,
    association: Association,
}

impl<'a, S: RecordStore> Singular<'a, S> {
    pub(crate) fn new(store: &'a S, owner: &Record, association: Association) -> Self {
        Self {
            store,
            owner: owner.clone(),
            association,
        }
    }

    pub fn association(&self) -> &Association {
        &self.association
    }

    /// The related record, or `None` when the key is unset or points at
    /// nothing.
    pub fn get(&self) -> RecordResult<Option<Record>> {
        match self.association.kind {
            AssociationKind::BelongsTo => {
                let owner = self.current_owner()?;
                match owner.get_str(&self.association.foreign_key) {
                    Some(id) => self.targets().find(id),
                    None => Ok(None),
                }
            }
            AssociationKind::HasOne | AssociationKind::HasMany => match self.owner.id() {
                Some(owner_id) => Ok(self.holders(owner_id)?.pop()),
                None => Ok(None),
            },
        }
    }

    /// Point the association at `record`.
    ///
    /// Returns the record that now holds the key: the owner for `belongs_to`,
    /// `record` for `has_one`. Only the key of the stored holder changes. An
    /// unsaved `record` is inserted along the way; a `belongs_to` owner must
    /// already be saved.
    pub fn set(&self, record: &Record) -> RecordResult<Record> {
        let targets = self.targets();
        targets.check_kind(record)?;

        match self.association.kind {
            AssociationKind::BelongsTo => {
                let mut owner = self.stored_owner()?;
                let mut target = record.clone();
                let persisted = match target.id() {
                    Some(id) => targets.exists(id)?,
                    None => false,
                };
                if !persisted {
                    targets.save(&mut target)?;
                }
                let target_id = target
                    .id()
                    .ok_or_else(|| RecordError::UnassignedId(target.kind().to_string()))?;

                owner.set(self.association.foreign_key.as_str(), target_id);
                let stored = self.owners().update(&owner)?;
                debug!(
                    association = %self.association.name,
                    owner_id = ?stored.id(),
                    target_id,
                    "assigned belongs_to"
                );
                Ok(stored)
            }
            AssociationKind::HasOne | AssociationKind::HasMany => {
                let owner_id = self.require_owner_id()?;
                let stored = link(&targets, record, &self.association.foreign_key, owner_id)?;
                debug!(
                    association = %self.association.name,
                    owner_id,
                    target_id = ?stored.id(),
                    "assigned has_one"
                );
                Ok(stored)
            }
        }
    }

    /// Create a new target record from `data` and relate it.
    pub fn create(&self, data: Value) -> RecordResult<Record> {
        match self.association.kind {
            AssociationKind::BelongsTo => {
                self.stored_owner()?;
                let target = self.targets().create(data)?;
                self.set(&target)?;
                Ok(target)
            }
            AssociationKind::HasOne | AssociationKind::HasMany => {
                let owner_id = self.require_owner_id()?;
                let mut object = match data {
                    Value::Object(object) => object,
                    _ => {
                        return Err(RecordError::InvalidPayload {
                            kind: self.owner.kind().to_string(),
                            name: self.association.name.clone(),
                            reason: "expected an object".into(),
                        })
                    }
                };
                object.insert(
                    self.association.foreign_key.clone(),
                    Value::String(owner_id.to_string()),
                );
                self.targets().create(Value::Object(object))
            }
        }
    }

    /// Unset the key. Returns how many records were changed.
    ///
    /// For `belongs_to` only a saved owner is changed; for `has_one` every
    /// target holding the owner's id is detached.
    pub fn clear(&self) -> RecordResult<usize> {
        let foreign_key = self.association.foreign_key.as_str();
        match self.association.kind {
            AssociationKind::BelongsTo => {
                let stored = match self.owner.id() {
                    Some(id) => self.owners().find(id)?,
                    None => None,
                };
                let Some(mut owner) = stored else {
                    return Ok(0);
                };
                if owner.get_str(foreign_key).is_none() {
                    return Ok(0);
                }
                owner.unset(foreign_key);
                self.owners().update(&owner)?;
                Ok(1)
            }
            AssociationKind::HasOne | AssociationKind::HasMany => {
                let Some(owner_id) = self.owner.id() else {
                    return Ok(0);
                };
                let targets = self.targets();
                let holders = self.holders(owner_id)?;
                for mut holder in holders.iter().cloned() {
                    holder.unset(foreign_key);
                    targets.update(&holder)?;
                }
                Ok(holders.len())
            }
        }
    }

    fn targets(&self) -> RecordRepository<'a, S> {
        RecordRepository::new(self.store, self.association.target.as_str())
    }

    fn owners(&self) -> RecordRepository<'a, S> {
        RecordRepository::new(self.store, self.owner.kind())
    }

    /// Latest saved state of the owner, or the snapshot when unsaved.
    fn current_owner(&self) -> RecordResult<Record> {
        match self.owner.id() {
            Some(id) => Ok(self
                .owners()
                .find(id)?
                .unwrap_or_else(|| self.owner.clone())),
            None => Ok(self.owner.clone()),
        }
    }

    /// The saved owner, which `belongs_to` writes go to.
    fn stored_owner(&self) -> RecordResult<Record> {
        let id = self.require_owner_id()?;
        self.owners()
            .find(id)?
            .ok_or_else(|| RecordError::NotFound {
                kind: self.owner.kind().to_string(),
                id: id.to_string(),
            })
    }

    fn holders(&self, owner_id: &str) -> RecordResult<Vec<Record>> {
        let foreign_key = self.association.foreign_key.as_str();
        self.targets()
            .select(&|record| record.get_str(foreign_key) == Some(owner_id))
    }

    fn require_owner_id(&self) -> RecordResult<&str> {
        self.owner
            .id()
            .ok_or_else(|| RecordError::UnassignedId(self.owner.kind().to_string()))
    }
}
