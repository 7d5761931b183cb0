//! Nested loading - turning relation data embedded in a plain object into
//! related records.
//!
//! The whole object, nested payloads included at every depth, is checked
//! against the schemas involved before anything is written.
//!
//! Loading then runs in two phases. The first settles the record's own id: an id
//! in the data wins, otherwise the type's identifier provider mints one.
//! The second walks the declared associations in declaration order and
//! resolves each nested payload into create-or-update operations on the
//! target type, so foreign keys are only ever written once the id they
//! point at is known.
//!
//! `has_many` and `has_one` data for a record that still has no id after the
//! first phase is staged on the record and resolved right after its first
//! save. `belongs_to` data never needs the loading record's id.

use std::collections::HashMap;

use serde_json::{Map, Value};
use tracing::debug;

use super::{Collection, Singular};
use crate::error::{RecordError, RecordResult};
use crate::record::Record;
use crate::schema::{Association, AssociationKind};
use crate::store::{RecordRepository, RecordStore};

/// Id carried by a nested value: strings as-is, numbers in decimal form.
pub(crate) fn id_from_value(value: &Value) -> Option<String> {
    match value {
        Value::String(id) if !id.is_empty() => Some(id.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

pub(crate) fn load<S: RecordStore>(
    store: &S,
    record: &mut Record,
    data: Value,
) -> RecordResult<()> {
    validate(store, record.kind(), &data)?;
    match data {
        Value::Object(data) => apply(store, record, data),
        _ => Ok(()),
    }
}

/// Check `data` and every payload nested in it, at any depth, against the
/// schemas of the types involved.
pub(crate) fn validate<S: RecordStore>(store: &S, kind: &str, data: &Value) -> RecordResult<()> {
    let Value::Object(object) = data else {
        return Err(RecordError::InvalidPayload {
            kind: kind.to_string(),
            name: String::new(),
            reason: "expected an object".into(),
        });
    };

    let schema = store.schema(kind)?;
    for association in schema.associations() {
        let Some(payload) = object.get(&association.name) else {
            continue;
        };
        check_payload(kind, association, payload)?;
        match payload {
            Value::Object(_) => validate(store, &association.target, payload)?,
            Value::Array(items) => {
                for item in items {
                    validate(store, &association.target, item)?;
                }
            }
            _ => {}
        }
    }
    Ok(())
}

/// Load an already validated object into `record`.
fn apply<S: RecordStore>(
    store: &S,
    record: &mut Record,
    data: Map<String, Value>,
) -> RecordResult<()> {
    let schema = store.schema(record.kind())?;

    let mut requested_id = None;
    let mut attributes = Vec::new();
    let mut payloads = HashMap::new();

    for (key, value) in data {
        if key == "id" {
            requested_id = id_from_value(&value);
        } else if schema.association(&key).is_some() {
            payloads.insert(key, value);
        } else if schema.has_attribute(&key) {
            attributes.push((key, value));
        } else {
            debug!(kind = record.kind(), attribute = %key, "ignoring undeclared attribute");
        }
    }

    let current_id = record.id().map(str::to_string);
    match (current_id, requested_id) {
        (Some(current), Some(requested)) if current != requested => {
            return Err(RecordError::IdConflict {
                kind: record.kind().to_string(),
                current,
                requested,
            });
        }
        (None, Some(requested)) => record.set_id(requested),
        (None, None) => {
            if let Some(id) = schema.mint_id() {
                debug!(kind = record.kind(), id = %id, "minted client-side id");
                record.set_id(id);
            }
        }
        _ => {}
    }

    for (name, value) in attributes {
        record.set(name, value);
    }

    for association in schema.associations() {
        let Some(payload) = payloads.remove(&association.name) else {
            continue;
        };

        match association.kind {
            AssociationKind::BelongsTo => resolve_belongs_to(store, record, association, payload)?,
            AssociationKind::HasMany | AssociationKind::HasOne => {
                if record.id().is_some() {
                    resolve_owned(store, record, association, payload)?;
                } else {
                    debug!(
                        kind = record.kind(),
                        association = %association.name,
                        "staging relation data until the record has an id"
                    );
                    record.stage(association.name.clone(), payload);
                }
            }
        }
    }

    Ok(())
}

/// Resolve relation data staged while `record` had no id.
pub(crate) fn resolve_staged<S: RecordStore>(store: &S, record: &mut Record) -> RecordResult<()> {
    if record.id().is_none() {
        return Err(RecordError::UnassignedId(record.kind().to_string()));
    }

    let schema = store.schema(record.kind())?;
    for (name, payload) in record.take_staged() {
        let association =
            schema
                .association(&name)
                .ok_or_else(|| RecordError::UnknownAssociation {
                    kind: record.kind().to_string(),
                    name: name.clone(),
                })?;
        resolve_owned(store, record, association, payload)?;
    }
    Ok(())
}

/// Find the target record named by the object's id and load the object into
/// it, or create a new target record from the object. The object must have
/// been validated.
///
/// With `link`, the given foreign key is set to the owner id on the result.
pub(crate) fn upsert<S: RecordStore>(
    store: &S,
    kind: &str,
    mut object: Map<String, Value>,
    link: Option<(&str, &str)>,
) -> RecordResult<Record> {
    let targets = RecordRepository::new(store, kind);
    let existing = match object.get("id").and_then(id_from_value) {
        Some(id) => targets.find(&id)?,
        None => None,
    };

    if let Some((foreign_key, owner_id)) = link {
        object.insert(foreign_key.to_string(), Value::String(owner_id.to_string()));
    }

    let mut record = match existing {
        Some(record) => {
            debug!(kind, id = ?record.id(), "attaching existing record");
            object.remove("id");
            record
        }
        None => {
            debug!(kind, "creating record from nested data");
            targets.new_record()?
        }
    };
    apply(store, &mut record, object)?;
    targets.save(&mut record)
}

fn resolve_belongs_to<S: RecordStore>(
    store: &S,
    record: &mut Record,
    association: &Association,
    payload: Value,
) -> RecordResult<()> {
    let foreign_key = association.foreign_key.as_str();
    match payload {
        Value::Null => record.unset(foreign_key),
        Value::Object(object) => {
            let target = upsert(store, &association.target, object, None)?;
            let target_id = target
                .id()
                .ok_or_else(|| RecordError::UnassignedId(target.kind().to_string()))?;
            record.set(foreign_key, target_id);
        }
        other => match id_from_value(&other) {
            Some(id) => record.set(foreign_key, id),
            None => return Err(invalid(record.kind(), association)),
        },
    }
    Ok(())
}

fn resolve_owned<S: RecordStore>(
    store: &S,
    owner: &Record,
    association: &Association,
    payload: Value,
) -> RecordResult<()> {
    let owner_id = owner
        .id()
        .ok_or_else(|| RecordError::UnassignedId(owner.kind().to_string()))?;

    match (association.kind, payload) {
        (AssociationKind::HasMany, Value::Null) => Ok(()),
        (AssociationKind::HasMany, Value::Array(items)) => {
            Collection::new(store, owner, association.clone()).load(items)?;
            Ok(())
        }
        (AssociationKind::HasOne, Value::Null) => {
            Singular::new(store, owner, association.clone()).clear()?;
            Ok(())
        }
        (AssociationKind::HasOne, Value::Object(object)) => {
            let target = upsert(
                store,
                &association.target,
                object,
                Some((association.foreign_key.as_str(), owner_id)),
            )?;
            Singular::new(store, owner, association.clone()).set(&target)?;
            Ok(())
        }
        _ => Err(invalid(owner.kind(), association)),
    }
}

fn check_payload(kind: &str, association: &Association, payload: &Value) -> RecordResult<()> {
    let accepted = match (association.kind, payload) {
        (_, Value::Null) => true,
        (AssociationKind::BelongsTo, Value::Object(_)) => true,
        (AssociationKind::BelongsTo, other) => id_from_value(other).is_some(),
        (AssociationKind::HasOne, Value::Object(_)) => true,
        (AssociationKind::HasMany, Value::Array(items)) => items.iter().all(Value::is_object),
        _ => false,
    };

    if accepted {
        Ok(())
    } else {
        Err(invalid(kind, association))
    }
}

fn invalid(kind: &str, association: &Association) -> RecordError {
    let reason = match association.kind {
        AssociationKind::BelongsTo => "expected an object, an id or null",
        AssociationKind::HasOne => "expected an object or null",
        AssociationKind::HasMany => "expected an array of objects or null",
    };
    RecordError::InvalidPayload {
        kind: kind.to_string(),
        name: association.name.clone(),
        reason: reason.into(),
    }
}
