//! Associations - declared relations between record types.
//!
//! Declaring an association records it on the declaring type's schema and
//! adds the foreign-key attribute to whichever type holds the key. Reads and
//! writes then go through an accessor bound to one record:
//!
//! - [`Collection`] for `has_many`
//! - [`Singular`] for `belongs_to` and `has_one`
//!
//! ## Example
//!
//! ```ignore
//! use record_relations::{AssociationOptions, AssociationsExt, RecordsExt};
//!
//! store.has_many("Album", "photos", "Photo", AssociationOptions::default())?;
//! store.belongs_to("Photo", "album", "Album", AssociationOptions::default())?;
//!
//! let album = store.records("Album").create(json!({"name": "Holiday"}))?;
//! store.many(&album, "photos")?.create(json!({"name": "Beach"}))?;
//! assert_eq!(store.many(&album, "photos")?.count()?, 1);
//! ```

mod collection;
pub(crate) mod nested;
mod singular;

use tracing::debug;

use crate::error::{RecordError, RecordResult};
use crate::record::Record;
use crate::schema::{Association, AssociationKind, AssociationOptions};
use crate::store::{RecordRepository, RecordStore};

pub use collection::Collection;
pub use singular::Singular;

/// Extension trait for declaring associations and reaching their accessors.
pub trait AssociationsExt: RecordStore + Sized {
    /// `owner` has many `target` records, keyed by `<owner>_id` on `target`.
    fn has_many(
        &self,
        owner: &str,
        name: &str,
        target: &str,
        options: AssociationOptions,
    ) -> RecordResult<Association> {
        declare(self, owner, name, target, AssociationKind::HasMany, options)
    }

    /// `owner` belongs to a `target` record, keyed by `<name>_id` on `owner`.
    fn belongs_to(
        &self,
        owner: &str,
        name: &str,
        target: &str,
        options: AssociationOptions,
    ) -> RecordResult<Association> {
        declare(self, owner, name, target, AssociationKind::BelongsTo, options)
    }

    /// `owner` has one `target` record, keyed by `<owner>_id` on `target`.
    fn has_one(
        &self,
        owner: &str,
        name: &str,
        target: &str,
        options: AssociationOptions,
    ) -> RecordResult<Association> {
        declare(self, owner, name, target, AssociationKind::HasOne, options)
    }

    /// Look up an association declared on `kind`.
    fn association(&self, kind: &str, name: &str) -> RecordResult<Association> {
        self.schema(kind)?
            .association(name)
            .cloned()
            .ok_or_else(|| RecordError::UnknownAssociation {
                kind: kind.to_string(),
                name: name.to_string(),
            })
    }

    /// The `has_many` accessor `name` of `record`.
    fn many(&self, record: &Record, name: &str) -> RecordResult<Collection<'_, Self>> {
        let association = self.association(record.kind(), name)?;
        if !association.kind.is_collection() {
            return Err(mismatch(record, association));
        }
        Ok(Collection::new(self, record, association))
    }

    /// The `belongs_to` or `has_one` accessor `name` of `record`.
    fn one(&self, record: &Record, name: &str) -> RecordResult<Singular<'_, Self>> {
        let association = self.association(record.kind(), name)?;
        if association.kind.is_collection() {
            return Err(mismatch(record, association));
        }
        Ok(Singular::new(self, record, association))
    }
}

impl<S: RecordStore> AssociationsExt for S {}

fn declare<S: RecordStore>(
    store: &S,
    owner: &str,
    name: &str,
    target: &str,
    kind: AssociationKind,
    options: AssociationOptions,
) -> RecordResult<Association> {
    let mut owner_schema = store.schema(owner)?;
    owner_schema.check_association_name(name)?;
    let mut target_schema = if owner == target {
        None
    } else {
        Some(store.schema(target)?)
    };

    let foreign_key = match (options.foreign_key, kind) {
        (Some(key), _) => key,
        (None, AssociationKind::BelongsTo) => format!("{}_id", name),
        (None, _) => owner_schema.default_foreign_key(),
    };

    let holder = match (kind, target_schema.as_mut()) {
        (AssociationKind::BelongsTo, _) | (_, None) => &mut owner_schema,
        (_, Some(schema)) => schema,
    };
    if foreign_key == "id" || foreign_key == name || holder.association(&foreign_key).is_some() {
        return Err(RecordError::DeclarationConflict {
            kind: holder.name().to_string(),
            name: foreign_key,
            reason: "foreign key clashes with an id or association".into(),
        });
    }
    holder.add_foreign_key(&foreign_key);

    let association = Association {
        name: name.to_string(),
        kind,
        target: target.to_string(),
        foreign_key,
    };
    owner_schema.push_association(association.clone());

    store.put_schema(owner_schema)?;
    if let Some(schema) = target_schema {
        store.put_schema(schema)?;
    }

    debug!(
        owner,
        name,
        target,
        kind = %kind,
        foreign_key = %association.foreign_key,
        "declared association"
    );
    Ok(association)
}

/// Point `foreign_key` of `record` at `owner_id` and move it to the end of its
/// type's order.
///
/// Only the key of the stored copy is changed; other attributes of the
/// caller's copy are ignored. A record that is not stored yet is saved as
/// given.
pub(crate) fn link<S: RecordStore>(
    targets: &RecordRepository<'_, S>,
    record: &Record,
    foreign_key: &str,
    owner_id: &str,
) -> RecordResult<Record> {
    let stored = match record.id() {
        Some(id) => targets.find(id)?,
        None => None,
    };
    let persisted = stored.is_some();

    let mut target = stored.unwrap_or_else(|| record.clone());
    target.set(foreign_key, owner_id);
    if !persisted {
        targets.save(&mut target)?;
    }
    targets.append(&target)
}

fn mismatch(record: &Record, association: Association) -> RecordError {
    RecordError::AccessorMismatch {
        kind: record.kind().to_string(),
        name: association.name,
        association: association.kind,
    }
}
