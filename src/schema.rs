//! Schemas - per-type attribute lists and association declarations.
//!
//! A schema is created once when a record type is defined and then grows as
//! associations are declared: declaring a relation appends a foreign-key
//! attribute to whichever side holds the key, and records the association on
//! the declaring type so accessors and nested loading can find it.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{RecordError, RecordResult};
use crate::identifier::IdentifierProvider;

/// The shape of a declared association.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssociationKind {
    /// One-to-many; the key lives on the target records.
    HasMany,
    /// Many-to-one; the key lives on the declaring record.
    BelongsTo,
    /// One-to-one; the key lives on the target record.
    HasOne,
}

impl AssociationKind {
    /// Returns true if the accessor yields a collection.
    pub fn is_collection(self) -> bool {
        matches!(self, Self::HasMany)
    }

    /// Returns true if the declaring type stores the foreign key itself.
    pub fn is_owning_side(self) -> bool {
        matches!(self, Self::BelongsTo)
    }
}

impl fmt::Display for AssociationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssociationKind::HasMany => write!(f, "has_many"),
            AssociationKind::BelongsTo => write!(f, "belongs_to"),
            AssociationKind::HasOne => write!(f, "has_one"),
        }
    }
}

/// A named relation from one record type to another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Association {
    pub name: String,
    pub kind: AssociationKind,
    /// Name of the related record type.
    pub target: String,
    /// Attribute holding the related id.
    pub foreign_key: String,
}

impl Association {
    /// Record type that carries the foreign key attribute.
    pub fn key_holder<'a>(&'a self, owner: &'a str) -> &'a str {
        if self.kind.is_owning_side() {
            owner
        } else {
            &self.target
        }
    }
}

/// Per-declaration options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssociationOptions {
    pub foreign_key: Option<String>,
}

impl AssociationOptions {
    pub fn foreign_key(key: impl Into<String>) -> Self {
        AssociationOptions {
            foreign_key: Some(key.into()),
        }
    }
}

/// Definition of a record type, handed to the store once.
///
/// ```ignore
/// store.define(RecordType::new("Album", ["name"]).with_identifiers(UuidProvider))?;
/// ```
#[derive(Clone)]
pub struct RecordType {
    name: String,
    attributes: Vec<String>,
    identifiers: Option<Arc<dyn IdentifierProvider>>,
}

impl RecordType {
    pub fn new<I, S>(name: impl Into<String>, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        RecordType {
            name: name.into(),
            attributes: attributes.into_iter().map(Into::into).collect(),
            identifiers: None,
        }
    }

    /// Mint ids for this type on the client side.
    pub fn with_identifiers(mut self, provider: impl IdentifierProvider + 'static) -> Self {
        self.identifiers = Some(Arc::new(provider));
        self
    }

    pub fn with_shared_identifiers(mut self, provider: Arc<dyn IdentifierProvider>) -> Self {
        self.identifiers = Some(provider);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Check the definition and turn it into a live schema.
    pub fn into_schema(self) -> RecordResult<Schema> {
        if self.name.is_empty() {
            return Err(conflict(&self.name, "", "record type name is empty"));
        }

        let mut schema = Schema {
            name: self.name,
            attributes: Vec::with_capacity(self.attributes.len()),
            associations: Vec::new(),
            identifiers: self.identifiers,
        };

        for attribute in self.attributes {
            if attribute.is_empty() || attribute == "id" {
                return Err(conflict(&schema.name, &attribute, "reserved attribute name"));
            }
            if schema.has_attribute(&attribute) {
                return Err(conflict(&schema.name, &attribute, "attribute declared twice"));
            }
            schema.attributes.push(attribute);
        }

        Ok(schema)
    }
}

impl fmt::Debug for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordType")
            .field("name", &self.name)
            .field("attributes", &self.attributes)
            .field("identifiers", &self.identifiers.is_some())
            .finish()
    }
}

/// The live schema of a defined record type.
#[derive(Clone)]
pub struct Schema {
    name: String,
    attributes: Vec<String>,
    associations: Vec<Association>,
    identifiers: Option<Arc<dyn IdentifierProvider>>,
}

impl Schema {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared attributes, including foreign keys added by associations.
    pub fn attributes(&self) -> &[String] {
        &self.attributes
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.iter().any(|attribute| attribute == name)
    }

    /// Associations declared on this type, in declaration order.
    pub fn associations(&self) -> &[Association] {
        &self.associations
    }

    pub fn association(&self, name: &str) -> Option<&Association> {
        self.associations.iter().find(|association| association.name == name)
    }

    pub fn identifiers(&self) -> Option<&Arc<dyn IdentifierProvider>> {
        self.identifiers.as_ref()
    }

    /// Mint a client-side id, if this type has a provider.
    pub fn mint_id(&self) -> Option<String> {
        self.identifiers
            .as_ref()
            .map(|provider| provider.next_id(&self.name))
    }

    /// Foreign key used when a declaration names none: `<type lowercased>_id`.
    pub fn default_foreign_key(&self) -> String {
        format!("{}_id", self.name.to_lowercase())
    }

    /// Add a foreign-key attribute unless it is already declared.
    pub(crate) fn add_foreign_key(&mut self, name: &str) {
        if !self.has_attribute(name) {
            self.attributes.push(name.to_string());
        }
    }

    /// Check that `name` is free to be used for a new association.
    pub(crate) fn check_association_name(&self, name: &str) -> RecordResult<()> {
        if name.is_empty() {
            return Err(conflict(&self.name, name, "association name is empty"));
        }
        if name == "id" {
            return Err(conflict(&self.name, name, "reserved attribute name"));
        }
        if self.has_attribute(name) {
            return Err(conflict(&self.name, name, "an attribute has this name"));
        }
        if self.association(name).is_some() {
            return Err(conflict(&self.name, name, "association already declared"));
        }
        Ok(())
    }

    pub(crate) fn push_association(&mut self, association: Association) {
        self.associations.push(association);
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("name", &self.name)
            .field("attributes", &self.attributes)
            .field("associations", &self.associations)
            .field("identifiers", &self.identifiers.is_some())
            .finish()
    }
}

fn conflict(kind: &str, name: &str, reason: &str) -> RecordError {
    RecordError::DeclarationConflict {
        kind: kind.to_string(),
        name: name.to_string(),
        reason: reason.to_string(),
    }
}
