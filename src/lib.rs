//! In-memory record associations.
//!
//! Record types are defined on a store with a fixed attribute list. Relations
//! between them are declared afterwards as `has_many`, `belongs_to` or
//! `has_one`, each backed by a foreign-key attribute on one side. Related
//! records are reached through accessors that always read the store's current
//! state, and plain objects with relation data embedded in them can be loaded
//! in one step.

mod association;
mod error;
mod identifier;
mod record;
mod schema;
mod store;

pub use association::{AssociationsExt, Collection, Singular};
pub use error::{RecordError, RecordResult};
#[cfg(feature = "uuid")]
pub use identifier::UuidProvider;
pub use identifier::{IdentifierProvider, SequenceProvider};
pub use record::{Attributes, Record};
pub use schema::{Association, AssociationKind, AssociationOptions, RecordType, Schema};
pub use store::{InMemoryRecordStore, RecordRepository, RecordStore, RecordsExt};
