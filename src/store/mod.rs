//! Record stores - per-type ordered storage for records.
//!
//! A store keeps the schema and the records of every defined record type.
//! Application code goes through the typed [`RecordRepository`] returned by
//! [`RecordsExt::records`]; associations use the same repositories underneath.
//!
//! ## Example
//!
//! ```ignore
//! use record_relations::{InMemoryRecordStore, RecordType, RecordsExt};
//! use serde_json::json;
//!
//! let store = InMemoryRecordStore::new();
//! store.define(RecordType::new("Album", ["name"]))?;
//!
//! let album = store.records("Album").create(json!({"name": "Holiday"}))?;
//! let loaded = store.records("Album").find(album.id().unwrap())?;
//! ```

mod in_memory;
mod repository;
mod store;

pub use in_memory::InMemoryRecordStore;
pub use repository::{RecordRepository, RecordsExt};
pub use store::RecordStore;
