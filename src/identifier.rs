//! Identifier providers - client-side id minting for record types.
//!
//! A record type configured with a provider gets its id at the moment data
//! is loaded into a new record, before anything is persisted. This is what
//! lets a parent and its nested children be created in one call: the parent
//! id exists by the time child foreign keys are written.
//!
//! Types without a provider receive an id from the store on first save.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Strategy for minting record ids without consulting the store.
pub trait IdentifierProvider: Send + Sync {
    /// Produce a fresh id for a record of `kind`.
    fn next_id(&self, kind: &str) -> String;
}

impl<F> IdentifierProvider for F
where
    F: Fn(&str) -> String + Send + Sync,
{
    fn next_id(&self, kind: &str) -> String {
        self(kind)
    }
}

/// Random v4 UUIDs.
#[cfg(feature = "uuid")]
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidProvider;

#[cfg(feature = "uuid")]
impl IdentifierProvider for UuidProvider {
    fn next_id(&self, _kind: &str) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

/// Deterministic ids: first any queued ids in order, then `prefix` followed
/// by a counter starting at 1.
pub struct SequenceProvider {
    queued: Mutex<VecDeque<String>>,
    prefix: String,
    next: AtomicU64,
}

impl SequenceProvider {
    pub fn new(prefix: impl Into<String>) -> Self {
        SequenceProvider {
            queued: Mutex::new(VecDeque::new()),
            prefix: prefix.into(),
            next: AtomicU64::new(1),
        }
    }

    /// Hand out `ids` first, then fall back to `prefix` plus a counter.
    pub fn with_ids<I, S>(prefix: impl Into<String>, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let provider = SequenceProvider::new(prefix);
        if let Ok(mut queued) = provider.queued.lock() {
            queued.extend(ids.into_iter().map(Into::into));
        }
        provider
    }
}

impl IdentifierProvider for SequenceProvider {
    fn next_id(&self, _kind: &str) -> String {
        let queued = self
            .queued
            .lock()
            .ok()
            .and_then(|mut queued| queued.pop_front());

        match queued {
            Some(id) => id,
            None => {
                let n = self.next.fetch_add(1, Ordering::Relaxed);
                format!("{}{}", self.prefix, n)
            }
        }
    }
}
