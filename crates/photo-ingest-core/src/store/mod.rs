//! Persistence of [`PhotoRecord`]s.
//!
//! The pipeline only needs two operations from a store: wipe what is there
//! and append a batch. Both either succeed completely or return an error.

mod error;
mod memory;
mod sqlite;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryRecordStore;
pub use sqlite::{validate_collection, SqliteRecordStore};

use crate::types::PhotoRecord;

/// A destination for photo metadata, keyed only by insertion order
pub trait RecordStore {
    /// Remove every existing record
    fn clear(&mut self) -> StoreResult<()>;

    /// Append `records` and return how many were inserted
    fn insert_all(&mut self, records: &[PhotoRecord]) -> StoreResult<usize>;

    /// Human-readable name of the collection records land in
    fn collection(&self) -> &str;
}

impl<S: RecordStore + ?Sized> RecordStore for Box<S> {
    fn clear(&mut self) -> StoreResult<()> {
        (**self).clear()
    }

    fn insert_all(&mut self, records: &[PhotoRecord]) -> StoreResult<usize> {
        (**self).insert_all(records)
    }

    fn collection(&self) -> &str {
        (**self).collection()
    }
}
