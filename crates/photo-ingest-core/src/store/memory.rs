use super::{RecordStore, StoreError, StoreResult};
use crate::types::PhotoRecord;

/// In-memory store; records live only as long as the value.
///
/// Also serves as a test double for code driving a [`RecordStore`]:
/// [`MemoryRecordStore::rejecting_inserts`] simulates a failing store and
/// [`MemoryRecordStore::clear_count`] shows whether a clear was requested.
#[derive(Debug, Clone, Default)]
pub struct MemoryRecordStore {
    records: Vec<PhotoRecord>,
    reject_inserts: bool,
    clears: usize,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Test double: make every subsequent `insert_all` fail
    pub fn rejecting_inserts(mut self) -> Self {
        self.reject_inserts = true;
        self
    }

    /// Records currently held, in insertion order
    pub fn records(&self) -> &[PhotoRecord] {
        &self.records
    }

    /// Test double: number of times `clear` has been called
    pub fn clear_count(&self) -> usize {
        self.clears
    }
}

impl RecordStore for MemoryRecordStore {
    fn clear(&mut self) -> StoreResult<()> {
        self.records.clear();
        self.clears += 1;
        Ok(())
    }

    fn insert_all(&mut self, records: &[PhotoRecord]) -> StoreResult<usize> {
        if self.reject_inserts {
            return Err(StoreError::Rejected(format!(
                "insert of {} records refused",
                records.len()
            )));
        }
        self.records.extend_from_slice(records);
        Ok(records.len())
    }

    fn collection(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str) -> PhotoRecord {
        PhotoRecord {
            name: name.to_string(),
            group: None,
            year: None,
        }
    }

    #[test]
    fn test_insert_appends_in_order() {
        let mut store = MemoryRecordStore::new();
        assert_eq!(store.insert_all(&[record("a.jpg")]).unwrap(), 1);
        assert_eq!(store.insert_all(&[record("b.jpg"), record("c.jpg")]).unwrap(), 2);

        let names: Vec<&str> = store.records().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["a.jpg", "b.jpg", "c.jpg"]);
    }

    #[test]
    fn test_clear_and_reject() {
        let mut store = MemoryRecordStore::new();
        store.insert_all(&[record("a.jpg")]).unwrap();
        store.clear().unwrap();
        assert!(store.records().is_empty());
        assert_eq!(store.clear_count(), 1);

        let mut store = store.rejecting_inserts();
        assert!(matches!(
            store.insert_all(&[record("b.jpg")]),
            Err(StoreError::Rejected(_))
        ));
        assert!(store.records().is_empty());
    }
}
