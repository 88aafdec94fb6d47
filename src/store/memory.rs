use std::cell::Cell;
use std::collections::HashMap;

use super::RecordStore;
use crate::error::StoreError;
use crate::record::TerritoryRecord;
use crate::types::TerritoryId;

/// Keeps records in a map. Can be switched offline, or made to accept
/// deferred writes and then drop them, to exercise failure paths.
#[derive(Debug)]
pub struct MemoryStore {
    records: HashMap<TerritoryId, TerritoryRecord>,
    available: bool,
    drop_deferred: bool,
    dropped: Vec<TerritoryId>,
    saves: usize,
    loads: Cell<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            records: HashMap::new(),
            available: true,
            drop_deferred: false,
            dropped: vec![],
            saves: 0,
            loads: Cell::new(0),
        }
    }
    pub fn set_available(&mut self, available: bool) {
        self.available = available;
    }
    /// Deferred writes are accepted but never land, and are reported as failed.
    pub fn set_drop_deferred(&mut self, drop_deferred: bool) {
        self.drop_deferred = drop_deferred;
    }
    /// Successful writes so far.
    pub fn saves(&self) -> usize {
        self.saves
    }
    /// Single-record loads so far.
    pub fn loads(&self) -> usize {
        self.loads.get()
    }
    pub fn peek(&self, id: &TerritoryId) -> Option<&TerritoryRecord> {
        self.records.get(id)
    }
    pub fn len(&self) -> usize {
        self.records.len()
    }
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
    fn check(&self) -> Result<(), StoreError> {
        if self.available {
            Ok(())
        } else {
            Err(StoreError::Unavailable("memory store switched off".into()))
        }
    }
    fn put(&mut self, record: &TerritoryRecord) -> Result<(), StoreError> {
        self.check()?;
        let mut copy = record.clone();
        copy.mark_clean();
        self.records.insert(copy.id().clone(), copy);
        self.saves += 1;
        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordStore for MemoryStore {
    fn load(&self, id: &TerritoryId) -> Result<Option<TerritoryRecord>, StoreError> {
        self.loads.set(self.loads.get() + 1);
        self.check()?;
        Ok(self.records.get(id).cloned())
    }
    fn save(&mut self, record: &TerritoryRecord) -> Result<(), StoreError> {
        self.put(record)
    }
    fn save_async(&mut self, record: &TerritoryRecord) -> Result<(), StoreError> {
        if self.drop_deferred {
            self.check()?;
            self.dropped.push(record.id().clone());
            return Ok(());
        }
        self.put(record)
    }
    fn delete(&mut self, id: &TerritoryId) -> Result<(), StoreError> {
        self.check()?;
        self.records.remove(id);
        Ok(())
    }
    fn exists(&self, id: &TerritoryId) -> Result<bool, StoreError> {
        self.check()?;
        Ok(self.records.contains_key(id))
    }
    fn load_all(&self) -> Result<Vec<TerritoryRecord>, StoreError> {
        self.check()?;
        Ok(self.records.values().cloned().collect())
    }
    fn failed_writes(&mut self) -> Vec<TerritoryId> {
        std::mem::take(&mut self.dropped)
    }
}
