//! Durable record storage.
//!
//! The limits core never depends on how records are kept, only on this
//! keyed object-store contract.

mod memory;
mod nbt;

pub use memory::MemoryStore;
pub use nbt::NbtStore;

use crate::error::StoreError;
use crate::record::TerritoryRecord;
use crate::types::TerritoryId;

pub trait RecordStore {
    fn load(&self, id: &TerritoryId) -> Result<Option<TerritoryRecord>, StoreError>;
    /// Durable once this returns.
    fn save(&mut self, record: &TerritoryRecord) -> Result<(), StoreError>;
    /// Queues a write. An `Ok` only means the write was accepted.
    fn save_async(&mut self, record: &TerritoryRecord) -> Result<(), StoreError>;
    fn delete(&mut self, id: &TerritoryId) -> Result<(), StoreError>;
    fn exists(&self, id: &TerritoryId) -> Result<bool, StoreError>;
    fn load_all(&self) -> Result<Vec<TerritoryRecord>, StoreError>;

    /// Blocks until every accepted deferred write has finished.
    fn settle(&self) -> Result<(), StoreError> {
        Ok(())
    }
    /// Ids whose deferred writes were accepted and then failed, since the
    /// last call.
    fn failed_writes(&mut self) -> Vec<TerritoryId> {
        Vec::new()
    }
}
