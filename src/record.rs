//! The durable per-territory record and the in-memory cache that owns the
//! authoritative copy of each one.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::entity::EntityKind;
use crate::material::Material;
use crate::resolve::Subject;
use crate::store::RecordStore;
use crate::types::TerritoryId;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerritoryRecord {
    id: TerritoryId,
    game_mode: String,
    block_counts: HashMap<Material, i32>,
    block_caps: HashMap<Material, i32>,
    block_cap_offsets: HashMap<Material, i32>,
    entity_caps: HashMap<EntityKind, i32>,
    entity_cap_offsets: HashMap<EntityKind, i32>,
    entity_group_caps: HashMap<String, i32>,
    entity_group_cap_offsets: HashMap<String, i32>,
    #[serde(skip)]
    dirty: bool,
}

impl TerritoryRecord {
    pub fn new(id: TerritoryId, game_mode: impl Into<String>) -> Self {
        Self { id, game_mode: game_mode.into(), ..Default::default() }
    }
    pub fn id(&self) -> &TerritoryId {
        &self.id
    }
    pub fn game_mode(&self) -> &str {
        &self.game_mode
    }
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }
    pub(crate) fn mark_clean(&mut self) {
        self.dirty = false;
    }

    pub fn count(&self, material: Material) -> i32 {
        self.block_counts.get(&material).copied().unwrap_or(0)
    }
    pub fn block_counts(&self) -> &HashMap<Material, i32> {
        &self.block_counts
    }
    pub fn add(&mut self, material: Material, units: i32) {
        *self.block_counts.entry(material).or_insert(0) += units;
        self.dirty = true;
    }
    /// Takes `units` away, never below zero. Empty entries are dropped.
    pub fn remove(&mut self, material: Material, units: i32) {
        if let Some(count) = self.block_counts.get_mut(&material) {
            *count -= units;
            if *count <= 0 {
                self.block_counts.remove(&material);
            }
            self.dirty = true;
        }
    }
    /// Replaces the counts of every material in `scanned` with `tally`.
    /// Counts of other materials are left alone.
    pub fn replace_counts(&mut self, scanned: &HashSet<Material>, tally: &HashMap<Material, i32>) {
        self.block_counts.retain(|m, _| !scanned.contains(m));
        self.block_counts.extend(tally.iter().filter(|(_, n)| **n > 0).map(|(m, n)| (*m, *n)));
        self.dirty = true;
    }

    pub fn block_cap(&self, material: Material) -> Option<i32> {
        self.block_caps.get(&material).copied()
    }
    pub fn entity_cap(&self, kind: EntityKind) -> Option<i32> {
        self.entity_caps.get(&kind).copied()
    }
    pub fn group_cap(&self, group: &str) -> Option<i32> {
        self.entity_group_caps.get(group).copied()
    }
    pub fn block_caps(&self) -> impl Iterator<Item = Material> + '_ {
        self.block_caps.keys().copied()
    }

    pub fn offset(&self, subject: &Subject) -> i32 {
        match subject {
            Subject::Block(m) => self.block_cap_offsets.get(m),
            Subject::Entity(k) => self.entity_cap_offsets.get(k),
            Subject::Group(g) => self.entity_group_cap_offsets.get(g),
        }
        .copied()
        .unwrap_or(0)
    }
    pub fn set_offset(&mut self, subject: &Subject, delta: i32) {
        fn put<K: std::hash::Hash + Eq>(map: &mut HashMap<K, i32>, key: K, delta: i32) {
            if delta == 0 {
                map.remove(&key);
            } else {
                map.insert(key, delta);
            }
        }
        match subject {
            Subject::Block(m) => put(&mut self.block_cap_offsets, *m, delta),
            Subject::Entity(k) => put(&mut self.entity_cap_offsets, *k, delta),
            Subject::Group(g) => put(&mut self.entity_group_cap_offsets, g.clone(), delta),
        }
        self.dirty = true;
    }

    /// Records a permission-granted cap. A lower grant never replaces a higher one.
    pub fn grant(&mut self, subject: &Subject, cap: i32) {
        fn raise<K: std::hash::Hash + Eq>(map: &mut HashMap<K, i32>, key: K, cap: i32) {
            let entry = map.entry(key).or_insert(cap);
            *entry = (*entry).max(cap);
        }
        match subject {
            Subject::Block(m) => raise(&mut self.block_caps, *m, cap),
            Subject::Entity(k) => raise(&mut self.entity_caps, *k, cap),
            Subject::Group(g) => raise(&mut self.entity_group_caps, g.clone(), cap),
        }
        self.dirty = true;
    }
    pub fn revoke(&mut self, subject: &Subject) {
        match subject {
            Subject::Block(m) => self.block_caps.remove(m),
            Subject::Entity(k) => self.entity_caps.remove(k),
            Subject::Group(g) => self.entity_group_caps.remove(g),
        };
        self.dirty = true;
    }
}

/// Owns the live copy of every loaded record and decides when it is written.
///
/// The store is asked about a territory at most once: a miss is remembered
/// until a record is created for it, and once `remove_orphans` has listed the
/// store every stored record is resident. Records stay resident until
/// `unload` or `remove`.
#[derive(Debug)]
pub struct RecordCache<S> {
    store: S,
    records: HashMap<TerritoryId, TerritoryRecord>,
    /// Known to have no stored record.
    absent: HashSet<TerritoryId>,
    /// Every stored record is in `records`.
    complete: bool,
    changes: HashMap<TerritoryId, u32>,
    flush_threshold: u32,
}

impl<S: RecordStore> RecordCache<S> {
    pub fn new(store: S, flush_threshold: u32) -> Self {
        Self {
            store,
            records: HashMap::new(),
            absent: HashSet::new(),
            complete: false,
            changes: HashMap::new(),
            flush_threshold: flush_threshold.max(1),
        }
    }
    /// Records currently held in memory.
    pub fn resident(&self) -> usize {
        self.records.len()
    }
    pub fn store(&self) -> &S {
        &self.store
    }
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Cached record, loading it from the store on first use.
    pub fn get(&mut self, id: &TerritoryId) -> Option<&TerritoryRecord> {
        self.load(id);
        self.records.get(id)
    }
    pub fn get_mut(&mut self, id: &TerritoryId) -> Option<&mut TerritoryRecord> {
        self.load(id);
        self.records.get_mut(id)
    }
    pub fn get_or_create(&mut self, id: &TerritoryId, game_mode: &str) -> &mut TerritoryRecord {
        self.load(id);
        self.absent.remove(id);
        self.records
            .entry(id.clone())
            .or_insert_with(|| TerritoryRecord::new(id.clone(), game_mode))
    }
    fn load(&mut self, id: &TerritoryId) {
        if self.complete || self.records.contains_key(id) || self.absent.contains(id) {
            return;
        }
        match self.store.load(id) {
            Ok(Some(record)) => {
                self.records.insert(id.clone(), record);
            }
            Ok(None) => {
                self.absent.insert(id.clone());
            }
            Err(err) => log::warn!("could not load limits record {id}: {err}"),
        }
    }

    /// Counts one change against `id` and hands the record to the store
    /// every `flush_threshold` changes.
    pub fn note_change(&mut self, id: &TerritoryId) {
        let changes = self.changes.entry(id.clone()).or_insert(0);
        *changes += 1;
        if *changes < self.flush_threshold {
            return;
        }
        self.changes.remove(id);
        let Some(record) = self.records.get_mut(id) else { return };
        match self.store.save_async(record) {
            Ok(()) => record.mark_clean(),
            Err(err) => log::warn!("deferred save of limits record {id} failed, will retry: {err}"),
        }
    }

    /// Writes the record now.
    pub fn save(&mut self, id: &TerritoryId) {
        let Some(record) = self.records.get_mut(id) else { return };
        self.changes.remove(id);
        match self.store.save(record) {
            Ok(()) => record.mark_clean(),
            Err(err) => log::warn!("saving limits record {id} failed, kept in memory: {err}"),
        }
    }

    /// Marks records dirty again when a deferred write the store accepted
    /// did not land.
    pub fn reconcile(&mut self) {
        for id in self.store.failed_writes() {
            if let Some(record) = self.records.get_mut(&id) {
                log::warn!("deferred save of limits record {id} failed, will retry");
                record.mark_dirty();
            }
        }
    }

    /// Writes every dirty record. Returns how many could not be written.
    pub fn flush_all(&mut self) -> usize {
        if let Err(err) = self.store.settle() {
            log::warn!("pending limits writes did not finish: {err}");
        }
        self.reconcile();
        let mut failed = 0;
        for (id, record) in self.records.iter_mut().filter(|(_, r)| r.is_dirty()) {
            match self.store.save(record) {
                Ok(()) => record.mark_clean(),
                Err(err) => {
                    log::warn!("saving limits record {id} failed: {err}");
                    failed += 1;
                }
            }
        }
        self.changes.clear();
        failed
    }

    /// Writes the record if it has unsaved changes and drops it from memory.
    /// Returns false, keeping the record, when it could not be written.
    pub fn unload(&mut self, id: &TerritoryId) -> bool {
        if let Err(err) = self.store.settle() {
            log::warn!("pending limits writes did not finish, keeping {id}: {err}");
            return false;
        }
        self.reconcile();
        let Some(record) = self.records.get_mut(id) else { return true };
        if record.is_dirty() {
            if let Err(err) = self.store.save(record) {
                log::warn!("saving limits record {id} failed, kept in memory: {err}");
                return false;
            }
        }
        self.records.remove(id);
        self.changes.remove(id);
        self.complete = false;
        true
    }

    /// Drops the record from memory and from the store.
    pub fn remove(&mut self, id: &TerritoryId) {
        self.records.remove(id);
        self.changes.remove(id);
        self.absent.insert(id.clone());
        if let Err(err) = self.store.delete(id) {
            log::warn!("deleting limits record {id} failed: {err}");
        }
    }

    /// Deletes every stored record whose game mode is no longer active and
    /// makes the rest resident.
    pub fn remove_orphans(&mut self, active: &[&str]) -> usize {
        let records = match self.store.load_all() {
            Ok(records) => records,
            Err(err) => {
                log::warn!("could not list limits records for cleanup: {err}");
                return 0;
            }
        };
        let (kept, orphans): (Vec<_>, Vec<_>) =
            records.into_iter().partition(|r| active.contains(&r.game_mode()));
        for record in kept {
            self.records.entry(record.id().clone()).or_insert(record);
        }
        self.complete = true;
        for record in &orphans {
            log::info!("removing limits record {}, its game mode is not loaded", record.id());
            self.remove(record.id());
        }
        orphans.len()
    }
}
