//! The limits façade. It owns the live records, the recount scheduler and
//! the provisional spawns, and runs entirely on the tick thread.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::host::{Host, Territory};
use crate::material::Material;
use crate::record::{RecordCache, TerritoryRecord};
use crate::resolve::{Cap, Resolver, Subject};
use crate::scan::{Outcome, Pending, ScanArea, ScanResult, ScanState, Scheduler};
use crate::settings::Settings;
use crate::spawn::Provisional;
use crate::store::RecordStore;
use crate::types::TerritoryId;

pub struct Limits<S> {
    pub(crate) settings: Settings,
    pub(crate) records: RecordCache<S>,
    scheduler: Scheduler,
    pub(crate) provisional: Vec<Provisional>,
}

impl<S: RecordStore> Limits<S> {
    pub fn new(settings: Settings, store: S) -> Self {
        let records = RecordCache::new(store, settings.options().flush_threshold);
        let scheduler = Scheduler::new(settings.scan().clone());
        Self { settings, records, scheduler, provisional: vec![] }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }
    pub fn resolver(&self) -> Resolver<'_> {
        Resolver::new(&self.settings)
    }
    pub fn store(&self) -> &S {
        self.records.store()
    }
    pub fn store_mut(&mut self) -> &mut S {
        self.records.store_mut()
    }
    pub fn record(&mut self, id: &TerritoryId) -> Option<&TerritoryRecord> {
        self.records.get(id)
    }

    /// Starts a recount of every block kind the territory has a cap for.
    pub fn request_recount(&mut self, territory: &Territory) -> Pending {
        if self.scheduler.contains(&territory.id) {
            log::debug!("recount of {} already pending", territory.id);
            return Pending::in_progress();
        }
        let record = self.records.get(&territory.id);
        let limited = Resolver::new(&self.settings)
            .limited_materials(record, territory.dimensions.iter().map(|(_, w)| w));
        let area = ScanArea::of(territory, self.settings.options().ignore_center_block, limited);
        self.scheduler.enqueue(territory, area)
    }

    pub fn current_counts(&mut self, id: &TerritoryId) -> HashMap<Material, i32> {
        self.records.get(id).map(|r| r.block_counts().clone()).unwrap_or_default()
    }

    pub fn effective_cap(&mut self, territory: &Territory, world: &str, subject: &Subject) -> Cap {
        let record = self.records.get(&territory.id);
        Resolver::new(&self.settings).subject(record, world, subject)
    }

    /// Sets the administrative offset for one subject. Written out immediately.
    pub fn set_offset(&mut self, territory: &Territory, subject: &Subject, delta: i32) {
        self.records
            .get_or_create(&territory.id, &territory.game_mode)
            .set_offset(subject, delta);
        log::info!("offset for {subject} on {} set to {delta}", territory.id);
        self.records.save(&territory.id);
    }

    pub fn queue_depth(&self) -> usize {
        self.scheduler.queue_depth()
    }
    pub fn average_scan_time(&self) -> Option<Duration> {
        self.scheduler.average_scan_time()
    }

    /// Deletes stored records of game modes that are not loaded and loads
    /// the others, so later events never wait on the store.
    pub fn cleanup_orphans(&mut self, active: &[&str]) -> usize {
        self.records.remove_orphans(active)
    }

    /// Writes out and frees the record of a territory nobody is playing on.
    /// Returns false when the record had to stay in memory.
    pub fn unload(&mut self, id: &TerritoryId) -> bool {
        self.records.unload(id)
    }

    /// Forgets everything about a territory that no longer exists.
    pub fn on_territory_deleted(&mut self, id: &TerritoryId) {
        if self.scheduler.cancel(id) {
            log::info!("recount of {id} cancelled, territory deleted");
        }
        self.provisional.retain(|p| p.territory != *id);
        self.records.remove(id);
    }

    /// Advances recounts and re-checks provisional spawns. Records whose
    /// deferred write failed are marked for another write first.
    pub fn tick<H: Host>(&mut self, host: &mut H, now: Instant) {
        self.records.reconcile();
        for outcome in self.scheduler.tick(host, now) {
            match outcome {
                Outcome::Finished { territory, game_mode, scanned, tally, deferred } => {
                    self.records.get_or_create(&territory, &game_mode).replace_counts(&scanned, &tally);
                    self.records.save(&territory);
                    let _ = deferred.send(ScanResult { state: ScanState::Available, counts: tally });
                }
                Outcome::Aborted { territory, deleted: true } => self.on_territory_deleted(&territory),
                Outcome::Aborted { deleted: false, .. } => {}
            }
        }
        self.recheck_provisional(host);
    }

    /// Drops pending recounts unanswered and writes every dirty record.
    /// Returns how many records could not be written.
    pub fn shutdown(&mut self) -> usize {
        self.scheduler.shutdown();
        self.provisional.clear();
        let failed = self.records.flush_all();
        if failed > 0 {
            log::error!("{failed} limits records could not be saved on shutdown");
        }
        failed
    }
}
