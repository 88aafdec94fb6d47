use std::collections::{HashMap, HashSet, VecDeque};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Sender};

use super::count::{count_chunk, Batch, CountPool};
use super::job::{ScanArea, ScanJob};
use super::{Pending, ScanResult, ScanState};
use crate::host::{Blocks, Territories, Territory};
use crate::material::Material;
use crate::settings::ScanSettings;
use crate::types::TerritoryId;

/// What a scheduler pass hands back for the owner of the records to act on.
pub(crate) enum Outcome {
    Finished {
        territory: TerritoryId,
        game_mode: String,
        scanned: HashSet<Material>,
        tally: HashMap<Material, i32>,
        deferred: Sender<ScanResult>,
    },
    Aborted {
        territory: TerritoryId,
        deleted: bool,
    },
}

/// Single-flight queue of recounts. At most one job exists per territory;
/// every job is either waiting in `queue` or listed in `running`.
pub struct Scheduler {
    settings: ScanSettings,
    jobs: HashMap<TerritoryId, ScanJob>,
    queue: VecDeque<TerritoryId>,
    running: Vec<TerritoryId>,
    pool: Option<CountPool>,
    last_pass: Option<Instant>,
    next_ticket: u64,
    total_time: Duration,
    completed: u32,
}

impl Scheduler {
    pub fn new(settings: ScanSettings) -> Self {
        let pool = (settings.workers > 0)
            .then(|| CountPool::new(settings.workers))
            .filter(|pool| !pool.is_empty());
        Self {
            settings,
            jobs: HashMap::new(),
            queue: VecDeque::new(),
            running: vec![],
            pool,
            last_pass: None,
            next_ticket: 0,
            total_time: Duration::ZERO,
            completed: 0,
        }
    }

    pub fn contains(&self, territory: &TerritoryId) -> bool {
        self.jobs.contains_key(territory)
    }

    /// Queues a recount unless one is already queued or running, in which
    /// case the answer is an immediate [`ScanState::InProgress`].
    pub fn enqueue(&mut self, territory: &Territory, area: ScanArea) -> Pending {
        if self.contains(&territory.id) {
            log::debug!("recount of {} already pending", territory.id);
            return Pending::in_progress();
        }
        let (tx, rx) = bounded(1);
        self.next_ticket += 1;
        let job = ScanJob::new(territory, area, self.next_ticket, tx);
        log::debug!(
            "queued recount of {}: {} chunks in {} worlds",
            territory.id,
            job.chunks.len(),
            job.worlds.len()
        );
        self.queue.push_back(territory.id.clone());
        self.jobs.insert(territory.id.clone(), job);
        Pending(rx)
    }

    /// Drops the job for `territory` without answering it.
    pub fn cancel(&mut self, territory: &TerritoryId) -> bool {
        self.queue.retain(|t| t != territory);
        self.running.retain(|t| t != territory);
        self.jobs.remove(territory).is_some()
    }

    /// Queued plus running recounts.
    pub fn queue_depth(&self) -> usize {
        self.jobs.len()
    }
    /// Mean duration of the recounts that finished so far.
    pub fn average_scan_time(&self) -> Option<Duration> {
        (self.completed > 0).then(|| self.total_time / self.completed)
    }

    /// One scheduler pass: collect counted batches, expire and abort jobs,
    /// start waiting jobs and move each running job on by one batch.
    pub(crate) fn tick<H: Territories + Blocks>(&mut self, host: &mut H, now: Instant) -> Vec<Outcome> {
        if let Some(last) = self.last_pass {
            if now.saturating_duration_since(last) < self.settings.interval() {
                return vec![];
            }
        }
        self.last_pass = Some(now);
        self.collect_counted();

        let mut outcomes = vec![];
        self.reap(host, now, &mut outcomes);

        while self.running.len() < self.settings.max_concurrent_scans.max(1) {
            let Some(id) = self.queue.pop_front() else { break };
            if let Some(job) = self.jobs.get_mut(&id) {
                log::debug!("starting recount of {id}");
                job.started_at = Some(now);
                self.running.push(id);
            }
        }

        for id in self.running.clone() {
            self.advance(host, &id);
            if self.jobs.get(&id).map_or(false, ScanJob::is_done) {
                outcomes.extend(self.finish(&id, now));
            }
        }
        outcomes
    }

    fn collect_counted(&mut self) {
        let Some(pool) = &self.pool else { return };
        for counted in pool.finished() {
            match self.jobs.get_mut(&counted.territory) {
                Some(job) if job.ticket == counted.ticket && job.in_flight => {
                    job.in_flight = false;
                    job.merge(counted.tally);
                }
                _ => log::trace!("dropping stale batch for {}", counted.territory),
            }
        }
    }

    fn reap<H: Territories>(&mut self, host: &H, now: Instant, outcomes: &mut Vec<Outcome>) {
        let timeout = self.settings.timeout();
        let ids: Vec<TerritoryId> = self.jobs.keys().cloned().collect();
        for id in ids {
            let deleted = host.is_deleted(&id);
            if deleted || host.is_unowned(&id) {
                log::info!("recount of {id} aborted, territory {}", if deleted { "deleted" } else { "unowned" });
                self.cancel(&id);
                outcomes.push(Outcome::Aborted { territory: id, deleted });
                continue;
            }
            let Some(started) = self.jobs.get(&id).and_then(|j| j.started_at) else { continue };
            if now.saturating_duration_since(started) > timeout {
                log::warn!("recount of {id} timed out after {timeout:?}, keeping previous counts");
                if let Some(job) = self.jobs.remove(&id) {
                    let _ = job.deferred.send(ScanResult::empty(ScanState::Timeout));
                }
                self.running.retain(|t| *t != id);
            }
        }
    }

    fn advance<H: Blocks>(&mut self, host: &mut H, id: &TerritoryId) {
        let batch_size = self.settings.chunks_per_batch.max(1);
        let Some(job) = self.jobs.get_mut(id) else { return };
        if job.in_flight || job.chunks.is_empty() {
            return;
        }
        let take = batch_size.min(job.chunks.len());
        let mut snapshots = Vec::with_capacity(take * job.worlds.len());
        for chunk in job.chunks.drain(..take) {
            for (dimension, world) in &job.worlds {
                match host.load_chunk(world, chunk) {
                    Some(snapshot) => snapshots.push((*dimension, snapshot)),
                    None => log::debug!("recount of {id}: chunk {},{} in {world} unavailable, skipped", chunk.x, chunk.z),
                }
            }
        }
        let batch = Batch { territory: id.clone(), ticket: job.ticket, area: job.area.clone(), snapshots };
        let batch = match &self.pool {
            Some(pool) => match pool.submit(batch) {
                Ok(()) => {
                    job.in_flight = true;
                    return;
                }
                Err(batch) => batch,
            },
            None => batch,
        };
        for (dimension, snapshot) in &batch.snapshots {
            count_chunk(&batch.area, *dimension, snapshot, &mut job.tally);
        }
    }

    fn finish(&mut self, id: &TerritoryId, now: Instant) -> Option<Outcome> {
        self.running.retain(|t| t != id);
        let job = self.jobs.remove(id)?;
        if let Some(started) = job.started_at {
            self.total_time += now.saturating_duration_since(started);
            self.completed += 1;
        }
        log::info!("recount of {id} finished: {} limited kinds present", job.tally.len());
        Some(Outcome::Finished {
            territory: job.territory,
            game_mode: job.game_mode,
            scanned: job.area.limited.clone(),
            tally: job.tally,
            deferred: job.deferred,
        })
    }

    /// Drops every job unanswered and stops the counting threads.
    pub fn shutdown(&mut self) {
        if !self.jobs.is_empty() {
            log::info!("dropping {} pending recounts", self.jobs.len());
        }
        self.jobs.clear();
        self.queue.clear();
        self.running.clear();
        if let Some(mut pool) = self.pool.take() {
            pool.shutdown();
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}
