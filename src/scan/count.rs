use std::collections::HashMap;
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{unbounded, Receiver, Sender};

use super::ScanArea;
use crate::chunk::ChunkSnapshot;
use crate::material::Material;
use crate::types::{Dimension, TerritoryId};

/// Adds the limited blocks of one chunk that lie inside `area` to `tally`.
pub fn count_chunk(area: &ScanArea, dimension: Dimension, chunk: &ChunkSnapshot, tally: &mut HashMap<Material, i32>) {
    let (xs, zs) = area.bounds.clip(chunk.pos());
    if xs.is_empty() || zs.is_empty() {
        return;
    }
    let kinds: Vec<Option<(Material, i32)>> = chunk
        .palette()
        .iter()
        .map(|state| {
            let kind = state.canonical();
            (!state.is_exempt() && area.limited.contains(&kind)).then(|| (kind, state.units()))
        })
        .collect();
    if kinds.iter().all(Option::is_none) {
        return;
    }
    let pos = chunk.pos();
    let skip = area
        .skip
        .filter(|_| dimension == Dimension::Overworld)
        .map(|c| (c.x - pos.min_block_x(), c.y, c.z - pos.min_block_z()));
    chunk.for_each_cell(xs, zs, |x, y, z, id| {
        if let Some((kind, units)) = kinds[id] {
            if skip != Some((x, y, z)) {
                *tally.entry(kind).or_insert(0) += units;
            }
        }
    });
}

pub(crate) struct Batch {
    pub territory: TerritoryId,
    pub ticket: u64,
    pub area: Arc<ScanArea>,
    pub snapshots: Vec<(Dimension, ChunkSnapshot)>,
}

pub(crate) struct Counted {
    pub territory: TerritoryId,
    pub ticket: u64,
    pub tally: HashMap<Material, i32>,
}

/// Counting threads fed batches over a channel.
pub(crate) struct CountPool {
    batches: Option<Sender<Batch>>,
    counted: Receiver<Counted>,
    threads: Vec<JoinHandle<()>>,
}

impl CountPool {
    pub fn new(workers: usize) -> Self {
        let (batches, queue) = unbounded::<Batch>();
        let (done, counted) = unbounded();
        let mut threads = Vec::with_capacity(workers);
        for i in 0..workers {
            let queue = queue.clone();
            let done = done.clone();
            let spawned = std::thread::Builder::new()
                .name(format!("limits-count-{i}"))
                .spawn(move || {
                    for batch in queue {
                        let mut tally = HashMap::new();
                        for (dimension, snapshot) in &batch.snapshots {
                            count_chunk(&batch.area, *dimension, snapshot, &mut tally);
                        }
                        let counted = Counted { territory: batch.territory, ticket: batch.ticket, tally };
                        if done.send(counted).is_err() {
                            break;
                        }
                    }
                });
            match spawned {
                Ok(handle) => threads.push(handle),
                Err(err) => log::error!("could not start counting thread: {err}"),
            }
        }
        Self { batches: Some(batches), counted, threads }
    }

    pub fn is_empty(&self) -> bool {
        self.threads.is_empty()
    }

    /// Hands the batch back if no thread can take it.
    pub fn submit(&self, batch: Batch) -> Result<(), Batch> {
        match &self.batches {
            Some(batches) => batches.send(batch).map_err(|e| e.into_inner()),
            None => Err(batch),
        }
    }

    pub fn finished(&self) -> impl Iterator<Item = Counted> + '_ {
        self.counted.try_iter()
    }

    pub fn shutdown(&mut self) {
        drop(self.batches.take());
        for thread in self.threads.drain(..) {
            if thread.join().is_err() {
                log::error!("counting thread panicked");
            }
        }
    }
}

impl Drop for CountPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}
