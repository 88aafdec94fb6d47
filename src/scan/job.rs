use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Instant;

use crossbeam_channel::Sender;

use super::ScanResult;
use crate::host::Territory;
use crate::material::Material;
use crate::types::{Bounds, ChunkPos, Dimension, TerritoryId, V3};

/// What a recount looks at. Shared read-only with the counting threads.
#[derive(Debug, Clone)]
pub struct ScanArea {
    pub bounds: Bounds,
    /// Overworld cell left out of every tally.
    pub skip: Option<V3<i32>>,
    pub limited: HashSet<Material>,
}
impl ScanArea {
    pub fn of(territory: &Territory, ignore_center_block: bool, limited: HashSet<Material>) -> Self {
        Self {
            bounds: territory.bounds(),
            skip: ignore_center_block.then_some(territory.center),
            limited,
        }
    }
}

pub(crate) struct ScanJob {
    pub territory: TerritoryId,
    pub game_mode: String,
    pub area: Arc<ScanArea>,
    pub worlds: Vec<(Dimension, String)>,
    pub chunks: VecDeque<ChunkPos>,
    pub tally: HashMap<Material, i32>,
    pub started_at: Option<Instant>,
    pub deferred: Sender<ScanResult>,
    pub ticket: u64,
    /// A batch is out on the counting threads.
    pub in_flight: bool,
}

impl ScanJob {
    pub fn new(territory: &Territory, area: ScanArea, ticket: u64, deferred: Sender<ScanResult>) -> Self {
        let chunks = area.bounds.chunks().into();
        Self {
            territory: territory.id.clone(),
            game_mode: territory.game_mode.clone(),
            area: Arc::new(area),
            worlds: territory.dimensions.iter().map(|(d, w)| (d, w.to_owned())).collect(),
            chunks,
            tally: HashMap::new(),
            started_at: None,
            deferred,
            ticket,
            in_flight: false,
        }
    }
    pub fn is_done(&self) -> bool {
        self.chunks.is_empty() && !self.in_flight
    }
    pub fn merge(&mut self, tally: HashMap<Material, i32>) {
        for (material, n) in tally {
            *self.tally.entry(material).or_insert(0) += n;
        }
    }
}
