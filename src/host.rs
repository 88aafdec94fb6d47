//! What the limits core needs from the game: territory geometry and
//! ownership, block access and live entities.

use crate::chunk::ChunkSnapshot;
use crate::entity::EntityKind;
use crate::material::BlockState;
use crate::types::{Bounds, ChunkPos, DimensionSet, EntityId, TerritoryId, V3};

/// A claimed region. The protected rectangle is `center ± protection_range`
/// and applies at the same coordinates in every paired dimension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Territory {
    pub id: TerritoryId,
    pub game_mode: String,
    pub owner: Option<String>,
    pub center: V3<i32>,
    pub protection_range: i32,
    pub dimensions: DimensionSet,
}
impl Territory {
    pub fn bounds(&self) -> Bounds {
        Bounds::around(self.center, self.protection_range)
    }
    /// Whether `pos` in `world` lies inside this territory.
    pub fn covers(&self, world: &str, pos: V3<i32>) -> bool {
        self.dimensions.contains(world) && self.bounds().contains(pos.x, pos.z)
    }
}

pub trait Territories {
    fn territory_at(&self, world: &str, pos: V3<i32>) -> Option<&Territory>;
    fn territory(&self, id: &TerritoryId) -> Option<&Territory>;
    fn territory_of(&self, owner: &str, world: &str) -> Option<&Territory>;
    fn is_deleted(&self, id: &TerritoryId) -> bool;
    fn is_unowned(&self, id: &TerritoryId) -> bool;
}

pub trait Blocks {
    fn block_at(&self, world: &str, pos: V3<i32>) -> BlockState;
    /// Snapshot of a chunk, generating it if needed. `None` when the chunk
    /// cannot be loaded at all.
    fn load_chunk(&mut self, world: &str, chunk: ChunkPos) -> Option<ChunkSnapshot>;
}

pub trait Entities {
    fn entities_within(&self, world: &str, bounds: &Bounds) -> Vec<(EntityId, EntityKind)>;
    fn tag_owner(&mut self, entity: EntityId, territory: &TerritoryId);
    fn remove_entity(&mut self, entity: EntityId);
}

/// Everything the façade consults while ticking.
pub trait Host: Territories + Blocks + Entities {}
impl<T: Territories + Blocks + Entities> Host for T {}
