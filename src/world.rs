use std::collections::{BTreeMap, HashMap, HashSet};

use crate::prelude::*;

/// One loaded world: paletted chunks plus the chunks that refuse to load.
#[derive(Debug)]
pub struct Level {
    min_y: i32,
    height: u32,
    chunks: HashMap<ChunkPos, ChunkSnapshot>,
    unloadable: HashSet<ChunkPos>,
}
impl Level {
    pub fn empty(min_y: i32, height: u32) -> Self {
        Self { min_y, height, chunks: HashMap::new(), unloadable: HashSet::new() }
    }
    fn chunk_mut(&mut self, pos: ChunkPos) -> &mut ChunkSnapshot {
        let (min_y, height) = (self.min_y, self.height);
        self.chunks.entry(pos).or_insert_with(|| ChunkSnapshot::empty(pos, min_y, height))
    }
}

#[derive(Debug, Clone)]
struct Entity {
    world: String,
    position: V3<f64>,
    kind: EntityKind,
    owner: Option<TerritoryId>,
}

/// Self-contained game state that answers every host query. Deleting a
/// territory forgets it entirely; an unowned territory stays addressable.
#[derive(Debug, Default)]
pub struct World {
    levels: HashMap<String, Level>,
    territories: BTreeMap<TerritoryId, Territory>,
    entities: SlotMap<Entity>,
}
impl World {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn add_level(&mut self, name: impl Into<String>, min_y: i32, height: u32) {
        self.levels.insert(name.into(), Level::empty(min_y, height));
    }
    /// Writes a block and returns what it replaced. Unknown worlds swallow the write.
    pub fn set_block(&mut self, world: &str, pos: V3<i32>, state: BlockState) -> BlockState {
        let Some(level) = self.levels.get_mut(world) else {
            log::warn!("set_block in unknown world {world}");
            return BlockState::AIR;
        };
        let chunk = pos.chunk();
        level.chunk_mut(chunk).set(pos.x - chunk.min_block_x(), pos.y, pos.z - chunk.min_block_z(), state)
    }
    /// Future loads of `chunk` in `world` fail.
    pub fn make_unloadable(&mut self, world: &str, chunk: ChunkPos) {
        if let Some(level) = self.levels.get_mut(world) {
            level.unloadable.insert(chunk);
        }
    }

    pub fn add_territory(&mut self, territory: Territory) {
        self.territories.insert(territory.id.clone(), territory);
    }
    pub fn delete_territory(&mut self, id: &TerritoryId) -> Option<Territory> {
        self.territories.remove(id)
    }
    pub fn set_owner(&mut self, id: &TerritoryId, owner: Option<String>) {
        if let Some(territory) = self.territories.get_mut(id) {
            territory.owner = owner;
        }
    }
    pub fn territories(&self) -> impl Iterator<Item = &Territory> {
        self.territories.values()
    }

    pub fn spawn_entity(&mut self, world: &str, position: V3<f64>, kind: EntityKind) -> EntityId {
        self.entities.insert(Entity { world: world.to_owned(), position, kind, owner: None })
    }
    pub fn entity_owner(&self, entity: EntityId) -> Option<&TerritoryId> {
        self.entities.get(entity)?.owner.as_ref()
    }
    pub fn entity_exists(&self, entity: EntityId) -> bool {
        self.entities.get(entity).is_some()
    }
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }
}

impl Territories for World {
    fn territory_at(&self, world: &str, pos: V3<i32>) -> Option<&Territory> {
        self.territories.values().find(|t| t.covers(world, pos))
    }
    fn territory(&self, id: &TerritoryId) -> Option<&Territory> {
        self.territories.get(id)
    }
    fn territory_of(&self, owner: &str, world: &str) -> Option<&Territory> {
        self.territories
            .values()
            .find(|t| t.owner.as_deref() == Some(owner) && t.dimensions.contains(world))
    }
    fn is_deleted(&self, id: &TerritoryId) -> bool {
        !self.territories.contains_key(id)
    }
    fn is_unowned(&self, id: &TerritoryId) -> bool {
        self.territories.get(id).map_or(false, |t| t.owner.is_none())
    }
}

impl Blocks for World {
    fn block_at(&self, world: &str, pos: V3<i32>) -> BlockState {
        let chunk = pos.chunk();
        self.levels
            .get(world)
            .and_then(|level| level.chunks.get(&chunk))
            .map_or(BlockState::AIR, |c| {
                c.get(pos.x - chunk.min_block_x(), pos.y, pos.z - chunk.min_block_z())
            })
    }
    fn load_chunk(&mut self, world: &str, chunk: ChunkPos) -> Option<ChunkSnapshot> {
        let level = self.levels.get(world)?;
        if level.unloadable.contains(&chunk) {
            return None;
        }
        Some(match level.chunks.get(&chunk) {
            Some(snapshot) => snapshot.clone(),
            None => ChunkSnapshot::empty(chunk, level.min_y, level.height),
        })
    }
}

impl Entities for World {
    fn entities_within(&self, world: &str, bounds: &Bounds) -> Vec<(EntityId, EntityKind)> {
        self.entities
            .iter()
            .filter(|(_, e)| e.world == world && bounds.contains_point(e.position.x, e.position.z))
            .map(|(id, e)| (id, e.kind))
            .collect()
    }
    fn tag_owner(&mut self, entity: EntityId, territory: &TerritoryId) {
        if let Some(e) = self.entities.get_mut(entity) {
            e.owner = Some(territory.clone());
        }
    }
    fn remove_entity(&mut self, entity: EntityId) {
        self.entities.release(entity);
    }
}
