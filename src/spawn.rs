//! Entity caps. Entities move, so nothing is tracked: every check counts
//! what is inside the territory right now.

use crate::counter::{Decision, Notice};
use crate::entity::EntityKind;
use crate::host::{Entities, Territories, Territory};
use crate::limits::Limits;
use crate::resolve::{Cap, Resolver, Subject};
use crate::store::RecordStore;
use crate::types::{EntityId, TerritoryId, V3};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpawnReason {
    Natural,
    Spawner,
    Breeding,
    Egg,
    /// Assembled from blocks: golems and withers.
    Built,
    Command,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Spawn<'a> {
    pub world: &'a str,
    pub pos: V3<i32>,
    pub kind: EntityKind,
    /// Set when the entity is already in the world. It is never counted against itself.
    pub entity: Option<EntityId>,
    pub reason: SpawnReason,
    /// Skips the check entirely.
    pub bypass: bool,
}
impl<'a> Spawn<'a> {
    pub fn new(world: &'a str, pos: V3<i32>, kind: EntityKind, reason: SpawnReason) -> Self {
        Self { world, pos, kind, entity: None, reason, bypass: false }
    }
    pub fn with_entity(self, entity: EntityId) -> Self {
        Self { entity: Some(entity), ..self }
    }
    pub fn bypassing(self) -> Self {
        Self { bypass: true, ..self }
    }
}

/// The first cap that is already full.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtCap {
    pub which: Subject,
    pub cap: i32,
}

#[derive(Debug, Clone)]
pub(crate) struct Provisional {
    pub entity: EntityId,
    pub kind: EntityKind,
    pub world: String,
    pub territory: TerritoryId,
}

impl<S: RecordStore> Limits<S> {
    /// Checks the kind's own cap, then each group holding it in configuration
    /// order, and reports the first one that is full.
    pub fn at_cap<H: Entities>(
        &mut self,
        host: &H,
        territory: &Territory,
        world: &str,
        kind: EntityKind,
        exclude: Option<EntityId>,
    ) -> Option<AtCap> {
        let record = self.records.get(&territory.id);
        let resolver = Resolver::new(&self.settings);

        let count = |matches: &dyn Fn(EntityKind) -> bool| -> i32 {
            let bounds = territory.bounds();
            territory
                .dimensions
                .iter()
                .flat_map(|(_, w)| host.entities_within(w, &bounds))
                .filter(|(id, k)| Some(*id) != exclude && matches(*k))
                .count() as i32
        };

        if let Cap::Limited(cap) = resolver.entity(record, world, kind) {
            if count(&|k| k == kind) >= cap {
                return Some(AtCap { which: Subject::Entity(kind), cap });
            }
        }
        for group in self.settings.groups_of(kind) {
            if let Cap::Limited(cap) = resolver.group(record, world, group) {
                if count(&|k| group.contains(k)) >= cap {
                    return Some(AtCap { which: Subject::Group(group.name.clone()), cap });
                }
            }
        }
        None
    }

    pub fn on_spawn<H: Territories + Entities>(&mut self, host: &mut H, spawn: &Spawn<'_>) -> Decision {
        let Some(territory) = host.territory_at(spawn.world, spawn.pos).cloned() else {
            return Decision::Allow;
        };
        if spawn.bypass {
            if let Some(entity) = spawn.entity.filter(|_| self.settings.options().tag_bypassed_entities) {
                host.tag_owner(entity, &territory.id);
            }
            return Decision::Allow;
        }
        if self.settings.options().async_structure_spawns
            && spawn.reason == SpawnReason::Built
            && spawn.kind.is_structure_built()
        {
            if let Some(entity) = spawn.entity {
                self.provisional.push(Provisional {
                    entity,
                    kind: spawn.kind,
                    world: spawn.world.to_owned(),
                    territory: territory.id.clone(),
                });
                return Decision::Allow;
            }
        }
        match self.at_cap(&*host, &territory, spawn.world, spawn.kind, spawn.entity) {
            Some(hit) => {
                log::debug!("{} denied {} spawn: {} at {}", territory.id, spawn.kind, hit.which, hit.cap);
                Decision::Deny(Notice { subject: hit.which, cap: hit.cap })
            }
            None => Decision::Allow,
        }
    }

    /// Removes provisionally allowed structure spawns that turned out to be over a cap.
    pub(crate) fn recheck_provisional<H: Territories + Entities>(&mut self, host: &mut H) {
        for spawn in std::mem::take(&mut self.provisional) {
            let Some(territory) = host.territory(&spawn.territory).cloned() else { continue };
            if let Some(hit) = self.at_cap(&*host, &territory, &spawn.world, spawn.kind, Some(spawn.entity)) {
                log::info!("removing {} built on {}: {} is at {}", spawn.kind, territory.id, hit.which, hit.cap);
                host.remove_entity(spawn.entity);
            }
        }
    }
}
