//! Cap resolution.
//!
//! A cap comes from the first layer that defines one, territory grant first,
//! then the world override, then the server default. The territory's offset
//! for the subject is added to whichever layer won. A subject no layer caps is
//! unlimited, whatever its offset says; a cap of zero with a positive offset is
//! a real cap.

use std::collections::HashSet;

use crate::entity::{EntityGroup, EntityKind};
use crate::material::Material;
use crate::record::TerritoryRecord;
use crate::settings::Settings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cap {
    Unlimited,
    Limited(i32),
}
impl Cap {
    /// Whether `count` existing units leave room for `units` more.
    pub fn admits(self, count: i32, units: i32) -> bool {
        match self {
            Cap::Unlimited => true,
            Cap::Limited(cap) => count.saturating_add(units) <= cap,
        }
    }
}
impl std::fmt::Display for Cap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Cap::Unlimited => f.write_str("unlimited"),
            Cap::Limited(cap) => write!(f, "{cap}"),
        }
    }
}

/// Anything a cap can be attached to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Subject {
    Block(Material),
    Entity(EntityKind),
    Group(String),
}
impl std::fmt::Display for Subject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Subject::Block(m) => m.fmt(f),
            Subject::Entity(k) => k.fmt(f),
            Subject::Group(g) => f.write_str(g),
        }
    }
}

fn layered(territory: Option<i32>, world: Option<i32>, default: Option<i32>, offset: i32) -> Cap {
    match territory.or(world).or(default) {
        Some(cap) => Cap::Limited(cap.saturating_add(offset)),
        None => Cap::Unlimited,
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    settings: &'a Settings,
}

impl<'a> Resolver<'a> {
    pub fn new(settings: &'a Settings) -> Self {
        Self { settings }
    }

    pub fn block(&self, record: Option<&TerritoryRecord>, world: &str, material: Material) -> Cap {
        layered(
            record.and_then(|r| r.block_cap(material)),
            self.settings.world_block_cap(world, material),
            self.settings.default_block_cap(material),
            record.map_or(0, |r| r.offset(&Subject::Block(material))),
        )
    }

    pub fn entity(&self, record: Option<&TerritoryRecord>, world: &str, kind: EntityKind) -> Cap {
        layered(
            record.and_then(|r| r.entity_cap(kind)),
            self.settings.world_entity_cap(world, kind),
            self.settings.default_entity_cap(kind),
            record.map_or(0, |r| r.offset(&Subject::Entity(kind))),
        )
    }

    pub fn group(&self, record: Option<&TerritoryRecord>, world: &str, group: &EntityGroup) -> Cap {
        layered(
            record.and_then(|r| r.group_cap(&group.name)),
            self.settings.world_group_cap(world, &group.name),
            Some(group.default_cap),
            record.map_or(0, |r| r.offset(&Subject::Group(group.name.clone()))),
        )
    }

    /// Cap for any subject. Unknown groups are unlimited.
    pub fn subject(&self, record: Option<&TerritoryRecord>, world: &str, subject: &Subject) -> Cap {
        match subject {
            Subject::Block(m) => self.block(record, world, *m),
            Subject::Entity(k) => self.entity(record, world, *k),
            Subject::Group(name) => match self.settings.group(name) {
                Some(group) => self.group(record, world, group),
                None => Cap::Unlimited,
            },
        }
    }

    /// Materials capped at any layer in any of `worlds`.
    pub fn limited_materials<'w>(
        &self,
        record: Option<&TerritoryRecord>,
        worlds: impl IntoIterator<Item = &'w str>,
    ) -> HashSet<Material> {
        let mut limited: HashSet<Material> = record.into_iter().flat_map(|r| r.block_caps()).collect();
        for world in worlds {
            limited.extend(self.settings.capped_materials(world));
        }
        limited
    }

    pub fn is_limited<'w>(
        &self,
        record: Option<&TerritoryRecord>,
        worlds: impl IntoIterator<Item = &'w str>,
        material: Material,
    ) -> bool {
        record.map_or(false, |r| r.block_cap(material).is_some())
            || self.settings.default_block_cap(material).is_some()
            || worlds.into_iter().any(|w| self.settings.world_block_cap(w, material).is_some())
    }
}
