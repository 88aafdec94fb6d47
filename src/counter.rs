//! Live block counting on the tick thread.
//!
//! Every world mutation arrives as one [`Mutation`]; its kind decides
//! whether it adds or removes. Only kinds that bear a cap somewhere for the
//! territory are tracked.

use crate::dependents::dependents_of;
use crate::host::{Blocks, Territories, Territory};
use crate::limits::Limits;
use crate::material::BlockState;
use crate::resolve::{Cap, Resolver, Subject};
use crate::store::RecordStore;
use crate::types::{Dimension, V3};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationKind {
    Place,
    Grow,
    Form,
    Spread,
    Break,
    Burn,
    Explode,
    Fade,
    LeafDecay,
    Flow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    Add,
    Remove,
}

impl MutationKind {
    pub const fn effect(self) -> Effect {
        match self {
            MutationKind::Place | MutationKind::Grow | MutationKind::Form | MutationKind::Spread => Effect::Add,
            MutationKind::Break
            | MutationKind::Burn
            | MutationKind::Explode
            | MutationKind::Fade
            | MutationKind::LeafDecay
            | MutationKind::Flow => Effect::Remove,
        }
    }
}

/// One cell changing from `before` to `after`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mutation<'a> {
    pub kind: MutationKind,
    pub world: &'a str,
    pub pos: V3<i32>,
    pub before: BlockState,
    pub after: BlockState,
}
impl<'a> Mutation<'a> {
    pub fn new(kind: MutationKind, world: &'a str, pos: V3<i32>, before: BlockState, after: BlockState) -> Self {
        Self { kind, world, pos, before, after }
    }
    /// A block placed into an empty cell.
    pub fn place(world: &'a str, pos: V3<i32>, state: impl Into<BlockState>) -> Self {
        Self::new(MutationKind::Place, world, pos, BlockState::AIR, state.into())
    }
    /// A block broken, leaving air.
    pub fn broken(world: &'a str, pos: V3<i32>, state: impl Into<BlockState>) -> Self {
        Self::new(MutationKind::Break, world, pos, state.into(), BlockState::AIR)
    }
}

/// Why something was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub subject: Subject,
    pub cap: i32,
}
impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} is limited to {} on this island", self.subject, self.cap)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(Notice),
}
impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

impl<S: RecordStore> Limits<S> {
    /// Accepts or refuses a block change and keeps the territory's counts in step.
    pub fn on_mutation<H: Territories + Blocks>(&mut self, host: &H, mutation: &Mutation<'_>) -> Decision {
        let Some(territory) = host.territory_at(mutation.world, mutation.pos) else {
            return Decision::Allow;
        };
        if self.is_center(territory, mutation.world, mutation.pos) {
            return Decision::Allow;
        }
        match mutation.kind.effect() {
            Effect::Add => self.add(territory, mutation),
            Effect::Remove => {
                let mut changed = self.subtract(territory, mutation.before);
                for (pos, state) in dependents_of(host, mutation.world, mutation.pos) {
                    if !self.is_center(territory, mutation.world, pos) {
                        changed |= self.subtract(territory, state);
                    }
                }
                if changed {
                    self.records.note_change(&territory.id);
                }
                Decision::Allow
            }
        }
    }

    fn is_center(&self, territory: &Territory, world: &str, pos: V3<i32>) -> bool {
        self.settings.options().ignore_center_block
            && pos == territory.center
            && territory.dimensions.dimension_of(world) == Some(Dimension::Overworld)
    }

    fn add(&mut self, territory: &Territory, mutation: &Mutation<'_>) -> Decision {
        let (before, after) = (mutation.before, mutation.after);
        if after.is_exempt() {
            if self.subtract(territory, before) {
                self.records.note_change(&territory.id);
            }
            return Decision::Allow;
        }
        let kind = after.canonical();
        let replaced = (!before.is_exempt()).then(|| before.canonical());
        let units = match replaced {
            Some(old) if old == kind => after.units() - before.units(),
            _ => after.units(),
        };

        let record = self.records.get(&territory.id);
        let resolver = Resolver::new(&self.settings);
        let worlds = territory.dimensions.iter().map(|(_, w)| w);
        let limited = resolver.is_limited(record, worlds, kind);
        if limited && units > 0 {
            let cap = resolver.block(record, mutation.world, kind);
            let count = record.map_or(0, |r| r.count(kind));
            if let Cap::Limited(limit) = cap {
                if !cap.admits(count, units) {
                    log::debug!("{} denied {kind} at {count}/{limit}", territory.id);
                    return Decision::Deny(Notice { subject: Subject::Block(kind), cap: limit });
                }
            }
        }

        let mut changed = match replaced {
            Some(old) if old != kind => self.subtract(territory, before),
            _ => false,
        };
        if limited && units != 0 {
            let record = self.records.get_or_create(&territory.id, &territory.game_mode);
            if units > 0 {
                record.add(kind, units);
            } else {
                record.remove(kind, -units);
            }
            changed = true;
        }
        if changed {
            self.records.note_change(&territory.id);
        }
        Decision::Allow
    }

    /// Takes one cell's worth away. Returns whether anything changed.
    fn subtract(&mut self, territory: &Territory, state: BlockState) -> bool {
        if state.is_exempt() {
            return false;
        }
        let kind = state.canonical();
        match self.records.get_mut(&territory.id) {
            Some(record) if record.count(kind) > 0 => {
                record.remove(kind, state.units());
                true
            }
            _ => false,
        }
    }
}
