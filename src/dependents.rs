//! Blocks that drop when the block they rest on goes away.
//!
//! Only vertical support is modelled. The dependents of a removed cell are
//! always in the same column, and so in the same territory.

use crate::host::Blocks;
use crate::material::{BlockState, Material};
use crate::types::V3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Support {
    /// Sits on the block below and pops off alone.
    Floor,
    /// Grows upward; everything above the break goes with it.
    Column,
    /// Hangs from the block above; everything below the break goes with it.
    Hanging,
}

const SUPPORT: &[(Material, Support)] = &[
    (Material::REDSTONE_WIRE, Support::Floor),
    (Material::REPEATER, Support::Floor),
    (Material::COMPARATOR, Support::Floor),
    (Material::REDSTONE_TORCH, Support::Floor),
    (Material::TORCH, Support::Floor),
    (Material::SOUL_TORCH, Support::Floor),
    (Material::RAIL, Support::Floor),
    (Material::POWERED_RAIL, Support::Floor),
    (Material::LEVER, Support::Floor),
    (Material::STONE_BUTTON, Support::Floor),
    (Material::OAK_SIGN, Support::Floor),
    (Material::SPRUCE_SIGN, Support::Floor),
    (Material::BIRCH_SIGN, Support::Floor),
    (Material::WHITE_BANNER, Support::Floor),
    (Material::RED_BANNER, Support::Floor),
    (Material::WHEAT, Support::Floor),
    (Material::CARROTS, Support::Floor),
    (Material::POTATOES, Support::Floor),
    (Material::MELON_STEM, Support::Floor),
    (Material::PUMPKIN_STEM, Support::Floor),
    (Material::OAK_SAPLING, Support::Floor),
    (Material::SHORT_GRASS, Support::Floor),
    (Material::SUGAR_CANE, Support::Column),
    (Material::CACTUS, Support::Column),
    (Material::BAMBOO, Support::Column),
    (Material::KELP, Support::Column),
    (Material::TWISTING_VINES, Support::Column),
    (Material::CHORUS_PLANT, Support::Column),
    (Material::WEEPING_VINES, Support::Hanging),
    (Material::CAVE_VINES, Support::Hanging),
];

fn support(state: BlockState) -> Option<Support> {
    let kind = state.canonical();
    SUPPORT.iter().find(|(m, _)| *m == kind).map(|(_, s)| *s)
}

/// Blocks that lose their support when the cell at `pos` is cleared. The
/// removed block itself is not included.
pub fn dependents_of(blocks: &impl Blocks, world: &str, pos: V3<i32>) -> Vec<(V3<i32>, BlockState)> {
    let mut dependents = vec![];

    let above = pos.up();
    let state = blocks.block_at(world, above);
    match support(state) {
        Some(Support::Floor) => dependents.push((above, state)),
        Some(Support::Column) => walk(blocks, world, above, 1, state.canonical(), &mut dependents),
        _ => {}
    }

    let below = pos.offset(0, -1, 0);
    let state = blocks.block_at(world, below);
    if support(state) == Some(Support::Hanging) {
        walk(blocks, world, below, -1, state.canonical(), &mut dependents);
    }
    dependents
}

fn walk(
    blocks: &impl Blocks,
    world: &str,
    mut pos: V3<i32>,
    step: i32,
    kind: Material,
    out: &mut Vec<(V3<i32>, BlockState)>,
) {
    loop {
        let state = blocks.block_at(world, pos);
        if state.canonical() != kind {
            break;
        }
        out.push((pos, state));
        pos = pos.offset(0, step, 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::World;

    fn world() -> World {
        let mut world = World::new();
        world.add_level("sky", 0, 64);
        world
    }

    #[test]
    fn dust_on_top_drops() {
        let mut world = world();
        world.set_block("sky", V3(0, 10, 0), Material::STONE.into());
        world.set_block("sky", V3(0, 11, 0), Material::REDSTONE_WIRE.into());
        world.set_block("sky", V3(0, 9, 0), Material::REDSTONE_WIRE.into());
        let deps = dependents_of(&world, "sky", V3(0, 10, 0));
        assert_eq!(deps, [(V3(0, 11, 0), BlockState::new(Material::REDSTONE_WIRE))]);
    }

    #[test]
    fn whole_cane_column_drops() {
        let mut world = world();
        world.set_block("sky", V3(2, 10, 2), Material::DIRT.into());
        for y in 11..14 {
            world.set_block("sky", V3(2, y, 2), Material::SUGAR_CANE.into());
        }
        world.set_block("sky", V3(2, 14, 2), Material::TORCH.into());
        assert_eq!(dependents_of(&world, "sky", V3(2, 10, 2)).len(), 3);
        assert_eq!(dependents_of(&world, "sky", V3(2, 12, 2)).len(), 1);
    }

    #[test]
    fn kelp_segments_count_as_kelp() {
        let mut world = world();
        world.set_block("sky", V3(0, 5, 0), Material::KELP_PLANT.into());
        world.set_block("sky", V3(0, 6, 0), Material::KELP_PLANT.into());
        world.set_block("sky", V3(0, 7, 0), Material::KELP.into());
        assert_eq!(dependents_of(&world, "sky", V3(0, 4, 0)).len(), 3);
    }

    #[test]
    fn hanging_vines_drop_downward() {
        let mut world = world();
        world.set_block("sky", V3(0, 20, 0), Material::WEEPING_VINES_PLANT.into());
        world.set_block("sky", V3(0, 19, 0), Material::WEEPING_VINES.into());
        let deps = dependents_of(&world, "sky", V3(0, 21, 0));
        assert_eq!(deps.len(), 2);
    }
}
