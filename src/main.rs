use std::time::*;

use mclimits::host::Territory;
use mclimits::material::{BlockState, Material};
use mclimits::store::NbtStore;
use mclimits::types::{DimensionSet, TerritoryId, V3};
use mclimits::{Limits, Mutation, Poll, Settings, World};

const TICK: Duration = Duration::from_millis(50);

/// A couple of islands with some limited blocks already placed.
fn demo_world(settings: &Settings) -> World {
    let mut world = World::new();
    world.add_level("bskyblock_world", -64, 384);
    world.add_level("bskyblock_world_nether", 0, 256);
    let game_mode = settings.game_modes().first().map_or("BSkyBlock", String::as_str);
    for (i, owner) in ["alex", "steve"].into_iter().enumerate() {
        let center = V3(i as i32 * 400, 64, 0);
        world.add_territory(Territory {
            id: TerritoryId::new(format!("{game_mode}-{owner}")),
            game_mode: game_mode.to_owned(),
            owner: Some(owner.to_owned()),
            center,
            protection_range: 50,
            dimensions: DimensionSet::overworld("bskyblock_world").with_nether("bskyblock_world_nether"),
        });
        for n in 0..(12 + i as i32 * 7) {
            let pos = center.offset(n % 9 - 4, 1 + n / 9, 3);
            world.set_block("bskyblock_world", pos, BlockState::new(Material::HOPPER));
            world.set_block("bskyblock_world_nether", pos, BlockState::new(Material::CHEST));
        }
    }
    world
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let mut args = std::env::args_os();

    let settings = match args.nth(1) {
        Some(path) => Settings::from_file(path)?,
        None => Settings::from_env(),
    };
    let dir = args.next().unwrap_or_else(|| "limits".into());
    let store = NbtStore::open(dir)?;
    let mut world = demo_world(&settings);

    let mut limits = Limits::new(settings, store);
    let active: Vec<String> = limits.settings().game_modes().to_vec();
    let removed = limits.cleanup_orphans(&active.iter().map(String::as_str).collect::<Vec<_>>());
    if removed > 0 {
        log::info!("removed {removed} orphaned limits records");
    }

    let territories: Vec<Territory> = world.territories().cloned().collect();
    let mut pending = vec![];
    for territory in &territories {
        pending.push((territory.id.clone(), limits.request_recount(territory)));
    }

    let starttime = Instant::now();
    let mut tick = 0u32;
    while !pending.is_empty() {
        let next_tick_due = starttime + tick * TICK;
        if let Some(wait) = next_tick_due.checked_duration_since(Instant::now()) {
            std::thread::sleep(wait);
        }
        limits.tick(&mut world, Instant::now());
        tick += 1;

        pending.retain(|(id, result)| match result.poll() {
            Poll::Ready(result) => {
                log::info!("recount of {id}: {:?} {:?}", result.state, result.counts);
                false
            }
            Poll::Abandoned => {
                log::warn!("recount of {id} was abandoned");
                false
            }
            Poll::Waiting => true,
        });
    }
    if let Some(average) = limits.average_scan_time() {
        log::info!("average recount took {average:?} over {tick} ticks");
    }

    for territory in &territories {
        let pos = territory.center.offset(6, 1, -6);
        let decision = limits.on_mutation(&world, &Mutation::place("bskyblock_world", pos, Material::HOPPER));
        log::info!("placing another hopper on {}: {decision:?}", territory.id);
    }

    limits.shutdown();
    Ok(())
}
