#![allow(dead_code)]

use mclimits::host::Territory;
use mclimits::store::MemoryStore;
use mclimits::types::{DimensionSet, TerritoryId, V3};
use mclimits::{Limits, Settings, World};

pub const SKY: &str = "sky";
pub const NETHER: &str = "sky_nether";
pub const END: &str = "sky_the_end";

pub fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Settings for tests: scans run every tick and count on the calling thread.
pub fn settings(extra: &str) -> Settings {
    let json = format!(r#"{{ "scan": {{ "workers": 0, "interval_ms": 0, "chunks_per_batch": 4 }}{extra} }}"#);
    Settings::from_json_str(&json).unwrap()
}

pub fn territory(id: &str, center: V3<i32>, range: i32) -> Territory {
    Territory {
        id: TerritoryId::new(id),
        game_mode: "BSkyBlock".into(),
        owner: Some(format!("owner-of-{id}")),
        center,
        protection_range: range,
        dimensions: DimensionSet::overworld(SKY).with_nether(NETHER),
    }
}

pub fn world_with(territories: &[&Territory]) -> World {
    let mut world = World::new();
    world.add_level(SKY, 0, 256);
    world.add_level(NETHER, 0, 128);
    world.add_level(END, 0, 256);
    for t in territories {
        world.add_territory((*t).clone());
    }
    world
}

pub fn limits(settings: Settings) -> Limits<MemoryStore> {
    Limits::new(settings, MemoryStore::new())
}
