//! Property tests for cap resolution and enforcement.

mod common;

use std::time::{Duration, Instant};

use common::*;
use mclimits::material::Material;
use mclimits::record::TerritoryRecord;
use mclimits::resolve::Resolver;
use mclimits::types::{TerritoryId, V3};
use mclimits::{Cap, Mutation, MutationKind, Poll, Settings, Subject};
use proptest::prelude::*;

fn layered_settings(default: Option<i32>, world: Option<i32>) -> Settings {
    let mut json = String::from("{");
    if let Some(cap) = default {
        json += &format!(r#""blocks": {{ "HOPPER": {cap} }},"#);
    }
    if let Some(cap) = world {
        json += &format!(r#""worlds": {{ "sky": {{ "blocks": {{ "HOPPER": {cap} }} }} }},"#);
    }
    json += r#""flush_threshold": 10 }"#;
    Settings::from_json_str(&json).unwrap()
}

fn cap_strategy() -> impl Strategy<Value = Option<i32>> {
    prop::option::of(0i32..1000)
}

#[derive(Debug, Clone, Copy)]
enum Step {
    Place(i32),
    Break(i32),
}

fn step_strategy() -> impl Strategy<Value = Step> {
    prop_oneof![
        3 => (1i32..30).prop_map(Step::Place),
        1 => (1i32..30).prop_map(Step::Break),
    ]
}

proptest! {
    /// No accepted placement ever takes the count past the cap in force at that moment.
    #[test]
    fn prop_count_never_exceeds_cap(
        cap in 0i32..12,
        offset in -5i32..5,
        steps in prop::collection::vec(step_strategy(), 1..80),
    ) {
        let t = territory("prop", V3(0, 64, 0), 40);
        let world = world_with(&[&t]);
        let mut limits = limits(settings(&format!(r#", "blocks": {{ "HOPPER": {cap} }}"#)));
        limits.set_offset(&t, &Subject::Block(Material::HOPPER), offset);
        let limit = cap + offset;
        for step in steps {
            let count = limits.current_counts(&t.id).get(&Material::HOPPER).copied().unwrap_or(0);
            match step {
                Step::Place(x) => {
                    let allowed = limits
                        .on_mutation(&world, &Mutation::place(SKY, V3(x, 70, 3), Material::HOPPER))
                        .is_allowed();
                    prop_assert_eq!(allowed, count + 1 <= limit);
                }
                Step::Break(x) => {
                    let broken = Mutation::new(MutationKind::Break, SKY, V3(x, 70, 3), Material::HOPPER.into(), Material::AIR.into());
                    prop_assert!(limits.on_mutation(&world, &broken).is_allowed());
                }
            }
            let after = limits.current_counts(&t.id).get(&Material::HOPPER).copied().unwrap_or(0);
            prop_assert!(after >= 0);
            prop_assert!(after <= limit.max(0));
        }
    }

    /// The territory layer wins whatever the lower layers say.
    #[test]
    fn prop_territory_layer_wins(
        granted in 0i32..1000,
        default in cap_strategy(),
        world in cap_strategy(),
    ) {
        let mut record = TerritoryRecord::new(TerritoryId::new("t"), "BSkyBlock");
        record.grant(&Subject::Block(Material::HOPPER), granted);
        let settings = layered_settings(default, world);
        let resolver = Resolver::new(&settings);
        prop_assert_eq!(resolver.block(Some(&record), "sky", Material::HOPPER), Cap::Limited(granted));
        prop_assert_eq!(resolver.block(Some(&record), "elsewhere", Material::HOPPER), Cap::Limited(granted));
    }

    /// Without a grant the world override beats the default.
    #[test]
    fn prop_world_layer_beats_default(default in cap_strategy(), world in 0i32..1000) {
        let settings = layered_settings(default, Some(world));
        let resolver = Resolver::new(&settings);
        prop_assert_eq!(resolver.block(None, "sky", Material::HOPPER), Cap::Limited(world));
        let elsewhere = default.map_or(Cap::Unlimited, Cap::Limited);
        prop_assert_eq!(resolver.block(None, "elsewhere", Material::HOPPER), elsewhere);
    }

    /// An offset shifts any existing cap by exactly its value and never invents one.
    #[test]
    fn prop_offsets_add(default in cap_strategy(), world in cap_strategy(), delta in -500i32..500) {
        let settings = layered_settings(default, world);
        let resolver = Resolver::new(&settings);
        let mut record = TerritoryRecord::new(TerritoryId::new("t"), "BSkyBlock");
        let plain = resolver.block(Some(&record), "sky", Material::HOPPER);
        record.set_offset(&Subject::Block(Material::HOPPER), delta);
        let shifted = resolver.block(Some(&record), "sky", Material::HOPPER);
        match plain {
            Cap::Limited(cap) => prop_assert_eq!(shifted, Cap::Limited(cap + delta)),
            Cap::Unlimited => prop_assert_eq!(shifted, Cap::Unlimited),
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// After a recount the stored counts are exactly what is in the world,
    /// whatever the incremental path had recorded.
    #[test]
    fn prop_recount_replaces(recorded in 0i32..20, present in prop::collection::btree_set((-20i32..20, 0i32..100), 0..25)) {
        let t = territory("scan", V3(0, 64, 0), 20);
        let mut world = world_with(&[&t]);
        let mut limits = limits(settings(r#", "blocks": { "HOPPER": 1000 }"#));
        for i in 0..recorded {
            limits.on_mutation(&world, &Mutation::place(SKY, V3(i - 10, 200, 7), Material::HOPPER));
        }
        for (x, y) in &present {
            world.set_block(SKY, V3(*x, *y, -5), Material::HOPPER.into());
        }
        let pending = limits.request_recount(&t);
        let start = Instant::now();
        for i in 0..64u64 {
            limits.tick(&mut world, start + Duration::from_millis(i));
        }
        let Poll::Ready(result) = pending.poll() else { panic!("recount did not finish") };
        let expected = present.len() as i32;
        prop_assert_eq!(result.counts.get(&Material::HOPPER).copied().unwrap_or(0), expected);
        prop_assert_eq!(limits.current_counts(&t.id).get(&Material::HOPPER).copied().unwrap_or(0), expected);
    }
}
