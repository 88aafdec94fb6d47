mod common;

use std::collections::HashMap;
use std::time::{Duration, Instant};

use common::*;
use mclimits::material::{BlockState, Material};
use mclimits::store::{MemoryStore, NbtStore, RecordStore};
use mclimits::types::{ChunkPos, DimensionSet, V3};
use mclimits::{Limits, Mutation, Poll, ScanState, Settings, Subject, World};

const HOPPERS: &str = r#", "blocks": { "HOPPER": 100, "CHEST": 100 }"#;

fn drive<S: RecordStore>(limits: &mut Limits<S>, world: &mut World, pending: &mclimits::Pending) -> Poll {
    let start = Instant::now();
    for i in 0..10_000u32 {
        limits.tick(world, start + Duration::from_millis(i as u64));
        match pending.poll() {
            Poll::Waiting => {}
            done => return done,
        }
    }
    panic!("recount never finished");
}

#[test]
fn scan_replaces_incremental_counts() {
    init_logs();
    let t = territory("replace", V3(0, 64, 0), 24);
    let mut world = world_with(&[&t]);
    let mut limits = limits(settings(HOPPERS));

    // drifted counts: seven hoppers recorded, only two really there
    for x in 1..=7 {
        limits.on_mutation(&world, &Mutation::place(SKY, V3(x, 70, 0), Material::HOPPER));
    }
    world.set_block(SKY, V3(-20, 10, 20), Material::HOPPER.into());
    world.set_block(SKY, V3(23, 250, -24), Material::HOPPER.into());
    world.set_block(NETHER, V3(5, 5, 5), Material::CHEST.into());
    // outside the bounds
    world.set_block(SKY, V3(24, 70, 0), Material::HOPPER.into());
    // center block
    world.set_block(SKY, t.center, Material::HOPPER.into());

    let pending = limits.request_recount(&t);
    let Poll::Ready(result) = drive(&mut limits, &mut world, &pending) else {
        panic!("recount abandoned");
    };
    assert_eq!(result.state, ScanState::Available);
    let expected: HashMap<Material, i32> = [(Material::HOPPER, 2), (Material::CHEST, 1)].into_iter().collect();
    assert_eq!(result.counts, expected);
    assert_eq!(limits.current_counts(&t.id), expected);
    let stored = limits.store().peek(&t.id).unwrap();
    assert_eq!(stored.count(Material::HOPPER), 2);
    assert!(!stored.is_dirty());
    assert!(limits.average_scan_time().is_some());
    assert_eq!(limits.queue_depth(), 0);
}

#[test]
fn duplicate_requests_share_one_job() {
    let t = territory("dedup", V3(0, 64, 0), 24);
    let mut world = world_with(&[&t]);
    let mut limits = limits(settings(HOPPERS));

    let first = limits.request_recount(&t);
    let second = limits.request_recount(&t);
    assert_eq!(limits.queue_depth(), 1);
    match second.poll() {
        Poll::Ready(result) => assert_eq!(result.state, ScanState::InProgress),
        other => panic!("expected an immediate answer, got {other:?}"),
    }
    limits.tick(&mut world, Instant::now());
    let third = limits.request_recount(&t);
    assert!(matches!(third.poll(), Poll::Ready(r) if r.state == ScanState::InProgress));
    assert!(matches!(drive(&mut limits, &mut world, &first), Poll::Ready(r) if r.state == ScanState::Available));
    assert_eq!(limits.queue_depth(), 0);
}

#[test]
fn one_scan_runs_at_a_time() {
    let a = territory("a", V3(0, 64, 0), 24);
    let b = territory("b", V3(500, 64, 0), 24);
    let mut world = world_with(&[&a, &b]);
    let mut limits = limits(settings(HOPPERS));
    let pa = limits.request_recount(&a);
    let pb = limits.request_recount(&b);
    assert_eq!(limits.queue_depth(), 2);
    let now = Instant::now();
    // 4x4 chunks at 4 per batch: a takes four passes, b waits for it
    for i in 0..4 {
        limits.tick(&mut world, now + Duration::from_millis(i));
        assert_eq!(pb.poll(), Poll::Waiting);
    }
    assert!(matches!(pa.poll(), Poll::Ready(_)));
    assert!(matches!(drive(&mut limits, &mut world, &pb), Poll::Ready(_)));
}

#[test]
fn timed_out_scan_commits_nothing() {
    init_logs();
    let t = territory("slow", V3(0, 64, 0), 200);
    let mut world = world_with(&[&t]);
    let mut limits = limits(settings(HOPPERS));
    for x in 1..=3 {
        limits.on_mutation(&world, &Mutation::place(SKY, V3(x, 70, 0), Material::HOPPER));
    }
    let before = limits.current_counts(&t.id);

    let pending = limits.request_recount(&t);
    let start = Instant::now();
    limits.tick(&mut world, start);
    assert_eq!(pending.poll(), Poll::Waiting);
    limits.tick(&mut world, start + Duration::from_secs(301));
    match pending.poll() {
        Poll::Ready(result) => assert_eq!(result.state, ScanState::Timeout),
        other => panic!("expected a timeout, got {other:?}"),
    }
    assert_eq!(limits.current_counts(&t.id), before);
    assert_eq!(limits.queue_depth(), 0);
    assert!(limits.average_scan_time().is_none());
}

#[test]
fn deleting_the_territory_abandons_the_scan_and_the_record() {
    init_logs();
    let t = territory("doomed", V3(0, 64, 0), 100);
    let mut world = world_with(&[&t]);
    let mut limits = limits(settings(HOPPERS));
    limits.set_offset(&t, &Subject::Block(Material::HOPPER), 5);
    assert!(limits.store().exists(&t.id).unwrap());

    let pending = limits.request_recount(&t);
    let now = Instant::now();
    limits.tick(&mut world, now);
    assert_eq!(pending.poll(), Poll::Waiting);

    world.delete_territory(&t.id);
    limits.tick(&mut world, now + Duration::from_millis(50));
    assert_eq!(pending.poll(), Poll::Abandoned);
    assert!(!limits.store().exists(&t.id).unwrap());
    assert!(limits.record(&t.id).is_none());
}

#[test]
fn unowned_territory_abandons_the_scan_but_keeps_the_record() {
    let t = territory("ownerless", V3(0, 64, 0), 100);
    let mut world = world_with(&[&t]);
    let mut limits = limits(settings(HOPPERS));
    limits.set_offset(&t, &Subject::Block(Material::HOPPER), 5);

    let pending = limits.request_recount(&t);
    limits.tick(&mut world, Instant::now());
    world.set_owner(&t.id, None);
    limits.tick(&mut world, Instant::now());
    assert_eq!(pending.poll(), Poll::Abandoned);
    assert!(limits.store().exists(&t.id).unwrap());
}

#[test]
fn unloadable_chunks_are_skipped() {
    let t = territory("holes", V3(0, 64, 0), 24);
    let mut world = world_with(&[&t]);
    world.set_block(SKY, V3(1, 70, 1), Material::HOPPER.into());
    world.set_block(SKY, V3(-20, 70, 1), Material::HOPPER.into());
    world.make_unloadable(SKY, ChunkPos::new(-2, 0));
    let mut limits = limits(settings(HOPPERS));
    let pending = limits.request_recount(&t);
    let Poll::Ready(result) = drive(&mut limits, &mut world, &pending) else {
        panic!("recount abandoned");
    };
    assert_eq!(result.counts[&Material::HOPPER], 1);
}

#[test]
fn granted_caps_join_the_scanned_set() {
    let t = territory("partial", V3(0, 64, 0), 24);
    let mut world = world_with(&[&t]);
    let mut limits = limits(settings(HOPPERS));
    limits.apply_permissions(&t, ["bskyblock.island.limit.beacon.3"]);
    limits.on_mutation(&world, &Mutation::place(SKY, V3(1, 70, 1), Material::BEACON));
    world.set_block(SKY, V3(1, 70, 1), Material::BEACON.into());
    world.set_block(SKY, V3(2, 70, 1), BlockState::double(Material::STONE_SLAB));

    let pending = limits.request_recount(&t);
    drive(&mut limits, &mut world, &pending);
    let counts = limits.current_counts(&t.id);
    assert_eq!(counts[&Material::BEACON], 1);
    assert_eq!(counts.get(&Material::STONE_SLAB), None);
}

#[test]
fn counting_threads_produce_the_same_tally() {
    init_logs();
    let t = territory("threads", V3(8, 64, 8), 40);
    let mut world = world_with(&[&t]);
    for x in -30..30 {
        world.set_block(SKY, V3(x, 100, x / 2), Material::HOPPER.into());
    }
    let json = r#"{ "blocks": { "HOPPER": 1000 }, "scan": { "workers": 2, "interval_ms": 0, "chunks_per_batch": 3 } }"#;
    let mut limits = Limits::new(Settings::from_json_str(json).unwrap(), MemoryStore::new());
    let pending = limits.request_recount(&t);
    let start = Instant::now();
    let mut result = None;
    for i in 0..5_000u64 {
        limits.tick(&mut world, start + Duration::from_millis(i));
        if let Poll::Ready(r) = pending.wait(Duration::from_millis(1)) {
            result = Some(r);
            break;
        }
    }
    let result = result.expect("threaded recount finished");
    assert_eq!(result.counts[&Material::HOPPER], 60);
    limits.shutdown();
}

#[test]
fn shutdown_abandons_pending_scans() {
    let t = territory("bye", V3(0, 64, 0), 100);
    let mut world = world_with(&[&t]);
    let mut limits = limits(settings(HOPPERS));
    let pending = limits.request_recount(&t);
    limits.tick(&mut world, Instant::now());
    limits.shutdown();
    assert_eq!(pending.poll(), Poll::Abandoned);
    assert_eq!(limits.queue_depth(), 0);
}

#[test]
fn recount_lands_in_the_file_store() {
    init_logs();
    let dir = tempfile::tempdir().unwrap();
    let t = territory("disk", V3(0, 64, 0), 24);
    let mut world = world_with(&[&t]);
    world.set_block(NETHER, V3(3, 3, 3), Material::CHEST.into());
    {
        let mut limits = Limits::new(settings(HOPPERS), NbtStore::open(dir.path()).unwrap());
        let pending = limits.request_recount(&t);
        drive(&mut limits, &mut world, &pending);
        limits.shutdown();
    }
    let store = NbtStore::open(dir.path()).unwrap();
    let record = store.load(&t.id).unwrap().unwrap();
    assert_eq!(record.count(Material::CHEST), 1);
    assert_eq!(record.game_mode(), "BSkyBlock");
}

#[test]
fn unpaired_dimensions_are_not_scanned() {
    let mut t = territory("alone", V3(0, 64, 0), 24);
    t.dimensions = DimensionSet::overworld(SKY);
    let mut world = world_with(&[&t]);
    world.set_block(SKY, V3(2, 70, 2), Material::HOPPER.into());
    // same coordinates in worlds the island is not paired with
    world.set_block(NETHER, V3(2, 70, 2), Material::HOPPER.into());
    world.set_block(NETHER, V3(3, 40, 3), Material::CHEST.into());
    world.set_block(END, V3(2, 70, 2), Material::HOPPER.into());

    let mut limits = limits(settings(HOPPERS));
    let pending = limits.request_recount(&t);
    let Poll::Ready(result) = drive(&mut limits, &mut world, &pending) else {
        panic!("recount abandoned");
    };
    let expected: HashMap<Material, i32> = [(Material::HOPPER, 1)].into_iter().collect();
    assert_eq!(result.counts, expected);
}

#[test]
fn a_paired_end_is_scanned_with_its_own_center() {
    let mut t = territory("ender", V3(0, 64, 0), 24);
    t.dimensions = DimensionSet::overworld(SKY).with_end(END);
    let mut world = world_with(&[&t]);
    world.set_block(SKY, V3(1, 70, 1), Material::HOPPER.into());
    world.set_block(SKY, t.center, Material::HOPPER.into());
    world.set_block(END, V3(1, 70, 1), Material::HOPPER.into());
    // the center is only skipped in the overworld
    world.set_block(END, t.center, Material::HOPPER.into());
    world.set_block(NETHER, V3(1, 70, 1), Material::CHEST.into());

    let mut limits = limits(settings(HOPPERS));
    let pending = limits.request_recount(&t);
    let Poll::Ready(result) = drive(&mut limits, &mut world, &pending) else {
        panic!("recount abandoned");
    };
    let expected: HashMap<Material, i32> = [(Material::HOPPER, 3)].into_iter().collect();
    assert_eq!(result.counts, expected);
    assert_eq!(limits.current_counts(&t.id), expected);
}

#[test]
fn a_lost_deferred_write_is_retried_on_shutdown() {
    init_logs();
    let root = tempfile::tempdir().unwrap();
    let dir = root.path().join("limits");
    let t = territory("flaky", V3(0, 64, 0), 24);
    let mut world = world_with(&[&t]);
    let mut limits = Limits::new(
        settings(r#", "blocks": { "HOPPER": 10 }, "flush_threshold": 2"#),
        NbtStore::open(&dir).unwrap(),
    );
    std::fs::remove_dir_all(&dir).unwrap();
    for x in 1..=2 {
        assert!(limits.on_mutation(&world, &Mutation::place(SKY, V3(x, 70, 0), Material::HOPPER)).is_allowed());
    }
    limits.store().settle().unwrap();
    limits.tick(&mut world, Instant::now());
    assert!(limits.record(&t.id).unwrap().is_dirty());

    std::fs::create_dir_all(&dir).unwrap();
    assert_eq!(limits.shutdown(), 0);
    let record = NbtStore::open(&dir).unwrap().load(&t.id).unwrap().unwrap();
    assert_eq!(record.count(Material::HOPPER), 2);
}
