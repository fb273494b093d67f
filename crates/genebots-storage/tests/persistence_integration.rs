use genebots_core::{Bot, GeneBotsConfig, Genome, GridPos, WorldState};
use genebots_storage::{StorageError, load_world, read_snapshot, save_world};
use tempfile::tempdir;

fn config(seed: u32) -> GeneBotsConfig {
    GeneBotsConfig {
        world_width: 32,
        world_height: 24,
        initial_bot_count: 0,
        rng_seed: Some(seed),
        ..GeneBotsConfig::default()
    }
}

#[test]
fn saved_world_reloads_field_for_field() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("world.bin");

    let mut world = WorldState::new(config(1)).expect("world");
    world.new_world(2024, 60).expect("seed");
    for _ in 0..25 {
        world.process();
    }
    let long_genome = Genome::new((0..300).map(|i| i % 128).collect()).expect("genome");
    let spot = (0..24)
        .flat_map(|y| (0..32).map(move |x| GridPos::new(x, y)))
        .find(|&pos| world.bot_at(pos).is_none())
        .expect("free cell");
    let corpse = Bot::new(spot, long_genome, 77)
        .with_age(40)
        .with_direction(6)
        .into_organic();
    world.place_bot(corpse).expect("corpse placed");
    let remembered = world.bots().map(|(id, _)| id).next().expect("bot");
    world.bot_mut(remembered).expect("bot").push_memory(5);

    save_world(&world, &path).expect("save");

    let mut loaded = WorldState::new(config(99)).expect("world");
    load_world(&mut loaded, &path).expect("load");

    assert_eq!(loaded.seed(), 2024);
    assert_eq!(loaded.tick(), world.tick());
    assert_eq!(loaded.snapshot(), world.snapshot());
    assert!(loaded.bots().all(|(_, bot)| bot.memory().is_empty()));
    assert!(loaded.bots().any(|(_, bot)| bot.is_organic() && bot.genome().len() == 300));
    for (id, bot) in loaded.bots() {
        assert_eq!(loaded.bot_at(bot.position()), Some(id));
    }
}

#[test]
fn reloaded_copies_evolve_identically() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("resume.bin");

    let mut world = WorldState::new(config(1)).expect("world");
    world.new_world(31, 80).expect("seed");
    for _ in 0..10 {
        world.process();
    }
    save_world(&world, &path).expect("save");

    let mut first = WorldState::new(config(1)).expect("world");
    let mut second = WorldState::new(config(1)).expect("world");
    load_world(&mut first, &path).expect("load");
    load_world(&mut second, &path).expect("load");
    for _ in 0..40 {
        first.process();
        second.process();
    }
    assert_eq!(first.snapshot(), second.snapshot());
}

#[test]
fn missing_file_leaves_world_unchanged() {
    let dir = tempdir().expect("tempdir");
    let mut world = WorldState::new(config(1)).expect("world");
    world.new_world(8, 15).expect("seed");
    let before = world.snapshot();

    let err = load_world(&mut world, dir.path().join("absent.bin")).unwrap_err();
    assert!(matches!(err, StorageError::Io(_)));
    assert_eq!(world.snapshot(), before);
}

#[test]
fn truncated_file_leaves_world_unchanged() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("short.bin");

    let mut source = WorldState::new(config(1)).expect("world");
    source.new_world(4, 10).expect("seed");
    save_world(&source, &path).expect("save");
    let bytes = std::fs::read(&path).expect("read");
    std::fs::write(&path, &bytes[..bytes.len() / 2]).expect("truncate");

    let mut world = WorldState::new(config(1)).expect("world");
    world.new_world(5, 12).expect("seed");
    let before = world.snapshot();
    assert!(load_world(&mut world, &path).is_err());
    assert_eq!(world.snapshot(), before);
}

#[test]
fn trailing_garbage_is_rejected() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("trailing.bin");
    let world = WorldState::new(config(1)).expect("world");
    save_world(&world, &path).expect("save");
    let mut bytes = std::fs::read(&path).expect("read");
    bytes.push(0);
    std::fs::write(&path, bytes).expect("write");
    assert!(matches!(read_snapshot(&path), Err(StorageError::Corrupt(_))));
}
