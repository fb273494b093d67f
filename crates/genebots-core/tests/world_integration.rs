use genebots_core::config::{MAX_ENERGY, MAX_GENOME_SIZE, MIN_GENOME_SIZE};
use genebots_core::{
    Bot, BotId, COMPASS, GeneBotsConfig, Genome, GridPos, Tick, WorldState, absolute_direction,
};

fn config(width: u32, height: u32, seed: u32) -> GeneBotsConfig {
    GeneBotsConfig {
        world_width: width,
        world_height: height,
        initial_bot_count: 0,
        rng_seed: Some(seed),
        ..GeneBotsConfig::default()
    }
}

fn bot(x: i32, y: i32, genes: Vec<u32>, energy: i32) -> Bot {
    Bot::new(GridPos::new(x, y), Genome::new(genes).expect("genome"), energy)
}

fn assert_consistent(world: &WorldState) {
    for (id, bot) in world.bots() {
        assert_eq!(world.bot_at(bot.position()), Some(id), "bot missing from grid");
        assert!((0..=MAX_ENERGY).contains(&bot.energy()));
        assert!((MIN_GENOME_SIZE..=MAX_GENOME_SIZE).contains(&bot.genome().len()));
        assert!(bot.program_counter() < bot.genome().len());
        assert!(bot.direction() < 8);
        assert!(bot.memory().len() <= genebots_core::config::MEMORY_SIZE);
    }
    for (pos, id) in world.grid().iter() {
        let bot = world.bot(id).expect("grid entry resolves");
        assert_eq!(bot.position(), pos);
    }
    assert_eq!(world.grid().occupied(), world.bots().count());
}

#[test]
fn starving_bot_is_removed_without_leaving_remains() {
    let mut world = WorldState::new(config(8, 8, 1)).expect("world");
    let id = world.add_bot(bot(3, 3, vec![3, 3, 3, 3], 1));
    let summary = world.process();
    assert!(world.bot(id).is_none());
    assert_eq!(world.bot_at(GridPos::new(3, 3)), None);
    assert_eq!(summary.starvations, 1);
    assert_eq!(summary.population, 0);
}

#[test]
fn old_bot_becomes_organic_in_place() {
    let cfg = config(8, 8, 1);
    let max_age = cfg.maximum_bot_age;
    let mut world = WorldState::new(cfg).expect("world");
    let id = world.add_bot(bot(3, 3, vec![4; 4], 50).with_age(max_age + 1));
    let summary = world.process();
    let remains = world.bot(id).expect("still present");
    assert!(remains.is_organic());
    assert!(!remains.is_dead());
    assert_eq!(remains.energy(), 50);
    assert_eq!(world.bot_at(GridPos::new(3, 3)), Some(id));
    assert_eq!(summary.old_age_deaths, 1);
}

#[test]
fn reproduction_fills_the_only_free_cell() {
    let mut world = WorldState::new(config(3, 3, 5)).expect("world");
    let mut parent = None;
    for y in 0..3 {
        for x in 0..3 {
            match (x, y) {
                (1, 1) => parent = Some(world.add_bot(bot(x, y, vec![8; 4], 100))),
                (2, 0) => {}
                _ => {
                    world.add_bot(bot(x, y, vec![4; 4], 100).into_organic());
                }
            }
        }
    }
    let parent = parent.expect("parent");
    world.execute_instruction(parent);

    assert_eq!(world.bot(parent).map(Bot::energy), Some(50));
    let child_id = world.bot_at(GridPos::new(2, 0)).expect("child placed");
    let child = world.bot(child_id).expect("child");
    assert_eq!(child.energy(), 50);
    assert!((MIN_GENOME_SIZE..=MAX_GENOME_SIZE).contains(&child.genome().len()));
    assert_eq!(world.bot_at(GridPos::new(1, 1)), Some(parent));
    assert_consistent(&world);
}

#[test]
fn attack_on_empty_cell_only_costs_energy() {
    let mut world = WorldState::new(config(8, 8, 1)).expect("world");
    let id = world.add_bot(bot(4, 4, vec![3; 4], 100));
    let before = world.bot(id).cloned().expect("bot");
    world.execute_instruction(id);
    let after = world.bot(id).expect("bot");
    assert_eq!(after.energy(), 90);
    assert_eq!(after.position(), before.position());
    assert_eq!(after.nutrition_balance(), before.nutrition_balance());
    assert_eq!(after.scavenge_points(), before.scavenge_points());
    assert_eq!(world.bot_count(), 1);
}

#[test]
fn look_branch_width_matches_target_in_every_direction() {
    for relative in 0..8_u32 {
        for (occupant, expected) in [(None, 1), (Some(false), 2), (Some(true), 3)] {
            let mut world = WorldState::new(config(5, 5, 3)).expect("world");
            let looker = world.add_bot(bot(2, 2, vec![2; 8], 100).with_direction(6));
            let (dx, dy) = COMPASS[absolute_direction(6, relative)];
            if let Some(organic) = occupant {
                let target = bot(2 + dx, 2 + dy, vec![4; 4], 40);
                world.add_bot(if organic { target.into_organic() } else { target });
            }
            world.bot_mut(looker).expect("looker").push_memory(relative);
            world.execute_instruction(looker);
            assert_eq!(
                world.bot(looker).map(Bot::program_counter),
                Some(expected),
                "relative {relative}, occupant {occupant:?}"
            );
        }
    }
}

#[test]
fn newborns_wait_for_the_next_tick() {
    let mut world = WorldState::new(config(10, 10, 9)).expect("world");
    let parent = world.add_bot(bot(5, 5, vec![8, 4, 4, 4], 200));
    world.process();
    let child: Vec<(BotId, Bot)> = world
        .bots()
        .filter(|(id, _)| *id != parent)
        .map(|(id, bot)| (id, bot.clone()))
        .collect();
    assert_eq!(child.len(), 1);
    let (_, child) = &child[0];
    assert_eq!(child.age(), 0);
    assert_eq!(child.program_counter(), 0);

    world.process();
    let ages: Vec<u32> = world.bots().map(|(_, bot)| bot.age()).collect();
    assert_eq!(ages, vec![2, 1]);
}

#[test]
fn kills_are_visible_to_later_bots_in_the_same_tick() {
    let mut world = WorldState::new(config(10, 10, 2)).expect("world");
    // Attacker faces east at (2,5); victim at (3,5) would otherwise photosynthesise.
    let attacker = world.add_bot(bot(2, 5, vec![3; 4], 200).with_direction(3));
    let victim = world.add_bot(bot(3, 5, vec![4; 4], 100));
    let summary = world.process();

    assert!(world.bot(attacker).is_some());
    let remains = world.bot(victim).expect("victim");
    assert!(remains.is_organic());
    assert_eq!(remains.energy(), 100);
    assert_eq!(remains.age(), 1);
    assert_eq!(summary.kills, 1);
}

#[test]
fn eaten_matter_is_skipped_and_reaped() {
    let mut world = WorldState::new(config(10, 10, 2)).expect("world");
    let eater = world.add_bot(bot(2, 5, vec![7; 4], 100).with_direction(3));
    let food = world.add_bot(bot(3, 5, vec![4; 4], 30).into_organic());
    let summary = world.process();
    assert_eq!(summary.consumed, 1);
    assert_eq!(summary.reaped, 1);
    assert!(world.bot(food).is_none());
    assert_eq!(world.bot(eater).map(Bot::energy), Some(129));
    assert_consistent(&world);
}

#[test]
fn seeded_worlds_evolve_identically() {
    let run = || {
        let mut world = WorldState::new(config(40, 30, 1)).expect("world");
        world.new_world(1234, 300).expect("seed");
        for _ in 0..150 {
            world.process();
        }
        world.snapshot()
    };
    let first = run();
    let second = run();
    assert_eq!(first, second);
    assert_eq!(first.step_count, 150);
}

#[test]
fn long_run_preserves_world_invariants() {
    let mut world = WorldState::new(config(30, 20, 1)).expect("world");
    world.new_world(42, 200).expect("seed");
    for _ in 0..300 {
        world.process();
        assert_consistent(&world);
    }
    assert_eq!(world.tick(), Tick(300));
    assert_eq!(world.history().count(), 256);
}

#[test]
fn restore_replaces_world_and_resumes_identically() {
    let mut world = WorldState::new(config(25, 25, 1)).expect("world");
    world.new_world(77, 120).expect("seed");
    for _ in 0..20 {
        world.process();
    }
    let snapshot = world.snapshot();

    let mut other = WorldState::new(config(25, 25, 99)).expect("world");
    other.new_world(5, 10).expect("seed");
    other.restore(snapshot.clone()).expect("restore");
    assert_eq!(other.seed(), 77);
    assert_eq!(other.tick(), Tick(20));
    assert_eq!(other.snapshot(), snapshot);
    assert!(other.bots().all(|(_, bot)| bot.memory().is_empty()));
    assert_consistent(&other);
}
