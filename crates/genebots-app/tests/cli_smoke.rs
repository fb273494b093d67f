use clap::Parser;
use genebots_app::{Cli, Command, SessionArgs, execute, inspect, load_config, run_session};
use genebots_core::{GeneBotsConfig, WorldState};
use std::fs;
use tempfile::tempdir;

fn small_config() -> GeneBotsConfig {
    GeneBotsConfig {
        world_width: 30,
        world_height: 20,
        initial_bot_count: 50,
        rng_seed: Some(17),
        ..GeneBotsConfig::default()
    }
}

#[test]
fn parses_run_with_session_flags() {
    let cli = Cli::try_parse_from([
        "genebots", "run", "--seed", "9", "--bots", "12", "--ticks", "5", "--report-every", "0",
    ])
    .expect("parse");
    match cli.command {
        Command::Run {
            seed,
            bots,
            session,
        } => {
            assert_eq!(seed, Some(9));
            assert_eq!(bots, Some(12));
            assert_eq!(session.ticks, 5);
            assert_eq!(session.report_every, 0);
            assert!(session.save.is_none());
        }
        other => panic!("unexpected command {other:?}"),
    }
}

#[test]
fn trace_requires_a_bot() {
    assert!(Cli::try_parse_from(["genebots", "inspect", "world.bin", "--trace", "3"]).is_err());
    assert!(
        Cli::try_parse_from(["genebots", "inspect", "world.bin", "--bot", "0", "--trace", "3"])
            .is_ok()
    );
}

#[test]
fn config_file_overrides_defaults_and_is_validated() {
    let dir = tempdir().expect("tempdir");
    let good = dir.path().join("good.json");
    fs::write(&good, r#"{ "world_width": 40, "attack_cost": 3 }"#).expect("write");
    let config = load_config(Some(&good)).expect("config");
    assert_eq!(config.world_width, 40);
    assert_eq!(config.attack_cost, 3);
    assert_eq!(config.world_height, 100);

    let bad = dir.path().join("bad.json");
    fs::write(&bad, r#"{ "world_height": 0 }"#).expect("write");
    assert!(load_config(Some(&bad)).is_err());

    assert_eq!(load_config(None).expect("defaults"), GeneBotsConfig::default());
}

#[test]
fn run_then_resume_then_inspect_end_to_end() {
    let dir = tempdir().expect("tempdir");
    let config_path = dir.path().join("config.json");
    fs::write(
        &config_path,
        serde_json::to_string(&small_config()).expect("json"),
    )
    .expect("write config");
    let first = dir.path().join("first.bin");
    let second = dir.path().join("second.bin");
    let config_arg = config_path.to_str().expect("utf8");

    execute(
        Cli::try_parse_from([
            "genebots",
            "--config",
            config_arg,
            "run",
            "--ticks",
            "10",
            "--save",
            first.to_str().expect("utf8"),
        ])
        .expect("parse run"),
    )
    .expect("run");
    assert!(first.exists());

    execute(
        Cli::try_parse_from([
            "genebots",
            "resume",
            first.to_str().expect("utf8"),
            "--config",
            config_arg,
            "--ticks",
            "5",
            "--save",
            second.to_str().expect("utf8"),
        ])
        .expect("parse resume"),
    )
    .expect("resume");

    let mut world = WorldState::new(small_config()).expect("world");
    genebots_storage::load_world(&mut world, &second).expect("load");
    assert_eq!(world.tick().0, 15);
    assert_eq!(world.seed(), 17);

    let report = inspect(&world, Some(0), Some(4)).expect("inspect");
    assert!(report.starts_with("tick 15 | seed 17"));
    assert!(report.contains("diet:"));
    assert!(report.contains("trace (11x11 sandbox):"));
}

#[test]
fn inspect_rejects_unknown_bot_index() {
    let mut world = WorldState::new(small_config()).expect("world");
    world.new_world(3, 4).expect("seed");
    assert!(inspect(&world, Some(10), None).is_err());
    let summary = inspect(&world, None, None).expect("summary");
    assert_eq!(summary.lines().count(), 2);
}

#[test]
fn inspect_counts_only_selectable_bots() {
    let mut world = WorldState::new(small_config()).expect("world");
    world.new_world(3, 4).expect("seed");
    let (first, _) = world.bots().next().expect("bot");
    assert!(world.remove_bot(first));
    assert_eq!(world.bot_count(), 4);

    let summary = inspect(&world, None, None).expect("summary");
    assert!(summary.contains("| bots 3 ("), "{summary}");
    let err = inspect(&world, Some(3), None).unwrap_err();
    assert!(err.to_string().contains("world holds 3"), "{err}");
    assert!(inspect(&world, Some(2), None).is_ok());
}

#[test]
fn failed_save_keeps_the_session_alive() {
    let dir = tempdir().expect("tempdir");
    let mut world = WorldState::new(small_config()).expect("world");
    world.new_world(5, 20).expect("seed");
    let session = SessionArgs {
        ticks: 3,
        save: Some(dir.path().join("missing").join("nested").join("world.bin")),
        report_every: 1,
    };
    let last = run_session(&mut world, &session).expect("ticks ran");
    assert_eq!(last.tick.0, 3);
    assert_eq!(world.tick().0, 3);
}
