//! Headless shell around the GeneBots world: argument parsing and the run/resume/inspect
//! commands.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use genebots_core::analysis::{DietCensus, SANDBOX_SIZE, annotated_listing};
use genebots_core::{BotId, GeneBotsConfig, TickSummary, WorldState};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(
    name = "genebots",
    version,
    about = "Run, resume and inspect GeneBots genome-VM worlds"
)]
pub struct Cli {
    /// Optional JSON file with `GeneBotsConfig` overrides.
    #[arg(long, global = true, env = "GENEBOTS_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Seed a new world and run it.
    Run {
        /// RNG seed; falls back to the config seed, then to entropy.
        #[arg(long)]
        seed: Option<u32>,
        /// Number of bots to spawn; defaults to the config value.
        #[arg(long)]
        bots: Option<usize>,
        #[command(flatten)]
        session: SessionArgs,
    },
    /// Load a snapshot and keep running it.
    Resume {
        /// Snapshot written by a previous `run` or `resume`.
        snapshot: PathBuf,
        #[command(flatten)]
        session: SessionArgs,
    },
    /// Summarise a snapshot and optionally dissect one bot.
    Inspect {
        snapshot: PathBuf,
        /// Index of the bot to disassemble (processing order).
        #[arg(long)]
        bot: Option<usize>,
        /// Step the selected bot alone in a sandbox for this many ticks.
        #[arg(long, requires = "bot")]
        trace: Option<usize>,
    },
}

#[derive(Args, Debug, Clone)]
pub struct SessionArgs {
    /// Ticks to process.
    #[arg(long, default_value_t = 1_000)]
    pub ticks: u64,
    /// Write the final world to this path.
    #[arg(long)]
    pub save: Option<PathBuf>,
    /// Log a tick summary every N ticks (0 disables).
    #[arg(long, default_value_t = 100)]
    pub report_every: u64,
}

/// Dispatch a parsed command line.
pub fn execute(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;
    match cli.command {
        Command::Run {
            seed,
            bots,
            session,
        } => {
            let bots = bots.unwrap_or(config.initial_bot_count);
            let mut world = WorldState::new(config).context("invalid world configuration")?;
            let seed = seed.unwrap_or(world.seed());
            world
                .new_world(seed, bots)
                .with_context(|| format!("failed to seed {bots} bots"))?;
            run_session(&mut world, &session);
        }
        Command::Resume { snapshot, session } => {
            let mut world = WorldState::new(config).context("invalid world configuration")?;
            genebots_storage::load_world(&mut world, &snapshot)
                .with_context(|| format!("failed to load {}", snapshot.display()))?;
            run_session(&mut world, &session);
        }
        Command::Inspect {
            snapshot,
            bot,
            trace,
        } => {
            let mut world = WorldState::new(config).context("invalid world configuration")?;
            genebots_storage::load_world(&mut world, &snapshot)
                .with_context(|| format!("failed to load {}", snapshot.display()))?;
            print!("{}", inspect(&world, bot, trace)?);
        }
    }
    Ok(())
}

/// Read a JSON configuration file, or fall back to defaults.
pub fn load_config(path: Option<&Path>) -> Result<GeneBotsConfig> {
    let Some(path) = path else {
        return Ok(GeneBotsConfig::default());
    };
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let config: GeneBotsConfig = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse config {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(config)
}

/// Process `session.ticks` ticks, then save if requested. Save failures are logged only.
pub fn run_session(world: &mut WorldState, session: &SessionArgs) -> Option<TickSummary> {
    info!(
        seed = world.seed(),
        start_tick = world.tick().0,
        bots = world.bot_count(),
        ticks = session.ticks,
        "Starting GeneBots session"
    );
    let mut last = None;
    for step in 1..=session.ticks {
        let summary = world.process();
        if session.report_every > 0 && step % session.report_every == 0 {
            info!(
                tick = summary.tick.0,
                population = summary.population,
                organic = summary.organic,
                births = summary.births,
                kills = summary.kills,
                "Progress"
            );
        }
        last = Some(summary);
    }
    if let Some(path) = &session.save {
        if let Err(err) = genebots_storage::save_world(world, path) {
            warn!(path = %path.display(), error = %err, "Failed to save world; continuing");
        }
    }
    last
}

/// Human-readable report for a loaded world.
pub fn inspect(world: &WorldState, bot: Option<usize>, trace: Option<usize>) -> Result<String> {
    let mut out = String::new();
    let selectable = world.bots().count();
    let organic = world.bots().filter(|(_, b)| b.is_organic()).count();
    let census = DietCensus::of(world);
    writeln!(
        out,
        "tick {} | seed {} | bots {} ({} organic)",
        world.tick().0,
        world.seed(),
        selectable,
        organic
    )?;
    writeln!(
        out,
        "diet: {} herbivores, {} scavengers, {} predators",
        census.herbivores, census.scavengers, census.predators
    )?;

    let Some(index) = bot else {
        return Ok(out);
    };
    let Some((id, selected)) = world.bots().nth(index) else {
        bail!("no bot at index {index}; world holds {selectable}");
    };
    let pos = selected.position();
    let color = selected.color();
    writeln!(
        out,
        "bot {index}: pos ({}, {}) energy {} age {} facing {} pc {} diet {:?} {}",
        pos.x,
        pos.y,
        selected.energy(),
        selected.age(),
        selected.direction(),
        selected.program_counter(),
        selected.diet(),
        if selected.is_organic() { "organic" } else { "living" },
    )?;
    writeln!(
        out,
        "colour #{:02x}{:02x}{:02x}, {} genes, {} relatives",
        color.r,
        color.g,
        color.b,
        selected.genome().len(),
        world.relatives_of(id).len()
    )?;
    for line in annotated_listing(selected.genome()) {
        writeln!(out, "{line}")?;
    }

    if let Some(steps) = trace {
        trace_in_sandbox(world, id, steps, &mut out)?;
    }
    Ok(out)
}

fn trace_in_sandbox(world: &WorldState, id: BotId, steps: usize, out: &mut String) -> Result<()> {
    let Some(bot) = world.bot(id) else {
        bail!("bot vanished before tracing");
    };
    let (mut sandbox, copy) = world
        .sandbox(bot, SANDBOX_SIZE)
        .context("failed to build sandbox")?;
    writeln!(out, "trace ({SANDBOX_SIZE}x{SANDBOX_SIZE} sandbox):")?;
    for step in 1..=steps {
        let Some(before) = sandbox.bot(copy) else {
            break;
        };
        let pc = before.program_counter();
        let opcode = before.genome().opcode_at(pc).mnemonic();
        sandbox.process();
        match sandbox.bot(copy) {
            Some(after) => {
                let pos = after.position();
                writeln!(
                    out,
                    "{step:>5}: pc {pc:>4} {opcode:<12} -> energy {:>3} pos ({}, {}) facing {} stack {:?}",
                    after.energy(),
                    pos.x,
                    pos.y,
                    after.direction(),
                    after.memory().as_slice()
                )?;
                if after.is_organic() {
                    writeln!(out, "{step:>5}: bot turned organic")?;
                    break;
                }
            }
            None => {
                writeln!(out, "{step:>5}: bot starved")?;
                break;
            }
        }
    }
    Ok(())
}
