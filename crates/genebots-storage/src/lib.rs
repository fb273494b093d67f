//! Binary world snapshots for GeneBots.
//!
//! The layout is fixed and native-endian with no version tag:
//!
//! ```text
//! world: seed u32 | step_count i64 | bot_count u64 | bot_count × bot
//! bot:   x f32 | y f32 | energy i32 | age i32 | genome_len u64 | genome_len × u32
//!        | program_counter u32 | r g b a u8 | direction u32 | is_dead u8 | is_organic u8
//!        | nutrition_balance i32 | scavenge_points i32
//! ```
//!
//! Operand stacks are not persisted; every bot loads with empty memory.

use byteorder::{NativeEndian, ReadBytesExt, WriteBytesExt};
use genebots_core::config::{MAX_GENOME_SIZE, MIN_GENOME_SIZE};
use genebots_core::{BotRecord, Color, GenomeError, GridPos, WorldSnapshot, WorldState, WorldStateError};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

/// Upper bound on records preallocated before any of them has been read.
const PREALLOCATE_LIMIT: usize = 4_096;

/// Storage error wrapper.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("snapshot i/o failed: {0}")]
    Io(#[from] io::Error),
    #[error("corrupt snapshot: {0}")]
    Corrupt(String),
    #[error("invalid genome in snapshot: {0}")]
    Genome(#[from] GenomeError),
    #[error("snapshot rejected by world: {0}")]
    World(#[from] WorldStateError),
}

/// Serialise `snapshot` into `writer`.
pub fn encode_snapshot<W: Write>(snapshot: &WorldSnapshot, mut writer: W) -> Result<(), StorageError> {
    writer.write_u32::<NativeEndian>(snapshot.seed)?;
    writer.write_i64::<NativeEndian>(snapshot.step_count)?;
    writer.write_u64::<NativeEndian>(snapshot.bots.len() as u64)?;
    for record in &snapshot.bots {
        write_bot(&mut writer, record)?;
    }
    writer.flush()?;
    Ok(())
}

fn write_bot<W: Write>(writer: &mut W, record: &BotRecord) -> Result<(), StorageError> {
    writer.write_f32::<NativeEndian>(record.position.x as f32)?;
    writer.write_f32::<NativeEndian>(record.position.y as f32)?;
    writer.write_i32::<NativeEndian>(record.energy)?;
    writer.write_i32::<NativeEndian>(i32::try_from(record.age).unwrap_or(i32::MAX))?;
    writer.write_u64::<NativeEndian>(record.genome.len() as u64)?;
    for &gene in &record.genome {
        writer.write_u32::<NativeEndian>(gene)?;
    }
    writer.write_u32::<NativeEndian>(record.program_counter)?;
    writer.write_all(&[record.color.r, record.color.g, record.color.b, record.color.a])?;
    writer.write_u32::<NativeEndian>(record.direction)?;
    writer.write_u8(u8::from(record.is_dead))?;
    writer.write_u8(u8::from(record.is_organic))?;
    writer.write_i32::<NativeEndian>(record.nutrition_balance)?;
    writer.write_i32::<NativeEndian>(record.scavenge_points)?;
    Ok(())
}

/// Parse a snapshot from `reader`. Nothing is applied to any world.
pub fn decode_snapshot<R: Read>(mut reader: R) -> Result<WorldSnapshot, StorageError> {
    let seed = reader.read_u32::<NativeEndian>()?;
    let step_count = reader.read_i64::<NativeEndian>()?;
    if step_count < 0 {
        return Err(StorageError::Corrupt(format!("negative step count {step_count}")));
    }
    let count = usize::try_from(reader.read_u64::<NativeEndian>()?)
        .map_err(|_| StorageError::Corrupt("bot count exceeds address space".into()))?;
    let mut bots = Vec::with_capacity(count.min(PREALLOCATE_LIMIT));
    for index in 0..count {
        bots.push(read_bot(&mut reader, index)?);
    }
    Ok(WorldSnapshot {
        seed,
        step_count,
        bots,
    })
}

fn read_bot<R: Read>(reader: &mut R, index: usize) -> Result<BotRecord, StorageError> {
    let x = read_coordinate(reader, index)?;
    let y = read_coordinate(reader, index)?;
    let energy = reader.read_i32::<NativeEndian>()?;
    let age = u32::try_from(reader.read_i32::<NativeEndian>()?)
        .map_err(|_| StorageError::Corrupt(format!("bot {index} has a negative age")))?;

    let len = reader.read_u64::<NativeEndian>()?;
    let len = usize::try_from(len).unwrap_or(usize::MAX);
    if !(MIN_GENOME_SIZE..=MAX_GENOME_SIZE).contains(&len) {
        return Err(StorageError::Genome(GenomeError::InvalidLength {
            len,
            min: MIN_GENOME_SIZE,
            max: MAX_GENOME_SIZE,
        }));
    }
    let mut genome = vec![0u32; len];
    reader.read_u32_into::<NativeEndian>(&mut genome)?;

    let program_counter = reader.read_u32::<NativeEndian>()?;
    let mut rgba = [0u8; 4];
    reader.read_exact(&mut rgba)?;
    let direction = reader.read_u32::<NativeEndian>()?;
    let is_dead = read_flag(reader, index, "is_dead")?;
    let is_organic = read_flag(reader, index, "is_organic")?;
    let nutrition_balance = reader.read_i32::<NativeEndian>()?;
    let scavenge_points = reader.read_i32::<NativeEndian>()?;

    Ok(BotRecord {
        position: GridPos::new(x, y),
        energy,
        age,
        genome,
        program_counter,
        color: Color {
            r: rgba[0],
            g: rgba[1],
            b: rgba[2],
            a: rgba[3],
        },
        direction,
        is_dead,
        is_organic,
        nutrition_balance,
        scavenge_points,
    })
}

fn read_coordinate<R: Read>(reader: &mut R, index: usize) -> Result<i32, StorageError> {
    let value = reader.read_f32::<NativeEndian>()?;
    if !value.is_finite() || value.fract() != 0.0 || value.abs() > i32::MAX as f32 {
        return Err(StorageError::Corrupt(format!(
            "bot {index} has non-cell coordinate {value}"
        )));
    }
    Ok(value as i32)
}

fn read_flag<R: Read>(reader: &mut R, index: usize, field: &str) -> Result<bool, StorageError> {
    match reader.read_u8()? {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(StorageError::Corrupt(format!(
            "bot {index} has invalid {field} byte {other}"
        ))),
    }
}

/// Write `world` to `path`, replacing any existing file.
pub fn save_world(world: &WorldState, path: impl AsRef<Path>) -> Result<(), StorageError> {
    let path = path.as_ref();
    let snapshot = world.snapshot();
    let file = File::create(path)?;
    encode_snapshot(&snapshot, BufWriter::new(file))?;
    info!(
        path = %path.display(),
        tick = snapshot.step_count,
        bots = snapshot.bots.len(),
        "Saved world snapshot"
    );
    Ok(())
}

/// Read a snapshot file without applying it.
pub fn read_snapshot(path: impl AsRef<Path>) -> Result<WorldSnapshot, StorageError> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let snapshot = decode_snapshot(&mut reader)?;
    let mut trailing = [0u8; 1];
    if reader.read(&mut trailing)? != 0 {
        return Err(StorageError::Corrupt("trailing bytes after last bot".into()));
    }
    debug!(path = %path.display(), bots = snapshot.bots.len(), "Decoded snapshot");
    Ok(snapshot)
}

/// Replace `world` with the snapshot stored at `path`.
///
/// The file is fully decoded and validated first; on any error `world` is unchanged.
pub fn load_world(world: &mut WorldState, path: impl AsRef<Path>) -> Result<(), StorageError> {
    let snapshot = read_snapshot(path)?;
    world.restore(snapshot)?;
    Ok(())
}
