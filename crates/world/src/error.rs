use thiserror::Error;
use tilestream_core::{ChunkPos, LocalPos, TilePos};

use crate::PropertyKind;

/// Errors surfaced by chunk and chunk-store operations. All of these are
/// locally recoverable; callers log and continue rather than unwinding.
#[derive(Debug, Error)]
pub enum WorldError {
    /// A tile position was handed to a chunk it does not belong to. This
    /// guards against coordinate-arithmetic bugs in callers.
    #[error("tile {tile} does not belong to chunk {chunk}")]
    InvalidPosition {
        /// The offending tile position.
        tile: TilePos,
        /// The chunk that was asked to handle it.
        chunk: ChunkPos,
    },
    /// The chunk is not currently resident; it must be loaded first.
    #[error("chunk {0} is not resident")]
    NotResident(ChunkPos),
    /// A tile id no registry definition carries; the write is refused.
    #[error("unknown tile id {0:?}")]
    UnknownTile(String),
    /// A typed chunk-data read hit a value of a different variant.
    #[error(transparent)]
    ChunkData(#[from] ChunkDataError),
}

/// Errors from the per-chunk property store.
#[derive(Debug, Error)]
pub enum ChunkDataError {
    /// Reading a property with the wrong declared type. This is a programmer
    /// error, never silently coerced.
    #[error("property {name:?} at {position} holds {found}, expected {expected}")]
    TypeMismatch {
        /// Local position of the property.
        position: LocalPos,
        /// Property name.
        name: String,
        /// The variant the caller asked for.
        expected: PropertyKind,
        /// The variant actually stored.
        found: PropertyKind,
    },
}
