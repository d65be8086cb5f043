use anyhow::Result;
use tokio::sync::oneshot;

use tilestream_assets::TileDefinition;
use tilestream_core::{ChunkPos, TilePos};
use tilestream_world::{PropertyValue, RequesterId, WorldError, WorldInfo, WorldStats};

/// One queued chunk operation. Each variant carries a oneshot reply slot the
/// worker completes after applying the operation; a dropped receiver simply
/// discards the result.
#[derive(Debug)]
pub enum ChunkOp {
    /// Register a requester on a batch of chunks and make them resident.
    Load {
        /// The requesting party.
        requester: RequesterId,
        /// Target chunks.
        positions: Vec<ChunkPos>,
        /// Completed once every chunk in the batch is resident.
        reply: oneshot::Sender<()>,
    },
    /// Release a requester's hold on a batch of chunks.
    Unload {
        /// The releasing party.
        requester: RequesterId,
        /// Target chunks.
        positions: Vec<ChunkPos>,
        /// Completed once the whole batch was processed.
        reply: oneshot::Sender<()>,
    },
    /// Resolve the tile at a position against the registry.
    GetTile {
        /// Target tile.
        tile: TilePos,
        /// The resolved definition, or `None` when empty.
        reply: oneshot::Sender<Result<Option<TileDefinition>, WorldError>>,
    },
    /// Place a tile by id. An empty id removes the tile.
    SetTile {
        /// Target tile.
        tile: TilePos,
        /// Registered tile id.
        id: String,
        /// Completed once the write landed.
        reply: oneshot::Sender<Result<(), WorldError>>,
    },
    /// Remove the tile at a position.
    RemoveTile {
        /// Target tile.
        tile: TilePos,
        /// Completed once the removal landed.
        reply: oneshot::Sender<Result<(), WorldError>>,
    },
    /// Whether a position holds no tile.
    IsEmptyTile {
        /// Target tile.
        tile: TilePos,
        /// The emptiness check result.
        reply: oneshot::Sender<Result<bool, WorldError>>,
    },
    /// Read a property from a tile in a resident chunk.
    GetProperty {
        /// Target tile.
        tile: TilePos,
        /// Property name.
        name: String,
        /// The stored value, cloned out of the chunk.
        reply: oneshot::Sender<Result<Option<PropertyValue>, WorldError>>,
    },
    /// Store a property on a tile in a resident chunk.
    SetProperty {
        /// Target tile.
        tile: TilePos,
        /// Property name.
        name: String,
        /// Value to store.
        value: PropertyValue,
        /// Completed once the write landed.
        reply: oneshot::Sender<Result<(), WorldError>>,
    },
    /// Remove a property from a tile in a resident chunk.
    EraseProperty {
        /// Target tile.
        tile: TilePos,
        /// Property name.
        name: String,
        /// Whether an entry was removed.
        reply: oneshot::Sender<Result<bool, WorldError>>,
    },
    /// Positions of every dirty resident chunk.
    DirtyChunks {
        /// The dirty set at the time the op ran.
        reply: oneshot::Sender<Vec<ChunkPos>>,
    },
    /// Persist the world metadata and every dirty chunk.
    SaveAll {
        /// Number of chunks written.
        reply: oneshot::Sender<Result<usize>>,
    },
    /// Snapshot of the chunk-traffic counters.
    Stats {
        /// The counters at the time the op ran.
        reply: oneshot::Sender<WorldStats>,
    },
    /// The world metadata record.
    Info {
        /// A clone of the metadata.
        reply: oneshot::Sender<WorldInfo>,
    },
    /// Number of requesters currently holding a chunk.
    RequesterCount {
        /// Target chunk.
        pos: ChunkPos,
        /// The holder count.
        reply: oneshot::Sender<usize>,
    },
    /// Whether a chunk is currently resident.
    IsResident {
        /// Target chunk.
        pos: ChunkPos,
        /// The residency check result.
        reply: oneshot::Sender<bool>,
    },
    /// Stop the worker after flushing dirty chunks. Submitted by
    /// [`crate::WorldService::shutdown`]; operations queued behind it are
    /// dropped.
    Stop,
}

impl ChunkOp {
    /// Short tag for trace logging.
    pub fn kind(&self) -> &'static str {
        match self {
            ChunkOp::Load { .. } => "load",
            ChunkOp::Unload { .. } => "unload",
            ChunkOp::GetTile { .. } => "get_tile",
            ChunkOp::SetTile { .. } => "set_tile",
            ChunkOp::RemoveTile { .. } => "remove_tile",
            ChunkOp::IsEmptyTile { .. } => "is_empty_tile",
            ChunkOp::GetProperty { .. } => "get_property",
            ChunkOp::SetProperty { .. } => "set_property",
            ChunkOp::EraseProperty { .. } => "erase_property",
            ChunkOp::DirtyChunks { .. } => "dirty_chunks",
            ChunkOp::SaveAll { .. } => "save_all",
            ChunkOp::Stats { .. } => "stats",
            ChunkOp::Info { .. } => "info",
            ChunkOp::RequesterCount { .. } => "requester_count",
            ChunkOp::IsResident { .. } => "is_resident",
            ChunkOp::Stop => "stop",
        }
    }
}
