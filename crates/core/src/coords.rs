//! Conversions between tile space, chunk space and chunk-local space.
//!
//! Tile position: identifies one grid cell, 1 = 1 tile.
//! Chunk position: identifies one chunk, 1 = 1 chunk = `extent` tiles.
//! Local position: identifies a tile inside a chunk, `[0, extent)` per axis.
//!
//! All functions are pure arithmetic with no error conditions. Negative tile
//! positions floor (not truncate) into the chunk below zero, so tile -1 with
//! extent 16 lands in chunk -1 at local offset 15.

use crate::{ChunkBounds, ChunkExtent, ChunkPos, LocalPos, TileBounds, TilePos};

/// Chunk position containing the given tile (floor semantics).
pub fn tile_to_chunk(tile: TilePos, extent: ChunkExtent) -> ChunkPos {
    ChunkPos::new(
        tile.x.div_euclid(extent.x() as i32),
        tile.y.div_euclid(extent.y() as i32),
        tile.z.div_euclid(extent.z() as i32),
    )
}

/// Ceiling variant of [`tile_to_chunk`], used to compute the chunk bound that
/// fully covers a tile bound including partially-overlapped chunks.
pub fn tile_to_chunk_ceil(tile: TilePos, extent: ChunkExtent) -> ChunkPos {
    ChunkPos::new(
        ceil_div(tile.x, extent.x() as i32),
        ceil_div(tile.y, extent.y() as i32),
        ceil_div(tile.z, extent.z() as i32),
    )
}

/// Offset of the given tile inside its chunk, always in `[0, extent)`.
pub fn tile_to_local(tile: TilePos, extent: ChunkExtent) -> LocalPos {
    LocalPos::new(
        tile.x.rem_euclid(extent.x() as i32) as u32,
        tile.y.rem_euclid(extent.y() as i32) as u32,
        tile.z.rem_euclid(extent.z() as i32) as u32,
    )
}

/// Inverse of [`tile_to_local`]: reconstruct the tile position from a local
/// offset and its owning chunk.
pub fn local_to_tile(local: LocalPos, chunk: ChunkPos, extent: ChunkExtent) -> TilePos {
    TilePos::new(
        local.x as i32 + chunk.x * extent.x() as i32,
        local.y as i32 + chunk.y * extent.y() as i32,
        local.z as i32 + chunk.z * extent.z() as i32,
    )
}

/// Convert tile bounds to the chunk bounds covering every tile in the input,
/// including chunks only fractionally contained.
pub fn tile_bounds_to_chunk_bounds(bounds: TileBounds, extent: ChunkExtent) -> ChunkBounds {
    ChunkBounds::new(
        tile_to_chunk(bounds.min, extent),
        tile_to_chunk_ceil(bounds.max, extent),
    )
}

fn ceil_div(value: i32, divisor: i32) -> i32 {
    value.div_euclid(divisor) + i32::from(value.rem_euclid(divisor) != 0)
}
