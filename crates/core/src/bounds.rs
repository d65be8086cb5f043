use serde::{Deserialize, Serialize};

use crate::{ChunkPos, TilePos};

/// Axis-aligned box of tile positions: inclusive `min`, exclusive `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileBounds {
    /// Inclusive lower corner.
    pub min: TilePos,
    /// Exclusive upper corner.
    pub max: TilePos,
}

impl TileBounds {
    /// Construct tile bounds from corners.
    pub const fn new(min: TilePos, max: TilePos) -> Self {
        Self { min, max }
    }

    /// Whether the given tile falls inside these bounds.
    pub fn contains(&self, tile: TilePos) -> bool {
        tile.x >= self.min.x
            && tile.x < self.max.x
            && tile.y >= self.min.y
            && tile.y < self.max.y
            && tile.z >= self.min.z
            && tile.z < self.max.z
    }

    /// Every tile position inside the bounds, x-major.
    pub fn positions(&self) -> impl Iterator<Item = TilePos> + '_ {
        let (min, max) = (self.min, self.max);
        (min.x..max.x).flat_map(move |x| {
            (min.y..max.y).flat_map(move |y| (min.z..max.z).map(move |z| TilePos::new(x, y, z)))
        })
    }
}

/// Axis-aligned box of chunk positions: inclusive `min`, exclusive `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkBounds {
    /// Inclusive lower corner.
    pub min: ChunkPos,
    /// Exclusive upper corner.
    pub max: ChunkPos,
}

impl ChunkBounds {
    /// Construct chunk bounds from corners.
    pub const fn new(min: ChunkPos, max: ChunkPos) -> Self {
        Self { min, max }
    }

    /// Whether the given chunk falls inside these bounds.
    pub fn contains(&self, chunk: ChunkPos) -> bool {
        chunk.x >= self.min.x
            && chunk.x < self.max.x
            && chunk.y >= self.min.y
            && chunk.y < self.max.y
            && chunk.z >= self.min.z
            && chunk.z < self.max.z
    }

    /// Translate both corners by the given chunk offset.
    pub fn offset(&self, by: ChunkPos) -> ChunkBounds {
        ChunkBounds::new(
            ChunkPos::new(self.min.x + by.x, self.min.y + by.y, self.min.z + by.z),
            ChunkPos::new(self.max.x + by.x, self.max.y + by.y, self.max.z + by.z),
        )
    }

    /// Every chunk position inside the bounds, x-major.
    pub fn positions(&self) -> impl Iterator<Item = ChunkPos> + '_ {
        let (min, max) = (self.min, self.max);
        (min.x..max.x).flat_map(move |x| {
            (min.y..max.y).flat_map(move |y| (min.z..max.z).map(move |z| ChunkPos::new(x, y, z)))
        })
    }
}
