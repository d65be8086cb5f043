use std::fmt;

use serde::{Deserialize, Serialize};

/// Position of a single cell on the unbounded tile grid.
/// Implements Ord for deterministic iteration in BTreeMap/BTreeSet
/// (sorts by x, then y, then z).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub struct TilePos {
    /// X component (east/west).
    pub x: i32,
    /// Y component (north/south).
    pub y: i32,
    /// Z component (layer).
    pub z: i32,
}

impl TilePos {
    /// Construct a tile position.
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }
}

impl fmt::Display for TilePos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Coordinate of a chunk in chunk space. One chunk covers `extent` tiles per
/// axis; negative tile positions floor into the chunk below zero.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub struct ChunkPos {
    /// X component in chunk space.
    pub x: i32,
    /// Y component in chunk space.
    pub y: i32,
    /// Z component in chunk space.
    pub z: i32,
}

impl ChunkPos {
    /// Construct a chunk position.
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }
}

impl fmt::Display for ChunkPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Size of a chunk in tiles per axis. Configured once per world and invariant
/// for the world's lifetime. The fields are private so every value goes
/// through [`ChunkExtent::new`], which keeps each component at least 1; the
/// coordinate math divides by them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkExtent {
    x: u32,
    y: u32,
    z: u32,
}

impl ChunkExtent {
    /// Construct an extent, clamping each component to at least 1.
    pub const fn new(x: u32, y: u32, z: u32) -> Self {
        Self {
            x: Self::at_least_one(x),
            y: Self::at_least_one(y),
            z: Self::at_least_one(z),
        }
    }

    const fn at_least_one(component: u32) -> u32 {
        if component == 0 {
            1
        } else {
            component
        }
    }

    /// Tiles along X.
    pub const fn x(self) -> u32 {
        self.x
    }

    /// Tiles along Y.
    pub const fn y(self) -> u32 {
        self.y
    }

    /// Tiles along Z.
    pub const fn z(self) -> u32 {
        self.z
    }

    /// Total tile count per chunk.
    pub fn volume(self) -> usize {
        self.x as usize * self.y as usize * self.z as usize
    }
}

impl fmt::Display for ChunkExtent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}x{}", self.x, self.y, self.z)
    }
}

/// Chunk-local position, in `[0, extent)` per axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LocalPos {
    /// Local X offset.
    pub x: u32,
    /// Local Y offset.
    pub y: u32,
    /// Local Z offset.
    pub z: u32,
}

impl LocalPos {
    /// Construct a local position.
    pub const fn new(x: u32, y: u32, z: u32) -> Self {
        Self { x, y, z }
    }

    /// Convert to a linear index within a chunk's dense tile array. The
    /// layout is z-fastest, then y, then x, and is a bijection into
    /// `[0, extent.volume())` for any extent, square or not.
    pub fn index(self, extent: ChunkExtent) -> usize {
        debug_assert!(self.x < extent.x());
        debug_assert!(self.y < extent.y());
        debug_assert!(self.z < extent.z());
        self.z as usize
            + extent.z() as usize * (self.x as usize * extent.y() as usize + self.y as usize)
    }
}

impl fmt::Display for LocalPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extent_clamps_zero_components() {
        let extent = ChunkExtent::new(16, 0, 1);
        assert_eq!(extent.y(), 1);
        assert_eq!(extent.volume(), 16);
    }

    #[test]
    fn local_pos_index_is_z_major() {
        let extent = ChunkExtent::new(16, 16, 1);
        assert_eq!(LocalPos::new(0, 0, 0).index(extent), 0);
        assert_eq!(LocalPos::new(0, 1, 0).index(extent), 1);
        assert_eq!(LocalPos::new(1, 0, 0).index(extent), 16);
        assert_eq!(LocalPos::new(15, 15, 0).index(extent), 255);
    }

    #[test]
    fn local_pos_index_with_layers() {
        let extent = ChunkExtent::new(4, 4, 4);
        assert_eq!(LocalPos::new(0, 0, 1).index(extent), 1);
        assert_eq!(LocalPos::new(0, 1, 0).index(extent), 4);
        assert_eq!(LocalPos::new(1, 0, 0).index(extent), 16);
    }

    #[test]
    fn index_stays_in_bounds_for_rectangular_extents() {
        let wide = ChunkExtent::new(32, 16, 1);
        assert_eq!(LocalPos::new(31, 15, 0).index(wide), wide.volume() - 1);
        let tall = ChunkExtent::new(16, 32, 1);
        assert_eq!(LocalPos::new(15, 31, 0).index(tall), tall.volume() - 1);
    }

    #[test]
    fn index_is_a_bijection_for_rectangular_extents() {
        for extent in [
            ChunkExtent::new(2, 5, 1),
            ChunkExtent::new(5, 2, 3),
            ChunkExtent::new(32, 16, 1),
        ] {
            let mut seen = vec![false; extent.volume()];
            for x in 0..extent.x() {
                for y in 0..extent.y() {
                    for z in 0..extent.z() {
                        let index = LocalPos::new(x, y, z).index(extent);
                        assert!(index < extent.volume());
                        assert!(!seen[index], "index {index} hit twice in {extent}");
                        seen[index] = true;
                    }
                }
            }
        }
    }

    #[test]
    fn chunk_pos_ordering_is_deterministic() {
        let a = ChunkPos::new(0, 0, 0);
        let b = ChunkPos::new(0, 1, 0);
        let c = ChunkPos::new(1, 0, 0);
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn tile_pos_display() {
        assert_eq!(format!("{}", TilePos::new(5, -3, 0)), "(5, -3, 0)");
    }
}
