use serde::{Deserialize, Serialize};
use tilestream_core::{coords, ChunkExtent, ChunkPos, LocalPos, TilePos};

use crate::{ChunkData, PropertyValue, WorldError};

/// A fixed-size cuboid partition of the tile grid: the unit of loading and
/// saving. Owns a dense array of tile ids (empty string = no tile), a sparse
/// property store and a dirty flag tracking divergence from storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    position: ChunkPos,
    extent: ChunkExtent,
    tiles: Vec<String>,
    data: ChunkData,
    #[serde(skip)]
    dirty: bool,
}

impl Chunk {
    /// Allocate a fresh, clean, empty chunk.
    pub fn new(position: ChunkPos, extent: ChunkExtent) -> Self {
        Self {
            position,
            extent,
            tiles: vec![String::new(); extent.volume()],
            data: ChunkData::new(),
            dirty: false,
        }
    }

    /// Import a chunk from an existing tile grid. Tiles outside this chunk
    /// are rejected with `InvalidPosition`; the result is dirty since it has
    /// never been saved.
    pub fn from_tiles<I>(position: ChunkPos, extent: ChunkExtent, tiles: I) -> Result<Self, WorldError>
    where
        I: IntoIterator<Item = (TilePos, String)>,
    {
        let mut chunk = Self::new(position, extent);
        for (tile, id) in tiles {
            chunk.set_tile_at(tile, &id)?;
        }
        Ok(chunk)
    }

    /// Position of this chunk in chunk space, fixed at creation.
    #[inline]
    pub fn position(&self) -> ChunkPos {
        self.position
    }

    /// Chunk size in tiles per axis.
    #[inline]
    pub fn extent(&self) -> ChunkExtent {
        self.extent
    }

    /// Whether this chunk has been mutated since its last successful save.
    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Mark the chunk as matching storage (called after a successful save).
    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    /// Read-only view of the property store.
    pub fn data(&self) -> &ChunkData {
        &self.data
    }

    /// Mutable view of the property store. Marks the chunk dirty, since the
    /// caller can change the store arbitrarily.
    pub fn data_mut(&mut self) -> &mut ChunkData {
        self.dirty = true;
        &mut self.data
    }

    /// Tile id at the given position, or `None` when empty.
    pub fn tile_at(&self, tile: TilePos) -> Result<Option<&str>, WorldError> {
        let local = self.validate(tile)?;
        let id = &self.tiles[local.index(self.extent)];
        Ok(if id.is_empty() { None } else { Some(id) })
    }

    /// Set the tile id at the given position. An empty id degrades to
    /// [`Chunk::remove_tile_at`]. Erases any properties stored at the
    /// position: metadata does not survive a tile replacement.
    pub fn set_tile_at(&mut self, tile: TilePos, id: &str) -> Result<(), WorldError> {
        let local = self.validate(tile)?;
        if id.is_empty() {
            return self.remove_tile_at(tile);
        }
        self.tiles[local.index(self.extent)] = id.to_string();
        self.dirty = true;
        self.data.erase_position(local);
        Ok(())
    }

    /// Remove the tile at the given position, erasing its properties.
    pub fn remove_tile_at(&mut self, tile: TilePos) -> Result<(), WorldError> {
        let local = self.validate(tile)?;
        self.tiles[local.index(self.extent)].clear();
        self.dirty = true;
        self.data.erase_position(local);
        Ok(())
    }

    /// Whether the given position holds no tile.
    pub fn is_empty_tile_at(&self, tile: TilePos) -> Result<bool, WorldError> {
        Ok(self.tile_at(tile)?.is_none())
    }

    /// Whether the whole chunk holds no tiles.
    pub fn is_empty(&self) -> bool {
        self.tiles.iter().all(|id| id.is_empty())
    }

    /// Store a property at the given tile position.
    pub fn set_property(
        &mut self,
        tile: TilePos,
        name: &str,
        value: PropertyValue,
    ) -> Result<(), WorldError> {
        let local = self.validate(tile)?;
        self.data.set(local, name, value);
        self.dirty = true;
        Ok(())
    }

    /// Read a property at the given tile position without a type check.
    pub fn property(&self, tile: TilePos, name: &str) -> Result<Option<&PropertyValue>, WorldError> {
        let local = self.validate(tile)?;
        Ok(self.data.value_at(local, name))
    }

    /// Remove a property at the given tile position. Returns whether an
    /// entry was removed.
    pub fn erase_property(&mut self, tile: TilePos, name: &str) -> Result<bool, WorldError> {
        let local = self.validate(tile)?;
        let removed = self.data.erase(local, name);
        if removed {
            self.dirty = true;
        }
        Ok(removed)
    }

    /// Wipe the tile array and property store. `mark_dirty` controls whether
    /// the chunk is subsequently considered to need saving; pass false when
    /// discarding an already-saved, unmodified chunk.
    pub fn clear(&mut self, mark_dirty: bool) {
        for id in &mut self.tiles {
            id.clear();
        }
        self.data.reset();
        self.dirty = mark_dirty;
    }

    /// Validate that `tile` belongs to this chunk and map it to local space.
    fn validate(&self, tile: TilePos) -> Result<LocalPos, WorldError> {
        let owner = coords::tile_to_chunk(tile, self.extent);
        if owner != self.position {
            return Err(WorldError::InvalidPosition {
                tile,
                chunk: self.position,
            });
        }
        Ok(coords::tile_to_local(tile, self.extent))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXTENT: ChunkExtent = ChunkExtent::new(16, 16, 1);

    #[test]
    fn new_chunk_is_clean_and_empty() {
        let chunk = Chunk::new(ChunkPos::new(0, 0, 0), EXTENT);
        assert!(!chunk.is_dirty());
        assert!(chunk.is_empty());
        assert_eq!(chunk.tile_at(TilePos::new(5, 5, 0)).unwrap(), None);
    }

    #[test]
    fn set_and_get_round_trip() {
        let mut chunk = Chunk::new(ChunkPos::new(1, 0, 0), EXTENT);
        chunk.set_tile_at(TilePos::new(20, 5, 0), "grass").unwrap();
        assert_eq!(chunk.tile_at(TilePos::new(20, 5, 0)).unwrap(), Some("grass"));
        assert!(chunk.is_dirty());
        assert!(!chunk.is_empty());
    }

    #[test]
    fn negative_tiles_land_in_the_negative_chunk() {
        let mut chunk = Chunk::new(ChunkPos::new(-1, -1, 0), EXTENT);
        chunk.set_tile_at(TilePos::new(-1, -1, 0), "water").unwrap();
        assert_eq!(
            chunk.tile_at(TilePos::new(-1, -1, 0)).unwrap(),
            Some("water")
        );
        // (-1, -1) is the far corner of chunk (-1, -1): local (15, 15).
        assert_eq!(
            coords::tile_to_local(TilePos::new(-1, -1, 0), EXTENT),
            LocalPos::new(15, 15, 0)
        );
    }

    #[test]
    fn wide_extent_reaches_the_far_corner() {
        let extent = ChunkExtent::new(32, 16, 1);
        let mut chunk = Chunk::new(ChunkPos::new(0, 0, 0), extent);
        chunk.set_tile_at(TilePos::new(31, 15, 0), "grass").unwrap();
        assert_eq!(
            chunk.tile_at(TilePos::new(31, 15, 0)).unwrap(),
            Some("grass")
        );
    }

    #[test]
    fn rectangular_extent_keeps_tiles_distinct() {
        let extent = ChunkExtent::new(2, 5, 1);
        let mut chunk = Chunk::new(ChunkPos::new(0, 0, 0), extent);
        chunk.set_tile_at(TilePos::new(0, 2, 0), "grass").unwrap();
        chunk.set_tile_at(TilePos::new(1, 0, 0), "water").unwrap();
        assert_eq!(chunk.tile_at(TilePos::new(0, 2, 0)).unwrap(), Some("grass"));
        assert_eq!(chunk.tile_at(TilePos::new(1, 0, 0)).unwrap(), Some("water"));
    }

    #[test]
    fn foreign_positions_are_rejected() {
        let mut chunk = Chunk::new(ChunkPos::new(0, 0, 0), EXTENT);
        let err = chunk.set_tile_at(TilePos::new(16, 0, 0), "grass").unwrap_err();
        assert!(matches!(err, WorldError::InvalidPosition { .. }));
        assert!(!chunk.is_dirty());
        assert!(chunk.tile_at(TilePos::new(16, 0, 0)).is_err());
    }

    #[test]
    fn empty_id_degrades_to_remove() {
        let mut chunk = Chunk::new(ChunkPos::new(0, 0, 0), EXTENT);
        let pos = TilePos::new(3, 3, 0);
        chunk.set_tile_at(pos, "grass").unwrap();
        chunk.set_tile_at(pos, "").unwrap();
        assert_eq!(chunk.tile_at(pos).unwrap(), None);
        assert!(chunk.is_empty());
    }

    #[test]
    fn reads_never_dirty() {
        let mut chunk = Chunk::new(ChunkPos::new(0, 0, 0), EXTENT);
        chunk.set_tile_at(TilePos::new(1, 1, 0), "grass").unwrap();
        chunk.mark_clean();
        let _ = chunk.tile_at(TilePos::new(1, 1, 0)).unwrap();
        let _ = chunk.is_empty_tile_at(TilePos::new(2, 2, 0)).unwrap();
        assert!(!chunk.is_dirty());
    }

    #[test]
    fn remove_always_dirties() {
        let mut chunk = Chunk::new(ChunkPos::new(0, 0, 0), EXTENT);
        // Removing an already-empty tile still counts as a mutation.
        chunk.remove_tile_at(TilePos::new(0, 0, 0)).unwrap();
        assert!(chunk.is_dirty());
    }

    #[test]
    fn tile_replacement_erases_properties() {
        let mut chunk = Chunk::new(ChunkPos::new(0, 0, 0), EXTENT);
        let pos = TilePos::new(4, 4, 0);
        chunk.set_tile_at(pos, "grass").unwrap();
        chunk
            .set_property(pos, "health", PropertyValue::Int(10))
            .unwrap();
        chunk.set_tile_at(pos, "sand").unwrap();
        assert_eq!(chunk.property(pos, "health").unwrap(), None);
    }

    #[test]
    fn properties_on_other_tiles_survive_a_replacement() {
        let mut chunk = Chunk::new(ChunkPos::new(0, 0, 0), EXTENT);
        let a = TilePos::new(4, 4, 0);
        let b = TilePos::new(5, 4, 0);
        chunk.set_property(a, "health", PropertyValue::Int(10)).unwrap();
        chunk.set_property(b, "health", PropertyValue::Int(20)).unwrap();
        chunk.set_tile_at(a, "sand").unwrap();
        assert_eq!(
            chunk.property(b, "health").unwrap(),
            Some(&PropertyValue::Int(20))
        );
    }

    #[test]
    fn clear_controls_the_dirty_flag() {
        let mut chunk = Chunk::new(ChunkPos::new(0, 0, 0), EXTENT);
        chunk.set_tile_at(TilePos::new(0, 0, 0), "grass").unwrap();
        chunk
            .set_property(TilePos::new(0, 0, 0), "health", PropertyValue::Int(1))
            .unwrap();
        chunk.clear(false);
        assert!(chunk.is_empty());
        assert!(chunk.data().is_empty());
        assert!(!chunk.is_dirty());

        chunk.set_tile_at(TilePos::new(0, 0, 0), "grass").unwrap();
        chunk.clear(true);
        assert!(chunk.is_dirty());
    }

    #[test]
    fn from_tiles_imports_an_existing_grid() {
        let tiles = vec![
            (TilePos::new(0, 0, 0), "grass".to_string()),
            (TilePos::new(1, 0, 0), "water".to_string()),
            (TilePos::new(2, 0, 0), String::new()),
        ];
        let chunk = Chunk::from_tiles(ChunkPos::new(0, 0, 0), EXTENT, tiles).unwrap();
        assert_eq!(chunk.tile_at(TilePos::new(0, 0, 0)).unwrap(), Some("grass"));
        assert_eq!(chunk.tile_at(TilePos::new(2, 0, 0)).unwrap(), None);
        assert!(chunk.is_dirty());
    }
}
