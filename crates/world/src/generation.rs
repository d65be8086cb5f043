use tracing::info;

use tilestream_core::TileBounds;

use crate::{World, WorldError};

/// Seed generator for new worlds: fills a rectangular island with one tile
/// id, leaving everything outside the bounds empty.
pub struct IslandGenerator {
    bounds: TileBounds,
    tile: String,
}

impl IslandGenerator {
    /// Configure a generator over the given bounds.
    pub fn new(bounds: TileBounds, tile: impl Into<String>) -> Self {
        Self {
            bounds,
            tile: tile.into(),
        }
    }

    /// The bounds this generator fills.
    pub fn bounds(&self) -> TileBounds {
        self.bounds
    }

    /// Fill the world. The fill tile must be registered; the chunks it
    /// touches end up resident and dirty. Returns the placed tile count.
    pub fn generate(&self, world: &mut World) -> Result<usize, WorldError> {
        let tiles = self
            .bounds
            .positions()
            .map(|pos| (pos, self.tile.clone()));
        let placed = world.import_tiles(tiles)?;
        info!(
            "generated {placed} {:?} tiles across {} chunks",
            self.tile,
            world.dirty_chunks().len()
        );
        Ok(placed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::{SystemTime, UNIX_EPOCH};
    use tilestream_assets::{TileDefinition, TileRegistry};
    use tilestream_core::{ChunkExtent, TilePos};
    use crate::WorldInfo;

    fn temp_world() -> World {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let root = std::env::temp_dir().join(format!("tilestream_gen_{timestamp}"));
        let registry =
            Arc::new(TileRegistry::new(vec![TileDefinition::simple("grass")]).unwrap());
        World::new(
            WorldInfo::new("Gen World", ChunkExtent::new(16, 16, 1)),
            root,
            registry,
        )
    }

    #[test]
    fn fills_the_bounds_and_nothing_else() {
        let mut world = temp_world();
        let bounds = TileBounds::new(TilePos::new(-8, -8, 0), TilePos::new(8, 8, 1));
        let generator = IslandGenerator::new(bounds, "grass");

        assert_eq!(generator.generate(&mut world).unwrap(), 256);
        assert_eq!(
            world.tile_id_at(TilePos::new(0, 0, 0)).unwrap().as_deref(),
            Some("grass")
        );
        assert_eq!(
            world.tile_id_at(TilePos::new(-8, -8, 0)).unwrap().as_deref(),
            Some("grass")
        );
        assert_eq!(world.tile_id_at(TilePos::new(8, 0, 0)).unwrap(), None);
        // The island straddles four chunks around the origin.
        assert_eq!(world.dirty_chunks().len(), 4);
    }

    #[test]
    fn unknown_fill_tile_is_refused() {
        let mut world = temp_world();
        let bounds = TileBounds::new(TilePos::new(0, 0, 0), TilePos::new(2, 2, 1));
        let generator = IslandGenerator::new(bounds, "lava");
        assert!(generator.generate(&mut world).is_err());
        assert_eq!(world.dirty_chunks().len(), 0);
    }
}
