//! The chunk store: reference-counted residency over a [`WorldStore`].

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use tilestream_assets::{TileDefinition, TileRegistry};
use tilestream_core::{coords, ChunkExtent, ChunkPos, TilePos};

use crate::{Chunk, ChunkData, PropertyValue, WorldError, WorldInfo, WorldStore};

/// Opaque identity of a party holding chunks resident (a player's streaming
/// viewport, a simulation system, a script). Issued by the service layer.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct RequesterId(u64);

impl RequesterId {
    /// Construct a requester id from a raw sequence number.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for RequesterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "requester#{}", self.0)
    }
}

/// Lifetime counters for chunk traffic through one [`World`].
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct WorldStats {
    /// Chunks deserialized from storage.
    pub chunks_loaded: u64,
    /// Chunks created fresh because storage had no record of them.
    pub chunks_created: u64,
    /// Dirty chunks written to storage.
    pub chunks_saved: u64,
    /// Chunks dropped from residency.
    pub chunks_evicted: u64,
}

/// The chunk store. Chunks are resident while at least one requester holds
/// them; tile reads and writes pull their chunk resident on demand, and
/// [`World::sweep_orphans`] evicts whatever no requester still wants.
pub struct World {
    info: WorldInfo,
    extent: ChunkExtent,
    chunks: BTreeMap<ChunkPos, Chunk>,
    requests: HashMap<ChunkPos, Vec<RequesterId>>,
    store: WorldStore,
    registry: Arc<TileRegistry>,
    stats: WorldStats,
}

impl World {
    /// Create a world in memory. Nothing touches disk until the first save.
    pub fn new<P: AsRef<Path>>(info: WorldInfo, saves_root: P, registry: Arc<TileRegistry>) -> Self {
        let store = WorldStore::new(saves_root, &info.id());
        Self::with_store(info, store, registry)
    }

    /// Open an existing world by id, reading its metadata record. The save
    /// directory stays keyed by `world_id` even if the stored display name
    /// would derive a different id.
    pub fn open<P: AsRef<Path>>(
        saves_root: P,
        world_id: &str,
        registry: Arc<TileRegistry>,
    ) -> Result<Self> {
        let store = WorldStore::new(saves_root, world_id);
        let info = store
            .load_world_info()
            .with_context(|| format!("failed to open world {world_id:?}"))?;
        info!("opened world {:?} (extent {})", info.name, info.extent);
        Ok(Self::with_store(info, store, registry))
    }

    fn with_store(info: WorldInfo, store: WorldStore, registry: Arc<TileRegistry>) -> Self {
        let extent = info.extent;
        Self {
            info,
            extent,
            chunks: BTreeMap::new(),
            requests: HashMap::new(),
            store,
            registry,
            stats: WorldStats::default(),
        }
    }

    /// World metadata.
    pub fn info(&self) -> &WorldInfo {
        &self.info
    }

    /// Chunk size in tiles per axis, fixed at world creation.
    pub fn extent(&self) -> ChunkExtent {
        self.extent
    }

    /// Lifetime chunk-traffic counters.
    pub fn stats(&self) -> WorldStats {
        self.stats
    }

    /// The tile registry this world resolves ids against.
    pub fn registry(&self) -> &Arc<TileRegistry> {
        &self.registry
    }

    /// The persistence layer backing this world.
    pub fn store(&self) -> &WorldStore {
        &self.store
    }

    /// Number of currently resident chunks.
    pub fn resident_count(&self) -> usize {
        self.chunks.len()
    }

    /// Whether the given chunk is currently resident.
    pub fn is_resident(&self, pos: ChunkPos) -> bool {
        self.chunks.contains_key(&pos)
    }

    /// Number of requesters currently holding the given chunk.
    pub fn requester_count(&self, pos: ChunkPos) -> usize {
        self.requests.get(&pos).map_or(0, Vec::len)
    }

    /// The chunk that owns the given tile position.
    pub fn chunk_position_for_tile(&self, tile: TilePos) -> ChunkPos {
        coords::tile_to_chunk(tile, self.extent)
    }

    /// Register `requester` on the given chunk and make it resident.
    /// Registering twice is a no-op; the chunk stays resident until the same
    /// requester releases it.
    pub fn request_load(&mut self, requester: RequesterId, pos: ChunkPos) {
        let holders = self.requests.entry(pos).or_default();
        if !holders.contains(&requester) {
            holders.push(requester);
        }
        self.ensure_resident(pos);
    }

    /// Batch variant of [`World::request_load`].
    pub fn request_load_all(&mut self, requester: RequesterId, positions: &[ChunkPos]) {
        for &pos in positions {
            self.request_load(requester, pos);
        }
    }

    /// Release `requester`'s hold on the given chunk. Releasing a chunk the
    /// requester never held is a caller bug and is logged; when the last
    /// holder releases, the chunk is evicted (saved first if dirty).
    pub fn request_unload(&mut self, requester: RequesterId, pos: ChunkPos) {
        let Some(holders) = self.requests.get_mut(&pos) else {
            error!("{requester} released chunk {pos} it never requested");
            return;
        };
        let Some(index) = holders.iter().position(|r| *r == requester) else {
            error!("{requester} released chunk {pos} it never requested");
            return;
        };
        holders.remove(index);
        if holders.is_empty() {
            self.requests.remove(&pos);
            self.evict(pos);
        }
    }

    /// Batch variant of [`World::request_unload`].
    pub fn request_unload_all(&mut self, requester: RequesterId, positions: &[ChunkPos]) {
        for &pos in positions {
            self.request_unload(requester, pos);
        }
    }

    /// Resolve the tile at the given position against the registry, pulling
    /// its chunk resident if needed. An id with no definition is logged and
    /// reads as empty.
    pub fn tile_at(&mut self, tile: TilePos) -> Result<Option<&TileDefinition>, WorldError> {
        let Some(id) = self.tile_id_at(tile)? else {
            return Ok(None);
        };
        match self.registry.get(&id) {
            Some(def) => Ok(Some(def)),
            None => {
                warn!("tile at {tile} holds unknown id {id:?}");
                Ok(None)
            }
        }
    }

    /// Raw tile id at the given position, pulling its chunk resident if
    /// needed.
    pub fn tile_id_at(&mut self, tile: TilePos) -> Result<Option<String>, WorldError> {
        let pos = self.chunk_position_for_tile(tile);
        let chunk = self.ensure_resident(pos);
        Ok(chunk.tile_at(tile)?.map(str::to_string))
    }

    /// Place a tile. The id must be registered; unknown ids are refused
    /// without changing state. An empty id removes the tile.
    pub fn set_tile_at(&mut self, tile: TilePos, id: &str) -> Result<(), WorldError> {
        if !id.is_empty() && !self.registry.contains(id) {
            error!("refusing to place unknown tile id {id:?} at {tile}");
            return Err(WorldError::UnknownTile(id.to_string()));
        }
        let pos = self.chunk_position_for_tile(tile);
        self.ensure_resident(pos).set_tile_at(tile, id)
    }

    /// Remove the tile at the given position.
    pub fn remove_tile_at(&mut self, tile: TilePos) -> Result<(), WorldError> {
        let pos = self.chunk_position_for_tile(tile);
        self.ensure_resident(pos).remove_tile_at(tile)
    }

    /// Whether the given position holds no tile.
    pub fn is_empty_tile_at(&mut self, tile: TilePos) -> Result<bool, WorldError> {
        let pos = self.chunk_position_for_tile(tile);
        self.ensure_resident(pos).is_empty_tile_at(tile)
    }

    /// Read-only view of a resident chunk's property store. Property access
    /// never loads: the chunk must already be held by a requester.
    pub fn chunk_data(&self, pos: ChunkPos) -> Result<&ChunkData, WorldError> {
        self.chunks
            .get(&pos)
            .map(Chunk::data)
            .ok_or(WorldError::NotResident(pos))
    }

    /// Read-only view of the property store owning the given tile.
    pub fn chunk_data_for_tile(&self, tile: TilePos) -> Result<&ChunkData, WorldError> {
        self.chunk_data(self.chunk_position_for_tile(tile))
    }

    /// Mutable view of a resident chunk's property store. Marks the chunk
    /// dirty.
    pub fn chunk_data_mut(&mut self, pos: ChunkPos) -> Result<&mut ChunkData, WorldError> {
        self.chunks
            .get_mut(&pos)
            .map(Chunk::data_mut)
            .ok_or(WorldError::NotResident(pos))
    }

    /// Store a property on a tile in a resident chunk.
    pub fn set_property_at(
        &mut self,
        tile: TilePos,
        name: &str,
        value: PropertyValue,
    ) -> Result<(), WorldError> {
        self.resident_mut(tile)?.set_property(tile, name, value)
    }

    /// Read a property from a tile in a resident chunk.
    pub fn property_at(
        &self,
        tile: TilePos,
        name: &str,
    ) -> Result<Option<&PropertyValue>, WorldError> {
        let pos = self.chunk_position_for_tile(tile);
        self.chunks
            .get(&pos)
            .ok_or(WorldError::NotResident(pos))?
            .property(tile, name)
    }

    /// Remove a property from a tile in a resident chunk. Returns whether an
    /// entry was removed.
    pub fn erase_property_at(&mut self, tile: TilePos, name: &str) -> Result<bool, WorldError> {
        self.resident_mut(tile)?.erase_property(tile, name)
    }

    /// Positions of every resident chunk with unsaved changes.
    pub fn dirty_chunks(&self) -> Vec<ChunkPos> {
        self.chunks
            .values()
            .filter(|chunk| chunk.is_dirty())
            .map(Chunk::position)
            .collect()
    }

    /// Write every dirty resident chunk to storage. Per-chunk failures are
    /// logged and leave that chunk dirty. Returns the saved count.
    pub fn save_dirty(&mut self) -> usize {
        let mut saved = 0;
        for chunk in self.chunks.values_mut().filter(|c| c.is_dirty()) {
            match self.store.save_chunk(chunk) {
                Ok(()) => {
                    chunk.mark_clean();
                    saved += 1;
                }
                Err(e) => error!("error while saving chunk {}: {e:#}", chunk.position()),
            }
        }
        self.stats.chunks_saved += saved as u64;
        if saved > 0 {
            debug!("saved {saved} dirty chunks");
        }
        saved
    }

    /// Persist the world: metadata record plus every dirty chunk. Returns
    /// the number of chunks written.
    pub fn save(&mut self) -> Result<usize> {
        self.store.save_world_info(&self.info)?;
        Ok(self.save_dirty())
    }

    /// Evict every resident chunk no requester currently holds. Called by
    /// the service after draining its operation queue, so chunks touched by
    /// one-off tile operations do not accumulate. Returns the evicted count.
    pub fn sweep_orphans(&mut self) -> usize {
        let orphans: Vec<ChunkPos> = self
            .chunks
            .keys()
            .copied()
            .filter(|pos| self.requester_count(*pos) == 0)
            .collect();
        let mut evicted = 0;
        for pos in orphans {
            if self.evict(pos) {
                evicted += 1;
            }
        }
        evicted
    }

    /// Bulk-place tiles from an existing grid, spanning any number of
    /// chunks. Every id is validated up front; nothing is written when any
    /// id is unknown. Returns the number of placed tiles.
    pub fn import_tiles<I>(&mut self, tiles: I) -> Result<usize, WorldError>
    where
        I: IntoIterator<Item = (TilePos, String)>,
    {
        let tiles: Vec<(TilePos, String)> = tiles.into_iter().collect();
        for (tile, id) in &tiles {
            if !id.is_empty() && !self.registry.contains(id) {
                error!("refusing to import unknown tile id {id:?} at {tile}");
                return Err(WorldError::UnknownTile(id.clone()));
            }
        }
        let count = tiles.len();
        for (tile, id) in tiles {
            let pos = self.chunk_position_for_tile(tile);
            self.ensure_resident(pos).set_tile_at(tile, &id)?;
        }
        Ok(count)
    }

    /// Make a chunk resident: reuse it if already resident, load it from
    /// storage if a save exists, create it fresh otherwise. An unreadable
    /// save is logged and replaced with a fresh chunk so residency always
    /// holds afterward.
    fn ensure_resident(&mut self, pos: ChunkPos) -> &mut Chunk {
        use std::collections::btree_map::Entry;
        match self.chunks.entry(pos) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let chunk = if self.store.chunk_exists(pos) {
                    match self.store.load_chunk(pos) {
                        Ok(chunk) => {
                            self.stats.chunks_loaded += 1;
                            chunk
                        }
                        Err(e) => {
                            error!("error while loading chunk {pos}: {e:#}");
                            self.stats.chunks_created += 1;
                            Chunk::new(pos, self.extent)
                        }
                    }
                } else {
                    self.stats.chunks_created += 1;
                    Chunk::new(pos, self.extent)
                };
                entry.insert(chunk)
            }
        }
    }

    fn resident_mut(&mut self, tile: TilePos) -> Result<&mut Chunk, WorldError> {
        let pos = self.chunk_position_for_tile(tile);
        self.chunks
            .get_mut(&pos)
            .ok_or(WorldError::NotResident(pos))
    }

    /// Drop a chunk from residency, saving it first when dirty. A failed
    /// save keeps the chunk resident rather than discarding unsaved changes.
    fn evict(&mut self, pos: ChunkPos) -> bool {
        let Some(chunk) = self.chunks.get_mut(&pos) else {
            return false;
        };
        if chunk.is_dirty() {
            if let Err(e) = self.store.save_chunk(chunk) {
                error!("keeping chunk {pos} resident: save failed: {e:#}");
                return false;
            }
            chunk.mark_clean();
            self.stats.chunks_saved += 1;
        }
        self.chunks.remove(&pos);
        self.stats.chunks_evicted += 1;
        debug!("evicted chunk {pos}");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};
    use tilestream_assets::TileDefinition;

    const EXTENT: ChunkExtent = ChunkExtent::new(16, 16, 1);

    fn registry() -> Arc<TileRegistry> {
        Arc::new(
            TileRegistry::new(vec![
                TileDefinition::simple("grass"),
                TileDefinition::simple("water"),
                TileDefinition::simple("sand"),
            ])
            .unwrap(),
        )
    }

    fn temp_world(tag: &str) -> World {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let root = std::env::temp_dir().join(format!("tilestream_world_{tag}_{timestamp}"));
        World::new(WorldInfo::new("Test World", EXTENT), root, registry())
    }

    #[test]
    fn tile_write_pulls_the_chunk_resident() {
        let mut world = temp_world("pull");
        assert_eq!(world.resident_count(), 0);
        world.set_tile_at(TilePos::new(20, 5, 0), "grass").unwrap();
        assert!(world.is_resident(ChunkPos::new(1, 0, 0)));
        assert_eq!(
            world.tile_at(TilePos::new(20, 5, 0)).unwrap().unwrap().id,
            "grass"
        );
    }

    #[test]
    fn unknown_tile_id_is_refused() {
        let mut world = temp_world("unknown");
        let err = world.set_tile_at(TilePos::new(0, 0, 0), "lava").unwrap_err();
        assert!(matches!(err, WorldError::UnknownTile(id) if id == "lava"));
        assert_eq!(world.tile_id_at(TilePos::new(0, 0, 0)).unwrap(), None);
    }

    #[test]
    fn residency_is_reference_counted() {
        let mut world = temp_world("refcount");
        let a = RequesterId::new(1);
        let b = RequesterId::new(2);
        let pos = ChunkPos::new(0, 0, 0);

        world.request_load(a, pos);
        world.request_load(b, pos);
        assert_eq!(world.requester_count(pos), 2);

        world.request_unload(a, pos);
        assert!(world.is_resident(pos));

        world.request_unload(b, pos);
        assert!(!world.is_resident(pos));
    }

    #[test]
    fn duplicate_load_requests_register_once() {
        let mut world = temp_world("idempotent");
        let a = RequesterId::new(1);
        let pos = ChunkPos::new(2, 2, 0);
        world.request_load(a, pos);
        world.request_load(a, pos);
        assert_eq!(world.requester_count(pos), 1);
        world.request_unload(a, pos);
        assert!(!world.is_resident(pos));
    }

    #[test]
    fn unregistered_unload_changes_nothing() {
        let mut world = temp_world("stranger");
        let a = RequesterId::new(1);
        let stranger = RequesterId::new(99);
        let pos = ChunkPos::new(0, 0, 0);
        world.request_load(a, pos);
        world.request_unload(stranger, pos);
        assert!(world.is_resident(pos));
        assert_eq!(world.requester_count(pos), 1);
    }

    #[test]
    fn eviction_saves_dirty_chunks() {
        let mut world = temp_world("evict");
        let a = RequesterId::new(1);
        let pos = ChunkPos::new(0, 0, 0);
        world.request_load(a, pos);
        world.set_tile_at(TilePos::new(3, 3, 0), "water").unwrap();
        world.request_unload(a, pos);

        assert!(!world.is_resident(pos));
        assert!(world.store().chunk_exists(pos));
        assert_eq!(world.stats().chunks_saved, 1);

        // Loading it back sees the saved tile.
        assert_eq!(
            world.tile_id_at(TilePos::new(3, 3, 0)).unwrap().as_deref(),
            Some("water")
        );
        assert_eq!(world.stats().chunks_loaded, 1);
    }

    #[test]
    fn sweep_evicts_only_unrequested_chunks() {
        let mut world = temp_world("sweep");
        let a = RequesterId::new(1);
        let held = ChunkPos::new(0, 0, 0);
        world.request_load(a, held);

        // Touching a far tile pulls a second chunk resident with no holder.
        world.set_tile_at(TilePos::new(160, 0, 0), "grass").unwrap();
        assert_eq!(world.resident_count(), 2);

        assert_eq!(world.sweep_orphans(), 1);
        assert!(world.is_resident(held));
        assert!(!world.is_resident(ChunkPos::new(10, 0, 0)));
    }

    #[test]
    fn properties_require_residency() {
        let mut world = temp_world("props");
        let tile = TilePos::new(1, 1, 0);
        let err = world
            .set_property_at(tile, "health", PropertyValue::Int(3))
            .unwrap_err();
        assert!(matches!(err, WorldError::NotResident(_)));

        let a = RequesterId::new(1);
        world.request_load(a, ChunkPos::new(0, 0, 0));
        world
            .set_property_at(tile, "health", PropertyValue::Int(3))
            .unwrap();
        assert_eq!(
            world.property_at(tile, "health").unwrap(),
            Some(&PropertyValue::Int(3))
        );
        assert!(world.erase_property_at(tile, "health").unwrap());
        assert_eq!(world.property_at(tile, "health").unwrap(), None);
    }

    #[test]
    fn batch_requests_cover_every_position() {
        let mut world = temp_world("batch");
        let a = RequesterId::new(1);
        let positions = [ChunkPos::new(0, 0, 0), ChunkPos::new(1, 0, 0)];
        world.request_load_all(a, &positions);
        assert_eq!(world.resident_count(), 2);
        world.request_unload_all(a, &positions);
        assert_eq!(world.resident_count(), 0);
    }

    #[test]
    fn chunk_data_for_tile_reads_the_owning_chunk() {
        let mut world = temp_world("data_for_tile");
        let tile = TilePos::new(20, 5, 0);
        let err = world.chunk_data_for_tile(tile).unwrap_err();
        assert!(matches!(err, WorldError::NotResident(pos) if pos == ChunkPos::new(1, 0, 0)));

        let a = RequesterId::new(1);
        world.request_load(a, ChunkPos::new(1, 0, 0));
        world
            .set_property_at(tile, "health", PropertyValue::Int(9))
            .unwrap();
        let data = world.chunk_data_for_tile(tile).unwrap();
        assert_eq!(
            data.int_at(tilestream_core::LocalPos::new(4, 5, 0), "health")
                .unwrap(),
            Some(9)
        );
    }

    #[test]
    fn chunk_data_mut_marks_the_chunk_dirty() {
        let mut world = temp_world("data_mut");
        let a = RequesterId::new(1);
        let pos = ChunkPos::new(0, 0, 0);
        world.request_load(a, pos);
        assert!(world.dirty_chunks().is_empty());

        world
            .chunk_data_mut(pos)
            .unwrap()
            .set(tilestream_core::LocalPos::new(0, 0, 0), "owner", PropertyValue::Str("p1".into()));
        assert_eq!(world.dirty_chunks(), vec![pos]);
    }

    #[test]
    fn save_dirty_cleans_and_counts() {
        let mut world = temp_world("save");
        world.set_tile_at(TilePos::new(0, 0, 0), "grass").unwrap();
        world.set_tile_at(TilePos::new(16, 0, 0), "water").unwrap();
        assert_eq!(world.dirty_chunks().len(), 2);

        assert_eq!(world.save().unwrap(), 2);
        assert!(world.dirty_chunks().is_empty());
        assert_eq!(world.store().saved_chunk_count(), 2);

        // A second save has nothing to write.
        assert_eq!(world.save().unwrap(), 0);
    }

    #[test]
    fn import_rejects_unknown_ids_atomically() {
        let mut world = temp_world("import");
        let tiles = vec![
            (TilePos::new(0, 0, 0), "grass".to_string()),
            (TilePos::new(1, 0, 0), "lava".to_string()),
        ];
        assert!(world.import_tiles(tiles).is_err());
        assert_eq!(world.tile_id_at(TilePos::new(0, 0, 0)).unwrap(), None);

        let good = vec![
            (TilePos::new(0, 0, 0), "grass".to_string()),
            (TilePos::new(17, 0, 0), "sand".to_string()),
        ];
        assert_eq!(world.import_tiles(good).unwrap(), 2);
        assert_eq!(
            world.tile_id_at(TilePos::new(17, 0, 0)).unwrap().as_deref(),
            Some("sand")
        );
    }
}
