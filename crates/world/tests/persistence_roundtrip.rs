//! End-to-end save/load through the chunk store.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tilestream_assets::{TileDefinition, TileRegistry};
use tilestream_core::{ChunkExtent, ChunkPos, TilePos};
use tilestream_world::{PropertyValue, RequesterId, World, WorldInfo};

fn temp_root(tag: &str) -> std::path::PathBuf {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("tilestream_wtest_{tag}_{timestamp}"))
}

fn registry() -> Arc<TileRegistry> {
    Arc::new(
        TileRegistry::new(vec![
            TileDefinition::simple("grass"),
            TileDefinition::simple("water"),
        ])
        .unwrap(),
    )
}

#[test]
fn world_round_trips_through_storage() {
    let root = temp_root("roundtrip");
    let info = WorldInfo::new("Round Trip", ChunkExtent::new(16, 16, 1));
    let requester = RequesterId::new(1);
    let pos = ChunkPos::new(2, 0, 0);
    let tile = TilePos::new(35, 7, 0);

    {
        let mut world = World::new(info.clone(), &root, registry());
        world.request_load(requester, pos);
        world.set_tile_at(tile, "grass").unwrap();
        world
            .set_property_at(tile, "health", PropertyValue::Int(9))
            .unwrap();
        world.save().unwrap();
    }

    let mut world = World::open(&root, &info.id(), registry()).expect("open saved world");
    assert_eq!(world.info().name, "Round Trip");
    assert_eq!(world.extent(), ChunkExtent::new(16, 16, 1));

    world.request_load(requester, pos);
    assert_eq!(world.stats().chunks_loaded, 1);
    assert_eq!(world.stats().chunks_created, 0);
    assert!(world.dirty_chunks().is_empty());
    assert_eq!(world.tile_id_at(tile).unwrap().as_deref(), Some("grass"));
    assert_eq!(
        world.property_at(tile, "health").unwrap(),
        Some(&PropertyValue::Int(9))
    );

    std::fs::remove_dir_all(root).ok();
}

#[test]
fn eviction_then_reload_preserves_edits() {
    let root = temp_root("evict_reload");
    let info = WorldInfo::new("Evict Reload", ChunkExtent::new(16, 16, 1));
    let requester = RequesterId::new(7);
    let pos = ChunkPos::new(-1, -1, 0);
    let tile = TilePos::new(-1, -1, 0);

    let mut world = World::new(info, &root, registry());
    world.request_load(requester, pos);
    world.set_tile_at(tile, "water").unwrap();
    world.request_unload(requester, pos);
    assert!(!world.is_resident(pos));

    world.request_load(requester, pos);
    assert_eq!(world.tile_id_at(tile).unwrap().as_deref(), Some("water"));

    std::fs::remove_dir_all(root).ok();
}
