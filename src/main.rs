//! tilestream - chunked tile-world storage and streaming engine
//!
//! Command-line front end for creating, inspecting and editing worlds.

mod config;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use config::EngineConfig;
use tilestream_assets::{registry_from_file, TileRegistry};
use tilestream_core::{TileBounds, TilePos};
use tilestream_service::WorldService;
use tilestream_world::{IslandGenerator, World, WorldInfo, WorldStore};

#[derive(Parser)]
#[command(name = "tilestream", version, about)]
struct Cli {
    /// Path to the engine configuration file.
    #[arg(long, default_value = "tilestream.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a new world and seed it with a starting island.
    Create {
        /// Display name of the world.
        name: String,
        /// Half-width of the seeded island, in tiles. Zero skips seeding.
        #[arg(long, default_value_t = 16)]
        radius: i32,
        /// Tile id the island is filled with.
        #[arg(long, default_value = "grass")]
        tile: String,
    },
    /// Print metadata for an existing world.
    Info {
        /// World id (the directory name under the saves root).
        world: String,
    },
    /// Fill a rectangle of tiles in an existing world.
    Fill {
        /// World id (the directory name under the saves root).
        world: String,
        /// Tile id to place.
        #[arg(long)]
        tile: String,
        /// Half-width of the filled square, in tiles.
        #[arg(long, default_value_t = 8)]
        radius: i32,
    },
    /// List the tile definitions in the configured pack.
    Tiles,
}

fn main() -> Result<()> {
    // WARN by default, overridable via RUST_LOG.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let config = EngineConfig::load_from_path(&cli.config);

    match cli.command {
        Command::Create { name, radius, tile } => create(&config, &name, radius, &tile),
        Command::Info { world } => print_info(&config, &world),
        Command::Fill {
            world,
            tile,
            radius,
        } => fill(&config, &world, &tile, radius),
        Command::Tiles => list_tiles(&config),
    }
}

fn load_registry(config: &EngineConfig) -> Result<Arc<TileRegistry>> {
    let registry = registry_from_file(&config.tiles_path)
        .with_context(|| format!("failed to load tile pack {:?}", config.tiles_path))?;
    Ok(Arc::new(registry))
}

fn create(config: &EngineConfig, name: &str, radius: i32, tile: &str) -> Result<()> {
    let registry = load_registry(config)?;
    let info = WorldInfo::new(name, config.extent());
    let id = info.id();

    let store = WorldStore::new(&config.saves_root, &id);
    if store.world_exists() {
        anyhow::bail!("world {id:?} already exists under {:?}", config.saves_root);
    }

    let mut world = World::new(info, &config.saves_root, registry);
    if radius > 0 {
        let bounds = TileBounds::new(
            TilePos::new(-radius, -radius, 0),
            TilePos::new(radius, radius, 1),
        );
        let placed = IslandGenerator::new(bounds, tile).generate(&mut world)?;
        info!("seeded {placed} tiles");
    }
    let saved = world.save()?;

    println!("created world {id:?} ({saved} chunks)");
    Ok(())
}

fn print_info(config: &EngineConfig, world_id: &str) -> Result<()> {
    let registry = load_registry(config)?;
    let world = World::open(&config.saves_root, world_id, registry)?;

    println!("name:         {}", world.info().name);
    println!("chunk extent: {}", world.extent());
    println!("saved chunks: {}", world.store().saved_chunk_count());
    Ok(())
}

fn fill(config: &EngineConfig, world_id: &str, tile: &str, radius: i32) -> Result<()> {
    let registry = load_registry(config)?;
    let world = World::open(&config.saves_root, world_id, registry)?;

    let bounds = TileBounds::new(
        TilePos::new(-radius, -radius, 0),
        TilePos::new(radius, radius, 1),
    );

    let runtime = tokio::runtime::Runtime::new().context("failed to start runtime")?;
    runtime.block_on(async {
        let service = WorldService::spawn(world)?;
        let handle = service.handle();
        let mut placed = 0usize;
        for pos in bounds.positions() {
            handle.set_tile(pos, tile).await?;
            placed += 1;
        }
        let saved = handle.save().await?;
        service.shutdown()?;
        println!("placed {placed} {tile:?} tiles ({saved} chunks saved)");
        Ok(())
    })
}

fn list_tiles(config: &EngineConfig) -> Result<()> {
    let registry = load_registry(config)?;
    let mut ids: Vec<&str> = registry.ids().collect();
    ids.sort_unstable();
    for id in ids {
        // Registry construction guarantees every id resolves.
        if let Some(def) = registry.get(id) {
            println!("{id}: {} (collision: {:?})", def.name, def.collision);
        }
    }
    Ok(())
}
