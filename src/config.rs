use serde::{Deserialize, Serialize};
use std::{fs, path::Path, path::PathBuf};
use tracing::warn;

use tilestream_core::ChunkExtent;

const DEFAULT_CONFIG_PATH: &str = "tilestream.toml";
const DEFAULT_TILES_PATH: &str = "config/tiles.json";

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Directory worlds are saved under.
    pub saves_root: PathBuf,
    /// Chunk size in tiles per axis, applied to newly created worlds.
    pub chunk_extent: [u32; 3],
    /// Tile pack the registry is built from.
    pub tiles_path: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            saves_root: PathBuf::from("saves"),
            chunk_extent: [16, 16, 1],
            tiles_path: PathBuf::from(DEFAULT_TILES_PATH),
        }
    }
}

impl EngineConfig {
    /// Load configuration from the default path.
    pub fn load() -> Self {
        Self::load_from_path(Path::new(DEFAULT_CONFIG_PATH))
    }

    /// Load configuration from an explicit path, falling back to defaults on errors.
    pub fn load_from_path(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<EngineConfig>(&contents) {
                Ok(cfg) => cfg,
                Err(err) => {
                    warn!("Failed to parse {}: {err}. Using defaults", path.display());
                    EngineConfig::default()
                }
            },
            Err(_) => EngineConfig::default(),
        }
    }

    /// The configured chunk extent.
    pub fn extent(&self) -> ChunkExtent {
        ChunkExtent::new(
            self.chunk_extent[0],
            self.chunk_extent[1],
            self.chunk_extent[2],
        )
    }
}
