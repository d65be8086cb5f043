use serde::{Deserialize, Serialize};
use tilestream_core::ChunkExtent;

/// Characters that are illegal in filesystem paths on the platforms we save
/// to; stripped when deriving a world id from its display name.
const ILLEGAL_PATH_CHARS: &[char] = &['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

/// World-level metadata: the display name and the chunk extent the world was
/// created with. The extent is invariant for the world's lifetime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldInfo {
    /// Human-readable world name.
    pub name: String,
    /// Chunk size in tiles per axis.
    pub extent: ChunkExtent,
}

impl WorldInfo {
    /// Construct world metadata.
    pub fn new(name: impl Into<String>, extent: ChunkExtent) -> Self {
        Self {
            name: name.into(),
            extent,
        }
    }

    /// Filesystem-safe id derived from the display name: lower-cased, spaces
    /// replaced with underscores, illegal path characters stripped.
    pub fn id(&self) -> String {
        self.name
            .to_lowercase()
            .replace(' ', "_")
            .chars()
            .filter(|c| !ILLEGAL_PATH_CHARS.contains(c))
            .collect()
    }
}
