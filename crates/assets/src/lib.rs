#![warn(missing_docs)]
//! Tile pack schema and the read-only tile registry.

mod loader;
mod registry;

pub use loader::{registry_from_file, registry_from_str};
pub use registry::TileRegistry;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tilestream_core::Rgba;

/// How a tile participates in collision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollisionKind {
    /// No collider.
    #[default]
    None,
    /// Collider shaped by the sprite outline.
    Sprite,
    /// Collider covering the full grid cell.
    Grid,
}

/// Immutable tile definition. Chunks reference definitions only by `id`;
/// the definition itself is owned by the [`TileRegistry`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileDefinition {
    /// Unique, filesystem-safe identifier (e.g. "grass").
    pub id: String,
    /// Human-readable display name (defaults to `id`).
    #[serde(default)]
    pub name: String,
    /// Sprite reference for the presentation layer.
    #[serde(default)]
    pub sprite: String,
    /// Tint color applied to the sprite.
    #[serde(default)]
    pub color: Rgba,
    /// Collision behavior.
    #[serde(default)]
    pub collision: CollisionKind,
}

impl TileDefinition {
    /// Helper for tests/examples that need a simple definition.
    pub fn simple(id: &str) -> Self {
        Self {
            id: id.to_string(),
            name: id.to_string(),
            sprite: String::new(),
            color: Rgba::WHITE,
            collision: CollisionKind::None,
        }
    }
}

/// Errors emitted while loading tile packs or resolving tile ids.
#[derive(Debug, Error)]
pub enum AssetError {
    /// Wrap IO errors when reading packs.
    #[error("failed to read tile pack: {0}")]
    Io(#[from] std::io::Error),
    /// Wrap serde parsing issues.
    #[error("failed to parse tile pack: {0}")]
    Parse(#[from] serde_json::Error),
    /// Two definitions share an id.
    #[error("duplicate tile id {0:?}")]
    DuplicateTile(String),
    /// Lookup miss for an id no definition carries.
    #[error("unknown tile id {0:?}")]
    UnknownTile(String),
}
