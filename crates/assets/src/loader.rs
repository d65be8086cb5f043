use std::fs;
use std::path::Path;

use crate::{AssetError, TileDefinition, TileRegistry};

/// Parse a JSON tile pack (an array of definitions) into a registry.
pub fn registry_from_str(input: &str) -> Result<TileRegistry, AssetError> {
    let definitions: Vec<TileDefinition> = serde_json::from_str(input)?;
    TileRegistry::new(definitions)
}

/// Read and parse a JSON tile pack from disk.
pub fn registry_from_file<P: AsRef<Path>>(path: P) -> Result<TileRegistry, AssetError> {
    let contents = fs::read_to_string(path)?;
    registry_from_str(&contents)
}
