use std::collections::HashMap;

use crate::{AssetError, TileDefinition};

/// Read-only lookup from tile id to tile definition. Populated once at
/// startup and immutable thereafter; shared behind an `Arc` by everything
/// that resolves tiles.
pub struct TileRegistry {
    tiles: HashMap<String, TileDefinition>,
}

impl TileRegistry {
    /// Construct a registry from the supplied definitions, rejecting
    /// duplicate ids.
    pub fn new(definitions: Vec<TileDefinition>) -> Result<Self, AssetError> {
        let mut tiles = HashMap::with_capacity(definitions.len());
        for mut def in definitions {
            if def.name.is_empty() {
                def.name = def.id.clone();
            }
            if tiles.contains_key(&def.id) {
                return Err(AssetError::DuplicateTile(def.id));
            }
            tiles.insert(def.id.clone(), def);
        }
        Ok(Self { tiles })
    }

    /// Fetch a definition by id.
    pub fn get(&self, id: &str) -> Option<&TileDefinition> {
        self.tiles.get(id)
    }

    /// Fetch a definition by id, with a typed error on a miss.
    pub fn lookup(&self, id: &str) -> Result<&TileDefinition, AssetError> {
        self.tiles
            .get(id)
            .ok_or_else(|| AssetError::UnknownTile(id.to_string()))
    }

    /// Whether the registry knows the given id.
    pub fn contains(&self, id: &str) -> bool {
        self.tiles.contains_key(id)
    }

    /// Number of registered tiles.
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    /// Returns true when no tiles are registered.
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Iterate over all registered ids.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.tiles.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_finds_registered_tiles() {
        let registry = TileRegistry::new(vec![
            TileDefinition::simple("grass"),
            TileDefinition::simple("water"),
        ])
        .unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.lookup("grass").unwrap().id, "grass");
        assert!(registry.get("water").is_some());
    }

    #[test]
    fn lookup_miss_is_a_typed_error() {
        let registry = TileRegistry::new(vec![TileDefinition::simple("grass")]).unwrap();
        assert!(matches!(
            registry.lookup("lava"),
            Err(AssetError::UnknownTile(id)) if id == "lava"
        ));
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let result = TileRegistry::new(vec![
            TileDefinition::simple("grass"),
            TileDefinition::simple("grass"),
        ]);
        assert!(matches!(result, Err(AssetError::DuplicateTile(id)) if id == "grass"));
    }

    #[test]
    fn empty_name_defaults_to_id() {
        let mut def = TileDefinition::simple("sand");
        def.name = String::new();
        let registry = TileRegistry::new(vec![def]).unwrap();
        assert_eq!(registry.get("sand").unwrap().name, "sand");
    }
}
