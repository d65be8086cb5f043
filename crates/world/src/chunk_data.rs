use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tilestream_core::{LocalPos, Rgba};

use crate::ChunkDataError;

/// Variant tag for [`PropertyValue`], used in type-mismatch reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    /// 64-bit integer.
    Int,
    /// 32-bit float.
    Float,
    /// 64-bit float.
    Double,
    /// UTF-8 string.
    Str,
    /// RGBA color.
    Color,
    /// Opaque reference to an engine-side object, by id.
    OpaqueRef,
}

impl fmt::Display for PropertyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PropertyKind::Int => "int",
            PropertyKind::Float => "float",
            PropertyKind::Double => "double",
            PropertyKind::Str => "string",
            PropertyKind::Color => "color",
            PropertyKind::OpaqueRef => "opaque-ref",
        };
        f.write_str(name)
    }
}

/// Tagged per-tile metadata value. The tag is part of the serialized form,
/// so reads are never ambiguous about the stored type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PropertyValue {
    /// 64-bit integer (health, counters, ownership ids).
    Int(i64),
    /// 32-bit float.
    Float(f32),
    /// 64-bit float.
    Double(f64),
    /// UTF-8 string (custom markers).
    Str(String),
    /// RGBA color.
    Color(Rgba),
    /// Opaque reference to an engine-side object, by id.
    OpaqueRef(String),
}

impl PropertyValue {
    /// The variant tag of this value.
    pub fn kind(&self) -> PropertyKind {
        match self {
            PropertyValue::Int(_) => PropertyKind::Int,
            PropertyValue::Float(_) => PropertyKind::Float,
            PropertyValue::Double(_) => PropertyKind::Double,
            PropertyValue::Str(_) => PropertyKind::Str,
            PropertyValue::Color(_) => PropertyKind::Color,
            PropertyValue::OpaqueRef(_) => PropertyKind::OpaqueRef,
        }
    }
}

/// Composite key for the property store: one named property per local tile
/// position.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PropertyKey {
    /// Local position inside the owning chunk.
    pub position: LocalPos,
    /// Property name.
    pub name: String,
}

/// Sparse per-chunk metadata store keyed by (local position, property name).
/// A key maps to at most one typed value; reading with the wrong type is an
/// explicit error, not a coercion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkData {
    properties: HashMap<PropertyKey, PropertyValue>,
}

impl ChunkData {
    /// Construct an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the value under (position, name).
    pub fn set(&mut self, position: LocalPos, name: &str, value: PropertyValue) {
        self.properties.insert(
            PropertyKey {
                position,
                name: name.to_string(),
            },
            value,
        );
    }

    /// Raw value lookup without a type check.
    pub fn value_at(&self, position: LocalPos, name: &str) -> Option<&PropertyValue> {
        self.properties.get(&PropertyKey {
            position,
            name: name.to_string(),
        })
    }

    /// Typed read of an [`PropertyValue::Int`].
    pub fn int_at(&self, position: LocalPos, name: &str) -> Result<Option<i64>, ChunkDataError> {
        match self.value_at(position, name) {
            Some(PropertyValue::Int(v)) => Ok(Some(*v)),
            Some(other) => Err(self.mismatch(position, name, PropertyKind::Int, other)),
            None => Ok(None),
        }
    }

    /// Typed read of a [`PropertyValue::Float`].
    pub fn float_at(&self, position: LocalPos, name: &str) -> Result<Option<f32>, ChunkDataError> {
        match self.value_at(position, name) {
            Some(PropertyValue::Float(v)) => Ok(Some(*v)),
            Some(other) => Err(self.mismatch(position, name, PropertyKind::Float, other)),
            None => Ok(None),
        }
    }

    /// Typed read of a [`PropertyValue::Double`].
    pub fn double_at(&self, position: LocalPos, name: &str) -> Result<Option<f64>, ChunkDataError> {
        match self.value_at(position, name) {
            Some(PropertyValue::Double(v)) => Ok(Some(*v)),
            Some(other) => Err(self.mismatch(position, name, PropertyKind::Double, other)),
            None => Ok(None),
        }
    }

    /// Typed read of a [`PropertyValue::Str`].
    pub fn str_at(&self, position: LocalPos, name: &str) -> Result<Option<&str>, ChunkDataError> {
        match self.value_at(position, name) {
            Some(PropertyValue::Str(v)) => Ok(Some(v.as_str())),
            Some(other) => Err(self.mismatch(position, name, PropertyKind::Str, other)),
            None => Ok(None),
        }
    }

    /// Typed read of a [`PropertyValue::Color`].
    pub fn color_at(&self, position: LocalPos, name: &str) -> Result<Option<Rgba>, ChunkDataError> {
        match self.value_at(position, name) {
            Some(PropertyValue::Color(v)) => Ok(Some(*v)),
            Some(other) => Err(self.mismatch(position, name, PropertyKind::Color, other)),
            None => Ok(None),
        }
    }

    /// Typed read of a [`PropertyValue::OpaqueRef`].
    pub fn opaque_ref_at(
        &self,
        position: LocalPos,
        name: &str,
    ) -> Result<Option<&str>, ChunkDataError> {
        match self.value_at(position, name) {
            Some(PropertyValue::OpaqueRef(v)) => Ok(Some(v.as_str())),
            Some(other) => Err(self.mismatch(position, name, PropertyKind::OpaqueRef, other)),
            None => Ok(None),
        }
    }

    /// Remove the property under (position, name). Returns whether an entry
    /// was removed.
    pub fn erase(&mut self, position: LocalPos, name: &str) -> bool {
        self.properties
            .remove(&PropertyKey {
                position,
                name: name.to_string(),
            })
            .is_some()
    }

    /// Remove every property at the given local position, regardless of
    /// name. Returns the number of removed entries.
    pub fn erase_position(&mut self, position: LocalPos) -> usize {
        let before = self.properties.len();
        self.properties.retain(|key, _| key.position != position);
        before - self.properties.len()
    }

    /// All properties stored at the given local position.
    pub fn properties_at(
        &self,
        position: LocalPos,
    ) -> impl Iterator<Item = (&PropertyKey, &PropertyValue)> {
        self.properties
            .iter()
            .filter(move |(key, _)| key.position == position)
    }

    /// All local positions carrying the named property.
    pub fn positions_with(&self, name: &str) -> Vec<LocalPos> {
        self.properties
            .keys()
            .filter(|key| key.name == name)
            .map(|key| key.position)
            .collect()
    }

    /// Clear every value in the store.
    pub fn reset(&mut self) {
        self.properties.clear();
    }

    /// Number of stored properties.
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// Returns true when no properties are stored.
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    fn mismatch(
        &self,
        position: LocalPos,
        name: &str,
        expected: PropertyKind,
        found: &PropertyValue,
    ) -> ChunkDataError {
        ChunkDataError::TypeMismatch {
            position,
            name: name.to_string(),
            expected,
            found: found.kind(),
        }
    }
}
