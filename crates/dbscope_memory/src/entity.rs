//! Entities and their encoding.

use crate::error::{MemoryError, MemoryResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for an entity.
///
/// Entity IDs are random UUIDs, immutable once assigned.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(Uuid);

impl EntityId {
    /// Creates a new random entity ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an entity ID from a UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Creates an entity ID from raw bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }

    /// Returns the UUID.
    #[must_use]
    pub const fn to_uuid(&self) -> Uuid {
        self.0
    }

    /// Parses an entity ID from its hyphenated string form.
    pub fn parse(text: &str) -> MemoryResult<Self> {
        Uuid::parse_str(text)
            .map(Self)
            .map_err(MemoryError::codec)
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({})", self.0)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A type that can be stored in a [`MemoryStore`](crate::MemoryStore).
///
/// # Example
///
/// ```rust,ignore
/// #[derive(Serialize, Deserialize)]
/// struct User {
///     id: EntityId,
///     name: String,
/// }
///
/// impl Entity for User {
///     const TABLE: &'static str = "users";
///
///     fn id(&self) -> EntityId {
///         self.id
///     }
/// }
/// ```
pub trait Entity: Serialize + DeserializeOwned {
    /// Name of the table the entity lives in.
    const TABLE: &'static str;

    /// Returns the entity's stable identifier.
    fn id(&self) -> EntityId;
}

/// Encodes an entity as CBOR.
pub(crate) fn encode<E: Entity>(entity: &E) -> MemoryResult<Vec<u8>> {
    let mut bytes = Vec::new();
    ciborium::ser::into_writer(entity, &mut bytes).map_err(MemoryError::codec)?;
    Ok(bytes)
}

/// Decodes an entity from CBOR.
pub(crate) fn decode<E: Entity>(bytes: &[u8]) -> MemoryResult<E> {
    ciborium::de::from_reader(bytes).map_err(MemoryError::codec)
}
