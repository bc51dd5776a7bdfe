use serde::{Deserialize, Serialize};

use crate::entity::{EntityId, ObjectType, Scope, Visibility};

/// One object or group as described by the source document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectRecord {
    #[serde(rename = "type")]
    pub object_type: ObjectType,
    pub name: String,
    pub id: EntityId,
    #[serde(default)]
    pub material_id: u32,
    #[serde(default)]
    pub parent_id: EntityId,
    #[serde(default)]
    pub flags: u32,
    #[serde(default)]
    pub vertices: Vec<f64>,
    /// Flat triangle indices.
    #[serde(default)]
    pub faces: Vec<u32>,
    #[serde(default)]
    pub normals: Vec<f64>,
    /// Flattened `(offset, length)` pairs, in index-buffer units.
    #[serde(default)]
    pub groups: Vec<u32>,
    #[serde(default)]
    pub face_ids: Vec<u32>,
}

impl ObjectRecord {
    /// Returns the decoded visibility of this record.
    #[must_use]
    pub fn visibility(&self) -> Visibility {
        Visibility::from_flags(self.flags)
    }
}

/// An entry of a transaction's delete list.
///
/// A bare integer names an item; groups are named with an explicit scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DeleteEntry {
    Item(EntityId),
    Scoped { scope: Scope, id: EntityId },
}

impl DeleteEntry {
    /// Returns the scope and identifier this entry deletes.
    #[must_use]
    pub fn target(self) -> (Scope, EntityId) {
        match self {
            Self::Item(id) => (Scope::Item, id),
            Self::Scoped { scope, id } => (scope, id),
        }
    }
}

/// Incremental change to a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub filename: String,
    pub version: u64,
    #[serde(default)]
    pub delete: Vec<DeleteEntry>,
    #[serde(default)]
    pub add: Vec<ObjectRecord>,
    #[serde(default)]
    pub update: Vec<ObjectRecord>,
}

/// Full state of a document; anything absent from `add` is deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListSnapshot {
    pub filename: String,
    pub version: u64,
    #[serde(default)]
    pub add: Vec<ObjectRecord>,
}

/// Replacement facets for one existing item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacetRecord {
    pub id: EntityId,
    /// Item version; falls back to the message version when absent.
    #[serde(default)]
    pub version: Option<u64>,
    #[serde(default)]
    pub vertices: Vec<f64>,
    #[serde(default)]
    pub faces: Vec<u32>,
    #[serde(default)]
    pub normals: Vec<f64>,
    #[serde(default)]
    pub groups: Vec<u32>,
    #[serde(default)]
    pub face_ids: Vec<u32>,
}

/// Re-tessellated geometry for items that already exist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Refacet {
    pub filename: String,
    pub version: u64,
    #[serde(default)]
    pub items: Vec<FacetRecord>,
}
