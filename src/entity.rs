use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a mirrored entity, unique within one document and scope.
///
/// `0` is reserved for the document root and is never stored.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct EntityId(pub u32);

impl EntityId {
    /// The document root container.
    pub const ROOT: Self = Self(0);

    /// Returns `true` if this is the root sentinel.
    #[must_use]
    pub fn is_root(self) -> bool {
        self == Self::ROOT
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Namespace within which an [`EntityId`] is unique per document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// Solids, sheets and wires.
    Item,
    /// Groups.
    Group,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Item => f.write_str("item"),
            Self::Group => f.write_str("group"),
        }
    }
}

/// Kind of an inbound record, decoded from its integer type code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum ObjectType {
    Solid,
    Sheet,
    Wire,
    Group,
    Empty,
}

impl ObjectType {
    /// Returns the scope records of this type are stored in, if any.
    #[must_use]
    pub fn scope(self) -> Option<Scope> {
        match self {
            Self::Solid | Self::Sheet | Self::Wire => Some(Scope::Item),
            Self::Group => Some(Scope::Group),
            Self::Empty => None,
        }
    }

    /// Returns the item kind for geometry-bearing types.
    #[must_use]
    pub fn object_kind(self) -> Option<ObjectKind> {
        match self {
            Self::Solid => Some(ObjectKind::Solid),
            Self::Sheet => Some(ObjectKind::Sheet),
            Self::Wire => Some(ObjectKind::Wire),
            Self::Group | Self::Empty => None,
        }
    }
}

impl TryFrom<u8> for ObjectType {
    type Error = String;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::Solid),
            1 => Ok(Self::Sheet),
            2 => Ok(Self::Wire),
            5 => Ok(Self::Group),
            6 => Ok(Self::Empty),
            other => Err(format!("unknown object type code {other}")),
        }
    }
}

impl From<ObjectType> for u8 {
    fn from(ty: ObjectType) -> Self {
        match ty {
            ObjectType::Solid => 0,
            ObjectType::Sheet => 1,
            ObjectType::Wire => 2,
            ObjectType::Group => 5,
            ObjectType::Empty => 6,
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Solid => "solid",
            Self::Sheet => "sheet",
            Self::Wire => "wire",
            Self::Group => "group",
            Self::Empty => "empty",
        };
        f.write_str(name)
    }
}

/// Kind of a geometry-bearing item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectKind {
    Solid,
    Sheet,
    Wire,
}

impl From<ObjectKind> for ObjectType {
    fn from(kind: ObjectKind) -> Self {
        match kind {
            ObjectKind::Solid => Self::Solid,
            ObjectKind::Sheet => Self::Sheet,
            ObjectKind::Wire => Self::Wire,
        }
    }
}

/// Visibility decoded once from a record's flag bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Visibility {
    /// Whether the entity is hidden in the host.
    pub hidden: bool,
    /// Whether selection is disabled in the host.
    pub hide_select: bool,
}

impl Visibility {
    /// Bit 0: explicitly hidden.
    pub const HIDDEN: u32 = 1;
    /// Bit 1: explicitly visible.
    pub const VISIBLE: u32 = 1 << 1;
    /// Bit 2: selectable.
    pub const SELECTABLE: u32 = 1 << 2;

    /// Decodes the raw flag bits of a record.
    ///
    /// An entity is hidden unless it is explicitly visible and not
    /// explicitly hidden.
    #[must_use]
    pub fn from_flags(flags: u32) -> Self {
        let explicit_hidden = flags & Self::HIDDEN != 0;
        let explicit_visible = flags & Self::VISIBLE != 0;
        let selectable = flags & Self::SELECTABLE != 0;
        Self {
            hidden: explicit_hidden || !explicit_visible,
            hide_select: !selectable,
        }
    }

    /// Returns `true` if the entity may be selected.
    #[must_use]
    pub fn selectable(self) -> bool {
        !self.hide_select
    }
}

/// Identifier stored on a node of the external scene.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StoredTag {
    /// Filename of the owning document.
    pub document: String,
    /// Identifier within the document.
    pub id: EntityId,
}

impl StoredTag {
    #[must_use]
    pub fn new(document: impl Into<String>, id: EntityId) -> Self {
        Self {
            document: document.into(),
            id,
        }
    }
}

/// Attributes written to a mirrored item alongside its geometry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectAttributes {
    pub document: String,
    pub id: EntityId,
    pub name: String,
    pub kind: ObjectKind,
    pub material_id: u32,
    /// Document version the item was last written at.
    pub version: u64,
}

impl ObjectAttributes {
    /// Returns the tag identifying this item in the scene.
    #[must_use]
    pub fn tag(&self) -> StoredTag {
        StoredTag::new(self.document.clone(), self.id)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn visible_only() {
        let v = Visibility::from_flags(0b010);
        assert!(!v.hidden);
        assert!(v.hide_select);
    }

    #[test]
    fn all_bits_set() {
        let v = Visibility::from_flags(0b111);
        assert!(!v.hidden);
        assert!(!v.hide_select);
    }

    #[test]
    fn no_bits_set() {
        let v = Visibility::from_flags(0);
        assert!(v.hidden);
        assert!(v.hide_select);
    }

    #[test]
    fn explicit_hidden_wins_over_visible() {
        let v = Visibility::from_flags(Visibility::HIDDEN | Visibility::VISIBLE);
        assert!(v.hidden);
    }

    #[test]
    fn type_codes() {
        assert_eq!(ObjectType::try_from(5).unwrap(), ObjectType::Group);
        assert_eq!(ObjectType::Group.scope(), Some(Scope::Group));
        assert_eq!(ObjectType::Wire.scope(), Some(Scope::Item));
        assert_eq!(ObjectType::Empty.scope(), None);
        assert!(ObjectType::try_from(3).is_err());
        assert_eq!(u8::from(ObjectType::Empty), 6);
    }

    #[test]
    fn root_sentinel() {
        assert!(EntityId::ROOT.is_root());
        assert!(!EntityId(5).is_root());
    }
}
