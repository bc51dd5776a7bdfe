#[cfg(test)]
pub(crate) mod faulty;
pub mod memory;

#[cfg(test)]
pub(crate) use faulty::FaultyScene;
pub use memory::{MemoryScene, Node, NodeContent, NodeKey};

use std::fmt::Debug;
use std::hash::Hash;

use crate::config::MirrorConfig;
use crate::entity::{ObjectAttributes, StoredTag};
use crate::error::SceneError;
use crate::geometry::Geometry;

/// Whether a scene node holds geometry or other nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Object,
    Container,
}

/// A direct child of a container, as enumerated by [`ExternalScene::list_children`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildEntry<H> {
    pub handle: H,
    pub kind: NodeKind,
    /// Identifier stored on the node, if it is a mirrored entity.
    pub tag: Option<StoredTag>,
}

/// The host scene graph the mirror writes into.
///
/// The host owns all nodes; the mirror only keeps handles. Every node has at
/// most one parent, and linking a node that already has a parent is an error
/// the caller avoids by unlinking first.
pub trait ExternalScene {
    /// Opaque reference to a node of the host scene.
    type Handle: Copy + Eq + Hash + Debug;

    /// Returns the top-level container of the host scene.
    fn root(&self) -> Self::Handle;

    /// Finds a direct child container of `parent` by name.
    fn find_container(&self, parent: Self::Handle, name: &str) -> Option<Self::Handle>;

    /// Creates an unlinked container, optionally tagged as a mirrored group.
    ///
    /// # Errors
    ///
    /// Returns an error if the host refuses to create the node.
    fn create_container(
        &mut self,
        name: &str,
        tag: Option<StoredTag>,
    ) -> Result<Self::Handle, SceneError>;

    /// Renames a node.
    ///
    /// # Errors
    ///
    /// Returns an error if the node does not exist.
    fn rename(&mut self, handle: Self::Handle, name: &str) -> Result<(), SceneError>;

    /// Creates an unlinked object owning `geometry`.
    ///
    /// # Errors
    ///
    /// Returns an error if the host refuses to create the node.
    fn create_object(
        &mut self,
        geometry: Geometry,
        attributes: ObjectAttributes,
    ) -> Result<Self::Handle, SceneError>;

    /// Replaces the geometry and attributes of an existing object in place.
    ///
    /// # Errors
    ///
    /// Returns an error if the node does not exist or is not an object.
    fn update_object(
        &mut self,
        handle: Self::Handle,
        geometry: Geometry,
        attributes: ObjectAttributes,
    ) -> Result<(), SceneError>;

    /// Returns the attributes stored on an object.
    fn object_attributes(&self, handle: Self::Handle) -> Option<ObjectAttributes>;

    /// Returns the container `child` is currently linked into.
    fn parent_of(&self, child: Self::Handle) -> Option<Self::Handle>;

    /// Links `child` into the container `parent`.
    ///
    /// # Errors
    ///
    /// Returns an error if either node is missing, `parent` is not a
    /// container, `child` is already linked, or the link would form a cycle.
    fn link_child(&mut self, parent: Self::Handle, child: Self::Handle) -> Result<(), SceneError>;

    /// Unlinks `child` from `parent`.
    ///
    /// # Errors
    ///
    /// Returns an error if `child` is not a child of `parent`.
    fn unlink_child(&mut self, parent: Self::Handle, child: Self::Handle)
        -> Result<(), SceneError>;

    /// Sets viewport visibility and selectability of a node.
    ///
    /// # Errors
    ///
    /// Returns an error if the node does not exist.
    fn set_visibility(
        &mut self,
        handle: Self::Handle,
        hidden: bool,
        selectable: bool,
    ) -> Result<(), SceneError>;

    /// Enumerates the direct children of a container. Read-only.
    ///
    /// # Errors
    ///
    /// Returns an error if the container cannot be read.
    fn list_children(
        &self,
        container: Self::Handle,
    ) -> Result<Vec<ChildEntry<Self::Handle>>, SceneError>;

    /// Deletes a node. Children of a deleted container are left unlinked.
    ///
    /// # Errors
    ///
    /// Returns an error if the node does not exist.
    fn remove(&mut self, handle: Self::Handle) -> Result<(), SceneError>;
}

/// Finds or creates the inbox container of `document`.
///
/// The path is `root_container / document / inbox_container`, below the
/// host scene root.
///
/// # Errors
///
/// Returns an error if a missing container cannot be created or linked.
pub fn inbox_for<S: ExternalScene + ?Sized>(
    scene: &mut S,
    config: &MirrorConfig,
    document: &str,
) -> Result<S::Handle, SceneError> {
    let scene_root = scene.root();
    let mirror_root = find_or_create_container(scene, scene_root, &config.root_container)?;
    let file = find_or_create_container(scene, mirror_root, document)?;
    find_or_create_container(scene, file, &config.inbox_container)
}

fn find_or_create_container<S: ExternalScene + ?Sized>(
    scene: &mut S,
    parent: S::Handle,
    name: &str,
) -> Result<S::Handle, SceneError> {
    if let Some(existing) = scene.find_container(parent, name) {
        return Ok(existing);
    }
    let container = scene.create_container(name, None)?;
    scene.link_child(parent, container)?;
    Ok(container)
}
