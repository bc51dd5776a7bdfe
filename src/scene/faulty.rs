use crate::entity::{ObjectAttributes, StoredTag};
use crate::error::SceneError;
use crate::geometry::Geometry;

use super::{ChildEntry, ExternalScene, MemoryScene, NodeKey};

/// A [`MemoryScene`] that can be told to refuse individual operations.
#[derive(Debug, Default)]
pub(crate) struct FaultyScene {
    pub inner: MemoryScene,
    pub refuse_listing: bool,
    pub refuse_links: bool,
    pub refuse_removal: bool,
}

impl FaultyScene {
    pub fn new() -> Self {
        Self::default()
    }
}

fn refused(what: &str) -> SceneError {
    SceneError::Rejected(format!("{what} is locked"))
}

impl ExternalScene for FaultyScene {
    type Handle = NodeKey;

    fn root(&self) -> NodeKey {
        self.inner.root()
    }

    fn find_container(&self, parent: NodeKey, name: &str) -> Option<NodeKey> {
        self.inner.find_container(parent, name)
    }

    fn create_container(
        &mut self,
        name: &str,
        tag: Option<StoredTag>,
    ) -> Result<NodeKey, SceneError> {
        self.inner.create_container(name, tag)
    }

    fn rename(&mut self, handle: NodeKey, name: &str) -> Result<(), SceneError> {
        self.inner.rename(handle, name)
    }

    fn create_object(
        &mut self,
        geometry: Geometry,
        attributes: ObjectAttributes,
    ) -> Result<NodeKey, SceneError> {
        self.inner.create_object(geometry, attributes)
    }

    fn update_object(
        &mut self,
        handle: NodeKey,
        geometry: Geometry,
        attributes: ObjectAttributes,
    ) -> Result<(), SceneError> {
        self.inner.update_object(handle, geometry, attributes)
    }

    fn object_attributes(&self, handle: NodeKey) -> Option<ObjectAttributes> {
        self.inner.object_attributes(handle)
    }

    fn parent_of(&self, child: NodeKey) -> Option<NodeKey> {
        self.inner.parent_of(child)
    }

    fn link_child(&mut self, parent: NodeKey, child: NodeKey) -> Result<(), SceneError> {
        if self.refuse_links {
            return Err(refused("hierarchy"));
        }
        self.inner.link_child(parent, child)
    }

    fn unlink_child(&mut self, parent: NodeKey, child: NodeKey) -> Result<(), SceneError> {
        self.inner.unlink_child(parent, child)
    }

    fn set_visibility(
        &mut self,
        handle: NodeKey,
        hidden: bool,
        selectable: bool,
    ) -> Result<(), SceneError> {
        self.inner.set_visibility(handle, hidden, selectable)
    }

    fn list_children(&self, container: NodeKey) -> Result<Vec<ChildEntry<NodeKey>>, SceneError> {
        if self.refuse_listing {
            return Err(refused("scene"));
        }
        self.inner.list_children(container)
    }

    fn remove(&mut self, handle: NodeKey) -> Result<(), SceneError> {
        if self.refuse_removal {
            return Err(refused("node"));
        }
        self.inner.remove(handle)
    }
}
