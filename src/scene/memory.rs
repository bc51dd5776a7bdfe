use slotmap::SlotMap;

use crate::entity::{ObjectAttributes, StoredTag};
use crate::error::SceneError;
use crate::geometry::Geometry;

use super::{ChildEntry, ExternalScene, NodeKind};

slotmap::new_key_type! {
    /// Unique identifier for a node in a [`MemoryScene`].
    pub struct NodeKey;
}

/// What a scene node holds.
#[derive(Debug, Clone)]
pub enum NodeContent {
    /// A container of other nodes.
    Container,
    /// A geometry-bearing object.
    Object {
        geometry: Geometry,
        attributes: ObjectAttributes,
    },
}

/// A node of a [`MemoryScene`].
#[derive(Debug, Clone)]
pub struct Node {
    pub name: String,
    pub tag: Option<StoredTag>,
    pub content: NodeContent,
    pub parent: Option<NodeKey>,
    pub children: Vec<NodeKey>,
    pub hidden: bool,
    pub selectable: bool,
}

impl Node {
    fn new(name: &str, tag: Option<StoredTag>, content: NodeContent) -> Self {
        Self {
            name: name.to_owned(),
            tag,
            content,
            parent: None,
            children: Vec::new(),
            hidden: false,
            selectable: true,
        }
    }

    /// Returns `true` if this node can hold children.
    #[must_use]
    pub fn is_container(&self) -> bool {
        matches!(self.content, NodeContent::Container)
    }

    /// Returns the geometry of an object node.
    #[must_use]
    pub fn geometry(&self) -> Option<&Geometry> {
        match &self.content {
            NodeContent::Object { geometry, .. } => Some(geometry),
            NodeContent::Container => None,
        }
    }
}

/// In-memory host scene.
///
/// Nodes reference each other via generational keys, so handles to removed
/// nodes stay detectable. Every method of [`ExternalScene`] can also be
/// called directly to mutate the scene behind the mirror's back.
#[derive(Debug)]
pub struct MemoryScene {
    nodes: SlotMap<NodeKey, Node>,
    root: NodeKey,
}

impl Default for MemoryScene {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryScene {
    /// Creates a scene holding only its root container.
    #[must_use]
    pub fn new() -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(Node::new("Scene", None, NodeContent::Container));
        Self { nodes, root }
    }

    /// Returns a node, if it exists.
    #[must_use]
    pub fn node(&self, key: NodeKey) -> Option<&Node> {
        self.nodes.get(key)
    }

    /// Returns the number of nodes, including the root.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if the scene holds only its root.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    fn get(&self, key: NodeKey) -> Result<&Node, SceneError> {
        self.nodes
            .get(key)
            .ok_or_else(|| SceneError::NodeNotFound(format!("{key:?}")))
    }

    fn get_mut(&mut self, key: NodeKey) -> Result<&mut Node, SceneError> {
        self.nodes
            .get_mut(key)
            .ok_or_else(|| SceneError::NodeNotFound(format!("{key:?}")))
    }

    fn is_ancestor(&self, ancestor: NodeKey, mut key: NodeKey) -> bool {
        loop {
            if key == ancestor {
                return true;
            }
            match self.nodes.get(key).and_then(|node| node.parent) {
                Some(parent) => key = parent,
                None => return false,
            }
        }
    }
}

impl ExternalScene for MemoryScene {
    type Handle = NodeKey;

    fn root(&self) -> NodeKey {
        self.root
    }

    fn find_container(&self, parent: NodeKey, name: &str) -> Option<NodeKey> {
        self.nodes.get(parent)?.children.iter().copied().find(|&child| {
            self.nodes
                .get(child)
                .is_some_and(|node| node.is_container() && node.name == name)
        })
    }

    fn create_container(
        &mut self,
        name: &str,
        tag: Option<StoredTag>,
    ) -> Result<NodeKey, SceneError> {
        Ok(self
            .nodes
            .insert(Node::new(name, tag, NodeContent::Container)))
    }

    fn rename(&mut self, handle: NodeKey, name: &str) -> Result<(), SceneError> {
        name.clone_into(&mut self.get_mut(handle)?.name);
        Ok(())
    }

    fn create_object(
        &mut self,
        geometry: Geometry,
        attributes: ObjectAttributes,
    ) -> Result<NodeKey, SceneError> {
        let name = attributes.name.clone();
        let tag = Some(attributes.tag());
        Ok(self.nodes.insert(Node::new(
            &name,
            tag,
            NodeContent::Object {
                geometry,
                attributes,
            },
        )))
    }

    fn update_object(
        &mut self,
        handle: NodeKey,
        geometry: Geometry,
        attributes: ObjectAttributes,
    ) -> Result<(), SceneError> {
        let node = self.get_mut(handle)?;
        if node.is_container() {
            return Err(SceneError::Rejected(format!(
                "{handle:?} is a container, not an object"
            )));
        }
        node.name.clone_from(&attributes.name);
        node.tag = Some(attributes.tag());
        node.content = NodeContent::Object {
            geometry,
            attributes,
        };
        Ok(())
    }

    fn object_attributes(&self, handle: NodeKey) -> Option<ObjectAttributes> {
        match &self.nodes.get(handle)?.content {
            NodeContent::Object { attributes, .. } => Some(attributes.clone()),
            NodeContent::Container => None,
        }
    }

    fn parent_of(&self, child: NodeKey) -> Option<NodeKey> {
        self.nodes.get(child)?.parent
    }

    fn link_child(&mut self, parent: NodeKey, child: NodeKey) -> Result<(), SceneError> {
        if !self.get(parent)?.is_container() {
            return Err(SceneError::NotAContainer(format!("{parent:?}")));
        }
        if let Some(existing) = self.get(child)?.parent {
            return Err(SceneError::Rejected(format!(
                "{child:?} is already linked into {existing:?}"
            )));
        }
        if self.is_ancestor(child, parent) {
            return Err(SceneError::Rejected(format!(
                "linking {child:?} into {parent:?} would form a cycle"
            )));
        }
        self.get_mut(child)?.parent = Some(parent);
        self.get_mut(parent)?.children.push(child);
        Ok(())
    }

    fn unlink_child(&mut self, parent: NodeKey, child: NodeKey) -> Result<(), SceneError> {
        if self.get(child)?.parent != Some(parent) {
            return Err(SceneError::Rejected(format!(
                "{child:?} is not a child of {parent:?}"
            )));
        }
        self.get_mut(parent)?.children.retain(|&c| c != child);
        self.get_mut(child)?.parent = None;
        Ok(())
    }

    fn set_visibility(
        &mut self,
        handle: NodeKey,
        hidden: bool,
        selectable: bool,
    ) -> Result<(), SceneError> {
        let node = self.get_mut(handle)?;
        node.hidden = hidden;
        node.selectable = selectable;
        Ok(())
    }

    fn list_children(&self, container: NodeKey) -> Result<Vec<ChildEntry<NodeKey>>, SceneError> {
        let node = self.get(container)?;
        if !node.is_container() {
            return Err(SceneError::NotAContainer(format!("{container:?}")));
        }
        node.children
            .iter()
            .map(|&child| {
                let child_node = self.get(child)?;
                Ok(ChildEntry {
                    handle: child,
                    kind: if child_node.is_container() {
                        NodeKind::Container
                    } else {
                        NodeKind::Object
                    },
                    tag: child_node.tag.clone(),
                })
            })
            .collect()
    }

    fn remove(&mut self, handle: NodeKey) -> Result<(), SceneError> {
        if handle == self.root {
            return Err(SceneError::Rejected("the scene root cannot be removed".into()));
        }
        let node = self
            .nodes
            .remove(handle)
            .ok_or_else(|| SceneError::NodeNotFound(format!("{handle:?}")))?;
        if let Some(parent) = node.parent.and_then(|p| self.nodes.get_mut(p)) {
            parent.children.retain(|&c| c != handle);
        }
        for child in node.children {
            if let Some(child) = self.nodes.get_mut(child) {
                child.parent = None;
            }
        }
        Ok(())
    }
}
