use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt::Debug;
use std::hash::Hash;

use tracing::{debug, warn};

use crate::entity::{EntityId, Scope};
use crate::error::{MirrorError, Result, SceneError};
use crate::scene::{ExternalScene, NodeKind};

/// Mirrored entities of one document, keyed by scope and identifier.
///
/// The same identifier may name both an item and a group. The root
/// identifier is never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentIndex<H> {
    items: BTreeMap<EntityId, H>,
    groups: BTreeMap<EntityId, H>,
}

impl<H> Default for DocumentIndex<H> {
    fn default() -> Self {
        Self {
            items: BTreeMap::new(),
            groups: BTreeMap::new(),
        }
    }
}

impl<H: Copy> DocumentIndex<H> {
    /// Creates an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn scope(&self, scope: Scope) -> &BTreeMap<EntityId, H> {
        match scope {
            Scope::Item => &self.items,
            Scope::Group => &self.groups,
        }
    }

    fn scope_mut(&mut self, scope: Scope) -> &mut BTreeMap<EntityId, H> {
        match scope {
            Scope::Item => &mut self.items,
            Scope::Group => &mut self.groups,
        }
    }

    /// Returns the handle mirrored for `(scope, id)`.
    #[must_use]
    pub fn get(&self, scope: Scope, id: EntityId) -> Option<H> {
        self.scope(scope).get(&id).copied()
    }

    /// Records `handle` as the mirror of `(scope, id)`, returning the
    /// previous handle. Root identifiers are ignored.
    pub fn put(&mut self, scope: Scope, id: EntityId, handle: H) -> Option<H> {
        if id.is_root() {
            return None;
        }
        self.scope_mut(scope).insert(id, handle)
    }

    /// Forgets `(scope, id)`, returning its handle.
    pub fn remove(&mut self, scope: Scope, id: EntityId) -> Option<H> {
        self.scope_mut(scope).remove(&id)
    }

    /// Returns the identifiers stored in `scope`, in ascending order.
    pub fn ids(&self, scope: Scope) -> impl Iterator<Item = EntityId> + '_ {
        self.scope(scope).keys().copied()
    }

    /// Returns the number of entities stored in `scope`.
    #[must_use]
    pub fn len(&self, scope: Scope) -> usize {
        self.scope(scope).len()
    }

    /// Returns `true` if neither scope holds an entity.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty() && self.groups.is_empty()
    }
}

/// Per-document cache of mirrored entities.
///
/// The cache is never trusted across messages: the host can change the
/// mirrored scene at any time (undo, redo, manual edits), so every message
/// starts with [`SceneIndex::rebuild`].
#[derive(Debug, Clone)]
pub struct SceneIndex<H> {
    documents: HashMap<String, DocumentIndex<H>>,
}

impl<H> Default for SceneIndex<H> {
    fn default() -> Self {
        Self {
            documents: HashMap::new(),
        }
    }
}

impl<H: Copy + Eq + Hash + Debug> SceneIndex<H> {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-derives the index of `document` from the scene below `inbox`.
    ///
    /// Objects are classified as items and containers as groups. Nested
    /// containers are walked recursively whether or not they are tagged.
    /// Nodes tagged for another document are skipped. The previous index
    /// of `document` is replaced only if the walk succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`MirrorError::SceneRebuild`] if any container cannot be
    /// enumerated.
    pub fn rebuild<S>(
        &mut self,
        scene: &S,
        document: &str,
        inbox: H,
    ) -> Result<&DocumentIndex<H>>
    where
        S: ExternalScene<Handle = H> + ?Sized,
    {
        let mut index = DocumentIndex::new();
        let mut visited = HashSet::from([inbox]);
        collect(scene, document, inbox, &mut index, &mut visited).map_err(|source| {
            MirrorError::SceneRebuild {
                document: document.to_owned(),
                source,
            }
        })?;

        debug!(
            document,
            items = index.len(Scope::Item),
            groups = index.len(Scope::Group),
            "rebuilt scene index"
        );
        let slot = self.documents.entry(document.to_owned()).or_default();
        *slot = index;
        Ok(slot)
    }

    /// Returns the index of `document`, if it has been referenced.
    #[must_use]
    pub fn document(&self, document: &str) -> Option<&DocumentIndex<H>> {
        self.documents.get(document)
    }

    /// Returns the index of `document`, creating an empty one on first use.
    pub fn document_mut(&mut self, document: &str) -> &mut DocumentIndex<H> {
        self.documents.entry(document.to_owned()).or_default()
    }

    /// Returns the handle mirrored for `(scope, id)` in `document`.
    #[must_use]
    pub fn get(&self, document: &str, scope: Scope, id: EntityId) -> Option<H> {
        self.documents.get(document)?.get(scope, id)
    }

    /// Records `handle` as the mirror of `(scope, id)` in `document`.
    pub fn put(&mut self, document: &str, scope: Scope, id: EntityId, handle: H) -> Option<H> {
        self.document_mut(document).put(scope, id, handle)
    }

    /// Forgets `(scope, id)` in `document`.
    pub fn remove(&mut self, document: &str, scope: Scope, id: EntityId) -> Option<H> {
        self.documents.get_mut(document)?.remove(scope, id)
    }

    /// Returns the filenames of all referenced documents.
    pub fn documents(&self) -> impl Iterator<Item = &str> {
        self.documents.keys().map(String::as_str)
    }

    /// Discards every document index.
    pub fn clear(&mut self) {
        self.documents.clear();
    }
}

fn collect<S>(
    scene: &S,
    document: &str,
    container: S::Handle,
    index: &mut DocumentIndex<S::Handle>,
    visited: &mut HashSet<S::Handle>,
) -> std::result::Result<(), SceneError>
where
    S: ExternalScene + ?Sized,
{
    for child in scene.list_children(container)? {
        let scope = match child.kind {
            NodeKind::Object => Scope::Item,
            NodeKind::Container => {
                if !visited.insert(child.handle) {
                    continue;
                }
                Scope::Group
            }
        };

        if let Some(tag) = &child.tag {
            if tag.document != document {
                warn!(
                    document,
                    other = %tag.document,
                    id = %tag.id,
                    "skipping {scope} tagged for another document"
                );
            } else if !tag.id.is_root() {
                if let Some(previous) = index.put(scope, tag.id, child.handle) {
                    warn!(document, id = %tag.id, ?previous, "duplicate {scope} identifier");
                }
            }
        }

        if child.kind == NodeKind::Container {
            collect(scene, document, child.handle, index, visited)?;
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::MirrorConfig;
    use crate::entity::{ObjectAttributes, ObjectKind, StoredTag};
    use crate::geometry::Geometry;
    use crate::scene::{inbox_for, MemoryScene, NodeKey};

    const DOC: &str = "part.plasticity";

    fn add_object(scene: &mut MemoryScene, parent: NodeKey, document: &str, id: u32) -> NodeKey {
        let attributes = ObjectAttributes {
            document: document.into(),
            id: EntityId(id),
            name: format!("Solid.{id}"),
            kind: ObjectKind::Solid,
            material_id: 0,
            version: 1,
        };
        let object = scene.create_object(Geometry::default(), attributes).unwrap();
        scene.link_child(parent, object).unwrap();
        object
    }

    fn add_group(scene: &mut MemoryScene, parent: NodeKey, id: u32) -> NodeKey {
        let group = scene
            .create_container(&format!("Group.{id}"), Some(StoredTag::new(DOC, EntityId(id))))
            .unwrap();
        scene.link_child(parent, group).unwrap();
        group
    }

    fn setup() -> (MemoryScene, NodeKey) {
        let mut scene = MemoryScene::new();
        let inbox = inbox_for(&mut scene, &MirrorConfig::default(), DOC).unwrap();
        (scene, inbox)
    }

    #[test]
    fn rebuild_walks_nested_groups() {
        let (mut scene, inbox) = setup();
        let outer = add_group(&mut scene, inbox, 1);
        let inner = add_group(&mut scene, outer, 2);
        let a = add_object(&mut scene, inbox, DOC, 10);
        let b = add_object(&mut scene, inner, DOC, 11);

        let mut index = SceneIndex::new();
        let doc = index.rebuild(&scene, DOC, inbox).unwrap();

        assert_eq!(doc.get(Scope::Group, EntityId(1)), Some(outer));
        assert_eq!(doc.get(Scope::Group, EntityId(2)), Some(inner));
        assert_eq!(doc.get(Scope::Item, EntityId(10)), Some(a));
        assert_eq!(doc.get(Scope::Item, EntityId(11)), Some(b));
        assert_eq!(doc.len(Scope::Item), 2);
        assert_eq!(doc.len(Scope::Group), 2);
    }

    #[test]
    fn rebuild_is_idempotent() {
        let (mut scene, inbox) = setup();
        let group = add_group(&mut scene, inbox, 1);
        add_object(&mut scene, group, DOC, 2);

        let mut index = SceneIndex::new();
        let first = index.rebuild(&scene, DOC, inbox).unwrap().clone();
        let second = index.rebuild(&scene, DOC, inbox).unwrap().clone();
        assert_eq!(first, second);
    }

    #[test]
    fn item_and_group_share_identifier() {
        let (mut scene, inbox) = setup();
        let group = add_group(&mut scene, inbox, 5);
        let object = add_object(&mut scene, group, DOC, 5);

        let mut index = SceneIndex::new();
        index.rebuild(&scene, DOC, inbox).unwrap();
        assert_eq!(index.get(DOC, Scope::Item, EntityId(5)), Some(object));
        assert_eq!(index.get(DOC, Scope::Group, EntityId(5)), Some(group));
    }

    #[test]
    fn put_keeps_scopes_apart() {
        let (mut scene, inbox) = setup();
        let group = add_group(&mut scene, inbox, 5);
        let object = add_object(&mut scene, inbox, DOC, 6);

        let mut index = SceneIndex::new();
        index.put(DOC, Scope::Item, EntityId(5), object);
        index.put(DOC, Scope::Group, EntityId(5), group);
        assert_eq!(index.get(DOC, Scope::Item, EntityId(5)), Some(object));
        assert_eq!(index.get(DOC, Scope::Group, EntityId(5)), Some(group));

        index.remove(DOC, Scope::Item, EntityId(5));
        assert_eq!(index.get(DOC, Scope::Item, EntityId(5)), None);
        assert_eq!(index.get(DOC, Scope::Group, EntityId(5)), Some(group));
    }

    #[test]
    fn root_is_never_stored() {
        let (_scene, inbox) = setup();
        let mut index = SceneIndex::new();
        assert_eq!(index.put(DOC, Scope::Group, EntityId::ROOT, inbox), None);
        assert_eq!(index.get(DOC, Scope::Group, EntityId::ROOT), None);
    }

    #[test]
    fn out_of_band_removal_is_picked_up() {
        let (mut scene, inbox) = setup();
        let a = add_object(&mut scene, inbox, DOC, 1);
        add_object(&mut scene, inbox, DOC, 2);

        let mut index = SceneIndex::new();
        index.rebuild(&scene, DOC, inbox).unwrap();
        assert_eq!(index.document(DOC).unwrap().len(Scope::Item), 2);

        scene.remove(a).unwrap();
        let doc = index.rebuild(&scene, DOC, inbox).unwrap();
        assert_eq!(doc.get(Scope::Item, EntityId(1)), None);
        assert!(doc.get(Scope::Item, EntityId(2)).is_some());
    }

    #[test]
    fn foreign_and_untagged_nodes_are_skipped() {
        let (mut scene, inbox) = setup();
        add_object(&mut scene, inbox, "other.plasticity", 1);
        let loose = scene.create_container("Loose", None).unwrap();
        scene.link_child(inbox, loose).unwrap();
        let nested = add_object(&mut scene, loose, DOC, 2);

        let mut index = SceneIndex::new();
        let doc = index.rebuild(&scene, DOC, inbox).unwrap();
        assert_eq!(doc.get(Scope::Item, EntityId(1)), None);
        assert_eq!(doc.get(Scope::Item, EntityId(2)), Some(nested));
        assert_eq!(doc.len(Scope::Group), 0);
    }

    #[test]
    fn failed_rebuild_keeps_previous_index() {
        let (mut scene, inbox) = setup();
        add_object(&mut scene, inbox, DOC, 1);

        let mut index = SceneIndex::new();
        let before = index.rebuild(&scene, DOC, inbox).unwrap().clone();

        scene.remove(inbox).unwrap();
        let result = index.rebuild(&scene, DOC, inbox);
        assert!(matches!(result, Err(MirrorError::SceneRebuild { .. })));
        assert_eq!(index.document(DOC), Some(&before));
    }

    #[test]
    fn clear_discards_documents() {
        let (scene, inbox) = setup();
        let mut index = SceneIndex::new();
        index.rebuild(&scene, DOC, inbox).unwrap();
        assert_eq!(index.documents().count(), 1);
        index.clear();
        assert!(index.document(DOC).is_none());
    }
}
