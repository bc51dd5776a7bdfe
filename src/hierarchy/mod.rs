use tracing::{trace, warn};

use crate::entity::{EntityId, ObjectType, Scope, Visibility};
use crate::error::{Issue, SceneError};
use crate::index::DocumentIndex;
use crate::message::ObjectRecord;
use crate::scene::ExternalScene;

/// Parent and visibility to apply to one entity once all content exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingLink {
    pub object_type: ObjectType,
    pub scope: Scope,
    pub id: EntityId,
    pub parent_id: EntityId,
    pub visibility: Visibility,
}

impl PendingLink {
    /// Materializes the hierarchy part of a record.
    ///
    /// Returns `None` for records that have no scope (empties).
    #[must_use]
    pub fn from_record(record: &ObjectRecord) -> Option<Self> {
        Some(Self {
            object_type: record.object_type,
            scope: record.object_type.scope()?,
            id: record.id,
            parent_id: record.parent_id,
            visibility: record.visibility(),
        })
    }
}

/// Result of a [`LinkHierarchy`] pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkOutcome {
    /// Entities that were linked and had their visibility applied.
    pub linked: usize,
    pub issues: Vec<Issue>,
}

/// Links entities under their parents and applies decoded visibility.
///
/// Runs after every entity of a batch exists, so a group may appear after
/// the children that reference it. Parent `0` resolves to the document's
/// inbox; any other parent must be a group of the same document.
pub struct LinkHierarchy<'a, H> {
    document: &'a DocumentIndex<H>,
    inbox: H,
    links: &'a [PendingLink],
}

impl<'a, H: Copy + Eq> LinkHierarchy<'a, H> {
    /// Creates a new `LinkHierarchy` pass over `links`, in order.
    #[must_use]
    pub fn new(document: &'a DocumentIndex<H>, inbox: H, links: &'a [PendingLink]) -> Self {
        Self {
            document,
            inbox,
            links,
        }
    }

    /// Executes the pass. Failures are per entity and never stop the pass.
    pub fn execute<S>(&self, scene: &mut S) -> LinkOutcome
    where
        S: ExternalScene<Handle = H> + ?Sized,
    {
        let mut outcome = LinkOutcome::default();
        for link in self.links {
            if link.id.is_root() {
                continue;
            }
            let mut detached = None;
            match self.link_one(scene, link, &mut detached) {
                Ok(()) => outcome.linked += 1,
                Err(issue) => outcome.issues.push(issue),
            }
            outcome.issues.extend(detached);
        }
        outcome
    }

    /// Links one entity. If the new link fails and the previous parent also
    /// refuses it back, that second failure is left in `detached`.
    fn link_one<S>(
        &self,
        scene: &mut S,
        link: &PendingLink,
        detached: &mut Option<Issue>,
    ) -> Result<(), Issue>
    where
        S: ExternalScene<Handle = H> + ?Sized,
    {
        let entity = self
            .document
            .get(link.scope, link.id)
            .ok_or(Issue::UnresolvedObject {
                scope: link.scope,
                id: link.id,
            })?;

        let parent = if link.parent_id.is_root() {
            self.inbox
        } else {
            self.document
                .get(Scope::Group, link.parent_id)
                .ok_or(Issue::UnresolvedParent {
                    object_type: link.object_type,
                    id: link.id,
                    parent_id: link.parent_id,
                })?
        };

        let scene_issue = |source: SceneError| Issue::SceneOperation {
            scope: link.scope,
            id: link.id,
            source,
        };

        let previous = scene.parent_of(entity);
        if previous != Some(parent) {
            if let Some(old) = previous {
                scene.unlink_child(old, entity).map_err(scene_issue)?;
            }
            if let Err(source) = scene.link_child(parent, entity) {
                if let Some(old) = previous {
                    if let Err(relink) = scene.link_child(old, entity) {
                        warn!(id = %link.id, scope = %link.scope, "entity left without a parent");
                        *detached = Some(scene_issue(relink));
                    }
                }
                return Err(scene_issue(source));
            }
        }

        scene
            .set_visibility(
                entity,
                link.visibility.hidden,
                link.visibility.selectable(),
            )
            .map_err(scene_issue)?;

        trace!(id = %link.id, scope = %link.scope, parent = %link.parent_id, "linked");
        Ok(())
    }
}
