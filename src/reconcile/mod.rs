use std::collections::HashSet;
use std::fmt::Debug;
use std::hash::Hash;

use tracing::{debug, info};

use crate::config::MirrorConfig;
use crate::entity::{EntityId, ObjectAttributes, ObjectType, Scope, StoredTag};
use crate::error::{MirrorError, Result, SceneError};
use crate::geometry::BuildGeometry;
use crate::hierarchy::{LinkHierarchy, PendingLink};
use crate::index::{DocumentIndex, SceneIndex};
use crate::message::{ListSnapshot, ObjectRecord, Refacet, Transaction};
use crate::report::{ReportLevel, ReportSink, TracingSink};
use crate::scene::{inbox_for, ExternalScene};

pub use crate::error::Issue;

/// What a handler changed, and what it had to skip.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Outcome {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
    pub linked: usize,
    /// Records without a counterpart in the scene, such as empties.
    pub ignored: Vec<(ObjectType, EntityId)>,
    pub issues: Vec<Issue>,
}

impl Outcome {
    /// Returns `true` if every record was applied.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

enum Applied {
    Created,
    Updated,
    Skipped,
    Ignored(ObjectType),
}

/// Keeps the mirrored scene of each document consistent with inbound
/// transactions and snapshots.
///
/// Every handler re-derives the document index from the live scene before
/// touching anything. It then applies content (create, update, delete) and
/// links the hierarchy in a second pass over the whole batch.
///
/// Messages are handled one at a time, to completion. Messages for one
/// document must arrive in increasing version order.
pub struct Reconciler<H, R = TracingSink> {
    config: MirrorConfig,
    index: SceneIndex<H>,
    sink: R,
}

impl<H: Copy + Eq + Hash + Debug> Reconciler<H> {
    /// Creates a reconciler that reports through `tracing`.
    #[must_use]
    pub fn new(config: MirrorConfig) -> Self {
        Self::with_sink(config, TracingSink)
    }
}

impl<H: Copy + Eq + Hash + Debug, R: ReportSink> Reconciler<H, R> {
    /// Creates a reconciler that reports to `sink`.
    #[must_use]
    pub fn with_sink(config: MirrorConfig, sink: R) -> Self {
        Self {
            config,
            index: SceneIndex::new(),
            sink,
        }
    }

    #[must_use]
    pub fn config(&self) -> &MirrorConfig {
        &self.config
    }

    /// Returns the index as of the last handled message.
    #[must_use]
    pub fn index(&self) -> &SceneIndex<H> {
        &self.index
    }

    #[must_use]
    pub fn sink(&self) -> &R {
        &self.sink
    }

    /// Discards all document indexes.
    pub fn on_connect(&mut self) {
        debug!("connected; discarding document indexes");
        self.index.clear();
    }

    /// Discards all document indexes.
    pub fn on_disconnect(&mut self) {
        debug!("disconnected; discarding document indexes");
        self.index.clear();
    }

    pub fn on_new_version(&mut self, filename: &str, version: u64) {
        self.sink.report(
            ReportLevel::Info,
            &format!("New version of {filename} available: {version}"),
        );
    }

    pub fn on_new_file(&mut self, filename: &str) {
        self.sink
            .report(ReportLevel::Info, &format!("New file available: {filename}"));
    }

    /// Applies an incremental transaction.
    ///
    /// Deletes run first, then `add` and `update` records are applied as
    /// one batch: content for every record, then hierarchy for every record.
    ///
    /// # Errors
    ///
    /// Returns [`MirrorError::SceneRebuild`] if the document's scene cannot
    /// be read. Per-record failures are returned in [`Outcome::issues`].
    pub fn on_transaction<S>(&mut self, scene: &mut S, transaction: &Transaction) -> Result<Outcome>
    where
        S: ExternalScene<Handle = H> + ?Sized,
    {
        let document = transaction.filename.as_str();
        let inbox = self.prepare(scene, document, transaction.version)?;
        let index = self.index.document_mut(document);
        let mut outcome = Outcome::default();

        for entry in &transaction.delete {
            let (scope, id) = entry.target();
            delete(scene, index, inbox, scope, id, &mut outcome);
        }

        let records: Vec<&ObjectRecord> = transaction
            .add
            .iter()
            .chain(&transaction.update)
            .collect();
        apply(
            scene,
            index,
            document,
            transaction.version,
            inbox,
            &records,
            &mut outcome,
        );

        Ok(self.finish(document, transaction.version, outcome))
    }

    /// Applies a full snapshot.
    ///
    /// Records are applied as in [`Reconciler::on_transaction`]; afterwards
    /// every known item or group whose identifier is absent from `add` is
    /// deleted.
    ///
    /// # Errors
    ///
    /// Returns [`MirrorError::SceneRebuild`] if the document's scene cannot
    /// be read. Per-record failures are returned in [`Outcome::issues`].
    pub fn on_list<S>(&mut self, scene: &mut S, list: &ListSnapshot) -> Result<Outcome>
    where
        S: ExternalScene<Handle = H> + ?Sized,
    {
        let document = list.filename.as_str();
        let inbox = self.prepare(scene, document, list.version)?;
        let index = self.index.document_mut(document);
        let mut outcome = Outcome::default();

        let records: Vec<&ObjectRecord> = list.add.iter().collect();
        apply(
            scene,
            index,
            document,
            list.version,
            inbox,
            &records,
            &mut outcome,
        );

        let mut present_items = HashSet::new();
        let mut present_groups = HashSet::new();
        for record in &list.add {
            match record.object_type.scope() {
                Some(Scope::Item) => present_items.insert(record.id),
                Some(Scope::Group) => present_groups.insert(record.id),
                None => false,
            };
        }

        for (scope, present) in [(Scope::Item, present_items), (Scope::Group, present_groups)] {
            let stale: Vec<EntityId> = index
                .ids(scope)
                .filter(|id| !present.contains(id))
                .collect();
            for id in stale {
                delete(scene, index, inbox, scope, id, &mut outcome);
            }
        }

        Ok(self.finish(document, list.version, outcome))
    }

    /// Replaces the geometry of existing items.
    ///
    /// Names, attributes other than the version, and hierarchy are kept.
    ///
    /// # Errors
    ///
    /// Returns [`MirrorError::SceneRebuild`] if the document's scene cannot
    /// be read. Per-record failures are returned in [`Outcome::issues`].
    pub fn on_refacet<S>(&mut self, scene: &mut S, refacet: &Refacet) -> Result<Outcome>
    where
        S: ExternalScene<Handle = H> + ?Sized,
    {
        let document = refacet.filename.as_str();
        self.prepare(scene, document, refacet.version)?;
        let index = self.index.document_mut(document);
        let mut outcome = Outcome::default();

        for item in &refacet.items {
            let unresolved = Issue::UnresolvedObject {
                scope: Scope::Item,
                id: item.id,
            };
            let Some(handle) = index.get(Scope::Item, item.id) else {
                outcome.issues.push(unresolved);
                continue;
            };
            let Some(mut attributes) = scene.object_attributes(handle) else {
                outcome.issues.push(unresolved);
                continue;
            };

            let geometry = match BuildGeometry::new(
                &attributes.name,
                &item.vertices,
                &item.faces,
                &item.normals,
            )
            .with_regions(&item.groups, &item.face_ids)
            .execute()
            {
                Ok(geometry) => geometry,
                Err(source) => {
                    outcome.issues.push(Issue::MalformedGeometryInput {
                        object_type: attributes.kind.into(),
                        id: item.id,
                        source,
                    });
                    continue;
                }
            };

            attributes.version = item.version.unwrap_or(refacet.version);
            match scene.update_object(handle, geometry, attributes) {
                Ok(()) => outcome.updated += 1,
                Err(source) => outcome.issues.push(Issue::SceneOperation {
                    scope: Scope::Item,
                    id: item.id,
                    source,
                }),
            }
        }

        Ok(self.finish(document, refacet.version, outcome))
    }

    /// Resolves the inbox and rebuilds the document index from the scene.
    fn prepare<S>(&mut self, scene: &mut S, document: &str, version: u64) -> Result<H>
    where
        S: ExternalScene<Handle = H> + ?Sized,
    {
        self.sink.report(
            ReportLevel::Info,
            &format!("Updating {document} to version {version}"),
        );

        let rebuilt = inbox_for(scene, &self.config, document)
            .map_err(|source| MirrorError::SceneRebuild {
                document: document.to_owned(),
                source,
            })
            .and_then(|inbox| {
                self.index.rebuild(&*scene, document, inbox)?;
                Ok(inbox)
            });
        if let Err(err) = &rebuilt {
            self.sink.report(ReportLevel::Error, &err.to_string());
        }
        rebuilt
    }

    fn finish(&mut self, document: &str, version: u64, outcome: Outcome) -> Outcome {
        for (object_type, id) in &outcome.ignored {
            self.sink.report(
                ReportLevel::Info,
                &format!("Ignoring {object_type} with id {id}"),
            );
        }
        for issue in &outcome.issues {
            self.sink.report(ReportLevel::Error, &issue.to_string());
        }
        info!(
            document,
            version,
            created = outcome.created,
            updated = outcome.updated,
            deleted = outcome.deleted,
            linked = outcome.linked,
            ignored = outcome.ignored.len(),
            issues = outcome.issues.len(),
            "applied message"
        );
        outcome
    }
}

/// Applies content for every record, then links the whole batch.
fn apply<S>(
    scene: &mut S,
    index: &mut DocumentIndex<S::Handle>,
    document: &str,
    version: u64,
    inbox: S::Handle,
    records: &[&ObjectRecord],
    outcome: &mut Outcome,
) where
    S: ExternalScene + ?Sized,
{
    let mut pending = Vec::with_capacity(records.len());
    for record in records {
        match apply_content(scene, index, document, version, inbox, record) {
            Ok(Applied::Created) => outcome.created += 1,
            Ok(Applied::Updated) => outcome.updated += 1,
            Ok(Applied::Skipped) => continue,
            Ok(Applied::Ignored(object_type)) => {
                outcome.ignored.push((object_type, record.id));
                continue;
            }
            Err(issue) => {
                outcome.issues.push(issue);
                continue;
            }
        }
        pending.extend(PendingLink::from_record(record));
    }

    let linked = LinkHierarchy::new(index, inbox, &pending).execute(scene);
    outcome.linked += linked.linked;
    outcome.issues.extend(linked.issues);
}

fn apply_content<S>(
    scene: &mut S,
    index: &mut DocumentIndex<S::Handle>,
    document: &str,
    version: u64,
    inbox: S::Handle,
    record: &ObjectRecord,
) -> std::result::Result<Applied, Issue>
where
    S: ExternalScene + ?Sized,
{
    let Some(scope) = record.object_type.scope() else {
        return Ok(Applied::Ignored(record.object_type));
    };
    if record.id.is_root() {
        return Ok(Applied::Skipped);
    }
    let scene_issue = |source: SceneError| Issue::SceneOperation {
        scope,
        id: record.id,
        source,
    };

    if let Some(kind) = record.object_type.object_kind() {
        let geometry = BuildGeometry::new(
            &record.name,
            &record.vertices,
            &record.faces,
            &record.normals,
        )
        .with_regions(&record.groups, &record.face_ids)
        .execute()
        .map_err(|source| Issue::MalformedGeometryInput {
            object_type: record.object_type,
            id: record.id,
            source,
        })?;
        let attributes = ObjectAttributes {
            document: document.to_owned(),
            id: record.id,
            name: record.name.clone(),
            kind,
            material_id: record.material_id,
            version,
        };

        if let Some(handle) = index.get(Scope::Item, record.id) {
            scene
                .update_object(handle, geometry, attributes)
                .map_err(scene_issue)?;
            return Ok(Applied::Updated);
        }
        let handle = scene
            .create_object(geometry, attributes)
            .map_err(scene_issue)?;
        index.put(Scope::Item, record.id, handle);
        scene.link_child(inbox, handle).map_err(scene_issue)?;
        return Ok(Applied::Created);
    }

    if let Some(handle) = index.get(Scope::Group, record.id) {
        scene.rename(handle, &record.name).map_err(scene_issue)?;
        return Ok(Applied::Updated);
    }
    let handle = scene
        .create_container(&record.name, Some(StoredTag::new(document, record.id)))
        .map_err(scene_issue)?;
    index.put(Scope::Group, record.id, handle);
    scene.link_child(inbox, handle).map_err(scene_issue)?;
    Ok(Applied::Created)
}

/// Removes an entity from the scene and the index.
///
/// Children of a deleted group are moved to the inbox so the next rebuild
/// still finds them.
fn delete<S>(
    scene: &mut S,
    index: &mut DocumentIndex<S::Handle>,
    inbox: S::Handle,
    scope: Scope,
    id: EntityId,
    outcome: &mut Outcome,
) where
    S: ExternalScene + ?Sized,
{
    let Some(handle) = index.get(scope, id) else {
        debug!(id = %id, "nothing to delete for {scope}");
        return;
    };
    let result = if scope == Scope::Group {
        release_children(scene, handle, inbox).and_then(|()| scene.remove(handle))
    } else {
        scene.remove(handle)
    };

    // A node the scene refused to remove stays resolvable for this message.
    match result {
        Ok(()) => {
            index.remove(scope, id);
            outcome.deleted += 1;
        }
        Err(source) => outcome.issues.push(Issue::SceneOperation { scope, id, source }),
    }
}

fn release_children<S>(
    scene: &mut S,
    container: S::Handle,
    inbox: S::Handle,
) -> std::result::Result<(), SceneError>
where
    S: ExternalScene + ?Sized,
{
    for child in scene.list_children(container)? {
        scene.unlink_child(container, child.handle)?;
        scene.link_child(inbox, child.handle)?;
    }
    Ok(())
}

impl<H: Debug, R> Debug for Reconciler<H, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("config", &self.config)
            .field("index", &self.index)
            .finish_non_exhaustive()
    }
}
