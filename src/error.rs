use thiserror::Error;

use crate::entity::{EntityId, ObjectType, Scope};

/// Top-level error type for the scene mirror.
#[derive(Debug, Error)]
pub enum MirrorError {
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    Scene(#[from] SceneError),

    /// The mirrored scene of a document could not be enumerated.
    ///
    /// This is the only failure that aborts a whole message.
    #[error("failed to rebuild index for {document}: {source}")]
    SceneRebuild {
        document: String,
        #[source]
        source: SceneError,
    },
}

/// Malformed flat buffers handed to the geometry builder.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeometryError {
    #[error("{buffer} buffer length {len} is not a multiple of 3")]
    NotTriples { buffer: &'static str, len: usize },

    #[error("point count {points} does not match normal count {normals}")]
    NormalCountMismatch { points: usize, normals: usize },

    #[error("triangle {triangle} references point {index}, but only {points} points exist")]
    IndexOutOfRange {
        triangle: usize,
        index: u32,
        points: usize,
    },

    #[error("region buffer length {len} is not a sequence of (offset, length) pairs")]
    OddRegionBuffer { len: usize },

    #[error("{regions} regions but {face_ids} face ids")]
    FaceIdCountMismatch { regions: usize, face_ids: usize },

    #[error("region {region} spans triangles {start}..{end}, but only {triangles} triangles exist")]
    RegionOutOfRange {
        region: usize,
        start: usize,
        end: usize,
        triangles: usize,
    },

    #[error("region {region} overlaps an earlier region at triangle {triangle}")]
    OverlappingRegion { region: usize, triangle: usize },
}

/// Failures reported by the external scene collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SceneError {
    #[error("scene node not found: {0}")]
    NodeNotFound(String),

    #[error("scene node is not a container: {0}")]
    NotAContainer(String),

    #[error("scene rejected operation: {0}")]
    Rejected(String),
}

/// A non-fatal, per-record problem encountered while applying a message.
///
/// Issues are collected and reported; the record is skipped and its
/// siblings are still processed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Issue {
    #[error("malformed geometry for {object_type} with id {id}: {source}")]
    MalformedGeometryInput {
        object_type: ObjectType,
        id: EntityId,
        #[source]
        source: GeometryError,
    },

    #[error("parent of {object_type} with id {id} and parent_id {parent_id} not found")]
    UnresolvedParent {
        object_type: ObjectType,
        id: EntityId,
        parent_id: EntityId,
    },

    #[error("{scope} with id {id} not found")]
    UnresolvedObject { scope: Scope, id: EntityId },

    #[error("scene rejected change to {scope} with id {id}: {source}")]
    SceneOperation {
        scope: Scope,
        id: EntityId,
        #[source]
        source: SceneError,
    },
}

/// Convenience type alias for results using [`MirrorError`].
pub type Result<T> = std::result::Result<T, MirrorError>;
