pub mod build;

pub use build::BuildGeometry;

use std::ops::Range;

use crate::math::{Point3, Vector3};

/// A contiguous run of triangles that came from one source face.
#[derive(Debug, Clone, PartialEq)]
pub struct FaceRegion {
    /// Triangle indices covered by this region (half-open).
    pub triangles: Range<usize>,
    /// Face identifier carried by the originating message.
    pub face_id: u32,
    /// Name of the source object.
    pub name: String,
}

/// Structured triangle geometry rebuilt from flat buffers.
///
/// `normals` is parallel to `points`. Regions are disjoint and never
/// reach past the last triangle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Geometry {
    /// Point positions.
    pub points: Vec<Point3>,
    /// Per-point normals.
    pub normals: Vec<Vector3>,
    /// Triangles as triples of point indices.
    pub triangles: Vec<[u32; 3]>,
    /// Face regions, in message order.
    pub regions: Vec<FaceRegion>,
}

impl Geometry {
    /// Returns the number of points.
    #[must_use]
    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    /// Returns the number of triangles.
    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Returns `true` if the geometry has no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Returns the region containing `triangle`, if it is tagged.
    #[must_use]
    pub fn region_of(&self, triangle: usize) -> Option<&FaceRegion> {
        self.regions
            .iter()
            .find(|region| region.triangles.contains(&triangle))
    }

    /// Returns the source face identifier of `triangle`, if it is tagged.
    #[must_use]
    pub fn face_id_of(&self, triangle: usize) -> Option<u32> {
        self.region_of(triangle).map(|region| region.face_id)
    }
}
