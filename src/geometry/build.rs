use crate::error::GeometryError;
use crate::math::{Point3, Vector3};

use super::{FaceRegion, Geometry};

/// Converts flat vertex, normal, index and region buffers into a [`Geometry`].
///
/// Normals are negated on the way in to match the host's winding convention.
/// Region pairs are `(offset, length)` in index-buffer units and are divided
/// by 3 to address triangles.
pub struct BuildGeometry<'a> {
    name: &'a str,
    vertices: &'a [f64],
    indices: &'a [u32],
    normals: &'a [f64],
    groups: &'a [u32],
    face_ids: &'a [u32],
}

impl<'a> BuildGeometry<'a> {
    /// Creates a new `BuildGeometry` operation with no face regions.
    #[must_use]
    pub fn new(name: &'a str, vertices: &'a [f64], indices: &'a [u32], normals: &'a [f64]) -> Self {
        Self {
            name,
            vertices,
            indices,
            normals,
            groups: &[],
            face_ids: &[],
        }
    }

    /// Sets the flattened `(offset, length)` region pairs and their face ids.
    #[must_use]
    pub fn with_regions(mut self, groups: &'a [u32], face_ids: &'a [u32]) -> Self {
        self.groups = groups;
        self.face_ids = face_ids;
        self
    }

    /// Executes the conversion.
    ///
    /// # Errors
    ///
    /// Returns a [`GeometryError`] if any buffer has the wrong shape, a
    /// triangle references a missing point, or a region falls outside the
    /// triangles or overlaps another. No partial geometry is produced.
    pub fn execute(&self) -> Result<Geometry, GeometryError> {
        let points: Vec<Point3> = triples("vertex", self.vertices)?
            .map(|[x, y, z]| Point3::new(x, y, z))
            .collect();
        let normals: Vec<Vector3> = triples("normal", self.normals)?
            .map(|[x, y, z]| -Vector3::new(x, y, z))
            .collect();
        if points.len() != normals.len() {
            return Err(GeometryError::NormalCountMismatch {
                points: points.len(),
                normals: normals.len(),
            });
        }

        let triangles = self.triangles(points.len())?;
        let regions = self.regions(triangles.len())?;

        Ok(Geometry {
            points,
            normals,
            triangles,
            regions,
        })
    }

    fn triangles(&self, point_count: usize) -> Result<Vec<[u32; 3]>, GeometryError> {
        if self.indices.len() % 3 != 0 {
            return Err(GeometryError::NotTriples {
                buffer: "index",
                len: self.indices.len(),
            });
        }

        self.indices
            .chunks_exact(3)
            .enumerate()
            .map(|(triangle, chunk)| {
                let tri = [chunk[0], chunk[1], chunk[2]];
                match tri.iter().find(|&&index| index as usize >= point_count) {
                    Some(&index) => Err(GeometryError::IndexOutOfRange {
                        triangle,
                        index,
                        points: point_count,
                    }),
                    None => Ok(tri),
                }
            })
            .collect()
    }

    fn regions(&self, triangle_count: usize) -> Result<Vec<FaceRegion>, GeometryError> {
        if self.groups.len() % 2 != 0 {
            return Err(GeometryError::OddRegionBuffer {
                len: self.groups.len(),
            });
        }
        let pair_count = self.groups.len() / 2;
        if pair_count != self.face_ids.len() {
            return Err(GeometryError::FaceIdCountMismatch {
                regions: pair_count,
                face_ids: self.face_ids.len(),
            });
        }

        let mut claimed = vec![false; triangle_count];
        let mut regions = Vec::with_capacity(pair_count);
        for (region, (pair, &face_id)) in self
            .groups
            .chunks_exact(2)
            .zip(self.face_ids)
            .enumerate()
        {
            let offset = pair[0] as usize;
            let length = pair[1] as usize;
            let start = offset / 3;
            let end = (offset + length) / 3;
            if end > triangle_count {
                return Err(GeometryError::RegionOutOfRange {
                    region,
                    start,
                    end,
                    triangles: triangle_count,
                });
            }
            for (triangle, slot) in claimed.iter_mut().enumerate().take(end).skip(start) {
                if *slot {
                    return Err(GeometryError::OverlappingRegion { region, triangle });
                }
                *slot = true;
            }
            regions.push(FaceRegion {
                triangles: start..end,
                face_id,
                name: self.name.to_owned(),
            });
        }

        Ok(regions)
    }
}

fn triples<'b>(
    buffer: &'static str,
    values: &'b [f64],
) -> Result<impl Iterator<Item = [f64; 3]> + 'b, GeometryError> {
    if values.len() % 3 != 0 {
        return Err(GeometryError::NotTriples {
            buffer,
            len: values.len(),
        });
    }
    Ok(values.chunks_exact(3).map(|c| [c[0], c[1], c[2]]))
}
