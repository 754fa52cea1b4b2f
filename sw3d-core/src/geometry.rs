/// Polygon mesh storage and per-face derived data
use nalgebra::{Point3, Vector3, Vector4};
use tracing::debug;

use crate::error::{GeometryError, GeometryResult};
use crate::transform::normalize;

/// A polygon mesh with an indexed, flattened face layout.
///
/// Face `i` uses `num_vertices[i]` entries of `indices` starting at
/// `offsets[i]`. The offset table is private and rebuilt whenever the face
/// layout changes.
#[derive(Debug, Clone, PartialEq)]
pub struct Mesh {
    pub name: String,
    vertices: Vec<Point3<f32>>,
    /// Normals read from the source file. The renderer recomputes face
    /// normals every frame and never reads these.
    pub normals: Vec<Vector3<f32>>,
    indices: Vec<usize>,
    num_vertices: Vec<usize>,
    offsets: Vec<usize>,
}

impl Mesh {
    /// Build a mesh, checking that the face counts cover the index buffer
    /// and that every index references a vertex.
    pub fn new(
        name: impl Into<String>,
        vertices: Vec<Point3<f32>>,
        indices: Vec<usize>,
        num_vertices: Vec<usize>,
    ) -> GeometryResult<Self> {
        let mut mesh = Self {
            name: name.into(),
            vertices,
            normals: Vec::new(),
            indices,
            num_vertices,
            offsets: Vec::new(),
        };
        mesh.check_layout()?;
        mesh.calculate_offsets();
        Ok(mesh)
    }

    pub fn empty() -> Self {
        Self {
            name: String::new(),
            vertices: Vec::new(),
            normals: Vec::new(),
            indices: Vec::new(),
            num_vertices: Vec::new(),
            offsets: Vec::new(),
        }
    }

    pub fn vertices(&self) -> &[Point3<f32>] {
        &self.vertices
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn num_vertices(&self) -> &[usize] {
        &self.num_vertices
    }

    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn face_count(&self) -> usize {
        self.num_vertices.len()
    }

    /// Indices of the vertices of face `face`, in winding order.
    pub fn face_indices(&self, face: usize) -> &[usize] {
        let start = self.offsets[face];
        &self.indices[start..start + self.num_vertices[face]]
    }

    /// Rebuild the per-face offset table from the face counts.
    pub fn calculate_offsets(&mut self) {
        self.offsets.clear();
        self.offsets.reserve(self.num_vertices.len());
        let mut offset = 0;
        for &n in &self.num_vertices {
            self.offsets.push(offset);
            offset += n;
        }
    }

    fn check_layout(&self) -> GeometryResult<()> {
        let expected: usize = self.num_vertices.iter().sum();
        if expected != self.indices.len() {
            return Err(GeometryError::FaceCountMismatch {
                expected,
                got: self.indices.len(),
            });
        }
        if let Some(&index) = self.indices.iter().find(|&&i| i >= self.vertices.len()) {
            return Err(GeometryError::IndexOutOfRange {
                index,
                vertex_count: self.vertices.len(),
            });
        }
        Ok(())
    }

    /// Check every mesh invariant, including that all faces are triangles
    /// or quads.
    pub fn validate(&self) -> GeometryResult<()> {
        self.check_layout()?;
        if let Some((face, &arity)) = self
            .num_vertices
            .iter()
            .enumerate()
            .find(|(_, &n)| n != 3 && n != 4)
        {
            return Err(GeometryError::UnsupportedFaceArity { face, arity });
        }
        Ok(())
    }

    /// Split every quad into two triangles along its shorter diagonal.
    ///
    /// Triangles pass through unchanged, so the operation is idempotent.
    /// Any other arity aborts with the mesh left untouched.
    pub fn triangulate(&mut self) -> GeometryResult<()> {
        let mut new_indices = Vec::with_capacity(self.indices.len() * 3 / 2);
        let mut new_num_vertices = Vec::with_capacity(self.num_vertices.len() * 2);

        for face in 0..self.face_count() {
            let idx = self.face_indices(face);
            match idx.len() {
                3 => {
                    new_indices.extend_from_slice(idx);
                    new_num_vertices.push(3);
                }
                4 => {
                    let p = |k: usize| self.vertices[idx[k]];
                    let diag_02 = (p(0) - p(2)).norm();
                    let diag_13 = (p(1) - p(3)).norm();
                    let sequence = if diag_02 <= diag_13 {
                        [0, 1, 2, 0, 2, 3]
                    } else {
                        [0, 1, 3, 1, 2, 3]
                    };
                    new_indices.extend(sequence.iter().map(|&k| idx[k]));
                    new_num_vertices.extend_from_slice(&[3, 3]);
                }
                arity => return Err(GeometryError::UnsupportedFaceArity { face, arity }),
            }
        }

        debug!(
            mesh = %self.name,
            before = self.face_count(),
            after = new_num_vertices.len(),
            "Triangulated mesh"
        );
        self.indices = new_indices;
        self.num_vertices = new_num_vertices;
        self.calculate_offsets();
        Ok(())
    }

    /// Every face edge as a pair of homogeneous points, wrapping from the
    /// last vertex back to the first. Edge `j` of face `i` occupies entries
    /// `2 * (offsets[i] + j)` and `2 * (offsets[i] + j) + 1`.
    pub fn generate_edges(&self) -> Vec<Vector4<f32>> {
        let mut edges = Vec::with_capacity(self.indices.len() * 2);
        for face in 0..self.face_count() {
            let idx = self.face_indices(face);
            let n = idx.len();
            for i in 0..n {
                edges.push(self.vertices[idx[i]].to_homogeneous());
                edges.push(self.vertices[idx[(i + 1) % n]].to_homogeneous());
            }
        }
        edges
    }

    /// Face vertices as homogeneous points, laid out like the index buffer.
    pub fn generate_faces(&self) -> Vec<Vector4<f32>> {
        self.indices
            .iter()
            .map(|&i| self.vertices[i].to_homogeneous())
            .collect()
    }

    /// Per-face normals over a buffer laid out like [`Mesh::generate_faces`].
    pub fn face_normals(
        &self,
        faces: &[Vector4<f32>],
        ccw: bool,
    ) -> Vec<GeometryResult<Vector4<f32>>> {
        (0..self.face_count())
            .map(|face| {
                face_normal(self.face_slice(faces, face), ccw)
                    .map_err(|_| GeometryError::DegenerateFace { face })
            })
            .collect()
    }

    /// Per-face centers over a buffer laid out like [`Mesh::generate_faces`].
    pub fn face_centers(&self, faces: &[Vector4<f32>]) -> Vec<Vector4<f32>> {
        (0..self.face_count())
            .map(|face| face_center(self.face_slice(faces, face)))
            .collect()
    }

    fn face_slice<'a>(&self, faces: &'a [Vector4<f32>], face: usize) -> &'a [Vector4<f32>] {
        let start = self.offsets[face];
        &faces[start..start + self.num_vertices[face]]
    }

    /// Create an axis-aligned cube centered on the origin.
    ///
    /// Faces are quads wound counter-clockwise as seen from outside, so
    /// `face_normal(.., true)` points outwards.
    pub fn cube(size: f32) -> Self {
        let h = size / 2.0;
        let vertices = vec![
            Point3::new(-h, -h, -h),
            Point3::new(h, -h, -h),
            Point3::new(h, h, -h),
            Point3::new(-h, h, -h),
            Point3::new(-h, -h, h),
            Point3::new(h, -h, h),
            Point3::new(h, h, h),
            Point3::new(-h, h, h),
        ];
        let indices = vec![
            0, 1, 2, 3, // front (-z)
            5, 4, 7, 6, // back (+z)
            1, 5, 6, 2, // right (+x)
            4, 0, 3, 7, // left (-x)
            3, 2, 6, 7, // top (+y)
            4, 5, 1, 0, // bottom (-y)
        ];
        let mut mesh = Self {
            name: "cube".to_string(),
            vertices,
            normals: Vec::new(),
            indices,
            num_vertices: vec![4; 6],
            offsets: Vec::new(),
        };
        mesh.calculate_offsets();
        mesh
    }
}

impl Default for Mesh {
    fn default() -> Self {
        Self::empty()
    }
}

/// Unit normal of a planar face.
///
/// In the left-handed convention used here a face wound counter-clockwise
/// as seen by the viewer has the normal `cross(p2 - p0, p1 - p0)`; `ccw ==
/// false` flips it. Fails when the face has fewer than three points or its
/// first three points are collinear.
pub fn face_normal(face: &[Vector4<f32>], ccw: bool) -> GeometryResult<Vector4<f32>> {
    if face.len() < 3 {
        return Err(GeometryError::DegenerateVector);
    }
    let p0 = face[0].xyz();
    let n = (face[2].xyz() - p0).cross(&(face[1].xyz() - p0));
    let n = normalize(&n)?;
    let n = if ccw { n } else { -n };
    Ok(n.to_homogeneous())
}

/// Arithmetic mean of a face's points.
pub fn face_center(face: &[Vector4<f32>]) -> Vector4<f32> {
    if face.is_empty() {
        return Vector4::zeros();
    }
    face.iter().sum::<Vector4<f32>>() / face.len() as f32
}
