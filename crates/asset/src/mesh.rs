//! CPU-side mesh representation used by loaders.

use std::ops::Range;

/// Texcoord used when a face corner has none.
pub const DEFAULT_TEXCOORD: [f32; 2] = [0.0, 0.0];
/// Normal used when a face corner has none.
pub const DEFAULT_NORMAL: [f32; 3] = [0.0, 0.0, 1.0];

/// Raw attribute sequences in file order, 0-indexed.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AttributePool {
    pub positions: Vec<[f32; 3]>,
    pub texcoords: Vec<[f32; 2]>,
    pub normals: Vec<[f32; 3]>,
}

/// One face corner: 0-based indices into an [`AttributePool`].
/// `None` marks an absent texcoord or normal.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct FaceCorner {
    pub position: usize,
    pub texcoord: Option<usize>,
    pub normal: Option<usize>,
}

impl FaceCorner {
    pub fn new(position: usize, texcoord: Option<usize>, normal: Option<usize>) -> Self {
        Self {
            position,
            texcoord,
            normal,
        }
    }
}

/// Polygon as read from the source: corners in winding order, the source
/// line it came from and the material active at that point.
#[derive(Clone, Debug, PartialEq)]
pub struct Face {
    pub corners: Vec<FaceCorner>,
    pub line: usize,
    pub material: Option<usize>,
}

/// Interleaved vertex: position, texcoord, normal. Values are in object space.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub texcoord: [f32; 2],
    pub normal: [f32; 3],
}

impl MeshVertex {
    pub fn new(position: [f32; 3], texcoord: [f32; 2], normal: [f32; 3]) -> Self {
        Self {
            position,
            texcoord,
            normal,
        }
    }
}

/// Run of consecutive triangles sharing one material.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubMesh {
    pub material: Option<usize>,
    /// Range into [`MeshData::indices`]; always a multiple of 3 long.
    pub indices: Range<u32>,
}

/// Indexed triangle mesh with tightly-packed vertices.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<MeshVertex>,
    pub indices: Vec<u32>,
    pub submeshes: Vec<SubMesh>,
}

impl MeshData {
    pub fn new(vertices: Vec<MeshVertex>, indices: Vec<u32>) -> Self {
        let submeshes = if indices.is_empty() {
            Vec::new()
        } else {
            vec![SubMesh {
                material: None,
                indices: 0..indices.len() as u32,
            }]
        };
        Self {
            vertices,
            indices,
            submeshes,
        }
    }

    /// Returns `true` if both vertex and index buffers are non-empty.
    pub fn is_valid(&self) -> bool {
        !self.vertices.is_empty() && !self.indices.is_empty()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Axis-aligned bounds of all vertex positions, `None` for an empty mesh.
    pub fn bounds(&self) -> Option<([f32; 3], [f32; 3])> {
        let first = self.vertices.first()?.position;
        Some(self.vertices.iter().fold((first, first), |(mut lo, mut hi), v| {
            for axis in 0..3 {
                lo[axis] = lo[axis].min(v.position[axis]);
                hi[axis] = hi[axis].max(v.position[axis]);
            }
            (lo, hi)
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mesh_data_validity() {
        let data = MeshData::new(vec![MeshVertex::default()], vec![0, 0, 0]);
        assert!(data.is_valid());
        assert_eq!(data.triangle_count(), 1);
        assert_eq!(data.submeshes.len(), 1);
        assert!(!MeshData::default().is_valid());
    }

    #[test]
    fn bounds_cover_all_positions() {
        let data = MeshData::new(
            vec![
                MeshVertex::new([-1.0, 2.0, 0.5], DEFAULT_TEXCOORD, DEFAULT_NORMAL),
                MeshVertex::new([3.0, -4.0, 0.0], DEFAULT_TEXCOORD, DEFAULT_NORMAL),
            ],
            vec![],
        );
        assert_eq!(data.bounds(), Some(([-1.0, -4.0, 0.0], [3.0, 2.0, 0.5])));
        assert_eq!(MeshData::default().bounds(), None);
    }
}
