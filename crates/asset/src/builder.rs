//! Triangulation + vertex deduplication: faces over an attribute pool
//! become an indexed triangle list.

use std::collections::HashMap;

use crate::{
    error::{AssetError, AssetResult, AttributeKind},
    mesh::{
        AttributePool, DEFAULT_NORMAL, DEFAULT_TEXCOORD, Face, FaceCorner, MeshData, MeshVertex,
        SubMesh,
    },
};

/// Build an indexed mesh from `faces`.
///
/// Quads split into `(c0, c1, c2)`, `(c0, c2, c3)`. Corners with the same
/// index triple share one output vertex, regardless of attribute values.
/// Faces produced by [`crate::obj::parse_obj`] never fail here; the error
/// cases only guard faces assembled by hand.
pub fn build_mesh(pool: &AttributePool, faces: &[Face]) -> AssetResult<MeshData> {
    let mut builder = MeshBuilder::new(pool);
    for face in faces {
        builder.push_face(face)?;
    }
    Ok(builder.finish())
}

struct MeshBuilder<'a> {
    pool: &'a AttributePool,
    slots: HashMap<FaceCorner, u32>,
    vertices: Vec<MeshVertex>,
    indices: Vec<u32>,
    submeshes: Vec<SubMesh>,
}

impl<'a> MeshBuilder<'a> {
    fn new(pool: &'a AttributePool) -> Self {
        Self {
            pool,
            slots: HashMap::new(),
            vertices: Vec::new(),
            indices: Vec::new(),
            submeshes: Vec::new(),
        }
    }

    fn push_face(&mut self, face: &Face) -> AssetResult<()> {
        let c = &face.corners;
        let triangles: &[[usize; 3]] = match c.len() {
            3 => &[[0, 1, 2]],
            4 => &[[0, 1, 2], [0, 2, 3]],
            corners => {
                return Err(AssetError::UnsupportedFaceArity {
                    line: face.line,
                    corners,
                });
            }
        };

        let mut slots = [0u32; 4];
        for (slot, corner) in slots.iter_mut().zip(c) {
            *slot = self.slot_for(corner, face.line)?;
        }

        for tri in triangles {
            self.indices.extend(tri.iter().map(|&i| slots[i]));
        }
        self.extend_submesh(face.material);
        Ok(())
    }

    fn slot_for(&mut self, corner: &FaceCorner, line: usize) -> AssetResult<u32> {
        if let Some(&slot) = self.slots.get(corner) {
            return Ok(slot);
        }

        let position =
            lookup(&self.pool.positions, corner.position, AttributeKind::Position, line)?;
        let texcoord = match corner.texcoord {
            Some(i) => lookup(&self.pool.texcoords, i, AttributeKind::Texcoord, line)?,
            None => DEFAULT_TEXCOORD,
        };
        let normal = match corner.normal {
            Some(i) => lookup(&self.pool.normals, i, AttributeKind::Normal, line)?,
            None => DEFAULT_NORMAL,
        };

        let slot = u32::try_from(self.vertices.len()).map_err(|_| AssetError::TooManyVertices)?;
        self.vertices.push(MeshVertex::new(position, texcoord, normal));
        self.slots.insert(*corner, slot);
        Ok(slot)
    }

    fn extend_submesh(&mut self, material: Option<usize>) {
        let end = self.indices.len() as u32;
        if let Some(last) = self.submeshes.last_mut() {
            if last.material == material {
                last.indices.end = end;
                return;
            }
        }
        let start = self.submeshes.last().map_or(0, |s| s.indices.end);
        self.submeshes.push(SubMesh {
            material,
            indices: start..end,
        });
    }

    fn finish(self) -> MeshData {
        MeshData {
            vertices: self.vertices,
            indices: self.indices,
            submeshes: self.submeshes,
        }
    }
}

fn lookup<const N: usize>(
    values: &[[f32; N]],
    index: usize,
    attribute: AttributeKind,
    line: usize,
) -> AssetResult<[f32; N]> {
    values
        .get(index)
        .copied()
        .ok_or(AssetError::DanglingIndexReference {
            line,
            attribute,
            index: index as i64 + 1,
            len: values.len(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool_with_quad() -> AttributePool {
        AttributePool {
            positions: vec![
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [1.0, 1.0, 0.0],
                [0.0, 1.0, 0.0],
            ],
            texcoords: vec![[0.25, 0.75]],
            normals: vec![[0.0, 1.0, 0.0]],
        }
    }

    fn face(corners: &[(usize, Option<usize>, Option<usize>)], material: Option<usize>) -> Face {
        Face {
            corners: corners
                .iter()
                .map(|&(p, t, n)| FaceCorner::new(p, t, n))
                .collect(),
            line: 1,
            material,
        }
    }

    fn assert_mesh_invariants(mesh: &MeshData) {
        assert_eq!(mesh.indices.len() % 3, 0);
        assert!(mesh.indices.iter().all(|&i| (i as usize) < mesh.vertices.len()));
        let mut cursor = 0;
        for sub in &mesh.submeshes {
            assert_eq!(sub.indices.start, cursor);
            assert_eq!((sub.indices.end - sub.indices.start) % 3, 0);
            cursor = sub.indices.end;
        }
        assert_eq!(cursor as usize, mesh.indices.len());
    }

    #[test]
    fn no_faces_builds_empty_mesh() {
        let mesh = build_mesh(&pool_with_quad(), &[]).unwrap();
        assert!(mesh.vertices.is_empty());
        assert!(mesh.indices.is_empty());
        assert!(mesh.submeshes.is_empty());
    }

    #[test]
    fn quad_splits_along_first_diagonal() {
        let corners = [(0, None, None), (1, None, None), (2, None, None), (3, None, None)];
        let quad = face(&corners, None);
        let mesh = build_mesh(&pool_with_quad(), &[quad]).unwrap();
        assert_eq!(mesh.vertices.len(), 4);
        assert_eq!(mesh.indices, vec![0, 1, 2, 0, 2, 3]);
        assert_mesh_invariants(&mesh);
    }

    #[test]
    fn identical_triples_share_a_slot_across_faces() {
        let faces = [
            face(&[(0, Some(0), Some(0)), (1, None, None), (2, None, None)], None),
            face(&[(3, None, None), (2, None, None), (1, None, None)], None),
            face(&[(2, None, None), (3, None, None), (0, Some(0), Some(0))], None),
        ];
        let mesh = build_mesh(&pool_with_quad(), &faces).unwrap();
        assert_eq!(mesh.vertices.len(), 4);
        assert_eq!(mesh.indices, vec![0, 1, 2, 3, 2, 1, 2, 3, 0]);
        assert_mesh_invariants(&mesh);
    }

    #[test]
    fn same_position_with_different_attributes_is_distinct() {
        let faces = [face(&[(0, Some(0), None), (0, None, Some(0)), (0, None, None)], None)];
        let mesh = build_mesh(&pool_with_quad(), &faces).unwrap();
        assert_eq!(mesh.vertices.len(), 3);
        assert_eq!(mesh.vertices[0].texcoord, [0.25, 0.75]);
        assert_eq!(mesh.vertices[0].normal, DEFAULT_NORMAL);
        assert_eq!(mesh.vertices[1].texcoord, DEFAULT_TEXCOORD);
        assert_eq!(mesh.vertices[1].normal, [0.0, 1.0, 0.0]);
        assert_eq!(mesh.vertices[2].texcoord, DEFAULT_TEXCOORD);
        assert_eq!(mesh.vertices[2].normal, DEFAULT_NORMAL);
    }

    #[test]
    fn material_changes_split_submeshes() {
        let faces = [
            face(&[(0, None, None), (1, None, None), (2, None, None)], Some(0)),
            face(&[(0, None, None), (1, None, None), (2, None, None), (3, None, None)], Some(0)),
            face(&[(0, None, None), (2, None, None), (3, None, None)], Some(1)),
            face(&[(1, None, None), (2, None, None), (3, None, None)], Some(0)),
        ];
        let mesh = build_mesh(&pool_with_quad(), &faces).unwrap();
        assert_eq!(
            mesh.submeshes,
            vec![
                SubMesh { material: Some(0), indices: 0..9 },
                SubMesh { material: Some(1), indices: 9..12 },
                SubMesh { material: Some(0), indices: 12..15 },
            ]
        );
        assert_mesh_invariants(&mesh);
    }

    #[test]
    fn rejects_pentagon() {
        let five = face(
            &[(0, None, None), (1, None, None), (2, None, None), (3, None, None), (0, None, None)],
            None,
        );
        let err = build_mesh(&pool_with_quad(), &[five]).unwrap_err();
        assert!(matches!(err, AssetError::UnsupportedFaceArity { corners: 5, .. }));
    }

    #[test]
    fn rejects_hand_built_dangling_normal() {
        let bad = face(&[(0, None, Some(7)), (1, None, None), (2, None, None)], None);
        let err = build_mesh(&pool_with_quad(), &[bad]).unwrap_err();
        assert!(matches!(
            err,
            AssetError::DanglingIndexReference {
                attribute: AttributeKind::Normal,
                index: 8,
                len: 1,
                ..
            }
        ));
    }
}
