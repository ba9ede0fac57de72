use glam::{Mat3, Mat4, Vec3};
use gltf::mesh::Mode;

/// Triangle soup flattened from every mesh node of a glTF scene, with node
/// transforms applied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Axis-aligned bounds as `(min, max)`.
    pub fn bounds(&self) -> Option<([f32; 3], [f32; 3])> {
        let mut points = self.positions.iter().map(|p| Vec3::from_array(*p));
        let first = points.next()?;
        let (min, max) = points.fold((first, first), |(min, max), p| (min.min(p), max.max(p)));
        Some((min.to_array(), max.to_array()))
    }
}

/// Decodes a glTF or GLB document whose buffers are embedded.
pub fn decode_gltf(bytes: &[u8]) -> Result<MeshData, String> {
    let (document, buffers, _images) = gltf::import_slice(bytes).map_err(|err| err.to_string())?;
    let scene = document
        .default_scene()
        .or_else(|| document.scenes().next())
        .ok_or_else(|| "document contains no scene".to_string())?;

    let mut mesh = MeshData::default();
    for node in scene.nodes() {
        collect_node(&node, Mat4::IDENTITY, &buffers, &mut mesh);
    }
    if mesh.indices.is_empty() {
        return Err("scene contains no triangle geometry".to_string());
    }
    Ok(mesh)
}

fn collect_node(
    node: &gltf::Node<'_>,
    parent: Mat4,
    buffers: &[gltf::buffer::Data],
    out: &mut MeshData,
) {
    let transform = parent * Mat4::from_cols_array_2d(&node.transform().matrix());
    if let Some(mesh) = node.mesh() {
        let normal_matrix = Mat3::from_mat4(transform).inverse().transpose();
        for primitive in mesh.primitives() {
            if primitive.mode() != Mode::Triangles {
                continue;
            }
            let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|data| &data.0[..]));
            let Some(positions) = reader.read_positions() else {
                continue;
            };
            let base = out.positions.len() as u32;
            let positions: Vec<[f32; 3]> = positions
                .map(|p| transform.transform_point3(Vec3::from_array(p)).to_array())
                .collect();
            let count = positions.len() as u32;
            let indices: Vec<u32> = match reader.read_indices() {
                Some(indices) => indices.into_u32().map(|index| base + index).collect(),
                None => (base..base + count).collect(),
            };
            let normals: Vec<[f32; 3]> = match reader.read_normals() {
                Some(normals) => normals
                    .map(|n| (normal_matrix * Vec3::from_array(n)).normalize_or_zero().to_array())
                    .collect(),
                None => face_normals(&positions, &indices, base),
            };
            if normals.len() != positions.len() {
                continue;
            }
            out.positions.extend(positions);
            out.normals.extend(normals);
            out.indices.extend(indices);
        }
    }
    for child in node.children() {
        collect_node(&child, transform, buffers, out);
    }
}

/// Area-weighted vertex normals accumulated from triangle faces.
fn face_normals(positions: &[[f32; 3]], indices: &[u32], base: u32) -> Vec<[f32; 3]> {
    let mut accum = vec![Vec3::ZERO; positions.len()];
    for triangle in indices.chunks_exact(3) {
        let local: Vec<usize> = triangle
            .iter()
            .map(|index| index.saturating_sub(base) as usize)
            .collect();
        if local.iter().any(|&index| index >= positions.len()) {
            continue;
        }
        let [a, b, c] = [local[0], local[1], local[2]].map(|i| Vec3::from_array(positions[i]));
        let normal = (b - a).cross(c - a);
        for &index in &local {
            accum[index] += normal;
        }
    }
    accum
        .into_iter()
        .map(|n| n.normalize_or_zero().to_array())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// One triangle in the XY plane, three f32 positions then three u16 indices.
    pub(crate) const TRIANGLE_GLTF: &str = r#"{
        "asset": { "version": "2.0" },
        "scene": 0,
        "scenes": [{ "nodes": [0] }],
        "nodes": [{ "mesh": 0, "translation": [0.0, 0.0, 1.0] }],
        "meshes": [{ "primitives": [{ "attributes": { "POSITION": 0 }, "indices": 1 }] }],
        "buffers": [{
            "byteLength": 44,
            "uri": "data:application/octet-stream;base64,AAAAAAAAAAAAAAAAAACAPwAAAAAAAAAAAAAAAAAAgD8AAAAAAAABAAIAAAA="
        }],
        "bufferViews": [
            { "buffer": 0, "byteOffset": 0, "byteLength": 36 },
            { "buffer": 0, "byteOffset": 36, "byteLength": 6 }
        ],
        "accessors": [
            {
                "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
                "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0]
            },
            { "bufferView": 1, "componentType": 5123, "count": 3, "type": "SCALAR" }
        ]
    }"#;

    #[test]
    fn decodes_embedded_triangle_with_transform() {
        let mesh = decode_gltf(TRIANGLE_GLTF.as_bytes()).unwrap();
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.triangle_count(), 1);
        assert_eq!(mesh.indices, vec![0, 1, 2]);
        assert_eq!(mesh.positions[1], [1.0, 0.0, 1.0]);
        // No normals in the file: generated from the face, pointing +Z.
        for normal in &mesh.normals {
            assert!((normal[2] - 1.0).abs() < 1e-6);
        }
        let (min, max) = mesh.bounds().unwrap();
        assert_eq!(min, [0.0, 0.0, 1.0]);
        assert_eq!(max, [1.0, 1.0, 1.0]);
    }

    #[test]
    fn rejects_garbage() {
        assert!(decode_gltf(b"not a gltf").is_err());
    }
}
