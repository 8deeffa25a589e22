use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result};

use crate::scene::{MeshData, Vertex};

fn load_options() -> tobj::LoadOptions {
    tobj::LoadOptions {
        single_index: true,
        triangulate: true,
        ignore_points: true,
        ignore_lines: true,
        ..Default::default()
    }
}

/// Loads every model in an OBJ file into a single mesh, uniformly scaled.
///
/// Materials are ignored; textures are supplied separately.
pub fn load_obj(path: impl AsRef<Path>, scale: f32) -> Result<MeshData> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let mesh = parse_obj(&mut BufReader::new(file), scale)
        .with_context(|| format!("parse {}", path.display()))?;

    log::info!(
        "loaded {}: {} vertices, {} triangles",
        path.display(),
        mesh.vertices.len(),
        mesh.triangle_count()
    );
    Ok(mesh)
}

/// Parses OBJ text. Missing normals are generated, missing UVs default to 0,
/// and V is flipped so `(0, 0)` is the top-left of the image.
pub fn parse_obj(reader: &mut impl BufRead, scale: f32) -> Result<MeshData> {
    let (models, _materials) = tobj::load_obj_buf(reader, &load_options(), |_| {
        Err(tobj::LoadError::OpenFileFailed)
    })
    .context("read obj")?;

    let mut out = MeshData::default();

    for model in models {
        let m = &model.mesh;
        let count = m.positions.len() / 3;
        let has_normals = m.normals.len() == m.positions.len();
        let has_uvs = m.texcoords.len() / 2 == count;

        let vertices = (0..count)
            .map(|i| {
                let position = [m.positions[3 * i], m.positions[3 * i + 1], m.positions[3 * i + 2]];
                let normal = if has_normals {
                    [m.normals[3 * i], m.normals[3 * i + 1], m.normals[3 * i + 2]]
                } else {
                    [0.0, 1.0, 0.0]
                };
                let uv = if has_uvs {
                    [m.texcoords[2 * i], 1.0 - m.texcoords[2 * i + 1]]
                } else {
                    [0.0, 0.0]
                };
                Vertex::new(position, normal, uv)
            })
            .collect();

        let mut part = MeshData::new(vertices, m.indices.clone());
        part.validate()
            .with_context(|| format!("model '{}'", model.name))?;
        if !has_normals {
            log::debug!("model '{}' has no normals; generating", model.name);
            part.generate_normals();
        }

        let base = out.vertices.len() as u32;
        out.vertices.extend(part.vertices);
        out.indices.extend(part.indices.into_iter().map(|i| i + base));
    }

    if out.is_empty() {
        anyhow::bail!("obj contains no triangles");
    }

    out.scale(scale);
    out.compute_tangents();
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    const QUAD: &str = "\
o quad
v -1 0 -1
v 1 0 -1
v 1 0 1
v -1 0 1
vt 0 0
vt 1 0
vt 1 1
vt 0 1
f 1/1 4/4 3/3 2/2
";

    #[test]
    fn quad_is_triangulated_with_generated_normals() {
        let mesh = parse_obj(&mut QUAD.as_bytes(), 1.0).unwrap();
        assert_eq!(mesh.vertices.len(), 4);
        assert_eq!(mesh.indices.len(), 6);
        assert!(mesh.validate().is_ok());

        for v in &mesh.vertices {
            assert!((Vec3::from(v.normal) - Vec3::Y).length() < 1e-5);
        }
    }

    #[test]
    fn v_coordinate_is_flipped() {
        let mesh = parse_obj(&mut QUAD.as_bytes(), 1.0).unwrap();
        let first = mesh
            .vertices
            .iter()
            .find(|v| v.position == [-1.0, 0.0, -1.0])
            .unwrap();
        assert_eq!(first.uv, [0.0, 1.0]);
    }

    #[test]
    fn scale_is_applied() {
        let mesh = parse_obj(&mut QUAD.as_bytes(), 0.1).unwrap();
        let (lo, hi) = mesh.bounds().unwrap();
        assert!((lo - Vec3::new(-0.1, 0.0, -0.1)).length() < 1e-6);
        assert!((hi - Vec3::new(0.1, 0.0, 0.1)).length() < 1e-6);
    }

    #[test]
    fn empty_input_is_an_error() {
        assert!(parse_obj(&mut "# nothing\n".as_bytes(), 1.0).is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = load_obj("/definitely/not/here.obj", 1.0).unwrap_err();
        assert!(format!("{err:#}").contains("here.obj"));
    }
}
