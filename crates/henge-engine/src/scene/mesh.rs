use anyhow::{bail, Result};
use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3};

/// Lit mesh vertex. `tangent.w` carries the bitangent handedness (±1).
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
    pub tangent: [f32; 4],
}

impl Vertex {
    pub fn new(position: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> Self {
        Self {
            position,
            normal,
            uv,
            tangent: [1.0, 0.0, 0.0, 1.0],
        }
    }
}

/// Upper bound on grid lines per side of the origin.
pub const MAX_GRID_LINES: u32 = 1024;

/// Unlit coloured line vertex (grid, axes).
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct LineVertex {
    pub position: [f32; 3],
    pub color: [f32; 3],
}

/// Indexed triangle list in CPU memory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

// Cube faces as (normal, 4 corners). Corner order matches CUBE_INDICES.
const CUBE_FACES: [([f32; 3], [[f32; 3]; 4]); 6] = [
    (
        [0.0, 1.0, 0.0],
        [[-1.0, 1.0, -1.0], [1.0, 1.0, -1.0], [1.0, 1.0, 1.0], [-1.0, 1.0, 1.0]],
    ),
    (
        [0.0, -1.0, 0.0],
        [[-1.0, -1.0, -1.0], [1.0, -1.0, -1.0], [1.0, -1.0, 1.0], [-1.0, -1.0, 1.0]],
    ),
    (
        [-1.0, 0.0, 0.0],
        [[-1.0, -1.0, 1.0], [-1.0, -1.0, -1.0], [-1.0, 1.0, -1.0], [-1.0, 1.0, 1.0]],
    ),
    (
        [1.0, 0.0, 0.0],
        [[1.0, -1.0, 1.0], [1.0, -1.0, -1.0], [1.0, 1.0, -1.0], [1.0, 1.0, 1.0]],
    ),
    (
        [0.0, 0.0, -1.0],
        [[-1.0, -1.0, -1.0], [1.0, -1.0, -1.0], [1.0, 1.0, -1.0], [-1.0, 1.0, -1.0]],
    ),
    (
        [0.0, 0.0, 1.0],
        [[-1.0, -1.0, 1.0], [1.0, -1.0, 1.0], [1.0, 1.0, 1.0], [-1.0, 1.0, 1.0]],
    ),
];

const CUBE_UVS: [[f32; 2]; 4] = [[0.0, 1.0], [1.0, 1.0], [1.0, 0.0], [0.0, 0.0]];

#[rustfmt::skip]
const CUBE_INDICES: [u32; 36] = [
    3, 1, 0,    2, 1, 3,
    6, 4, 5,    7, 4, 6,
    11, 9, 8,   10, 9, 11,
    14, 12, 13, 15, 12, 14,
    19, 17, 16, 18, 17, 19,
    22, 20, 21, 23, 20, 22,
];

impl MeshData {
    pub fn new(vertices: Vec<Vertex>, indices: Vec<u32>) -> Self {
        Self { vertices, indices }
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Unit cube spanning `[-1, 1]³` with per-face normals and UVs (24 vertices).
    pub fn cube() -> Self {
        let mut vertices = Vec::with_capacity(24);
        for (normal, corners) in CUBE_FACES {
            for (pos, uv) in corners.into_iter().zip(CUBE_UVS) {
                vertices.push(Vertex::new(pos, normal, uv));
            }
        }

        let mut mesh = Self::new(vertices, CUBE_INDICES.to_vec());
        mesh.compute_tangents();
        mesh
    }

    /// Single triangle in the `z = 0.5` plane facing -Z.
    pub fn triangle() -> Self {
        let n = [0.0, 0.0, -1.0];
        let vertices = vec![
            Vertex::new([0.0, 1.0, 0.5], n, [0.5, 0.0]),
            Vertex::new([1.0, -1.0, 0.5], n, [1.0, 1.0]),
            Vertex::new([-1.0, -1.0, 0.5], n, [0.0, 1.0]),
        ];
        let mut mesh = Self::new(vertices, vec![0, 1, 2]);
        mesh.compute_tangents();
        mesh
    }

    /// Flat XZ plane of side `size` centred at the origin, split into
    /// `subdivisions²` quads. Used as the wave surface.
    pub fn plane(size: f32, subdivisions: u32) -> Self {
        let n = subdivisions.max(1);
        let row = n + 1;
        let half = size * 0.5;

        let mut vertices = Vec::with_capacity((row * row) as usize);
        for j in 0..row {
            for i in 0..row {
                let u = i as f32 / n as f32;
                let v = j as f32 / n as f32;
                let mut vx = Vertex::new(
                    [-half + u * size, 0.0, -half + v * size],
                    [0.0, 1.0, 0.0],
                    [u, v],
                );
                vx.tangent = [1.0, 0.0, 0.0, 1.0];
                vertices.push(vx);
            }
        }

        let mut indices = Vec::with_capacity((n * n * 6) as usize);
        for j in 0..n {
            for i in 0..n {
                let a = j * row + i;
                let b = a + 1;
                let c = a + row;
                let d = c + 1;
                indices.extend_from_slice(&[a, c, b, b, c, d]);
            }
        }

        Self::new(vertices, indices)
    }

    /// XZ line grid from `-half` to `half` every `step` units.
    ///
    /// The two lines through the origin are tinted: red along X, blue along Z.
    /// At most `MAX_GRID_LINES` lines are laid out on each side of the origin.
    pub fn grid_lines(half: f32, step: f32) -> Vec<LineVertex> {
        if !(half > 0.0 && step > 0.0) {
            return Vec::new();
        }

        let k = (half / step).floor().min(MAX_GRID_LINES as f32) as i32;
        let extent = k as f32 * step;
        let grey = [0.45, 0.45, 0.5];
        let lines = (k as usize).saturating_mul(2).saturating_add(1);
        let mut out = Vec::with_capacity(lines.saturating_mul(4));

        for i in -k..=k {
            let o = i as f32 * step;
            let (x_color, z_color) = if i == 0 {
                ([0.8, 0.2, 0.2], [0.2, 0.3, 0.8])
            } else {
                (grey, grey)
            };
            // Line parallel to X at z = o.
            out.push(LineVertex { position: [-extent, 0.0, o], color: x_color });
            out.push(LineVertex { position: [extent, 0.0, o], color: x_color });
            // Line parallel to Z at x = o.
            out.push(LineVertex { position: [o, 0.0, -extent], color: z_color });
            out.push(LineVertex { position: [o, 0.0, extent], color: z_color });
        }
        out
    }

    /// Checks that indices form whole triangles and stay in range.
    pub fn validate(&self) -> Result<()> {
        if self.indices.len() % 3 != 0 {
            bail!("index count {} is not a multiple of 3", self.indices.len());
        }
        let n = self.vertices.len();
        if let Some(bad) = self.indices.iter().find(|&&i| i as usize >= n) {
            bail!("index {bad} out of range for {n} vertices");
        }
        Ok(())
    }

    /// Uniform scale of all positions.
    pub fn scale(&mut self, factor: f32) {
        for v in &mut self.vertices {
            v.position = (Vec3::from(v.position) * factor).into();
        }
    }

    /// Axis-aligned bounds, or `None` for an empty mesh.
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        let mut it = self.vertices.iter().map(|v| Vec3::from(v.position));
        let first = it.next()?;
        Some(it.fold((first, first), |(lo, hi), p| (lo.min(p), hi.max(p))))
    }

    /// Replaces normals with area-weighted face normals.
    pub fn generate_normals(&mut self) {
        let mut acc = vec![Vec3::ZERO; self.vertices.len()];

        for tri in self.indices.chunks_exact(3) {
            let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
            if a >= acc.len() || b >= acc.len() || c >= acc.len() {
                continue;
            }
            let p0 = Vec3::from(self.vertices[a].position);
            let p1 = Vec3::from(self.vertices[b].position);
            let p2 = Vec3::from(self.vertices[c].position);
            // Unnormalized cross product weights by triangle area.
            let n = (p1 - p0).cross(p2 - p0);
            acc[a] += n;
            acc[b] += n;
            acc[c] += n;
        }

        for (v, n) in self.vertices.iter_mut().zip(acc) {
            v.normal = n.try_normalize().unwrap_or(Vec3::Y).into();
        }
    }

    /// Per-vertex tangents from UV derivatives, orthogonalized against the normal.
    pub fn compute_tangents(&mut self) {
        let count = self.vertices.len();
        let mut tan = vec![Vec3::ZERO; count];
        let mut bitan = vec![Vec3::ZERO; count];

        for tri in self.indices.chunks_exact(3) {
            let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
            if a >= count || b >= count || c >= count {
                continue;
            }
            let (va, vb, vc) = (&self.vertices[a], &self.vertices[b], &self.vertices[c]);

            let e1 = Vec3::from(vb.position) - Vec3::from(va.position);
            let e2 = Vec3::from(vc.position) - Vec3::from(va.position);
            let d1 = Vec2::from(vb.uv) - Vec2::from(va.uv);
            let d2 = Vec2::from(vc.uv) - Vec2::from(va.uv);

            let det = d1.x * d2.y - d2.x * d1.y;
            if det.abs() < 1e-12 {
                continue;
            }
            let r = 1.0 / det;
            let t = (e1 * d2.y - e2 * d1.y) * r;
            let bt = (e2 * d1.x - e1 * d2.x) * r;

            for i in [a, b, c] {
                tan[i] += t;
                bitan[i] += bt;
            }
        }

        for (i, v) in self.vertices.iter_mut().enumerate() {
            let n = Vec3::from(v.normal);
            let t = (tan[i] - n * n.dot(tan[i]))
                .try_normalize()
                .unwrap_or_else(|| n.any_orthonormal_vector());
            let w = if n.cross(t).dot(bitan[i]) < 0.0 { -1.0 } else { 1.0 };
            v.tangent = [t.x, t.y, t.z, w];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cube_has_24_vertices_and_12_triangles() {
        let cube = MeshData::cube();
        assert_eq!(cube.vertices.len(), 24);
        assert_eq!(cube.indices.len(), 36);
        assert!(cube.validate().is_ok());
    }

    #[test]
    fn cube_faces_are_flat_and_on_the_unit_box() {
        let cube = MeshData::cube();
        for v in &cube.vertices {
            let p = Vec3::from(v.position);
            let n = Vec3::from(v.normal);
            // A face vertex lies on the plane its normal points at.
            assert_eq!(p.dot(n), 1.0);
            assert_eq!(p.abs().max_element(), 1.0);
        }
    }

    #[test]
    fn tangents_are_unit_and_orthogonal_to_normals() {
        let cube = MeshData::cube();
        for v in &cube.vertices {
            let n = Vec3::from(v.normal);
            let t = Vec3::new(v.tangent[0], v.tangent[1], v.tangent[2]);
            assert!((t.length() - 1.0).abs() < 1e-5);
            assert!(n.dot(t).abs() < 1e-5);
            assert!(v.tangent[3] == 1.0 || v.tangent[3] == -1.0);
        }
    }

    #[test]
    fn plane_tangent_follows_u() {
        let mut plane = MeshData::plane(2.0, 1);
        plane.compute_tangents();
        for v in &plane.vertices {
            assert!((Vec3::from_slice(&v.tangent[..3]) - Vec3::X).length() < 1e-5);
        }
    }

    #[test]
    fn plane_vertex_and_index_counts() {
        let plane = MeshData::plane(10.0, 4);
        assert_eq!(plane.vertices.len(), 25);
        assert_eq!(plane.indices.len(), 4 * 4 * 6);
        assert!(plane.validate().is_ok());

        let (lo, hi) = plane.bounds().unwrap();
        assert_eq!(lo, Vec3::new(-5.0, 0.0, -5.0));
        assert_eq!(hi, Vec3::new(5.0, 0.0, 5.0));
    }

    #[test]
    fn validate_rejects_bad_indices() {
        let mut tri = MeshData::triangle();
        tri.indices.push(0);
        assert!(tri.validate().is_err());

        let mut tri = MeshData::triangle();
        tri.indices[2] = 3;
        assert!(tri.validate().is_err());
    }

    #[test]
    fn generated_normals_face_out_of_winding() {
        let mut tri = MeshData::triangle();
        tri.generate_normals();
        // (1,-1) - (0,1) x (-1,-1) - (0,1) points along -Z.
        for v in &tri.vertices {
            assert_eq!(Vec3::from(v.normal), Vec3::NEG_Z);
        }
    }

    #[test]
    fn scale_moves_bounds() {
        let mut cube = MeshData::cube();
        cube.scale(0.1);
        let (lo, hi) = cube.bounds().unwrap();
        assert!((lo - Vec3::splat(-0.1)).length() < 1e-6);
        assert!((hi - Vec3::splat(0.1)).length() < 1e-6);
    }

    #[test]
    fn grid_has_two_lines_per_step() {
        let lines = MeshData::grid_lines(10.0, 1.0);
        assert_eq!(lines.len(), 21 * 4);
        assert!(lines.iter().all(|v| v.position[1] == 0.0));
        assert!(MeshData::grid_lines(0.0, 1.0).is_empty());
    }

    #[test]
    fn tiny_grid_step_is_capped() {
        let lines = MeshData::grid_lines(10.0, 1e-8);
        assert_eq!(lines.len(), (2 * MAX_GRID_LINES as usize + 1) * 4);
        assert!(lines.iter().all(|v| v.position.iter().all(|c| c.abs() <= 10.0)));
    }
}
