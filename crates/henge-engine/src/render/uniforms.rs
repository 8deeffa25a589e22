use std::marker::PhantomData;
use std::num::NonZeroU64;

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3, Vec4};

use crate::scene::{CameraView, LightRig};

/// Per-pass data shared by every draw (bind group 0).
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub struct SceneUniform {
    pub view: [[f32; 4]; 4],
    pub proj: [[f32; 4]; 4],
    pub eye: [f32; 4],
    /// Unit directions toward each light; w unused.
    pub light_dir: [[f32; 4]; 2],
    /// rgb colour; w unused.
    pub light_color: [[f32; 4]; 2],
    /// World position of the point light; w = falloff range.
    pub point_pos: [f32; 4],
    /// x = elapsed seconds, y = pulse phase in [0, 1).
    pub time: [f32; 4],
}

impl SceneUniform {
    pub fn new(camera: &CameraView, lights: &LightRig, elapsed: f32, pulse: f32) -> Self {
        let d = lights.directional;
        let p = lights.point;
        let range = lights.config().orbit_radius * 2.0;

        Self {
            view: camera.view.to_cols_array_2d(),
            proj: camera.proj.to_cols_array_2d(),
            eye: camera.eye.extend(1.0).to_array(),
            light_dir: [
                d.direction.normalize_or_zero().extend(0.0).to_array(),
                p.direction.normalize_or_zero().extend(0.0).to_array(),
            ],
            light_color: [d.color.extend(1.0).to_array(), p.color.extend(1.0).to_array()],
            point_pos: lights.point_position().extend(range).to_array(),
            time: [elapsed, pulse, 0.0, 0.0],
        }
    }
}

/// Per-draw data (bind group 1).
#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub struct ObjectUniform {
    pub world: [[f32; 4]; 4],
    /// Inverse-transpose of `world`, for normals under non-uniform scale.
    pub normal_matrix: [[f32; 4]; 4],
    pub tint: [f32; 4],
    /// Shader-specific knobs (wave amplitude/frequency, etc.).
    pub params: [f32; 4],
}

impl ObjectUniform {
    pub fn new(world: Mat4, tint: Vec3) -> Self {
        Self {
            world: world.to_cols_array_2d(),
            normal_matrix: world.inverse().transpose().to_cols_array_2d(),
            tint: tint.extend(1.0).to_array(),
            params: [0.0; 4],
        }
    }

    pub fn with_params(mut self, params: Vec4) -> Self {
        self.params = params.to_array();
        self
    }
}

/// Rounds `value` up to a multiple of `alignment` (which must be a power of two).
#[inline]
pub fn align_to(value: u64, alignment: u64) -> u64 {
    debug_assert!(alignment.is_power_of_two());
    (value + alignment - 1) & !(alignment - 1)
}

/// Growable uniform buffer addressed by dynamic offsets.
///
/// Each frame: `clear`, `push` one value per draw (returns its dynamic offset),
/// then `upload` once before the passes that reference it are submitted. Every
/// pushed slot stays valid until the next `clear`, so draws recorded into
/// several passes of one encoder never alias.
pub struct UniformArena<T: Pod> {
    label: &'static str,
    stride: u64,
    staging: Vec<u8>,
    buffer: Option<wgpu::Buffer>,
    capacity: usize,
    generation: u64,
    _marker: PhantomData<T>,
}

impl<T: Pod> UniformArena<T> {
    pub fn new(label: &'static str, alignment: u64) -> Self {
        Self {
            label,
            stride: align_to(std::mem::size_of::<T>() as u64, alignment.max(1)),
            staging: Vec::new(),
            buffer: None,
            capacity: 0,
            generation: 0,
            _marker: PhantomData,
        }
    }

    pub fn stride(&self) -> u64 {
        self.stride
    }

    pub fn len(&self) -> usize {
        self.staging.len() / self.stride as usize
    }

    pub fn is_empty(&self) -> bool {
        self.staging.is_empty()
    }

    /// Bumped whenever the GPU buffer is recreated; bind groups must follow.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn clear(&mut self) {
        self.staging.clear();
    }

    /// Appends `value` and returns its dynamic offset.
    pub fn push(&mut self, value: &T) -> u32 {
        let offset = self.staging.len();
        self.staging.extend_from_slice(bytemuck::bytes_of(value));
        self.staging.resize(offset + self.stride as usize, 0);
        offset as u32
    }

    /// Binding size for the bind group entry (one element).
    pub fn binding_size() -> Option<NonZeroU64> {
        NonZeroU64::new(std::mem::size_of::<T>() as u64)
    }

    pub fn buffer(&self) -> Option<&wgpu::Buffer> {
        self.buffer.as_ref()
    }

    /// Makes sure the GPU buffer holds at least `min_slots` slots.
    pub fn reserve(&mut self, device: &wgpu::Device, min_slots: usize) {
        if self.buffer.is_some() && min_slots <= self.capacity {
            return;
        }

        let new_cap = min_slots.next_power_of_two().max(16);
        self.buffer = Some(device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(self.label),
            size: new_cap as u64 * self.stride,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        }));
        self.capacity = new_cap;
        self.generation += 1;
        log::debug!("{}: capacity {} slots", self.label, new_cap);
    }

    /// Writes all pushed slots to the GPU buffer.
    pub fn upload(&mut self, device: &wgpu::Device, queue: &wgpu::Queue) {
        self.reserve(device, self.len().max(1));
        if self.staging.is_empty() {
            return;
        }
        if let Some(buffer) = self.buffer.as_ref() {
            queue.write_buffer(buffer, 0, &self.staging);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn align_rounds_up_to_power_of_two() {
        assert_eq!(align_to(0, 256), 0);
        assert_eq!(align_to(1, 256), 256);
        assert_eq!(align_to(240, 256), 256);
        assert_eq!(align_to(256, 256), 256);
        assert_eq!(align_to(257, 256), 512);
        assert_eq!(align_to(160, 64), 192);
    }

    #[test]
    fn uniform_sizes_are_16_byte_multiples() {
        assert_eq!(std::mem::size_of::<SceneUniform>() % 16, 0);
        assert_eq!(std::mem::size_of::<ObjectUniform>() % 16, 0);
        assert_eq!(std::mem::size_of::<SceneUniform>(), 240);
        assert_eq!(std::mem::size_of::<ObjectUniform>(), 160);
    }

    #[test]
    fn arena_offsets_follow_the_stride() {
        let mut arena = UniformArena::<ObjectUniform>::new("test arena", 256);
        assert_eq!(arena.stride(), 256);

        let u = ObjectUniform::new(Mat4::IDENTITY, Vec3::ONE);
        assert_eq!(arena.push(&u), 0);
        assert_eq!(arena.push(&u), 256);
        assert_eq!(arena.push(&u), 512);
        assert_eq!(arena.len(), 3);

        arena.clear();
        assert!(arena.is_empty());
        assert_eq!(arena.push(&u), 0);
    }

    #[test]
    fn arena_slot_holds_the_pushed_bytes() {
        let mut arena = UniformArena::<ObjectUniform>::new("test arena", 64);
        let a = ObjectUniform::new(Mat4::IDENTITY, Vec3::X);
        let b = ObjectUniform::new(Mat4::from_scale(Vec3::splat(2.0)), Vec3::Y);
        arena.push(&a);
        let off = arena.push(&b) as usize;

        let size = std::mem::size_of::<ObjectUniform>();
        assert_eq!(&arena.staging[off..off + size], bytemuck::bytes_of(&b));
    }

    #[test]
    fn normal_matrix_undoes_scale() {
        let u = ObjectUniform::new(Mat4::from_scale(Vec3::new(2.0, 1.0, 1.0)), Vec3::ONE);
        let n = Mat4::from_cols_array_2d(&u.normal_matrix);
        assert!((n.x_axis.x - 0.5).abs() < 1e-6);
    }

    #[test]
    fn scene_uniform_packs_lights() {
        let rig = LightRig::default();
        let cam = CameraView::look_at(Vec3::new(0.0, 1.0, -5.0), Vec3::Y, 1.0, 1.0, 0.1, 10.0);
        let u = SceneUniform::new(&cam, &rig, 2.0, 0.25);

        assert_eq!(u.time[..2], [2.0, 0.25]);
        assert_eq!(u.eye, [0.0, 1.0, -5.0, 1.0]);
        assert_eq!(u.light_color[1], [0.7, 0.2, 0.2, 1.0]);
        let d = Vec3::from_slice(&u.light_dir[0][..3]);
        assert!((d.length() - 1.0).abs() < 1e-5);
        assert_eq!(u.point_pos[3], 10.0);
    }
}
