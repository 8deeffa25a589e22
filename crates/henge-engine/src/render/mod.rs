//! GPU rendering subsystem.
//!
//! Renderers consume `scene` state snapshots and issue GPU commands via wgpu.
//! Each renderer is responsible for its own GPU resources (pipelines, buffers,
//! bind groups) and creates them lazily on first use.
//!
//! Convention:
//! - right-handed world space, depth in `[0, 1]`
//! - bind group 0 = per-pass scene uniform, 1 = per-draw object uniform,
//!   2 = material (textures + sampler)

mod ctx;
mod mesh;
mod scene;
mod texture;
mod uniforms;

pub use ctx::{RenderCtx, RenderTarget};
pub use mesh::{GpuLines, GpuMesh};
pub use scene::{SceneAssets, SceneFrame, SceneLayout, SceneRenderer};
pub use texture::{
    linear_sampler, GpuTexture, OffscreenTarget, COLOR_TEXTURE_FORMAT, DATA_TEXTURE_FORMAT,
};
pub use uniforms::{align_to, ObjectUniform, SceneUniform, UniformArena};
