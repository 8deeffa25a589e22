//! CPU-side 3D scene state.
//!
//! Everything here is plain data plus per-frame update logic; nothing touches
//! the GPU. Renderers read snapshots of this state (`CameraView`, lights,
//! transforms) and upload them as uniforms.
//!
//! Conventions:
//! - right-handed world space, +Y up
//! - clip-space depth in `[0, 1]` (wgpu)

mod camera;
mod lights;
mod mesh;
mod spin;

pub use camera::{CameraConfig, CameraView, FlyCamera};
pub use lights::{FadeDirection, Light, LightRig, LightRigConfig};
pub use mesh::{LineVertex, MeshData, Vertex, MAX_GRID_LINES};
pub use spin::ModelSpin;
