//! Thin asset I/O: OBJ meshes and RGBA textures.
//!
//! Loaders return CPU-side data (`MeshData`, `TextureData`); uploading is the
//! renderer's job. Procedural fallbacks live next to the loaders so callers can
//! keep running when files are missing.

mod obj;
mod texture;

pub use obj::{load_obj, parse_obj};
pub use texture::{gradient_sky, load_cube_faces, TextureData, CUBE_FACE_NAMES};
