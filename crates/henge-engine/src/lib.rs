//! Henge engine crate.
//!
//! Platform + GPU runtime pieces, 3D scene state and the wgpu renderers used by
//! the viewer.

pub mod device;
pub mod window;
pub mod input;
pub mod time;
pub mod core;

pub mod logging;
pub mod coords;
pub mod scene;
pub mod assets;
pub mod render;
