//! Screen-space types shared by the runtime and renderers.
//!
//! Canonical space for viewports:
//! - physical pixels
//! - origin top-left
//! - +X right, +Y down

mod color;
mod viewport;

pub use color::ColorRgba;
pub use viewport::{Viewport, ViewportRect};
