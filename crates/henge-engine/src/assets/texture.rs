use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use glam::Vec3;

/// Cube map face file stems in GPU layer order (+X, -X, +Y, -Y, +Z, -Z).
pub const CUBE_FACE_NAMES: [&str; 6] = ["px", "nx", "py", "ny", "pz", "nz"];

const FACE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Tightly packed RGBA8 image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureData {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl TextureData {
    pub fn new(width: u32, height: u32, rgba: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * 4;
        if width == 0 || height == 0 {
            bail!("texture has zero size ({width}x{height})");
        }
        if rgba.len() != expected {
            bail!("texture data is {} bytes, expected {expected}", rgba.len());
        }
        Ok(Self { width, height, rgba })
    }

    /// Decodes a PNG or JPEG file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let img = image::open(path).with_context(|| format!("decode {}", path.display()))?;
        let tex = Self::from_image(img);
        log::debug!("loaded {} ({}x{})", path.display(), tex.width, tex.height);
        Ok(tex)
    }

    pub fn from_image(img: image::DynamicImage) -> Self {
        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();
        Self {
            width,
            height,
            rgba: rgba.into_raw(),
        }
    }

    /// 1x1 texture of a single colour.
    pub fn solid(rgba: [u8; 4]) -> Self {
        Self {
            width: 1,
            height: 1,
            rgba: rgba.to_vec(),
        }
    }

    /// Tangent-space "straight up" normal map texel.
    pub fn flat_normal() -> Self {
        Self::solid([128, 128, 255, 255])
    }

    /// `size`x`size` two-tone checkerboard with `cells` squares per side.
    pub fn checkerboard(size: u32, cells: u32) -> Self {
        let size = size.max(1);
        let cell = (size / cells.max(1)).max(1);
        let light = [200, 200, 200, 255];
        let dark = [90, 90, 110, 255];

        let mut rgba = Vec::with_capacity((size * size * 4) as usize);
        for y in 0..size {
            for x in 0..size {
                let c = if ((x / cell) + (y / cell)) % 2 == 0 { light } else { dark };
                rgba.extend_from_slice(&c);
            }
        }
        Self {
            width: size,
            height: size,
            rgba,
        }
    }

    pub fn is_square(&self) -> bool {
        self.width == self.height
    }

    pub fn texel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = ((y * self.width + x) * 4) as usize;
        self.rgba.get(i..i + 4).and_then(|s| s.try_into().ok())
    }
}

fn find_face(dir: &Path, stem: &str) -> Option<PathBuf> {
    FACE_EXTENSIONS
        .iter()
        .map(|ext| dir.join(format!("{stem}.{ext}")))
        .find(|p| p.is_file())
}

/// Loads six cube map faces named `px`, `nx`, `py`, `ny`, `pz`, `nz` from `dir`.
///
/// Returns `Ok(None)` when any face is missing so the caller can fall back to a
/// procedural sky. Faces must be square and share one size.
pub fn load_cube_faces(dir: impl AsRef<Path>) -> Result<Option<[TextureData; 6]>> {
    let dir = dir.as_ref();

    let mut paths = Vec::with_capacity(6);
    for stem in CUBE_FACE_NAMES {
        match find_face(dir, stem) {
            Some(p) => paths.push(p),
            None => {
                log::debug!("skybox face '{stem}' not found in {}", dir.display());
                return Ok(None);
            }
        }
    }

    let faces = paths
        .iter()
        .map(TextureData::load)
        .collect::<Result<Vec<_>>>()?;

    let size = faces[0].width;
    for (face, stem) in faces.iter().zip(CUBE_FACE_NAMES) {
        if !face.is_square() || face.width != size {
            bail!(
                "skybox face '{stem}' is {}x{}, expected {size}x{size}",
                face.width,
                face.height
            );
        }
    }

    let faces: [TextureData; 6] = faces
        .try_into()
        .map_err(|_| anyhow::anyhow!("expected six skybox faces"))?;
    Ok(Some(faces))
}

/// Direction through texel `(u, v)` (both in `[-1, 1]`) of cube face `face`.
fn face_direction(face: usize, u: f32, v: f32) -> Vec3 {
    match face {
        0 => Vec3::new(1.0, -v, -u),
        1 => Vec3::new(-1.0, -v, u),
        2 => Vec3::new(u, 1.0, v),
        3 => Vec3::new(u, -1.0, -v),
        4 => Vec3::new(u, -v, 1.0),
        _ => Vec3::new(-u, -v, -1.0),
    }
    .normalize()
}

/// Procedural sky: dark ground, pale horizon, deep blue zenith.
pub fn gradient_sky(size: u32) -> [TextureData; 6] {
    let size = size.max(1);
    let ground = Vec3::new(0.12, 0.11, 0.10);
    let horizon = Vec3::new(0.75, 0.78, 0.85);
    let zenith = Vec3::new(0.18, 0.32, 0.65);

    std::array::from_fn(|face| {
        let mut rgba = Vec::with_capacity((size * size * 4) as usize);
        for y in 0..size {
            for x in 0..size {
                let u = (x as f32 + 0.5) / size as f32 * 2.0 - 1.0;
                let v = (y as f32 + 0.5) / size as f32 * 2.0 - 1.0;
                let h = face_direction(face, u, v).y;
                let c = if h >= 0.0 {
                    horizon.lerp(zenith, h.sqrt())
                } else {
                    horizon.lerp(ground, (-h * 4.0).min(1.0))
                };
                let c = (c * 255.0).round();
                rgba.extend_from_slice(&[c.x as u8, c.y as u8, c.z as u8, 255]);
            }
        }
        TextureData {
            width: size,
            height: size,
            rgba,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_checks_length() {
        assert!(TextureData::new(2, 2, vec![0; 16]).is_ok());
        assert!(TextureData::new(2, 2, vec![0; 15]).is_err());
        assert!(TextureData::new(0, 2, vec![]).is_err());
    }

    #[test]
    fn checkerboard_alternates() {
        let tex = TextureData::checkerboard(8, 2);
        assert_eq!(tex.rgba.len(), 8 * 8 * 4);
        assert_eq!(tex.texel(0, 0), tex.texel(3, 3));
        assert_ne!(tex.texel(0, 0), tex.texel(4, 0));
        assert_eq!(tex.texel(0, 0), tex.texel(4, 4));
        assert_eq!(tex.texel(8, 0), None);
    }

    #[test]
    fn from_image_expands_to_rgba() {
        let img = image::RgbImage::from_pixel(3, 2, image::Rgb([10, 20, 30]));
        let tex = TextureData::from_image(image::DynamicImage::ImageRgb8(img));
        assert_eq!((tex.width, tex.height), (3, 2));
        assert_eq!(tex.texel(2, 1), Some([10, 20, 30, 255]));
    }

    #[test]
    fn flat_normal_points_up_in_tangent_space() {
        assert_eq!(TextureData::flat_normal().texel(0, 0), Some([128, 128, 255, 255]));
    }

    #[test]
    fn gradient_sky_is_brighter_up_than_down() {
        let faces = gradient_sky(4);
        let top = faces[2].texel(1, 1).unwrap();
        let bottom = faces[3].texel(1, 1).unwrap();
        assert_eq!(faces.len(), 6);
        assert!(faces.iter().all(|f| f.is_square() && f.width == 4));
        assert!(top[2] > bottom[2]);
    }

    #[test]
    fn face_directions_point_at_their_face() {
        let expect = [Vec3::X, Vec3::NEG_X, Vec3::Y, Vec3::NEG_Y, Vec3::Z, Vec3::NEG_Z];
        for (face, axis) in expect.into_iter().enumerate() {
            assert!(face_direction(face, 0.0, 0.0).dot(axis) > 0.999);
        }
    }

    #[test]
    fn missing_cube_faces_yield_none() {
        let dir = std::env::temp_dir().join("henge-no-skybox-here");
        assert!(load_cube_faces(&dir).unwrap().is_none());
    }
}
