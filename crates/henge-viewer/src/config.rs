use std::path::PathBuf;

use henge_engine::coords::ColorRgba;

/// Environment variable overriding the asset directory.
pub const ASSETS_ENV: &str = "HENGE_ASSETS";

/// Where the viewer looks for its assets and how it presents them.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewerConfig {
    pub asset_dir: PathBuf,
    /// OBJ file, relative to `asset_dir`.
    pub model: String,
    pub model_scale: f32,
    pub diffuse: String,
    pub normal_map: String,
    /// Directory (relative to `asset_dir`) holding px/nx/py/ny/pz/nz images.
    pub skybox_dir: String,
    pub clear: ColorRgba,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            asset_dir: PathBuf::from("assets"),
            model: "StoneHenge.obj".to_string(),
            model_scale: 0.1,
            diffuse: "StoneHenge.png".to_string(),
            normal_map: "StoneHenge_NM.png".to_string(),
            skybox_dir: "skybox".to_string(),
            clear: ColorRgba::rgb(0.2, 0.2, 0.4),
        }
    }
}

impl ViewerConfig {
    /// Defaults, then `HENGE_ASSETS`, then positional args `[ASSET_DIR] [MODEL]`.
    pub fn from_env_and_args<I>(env_assets: Option<String>, args: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mut cfg = Self::default();

        if let Some(dir) = env_assets.filter(|d| !d.is_empty()) {
            cfg.asset_dir = PathBuf::from(dir);
        }

        let mut args = args.into_iter();
        if let Some(dir) = args.next() {
            cfg.asset_dir = PathBuf::from(dir);
        }
        if let Some(model) = args.next() {
            cfg.model = model;
        }
        for extra in args {
            log::warn!("ignoring extra argument '{extra}'");
        }

        cfg
    }

    /// Reads the process environment and command line.
    pub fn load() -> Self {
        Self::from_env_and_args(std::env::var(ASSETS_ENV).ok(), std::env::args().skip(1))
    }

    pub fn model_path(&self) -> PathBuf {
        self.asset_dir.join(&self.model)
    }

    pub fn diffuse_path(&self) -> PathBuf {
        self.asset_dir.join(&self.diffuse)
    }

    pub fn normal_map_path(&self) -> PathBuf {
        self.asset_dir.join(&self.normal_map)
    }

    pub fn skybox_path(&self) -> PathBuf {
        self.asset_dir.join(&self.skybox_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn defaults_point_at_the_stonehenge_assets() {
        let cfg = ViewerConfig::from_env_and_args(None, args(&[]));
        assert_eq!(cfg, ViewerConfig::default());
        assert_eq!(cfg.model_path(), PathBuf::from("assets/StoneHenge.obj"));
        assert_eq!(cfg.model_scale, 0.1);
        assert_eq!(cfg.clear, ColorRgba::rgb(0.2, 0.2, 0.4));
    }

    #[test]
    fn env_overrides_default_dir() {
        let cfg = ViewerConfig::from_env_and_args(Some("/data/henge".into()), args(&[]));
        assert_eq!(cfg.skybox_path(), PathBuf::from("/data/henge/skybox"));
    }

    #[test]
    fn empty_env_is_ignored() {
        let cfg = ViewerConfig::from_env_and_args(Some(String::new()), args(&[]));
        assert_eq!(cfg.asset_dir, PathBuf::from("assets"));
    }

    #[test]
    fn args_override_env() {
        let cfg = ViewerConfig::from_env_and_args(
            Some("/from/env".into()),
            args(&["/from/args", "teapot.obj"]),
        );
        assert_eq!(cfg.asset_dir, PathBuf::from("/from/args"));
        assert_eq!(cfg.model_path(), PathBuf::from("/from/args/teapot.obj"));
        assert_eq!(cfg.diffuse_path(), PathBuf::from("/from/args/StoneHenge.png"));
    }
}
