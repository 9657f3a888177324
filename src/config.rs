use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::warp::MeshParams;

pub const MASK_ENV: &str = "PANOWARP_MASK";
pub const THREADS_ENV: &str = "PANOWARP_THREADS";
pub const DEFAULT_JPEG_QUALITY: u8 = 90;
pub const DEFAULT_MASK_PATH: &str = "mask.jpg";

#[derive(Debug, Default, Serialize, Deserialize)]
/// Persisted settings for the panowarp tools.
pub struct AppConfig {
    pub jpeg_quality: Option<u8>,
    pub mask_path: Option<PathBuf>,
    pub threads: Option<usize>,
    pub mesh: Option<MeshParams>,
}

impl AppConfig {
    /// Returns the user config file path, if a config directory is available.
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("panowarp").join("config.toml"))
    }

    /// Loads config from disk, falling back to defaults on any error.
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };
        let Ok(contents) = std::fs::read_to_string(&path) else {
            return Self::default();
        };
        Self::parse(&contents)
    }

    fn parse(contents: &str) -> Self {
        toml::from_str(contents).unwrap_or_default()
    }

    pub fn jpeg_quality(&self) -> u8 {
        self.jpeg_quality.unwrap_or(DEFAULT_JPEG_QUALITY)
    }

    /// Mask path from the environment, then config, then the stock file name.
    pub fn mask_path(&self) -> PathBuf {
        resolve_mask_path(std::env::var(MASK_ENV).ok(), self.mask_path.as_ref())
    }

    /// Worker count from the environment, then config.
    pub fn threads(&self) -> Option<usize> {
        resolve_threads(std::env::var(THREADS_ENV).ok(), self.threads)
    }

    pub fn mesh_params(&self) -> MeshParams {
        self.mesh.clone().unwrap_or_default()
    }
}

fn resolve_mask_path(env: Option<String>, configured: Option<&PathBuf>) -> PathBuf {
    if let Some(raw) = env.filter(|v| !v.trim().is_empty()) {
        return PathBuf::from(raw);
    }
    configured
        .cloned()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_MASK_PATH))
}

fn resolve_threads(env: Option<String>, configured: Option<usize>) -> Option<usize> {
    env.and_then(|v| v.trim().parse::<usize>().ok())
        .or(configured)
        .filter(|&n| n > 0)
}
