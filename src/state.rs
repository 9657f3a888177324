use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
/// Serialized adjustment recipe stored alongside an image.
pub struct Adjustments {
    pub brightness: i32,
    pub contrast: f32,
    pub saturation: f32,
    pub temperature: i32,
    pub grayscale: bool,
    pub blur_radius: i32,
    pub invert: bool,
}

impl Default for Adjustments {
    fn default() -> Self {
        Self {
            brightness: 0,
            contrast: 1.0,
            saturation: 1.0,
            temperature: 0,
            grayscale: false,
            blur_radius: 0,
            invert: false,
        }
    }
}

impl Adjustments {
    /// Loads the recipe from the image sidecar JSON, if present and valid.
    pub fn load(image_path: &Path) -> Option<Self> {
        let sidecar = sidecar_path(image_path);
        let json = std::fs::read_to_string(sidecar).ok()?;
        serde_json::from_str(&json).ok()
    }

    /// Saves the recipe to the image sidecar JSON.
    pub fn save(&self, image_path: &Path) -> anyhow::Result<()> {
        let sidecar = sidecar_path(image_path);
        if let Some(parent) = sidecar.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(sidecar, json)?;
        Ok(())
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::default()
    }
}

fn sidecar_path(image_path: &Path) -> PathBuf {
    let dir = image_path.parent().unwrap_or(Path::new("."));
    let filename = image_path
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_default();
    dir.join(".edits").join(format!("{}.json", filename))
}
