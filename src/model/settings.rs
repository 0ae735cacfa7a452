use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{Live2DError, Result};

/// Group name the lip-sync value is written to.
pub const LIP_SYNC_GROUP: &str = "LipSync";
/// Group name auto eye blink closes.
pub const EYE_BLINK_GROUP: &str = "EyeBlink";
/// Motion group started automatically after load.
pub const IDLE_MOTION_GROUP: &str = "Idle";

/// `*.model3.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ModelSettings {
    pub version: u32,
    pub file_references: FileReferences,
    #[serde(default)]
    pub groups: Vec<ParameterGroup>,
    #[serde(default)]
    pub hit_areas: Vec<HitArea>,
    #[serde(default)]
    pub layout: Option<Layout>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FileReferences {
    pub moc: String,
    #[serde(default)]
    pub textures: Vec<String>,
    #[serde(default)]
    pub physics: Option<String>,
    #[serde(default)]
    pub pose: Option<String>,
    #[serde(default)]
    pub display_info: Option<String>,
    #[serde(default)]
    pub expressions: Vec<ExpressionReference>,
    #[serde(default)]
    pub motions: BTreeMap<String, Vec<MotionReference>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ExpressionReference {
    pub name: String,
    pub file: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MotionReference {
    pub file: String,
    #[serde(default)]
    pub fade_in_time: Option<f32>,
    #[serde(default)]
    pub fade_out_time: Option<f32>,
    #[serde(default)]
    pub sound: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ParameterGroup {
    pub target: String,
    pub name: String,
    #[serde(default)]
    pub ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HitArea {
    pub id: String,
    pub name: String,
}

/// Placement of the model canvas in model space. Every field is optional in the file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Layout {
    pub width: Option<f32>,
    pub height: Option<f32>,
    pub center_x: Option<f32>,
    pub center_y: Option<f32>,
    pub x: Option<f32>,
    pub y: Option<f32>,
}

impl ModelSettings {
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Live2DError::ModelNotFound {
                path: path.to_path_buf(),
            });
        }
        let data = std::fs::read(path).map_err(|err| Live2DError::read_failed(path, err))?;
        let settings: ModelSettings =
            serde_json::from_slice(&data).map_err(|source| Live2DError::ModelParse {
                path: path.to_path_buf(),
                source,
            })?;

        if settings.version != 3 {
            return Err(Live2DError::UnsupportedFormat {
                path: path.to_path_buf(),
                reason: format!("model settings version {}", settings.version),
            });
        }
        Ok(settings)
    }

    /// Parameter ids of a `Parameter` group, empty when the group is absent.
    pub fn group_ids(&self, name: &str) -> &[String] {
        self.groups
            .iter()
            .find(|g| g.target == "Parameter" && g.name == name)
            .map(|g| g.ids.as_slice())
            .unwrap_or(&[])
    }

    pub fn expression_names(&self) -> Vec<String> {
        self.file_references
            .expressions
            .iter()
            .map(|e| e.name.clone())
            .collect()
    }

    pub fn motion_count(&self, group: &str) -> usize {
        self.file_references
            .motions
            .get(group)
            .map(|m| m.len())
            .unwrap_or(0)
    }
}

/// Name of a bundle: `hiyori.model3.json` -> `hiyori`.
pub fn model_name(path: &Path) -> String {
    let file = path
        .file_name()
        .and_then(|f| f.to_str())
        .unwrap_or_default();
    file.strip_suffix(".model3.json")
        .or_else(|| file.strip_suffix(".json"))
        .unwrap_or(file)
        .to_string()
}

/// Resolves a path from the settings file relative to the bundle directory.
pub fn resolve(base_dir: &Path, relative: &str) -> PathBuf {
    base_dir.join(relative.replace('\\', "/"))
}
