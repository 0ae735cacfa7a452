use crate::CONFY_APP_NAME;
use crate::config::BridgeConfig;
use crate::service::ServiceConfig;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerSettings {
    pub clear_color: [f32; 4],
    pub asset_root: PathBuf,
    /// Model name under `asset_root` opened when no path is given on the command line.
    pub start_model: Option<String>,
    pub start_expression: Option<String>,
    /// Seconds between blinks, 0 disables blinking.
    pub eye_blink_interval: f32,
    pub breath: bool,
    pub log_fps: bool,
}

impl Default for ViewerSettings {
    fn default() -> Self {
        Self {
            clear_color: [0.1, 0.1, 0.12, 1.0],
            asset_root: PathBuf::from("assets"),
            start_model: None,
            start_expression: None,
            eye_blink_interval: 4.0,
            breath: true,
            log_fps: false,
        }
    }
}

const CONFIG_NAME: &str = "viewer";

impl ViewerSettings {
    pub fn load() -> Self {
        confy::get_configuration_file_path(CONFY_APP_NAME, CONFIG_NAME)
            .and_then(|path| Self::load_from(&path))
            .unwrap_or_else(|err| {
                log::warn!("Using default viewer settings: {}", err);
                Self::default()
            })
    }

    pub fn save(&self) {
        let result = confy::get_configuration_file_path(CONFY_APP_NAME, CONFIG_NAME)
            .and_then(|path| self.save_to(&path));
        match result {
            Ok(()) => log::debug!("Viewer settings saved"),
            Err(err) => log::warn!("Failed to save viewer settings: {}", err),
        }
    }

    /// Creates the file with defaults when it does not exist yet.
    pub fn load_from(path: &Path) -> Result<Self, confy::ConfyError> {
        confy::load_path(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), confy::ConfyError> {
        confy::store_path(path, self)
    }

    /// Makes the next launch open `model` with `expression` applied.
    pub fn remember(&mut self, model: &str, expression: Option<&str>) {
        self.start_model = Some(model.to_string());
        self.start_expression = expression.map(str::to_string);
    }

    pub fn clear_color(&self) -> wgpu::Color {
        let [r, g, b, a] = self.clear_color.map(|c| c.clamp(0.0, 1.0) as f64);
        wgpu::Color { r, g, b, a }
    }

    pub fn bridge_config(&self) -> BridgeConfig {
        BridgeConfig {
            eye_blink_interval: (self.eye_blink_interval > 0.0).then_some(self.eye_blink_interval),
            breath: self.breath,
            auto_idle: true,
        }
    }

    /// Service setup for a surface of `color_format`.
    pub fn service_config(&self, color_format: wgpu::TextureFormat) -> ServiceConfig {
        ServiceConfig {
            asset_root: self.asset_root.clone(),
            color_format,
            clear_color: self.clear_color(),
            bridge: self.bridge_config(),
            ..ServiceConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_files_fill_defaults() {
        let settings: ViewerSettings = serde_json::from_str(r#"{"eye_blink_interval": 0.0}"#).unwrap();
        assert_eq!(settings.asset_root, PathBuf::from("assets"));
        assert!(settings.bridge_config().eye_blink_interval.is_none());
        assert!(settings.bridge_config().auto_idle);
    }

    #[test]
    fn service_config_carries_viewer_choices() {
        let settings = ViewerSettings {
            clear_color: [2.0, 0.5, 0.0, 1.0],
            ..Default::default()
        };
        let config = settings.service_config(wgpu::TextureFormat::Rgba8UnormSrgb);
        assert_eq!(config.color_format, wgpu::TextureFormat::Rgba8UnormSrgb);
        assert_eq!(config.depth_format, wgpu::TextureFormat::Depth32Float);
        assert_eq!(config.clear_color.r, 1.0);
        assert_eq!(config.bridge.eye_blink_interval, Some(4.0));
    }

    #[test]
    fn remembered_session_survives_a_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("viewer.toml");

        let fresh = ViewerSettings::load_from(&path).unwrap();
        assert_eq!(fresh, ViewerSettings::default());
        assert!(path.is_file());

        let mut settings = fresh;
        settings.remember("mao", Some("happy"));
        settings.save_to(&path).unwrap();

        let loaded = ViewerSettings::load_from(&path).unwrap();
        assert_eq!(loaded.start_model.as_deref(), Some("mao"));
        assert_eq!(loaded.start_expression.as_deref(), Some("happy"));
        assert_eq!(loaded, settings);
    }
}
