use std::collections::BTreeMap;
use std::path::Path;

use super::expression::Expression;
use super::moc::CoreLoader;
use super::motion::Motion;
use super::runtime::ModelRuntime;
use super::settings::{ModelSettings, model_name, resolve};
use super::texture::TextureImage;
use crate::config::BridgeConfig;
use crate::error::{Live2DError, Result};

/// A parsed bundle whose texture pages still have to reach the GPU.
pub struct LoadedBundle {
    pub runtime: ModelRuntime,
    pub textures: Vec<TextureImage>,
}

/// Reads a `*.model3.json` bundle and everything it references.
pub fn load_bundle(path: &Path, core_loader: &dyn CoreLoader, config: &BridgeConfig) -> Result<LoadedBundle> {
    let settings = ModelSettings::from_file(path)?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    let refs = &settings.file_references;

    if refs.moc.trim().is_empty() {
        return Err(Live2DError::load_failed(format!("{} references no moc file", path.display())));
    }
    let moc_path = resolve(base_dir, &refs.moc);
    let moc = std::fs::read(&moc_path).map_err(|err| Live2DError::read_failed(&moc_path, err))?;

    let textures = refs
        .textures
        .iter()
        .map(|t| TextureImage::load(&resolve(base_dir, t)))
        .collect::<Result<Vec<_>>>()?;
    if textures.is_empty() {
        log::warn!("{} references no textures", path.display());
    }

    let core = core_loader
        .load(&moc, &textures)
        .map_err(|reason| Live2DError::UnsupportedFormat {
            path: moc_path.clone(),
            reason,
        })?;

    let expressions = refs
        .expressions
        .iter()
        .map(|e| Expression::from_file(&e.name, &resolve(base_dir, &e.file)))
        .collect::<Result<Vec<_>>>()?;

    let mut motions = BTreeMap::new();
    for (group, entries) in &refs.motions {
        let loaded = entries
            .iter()
            .map(|m| Motion::from_file(&resolve(base_dir, &m.file), m.fade_in_time, m.fade_out_time))
            .collect::<Result<Vec<_>>>()?;
        motions.insert(group.clone(), loaded);
    }

    if let Some(physics) = &refs.physics {
        log::debug!("Physics file {} is not simulated", physics);
    }

    let name = model_name(path);
    log::info!(
        "Loaded model '{}': {} textures, {} expressions, {} motion groups",
        name,
        textures.len(),
        expressions.len(),
        motions.len()
    );

    let runtime = ModelRuntime::new(name, settings, core, expressions, motions, config);
    Ok(LoadedBundle { runtime, textures })
}

#[cfg(test)]
pub(crate) mod fixtures {
    use std::path::{Path, PathBuf};

    /// Writes a small but complete bundle into `dir` and returns its settings path.
    pub fn write_bundle(dir: &Path, name: &str) -> PathBuf {
        std::fs::create_dir_all(dir.join("exp")).unwrap();
        std::fs::create_dir_all(dir.join("motions")).unwrap();

        let mut moc = b"MOC3".to_vec();
        moc.push(4);
        moc.extend_from_slice(&[0; 59]);
        std::fs::write(dir.join(format!("{name}.moc3")), moc).unwrap();

        image::RgbaImage::from_pixel(4, 4, image::Rgba([200, 150, 100, 255]))
            .save(dir.join("texture_00.png"))
            .unwrap();

        std::fs::write(
            dir.join("exp/smile.exp3.json"),
            r#"{"Type": "Live2D Expression", "FadeInTime": 0.0,
                "Parameters": [{"Id": "ParamMouthForm", "Value": 1.0, "Blend": "Overwrite"}]}"#,
        )
        .unwrap();
        std::fs::write(
            dir.join("motions/idle.motion3.json"),
            r#"{"Version": 3, "Meta": {"Duration": 2.0, "Fps": 30.0, "Loop": true},
                "Curves": [{"Target": "Parameter", "Id": "ParamAngleX",
                            "Segments": [0, 0, 0, 1, 10, 0, 2, 0]}]}"#,
        )
        .unwrap();

        let settings = format!(
            r#"{{
                "Version": 3,
                "FileReferences": {{
                    "Moc": "{name}.moc3",
                    "Textures": ["texture_00.png"],
                    "Physics": "{name}.physics3.json",
                    "Expressions": [{{"Name": "smile", "File": "exp/smile.exp3.json"}}],
                    "Motions": {{"Idle": [{{"File": "motions/idle.motion3.json"}}]}}
                }},
                "Groups": [
                    {{"Target": "Parameter", "Name": "LipSync", "Ids": ["ParamMouthOpenY"]}},
                    {{"Target": "Parameter", "Name": "EyeBlink", "Ids": ["ParamEyeLOpen", "ParamEyeROpen"]}}
                ],
                "Layout": {{"CenterX": 0.0, "CenterY": 0.0, "Width": 2.0}}
            }}"#
        );
        let path = dir.join(format!("{name}.model3.json"));
        std::fs::write(&path, settings).unwrap();
        path
    }
}
