use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::delegate::{DelegateSlot, ModelDelegate};
use crate::config::BridgeConfig;
use crate::error::{Live2DError, Result};
use crate::gpu::GpuDevice;
use crate::model::{CoreLoader, ModelRuntime, MotionPriority, SpriteCoreLoader, load_bundle};

/// A model owned by the bridge, with its texture pages already on the device.
pub struct LoadedModel<T> {
    pub path: PathBuf,
    pub runtime: ModelRuntime,
    pub textures: Vec<T>,
}

/// Owns the live model and forwards expression, lip sync and time steps into it.
pub struct ModelBridge<D: GpuDevice> {
    device: Arc<D>,
    core_loader: Box<dyn CoreLoader>,
    config: BridgeConfig,
    model: Option<LoadedModel<D::Texture>>,
    delegate: DelegateSlot,
    generation: u64,
}

impl<D: GpuDevice> ModelBridge<D> {
    pub fn new(device: Arc<D>) -> Self {
        Self {
            device,
            core_loader: Box::new(SpriteCoreLoader),
            config: BridgeConfig::default(),
            model: None,
            delegate: DelegateSlot::default(),
            generation: 0,
        }
    }

    pub fn with_core_loader(mut self, loader: Box<dyn CoreLoader>) -> Self {
        self.core_loader = loader;
        self
    }

    pub fn with_config(mut self, config: BridgeConfig) -> Self {
        self.config = config;
        self
    }

    /// Applies to models loaded after the call.
    pub fn set_core_loader(&mut self, loader: Box<dyn CoreLoader>) {
        self.core_loader = loader;
    }

    /// Applies to models loaded after the call.
    pub fn set_config(&mut self, config: BridgeConfig) {
        self.config = config;
    }

    pub fn device(&self) -> &Arc<D> {
        &self.device
    }

    pub fn set_delegate(&mut self, delegate: Option<&Arc<dyn ModelDelegate>>) {
        self.delegate.set(delegate);
    }

    pub fn has_delegate(&self) -> bool {
        self.delegate.is_attached()
    }

    /// Loads a `*.model3.json` bundle and replaces the current model. On error the
    /// current model stays and no notification is sent.
    pub fn load_model(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let bundle = load_bundle(path, self.core_loader.as_ref(), &self.config).inspect_err(|err| {
            log::error!("Failed to load model {}: {}", path.display(), err);
        })?;

        let name = bundle.runtime.name().to_string();
        let textures = bundle
            .textures
            .iter()
            .enumerate()
            .map(|(i, page)| self.device.upload_texture(&format!("{name} texture {i}"), page))
            .collect();

        self.model = Some(LoadedModel {
            path: path.to_path_buf(),
            runtime: bundle.runtime,
            textures,
        });
        self.generation += 1;

        self.delegate.notify(|d| d.on_model_loaded());
        Ok(())
    }

    pub fn update_expression(&mut self, expression: &str) -> Result<()> {
        let model = self.model.as_mut().ok_or(Live2DError::NoModelLoaded)?;
        model.runtime.set_expression(expression)?;
        log::debug!("Expression set to '{}'", expression);

        self.delegate.notify(|d| d.on_expression_updated(expression));
        Ok(())
    }

    /// Stores the value clamped to [0, 1] and returns it.
    pub fn update_lip_sync(&mut self, value: f32) -> Result<f32> {
        let model = self.model.as_mut().ok_or(Live2DError::NoModelLoaded)?;
        let stored = model.runtime.set_lip_sync(value);

        self.delegate.notify(|d| d.on_lip_sync_updated(stored));
        Ok(stored)
    }

    /// Advances the model by `delta_time` seconds. Does nothing before a model is loaded.
    pub fn update(&mut self, delta_time: f64) {
        let Some(model) = self.model.as_mut() else {
            return;
        };
        let dt = if delta_time.is_finite() && delta_time >= 0.0 {
            delta_time
        } else {
            log::warn!("Ignoring invalid time step {}", delta_time);
            0.0
        };
        model.runtime.update(dt as f32);

        self.delegate.notify(|d| d.on_model_updated());
    }

    pub fn start_motion(&mut self, group: &str, index: usize, priority: MotionPriority) -> Result<bool> {
        let model = self.model.as_mut().ok_or(Live2DError::NoModelLoaded)?;
        model.runtime.start_motion(group, index, priority)
    }

    pub fn is_loaded(&self) -> bool {
        self.model.is_some()
    }

    pub fn model(&self) -> Option<&LoadedModel<D::Texture>> {
        self.model.as_ref()
    }

    pub fn current_expression(&self) -> Option<&str> {
        self.model.as_ref().and_then(|m| m.runtime.current_expression())
    }

    pub fn lip_sync_value(&self) -> f32 {
        self.model.as_ref().map_or(0.0, |m| m.runtime.lip_sync())
    }

    pub fn parameter(&self, id: &str) -> Option<f32> {
        self.model.as_ref().and_then(|m| m.runtime.parameter(id))
    }

    /// Bumped on every successful load.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}
