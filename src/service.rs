//! Host-facing facade over the renderer: finds models by name under an asset root,
//! turns audio into lip sync, and reports changes to a single observer.

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};

use crate::bridge::ModelDelegate;
use crate::config::BridgeConfig;
use crate::error::{Live2DError, Result};
use crate::gpu::GpuContext;
use crate::model::NEUTRAL_EXPRESSION;
use crate::renderer::{FrameReport, RenderPassTarget, Renderer, ViewSize};

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub asset_root: PathBuf,
    pub color_format: wgpu::TextureFormat,
    pub depth_format: wgpu::TextureFormat,
    pub clear_color: wgpu::Color,
    pub bridge: BridgeConfig,
    /// Weight of the previous level when smoothing sample amplitudes, in [0, 1).
    pub lip_sync_smoothing: f32,
    /// Multiplier from RMS amplitude to mouth opening.
    pub lip_sync_gain: f32,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            asset_root: PathBuf::from("assets"),
            color_format: wgpu::TextureFormat::Bgra8Unorm,
            depth_format: wgpu::TextureFormat::Depth32Float,
            clear_color: wgpu::Color::TRANSPARENT,
            bridge: BridgeConfig::default(),
            lip_sync_smoothing: 0.5,
            lip_sync_gain: 4.0,
        }
    }
}

/// Summary of the loaded model handed to the service observer.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelInfo {
    pub name: String,
    pub path: PathBuf,
    /// Always starts with `"neutral"`.
    pub expressions: Vec<String>,
    pub current_expression: String,
    pub texture_count: usize,
}

pub trait ServiceDelegate {
    fn did_load_model(&self, model: &ModelInfo);
    fn did_update_expression(&self, expression: &str);
    fn did_update_lip_sync(&self, value: f32);
}

#[derive(Debug, Clone, PartialEq)]
enum BridgeEvent {
    Loaded,
    Updated,
    Expression(String),
    LipSync(f32),
}

/// Collects bridge notifications until the service forwards them.
#[derive(Default)]
struct BridgeRelay {
    events: RefCell<Vec<BridgeEvent>>,
}

impl BridgeRelay {
    fn drain(&self) -> Vec<BridgeEvent> {
        std::mem::take(&mut *self.events.borrow_mut())
    }
}

impl ModelDelegate for BridgeRelay {
    fn on_model_loaded(&self) {
        self.events.borrow_mut().push(BridgeEvent::Loaded);
    }

    fn on_model_updated(&self) {
        self.events.borrow_mut().push(BridgeEvent::Updated);
    }

    fn on_expression_updated(&self, expression: &str) {
        self.events
            .borrow_mut()
            .push(BridgeEvent::Expression(expression.to_string()));
    }

    fn on_lip_sync_updated(&self, value: f32) {
        self.events.borrow_mut().push(BridgeEvent::LipSync(value));
    }
}

/// RMS level of audio samples, smoothed across calls.
#[derive(Debug, Clone)]
pub struct LipSyncAnalyzer {
    smoothing: f32,
    gain: f32,
    level: f32,
}

impl LipSyncAnalyzer {
    pub fn new(smoothing: f32, gain: f32) -> Self {
        Self {
            smoothing: smoothing.clamp(0.0, 0.99),
            gain: gain.max(0.0),
            level: 0.0,
        }
    }

    /// Feeds one block of samples in [-1, 1] and returns the mouth opening in [0, 1].
    pub fn process(&mut self, samples: &[f32]) -> f32 {
        let finite = samples.iter().filter(|s| s.is_finite());
        let (sum, count) = finite.fold((0.0_f64, 0usize), |(sum, n), s| (sum + (*s as f64).powi(2), n + 1));
        let rms = if count == 0 { 0.0 } else { (sum / count as f64).sqrt() as f32 };

        let target = (rms * self.gain).clamp(0.0, 1.0);
        self.level = self.level * self.smoothing + target * (1.0 - self.smoothing);
        self.level
    }

    pub fn level(&self) -> f32 {
        self.level
    }

    pub fn reset(&mut self) {
        self.level = 0.0;
    }
}

pub struct Live2DService {
    renderer: Renderer,
    config: ServiceConfig,
    view_size: ViewSize,
    model_info: Option<ModelInfo>,
    relay: Arc<BridgeRelay>,
    delegate: Option<Weak<dyn ServiceDelegate>>,
    analyzer: LipSyncAnalyzer,
}

impl Live2DService {
    pub fn new(gpu: Arc<GpuContext>, config: ServiceConfig) -> Result<Self> {
        let mut renderer = Renderer::new(gpu, config.color_format, config.depth_format)?;
        renderer.bridge_mut().set_config(config.bridge.clone());

        let relay = Arc::new(BridgeRelay::default());
        let as_delegate: Arc<dyn ModelDelegate> = relay.clone();
        renderer.set_delegate(Some(&as_delegate));

        let analyzer = LipSyncAnalyzer::new(config.lip_sync_smoothing, config.lip_sync_gain);
        Ok(Self {
            renderer,
            config,
            view_size: ViewSize::default(),
            model_info: None,
            relay,
            delegate: None,
            analyzer,
        })
    }

    pub fn set_delegate(&mut self, delegate: Option<&Arc<dyn ServiceDelegate>>) {
        self.delegate = delegate.map(Arc::downgrade);
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut Renderer {
        &mut self.renderer
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn model_info(&self) -> Option<&ModelInfo> {
        self.model_info.as_ref()
    }

    pub fn view_size(&self) -> ViewSize {
        self.view_size
    }

    /// `<root>/<name>/<name>.model3.json`, else `<root>/<name>.model3.json`.
    pub fn resolve_model_path(&self, name: &str) -> Result<PathBuf> {
        resolve_model_path(&self.config.asset_root, name)
    }

    pub fn load_model(&mut self, name: &str) -> Result<ModelInfo> {
        let path = self.resolve_model_path(name)?;
        self.load_model_path(&path)
    }

    pub fn load_model_path(&mut self, path: &Path) -> Result<ModelInfo> {
        let result = self.renderer.load_model(path);
        if result.is_ok() {
            self.model_info = self.renderer.bridge().model().map(|model| {
                let mut expressions = vec![NEUTRAL_EXPRESSION.to_string()];
                expressions.extend(
                    model
                        .runtime
                        .expression_names()
                        .into_iter()
                        .filter(|name| name != NEUTRAL_EXPRESSION),
                );
                ModelInfo {
                    name: model.runtime.name().to_string(),
                    path: model.path.clone(),
                    expressions,
                    current_expression: NEUTRAL_EXPRESSION.to_string(),
                    texture_count: model.textures.len(),
                }
            });
            self.analyzer.reset();
        }
        self.forward_events();
        result?;
        self.model_info.clone().ok_or(Live2DError::NoModelLoaded)
    }

    pub fn update_expression(&mut self, expression: &str) -> Result<()> {
        let result = self.renderer.update_expression(expression);
        if let (Ok(()), Some(info)) = (&result, self.model_info.as_mut()) {
            info.current_expression = expression.to_string();
        }
        self.forward_events();
        result
    }

    /// Sets the mouth opening directly; the amplitude is clamped to [0, 1].
    pub fn update_lip_sync(&mut self, amplitude: f32) -> Result<f32> {
        let result = self.renderer.update_lip_sync(amplitude);
        self.forward_events();
        result
    }

    pub fn stop_lip_sync(&mut self) -> Result<()> {
        self.analyzer.reset();
        self.update_lip_sync(0.0).map(|_| ())
    }

    /// Derives the mouth opening from a block of audio samples.
    pub fn update_lip_sync_from_samples(&mut self, samples: &[f32]) -> Result<f32> {
        let level = self.analyzer.process(samples);
        self.update_lip_sync(level)
    }

    pub fn update_view_size(&mut self, size: ViewSize) {
        self.view_size = size;
        self.renderer.update_size(size);
    }

    /// Draws into `target` at the size last passed to [`update_view_size`](Self::update_view_size).
    pub fn render(&mut self, encoder: &mut wgpu::CommandEncoder, target: &wgpu::TextureView) -> Result<FrameReport> {
        let pass = RenderPassTarget::clear(target, self.config.clear_color);
        self.renderer.render(encoder, None, &pass, self.view_size)
    }

    pub fn update(&mut self, delta_time: f64) {
        self.renderer.update_animations(delta_time);
        self.forward_events();
    }

    fn forward_events(&self) {
        let events = self.relay.drain();
        let Some(delegate) = self.delegate.as_ref().and_then(Weak::upgrade) else {
            return;
        };
        for event in events {
            match event {
                BridgeEvent::Loaded => {
                    if let Some(info) = &self.model_info {
                        delegate.did_load_model(info);
                    }
                }
                BridgeEvent::Updated => {}
                BridgeEvent::Expression(name) => delegate.did_update_expression(&name),
                BridgeEvent::LipSync(value) => delegate.did_update_lip_sync(value),
            }
        }
    }
}

pub fn resolve_model_path(asset_root: &Path, name: &str) -> Result<PathBuf> {
    let file = format!("{name}.model3.json");
    let candidates = [asset_root.join(name).join(&file), asset_root.join(&file)];
    for candidate in &candidates {
        if candidate.is_file() {
            return Ok(candidate.clone());
        }
    }
    let [first, _] = candidates;
    Err(Live2DError::ModelNotFound { path: first })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_nested_then_flat_layout() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();

        let err = resolve_model_path(root, "haru").unwrap_err();
        assert!(matches!(err, Live2DError::ModelNotFound { ref path } if path.ends_with("haru/haru.model3.json")));

        std::fs::write(root.join("haru.model3.json"), "{}").unwrap();
        assert_eq!(resolve_model_path(root, "haru").unwrap(), root.join("haru.model3.json"));

        std::fs::create_dir(root.join("haru")).unwrap();
        std::fs::write(root.join("haru/haru.model3.json"), "{}").unwrap();
        assert_eq!(
            resolve_model_path(root, "haru").unwrap(),
            root.join("haru").join("haru.model3.json")
        );
    }

    #[test]
    fn analyzer_tracks_rms_with_smoothing() {
        let mut analyzer = LipSyncAnalyzer::new(0.5, 2.0);
        assert_eq!(analyzer.process(&[]), 0.0);

        // RMS 0.25, gain 2 -> 0.5 target, halfway from 0
        let level = analyzer.process(&[0.25, -0.25, 0.25, -0.25]);
        assert!((level - 0.25).abs() < 1e-6);

        // Loud input saturates at 1 before smoothing.
        let level = analyzer.process(&[1.0; 8]);
        assert!((level - 0.625).abs() < 1e-6);

        analyzer.reset();
        assert_eq!(analyzer.level(), 0.0);
        assert_eq!(analyzer.process(&[f32::NAN]), 0.0);
    }

    #[test]
    fn relay_buffers_until_drained() {
        let relay = BridgeRelay::default();
        relay.on_expression_updated("smile");
        relay.on_lip_sync_updated(0.5);
        assert_eq!(
            relay.drain(),
            vec![BridgeEvent::Expression("smile".into()), BridgeEvent::LipSync(0.5)]
        );
        assert!(relay.drain().is_empty());
    }
}
