use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use live2d_wgpu::model::{MotionPriority, NEUTRAL_EXPRESSION};
use live2d_wgpu::renderer::{CameraController, CameraState};
use live2d_wgpu::settings::ViewerSettings;
use live2d_wgpu::{FrameClock, GpuContext, Live2DService, PerformanceMonitor};
use winit::event::{ElementState, KeyEvent, MouseScrollDelta, WindowEvent};
use winit::keyboard::{Key, NamedKey};
use winit::window::Window;

pub struct EventResponse {
    pub repaint: bool,
    pub exit: bool,
}

impl EventResponse {
    fn none() -> Self {
        Self {
            repaint: false,
            exit: false,
        }
    }
}

pub struct App {
    pub window: Arc<Window>,
    pub pending_model_path: Option<PathBuf>,
    surface: wgpu::Surface<'static>,
    surface_config: wgpu::SurfaceConfiguration,
    gpu: Arc<GpuContext>,
    service: Live2DService,
    camera_controller: CameraController,
    clock: FrameClock,
    monitor: PerformanceMonitor,
    settings: ViewerSettings,
    started: Instant,
    tap_motion: usize,
}

impl App {
    pub async fn new(window: Arc<Window>, settings: ViewerSettings) -> anyhow::Result<Self> {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance.create_surface(window.clone())?;
        let (gpu, adapter) = GpuContext::for_surface(&instance, &surface).await?;
        let gpu = Arc::new(gpu);

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .context("surface reports no formats")?;

        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&gpu.device, &surface_config);

        let mut service = Live2DService::new(gpu.clone(), settings.service_config(surface_format))?;
        service.update_view_size(size.into());

        Ok(Self {
            window,
            pending_model_path: None,
            surface,
            surface_config,
            gpu,
            service,
            camera_controller: CameraController::new(CameraState::default()),
            clock: FrameClock::new(),
            monitor: PerformanceMonitor::new(),
            settings,
            started: Instant::now(),
            tap_motion: 0,
        })
    }

    /// Accepts either a path to a `*.model3.json` file or a model name under the asset root.
    pub fn load_model(&mut self, model: &str) -> anyhow::Result<()> {
        let path = Path::new(model);
        let info = if path.is_file() {
            self.service.load_model_path(path)?
        } else {
            self.service.load_model(model)?
        };
        log::info!("Expressions for '{}': {}", info.name, info.expressions.join(", "));
        self.window.set_title(&format!("Live2D Viewer - {}", info.name));
        self.tap_motion = 0;

        let mut expression = self.settings.start_expression.clone();
        if let Some(name) = &expression {
            if let Err(err) = self.service.update_expression(name) {
                log::warn!("Start expression '{}' not applied: {}", name, err);
                expression = None;
            }
        }
        self.settings.remember(model, expression.as_deref());
        Ok(())
    }

    pub fn settings(&self) -> &ViewerSettings {
        &self.settings
    }

    pub fn start_model(&self) -> Option<String> {
        self.settings.start_model.clone()
    }

    pub fn handle_event(&mut self, event: &WindowEvent) -> EventResponse {
        match event {
            WindowEvent::CloseRequested => {
                return EventResponse {
                    repaint: false,
                    exit: true,
                };
            }
            WindowEvent::KeyboardInput { event, .. } => return self.handle_key(event),
            WindowEvent::Resized(size) => self.resize(*size),
            WindowEvent::DroppedFile(path) => {
                self.pending_model_path = Some(path.clone());
            }
            WindowEvent::MouseInput { state, button, .. } => {
                self.camera_controller
                    .on_mouse_button(*button, *state == ElementState::Pressed);
            }
            WindowEvent::CursorMoved { position, .. } => {
                let viewport = (self.surface_config.width, self.surface_config.height);
                if self.camera_controller.on_mouse_move((position.x, position.y), viewport) {
                    return EventResponse {
                        repaint: true,
                        exit: false,
                    };
                }
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let lines = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32 * 0.05,
                };
                self.camera_controller.on_scroll(lines);
            }
            _ => {}
        }
        EventResponse::none()
    }

    fn handle_key(&mut self, event: &KeyEvent) -> EventResponse {
        let pressed = event.state == ElementState::Pressed;
        match &event.logical_key {
            Key::Named(NamedKey::Escape) if pressed => {
                return EventResponse {
                    repaint: false,
                    exit: true,
                };
            }
            Key::Named(NamedKey::Space) if pressed && !event.repeat => self.play_next_motion(),
            Key::Character(c) => match c.as_str() {
                // Hold to open the mouth.
                "m" | "M" if !event.repeat => {
                    let result = if pressed {
                        self.service.update_lip_sync(1.0).map(|_| ())
                    } else {
                        self.service.stop_lip_sync()
                    };
                    if let Err(err) = result {
                        log::debug!("Lip sync ignored: {}", err);
                    }
                }
                "r" | "R" if pressed => self.camera_controller.reset(),
                digit if pressed => {
                    if let Ok(n) = digit.parse::<usize>() {
                        self.select_expression(n);
                    }
                }
                _ => {}
            },
            _ => {}
        }
        EventResponse::none()
    }

    /// `0` is neutral, `1..` pick the model's expressions in file order.
    fn select_expression(&mut self, n: usize) {
        let Some(name) = self
            .service
            .model_info()
            .and_then(|info| info.expressions.get(n))
            .cloned()
        else {
            return;
        };
        match self.service.update_expression(&name) {
            Ok(()) => {
                log::info!("Expression: {}", name);
                let remembered = (name != NEUTRAL_EXPRESSION).then_some(name.as_str());
                if let Some(model) = self.settings.start_model.clone() {
                    self.settings.remember(&model, remembered);
                }
            }
            Err(err) => log::warn!("{}", err),
        }
    }

    fn play_next_motion(&mut self) {
        let Some(groups) = self
            .service
            .renderer()
            .bridge()
            .model()
            .map(|m| m.runtime.settings().file_references.motions.clone())
        else {
            return;
        };
        let all: Vec<(String, usize)> = groups
            .iter()
            .flat_map(|(group, motions)| (0..motions.len()).map(move |i| (group.clone(), i)))
            .collect();
        if all.is_empty() {
            return;
        }
        let (group, index) = &all[self.tap_motion % all.len()];
        self.tap_motion += 1;

        match self
            .service
            .renderer_mut()
            .start_motion(group, *index, MotionPriority::Normal)
        {
            Ok(true) => log::info!("Motion {}[{}]", group, index),
            Ok(false) => log::debug!("Motion {}[{}] refused by priority", group, index),
            Err(err) => log::warn!("{}", err),
        }
    }

    fn resize(&mut self, size: winit::dpi::PhysicalSize<u32>) {
        if size.width > 0 && size.height > 0 {
            self.surface_config.width = size.width;
            self.surface_config.height = size.height;
            self.surface.configure(&self.gpu.device, &self.surface_config);
        }
        self.service.update_view_size(size.into());
    }

    pub fn render(&mut self) -> anyhow::Result<()> {
        let delta = self.clock.tick(self.started.elapsed().as_secs_f64());
        self.service.update(delta);
        *self.service.renderer_mut().camera_mut() = self.camera_controller.state().clone();

        if self.service.view_size().is_empty() {
            return Ok(());
        }

        let frame = match self.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                self.surface.configure(&self.gpu.device, &self.surface_config);
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => return Ok(()),
            Err(err) => return Err(err.into()),
        };
        let view = frame.texture.create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Viewer Encoder"),
            });
        self.service.render(&mut encoder, &view)?;
        self.gpu.queue.submit(std::iter::once(encoder.finish()));
        frame.present();

        if self.monitor.frame() && self.settings.log_fps {
            self.monitor.log_metrics();
        }
        Ok(())
    }
}
