use std::sync::Arc;

use live2d_wgpu::settings::ViewerSettings;
use tokio::runtime::Runtime;
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::ActiveEventLoop;
use winit::window::{Window, WindowId};

use crate::app::app::App;

pub struct AppHandler {
    pub app: Option<App>,
    pub model_arg: Option<String>,
    pub settings: ViewerSettings,
    pub runtime: Runtime,
}

impl AppHandler {
    pub fn new(model_arg: Option<String>, settings: ViewerSettings, runtime: Runtime) -> Self {
        Self {
            app: None,
            model_arg,
            settings,
            runtime,
        }
    }
}

impl ApplicationHandler for AppHandler {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.app.is_some() {
            return;
        }
        let window_attrs = Window::default_attributes()
            .with_title("Live2D Viewer")
            .with_inner_size(winit::dpi::LogicalSize::new(720.0, 960.0));

        let window = match event_loop.create_window(window_attrs) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("Failed to create window: {}", e);
                event_loop.exit();
                return;
            }
        };
        let mut app = match self.runtime.block_on(App::new(window, self.settings.clone())) {
            Ok(app) => app,
            Err(e) => {
                log::error!("Failed to start viewer: {:#}", e);
                event_loop.exit();
                return;
            }
        };

        // Load model from the command line, else the one named in the settings
        if let Some(model) = self.model_arg.clone().or_else(|| app.start_model()) {
            if let Err(e) = app.load_model(&model) {
                log::error!("Failed to load model '{}': {:#}", model, e);
            }
        }

        self.app = Some(app);
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        if let Some(app) = &mut self.app {
            let response = app.handle_event(&event);
            if response.repaint {
                app.window.request_redraw();
            }
            if response.exit {
                event_loop.exit();
            }
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(app) = &self.app {
            app.settings().save();
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(app) = &mut self.app {
            // Check if a model file was dropped onto the window
            if let Some(path) = app.pending_model_path.take() {
                let path = path.to_string_lossy().into_owned();
                if let Err(e) = app.load_model(&path) {
                    log::error!("Failed to load model '{}': {:#}", path, e);
                }
            }

            if let Err(e) = app.render() {
                log::error!("Render error: {:#}", e);
            }
            app.window.request_redraw();
        }
    }
}
