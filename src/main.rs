use live2d_wgpu::settings::ViewerSettings;
use winit::event_loop::{ControlFlow, EventLoop};

mod app;

use app::handler::AppHandler;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    // live2d-viewer [MODEL_PATH | MODEL_NAME]
    let model_arg = std::env::args().nth(1);

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let settings = ViewerSettings::load();
    let mut handler = AppHandler::new(model_arg, settings, tokio::runtime::Runtime::new()?);

    event_loop.run_app(&mut handler)?;

    Ok(())
}
