pub mod camera;
pub mod pipeline;
pub mod plan;
mod render;
pub mod renderer;
pub mod target;
pub mod uniforms;
pub mod vertex;

pub use camera::{CameraController, CameraState};
pub use plan::{DrawBatch, FramePlan};
pub use renderer::Renderer;
pub use target::{FrameReport, RenderPassTarget, ViewSize};
pub use uniforms::FrameUniforms;
pub use vertex::Live2DVertex;
