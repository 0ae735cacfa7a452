//! Renders Cubism (`*.model3.json`) character models with wgpu and drives their
//! expression, lip sync and idle animation.
//!
//! [`Renderer`] owns a [`ModelBridge`] and records draws into a caller-owned
//! command encoder; [`Live2DService`] wraps both for hosts that just want to load a
//! model by name and feed it audio.

pub mod bridge;
pub mod config;
pub mod error;
pub mod frame;
pub mod gpu;
pub mod model;
pub mod renderer;
pub mod service;
pub mod settings;

pub use bridge::{ModelBridge, ModelDelegate};
pub use config::BridgeConfig;
pub use error::{Live2DError, Result};
pub use frame::{FrameClock, PerformanceMonitor};
pub use gpu::{GpuContext, GpuDevice};
pub use renderer::{FrameReport, Live2DVertex, RenderPassTarget, Renderer, ViewSize};
pub use service::{Live2DService, ModelInfo, ServiceConfig, ServiceDelegate};

/// Name the viewer's settings are stored under.
pub const CONFY_APP_NAME: &str = "live2d-wgpu";
