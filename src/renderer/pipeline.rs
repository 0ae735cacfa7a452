use super::vertex::Live2DVertex;
use crate::error::{Live2DError, Result};
use crate::model::BlendMode;

/// Opacity for one draw, read through a dynamic offset.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct DrawParams {
    pub opacity: f32,
    pub _padding: [f32; 3],
}

impl DrawParams {
    pub fn new(opacity: f32) -> Self {
        Self {
            opacity,
            _padding: [0.0; 3],
        }
    }
}

/// Checks that the formats can serve as the color and depth targets on a device
/// with `features`.
pub fn validate_formats(
    color: wgpu::TextureFormat,
    depth: wgpu::TextureFormat,
    features: wgpu::Features,
) -> Result<()> {
    if color.has_depth_aspect() || color.has_stencil_aspect() || color.is_compressed() {
        return Err(Live2DError::renderer_init(format!("{color:?} is not a color format")));
    }
    if !features.contains(color.required_features()) {
        return Err(Live2DError::renderer_init(format!(
            "{color:?} needs device features {:?}",
            color.required_features()
        )));
    }
    let color_caps = color.guaranteed_format_features(features);
    if !color_caps.allowed_usages.contains(wgpu::TextureUsages::RENDER_ATTACHMENT) {
        return Err(Live2DError::renderer_init(format!("{color:?} is not renderable")));
    }
    if !color_caps.flags.contains(wgpu::TextureFormatFeatureFlags::BLENDABLE) {
        return Err(Live2DError::renderer_init(format!("{color:?} does not support blending")));
    }

    if !depth.has_depth_aspect() {
        return Err(Live2DError::renderer_init(format!("{depth:?} is not a depth format")));
    }
    if !features.contains(depth.required_features()) {
        return Err(Live2DError::renderer_init(format!(
            "{depth:?} needs device features {:?}",
            depth.required_features()
        )));
    }
    Ok(())
}

/// Premultiplied-alpha blend state for each Cubism blend mode.
pub fn blend_state(mode: BlendMode) -> wgpu::BlendState {
    use wgpu::{BlendComponent, BlendFactor, BlendOperation};

    let keep_alpha = BlendComponent {
        src_factor: BlendFactor::Zero,
        dst_factor: BlendFactor::One,
        operation: BlendOperation::Add,
    };
    match mode {
        BlendMode::Normal => wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING,
        BlendMode::Additive => wgpu::BlendState {
            color: BlendComponent {
                src_factor: BlendFactor::One,
                dst_factor: BlendFactor::One,
                operation: BlendOperation::Add,
            },
            alpha: keep_alpha,
        },
        BlendMode::Multiplicative => wgpu::BlendState {
            color: BlendComponent {
                src_factor: BlendFactor::Dst,
                dst_factor: BlendFactor::OneMinusSrcAlpha,
                operation: BlendOperation::Add,
            },
            alpha: keep_alpha,
        },
    }
}

pub struct Pipelines {
    pub normal: wgpu::RenderPipeline,
    pub additive: wgpu::RenderPipeline,
    pub multiplicative: wgpu::RenderPipeline,
}

impl Pipelines {
    pub fn new(
        device: &wgpu::Device,
        layout: &wgpu::PipelineLayout,
        shader: &wgpu::ShaderModule,
        color_format: wgpu::TextureFormat,
        depth_format: wgpu::TextureFormat,
    ) -> Self {
        let create = |mode: BlendMode, label: &str| {
            create_pipeline(device, layout, shader, color_format, depth_format, mode, label)
        };
        Self {
            normal: create(BlendMode::Normal, "Live2D Normal Pipeline"),
            additive: create(BlendMode::Additive, "Live2D Additive Pipeline"),
            multiplicative: create(BlendMode::Multiplicative, "Live2D Multiplicative Pipeline"),
        }
    }

    pub fn get(&self, mode: BlendMode) -> &wgpu::RenderPipeline {
        match mode {
            BlendMode::Normal => &self.normal,
            BlendMode::Additive => &self.additive,
            BlendMode::Multiplicative => &self.multiplicative,
        }
    }
}

fn create_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    color_format: wgpu::TextureFormat,
    depth_format: wgpu::TextureFormat,
    mode: BlendMode,
    label: &str,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some("vs_main"),
            buffers: &[Live2DVertex::desc()],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format: color_format,
                blend: Some(blend_state(mode)),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        // Drawables are layered by render order, so depth is attached but never decides.
        depth_stencil: Some(wgpu::DepthStencilState {
            format: depth_format,
            depth_write_enabled: false,
            depth_compare: wgpu::CompareFunction::Always,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        multiview: None,
        cache: None,
    })
}
