use std::path::Path;
use std::sync::Arc;

use crate::bridge::{ModelBridge, ModelDelegate};
use crate::error::{Live2DError, Result};
use crate::gpu::GpuContext;
use crate::model::MotionPriority;
use crate::renderer::camera::CameraState;
use crate::renderer::pipeline::{DrawParams, Pipelines, validate_formats};
use crate::renderer::target::ViewSize;
use crate::renderer::uniforms::FrameUniforms;

/// Draw parameters live at this stride so every slot satisfies the dynamic offset alignment.
pub(crate) const DRAW_PARAMS_STRIDE: u64 = 256;

pub(crate) struct DepthTarget {
    pub(crate) view: wgpu::TextureView,
    pub(crate) size: ViewSize,
}

/// Lazily grown GPU buffer.
pub(crate) struct GrowableBuffer {
    pub(crate) buffer: Option<wgpu::Buffer>,
    label: &'static str,
    usage: wgpu::BufferUsages,
}

impl GrowableBuffer {
    pub(crate) fn new(label: &'static str, usage: wgpu::BufferUsages) -> Self {
        Self {
            buffer: None,
            label,
            usage: usage | wgpu::BufferUsages::COPY_DST,
        }
    }

    /// Returns true when the buffer was recreated.
    pub(crate) fn ensure(&mut self, device: &wgpu::Device, size: u64) -> bool {
        let size = size.max(wgpu::COPY_BUFFER_ALIGNMENT);
        if self.buffer.as_ref().is_some_and(|b| b.size() >= size) {
            return false;
        }
        let capacity = size.next_power_of_two();
        log::debug!("Growing {} to {} bytes", self.label, capacity);
        self.buffer = Some(device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(self.label),
            size: capacity,
            usage: self.usage,
            mapped_at_creation: false,
        }));
        true
    }
}

/// Draws the bridge's model into caller-supplied targets.
pub struct Renderer {
    pub(crate) gpu: Arc<GpuContext>,
    pub(crate) bridge: ModelBridge<GpuContext>,
    pub(crate) color_format: wgpu::TextureFormat,
    pub(crate) depth_format: wgpu::TextureFormat,
    pub(crate) pipelines: Pipelines,
    pub(crate) frame_buffer: wgpu::Buffer,
    pub(crate) frame_bind_group: wgpu::BindGroup,
    pub(crate) page_bind_group_layout: wgpu::BindGroupLayout,
    pub(crate) page_sampler: wgpu::Sampler,
    pub(crate) page_bind_groups: Vec<wgpu::BindGroup>,
    pub(crate) bound_generation: u64,
    pub(crate) draw_bind_group_layout: wgpu::BindGroupLayout,
    pub(crate) draw_params: GrowableBuffer,
    pub(crate) draw_bind_group: Option<wgpu::BindGroup>,
    pub(crate) vertex_buffer: GrowableBuffer,
    pub(crate) index_buffer: GrowableBuffer,
    pub(crate) depth: Option<DepthTarget>,
    pub(crate) camera: CameraState,
    pub(crate) view_size: ViewSize,
}

impl Renderer {
    /// Builds pipelines for the given target formats. Fails when either format cannot
    /// serve its role or the device rejects the pipelines.
    pub fn new(
        gpu: Arc<GpuContext>,
        color_format: wgpu::TextureFormat,
        depth_format: wgpu::TextureFormat,
    ) -> Result<Self> {
        validate_formats(color_format, depth_format, gpu.device.features())?;
        let device = &gpu.device;

        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Live2D Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shader.wgsl").into()),
        });

        let frame_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Frame Uniform Buffer"),
            size: size_of::<FrameUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let frame_bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Frame Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let frame_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Frame Bind Group"),
            layout: &frame_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: frame_buffer.as_entire_binding(),
            }],
        });

        let page_bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Texture Page Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let draw_bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Draw Params Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: wgpu::BufferSize::new(size_of::<DrawParams>() as u64),
                },
                count: None,
            }],
        });

        let page_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Texture Page Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Live2D Pipeline Layout"),
            bind_group_layouts: &[&frame_bind_group_layout, &page_bind_group_layout, &draw_bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipelines = Pipelines::new(device, &pipeline_layout, &shader, color_format, depth_format);

        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            return Err(Live2DError::renderer_init(err));
        }
        log::info!("Renderer ready: color {:?}, depth {:?}", color_format, depth_format);

        let bridge = ModelBridge::new(gpu.clone());
        Ok(Self {
            gpu,
            bridge,
            color_format,
            depth_format,
            pipelines,
            frame_buffer,
            frame_bind_group,
            page_bind_group_layout,
            page_sampler,
            page_bind_groups: Vec::new(),
            bound_generation: 0,
            draw_bind_group_layout,
            draw_params: GrowableBuffer::new("Draw Params Buffer", wgpu::BufferUsages::UNIFORM),
            draw_bind_group: None,
            vertex_buffer: GrowableBuffer::new("Live2D Vertex Buffer", wgpu::BufferUsages::VERTEX),
            index_buffer: GrowableBuffer::new("Live2D Index Buffer", wgpu::BufferUsages::INDEX),
            depth: None,
            camera: CameraState::default(),
            view_size: ViewSize::default(),
        })
    }

    pub fn color_format(&self) -> wgpu::TextureFormat {
        self.color_format
    }

    pub fn depth_format(&self) -> wgpu::TextureFormat {
        self.depth_format
    }

    pub fn gpu(&self) -> &Arc<GpuContext> {
        &self.gpu
    }

    pub fn bridge(&self) -> &ModelBridge<GpuContext> {
        &self.bridge
    }

    pub fn bridge_mut(&mut self) -> &mut ModelBridge<GpuContext> {
        &mut self.bridge
    }

    pub fn camera(&self) -> &CameraState {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut CameraState {
        &mut self.camera
    }

    pub fn view_size(&self) -> ViewSize {
        self.view_size
    }

    pub fn is_model_loaded(&self) -> bool {
        self.bridge.is_loaded()
    }

    pub fn set_delegate(&mut self, delegate: Option<&Arc<dyn ModelDelegate>>) {
        self.bridge.set_delegate(delegate);
    }

    pub fn load_model(&mut self, path: impl AsRef<Path>) -> Result<()> {
        self.bridge.load_model(path)
    }

    pub fn update_expression(&mut self, expression: &str) -> Result<()> {
        self.bridge.update_expression(expression)
    }

    pub fn update_lip_sync(&mut self, value: f32) -> Result<f32> {
        self.bridge.update_lip_sync(value)
    }

    pub fn start_motion(&mut self, group: &str, index: usize, priority: MotionPriority) -> Result<bool> {
        self.bridge.start_motion(group, index, priority)
    }

    /// Records the new drawable size. The cached depth target is rebuilt on the next frame.
    pub fn update_size(&mut self, size: ViewSize) {
        if size != self.view_size {
            log::debug!("View size {}x{}", size.width, size.height);
            self.view_size = size;
            self.depth = None;
        }
    }

    pub fn update_animations(&mut self, delta_time: f64) {
        self.bridge.update(delta_time);
    }

    /// Rebuilds the per-page bind groups after the bridge loaded a new model.
    pub(crate) fn sync_textures(&mut self) {
        if self.bound_generation == self.bridge.generation() {
            return;
        }
        let device = &self.gpu.device;
        self.page_bind_groups = self
            .bridge
            .model()
            .map(|model| {
                model
                    .textures
                    .iter()
                    .map(|page| {
                        device.create_bind_group(&wgpu::BindGroupDescriptor {
                            label: Some("Texture Page Bind Group"),
                            layout: &self.page_bind_group_layout,
                            entries: &[
                                wgpu::BindGroupEntry {
                                    binding: 0,
                                    resource: wgpu::BindingResource::TextureView(&page.view),
                                },
                                wgpu::BindGroupEntry {
                                    binding: 1,
                                    resource: wgpu::BindingResource::Sampler(&self.page_sampler),
                                },
                            ],
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();
        self.bound_generation = self.bridge.generation();
    }

    /// Makes sure the cached depth target matches the color target's `size`.
    pub(crate) fn ensure_depth(&mut self, size: ViewSize) {
        if self.depth.as_ref().is_some_and(|d| d.size == size) {
            return;
        }
        let texture = self.gpu.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Live2D Depth Texture"),
            size: wgpu::Extent3d {
                width: size.width,
                height: size.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: self.depth_format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        self.depth = Some(DepthTarget { view, size });
    }
}
