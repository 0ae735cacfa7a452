use crate::error::{Live2DError, Result};
use crate::renderer::pipeline::DrawParams;
use crate::renderer::plan::{FramePlan, frame_uniforms};
use crate::renderer::renderer::{DRAW_PARAMS_STRIDE, Renderer};
use crate::renderer::target::{FrameReport, RenderPassTarget, ViewSize};

impl Renderer {
    /// Encodes one pass drawing the current model into `encoder`. The pass targets
    /// `output` when given, else the pass target's color view. Without a model the
    /// pass only applies the target's load operation.
    ///
    /// `view_size` drives the projection aspect and the viewport, clipped to the
    /// color target. The internal depth attachment always matches the color target.
    pub fn render(
        &mut self,
        encoder: &mut wgpu::CommandEncoder,
        output: Option<&wgpu::TextureView>,
        pass: &RenderPassTarget<'_>,
        view_size: ViewSize,
    ) -> Result<FrameReport> {
        // Skip rendering if the target has no area (minimized, not ready, etc.)
        if view_size.is_empty() {
            return Ok(FrameReport::default());
        }
        let color_view = output.or(pass.color).ok_or(Live2DError::MissingRenderTarget)?;
        let extent = color_view.texture().size();
        let target_size = ViewSize::new(extent.width, extent.height);
        self.update_size(view_size);
        self.sync_textures();

        let plan = match self.bridge.model() {
            Some(model) => {
                let runtime = &model.runtime;
                let uniforms = frame_uniforms(&runtime.layout(), runtime.canvas(), &self.camera, view_size);
                self.gpu
                    .queue
                    .write_buffer(&self.frame_buffer, 0, bytemuck::cast_slice(&[uniforms]));
                FramePlan::build(runtime.drawables(), self.page_bind_groups.len(), runtime.model_opacity())
            }
            None => FramePlan::default(),
        };

        if !plan.is_empty() {
            self.upload_plan(&plan);
        }
        if pass.depth.is_none() {
            self.ensure_depth(target_size);
        }
        let depth_view = match (pass.depth, &self.depth) {
            (Some(view), _) => view,
            (None, Some(depth)) => &depth.view,
            (None, None) => return Err(Live2DError::renderer_init("no depth target")),
        };
        let stencil_ops = self.depth_format.has_stencil_aspect().then_some(wgpu::Operations {
            load: wgpu::LoadOp::Clear(0),
            store: wgpu::StoreOp::Store,
        });

        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Live2D Render Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: color_view,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: pass.color_load_op(),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        let mut report = FrameReport {
            encoded_pass: true,
            ..Default::default()
        };
        let (Some(vertex_buffer), Some(index_buffer), Some(draw_bind_group)) = (
            self.vertex_buffer.buffer.as_ref(),
            self.index_buffer.buffer.as_ref(),
            self.draw_bind_group.as_ref(),
        ) else {
            return Ok(report);
        };
        if plan.is_empty() {
            return Ok(report);
        }

        let viewport_width = view_size.width.min(target_size.width);
        let viewport_height = view_size.height.min(target_size.height);
        render_pass.set_viewport(0.0, 0.0, viewport_width as f32, viewport_height as f32, 0.0, 1.0);
        render_pass.set_bind_group(0, &self.frame_bind_group, &[]);
        render_pass.set_vertex_buffer(0, vertex_buffer.slice(..));
        render_pass.set_index_buffer(index_buffer.slice(..), wgpu::IndexFormat::Uint16);

        for (slot, batch) in plan.batches.iter().enumerate() {
            render_pass.set_pipeline(self.pipelines.get(batch.blend));
            render_pass.set_bind_group(1, &self.page_bind_groups[batch.texture], &[]);
            render_pass.set_bind_group(2, draw_bind_group, &[(slot as u64 * DRAW_PARAMS_STRIDE) as u32]);
            render_pass.draw_indexed(batch.index_range.clone(), batch.base_vertex, 0..1);

            report.draw_calls += 1;
            report.indices += batch.index_range.len() as u32;
        }
        Ok(report)
    }

    /// Copies the plan's geometry and per-draw opacity into GPU buffers.
    fn upload_plan(&mut self, plan: &FramePlan) {
        let device = &self.gpu.device;
        let queue = &self.gpu.queue;

        let vertex_bytes: &[u8] = bytemuck::cast_slice(&plan.vertices);
        self.vertex_buffer.ensure(device, vertex_bytes.len() as u64);
        let index_bytes: &[u8] = bytemuck::cast_slice(&plan.indices);
        self.index_buffer.ensure(device, index_bytes.len() as u64);

        let mut params = vec![0u8; plan.batches.len() * DRAW_PARAMS_STRIDE as usize];
        for (slot, batch) in plan.batches.iter().enumerate() {
            let start = slot * DRAW_PARAMS_STRIDE as usize;
            let draw = DrawParams::new(batch.opacity);
            let bytes = bytemuck::bytes_of(&draw);
            params[start..start + bytes.len()].copy_from_slice(bytes);
        }
        if self.draw_params.ensure(device, params.len() as u64) || self.draw_bind_group.is_none() {
            self.draw_bind_group = self.draw_params.buffer.as_ref().map(|buffer| {
                device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("Draw Params Bind Group"),
                    layout: &self.draw_bind_group_layout,
                    entries: &[wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                            buffer,
                            offset: 0,
                            size: wgpu::BufferSize::new(size_of::<DrawParams>() as u64),
                        }),
                    }],
                })
            });
        }

        if let Some(buffer) = &self.vertex_buffer.buffer {
            queue.write_buffer(buffer, 0, vertex_bytes);
        }
        if let Some(buffer) = &self.index_buffer.buffer {
            queue.write_buffer(buffer, 0, index_bytes);
        }
        if let Some(buffer) = &self.draw_params.buffer {
            queue.write_buffer(buffer, 0, &params);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::error::Live2DError;
    use crate::gpu::{GpuContext, test_context};
    use crate::model::loader::fixtures::write_bundle;
    use crate::model::moc::SpriteCore;
    use crate::model::{
        BlendMode, Canvas, CoreLoader, Drawable, ModelCore, ParameterInfo, ParameterTable, TextureImage,
    };
    use crate::renderer::{RenderPassTarget, Renderer, ViewSize};

    const COLOR: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
    const DEPTH: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

    fn target(device: &wgpu::Device, size: ViewSize, format: wgpu::TextureFormat) -> wgpu::TextureView {
        device
            .create_texture(&wgpu::TextureDescriptor {
                label: Some("test target"),
                size: wgpu::Extent3d {
                    width: size.width,
                    height: size.height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format,
                usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                view_formats: &[],
            })
            .create_view(&wgpu::TextureViewDescriptor::default())
    }

    fn color_target(device: &wgpu::Device, size: ViewSize) -> wgpu::TextureView {
        target(device, size, COLOR)
    }

    /// Submits the encoder and fails on any validation error it produced.
    fn submit_checked(gpu: &GpuContext, encoder: wgpu::CommandEncoder) {
        gpu.device.push_error_scope(wgpu::ErrorFilter::Validation);
        gpu.queue.submit([encoder.finish()]);
        let err = pollster::block_on(gpu.device.pop_error_scope());
        assert!(err.is_none(), "validation error: {err:?}");
    }

    /// Draws the first sprite page three times, once per blend mode.
    struct BlendedCore {
        sprite: SpriteCore,
        drawables: Vec<Drawable>,
    }

    impl ModelCore for BlendedCore {
        fn parameters(&self) -> &[ParameterInfo] {
            self.sprite.parameters()
        }

        fn canvas(&self) -> Canvas {
            self.sprite.canvas()
        }

        fn update(&mut self, params: &ParameterTable) {
            self.sprite.update(params);
            let Some(base) = self.sprite.drawables().first().cloned() else {
                self.drawables.clear();
                return;
            };
            self.drawables = [BlendMode::Normal, BlendMode::Additive, BlendMode::Multiplicative]
                .into_iter()
                .enumerate()
                .map(|(i, blend)| Drawable {
                    id: format!("{}_{i}", base.id),
                    blend,
                    render_order: i as i32,
                    ..base.clone()
                })
                .collect();
        }

        fn drawables(&self) -> &[Drawable] {
            &self.drawables
        }
    }

    struct BlendedLoader;

    impl CoreLoader for BlendedLoader {
        fn load(&self, _moc: &[u8], textures: &[TextureImage]) -> Result<Box<dyn ModelCore>, String> {
            let mut core = BlendedCore {
                sprite: SpriteCore::new(textures),
                drawables: Vec::new(),
            };
            let defaults = ParameterTable::new(core.parameters());
            core.update(&defaults);
            Ok(Box::new(core))
        }
    }

    #[test]
    fn rejects_depth_as_color() {
        let Some(gpu) = test_context() else { return };
        let err = Renderer::new(gpu, DEPTH, DEPTH).err().unwrap();
        assert!(matches!(err, Live2DError::RendererInitializationFailed { .. }));
    }

    #[test]
    fn renders_clear_pass_without_model() {
        let Some(gpu) = test_context() else { return };
        let mut renderer = Renderer::new(gpu.clone(), COLOR, DEPTH).unwrap();
        let size = ViewSize::new(16, 16);
        let view = color_target(&gpu.device, size);

        let mut encoder = gpu.device.create_command_encoder(&Default::default());
        let report = renderer
            .render(&mut encoder, None, &RenderPassTarget::clear(&view, wgpu::Color::BLACK), size)
            .unwrap();
        gpu.queue.submit([encoder.finish()]);

        assert!(report.encoded_pass);
        assert_eq!(report.draw_calls, 0);
    }

    #[test]
    fn draws_loaded_model() {
        let Some(gpu) = test_context() else { return };
        let dir = tempfile::tempdir().unwrap();
        let mut renderer = Renderer::new(gpu.clone(), COLOR, DEPTH).unwrap();
        renderer.load_model(write_bundle(dir.path(), "haru")).unwrap();
        renderer.update_animations(1.0 / 60.0);

        let size = ViewSize::new(32, 48);
        let view = color_target(&gpu.device, size);
        let mut encoder = gpu.device.create_command_encoder(&Default::default());
        let report = renderer
            .render(&mut encoder, Some(&view), &RenderPassTarget::default(), size)
            .unwrap();
        gpu.queue.submit([encoder.finish()]);

        assert_eq!(report.draw_calls, 1);
        assert_eq!(report.indices, 6);
        assert_eq!(renderer.view_size(), size);
    }

    #[test]
    fn missing_target_and_empty_size() {
        let Some(gpu) = test_context() else { return };
        let mut renderer = Renderer::new(gpu.clone(), COLOR, DEPTH).unwrap();
        let mut encoder = gpu.device.create_command_encoder(&Default::default());

        let skipped = renderer
            .render(&mut encoder, None, &RenderPassTarget::default(), ViewSize::new(0, 10))
            .unwrap();
        assert!(!skipped.encoded_pass);

        let err = renderer
            .render(&mut encoder, None, &RenderPassTarget::default(), ViewSize::new(8, 8))
            .unwrap_err();
        assert!(matches!(err, Live2DError::MissingRenderTarget));
    }

    #[test]
    fn resize_animate_render_in_order() {
        let Some(gpu) = test_context() else { return };
        let dir = tempfile::tempdir().unwrap();
        let mut renderer = Renderer::new(gpu.clone(), COLOR, DEPTH).unwrap();
        renderer.load_model(write_bundle(dir.path(), "haru")).unwrap();

        let size = ViewSize::new(40, 30);
        renderer.update_size(size);
        renderer.update_animations(1.0 / 60.0);
        let view = color_target(&gpu.device, size);
        let mut encoder = gpu.device.create_command_encoder(&Default::default());
        let report = renderer
            .render(&mut encoder, None, &RenderPassTarget::clear(&view, wgpu::Color::WHITE), size)
            .unwrap();
        submit_checked(&gpu, encoder);

        assert!(report.encoded_pass);
        assert_eq!(report.draw_calls, 1);
        assert_eq!(renderer.view_size(), size);
    }

    #[test]
    fn uses_caller_depth_attachment() {
        let Some(gpu) = test_context() else { return };
        let dir = tempfile::tempdir().unwrap();
        let mut renderer = Renderer::new(gpu.clone(), COLOR, DEPTH).unwrap();
        renderer.load_model(write_bundle(dir.path(), "haru")).unwrap();

        let size = ViewSize::new(24, 24);
        let color = color_target(&gpu.device, size);
        let depth = target(&gpu.device, size, DEPTH);
        let pass = RenderPassTarget {
            color: Some(&color),
            depth: Some(&depth),
            clear_color: None,
        };
        let mut encoder = gpu.device.create_command_encoder(&Default::default());
        let report = renderer.render(&mut encoder, None, &pass, size).unwrap();
        submit_checked(&gpu, encoder);

        assert_eq!(report.draw_calls, 1);
        assert!(renderer.depth.is_none());
    }

    #[test]
    fn view_size_smaller_or_larger_than_target() {
        let Some(gpu) = test_context() else { return };
        let dir = tempfile::tempdir().unwrap();
        let mut renderer = Renderer::new(gpu.clone(), COLOR, DEPTH).unwrap();
        renderer.load_model(write_bundle(dir.path(), "haru")).unwrap();
        let view = color_target(&gpu.device, ViewSize::new(64, 64));

        for size in [ViewSize::new(32, 32), ViewSize::new(128, 96)] {
            let mut encoder = gpu.device.create_command_encoder(&Default::default());
            let report = renderer
                .render(&mut encoder, Some(&view), &RenderPassTarget::default(), size)
                .unwrap();
            submit_checked(&gpu, encoder);

            assert_eq!(report.draw_calls, 1);
            assert_eq!(renderer.view_size(), size);
            assert_eq!(renderer.depth.as_ref().map(|d| d.size), Some(ViewSize::new(64, 64)));
        }
    }

    #[test]
    fn draws_through_every_blend_pipeline() {
        let Some(gpu) = test_context() else { return };
        let dir = tempfile::tempdir().unwrap();
        let mut renderer = Renderer::new(gpu.clone(), COLOR, DEPTH).unwrap();
        renderer.bridge_mut().set_core_loader(Box::new(BlendedLoader));
        renderer.load_model(write_bundle(dir.path(), "haru")).unwrap();

        let size = ViewSize::new(16, 16);
        let view = color_target(&gpu.device, size);
        let mut encoder = gpu.device.create_command_encoder(&Default::default());
        let report = renderer
            .render(&mut encoder, None, &RenderPassTarget::clear(&view, wgpu::Color::BLACK), size)
            .unwrap();
        submit_checked(&gpu, encoder);

        assert_eq!(report.draw_calls, 3);
        assert_eq!(report.indices, 18);
    }
}
