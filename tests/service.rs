mod common;

use std::cell::RefCell;
use std::sync::Arc;

use live2d_wgpu::{GpuContext, Live2DError, Live2DService, ModelInfo, ServiceConfig, ServiceDelegate, ViewSize};

#[derive(Default)]
struct Observer {
    loaded: RefCell<Vec<ModelInfo>>,
    expressions: RefCell<Vec<String>>,
    lip_sync: RefCell<Vec<f32>>,
}

impl ServiceDelegate for Observer {
    fn did_load_model(&self, model: &ModelInfo) {
        self.loaded.borrow_mut().push(model.clone());
    }

    fn did_update_expression(&self, expression: &str) {
        self.expressions.borrow_mut().push(expression.to_string());
    }

    fn did_update_lip_sync(&self, value: f32) {
        self.lip_sync.borrow_mut().push(value);
    }
}

fn gpu() -> Option<Arc<GpuContext>> {
    match pollster::block_on(GpuContext::headless()) {
        Ok(gpu) => Some(Arc::new(gpu)),
        Err(err) => {
            eprintln!("skipping: {err}");
            None
        }
    }
}

fn config(root: &std::path::Path) -> ServiceConfig {
    ServiceConfig {
        asset_root: root.to_path_buf(),
        color_format: wgpu::TextureFormat::Rgba8Unorm,
        ..ServiceConfig::default()
    }
}

#[test]
fn service_loads_by_name_and_forwards_notifications() {
    let Some(gpu) = gpu() else { return };
    let dir = tempfile::tempdir().unwrap();
    common::write_model(&dir.path().join("mao"), "mao");

    let mut service = Live2DService::new(gpu, config(dir.path())).unwrap();
    let observer = Arc::new(Observer::default());
    let delegate: Arc<dyn ServiceDelegate> = observer.clone();
    service.set_delegate(Some(&delegate));

    let info = service.load_model("mao").unwrap();
    assert_eq!(info.name, "mao");
    assert_eq!(info.expressions, vec!["neutral", "happy", "sad"]);
    assert_eq!(info.current_expression, "neutral");
    assert_eq!(info.texture_count, 1);
    assert_eq!(*observer.loaded.borrow(), vec![info]);

    service.update_expression("sad").unwrap();
    assert_eq!(*observer.expressions.borrow(), vec!["sad".to_string()]);
    assert_eq!(service.model_info().unwrap().current_expression, "sad");

    let level = service.update_lip_sync_from_samples(&[0.5; 32]).unwrap();
    assert!((level - 0.5).abs() < 1e-6);
    service.stop_lip_sync().unwrap();
    assert_eq!(*observer.lip_sync.borrow(), vec![level, 0.0]);

    let err = service.load_model("ghost").unwrap_err();
    assert!(matches!(err, Live2DError::ModelNotFound { .. }));
    assert_eq!(observer.loaded.borrow().len(), 1);
    assert_eq!(service.model_info().unwrap().name, "mao");
}

#[test]
fn service_renders_at_view_size() {
    let Some(gpu) = gpu() else { return };
    let dir = tempfile::tempdir().unwrap();
    let path = common::write_model(dir.path(), "mao");

    let mut service = Live2DService::new(gpu.clone(), config(dir.path())).unwrap();
    service.load_model_path(&path).unwrap();
    service.update(1.0 / 60.0);

    let size = ViewSize::new(64, 64);
    service.update_view_size(size);
    let target = gpu
        .device
        .create_texture(&wgpu::TextureDescriptor {
            label: Some("service target"),
            size: wgpu::Extent3d {
                width: size.width,
                height: size.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        })
        .create_view(&wgpu::TextureViewDescriptor::default());

    let mut encoder = gpu.device.create_command_encoder(&Default::default());
    let report = service.render(&mut encoder, &target).unwrap();
    gpu.queue.submit([encoder.finish()]);

    assert!(report.encoded_pass);
    assert_eq!(report.draw_calls, 1);
    assert_eq!(service.renderer().view_size(), size);
}

#[test]
fn service_rejects_unusable_formats() {
    let Some(gpu) = gpu() else { return };
    let dir = tempfile::tempdir().unwrap();
    let config = ServiceConfig {
        depth_format: wgpu::TextureFormat::Rgba8Unorm,
        ..config(dir.path())
    };
    let err = Live2DService::new(gpu, config).err().unwrap();
    assert!(matches!(err, Live2DError::RendererInitializationFailed { .. }));
}
