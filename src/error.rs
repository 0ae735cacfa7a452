use std::io;
use std::path::{Path, PathBuf};

/// Everything that can go wrong between a model bundle on disk and a frame on the GPU.
#[derive(Debug, thiserror::Error)]
pub enum Live2DError {
    #[error("model file not found: {}", path.display())]
    ModelNotFound { path: PathBuf },

    #[error("failed to parse {}: {source}", path.display())]
    ModelParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("unsupported model format in {}: {reason}", path.display())]
    UnsupportedFormat { path: PathBuf, reason: String },

    #[error("model load failed: {reason}")]
    ModelLoadFailed { reason: String },

    #[error("failed to load texture {}: {source}", path.display())]
    TextureLoadFailed {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("renderer initialization failed: {reason}")]
    RendererInitializationFailed { reason: String },

    #[error("unknown expression '{name}'")]
    InvalidExpression { name: String },

    #[error("no motion {index} in group '{group}'")]
    InvalidMotion { group: String, index: usize },

    #[error("no model loaded")]
    NoModelLoaded,

    #[error("render pass has no color target")]
    MissingRenderTarget,

    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

impl Live2DError {
    pub fn renderer_init(reason: impl ToString) -> Self {
        Live2DError::RendererInitializationFailed {
            reason: reason.to_string(),
        }
    }

    /// A missing file becomes `ModelNotFound`; any other io failure stays `Io`.
    pub fn read_failed(path: &Path, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Live2DError::ModelNotFound {
                path: path.to_path_buf(),
            },
            _ => Live2DError::Io(err),
        }
    }

    pub fn load_failed(reason: impl ToString) -> Self {
        Live2DError::ModelLoadFailed {
            reason: reason.to_string(),
        }
    }

    /// Errors caused by the asset bundle itself rather than by the caller.
    pub fn is_asset_error(&self) -> bool {
        matches!(
            self,
            Live2DError::ModelNotFound { .. }
                | Live2DError::ModelParse { .. }
                | Live2DError::UnsupportedFormat { .. }
                | Live2DError::ModelLoadFailed { .. }
                | Live2DError::TextureLoadFailed { .. }
        )
    }
}

impl From<wgpu::RequestAdapterError> for Live2DError {
    fn from(err: wgpu::RequestAdapterError) -> Self {
        Live2DError::renderer_init(err)
    }
}

impl From<wgpu::RequestDeviceError> for Live2DError {
    fn from(err: wgpu::RequestDeviceError) -> Self {
        Live2DError::renderer_init(err)
    }
}

impl From<wgpu::CreateSurfaceError> for Live2DError {
    fn from(err: wgpu::CreateSurfaceError) -> Self {
        Live2DError::renderer_init(err)
    }
}

pub type Result<T> = std::result::Result<T, Live2DError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asset_errors_are_classified() {
        let err = Live2DError::ModelNotFound {
            path: PathBuf::from("missing.model3.json"),
        };
        assert!(err.is_asset_error());
        assert!(err.to_string().contains("missing.model3.json"));

        assert!(!Live2DError::NoModelLoaded.is_asset_error());
        assert!(!Live2DError::renderer_init("bad format").is_asset_error());
    }

    #[test]
    fn only_missing_files_read_as_not_found() {
        let path = Path::new("haru.moc3");
        let missing = Live2DError::read_failed(path, io::Error::from(io::ErrorKind::NotFound));
        assert!(matches!(missing, Live2DError::ModelNotFound { ref path } if path.ends_with("haru.moc3")));

        let denied = Live2DError::read_failed(path, io::Error::from(io::ErrorKind::PermissionDenied));
        assert!(matches!(denied, Live2DError::Io(ref e) if e.kind() == io::ErrorKind::PermissionDenied));
    }

    #[test]
    fn io_errors_convert() {
        let err: Live2DError = io::Error::new(io::ErrorKind::PermissionDenied, "nope").into();
        assert!(matches!(err, Live2DError::Io(_)));
    }
}
