/// Drawable area in physical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ViewSize {
    pub width: u32,
    pub height: u32,
}

impl ViewSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn aspect(&self) -> f32 {
        if self.is_empty() {
            1.0
        } else {
            self.width as f32 / self.height as f32
        }
    }
}

impl From<winit::dpi::PhysicalSize<u32>> for ViewSize {
    fn from(size: winit::dpi::PhysicalSize<u32>) -> Self {
        Self::new(size.width, size.height)
    }
}

/// Attachments and load behaviour for one frame, supplied by the host.
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderPassTarget<'a> {
    /// Used when no explicit output texture is passed to `render`.
    pub color: Option<&'a wgpu::TextureView>,
    /// Must match the renderer's depth format. The renderer keeps its own when absent.
    pub depth: Option<&'a wgpu::TextureView>,
    /// `None` keeps what is already in the color target.
    pub clear_color: Option<wgpu::Color>,
}

impl<'a> RenderPassTarget<'a> {
    pub fn clear(color: &'a wgpu::TextureView, clear_color: wgpu::Color) -> Self {
        Self {
            color: Some(color),
            depth: None,
            clear_color: Some(clear_color),
        }
    }

    pub(crate) fn color_load_op(&self) -> wgpu::LoadOp<wgpu::Color> {
        match self.clear_color {
            Some(color) => wgpu::LoadOp::Clear(color),
            None => wgpu::LoadOp::Load,
        }
    }
}

/// What one `render` call encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameReport {
    pub encoded_pass: bool,
    pub draw_calls: usize,
    pub indices: u32,
}
