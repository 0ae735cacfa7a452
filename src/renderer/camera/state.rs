use nalgebra_glm as glm;

/// 2D view over the model: zoom around the origin, then pan in view units.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraState {
    pub zoom: f32,
    pub pan: [f32; 2],
    pub default_zoom: f32,
    pub default_pan: [f32; 2],
}

impl CameraState {
    pub const MIN_ZOOM: f32 = 0.1;
    pub const MAX_ZOOM: f32 = 10.0;

    pub fn new(zoom: f32, pan: [f32; 2]) -> Self {
        let zoom = zoom.clamp(Self::MIN_ZOOM, Self::MAX_ZOOM);
        Self {
            zoom,
            pan,
            default_zoom: zoom,
            default_pan: pan,
        }
    }

    pub fn reset(&mut self) {
        self.zoom = self.default_zoom;
        self.pan = self.default_pan;
    }

    pub fn zoom_by(&mut self, factor: f32) {
        if factor.is_finite() && factor > 0.0 {
            self.zoom = (self.zoom * factor).clamp(Self::MIN_ZOOM, Self::MAX_ZOOM);
        }
    }

    pub fn pan_by(&mut self, dx: f32, dy: f32) {
        self.pan[0] += dx;
        self.pan[1] += dy;
    }

    pub fn view_matrix(&self) -> glm::Mat4 {
        let translate = glm::translation(&glm::vec3(self.pan[0], self.pan[1], 0.0));
        let scale = glm::scaling(&glm::vec3(self.zoom, self.zoom, 1.0));
        translate * scale
    }
}

impl Default for CameraState {
    fn default() -> Self {
        Self::new(1.0, [0.0, 0.0])
    }
}
