use super::CameraState;

/// Turns pointer input into camera moves: drag to pan, wheel to zoom.
pub struct CameraController {
    state: CameraState,
    dragging: bool,
    last_mouse_pos: Option<(f64, f64)>,
}

impl CameraController {
    pub fn new(state: CameraState) -> Self {
        Self {
            state,
            dragging: false,
            last_mouse_pos: None,
        }
    }

    pub fn state(&self) -> &CameraState {
        &self.state
    }

    pub fn on_mouse_button(&mut self, button: winit::event::MouseButton, pressed: bool) {
        if matches!(button, winit::event::MouseButton::Left | winit::event::MouseButton::Middle) {
            self.dragging = pressed;
            if !pressed {
                self.last_mouse_pos = None;
            }
        }
    }

    /// `viewport` is the window size in pixels. Returns true when the camera moved.
    pub fn on_mouse_move(&mut self, position: (f64, f64), viewport: (u32, u32)) -> bool {
        if !self.dragging {
            self.last_mouse_pos = None;
            return false;
        }
        let moved = match self.last_mouse_pos {
            Some(last) if viewport.1 > 0 => {
                // Two view units span the window height.
                let scale = 2.0 / viewport.1 as f64;
                let dx = (position.0 - last.0) * scale;
                let dy = -(position.1 - last.1) * scale;
                self.state.pan_by(dx as f32, dy as f32);
                true
            }
            _ => false,
        };
        self.last_mouse_pos = Some(position);
        moved
    }

    pub fn on_scroll(&mut self, lines: f32) {
        self.state.zoom_by(1.0 + lines * 0.1);
    }

    pub fn reset(&mut self) {
        self.state.reset();
        self.last_mouse_pos = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use winit::event::MouseButton;

    #[test]
    fn drag_pans_in_view_units() {
        let mut controller = CameraController::new(CameraState::default());
        assert!(!controller.on_mouse_move((0.0, 0.0), (200, 100)));

        controller.on_mouse_button(MouseButton::Left, true);
        assert!(!controller.on_mouse_move((10.0, 10.0), (200, 100)));
        assert!(controller.on_mouse_move((60.0, 35.0), (200, 100)));
        assert_eq!(controller.state().pan, [1.0, -0.5]);

        controller.on_mouse_button(MouseButton::Left, false);
        assert!(!controller.on_mouse_move((90.0, 90.0), (200, 100)));

        controller.reset();
        assert_eq!(controller.state().pan, [0.0, 0.0]);
    }

    #[test]
    fn scroll_zooms() {
        let mut controller = CameraController::new(CameraState::default());
        controller.on_scroll(5.0);
        assert_eq!(controller.state().zoom, 1.5);
    }
}
