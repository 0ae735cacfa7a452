use std::ops::Range;

use nalgebra_glm as glm;

use super::camera::CameraState;
use super::target::ViewSize;
use super::uniforms::FrameUniforms;
use super::vertex::Live2DVertex;
use crate::model::{BlendMode, Canvas, Drawable, Layout};

/// One indexed draw against a single texture page.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawBatch {
    pub index_range: Range<u32>,
    pub base_vertex: i32,
    pub texture: usize,
    pub blend: BlendMode,
    pub opacity: f32,
}

/// CPU side of a frame: every visible drawable packed into shared buffers.
#[derive(Debug, Default)]
pub struct FramePlan {
    pub vertices: Vec<Live2DVertex>,
    pub indices: Vec<u16>,
    pub batches: Vec<DrawBatch>,
}

impl FramePlan {
    /// Packs drawables in render order. Drawables that are invisible or point at a
    /// texture page that does not exist are left out.
    pub fn build(drawables: &[Drawable], texture_count: usize, model_opacity: f32) -> Self {
        let mut ordered: Vec<&Drawable> = drawables.iter().collect();
        ordered.sort_by_key(|d| d.render_order);

        let mut plan = FramePlan::default();
        for drawable in ordered {
            if !drawable.is_visible() {
                continue;
            }
            if drawable.texture_index >= texture_count {
                log::warn!(
                    "Drawable {} uses texture {} but only {} are loaded",
                    drawable.id,
                    drawable.texture_index,
                    texture_count
                );
                continue;
            }
            let opacity = (drawable.opacity * model_opacity).clamp(0.0, 1.0);
            if opacity <= 0.0 {
                continue;
            }

            let first = plan.indices.len() as u32;
            let base_vertex = plan.vertices.len() as i32;
            plan.vertices.extend_from_slice(&drawable.vertices);
            plan.indices.extend_from_slice(&drawable.indices);

            plan.batches.push(DrawBatch {
                index_range: first..plan.indices.len() as u32,
                base_vertex,
                texture: drawable.texture_index,
                blend: drawable.blend,
                opacity,
            });
        }

        // Buffer writes must be a multiple of four bytes.
        if plan.indices.len() % 2 == 1 {
            plan.indices.push(0);
        }
        plan
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    pub fn index_count(&self) -> u32 {
        self.batches.iter().map(|b| b.index_range.len() as u32).sum()
    }
}

/// Model matrix from the settings layout: the canvas is scaled to the layout size
/// (two units tall when none is given) and moved to the layout centre.
pub fn model_matrix(layout: &Layout, canvas: Canvas) -> glm::Mat4 {
    let canvas_width = canvas.width.max(f32::EPSILON);
    let canvas_height = canvas.height.max(f32::EPSILON);
    let scale = match (layout.width, layout.height) {
        (Some(width), _) => width / canvas_width,
        (None, Some(height)) => height / canvas_height,
        (None, None) => 2.0 / canvas_height,
    };

    let center_x = layout.center_x.or(layout.x).unwrap_or(0.0);
    let center_y = layout.center_y.or(layout.y).unwrap_or(0.0);

    glm::translation(&glm::vec3(center_x, center_y, 0.0)) * glm::scaling(&glm::vec3(scale, scale, 1.0))
}

/// Orthographic projection showing two units along the shorter side of the view.
pub fn projection_matrix(size: ViewSize) -> glm::Mat4 {
    let aspect = size.aspect();
    let (half_w, half_h) = if aspect >= 1.0 { (aspect, 1.0) } else { (1.0, 1.0 / aspect) };
    glm::ortho_zo(-half_w, half_w, -half_h, half_h, -1.0, 1.0)
}

pub fn frame_uniforms(layout: &Layout, canvas: Canvas, camera: &CameraState, size: ViewSize) -> FrameUniforms {
    FrameUniforms::new(
        &model_matrix(layout, canvas),
        &camera.view_matrix(),
        &projection_matrix(size),
    )
}
