use nalgebra_glm as glm;

/// Per-frame transform block, bound at group 0 binding 0.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct FrameUniforms {
    pub model_matrix: [[f32; 4]; 4],
    pub view_matrix: [[f32; 4]; 4],
    pub projection_matrix: [[f32; 4]; 4],
}

impl FrameUniforms {
    pub fn new(model: &glm::Mat4, view: &glm::Mat4, projection: &glm::Mat4) -> Self {
        Self {
            model_matrix: to_columns(model),
            view_matrix: to_columns(view),
            projection_matrix: to_columns(projection),
        }
    }

    /// `projection * view * model`, the order the vertex shader applies them in.
    pub fn model_view_projection(&self) -> glm::Mat4 {
        from_columns(&self.projection_matrix)
            * from_columns(&self.view_matrix)
            * from_columns(&self.model_matrix)
    }

    /// Maps a model-space point to clip space.
    pub fn transform(&self, position: [f32; 4]) -> [f32; 4] {
        let p = self.model_view_projection() * glm::vec4(position[0], position[1], position[2], position[3]);
        [p.x, p.y, p.z, p.w]
    }
}

/// nalgebra stores matrices column-major, which is also what WGSL expects.
fn to_columns(m: &glm::Mat4) -> [[f32; 4]; 4] {
    let mut out = [[0.0; 4]; 4];
    for (c, column) in out.iter_mut().enumerate() {
        for (r, value) in column.iter_mut().enumerate() {
            *value = m[(r, c)];
        }
    }
    out
}

fn from_columns(cols: &[[f32; 4]; 4]) -> glm::Mat4 {
    glm::Mat4::from_fn(|r, c| cols[c][r])
}
