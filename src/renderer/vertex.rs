/// One vertex of a drawable mesh as the vertex shader consumes it.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Live2DVertex {
    pub position: [f32; 4],
    pub texture_coordinate: [f32; 2],
}

impl Live2DVertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![
        0 => Float32x4,
        1 => Float32x2,
    ];

    /// Affine point (w = 1) in model space.
    pub fn new(x: f32, y: f32, u: f32, v: f32) -> Self {
        Self {
            position: [x, y, 0.0, 1.0],
            texture_coordinate: [u, v],
        }
    }

    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: size_of::<Live2DVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }

    pub fn uv_in_unit_square(&self) -> bool {
        self.texture_coordinate
            .iter()
            .all(|c| (0.0..=1.0).contains(c))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_matches_shader_inputs() {
        assert_eq!(size_of::<Live2DVertex>(), 24);

        let desc = Live2DVertex::desc();
        assert_eq!(desc.array_stride, 24);
        assert_eq!(desc.attributes.len(), 2);
        assert_eq!(desc.attributes[0].format, wgpu::VertexFormat::Float32x4);
        assert_eq!(desc.attributes[1].offset, 16);
        assert_eq!(desc.attributes[1].shader_location, 1);
    }

    #[test]
    fn new_builds_affine_point() {
        let v = Live2DVertex::new(0.5, -0.25, 1.0, 0.0);
        assert_eq!(v.position, [0.5, -0.25, 0.0, 1.0]);
        assert!(v.uv_in_unit_square());
        assert!(!Live2DVertex::new(0.0, 0.0, 1.5, 0.0).uv_in_unit_square());
    }
}
