//! Seam to the moc runtime. The Cubism core itself is a closed SDK, so everything
//! the bridge needs from it goes through [`ModelCore`]; [`SpriteCoreLoader`] is the
//! built-in stand-in that draws each texture page as a posable sprite.

use super::parameter::{ParameterInfo, ParameterTable};
use super::texture::TextureImage;
use crate::renderer::vertex::Live2DVertex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlendMode {
    #[default]
    Normal,
    Additive,
    Multiplicative,
}

/// One mesh as the core exposes it after the last update, in model space.
#[derive(Debug, Clone)]
pub struct Drawable {
    pub id: String,
    pub texture_index: usize,
    pub vertices: Vec<Live2DVertex>,
    pub indices: Vec<u16>,
    pub opacity: f32,
    pub blend: BlendMode,
    pub render_order: i32,
}

impl Drawable {
    pub fn is_visible(&self) -> bool {
        self.opacity > 0.0 && !self.indices.is_empty() && !self.vertices.is_empty()
    }
}

/// Size of the model canvas in model units, centred on the origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Canvas {
    pub width: f32,
    pub height: f32,
}

pub trait ModelCore {
    fn parameters(&self) -> &[ParameterInfo];
    fn canvas(&self) -> Canvas;
    /// Re-evaluates the meshes from the current parameter values.
    fn update(&mut self, params: &ParameterTable);
    fn drawables(&self) -> &[Drawable];
}

pub trait CoreLoader {
    /// Builds a core from moc bytes. The error string says what was wrong with the data.
    fn load(&self, moc: &[u8], textures: &[TextureImage]) -> Result<Box<dyn ModelCore>, String>;
}

pub const MOC3_MAGIC: &[u8; 4] = b"MOC3";
pub const MOC3_LATEST_VERSION: u8 = 5;

/// Checks the moc3 header and returns its version byte.
pub fn check_moc3_header(moc: &[u8]) -> Result<u8, String> {
    if moc.len() < 8 {
        return Err(format!("moc file too short ({} bytes)", moc.len()));
    }
    if &moc[..4] != MOC3_MAGIC {
        return Err("missing MOC3 magic".to_string());
    }
    match moc[4] {
        0 => Err("moc version 0 is invalid".to_string()),
        v if v > MOC3_LATEST_VERSION => Err(format!("moc version {v} is newer than supported")),
        v => Ok(v),
    }
}

/// Standard Cubism parameter ids with their usual ranges.
pub fn standard_parameters() -> Vec<ParameterInfo> {
    vec![
        ParameterInfo::new("ParamAngleX", -30.0, 30.0, 0.0),
        ParameterInfo::new("ParamAngleY", -30.0, 30.0, 0.0),
        ParameterInfo::new("ParamAngleZ", -30.0, 30.0, 0.0),
        ParameterInfo::new("ParamEyeLOpen", 0.0, 1.0, 1.0),
        ParameterInfo::new("ParamEyeROpen", 0.0, 1.0, 1.0),
        ParameterInfo::new("ParamEyeLSmile", 0.0, 1.0, 0.0),
        ParameterInfo::new("ParamEyeRSmile", 0.0, 1.0, 0.0),
        ParameterInfo::new("ParamEyeBallX", -1.0, 1.0, 0.0),
        ParameterInfo::new("ParamEyeBallY", -1.0, 1.0, 0.0),
        ParameterInfo::new("ParamBrowLY", -1.0, 1.0, 0.0),
        ParameterInfo::new("ParamBrowRY", -1.0, 1.0, 0.0),
        ParameterInfo::new("ParamMouthForm", -1.0, 1.0, 0.0),
        ParameterInfo::new("ParamMouthOpenY", 0.0, 1.0, 0.0),
        ParameterInfo::new("ParamCheek", 0.0, 1.0, 0.0),
        ParameterInfo::new("ParamBodyAngleX", -10.0, 10.0, 0.0),
        ParameterInfo::new("ParamBodyAngleY", -10.0, 10.0, 0.0),
        ParameterInfo::new("ParamBodyAngleZ", -10.0, 10.0, 0.0),
        ParameterInfo::new("ParamBreath", 0.0, 1.0, 0.0),
    ]
}

#[derive(Debug, Default)]
pub struct SpriteCoreLoader;

impl CoreLoader for SpriteCoreLoader {
    fn load(&self, moc: &[u8], textures: &[TextureImage]) -> Result<Box<dyn ModelCore>, String> {
        let version = check_moc3_header(moc)?;
        log::debug!("moc3 version {}, {} texture pages", version, textures.len());
        Ok(Box::new(SpriteCore::new(textures)))
    }
}

#[derive(Debug, Clone, Copy)]
struct Page {
    half_width: f32,
    half_height: f32,
}

/// One quad per texture page, posed by the head/body angle and breath parameters.
pub struct SpriteCore {
    parameters: Vec<ParameterInfo>,
    pages: Vec<Page>,
    drawables: Vec<Drawable>,
    canvas: Canvas,
}

impl SpriteCore {
    pub fn new(textures: &[TextureImage]) -> Self {
        let pages: Vec<Page> = textures
            .iter()
            .map(|t| Page {
                half_width: t.aspect(),
                half_height: 1.0,
            })
            .collect();
        let width = pages
            .iter()
            .map(|p| p.half_width * 2.0)
            .fold(0.0_f32, f32::max)
            .max(f32::EPSILON);

        let mut core = Self {
            parameters: standard_parameters(),
            drawables: Vec::with_capacity(pages.len()),
            pages,
            canvas: Canvas { width, height: 2.0 },
        };
        let defaults = ParameterTable::new(&core.parameters);
        core.update(&defaults);
        core
    }
}

impl ModelCore for SpriteCore {
    fn parameters(&self) -> &[ParameterInfo] {
        &self.parameters
    }

    fn canvas(&self) -> Canvas {
        self.canvas
    }

    fn update(&mut self, params: &ParameterTable) {
        let get = |id: &str| params.get(id).unwrap_or(0.0);
        let offset_x = get("ParamAngleX") / 30.0 * 0.05 + get("ParamBodyAngleX") / 10.0 * 0.03;
        let offset_y = get("ParamAngleY") / 30.0 * 0.05;
        let (sin, cos) = (get("ParamAngleZ") * 0.25).to_radians().sin_cos();
        let stretch = 1.0 + 0.01 * get("ParamBreath");

        self.drawables.clear();
        for (i, page) in self.pages.iter().enumerate() {
            let corners = [
                (-1.0, 1.0, 0.0, 0.0),
                (1.0, 1.0, 1.0, 0.0),
                (1.0, -1.0, 1.0, 1.0),
                (-1.0, -1.0, 0.0, 1.0),
            ];
            let vertices = corners
                .iter()
                .map(|&(sx, sy, u, v)| {
                    let x = sx * page.half_width;
                    let y = sy * page.half_height * stretch;
                    let rx = x * cos - y * sin + offset_x * page.half_width;
                    let ry = x * sin + y * cos + offset_y;
                    Live2DVertex::new(rx, ry, u, v)
                })
                .collect();

            self.drawables.push(Drawable {
                id: format!("Sprite{i}"),
                texture_index: i,
                vertices,
                indices: vec![0, 1, 2, 0, 2, 3],
                opacity: 1.0,
                blend: BlendMode::Normal,
                render_order: i as i32,
            });
        }
    }

    fn drawables(&self) -> &[Drawable] {
        &self.drawables
    }
}
