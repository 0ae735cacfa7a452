pub mod effects;
pub mod expression;
pub mod loader;
pub mod moc;
pub mod motion;
pub mod parameter;
pub mod runtime;
pub mod settings;
pub mod texture;

pub use expression::{Expression, ExpressionBlend};
pub use loader::{LoadedBundle, load_bundle};
pub use moc::{BlendMode, Canvas, CoreLoader, Drawable, ModelCore, SpriteCoreLoader};
pub use motion::{Motion, MotionPriority};
pub use parameter::{ParameterInfo, ParameterTable};
pub use runtime::{ModelRuntime, NEUTRAL_EXPRESSION};
pub use settings::{Layout, ModelSettings};
pub use texture::TextureImage;
