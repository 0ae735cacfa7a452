pub mod bridge;
pub mod delegate;

pub use bridge::{LoadedModel, ModelBridge};
pub use delegate::{DelegateSlot, ModelDelegate};
