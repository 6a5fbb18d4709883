//! Edit line input mapping and output rendering.
//!
//! - **keymapper**: Decoded keys to edit actions, per terminal kind
//! - **renderer**: Echo, erase, and cursor positioning output

pub mod keymapper;
pub mod renderer;

pub use keymapper::{EditAction, KeyMapper};
pub use renderer::Renderer;
