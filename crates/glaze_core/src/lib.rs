//! Glaze core
//!
//! CPU-side foundations for the glaze 2D-over-GPU drawing stack:
//!
//! - **Matrix math**: column-major `Mat3`/`Mat4` value types
//! - **Transform stack**: save/restore nesting with lazy composition
//!   caching behind a validity cursor
//! - **Path accumulation**: subpath lists built by the canvas path API
//! - **Color & style**: CSS-style color parsing and canvas style state
//! - **Pixel buffers**: RGBA8 `ImageData` for image sources and read-back
//!
//! This crate has no GPU dependencies; `glaze_gpu` builds the draw
//! pipeline on top of it.

pub mod color;
pub mod image;
pub mod matrix;
pub mod path;
pub mod stack;
pub mod style;

pub use color::{Color, ColorParseError};
pub use image::{ImageData, ImageDataError};
pub use matrix::{Mat3, Mat4};
pub use path::{PathState, SubPath};
pub use stack::TransformStack;
pub use style::{ColorStyle, CosmeticStyle, DrawState};
