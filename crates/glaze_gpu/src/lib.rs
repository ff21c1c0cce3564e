//! Glaze GPU Canvas
//!
//! Retained 2D canvas semantics on an immediate-mode wgpu pipeline.
//!
//! # Features
//!
//! - **Canvas2d**: fill/stroke rectangles, image blits, transform
//!   save/restore with HTML-canvas call shapes
//! - **Depth-specialized shaders**: one WGSL program per transform-stack
//!   depth, compiled on first use and cached for the canvas lifetime
//! - **Texture cache**: identity-keyed, upload-once image textures
//! - **Pluggable backends**: a real wgpu backend for rendering and a
//!   recording backend for headless assertions

pub mod backend;
pub mod canvas;
pub mod error;
pub mod pool;
pub mod recording;
pub mod renderer;
pub mod shaders;
pub mod texture;

pub use backend::{DrawUniforms, ProgramId, QuadTopology, RenderBackend, TextureId};
pub use canvas::Canvas2d;
pub use error::{BackendError, CanvasError};
pub use pool::ProgramPool;
pub use recording::{RecordedDraw, RecordingBackend};
pub use renderer::WgpuBackend;
pub use shaders::ProgramDescriptor;
pub use texture::TextureCache;
