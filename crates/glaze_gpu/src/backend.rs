//! The render-backend seam
//!
//! The canvas pipeline never talks to a GPU API directly; it drives a
//! `RenderBackend`, which covers exactly what one primitive draw needs:
//! compile a depth-specialized program, upload a texture, issue one quad
//! draw with a full uniform snapshot, and move pixels in and out of the
//! target. `WgpuBackend` implements it against wgpu; `RecordingBackend`
//! implements it as a call log for tests and headless assertions.

use glaze_core::{ImageData, Mat3, Mat4};
use smallvec::SmallVec;

use crate::error::BackendError;
use crate::shaders::ProgramDescriptor;

/// Handle to a compiled depth-specialized shader program.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ProgramId(pub u32);

/// Handle to an uploaded GPU texture.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextureId(pub u32);

/// How the unit quad is drawn.
///
/// wgpu has no triangle-fan or line-loop topology; `Fill` is a 4-vertex
/// triangle strip covering the quad and `Outline` is a 5-vertex line
/// strip closing the loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QuadTopology {
    Fill,
    Outline,
}

/// The complete uniform snapshot for one draw call.
///
/// `transforms` carries every transform-stack level bottom to top; its
/// length must equal the depth the program was compiled for. The shader
/// applies the levels top-down, so clip position is
/// `projection * levels[0] * ... * levels[len-1] * vertex`.
#[derive(Clone, Debug)]
pub struct DrawUniforms {
    pub transforms: SmallVec<[Mat3; 8]>,
    pub projection: Mat4,
    pub color: [f32; 4],
    pub use_texture: bool,
}

impl DrawUniforms {
    /// Fold the uploaded levels into the single composed transform this
    /// draw applies to the unit quad.
    pub fn composed_transform(&self) -> Mat3 {
        self.transforms
            .iter()
            .fold(Mat3::IDENTITY, |acc, m| acc.multiply(m))
    }
}

/// GPU operations consumed by the canvas draw pipeline.
pub trait RenderBackend {
    /// Compile and link a depth-specialized program.
    ///
    /// Failure is fatal to the enclosing draw: there is no valid program
    /// to return and nothing is cached.
    fn compile_program(&mut self, desc: &ProgramDescriptor) -> Result<ProgramId, BackendError>;

    /// Upload an RGBA8 image as a 2D texture (linear filtering,
    /// clamp-to-edge).
    fn create_texture(&mut self, image: &ImageData) -> Result<TextureId, BackendError>;

    /// Issue one immediate quad draw with the given uniform snapshot.
    fn draw_quad(
        &mut self,
        program: ProgramId,
        uniforms: &DrawUniforms,
        topology: QuadTopology,
        texture: Option<TextureId>,
    ) -> Result<(), BackendError>;

    /// Read a rectangle of target pixels; regions outside the target come
    /// back transparent black.
    fn read_pixels(&mut self, x: u32, y: u32, width: u32, height: u32)
        -> Result<ImageData, BackendError>;

    /// Write pixels into the target at `(x, y)`, clipped to the target.
    fn write_pixels(&mut self, image: &ImageData, x: u32, y: u32) -> Result<(), BackendError>;

    /// Target size in pixels.
    fn size(&self) -> (u32, u32);
}
