//! Recording backend
//!
//! Implements [`RenderBackend`] as a call log plus a CPU pixel surface.
//! Nothing is rasterized; draws are recorded with their full uniform
//! snapshots so tests (and headless tooling) can assert on exactly what
//! would reach the GPU: which program, which topology, which texture,
//! which composed transform.

use glaze_core::ImageData;

use crate::backend::{DrawUniforms, ProgramId, QuadTopology, RenderBackend, TextureId};
use crate::error::BackendError;
use crate::shaders::ProgramDescriptor;

/// One recorded `draw_quad` call.
#[derive(Clone, Debug)]
pub struct RecordedDraw {
    pub program: ProgramId,
    pub uniforms: DrawUniforms,
    pub topology: QuadTopology,
    pub texture: Option<TextureId>,
}

/// A [`RenderBackend`] that records instead of rendering.
#[derive(Debug)]
pub struct RecordingBackend {
    width: u32,
    height: u32,
    compiled_depths: Vec<usize>,
    texture_sizes: Vec<(u32, u32)>,
    draws: Vec<RecordedDraw>,
    surface: ImageData,
    fail_next_compile: bool,
}

impl RecordingBackend {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            compiled_depths: Vec::new(),
            texture_sizes: Vec::new(),
            draws: Vec::new(),
            surface: ImageData::new(width, height),
            fail_next_compile: false,
        }
    }

    /// Depths compiled so far, in call order.
    pub fn compiled_depths(&self) -> &[usize] {
        &self.compiled_depths
    }

    /// Number of texture uploads.
    pub fn texture_uploads(&self) -> usize {
        self.texture_sizes.len()
    }

    /// Sizes of uploaded textures, in upload order.
    pub fn texture_sizes(&self) -> &[(u32, u32)] {
        &self.texture_sizes
    }

    /// All recorded draws, in call order.
    pub fn draws(&self) -> &[RecordedDraw] {
        &self.draws
    }

    /// Make the next `compile_program` fail, for exercising the fatal
    /// error path.
    pub fn fail_next_compile(&mut self) {
        self.fail_next_compile = true;
    }
}

impl RenderBackend for RecordingBackend {
    fn compile_program(&mut self, desc: &ProgramDescriptor) -> Result<ProgramId, BackendError> {
        if self.fail_next_compile {
            self.fail_next_compile = false;
            return Err(BackendError::ShaderCompile(
                "forced failure (recording backend)".into(),
            ));
        }
        self.compiled_depths.push(desc.depth);
        Ok(ProgramId(self.compiled_depths.len() as u32 - 1))
    }

    fn create_texture(&mut self, image: &ImageData) -> Result<TextureId, BackendError> {
        self.texture_sizes.push((image.width(), image.height()));
        Ok(TextureId(self.texture_sizes.len() as u32 - 1))
    }

    fn draw_quad(
        &mut self,
        program: ProgramId,
        uniforms: &DrawUniforms,
        topology: QuadTopology,
        texture: Option<TextureId>,
    ) -> Result<(), BackendError> {
        self.draws.push(RecordedDraw {
            program,
            uniforms: uniforms.clone(),
            topology,
            texture,
        });
        Ok(())
    }

    fn read_pixels(
        &mut self,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    ) -> Result<ImageData, BackendError> {
        let mut out = ImageData::new(width, height);
        let copy_w = width.min(self.width.saturating_sub(x)) as usize;
        let copy_h = height.min(self.height.saturating_sub(y)) as usize;
        let src_stride = self.width as usize * 4;
        let dst_stride = width as usize * 4;
        for row in 0..copy_h {
            let src = (y as usize + row) * src_stride + x as usize * 4;
            let dst = row * dst_stride;
            out.data_mut()[dst..dst + copy_w * 4]
                .copy_from_slice(&self.surface.data()[src..src + copy_w * 4]);
        }
        Ok(out)
    }

    fn write_pixels(&mut self, image: &ImageData, x: u32, y: u32) -> Result<(), BackendError> {
        let copy_w = (image.width().min(self.width.saturating_sub(x))) as usize;
        let copy_h = (image.height().min(self.height.saturating_sub(y))) as usize;
        let src_stride = image.width() as usize * 4;
        let dst_stride = self.width as usize * 4;
        for row in 0..copy_h {
            let src = row * src_stride;
            let dst = (y as usize + row) * dst_stride + x as usize * 4;
            self.surface.data_mut()[dst..dst + copy_w * 4]
                .copy_from_slice(&image.data()[src..src + copy_w * 4]);
        }
        Ok(())
    }

    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}
