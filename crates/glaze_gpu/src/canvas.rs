//! The canvas draw pipeline
//!
//! `Canvas2d` re-expresses retained-mode 2D drawing calls as immediate
//! GPU quad draws. Every rectangle and image blit is the same unit quad,
//! mapped into place by one extra transform-stack level pushed around the
//! draw: push, translate to the origin, scale to the size, upload every
//! level plus projection and color, draw, pop. The program servicing the
//! draw is specialized for the stack depth at that moment and comes from
//! the compile-once pool.
//!
//! All caches (program pool, texture cache, quad geometry) are owned by
//! the canvas instance; nothing is shared process-wide.

use std::sync::Arc;

use glaze_core::{Color, DrawState, ImageData, Mat3, Mat4, PathState, TransformStack};
use smallvec::SmallVec;

use crate::backend::{DrawUniforms, QuadTopology, RenderBackend, TextureId};
use crate::error::CanvasError;
use crate::pool::ProgramPool;
use crate::texture::TextureCache;

/// A 2D canvas drawing into a [`RenderBackend`].
pub struct Canvas2d<B: RenderBackend> {
    backend: B,
    transforms: TransformStack,
    path: PathState,
    state: DrawState,
    pool: ProgramPool,
    textures: TextureCache,
    projection: Mat4,
    width: u32,
    height: u32,
}

impl<B: RenderBackend> Canvas2d<B> {
    /// Wrap a backend; the projection is derived once from its pixel size.
    pub fn new(backend: B) -> Self {
        let (width, height) = backend.size();
        Self {
            backend,
            transforms: TransformStack::new(),
            path: PathState::new(),
            state: DrawState::new(),
            pool: ProgramPool::new(),
            textures: TextureCache::new(),
            projection: Mat4::orthographic_2d(width as f32, height as f32),
            width,
            height,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// The recorded path state (never rasterized).
    pub fn path(&self) -> &PathState {
        &self.path
    }

    /// Current transform-stack depth (0 = base level only).
    pub fn transform_depth(&self) -> usize {
        self.transforms.depth()
    }

    /// The composed current transform.
    pub fn current_transform(&mut self) -> Mat3 {
        self.transforms.composed()
    }

    /// Number of distinct shader programs compiled so far.
    pub fn program_count(&self) -> usize {
        self.pool.len()
    }

    /// Number of distinct images uploaded so far.
    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    // === Styles ===

    /// Set the fill color from a CSS-style string.
    ///
    /// An unparseable value leaves the current style untouched, matching
    /// canvas behavior.
    pub fn set_fill_style(&mut self, css: &str) {
        match Color::parse(css) {
            Ok(color) => self.state.fill.set(color),
            Err(err) => tracing::warn!(%err, "ignoring invalid fillStyle"),
        }
    }

    /// Normalized fill color string.
    pub fn fill_style(&self) -> &str {
        &self.state.fill.css
    }

    /// Set the stroke color from a CSS-style string; invalid values are
    /// ignored.
    pub fn set_stroke_style(&mut self, css: &str) {
        match Color::parse(css) {
            Ok(color) => self.state.stroke.set(color),
            Err(err) => tracing::warn!(%err, "ignoring invalid strokeStyle"),
        }
    }

    /// Normalized stroke color string.
    pub fn stroke_style(&self) -> &str {
        &self.state.stroke.css
    }

    /// Set the line width; zero, negative and non-finite values are
    /// ignored as the canvas spec requires.
    pub fn set_line_width(&mut self, width: f32) {
        if width.is_finite() && width > 0.0 {
            self.state.line_width = width;
        }
    }

    pub fn line_width(&self) -> f32 {
        self.state.line_width
    }

    /// Stored-but-inert cosmetic attributes (`lineCap`, `shadowBlur`,
    /// `font`, ...). Writing them has no rendering effect.
    pub fn cosmetic(&self) -> &glaze_core::CosmeticStyle {
        &self.state.cosmetic
    }

    pub fn cosmetic_mut(&mut self) -> &mut glaze_core::CosmeticStyle {
        &mut self.state.cosmetic
    }

    pub fn set_line_cap(&mut self, value: &str) {
        self.state.cosmetic.line_cap = Some(value.to_string());
    }

    pub fn set_shadow_blur(&mut self, value: f32) {
        self.state.cosmetic.shadow_blur = Some(value);
    }

    pub fn set_font(&mut self, value: &str) {
        self.state.cosmetic.font = Some(value.to_string());
    }

    // === Transforms ===

    /// Push a transform level. Style state is not snapshotted: `restore`
    /// rolls back the transform only.
    pub fn save(&mut self) {
        self.transforms.push(None);
    }

    /// Pop a transform level; without a matching `save` this is a silent
    /// no-op.
    pub fn restore(&mut self) {
        self.transforms.pop();
    }

    pub fn translate(&mut self, x: f32, y: f32) {
        self.transforms.translate(x, y);
    }

    pub fn rotate(&mut self, angle: f32) {
        self.transforms.rotate(angle);
    }

    pub fn scale(&mut self, sx: f32, sy: f32) {
        self.transforms.scale(sx, sy);
    }

    /// Compose a canvas `transform(a, b, c, d, e, f)` matrix onto the
    /// current transform. This is a true affine multiply.
    pub fn transform(&mut self, a: f32, b: f32, c: f32, d: f32, e: f32, f: f32) {
        self.transforms.apply(Mat3::from_affine(a, b, c, d, e, f));
    }

    /// Replace the current transform outright.
    pub fn set_transform(&mut self, a: f32, b: f32, c: f32, d: f32, e: f32, f: f32) {
        self.transforms.set_matrix(Mat3::from_affine(a, b, c, d, e, f));
    }

    // === Rectangles ===

    /// Fill an axis-aligned rectangle under the current transform.
    ///
    /// Negative sizes mirror the quad, zero sizes degenerate it; both are
    /// passed straight through to the scale level.
    pub fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32) -> Result<(), CanvasError> {
        let color = self.state.fill.color.to_array();
        self.draw_unit_quad(x, y, width, height, color, QuadTopology::Fill, None)
    }

    /// Outline an axis-aligned rectangle under the current transform.
    pub fn stroke_rect(
        &mut self,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    ) -> Result<(), CanvasError> {
        let color = self.state.stroke.color.to_array();
        self.draw_unit_quad(x, y, width, height, color, QuadTopology::Outline, None)
    }

    // === Paths (state only; never rasterized) ===

    pub fn begin_path(&mut self) {
        self.path.begin();
    }

    pub fn move_to(&mut self, x: f32, y: f32) {
        self.path.move_to(x, y);
    }

    pub fn line_to(&mut self, x: f32, y: f32) {
        self.path.line_to(x, y);
    }

    pub fn close_path(&mut self) {
        self.path.close();
    }

    pub fn rect(&mut self, x: f32, y: f32, width: f32, height: f32) {
        self.path.rect(x, y, width, height);
    }

    /// Path fill is not implemented; the subpath list is retained but
    /// nothing is drawn.
    pub fn fill(&mut self) {
        tracing::trace!("path fill is a no-op");
    }

    /// Path stroke is not implemented; the subpath list is retained but
    /// nothing is drawn.
    pub fn stroke(&mut self) {
        tracing::trace!("path stroke is a no-op");
    }

    // === Images ===

    /// Blit an image at its natural size.
    pub fn draw_image(
        &mut self,
        image: &Arc<ImageData>,
        dx: f32,
        dy: f32,
    ) -> Result<(), CanvasError> {
        let (w, h) = (image.width() as f32, image.height() as f32);
        self.draw_image_scaled(image, dx, dy, w, h)
    }

    /// Blit an image stretched to `(dw, dh)`.
    pub fn draw_image_scaled(
        &mut self,
        image: &Arc<ImageData>,
        dx: f32,
        dy: f32,
        dw: f32,
        dh: f32,
    ) -> Result<(), CanvasError> {
        let texture = self.textures.get_or_create(&mut self.backend, image)?;
        self.draw_unit_quad(
            dx,
            dy,
            dw,
            dh,
            [1.0, 1.0, 1.0, 1.0],
            QuadTopology::Fill,
            Some(texture),
        )
    }

    /// The 9-argument source-rectangle form is not supported. The call is
    /// accepted and ignored; no state is touched.
    #[allow(clippy::too_many_arguments)]
    pub fn draw_image_region(
        &mut self,
        _image: &Arc<ImageData>,
        _sx: f32,
        _sy: f32,
        _sw: f32,
        _sh: f32,
        _dx: f32,
        _dy: f32,
        _dw: f32,
        _dh: f32,
    ) -> Result<(), CanvasError> {
        tracing::warn!("9-argument drawImage is not supported; call ignored");
        Ok(())
    }

    // === Pixel access ===

    /// A zero-filled RGBA buffer of the requested size.
    pub fn create_image_data(&self, width: u32, height: u32) -> ImageData {
        ImageData::new(width, height)
    }

    /// Read target pixels; regions outside the canvas come back
    /// transparent black.
    pub fn get_image_data(
        &mut self,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
    ) -> Result<ImageData, CanvasError> {
        Ok(self.backend.read_pixels(x, y, width, height)?)
    }

    /// Write pixels into the target, untransformed, clipped to the canvas.
    pub fn put_image_data(
        &mut self,
        image: &ImageData,
        dx: u32,
        dy: u32,
    ) -> Result<(), CanvasError> {
        Ok(self.backend.write_pixels(image, dx, dy)?)
    }

    // === Pipeline core ===

    /// Draw the unit quad mapped to `(x, y, w, h)` under the current
    /// stack.
    ///
    /// The program is requested for `stack.len() + 1` levels: every
    /// current level plus the rect's own translate/scale level pushed
    /// here. The push/pop pair is symmetric on every path out, including
    /// a failed draw, so a fatal compile error never skews later draws.
    fn draw_unit_quad(
        &mut self,
        x: f32,
        y: f32,
        w: f32,
        h: f32,
        color: [f32; 4],
        topology: QuadTopology,
        texture: Option<TextureId>,
    ) -> Result<(), CanvasError> {
        let depth = self.transforms.len() + 1;
        let program = self.pool.get_or_compile(&mut self.backend, depth)?;

        self.transforms.push(None);
        self.transforms.translate(x, y);
        self.transforms.scale(w, h);

        let uniforms = DrawUniforms {
            transforms: SmallVec::from_slice(self.transforms.levels()),
            projection: self.projection,
            color,
            use_texture: texture.is_some(),
        };
        let result = self.backend.draw_quad(program, &uniforms, topology, texture);
        self.transforms.pop();
        result.map_err(CanvasError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::RecordingBackend;

    fn canvas() -> Canvas2d<RecordingBackend> {
        Canvas2d::new(RecordingBackend::new(800, 600))
    }

    #[test]
    fn test_fill_rect_uniform_snapshot() {
        let mut ctx = canvas();
        ctx.set_fill_style("rgba(255, 0, 0, 1)");
        ctx.fill_rect(0.0, 0.0, 100.0, 50.0).unwrap();

        let draws = ctx.backend().draws();
        assert_eq!(draws.len(), 1);
        let draw = &draws[0];
        assert_eq!(draw.topology, QuadTopology::Fill);
        assert_eq!(draw.uniforms.color, [1.0, 0.0, 0.0, 1.0]);
        assert!(!draw.uniforms.use_texture);
        // The composed transform maps the unit quad's far corner onto the
        // rectangle's far corner.
        let m = draw.uniforms.composed_transform();
        assert_eq!(m.transform_point(1.0, 1.0), (100.0, 50.0));
        assert_eq!(m.transform_point(0.0, 0.0), (0.0, 0.0));
    }

    #[test]
    fn test_stroke_rect_uses_stroke_color_and_outline() {
        let mut ctx = canvas();
        ctx.set_stroke_style("#00ff00");
        ctx.stroke_rect(5.0, 5.0, 10.0, 10.0).unwrap();

        let draw = &ctx.backend().draws()[0];
        assert_eq!(draw.topology, QuadTopology::Outline);
        assert_eq!(draw.uniforms.color, [0.0, 1.0, 0.0, 1.0]);
    }

    #[test]
    fn test_draw_restores_stack_depth() {
        let mut ctx = canvas();
        ctx.save();
        ctx.translate(10.0, 10.0);
        ctx.fill_rect(0.0, 0.0, 1.0, 1.0).unwrap();
        assert_eq!(ctx.transform_depth(), 1);
        ctx.restore();
        assert_eq!(ctx.transform_depth(), 0);
    }

    #[test]
    fn test_program_depth_follows_stack() {
        let mut ctx = canvas();
        ctx.fill_rect(0.0, 0.0, 1.0, 1.0).unwrap();
        ctx.fill_rect(1.0, 1.0, 1.0, 1.0).unwrap();
        // Both draws at base depth share one program (len 1 + quad level).
        assert_eq!(ctx.backend().compiled_depths(), &[2]);

        ctx.save();
        ctx.fill_rect(0.0, 0.0, 1.0, 1.0).unwrap();
        assert_eq!(ctx.backend().compiled_depths(), &[2, 3]);
        ctx.restore();

        ctx.fill_rect(0.0, 0.0, 1.0, 1.0).unwrap();
        assert_eq!(ctx.program_count(), 2);
    }

    #[test]
    fn test_uniform_level_count_matches_program_depth() {
        let mut ctx = canvas();
        ctx.save();
        ctx.save();
        ctx.fill_rect(0.0, 0.0, 1.0, 1.0).unwrap();
        let draw = &ctx.backend().draws()[0];
        assert_eq!(draw.uniforms.transforms.len(), 4);
    }

    #[test]
    fn test_restore_without_save_is_ignored() {
        let mut ctx = canvas();
        ctx.restore();
        ctx.restore();
        assert_eq!(ctx.transform_depth(), 0);
        ctx.fill_rect(0.0, 0.0, 1.0, 1.0).unwrap();
        assert_eq!(ctx.backend().draws().len(), 1);
    }

    #[test]
    fn test_transform_is_true_affine_composition() {
        let mut ctx = canvas();
        ctx.set_transform(2.0, 0.0, 0.0, 2.0, 10.0, 20.0);
        ctx.fill_rect(0.0, 0.0, 1.0, 1.0).unwrap();
        let m = ctx.backend().draws()[0].uniforms.composed_transform();
        assert_eq!(m.transform_point(1.0, 1.0), (12.0, 22.0));

        ctx.transform(1.0, 0.0, 0.0, 1.0, 5.0, 0.0);
        ctx.fill_rect(0.0, 0.0, 1.0, 1.0).unwrap();
        let m = ctx.backend().draws()[1].uniforms.composed_transform();
        // The new translation applies inside the scaled frame.
        assert_eq!(m.transform_point(0.0, 0.0), (20.0, 20.0));
    }

    #[test]
    fn test_translate_then_scale_composition_order() {
        let mut ctx = canvas();
        ctx.translate(10.0, 0.0);
        ctx.scale(2.0, 2.0);
        ctx.fill_rect(0.0, 0.0, 1.0, 1.0).unwrap();
        let m = ctx.backend().draws()[0].uniforms.composed_transform();
        assert_eq!(m.transform_point(0.0, 0.0), (10.0, 0.0));
        assert_eq!(m.transform_point(1.0, 1.0), (12.0, 2.0));
    }

    #[test]
    fn test_negative_and_zero_sizes_pass_through() {
        let mut ctx = canvas();
        ctx.fill_rect(10.0, 10.0, -5.0, 0.0).unwrap();
        let m = ctx.backend().draws()[0].uniforms.composed_transform();
        // Mirrored in x, degenerate in y; no rejection.
        assert_eq!(m.transform_point(1.0, 1.0), (5.0, 10.0));
    }

    #[test]
    fn test_draw_image_texture_flag_does_not_leak() {
        let mut ctx = canvas();
        let image = Arc::new(ImageData::new(4, 2));
        ctx.draw_image(&image, 0.0, 0.0).unwrap();
        ctx.fill_rect(0.0, 0.0, 1.0, 1.0).unwrap();

        let draws = ctx.backend().draws();
        assert!(draws[0].uniforms.use_texture);
        assert!(draws[0].texture.is_some());
        // Natural size scales the quad to 4x2.
        let m = draws[0].uniforms.composed_transform();
        assert_eq!(m.transform_point(1.0, 1.0), (4.0, 2.0));

        assert!(!draws[1].uniforms.use_texture);
        assert!(draws[1].texture.is_none());
    }

    #[test]
    fn test_draw_image_identity_caching() {
        let mut ctx = canvas();
        let a = Arc::new(ImageData::new(4, 4));
        let b = Arc::new(ImageData::new(4, 4));
        ctx.draw_image(&a, 0.0, 0.0).unwrap();
        ctx.draw_image(&a, 10.0, 0.0).unwrap();
        assert_eq!(ctx.texture_count(), 1);
        ctx.draw_image(&b, 20.0, 0.0).unwrap();
        assert_eq!(ctx.texture_count(), 2);
        assert_eq!(ctx.backend().texture_uploads(), 2);
    }

    #[test]
    fn test_draw_image_region_is_inert() {
        let mut ctx = canvas();
        let image = Arc::new(ImageData::new(4, 4));
        ctx.draw_image_region(&image, 0.0, 0.0, 2.0, 2.0, 0.0, 0.0, 8.0, 8.0)
            .unwrap();
        assert!(ctx.backend().draws().is_empty());
        assert_eq!(ctx.texture_count(), 0);
        assert_eq!(ctx.transform_depth(), 0);
    }

    #[test]
    fn test_compile_failure_is_fatal_but_symmetric() {
        let mut ctx = canvas();
        ctx.backend_mut().fail_next_compile();
        assert!(ctx.fill_rect(0.0, 0.0, 1.0, 1.0).is_err());
        assert_eq!(ctx.transform_depth(), 0);
        assert!(ctx.backend().draws().is_empty());

        // The pipeline recovers on the next draw.
        ctx.fill_rect(0.0, 0.0, 1.0, 1.0).unwrap();
        assert_eq!(ctx.backend().draws().len(), 1);
    }

    #[test]
    fn test_invalid_style_is_ignored() {
        let mut ctx = canvas();
        ctx.set_fill_style("#ff0000");
        ctx.set_fill_style("no-such-color");
        assert_eq!(ctx.fill_style(), "rgba(255, 0, 0, 1)");

        ctx.set_line_width(4.0);
        ctx.set_line_width(-1.0);
        ctx.set_line_width(f32::NAN);
        assert_eq!(ctx.line_width(), 4.0);
    }

    #[test]
    fn test_cosmetic_attributes_are_stored_verbatim() {
        let mut ctx = canvas();
        ctx.set_line_cap("round");
        ctx.set_shadow_blur(3.5);
        ctx.set_font("12px sans-serif");
        assert_eq!(ctx.cosmetic().line_cap.as_deref(), Some("round"));
        assert_eq!(ctx.cosmetic().shadow_blur, Some(3.5));
        ctx.fill_rect(0.0, 0.0, 1.0, 1.0).unwrap();
        // No rendering effect: the draw looks like any other fill.
        assert_eq!(ctx.backend().draws().len(), 1);
    }

    #[test]
    fn test_restore_does_not_roll_back_style() {
        let mut ctx = canvas();
        ctx.save();
        ctx.set_fill_style("blue");
        ctx.restore();
        assert_eq!(ctx.fill_style(), "rgba(0, 0, 255, 1)");
    }

    #[test]
    fn test_path_calls_do_not_draw() {
        let mut ctx = canvas();
        ctx.begin_path();
        ctx.move_to(0.0, 0.0);
        ctx.line_to(10.0, 0.0);
        ctx.line_to(10.0, 10.0);
        ctx.close_path();
        ctx.fill();
        ctx.stroke();
        assert!(ctx.backend().draws().is_empty());
        assert_eq!(ctx.path().subpaths().len(), 2);
        assert!(ctx.path().subpaths()[0].closed);
    }

    #[test]
    fn test_image_data_round_trip_through_backend() {
        let mut ctx = canvas();
        let mut image = ctx.create_image_data(2, 2);
        image.data_mut().copy_from_slice(&[42; 16]);
        ctx.put_image_data(&image, 1, 1).unwrap();
        let read = ctx.get_image_data(1, 1, 2, 2).unwrap();
        assert_eq!(read.data(), image.data());
    }
}
