//! Headless Canvas Demo
//!
//! Draws a small scene with the 2D canvas API into an offscreen wgpu
//! target and saves the result as a PNG.
//!
//! Features demonstrated:
//! - Fill and stroke rectangles with CSS color styles
//! - Nested save/translate/rotate/restore
//! - Image blits through the texture cache
//! - Pixel read-back from the GPU target
//!
//! Run with: cargo run -p glaze_gpu --example headless_canvas

use std::sync::Arc;

use glaze_core::ImageData;
use glaze_gpu::{Canvas2d, WgpuBackend};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let backend = WgpuBackend::new_blocking(400, 300)?;
    let mut canvas = Canvas2d::new(backend);

    // Background.
    canvas.set_fill_style("#202030");
    canvas.fill_rect(0.0, 0.0, 400.0, 300.0)?;

    // A row of rotated squares.
    canvas.set_fill_style("rgba(255, 160, 40, 0.9)");
    canvas.set_stroke_style("#ffffff");
    for i in 0..5 {
        canvas.save();
        canvas.translate(60.0 + i as f32 * 70.0, 150.0);
        canvas.rotate(i as f32 * 0.3);
        canvas.fill_rect(-25.0, -25.0, 50.0, 50.0)?;
        canvas.stroke_rect(-25.0, -25.0, 50.0, 50.0)?;
        canvas.restore();
    }

    // Blit a procedural checkerboard twice; the second draw reuses the
    // uploaded texture.
    let checker = Arc::new(checkerboard(32, 32, 8));
    canvas.draw_image(&checker, 20.0, 20.0)?;
    canvas.draw_image_scaled(&checker, 340.0, 20.0, 48.0, 48.0)?;
    tracing::info!(
        programs = canvas.program_count(),
        textures = canvas.texture_count(),
        "scene drawn"
    );

    let pixels = canvas.get_image_data(0, 0, 400, 300)?;
    image::save_buffer(
        "headless_canvas.png",
        pixels.data(),
        400,
        300,
        image::ExtendedColorType::Rgba8,
    )?;
    println!("wrote headless_canvas.png");
    Ok(())
}

fn checkerboard(width: u32, height: u32, cell: u32) -> ImageData {
    let mut image = ImageData::new(width, height);
    for y in 0..height {
        for x in 0..width {
            let on = ((x / cell) + (y / cell)) % 2 == 0;
            let value = if on { 230 } else { 60 };
            let i = ((y * width + x) * 4) as usize;
            image.data_mut()[i..i + 4].copy_from_slice(&[value, value, value, 255]);
        }
    }
    image
}
