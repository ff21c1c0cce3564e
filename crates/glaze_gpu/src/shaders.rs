//! Depth-parameterized WGSL synthesis
//!
//! A program compiled for depth `d` receives exactly `d` transform-stack
//! levels in a fixed-size uniform array and folds them in an unrolled
//! top-down sequence in the vertex stage. The array length is baked into
//! the shader source, so each distinct stack depth needs its own program;
//! the pool in [`crate::pool`] makes sure each one is compiled once.
//!
//! The uniform block layout here must stay in lockstep with
//! [`pack_draw_uniforms`], which produces the raw words the wgpu backend
//! uploads.

use glaze_core::Mat3;

use crate::backend::DrawUniforms;

/// Source and metadata for one depth-specialized program.
#[derive(Clone, Debug)]
pub struct ProgramDescriptor {
    pub depth: usize,
    pub label: String,
    pub wgsl: String,
}

impl ProgramDescriptor {
    /// Descriptor for a program folding `depth` stacked transforms.
    ///
    /// `depth` must be at least 1.
    pub fn for_depth(depth: usize) -> ProgramDescriptor {
        ProgramDescriptor {
            depth,
            label: format!("canvas program (depth {depth})"),
            wgsl: canvas_shader_source(depth),
        }
    }
}

/// Synthesize the WGSL module for a given transform-stack depth.
///
/// Deterministic: the same depth always yields byte-identical source.
pub fn canvas_shader_source(depth: usize) -> String {
    assert!(depth >= 1, "shader depth must be at least 1");

    let mut unrolled = String::new();
    for level in (0..depth).rev() {
        unrolled.push_str(&format!("    p = uniforms.transforms[{level}] * p;\n"));
    }

    format!(
        r#"// Canvas quad shader, specialized for {depth} stacked transform(s).

struct Uniforms {{
    projection: mat4x4<f32>,
    transforms: array<mat3x3<f32>, {depth}>,
    color: vec4<f32>,
    // x: use_texture
    flags: vec4<f32>,
}}

@group(0) @binding(0) var<uniform> uniforms: Uniforms;
@group(1) @binding(0) var image_texture: texture_2d<f32>;
@group(1) @binding(1) var image_sampler: sampler;

struct VertexInput {{
    @location(0) position: vec2<f32>,
    @location(1) uv: vec2<f32>,
}}

struct VertexOutput {{
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
}}

@vertex
fn vs_main(in: VertexInput) -> VertexOutput {{
    var out: VertexOutput;
    // Fold the stack top-down; levels arrive bottom-to-top in the array.
    var p = vec3<f32>(in.position, 1.0);
{unrolled}    out.position = uniforms.projection * vec4<f32>(p.xy, 0.0, 1.0);
    out.uv = in.uv;
    return out;
}}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {{
    let texel = textureSample(image_texture, image_sampler, in.uv);
    return select(uniforms.color, texel, uniforms.flags.x > 0.5);
}}
"#
    )
}

/// Byte size of the uniform block for a given depth.
///
/// mat4x4 projection (64) + `depth` mat3x3 at stride 48 + color (16) +
/// flags (16).
pub fn uniform_block_size(depth: usize) -> u64 {
    (96 + 48 * depth) as u64
}

/// Pack a uniform snapshot into the exact word layout of the WGSL
/// `Uniforms` block: mat3x3 columns are padded to vec4 per WGSL rules.
pub fn pack_draw_uniforms(uniforms: &DrawUniforms) -> Vec<f32> {
    let mut words = Vec::with_capacity(24 + 12 * uniforms.transforms.len());
    words.extend_from_slice(&uniforms.projection.0);
    for level in &uniforms.transforms {
        push_mat3(&mut words, level);
    }
    words.extend_from_slice(&uniforms.color);
    words.extend_from_slice(&[
        if uniforms.use_texture { 1.0 } else { 0.0 },
        0.0,
        0.0,
        0.0,
    ]);
    words
}

fn push_mat3(words: &mut Vec<f32>, m: &Mat3) {
    for col in 0..3 {
        words.extend_from_slice(&m.0[col * 3..col * 3 + 3]);
        words.push(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glaze_core::Mat4;
    use smallvec::smallvec;

    #[test]
    fn test_source_is_deterministic() {
        assert_eq!(canvas_shader_source(3), canvas_shader_source(3));
        assert_ne!(canvas_shader_source(1), canvas_shader_source(2));
    }

    #[test]
    fn test_source_unrolls_top_down() {
        let src = canvas_shader_source(3);
        assert!(src.contains("array<mat3x3<f32>, 3>"));
        let t2 = src.find("transforms[2]").unwrap();
        let t1 = src.find("transforms[1]").unwrap();
        let t0 = src.find("transforms[0]").unwrap();
        assert!(t2 < t1 && t1 < t0);
    }

    #[test]
    fn test_source_validates_with_naga() {
        for depth in 1..=6 {
            let src = canvas_shader_source(depth);
            let module = naga::front::wgsl::parse_str(&src)
                .unwrap_or_else(|e| panic!("depth {depth}: {}", e.emit_to_string(&src)));
            naga::valid::Validator::new(
                naga::valid::ValidationFlags::all(),
                naga::valid::Capabilities::all(),
            )
            .validate(&module)
            .unwrap_or_else(|e| panic!("depth {depth}: {e:?}"));
        }
    }

    #[test]
    #[should_panic(expected = "depth must be at least 1")]
    fn test_zero_depth_panics() {
        canvas_shader_source(0);
    }

    #[test]
    fn test_pack_matches_block_size() {
        for depth in 1..=4usize {
            let uniforms = DrawUniforms {
                transforms: smallvec![Mat3::IDENTITY; depth],
                projection: Mat4::IDENTITY,
                color: [0.0; 4],
                use_texture: false,
            };
            let words = pack_draw_uniforms(&uniforms);
            assert_eq!(words.len() as u64 * 4, uniform_block_size(depth));
        }
    }

    #[test]
    fn test_pack_layout() {
        let uniforms = DrawUniforms {
            transforms: smallvec![Mat3::translation(7.0, 9.0)],
            projection: Mat4::IDENTITY,
            color: [0.1, 0.2, 0.3, 0.4],
            use_texture: true,
        };
        let words = pack_draw_uniforms(&uniforms);
        // Projection occupies the first 16 words.
        assert_eq!(words[0], 1.0);
        // Each mat3 column is padded to a vec4.
        assert_eq!(&words[16..20], &[1.0, 0.0, 0.0, 0.0]);
        assert_eq!(&words[24..28], &[7.0, 9.0, 1.0, 0.0]);
        // Color, then flags.
        assert_eq!(&words[28..32], &[0.1, 0.2, 0.3, 0.4]);
        assert_eq!(words[32], 1.0);
    }
}
