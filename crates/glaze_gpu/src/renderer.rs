//! wgpu render backend
//!
//! Implements [`RenderBackend`] against an offscreen target texture.
//! Every `draw_quad` is one immediate render pass loading the existing
//! contents, so draws land in exactly the order the canvas issues them.
//! Programs are compiled per transform-stack depth from synthesized WGSL
//! (validated with naga before handing it to wgpu), each with a uniform
//! buffer sized for that depth and a fill/outline pipeline pair sharing
//! the shader module.

use std::borrow::Cow;
use std::sync::Arc;

use glaze_core::ImageData;
use wgpu::util::DeviceExt;

use crate::backend::{DrawUniforms, ProgramId, QuadTopology, RenderBackend, TextureId};
use crate::error::BackendError;
use crate::shaders::{self, ProgramDescriptor};

/// Interleaved quad vertex: position in unit-quad space plus UV.
#[repr(C)]
#[derive(Clone, Copy, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct Vertex {
    position: [f32; 2],
    uv: [f32; 2],
}

const fn vertex(x: f32, y: f32) -> Vertex {
    Vertex {
        position: [x, y],
        uv: [x, y],
    }
}

/// Unit quad as a triangle strip.
const FILL_QUAD: [Vertex; 4] = [
    vertex(0.0, 0.0),
    vertex(1.0, 0.0),
    vertex(0.0, 1.0),
    vertex(1.0, 1.0),
];

/// Unit quad outline as a closed line strip.
const OUTLINE_QUAD: [Vertex; 5] = [
    vertex(0.0, 0.0),
    vertex(1.0, 0.0),
    vertex(1.0, 1.0),
    vertex(0.0, 1.0),
    vertex(0.0, 0.0),
];

/// One depth-specialized program with its GPU resources.
struct ProgramVariant {
    depth: usize,
    fill_pipeline: wgpu::RenderPipeline,
    outline_pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
}

/// [`RenderBackend`] drawing into an offscreen wgpu texture.
pub struct WgpuBackend {
    #[allow(dead_code)]
    instance: wgpu::Instance,
    #[allow(dead_code)]
    adapter: wgpu::Adapter,
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    target: wgpu::Texture,
    target_view: wgpu::TextureView,
    width: u32,
    height: u32,
    uniform_layout: wgpu::BindGroupLayout,
    texture_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    sampler: wgpu::Sampler,
    /// 1x1 white texture bound for untextured draws.
    placeholder_bind_group: wgpu::BindGroup,
    fill_vertices: wgpu::Buffer,
    outline_vertices: wgpu::Buffer,
    programs: Vec<ProgramVariant>,
    textures: Vec<wgpu::BindGroup>,
}

/// Linear, unmultiplied 8-bit RGBA. Not sRGB: `putImageData` bytes must
/// read back unchanged through `getImageData`.
const TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

impl WgpuBackend {
    /// Preferred backend for the current platform; initializing a single
    /// driver stack keeps memory down.
    fn preferred_backends() -> wgpu::Backends {
        #[cfg(target_os = "macos")]
        {
            wgpu::Backends::METAL
        }
        #[cfg(target_os = "windows")]
        {
            wgpu::Backends::DX12
        }
        #[cfg(target_os = "linux")]
        {
            wgpu::Backends::VULKAN
        }
        #[cfg(target_arch = "wasm32")]
        {
            wgpu::Backends::BROWSER_WEBGPU | wgpu::Backends::GL
        }
        #[cfg(not(any(
            target_os = "macos",
            target_os = "windows",
            target_os = "linux",
            target_arch = "wasm32"
        )))]
        {
            wgpu::Backends::PRIMARY
        }
    }

    /// Create a backend with a `width` x `height` offscreen target.
    pub async fn new(width: u32, height: u32) -> Result<Self, BackendError> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: Self::preferred_backends(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or(BackendError::AdapterNotFound)?;

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Glaze GPU Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: wgpu::MemoryHints::MemoryUsage,
                },
                None,
            )
            .await?;

        let device = Arc::new(device);
        let queue = Arc::new(queue);

        let target = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Canvas Target"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TARGET_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::COPY_SRC
                | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let target_view = target.create_view(&wgpu::TextureViewDescriptor::default());

        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Canvas Uniform Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Canvas Texture Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Canvas Pipeline Layout"),
            bind_group_layouts: &[&uniform_layout, &texture_layout],
            push_constant_ranges: &[],
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Canvas Image Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        let placeholder = device.create_texture_with_data(
            &queue,
            &wgpu::TextureDescriptor {
                label: Some("Placeholder Texture"),
                size: wgpu::Extent3d {
                    width: 1,
                    height: 1,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: TARGET_FORMAT,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            &[255, 255, 255, 255],
        );
        let placeholder_view = placeholder.create_view(&wgpu::TextureViewDescriptor::default());
        let placeholder_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Placeholder Texture Bind Group"),
            layout: &texture_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&placeholder_view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
            ],
        });

        let fill_vertices = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Unit Quad (fill)"),
            contents: bytemuck::cast_slice(&FILL_QUAD),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let outline_vertices = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Unit Quad (outline)"),
            contents: bytemuck::cast_slice(&OUTLINE_QUAD),
            usage: wgpu::BufferUsages::VERTEX,
        });

        tracing::debug!(width, height, "wgpu canvas backend ready");

        Ok(Self {
            instance,
            adapter,
            device,
            queue,
            target,
            target_view,
            width,
            height,
            uniform_layout,
            texture_layout,
            pipeline_layout,
            sampler,
            placeholder_bind_group,
            fill_vertices,
            outline_vertices,
            programs: Vec::new(),
            textures: Vec::new(),
        })
    }

    /// Blocking wrapper around [`WgpuBackend::new`].
    pub fn new_blocking(width: u32, height: u32) -> Result<Self, BackendError> {
        pollster::block_on(Self::new(width, height))
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// The offscreen target texture.
    pub fn target(&self) -> &wgpu::Texture {
        &self.target
    }

    fn build_pipeline(
        &self,
        module: &wgpu::ShaderModule,
        topology: wgpu::PrimitiveTopology,
        label: &str,
    ) -> wgpu::RenderPipeline {
        let blend_state = wgpu::BlendState {
            color: wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::SrcAlpha,
                dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
                operation: wgpu::BlendOperation::Add,
            },
            alpha: wgpu::BlendComponent {
                src_factor: wgpu::BlendFactor::One,
                dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
                operation: wgpu::BlendOperation::Add,
            },
        };

        let vertex_layout = wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    format: wgpu::VertexFormat::Float32x2,
                    offset: 0,
                    shader_location: 0,
                },
                wgpu::VertexAttribute {
                    format: wgpu::VertexFormat::Float32x2,
                    offset: 8,
                    shader_location: 1,
                },
            ],
        };

        self.device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(&self.pipeline_layout),
                vertex: wgpu::VertexState {
                    module,
                    entry_point: Some("vs_main"),
                    buffers: &[vertex_layout],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                },
                fragment: Some(wgpu::FragmentState {
                    module,
                    entry_point: Some("fs_main"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: TARGET_FORMAT,
                        blend: Some(blend_state),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                }),
                primitive: wgpu::PrimitiveState {
                    topology,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    unclipped_depth: false,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    conservative: false,
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState {
                    count: 1,
                    mask: !0,
                    alpha_to_coverage_enabled: false,
                },
                multiview: None,
                cache: None,
            })
    }
}

impl RenderBackend for WgpuBackend {
    fn compile_program(&mut self, desc: &ProgramDescriptor) -> Result<ProgramId, BackendError> {
        // Validate with naga first: wgpu treats bad shader source as a
        // device-level error, while the pipeline contract needs a plain
        // fatal Result.
        let module = naga::front::wgsl::parse_str(&desc.wgsl)
            .map_err(|e| BackendError::ShaderCompile(e.emit_to_string(&desc.wgsl)))?;
        naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::all(),
        )
        .validate(&module)
        .map_err(|e| BackendError::ShaderCompile(format!("{e:?}")))?;

        let shader = self
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(&desc.label),
                source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(&desc.wgsl)),
            });

        let uniform_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&format!("Canvas Uniforms (depth {})", desc.depth)),
            size: shaders::uniform_block_size(desc.depth),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let uniform_bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("Canvas Uniform Bind Group (depth {})", desc.depth)),
            layout: &self.uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let fill_pipeline = self.build_pipeline(
            &shader,
            wgpu::PrimitiveTopology::TriangleStrip,
            &format!("Canvas Fill Pipeline (depth {})", desc.depth),
        );
        let outline_pipeline = self.build_pipeline(
            &shader,
            wgpu::PrimitiveTopology::LineStrip,
            &format!("Canvas Outline Pipeline (depth {})", desc.depth),
        );

        self.programs.push(ProgramVariant {
            depth: desc.depth,
            fill_pipeline,
            outline_pipeline,
            uniform_buffer,
            uniform_bind_group,
        });
        tracing::debug!(depth = desc.depth, "compiled canvas program");
        Ok(ProgramId(self.programs.len() as u32 - 1))
    }

    fn create_texture(&mut self, image: &ImageData) -> Result<TextureId, BackendError> {
        let texture = self.device.create_texture_with_data(
            &self.queue,
            &wgpu::TextureDescriptor {
                label: Some("Canvas Image"),
                size: wgpu::Extent3d {
                    width: image.width().max(1),
                    height: image.height().max(1),
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: TARGET_FORMAT,
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            image.data(),
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Canvas Image Bind Group"),
            layout: &self.texture_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        });
        self.textures.push(bind_group);
        Ok(TextureId(self.textures.len() as u32 - 1))
    }

    fn draw_quad(
        &mut self,
        program: ProgramId,
        uniforms: &DrawUniforms,
        topology: QuadTopology,
        texture: Option<TextureId>,
    ) -> Result<(), BackendError> {
        let variant = &self.programs[program.0 as usize];
        debug_assert_eq!(
            uniforms.transforms.len(),
            variant.depth,
            "uniform level count must match program depth"
        );

        let words = shaders::pack_draw_uniforms(uniforms);
        self.queue
            .write_buffer(&variant.uniform_buffer, 0, bytemuck::cast_slice(&words));

        let texture_bind_group = match texture {
            Some(id) => &self.textures[id.0 as usize],
            None => &self.placeholder_bind_group,
        };

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Canvas Draw"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Canvas Draw Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &self.target_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            match topology {
                QuadTopology::Fill => {
                    pass.set_pipeline(&variant.fill_pipeline);
                    pass.set_vertex_buffer(0, self.fill_vertices.slice(..));
                }
                QuadTopology::Outline => {
                    pass.set_pipeline(&variant.outline_pipeline);
                    pass.set_vertex_buffer(0, self.outline_vertices.slice(..));
                }
            }
            pass.set_bind_group(0, &variant.uniform_bind_group, &[]);
            pass.set_bind_group(1, texture_bind_group, &[]);
            let vertex_count = match topology {
                QuadTopology::Fill => 4,
                QuadTopology::Outline => 5,
            };
            pass.draw(0..vertex_count, 0..1);
        }
        self.queue.submit(Some(encoder.finish()));
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
        let copy_w = width.min(self.width.saturating_sub(x));
        let copy_h = height.min(self.height.saturating_sub(y));
        if copy_w == 0 || copy_h == 0 {
            return Ok(out);
        }

        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let row_bytes = copy_w * 4;
        let padded_row_bytes = row_bytes.div_ceil(align) * align;

        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Canvas Read-back"),
            size: padded_row_bytes as u64 * copy_h as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Canvas Read-back"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::ImageCopyTexture {
                texture: &self.target,
                mip_level: 0,
                origin: wgpu::Origin3d { x, y, z: 0 },
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::ImageCopyBuffer {
                buffer: &buffer,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_row_bytes),
                    rows_per_image: Some(copy_h),
                },
            },
            wgpu::Extent3d {
                width: copy_w,
                height: copy_h,
                depth_or_array_layers: 1,
            },
        );
        self.queue.submit(Some(encoder.finish()));

        let slice = buffer.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        self.device.poll(wgpu::Maintain::Wait);
        rx.recv()
            .map_err(|_| BackendError::ReadBack("map callback dropped".into()))?
            .map_err(|e| BackendError::ReadBack(e.to_string()))?;

        {
            let mapped = slice.get_mapped_range();
            let dst_stride = width as usize * 4;
            for row in 0..copy_h as usize {
                let src = row * padded_row_bytes as usize;
                let dst = row * dst_stride;
                out.data_mut()[dst..dst + row_bytes as usize]
                    .copy_from_slice(&mapped[src..src + row_bytes as usize]);
            }
        }
        buffer.unmap();
        Ok(out)
    }

    fn write_pixels(&mut self, image: &ImageData, x: u32, y: u32) -> Result<(), BackendError> {
        let copy_w = image.width().min(self.width.saturating_sub(x));
        let copy_h = image.height().min(self.height.saturating_sub(y));
        if copy_w == 0 || copy_h == 0 {
            return Ok(());
        }

        self.queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &self.target,
                mip_level: 0,
                origin: wgpu::Origin3d { x, y, z: 0 },
                aspect: wgpu::TextureAspect::All,
            },
            image.data(),
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(image.width() * 4),
                rows_per_image: Some(image.height()),
            },
            wgpu::Extent3d {
                width: copy_w,
                height: copy_h,
                depth_or_array_layers: 1,
            },
        );
        Ok(())
    }

    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}
