//! GPU format conversion.
//!
//! Packed frame bytes are uploaded as-is into an `Rgba8Unorm` texture (for
//! 4:2:2 layouts each texel holds one U Y V Y macropixel) plus an `R8Unorm`
//! texture for the UYVA alpha plane. A fullscreen pass then writes linear
//! RGBA into the output image.

use std::sync::Arc;

use bytemuck::{Pod, Zeroable};

use super::{ConvertError, FormatConverter, FramePlan};
use crate::gpu_context::GpuContext;
use crate::ndi::VideoFrame;

/// A converted frame living on the GPU.
#[derive(Debug)]
pub struct GpuImage {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    srgb_view: wgpu::TextureView,
    width: u32,
    height: u32,
}

/// Format to sample a [`GpuImage`] through when rendering into `target`.
///
/// Converted pixels are already gamma encoded. An sRGB target encodes again on
/// write, so the source is decoded on read to cancel it.
pub fn sample_format_for(target: wgpu::TextureFormat) -> wgpu::TextureFormat {
    if target.is_srgb() {
        wgpu::TextureFormat::Rgba8UnormSrgb
    } else {
        GpuImage::FORMAT
    }
}

impl GpuImage {
    /// Storage format of converted images. Views may reinterpret it as sRGB.
    pub const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

    fn new(device: &wgpu::Device, width: u32, height: u32) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("NDI Frame Texture"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC
                | wgpu::TextureUsages::COPY_DST,
            view_formats: &[wgpu::TextureFormat::Rgba8UnormSrgb],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let srgb_view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some("NDI Frame sRGB View"),
            format: Some(wgpu::TextureFormat::Rgba8UnormSrgb),
            ..Default::default()
        });
        Self {
            texture,
            view,
            srgb_view,
            width,
            height,
        }
    }

    pub fn texture(&self) -> &wgpu::Texture {
        &self.texture
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    /// View to sample from when rendering into a `target` format texture.
    pub fn view_for(&self, target: wgpu::TextureFormat) -> &wgpu::TextureView {
        if sample_format_for(target) == GpuImage::FORMAT {
            &self.view
        } else {
            &self.srgb_view
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct ConvertParams {
    mode: u32,
    width: u32,
    height: u32,
    _padding: u32,
}

/// Source textures for one frame geometry.
struct SourceTextures {
    packed_width: u32,
    width: u32,
    height: u32,
    has_alpha: bool,
    packed: wgpu::Texture,
    alpha: wgpu::Texture,
    bind_group: wgpu::BindGroup,
}

impl SourceTextures {
    fn matches(&self, plan: &FramePlan) -> bool {
        self.packed_width == plan.packed_width
            && self.width == plan.width
            && self.height == plan.height
            && self.has_alpha == plan.alpha_offset.is_some()
    }
}

fn source_texture(device: &wgpu::Device, label: &str, width: u32, height: u32, format: wgpu::TextureFormat) -> wgpu::Texture {
    device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    })
}

/// Converts NDI frames to [`GpuImage`]s on the GPU.
pub struct GpuFormatConverter {
    gpu: Arc<GpuContext>,
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    params_buffer: wgpu::Buffer,
    max_dimension: u32,
    sources: Option<SourceTextures>,
    output: Option<Arc<GpuImage>>,
}

impl GpuFormatConverter {
    pub fn new(gpu: Arc<GpuContext>) -> Self {
        let device = &gpu.device;

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("NDI Convert Shader"),
            source: wgpu::ShaderSource::Wgsl(CONVERT_SHADER.into()),
        });

        let plane_entry = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: false },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        };

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("NDI Convert Bind Group Layout"),
            entries: &[
                plane_entry(0),
                plane_entry(1),
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("NDI Convert Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("NDI Convert Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: GpuImage::FORMAT,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let params_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("NDI Convert Params"),
            size: std::mem::size_of::<ConvertParams>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let max_dimension = device.limits().max_texture_dimension_2d;

        Self {
            gpu,
            pipeline,
            bind_group_layout,
            params_buffer,
            max_dimension,
            sources: None,
            output: None,
        }
    }

    /// The image produced by the most recent successful decode.
    pub fn last_output(&self) -> Option<&Arc<GpuImage>> {
        self.output.as_ref()
    }

    fn ensure_sources(&mut self, plan: &FramePlan) {
        if self.sources.as_ref().is_some_and(|s| s.matches(plan)) {
            return;
        }

        let device = &self.gpu.device;
        let packed = source_texture(
            device,
            "NDI Packed Plane",
            plan.packed_width,
            plan.height,
            wgpu::TextureFormat::Rgba8Unorm,
        );
        // Unused for layouts without an alpha plane, but the layout needs a binding.
        let (alpha_width, alpha_height) = if plan.alpha_offset.is_some() {
            (plan.width, plan.height)
        } else {
            (1, 1)
        };
        let alpha = source_texture(
            device,
            "NDI Alpha Plane",
            alpha_width,
            alpha_height,
            wgpu::TextureFormat::R8Unorm,
        );

        let packed_view = packed.create_view(&wgpu::TextureViewDescriptor::default());
        let alpha_view = alpha.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("NDI Convert Bind Group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&packed_view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&alpha_view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: self.params_buffer.as_entire_binding(),
                },
            ],
        });

        tracing::debug!(
            "NDI Convert: Allocated source textures {}x{} ({:?})",
            plan.width,
            plan.height,
            plan.mode
        );

        self.sources = Some(SourceTextures {
            packed_width: plan.packed_width,
            width: plan.width,
            height: plan.height,
            has_alpha: plan.alpha_offset.is_some(),
            packed,
            alpha,
            bind_group,
        });
    }

    fn ensure_output(&mut self, width: u32, height: u32) -> Arc<GpuImage> {
        if let Some(image) = &self.output {
            if image.width == width && image.height == height {
                return image.clone();
            }
        }
        let image = Arc::new(GpuImage::new(&self.gpu.device, width, height));
        self.output = Some(image.clone());
        image
    }

    fn upload(&self, plan: &FramePlan, data: &[u8]) {
        let Some(sources) = &self.sources else { return };
        let queue = &self.gpu.queue;

        let (rows, bytes_per_row) = plan.packed_plane(data);
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &sources.packed,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &rows,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(bytes_per_row),
                rows_per_image: Some(plan.height),
            },
            wgpu::Extent3d {
                width: plan.packed_width,
                height: plan.height,
                depth_or_array_layers: 1,
            },
        );

        if let Some(alpha) = plan.alpha_plane(data) {
            queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    texture: &sources.alpha,
                    mip_level: 0,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                alpha,
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(plan.width),
                    rows_per_image: Some(plan.height),
                },
                wgpu::Extent3d {
                    width: plan.width,
                    height: plan.height,
                    depth_or_array_layers: 1,
                },
            );
        }

        let params = ConvertParams {
            mode: plan.mode as u32,
            width: plan.width,
            height: plan.height,
            _padding: 0,
        };
        queue.write_buffer(&self.params_buffer, 0, bytemuck::bytes_of(&params));
    }

    fn render(&self, output: &GpuImage) {
        let Some(sources) = &self.sources else { return };
        let device = &self.gpu.device;

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("NDI Convert Encoder"),
        });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("NDI Convert Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &output.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            render_pass.set_pipeline(&self.pipeline);
            render_pass.set_bind_group(0, &sources.bind_group, &[]);
            render_pass.draw(0..3, 0..1);
        }
        self.gpu.queue.submit(std::iter::once(encoder.finish()));
    }
}

impl FormatConverter for GpuFormatConverter {
    type Image = Arc<GpuImage>;

    fn decode(&mut self, frame: &VideoFrame<'_>) -> Result<Arc<GpuImage>, ConvertError> {
        let plan = FramePlan::for_frame(frame)?.within_limit(self.max_dimension)?;
        let data = frame.data().ok_or(ConvertError::MissingData)?;

        self.ensure_sources(&plan);
        let output = self.ensure_output(plan.width, plan.height);
        self.upload(&plan, data);
        self.render(&output);

        Ok(output)
    }
}

impl std::fmt::Debug for GpuFormatConverter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpuFormatConverter")
            .field("max_dimension", &self.max_dimension)
            .field("output", &self.output)
            .finish_non_exhaustive()
    }
}

/// Unpacks 4:2:2 (BT.709, limited range) or swizzles packed RGB layouts.
const CONVERT_SHADER: &str = r#"
struct VertexOutput {
    @builtin(position) position: vec4<f32>,
}

@vertex
fn vs_main(@builtin(vertex_index) vertex_index: u32) -> VertexOutput {
    var out: VertexOutput;
    // Fullscreen triangle
    let x = f32((vertex_index << 1u) & 2u);
    let y = f32(vertex_index & 2u);
    out.position = vec4<f32>(x * 2.0 - 1.0, 1.0 - y * 2.0, 0.0, 1.0);
    return out;
}

struct Params {
    mode: u32,
    width: u32,
    height: u32,
    _padding: u32,
}

@group(0) @binding(0) var t_packed: texture_2d<f32>;
@group(0) @binding(1) var t_alpha: texture_2d<f32>;
@group(0) @binding(2) var<uniform> params: Params;

fn yuv_to_rgb(y: f32, u: f32, v: f32) -> vec3<f32> {
    let luma = (y - 16.0 / 255.0) * 1.164383;
    let cb = u - 128.0 / 255.0;
    let cr = v - 128.0 / 255.0;
    return vec3<f32>(
        luma + 1.792741 * cr,
        luma - 0.213249 * cb - 0.532909 * cr,
        luma + 2.112402 * cb,
    );
}

@fragment
fn fs_main(in: VertexOutput) -> @location(0) vec4<f32> {
    let pixel = vec2<u32>(in.position.xy);
    var color = vec4<f32>(0.0, 0.0, 0.0, 1.0);

    switch params.mode {
        // UYVY / UYVA: texel = (U, Y0, V, Y1)
        case 0u, 1u: {
            let texel = textureLoad(t_packed, vec2<u32>(pixel.x / 2u, pixel.y), 0);
            let y = select(texel.g, texel.a, (pixel.x & 1u) == 1u);
            color = vec4<f32>(saturate(yuv_to_rgb(y, texel.r, texel.b)), 1.0);
            if params.mode == 1u {
                color.a = textureLoad(t_alpha, pixel, 0).r;
            }
        }
        // BGRA
        case 2u: {
            color = textureLoad(t_packed, pixel, 0).bgra;
        }
        // BGRX
        case 3u: {
            color = vec4<f32>(textureLoad(t_packed, pixel, 0).bgr, 1.0);
        }
        // RGBA
        case 4u: {
            color = textureLoad(t_packed, pixel, 0);
        }
        // RGBX
        default: {
            color = vec4<f32>(textureLoad(t_packed, pixel, 0).rgb, 1.0);
        }
    }

    return color;
}
"#;
