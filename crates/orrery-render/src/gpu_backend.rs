//! wgpu backend: one render pipeline per program, a four-vertex strip
//! covering clip space, and bind groups rebuilt from the program's texture
//! units at draw time.

use std::borrow::{Borrow, BorrowMut};
use std::collections::BTreeMap;

use image::RgbaImage;
use orrery_shading::{TextureImage, WrapMode};
use wgpu::util::DeviceExt;

use crate::backend::{BackendError, RenderBackend};
use crate::gpu::{OFFSCREEN_FORMAT, RenderContext};
use crate::mipmap::MipmapGenerator;
use crate::program::{FRAGMENT_ENTRY, POSITION_LOCATION, Program, ProgramError, VERTEX_ENTRY};
use crate::sources::ProgramSources;

/// Clip-space quad, drawn as a triangle strip.
pub const QUAD_VERTICES: [[f32; 3]; 4] = [
    [-1.0, 1.0, 0.0],
    [1.0, 1.0, 0.0],
    [-1.0, -1.0, 0.0],
    [1.0, -1.0, 0.0],
];

fn quad_layout() -> wgpu::VertexBufferLayout<'static> {
    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &[wgpu::VertexAttribute {
            offset: 0,
            shader_location: POSITION_LOCATION,
            format: wgpu::VertexFormat::Float32x3,
        }],
    }
}

/// An uploaded texture and the wrap mode its sampler must use.
#[derive(Clone)]
pub struct GpuTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub wrap: WrapMode,
    pub mip_level_count: u32,
}

/// A linked program with its pipeline and uniform buffer.
pub struct GpuProgram {
    program: Program,
    pipeline: wgpu::RenderPipeline,
    group_layouts: Vec<wgpu::BindGroupLayout>,
    uniform_buffer: Option<wgpu::Buffer>,
}

impl Borrow<Program> for GpuProgram {
    fn borrow(&self) -> &Program {
        &self.program
    }
}

impl BorrowMut<Program> for GpuProgram {
    fn borrow_mut(&mut self) -> &mut Program {
        &mut self.program
    }
}

struct OffscreenTarget {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl OffscreenTarget {
    fn new(device: &wgpu::Device, width: u32, height: u32) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("offscreen-target"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: OFFSCREEN_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self { texture, view }
    }
}

pub struct GpuBackend {
    context: RenderContext,
    quad: wgpu::Buffer,
    repeat_sampler: wgpu::Sampler,
    clamp_sampler: wgpu::Sampler,
    mipmaps: MipmapGenerator,
    units: BTreeMap<u32, GpuTexture>,
    fallback: GpuTexture,
    offscreen: Option<OffscreenTarget>,
}

impl GpuBackend {
    /// Wrap a context. Headless contexts render into an offscreen target
    /// that [`GpuBackend::read_pixels`] copies back.
    pub fn new(context: RenderContext) -> Self {
        let device = &context.device;
        let quad = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("fullscreen-quad"),
            contents: bytemuck::cast_slice(&QUAD_VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let sampler = |label, address_mode| {
            device.create_sampler(&wgpu::SamplerDescriptor {
                label: Some(label),
                address_mode_u: address_mode,
                address_mode_v: address_mode,
                mag_filter: wgpu::FilterMode::Linear,
                min_filter: wgpu::FilterMode::Linear,
                mipmap_filter: wgpu::MipmapFilterMode::Nearest,
                ..Default::default()
            })
        };
        let repeat_sampler = sampler("sampler-repeat", wgpu::AddressMode::Repeat);
        let clamp_sampler = sampler("sampler-clamp", wgpu::AddressMode::ClampToEdge);
        let mipmaps = MipmapGenerator::new(device, OFFSCREEN_FORMAT);
        let offscreen = context.surface.is_none().then(|| {
            OffscreenTarget::new(
                device,
                context.surface_config.width,
                context.surface_config.height,
            )
        });

        let fallback = create_texture(&context, &mipmaps, "unbound-texture", &TextureImage::white());

        Self {
            context,
            quad,
            repeat_sampler,
            clamp_sampler,
            mipmaps,
            units: BTreeMap::new(),
            fallback,
            offscreen,
        }
    }

    pub fn context(&self) -> &RenderContext {
        &self.context
    }

    fn sampler_for(&self, wrap: WrapMode) -> &wgpu::Sampler {
        match wrap {
            WrapMode::Repeat => &self.repeat_sampler,
            WrapMode::ClampToEdge => &self.clamp_sampler,
        }
    }

    fn bind_groups(&self, program: &GpuProgram) -> Vec<wgpu::BindGroup> {
        let layout = program.program.layout();
        program
            .group_layouts
            .iter()
            .enumerate()
            .map(|(group, group_layout)| {
                let group = group as u32;
                let mut entries = Vec::new();
                if let (Some((block_group, binding)), Some(buffer)) =
                    (layout.block_binding, &program.uniform_buffer)
                    && block_group == group
                {
                    entries.push(wgpu::BindGroupEntry {
                        binding,
                        resource: buffer.as_entire_binding(),
                    });
                }
                for slot in layout.textures().iter().filter(|s| s.group == group) {
                    let unit = program.program.texture_unit(&slot.name).unwrap_or(0);
                    let texture = self.units.get(&unit).unwrap_or(&self.fallback);
                    entries.push(wgpu::BindGroupEntry {
                        binding: slot.texture_binding,
                        resource: wgpu::BindingResource::TextureView(&texture.view),
                    });
                    entries.push(wgpu::BindGroupEntry {
                        binding: slot.sampler_binding,
                        resource: wgpu::BindingResource::Sampler(self.sampler_for(texture.wrap)),
                    });
                }
                self.context
                    .device
                    .create_bind_group(&wgpu::BindGroupDescriptor {
                        label: Some("program-bind-group"),
                        layout: group_layout,
                        entries: &entries,
                    })
            })
            .collect()
    }

    /// Record one pass that clears to black and, given a program, draws the quad.
    fn encode(
        &self,
        view: &wgpu::TextureView,
        program: Option<(&GpuProgram, &[wgpu::BindGroup])>,
    ) {
        let mut encoder = self
            .context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame-encoder"),
            });
        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("fullscreen-pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                ..Default::default()
            });
            if let Some((program, bind_groups)) = program {
                pass.set_pipeline(&program.pipeline);
                for (group, bind_group) in bind_groups.iter().enumerate() {
                    pass.set_bind_group(group as u32, bind_group, &[]);
                }
                pass.set_vertex_buffer(0, self.quad.slice(..));
                pass.draw(0..QUAD_VERTICES.len() as u32, 0..1);
            }
        }
        self.context.queue.submit(std::iter::once(encoder.finish()));
    }

    fn render(&self, program: Option<&GpuProgram>) -> Result<(), BackendError> {
        let bind_groups = program.map(|p| self.bind_groups(p)).unwrap_or_default();
        let draw = program.map(|p| (p, bind_groups.as_slice()));

        match self.context.get_current_texture() {
            Some(frame) => {
                let frame = frame?;
                let view = frame
                    .texture
                    .create_view(&wgpu::TextureViewDescriptor::default());
                self.encode(&view, draw);
                frame.present();
            }
            None => {
                if let Some(target) = &self.offscreen {
                    self.encode(&target.view, draw);
                }
            }
        }
        Ok(())
    }

    /// Copy the offscreen target back as RGBA8, row 0 at the top.
    pub fn read_pixels(&self) -> Result<RgbaImage, BackendError> {
        let Some(target) = &self.offscreen else {
            return Err(BackendError::Readback(
                "only headless contexts can be read back".to_string(),
            ));
        };
        let device = &self.context.device;
        let width = target.texture.width();
        let height = target.texture.height();
        let unpadded = width * 4;
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let padded = unpadded.div_ceil(align) * align;

        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("offscreen-readback"),
            size: u64::from(padded * height),
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("readback-encoder"),
        });
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &target.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded),
                    rows_per_image: Some(height),
                },
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
        self.context.queue.submit(std::iter::once(encoder.finish()));

        let slice = buffer.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        device
            .poll(wgpu::PollType::Wait {
                submission_index: None,
                timeout: None,
            })
            .map_err(|e| BackendError::Readback(e.to_string()))?;
        rx.recv()
            .map_err(|e| BackendError::Readback(e.to_string()))?
            .map_err(|e| BackendError::Readback(e.to_string()))?;

        let mut pixels = Vec::with_capacity((unpadded * height) as usize);
        {
            let mapped = slice.get_mapped_range();
            for row in mapped.chunks_exact(padded as usize) {
                pixels.extend_from_slice(&row[..unpadded as usize]);
            }
        }
        buffer.unmap();

        RgbaImage::from_raw(width, height, pixels)
            .ok_or_else(|| BackendError::Readback("readback size mismatch".to_string()))
    }
}

fn create_texture(
    context: &RenderContext,
    mipmaps: &MipmapGenerator,
    name: &str,
    image: &TextureImage,
) -> GpuTexture {
    let size = wgpu::Extent3d {
        width: image.width(),
        height: image.height(),
        depth_or_array_layers: 1,
    };
    let mip_level_count = image.mip_level_count();
    let texture = context.device.create_texture(&wgpu::TextureDescriptor {
        label: Some(name),
        size,
        mip_level_count,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: OFFSCREEN_FORMAT,
        usage: wgpu::TextureUsages::TEXTURE_BINDING
            | wgpu::TextureUsages::COPY_DST
            | wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });

    context.queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture: &texture,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        image.pixels().as_raw(),
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(4 * image.width()),
            rows_per_image: Some(image.height()),
        },
        size,
    );

    if mip_level_count > 1 {
        mipmaps.generate(&context.device, &context.queue, &texture, mip_level_count);
    }

    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    GpuTexture {
        texture,
        view,
        wrap: image.wrap(),
        mip_level_count,
    }
}

fn group_layout_entries(program: &Program) -> BTreeMap<u32, Vec<wgpu::BindGroupLayoutEntry>> {
    let layout = program.layout();
    let mut groups: BTreeMap<u32, Vec<wgpu::BindGroupLayoutEntry>> = BTreeMap::new();
    if let Some((group, binding)) = layout.block_binding {
        groups.entry(group).or_default().push(wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        });
    }
    for slot in layout.textures() {
        let entries = groups.entry(slot.group).or_default();
        entries.push(wgpu::BindGroupLayoutEntry {
            binding: slot.texture_binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        });
        entries.push(wgpu::BindGroupLayoutEntry {
            binding: slot.sampler_binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
            count: None,
        });
    }
    groups
}

impl RenderBackend for GpuBackend {
    type Program = GpuProgram;
    type Texture = GpuTexture;

    fn compile_program(&mut self, sources: &ProgramSources) -> Result<GpuProgram, ProgramError> {
        let program = Program::compile(sources)?;
        let device = &self.context.device;

        let mut groups = group_layout_entries(&program);
        let group_count = groups.keys().next_back().map_or(0, |g| g + 1);
        let group_layouts: Vec<wgpu::BindGroupLayout> = (0..group_count)
            .map(|group| {
                let entries = groups.remove(&group).unwrap_or_default();
                device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some("program-bind-group-layout"),
                    entries: &entries,
                })
            })
            .collect();
        let layout_refs: Vec<&wgpu::BindGroupLayout> = group_layouts.iter().collect();

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("program-pipeline-layout"),
            bind_group_layouts: &layout_refs,
            immediate_size: 0,
        });

        let vertex = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("program-vertex"),
            source: wgpu::ShaderSource::Wgsl(program.vertex_source().into()),
        });
        let fragment = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("program-fragment"),
            source: wgpu::ShaderSource::Wgsl(program.fragment_source().into()),
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("program-pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &vertex,
                entry_point: Some(VERTEX_ENTRY),
                buffers: &[quad_layout()],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleStrip,
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: &fragment,
                entry_point: Some(FRAGMENT_ENTRY),
                targets: &[Some(wgpu::ColorTargetState {
                    format: self.context.surface_format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            multiview_mask: None,
            cache: None,
        });

        let uniform_buffer = (program.layout().block_size > 0).then(|| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("program-uniforms"),
                size: u64::from(program.layout().block_size),
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        });

        Ok(GpuProgram {
            program,
            pipeline,
            group_layouts,
            uniform_buffer,
        })
    }

    fn upload_texture(&mut self, name: &str, image: &TextureImage) -> Result<GpuTexture, BackendError> {
        let limit = self.context.device.limits().max_texture_dimension_2d;
        if image.width() > limit || image.height() > limit {
            return Err(BackendError::TextureTooLarge {
                name: name.to_string(),
                width: image.width(),
                height: image.height(),
                limit,
            });
        }
        Ok(create_texture(&self.context, &self.mipmaps, name, image))
    }

    fn bind_texture(&mut self, unit: u32, texture: &GpuTexture) {
        self.units.insert(unit, texture.clone());
    }

    fn resolution(&self) -> (u32, u32) {
        (
            self.context.surface_config.width,
            self.context.surface_config.height,
        )
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.context.resize(width, height);
        if self.offscreen.is_some() {
            let (width, height) = self.resolution();
            self.offscreen = Some(OffscreenTarget::new(&self.context.device, width, height));
        }
    }

    fn draw_full_screen_quad(&mut self, program: &mut GpuProgram) -> Result<(), BackendError> {
        if program.program.take_dirty()
            && let Some(buffer) = &program.uniform_buffer
        {
            self.context
                .queue
                .write_buffer(buffer, 0, program.program.block_bytes());
        }
        self.render(Some(program))
    }

    fn draw_blank(&mut self) -> Result<(), BackendError> {
        self.render(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::names;
    use glam::Vec3;
    use orrery_scene::UniformValue;

    fn headless(width: u32, height: u32) -> Option<GpuBackend> {
        let context = pollster::block_on(RenderContext::headless(width, height)).ok()?;
        Some(GpuBackend::new(context))
    }

    #[test]
    fn test_quad_covers_clip_space() {
        let xs: Vec<f32> = QUAD_VERTICES.iter().map(|v| v[0]).collect();
        let ys: Vec<f32> = QUAD_VERTICES.iter().map(|v| v[1]).collect();
        assert!(xs.contains(&-1.0) && xs.contains(&1.0));
        assert!(ys.contains(&-1.0) && ys.contains(&1.0));
        assert!(QUAD_VERTICES.iter().all(|v| v[2] == 0.0));
    }

    #[test]
    fn test_quad_layout_reads_position() {
        let layout = quad_layout();
        assert_eq!(layout.array_stride, 12);
        assert_eq!(layout.attributes[0].shader_location, 0);
        assert_eq!(layout.attributes[0].format, wgpu::VertexFormat::Float32x3);
    }

    #[test]
    fn test_layout_entries_follow_reflection() {
        let program = Program::compile(&ProgramSources::default()).unwrap();
        let groups = group_layout_entries(&program);
        assert_eq!(groups[&0].len(), 1);
        assert_eq!(groups[&1].len(), 4);
    }

    #[test]
    fn test_draw_blank_reads_back_black() {
        let Some(mut backend) = headless(8, 4) else {
            return;
        };
        backend.draw_blank().unwrap();
        let pixels = backend.read_pixels().unwrap();
        assert_eq!(pixels.dimensions(), (8, 4));
        assert!(pixels.pixels().all(|p| p.0 == [0, 0, 0, 255]));
    }

    #[test]
    fn test_power_of_two_upload_builds_mip_chain() {
        let Some(mut backend) = headless(4, 4) else {
            return;
        };
        let image = TextureImage::new(RgbaImage::new(8, 4));
        let texture = backend.upload_texture("uEarthTexture", &image).unwrap();
        assert_eq!(texture.mip_level_count, 4);
        assert_eq!(texture.wrap, WrapMode::Repeat);

        let odd = TextureImage::new(RgbaImage::new(3, 5));
        let texture = backend.upload_texture("uMoonTexture", &odd).unwrap();
        assert_eq!(texture.mip_level_count, 1);
        assert_eq!(texture.wrap, WrapMode::ClampToEdge);
    }

    #[test]
    fn test_sun_fills_the_center() {
        let Some(mut backend) = headless(32, 32) else {
            return;
        };
        let mut program = backend.compile_program(&ProgramSources::default()).unwrap();
        let binds = [
            (names::CAMERA_POS, UniformValue::Vec3(Vec3::new(0.0, 0.0, 32.0))),
            (names::CAMERA_DIR, UniformValue::Vec3(Vec3::NEG_Z)),
            (names::CAMERA_UP, UniformValue::Vec3(Vec3::Y)),
            (names::SUN_POS, UniformValue::Vec3(Vec3::ZERO)),
            (names::SUN_RADIUS, UniformValue::Scalar(8.0)),
            (names::SUN_COLOR, UniformValue::Vec3(Vec3::new(1.0, 0.35, 0.0))),
            (names::EARTH_POS, UniformValue::Vec3(Vec3::new(-18.0, 0.0, 0.0))),
            (names::EARTH_RADIUS, UniformValue::Scalar(1.5)),
            (names::MOON_POS, UniformValue::Vec3(Vec3::new(-15.0, 0.0, 0.0))),
            (names::MOON_RADIUS, UniformValue::Scalar(0.5)),
            (names::RESOLUTION, UniformValue::Vec2(glam::Vec2::new(32.0, 32.0))),
        ];
        for (name, value) in binds {
            backend.bind_uniform(&mut program, name, value);
        }
        backend.draw_full_screen_quad(&mut program).unwrap();
        let pixels = backend.read_pixels().unwrap();
        let center = pixels.get_pixel(16, 16).0;
        assert!(center[0] > center[2], "{center:?}");
        assert_eq!(pixels.get_pixel(0, 0).0, [0, 0, 0, 255]);
    }
}
