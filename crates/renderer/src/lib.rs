//! Renderer: wgpu init + depth + textured OBJ model with per-material draws.
//! Device limits stay within WebGL2 so the GL backend works everywhere.

pub mod texture;

use std::num::NonZeroU64;
use std::ops::Range;
use std::sync::Arc;

use anyhow::{Context, Result};
use asset::{LoadedModel, MeshData, MeshVertex, SubMesh, mtl::Material, texture::TextureData};
use bytemuck::{Pod, Zeroable};
use corelib::{camera::Camera, transform::Transform};
use glam::{Mat4, Vec3};
use wgpu::{
    util::DeviceExt,
    BindGroup, BindGroupLayout, BindGroupLayoutDescriptor, BindGroupLayoutEntry, BindingType,
    BlendState, Buffer, BufferBindingType, BufferUsages, ColorTargetState, ColorWrites,
    CommandEncoderDescriptor, CompositeAlphaMode, DepthBiasState, DepthStencilState, Device,
    DeviceDescriptor, Extent3d, Features, FragmentState, Instance, InstanceDescriptor, Limits,
    LoadOp, Operations, PipelineLayoutDescriptor, PowerPreference, PresentMode, Queue,
    RenderPassColorAttachment, RenderPassDescriptor, RenderPipeline, RenderPipelineDescriptor,
    SamplerBindingType, ShaderModuleDescriptor, ShaderSource, ShaderStages, StoreOp, Surface,
    SurfaceConfiguration, SurfaceError, TextureDescriptor, TextureDimension, TextureFormat,
    TextureSampleType, TextureUsages, TextureView, TextureViewDescriptor, TextureViewDimension,
    VertexBufferLayout, VertexState, VertexStepMode,
};
use winit::{dpi::PhysicalSize, window::Window};

use crate::texture::GpuTexture;

/// Vertex: position + texcoord + normal, matching [`MeshVertex`].
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct Vertex {
    pub pos: [f32; 3],
    pub uv: [f32; 2],
    pub normal: [f32; 3],
}
impl Vertex {
    pub const LAYOUT: VertexBufferLayout<'static> = VertexBufferLayout {
        array_stride: std::mem::size_of::<Vertex>() as u64,
        step_mode: VertexStepMode::Vertex,
        attributes: &wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x2, 2 => Float32x3],
    };
}

impl From<&MeshVertex> for Vertex {
    fn from(v: &MeshVertex) -> Self {
        Self {
            pos: v.position,
            uv: v.texcoord,
            normal: v.normal,
        }
    }
}

/// Camera UBO (16-byte aligned).
#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct CameraUniform {
    mvp: [[f32; 4]; 4],
    model: [[f32; 4]; 4],
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct MaterialUniform {
    diffuse: [f32; 4],
}

const DEPTH_FORMAT: TextureFormat = TextureFormat::Depth32Float;
const FOV_Y_DEG: f32 = 60.0;
const CHECKER_SIZE: u32 = 64;

/// Indexed draw of one submesh with one material bind group.
#[derive(Clone, Debug, PartialEq, Eq)]
struct DrawRange {
    material: usize,
    indices: Range<u32>,
}

/// Submeshes without a (known) material draw with the default slot, which
/// sits right after the model's own materials.
fn draw_ranges(submeshes: &[SubMesh], material_count: usize) -> Vec<DrawRange> {
    submeshes
        .iter()
        .filter(|s| !s.indices.is_empty())
        .map(|s| DrawRange {
            material: s.material.filter(|&m| m < material_count).unwrap_or(material_count),
            indices: s.indices.clone(),
        })
        .collect()
}

/// Object-to-world transform that centres the mesh in the unit sphere.
fn normalizing_transform(mesh: &MeshData) -> Transform {
    match mesh.bounds() {
        Some((min, max)) => Transform::normalize_bounds(Vec3::from(min), Vec3::from(max)),
        None => Transform::identity(),
    }
}

struct GpuMaterial {
    bind_group: BindGroup,
    #[allow(dead_code)]
    uniform: Buffer,
    #[allow(dead_code)]
    texture: GpuTexture,
}

/// Owns every GPU resource for one window; dropping it releases them.
pub struct GpuState {
    // Surface
    surface: Surface<'static>,
    surface_config: SurfaceConfiguration,

    // Device/queue
    device: Device,
    queue: Queue,

    // Pipeline & geometry
    pipeline: RenderPipeline,
    vertex_buf: Buffer,
    index_buf: Buffer,
    draws: Vec<DrawRange>,
    materials: Vec<GpuMaterial>,
    normalize: Mat4,

    // Camera
    camera: Camera,
    camera_bg: BindGroup,
    camera_buf: Buffer,

    // Depth
    depth_view: TextureView,

    // Size cache
    width: u32,
    height: u32,
}

impl GpuState {
    /// Create GPU state bound to an Arc<Window> and upload `model`.
    pub async fn new(
        window: Arc<Window>,
        backends: wgpu::Backends,
        model: &LoadedModel,
    ) -> Result<Self> {
        let PhysicalSize { width, height } = window.inner_size();
        let width = width.max(1);
        let height = height.max(1);

        // Instance & surface
        let instance = Instance::new(&InstanceDescriptor {
            backends,
            ..Default::default()
        });
        let surface: Surface<'static> = instance
            .create_surface(window.clone())
            .context("create_surface failed")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("No suitable GPU adapter")?;
        log::info!("Using adapter: {:?}", adapter.get_info());

        let (device, queue) = adapter
            .request_device(&DeviceDescriptor {
                label: Some("ObjView Device"),
                required_features: Features::empty(),
                required_limits: Limits::downlevel_webgl2_defaults()
                    .using_resolution(adapter.limits()),
                memory_hints: Default::default(),
                trace: Default::default(),
            })
            .await
            .context("request_device failed")?;

        // Surface format (prefer sRGB)
        let caps = surface.get_capabilities(&adapter);
        let surface_format = caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .context("Surface reports no supported formats")?;

        let surface_config = SurfaceConfiguration {
            usage: TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width,
            height,
            present_mode: PresentMode::AutoVsync,
            alpha_mode: caps.alpha_modes.first().copied().unwrap_or(CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &surface_config);

        let depth_view = create_depth_view(&device, &surface_config);

        // ==== Shaders ====
        let shader = device.create_shader_module(ShaderModuleDescriptor {
            label: Some("Mesh WGSL"),
            source: ShaderSource::Wgsl(include_str!("shaders/mesh.wgsl").into()),
        });

        // ==== Camera BGL/BG ====
        let camera_bgl = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("Camera BGL"),
            entries: &[uniform_entry::<CameraUniform>(0, ShaderStages::VERTEX)],
        });
        let camera_init = CameraUniform {
            mvp: Mat4::IDENTITY.to_cols_array_2d(),
            model: Mat4::IDENTITY.to_cols_array_2d(),
        };
        let camera_buf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera UBO"),
            contents: bytemuck::bytes_of(&camera_init),
            usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
        });
        let camera_bg = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Camera BG"),
            layout: &camera_bgl,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buf.as_entire_binding(),
            }],
        });

        // ==== Materials ====
        let material_bgl = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("Material BGL"),
            entries: &[
                uniform_entry::<MaterialUniform>(0, ShaderStages::FRAGMENT),
                BindGroupLayoutEntry {
                    binding: 1,
                    visibility: ShaderStages::FRAGMENT,
                    ty: BindingType::Texture {
                        sample_type: TextureSampleType::Float { filterable: true },
                        view_dimension: TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                BindGroupLayoutEntry {
                    binding: 2,
                    visibility: ShaderStages::FRAGMENT,
                    ty: BindingType::Sampler(SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });
        let default_material = Material::named("default");
        let materials: Vec<GpuMaterial> = model
            .materials
            .iter()
            .chain(std::iter::once(&default_material))
            .map(|m| create_material(&device, &queue, &material_bgl, m))
            .collect();

        // ==== Pipeline ====
        let pipeline_layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
            label: Some("Mesh PipelineLayout"),
            bind_group_layouts: &[&camera_bgl, &material_bgl],
            push_constant_ranges: &[],
        });
        let pipeline = device.create_render_pipeline(&RenderPipelineDescriptor {
            label: Some("Mesh Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[Vertex::LAYOUT],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            fragment: Some(FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(ColorTargetState {
                    format: surface_format,
                    blend: Some(BlendState::REPLACE),
                    write_mask: ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            primitive: wgpu::PrimitiveState {
                cull_mode: Some(wgpu::Face::Back),
                ..Default::default()
            },
            depth_stencil: Some(DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::LessEqual,
                stencil: wgpu::StencilState::default(),
                bias: DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        // ==== Geometry ====
        let mesh = &model.mesh;
        let vertices: Vec<Vertex> = mesh.vertices.iter().map(Vertex::from).collect();
        let vertex_buf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Mesh VB"),
            contents: bytemuck::cast_slice(&vertices),
            usage: BufferUsages::VERTEX,
        });
        let index_buf = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Mesh IB"),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: BufferUsages::INDEX,
        });
        let draws = draw_ranges(&mesh.submeshes, model.materials.len());
        log::info!(
            "Uploaded {} vertices, {} indices in {} draws",
            vertices.len(),
            mesh.indices.len(),
            draws.len()
        );

        Ok(Self {
            surface,
            surface_config,
            device,
            queue,
            pipeline,
            vertex_buf,
            index_buf,
            draws,
            materials,
            normalize: normalizing_transform(mesh).matrix(),
            camera: Camera::framing_unit_sphere(
                FOV_Y_DEG.to_radians(),
                width as f32 / height as f32,
            ),
            camera_bg,
            camera_buf,
            depth_view,
            width,
            height,
        })
    }

    /// Resize: reconfigure surface, recreate depth view, reframe the camera.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width.max(1);
        self.height = height.max(1);
        self.surface_config.width = self.width;
        self.surface_config.height = self.height;
        self.surface.configure(&self.device, &self.surface_config);
        self.depth_view = create_depth_view(&self.device, &self.surface_config);
        let aspect = self.width as f32 / self.height as f32;
        self.camera = Camera::framing_unit_sphere(self.camera.fov_y_rad, aspect);
    }

    /// Render one frame: update MVP + clear + draw every submesh.
    pub fn render(&mut self, rotation: Mat4) -> Result<(), SurfaceError> {
        let model = rotation * self.normalize;
        let cam = CameraUniform {
            mvp: (self.camera.proj_view() * model).to_cols_array_2d(),
            model: model.to_cols_array_2d(),
        };
        self.queue.write_buffer(&self.camera_buf, 0, bytemuck::bytes_of(&cam));

        // --- frame & pass
        let frame = self.surface.get_current_texture()?;
        let view = frame.texture.create_view(&Default::default());

        let mut encoder = self.device.create_command_encoder(&CommandEncoderDescriptor {
            label: Some("MainEncoder"),
        });

        {
            let mut rpass = encoder.begin_render_pass(&RenderPassDescriptor {
                label: Some("MainPass"),
                color_attachments: &[Some(RenderPassColorAttachment {
                    view: &view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: Operations {
                        load: LoadOp::Clear(wgpu::Color {
                            r: 0.05,
                            g: 0.05,
                            b: 0.08,
                            a: 1.0,
                        }),
                        store: StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(Operations {
                        load: LoadOp::Clear(1.0),
                        store: StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            rpass.set_pipeline(&self.pipeline);
            rpass.set_bind_group(0, &self.camera_bg, &[]);
            rpass.set_vertex_buffer(0, self.vertex_buf.slice(..));
            rpass.set_index_buffer(self.index_buf.slice(..), wgpu::IndexFormat::Uint32);
            for draw in &self.draws {
                rpass.set_bind_group(1, &self.materials[draw.material].bind_group, &[]);
                rpass.draw_indexed(draw.indices.clone(), 0, 0..1);
            }
        }

        self.queue.submit(Some(encoder.finish()));
        frame.present();
        Ok(())
    }

    pub fn is_surface_lost(err: &SurfaceError) -> bool {
        matches!(err, SurfaceError::Lost | SurfaceError::Outdated)
    }

    pub fn recreate_surface(&mut self) {
        self.resize(self.width, self.height);
    }
}

fn uniform_entry<T>(binding: u32, visibility: ShaderStages) -> BindGroupLayoutEntry {
    BindGroupLayoutEntry {
        binding,
        visibility,
        ty: BindingType::Buffer {
            ty: BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: NonZeroU64::new(std::mem::size_of::<T>() as u64),
        },
        count: None,
    }
}

/// Swap in the checkerboard when `data` exceeds the device's 2D texture size.
fn fit_texture(material: &str, data: TextureData, max_dimension: u32) -> TextureData {
    if data.width > max_dimension || data.height > max_dimension {
        log::warn!(
            "Material '{}': texture is {}x{}, device limit is {}; using checkerboard",
            material,
            data.width,
            data.height,
            max_dimension
        );
        return TextureData::create_test_texture(CHECKER_SIZE);
    }
    data
}

/// Material uniform + diffuse texture. Unreadable or oversized textures fall
/// back to a checkerboard so every draw has something bound.
fn create_material(
    device: &Device,
    queue: &Queue,
    layout: &BindGroupLayout,
    material: &Material,
) -> GpuMaterial {
    let texture_data = match &material.diffuse_texture {
        Some(path) => match TextureData::load(path) {
            Ok(data) => {
                let max_dimension = device.limits().max_texture_dimension_2d;
                fit_texture(&material.name, data, max_dimension)
            }
            Err(e) => {
                log::warn!("Material '{}': {}; using checkerboard", material.name, e);
                TextureData::create_test_texture(CHECKER_SIZE)
            }
        },
        None => TextureData::create_test_texture(CHECKER_SIZE),
    };
    let texture = GpuTexture::from_data(device, queue, &texture_data, &material.name);

    let [r, g, b] = material.diffuse;
    let uniform = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Material UBO"),
        contents: bytemuck::bytes_of(&MaterialUniform { diffuse: [r, g, b, 1.0] }),
        usage: BufferUsages::UNIFORM,
    });
    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Material BG"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(&texture.view),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::Sampler(&texture.sampler),
            },
        ],
    });

    GpuMaterial {
        bind_group,
        uniform,
        texture,
    }
}

/// Create a depth texture view matching the surface config.
fn create_depth_view(device: &Device, sc: &SurfaceConfiguration) -> TextureView {
    let tex = device.create_texture(&TextureDescriptor {
        label: Some("DepthTex"),
        size: Extent3d {
            width: sc.width.max(1),
            height: sc.height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    tex.create_view(&TextureViewDescriptor::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_layout_matches_interleaved_mesh_vertex() {
        assert_eq!(std::mem::size_of::<Vertex>(), 8 * 4);
        assert_eq!(Vertex::LAYOUT.array_stride, 32);
        let offsets: Vec<_> = Vertex::LAYOUT.attributes.iter().map(|a| a.offset).collect();
        assert_eq!(offsets, vec![0, 12, 20]);

        let v = Vertex::from(&MeshVertex::new([1.0, 2.0, 3.0], [0.5, 0.25], [0.0, 1.0, 0.0]));
        assert_eq!(
            bytemuck::cast_slice::<Vertex, f32>(&[v]),
            &[1.0, 2.0, 3.0, 0.5, 0.25, 0.0, 1.0, 0.0]
        );
    }

    #[test]
    fn uniforms_are_16_byte_multiples() {
        assert_eq!(std::mem::size_of::<CameraUniform>() % 16, 0);
        assert_eq!(std::mem::size_of::<MaterialUniform>(), 16);
    }

    #[test]
    fn unknown_materials_draw_with_default_slot() {
        let submeshes = [
            SubMesh { material: None, indices: 0..3 },
            SubMesh { material: Some(1), indices: 3..9 },
            SubMesh { material: Some(5), indices: 9..12 },
            SubMesh { material: Some(0), indices: 12..12 },
        ];
        assert_eq!(
            draw_ranges(&submeshes, 2),
            vec![
                DrawRange { material: 2, indices: 0..3 },
                DrawRange { material: 1, indices: 3..9 },
                DrawRange { material: 2, indices: 9..12 },
            ]
        );
    }

    #[test]
    fn oversized_textures_fall_back_to_checkerboard() {
        let limit = Limits::downlevel_webgl2_defaults().max_texture_dimension_2d;

        let wide = TextureData::new_rgba8(limit + 1, 1, vec![0; (limit as usize + 1) * 4]);
        let fitted = fit_texture("wide", wide, limit);
        assert_eq!((fitted.width, fitted.height), (CHECKER_SIZE, CHECKER_SIZE));

        let tall = TextureData::new_rgba8(1, limit + 1, vec![0; (limit as usize + 1) * 4]);
        let fitted = fit_texture("tall", tall, limit);
        assert_eq!((fitted.width, fitted.height), (CHECKER_SIZE, CHECKER_SIZE));

        let edge = TextureData::new_rgba8(limit, 1, vec![7; limit as usize * 4]);
        let fitted = fit_texture("edge", edge, limit);
        assert_eq!((fitted.width, fitted.height), (limit, 1));
        assert_eq!(fitted.data[0], 7);
    }

    #[test]
    fn normalizing_transform_centres_mesh() {
        let src = "v 10 0 0\nv 12 0 0\nv 12 2 0\nf 1 2 3\n";
        let mesh = asset::obj::load_obj_from_str(src).unwrap();
        let m = normalizing_transform(&mesh).matrix();
        let centre = m.transform_point3(Vec3::new(11.0, 1.0, 0.0));
        assert!(centre.length() < 1e-5);
        let corner = m.transform_point3(Vec3::new(12.0, 2.0, 0.0));
        assert!((corner.length() - 1.0).abs() < 1e-5);

        assert_eq!(normalizing_transform(&MeshData::default()).matrix(), Mat4::IDENTITY);
    }
}
