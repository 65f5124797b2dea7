//! wgpu Renderer
//!
//! Desktop rasterizer for the overlay stack. Each [`Layer`] is a linear
//! `Rgba16Float` texture the size of the rendered page; recorded
//! [`DrawCommand`]s are replayed into it as instanced brush dabs, clears and
//! fade passes. A frame composites page, drawing and particle layers onto
//! the window surface inside the page's viewport rectangle.

use anyhow::Context;
use wgpu::util::DeviceExt;

use crate::brush::{self, BrushDab};
use crate::geometry::SurfaceSize;
use crate::surface::DrawCommand;

/// Window background around the page
const DESK_COLOR: wgpu::Color = wgpu::Color {
    r: 0.18,
    g: 0.18,
    b: 0.2,
    a: 1.0,
};

/// Page fill (linear white)
pub const PAPER_COLOR: wgpu::Color = wgpu::Color::WHITE;

const LAYER_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba16Float;

/// The stacked layers, bottom to top
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    /// The rendered document page
    Page,
    /// Strokes
    Drawing,
    /// Particle trail
    Particles,
}

impl Layer {
    pub const ALL: [Layer; 3] = [Layer::Page, Layer::Drawing, Layer::Particles];

    fn index(self) -> usize {
        match self {
            Layer::Page => 0,
            Layer::Drawing => 1,
            Layer::Particles => 2,
        }
    }
}

/// Where the page sits on the window surface, in physical pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageViewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Uniforms for brush shader (layer size)
#[repr(C, align(16))] // Force 16-byte alignment for WebGL compatibility
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct BrushUniforms {
    canvas_size: [f32; 2],
    _padding: [f32; 2], // Align to 16 bytes
}

/// Uniforms for the fade shader
#[repr(C, align(16))]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct FadeUniforms {
    alpha: f32,
    _padding: [f32; 3],
}

/// Vertex data for a single brush dab instance
#[repr(C, align(16))] // Force 16-byte alignment for WebGL compatibility
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
struct DabInstance {
    position: [f32; 2],
    size: f32,
    opacity: f32,
    color: [f32; 4],
    hardness: f32,
    _padding: [f32; 3], // Align to 16 bytes
}

impl From<&BrushDab> for DabInstance {
    fn from(dab: &BrushDab) -> Self {
        Self {
            position: dab.position,
            size: dab.size,
            opacity: dab.opacity,
            // Stored as sRGB, blended in linear
            color: dab.color.to_linear(),
            hardness: dab.hardness,
            _padding: [0.0; 3],
        }
    }
}

/// GPU resources backing one layer
struct LayerTarget {
    size: SurfaceSize,
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
    brush_bind_group: wgpu::BindGroup,
    blit_bind_group: wgpu::BindGroup,
}

/// Renderer wraps the wgpu device, queue, surface and layer textures
pub struct Renderer {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    max_texture_dimension: u32,

    brush_pipeline: wgpu::RenderPipeline,
    brush_bind_group_layout: wgpu::BindGroupLayout,

    blit_pipeline: wgpu::RenderPipeline,
    blit_bind_group_layout: wgpu::BindGroupLayout,
    layer_sampler: wgpu::Sampler,

    fade_pipeline: wgpu::RenderPipeline,
    fade_uniform_buffer: wgpu::Buffer,
    fade_bind_group: wgpu::BindGroup,

    layers: Vec<LayerTarget>,
}

impl Renderer {
    /// Create a new renderer
    ///
    /// # Arguments
    /// * `window` - The window to render to
    /// * `size` - Initial window size in physical pixels
    /// * `page_size` - Initial size of every layer
    pub async fn new(
        window: impl Into<wgpu::SurfaceTarget<'static>>,
        size: winit::dpi::PhysicalSize<u32>,
        page_size: SurfaceSize,
    ) -> anyhow::Result<Self> {
        log::info!("🔧 Renderer::new() starting...");

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all() & !wgpu::Backends::BROWSER_WEBGPU,
            ..Default::default()
        });
        let surface = instance.create_surface(window).context("failed to create surface")?;
        log::info!("✅ Surface created");

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("failed to find a suitable adapter")?;

        let adapter_info = adapter.get_info();
        log::info!("✅ Adapter acquired: {:?} (backend: {:?})", adapter_info.name, adapter_info.backend);

        let adapter_limits = adapter.limits();
        let max_texture_dimension = adapter_limits.max_texture_dimension_2d;
        log::info!("📏 Max texture dimension: {}", max_texture_dimension);

        // Use the adapter's texture limits so large pages fit
        let mut device_limits = wgpu::Limits::default();
        device_limits.max_texture_dimension_2d = adapter_limits.max_texture_dimension_2d;
        device_limits.max_texture_dimension_1d = adapter_limits.max_texture_dimension_1d;

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("Overlay Canvas Device"),
                required_features: wgpu::Features::empty(),
                required_limits: device_limits,
                memory_hints: Default::default(),
                trace: Default::default(),
                experimental_features: Default::default(),
            })
            .await
            .context("failed to create device")?;
        log::info!("✅ Device and queue created");

        let surface_caps = surface.get_capabilities(&adapter);
        // Prefer sRGB formats so the linear layers are encoded on write
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .context("surface reports no supported formats")?;
        let present_mode = surface_caps
            .present_modes
            .first()
            .copied()
            .unwrap_or(wgpu::PresentMode::Fifo);
        log::info!("Selected surface format: {:?}", surface_format);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.min(max_texture_dimension),
            height: size.height.min(max_texture_dimension),
            present_mode,
            alpha_mode: wgpu::CompositeAlphaMode::Opaque,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        // Only configure if size is valid, otherwise wait for resize
        if config.width > 0 && config.height > 0 {
            surface.configure(&device, &config);
        } else {
            log::warn!("Skipping surface configuration (invalid size: {}x{})", config.width, config.height);
        }

        let (brush_pipeline, brush_bind_group_layout) = Self::create_brush_pipeline(&device);
        let (blit_pipeline, blit_bind_group_layout) = Self::create_blit_pipeline(&device, surface_format);
        let (fade_pipeline, fade_bind_group_layout) = Self::create_fade_pipeline(&device);
        log::info!("✅ Brush, blit and fade pipelines created");

        let layer_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Layer Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let fade_uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Fade Uniform Buffer"),
            contents: bytemuck::cast_slice(&[FadeUniforms {
                alpha: 0.0,
                _padding: [0.0; 3],
            }]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let fade_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Fade Bind Group"),
            layout: &fade_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: fade_uniform_buffer.as_entire_binding(),
            }],
        });

        let mut renderer = Self {
            surface,
            device,
            queue,
            config,
            max_texture_dimension,
            brush_pipeline,
            brush_bind_group_layout,
            blit_pipeline,
            blit_bind_group_layout,
            layer_sampler,
            fade_pipeline,
            fade_uniform_buffer,
            fade_bind_group,
            layers: Vec::with_capacity(Layer::ALL.len()),
        };
        for layer in Layer::ALL {
            let target = renderer.create_layer(layer, page_size);
            renderer.layers.push(target);
        }
        log::info!("✅ Renderer initialized: window {}x{}, page {}x{}", size.width, size.height, page_size.width, page_size.height);
        Ok(renderer)
    }

    fn create_brush_pipeline(device: &wgpu::Device) -> (wgpu::RenderPipeline, wgpu::BindGroupLayout) {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Brush Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/brush.wgsl").into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Brush Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Brush Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        // Vertex buffer layout for dab instances
        let vertex_buffer_layout = wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<DabInstance>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &[
                // position
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x2,
                },
                // size
                wgpu::VertexAttribute {
                    offset: 8,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32,
                },
                // opacity
                wgpu::VertexAttribute {
                    offset: 12,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32,
                },
                // color
                wgpu::VertexAttribute {
                    offset: 16,
                    shader_location: 3,
                    format: wgpu::VertexFormat::Float32x4,
                },
                // hardness
                wgpu::VertexAttribute {
                    offset: 32,
                    shader_location: 4,
                    format: wgpu::VertexFormat::Float32,
                },
            ],
        };

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Brush Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[vertex_buffer_layout],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: LAYER_FORMAT,
                    // Source RGB is already multiplied by alpha in the shader
                    blend: Some(wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: Self::quad_primitive(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        (pipeline, bind_group_layout)
    }

    fn create_blit_pipeline(
        device: &wgpu::Device,
        target_format: wgpu::TextureFormat,
    ) -> (wgpu::RenderPipeline, wgpu::BindGroupLayout) {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Blit Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/blit.wgsl").into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Blit Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        multisampled: false,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
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
            label: Some("Blit Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Blit Pipeline"),
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
                    format: target_format,
                    // Layers are stacked, so each blit composites over the last
                    blend: Some(wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: Self::quad_primitive(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        (pipeline, bind_group_layout)
    }

    fn create_fade_pipeline(device: &wgpu::Device) -> (wgpu::RenderPipeline, wgpu::BindGroupLayout) {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Fade Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/fade.wgsl").into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Fade Bind Group Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Fade Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        // dst * (1 - alpha) on every channel
        let fade = wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::Zero,
            dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
            operation: wgpu::BlendOperation::Add,
        };

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Fade Pipeline"),
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
                    format: LAYER_FORMAT,
                    blend: Some(wgpu::BlendState { color: fade, alpha: fade }),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: Self::quad_primitive(),
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        (pipeline, bind_group_layout)
    }

    fn quad_primitive() -> wgpu::PrimitiveState {
        wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        }
    }

    /// Allocate a transparent layer texture with its bind groups
    fn create_layer(&self, layer: Layer, size: SurfaceSize) -> LayerTarget {
        let width = size.width.clamp(1, self.max_texture_dimension);
        let height = size.height.clamp(1, self.max_texture_dimension);
        if width != size.width || height != size.height {
            log::warn!(
                "⚠️ {:?} layer {}x{} clamped to {}x{} (max texture size {})",
                layer,
                size.width,
                size.height,
                width,
                height,
                self.max_texture_dimension
            );
        }

        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Layer Texture"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: LAYER_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let brush_uniform_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Brush Uniform Buffer"),
            contents: bytemuck::cast_slice(&[BrushUniforms {
                canvas_size: [width as f32, height as f32],
                _padding: [0.0; 2],
            }]),
            usage: wgpu::BufferUsages::UNIFORM,
        });
        let brush_bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Brush Bind Group"),
            layout: &self.brush_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: brush_uniform_buffer.as_entire_binding(),
            }],
        });
        let blit_bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Blit Bind Group"),
            layout: &self.blit_bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.layer_sampler),
                },
            ],
        });

        let target = LayerTarget {
            size: SurfaceSize::new(width, height),
            _texture: texture,
            view,
            brush_bind_group,
            blit_bind_group,
        };
        // New textures are zeroed on creation, but be explicit about transparency
        self.clear_view(&target.view, wgpu::Color::TRANSPARENT);
        target
    }

    /// Reconfigure the window surface
    pub fn resize_surface(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        self.config.width = new_size.width.min(self.max_texture_dimension);
        self.config.height = new_size.height.min(self.max_texture_dimension);
        self.surface.configure(&self.device, &self.config);
        log::debug!("Surface configured: {}x{}", self.config.width, self.config.height);
    }

    /// Replace a layer with a transparent one of `size`
    pub fn resize_layer(&mut self, layer: Layer, size: SurfaceSize) {
        let target = self.create_layer(layer, size);
        self.layers[layer.index()] = target;
        log::debug!("{:?} layer resized to {}x{}", layer, size.width, size.height);
    }

    /// Replay recorded surface commands into a layer, in order
    pub fn apply(&mut self, layer: Layer, commands: Vec<DrawCommand>) {
        let mut dabs: Vec<BrushDab> = Vec::new();
        for command in commands {
            match command {
                DrawCommand::Polyline { points, style } => dabs.extend(brush::polyline_dabs(&points, &style)),
                DrawCommand::Circle {
                    center,
                    radius,
                    color,
                    alpha,
                } => dabs.push(BrushDab::circle(center, radius, color, alpha)),
                DrawCommand::Clear => {
                    // Anything pending would be wiped anyway
                    dabs.clear();
                    self.clear_layer(layer, wgpu::Color::TRANSPARENT);
                }
                DrawCommand::Resize(size) => {
                    dabs.clear();
                    if self.layers[layer.index()].size != size {
                        self.resize_layer(layer, size);
                    } else {
                        self.clear_layer(layer, wgpu::Color::TRANSPARENT);
                    }
                }
                DrawCommand::Fade { alpha } => {
                    self.render_dabs(layer, &dabs);
                    dabs.clear();
                    self.fade_layer(layer, alpha);
                }
            }
        }
        self.render_dabs(layer, &dabs);
    }

    /// Render brush dabs into a layer
    pub fn render_dabs(&self, layer: Layer, dabs: &[BrushDab]) {
        if dabs.is_empty() {
            return;
        }
        let target = &self.layers[layer.index()];
        let instances: Vec<DabInstance> = dabs.iter().map(DabInstance::from).collect();

        let instance_buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Dab Instance Buffer"),
            contents: bytemuck::cast_slice(&instances),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Brush Render Encoder"),
        });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Brush Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &target.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load, // Keep existing layer content
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            render_pass.set_pipeline(&self.brush_pipeline);
            render_pass.set_bind_group(0, &target.brush_bind_group, &[]);
            render_pass.set_vertex_buffer(0, instance_buffer.slice(..));
            // Draw 6 vertices per instance (2 triangles = 1 quad per dab)
            render_pass.draw(0..6, 0..instances.len() as u32);
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        log::trace!("Rendered {} dabs into {:?}", dabs.len(), layer);
    }

    /// Fade a layer toward transparent
    pub fn fade_layer(&self, layer: Layer, alpha: f32) {
        let target = &self.layers[layer.index()];
        self.queue.write_buffer(
            &self.fade_uniform_buffer,
            0,
            bytemuck::cast_slice(&[FadeUniforms {
                alpha: alpha.clamp(0.0, 1.0),
                _padding: [0.0; 3],
            }]),
        );

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Fade Encoder"),
        });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Fade Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &target.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            render_pass.set_pipeline(&self.fade_pipeline);
            render_pass.set_bind_group(0, &self.fade_bind_group, &[]);
            render_pass.draw(0..6, 0..1);
        }
        self.queue.submit(std::iter::once(encoder.finish()));
    }

    /// Clear a layer to a color
    pub fn clear_layer(&self, layer: Layer, color: wgpu::Color) {
        self.clear_view(&self.layers[layer.index()].view, color);
    }

    fn clear_view(&self, view: &wgpu::TextureView, color: wgpu::Color) {
        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Clear Layer Encoder"),
        });
        {
            let _render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Clear Layer Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(color),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
        }
        self.queue.submit(std::iter::once(encoder.finish()));
    }

    /// Composite the layers onto the window surface
    pub fn render(&mut self, viewport: PageViewport) {
        if self.config.width == 0 || self.config.height == 0 {
            log::warn!("Invalid surface state, skipping render");
            return;
        }

        let output = match self.surface.get_current_texture() {
            Ok(output) => output,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::warn!("Surface lost or outdated, reconfiguring");
                self.surface.configure(&self.device, &self.config);
                return;
            }
            Err(e) => {
                log::error!("Failed to get surface texture: {:?}", e);
                return;
            }
        };
        let view = output.texture.create_view(&wgpu::TextureViewDescriptor::default());

        // The viewport must stay inside the surface
        let x = viewport.x.clamp(0.0, self.config.width as f32);
        let y = viewport.y.clamp(0.0, self.config.height as f32);
        let width = viewport.width.min(self.config.width as f32 - x);
        let height = viewport.height.min(self.config.height as f32 - y);

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Render Encoder"),
        });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Composite Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(DESK_COLOR),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            if width >= 1.0 && height >= 1.0 {
                render_pass.set_pipeline(&self.blit_pipeline);
                render_pass.set_viewport(x, y, width, height, 0.0, 1.0);
                for target in &self.layers {
                    render_pass.set_bind_group(0, &target.blit_bind_group, &[]);
                    render_pass.draw(0..6, 0..1);
                }
            }
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();
    }
}
