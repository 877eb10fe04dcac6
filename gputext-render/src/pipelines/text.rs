//! Text render pipeline: indexed triangles sampling glyph atlas pages.
//!
//! Owns everything the GPU needs for a frame of text: the pipeline built
//! from the loaded vertex/fragment shaders, vertex and index buffers sized
//! to the geometry capacity, the staging belt geometry travels through, the
//! transform uniform, the sampler and one texture per atlas page.

use std::hash::Hash;

use gputext_text::GlyphAtlas;
use thiserror::Error;
use wgpu::util::StagingBelt;
use wgpu::{
    AddressMode, BindGroup, BindGroupDescriptor, BindGroupEntry, BindGroupLayout,
    BindGroupLayoutDescriptor, BindingResource, BlendComponent, BlendFactor, BlendOperation,
    BlendState, Buffer, BufferDescriptor, BufferSize, BufferUsages, ColorTargetState,
    ColorWrites, CommandEncoder, Device, ErrorFilter, Extent3d, FilterMode, FragmentState,
    FrontFace, IndexFormat, MultisampleState, PipelineCompilationOptions,
    PipelineLayoutDescriptor, PolygonMode, PrimitiveState, PrimitiveTopology, Queue,
    RenderPass, RenderPipeline, RenderPipelineDescriptor, Sampler, SamplerDescriptor,
    Texture, TextureDescriptor, TextureDimension, TextureFormat, TextureUsages, VertexState,
};

use crate::geometry::{Batch, GeometryBuffer, GeometryError};
use crate::shader::{Shader, ShaderResources, ShaderStage, ENTRY_POINT};
use crate::vertex::{TransformUniform, Vertex};

/// Atlas page texel format.
const ATLAS_FORMAT: TextureFormat = TextureFormat::Rgba8UnormSrgb;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Failed to create GPU resources: {0}")]
    ResourceCreationFailed(String),
    #[error("Shader {path} is a {found:?} shader, expected {expected:?}")]
    WrongStage {
        path: String,
        expected: ShaderStage,
        found: ShaderStage,
    },
    #[error("Shader {path} declares {found:?}, the text pipeline binds {expected:?}")]
    WrongResources {
        path: String,
        expected: ShaderResources,
        found: ShaderResources,
    },
}

/// Resources the vertex stage must declare: the transform uniform.
pub const VERTEX_RESOURCES: ShaderResources = ShaderResources {
    samplers: 0,
    uniform_buffers: 1,
    storage_buffers: 0,
    storage_textures: 0,
};

/// Resources the fragment stage must declare: the atlas page + sampler.
pub const FRAGMENT_RESOURCES: ShaderResources = ShaderResources {
    samplers: 1,
    uniform_buffers: 0,
    storage_buffers: 0,
    storage_textures: 0,
};

/// GPU copy of one atlas page.
struct PageTexture {
    texture: Texture,
    bind_group: BindGroup,
    revision: u64,
}

/// Owns the wgpu pipeline, buffers, textures, and bind groups for text.
pub struct TextPipeline {
    pipeline: RenderPipeline,

    // Geometry.
    vertex_buffer: Buffer,
    index_buffer: Buffer,
    max_vertices: usize,
    max_indices: usize,
    staging: StagingBelt,

    // Transforms (group 0).
    transform_buffer: Buffer,
    transform_bind_group: BindGroup,

    // Atlas pages (group 1).
    atlas_bgl: BindGroupLayout,
    sampler: Sampler,
    pages: Vec<PageTexture>,
}

impl TextPipeline {
    /// Build the pipeline and allocate buffers for `max_vertices` /
    /// `max_indices` worth of geometry.
    pub async fn new(
        device: &Device,
        surface_format: TextureFormat,
        vertex: &Shader,
        fragment: &Shader,
        max_vertices: usize,
        max_indices: usize,
    ) -> Result<Self, PipelineError> {
        check_shader(vertex, ShaderStage::Vertex, VERTEX_RESOURCES)?;
        check_shader(fragment, ShaderStage::Fragment, FRAGMENT_RESOURCES)?;

        device.push_error_scope(ErrorFilter::OutOfMemory);
        device.push_error_scope(ErrorFilter::Validation);
        let pipeline = Self::create(device, surface_format, vertex, fragment, max_vertices, max_indices);
        let validation = device.pop_error_scope().await;
        let out_of_memory = device.pop_error_scope().await;

        if let Some(err) = validation.or(out_of_memory) {
            return Err(PipelineError::ResourceCreationFailed(err.to_string()));
        }
        log::debug!(
            "text pipeline ready: {max_vertices} vertices / {max_indices} indices, {surface_format:?}"
        );
        Ok(pipeline)
    }

    fn create(
        device: &Device,
        surface_format: TextureFormat,
        vertex: &Shader,
        fragment: &Shader,
        max_vertices: usize,
        max_indices: usize,
    ) -> Self {
        // ── Bind group layouts ──────────────────────────────────
        let transform_bgl = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("text_transform_bgl"),
            entries: &vertex.layout_entries(),
        });
        let atlas_bgl = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("text_atlas_bgl"),
            entries: &fragment.layout_entries(),
        });

        let pipeline_layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
            label: Some("text_pipeline_layout"),
            bind_group_layouts: &[&transform_bgl, &atlas_bgl],
            push_constant_ranges: &[],
        });

        // ── Render pipeline ─────────────────────────────────────
        let blend = BlendState {
            color: BlendComponent {
                src_factor: BlendFactor::SrcAlpha,
                dst_factor: BlendFactor::OneMinusSrcAlpha,
                operation: BlendOperation::Add,
            },
            alpha: BlendComponent {
                src_factor: BlendFactor::SrcAlpha,
                dst_factor: BlendFactor::DstAlpha,
                operation: BlendOperation::Add,
            },
        };

        let pipeline = device.create_render_pipeline(&RenderPipelineDescriptor {
            label: Some("text_pipeline"),
            layout: Some(&pipeline_layout),
            vertex: VertexState {
                module: &vertex.module,
                entry_point: Some(ENTRY_POINT),
                compilation_options: PipelineCompilationOptions::default(),
                buffers: &[Vertex::layout()],
            },
            fragment: Some(FragmentState {
                module: &fragment.module,
                entry_point: Some(ENTRY_POINT),
                compilation_options: PipelineCompilationOptions::default(),
                targets: &[Some(ColorTargetState {
                    format: surface_format,
                    blend: Some(blend),
                    write_mask: ColorWrites::ALL,
                })],
            }),
            primitive: PrimitiveState {
                topology: PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        // ── Geometry buffers ────────────────────────────────────
        let vertex_bytes = (max_vertices as u64).saturating_mul(std::mem::size_of::<Vertex>() as u64);
        let index_bytes = (max_indices as u64).saturating_mul(std::mem::size_of::<u32>() as u64);

        let vertex_buffer = device.create_buffer(&BufferDescriptor {
            label: Some("text_vb"),
            size: vertex_bytes.max(4),
            usage: BufferUsages::VERTEX | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let index_buffer = device.create_buffer(&BufferDescriptor {
            label: Some("text_ib"),
            size: index_bytes.max(4),
            usage: BufferUsages::INDEX | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        // One chunk holds a full frame, like a single transfer buffer.
        let staging = StagingBelt::new(vertex_bytes.saturating_add(index_bytes).max(4));

        // ── Transform uniform ───────────────────────────────────
        let transform_buffer = device.create_buffer(&BufferDescriptor {
            label: Some("text_transform_ub"),
            size: std::mem::size_of::<TransformUniform>() as u64,
            usage: BufferUsages::UNIFORM | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let transform_bind_group = device.create_bind_group(&BindGroupDescriptor {
            label: Some("text_transform_bg"),
            layout: &transform_bgl,
            entries: &[BindGroupEntry {
                binding: 0,
                resource: transform_buffer.as_entire_binding(),
            }],
        });

        // ── Sampler ─────────────────────────────────────────────
        let sampler = device.create_sampler(&SamplerDescriptor {
            label: Some("glyph_atlas_sampler"),
            address_mode_u: AddressMode::ClampToEdge,
            address_mode_v: AddressMode::ClampToEdge,
            address_mode_w: AddressMode::ClampToEdge,
            mag_filter: FilterMode::Nearest,
            min_filter: FilterMode::Nearest,
            mipmap_filter: FilterMode::Nearest,
            ..Default::default()
        });

        Self {
            pipeline,
            vertex_buffer,
            index_buffer,
            max_vertices,
            max_indices,
            staging,
            transform_buffer,
            transform_bind_group,
            atlas_bgl,
            sampler,
            pages: Vec::new(),
        }
    }

    // ───────────────────── Upload ─────────────────────────────────

    /// Upload atlas pages whose revision changed since the last sync.
    ///
    /// Returns the number of pages uploaded.
    pub fn sync_atlas<K: Eq + Hash + Copy>(
        &mut self,
        device: &Device,
        queue: &Queue,
        atlas: &GlyphAtlas<K>,
    ) -> usize {
        let mut uploaded = 0;
        for (index, page) in atlas.pages().iter().enumerate() {
            let needs_texture = self
                .pages
                .get(index)
                .map_or(true, |p| p.texture.width() != page.size());
            if needs_texture {
                let gpu_page = self.create_page(device, index, page.size());
                if index < self.pages.len() {
                    self.pages[index] = gpu_page;
                } else {
                    self.pages.push(gpu_page);
                }
            }

            let gpu_page = &mut self.pages[index];
            if gpu_page.revision == page.revision() {
                continue;
            }

            let size = page.size();
            queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    texture: &gpu_page.texture,
                    mip_level: 0,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                page.data(),
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(size * 4), // RGBA = 4 bytes per pixel
                    rows_per_image: Some(size),
                },
                Extent3d {
                    width: size,
                    height: size,
                    depth_or_array_layers: 1,
                },
            );
            gpu_page.revision = page.revision();
            uploaded += 1;
        }

        // Pages dropped by an atlas clear.
        self.pages.truncate(atlas.page_count());

        if uploaded > 0 {
            log::debug!("uploaded {uploaded} atlas page(s)");
        }
        uploaded
    }

    fn create_page(&self, device: &Device, index: usize, size: u32) -> PageTexture {
        let texture = device.create_texture(&TextureDescriptor {
            label: Some("glyph_atlas_page"),
            size: Extent3d {
                width: size,
                height: size,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: TextureDimension::D2,
            format: ATLAS_FORMAT,
            usage: TextureUsages::TEXTURE_BINDING | TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = device.create_bind_group(&BindGroupDescriptor {
            label: Some("text_atlas_bg"),
            layout: &self.atlas_bgl,
            entries: &[
                BindGroupEntry {
                    binding: 0,
                    resource: BindingResource::TextureView(&view),
                },
                BindGroupEntry {
                    binding: 1,
                    resource: BindingResource::Sampler(&self.sampler),
                },
            ],
        });
        log::debug!("created texture for atlas page {index} ({size}px)");

        PageTexture {
            texture,
            bind_group,
            // Revisions start at 1, so a fresh texture always uploads.
            revision: 0,
        }
    }

    /// Upload the transform uniform for this frame.
    pub fn upload_transforms(&self, queue: &Queue, transforms: &TransformUniform) {
        queue.write_buffer(&self.transform_buffer, 0, bytemuck::bytes_of(transforms));
    }

    /// Record the copy of this frame's geometry through the staging belt.
    ///
    /// Call [`finish_staging`](Self::finish_staging) before submitting
    /// `encoder` and [`recall_staging`](Self::recall_staging) after.
    pub fn stage_geometry(
        &mut self,
        device: &Device,
        encoder: &mut CommandEncoder,
        geometry: &GeometryBuffer,
    ) -> Result<(), GeometryError> {
        if geometry.vertex_count() > self.max_vertices {
            return Err(GeometryError::CapacityExceeded {
                kind: "vertices",
                requested: geometry.vertex_count(),
                available: self.max_vertices,
            });
        }
        if geometry.index_count() > self.max_indices {
            return Err(GeometryError::CapacityExceeded {
                kind: "indices",
                requested: geometry.index_count(),
                available: self.max_indices,
            });
        }

        let upload = geometry.upload();
        if let Some(size) = BufferSize::new(upload.vertices.len() as u64) {
            self.staging
                .write_buffer(encoder, &self.vertex_buffer, 0, size, device)
                .copy_from_slice(upload.vertices);
        }
        if let Some(size) = BufferSize::new(upload.indices.len() as u64) {
            self.staging
                .write_buffer(encoder, &self.index_buffer, 0, size, device)
                .copy_from_slice(upload.indices);
        }
        Ok(())
    }

    /// Close the staging chunks written this frame.
    pub fn finish_staging(&mut self) {
        self.staging.finish();
    }

    /// Reclaim staging chunks once the frame has been submitted.
    pub fn recall_staging(&mut self) {
        self.staging.recall();
    }

    // ───────────────────── Draw ───────────────────────────────────

    /// Record one indexed draw per batch. Returns the number of draw calls.
    ///
    /// Batches referring to a page that has no texture yet are skipped.
    pub fn draw(&self, pass: &mut RenderPass<'_>, batches: &[Batch]) -> u32 {
        if batches.is_empty() {
            return 0;
        }

        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.transform_bind_group, &[]);
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        pass.set_index_buffer(self.index_buffer.slice(..), IndexFormat::Uint32);

        let mut draw_calls = 0;
        for batch in batches {
            let Some(page) = self.pages.get(batch.atlas_page) else {
                log::warn!("atlas page {} not uploaded, batch skipped", batch.atlas_page);
                continue;
            };
            pass.set_bind_group(1, &page.bind_group, &[]);
            pass.draw_indexed(batch.indices.clone(), 0, 0..1);
            draw_calls += 1;
        }
        draw_calls
    }

    /// Number of atlas pages resident on the GPU.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Geometry capacity as `(vertices, indices)`.
    pub fn capacity(&self) -> (usize, usize) {
        (self.max_vertices, self.max_indices)
    }
}

fn check_shader(shader: &Shader, stage: ShaderStage, resources: ShaderResources) -> Result<(), PipelineError> {
    let path = shader.path.display().to_string();
    if shader.stage != stage {
        return Err(PipelineError::WrongStage {
            path,
            expected: stage,
            found: shader.stage,
        });
    }
    if shader.resources != resources {
        return Err(PipelineError::WrongResources {
            path,
            expected: resources,
            found: shader.resources,
        });
    }
    Ok(())
}

// ===================================================================
// Tests
// ===================================================================
