//! Shader loading from disk.
//!
//! The pipeline stage comes from the file name: `.vert` anywhere in it
//! means vertex, `.frag` means fragment (`text.vert.wgsl`,
//! `shader_spv.frag`). File contents starting with the SPIR-V magic number
//! are loaded as SPIR-V; anything else must be WGSL source. The entry point
//! is always `main`.
//!
//! ## Binding convention
//!
//! Bind group 0 holds vertex-stage resources, group 1 fragment-stage
//! resources. Inside a group bindings are numbered in this order:
//!
//! 1. uniform buffers
//! 2. sampled textures, each followed by its sampler
//! 3. read-only storage buffers
//! 4. read-only storage textures (`rgba8unorm`)

use std::borrow::Cow;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use wgpu::{
    BindGroupLayoutEntry, BindingType, BufferBindingType, Device, ErrorFilter,
    SamplerBindingType, ShaderModule, ShaderModuleDescriptor, ShaderSource, ShaderStages,
    StorageTextureAccess, TextureFormat, TextureSampleType, TextureViewDimension,
};

/// First word of every SPIR-V module.
const SPIRV_MAGIC: u32 = 0x0723_0203;

/// Entry point expected in every shader file.
pub const ENTRY_POINT: &str = "main";

#[derive(Error, Debug)]
pub enum ShaderError {
    #[error("Cannot infer shader stage from {0} (expected .vert or .frag in the name)")]
    InvalidStage(PathBuf),
    #[error("Failed to load shader {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Shader {0} is neither SPIR-V nor UTF-8 WGSL")]
    InvalidSource(PathBuf),
    #[error("Failed to create shader {path}: {message}")]
    Compile { path: PathBuf, message: String },
}

/// Pipeline stage a shader runs in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl ShaderStage {
    /// Infer the stage from the file name.
    pub fn from_path(path: &Path) -> Result<Self, ShaderError> {
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        if name.contains(".vert") {
            Ok(Self::Vertex)
        } else if name.contains(".frag") {
            Ok(Self::Fragment)
        } else {
            Err(ShaderError::InvalidStage(path.to_path_buf()))
        }
    }

    pub fn visibility(self) -> ShaderStages {
        match self {
            Self::Vertex => ShaderStages::VERTEX,
            Self::Fragment => ShaderStages::FRAGMENT,
        }
    }

    /// Bind group holding this stage's resources.
    pub fn bind_group(self) -> u32 {
        match self {
            Self::Vertex => 0,
            Self::Fragment => 1,
        }
    }
}

/// Resource counts a shader consumes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ShaderResources {
    pub samplers: u32,
    pub uniform_buffers: u32,
    pub storage_buffers: u32,
    pub storage_textures: u32,
}

/// What to load and which resources it declares.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShaderDesc {
    pub path: PathBuf,
    pub resources: ShaderResources,
}

impl ShaderDesc {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            resources: ShaderResources::default(),
        }
    }

    pub fn with_samplers(mut self, count: u32) -> Self {
        self.resources.samplers = count;
        self
    }

    pub fn with_uniform_buffers(mut self, count: u32) -> Self {
        self.resources.uniform_buffers = count;
        self
    }

    pub fn with_storage_buffers(mut self, count: u32) -> Self {
        self.resources.storage_buffers = count;
        self
    }

    pub fn with_storage_textures(mut self, count: u32) -> Self {
        self.resources.storage_textures = count;
        self
    }
}

/// A compiled shader module plus what it declared.
#[derive(Debug)]
pub struct Shader {
    pub stage: ShaderStage,
    pub module: ShaderModule,
    pub resources: ShaderResources,
    pub path: PathBuf,
}

impl Shader {
    /// Bind group layout entries for this shader's group.
    pub fn layout_entries(&self) -> Vec<BindGroupLayoutEntry> {
        layout_entries(self.stage, &self.resources)
    }
}

/// Read, decode and compile a shader.
pub async fn load_shader(device: &Device, desc: &ShaderDesc) -> Result<Shader, ShaderError> {
    let (stage, bytes) = read_shader(desc)?;
    let source = decode_source(&desc.path, &bytes)?;
    let label = desc.path.display().to_string();

    device.push_error_scope(ErrorFilter::Validation);
    let module = device.create_shader_module(ShaderModuleDescriptor {
        label: Some(&label),
        source,
    });
    if let Some(err) = device.pop_error_scope().await {
        return Err(ShaderError::Compile {
            path: desc.path.clone(),
            message: err.to_string(),
        });
    }

    log::debug!("loaded {stage:?} shader {label}");
    Ok(Shader {
        stage,
        module,
        resources: desc.resources,
        path: desc.path.clone(),
    })
}

/// Infer the stage and read the file.
pub fn read_shader(desc: &ShaderDesc) -> Result<(ShaderStage, Vec<u8>), ShaderError> {
    let stage = ShaderStage::from_path(&desc.path)?;
    let bytes = std::fs::read(&desc.path).map_err(|source| ShaderError::Io {
        path: desc.path.clone(),
        source,
    })?;
    Ok((stage, bytes))
}

fn is_spirv(bytes: &[u8]) -> bool {
    bytes.len() >= 4
        && bytes.len() % 4 == 0
        && u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) == SPIRV_MAGIC
}

fn decode_source<'a>(path: &Path, bytes: &'a [u8]) -> Result<ShaderSource<'a>, ShaderError> {
    if is_spirv(bytes) {
        return Ok(wgpu::util::make_spirv(bytes));
    }
    std::str::from_utf8(bytes)
        .map(|wgsl| ShaderSource::Wgsl(Cow::Borrowed(wgsl)))
        .map_err(|_| ShaderError::InvalidSource(path.to_path_buf()))
}

fn layout_entries(stage: ShaderStage, resources: &ShaderResources) -> Vec<BindGroupLayoutEntry> {
    let visibility = stage.visibility();
    let mut entries = Vec::new();
    let mut binding = 0u32;
    let mut push = |ty: BindingType| {
        entries.push(BindGroupLayoutEntry {
            binding,
            visibility,
            ty,
            count: None,
        });
        binding += 1;
    };

    for _ in 0..resources.uniform_buffers {
        push(BindingType::Buffer {
            ty: BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        });
    }
    for _ in 0..resources.samplers {
        push(BindingType::Texture {
            sample_type: TextureSampleType::Float { filterable: true },
            view_dimension: TextureViewDimension::D2,
            multisampled: false,
        });
        push(BindingType::Sampler(SamplerBindingType::Filtering));
    }
    for _ in 0..resources.storage_buffers {
        push(BindingType::Buffer {
            ty: BufferBindingType::Storage { read_only: true },
            has_dynamic_offset: false,
            min_binding_size: None,
        });
    }
    for _ in 0..resources.storage_textures {
        push(BindingType::StorageTexture {
            access: StorageTextureAccess::ReadOnly,
            format: TextureFormat::Rgba8Unorm,
            view_dimension: TextureViewDimension::D2,
        });
    }

    entries
}

// ===================================================================
// Tests
// ===================================================================
