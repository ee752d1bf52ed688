//! WGSL compilation and binding reflection.
//!
//! [`ShaderReflector::compile`] turns one entry point of a WGSL source into a
//! [`CompiledStage`]: the SPIR-V binary for that entry point plus the
//! [`BindingTable`] of every global resource the entry point actually uses.
//!
//! # Classification
//!
//! | WGSL global | Table |
//! |-------------|-------|
//! | `var<uniform>` | constant buffer layout + constant-buffer slot |
//! | `var<storage, read>`, sampled/depth textures | read-only slot |
//! | `var<storage, read_write>`, writable storage textures | read-write slot |
//! | samplers | not tabulated |
//!
//! The slot number is the `@binding` index; bind groups are flattened.
//!
//! # Failure dumps
//!
//! When a dump directory is set, a source that fails to compile is written to
//! `<dir>/<entry>_<YYYYmmdd_HHMMSS.fff>.wgsl` for offline inspection.

use std::path::{Path, PathBuf};

use matforge_core::profiling::profile_scope;
use naga::{AddressSpace, ImageClass, StorageAccess, TypeInner};

use crate::error::ShaderError;
use crate::materials::{BindingTable, ConstantBufferLayout, MemberLayout, ResourceClass};

/// Entry point of the lighting stage.
pub const LIGHTING_ENTRY_POINT: &str = "lighting_main";

/// Entry point of the shadow stage.
pub const SHADOW_ENTRY_POINT: &str = "shadow_main";

/// Pipeline stage of a compiled entry point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
    Compute,
}

impl From<naga::ShaderStage> for ShaderStage {
    fn from(stage: naga::ShaderStage) -> Self {
        match stage {
            naga::ShaderStage::Vertex => Self::Vertex,
            naga::ShaderStage::Fragment => Self::Fragment,
            naga::ShaderStage::Compute => Self::Compute,
        }
    }
}

/// One compiled entry point and its reflected bindings.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledStage {
    entry_point: String,
    stage: ShaderStage,
    spirv: Vec<u32>,
    bindings: BindingTable,
}

impl CompiledStage {
    pub fn entry_point(&self) -> &str {
        &self.entry_point
    }

    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    /// The opaque binary handed to the GPU.
    pub fn spirv(&self) -> &[u32] {
        &self.spirv
    }

    pub fn bindings(&self) -> &BindingTable {
        &self.bindings
    }
}

/// Compiles WGSL entry points and reflects their bindings.
#[derive(Debug, Clone, Default)]
pub struct ShaderReflector {
    dump_dir: Option<PathBuf>,
}

impl ShaderReflector {
    /// A reflector that does not dump failing sources.
    pub fn new() -> Self {
        Self::default()
    }

    /// Dump failing sources into `dir`.
    #[must_use]
    pub fn with_dump_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dump_dir = Some(dir.into());
        self
    }

    pub fn dump_dir(&self) -> Option<&Path> {
        self.dump_dir.as_deref()
    }

    /// Compile `entry_point` of `source` and reflect its bindings.
    pub fn compile(&self, source: &str, entry_point: &str) -> Result<CompiledStage, ShaderError> {
        profile_scope!("shader_compile");

        if source.trim().is_empty() {
            log::error!("Shader compile rejected: empty source");
            return Err(ShaderError::InvalidArgument("empty shader source".into()));
        }
        if entry_point.is_empty() {
            log::error!("Shader compile rejected: empty entry point");
            return Err(ShaderError::InvalidArgument("empty entry point".into()));
        }

        match compile_stage(source, entry_point) {
            Ok(stage) => {
                log::debug!(
                    "Compiled '{}': {} words, {} constant buffers, {} slots",
                    entry_point,
                    stage.spirv.len(),
                    stage.bindings.constant_buffers.len(),
                    stage.bindings.slots.len()
                );
                Ok(stage)
            }
            Err(e) => {
                log::error!("Failed to compile '{entry_point}': {e}");
                if let Some(dir) = &self.dump_dir {
                    match dump_failed_source(dir, source, entry_point) {
                        Ok(path) => log::info!("Failing source written to {}", path.display()),
                        Err(io) => log::warn!("Could not dump failing source: {io}"),
                    }
                }
                Err(e)
            }
        }
    }
}

fn compile_stage(source: &str, entry_point: &str) -> Result<CompiledStage, ShaderError> {
    let module = naga::front::wgsl::parse_str(source)
        .map_err(|e| ShaderError::Parse(e.emit_to_string(source)))?;

    let mut validator = naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    );
    let info = validator
        .validate(&module)
        .map_err(|e| ShaderError::Validation(e.emit_to_string(source)))?;

    let (index, naga_stage) = module
        .entry_points
        .iter()
        .enumerate()
        .find(|(_, ep)| ep.name == entry_point)
        .map(|(i, ep)| (i, ep.stage))
        .ok_or_else(|| ShaderError::EntryPointNotFound(entry_point.to_string()))?;

    let bindings = reflect_entry_point(&module, &info, index)?;

    let options = naga::back::spv::Options {
        lang_version: (1, 3),
        ..Default::default()
    };
    let pipeline_options = naga::back::spv::PipelineOptions {
        shader_stage: naga_stage,
        entry_point: entry_point.to_string(),
    };
    let spirv = naga::back::spv::write_vec(&module, &info, &options, Some(&pipeline_options))
        .map_err(|e| ShaderError::Codegen(e.to_string()))?;

    Ok(CompiledStage {
        entry_point: entry_point.to_string(),
        stage: naga_stage.into(),
        spirv,
        bindings,
    })
}

/// Build the binding table of the globals used by entry point `index`.
fn reflect_entry_point(
    module: &naga::Module,
    info: &naga::valid::ModuleInfo,
    index: usize,
) -> Result<BindingTable, ShaderError> {
    let function_info = info.get_entry_point(index);
    let mut table = BindingTable::new();

    for (handle, var) in module.global_variables.iter() {
        if function_info[handle].is_empty() {
            continue;
        }
        let Some(binding) = &var.binding else {
            continue;
        };
        let ty = &module.types[var.ty];
        let name = var
            .name
            .clone()
            .or_else(|| ty.name.clone())
            .ok_or_else(|| {
                ShaderError::Reflection(format!(
                    "unnamed resource at group {} binding {}",
                    binding.group, binding.binding
                ))
            })?;

        match var.space {
            AddressSpace::Uniform => {
                let layout = constant_buffer_layout(module, &name, ty);
                log::trace!("  cbuffer {name} ({} bytes) @ {}", layout.total_size, binding.binding);
                table.constant_buffers.insert(name.clone(), layout);
                table
                    .slots
                    .insert(ResourceClass::ConstantBuffer, name, binding.binding);
            }
            AddressSpace::Storage { access } => {
                let class = if access.contains(StorageAccess::STORE) {
                    ResourceClass::ReadWrite
                } else {
                    ResourceClass::ReadOnly
                };
                log::trace!("  storage {name} {class:?} @ {}", binding.binding);
                table.slots.insert(class, name, binding.binding);
            }
            AddressSpace::Handle => match classify_handle(module, &ty.inner) {
                Some(class) => {
                    log::trace!("  handle {name} {class:?} @ {}", binding.binding);
                    table.slots.insert(class, name, binding.binding);
                }
                None => log::trace!("  skipping {name}"),
            },
            _ => {}
        }
    }

    Ok(table)
}

fn constant_buffer_layout(module: &naga::Module, name: &str, ty: &naga::Type) -> ConstantBufferLayout {
    let ctx = module.to_ctx();
    match &ty.inner {
        TypeInner::Struct { members, span } => {
            let mut layout = ConstantBufferLayout::new(*span);
            for member in members {
                let Some(member_name) = &member.name else {
                    continue;
                };
                let size = module.types[member.ty].inner.size(ctx);
                layout.members.insert(
                    member_name.clone(),
                    MemberLayout {
                        offset: member.offset,
                        size,
                    },
                );
            }
            layout
        }
        // A bare uniform value is a buffer with one member named after it.
        other => {
            let size = other.size(ctx);
            ConstantBufferLayout::new(size).with_member(name, 0, size)
        }
    }
}

fn classify_handle(module: &naga::Module, inner: &TypeInner) -> Option<ResourceClass> {
    match inner {
        TypeInner::Image {
            class: ImageClass::Storage { access, .. },
            ..
        } => Some(if access.contains(StorageAccess::STORE) {
            ResourceClass::ReadWrite
        } else {
            ResourceClass::ReadOnly
        }),
        TypeInner::Image { .. } => Some(ResourceClass::ReadOnly),
        TypeInner::BindingArray { base, .. } => classify_handle(module, &module.types[*base].inner),
        _ => None,
    }
}

fn dump_failed_source(dir: &Path, source: &str, entry_point: &str) -> std::io::Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S%.3f");
    let path = dir.join(format!("{entry_point}_{stamp}.wgsl"));
    std::fs::write(&path, source)?;
    Ok(path)
}

static_assertions::assert_impl_all!(CompiledStage: Send, Sync);
static_assertions::assert_impl_all!(ShaderReflector: Send, Sync);
