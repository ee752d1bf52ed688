//! Flattening materials and meshes for exporter modules.
//!
//! An [`ExportWorkspace`] names what to export; [`ExportSnapshot::build`]
//! turns it into the `#[repr(C)]` graph from `matforge-abi` and owns every
//! allocation in it:
//!
//! ```text
//! ExportSnapshot<'a>
//!   Box<ExportContext>
//!     materials: [ExportMaterial]        owned, boxed slice
//!       bools .. textures: [ExportParam] owned, boxed slices
//!     meshes: [ExportMesh]               owned, boxed slice
//!       positions .. indices             borrowed from MeshData for 'a
//!   strings: Vec<CString>                names, targets, paths
//! ```
//!
//! Dropping the snapshot runs [`release_context_arrays`], which frees each
//! material's parameter arrays in kind order, then the material array, then
//! the mesh array. The mesh pointers are tied to `'a`, so the meshes cannot
//! be mutated or dropped while a snapshot exists.

mod loader;

use std::ffi::{CString, c_char};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use matforge_abi::{
    ABI_VERSION, ExportArray, ExportContext, ExportMaterial, ExportMesh, ExportParam,
    ExportTexture, MAX_UV_CHANNELS,
};
use matforge_core::material::{PropertyKind, PropertyValue};
use matforge_core::mesh::MeshData;
use matforge_core::profiling::profile_scope;

use crate::error::ExportError;
use crate::materials::{MaterialInstance, PropertyEntry};

pub use loader::{call_exporter, discover_exporters, is_exporter_file};

static_assertions::const_assert_eq!(MAX_UV_CHANNELS, matforge_core::mesh::MAX_UV_CHANNELS);

/// A named material to export.
#[derive(Debug, Clone, Copy)]
pub struct WorkspaceMaterial<'a> {
    pub name: &'a str,
    pub instance: &'a MaterialInstance,
}

/// The materials and meshes handed to one export call.
#[derive(Debug, Default)]
pub struct ExportWorkspace<'a> {
    materials: Vec<WorkspaceMaterial<'a>>,
    meshes: Vec<&'a MeshData>,
    output_path: Option<PathBuf>,
}

impl<'a> ExportWorkspace<'a> {
    pub fn new() -> Self {
        Self {
            materials: Vec::new(),
            meshes: Vec::new(),
            output_path: None,
        }
    }

    #[must_use]
    pub fn with_output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = Some(path.into());
        self
    }

    pub fn add_material(&mut self, name: &'a str, instance: &'a MaterialInstance) {
        self.materials.push(WorkspaceMaterial { name, instance });
    }

    pub fn add_mesh(&mut self, mesh: &'a MeshData) {
        self.meshes.push(mesh);
    }

    pub fn materials(&self) -> &[WorkspaceMaterial<'a>] {
        &self.materials
    }

    pub fn meshes(&self) -> &[&'a MeshData] {
        &self.meshes
    }

    pub fn output_path(&self) -> Option<&Path> {
        self.output_path.as_deref()
    }
}

/// Owner of one flattened [`ExportContext`].
pub struct ExportSnapshot<'a> {
    context: Box<ExportContext>,
    strings: Vec<CString>,
    _borrow: PhantomData<&'a MeshData>,
}

impl std::fmt::Debug for ExportSnapshot<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportSnapshot")
            .field("materials", &self.context.materials.len)
            .field("meshes", &self.context.meshes.len)
            .field("strings", &self.strings.len())
            .finish()
    }
}

impl<'a> ExportSnapshot<'a> {
    /// Flatten `workspace` into a C-compatible graph.
    ///
    /// Fails if a mesh has attributes of inconsistent length, since the
    /// exporter reads `vertex_count` elements from every attribute pointer.
    pub fn build(workspace: &ExportWorkspace<'a>) -> Result<Self, ExportError> {
        profile_scope!("export_build");

        for mesh in &workspace.meshes {
            mesh.validate()
                .map_err(|e| ExportError::InvalidArgument(e.to_string()))?;
            if mesh.vertex_count() > u32::MAX as usize || mesh.index_count() > u32::MAX as usize {
                return Err(ExportError::InvalidArgument(format!(
                    "mesh '{}' is too large to export",
                    mesh.name
                )));
            }
        }

        let mut snapshot = Self {
            context: Box::new(ExportContext::default()),
            strings: Vec::new(),
            _borrow: PhantomData,
        };

        snapshot.context.abi_version = ABI_VERSION;
        if let Some(path) = &workspace.output_path {
            snapshot.context.output_path = snapshot.intern(&path.to_string_lossy());
        }

        let materials: Vec<ExportMaterial> = workspace
            .materials
            .iter()
            .map(|m| snapshot.flatten_material(m))
            .collect();
        let meshes: Vec<ExportMesh> = workspace
            .meshes
            .iter()
            .map(|mesh| snapshot.flatten_mesh(mesh))
            .collect();

        snapshot.context.materials = into_export_array(materials);
        snapshot.context.meshes = into_export_array(meshes);

        log::debug!(
            "Built export snapshot: {} materials, {} meshes",
            workspace.materials.len(),
            workspace.meshes.len()
        );
        Ok(snapshot)
    }

    pub fn context(&self) -> &ExportContext {
        &self.context
    }

    pub fn as_ptr(&self) -> *const ExportContext {
        &*self.context
    }

    /// Load `module_path`, hand it this snapshot and unload it.
    pub fn call(&self, module_path: &Path) -> Result<(), ExportError> {
        call_exporter(module_path, self.context())
    }

    /// Free every owned array now. Returns the number of arrays freed.
    pub fn dispose(mut self) -> usize {
        self.release()
    }

    fn release(&mut self) -> usize {
        // SAFETY: every array in the context was allocated by `into_export_array`.
        let freed = unsafe { release_context_arrays(&mut self.context) };
        if freed > 0 {
            log::trace!("Released {freed} export arrays");
        }
        freed
    }

    fn intern(&mut self, text: &str) -> *const c_char {
        let owned = CString::new(text).unwrap_or_else(|_| {
            let cleaned: String = text.chars().filter(|&c| c != '\0').collect();
            CString::new(cleaned).unwrap_or_default()
        });
        let ptr = owned.as_ptr();
        self.strings.push(owned);
        ptr
    }

    fn flatten_material(&mut self, material: &WorkspaceMaterial<'_>) -> ExportMaterial {
        let instance = material.instance;
        let states = instance.states();

        let mut record = ExportMaterial {
            name: self.intern(material.name),
            template: self.intern(instance.material_name()),
            cast_shadow: states.cast_shadow,
            receive_shadow: states.receive_shadow,
            blend_mode: states.blend.as_u32(),
            rasterizer_mode: states.rasterizer.as_u32(),
            depth_mode: states.depth.as_u32(),
            bools: ExportArray::empty(),
            ints: ExportArray::empty(),
            floats: ExportArray::empty(),
            float2s: ExportArray::empty(),
            float3s: ExportArray::empty(),
            float4s: ExportArray::empty(),
            color3s: ExportArray::empty(),
            color4s: ExportArray::empty(),
            bit32s: ExportArray::empty(),
            textures: ExportArray::empty(),
        };

        for kind in PropertyKind::ALL {
            let entries = instance.entries(kind);
            match kind {
                PropertyKind::Bool => {
                    record.bools = self.params(entries, |v| match v {
                        PropertyValue::Bool(b) => Some(*b),
                        _ => None,
                    })
                }
                PropertyKind::Int => {
                    record.ints = self.params(entries, |v| match v {
                        PropertyValue::Int(i) => Some(*i),
                        _ => None,
                    })
                }
                PropertyKind::Float => {
                    record.floats = self.params(entries, |v| match v {
                        PropertyValue::Float(f) => Some(*f),
                        _ => None,
                    })
                }
                PropertyKind::Float2 => {
                    record.float2s = self.params(entries, |v| match v {
                        PropertyValue::Float2(f) => Some(*f),
                        _ => None,
                    })
                }
                PropertyKind::Float3 => {
                    record.float3s = self.params(entries, |v| match v {
                        PropertyValue::Float3(f) => Some(*f),
                        _ => None,
                    })
                }
                PropertyKind::Float4 => {
                    record.float4s = self.params(entries, |v| match v {
                        PropertyValue::Float4(f) => Some(*f),
                        _ => None,
                    })
                }
                PropertyKind::Color3 => {
                    record.color3s = self.params(entries, |v| match v {
                        PropertyValue::Color3(c) => Some(*c),
                        _ => None,
                    })
                }
                PropertyKind::Color4 => {
                    record.color4s = self.params(entries, |v| match v {
                        PropertyValue::Color4(c) => Some(*c),
                        _ => None,
                    })
                }
                PropertyKind::Bit32 => {
                    record.bit32s = self.params(entries, |v| match v {
                        PropertyValue::Bit32(b) => Some(*b),
                        _ => None,
                    })
                }
                PropertyKind::Texture2D => {
                    let textures: Vec<_> = entries
                        .iter()
                        .filter_map(|entry| {
                            let texture = entry.value.as_texture()?;
                            let path = match &texture.path {
                                Some(path) => self.intern(path),
                                None => std::ptr::null(),
                            };
                            Some(ExportParam {
                                name: self.intern(&entry.tag),
                                target: self.intern(&entry.target),
                                value: ExportTexture {
                                    path,
                                    fallback: texture.fallback.as_u32(),
                                },
                            })
                        })
                        .collect();
                    record.textures = into_export_array(textures);
                }
            }
        }

        record
    }

    fn params<T>(
        &mut self,
        entries: &[PropertyEntry],
        extract: impl Fn(&PropertyValue) -> Option<T>,
    ) -> ExportArray<ExportParam<T>> {
        let params: Vec<_> = entries
            .iter()
            .filter_map(|entry| {
                let value = extract(&entry.value)?;
                Some(ExportParam {
                    name: self.intern(&entry.tag),
                    target: self.intern(&entry.target),
                    value,
                })
            })
            .collect();
        into_export_array(params)
    }

    fn flatten_mesh(&mut self, mesh: &MeshData) -> ExportMesh {
        log::trace!(
            "Flattening mesh '{}': {} vertices, indexed={}, {} uv channels",
            mesh.name,
            mesh.vertex_count(),
            mesh.is_indexed(),
            mesh.uv_channel_count()
        );
        ExportMesh {
            name: self.intern(&mesh.name),
            vertex_count: mesh.vertex_count() as u32,
            index_count: mesh.index_count() as u32,
            positions: attribute_ptr(&mesh.positions),
            normals: attribute_ptr(&mesh.normals),
            tangents: attribute_ptr(&mesh.tangents),
            colors: attribute_ptr(&mesh.colors),
            uvs: std::array::from_fn(|i| attribute_ptr(&mesh.uvs[i])),
            bone_indices: attribute_ptr(&mesh.bone_indices),
            bone_weights: attribute_ptr(&mesh.bone_weights),
            indices: attribute_ptr(&mesh.indices),
        }
    }
}

impl Drop for ExportSnapshot<'_> {
    fn drop(&mut self) {
        self.release();
    }
}

/// Free every array owned by `context` and null the freed fields.
///
/// Order: each material's parameter arrays in kind order, the material
/// array, the mesh array. Already-null arrays are skipped, so calling this
/// again on the same context frees nothing. Returns the number of arrays
/// freed.
///
/// # Safety
///
/// Every non-null array in `context` must have been allocated by an
/// [`ExportSnapshot`] and not freed elsewhere.
pub unsafe fn release_context_arrays(context: &mut ExportContext) -> usize {
    let mut freed = 0;

    if !context.materials.is_null() {
        // SAFETY: allocated by `into_export_array` per the caller's contract.
        let materials = unsafe { as_mut_slice(&mut context.materials) };
        for material in materials {
            // SAFETY: same contract for every parameter array.
            unsafe {
                freed += usize::from(free_export_array(&mut material.bools));
                freed += usize::from(free_export_array(&mut material.ints));
                freed += usize::from(free_export_array(&mut material.floats));
                freed += usize::from(free_export_array(&mut material.float2s));
                freed += usize::from(free_export_array(&mut material.float3s));
                freed += usize::from(free_export_array(&mut material.float4s));
                freed += usize::from(free_export_array(&mut material.color3s));
                freed += usize::from(free_export_array(&mut material.color4s));
                freed += usize::from(free_export_array(&mut material.bit32s));
                freed += usize::from(free_export_array(&mut material.textures));
            }
        }
    }

    // SAFETY: see above.
    unsafe {
        freed += usize::from(free_export_array(&mut context.materials));
        freed += usize::from(free_export_array(&mut context.meshes));
    }
    freed
}

fn into_export_array<T>(items: Vec<T>) -> ExportArray<T> {
    if items.is_empty() {
        return ExportArray::empty();
    }
    let len = items.len() as u32;
    let data = Box::into_raw(items.into_boxed_slice()) as *mut T;
    ExportArray { data, len }
}

unsafe fn as_mut_slice<T>(array: &mut ExportArray<T>) -> &mut [T] {
    if array.data.is_null() {
        return &mut [];
    }
    // SAFETY: upheld by the caller.
    unsafe { std::slice::from_raw_parts_mut(array.data, array.len as usize) }
}

/// Free an array created by [`into_export_array`]. Returns false if it was null.
unsafe fn free_export_array<T>(array: &mut ExportArray<T>) -> bool {
    if array.data.is_null() {
        return false;
    }
    let slice = std::ptr::slice_from_raw_parts_mut(array.data, array.len as usize);
    // SAFETY: the pointer and length come from `Box::into_raw` on a boxed slice.
    drop(unsafe { Box::from_raw(slice) });
    array.data = std::ptr::null_mut();
    array.len = 0;
    true
}

fn attribute_ptr<T>(data: &[T]) -> *const T {
    if data.is_empty() {
        std::ptr::null()
    } else {
        data.as_ptr()
    }
}
