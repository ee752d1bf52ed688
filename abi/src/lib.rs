//! # matforge ABI
//!
//! The flat, C-compatible snapshot handed to exporter modules.
//!
//! Every type here is `#[repr(C)]` and only contains scalars, fixed-size
//! arrays and raw pointers, so a module built separately (or in another
//! language) sees the exact same layout as the host.
//!
//! ## Ownership
//!
//! The host allocates every array and string reachable from an
//! [`ExportContext`] and is the only side allowed to free them. Mesh
//! attribute pointers are borrowed from live host storage and are never
//! owned by the context. An exporter must treat the whole graph as
//! read-only and must not keep pointers past the return of its entry point.
//!
//! ## Entry point
//!
//! ```c
//! bool matforge_export_context(const ExportContext* context);
//! uint32_t matforge_export_abi_version(void); // optional
//! ```

use std::ffi::{CStr, c_char};

/// Layout revision of the export graph. Bumped on any field change.
pub const ABI_VERSION: u32 = 1;

/// Symbol every exporter module must export.
pub const EXPORT_ENTRY_SYMBOL: &[u8] = b"matforge_export_context\0";

/// Optional symbol reporting the module's [`ABI_VERSION`].
pub const ABI_VERSION_SYMBOL: &[u8] = b"matforge_export_abi_version\0";

/// Number of UV channels carried per mesh.
pub const MAX_UV_CHANNELS: usize = 4;

/// Signature of [`EXPORT_ENTRY_SYMBOL`].
pub type ExportEntryFn = unsafe extern "C" fn(context: *const ExportContext) -> bool;

/// Signature of [`ABI_VERSION_SYMBOL`].
pub type AbiVersionFn = unsafe extern "C" fn() -> u32;

/// A host-owned array: pointer plus element count.
///
/// An empty array is `{ null, 0 }`.
#[repr(C)]
#[derive(Debug)]
pub struct ExportArray<T> {
    pub data: *mut T,
    pub len: u32,
}

impl<T> ExportArray<T> {
    /// An empty array with a null data pointer.
    pub const fn empty() -> Self {
        Self {
            data: std::ptr::null_mut(),
            len: 0,
        }
    }

    /// True if no storage is attached.
    pub fn is_null(&self) -> bool {
        self.data.is_null()
    }

    /// View the array as a slice.
    ///
    /// # Safety
    ///
    /// `data` must either be null or point to `len` initialized elements that
    /// stay alive for the returned lifetime.
    pub unsafe fn as_slice(&self) -> &[T] {
        if self.data.is_null() || self.len == 0 {
            &[]
        } else {
            // SAFETY: upheld by the caller.
            unsafe { std::slice::from_raw_parts(self.data, self.len as usize) }
        }
    }
}

impl<T> Default for ExportArray<T> {
    fn default() -> Self {
        Self::empty()
    }
}

/// One exported parameter: display name, shader target and value.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ExportParam<T> {
    pub name: *const c_char,
    pub target: *const c_char,
    pub value: T,
}

/// Texture parameter value.
///
/// `path` is null when the material uses the built-in fallback image
/// identified by `fallback`.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ExportTexture {
    pub path: *const c_char,
    pub fallback: u32,
}

pub type ExportBoolParam = ExportParam<bool>;
pub type ExportIntParam = ExportParam<i32>;
pub type ExportFloatParam = ExportParam<f32>;
pub type ExportFloat2Param = ExportParam<[f32; 2]>;
pub type ExportFloat3Param = ExportParam<[f32; 3]>;
pub type ExportFloat4Param = ExportParam<[f32; 4]>;
pub type ExportBit32Param = ExportParam<u32>;
pub type ExportTextureParam = ExportParam<ExportTexture>;

/// Flattened material: identity, resolved states and per-kind parameters.
#[repr(C)]
#[derive(Debug)]
pub struct ExportMaterial {
    pub name: *const c_char,
    pub template: *const c_char,
    pub cast_shadow: bool,
    pub receive_shadow: bool,
    pub blend_mode: u32,
    pub rasterizer_mode: u32,
    pub depth_mode: u32,
    pub bools: ExportArray<ExportBoolParam>,
    pub ints: ExportArray<ExportIntParam>,
    pub floats: ExportArray<ExportFloatParam>,
    pub float2s: ExportArray<ExportFloat2Param>,
    pub float3s: ExportArray<ExportFloat3Param>,
    pub float4s: ExportArray<ExportFloat4Param>,
    pub color3s: ExportArray<ExportFloat3Param>,
    pub color4s: ExportArray<ExportFloat4Param>,
    pub bit32s: ExportArray<ExportBit32Param>,
    pub textures: ExportArray<ExportTextureParam>,
}

/// Borrowed view of a mesh's attribute buffers.
///
/// Attribute pointers are null when the mesh has no such attribute; every
/// non-null attribute holds `vertex_count` elements. `name` is host-owned.
#[repr(C)]
#[derive(Debug)]
pub struct ExportMesh {
    pub name: *const c_char,
    pub vertex_count: u32,
    pub index_count: u32,
    pub positions: *const [f32; 3],
    pub normals: *const [f32; 3],
    pub tangents: *const [f32; 4],
    pub colors: *const [f32; 4],
    pub uvs: [*const [f32; 2]; MAX_UV_CHANNELS],
    pub bone_indices: *const [u32; 4],
    pub bone_weights: *const [f32; 4],
    pub indices: *const u32,
}

/// Root of the export graph.
#[repr(C)]
#[derive(Debug)]
pub struct ExportContext {
    pub abi_version: u32,
    pub output_path: *const c_char,
    pub materials: ExportArray<ExportMaterial>,
    pub meshes: ExportArray<ExportMesh>,
}

impl Default for ExportContext {
    fn default() -> Self {
        Self {
            abi_version: ABI_VERSION,
            output_path: std::ptr::null(),
            materials: ExportArray::empty(),
            meshes: ExportArray::empty(),
        }
    }
}

/// Read a nullable C string.
///
/// # Safety
///
/// `ptr` must be null or point to a NUL-terminated string that outlives `'a`.
pub unsafe fn c_str<'a>(ptr: *const c_char) -> Option<&'a CStr> {
    if ptr.is_null() {
        None
    } else {
        // SAFETY: upheld by the caller.
        Some(unsafe { CStr::from_ptr(ptr) })
    }
}

static_assertions::assert_eq_size!(ExportParam<u32>, [usize; 3]);
static_assertions::assert_eq_size!(ExportTexture, [usize; 2]);
static_assertions::const_assert_eq!(
    std::mem::align_of::<ExportContext>(),
    std::mem::align_of::<*const u8>()
);
