//! # MatForge Summary Exporter
//!
//! Sample exporter module. Built as a `cdylib`, it exposes the two symbols
//! of the export ABI and writes a plain-text summary of the snapshot it is
//! handed to the context's `output_path` (or to the log if none is set).
//!
//! ```bash
//! cargo build -p matforge-demos
//! cargo run -p matforge-demos --bin matforge -- export \
//!     --exporter target/debug/libmatforge_summary.so --output summary.txt
//! ```

use std::fmt::Write;

use matforge_abi::{
    ABI_VERSION, ExportArray, ExportContext, ExportMaterial, ExportMesh, ExportParam, c_str,
};

/// Demos library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[unsafe(no_mangle)]
pub extern "C" fn matforge_export_abi_version() -> u32 {
    ABI_VERSION
}

/// Export entry point.
///
/// # Safety
///
/// `context` must be null or point to a valid context built by the host.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn matforge_export_context(context: *const ExportContext) -> bool {
    // SAFETY: upheld by the caller.
    let Some(context) = (unsafe { context.as_ref() }) else {
        return false;
    };
    if context.abi_version != ABI_VERSION {
        return false;
    }

    // SAFETY: the context is valid for the duration of the call.
    let text = unsafe { summarize(context) };
    // SAFETY: null or a NUL-terminated string owned by the host.
    let output = unsafe { c_str(context.output_path) }.and_then(|path| path.to_str().ok());
    match output {
        Some(path) => std::fs::write(path, text).is_ok(),
        None => {
            log::info!("{text}");
            true
        }
    }
}

/// Render every material and mesh in `context` as text.
///
/// # Safety
///
/// Every pointer in `context` must be null or valid for its stated length.
pub unsafe fn summarize(context: &ExportContext) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "matforge export (abi {})", context.abi_version);

    // SAFETY: forwarded from the caller.
    unsafe {
        for material in context.materials.as_slice() {
            write_material(&mut out, material);
        }
        for mesh in context.meshes.as_slice() {
            write_mesh(&mut out, mesh);
        }
    }
    out
}

unsafe fn write_material(out: &mut String, material: &ExportMaterial) {
    // SAFETY: forwarded from `summarize`.
    unsafe {
        let _ = writeln!(
            out,
            "material {} <- {}",
            text(material.name),
            text(material.template)
        );
        let _ = writeln!(
            out,
            "  cast_shadow={} receive_shadow={} blend={} rasterizer={} depth={}",
            material.cast_shadow,
            material.receive_shadow,
            material.blend_mode,
            material.rasterizer_mode,
            material.depth_mode
        );
        write_params(out, "bool", &material.bools, |v| v.to_string());
        write_params(out, "int", &material.ints, |v| v.to_string());
        write_params(out, "float", &material.floats, |v| v.to_string());
        write_params(out, "float2", &material.float2s, |v| format!("{v:?}"));
        write_params(out, "float3", &material.float3s, |v| format!("{v:?}"));
        write_params(out, "float4", &material.float4s, |v| format!("{v:?}"));
        write_params(out, "color3", &material.color3s, |v| format!("{v:?}"));
        write_params(out, "color4", &material.color4s, |v| format!("{v:?}"));
        write_params(out, "bit32", &material.bit32s, |v| format!("{v:#010x}"));
        write_params(out, "texture", &material.textures, |v| {
            match c_str(v.path).and_then(|p| p.to_str().ok()) {
                Some(path) => path.to_string(),
                None => format!("<fallback {}>", v.fallback),
            }
        });
    }
}

unsafe fn write_params<T>(
    out: &mut String,
    label: &str,
    params: &ExportArray<ExportParam<T>>,
    value: impl Fn(&T) -> String,
) {
    // SAFETY: forwarded from `summarize`.
    for param in unsafe { params.as_slice() } {
        let _ = writeln!(
            out,
            "  {label} {} ({}) = {}",
            unsafe { text(param.name) },
            unsafe { text(param.target) },
            value(&param.value)
        );
    }
}

unsafe fn write_mesh(out: &mut String, mesh: &ExportMesh) {
    let uv_channels = mesh.uvs.iter().filter(|uv| !uv.is_null()).count();
    let _ = writeln!(
        out,
        "mesh {}: {} vertices, {} indices, {} uv channels, normals={} tangents={} skinned={}",
        // SAFETY: forwarded from `summarize`.
        unsafe { text(mesh.name) },
        mesh.vertex_count,
        mesh.index_count,
        uv_channels,
        !mesh.normals.is_null(),
        !mesh.tangents.is_null(),
        !mesh.bone_indices.is_null()
    );
}

unsafe fn text<'a>(ptr: *const std::ffi::c_char) -> &'a str {
    // SAFETY: forwarded from `summarize`.
    unsafe { c_str(ptr) }
        .and_then(|s| s.to_str().ok())
        .unwrap_or("<null>")
}
