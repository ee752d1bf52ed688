use std::path::Path;

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use matforge_core::mesh::generators::generate_sphere;
use matforge_graphics::{
    ExportSnapshot, ExportWorkspace, MaterialInstance, PluginRegistry, RegistryConfig,
    ShaderReflector, StageKind,
};

const SURFACE_WGSL: &str = include_str!("../tests/fixtures/standard_surface.wgsl");

fn fixture_registry() -> PluginRegistry {
    let mut config = RegistryConfig::default().with_dump_failed_shaders(false);
    config.template_dirs = vec![Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")];
    config.exporter_dirs.clear();
    let mut registry = PluginRegistry::new(config);
    registry.load_all();
    registry
}

// ---------------------------------------------------------------------------
// Shader compilation
// ---------------------------------------------------------------------------

fn bench_compile_lighting(c: &mut Criterion) {
    let reflector = ShaderReflector::new();
    c.bench_function("compile_reflect_lighting", |b| {
        b.iter(|| black_box(reflector.compile(black_box(SURFACE_WGSL), "lighting_main")));
    });
}

fn bench_compile_shadow(c: &mut Criterion) {
    let reflector = ShaderReflector::new();
    c.bench_function("compile_reflect_shadow", |b| {
        b.iter(|| black_box(reflector.compile(black_box(SURFACE_WGSL), "shadow_main")));
    });
}

// ---------------------------------------------------------------------------
// Instance resolution and upload
// ---------------------------------------------------------------------------

fn bench_create_instance(c: &mut Criterion) {
    let registry = fixture_registry();
    c.bench_function("create_instance_standard_surface", |b| {
        b.iter(|| black_box(registry.create_instance("standard_surface")));
    });
}

fn bench_write_constants(c: &mut Criterion) {
    let registry = fixture_registry();
    let Some(template) = registry.find_material("standard_surface") else {
        return;
    };
    let Ok(instance) = MaterialInstance::new(template) else {
        return;
    };
    let mut staging = vec![0u8; template.constant_buffer_size(StageKind::Lighting) as usize];
    c.bench_function("write_constants_lighting", |b| {
        b.iter(|| {
            black_box(instance.write_constants(template, StageKind::Lighting, &mut staging)).ok();
        });
    });
}

// ---------------------------------------------------------------------------
// Export snapshots
// ---------------------------------------------------------------------------

fn bench_build_snapshot(c: &mut Criterion) {
    let registry = fixture_registry();
    let Ok(instance) = registry.create_instance("standard_surface") else {
        return;
    };
    let sphere = generate_sphere(1.0, 32, 16);
    let mut workspace = ExportWorkspace::new();
    for name in ["a", "b", "c", "d"] {
        workspace.add_material(name, &instance);
    }
    workspace.add_mesh(&sphere);

    c.bench_function("export_snapshot_4_materials_1_mesh", |b| {
        b.iter(|| black_box(ExportSnapshot::build(&workspace).map(ExportSnapshot::dispose)));
    });
}

criterion_group!(
    benches,
    bench_compile_lighting,
    bench_compile_shadow,
    bench_create_instance,
    bench_write_constants,
    bench_build_snapshot,
);
criterion_main!(benches);
