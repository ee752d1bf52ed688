//! Registry integration tests against the WGSL/RON fixtures.
//!
//! Templates are loaded from `tests/fixtures`; tests that edit sources work
//! on a copy in a per-test scratch directory.

use std::path::{Path, PathBuf};

use matforge_core::material::{
    BlendMode, DefaultTexture, PropertyKind, PropertyValue, StateField, StateValue,
};
use matforge_graphics::materials::USER_CONSTANT_BUFFER;
use matforge_graphics::{
    MaterialError, PluginRegistry, RegistryConfig, Resolution, StageKind, TemplateState,
};
use rstest::{fixture, rstest};

fn fixtures_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("matforge-it-{}-{name}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    for entry in std::fs::read_dir(fixtures_dir()).unwrap() {
        let path = entry.unwrap().path();
        std::fs::copy(&path, dir.join(path.file_name().unwrap())).unwrap();
    }
    dir
}

fn config_for(dir: &Path) -> RegistryConfig {
    let mut config = RegistryConfig::default().with_dump_failed_shaders(false);
    config.template_dirs = vec![dir.to_path_buf()];
    config.exporter_dirs = vec![dir.join("exporters")];
    config
}

#[fixture]
fn registry() -> PluginRegistry {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut registry = PluginRegistry::new(config_for(&fixtures_dir()));
    registry.load_all();
    registry
}

#[rstest]
fn test_load_all_skips_broken(registry: PluginRegistry) {
    let names: Vec<_> = registry.templates().map(|t| t.name().to_string()).collect();
    assert_eq!(names, ["standard_surface", "unlit"]);
    assert!(registry.find_material("broken").is_none());
    assert!(registry.exporters().is_empty());
}

#[rstest]
fn test_user_buffer_layout(registry: PluginRegistry) {
    let template = registry.find_material("standard_surface").unwrap();
    let bindings = template.bindings(StageKind::Lighting).unwrap();
    let cb = bindings.constant_buffer(USER_CONSTANT_BUFFER).unwrap();
    assert_eq!(cb.total_size, 128);

    // Every non-texture target is present with a size matching its kind.
    for desc in template.schema().iter().filter(|d| !d.kind().is_texture()) {
        let member = bindings
            .resolve_offset(USER_CONSTANT_BUFFER, &desc.target, desc.kind())
            .unwrap_or_else(|e| panic!("{}: {e}", desc.target));
        assert!(member + desc.kind().gpu_size().unwrap() <= cb.total_size);
    }
}

#[rstest]
#[case::bool(PropertyKind::Bool, "UseNormalMap", 40)]
#[case::int(PropertyKind::Int, "IterationCount", 112)]
#[case::float(PropertyKind::Float, "Roughness", 28)]
#[case::float_converted(PropertyKind::Float, "RotationAngle", 76)]
#[case::float2(PropertyKind::Float2, "UVScale0", 96)]
#[case::float2_offset(PropertyKind::Float2, "UVOffset0", 104)]
#[case::float3(PropertyKind::Float3, "SheenColor", 64)]
#[case::float4(PropertyKind::Float4, "Tint", 48)]
#[case::color3(PropertyKind::Color3, "Emissive", 16)]
#[case::color4(PropertyKind::Color4, "BaseColor", 0)]
#[case::color4_detail(PropertyKind::Color4, "DetailTint", 80)]
#[case::bit32(PropertyKind::Bit32, "LayerMask", 44)]
fn test_instance_offsets(
    registry: PluginRegistry,
    #[case] kind: PropertyKind,
    #[case] target: &str,
    #[case] offset: u32,
) {
    let instance = registry.create_instance("standard_surface").unwrap();
    let entry = instance.entry(kind, target).unwrap();
    assert_eq!(entry.resolution(StageKind::Lighting), &Resolution::Offset(offset));
}

#[rstest]
fn test_uv_scale_defaults(registry: PluginRegistry) {
    let instance = registry.create_instance("standard_surface").unwrap();
    let entry = instance.entry(PropertyKind::Float2, "UVScale0").unwrap();
    assert_eq!(entry.location(), 96);
    assert_eq!(entry.value, PropertyValue::Float2([2.0, 2.0]));
}

#[rstest]
fn test_stage_subsets(registry: PluginRegistry) {
    let instance = registry.create_instance("standard_surface").unwrap();

    let normal = instance.entry(PropertyKind::Texture2D, "NormalMap").unwrap();
    assert_eq!(normal.resolution(StageKind::Lighting), &Resolution::Slot(2));
    assert!(!normal.resolution(StageKind::Shadow).is_resolved());

    let albedo = instance.entry(PropertyKind::Texture2D, "AlbedoMap").unwrap();
    assert!(albedo.resolution(StageKind::Shadow).is_resolved());

    let shadow_textures = instance.texture_bindings(StageKind::Shadow);
    assert_eq!(shadow_textures.len(), 1);
    assert_eq!(shadow_textures[0].0, 1);
    assert_eq!(shadow_textures[0].1.path.as_deref(), Some("textures/albedo.png"));

    let lighting_textures = instance.texture_bindings(StageKind::Lighting);
    assert_eq!(lighting_textures[1].1.fallback, DefaultTexture::FlatNormal);

    let template = registry.find_material("standard_surface").unwrap();
    let lighting = template.bindings(StageKind::Lighting).unwrap();
    assert_eq!(lighting.slots.read_only.get("LightList"), Some(&4));
    let shadow = template.bindings(StageKind::Shadow).unwrap();
    assert!(shadow.slots.read_only.get("LightList").is_none());
}

#[rstest]
fn test_write_constants(registry: PluginRegistry) {
    let template = registry.find_material("standard_surface").unwrap();
    let mut instance = registry.create_instance("standard_surface").unwrap();
    instance.set_value("Roughness", PropertyValue::Float(2.0)).unwrap();
    instance.set_value("UseNormalMap", PropertyValue::Bool(true)).unwrap();

    let size = instance.constant_buffer_size(template, StageKind::Lighting) as usize;
    let mut staging = vec![0u8; size];
    let written = instance
        .write_constants(template, StageKind::Lighting, &mut staging)
        .unwrap();
    assert_eq!(written, 14);

    let f32_at = |offset: usize| f32::from_le_bytes(staging[offset..offset + 4].try_into().unwrap());
    let u32_at = |offset: usize| u32::from_le_bytes(staging[offset..offset + 4].try_into().unwrap());
    // Clamped to the descriptor range.
    assert_eq!(f32_at(28), 1.0);
    assert_eq!(u32_at(40), 1);
    assert_eq!(u32_at(44), 1);
    assert!((f32_at(76) - std::f32::consts::FRAC_PI_2).abs() < 1e-6);
    assert_eq!(f32_at(96), 2.0);
    assert_eq!(i32::from_le_bytes(staging[112..116].try_into().unwrap()), 4);
}

#[rstest]
fn test_fixed_function_states(registry: PluginRegistry) {
    let mut surface = registry.create_instance("standard_surface").unwrap();
    surface.set_state(StateValue::Blend(BlendMode::Masked)).unwrap();
    surface.set_state(StateValue::CastShadow(false)).unwrap();
    assert_eq!(surface.states().blend, BlendMode::Masked);
    assert!(!surface.states().cast_shadow);
    assert!(matches!(
        surface.set_state(StateValue::ReceiveShadow(false)),
        Err(MaterialError::StateNotEditable(StateField::ReceiveShadow))
    ));

    let unlit = registry.create_instance("unlit").unwrap();
    assert_eq!(unlit.states().blend, BlendMode::AlphaBlend);
    assert!(!unlit.states().cast_shadow);
}

#[rstest]
fn test_reload_is_stable(registry: PluginRegistry) {
    let mut registry = registry;
    let before = registry
        .find_material("standard_surface")
        .unwrap()
        .bindings(StageKind::Lighting)
        .unwrap()
        .clone();

    assert!(registry.reload_template("standard_surface"));
    assert!(registry.reload_template("standard_surface"));

    let after = registry
        .find_material("standard_surface")
        .unwrap()
        .bindings(StageKind::Lighting)
        .unwrap();
    assert_eq!(&before, after);
}

#[test]
fn test_hot_reload_moves_offsets() {
    let dir = scratch_dir("hot-reload");
    let mut registry = PluginRegistry::new(config_for(&dir));
    assert_eq!(registry.load_all(), 2);

    let mut instance = registry.create_instance("standard_surface").unwrap();
    instance
        .set_value("UVScale0", PropertyValue::Float2([4.0, 4.0]))
        .unwrap();

    // Move UVScale0 to the front of the buffer.
    let shader_path = dir.join("standard_surface.wgsl");
    let source = std::fs::read_to_string(&shader_path).unwrap();
    let edited = source
        .replace("    UVScale0: vec2<f32>,\n", "")
        .replace("struct CbUserData {\n", "struct CbUserData {\n    UVScale0: vec2<f32>,\n");
    std::fs::write(&shader_path, edited).unwrap();

    let report = registry.reload_shader();
    assert!(report.is_success(), "{report:?}");
    assert_eq!(report.succeeded, 2);

    let template = registry.find_material("standard_surface").unwrap();
    let mut staging = vec![0u8; template.constant_buffer_size(StageKind::Lighting) as usize];
    assert!(matches!(
        instance.write_constants(template, StageKind::Lighting, &mut staging),
        Err(MaterialError::StaleInstance { .. })
    ));

    assert!(registry.refresh_instance(&mut instance).unwrap());
    let entry = instance.entry(PropertyKind::Float2, "UVScale0").unwrap();
    assert_eq!(entry.location(), 0);
    assert_eq!(entry.value, PropertyValue::Float2([4.0, 4.0]));

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_failed_reload_keeps_bound_stage() {
    let dir = scratch_dir("failed-reload");
    let mut registry = PluginRegistry::new(config_for(&dir));
    registry.load_all();
    assert!(registry
        .find_material_mut("unlit")
        .unwrap()
        .bind(StageKind::Lighting));
    let spirv = registry
        .find_material("unlit")
        .unwrap()
        .bound_binary()
        .unwrap()
        .clone();

    std::fs::write(dir.join("unlit.wgsl"), "@fragment fn lighting_main( {").unwrap();
    let report = registry.reload_shader();
    assert_eq!(report.failed, ["unlit"]);
    assert_eq!(report.succeeded, 1);

    let template = registry.find_material("unlit").unwrap();
    assert_eq!(template.state(), TemplateState::Ready);
    assert_eq!(template.bound_stage(), Some(StageKind::Lighting));
    assert!(std::sync::Arc::ptr_eq(template.bound_binary().unwrap(), &spirv));

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_deferred_release_after_reload() {
    let dir = scratch_dir("deferred");
    let config = config_for(&dir).with_frames_in_flight(3);
    let mut registry = PluginRegistry::new(config);
    registry.load_all();

    assert!(registry.reload_template("unlit"));
    assert_eq!(registry.pending_disposals(), 2);
    assert_eq!(registry.sync(), 0);
    assert_eq!(registry.sync(), 0);
    assert_eq!(registry.sync(), 2);

    registry.unload_all();
    assert_eq!(registry.template_count(), 0);
    assert_eq!(registry.pending_disposals(), 4);

    drop(registry);
    std::fs::remove_dir_all(&dir).unwrap();
}

#[rstest]
fn test_unknown_template(registry: PluginRegistry) {
    assert!(matches!(
        registry.create_instance("missing"),
        Err(MaterialError::UnknownTemplate(_))
    ));
    let mut registry = registry;
    assert!(!registry.reload_template("missing"));
}
