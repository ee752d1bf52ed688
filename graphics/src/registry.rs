//! Owner of all material templates and exporter modules.
//!
//! The registry is an ordinary value: create one per editor session and pass
//! it by reference to code that needs template lookup. It is not internally
//! synchronized; callers that reload from one thread and render on another
//! must serialize access themselves.
//!
//! ```ignore
//! let mut registry = PluginRegistry::new(RegistryConfig::load_or_default(path));
//! registry.load_all();
//!
//! let mut instance = registry.create_instance("standard_surface")?;
//! instance.set_value("Roughness", PropertyValue::Float(0.8))?;
//!
//! // per frame
//! registry.sync();
//!
//! // hot reload
//! let report = registry.reload_shader();
//! registry.refresh_instance(&mut instance)?;
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use matforge_core::profiling::{frame_mark, profile_message, profile_plot, profile_scope};

use crate::config::RegistryConfig;
use crate::error::{ExportError, MaterialError, Result};
use crate::export::{ExportSnapshot, ExportWorkspace, discover_exporters};
use crate::materials::{
    MaterialInstance, MaterialTemplate, RonTemplateParser, StageDisposer, TemplateSourceParser,
};
use crate::shader::ShaderReflector;

/// Outcome of [`PluginRegistry::reload_shader`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReloadReport {
    pub succeeded: usize,
    /// Names of templates that kept their previous state.
    pub failed: Vec<String>,
}

impl ReloadReport {
    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Name-keyed table of templates plus the disposer their stages retire to.
pub struct PluginRegistry {
    config: RegistryConfig,
    parser: Box<dyn TemplateSourceParser>,
    reflector: ShaderReflector,
    templates: BTreeMap<String, MaterialTemplate>,
    exporters: Vec<PathBuf>,
    disposer: StageDisposer,
}

impl std::fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("templates", &self.templates.keys().collect::<Vec<_>>())
            .field("exporters", &self.exporters)
            .field("pending_disposals", &self.disposer.pending_count())
            .finish()
    }
}

impl PluginRegistry {
    /// Create an empty registry reading templates with [`RonTemplateParser`].
    pub fn new(config: RegistryConfig) -> Self {
        Self::with_parser(config, Box::new(RonTemplateParser))
    }

    /// Create an empty registry with a custom template parser.
    pub fn with_parser(config: RegistryConfig, parser: Box<dyn TemplateSourceParser>) -> Self {
        let reflector = config.reflector();
        let disposer = StageDisposer::new(config.frames_in_flight);
        Self {
            config,
            parser,
            reflector,
            templates: BTreeMap::new(),
            exporters: Vec::new(),
            disposer,
        }
    }

    /// Load every template file in the configured directories and discover
    /// exporter modules. Returns the number of templates loaded.
    ///
    /// Files that fail to load are logged and skipped.
    pub fn load_all(&mut self) -> usize {
        profile_scope!("registry_load_all");

        let files = self.template_files();
        let loaded = files.iter().filter(|path| self.load_template(path)).count();
        self.exporters = discover_exporters(&self.config.exporter_dirs);

        log::info!(
            "Loaded {loaded}/{} templates, found {} exporters",
            files.len(),
            self.exporters.len()
        );
        loaded
    }

    /// Load one template file. A template with the same name is replaced
    /// and terminated.
    pub fn load_template(&mut self, path: &Path) -> bool {
        if path.as_os_str().is_empty() {
            log::error!("load_template: empty path");
            return false;
        }

        let mut template = MaterialTemplate::new(path);
        if !template.load(self.parser.as_ref(), &self.reflector, &mut self.disposer) {
            return false;
        }

        let name = template.name().to_string();
        if let Some(mut old) = self.templates.insert(name.clone(), template) {
            log::info!(
                "Template '{name}' from {} replaces {}",
                path.display(),
                old.path().display()
            );
            old.term(&mut self.disposer);
        }
        true
    }

    pub fn find_material(&self, name: &str) -> Option<&MaterialTemplate> {
        self.templates.get(name)
    }

    pub fn find_material_mut(&mut self, name: &str) -> Option<&mut MaterialTemplate> {
        self.templates.get_mut(name)
    }

    /// Create an instance bound to the template called `name`.
    pub fn create_instance(&self, name: &str) -> Result<MaterialInstance> {
        let template = self.templates.get(name).ok_or_else(|| {
            log::warn!("create_instance: no template named '{name}'");
            MaterialError::UnknownTemplate(name.to_string())
        })?;
        MaterialInstance::new(template)
    }

    /// Release an instance. Templates and GPU objects are unaffected.
    pub fn delete_instance(&self, instance: MaterialInstance) {
        log::debug!("Deleted instance of '{}'", instance.material_name());
        drop(instance);
    }

    /// Reload every template. Failures keep the old state and do not stop
    /// the iteration.
    pub fn reload_shader(&mut self) -> ReloadReport {
        profile_scope!("registry_reload");

        let mut report = ReloadReport::default();
        for (name, template) in &mut self.templates {
            if template.reload(self.parser.as_ref(), &self.reflector, &mut self.disposer) {
                report.succeeded += 1;
            } else {
                report.failed.push(name.clone());
            }
        }

        profile_message!("templates reloaded");
        if report.is_success() {
            log::info!("Reloaded {} templates", report.succeeded);
        } else {
            log::warn!(
                "Reloaded {} templates, {} failed: {}",
                report.succeeded,
                report.failed_count(),
                report.failed.join(", ")
            );
        }
        report
    }

    /// Reload the template called `name`.
    ///
    /// A source that now declares a different name fails the reload; the
    /// template keeps its previous state and stays registered under `name`.
    pub fn reload_template(&mut self, name: &str) -> bool {
        match self.templates.get_mut(name) {
            Some(template) => {
                template.reload(self.parser.as_ref(), &self.reflector, &mut self.disposer)
            }
            None => {
                log::warn!("reload_template: no template named '{name}'");
                false
            }
        }
    }

    /// Re-resolve `instance` if its template was reloaded since it was
    /// created. Returns whether anything changed.
    pub fn refresh_instance(&self, instance: &mut MaterialInstance) -> Result<bool> {
        let name = instance.material_name();
        let template = self
            .templates
            .get(name)
            .ok_or_else(|| MaterialError::UnknownTemplate(name.to_string()))?;
        if !instance.is_stale(template) {
            return Ok(false);
        }
        instance.rebind(template)?;
        Ok(true)
    }

    /// Terminate and remove the template called `name`.
    pub fn unload(&mut self, name: &str) -> bool {
        match self.templates.remove(name) {
            Some(mut template) => {
                template.term(&mut self.disposer);
                true
            }
            None => false,
        }
    }

    pub fn unload_all(&mut self) {
        for (_, mut template) in std::mem::take(&mut self.templates) {
            template.term(&mut self.disposer);
        }
    }

    /// Advance the disposal frame counter. Returns the number of retired
    /// stages released.
    pub fn sync(&mut self) -> usize {
        let released = self.disposer.frame_sync();
        frame_mark!();
        profile_plot!("pending_disposals", self.disposer.pending_count());
        released
    }

    /// Flatten `workspace` and run the exporter at `module_path`.
    ///
    /// The snapshot is released whatever the module returns.
    pub fn export(&self, workspace: &ExportWorkspace<'_>, module_path: &Path) -> Result<(), ExportError> {
        profile_scope!("registry_export");
        let snapshot = ExportSnapshot::build(workspace)?;
        snapshot.call(module_path)
    }

    /// Find a discovered exporter by file stem, with or without a `lib` prefix.
    pub fn find_exporter(&self, name: &str) -> Option<&Path> {
        self.exporters
            .iter()
            .find(|path| {
                path.file_stem()
                    .and_then(|s| s.to_str())
                    .is_some_and(|stem| stem == name || stem.strip_prefix("lib") == Some(name))
            })
            .map(PathBuf::as_path)
    }

    /// Templates in name order.
    pub fn templates(&self) -> impl Iterator<Item = &MaterialTemplate> {
        self.templates.values()
    }

    pub fn template_count(&self) -> usize {
        self.templates.len()
    }

    pub fn exporters(&self) -> &[PathBuf] {
        &self.exporters
    }

    pub fn pending_disposals(&self) -> usize {
        self.disposer.pending_count()
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    fn template_files(&self) -> Vec<PathBuf> {
        let extension = self.config.template_extension.as_str();
        let mut files = Vec::new();
        for dir in &self.config.template_dirs {
            let entries = match std::fs::read_dir(dir) {
                Ok(entries) => entries,
                Err(e) => {
                    log::warn!("Skipping template directory {}: {e}", dir.display());
                    continue;
                }
            };
            files.extend(
                entries
                    .filter_map(|entry| entry.ok())
                    .map(|entry| entry.path())
                    .filter(|path| {
                        path.is_file() && path.extension().and_then(|e| e.to_str()) == Some(extension)
                    }),
            );
        }
        files.sort();
        files
    }
}

impl Drop for PluginRegistry {
    fn drop(&mut self) {
        self.unload_all();
        let released = self.disposer.flush_all();
        log::debug!("Registry dropped, released {released} stages");
    }
}

static_assertions::assert_impl_all!(PluginRegistry: Send);

#[cfg(test)]
mod tests {
    use matforge_core::material::{PropertyKind, PropertyValue};

    use super::*;
    use crate::materials::StageKind;
    use crate::materials::template::tests::{MemoryParser, SOURCE};

    /// Parser sharing a [`MemoryParser`] so tests can edit the source after
    /// handing it to the registry.
    struct Shared(std::sync::Arc<MemoryParser>);

    impl TemplateSourceParser for Shared {
        fn parse(&self, path: &Path) -> Result<crate::materials::TemplateSource> {
            self.0.parse(path)
        }
    }

    fn registry(parser: &std::sync::Arc<MemoryParser>) -> PluginRegistry {
        let config = RegistryConfig::default()
            .with_frames_in_flight(2)
            .with_dump_failed_shaders(false);
        PluginRegistry::with_parser(config, Box::new(Shared(parser.clone())))
    }

    #[test]
    fn test_load_and_find() {
        let parser = std::sync::Arc::new(MemoryParser::new("surface", SOURCE));
        let mut registry = registry(&parser);
        assert!(registry.load_template(Path::new("memory/surface.ron")));

        let template = registry.find_material("surface").unwrap();
        assert!(template.is_ready());
        assert!(registry.find_material("missing").is_none());
        assert_eq!(registry.template_count(), 1);
    }

    #[test]
    fn test_create_instance_unknown() {
        let parser = std::sync::Arc::new(MemoryParser::new("surface", SOURCE));
        let registry = registry(&parser);
        let err = registry.create_instance("missing").unwrap_err();
        assert!(matches!(err, MaterialError::UnknownTemplate(name) if name == "missing"));
    }

    #[test]
    fn test_create_instance_resolves() {
        let parser = std::sync::Arc::new(MemoryParser::new("surface", SOURCE));
        let mut registry = registry(&parser);
        registry.load_template(Path::new("memory/surface.ron"));

        let instance = registry.create_instance("surface").unwrap();
        let uv = instance.entry(PropertyKind::Float2, "UVScale0").unwrap();
        assert_eq!(uv.location(), 24);
        assert_eq!(uv.value, PropertyValue::Float2([2.0, 2.0]));
        registry.delete_instance(instance);
    }

    #[test]
    fn test_reload_report_and_disposal() {
        let parser = std::sync::Arc::new(MemoryParser::new("surface", SOURCE));
        let mut registry = registry(&parser);
        registry.load_template(Path::new("memory/surface.ron"));

        let report = registry.reload_shader();
        assert_eq!(report.succeeded, 1);
        assert!(report.is_success());
        assert_eq!(registry.pending_disposals(), 2);

        assert_eq!(registry.sync(), 0);
        assert_eq!(registry.sync(), 2);
        assert_eq!(registry.pending_disposals(), 0);
    }

    #[test]
    fn test_failed_reload_keeps_template() {
        let parser = std::sync::Arc::new(MemoryParser::new("surface", SOURCE));
        let mut registry = registry(&parser);
        registry.load_template(Path::new("memory/surface.ron"));
        registry
            .find_material_mut("surface")
            .unwrap()
            .bind(StageKind::Shadow);

        parser.set_shader("fn broken( {");
        let report = registry.reload_shader();
        assert_eq!(report.succeeded, 0);
        assert_eq!(report.failed, ["surface"]);
        assert!(!registry.reload_template("surface"));

        let template = registry.find_material("surface").unwrap();
        assert!(template.is_ready());
        assert_eq!(template.bound_stage(), Some(StageKind::Shadow));
        assert_eq!(registry.pending_disposals(), 0);
    }

    #[test]
    fn test_refresh_instance() {
        let parser = std::sync::Arc::new(MemoryParser::new("surface", SOURCE));
        let mut registry = registry(&parser);
        registry.load_template(Path::new("memory/surface.ron"));
        let mut instance = registry.create_instance("surface").unwrap();
        instance
            .set_value("Roughness", PropertyValue::Float(0.9))
            .unwrap();

        assert!(!registry.refresh_instance(&mut instance).unwrap());
        assert!(registry.reload_template("surface"));
        assert!(registry.refresh_instance(&mut instance).unwrap());
        assert_eq!(
            instance.value(PropertyKind::Float, "Roughness"),
            Some(&PropertyValue::Float(0.9))
        );
    }

    #[test]
    fn test_reload_rejects_rename() {
        let parser = std::sync::Arc::new(MemoryParser::new("surface", SOURCE));
        let mut registry = registry(&parser);
        registry.load_template(Path::new("memory/surface.ron"));
        let mut instance = registry.create_instance("surface").unwrap();

        parser.set_name("renamed");
        assert!(!registry.reload_template("surface"));
        assert_eq!(registry.reload_shader().failed, ["surface"]);

        let template = registry.find_material("surface").unwrap();
        assert_eq!(template.name(), "surface");
        assert!(template.is_ready());
        assert!(registry.find_material("renamed").is_none());
        assert!(!registry.refresh_instance(&mut instance).unwrap());
        assert_eq!(registry.pending_disposals(), 0);
    }

    #[test]
    fn test_duplicate_name_replaces() {
        let parser = std::sync::Arc::new(MemoryParser::new("surface", SOURCE));
        let mut registry = registry(&parser);
        assert!(registry.load_template(Path::new("a/surface.ron")));
        assert!(registry.load_template(Path::new("b/surface.ron")));

        assert_eq!(registry.template_count(), 1);
        let template = registry.find_material("surface").unwrap();
        assert_eq!(template.path(), Path::new("b/surface.ron"));
        // The replaced template's stages wait for disposal.
        assert_eq!(registry.pending_disposals(), 2);
    }

    #[test]
    fn test_unload() {
        let parser = std::sync::Arc::new(MemoryParser::new("surface", SOURCE));
        let mut registry = registry(&parser);
        registry.load_template(Path::new("memory/surface.ron"));

        assert!(registry.unload("surface"));
        assert!(!registry.unload("surface"));
        assert!(registry.find_material("surface").is_none());
        assert_eq!(registry.pending_disposals(), 2);
    }

    #[test]
    fn test_load_rejects_empty_path() {
        let parser = std::sync::Arc::new(MemoryParser::new("surface", SOURCE));
        let mut registry = registry(&parser);
        assert!(!registry.load_template(Path::new("")));
        assert_eq!(registry.template_count(), 0);
    }

    #[test]
    fn test_find_exporter() {
        let parser = std::sync::Arc::new(MemoryParser::new("surface", SOURCE));
        let mut registry = registry(&parser);
        registry.exporters = vec![
            PathBuf::from("exporters/libsummary.so"),
            PathBuf::from("exporters/fbx.dll"),
        ];
        assert_eq!(
            registry.find_exporter("summary"),
            Some(Path::new("exporters/libsummary.so"))
        );
        assert_eq!(registry.find_exporter("fbx"), Some(Path::new("exporters/fbx.dll")));
        assert!(registry.find_exporter("obj").is_none());
    }
}
