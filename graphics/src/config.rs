//! Registry configuration loaded from `matforge.toml`.
//!
//! ```toml
//! template_dirs = ["materials"]
//! template_extension = "ron"
//! exporter_dirs = ["exporters"]
//! frames_in_flight = 3
//! dump_failed_shaders = true
//! dump_dir = "shader-dumps"
//! ```
//!
//! Every field is optional. Relative paths in a file loaded with
//! [`RegistryConfig::load`] are resolved against the file's directory.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::deferred::MAX_FRAMES_IN_FLIGHT;
use crate::error::{MaterialError, Result};
use crate::shader::ShaderReflector;

/// Configuration of a [`PluginRegistry`](crate::PluginRegistry).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Directories scanned for template files.
    pub template_dirs: Vec<PathBuf>,
    /// Extension of template files, without the dot.
    pub template_extension: String,
    /// Directories scanned for exporter modules.
    pub exporter_dirs: Vec<PathBuf>,
    /// Frame syncs a retired object is held for.
    pub frames_in_flight: usize,
    /// Write sources that fail to compile to `dump_dir`.
    pub dump_failed_shaders: bool,
    /// Where failing sources go, `<tmp>/matforge-failed-shaders` if unset.
    pub dump_dir: Option<PathBuf>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            template_dirs: vec![PathBuf::from("materials")],
            template_extension: "ron".into(),
            exporter_dirs: vec![PathBuf::from("exporters")],
            frames_in_flight: MAX_FRAMES_IN_FLIGHT,
            dump_failed_shaders: cfg!(debug_assertions),
            dump_dir: None,
        }
    }
}

impl RegistryConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| MaterialError::Config(e.to_string()))
    }

    /// Load a TOML file, resolving relative paths against its directory.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| MaterialError::io(path, e))?;
        let mut config: Self = toml::from_str(&text)
            .map_err(|e| MaterialError::Config(format!("{}: {e}", path.display())))?;
        if let Some(base) = path.parent() {
            config.resolve_relative(base);
        }
        Ok(config)
    }

    /// Load a TOML file, falling back to defaults if it is missing or invalid.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => {
                log::info!(
                    "Loaded registry config {} ({} template dirs, {} exporter dirs)",
                    path.display(),
                    config.template_dirs.len(),
                    config.exporter_dirs.len()
                );
                config
            }
            Err(e) => {
                log::warn!("Using default registry config: {e}");
                Self::default()
            }
        }
    }

    /// Make every relative directory relative to `base` instead.
    pub fn resolve_relative(&mut self, base: &Path) {
        let join = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        self.template_dirs.iter_mut().for_each(join);
        self.exporter_dirs.iter_mut().for_each(join);
        if let Some(dir) = self.dump_dir.as_mut() {
            join(dir);
        }
    }

    /// Directory for failing shader sources.
    pub fn effective_dump_dir(&self) -> PathBuf {
        self.dump_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("matforge-failed-shaders"))
    }

    /// A reflector configured for this registry.
    pub fn reflector(&self) -> ShaderReflector {
        if self.dump_failed_shaders {
            ShaderReflector::new().with_dump_dir(self.effective_dump_dir())
        } else {
            ShaderReflector::new()
        }
    }

    #[must_use]
    pub fn with_template_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.template_dirs.push(dir.into());
        self
    }

    #[must_use]
    pub fn with_exporter_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.exporter_dirs.push(dir.into());
        self
    }

    #[must_use]
    pub fn with_frames_in_flight(mut self, frames: usize) -> Self {
        self.frames_in_flight = frames;
        self
    }

    #[must_use]
    pub fn with_dump_failed_shaders(mut self, enabled: bool) -> Self {
        self.dump_failed_shaders = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RegistryConfig::default();
        assert_eq!(config.template_dirs, [PathBuf::from("materials")]);
        assert_eq!(config.template_extension, "ron");
        assert_eq!(config.frames_in_flight, 3);
        assert_eq!(config.dump_failed_shaders, cfg!(debug_assertions));
        assert!(
            config
                .effective_dump_dir()
                .ends_with("matforge-failed-shaders")
        );
    }

    #[test]
    fn test_partial_toml() {
        let config = RegistryConfig::from_toml_str(
            r#"
            frames_in_flight = 2
            exporter_dirs = ["plugins", "/opt/matforge/exporters"]
            "#,
        )
        .unwrap();
        assert_eq!(config.frames_in_flight, 2);
        assert_eq!(config.exporter_dirs.len(), 2);
        assert_eq!(config.template_extension, "ron");
    }

    #[test]
    fn test_invalid_toml() {
        let err = RegistryConfig::from_toml_str("frames_in_flight = \"many\"").unwrap_err();
        assert!(matches!(err, MaterialError::Config(_)));
    }

    #[test]
    fn test_load_invalid_file_names_path() {
        let path = std::env::temp_dir().join(format!("matforge-bad-{}.toml", std::process::id()));
        std::fs::write(&path, "frames_in_flight = \"many\"").unwrap();

        let message = RegistryConfig::load(&path).unwrap_err().to_string();
        std::fs::remove_file(&path).unwrap();
        assert!(message.starts_with("configuration error: "));
        assert!(message.contains(&path.display().to_string()));
        assert_eq!(message.matches("configuration error").count(), 1);
    }

    #[test]
    fn test_resolve_relative() {
        let mut config = RegistryConfig {
            dump_dir: Some(PathBuf::from("dumps")),
            ..Default::default()
        }
        .with_exporter_dir("/abs/exporters");
        config.resolve_relative(Path::new("/project"));
        assert_eq!(config.template_dirs, [PathBuf::from("/project/materials")]);
        assert_eq!(
            config.exporter_dirs,
            [
                PathBuf::from("/project/exporters"),
                PathBuf::from("/abs/exporters")
            ]
        );
        assert_eq!(config.dump_dir, Some(PathBuf::from("/project/dumps")));
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = RegistryConfig::load_or_default(Path::new("/nonexistent/matforge.toml"));
        assert_eq!(config, RegistryConfig::default());
    }

    #[test]
    fn test_reflector_dump_dir() {
        let config = RegistryConfig::default().with_dump_failed_shaders(false);
        assert!(config.reflector().dump_dir().is_none());
        let config = config.with_dump_failed_shaders(true);
        assert!(config.reflector().dump_dir().is_some());
    }
}
