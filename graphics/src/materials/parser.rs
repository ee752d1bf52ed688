//! Template description files.
//!
//! The runtime only consumes a parsed [`TemplateSource`]; where it comes
//! from is up to a [`TemplateSourceParser`]. [`RonTemplateParser`] reads
//! RON files of this shape:
//!
//! ```ron
//! (
//!     name: "standard_surface",
//!     shader: File("standard_surface.wgsl"),
//!     states: (cast_shadow: Editable(true), blend: Fixed(Opaque)),
//!     properties: [
//!         (tag: "Base Color", target: "BaseColor", default: Color4((1.0, 1.0, 1.0, 1.0))),
//!         (tag: "Roughness", target: "Roughness", default: Float(0.5),
//!          range: Some((step: 0.01, min: 0.0, max: 1.0))),
//!     ],
//! )
//! ```
//!
//! `name` defaults to the file stem; shader paths are relative to the file.
//! Optional fields may be written bare (`name: "x"`) or as `Some(..)`.

use std::path::{Path, PathBuf};

use matforge_core::material::{FixedFunctionStates, PropertyDescriptor, PropertySchema};
use serde::Deserialize;

use crate::error::{MaterialError, Result};

/// Parsed template: WGSL text plus schema and states.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateSource {
    pub name: String,
    pub shader_source: String,
    pub schema: PropertySchema,
    pub states: FixedFunctionStates,
}

/// Turns a template file into a [`TemplateSource`].
pub trait TemplateSourceParser: Send + Sync {
    fn parse(&self, path: &Path) -> Result<TemplateSource>;
}

/// Where a template's WGSL comes from.
#[derive(Debug, Clone, Deserialize)]
enum ShaderRef {
    File(PathBuf),
    Inline(String),
}

#[derive(Debug, Deserialize)]
struct TemplateFile {
    #[serde(default)]
    name: Option<String>,
    shader: ShaderRef,
    #[serde(default)]
    states: FixedFunctionStates,
    #[serde(default)]
    properties: Vec<PropertyDescriptor>,
}

/// Reads RON template files.
#[derive(Debug, Clone, Copy, Default)]
pub struct RonTemplateParser;

impl RonTemplateParser {
    /// Parse RON text. `path` names the template and anchors shader paths.
    pub fn parse_str(&self, text: &str, path: &Path) -> Result<TemplateSource> {
        let file: TemplateFile = ron::Options::default()
            .with_default_extension(ron::extensions::Extensions::IMPLICIT_SOME)
            .from_str(text)
            .map_err(|e| MaterialError::TemplateParse {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;

        let name = match file.name {
            Some(name) => name,
            None => path
                .file_stem()
                .and_then(|s| s.to_str())
                .map(str::to_string)
                .ok_or_else(|| MaterialError::TemplateParse {
                    path: path.to_path_buf(),
                    message: "template has no name".into(),
                })?,
        };

        let shader_source = match file.shader {
            ShaderRef::Inline(source) => source,
            ShaderRef::File(relative) => {
                let shader_path = match path.parent() {
                    Some(dir) => dir.join(relative),
                    None => relative,
                };
                std::fs::read_to_string(&shader_path)
                    .map_err(|e| MaterialError::io(shader_path, e))?
            }
        };

        let schema = PropertySchema::from_descriptors(file.properties)?;

        Ok(TemplateSource {
            name,
            shader_source,
            schema,
            states: file.states,
        })
    }
}

impl TemplateSourceParser for RonTemplateParser {
    fn parse(&self, path: &Path) -> Result<TemplateSource> {
        let text = std::fs::read_to_string(path).map_err(|e| MaterialError::io(path, e))?;
        self.parse_str(&text, path)
    }
}

#[cfg(test)]
mod tests {
    use matforge_core::material::{BlendMode, PropertyKind, StateField};

    use super::*;

    const INLINE: &str = r#"(
        name: "unlit",
        shader: Inline("@fragment fn lighting_main() -> @location(0) vec4<f32> { return vec4<f32>(1.0); }"),
        states: (blend: Editable(AlphaBlend)),
        properties: [
            (tag: "Tint", target: "Tint", default: Color4((1.0, 0.5, 0.5, 1.0))),
            (tag: "Angle", target: "RotationAngle", default: Float(45.0), converter: DegreesToRadians),
            (tag: "Albedo", target: "AlbedoMap", default: Texture2D((fallback: Gray))),
        ],
    )"#;

    #[test]
    fn test_parse_inline() {
        let source = RonTemplateParser
            .parse_str(INLINE, Path::new("materials/unlit.ron"))
            .unwrap();
        assert_eq!(source.name, "unlit");
        assert!(source.shader_source.contains("lighting_main"));
        assert_eq!(source.schema.len(), 3);
        assert_eq!(source.schema.of_kind(PropertyKind::Color4).len(), 1);
        assert!(source.states.is_editable(StateField::Blend));
        assert_eq!(source.states.resolve().blend, BlendMode::AlphaBlend);
    }

    #[test]
    fn test_name_defaults_to_stem() {
        let text = r#"(shader: Inline("x"))"#;
        let source = RonTemplateParser
            .parse_str(text, Path::new("dir/brick_wall.ron"))
            .unwrap();
        assert_eq!(source.name, "brick_wall");
        assert!(source.schema.is_empty());
    }

    #[test]
    fn test_explicit_some_name() {
        let text = r#"(name: Some("rough_metal"), shader: Inline("x"))"#;
        let source = RonTemplateParser
            .parse_str(text, Path::new("dir/other.ron"))
            .unwrap();
        assert_eq!(source.name, "rough_metal");
    }

    #[test]
    fn test_parse_named_fixture() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/standard_surface.ron");
        let source = RonTemplateParser.parse(&path).unwrap();
        assert_eq!(source.name, "standard_surface");
        assert_eq!(source.schema.len(), 16);
        assert!(source.shader_source.contains("lighting_main"));
    }

    #[test]
    fn test_syntax_error() {
        let err = RonTemplateParser
            .parse_str("(shader: ", Path::new("bad.ron"))
            .unwrap_err();
        assert!(matches!(err, MaterialError::TemplateParse { .. }));
    }

    #[test]
    fn test_invalid_schema() {
        let text = r#"(
            shader: Inline("x"),
            properties: [
                (tag: "A", target: "Roughness", default: Float(0.1)),
                (tag: "B", target: "Roughness", default: Float(0.2)),
            ],
        )"#;
        let err = RonTemplateParser
            .parse_str(text, Path::new("dup.ron"))
            .unwrap_err();
        assert!(matches!(err, MaterialError::Schema(_)));
    }

    #[test]
    fn test_missing_shader_file() {
        let text = r#"(shader: File("does_not_exist.wgsl"))"#;
        let err = RonTemplateParser
            .parse_str(text, Path::new("/nonexistent/m.ron"))
            .unwrap_err();
        assert!(matches!(err, MaterialError::Io { .. }));
    }
}
