//! Property descriptors grouped by kind.

use std::fmt;

use super::property::{PropertyDescriptor, PropertyKind, ValueConverter};

/// Errors found while validating a property schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// A descriptor has an empty target name.
    EmptyTarget { tag: String },
    /// Two descriptors of the same kind share a target.
    DuplicateTarget { kind: PropertyKind, target: String },
    /// A range was given for a kind that has none.
    RangeOnNonNumeric { kind: PropertyKind, target: String },
    /// A converter was given for a kind that has none.
    ConverterOnNonNumeric { kind: PropertyKind, target: String },
    /// `min` is greater than `max`.
    InvalidRange { target: String },
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyTarget { tag } => write!(f, "property '{tag}' has an empty target"),
            Self::DuplicateTarget { kind, target } => {
                write!(f, "duplicate {kind} property targeting '{target}'")
            }
            Self::RangeOnNonNumeric { kind, target } => {
                write!(f, "{kind} property '{target}' cannot have a range")
            }
            Self::ConverterOnNonNumeric { kind, target } => {
                write!(f, "{kind} property '{target}' cannot have a converter")
            }
            Self::InvalidRange { target } => write!(f, "property '{target}' has min > max"),
        }
    }
}

impl std::error::Error for SchemaError {}

/// All editable properties of a template, grouped by [`PropertyKind`].
///
/// Within a kind, descriptors keep their declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertySchema {
    groups: [Vec<PropertyDescriptor>; PropertyKind::COUNT],
}

impl PropertySchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and group a flat descriptor list.
    pub fn from_descriptors(
        descriptors: impl IntoIterator<Item = PropertyDescriptor>,
    ) -> Result<Self, SchemaError> {
        let mut schema = Self::new();
        for desc in descriptors {
            schema.push(desc)?;
        }
        Ok(schema)
    }

    /// Validate and append one descriptor.
    pub fn push(&mut self, desc: PropertyDescriptor) -> Result<(), SchemaError> {
        let kind = desc.kind();
        if desc.target.is_empty() {
            return Err(SchemaError::EmptyTarget { tag: desc.tag });
        }
        if let Some(range) = desc.range {
            if !kind.is_numeric() {
                return Err(SchemaError::RangeOnNonNumeric {
                    kind,
                    target: desc.target,
                });
            }
            if range.min > range.max {
                return Err(SchemaError::InvalidRange {
                    target: desc.target,
                });
            }
        }
        if desc.converter != ValueConverter::None && !kind.is_numeric() {
            return Err(SchemaError::ConverterOnNonNumeric {
                kind,
                target: desc.target,
            });
        }
        let group = &mut self.groups[kind.index()];
        if group.iter().any(|d| d.target == desc.target) {
            return Err(SchemaError::DuplicateTarget {
                kind,
                target: desc.target,
            });
        }
        group.push(desc);
        Ok(())
    }

    /// Descriptors of one kind, in declaration order.
    pub fn of_kind(&self, kind: PropertyKind) -> &[PropertyDescriptor] {
        &self.groups[kind.index()]
    }

    /// Every descriptor in kind order.
    pub fn iter(&self) -> impl Iterator<Item = &PropertyDescriptor> {
        self.groups.iter().flatten()
    }

    pub fn find(&self, kind: PropertyKind, target: &str) -> Option<&PropertyDescriptor> {
        self.of_kind(kind).iter().find(|d| d.target == target)
    }

    /// First descriptor with the given target, searching in kind order.
    pub fn find_by_target(&self, target: &str) -> Option<&PropertyDescriptor> {
        self.iter().find(|d| d.target == target)
    }

    pub fn len(&self) -> usize {
        self.groups.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.iter().all(Vec::is_empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::{NumericRange, PropertyValue, TextureValue};

    fn sample() -> Vec<PropertyDescriptor> {
        vec![
            PropertyDescriptor::new("Albedo", "AlbedoMap", PropertyValue::Texture2D(TextureValue::default())),
            PropertyDescriptor::new("Roughness", "Roughness", PropertyValue::Float(0.5)),
            PropertyDescriptor::new("Normal Map", "UseNormalMap", PropertyValue::Bool(false)),
            PropertyDescriptor::new("Metallic", "Metallic", PropertyValue::Float(0.0)),
        ]
    }

    #[test]
    fn test_grouped_in_kind_order() {
        let schema = PropertySchema::from_descriptors(sample()).unwrap();
        let targets: Vec<_> = schema.iter().map(|d| d.target.as_str()).collect();
        assert_eq!(targets, ["UseNormalMap", "Roughness", "Metallic", "AlbedoMap"]);
        assert_eq!(schema.len(), 4);
        assert_eq!(schema.of_kind(PropertyKind::Float).len(), 2);
        assert!(schema.of_kind(PropertyKind::Color4).is_empty());
    }

    #[test]
    fn test_find() {
        let schema = PropertySchema::from_descriptors(sample()).unwrap();
        assert!(schema.find(PropertyKind::Float, "Metallic").is_some());
        assert!(schema.find(PropertyKind::Int, "Metallic").is_none());
        assert_eq!(
            schema.find_by_target("AlbedoMap").map(|d| d.kind()),
            Some(PropertyKind::Texture2D)
        );
    }

    #[test]
    fn test_duplicate_target_rejected() {
        let mut descriptors = sample();
        descriptors.push(PropertyDescriptor::new("Rough 2", "Roughness", PropertyValue::Float(1.0)));
        let err = PropertySchema::from_descriptors(descriptors).unwrap_err();
        assert_eq!(
            err,
            SchemaError::DuplicateTarget {
                kind: PropertyKind::Float,
                target: "Roughness".into()
            }
        );
    }

    #[test]
    fn test_range_on_color_rejected() {
        let desc = PropertyDescriptor::new("Tint", "Tint", PropertyValue::Color4([1.0; 4]))
            .with_range(NumericRange::new(0.0, 1.0));
        let err = PropertySchema::from_descriptors([desc]).unwrap_err();
        assert!(matches!(err, SchemaError::RangeOnNonNumeric { .. }));
    }

    #[test]
    fn test_converter_on_bool_rejected() {
        let desc = PropertyDescriptor::new("Flag", "Flag", PropertyValue::Bool(true))
            .with_converter(ValueConverter::DegreesToRadians);
        assert!(PropertySchema::from_descriptors([desc]).is_err());
    }

    #[test]
    fn test_inverted_range_rejected() {
        let desc = PropertyDescriptor::new("Roughness", "Roughness", PropertyValue::Float(0.5))
            .with_range(NumericRange::new(1.0, 0.0));
        let err = PropertySchema::from_descriptors([desc]).unwrap_err();
        assert_eq!(err.to_string(), "property 'Roughness' has min > max");
    }

    #[test]
    fn test_empty_target_rejected() {
        let desc = PropertyDescriptor::new("Nothing", "", PropertyValue::Int(0));
        assert!(matches!(
            PropertySchema::from_descriptors([desc]),
            Err(SchemaError::EmptyTarget { .. })
        ));
    }
}
