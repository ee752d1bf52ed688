//! Property kinds, values and descriptors.

use serde::{Deserialize, Serialize};

/// Kind of an editable material property.
///
/// The declaration order is the fixed order in which schemas, instances and
/// export records enumerate properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PropertyKind {
    Bool,
    Int,
    Float,
    Float2,
    Float3,
    Float4,
    Color3,
    Color4,
    Bit32,
    Texture2D,
}

impl PropertyKind {
    /// Number of kinds.
    pub const COUNT: usize = 10;

    /// Every kind, in enumeration order.
    pub const ALL: [PropertyKind; Self::COUNT] = [
        Self::Bool,
        Self::Int,
        Self::Float,
        Self::Float2,
        Self::Float3,
        Self::Float4,
        Self::Color3,
        Self::Color4,
        Self::Bit32,
        Self::Texture2D,
    ];

    /// Position of this kind in [`Self::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    /// Short lowercase name used in logs and summaries.
    pub fn name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::Float2 => "float2",
            Self::Float3 => "float3",
            Self::Float4 => "float4",
            Self::Color3 => "color3",
            Self::Color4 => "color4",
            Self::Bit32 => "bit32",
            Self::Texture2D => "texture2d",
        }
    }

    /// Bytes the value occupies in a constant buffer, or `None` for textures.
    ///
    /// Bools are stored as a 32-bit integer.
    pub fn gpu_size(self) -> Option<u32> {
        match self {
            Self::Bool | Self::Int | Self::Float | Self::Bit32 => Some(4),
            Self::Float2 => Some(8),
            Self::Float3 | Self::Color3 => Some(12),
            Self::Float4 | Self::Color4 => Some(16),
            Self::Texture2D => None,
        }
    }

    /// Whether `Step/Min/Max` and converters apply to this kind.
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            Self::Int | Self::Float | Self::Float2 | Self::Float3 | Self::Float4
        )
    }

    /// Whether the kind binds to a resource slot instead of a buffer offset.
    pub fn is_texture(self) -> bool {
        self == Self::Texture2D
    }
}

impl std::fmt::Display for PropertyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Built-in fallback image used when a texture property has no path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DefaultTexture {
    #[default]
    White,
    Black,
    Gray,
    FlatNormal,
}

impl DefaultTexture {
    /// Stable numeric id carried across the export boundary.
    pub fn as_u32(self) -> u32 {
        match self {
            Self::White => 0,
            Self::Black => 1,
            Self::Gray => 2,
            Self::FlatNormal => 3,
        }
    }
}

/// Texture property value.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TextureValue {
    /// Image path, `None` to use the fallback.
    pub path: Option<String>,
    pub fallback: DefaultTexture,
}

impl TextureValue {
    pub fn fallback(fallback: DefaultTexture) -> Self {
        Self {
            path: None,
            fallback,
        }
    }

    pub fn with_path(path: impl Into<String>, fallback: DefaultTexture) -> Self {
        Self {
            path: Some(path.into()),
            fallback,
        }
    }
}

/// A kind-tagged property value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PropertyValue {
    Bool(bool),
    Int(i32),
    Float(f32),
    Float2([f32; 2]),
    Float3([f32; 3]),
    Float4([f32; 4]),
    Color3([f32; 3]),
    Color4([f32; 4]),
    Bit32(u32),
    Texture2D(TextureValue),
}

impl PropertyValue {
    pub fn kind(&self) -> PropertyKind {
        match self {
            Self::Bool(_) => PropertyKind::Bool,
            Self::Int(_) => PropertyKind::Int,
            Self::Float(_) => PropertyKind::Float,
            Self::Float2(_) => PropertyKind::Float2,
            Self::Float3(_) => PropertyKind::Float3,
            Self::Float4(_) => PropertyKind::Float4,
            Self::Color3(_) => PropertyKind::Color3,
            Self::Color4(_) => PropertyKind::Color4,
            Self::Bit32(_) => PropertyKind::Bit32,
            Self::Texture2D(_) => PropertyKind::Texture2D,
        }
    }

    /// Encode the value as it is laid out in a constant buffer.
    ///
    /// The converter is applied to float components of numeric kinds.
    /// Returns `None` for textures.
    pub fn encode(&self, converter: ValueConverter) -> Option<EncodedValue> {
        let encoded = match self {
            Self::Bool(v) => EncodedValue::from_pod(&u32::from(*v)),
            Self::Int(v) => EncodedValue::from_pod(v),
            Self::Float(v) => EncodedValue::from_pod(&converter.apply(*v)),
            Self::Float2(v) => EncodedValue::from_pod(&v.map(|c| converter.apply(c))),
            Self::Float3(v) => EncodedValue::from_pod(&v.map(|c| converter.apply(c))),
            Self::Float4(v) => EncodedValue::from_pod(&v.map(|c| converter.apply(c))),
            Self::Color3(v) => EncodedValue::from_pod(v),
            Self::Color4(v) => EncodedValue::from_pod(v),
            Self::Bit32(v) => EncodedValue::from_pod(v),
            Self::Texture2D(_) => return None,
        };
        Some(encoded)
    }

    pub fn as_texture(&self) -> Option<&TextureValue> {
        match self {
            Self::Texture2D(t) => Some(t),
            _ => None,
        }
    }
}

/// Constant-buffer bytes of one value (at most 16).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodedValue {
    bytes: [u8; 16],
    len: usize,
}

impl EncodedValue {
    fn from_pod<T: bytemuck::Pod>(value: &T) -> Self {
        let src = bytemuck::bytes_of(value);
        let mut bytes = [0u8; 16];
        bytes[..src.len()].copy_from_slice(src);
        Self {
            bytes,
            len: src.len(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Conversion applied when a value is written to GPU memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ValueConverter {
    #[default]
    None,
    /// The UI edits degrees, the shader receives radians.
    DegreesToRadians,
}

impl ValueConverter {
    pub fn apply(self, value: f32) -> f32 {
        match self {
            Self::None => value,
            Self::DegreesToRadians => value.to_radians(),
        }
    }
}

/// Edit range of a numeric property.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NumericRange {
    /// UI drag step, 0 for continuous.
    #[serde(default)]
    pub step: f32,
    pub min: f32,
    pub max: f32,
}

impl NumericRange {
    pub fn new(min: f32, max: f32) -> Self {
        Self { step: 0.0, min, max }
    }

    #[must_use]
    pub fn with_step(mut self, step: f32) -> Self {
        self.step = step;
        self
    }

    fn clamp_f32(&self, value: f32) -> f32 {
        value.max(self.min).min(self.max)
    }

    fn clamp_i32(&self, value: i32) -> i32 {
        value.max(self.min as i32).min(self.max as i32)
    }
}

/// Schema entry for one editable property.
///
/// The kind is taken from the default value, so the two never disagree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyDescriptor {
    /// Human-readable label.
    pub tag: String,
    /// Constant-buffer member or resource name in the shader.
    pub target: String,
    pub default: PropertyValue,
    #[serde(default)]
    pub range: Option<NumericRange>,
    #[serde(default)]
    pub converter: ValueConverter,
}

impl PropertyDescriptor {
    pub fn new(tag: impl Into<String>, target: impl Into<String>, default: PropertyValue) -> Self {
        Self {
            tag: tag.into(),
            target: target.into(),
            default,
            range: None,
            converter: ValueConverter::None,
        }
    }

    #[must_use]
    pub fn with_range(mut self, range: NumericRange) -> Self {
        self.range = Some(range);
        self
    }

    #[must_use]
    pub fn with_converter(mut self, converter: ValueConverter) -> Self {
        self.converter = converter;
        self
    }

    pub fn kind(&self) -> PropertyKind {
        self.default.kind()
    }

    /// Clamp a value into this descriptor's range.
    ///
    /// Int and float kinds are clamped component-wise; every other kind, and
    /// any descriptor without a range, passes the value through.
    pub fn clamp(&self, value: PropertyValue) -> PropertyValue {
        let Some(range) = self.range else {
            return value;
        };
        match value {
            PropertyValue::Int(v) => PropertyValue::Int(range.clamp_i32(v)),
            PropertyValue::Float(v) => PropertyValue::Float(range.clamp_f32(v)),
            PropertyValue::Float2(v) => PropertyValue::Float2(v.map(|c| range.clamp_f32(c))),
            PropertyValue::Float3(v) => PropertyValue::Float3(v.map(|c| range.clamp_f32(c))),
            PropertyValue::Float4(v) => PropertyValue::Float4(v.map(|c| range.clamp_f32(c))),
            other => other,
        }
    }
}
