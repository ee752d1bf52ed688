//! Per-use editable value sets bound to a template.
//!
//! A [`MaterialInstance`] mirrors its template's schema, kind by kind, with
//! one [`PropertyEntry`] per descriptor. Each entry resolves its target
//! against both stages once, at creation or [`rebind`](MaterialInstance::rebind)
//! time:
//!
//! - non-texture kinds: byte offset in the `CbUser` constant buffer
//! - textures: read-only resource slot
//!
//! Resolution is not refreshed automatically. Every successful template
//! load bumps the template's generation; an instance resolved against an
//! older generation is stale and refuses to upload until rebound.

use std::sync::Arc;

use matforge_core::material::{
    FixedFunctionStates, PropertyDescriptor, PropertyKind, PropertySchema, PropertyValue,
    StateValue, StateValues, TextureValue, ValueConverter,
};
use matforge_core::profiling::profile_function;

use super::bindings::{BindingTable, StageMask, USER_CONSTANT_BUFFER};
use super::template::{MaterialTemplate, StageKind};
use crate::error::{BindingLookupError, MaterialError, Result};

/// Where a property lands in one stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Byte offset in the user constant buffer.
    Offset(u32),
    /// Read-only resource slot.
    Slot(u32),
    /// The stage does not bind this property.
    Missing(BindingLookupError),
}

impl Resolution {
    pub fn location(&self) -> Option<u32> {
        match self {
            Self::Offset(v) | Self::Slot(v) => Some(*v),
            Self::Missing(_) => None,
        }
    }

    /// The resolved offset or slot, 0 when unresolved.
    pub fn location_or_default(&self) -> u32 {
        self.location().unwrap_or(0)
    }

    pub fn is_resolved(&self) -> bool {
        !matches!(self, Self::Missing(_))
    }

    pub fn error(&self) -> Option<&BindingLookupError> {
        match self {
            Self::Missing(e) => Some(e),
            _ => None,
        }
    }

    fn resolve(desc: &PropertyDescriptor, table: Option<&BindingTable>) -> Self {
        let Some(table) = table else {
            return Self::Missing(BindingLookupError::StageUnavailable);
        };
        let kind = desc.kind();
        let result = if kind.is_texture() {
            table.resolve_texture_slot(&desc.target).map(Self::Slot)
        } else {
            table
                .resolve_offset(USER_CONSTANT_BUFFER, &desc.target, kind)
                .map(Self::Offset)
        };
        result.unwrap_or_else(Self::Missing)
    }
}

/// Current value of one property plus its per-stage resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyEntry {
    pub tag: String,
    pub target: String,
    pub value: PropertyValue,
    pub converter: ValueConverter,
    pub lighting: Resolution,
    pub shadow: Resolution,
}

impl PropertyEntry {
    fn new(desc: &PropertyDescriptor, template: &MaterialTemplate) -> Self {
        let lighting = Resolution::resolve(desc, template.bindings(StageKind::Lighting));
        let shadow = Resolution::resolve(desc, template.bindings(StageKind::Shadow));
        if let Some(e) = lighting.error() {
            log::warn!(
                "Material '{}': {} property '{}' unresolved ({e}), defaulting to 0",
                template.name(),
                desc.kind(),
                desc.target
            );
        }
        Self {
            tag: desc.tag.clone(),
            target: desc.target.clone(),
            value: desc.default.clone(),
            converter: desc.converter,
            lighting,
            shadow,
        }
    }

    pub fn kind(&self) -> PropertyKind {
        self.value.kind()
    }

    pub fn resolution(&self, stage: StageKind) -> &Resolution {
        match stage {
            StageKind::Lighting => &self.lighting,
            StageKind::Shadow => &self.shadow,
        }
    }

    /// Lighting-stage offset or slot, 0 when unresolved.
    pub fn location(&self) -> u32 {
        self.lighting.location_or_default()
    }

    /// Stages that bind this property.
    pub fn stages(&self) -> StageMask {
        let mut mask = StageMask::empty();
        for stage in StageKind::ALL {
            if self.resolution(stage).is_resolved() {
                mask |= stage.mask();
            }
        }
        mask
    }
}

/// Editable values of one material, bound to a template.
///
/// Holds the template's name, not the template. The owner must drop or
/// rebind instances before their template is unloaded.
#[derive(Debug, Clone)]
pub struct MaterialInstance {
    material: String,
    schema: Arc<PropertySchema>,
    entries: [Vec<PropertyEntry>; PropertyKind::COUNT],
    selectors: FixedFunctionStates,
    states: StateValues,
    generation: u64,
}

impl MaterialInstance {
    /// Resolve a fresh instance with default values against `template`.
    pub fn new(template: &MaterialTemplate) -> Result<Self> {
        if !template.is_ready() {
            return Err(MaterialError::InvalidArgument(format!(
                "template '{}' is not loaded",
                template.name()
            )));
        }
        let schema = Arc::clone(template.schema());
        let entries = resolve_entries(&schema, template);
        log::debug!(
            "Created instance of '{}' ({} properties)",
            template.name(),
            schema.len()
        );
        Ok(Self {
            material: template.name().to_string(),
            schema,
            entries,
            selectors: *template.states(),
            states: template.states().resolve(),
            generation: template.generation(),
        })
    }

    /// Name of the template this instance was created from.
    pub fn material_name(&self) -> &str {
        &self.material
    }

    /// Template generation the offsets were resolved against.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether `template` has been (re)loaded since this instance resolved.
    pub fn is_stale(&self, template: &MaterialTemplate) -> bool {
        template.generation() != self.generation
    }

    /// Re-resolve against `template`, keeping current values of properties
    /// that still exist with the same kind and target.
    pub fn rebind(&mut self, template: &MaterialTemplate) -> Result<()> {
        if !template.is_ready() {
            return Err(MaterialError::InvalidArgument(format!(
                "template '{}' is not loaded",
                template.name()
            )));
        }
        if template.name() != self.material {
            return Err(MaterialError::InvalidArgument(format!(
                "instance of '{}' cannot rebind to '{}'",
                self.material,
                template.name()
            )));
        }

        let schema = Arc::clone(template.schema());
        let mut entries = resolve_entries(&schema, template);
        for entry in entries.iter_mut().flatten() {
            if let Some(old) = self.entry(entry.kind(), &entry.target) {
                entry.value = schema
                    .find(entry.kind(), &entry.target)
                    .map_or_else(|| old.value.clone(), |d| d.clamp(old.value.clone()));
            }
        }

        let selectors = *template.states();
        let mut states = selectors.resolve();
        for value in [
            StateValue::CastShadow(self.states.cast_shadow),
            StateValue::ReceiveShadow(self.states.receive_shadow),
            StateValue::Blend(self.states.blend),
            StateValue::Rasterizer(self.states.rasterizer),
            StateValue::Depth(self.states.depth),
        ] {
            if selectors.is_editable(value.field()) {
                states.set(value);
            }
        }

        self.schema = schema;
        self.entries = entries;
        self.selectors = selectors;
        self.states = states;
        self.generation = template.generation();
        log::debug!(
            "Rebound instance of '{}' to generation {}",
            self.material,
            self.generation
        );
        Ok(())
    }

    pub fn schema(&self) -> &Arc<PropertySchema> {
        &self.schema
    }

    /// Entries of one kind, in schema order.
    pub fn entries(&self, kind: PropertyKind) -> &[PropertyEntry] {
        &self.entries[kind.index()]
    }

    /// Every entry in kind order.
    pub fn iter(&self) -> impl Iterator<Item = &PropertyEntry> {
        self.entries.iter().flatten()
    }

    pub fn entry(&self, kind: PropertyKind, target: &str) -> Option<&PropertyEntry> {
        self.entries(kind).iter().find(|e| e.target == target)
    }

    pub fn value(&self, kind: PropertyKind, target: &str) -> Option<&PropertyValue> {
        self.entry(kind, target).map(|e| &e.value)
    }

    /// Set a property value, clamped to its range.
    ///
    /// The property is looked up by the value's kind and `target`.
    pub fn set_value(&mut self, target: &str, value: PropertyValue) -> Result<()> {
        let kind = value.kind();
        let Some(desc) = self.schema.find(kind, target) else {
            if let Some(other) = self.schema.find_by_target(target) {
                return Err(MaterialError::KindMismatch {
                    target: target.to_string(),
                    expected: other.kind(),
                    actual: kind,
                });
            }
            return Err(MaterialError::UnknownProperty {
                kind,
                target: target.to_string(),
            });
        };
        let value = desc.clamp(value);
        let entry = self.entries[kind.index()]
            .iter_mut()
            .find(|e| e.target == target)
            .ok_or_else(|| MaterialError::UnknownProperty {
                kind,
                target: target.to_string(),
            })?;
        entry.value = value;
        Ok(())
    }

    /// Restore every value to its descriptor default.
    pub fn reset(&mut self) {
        for (entry, desc) in self.entries.iter_mut().flatten().zip(self.schema.iter()) {
            entry.value = desc.default.clone();
        }
    }

    pub fn states(&self) -> &StateValues {
        &self.states
    }

    /// Change a fixed-function state the template marks editable.
    pub fn set_state(&mut self, value: StateValue) -> Result<()> {
        if !self.selectors.is_editable(value.field()) {
            return Err(MaterialError::StateNotEditable(value.field()));
        }
        self.states.set(value);
        Ok(())
    }

    /// Bytes needed to stage the user constant buffer of `stage`.
    pub fn constant_buffer_size(&self, template: &MaterialTemplate, stage: StageKind) -> u32 {
        template.constant_buffer_size(stage)
    }

    /// Encode every bound non-texture value of `stage` into `dst` at its
    /// resolved offset. Returns the number of values written.
    ///
    /// Fails if the template reloaded since this instance resolved, or if
    /// `dst` is smaller than the stage's constant buffer.
    pub fn write_constants(
        &self,
        template: &MaterialTemplate,
        stage: StageKind,
        dst: &mut [u8],
    ) -> Result<usize> {
        profile_function!();

        if self.is_stale(template) {
            return Err(MaterialError::StaleInstance {
                material: self.material.clone(),
                instance: self.generation,
                template: template.generation(),
            });
        }
        let required = template.constant_buffer_size(stage) as usize;
        if dst.len() < required {
            return Err(MaterialError::InvalidArgument(format!(
                "constant buffer staging is {} bytes, {} needs {required}",
                dst.len(),
                self.material
            )));
        }

        let mut written = 0;
        for entry in self.iter() {
            let Resolution::Offset(offset) = entry.resolution(stage) else {
                continue;
            };
            let Some(encoded) = entry.value.encode(entry.converter) else {
                continue;
            };
            let start = *offset as usize;
            let end = start + encoded.len();
            if let Some(slot) = dst.get_mut(start..end) {
                slot.copy_from_slice(encoded.as_bytes());
                written += 1;
            }
        }
        Ok(written)
    }

    /// `(slot, texture)` for every texture bound by `stage`.
    pub fn texture_bindings(&self, stage: StageKind) -> Vec<(u32, &TextureValue)> {
        self.entries(PropertyKind::Texture2D)
            .iter()
            .filter_map(|entry| match (entry.resolution(stage), entry.value.as_texture()) {
                (Resolution::Slot(slot), Some(texture)) => Some((*slot, texture)),
                _ => None,
            })
            .collect()
    }
}

fn resolve_entries(
    schema: &PropertySchema,
    template: &MaterialTemplate,
) -> [Vec<PropertyEntry>; PropertyKind::COUNT] {
    PropertyKind::ALL.map(|kind| {
        schema
            .of_kind(kind)
            .iter()
            .map(|desc| PropertyEntry::new(desc, template))
            .collect()
    })
}

static_assertions::assert_impl_all!(MaterialInstance: Send, Sync);
