//! Reflected binding tables.
//!
//! A [`BindingTable`] is produced per compiled stage and replaced wholesale on
//! every (re)compile. Absent names mean "not used by this stage"; every lookup
//! returns a [`BindingLookupError`] instead of panicking because the lighting
//! and shadow stages usually use different subsets of a schema.

use std::collections::HashMap;

use matforge_core::material::PropertyKind;

use crate::error::BindingLookupError;

/// Name of the constant buffer that carries all user-editable scalars.
pub const USER_CONSTANT_BUFFER: &str = "CbUser";

/// Byte range of one constant-buffer member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemberLayout {
    pub offset: u32,
    pub size: u32,
}

/// Layout of one constant buffer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConstantBufferLayout {
    pub total_size: u32,
    pub members: HashMap<String, MemberLayout>,
}

impl ConstantBufferLayout {
    pub fn new(total_size: u32) -> Self {
        Self {
            total_size,
            members: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_member(mut self, name: impl Into<String>, offset: u32, size: u32) -> Self {
        self.members.insert(name.into(), MemberLayout { offset, size });
        self
    }
}

/// How a bound resource is accessed by the shader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceClass {
    /// Uniform buffer.
    ConstantBuffer,
    /// Sampled texture or read-only storage buffer.
    ReadOnly,
    /// Writable storage buffer or storage texture.
    ReadWrite,
}

/// Name to slot maps, one per [`ResourceClass`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceSlots {
    pub constant_buffers: HashMap<String, u32>,
    pub read_only: HashMap<String, u32>,
    pub read_write: HashMap<String, u32>,
}

impl ResourceSlots {
    pub fn insert(&mut self, class: ResourceClass, name: impl Into<String>, slot: u32) {
        self.map_mut(class).insert(name.into(), slot);
    }

    pub fn get(&self, class: ResourceClass, name: &str) -> Option<u32> {
        self.map(class).get(name).copied()
    }

    pub fn map(&self, class: ResourceClass) -> &HashMap<String, u32> {
        match class {
            ResourceClass::ConstantBuffer => &self.constant_buffers,
            ResourceClass::ReadOnly => &self.read_only,
            ResourceClass::ReadWrite => &self.read_write,
        }
    }

    fn map_mut(&mut self, class: ResourceClass) -> &mut HashMap<String, u32> {
        match class {
            ResourceClass::ConstantBuffer => &mut self.constant_buffers,
            ResourceClass::ReadOnly => &mut self.read_only,
            ResourceClass::ReadWrite => &mut self.read_write,
        }
    }

    pub fn len(&self) -> usize {
        self.constant_buffers.len() + self.read_only.len() + self.read_write.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Reflected tables of one compiled stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindingTable {
    pub constant_buffers: HashMap<String, ConstantBufferLayout>,
    pub slots: ResourceSlots,
}

impl BindingTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn constant_buffer(&self, name: &str) -> Result<&ConstantBufferLayout, BindingLookupError> {
        self.constant_buffers
            .get(name)
            .ok_or_else(|| BindingLookupError::ConstantBufferMissing(name.to_string()))
    }

    pub fn member(&self, buffer: &str, member: &str) -> Result<MemberLayout, BindingLookupError> {
        self.constant_buffer(buffer)?
            .members
            .get(member)
            .copied()
            .ok_or_else(|| BindingLookupError::MemberNotFound {
                buffer: buffer.to_string(),
                member: member.to_string(),
            })
    }

    /// Resolve a property target to its byte offset in `buffer`.
    ///
    /// The member must be exactly as large as the kind's GPU encoding.
    pub fn resolve_offset(
        &self,
        buffer: &str,
        member: &str,
        kind: PropertyKind,
    ) -> Result<u32, BindingLookupError> {
        let layout = self.member(buffer, member)?;
        match kind.gpu_size() {
            Some(expected) if expected == layout.size => Ok(layout.offset),
            Some(expected) => Err(BindingLookupError::SizeMismatch {
                member: member.to_string(),
                kind,
                expected,
                actual: layout.size,
            }),
            None => Err(BindingLookupError::ResourceNotFound(member.to_string())),
        }
    }

    /// Resolve a texture target to its read-only resource slot.
    pub fn resolve_texture_slot(&self, name: &str) -> Result<u32, BindingLookupError> {
        self.slots
            .get(ResourceClass::ReadOnly, name)
            .ok_or_else(|| BindingLookupError::ResourceNotFound(name.to_string()))
    }

    /// Size of the user constant buffer, 0 when the stage does not use it.
    pub fn user_buffer_size(&self) -> u32 {
        self.constant_buffers
            .get(USER_CONSTANT_BUFFER)
            .map_or(0, |cb| cb.total_size)
    }
}

bitflags::bitflags! {
    /// Stages of a template that bind a given property.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct StageMask: u32 {
        const LIGHTING = 1 << 0;
        const SHADOW = 1 << 1;
    }
}
