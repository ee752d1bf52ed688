//! GPU-agnostic material schema.
//!
//! A material template declares which values an artist may edit and where
//! each value lands in the shader. This module holds that declaration,
//! without any knowledge of compiled shaders:
//!
//! - [`PropertyKind`] - The ten editable value kinds, in their fixed order
//! - [`PropertyValue`] - A kind-tagged value
//! - [`PropertyDescriptor`] - One editable property (label, target, default, range)
//! - [`PropertySchema`] - All descriptors of a template, grouped by kind
//! - [`FixedFunctionStates`] - Shadow flags and blend/rasterizer/depth selectors
//!
//! Binding the schema to reflected shader offsets lives in
//! `matforge-graphics`.

mod property;
mod schema;
mod state;

pub use property::{
    DefaultTexture, EncodedValue, NumericRange, PropertyDescriptor, PropertyKind, PropertyValue,
    TextureValue, ValueConverter,
};
pub use schema::{PropertySchema, SchemaError};
pub use state::{
    BlendMode, DepthMode, FixedFunctionStates, RasterizerMode, StateField, StateSelector,
    StateValue, StateValues,
};
