//! CPU-side mesh attribute storage and generators.
//!
//! - [`MeshData`] - Named mesh with one tightly packed `Vec` per attribute
//! - [`MeshError`] - Attribute length mismatches found by [`MeshData::validate`]
//! - Generators for common shapes (sphere, quad)
//!
//! Attribute vectors are kept separate so that exporters can be handed a raw
//! pointer per attribute without repacking.

mod data;
pub mod generators;

pub use data::{MAX_UV_CHANNELS, MeshData, MeshError};
