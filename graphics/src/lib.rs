//! # MatForge Graphics
//!
//! Material runtime: WGSL templates compiled to SPIR-V, reflected into
//! name-keyed binding tables, edited through per-use instances and exported
//! to external modules.
//!
//! ## Overview
//!
//! This crate provides:
//! - [`ShaderReflector`] - Compile one entry point with naga and reflect its bindings
//! - [`MaterialTemplate`] - Lighting and shadow stages with hot reload
//! - [`MaterialInstance`] - Editable values resolved against `CbUser` offsets
//! - [`PluginRegistry`] - Template table, reload and deferred disposal timing
//! - [`export`] - Flat `#[repr(C)]` snapshots handed to exporter modules
//!
//! ## Example
//!
//! ```ignore
//! use matforge_graphics::{PluginRegistry, RegistryConfig};
//!
//! let mut registry = PluginRegistry::new(RegistryConfig::load_or_default("matforge.toml".as_ref()));
//! registry.load_all();
//! let instance = registry.create_instance("standard_surface")?;
//! loop {
//!     // upload instance constants, draw ...
//!     registry.sync();
//! }
//! ```

pub mod config;
pub mod deferred;
pub mod error;
pub mod export;
pub mod materials;
pub mod registry;
pub mod shader;

// Re-export main types for convenience
pub use config::RegistryConfig;
pub use deferred::{DeferredDisposer, MAX_FRAMES_IN_FLIGHT};
pub use error::{BindingLookupError, ExportError, MaterialError, Result, ShaderError};
pub use export::{ExportSnapshot, ExportWorkspace, call_exporter, release_context_arrays};
pub use materials::{
    BindingTable, MaterialInstance, MaterialTemplate, PropertyEntry, Resolution,
    RonTemplateParser, StageKind, TemplateSource, TemplateSourceParser, TemplateState,
};
pub use registry::{PluginRegistry, ReloadReport};
pub use shader::{CompiledStage, ShaderReflector, ShaderStage};

/// Graphics library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
