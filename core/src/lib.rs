//! # matforge core
//!
//! GPU-agnostic building blocks shared by the matforge runtime:
//!
//! - [`material`] - Property kinds, descriptors, schemas and state selectors
//! - [`mesh`] - Per-attribute mesh storage and shape generators
//! - [`profiling`] - Optional Tracy instrumentation macros

pub mod material;
pub mod mesh;
pub mod profiling;

/// Core library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
