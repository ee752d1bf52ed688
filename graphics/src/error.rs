//! Error types for the material runtime.
//!
//! Compile and reload failures never escape as panics: the boolean entry
//! points (`load`, `reload`, `reload_shader`) log one of these and return
//! `false`, everything else returns them through [`Result`].

use std::path::PathBuf;

use matforge_core::material::{PropertyKind, SchemaError, StateField};
use thiserror::Error;

/// Result alias defaulting to [`MaterialError`].
pub type Result<T, E = MaterialError> = std::result::Result<T, E>;

/// Failure to compile or reflect one shader entry point.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShaderError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("WGSL parse error:\n{0}")]
    Parse(String),
    #[error("Validation error:\n{0}")]
    Validation(String),
    #[error("entry point '{0}' not found")]
    EntryPointNotFound(String),
    #[error("reflection failed: {0}")]
    Reflection(String),
    #[error("SPIR-V generation error: {0}")]
    Codegen(String),
}

/// A descriptor target that a stage's binding tables do not provide.
///
/// Lookups fail soft: callers decide whether to warn, fall back or abort.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BindingLookupError {
    #[error("stage is not compiled")]
    StageUnavailable,
    #[error("constant buffer '{0}' is not used by this stage")]
    ConstantBufferMissing(String),
    #[error("member '{member}' not found in constant buffer '{buffer}'")]
    MemberNotFound { buffer: String, member: String },
    #[error("member '{member}' is {actual} bytes, {kind} needs {expected}")]
    SizeMismatch {
        member: String,
        kind: PropertyKind,
        expected: u32,
        actual: u32,
    },
    #[error("resource '{0}' is not bound by this stage")]
    ResourceNotFound(String),
}

/// Errors from templates, instances and the registry.
#[derive(Error, Debug)]
pub enum MaterialError {
    #[error(transparent)]
    Shader(#[from] ShaderError),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("failed to parse template {path}: {message}")]
    TemplateParse { path: PathBuf, message: String },
    #[error("invalid property schema: {0}")]
    Schema(#[from] SchemaError),
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("no template named '{0}'")]
    UnknownTemplate(String),
    #[error("instance of '{material}' resolved against generation {instance}, template is at {template}")]
    StaleInstance {
        material: String,
        instance: u64,
        template: u64,
    },
    #[error("property '{target}' is {expected}, got {actual}")]
    KindMismatch {
        target: String,
        expected: PropertyKind,
        actual: PropertyKind,
    },
    #[error("no {kind} property targeting '{target}'")]
    UnknownProperty { kind: PropertyKind, target: String },
    #[error("state {0:?} is fixed by the template")]
    StateNotEditable(StateField),
    #[error("configuration error: {0}")]
    Config(String),
}

/// Failure to build a snapshot or run an exporter module.
///
/// None of these affect the host beyond the failed call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExportError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("failed to load exporter {path}: {message}")]
    ModuleLoad { path: PathBuf, message: String },
    #[error("exporter {path} has no symbol '{symbol}'")]
    SymbolNotFound { path: PathBuf, symbol: String },
    #[error("exporter {path} was built for ABI {found}, host is {expected}")]
    AbiMismatch {
        path: PathBuf,
        expected: u32,
        found: u32,
    },
    #[error("exporter {0} reported failure")]
    ExporterReturnedFalse(PathBuf),
}

impl MaterialError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
