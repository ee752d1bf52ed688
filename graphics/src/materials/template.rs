//! Hot-reloadable material templates.
//!
//! A [`MaterialTemplate`] compiles the lighting and shadow entry points of
//! one WGSL source and owns the property schema parsed alongside it.
//!
//! ```text
//! Unloaded --load--> Compiling --ok--> Ready
//!                        |
//!                        +--err--> Unloaded
//!
//! Ready --reload--> Compiling --ok--> Ready (new stages, generation + 1)
//!                        |
//!                        +--err--> Ready (old stages untouched)
//!
//! any --term--> Terminated
//! ```
//!
//! Replaced stages are handed to a [`DeferredDisposer`] instead of being
//! dropped, because in-flight frames may still reference them.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use matforge_core::material::{FixedFunctionStates, PropertySchema};
use matforge_core::profiling::profile_scope;

use super::bindings::{BindingTable, StageMask};
use super::parser::{TemplateSource, TemplateSourceParser};
use crate::deferred::DeferredDisposer;
use crate::error::{MaterialError, Result};
use crate::shader::{CompiledStage, LIGHTING_ENTRY_POINT, SHADOW_ENTRY_POINT, ShaderReflector};

/// Disposer type used for retired stages.
pub type StageDisposer = DeferredDisposer<Arc<CompiledStage>>;

/// One of the two stages compiled from a template source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageKind {
    Lighting,
    Shadow,
}

impl StageKind {
    pub const ALL: [StageKind; 2] = [Self::Lighting, Self::Shadow];

    pub fn entry_point(self) -> &'static str {
        match self {
            Self::Lighting => LIGHTING_ENTRY_POINT,
            Self::Shadow => SHADOW_ENTRY_POINT,
        }
    }

    pub fn mask(self) -> StageMask {
        match self {
            Self::Lighting => StageMask::LIGHTING,
            Self::Shadow => StageMask::SHADOW,
        }
    }
}

/// Lifecycle state of a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateState {
    Unloaded,
    Compiling,
    Ready,
    Terminated,
}

struct Compiled {
    source: TemplateSource,
    lighting: CompiledStage,
    shadow: CompiledStage,
}

/// A material template loaded from a description file.
pub struct MaterialTemplate {
    name: String,
    path: PathBuf,
    state: TemplateState,
    schema: Arc<PropertySchema>,
    states: FixedFunctionStates,
    lighting: Option<Arc<CompiledStage>>,
    shadow: Option<Arc<CompiledStage>>,
    bound: Option<StageKind>,
    generation: u64,
}

impl std::fmt::Debug for MaterialTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MaterialTemplate")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("state", &self.state)
            .field("properties", &self.schema.len())
            .field("bound", &self.bound)
            .field("generation", &self.generation)
            .finish()
    }
}

impl MaterialTemplate {
    /// Create an unloaded template for `path`. The name is the file stem
    /// until a load provides one.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();
        Self {
            name,
            path,
            state: TemplateState::Unloaded,
            schema: Arc::new(PropertySchema::new()),
            states: FixedFunctionStates::default(),
            lighting: None,
            shadow: None,
            bound: None,
            generation: 0,
        }
    }

    /// Parse and compile both stages from the stored path.
    ///
    /// On success the new stages replace the old ones, which go to
    /// `disposer`. On failure a ready template keeps its previous state and
    /// an unloaded one stays unloaded. Errors are logged.
    ///
    /// A terminated template is never revived. Once loaded, the name is
    /// fixed: a source that declares a different one fails to load.
    pub fn load(
        &mut self,
        parser: &dyn TemplateSourceParser,
        reflector: &ShaderReflector,
        disposer: &mut StageDisposer,
    ) -> bool {
        profile_scope!("template_load");

        if self.state == TemplateState::Terminated {
            log::warn!("Cannot load terminated template '{}'", self.name);
            return false;
        }
        if self.path.as_os_str().is_empty() {
            log::error!("Template load rejected: empty path");
            return false;
        }

        let previous = self.state;
        self.state = TemplateState::Compiling;

        match self.compile(parser, reflector) {
            Ok(compiled) => {
                self.install(compiled, disposer);
                log::info!(
                    "Loaded template '{}' from {} (generation {})",
                    self.name,
                    self.path.display(),
                    self.generation
                );
                true
            }
            Err(e) => {
                self.state = match previous {
                    TemplateState::Ready => TemplateState::Ready,
                    _ => TemplateState::Unloaded,
                };
                if self.state == TemplateState::Ready {
                    log::warn!(
                        "Reload of '{}' failed, keeping previous shader: {e}",
                        self.name
                    );
                } else {
                    log::error!("Failed to load template {}: {e}", self.path.display());
                }
                false
            }
        }
    }

    /// Recompile from the stored path. Same as [`load`](Self::load).
    pub fn reload(
        &mut self,
        parser: &dyn TemplateSourceParser,
        reflector: &ShaderReflector,
        disposer: &mut StageDisposer,
    ) -> bool {
        log::info!("Reloading template '{}'", self.name);
        self.load(parser, reflector, disposer)
    }

    /// Release both stages through `disposer` and mark the template
    /// terminated. Instances bound to it become stale.
    pub fn term(&mut self, disposer: &mut StageDisposer) {
        self.retire_stages(disposer);
        self.bound = None;
        if self.state != TemplateState::Terminated {
            self.generation += 1;
            log::info!("Terminated template '{}'", self.name);
        }
        self.state = TemplateState::Terminated;
    }

    /// Select the stage used by the next draw. Fails if it is not compiled.
    pub fn bind(&mut self, stage: StageKind) -> bool {
        if self.stage(stage).is_none() {
            log::warn!("Template '{}': cannot bind {stage:?}, not compiled", self.name);
            return false;
        }
        self.bound = Some(stage);
        true
    }

    pub fn unbind(&mut self) {
        self.bound = None;
    }

    pub fn bound_stage(&self) -> Option<StageKind> {
        self.bound
    }

    /// Binary of the bound stage.
    pub fn bound_binary(&self) -> Option<&Arc<CompiledStage>> {
        self.bound.and_then(|stage| self.stage(stage))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn state(&self) -> TemplateState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == TemplateState::Ready
    }

    pub fn schema(&self) -> &Arc<PropertySchema> {
        &self.schema
    }

    pub fn states(&self) -> &FixedFunctionStates {
        &self.states
    }

    pub fn stage(&self, stage: StageKind) -> Option<&Arc<CompiledStage>> {
        match stage {
            StageKind::Lighting => self.lighting.as_ref(),
            StageKind::Shadow => self.shadow.as_ref(),
        }
    }

    pub fn bindings(&self, stage: StageKind) -> Option<&BindingTable> {
        self.stage(stage).map(|s| s.bindings())
    }

    /// Bytes needed to stage the user constant buffer of `stage`.
    pub fn constant_buffer_size(&self, stage: StageKind) -> u32 {
        self.bindings(stage).map_or(0, BindingTable::user_buffer_size)
    }

    /// Counter bumped by every successful load and by termination.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    fn compile(
        &self,
        parser: &dyn TemplateSourceParser,
        reflector: &ShaderReflector,
    ) -> Result<Compiled> {
        let source = parser.parse(&self.path)?;
        if source.name.is_empty() {
            return Err(MaterialError::InvalidArgument(format!(
                "template {} has an empty name",
                self.path.display()
            )));
        }
        if self.generation > 0 && source.name != self.name {
            return Err(MaterialError::InvalidArgument(format!(
                "template '{}' cannot be renamed to '{}'",
                self.name, source.name
            )));
        }
        let lighting = reflector.compile(&source.shader_source, LIGHTING_ENTRY_POINT)?;
        let shadow = reflector.compile(&source.shader_source, SHADOW_ENTRY_POINT)?;
        Ok(Compiled {
            source,
            lighting,
            shadow,
        })
    }

    fn install(&mut self, compiled: Compiled, disposer: &mut StageDisposer) {
        self.retire_stages(disposer);
        self.name = compiled.source.name;
        self.schema = Arc::new(compiled.source.schema);
        self.states = compiled.source.states;
        self.lighting = Some(Arc::new(compiled.lighting));
        self.shadow = Some(Arc::new(compiled.shadow));
        self.generation += 1;
        self.state = TemplateState::Ready;
    }

    fn retire_stages(&mut self, disposer: &mut StageDisposer) {
        for stage in [self.lighting.take(), self.shadow.take()].into_iter().flatten() {
            log::trace!("Retiring stage '{}' of '{}'", stage.entry_point(), self.name);
            disposer.push(stage);
        }
    }
}

static_assertions::assert_impl_all!(MaterialTemplate: Send, Sync);
