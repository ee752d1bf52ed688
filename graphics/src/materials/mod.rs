//! Material templates, instances and their binding tables.
//!
//! - [`BindingTable`] - Reflected offsets and slots of one compiled stage
//! - [`MaterialTemplate`] - Lighting + shadow stages and the property schema
//! - [`MaterialInstance`] - Editable values resolved against a template
//! - [`TemplateSourceParser`] - Front end producing WGSL plus schema
//!
//! Templates share their schema with instances via `Arc`; compiled stages
//! are shared via `Arc` so retired ones can outlive a reload in the
//! deferred disposer.

mod bindings;
mod instance;
mod parser;
pub(crate) mod template;

pub use bindings::{
    BindingTable, ConstantBufferLayout, MemberLayout, ResourceClass, ResourceSlots, StageMask,
    USER_CONSTANT_BUFFER,
};
pub use instance::{MaterialInstance, PropertyEntry, Resolution};
pub use parser::{RonTemplateParser, TemplateSource, TemplateSourceParser};
pub use template::{MaterialTemplate, StageDisposer, StageKind, TemplateState};
