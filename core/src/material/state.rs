//! Fixed-function state selectors.

use serde::{Deserialize, Serialize};

/// Blend state of a material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BlendMode {
    #[default]
    Opaque,
    Masked,
    AlphaBlend,
    Additive,
}

/// Rasterizer state of a material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RasterizerMode {
    #[default]
    CullBack,
    CullFront,
    CullNone,
    Wireframe,
}

/// Depth state of a material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DepthMode {
    #[default]
    ReadWrite,
    ReadOnly,
    Disabled,
}

impl BlendMode {
    pub fn as_u32(self) -> u32 {
        self as u32
    }
}

impl RasterizerMode {
    pub fn as_u32(self) -> u32 {
        self as u32
    }
}

impl DepthMode {
    pub fn as_u32(self) -> u32 {
        self as u32
    }
}

/// A state value that the template either pins or lets instances edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StateSelector<T> {
    Fixed(T),
    Editable(T),
}

impl<T: Copy> StateSelector<T> {
    /// The template's value for this state.
    pub fn value(&self) -> T {
        match *self {
            Self::Fixed(v) | Self::Editable(v) => v,
        }
    }

    pub fn is_editable(&self) -> bool {
        matches!(self, Self::Editable(_))
    }
}

impl<T: Default> Default for StateSelector<T> {
    fn default() -> Self {
        Self::Fixed(T::default())
    }
}

/// Identifies one fixed-function state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateField {
    CastShadow,
    ReceiveShadow,
    Blend,
    Rasterizer,
    Depth,
}

/// A value for one [`StateField`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateValue {
    CastShadow(bool),
    ReceiveShadow(bool),
    Blend(BlendMode),
    Rasterizer(RasterizerMode),
    Depth(DepthMode),
}

impl StateValue {
    pub fn field(&self) -> StateField {
        match self {
            Self::CastShadow(_) => StateField::CastShadow,
            Self::ReceiveShadow(_) => StateField::ReceiveShadow,
            Self::Blend(_) => StateField::Blend,
            Self::Rasterizer(_) => StateField::Rasterizer,
            Self::Depth(_) => StateField::Depth,
        }
    }
}

/// Template-level state selectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FixedFunctionStates {
    pub cast_shadow: StateSelector<bool>,
    pub receive_shadow: StateSelector<bool>,
    pub blend: StateSelector<BlendMode>,
    pub rasterizer: StateSelector<RasterizerMode>,
    pub depth: StateSelector<DepthMode>,
}

impl Default for FixedFunctionStates {
    fn default() -> Self {
        Self {
            cast_shadow: StateSelector::Fixed(true),
            receive_shadow: StateSelector::Fixed(true),
            blend: StateSelector::default(),
            rasterizer: StateSelector::default(),
            depth: StateSelector::default(),
        }
    }
}

impl FixedFunctionStates {
    pub fn is_editable(&self, field: StateField) -> bool {
        match field {
            StateField::CastShadow => self.cast_shadow.is_editable(),
            StateField::ReceiveShadow => self.receive_shadow.is_editable(),
            StateField::Blend => self.blend.is_editable(),
            StateField::Rasterizer => self.rasterizer.is_editable(),
            StateField::Depth => self.depth.is_editable(),
        }
    }

    /// The template's values, used as an instance's starting state.
    pub fn resolve(&self) -> StateValues {
        StateValues {
            cast_shadow: self.cast_shadow.value(),
            receive_shadow: self.receive_shadow.value(),
            blend: self.blend.value(),
            rasterizer: self.rasterizer.value(),
            depth: self.depth.value(),
        }
    }
}

/// Concrete state values carried by an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateValues {
    pub cast_shadow: bool,
    pub receive_shadow: bool,
    pub blend: BlendMode,
    pub rasterizer: RasterizerMode,
    pub depth: DepthMode,
}

impl StateValues {
    pub fn set(&mut self, value: StateValue) {
        match value {
            StateValue::CastShadow(v) => self.cast_shadow = v,
            StateValue::ReceiveShadow(v) => self.receive_shadow = v,
            StateValue::Blend(v) => self.blend = v,
            StateValue::Rasterizer(v) => self.rasterizer = v,
            StateValue::Depth(v) => self.depth = v,
        }
    }
}
