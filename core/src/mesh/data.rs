//! Per-attribute mesh storage.

use std::fmt;

/// Number of UV channels a mesh can carry.
pub const MAX_UV_CHANNELS: usize = 4;

/// An attribute whose length disagrees with the position count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeshError {
    pub mesh: String,
    pub attribute: &'static str,
    pub expected: usize,
    pub actual: usize,
}

impl fmt::Display for MeshError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "mesh '{}': attribute {} has {} elements, expected {}",
            self.mesh, self.attribute, self.actual, self.expected
        )
    }
}

impl std::error::Error for MeshError {}

/// CPU-side mesh with one vector per vertex attribute.
///
/// Every non-empty attribute must have as many elements as `positions`.
/// Empty attributes are absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    pub name: String,
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub tangents: Vec<[f32; 4]>,
    pub colors: Vec<[f32; 4]>,
    pub uvs: [Vec<[f32; 2]>; MAX_UV_CHANNELS],
    pub bone_indices: Vec<[u32; 4]>,
    pub bone_weights: Vec<[f32; 4]>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_positions(mut self, positions: Vec<[f32; 3]>) -> Self {
        self.positions = positions;
        self
    }

    #[must_use]
    pub fn with_normals(mut self, normals: Vec<[f32; 3]>) -> Self {
        self.normals = normals;
        self
    }

    #[must_use]
    pub fn with_tangents(mut self, tangents: Vec<[f32; 4]>) -> Self {
        self.tangents = tangents;
        self
    }

    #[must_use]
    pub fn with_colors(mut self, colors: Vec<[f32; 4]>) -> Self {
        self.colors = colors;
        self
    }

    /// Set UV channel `channel`. Channels past [`MAX_UV_CHANNELS`] are ignored.
    #[must_use]
    pub fn with_uvs(mut self, channel: usize, uvs: Vec<[f32; 2]>) -> Self {
        if let Some(slot) = self.uvs.get_mut(channel) {
            *slot = uvs;
        } else {
            log::warn!(
                "Mesh '{}': UV channel {channel} out of range, ignored",
                self.name
            );
        }
        self
    }

    #[must_use]
    pub fn with_skin(mut self, bone_indices: Vec<[u32; 4]>, bone_weights: Vec<[f32; 4]>) -> Self {
        self.bone_indices = bone_indices;
        self.bone_weights = bone_weights;
        self
    }

    #[must_use]
    pub fn with_indices(mut self, indices: Vec<u32>) -> Self {
        self.indices = indices;
        self
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    pub fn is_indexed(&self) -> bool {
        !self.indices.is_empty()
    }

    /// Number of leading UV channels that hold data.
    pub fn uv_channel_count(&self) -> usize {
        self.uvs.iter().take_while(|c| !c.is_empty()).count()
    }

    /// Check that every present attribute matches the vertex count.
    pub fn validate(&self) -> Result<(), MeshError> {
        let expected = self.vertex_count();
        let mut lengths = vec![
            ("normals", self.normals.len()),
            ("tangents", self.tangents.len()),
            ("colors", self.colors.len()),
            ("bone_indices", self.bone_indices.len()),
            ("bone_weights", self.bone_weights.len()),
        ];
        const UV_NAMES: [&str; MAX_UV_CHANNELS] = ["uv0", "uv1", "uv2", "uv3"];
        lengths.extend(UV_NAMES.iter().zip(&self.uvs).map(|(n, c)| (*n, c.len())));

        for (attribute, actual) in lengths {
            if actual != 0 && actual != expected {
                return Err(MeshError {
                    mesh: self.name.clone(),
                    attribute,
                    expected,
                    actual,
                });
            }
        }
        Ok(())
    }
}
