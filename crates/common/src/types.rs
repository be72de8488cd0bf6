use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Render pipeline identifier. Only the low 11 bits fit in a render key.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct PipelineId(pub u16);

impl PipelineId {
    /// Largest id the key layout can carry.
    pub const MAX: u16 = (1 << 11) - 1;

    pub fn fits_key(self) -> bool {
        self.0 <= Self::MAX
    }
}

/// Material identifier. The full 16 bits fit in a render key.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct MaterialId(pub u16);

/// Mesh identifier, resolved to vertex/index buffers by the binding table.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct GeometryId(pub u32);

/// Index into the scene's world-transform array.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct TransformRef(pub u32);

/// Contiguous run of bone matrices in the scene's bone palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct BoneRange {
    pub offset: u32,
    pub count: u32,
}

/// Opaque backend bind group token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct BindGroupHandle(pub u32);

/// Opaque backend buffer token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct BufferHandle(pub u32);

/// Opaque backend render target token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct TargetId(pub u16);

/// Coarse draw layer; occupies the two highest key bits.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Layer {
    #[default]
    World = 0,
    Effects = 1,
    Overlay = 2,
    Hud = 3,
}

impl Layer {
    pub fn bits(self) -> u64 {
        self as u64
    }
}

/// Pass a command is encoded for; occupies the two key bits below the layer.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum PassKind {
    Shadow = 0,
    #[default]
    Opaque = 1,
    Transparent = 2,
    Overlay = 3,
}

impl PassKind {
    pub fn bits(self) -> u64 {
        self as u64
    }

    pub fn label(self) -> &'static str {
        match self {
            PassKind::Shadow => "shadow",
            PassKind::Opaque => "opaque",
            PassKind::Transparent => "transparent",
            PassKind::Overlay => "overlay",
        }
    }
}

/// World-space axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    pub fn from_center_half_extents(center: Vec3, half_extents: Vec3) -> Self {
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn half_extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// Corner furthest along `normal`.
    #[inline]
    pub fn positive_vertex(&self, normal: Vec3) -> Vec3 {
        Vec3::new(
            if normal.x >= 0.0 { self.max.x } else { self.min.x },
            if normal.y >= 0.0 { self.max.y } else { self.min.y },
            if normal.z >= 0.0 { self.max.z } else { self.min.z },
        )
    }
}

/// One drawable handed over by the scene for this frame.
///
/// The scene owns transform propagation; the scheduler only reads `bounds`
/// and the identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Candidate {
    pub bounds: Aabb,
    pub transform: TransformRef,
    pub pipeline: PipelineId,
    pub material: MaterialId,
    pub geometry: GeometryId,
    pub layer: Layer,
    pub transparent: bool,
    pub casts_shadow: bool,
    /// Bypasses frustum testing (skyboxes, fullscreen effects).
    pub always_visible: bool,
    /// Eligible for the static-scene command cache.
    pub is_static: bool,
    pub bones: Option<BoneRange>,
}

impl Candidate {
    pub fn new(
        bounds: Aabb,
        transform: TransformRef,
        pipeline: PipelineId,
        material: MaterialId,
        geometry: GeometryId,
    ) -> Self {
        Self {
            bounds,
            transform,
            pipeline,
            material,
            geometry,
            ..Self::default()
        }
    }
}
