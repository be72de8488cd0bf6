use glam::{Mat4, Quat, Vec3};
use strata_common::{
    Aabb, BoneRange, Candidate, GeometryId, MaterialId, PipelineId, TransformRef,
};

/// The scene graph as the scheduler sees it.
///
/// Implementors own transform propagation. `revision` must change whenever
/// a static candidate is added, removed, re-materialed or moved; the
/// static-scene cache trusts it.
pub trait SceneSource {
    /// Propagate dirty transforms before the frame reads them.
    fn update_transforms(&mut self);

    fn candidates(&self) -> &[Candidate];

    fn transforms(&self) -> &[Mat4];

    /// Bone palette that `Candidate::bones` ranges index into.
    fn bones(&self) -> &[Mat4] {
        &[]
    }

    fn revision(&self) -> u64;
}

/// Flat, vector-backed scene.
#[derive(Debug, Default, Clone)]
pub struct StaticScene {
    candidates: Vec<Candidate>,
    transforms: Vec<Mat4>,
    bones: Vec<Mat4>,
    revision: u64,
}

/// Shape of a generated scene.
#[derive(Debug, Clone, Copy)]
pub struct ProceduralSpec {
    pub objects: usize,
    pub pipelines: u16,
    pub materials: u16,
    pub geometries: u32,
    /// Every n-th object is transparent; 0 disables.
    pub transparent_every: usize,
    /// Every n-th object is dynamic; 0 makes all static.
    pub dynamic_every: usize,
    pub spacing: f32,
    pub seed: u64,
}

impl Default for ProceduralSpec {
    fn default() -> Self {
        Self {
            objects: 1000,
            pipelines: 4,
            materials: 32,
            geometries: 2,
            transparent_every: 7,
            dynamic_every: 5,
            spacing: 3.0,
            seed: 42,
        }
    }
}

impl StaticScene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a candidate whose bounds are `local` transformed by `world`.
    pub fn push(&mut self, mut candidate: Candidate, world: Mat4, local: Aabb) -> usize {
        candidate.transform = TransformRef(self.transforms.len() as u32);
        candidate.bounds = transform_aabb(&local, &world);
        self.transforms.push(world);
        self.candidates.push(candidate);
        self.revision += 1;
        self.candidates.len() - 1
    }

    /// Add a candidate as-is; its transform ref must already be valid.
    pub fn push_candidate(&mut self, candidate: Candidate) -> usize {
        self.candidates.push(candidate);
        self.revision += 1;
        self.candidates.len() - 1
    }

    pub fn push_transform(&mut self, world: Mat4) -> TransformRef {
        self.transforms.push(world);
        TransformRef(self.transforms.len() as u32 - 1)
    }

    pub fn push_bones(&mut self, bones: &[Mat4]) -> BoneRange {
        let offset = self.bones.len() as u32;
        self.bones.extend_from_slice(bones);
        BoneRange {
            offset,
            count: bones.len() as u32,
        }
    }

    pub fn candidate_mut(&mut self, index: usize) -> Option<&mut Candidate> {
        self.revision += 1;
        self.candidates.get_mut(index)
    }

    /// Move a candidate. Static moves invalidate the command cache.
    pub fn set_transform(&mut self, index: usize, world: Mat4, local: Aabb) {
        let Some(candidate) = self.candidates.get_mut(index) else {
            return;
        };
        candidate.bounds = transform_aabb(&local, &world);
        if let Some(slot) = self.transforms.get_mut(candidate.transform.0 as usize) {
            *slot = world;
        }
        if candidate.is_static {
            self.revision += 1;
        }
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Deterministic grid of unit cubes with mixed state, for demos and benches.
    pub fn procedural(spec: &ProceduralSpec) -> Self {
        let mut scene = Self::new();
        let side = (spec.objects as f32).sqrt().ceil().max(1.0) as usize;
        let half = side as f32 * spec.spacing * 0.5;
        let mut state = spec.seed;

        for i in 0..spec.objects {
            state = splitmix64(state);
            let x = (i % side) as f32 * spec.spacing - half;
            let z = (i / side) as f32 * spec.spacing - half;
            let y = (state >> 40) as f32 / (1u64 << 24) as f32 * 2.0;
            let angle = (state & 0xffff) as f32 / 65535.0 * std::f32::consts::TAU;
            let world = Mat4::from_rotation_translation(Quat::from_rotation_y(angle), Vec3::new(x, y, z));

            let transparent = spec.transparent_every != 0 && i % spec.transparent_every == 0;
            let dynamic = spec.dynamic_every != 0 && i % spec.dynamic_every == 0;
            let candidate = Candidate {
                pipeline: PipelineId((state >> 8) as u16 % spec.pipelines.max(1)),
                material: MaterialId((state >> 24) as u16 % spec.materials.max(1)),
                geometry: GeometryId((state >> 32) as u32 % spec.geometries.max(1)),
                transparent,
                casts_shadow: !transparent,
                is_static: !dynamic,
                ..Candidate::default()
            };
            scene.push(candidate, world, unit_cube());
        }
        scene
    }

    /// Move every dynamic candidate along a small circle; `t` in seconds.
    pub fn animate(&mut self, t: f32) {
        for i in 0..self.candidates.len() {
            let c = self.candidates[i];
            if c.is_static {
                continue;
            }
            let Some(world) = self.transforms.get(c.transform.0 as usize).copied() else {
                continue;
            };
            let phase = t + i as f32 * 0.37;
            let offset = Vec3::new(phase.cos(), 0.0, phase.sin()) * 0.05;
            self.set_transform(i, Mat4::from_translation(offset) * world, unit_cube());
        }
    }
}

impl SceneSource for StaticScene {
    fn update_transforms(&mut self) {}

    fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    fn transforms(&self) -> &[Mat4] {
        &self.transforms
    }

    fn bones(&self) -> &[Mat4] {
        &self.bones
    }

    fn revision(&self) -> u64 {
        self.revision
    }
}

pub fn unit_cube() -> Aabb {
    Aabb::from_center_half_extents(Vec3::ZERO, Vec3::splat(0.5))
}

/// World-space bounds of `local` under `world` (Arvo's method).
pub fn transform_aabb(local: &Aabb, world: &Mat4) -> Aabb {
    let center = world.transform_point3(local.center());
    let e = local.half_extents();
    let extent = Vec3::new(
        world.x_axis.x.abs() * e.x + world.y_axis.x.abs() * e.y + world.z_axis.x.abs() * e.z,
        world.x_axis.y.abs() * e.x + world.y_axis.y.abs() * e.y + world.z_axis.y.abs() * e.z,
        world.x_axis.z.abs() * e.x + world.y_axis.z.abs() * e.y + world.z_axis.z.abs() * e.z,
    );
    Aabb::from_center_half_extents(center, extent)
}

/// Splitmix64 step; reproducible scene generation from a seed.
fn splitmix64(mut state: u64) -> u64 {
    state = state.wrapping_add(0x9e37_79b9_7f4a_7c15);
    let mut z = state;
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}
