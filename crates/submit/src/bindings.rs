use strata_common::{
    BindGroupHandle, BufferHandle, GeometryId, MaterialId, PipelineId, SchedError,
};

/// Buffers and element count for one mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeometryBinding {
    pub vertex_buffer: BufferHandle,
    /// Indexed draw when present.
    pub index_buffer: Option<BufferHandle>,
    /// Index count for indexed meshes, vertex count otherwise.
    pub element_count: u32,
}

impl GeometryBinding {
    pub fn triangles(&self) -> u32 {
        self.element_count / 3
    }
}

/// Ids the application has registered with the backend, and the handles
/// they resolve to. This is the oracle for "does the backend know this id".
#[derive(Debug, Default, Clone)]
pub struct BindingTable {
    pipelines: Vec<bool>,
    materials: Vec<Option<BindGroupHandle>>,
    geometries: Vec<Option<GeometryBinding>>,
    view_group: BindGroupHandle,
    object_group: BindGroupHandle,
}

impl BindingTable {
    pub fn new(view_group: BindGroupHandle, object_group: BindGroupHandle) -> Self {
        Self {
            view_group,
            object_group,
            ..Self::default()
        }
    }

    pub fn register_pipeline(&mut self, id: PipelineId) {
        let i = id.0 as usize;
        if self.pipelines.len() <= i {
            self.pipelines.resize(i + 1, false);
        }
        self.pipelines[i] = true;
    }

    pub fn register_material(&mut self, id: MaterialId, group: BindGroupHandle) {
        let i = id.0 as usize;
        if self.materials.len() <= i {
            self.materials.resize(i + 1, None);
        }
        self.materials[i] = Some(group);
    }

    pub fn register_geometry(&mut self, id: GeometryId, binding: GeometryBinding) {
        let i = id.0 as usize;
        if self.geometries.len() <= i {
            self.geometries.resize(i + 1, None);
        }
        self.geometries[i] = Some(binding);
    }

    pub fn has_pipeline(&self, id: PipelineId) -> bool {
        self.pipelines.get(id.0 as usize).copied().unwrap_or(false)
    }

    pub fn material_group(&self, id: MaterialId) -> Option<BindGroupHandle> {
        self.materials.get(id.0 as usize).copied().flatten()
    }

    pub fn geometry(&self, id: GeometryId) -> Option<GeometryBinding> {
        self.geometries.get(id.0 as usize).copied().flatten()
    }

    /// Resolve everything a draw needs, or the first unknown id.
    pub fn resolve(
        &self,
        pipeline: PipelineId,
        material: MaterialId,
        geometry: GeometryId,
    ) -> Result<(BindGroupHandle, GeometryBinding), SchedError> {
        if !self.has_pipeline(pipeline) {
            return Err(SchedError::UnknownPipeline(pipeline));
        }
        let group = self
            .material_group(material)
            .ok_or(SchedError::UnknownMaterial(material))?;
        let geom = self
            .geometry(geometry)
            .ok_or(SchedError::UnknownGeometry(geometry))?;
        Ok((group, geom))
    }

    /// Ring-backed group bound at slot 0 with the pass's view offset.
    pub fn view_group(&self) -> BindGroupHandle {
        self.view_group
    }

    /// Ring-backed group bound at slot 2 with each draw's offset.
    pub fn object_group(&self) -> BindGroupHandle {
        self.object_group
    }
}
