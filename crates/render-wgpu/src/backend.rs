use strata_common::{BindGroupHandle, BufferHandle, PipelineId, TargetId};
use strata_submit::{BackendError, LoadOp, PassDescriptor, RenderBackend};
use strata_uniforms::UniformSink;

struct BufferEntry {
    buffer: wgpu::Buffer,
    index_format: Option<wgpu::IndexFormat>,
}

/// [`RenderBackend`] over a wgpu device.
///
/// Resources are registered up front under the opaque handles the scheduler
/// names them by. Each frame records into one command encoder, submitted by
/// `finish_frame`; validation errors raised while recording come back from
/// `finish_frame` as [`BackendError::Device`].
pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    uniform_ring: wgpu::Buffer,

    pipelines: Vec<Option<wgpu::RenderPipeline>>,
    bind_groups: Vec<Option<wgpu::BindGroup>>,
    buffers: Vec<Option<BufferEntry>>,
    targets: Vec<Option<wgpu::TextureView>>,

    encoder: Option<wgpu::CommandEncoder>,
    pass: Option<wgpu::RenderPass<'static>>,
    frames: u64,
}

fn put<T>(table: &mut Vec<Option<T>>, index: usize, value: T) {
    if table.len() <= index {
        table.resize_with(index + 1, || None);
    }
    table[index] = Some(value);
}

#[inline]
fn get<T>(table: &[Option<T>], index: usize) -> Option<&T> {
    table.get(index).and_then(Option::as_ref)
}

fn color_load(load: LoadOp<[f32; 4]>) -> wgpu::LoadOp<wgpu::Color> {
    match load {
        LoadOp::Load => wgpu::LoadOp::Load,
        LoadOp::Clear([r, g, b, a]) => wgpu::LoadOp::Clear(wgpu::Color {
            r: r as f64,
            g: g as f64,
            b: b as f64,
            a: a as f64,
        }),
    }
}

fn depth_load(load: LoadOp<f32>) -> wgpu::LoadOp<f32> {
    match load {
        LoadOp::Load => wgpu::LoadOp::Load,
        LoadOp::Clear(depth) => wgpu::LoadOp::Clear(depth),
    }
}

impl WgpuBackend {
    /// `ring_size` must cover every frame slot of the uniform allocator.
    pub fn new(device: wgpu::Device, queue: wgpu::Queue, ring_size: u64) -> Self {
        let uniform_ring = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("strata_uniform_ring"),
            size: ring_size,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        tracing::info!(ring_size, "wgpu backend created");
        Self {
            device,
            queue,
            uniform_ring,
            pipelines: Vec::new(),
            bind_groups: Vec::new(),
            buffers: Vec::new(),
            targets: Vec::new(),
            encoder: None,
            pass: None,
            frames: 0,
        }
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// The buffer view and object bind groups point at.
    pub fn uniform_ring(&self) -> &wgpu::Buffer {
        &self.uniform_ring
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn insert_pipeline(&mut self, id: PipelineId, pipeline: wgpu::RenderPipeline) {
        put(&mut self.pipelines, id.0 as usize, pipeline);
    }

    pub fn insert_bind_group(&mut self, handle: BindGroupHandle, group: wgpu::BindGroup) {
        put(&mut self.bind_groups, handle.0 as usize, group);
    }

    pub fn insert_vertex_buffer(&mut self, handle: BufferHandle, buffer: wgpu::Buffer) {
        let entry = BufferEntry {
            buffer,
            index_format: None,
        };
        put(&mut self.buffers, handle.0 as usize, entry);
    }

    pub fn insert_index_buffer(
        &mut self,
        handle: BufferHandle,
        buffer: wgpu::Buffer,
        format: wgpu::IndexFormat,
    ) {
        let entry = BufferEntry {
            buffer,
            index_format: Some(format),
        };
        put(&mut self.buffers, handle.0 as usize, entry);
    }

    pub fn insert_target(&mut self, id: TargetId, view: wgpu::TextureView) {
        put(&mut self.targets, id.0 as usize, view);
    }

    /// Release a target. Passes writing it fail with `MissingTarget` until
    /// it is inserted again.
    pub fn remove_target(&mut self, id: TargetId) -> Option<wgpu::TextureView> {
        self.targets.get_mut(id.0 as usize).and_then(Option::take)
    }

    pub fn has_target(&self, id: TargetId) -> bool {
        get(&self.targets, id.0 as usize).is_some()
    }
}

impl UniformSink for WgpuBackend {
    fn write_uniforms(&mut self, offset: u64, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        // Staged writes land before the next submit, so before any draw.
        self.queue.write_buffer(&self.uniform_ring, offset, bytes);
    }
}

impl RenderBackend for WgpuBackend {
    fn begin_pass(&mut self, desc: &PassDescriptor) -> Result<(), BackendError> {
        if self.pass.is_some() {
            return Err(BackendError::PassAlreadyOpen(desc.label));
        }
        for target in desc.targets() {
            if get(&self.targets, target.0 as usize).is_none() {
                return Err(BackendError::MissingTarget(target));
            }
        }

        if self.encoder.is_none() {
            self.device.push_error_scope(wgpu::ErrorFilter::Validation);
            self.encoder = Some(self.device.create_command_encoder(
                &wgpu::CommandEncoderDescriptor {
                    label: Some("strata_frame"),
                },
            ));
        }

        let mut colors: [Option<wgpu::RenderPassColorAttachment<'_>>; 2] = [None, None];
        let mut count = 0;
        for attachment in desc.color.iter().flatten() {
            let Some(view) = get(&self.targets, attachment.target.0 as usize) else {
                return Err(BackendError::MissingTarget(attachment.target));
            };
            colors[count] = Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: color_load(attachment.load),
                    store: wgpu::StoreOp::Store,
                },
            });
            count += 1;
        }

        let depth = match desc.depth {
            Some(d) => {
                let Some(view) = get(&self.targets, d.target.0 as usize) else {
                    return Err(BackendError::MissingTarget(d.target));
                };
                Some(wgpu::RenderPassDepthStencilAttachment {
                    view,
                    depth_ops: Some(wgpu::Operations {
                        load: depth_load(d.load),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                })
            }
            None => None,
        };

        let Some(encoder) = self.encoder.as_mut() else {
            return Err(BackendError::Device("command encoder unavailable".into()));
        };
        let pass = encoder
            .begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some(desc.label),
                color_attachments: &colors[..count],
                depth_stencil_attachment: depth,
                ..Default::default()
            })
            .forget_lifetime();
        self.pass = Some(pass);
        Ok(())
    }

    fn end_pass(&mut self) {
        self.pass = None;
    }

    fn bind_pipeline(&mut self, id: PipelineId) {
        let (Some(pass), Some(pipeline)) = (self.pass.as_mut(), get(&self.pipelines, id.0 as usize))
        else {
            tracing::trace!(?id, "pipeline bind ignored");
            return;
        };
        pass.set_pipeline(pipeline);
    }

    fn bind_group(&mut self, slot: u32, handle: BindGroupHandle, dynamic_offset: Option<u32>) {
        let (Some(pass), Some(group)) =
            (self.pass.as_mut(), get(&self.bind_groups, handle.0 as usize))
        else {
            tracing::trace!(slot, ?handle, "bind group ignored");
            return;
        };
        let offsets: &[u32] = match dynamic_offset.as_ref() {
            Some(offset) => std::slice::from_ref(offset),
            None => &[],
        };
        pass.set_bind_group(slot, group, offsets);
    }

    fn bind_vertex_buffer(&mut self, slot: u32, handle: BufferHandle) {
        if let (Some(pass), Some(entry)) = (self.pass.as_mut(), get(&self.buffers, handle.0 as usize))
        {
            pass.set_vertex_buffer(slot, entry.buffer.slice(..));
        }
    }

    fn bind_index_buffer(&mut self, handle: BufferHandle) {
        if let (Some(pass), Some(entry)) = (self.pass.as_mut(), get(&self.buffers, handle.0 as usize))
        {
            let format = entry.index_format.unwrap_or(wgpu::IndexFormat::Uint32);
            pass.set_index_buffer(entry.buffer.slice(..), format);
        }
    }

    fn draw(&mut self, vertex_count: u32, instance_count: u32) {
        if let Some(pass) = self.pass.as_mut() {
            pass.draw(0..vertex_count, 0..instance_count);
        }
    }

    fn draw_indexed(&mut self, index_count: u32, instance_count: u32) {
        if let Some(pass) = self.pass.as_mut() {
            pass.draw_indexed(0..index_count, 0, 0..instance_count);
        }
    }

    fn finish_frame(&mut self) -> Result<(), BackendError> {
        if self.pass.take().is_some() {
            tracing::warn!("pass still open at end of frame");
        }
        self.frames += 1;
        match self.encoder.take() {
            Some(encoder) => {
                self.queue.submit(std::iter::once(encoder.finish()));
                match pollster::block_on(self.device.pop_error_scope()) {
                    Some(err) => Err(BackendError::Device(err.to_string())),
                    None => Ok(()),
                }
            }
            None => {
                // Nothing recorded; still flush pending uniform writes.
                self.queue.submit(std::iter::empty());
                Ok(())
            }
        }
    }
}
