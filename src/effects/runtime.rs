//! Effect runtime - GPU resources for chain processing
//!
//! This module owns the GPU-side state an executor context needs:
//! - `RenderTargetPair` - Ping-pong render targets sized to the image
//! - `ProgramCache` - Compiled effect programs keyed by effect id
//!
//! Both are owned by exactly one context (the live preview or one export
//! invocation) and released through explicit `dispose` calls. Dropping
//! either releases anything still live.

use std::collections::HashMap;

use super::chain::{EffectChain, ParameterValues};
use super::error::CompositorError;
use super::executor::FrameContext;
use super::types::EffectDefinition;
use super::uniforms::{
    encode_value, EncodedValue, UniformBlock, UniformHandle, UniformLayout, RESOLUTION_UNIFORM,
    SAMPLER_BINDING, TEXTURE_BINDING, TIME_UNIFORM, UNIFORM_BINDING,
};
use crate::gpu_context::GpuContext;
use crate::texture::GpuTexture;

/// Format of every source, render target and display surface
pub const TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

// ═══════════════════════════════════════════════════════════════════════════════
// RENDER TARGET PAIR - Ping-pong buffers
// ═══════════════════════════════════════════════════════════════════════════════

/// Two same-sized offscreen render targets plus the sampler passes read with
///
/// Effects alternate reading from one target and writing to the other.
/// Dimensions are fixed at creation; a size change means disposing this
/// pair and creating a new one.
pub struct RenderTargetPair {
    /// Both targets, `None` once disposed
    targets: Option<[GpuTexture; 2]>,
    sampler: wgpu::Sampler,
    filter: wgpu::FilterMode,
    width: u32,
    height: u32,
}

impl RenderTargetPair {
    /// Allocate both targets eagerly
    ///
    /// Fails with `ResourceAllocation` for zero or oversized dimensions, or
    /// when the device runs out of memory.
    pub fn create(
        gpu: &GpuContext,
        width: u32,
        height: u32,
        filter: wgpu::FilterMode,
    ) -> Result<Self, CompositorError> {
        check_dimensions(width, height, gpu.max_texture_dimension)?;

        gpu.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        gpu.device.push_error_scope(wgpu::ErrorFilter::Validation);

        let targets = [
            GpuTexture::render_target(&gpu.device, width, height, "Render Target A"),
            GpuTexture::render_target(&gpu.device, width, height, "Render Target B"),
        ];

        let validation = pollster::block_on(gpu.device.pop_error_scope());
        let out_of_memory = pollster::block_on(gpu.device.pop_error_scope());
        if let Some(e) = out_of_memory.or(validation) {
            for target in &targets {
                target.destroy();
            }
            return Err(CompositorError::ResourceAllocation(format!(
                "render targets {}x{}: {}",
                width, height, e
            )));
        }

        let sampler = gpu.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Render Target Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: filter,
            min_filter: filter,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        tracing::debug!(width, height, ?filter, "Created render target pair");

        Ok(Self {
            targets: Some(targets),
            sampler,
            filter,
            width,
            height,
        })
    }

    /// Target at `index` (0 or 1), `None` once disposed
    pub fn target(&self, index: usize) -> Option<&GpuTexture> {
        self.targets.as_ref().and_then(|t| t.get(index))
    }

    pub fn sampler(&self) -> &wgpu::Sampler {
        &self.sampler
    }

    pub fn filter(&self) -> wgpu::FilterMode {
        self.filter
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Number of GPU buffers still held (2 while live, 0 after dispose)
    pub fn live_buffers(&self) -> usize {
        self.targets.as_ref().map_or(0, |t| t.len())
    }

    pub fn is_disposed(&self) -> bool {
        self.targets.is_none()
    }

    /// Release both targets
    ///
    /// Returns how many buffers were released. A second call releases
    /// nothing and logs a warning.
    pub fn dispose(&mut self) -> usize {
        match self.targets.take() {
            Some(targets) => {
                for target in &targets {
                    target.destroy();
                }
                tracing::debug!(width = self.width, height = self.height, "Disposed render target pair");
                targets.len()
            }
            None => {
                tracing::warn!("Render target pair disposed twice");
                0
            }
        }
    }
}

impl Drop for RenderTargetPair {
    fn drop(&mut self) {
        if self.targets.is_some() {
            self.dispose();
        }
    }
}

/// Reject sizes the device cannot allocate
pub fn check_dimensions(width: u32, height: u32, max: u32) -> Result<(), CompositorError> {
    if width == 0 || height == 0 {
        return Err(CompositorError::ResourceAllocation(format!(
            "zero-sized render target {}x{}",
            width, height
        )));
    }
    if width > max || height > max {
        return Err(CompositorError::ResourceAllocation(format!(
            "render target {}x{} exceeds device limit {}",
            width, height, max
        )));
    }
    Ok(())
}

// ═══════════════════════════════════════════════════════════════════════════════
// PROGRAM CACHE - Compiled effect programs
// ═══════════════════════════════════════════════════════════════════════════════

/// Compiled program for one effect plus its uniform storage
pub struct ProgramCacheEntry {
    effect_id: String,
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    uniform_buffer: wgpu::Buffer,
    layout: UniformLayout,
    block: UniformBlock,
    /// `u_<param>` names in declaration order
    uniform_names: Vec<String>,
    /// Bind groups by input view and sampler, most recent last
    bind_groups: Vec<(wgpu::TextureView, wgpu::Sampler, wgpu::BindGroup)>,
}

/// Inputs a pass can read: the source and either ping-pong target
const MAX_CACHED_BIND_GROUPS: usize = 3;

impl ProgramCacheEntry {
    /// Compile an effect's vertex/fragment pair
    ///
    /// Runs inside a validation error scope so WGSL errors and uniform
    /// block mismatches come back as `ShaderCompilation` instead of
    /// reaching the device's uncaptured error handler.
    pub fn compile(gpu: &GpuContext, definition: &EffectDefinition) -> Result<Self, CompositorError> {
        let device = &gpu.device;
        let layout = UniformLayout::for_definition(definition);
        let block = UniformBlock::with_defaults(&layout, definition);
        let uniform_names = definition.parameters.iter().map(|p| p.uniform_name()).collect();

        device.push_error_scope(wgpu::ErrorFilter::Validation);

        let vertex = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&format!("{} Vertex Shader", definition.name)),
            source: wgpu::ShaderSource::Wgsl(definition.vertex_source.as_str().into()),
        });
        let fragment = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&format!("{} Fragment Shader", definition.name)),
            source: wgpu::ShaderSource::Wgsl(definition.fragment_source.as_str().into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(&format!("{} Bind Group Layout", definition.name)),
            entries: &[
                // Input texture
                wgpu::BindGroupLayoutEntry {
                    binding: TEXTURE_BINDING,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                // Sampler
                wgpu::BindGroupLayoutEntry {
                    binding: SAMPLER_BINDING,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
                // Uniform block; a shader struct larger than the layout fails validation
                wgpu::BindGroupLayoutEntry {
                    binding: UNIFORM_BINDING,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: wgpu::BufferSize::new(layout.size() as u64),
                    },
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(&format!("{} Pipeline Layout", definition.name)),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(&format!("{} Pipeline", definition.name)),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &vertex,
                entry_point: Some("vs_main"),
                buffers: &[],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &fragment,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: TARGET_FORMAT,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        if let Some(e) = pollster::block_on(device.pop_error_scope()) {
            return Err(CompositorError::ShaderCompilation {
                effect: definition.id.clone(),
                message: e.to_string(),
            });
        }

        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&format!("{} Uniform Buffer", definition.name)),
            size: layout.size() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Ok(Self {
            effect_id: definition.id.clone(),
            pipeline,
            bind_group_layout,
            uniform_buffer,
            layout,
            block,
            uniform_names,
            bind_groups: Vec::with_capacity(MAX_CACHED_BIND_GROUPS),
        })
    }

    pub fn effect_id(&self) -> &str {
        &self.effect_id
    }

    /// Look up a uniform by name
    pub fn uniform(&self, name: &str) -> Option<UniformHandle> {
        self.layout.handle(name)
    }

    pub fn uniform_layout(&self) -> &UniformLayout {
        &self.layout
    }

    /// Update the uniform block for one pass and upload it
    ///
    /// Resolution and time always come from `frame`. Every declared
    /// parameter present in `values` is encoded and written; one that is
    /// absent, or whose value does not fit its declared kind, keeps the
    /// last value written (initially its default).
    pub fn bind(
        &mut self,
        queue: &wgpu::Queue,
        definition: &EffectDefinition,
        values: Option<&ParameterValues>,
        frame: &FrameContext,
    ) {
        self.block
            .write(&self.layout, RESOLUTION_UNIFORM, EncodedValue::Vec2(frame.resolution));
        self.block
            .write(&self.layout, TIME_UNIFORM, EncodedValue::Scalar(frame.time));

        if let Some(values) = values {
            for (param, uniform_name) in definition.parameters.iter().zip(&self.uniform_names) {
                let Some(value) = values.get(&param.name) else {
                    continue;
                };
                match encode_value(param, value) {
                    Some(encoded) => {
                        self.block.write(&self.layout, uniform_name, encoded);
                    }
                    None => tracing::debug!(
                        effect = %self.effect_id,
                        param = %param.name,
                        value = %value,
                        "Parameter value does not match its declared type"
                    ),
                }
            }
        }

        queue.write_buffer(&self.uniform_buffer, 0, self.block.as_bytes());
    }

    /// Record one full-screen pass from `input` into `output`
    pub fn record_pass(
        &mut self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        input: &wgpu::TextureView,
        sampler: &wgpu::Sampler,
        output: &wgpu::TextureView,
    ) {
        let index = self.bind_group_for(device, input, sampler);
        let bind_group = &self.bind_groups[index].2;

        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Effect Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: output,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        render_pass.set_pipeline(&self.pipeline);
        render_pass.set_bind_group(0, bind_group, &[]);
        render_pass.draw(0..6, 0..1);
    }

    /// Index of the bind group for `input` + `sampler`, creating it on a miss
    ///
    /// Only the input view varies between passes, so a handful of bind
    /// groups covers every frame. The oldest is dropped once the input set
    /// changes (new source, resized targets).
    fn bind_group_for(
        &mut self,
        device: &wgpu::Device,
        input: &wgpu::TextureView,
        sampler: &wgpu::Sampler,
    ) -> usize {
        if let Some(index) = self
            .bind_groups
            .iter()
            .position(|(view, s, _)| view == input && s == sampler)
        {
            return index;
        }

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Effect Pass Bind Group"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: TEXTURE_BINDING,
                    resource: wgpu::BindingResource::TextureView(input),
                },
                wgpu::BindGroupEntry {
                    binding: SAMPLER_BINDING,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
                wgpu::BindGroupEntry {
                    binding: UNIFORM_BINDING,
                    resource: self.uniform_buffer.as_entire_binding(),
                },
            ],
        });

        if self.bind_groups.len() == MAX_CACHED_BIND_GROUPS {
            self.bind_groups.remove(0);
        }
        self.bind_groups.push((input.clone(), sampler.clone(), bind_group));
        self.bind_groups.len() - 1
    }

    /// Number of bind groups currently cached
    pub fn cached_bind_groups(&self) -> usize {
        self.bind_groups.len()
    }

    /// Release the program's GPU resources. Consumes the entry, so it can
    /// only happen once.
    pub fn release(self) {
        self.uniform_buffer.destroy();
        tracing::debug!(effect = %self.effect_id, "Released effect program");
    }
}

/// Compiled programs keyed by effect id
///
/// Entries are created on first use and evicted when their effect leaves
/// the chain, so the cache stays bounded by the current chain size.
/// Compile failures are remembered per id so a broken shader is reported
/// once instead of recompiled every frame; eviction forgets the failure.
#[derive(Default)]
pub struct ProgramCache {
    entries: HashMap<String, ProgramCacheEntry>,
    failures: HashMap<String, String>,
}

impl ProgramCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the entry for `definition.id`, compiling it on first use
    pub fn get_or_create(
        &mut self,
        gpu: &GpuContext,
        definition: &EffectDefinition,
    ) -> Result<&mut ProgramCacheEntry, CompositorError> {
        let id = definition.id.as_str();

        if let Some(message) = self.failures.get(id) {
            return Err(CompositorError::ShaderCompilation {
                effect: id.to_string(),
                message: message.clone(),
            });
        }

        if !self.entries.contains_key(id) {
            match ProgramCacheEntry::compile(gpu, definition) {
                Ok(entry) => {
                    tracing::debug!(effect = id, "Compiled effect program");
                    self.entries.insert(id.to_string(), entry);
                }
                Err(e) => {
                    tracing::error!("{}", e);
                    if let CompositorError::ShaderCompilation { message, .. } = &e {
                        self.failures.insert(id.to_string(), message.clone());
                    }
                    return Err(e);
                }
            }
        }

        self.entries
            .get_mut(id)
            .ok_or_else(|| CompositorError::UnknownEffect(id.to_string()))
    }

    /// Release one entry. Returns true if an entry was live.
    pub fn evict(&mut self, id: &str) -> bool {
        self.failures.remove(id);
        match self.entries.remove(id) {
            Some(entry) => {
                entry.release();
                true
            }
            None => false,
        }
    }

    /// Evict every entry whose effect is no longer in `chain`
    ///
    /// Returns the number of entries released.
    pub fn sync_with_chain(&mut self, chain: &EffectChain) -> usize {
        self.failures.retain(|id, _| chain.is_active(id));

        let stale: Vec<String> = self
            .entries
            .keys()
            .filter(|id| !chain.is_active(id))
            .cloned()
            .collect();

        for id in &stale {
            self.evict(id);
        }
        stale.len()
    }

    /// Release every entry. Returns the number released.
    pub fn dispose_all(&mut self) -> usize {
        self.failures.clear();
        let count = self.entries.len();
        for (_, entry) in self.entries.drain() {
            entry.release();
        }
        count
    }

    /// Number of live compiled programs
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Remembered compile error for an effect
    pub fn failure(&self, id: &str) -> Option<&str> {
        self.failures.get(id).map(String::as_str)
    }
}

impl Drop for ProgramCache {
    fn drop(&mut self) {
        if !self.entries.is_empty() {
            let released = self.dispose_all();
            tracing::debug!(released, "Program cache dropped with live entries");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_dimensions() {
        assert!(check_dimensions(2, 2, 8192).is_ok());
        assert!(check_dimensions(8192, 1, 8192).is_ok());
        assert!(matches!(
            check_dimensions(0, 10, 8192),
            Err(CompositorError::ResourceAllocation(_))
        ));
        assert!(matches!(
            check_dimensions(10, 0, 8192),
            Err(CompositorError::ResourceAllocation(_))
        ));
        assert!(matches!(
            check_dimensions(8193, 10, 8192),
            Err(CompositorError::ResourceAllocation(_))
        ));
    }

    #[test]
    fn test_empty_cache() {
        let mut cache = ProgramCache::new();
        assert!(cache.is_empty());
        assert!(!cache.evict("noise"));
        assert_eq!(cache.dispose_all(), 0);
        assert_eq!(cache.sync_with_chain(&EffectChain::new()), 0);
        assert!(cache.failure("noise").is_none());
    }
}
