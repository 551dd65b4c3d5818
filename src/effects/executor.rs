//! Chain executor - the multi-pass compositing algorithm
//!
//! Runs the active effects in chain order over a source texture, alternating
//! between the two targets of a `RenderTargetPair`. The first pass that
//! actually runs always samples the untouched source, so skipped effects
//! (unregistered ids, shaders that failed to compile) never expose
//! uninitialized target contents. For fixed inputs the output is
//! bit-identical across invocations.
//!
//! All passes of one invocation are recorded into a single command encoder
//! and submitted once. Nothing is submitted when no pass runs.

use super::chain::EffectChain;
use super::error::CompositorError;
use super::registry::EffectRegistry;
use super::runtime::{ProgramCache, RenderTargetPair};
use crate::gpu_context::GpuContext;
use crate::texture::GpuTexture;

/// Per-invocation values shared by every pass
///
/// Owned by the calling context and updated in place each frame.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameContext {
    /// Target size in pixels
    pub resolution: [f32; 2],
    /// Elapsed time in seconds
    pub time: f32,
}

impl FrameContext {
    pub fn new(width: u32, height: u32, time: f32) -> Self {
        Self {
            resolution: [width as f32, height as f32],
            time,
        }
    }

    /// Overwrite the values for the next invocation
    pub fn set(&mut self, width: u32, height: u32, time: f32) {
        self.resolution[0] = width as f32;
        self.resolution[1] = height as f32;
        self.time = time;
    }
}

/// Result of one chain invocation
#[derive(Clone, Copy)]
pub struct ChainOutput<'a> {
    /// Final texture: the source itself when no pass ran
    pub texture: &'a GpuTexture,
    /// Number of passes that ran
    pub passes: usize,
}

impl ChainOutput<'_> {
    /// True when the output is the source texture untouched
    pub fn is_passthrough(&self) -> bool {
        self.passes == 0
    }
}

/// Runs effect chains against a registry
pub struct ChainExecutor<'r> {
    registry: &'r EffectRegistry,
}

impl<'r> ChainExecutor<'r> {
    pub fn new(registry: &'r EffectRegistry) -> Self {
        Self { registry }
    }

    /// Composite `chain` over `source`
    ///
    /// `targets` must match the source dimensions. Unregistered ids and
    /// effects whose program fails to build are skipped. Returns an error
    /// only when the targets are unusable.
    pub fn execute<'a>(
        &self,
        gpu: &GpuContext,
        source: &'a GpuTexture,
        chain: &EffectChain,
        cache: &mut ProgramCache,
        targets: &'a RenderTargetPair,
        frame: &FrameContext,
    ) -> Result<ChainOutput<'a>, CompositorError> {
        if chain.is_empty() {
            return Ok(ChainOutput {
                texture: source,
                passes: 0,
            });
        }

        let (Some(ping), Some(pong)) = (targets.target(0), targets.target(1)) else {
            return Err(CompositorError::ResourceAllocation(
                "render target pair already disposed".to_string(),
            ));
        };
        let buffers = [ping, pong];
        if targets.dimensions() != source.dimensions() {
            return Err(CompositorError::ResourceAllocation(format!(
                "render targets are {}x{} but source is {}x{}",
                targets.dimensions().0,
                targets.dimensions().1,
                source.width(),
                source.height()
            )));
        }

        let mut encoder: Option<wgpu::CommandEncoder> = None;
        let mut read_index = 0usize;
        let mut pass_count = 0usize;

        for id in chain.effects() {
            let Some(definition) = self.registry.get(id) else {
                tracing::debug!(effect = %id, "Skipping unregistered effect");
                continue;
            };

            let entry = match cache.get_or_create(gpu, &definition) {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::debug!(effect = %id, "Skipping effect: {}", e);
                    continue;
                }
            };

            let input = if pass_count == 0 {
                source
            } else {
                buffers[read_index]
            };
            let write_index = 1 - read_index;

            entry.bind(&gpu.queue, &definition, chain.parameters(id), frame);

            let pass_encoder = encoder.get_or_insert_with(|| {
                gpu.device
                    .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                        label: Some("Effect Chain Encoder"),
                    })
            });
            entry.record_pass(
                &gpu.device,
                pass_encoder,
                input.view(),
                targets.sampler(),
                buffers[write_index].view(),
            );

            read_index = write_index;
            pass_count += 1;
        }

        if let Some(encoder) = encoder {
            gpu.submit_one(encoder);
        }

        let texture = if pass_count > 0 {
            buffers[read_index]
        } else {
            source
        };

        Ok(ChainOutput {
            texture,
            passes: pass_count,
        })
    }
}
