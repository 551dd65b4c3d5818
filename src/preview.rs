//! Live preview context
//!
//! Owns the render target pair and program cache the per-frame preview
//! renders with. The pair follows the source dimensions and the cache
//! follows the chain, so both stay bounded by what is on screen.
//!
//! Preview never blanks: any failure is logged and the frame shows the
//! untouched source instead.

use crate::effects::{
    ChainExecutor, ChainOutput, EffectChain, EffectRegistry, FrameContext, ProgramCache,
    RenderTargetPair,
};
use crate::gpu_context::GpuContext;
use crate::texture::GpuTexture;

/// Per-frame compositing state for the preview
pub struct PreviewPipeline {
    targets: Option<RenderTargetPair>,
    cache: ProgramCache,
    frame: FrameContext,
    /// Seconds since the preview started
    elapsed: f32,
    filter: wgpu::FilterMode,
}

impl PreviewPipeline {
    pub fn new(filter: wgpu::FilterMode) -> Self {
        Self {
            targets: None,
            cache: ProgramCache::new(),
            frame: FrameContext::default(),
            elapsed: 0.0,
            filter,
        }
    }

    /// Composite one preview frame
    ///
    /// Advances the effect clock by `delta_seconds`, reallocates the render
    /// targets when the source size changed and evicts programs whose
    /// effect left the chain before running it.
    pub fn render_frame<'a>(
        &'a mut self,
        gpu: &GpuContext,
        registry: &EffectRegistry,
        chain: &EffectChain,
        source: &'a GpuTexture,
        delta_seconds: f32,
    ) -> ChainOutput<'a> {
        let fallback = ChainOutput {
            texture: source,
            passes: 0,
        };

        self.elapsed += delta_seconds.max(0.0);
        let (width, height) = source.dimensions();
        self.frame.set(width, height, self.elapsed);

        let evicted = self.cache.sync_with_chain(chain);
        if evicted > 0 {
            tracing::debug!(evicted, "Evicted programs no longer in the chain");
        }

        if chain.is_empty() {
            return fallback;
        }

        if let Err(e) = self.ensure_targets(gpu, width, height) {
            tracing::warn!("Preview falling back to source: {}", e);
            return fallback;
        }
        let Some(targets) = self.targets.as_ref() else {
            return fallback;
        };

        match ChainExecutor::new(registry).execute(gpu, source, chain, &mut self.cache, targets, &self.frame) {
            Ok(output) => output,
            Err(e) => {
                tracing::warn!("Preview falling back to source: {}", e);
                fallback
            }
        }
    }

    fn ensure_targets(&mut self, gpu: &GpuContext, width: u32, height: u32) -> Result<(), crate::effects::CompositorError> {
        if let Some(targets) = &self.targets {
            if targets.dimensions() == (width, height) && !targets.is_disposed() {
                return Ok(());
            }
        }

        if let Some(mut old) = self.targets.take() {
            if !old.is_disposed() {
                old.dispose();
            }
        }

        self.targets = Some(RenderTargetPair::create(gpu, width, height, self.filter)?);
        tracing::debug!(width, height, "Preview render targets resized");
        Ok(())
    }

    /// Restart the effect clock
    pub fn reset_time(&mut self) {
        self.elapsed = 0.0;
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Compiled programs currently held
    pub fn live_programs(&self) -> usize {
        self.cache.len()
    }

    /// Render target buffers currently held
    pub fn live_buffers(&self) -> usize {
        self.targets.as_ref().map_or(0, RenderTargetPair::live_buffers)
    }

    /// Release every GPU resource. Returns the number released.
    ///
    /// The next `render_frame` allocates again.
    pub fn dispose(&mut self) -> usize {
        let mut released = self.cache.dispose_all();
        if let Some(mut targets) = self.targets.take() {
            if !targets.is_disposed() {
                released += targets.dispose();
            }
        }
        tracing::debug!(released, "Disposed preview pipeline");
        released
    }
}

impl Default for PreviewPipeline {
    fn default() -> Self {
        Self::new(wgpu::FilterMode::Nearest)
    }
}
