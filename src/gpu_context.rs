//! Headless GPU context
//!
//! The compositor only renders offscreen, so the context carries no
//! surface. One `GpuContext` is created per process and shared by the
//! preview pipeline and every export invocation.

// ═══════════════════════════════════════════════════════════════════════════════
// GPU CONTEXT - Device, queue and adapter selection
// ═══════════════════════════════════════════════════════════════════════════════

/// Shared GPU resources for offscreen compositing.
pub struct GpuContext {
    /// The wgpu instance
    pub instance: wgpu::Instance,
    /// The selected GPU adapter
    pub adapter: wgpu::Adapter,
    /// The GPU device for creating resources
    pub device: wgpu::Device,
    /// The command queue for submitting GPU work
    pub queue: wgpu::Queue,
    /// Largest texture edge the device accepts
    pub max_texture_dimension: u32,
}

impl GpuContext {
    /// Create a headless context.
    ///
    /// Tries a hardware adapter first, then the software fallback adapter.
    /// Returns `None` when neither is available.
    pub fn new() -> Option<Self> {
        if let Some(ctx) = pollster::block_on(Self::new_async(false)) {
            return Some(ctx);
        }
        tracing::warn!("Hardware adapter unavailable, trying software fallback");
        pollster::block_on(Self::new_async(true))
    }

    async fn new_async(force_fallback_adapter: bool) -> Option<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter,
            })
            .await?;

        let info = adapter.get_info();
        tracing::info!("Using GPU: {}", info.name);
        tracing::info!("Backend: {:?}", info.backend);

        let limits = adapter.limits();
        let (device, queue) = match adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Corrpt Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits {
                        max_texture_dimension_2d: limits.max_texture_dimension_2d,
                        ..wgpu::Limits::downlevel_defaults()
                    },
                    memory_hints: wgpu::MemoryHints::Performance,
                },
                None,
            )
            .await
        {
            Ok(pair) => pair,
            Err(e) => {
                tracing::warn!("Failed to create device on {}: {}", info.name, e);
                return None;
            }
        };

        Some(Self {
            instance,
            adapter,
            device,
            queue,
            max_texture_dimension: limits.max_texture_dimension_2d,
        })
    }

    /// Check if a texture of the given dimensions can be created.
    pub fn supports_size(&self, width: u32, height: u32) -> bool {
        width > 0
            && height > 0
            && width <= self.max_texture_dimension
            && height <= self.max_texture_dimension
    }

    /// Submit a single encoder's commands.
    pub fn submit_one(&self, encoder: wgpu::CommandEncoder) {
        self.queue.submit(std::iter::once(encoder.finish()));
    }

    /// Name of the selected adapter
    pub fn adapter_name(&self) -> String {
        self.adapter.get_info().name
    }
}
