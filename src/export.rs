//! Full-resolution export
//!
//! Re-renders a chain snapshot over the native-resolution source in a
//! dedicated GPU context of its own (render targets, program cache and a
//! passthrough display program), reads the result back, encodes it and
//! hands the bytes to an `ExportSink`.
//!
//! Every GPU resource the export creates lives in `ExportResources` and is
//! released before encoding starts. Early returns release them through
//! `Drop`, so no exit path leaks.

use std::fmt;
use std::path::{Path, PathBuf};

use image::ImageEncoder;
use serde::{Deserialize, Serialize};

use crate::effects::builtin;
use crate::effects::{
    ChainExecutor, CompositorError, EffectChain, EffectRegistry, FrameContext, ProgramCache,
    ProgramCacheEntry, RenderTargetPair,
};
use crate::gpu_context::GpuContext;
use crate::settings::DEFAULT_JPEG_QUALITY;
use crate::source::DecodedImage;
use crate::texture::GpuTexture;

/// Suffix appended to the source file stem
pub const EXPORT_SUFFIX: &str = "__corrpt";

// ═══════════════════════════════════════════════════════════════════════════════
// FORMATS
// ═══════════════════════════════════════════════════════════════════════════════

/// Encoded output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Png,
    Jpeg,
    WebP,
}

impl ExportFormat {
    pub fn mime(self) -> &'static str {
        match self {
            ExportFormat::Png => "image/png",
            ExportFormat::Jpeg => "image/jpeg",
            ExportFormat::WebP => "image/webp",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Png => "png",
            ExportFormat::Jpeg => "jpg",
            ExportFormat::WebP => "webp",
        }
    }

    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime {
            "image/png" => Some(ExportFormat::Png),
            "image/jpeg" => Some(ExportFormat::Jpeg),
            "image/webp" => Some(ExportFormat::WebP),
            _ => None,
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "png" => Some(ExportFormat::Png),
            "jpg" | "jpeg" => Some(ExportFormat::Jpeg),
            "webp" => Some(ExportFormat::WebP),
            _ => None,
        }
    }

    /// Parse a format name, extension or mime type
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::from_mime(value).or_else(|| Self::from_extension(value))
    }

    /// Suggested file name for an export of `file_stem`
    pub fn file_name(self, file_stem: &str) -> String {
        format!("{}{}.{}", file_stem, EXPORT_SUFFIX, self.extension())
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Encode tightly packed RGBA8 pixels
///
/// JPEG has no alpha channel, so alpha is dropped. WebP is lossless.
pub fn encode_pixels(
    pixels: &[u8],
    width: u32,
    height: u32,
    format: ExportFormat,
    jpeg_quality: u8,
) -> Result<Vec<u8>, CompositorError> {
    let expected = width as usize * height as usize * 4;
    if pixels.len() != expected {
        return Err(CompositorError::SizeMismatch {
            expected,
            actual: pixels.len(),
        });
    }

    let mut bytes = Vec::new();
    let result = match format {
        ExportFormat::Png => image::codecs::png::PngEncoder::new(&mut bytes).write_image(
            pixels,
            width,
            height,
            image::ExtendedColorType::Rgba8,
        ),
        ExportFormat::Jpeg => {
            let rgb: Vec<u8> = pixels
                .chunks_exact(4)
                .flat_map(|px| [px[0], px[1], px[2]])
                .collect();
            image::codecs::jpeg::JpegEncoder::new_with_quality(&mut bytes, jpeg_quality.clamp(1, 100))
                .write_image(&rgb, width, height, image::ExtendedColorType::Rgb8)
        }
        ExportFormat::WebP => image::codecs::webp::WebPEncoder::new_lossless(&mut bytes).write_image(
            pixels,
            width,
            height,
            image::ExtendedColorType::Rgba8,
        ),
    };
    result.map_err(|e| CompositorError::Encode(e.to_string()))?;
    Ok(bytes)
}

// ═══════════════════════════════════════════════════════════════════════════════
// REQUEST / OUTPUT
// ═══════════════════════════════════════════════════════════════════════════════

/// Everything one export needs
pub struct ExportRequest<'a> {
    /// Source at native resolution
    pub image: &'a DecodedImage,
    /// Snapshot of the chain to render
    pub chain: EffectChain,
    pub format: ExportFormat,
    pub jpeg_quality: u8,
    /// Sampler filter for effect passes
    pub filter: wgpu::FilterMode,
}

impl<'a> ExportRequest<'a> {
    pub fn new(image: &'a DecodedImage, chain: EffectChain, format: ExportFormat) -> Self {
        Self {
            image,
            chain,
            format,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            filter: wgpu::FilterMode::Linear,
        }
    }

    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality;
        self
    }

    pub fn with_filter(mut self, filter: wgpu::FilterMode) -> Self {
        self.filter = filter;
        self
    }
}

/// Encoded export ready for delivery
#[derive(Debug, Clone)]
pub struct ExportedImage {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub mime: &'static str,
    pub width: u32,
    pub height: u32,
}

/// Summary returned by a successful export
#[derive(Debug, Clone, PartialEq)]
pub struct ExportReport {
    pub file_name: String,
    pub width: u32,
    pub height: u32,
    /// Effect passes that ran
    pub passes: usize,
    /// Encoded size in bytes
    pub size: usize,
    /// GPU objects released when the render finished
    pub released: usize,
}

/// Receives encoded exports
pub trait ExportSink {
    fn deliver(&mut self, image: ExportedImage) -> Result<(), CompositorError>;
}

/// In-memory sink
impl ExportSink for Vec<ExportedImage> {
    fn deliver(&mut self, image: ExportedImage) -> Result<(), CompositorError> {
        self.push(image);
        Ok(())
    }
}

/// Writes exports into a directory
pub struct FileSink {
    dir: PathBuf,
    written: Vec<PathBuf>,
}

impl FileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            written: Vec::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Paths written so far
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }
}

impl ExportSink for FileSink {
    fn deliver(&mut self, image: ExportedImage) -> Result<(), CompositorError> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(&image.file_name);
        std::fs::write(&path, &image.bytes)?;
        tracing::info!("Exported {} ({} bytes)", path.display(), image.bytes.len());
        self.written.push(path);
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// EXPORT RENDERER
// ═══════════════════════════════════════════════════════════════════════════════

/// GPU resources owned by one export invocation
struct ExportResources {
    targets: RenderTargetPair,
    cache: ProgramCache,
    display: Option<ProgramCacheEntry>,
    display_target: Option<GpuTexture>,
    source: Option<GpuTexture>,
}

impl ExportResources {
    fn create(gpu: &GpuContext, image: &DecodedImage, filter: wgpu::FilterMode) -> Result<Self, CompositorError> {
        let (width, height) = image.dimensions();
        let targets = RenderTargetPair::create(gpu, width, height, filter)?;
        let mut resources = Self {
            targets,
            cache: ProgramCache::new(),
            display: None,
            display_target: None,
            source: None,
        };

        resources.display = Some(ProgramCacheEntry::compile(gpu, &builtin::passthrough())?);
        resources.display_target = Some(GpuTexture::render_target(
            &gpu.device,
            width,
            height,
            "Export Display Target",
        ));
        resources.source = Some(image.to_texture(gpu)?);

        Ok(resources)
    }

    /// Release everything. Returns the number of GPU objects released.
    fn dispose(&mut self) -> usize {
        let mut released = 0;
        if !self.targets.is_disposed() {
            released += self.targets.dispose();
        }
        released += self.cache.dispose_all();
        if let Some(display) = self.display.take() {
            display.release();
            released += 1;
        }
        for texture in [self.display_target.take(), self.source.take()].into_iter().flatten() {
            texture.destroy();
            released += 1;
        }
        released
    }
}

impl Drop for ExportResources {
    fn drop(&mut self) {
        let released = self.dispose();
        if released > 0 {
            tracing::debug!(released, "Released export resources");
        }
    }
}

/// Render, encode and deliver one export
///
/// Runs the chain once with time = 0 at the image's native resolution. All
/// GPU resources are released before encoding, whatever the outcome.
pub fn export_image(
    gpu: &GpuContext,
    registry: &EffectRegistry,
    request: ExportRequest<'_>,
    sink: &mut dyn ExportSink,
) -> Result<ExportReport, CompositorError> {
    let (width, height) = request.image.dimensions();
    tracing::info!(
        width,
        height,
        effects = request.chain.len(),
        format = %request.format,
        "Starting export"
    );

    let mut resources = ExportResources::create(gpu, request.image, request.filter)?;
    let frame = FrameContext::new(width, height, 0.0);

    let (pixels, passes) = {
        let ExportResources {
            targets,
            cache,
            display,
            display_target,
            source,
        } = &mut resources;

        let (Some(display), Some(display_target), Some(source)) =
            (display.as_mut(), display_target.as_ref(), source.as_ref())
        else {
            return Err(CompositorError::ResourceAllocation(
                "export resources missing".to_string(),
            ));
        };

        let output = ChainExecutor::new(registry).execute(gpu, source, &request.chain, cache, targets, &frame)?;

        display.bind(&gpu.queue, &builtin::passthrough(), None, &frame);
        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Export Display Encoder"),
            });
        display.record_pass(
            &gpu.device,
            &mut encoder,
            output.texture.view(),
            targets.sampler(),
            display_target.view(),
        );
        gpu.submit_one(encoder);

        (display_target.read_pixels(gpu)?, output.passes)
    };

    let released = resources.dispose();
    tracing::debug!(released, "Released export resources");
    drop(resources);

    let bytes = encode_pixels(&pixels, width, height, request.format, request.jpeg_quality)?;
    let file_name = request.format.file_name(&request.image.file_stem);
    let report = ExportReport {
        file_name: file_name.clone(),
        width,
        height,
        passes,
        size: bytes.len(),
        released,
    };

    sink.deliver(ExportedImage {
        bytes,
        file_name,
        mime: request.format.mime(),
        width,
        height,
    })?;

    Ok(report)
}
