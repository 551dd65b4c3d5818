//! corrpt Library
//!
//! GPU effect compositing for still images: an ordered chain of shader
//! effects applied to a source image through ping-pong render targets,
//! shared by a per-frame preview and a full-resolution export.

pub mod cli;
pub mod effects;
pub mod export;
pub mod gpu_context;
pub mod preview;
pub mod settings;
pub mod shaders;
pub mod source;
pub mod telemetry;
pub mod texture;

pub use effects::{
    builtin, ChainExecutor, ChainOutput, CompositorError, EffectCategory, EffectChain, EffectDefinition,
    EffectRegistry, FrameContext, ParameterDef, ParameterKind, ParameterValue, ProgramCache, RenderTargetPair,
};
pub use export::{export_image, ExportFormat, ExportReport, ExportRequest, ExportSink, ExportedImage, FileSink};
pub use gpu_context::GpuContext;
pub use preview::PreviewPipeline;
pub use settings::{CompositorSettings, SettingsError};
pub use source::{DecodedImage, ImageLoader, LoadError};
pub use texture::GpuTexture;
