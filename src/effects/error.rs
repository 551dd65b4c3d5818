//! Compositor error type

use std::fmt;

/// Errors raised by the compositing engine and export path.
///
/// Unknown effects and shader compile failures only ever reach callers of
/// the program cache directly; the chain executor logs and skips them.
#[derive(Debug)]
pub enum CompositorError {
    /// GPU allocation failed or the requested size is unsupported
    ResourceAllocation(String),
    /// An effect's shader failed to compile or link
    ShaderCompilation { effect: String, message: String },
    /// Effect id not present in the registry
    UnknownEffect(String),
    /// Pixel buffer length does not match its declared dimensions
    SizeMismatch { expected: usize, actual: usize },
    /// Output image could not be encoded
    Encode(String),
    /// Pixels could not be read back from the GPU
    Readback(String),
    /// Writing the exported file failed
    Io(std::io::Error),
    /// No GPU adapter is available
    NoAdapter,
}

impl fmt::Display for CompositorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompositorError::ResourceAllocation(msg) => write!(f, "GPU resource allocation failed: {}", msg),
            CompositorError::ShaderCompilation { effect, message } => {
                write!(f, "Shader for effect '{}' failed to compile: {}", effect, message)
            }
            CompositorError::UnknownEffect(id) => write!(f, "Unknown effect: {}", id),
            CompositorError::SizeMismatch { expected, actual } => {
                write!(f, "Pixel buffer is {} bytes, expected {}", actual, expected)
            }
            CompositorError::Encode(msg) => write!(f, "Failed to encode image: {}", msg),
            CompositorError::Readback(msg) => write!(f, "Failed to read back pixels: {}", msg),
            CompositorError::Io(e) => write!(f, "IO error: {}", e),
            CompositorError::NoAdapter => write!(f, "No GPU adapter available"),
        }
    }
}

impl std::error::Error for CompositorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CompositorError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for CompositorError {
    fn from(e: std::io::Error) -> Self {
        CompositorError::Io(e)
    }
}
