//! Source image loading
//!
//! Validates and decodes image files into RGBA8 pixels ready for upload.
//! Decoding runs on a background thread. Every load bumps a generation
//! counter and results are tagged with the generation they were started
//! under, so a decode that finishes after a newer load began is discarded.

use std::fmt;
use std::path::Path;
use std::sync::mpsc::{channel, Receiver, Sender, TryRecvError};

use crate::effects::CompositorError;
use crate::gpu_context::GpuContext;
use crate::texture::GpuTexture;

/// Mime types accepted as source images
pub const SUPPORTED_IMAGE_TYPES: &[&str] = &["image/jpeg", "image/png", "image/webp"];

/// Largest accepted source file (50 MB)
pub const MAX_FILE_SIZE: u64 = 50 * 1024 * 1024;

/// Errors from validating, reading or decoding a source image
#[derive(Debug)]
pub enum LoadError {
    UnsupportedType(String),
    TooLarge { size: u64, max: u64 },
    Read(std::io::Error),
    Decode(String),
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::UnsupportedType(mime) => {
                write!(f, "Unsupported file type: {}. Use JPEG, PNG, or WebP.", mime)
            }
            LoadError::TooLarge { size, max } => write!(
                f,
                "File too large: {:.1}MB. Maximum is {}MB.",
                *size as f64 / 1024.0 / 1024.0,
                max / 1024 / 1024
            ),
            LoadError::Read(_) => write!(f, "Failed to read file."),
            LoadError::Decode(_) => write!(f, "Failed to decode image."),
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LoadError::Read(e) => Some(e),
            _ => None,
        }
    }
}

/// Mime type implied by a file extension
///
/// Knows a few unsupported image types too, so rejections can name them.
pub fn mime_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        "bmp" => Some("image/bmp"),
        "tif" | "tiff" => Some("image/tiff"),
        _ => None,
    }
}

/// Check a file's type and size before reading it
pub fn validate(mime: &str, size: u64, max_file_size: u64) -> Result<(), LoadError> {
    if !SUPPORTED_IMAGE_TYPES.contains(&mime) {
        return Err(LoadError::UnsupportedType(mime.to_string()));
    }
    if size > max_file_size {
        return Err(LoadError::TooLarge {
            size,
            max: max_file_size,
        });
    }
    Ok(())
}

/// A decoded bitmap at its native resolution
#[derive(Clone)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    /// Tightly packed RGBA8 rows, top row first
    pub pixels: Vec<u8>,
    /// File name without extension, used to name exports
    pub file_stem: String,
    pub mime: String,
}

impl fmt::Debug for DecodedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecodedImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("file_stem", &self.file_stem)
            .field("mime", &self.mime)
            .finish_non_exhaustive()
    }
}

impl DecodedImage {
    /// Wrap raw RGBA8 pixels
    pub fn from_rgba(
        width: u32,
        height: u32,
        pixels: Vec<u8>,
        file_stem: impl Into<String>,
    ) -> Result<Self, CompositorError> {
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(CompositorError::SizeMismatch {
                expected,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
            file_stem: file_stem.into(),
            mime: "image/png".to_string(),
        })
    }

    /// Decode encoded file bytes of the given mime type
    pub fn decode(bytes: &[u8], mime: &str, file_stem: &str) -> Result<Self, LoadError> {
        let format = image::ImageFormat::from_mime_type(mime)
            .ok_or_else(|| LoadError::UnsupportedType(mime.to_string()))?;
        let decoded = image::load_from_memory_with_format(bytes, format)
            .map_err(|e| LoadError::Decode(e.to_string()))?;
        let rgba = decoded.to_rgba8();

        Ok(Self {
            width: rgba.width(),
            height: rgba.height(),
            pixels: rgba.into_raw(),
            file_stem: file_stem.to_string(),
            mime: mime.to_string(),
        })
    }

    /// Validate, read and decode a file synchronously
    pub fn load(path: &Path, max_file_size: u64) -> Result<Self, LoadError> {
        let (mime, _) = check_file(path, max_file_size)?;
        let bytes = std::fs::read(path).map_err(LoadError::Read)?;
        Self::decode(&bytes, mime, &file_stem(path))
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Upload as a GPU sampling source
    pub fn to_texture(&self, gpu: &GpuContext) -> Result<GpuTexture, CompositorError> {
        GpuTexture::from_rgba(gpu, self.width, self.height, &self.pixels)
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string())
}

fn check_file(path: &Path, max_file_size: u64) -> Result<(&'static str, u64), LoadError> {
    let mime = mime_for_path(path).ok_or_else(|| {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_default();
        LoadError::UnsupportedType(if ext.is_empty() { "unknown".to_string() } else { ext })
    })?;
    let size = std::fs::metadata(path).map_err(LoadError::Read)?.len();
    validate(mime, size, max_file_size)?;
    Ok((mime, size))
}

type LoadMessage = (u64, Result<DecodedImage, LoadError>);

/// Background image loader with stale-result rejection
pub struct ImageLoader {
    /// Generation of the most recent load or cancel
    generation: u64,
    /// Generation still waiting for its result
    in_flight: Option<u64>,
    max_file_size: u64,
    tx: Sender<LoadMessage>,
    rx: Receiver<LoadMessage>,
}

impl Default for ImageLoader {
    fn default() -> Self {
        Self::new(MAX_FILE_SIZE)
    }
}

impl ImageLoader {
    pub fn new(max_file_size: u64) -> Self {
        let (tx, rx) = channel();
        Self {
            generation: 0,
            in_flight: None,
            max_file_size,
            tx,
            rx,
        }
    }

    /// Current load generation
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Start loading a file
    ///
    /// Type and size are checked before anything is read; those errors
    /// return immediately and leave any in-flight load untouched. On
    /// success returns the generation the result will carry.
    pub fn load_file(&mut self, path: &Path) -> Result<u64, LoadError> {
        let (mime, _) = check_file(path, self.max_file_size)?;
        let path = path.to_path_buf();
        let stem = file_stem(&path);

        self.spawn(move || {
            let bytes = std::fs::read(&path).map_err(LoadError::Read)?;
            DecodedImage::decode(&bytes, mime, &stem)
        })
    }

    /// Start decoding bytes already in memory
    pub fn load_bytes(&mut self, bytes: Vec<u8>, mime: &str, file_stem: &str) -> Result<u64, LoadError> {
        validate(mime, bytes.len() as u64, self.max_file_size)?;
        let mime = mime.to_string();
        let stem = file_stem.to_string();

        self.spawn(move || DecodedImage::decode(&bytes, &mime, &stem))
    }

    fn spawn<F>(&mut self, decode: F) -> Result<u64, LoadError>
    where
        F: FnOnce() -> Result<DecodedImage, LoadError> + Send + 'static,
    {
        self.generation += 1;
        let generation = self.generation;
        let tx = self.tx.clone();

        std::thread::Builder::new()
            .name(format!("image-decode-{}", generation))
            .spawn(move || {
                let _ = tx.send((generation, decode()));
            })
            .map_err(LoadError::Read)?;

        tracing::debug!(generation, "Started image load");
        self.in_flight = Some(generation);
        Ok(generation)
    }

    /// Invalidate any in-flight load
    pub fn cancel(&mut self) {
        self.generation += 1;
        self.in_flight = None;
    }

    /// Take the current load's result if it has arrived
    ///
    /// Results from older generations are dropped.
    pub fn poll(&mut self) -> Option<Result<DecodedImage, LoadError>> {
        loop {
            match self.rx.try_recv() {
                Ok(message) => {
                    if let Some(result) = self.accept(message) {
                        return Some(result);
                    }
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => return None,
            }
        }
    }

    /// Block until the current load finishes
    ///
    /// Returns `None` when nothing is in flight.
    pub fn wait(&mut self) -> Option<Result<DecodedImage, LoadError>> {
        while self.in_flight.is_some() {
            let message = self.rx.recv().ok()?;
            if let Some(result) = self.accept(message) {
                return Some(result);
            }
        }
        None
    }

    fn accept(&mut self, (generation, result): LoadMessage) -> Option<Result<DecodedImage, LoadError>> {
        if self.in_flight == Some(generation) && generation == self.generation {
            self.in_flight = None;
            Some(result)
        } else {
            tracing::debug!(
                generation,
                current = self.generation,
                "Discarding stale image decode"
            );
            None
        }
    }
}
