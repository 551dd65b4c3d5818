//! Settings management for corrpt
//!
//! Compositor preferences stored as XML under the platform config
//! directory. Missing or unreadable files fall back to defaults.

use quick_xml::de::from_str;
use quick_xml::se::to_string;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::export::ExportFormat;
use crate::source::MAX_FILE_SIZE;

/// Default JPEG export quality
pub const DEFAULT_JPEG_QUALITY: u8 = 92;

/// Texture filtering used when passes sample their input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum TextureFilter {
    /// Crisp texels, used by the preview
    #[default]
    Nearest,
    /// Bilinear, used by export
    Linear,
}

impl TextureFilter {
    pub fn to_wgpu(self) -> wgpu::FilterMode {
        match self {
            TextureFilter::Nearest => wgpu::FilterMode::Nearest,
            TextureFilter::Linear => wgpu::FilterMode::Linear,
        }
    }
}

/// Compositor preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename = "CorrptSettings")]
pub struct CompositorSettings {
    /// Sampler filter for the live preview
    #[serde(rename = "previewFilter", default)]
    pub preview_filter: TextureFilter,

    /// Sampler filter for full-resolution export
    #[serde(rename = "exportFilter", default = "default_export_filter")]
    pub export_filter: TextureFilter,

    /// Format used when none is given explicitly
    #[serde(rename = "exportFormat", default)]
    pub export_format: ExportFormat,

    /// JPEG quality (1-100)
    #[serde(rename = "jpegQuality", default = "default_jpeg_quality")]
    pub jpeg_quality: u8,

    /// Largest accepted source file in bytes
    #[serde(rename = "maxFileSize", default = "default_max_file_size")]
    pub max_file_size: u64,

    /// Log filter used when no environment override is set
    #[serde(rename = "logLevel", default = "default_log_level")]
    pub log_level: String,

    /// Directory exports are written to
    #[serde(rename = "outputDir", default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<String>,
}

fn default_export_filter() -> TextureFilter {
    TextureFilter::Linear
}

fn default_jpeg_quality() -> u8 {
    DEFAULT_JPEG_QUALITY
}

fn default_max_file_size() -> u64 {
    MAX_FILE_SIZE
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for CompositorSettings {
    fn default() -> Self {
        Self {
            preview_filter: TextureFilter::Nearest,
            export_filter: default_export_filter(),
            export_format: ExportFormat::default(),
            jpeg_quality: default_jpeg_quality(),
            max_file_size: default_max_file_size(),
            log_level: default_log_level(),
            output_dir: None,
        }
    }
}

impl CompositorSettings {
    /// Get the settings file path
    pub fn settings_path() -> Option<PathBuf> {
        dirs::config_dir().map(|mut p| {
            p.push("Corrpt");
            p.push("settings.xml");
            p
        })
    }

    /// Load settings from the config directory, falling back to defaults
    pub fn load() -> Self {
        let Some(path) = Self::settings_path() else {
            return Self::default();
        };

        if !path.exists() {
            return Self::default();
        }

        match Self::load_from_file(&path) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!("Ignoring unreadable settings at {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Save settings to the config directory
    pub fn save(&self) -> Result<(), SettingsError> {
        let Some(path) = Self::settings_path() else {
            return Err(SettingsError::NoConfigDir);
        };
        self.save_to_file(&path)
    }

    /// Load settings from an XML file
    pub fn load_from_file(path: &Path) -> Result<Self, SettingsError> {
        let contents = fs::read_to_string(path).map_err(SettingsError::Io)?;
        let mut settings: Self = from_str(&contents).map_err(SettingsError::XmlParse)?;
        settings.clamp();
        Ok(settings)
    }

    /// Save settings to an XML file, creating its directory
    pub fn save_to_file(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(SettingsError::Io)?;
        }

        let xml = to_string(self).map_err(SettingsError::XmlWrite)?;
        let formatted = format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{}", xml);

        fs::write(path, formatted).map_err(SettingsError::Io)?;
        Ok(())
    }

    /// Clamp values to their valid ranges
    pub fn clamp(&mut self) {
        self.jpeg_quality = self.jpeg_quality.clamp(1, 100);
        self.max_file_size = self.max_file_size.max(1);
        if self.log_level.trim().is_empty() {
            self.log_level = default_log_level();
        }
    }

    /// Output directory if configured
    pub fn output_dir(&self) -> Option<PathBuf> {
        self.output_dir.as_ref().map(PathBuf::from)
    }
}

/// Settings-related errors
#[derive(Debug)]
pub enum SettingsError {
    Io(std::io::Error),
    XmlParse(quick_xml::DeError),
    XmlWrite(quick_xml::SeError),
    NoConfigDir,
}

impl std::fmt::Display for SettingsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SettingsError::Io(e) => write!(f, "IO error: {}", e),
            SettingsError::XmlParse(e) => write!(f, "XML parse error: {}", e),
            SettingsError::XmlWrite(e) => write!(f, "XML write error: {}", e),
            SettingsError::NoConfigDir => write!(f, "Could not find config directory"),
        }
    }
}

impl std::error::Error for SettingsError {}
