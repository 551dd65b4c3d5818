//! Core effect data types
//!
//! These types describe what an effect *is* (shader source plus a parameter
//! schema) and the values its parameters can take. They carry no GPU
//! resources; compiled programs live in the runtime's `ProgramCache`.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::uniforms::UNIFORM_PREFIX;
use crate::shaders::FULLSCREEN_QUAD_SHADER;

/// Category used to group effects in listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EffectCategory {
    Distortion,
    Color,
    Noise,
    Aesthetic,
}

impl EffectCategory {
    /// Get all categories in display order
    pub fn all() -> &'static [EffectCategory] {
        &[
            EffectCategory::Distortion,
            EffectCategory::Color,
            EffectCategory::Noise,
            EffectCategory::Aesthetic,
        ]
    }

    /// Get display name
    pub fn name(&self) -> &'static str {
        match self {
            EffectCategory::Distortion => "distortion",
            EffectCategory::Color => "color",
            EffectCategory::Noise => "noise",
            EffectCategory::Aesthetic => "aesthetic",
        }
    }
}

impl fmt::Display for EffectCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Current value of one effect parameter
///
/// One variant per `ParameterKind`. The chain state stores these without
/// checking them against the schema; the executor decides at encode time
/// whether a value fits the uniform it is bound to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum ParameterValue {
    Bool(bool),
    Int(i32),
    Float(f32),
    /// Enumeration, stored as the selected option's `value`
    Enum(String),
    Vec2([f32; 2]),
    /// RGB color (0.0-1.0 per channel)
    Color([f32; 3]),
}

impl ParameterValue {
    /// Short type name for diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            ParameterValue::Bool(_) => "bool",
            ParameterValue::Int(_) => "int",
            ParameterValue::Float(_) => "float",
            ParameterValue::Enum(_) => "enum",
            ParameterValue::Vec2(_) => "vec2",
            ParameterValue::Color(_) => "color",
        }
    }

    /// Get the value as f32 (returns None for non-scalar types)
    pub fn as_f32(&self) -> Option<f32> {
        match self {
            ParameterValue::Float(v) => Some(*v),
            ParameterValue::Int(v) => Some(*v as f32),
            ParameterValue::Bool(v) => Some(if *v { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    /// Get the value as bool (returns None for non-bool types)
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParameterValue::Bool(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterValue::Bool(v) => write!(f, "{}", v),
            ParameterValue::Int(v) => write!(f, "{}", v),
            ParameterValue::Float(v) => write!(f, "{}", v),
            ParameterValue::Enum(v) => f.write_str(v),
            ParameterValue::Vec2([x, y]) => write!(f, "{},{}", x, y),
            ParameterValue::Color([r, g, b]) => write!(f, "{},{},{}", r, g, b),
        }
    }
}

/// One selectable option of an enum parameter
#[derive(Debug, Clone, PartialEq)]
pub struct EnumOption {
    pub label: String,
    pub value: String,
}

/// Parameter schema, one variant per supported value type
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterKind {
    Bool {
        default: bool,
    },
    Int {
        default: i32,
        min: i32,
        max: i32,
    },
    Float {
        default: f32,
        min: f32,
        max: f32,
        step: f32,
    },
    Enum {
        default: String,
        options: Vec<EnumOption>,
    },
    Vec2 {
        default: [f32; 2],
        min: Option<[f32; 2]>,
        max: Option<[f32; 2]>,
        step: Option<[f32; 2]>,
    },
    Color {
        default: [f32; 3],
    },
}

/// Declaration of a single effect parameter
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterDef {
    /// Internal name (used as key and uniform suffix)
    pub name: String,
    /// Display label
    pub label: String,
    pub kind: ParameterKind,
}

impl ParameterDef {
    /// Create a float parameter
    pub fn float(
        name: impl Into<String>,
        label: impl Into<String>,
        default: f32,
        min: f32,
        max: f32,
        step: f32,
    ) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            kind: ParameterKind::Float { default, min, max, step },
        }
    }

    /// Create an integer parameter
    pub fn int(name: impl Into<String>, label: impl Into<String>, default: i32, min: i32, max: i32) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            kind: ParameterKind::Int { default, min, max },
        }
    }

    /// Create a boolean parameter
    pub fn bool(name: impl Into<String>, label: impl Into<String>, default: bool) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            kind: ParameterKind::Bool { default },
        }
    }

    /// Create an enum parameter from `(label, value)` pairs
    pub fn enumeration(
        name: impl Into<String>,
        label: impl Into<String>,
        options: &[(&str, &str)],
        default: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            kind: ParameterKind::Enum {
                default: default.into(),
                options: options
                    .iter()
                    .map(|(label, value)| EnumOption {
                        label: (*label).to_string(),
                        value: (*value).to_string(),
                    })
                    .collect(),
            },
        }
    }

    /// Create an unbounded 2-vector parameter
    pub fn vec2(name: impl Into<String>, label: impl Into<String>, default: [f32; 2]) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            kind: ParameterKind::Vec2 {
                default,
                min: None,
                max: None,
                step: None,
            },
        }
    }

    /// Create an RGB color parameter
    pub fn color(name: impl Into<String>, label: impl Into<String>, default: [f32; 3]) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            kind: ParameterKind::Color { default },
        }
    }

    /// The value an effect is seeded with when it joins a chain
    pub fn default_value(&self) -> ParameterValue {
        match &self.kind {
            ParameterKind::Bool { default } => ParameterValue::Bool(*default),
            ParameterKind::Int { default, .. } => ParameterValue::Int(*default),
            ParameterKind::Float { default, .. } => ParameterValue::Float(*default),
            ParameterKind::Enum { default, .. } => ParameterValue::Enum(default.clone()),
            ParameterKind::Vec2 { default, .. } => ParameterValue::Vec2(*default),
            ParameterKind::Color { default } => ParameterValue::Color(*default),
        }
    }

    /// Name of the uniform this parameter is bound to
    pub fn uniform_name(&self) -> String {
        format!("{}{}", UNIFORM_PREFIX, self.name)
    }

    /// Index of an enum option by value
    pub fn enum_index(&self, value: &str) -> Option<usize> {
        match &self.kind {
            ParameterKind::Enum { options, .. } => options.iter().position(|o| o.value == value),
            _ => None,
        }
    }

    /// Parse a textual value (command line, config) into a typed value
    ///
    /// Bools accept `true/false/1/0/on/off`, vectors and colors are comma
    /// separated, colors additionally accept `#rrggbb`.
    pub fn parse_value(&self, text: &str) -> Result<ParameterValue, String> {
        let text = text.trim();
        match &self.kind {
            ParameterKind::Bool { .. } => match text.to_ascii_lowercase().as_str() {
                "true" | "1" | "on" | "yes" => Ok(ParameterValue::Bool(true)),
                "false" | "0" | "off" | "no" => Ok(ParameterValue::Bool(false)),
                _ => Err(format!("{}: expected a boolean, got '{}'", self.name, text)),
            },
            ParameterKind::Int { .. } => text
                .parse::<i32>()
                .map(ParameterValue::Int)
                .map_err(|e| format!("{}: {}", self.name, e)),
            ParameterKind::Float { .. } => text
                .parse::<f32>()
                .map(ParameterValue::Float)
                .map_err(|e| format!("{}: {}", self.name, e)),
            ParameterKind::Enum { options, .. } => options
                .iter()
                .find(|o| o.value == text || o.label.eq_ignore_ascii_case(text))
                .map(|o| ParameterValue::Enum(o.value.clone()))
                .ok_or_else(|| format!("{}: unknown option '{}'", self.name, text)),
            ParameterKind::Vec2 { .. } => {
                let v = parse_components::<2>(text).map_err(|e| format!("{}: {}", self.name, e))?;
                Ok(ParameterValue::Vec2(v))
            }
            ParameterKind::Color { .. } => {
                let v = match text.strip_prefix('#') {
                    Some(hex) => parse_hex_color(hex),
                    None => parse_components::<3>(text),
                }
                .map_err(|e| format!("{}: {}", self.name, e))?;
                Ok(ParameterValue::Color(v))
            }
        }
    }
}

fn parse_components<const N: usize>(text: &str) -> Result<[f32; N], String> {
    let parts: Vec<&str> = text.split(',').map(str::trim).collect();
    if parts.len() != N {
        return Err(format!("expected {} comma separated numbers, got '{}'", N, text));
    }
    let mut out = [0.0; N];
    for (slot, part) in out.iter_mut().zip(parts) {
        *slot = part.parse::<f32>().map_err(|e| format!("'{}': {}", part, e))?;
    }
    Ok(out)
}

fn parse_hex_color(hex: &str) -> Result<[f32; 3], String> {
    if hex.len() != 6 || !hex.is_ascii() {
        return Err(format!("expected #rrggbb, got '#{}'", hex));
    }
    let mut out = [0.0; 3];
    for (i, slot) in out.iter_mut().enumerate() {
        let byte = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16).map_err(|e| e.to_string())?;
        *slot = byte as f32 / 255.0;
    }
    Ok(out)
}

/// Immutable description of an effect
///
/// Registered once in the `EffectRegistry` and looked up by `id`. The
/// vertex source defaults to the shared fullscreen quad; effects normally
/// only supply a fragment stage.
#[derive(Debug, Clone)]
pub struct EffectDefinition {
    /// Unique identifier (e.g., "rgbShift")
    pub id: String,
    /// Human-readable display name
    pub name: String,
    pub category: EffectCategory,
    pub description: String,
    /// Parameters in declaration order (also the uniform block order)
    pub parameters: Vec<ParameterDef>,
    /// WGSL source providing `vs_main`
    pub vertex_source: String,
    /// WGSL source providing `fs_main`
    pub fragment_source: String,
    /// Hidden effects resolve normally but are left out of user listings
    pub hidden: bool,
}

impl EffectDefinition {
    /// Create a definition using the shared fullscreen quad vertex stage
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        category: EffectCategory,
        fragment_source: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            category,
            description: String::new(),
            parameters: Vec::new(),
            vertex_source: FULLSCREEN_QUAD_SHADER.to_string(),
            fragment_source: fragment_source.into(),
            hidden: false,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_parameter(mut self, parameter: ParameterDef) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn with_vertex_source(mut self, source: impl Into<String>) -> Self {
        self.vertex_source = source.into();
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    /// Get a parameter declaration by name
    pub fn parameter(&self, name: &str) -> Option<&ParameterDef> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// Check schema invariants: unique parameter names, enum defaults
    /// that name one of their options.
    pub fn validate(&self) -> Result<(), String> {
        for (i, param) in self.parameters.iter().enumerate() {
            if self.parameters[..i].iter().any(|p| p.name == param.name) {
                return Err(format!("{}: duplicate parameter '{}'", self.id, param.name));
            }
            if let ParameterKind::Enum { default, .. } = &param.kind {
                if param.enum_index(default).is_none() {
                    return Err(format!(
                        "{}: enum parameter '{}' defaults to unknown option '{}'",
                        self.id, param.name, default
                    ));
                }
            }
        }
        Ok(())
    }
}
