//! Uniform layout and encoding for effect programs
//!
//! Every effect program sees the same bind group shape:
//! - binding 0: `u_texture` (the pass input)
//! - binding 1: sampler
//! - binding 2: uniform block
//!
//! The uniform block is a WGSL struct whose members are, in order,
//! `u_resolution: vec2<f32>`, `u_time: f32`, then one `u_<param>` member per
//! declared parameter. Scalars (bool, int, float, enum index) are `f32`,
//! vec2 parameters are `vec2<f32>` and colors are `vec3<f32>`. Offsets
//! follow the WGSL alignment rules so shaders can declare the struct
//! naturally.

use std::collections::HashMap;

use super::types::{EffectDefinition, ParameterDef, ParameterKind, ParameterValue};

/// Prefix joining a parameter name to its uniform name
pub const UNIFORM_PREFIX: &str = "u_";
/// Input texture uniform
pub const TEXTURE_UNIFORM: &str = "u_texture";
/// Target resolution in pixels
pub const RESOLUTION_UNIFORM: &str = "u_resolution";
/// Elapsed time in seconds
pub const TIME_UNIFORM: &str = "u_time";

/// Bind group slots shared by every effect program
pub const TEXTURE_BINDING: u32 = 0;
pub const SAMPLER_BINDING: u32 = 1;
pub const UNIFORM_BINDING: u32 = 2;

/// Shader-side type of a uniform block member
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniformType {
    Scalar,
    Vec2,
    Vec3,
}

impl UniformType {
    /// Type a parameter is encoded as
    pub fn for_kind(kind: &ParameterKind) -> Self {
        match kind {
            ParameterKind::Bool { .. }
            | ParameterKind::Int { .. }
            | ParameterKind::Float { .. }
            | ParameterKind::Enum { .. } => UniformType::Scalar,
            ParameterKind::Vec2 { .. } => UniformType::Vec2,
            ParameterKind::Color { .. } => UniformType::Vec3,
        }
    }

    fn align(self) -> u32 {
        match self {
            UniformType::Scalar => 4,
            UniformType::Vec2 => 8,
            UniformType::Vec3 => 16,
        }
    }

    fn size(self) -> u32 {
        match self {
            UniformType::Scalar => 4,
            UniformType::Vec2 => 8,
            UniformType::Vec3 => 12,
        }
    }
}

/// Location of a named uniform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniformHandle {
    /// A texture bound directly in the bind group
    Texture { binding: u32 },
    /// A member of the uniform block
    Buffer { offset: u32, ty: UniformType },
}

/// Name → handle map for one effect program
#[derive(Debug, Clone)]
pub struct UniformLayout {
    handles: HashMap<String, UniformHandle>,
    size: u32,
}

impl UniformLayout {
    /// Compute the layout for an effect's uniform block
    pub fn for_definition(definition: &EffectDefinition) -> Self {
        let mut handles = HashMap::with_capacity(definition.parameters.len() + 3);
        handles.insert(
            TEXTURE_UNIFORM.to_string(),
            UniformHandle::Texture { binding: TEXTURE_BINDING },
        );

        let mut cursor = 0u32;
        let mut push = |name: String, ty: UniformType, handles: &mut HashMap<String, UniformHandle>| {
            let offset = align_to(cursor, ty.align());
            cursor = offset + ty.size();
            handles.insert(name, UniformHandle::Buffer { offset, ty });
        };

        push(RESOLUTION_UNIFORM.to_string(), UniformType::Vec2, &mut handles);
        push(TIME_UNIFORM.to_string(), UniformType::Scalar, &mut handles);
        for param in &definition.parameters {
            push(param.uniform_name(), UniformType::for_kind(&param.kind), &mut handles);
        }

        Self {
            handles,
            // Uniform blocks are sized in 16-byte rows
            size: align_to(cursor, 16),
        }
    }

    pub fn handle(&self, name: &str) -> Option<UniformHandle> {
        self.handles.get(name).copied()
    }

    /// Size of the uniform block in bytes
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Number of named uniforms, the texture included
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.handles.keys().map(String::as_str)
    }
}

fn align_to(value: u32, align: u32) -> u32 {
    value.div_ceil(align) * align
}

/// A parameter value ready to be written into the uniform block
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EncodedValue {
    Scalar(f32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
}

/// Encode a value for the uniform its parameter is declared as
///
/// Booleans become 1.0/0.0, enums the index of the matching option,
/// vectors and colors go component-wise. Returns `None` when the value does
/// not fit the declared kind (wrong variant or unknown enum option).
pub fn encode_value(param: &ParameterDef, value: &ParameterValue) -> Option<EncodedValue> {
    match (&param.kind, value) {
        (ParameterKind::Bool { .. }, ParameterValue::Bool(v)) => {
            Some(EncodedValue::Scalar(if *v { 1.0 } else { 0.0 }))
        }
        (
            ParameterKind::Int { .. } | ParameterKind::Float { .. },
            ParameterValue::Int(_) | ParameterValue::Float(_) | ParameterValue::Bool(_),
        ) => value.as_f32().map(EncodedValue::Scalar),
        (ParameterKind::Enum { .. }, ParameterValue::Enum(option)) => {
            param.enum_index(option).map(|i| EncodedValue::Scalar(i as f32))
        }
        (ParameterKind::Enum { options, .. }, ParameterValue::Int(index)) => {
            let index = usize::try_from(*index).ok().filter(|i| *i < options.len())?;
            Some(EncodedValue::Scalar(index as f32))
        }
        (ParameterKind::Vec2 { .. }, ParameterValue::Vec2(v)) => Some(EncodedValue::Vec2(*v)),
        (ParameterKind::Color { .. }, ParameterValue::Color(v)) => Some(EncodedValue::Vec3(*v)),
        _ => None,
    }
}

/// CPU-side copy of one program's uniform block
///
/// Lives as long as its program. Seeded with parameter defaults at creation
/// and overwritten member by member each pass, so a parameter absent from
/// the chain's value map keeps the last value it was given.
#[derive(Debug, Clone)]
pub struct UniformBlock {
    data: Vec<f32>,
}

impl UniformBlock {
    pub fn new(layout: &UniformLayout) -> Self {
        Self {
            data: vec![0.0; (layout.size() / 4) as usize],
        }
    }

    /// Create a block with every parameter set to its declared default
    pub fn with_defaults(layout: &UniformLayout, definition: &EffectDefinition) -> Self {
        let mut block = Self::new(layout);
        for param in &definition.parameters {
            if let Some(encoded) = encode_value(param, &param.default_value()) {
                block.write(layout, &param.uniform_name(), encoded);
            }
        }
        block
    }

    /// Write a value into a named member. Returns false if the name is not
    /// a buffer member or the value shape does not match.
    pub fn write(&mut self, layout: &UniformLayout, name: &str, value: EncodedValue) -> bool {
        let Some(UniformHandle::Buffer { offset, ty }) = layout.handle(name) else {
            return false;
        };
        let start = (offset / 4) as usize;
        match (ty, value) {
            (UniformType::Scalar, EncodedValue::Scalar(v)) => {
                self.data[start] = v;
            }
            (UniformType::Vec2, EncodedValue::Vec2(v)) => {
                self.data[start..start + 2].copy_from_slice(&v);
            }
            (UniformType::Vec3, EncodedValue::Vec3(v)) => {
                self.data[start..start + 3].copy_from_slice(&v);
            }
            _ => return false,
        }
        true
    }

    /// Read back one f32 word (tests and diagnostics)
    pub fn word(&self, offset: u32) -> Option<f32> {
        self.data.get((offset / 4) as usize).copied()
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::types::{EffectCategory, ParameterDef};

    fn definition() -> EffectDefinition {
        EffectDefinition::new("t", "T", EffectCategory::Color, "")
            .with_parameter(ParameterDef::float("intensity", "Intensity", 0.5, 0.0, 1.0, 0.01))
            .with_parameter(ParameterDef::vec2("offset", "Offset", [1.0, 2.0]))
            .with_parameter(ParameterDef::color("tint", "Tint", [0.1, 0.2, 0.3]))
            .with_parameter(ParameterDef::bool("animated", "Animated", true))
            .with_parameter(ParameterDef::enumeration("mode", "Mode", &[("A", "a"), ("B", "b")], "b"))
    }

    #[test]
    fn test_layout_follows_wgsl_alignment() {
        let layout = UniformLayout::for_definition(&definition());
        let offset = |name: &str| match layout.handle(name) {
            Some(UniformHandle::Buffer { offset, .. }) => offset,
            other => panic!("{} is not a buffer member: {:?}", name, other),
        };

        assert_eq!(
            layout.handle(TEXTURE_UNIFORM),
            Some(UniformHandle::Texture { binding: TEXTURE_BINDING })
        );
        assert_eq!(offset(RESOLUTION_UNIFORM), 0);
        assert_eq!(offset(TIME_UNIFORM), 8);
        assert_eq!(offset("u_intensity"), 12);
        assert_eq!(offset("u_offset"), 16);
        // vec3 aligns to 16
        assert_eq!(offset("u_tint"), 32);
        assert_eq!(offset("u_animated"), 44);
        assert_eq!(offset("u_mode"), 48);
        assert_eq!(layout.size(), 64);
        assert_eq!(layout.len(), 8);
    }

    #[test]
    fn test_layout_without_parameters() {
        let def = EffectDefinition::new("p", "P", EffectCategory::Color, "");
        let layout = UniformLayout::for_definition(&def);
        assert_eq!(layout.len(), 3);
        assert_eq!(layout.size(), 16);
    }

    #[test]
    fn test_encode_value() {
        let def = definition();
        let p = |name| def.parameter(name).unwrap();

        assert_eq!(
            encode_value(p("animated"), &ParameterValue::Bool(false)),
            Some(EncodedValue::Scalar(0.0))
        );
        assert_eq!(
            encode_value(p("mode"), &ParameterValue::Enum("b".into())),
            Some(EncodedValue::Scalar(1.0))
        );
        assert_eq!(encode_value(p("mode"), &ParameterValue::Enum("zzz".into())), None);
        assert_eq!(
            encode_value(p("intensity"), &ParameterValue::Int(2)),
            Some(EncodedValue::Scalar(2.0))
        );
        assert_eq!(encode_value(p("intensity"), &ParameterValue::Vec2([0.0, 0.0])), None);
        assert_eq!(
            encode_value(p("tint"), &ParameterValue::Color([1.0, 0.0, 0.5])),
            Some(EncodedValue::Vec3([1.0, 0.0, 0.5]))
        );
    }

    #[test]
    fn test_block_seeded_with_defaults() {
        let def = definition();
        let layout = UniformLayout::for_definition(&def);
        let block = UniformBlock::with_defaults(&layout, &def);

        assert_eq!(block.as_bytes().len(), 64);
        assert_eq!(block.word(12), Some(0.5));
        assert_eq!(block.word(16), Some(1.0));
        assert_eq!(block.word(20), Some(2.0));
        assert_eq!(block.word(32), Some(0.1));
        assert_eq!(block.word(44), Some(1.0));
        assert_eq!(block.word(48), Some(1.0));
    }

    #[test]
    fn test_block_rejects_shape_mismatch() {
        let def = definition();
        let layout = UniformLayout::for_definition(&def);
        let mut block = UniformBlock::new(&layout);

        assert!(!block.write(&layout, "u_offset", EncodedValue::Scalar(1.0)));
        assert!(!block.write(&layout, TEXTURE_UNIFORM, EncodedValue::Scalar(1.0)));
        assert!(block.write(&layout, RESOLUTION_UNIFORM, EncodedValue::Vec2([4.0, 4.0])));
        assert_eq!(block.word(4), Some(4.0));
    }
}
