//! Distortion effects: slice shift, smear

use crate::effects::types::{EffectCategory, EffectDefinition, ParameterDef};
use crate::shaders::{SLICE_SHIFT_SHADER, SMEAR_SHADER};

/// Neutral: `intensity = 0`
pub fn slice_shift() -> EffectDefinition {
    EffectDefinition::new("sliceShift", "Slice Shift", EffectCategory::Distortion, SLICE_SHIFT_SHADER)
        .with_description("Band displacement, the classic glitch effect.")
        .with_parameter(ParameterDef::float("intensity", "Intensity", 0.1, 0.0, 1.0, 0.01))
        .with_parameter(ParameterDef::float("sliceCount", "Slice Count", 20.0, 5.0, 100.0, 1.0))
        .with_parameter(ParameterDef::float("sliceFill", "Slice Fill", 0.5, 0.0, 1.0, 0.01))
        .with_parameter(ParameterDef::float("seed", "Seed", 0.0, 0.0, 1000.0, 1.0))
        .with_parameter(ParameterDef::bool("vertical", "Vertical", false))
}

/// Neutral: `intensity = 0`
pub fn smear() -> EffectDefinition {
    EffectDefinition::new("smear", "Smear", EffectCategory::Distortion, SMEAR_SHADER)
        .with_description("Brightness-based pixel stretching, a datamosh approximation.")
        .with_parameter(ParameterDef::float("intensity", "Intensity", 0.2, 0.0, 1.0, 0.01))
        .with_parameter(ParameterDef::float("threshold", "Threshold", 0.5, 0.0, 1.0, 0.01))
        .with_parameter(ParameterDef::float("falloff", "Falloff", 0.5, 0.0, 1.0, 0.01))
        .with_parameter(ParameterDef::float("seed", "Seed", 0.0, 0.0, 1000.0, 1.0))
        .with_parameter(ParameterDef::bool("vertical", "Vertical", false))
}
