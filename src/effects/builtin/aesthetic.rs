//! Aesthetic effects: CRT, noise, pixel sort

use crate::effects::types::{EffectCategory, EffectDefinition, ParameterDef};
use crate::shaders::{CRT_SHADER, NOISE_SHADER, PIXEL_SORT_SHADER};

/// Neutral: `lineIntensity = curvature = vignette = 0`
pub fn crt() -> EffectDefinition {
    EffectDefinition::new("crt", "CRT", EffectCategory::Aesthetic, CRT_SHADER)
        .with_description("Simulates retro CRT monitor with scanlines, curvature, and vignette.")
        .with_parameter(ParameterDef::float(
            "lineIntensity",
            "Scanline Intensity",
            0.3,
            0.0,
            1.0,
            0.01,
        ))
        .with_parameter(ParameterDef::float("lineCount", "Scanline Count", 300.0, 100.0, 800.0, 10.0))
        .with_parameter(ParameterDef::float("curvature", "Screen Curvature", 0.0, 0.0, 0.5, 0.01))
        .with_parameter(ParameterDef::float("vignette", "Vignette", 0.3, 0.0, 1.0, 0.01))
}

/// Neutral: `intensity = 0`
pub fn noise() -> EffectDefinition {
    EffectDefinition::new("noise", "Noise", EffectCategory::Aesthetic, NOISE_SHADER)
        .with_description("Adds film grain or static noise to the image.")
        .with_parameter(ParameterDef::float("intensity", "Intensity", 0.15, 0.0, 1.0, 0.01))
        .with_parameter(ParameterDef::float("scale", "Scale", 1.0, 1.0, 100.0, 1.0))
        .with_parameter(ParameterDef::float("seed", "Seed", 0.0, 0.0, 1000.0, 1.0))
        .with_parameter(ParameterDef::bool("monochrome", "Monochrome", true))
}

/// Neutral: `spread = 0`
pub fn pixel_sort() -> EffectDefinition {
    EffectDefinition::new("pixelSort", "Pixel Sort", EffectCategory::Aesthetic, PIXEL_SORT_SHADER)
        .with_description(
            "GPU-friendly pixel sorting approximation using brightness threshold and directional blur.",
        )
        .with_parameter(ParameterDef::float("threshold", "Threshold", 0.25, 0.0, 1.0, 0.01))
        .with_parameter(ParameterDef::float(
            "upperThreshold",
            "Upper Threshold",
            0.75,
            0.0,
            1.0,
            0.01,
        ))
        .with_parameter(ParameterDef::float("spread", "Spread", 0.02, 0.0, 0.1, 0.001))
        .with_parameter(ParameterDef::float("direction", "Direction", 0.0, 0.0, 1.0, 0.01))
}
