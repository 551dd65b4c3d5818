//! Color effects: passthrough, brightness invert, RGB shift

use crate::effects::types::{EffectCategory, EffectDefinition, ParameterDef};
use crate::shaders::{BRIGHTNESS_INVERT_SHADER, PASSTHROUGH_SHADER, RGB_SHIFT_SHADER};

/// Identity effect. Hidden from listings but resolvable, and used by export
/// to draw the chain output onto the display target.
pub fn passthrough() -> EffectDefinition {
    EffectDefinition::new(
        super::PASSTHROUGH_ID,
        "Passthrough",
        EffectCategory::Color,
        PASSTHROUGH_SHADER,
    )
    .with_description("Identity effect. Outputs the input unchanged.")
    .hidden()
}

pub fn brightness_invert() -> EffectDefinition {
    EffectDefinition::new(
        "brightnessInvert",
        "Brightness Invert",
        EffectCategory::Color,
        BRIGHTNESS_INVERT_SHADER,
    )
    .with_description("Replaces every color with its complement. Alpha is kept.")
}

/// Neutral: `intensity = 0`
pub fn rgb_shift() -> EffectDefinition {
    EffectDefinition::new("rgbShift", "RGB Shift", EffectCategory::Color, RGB_SHIFT_SHADER)
        .with_description("Separates RGB channels and offsets them directionally.")
        .with_parameter(ParameterDef::float("intensity", "Intensity", 0.5, 0.0, 1.0, 0.01))
        .with_parameter(ParameterDef::float("angle", "Angle", 0.0, 0.0, 6.28, 0.01))
        .with_parameter(ParameterDef::bool("animated", "Animated", false))
}
