//! Built-in effects
//!
//! This module contains the standard effects that ship with corrpt.

mod aesthetic;
mod color;
mod distortion;

pub use aesthetic::{crt, noise, pixel_sort};
pub use color::{brightness_invert, passthrough, rgb_shift};
pub use distortion::{slice_shift, smear};

use super::types::ParameterValue;
use super::EffectRegistry;

/// Id of the identity effect
pub const PASSTHROUGH_ID: &str = "passthrough";

/// Register all built-in effects with the registry
pub fn register_builtin_effects(registry: &mut EffectRegistry) {
    registry.register(passthrough());
    registry.register(brightness_invert());
    registry.register(rgb_shift());
    registry.register(crt());
    registry.register(noise());
    registry.register(pixel_sort());
    registry.register(slice_shift());
    registry.register(smear());
}

/// Registry holding every built-in effect
pub fn builtin_registry() -> EffectRegistry {
    let mut registry = EffectRegistry::new();
    register_builtin_effects(&mut registry);
    registry
}

/// Parameter values that turn a built-in effect into an identity pass
///
/// `None` for effects without a neutral setting.
pub fn neutral_parameters(id: &str) -> Option<Vec<(&'static str, ParameterValue)>> {
    let zero = |name: &'static str| (name, ParameterValue::Float(0.0));
    match id {
        PASSTHROUGH_ID => Some(Vec::new()),
        "rgbShift" => Some(vec![zero("intensity")]),
        "crt" => Some(vec![zero("lineIntensity"), zero("curvature"), zero("vignette")]),
        "noise" => Some(vec![zero("intensity")]),
        "pixelSort" => Some(vec![zero("spread")]),
        "sliceShift" => Some(vec![zero("intensity")]),
        "smear" => Some(vec![zero("intensity")]),
        _ => None,
    }
}
