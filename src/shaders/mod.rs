//! Embedded WGSL sources
//!
//! Every effect program pairs the shared fullscreen quad vertex stage with
//! one fragment shader from `effects/`. Sources are compiled into the
//! binary; `shaders_dir()` points at the on-disk copies for tooling.

use std::path::PathBuf;

/// Fullscreen quad vertex stage (`vs_main`)
pub const FULLSCREEN_QUAD_SHADER: &str = include_str!("fullscreen_quad.wgsl");

/// Identity copy, also used to draw export output to the display target
pub const PASSTHROUGH_SHADER: &str = include_str!("effects/passthrough.wgsl");
pub const BRIGHTNESS_INVERT_SHADER: &str = include_str!("effects/brightness_invert.wgsl");
pub const RGB_SHIFT_SHADER: &str = include_str!("effects/rgb_shift.wgsl");
pub const CRT_SHADER: &str = include_str!("effects/crt.wgsl");
pub const NOISE_SHADER: &str = include_str!("effects/noise.wgsl");
pub const PIXEL_SORT_SHADER: &str = include_str!("effects/pixel_sort.wgsl");
pub const SLICE_SHIFT_SHADER: &str = include_str!("effects/slice_shift.wgsl");
pub const SMEAR_SHADER: &str = include_str!("effects/smear.wgsl");

/// Get the path to the shaders directory
pub fn shaders_dir() -> PathBuf {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    PathBuf::from(manifest_dir).join("src").join("shaders")
}
