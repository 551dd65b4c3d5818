//! Effect compositing engine
//!
//! Applies an ordered chain of GPU shader effects to a source image and
//! produces one output texture. The same engine serves the per-frame
//! preview and the one-shot full-resolution export.
//!
//! # Architecture
//!
//! Data and GPU runtime are kept apart:
//!
//! - **Data types** (`types.rs`): Effect definitions, parameter schemas and
//!   parameter values
//! - **Uniforms** (`uniforms.rs`): Uniform block layout and value encoding
//! - **Registry** (`registry.rs`): Catalog of available effects
//! - **Chain** (`chain.rs`): Active effect ids and their parameter values
//! - **Runtime** (`runtime.rs`): Ping-pong render targets and the program
//!   cache
//! - **Executor** (`executor.rs`): The multi-pass chain algorithm
//! - **Builtin** (`builtin/`): Built-in effects (rgbShift, crt, noise, etc.)
//!
//! # Usage
//!
//! ```ignore
//! let registry = builtin::builtin_registry();
//!
//! let mut chain = EffectChain::new();
//! chain.add(&registry, "rgbShift");
//! chain.set_parameter("rgbShift", "intensity", ParameterValue::Float(0.8));
//!
//! let targets = RenderTargetPair::create(&gpu, width, height, wgpu::FilterMode::Nearest)?;
//! let mut cache = ProgramCache::new();
//! let frame = FrameContext::new(width, height, 0.0);
//!
//! let output = ChainExecutor::new(&registry)
//!     .execute(&gpu, &source, &chain, &mut cache, &targets, &frame)?;
//! ```

mod chain;
mod error;
mod executor;
mod registry;
mod runtime;
mod types;
mod uniforms;
pub mod builtin;

pub use chain::*;
pub use error::*;
pub use executor::*;
pub use registry::*;
pub use runtime::*;
pub use types::*;
pub use uniforms::*;
