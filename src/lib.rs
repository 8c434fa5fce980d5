//! Software model of a programmable GPU core.
//!
//! This crate re-exports the workspace members under one roof:
//!
//! - [`vec`]: the `Vec4` numeric kernel.
//! - [`texture`]: texture images, the mip-chain builder, the texel cache and the sampling unit.
//! - [`shader`]: instructions, program validation and the lockstep SIMD engine.
//!
//! A typical fragment pass binds textures on a [`texture::TextureUnit`], validates a
//! [`shader::Program`] once, then calls [`shader::ShaderEngine::run`] per group of quads.

#![forbid(unsafe_code)]

pub use gpusim_shader as shader;
pub use gpusim_texture as texture;
pub use gpusim_vec as vec;

pub use gpusim_shader::{Lane, LaneMask, Program, RunParams, ShaderEngine, ShaderMode};
pub use gpusim_texture::{FlatMemory, TextureMemory, TextureUnit, TextureUnitConfig};
pub use gpusim_vec::Vec4;
