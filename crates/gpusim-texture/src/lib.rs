//! Texture sampling unit with a set-associative texel cache.
//!
//! Texel data lives in a [`TextureMemory`]; a [`TextureImage`] only records where each mip level
//! is and how big it is. [`TextureUnit::sample`] resolves the target (2D or cube face), picks the
//! level(s) from explicit LOD or screen-space gradients, applies the bound filter and wrap modes
//! and fetches texels through the [`TextureCache`].

#![forbid(unsafe_code)]

mod cache;
mod error;
mod image;
pub mod limits;
mod memory;
mod mip;
mod state;
mod unit;

pub use cache::{CacheOutcome, CacheStats, TexelLocation, TextureCache, TextureCacheConfig};
pub use error::{Result, TextureError};
pub use image::{ImageFace, MipLevel, TextureImage};
pub use memory::{FlatMemory, MemoryStats, TextureMemory};
pub use mip::MipChainBuilder;
pub use state::{
    MagFilter, MinFilter, TextureBinding, TextureTarget, WrapMode, GL_CLAMP_TO_EDGE, GL_LINEAR,
    GL_LINEAR_MIPMAP_LINEAR, GL_LINEAR_MIPMAP_NEAREST, GL_NEAREST, GL_NEAREST_MIPMAP_LINEAR,
    GL_NEAREST_MIPMAP_NEAREST, GL_REPEAT,
};
pub use unit::{wrap_axis, CacheDebugView, Lod, SampleRequest, TextureUnit, TextureUnitConfig};
