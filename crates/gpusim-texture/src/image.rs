use crate::limits::{MAX_MIP_LEVELS, TEXEL_BYTES};
use crate::memory::TextureMemory;
use crate::mip::MipChainBuilder;
use crate::Result;

/// One level of a mip chain: `width * height` RGBA8 words stored row-major at `addr`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MipLevel {
    pub width: u32,
    pub height: u32,
    pub addr: u64,
}

impl MipLevel {
    pub fn texel_count(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    /// Address of texel `(u, v)`; callers are expected to have bounds-checked the coordinate.
    pub fn texel_addr(&self, u: u32, v: u32) -> u64 {
        self.addr + (u64::from(v) * u64::from(self.width) + u64::from(u)) * TEXEL_BYTES
    }
}

/// Descriptor of a texture's mip chain.
///
/// This is a plain value: binding a texture to a unit copies the descriptor, the texel data stays
/// in [`TextureMemory`]. `max_level == None` is the unbound (null) texture.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextureImage {
    pub max_level: Option<u8>,
    pub border: u32,
    pub levels: [MipLevel; MAX_MIP_LEVELS],
}

impl Default for TextureImage {
    fn default() -> Self {
        Self::unbound()
    }
}

impl TextureImage {
    pub const fn unbound() -> Self {
        Self {
            max_level: None,
            border: 0,
            levels: [MipLevel {
                width: 0,
                height: 0,
                addr: 0,
            }; MAX_MIP_LEVELS],
        }
    }

    pub fn is_bound(&self) -> bool {
        self.max_level.is_some()
    }

    /// Highest usable level: `max_level` limited to the levels a descriptor can hold.
    pub fn last_level(&self) -> Option<u32> {
        let max = u32::from(self.max_level?);
        Some(max.min(MAX_MIP_LEVELS as u32 - 1))
    }

    /// Returns the level if it is part of the chain.
    pub fn level(&self, level: u32) -> Option<&MipLevel> {
        if level > self.last_level()? {
            return None;
        }
        self.levels.get(level as usize)
    }

    pub fn base_width(&self) -> u32 {
        self.levels[0].width
    }

    pub fn base_height(&self) -> u32 {
        self.levels[0].height
    }

    /// Builds a full mip chain of a single color at `base_addr`.
    pub fn solid(
        mem: &mut dyn TextureMemory,
        base_addr: u64,
        width: u32,
        height: u32,
        rgba: [u8; 4],
    ) -> Result<Self> {
        let texels = (width as usize).saturating_mul(height as usize);
        let data: Vec<u8> = rgba.iter().copied().cycle().take(texels * 4).collect();
        MipChainBuilder::new().build(mem, base_addr, width, height, &data)
    }
}

/// Image selector carried in cache tags: the 2D image or one of the six cube faces.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ImageFace {
    Texture2D,
    PositiveX,
    NegativeX,
    PositiveY,
    NegativeY,
    PositiveZ,
    NegativeZ,
}

impl ImageFace {
    pub const CUBE: [ImageFace; 6] = [
        ImageFace::PositiveX,
        ImageFace::NegativeX,
        ImageFace::PositiveY,
        ImageFace::NegativeY,
        ImageFace::PositiveZ,
        ImageFace::NegativeZ,
    ];

    /// 3-bit selector stored in cache tags.
    pub fn selector(self) -> u32 {
        match self {
            ImageFace::Texture2D => 0,
            ImageFace::PositiveX => 1,
            ImageFace::NegativeX => 2,
            ImageFace::PositiveY => 3,
            ImageFace::NegativeY => 4,
            ImageFace::PositiveZ => 5,
            ImageFace::NegativeZ => 6,
        }
    }

    /// Index into [`crate::TextureBinding::cube_faces`]; `None` for the 2D image.
    pub fn cube_index(self) -> Option<usize> {
        match self {
            ImageFace::Texture2D => None,
            face => Some(face.selector() as usize - 1),
        }
    }
}
