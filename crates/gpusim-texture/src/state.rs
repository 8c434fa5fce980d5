//! Per-unit sampler state and its OpenGL enum encodings.

use crate::image::TextureImage;

pub const GL_NEAREST: u32 = 0x2600;
pub const GL_LINEAR: u32 = 0x2601;
pub const GL_NEAREST_MIPMAP_NEAREST: u32 = 0x2700;
pub const GL_LINEAR_MIPMAP_NEAREST: u32 = 0x2701;
pub const GL_NEAREST_MIPMAP_LINEAR: u32 = 0x2702;
pub const GL_LINEAR_MIPMAP_LINEAR: u32 = 0x2703;
pub const GL_REPEAT: u32 = 0x2901;
pub const GL_CLAMP_TO_EDGE: u32 = 0x812f;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TextureTarget {
    Texture2D,
    Cube,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WrapMode {
    Repeat,
    ClampToEdge,
    Unknown(u32),
}

impl WrapMode {
    pub fn from_gl(raw: u32) -> Self {
        match raw {
            GL_REPEAT => Self::Repeat,
            GL_CLAMP_TO_EDGE => Self::ClampToEdge,
            other => Self::Unknown(other),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Repeat => "repeat",
            Self::ClampToEdge => "clamp_to_edge",
            Self::Unknown(_) => "unknown",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MinFilter {
    Nearest,
    Linear,
    NearestMipmapNearest,
    LinearMipmapNearest,
    NearestMipmapLinear,
    /// Trilinear, with anisotropic sampling along the major gradient axis.
    LinearMipmapLinear,
    Unknown(u32),
}

impl MinFilter {
    pub fn from_gl(raw: u32) -> Self {
        match raw {
            GL_NEAREST => Self::Nearest,
            GL_LINEAR => Self::Linear,
            GL_NEAREST_MIPMAP_NEAREST => Self::NearestMipmapNearest,
            GL_LINEAR_MIPMAP_NEAREST => Self::LinearMipmapNearest,
            GL_NEAREST_MIPMAP_LINEAR => Self::NearestMipmapLinear,
            GL_LINEAR_MIPMAP_LINEAR => Self::LinearMipmapLinear,
            other => Self::Unknown(other),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Nearest => "nearest",
            Self::Linear => "linear",
            Self::NearestMipmapNearest => "nearest_mipmap_nearest",
            Self::LinearMipmapNearest => "linear_mipmap_nearest",
            Self::NearestMipmapLinear => "nearest_mipmap_linear",
            Self::LinearMipmapLinear => "linear_mipmap_linear",
            Self::Unknown(_) => "unknown",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MagFilter {
    Nearest,
    Linear,
    Unknown(u32),
}

impl MagFilter {
    pub fn from_gl(raw: u32) -> Self {
        match raw {
            GL_NEAREST => Self::Nearest,
            GL_LINEAR => Self::Linear,
            other => Self::Unknown(other),
        }
    }
}

/// Everything bound to one texture unit.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TextureBinding {
    pub texture_2d: TextureImage,
    /// Cube faces in `+X, -X, +Y, -Y, +Z, -Z` order.
    pub cube_faces: [TextureImage; 6],
    pub wrap_s: WrapMode,
    pub wrap_t: WrapMode,
    pub min_filter: MinFilter,
    pub mag_filter: MagFilter,
    pub max_anisotropy: u8,
}

impl Default for TextureBinding {
    /// OpenGL initial sampler state with nothing bound.
    fn default() -> Self {
        Self {
            texture_2d: TextureImage::unbound(),
            cube_faces: [TextureImage::unbound(); 6],
            wrap_s: WrapMode::Repeat,
            wrap_t: WrapMode::Repeat,
            min_filter: MinFilter::NearestMipmapLinear,
            mag_filter: MagFilter::Linear,
            max_anisotropy: 1,
        }
    }
}

impl TextureBinding {
    pub fn with_2d(image: TextureImage) -> Self {
        Self {
            texture_2d: image,
            ..Self::default()
        }
    }

    pub fn with_cube(faces: [TextureImage; 6]) -> Self {
        Self {
            cube_faces: faces,
            ..Self::default()
        }
    }

    pub fn filters(mut self, min: MinFilter, mag: MagFilter) -> Self {
        self.min_filter = min;
        self.mag_filter = mag;
        self
    }

    pub fn wrap(mut self, s: WrapMode, t: WrapMode) -> Self {
        self.wrap_s = s;
        self.wrap_t = t;
        self
    }

    pub fn anisotropy(mut self, max: u8) -> Self {
        self.max_anisotropy = max;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gl_enums_decode() {
        assert_eq!(WrapMode::from_gl(0x2901), WrapMode::Repeat);
        assert_eq!(WrapMode::from_gl(0x812f), WrapMode::ClampToEdge);
        assert_eq!(WrapMode::from_gl(0x2900), WrapMode::Unknown(0x2900));
        assert_eq!(MinFilter::from_gl(0x2703), MinFilter::LinearMipmapLinear);
        assert_eq!(MinFilter::from_gl(0x2702).name(), "nearest_mipmap_linear");
        assert_eq!(MagFilter::from_gl(0x2600), MagFilter::Nearest);
        assert_eq!(MagFilter::from_gl(0x2703), MagFilter::Unknown(0x2703));
    }
}
