use thiserror::Error;

pub type Result<T> = std::result::Result<T, TextureError>;

/// Errors raised while configuring the texture unit or building texture images.
///
/// Sampling itself never fails: data-range problems (unbound textures, levels past the end of the
/// chain, coordinates outside a level) are logged and answered with transparent black.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TextureError {
    #[error("invalid texture cache configuration: {0}")]
    InvalidCacheConfig(&'static str),

    #[error("texture unit {unit} out of range (max {max})")]
    UnitOutOfRange { unit: usize, max: usize },

    #[error("texture dimensions {width}x{height} must both be non-zero")]
    EmptyImage { width: u32, height: u32 },

    #[error("texel data is {actual} bytes, expected {expected}")]
    DataLength { expected: usize, actual: usize },

    #[error("integer overflow while computing texture addresses")]
    AddressOverflow,
}
