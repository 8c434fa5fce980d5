//! Fixed limits of the texture sampling unit.

/// Number of levels a [`crate::TextureImage`] can describe (base level included).
pub const MAX_MIP_LEVELS: usize = 13;

/// Number of independently bound texture units.
///
/// The cache tag reserves a single bit for the unit id, so raising this also requires widening
/// the tag layout in `cache.rs`.
pub const MAX_TEXTURE_UNITS: usize = 2;

/// Upper bound accepted for [`crate::TextureCacheConfig::block_side_log2`].
pub(crate) const MAX_BLOCK_SIDE_LOG2: u32 = 6;

/// Upper bound accepted for [`crate::TextureCacheConfig::entry_side_log2`].
pub(crate) const MAX_ENTRY_SIDE_LOG2: u32 = 8;

/// Bytes per texel in memory (packed RGBA8).
pub(crate) const TEXEL_BYTES: u64 = 4;
