//! Set-associative texel cache.
//!
//! A cache block holds a `B x B` tile of texels (`B = 2^block_side_log2`). Blocks are grouped
//! into an `E x E` grid of entries (`E = 2^entry_side_log2`), so a level is split on each axis
//! into a super-block coordinate, a block coordinate inside the super-block (which picks the
//! entry) and an offset inside the block. Levels shorter than one block are packed together into
//! a single block rooted at the first such level.
//!
//! Tag layout (most significant first):
//!
//! ```text
//! tiled:  v_super:12 | u_super:12 | face:3 | level:4 | unit:1
//! packed:                           face:3 | root:4  | unit:1
//! ```
//!
//! Replacement is round-robin per entry and ignores access recency.

use crate::image::{ImageFace, MipLevel, TextureImage};
use crate::limits::{MAX_BLOCK_SIDE_LOG2, MAX_ENTRY_SIDE_LOG2, TEXEL_BYTES};
use crate::memory::TextureMemory;
use crate::{Result, TextureError};
use gpusim_vec::Vec4;
use tracing::trace;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextureCacheConfig {
    pub block_side_log2: u32,
    pub entry_side_log2: u32,
    pub ways: usize,
    /// Longest burst issued while filling a block, in words.
    pub max_burst_len: usize,
}

impl Default for TextureCacheConfig {
    fn default() -> Self {
        Self {
            block_side_log2: 2,
            entry_side_log2: 3,
            ways: 4,
            max_burst_len: 16,
        }
    }
}

impl TextureCacheConfig {
    pub fn block_side(&self) -> u32 {
        1 << self.block_side_log2
    }

    pub fn block_texels(&self) -> usize {
        1 << (2 * self.block_side_log2)
    }

    pub fn entry_side(&self) -> u32 {
        1 << self.entry_side_log2
    }

    pub fn entries(&self) -> usize {
        1 << (2 * self.entry_side_log2)
    }

    fn validate(&self) -> Result<()> {
        if self.block_side_log2 == 0 || self.block_side_log2 > MAX_BLOCK_SIDE_LOG2 {
            return Err(TextureError::InvalidCacheConfig(
                "block_side_log2 must be in 1..=6",
            ));
        }
        if self.entry_side_log2 > MAX_ENTRY_SIDE_LOG2 {
            return Err(TextureError::InvalidCacheConfig(
                "entry_side_log2 must be at most 8",
            ));
        }
        if self.ways == 0 {
            return Err(TextureError::InvalidCacheConfig("ways must be > 0"));
        }
        if self.max_burst_len == 0 {
            return Err(TextureError::InvalidCacheConfig("max_burst_len must be > 0"));
        }
        Ok(())
    }
}

/// Cumulative lookup counters, reset by [`TextureCache::clear`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Misses whose victim way had never held valid data. Also counted in `misses`.
    pub cold_misses: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CacheOutcome {
    Hit,
    Miss,
    ColdMiss,
}

/// Location of one texel: which texture, face, level and unit it belongs to.
#[derive(Clone, Copy, Debug)]
pub struct TexelLocation<'a> {
    pub image: &'a TextureImage,
    pub face: ImageFace,
    pub level: u32,
    pub unit: u32,
    pub u: u32,
    pub v: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct BlockAddress {
    entry: usize,
    tag: u32,
    offset: usize,
    layout: BlockLayout,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum BlockLayout {
    /// Tile origin of the block inside the level.
    Tiled { x0: u32, y0: u32 },
    Packed { root: u32 },
}

#[derive(Clone, Debug)]
struct CacheLine {
    valid: bool,
    tag: u32,
    texels: Box<[Vec4]>,
}

pub struct TextureCache {
    config: TextureCacheConfig,
    /// `entries * ways` lines, entry-major.
    lines: Vec<CacheLine>,
    round_robin: Vec<u32>,
    stats: CacheStats,
}

impl TextureCache {
    pub fn new(config: TextureCacheConfig) -> Result<Self> {
        config.validate()?;
        let line = CacheLine {
            valid: false,
            tag: 0,
            texels: vec![Vec4::TRANSPARENT_BLACK; config.block_texels()].into_boxed_slice(),
        };
        Ok(Self {
            config,
            lines: vec![line; config.entries() * config.ways],
            round_robin: vec![0; config.entries()],
            stats: CacheStats::default(),
        })
    }

    pub fn config(&self) -> &TextureCacheConfig {
        &self.config
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Invalidates every line and resets the round-robin pointers and counters.
    pub fn clear(&mut self) {
        for line in &mut self.lines {
            line.valid = false;
        }
        self.round_robin.fill(0);
        self.stats = CacheStats::default();
    }

    /// Reads one texel through the cache, filling its block from `mem` on a miss.
    ///
    /// The caller guarantees that `loc.level` exists in `loc.image` and that `(u, v)` lies
    /// inside it.
    pub fn read(
        &mut self,
        mem: &mut dyn TextureMemory,
        loc: &TexelLocation<'_>,
    ) -> (Vec4, CacheOutcome) {
        let addr = self.address(loc);

        if addr.offset >= self.config.block_texels() {
            // Packed chains of non-power-of-two images can overflow the block.
            trace!(
                offset = addr.offset,
                "packed texel beyond cache block; reading directly"
            );
            self.stats.misses += 1;
            return (read_direct(mem, loc), CacheOutcome::Miss);
        }

        let ways = self.config.ways;
        let base = addr.entry * ways;
        for line in &self.lines[base..base + ways] {
            if line.valid && line.tag == addr.tag {
                self.stats.hits += 1;
                return (line.texels[addr.offset], CacheOutcome::Hit);
            }
        }

        self.stats.misses += 1;
        let rr = &mut self.round_robin[addr.entry];
        let way = *rr as usize % ways;
        *rr = rr.wrapping_add(1);

        let config = self.config;
        let line = &mut self.lines[base + way];
        let cold = !line.valid;
        if cold {
            self.stats.cold_misses += 1;
        }
        line.valid = true;
        line.tag = addr.tag;
        fill(&config, mem, loc, addr.layout, &mut line.texels);

        trace!(entry = addr.entry, way, tag = addr.tag, cold, "texture cache fill");
        let outcome = if cold {
            CacheOutcome::ColdMiss
        } else {
            CacheOutcome::Miss
        };
        (line.texels[addr.offset], outcome)
    }

    fn address(&self, loc: &TexelLocation<'_>) -> BlockAddress {
        let b_log = self.config.block_side_log2;
        let e_log = self.config.entry_side_log2;
        let b = self.config.block_side();
        let level = loc.image.levels[loc.level as usize];
        let selector = loc.face.selector() & 0x7;
        let unit = loc.unit & 0x1;

        if level.height >= b {
            let (u, v) = (loc.u, loc.v);
            let u_super = u >> (b_log + e_log);
            let v_super = v >> (b_log + e_log);
            let u_block = (u >> b_log) & (self.config.entry_side() - 1);
            let v_block = (v >> b_log) & (self.config.entry_side() - 1);
            let u_off = u & (b - 1);
            let v_off = v & (b - 1);

            let mut tag = (v_super << 12) | (u_super & 0xfff);
            tag = (tag << 3) | selector;
            tag = (tag << 4) | (loc.level & 0xf);
            tag = (tag << 1) | unit;

            BlockAddress {
                entry: (v_block * self.config.entry_side() + u_block) as usize,
                tag,
                offset: (v_off * b + u_off) as usize,
                layout: BlockLayout::Tiled {
                    x0: u & !(b - 1),
                    y0: v & !(b - 1),
                },
            }
        } else {
            let root = packed_root(loc.image, b, loc.level);
            let skipped: u64 = (root..loc.level)
                .map(|l| loc.image.levels[l as usize].texel_count())
                .sum();
            let offset = skipped + u64::from(loc.v) * u64::from(level.width) + u64::from(loc.u);

            let mut tag = selector;
            tag = (tag << 4) | (root & 0xf);
            tag = (tag << 1) | unit;

            BlockAddress {
                entry: 0,
                tag,
                offset: usize::try_from(offset).unwrap_or(usize::MAX),
                layout: BlockLayout::Packed { root },
            }
        }
    }
}

/// First level shorter than the block side.
fn packed_root(image: &TextureImage, block_side: u32, level: u32) -> u32 {
    (0..=level)
        .find(|&l| image.levels[l as usize].height < block_side)
        .unwrap_or(level)
}

fn fill(
    config: &TextureCacheConfig,
    mem: &mut dyn TextureMemory,
    loc: &TexelLocation<'_>,
    layout: BlockLayout,
    texels: &mut [Vec4],
) {
    texels.fill(Vec4::TRANSPARENT_BLACK);
    let b = config.block_side();

    match layout {
        BlockLayout::Tiled { x0, y0 } => {
            let level = loc.image.levels[loc.level as usize];
            if x0 >= level.width {
                return;
            }
            let row_len = b.min(level.width - x0) as usize;
            for j in 0..b {
                let y = y0 + j;
                if y >= level.height {
                    break;
                }
                let start = (j * b) as usize;
                read_run(
                    config,
                    mem,
                    level.texel_addr(x0, y),
                    &mut texels[start..start + row_len],
                );
            }
        }
        BlockLayout::Packed { root } => {
            let max_level = loc.image.last_level().unwrap_or(0);
            let mut offset = 0usize;
            for l in root..=max_level {
                if offset >= texels.len() {
                    break;
                }
                let level: MipLevel = loc.image.levels[l as usize];
                let count = (level.texel_count() as usize).min(texels.len() - offset);
                read_run(config, mem, level.addr, &mut texels[offset..offset + count]);
                offset += count;
            }
        }
    }
}

/// Reads consecutive texels starting at `addr`, in bursts of at most `max_burst_len` words.
fn read_run(
    config: &TextureCacheConfig,
    mem: &mut dyn TextureMemory,
    addr: u64,
    out: &mut [Vec4],
) {
    let mut words = vec![0u32; config.max_burst_len];
    let mut addr = addr;
    for chunk in out.chunks_mut(config.max_burst_len) {
        let words = &mut words[..chunk.len()];
        mem.burst_read(addr, words);
        for (texel, &word) in chunk.iter_mut().zip(words.iter()) {
            *texel = Vec4::from_rgba8_word(word);
        }
        addr += chunk.len() as u64 * TEXEL_BYTES;
    }
}

/// Single-word read that bypasses the cache.
pub(crate) fn read_direct(mem: &mut dyn TextureMemory, loc: &TexelLocation<'_>) -> Vec4 {
    let level = loc.image.levels[loc.level as usize];
    Vec4::from_rgba8_word(mem.read_u32(level.texel_addr(loc.u, loc.v)))
}
