use crate::image::{MipLevel, TextureImage};
use crate::limits::{MAX_MIP_LEVELS, TEXEL_BYTES};
use crate::memory::TextureMemory;
use crate::{Result, TextureError};
use tracing::debug;

/// Uploads a base image and derives its mip chain.
///
/// Each level is a 2x2 box filter of the previous one (integer average, truncating) with both
/// dimensions halved, rounding down. Generation stops before a dimension would reach zero or once
/// [`MAX_MIP_LEVELS`] levels exist. Levels are laid out back to back starting at `base_addr`.
#[derive(Clone, Copy, Debug)]
pub struct MipChainBuilder {
    mipmaps: bool,
    border: u32,
}

impl Default for MipChainBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MipChainBuilder {
    pub fn new() -> Self {
        Self {
            mipmaps: true,
            border: 0,
        }
    }

    /// With `false`, only the base level is uploaded and `max_level` is 0.
    pub fn mipmaps(mut self, enabled: bool) -> Self {
        self.mipmaps = enabled;
        self
    }

    pub fn border(mut self, border: u32) -> Self {
        self.border = border;
        self
    }

    /// Bytes of memory the chain for a `width`x`height` base image occupies.
    pub fn footprint(&self, width: u32, height: u32) -> u64 {
        self.dimensions(width, height)
            .iter()
            .map(|&(w, h)| u64::from(w) * u64::from(h) * TEXEL_BYTES)
            .sum()
    }

    pub fn build(
        &self,
        mem: &mut dyn TextureMemory,
        base_addr: u64,
        width: u32,
        height: u32,
        rgba8: &[u8],
    ) -> Result<TextureImage> {
        if width == 0 || height == 0 {
            return Err(TextureError::EmptyImage { width, height });
        }
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(TEXEL_BYTES as usize))
            .ok_or(TextureError::AddressOverflow)?;
        if rgba8.len() != expected {
            return Err(TextureError::DataLength {
                expected,
                actual: rgba8.len(),
            });
        }
        base_addr
            .checked_add(self.footprint(width, height))
            .ok_or(TextureError::AddressOverflow)?;

        let mut image = TextureImage {
            border: self.border,
            ..TextureImage::unbound()
        };
        let mut addr = base_addr;
        let mut current = rgba8.to_vec();
        let dims = self.dimensions(width, height);

        for (level, &(w, h)) in dims.iter().enumerate() {
            if level > 0 {
                let (pw, ph) = dims[level - 1];
                current = downsample(&current, pw, ph);
            }
            mem.write(addr, &current);
            image.levels[level] = MipLevel {
                width: w,
                height: h,
                addr,
            };
            addr += u64::from(w) * u64::from(h) * TEXEL_BYTES;
        }

        let max_level = (dims.len() - 1) as u8;
        image.max_level = Some(max_level);
        debug!(
            width,
            height,
            max_level,
            top_width = dims[dims.len() - 1].0,
            top_height = dims[dims.len() - 1].1,
            "mip chain built"
        );
        Ok(image)
    }

    fn dimensions(&self, width: u32, height: u32) -> Vec<(u32, u32)> {
        let mut dims = vec![(width, height)];
        if !self.mipmaps {
            return dims;
        }
        let (mut w, mut h) = (width, height);
        while dims.len() < MAX_MIP_LEVELS && w >> 1 > 0 && h >> 1 > 0 {
            w >>= 1;
            h >>= 1;
            dims.push((w, h));
        }
        dims
    }
}

fn downsample(src: &[u8], width: u32, height: u32) -> Vec<u8> {
    let (w, h) = ((width >> 1) as usize, (height >> 1) as usize);
    let stride = width as usize * 4;
    let mut out = vec![0u8; w * h * 4];

    for y in 0..h {
        for x in 0..w {
            let top = 2 * y * stride + 2 * x * 4;
            let bottom = top + stride;
            for c in 0..4 {
                let sum = u32::from(src[top + c])
                    + u32::from(src[top + 4 + c])
                    + u32::from(src[bottom + c])
                    + u32::from(src[bottom + 4 + c]);
                out[(y * w + x) * 4 + c] = (sum / 4) as u8;
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::FlatMemory;
    use pretty_assertions::assert_eq;

    #[test]
    fn chain_halves_until_a_dimension_would_vanish() {
        let mut mem = FlatMemory::new(1024);
        let data = vec![0u8; 8 * 2 * 4];
        let img = MipChainBuilder::new().build(&mut mem, 16, 8, 2, &data).unwrap();

        assert_eq!(img.max_level, Some(1));
        assert_eq!(
            img.levels[0],
            MipLevel {
                width: 8,
                height: 2,
                addr: 16
            }
        );
        assert_eq!(
            img.levels[1],
            MipLevel {
                width: 4,
                height: 1,
                addr: 16 + 64
            }
        );
    }

    #[test]
    fn box_filter_truncates() {
        let mut mem = FlatMemory::new(1024);
        #[rustfmt::skip]
        let data = [
            10, 0, 255, 1,   11, 0, 255, 1,
            10, 0, 255, 1,   10, 0, 254, 2,
        ];
        let img = MipChainBuilder::new().build(&mut mem, 0, 2, 2, &data).unwrap();
        assert_eq!(img.max_level, Some(1));

        let l1 = img.levels[1];
        assert_eq!(mem.read_u32(l1.addr).to_le_bytes(), [10, 0, 254, 1]);
    }

    #[test]
    fn base_only_when_mipmaps_disabled() {
        let mut mem = FlatMemory::new(1024);
        let data = vec![7u8; 4 * 4 * 4];
        let builder = MipChainBuilder::new().mipmaps(false);
        let img = builder.build(&mut mem, 0, 4, 4, &data).unwrap();
        assert_eq!(img.max_level, Some(0));
        assert_eq!(builder.footprint(4, 4), 64);
    }

    #[test]
    fn footprint_sums_all_levels() {
        assert_eq!(MipChainBuilder::new().footprint(4, 4), (16 + 4 + 1) * 4);
    }

    #[test]
    fn rejects_bad_input() {
        let mut mem = FlatMemory::new(64);
        let builder = MipChainBuilder::new();
        assert_eq!(
            builder.build(&mut mem, 0, 0, 4, &[]),
            Err(TextureError::EmptyImage {
                width: 0,
                height: 4
            })
        );
        assert_eq!(
            builder.build(&mut mem, 0, 2, 2, &[0; 3]),
            Err(TextureError::DataLength {
                expected: 16,
                actual: 3
            })
        );
    }
}
