use tracing::warn;

/// Byte-addressable store backing texture images.
///
/// The texture unit only ever reads whole RGBA8 words, in bursts of consecutive words. Reads take
/// `&mut self` so implementations can count traffic or model side effects.
pub trait TextureMemory {
    /// Reads `out.len()` consecutive little-endian words starting at `addr`.
    fn burst_read(&mut self, addr: u64, out: &mut [u32]);

    fn write(&mut self, addr: u64, bytes: &[u8]);

    fn read_u32(&mut self, addr: u64) -> u32 {
        let mut word = [0u32; 1];
        self.burst_read(addr, &mut word);
        word[0]
    }
}

/// Traffic counters for [`FlatMemory`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MemoryStats {
    pub bursts: u64,
    pub words_read: u64,
    pub bytes_written: u64,
}

/// A flat `Vec<u8>`-backed memory.
///
/// Accesses past the end are tolerated: reads produce zero words and writes are truncated, both
/// with a warning.
#[derive(Debug, Clone)]
pub struct FlatMemory {
    bytes: Vec<u8>,
    stats: MemoryStats,
}

impl FlatMemory {
    pub fn new(size: usize) -> Self {
        Self {
            bytes: vec![0; size],
            stats: MemoryStats::default(),
        }
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn stats(&self) -> MemoryStats {
        self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = MemoryStats::default();
    }

    fn range(&self, addr: u64, len: usize) -> Option<std::ops::Range<usize>> {
        let start = usize::try_from(addr).ok()?;
        let end = start.checked_add(len)?;
        (end <= self.bytes.len()).then_some(start..end)
    }
}

impl TextureMemory for FlatMemory {
    fn burst_read(&mut self, addr: u64, out: &mut [u32]) {
        self.stats.bursts += 1;
        self.stats.words_read += out.len() as u64;

        let mut out_of_range = false;
        for (i, word) in out.iter_mut().enumerate() {
            let word_addr = addr.saturating_add(i as u64 * 4);
            *word = match self.range(word_addr, 4) {
                Some(r) => {
                    let mut b = [0u8; 4];
                    b.copy_from_slice(&self.bytes[r]);
                    u32::from_le_bytes(b)
                }
                None => {
                    out_of_range = true;
                    0
                }
            };
        }

        if out_of_range {
            warn!(addr, len = out.len(), size = self.bytes.len(), "burst read past end of memory");
        }
    }

    fn write(&mut self, addr: u64, bytes: &[u8]) {
        let size = self.bytes.len();
        let Ok(start) = usize::try_from(addr) else {
            warn!(addr, len = bytes.len(), size, "write past end of memory");
            return;
        };
        if start >= size {
            if !bytes.is_empty() {
                warn!(addr, len = bytes.len(), size, "write past end of memory");
            }
            return;
        }

        let n = bytes.len().min(size - start);
        if n < bytes.len() {
            warn!(addr, len = bytes.len(), size, "write truncated at end of memory");
        }
        self.bytes[start..start + n].copy_from_slice(&bytes[..n]);
        self.stats.bytes_written += n as u64;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn burst_read_is_little_endian_and_counts_traffic() {
        let mut mem = FlatMemory::new(16);
        mem.write(4, &[0x11, 0x22, 0x33, 0x44, 0xaa, 0xbb, 0xcc, 0xdd]);

        let mut out = [0u32; 2];
        mem.burst_read(4, &mut out);
        assert_eq!(out, [0x4433_2211, 0xddcc_bbaa]);
        assert_eq!(
            mem.stats(),
            MemoryStats {
                bursts: 1,
                words_read: 2,
                bytes_written: 8,
            }
        );
    }

    #[test]
    fn reads_past_end_are_zero() {
        let mut mem = FlatMemory::new(8);
        mem.write(0, &[0xff; 8]);

        let mut out = [7u32; 3];
        mem.burst_read(4, &mut out);
        assert_eq!(out, [0xffff_ffff, 0, 0]);
    }

    #[test]
    fn writes_are_truncated_at_end() {
        let mut mem = FlatMemory::new(4);
        mem.write(2, &[1, 2, 3, 4]);
        assert_eq!(mem.as_bytes(), &[0, 0, 1, 2]);
        assert_eq!(mem.stats().bytes_written, 2);

        mem.write(100, &[9]);
        assert_eq!(mem.as_bytes(), &[0, 0, 1, 2]);
    }
}
