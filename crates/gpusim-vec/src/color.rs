/// Splits a packed RGBA8 word into `[r, g, b, a]`; red is the least significant byte.
pub fn word_to_rgba8(word: u32) -> [u8; 4] {
    word.to_le_bytes()
}

pub fn rgba8_to_word(rgba: [u8; 4]) -> u32 {
    u32::from_le_bytes(rgba)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn red_is_low_byte() {
        assert_eq!(rgba8_to_word([0x11, 0x22, 0x33, 0x44]), 0x4433_2211);
        assert_eq!(word_to_rgba8(0x4433_2211), [0x11, 0x22, 0x33, 0x44]);
    }
}
