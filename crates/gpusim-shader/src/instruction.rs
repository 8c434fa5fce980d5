use crate::opcode::Opcode;
use crate::operand::Operand;
use bitflags::bitflags;
use gpusim_texture::TextureTarget;
use std::fmt;

bitflags! {
    /// Result modifiers applied during write-back.
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
    pub struct Modifiers: u32 {
        /// Clamp to `[0, 1]`.
        const SATURATE = 1 << 0;
        /// Clamp to `[-1, 1]`. Ignored when `SATURATE` is also set.
        const SIGNED_SATURATE = 1 << 1;
        /// Capture into condition bank 0.
        const CC = 1 << 2;
        const CC0 = 1 << 3;
        /// Capture into condition bank 1.
        const CC1 = 1 << 4;
    }
}

impl Modifiers {
    /// Condition bank written by this instruction, if any.
    pub fn capture_bank(self) -> Option<usize> {
        if self.intersects(Self::CC | Self::CC0) {
            Some(0)
        } else if self.contains(Self::CC1) {
            Some(1)
        } else {
            None
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextureRef {
    pub unit: u8,
    pub target: TextureTarget,
}

impl TextureRef {
    pub fn new(unit: u8, target: TextureTarget) -> Self {
        Self { unit, target }
    }

    pub fn texture_2d(unit: u8) -> Self {
        Self::new(unit, TextureTarget::Texture2D)
    }

    pub fn cube(unit: u8) -> Self {
        Self::new(unit, TextureTarget::Cube)
    }
}

/// One decoded shader instruction.
///
/// ```
/// use gpusim_shader::{Instruction, Modifiers, Opcode, Operand, WriteMask};
///
/// let add = Instruction::new(Opcode::Add)
///     .dst(Operand::register(0).mask(WriteMask::XY))
///     .src(Operand::attribute(2))
///     .src(Operand::uniform(0))
///     .modifiers(Modifiers::SATURATE);
/// assert_eq!(add.to_string(), "ADD_SAT r0.xy, a2, c0");
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Instruction {
    pub opcode: Opcode,
    pub dst: Operand,
    pub src: [Operand; 3],
    pub modifiers: Modifiers,
    pub texture: Option<TextureRef>,
}

impl Instruction {
    pub fn new(opcode: Opcode) -> Self {
        Self {
            opcode,
            dst: Operand::none(),
            src: [Operand::none(); 3],
            modifiers: Modifiers::empty(),
            texture: None,
        }
    }

    pub fn dst(mut self, dst: Operand) -> Self {
        self.dst = dst;
        self
    }

    /// Fills the next unused source slot. Operands past the third are dropped.
    pub fn src(mut self, src: Operand) -> Self {
        if let Some(slot) = self.src.iter_mut().find(|s| s.is_none()) {
            *slot = src;
        }
        self
    }

    pub fn modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    pub fn texture(mut self, texture: TextureRef) -> Self {
        self.texture = Some(texture);
        self
    }

    /// Sources up to the first unused slot.
    pub fn sources(&self) -> impl Iterator<Item = &Operand> {
        self.src.iter().take_while(|s| !s.is_none())
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.opcode)?;
        if self.modifiers.contains(Modifiers::SATURATE) {
            f.write_str("_SAT")?;
        } else if self.modifiers.contains(Modifiers::SIGNED_SATURATE) {
            f.write_str("_SSAT")?;
        }
        if let Some(bank) = self.modifiers.capture_bank() {
            write!(f, "_CC{bank}")?;
        }

        let mut sep = " ";
        if !self.dst.is_none() {
            write!(f, "{sep}{}", self.dst.display_dst())?;
            sep = ", ";
        }
        for src in self.sources() {
            write!(f, "{sep}{src}")?;
            sep = ", ";
        }
        if let Some(tex) = self.texture {
            let target = match tex.target {
                TextureTarget::Texture2D => "2D",
                TextureTarget::Cube => "CUBE",
            };
            write!(f, "{sep}texture[{}], {target}", tex.unit)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operand::{CcTest, Swizzle};
    use pretty_assertions::assert_eq;

    #[test]
    fn capture_bank_prefers_bank_zero() {
        assert_eq!(Modifiers::CC.capture_bank(), Some(0));
        assert_eq!((Modifiers::CC0 | Modifiers::CC1).capture_bank(), Some(0));
        assert_eq!(Modifiers::CC1.capture_bank(), Some(1));
        assert_eq!(Modifiers::SATURATE.capture_bank(), None);
    }

    #[test]
    fn builder_fills_source_slots_in_order() {
        let inst = Instruction::new(Opcode::Mad)
            .src(Operand::register(1))
            .src(Operand::register(2))
            .src(Operand::register(3))
            .src(Operand::register(4));
        let ids: Vec<i32> = inst.sources().map(|s| s.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn disassembly() {
        let tex = Instruction::new(Opcode::Tex)
            .dst(Operand::color())
            .src(Operand::attribute(4))
            .texture(TextureRef::cube(1));
        assert_eq!(tex.to_string(), "TEX color, a4, texture[1], CUBE");

        let kil = Instruction::new(Opcode::Kil)
            .src(Operand::condition(0, CcTest::Eq).cc_swizzle(Swizzle::XXXX));
        assert_eq!(kil.to_string(), "KIL cc0.xxxx(EQ)");

        let sub = Instruction::new(Opcode::Sub)
            .dst(Operand::register(-1))
            .src(Operand::attribute(0))
            .src(Operand::uniform(1).negated())
            .modifiers(Modifiers::SIGNED_SATURATE | Modifiers::CC1);
        assert_eq!(sub.to_string(), "SUB_SSAT_CC1 _, a0, -c1");

        assert_eq!(Instruction::new(Opcode::EndIf).to_string(), "ENDIF");
    }
}
