use gpusim_vec::Vec4;
use std::fmt;

const COMPONENT_NAMES: [char; 4] = ['x', 'y', 'z', 'w'];

/// Maps a one-hot nibble (`1, 2, 4, 8`) to a component index.
fn component_of(nibble: u16) -> Option<usize> {
    match nibble {
        0x1 => Some(0),
        0x2 => Some(1),
        0x4 => Some(2),
        0x8 => Some(3),
        _ => None,
    }
}

/// Source component selector: four 4-bit one-hot groups, lowest group first.
///
/// `0x8421` is `xyzw`. A zero group repeats the previously selected component for the remaining
/// outputs, so `0x0001` broadcasts `x`. Any group that is not one-hot reads `w`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Swizzle(pub u16);

impl Swizzle {
    pub const IDENTITY: Self = Self(0x8421);
    pub const XXXX: Self = Self(0x0001);
    pub const YYYY: Self = Self(0x0002);
    pub const ZZZZ: Self = Self(0x0004);
    pub const WWWW: Self = Self(0x0008);

    /// Builds a selector from component indices (`0..4`); fewer than four entries replicate the
    /// last one.
    pub fn from_components(components: &[usize]) -> Self {
        let mut raw = 0u16;
        for (slot, &c) in components.iter().take(4).enumerate() {
            raw |= (1 << (c & 3)) << (slot * 4);
        }
        Self(raw)
    }

    pub fn apply(self, v: Vec4) -> Vec4 {
        if self == Self::IDENTITY {
            return v;
        }

        let mut out = Vec4::ZERO;
        for slot in 0..4 {
            let nibble = (self.0 >> (slot * 4)) & 0xf;
            if nibble == 0 && slot > 0 {
                for rest in slot..4 {
                    out[rest] = out[slot - 1];
                }
                return out;
            }
            out[slot] = v[component_of(nibble).unwrap_or(3)];
        }
        out
    }
}

impl Default for Swizzle {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl fmt::Display for Swizzle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in self.apply(Vec4::new(0.0, 1.0, 2.0, 3.0)).0 {
            write!(f, "{}", COMPONENT_NAMES[c as usize])?;
        }
        Ok(())
    }
}

/// Destination write mask, same packing as [`Swizzle`].
///
/// Groups are visited lowest first; each one-hot group names a component to store and the first
/// group that is not one-hot (normally zero) ends the mask. `0x0021` writes `x` then `y`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WriteMask(pub u16);

impl WriteMask {
    pub const XYZW: Self = Self(0x8421);
    pub const X: Self = Self(0x0001);
    pub const Y: Self = Self(0x0002);
    pub const Z: Self = Self(0x0004);
    pub const W: Self = Self(0x0008);
    pub const XY: Self = Self(0x0021);
    pub const XYZ: Self = Self(0x0421);

    pub fn from_components(components: &[usize]) -> Self {
        Self(Swizzle::from_components(components).0)
    }

    /// Component indices in write order.
    pub fn components(self) -> impl Iterator<Item = usize> {
        (0..4)
            .map(move |slot| component_of((self.0 >> (slot * 4)) & 0xf))
            .take_while(Option::is_some)
            .flatten()
    }
}

impl Default for WriteMask {
    fn default() -> Self {
        Self::XYZW
    }
}

impl fmt::Display for WriteMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for c in self.components() {
            write!(f, "{}", COMPONENT_NAMES[c])?;
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum OperandKind {
    /// Unused slot; ends source fetch.
    #[default]
    None,
    Attribute,
    Uniform,
    Register,
    /// Condition-code bank `id`; fills the is-negative and is-zero vectors into source slots 0
    /// and 1.
    ConditionCode,
    Constant,
    /// Destination only: the lane's color attribute.
    Color,
}

/// Condition test applied to a condition-code source by `IF` and `KIL`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum CcTest {
    #[default]
    None,
    Eq,
    Eq0,
    Eq1,
    Ne,
    Ne0,
    Ne1,
    Unknown(u8),
}

impl CcTest {
    pub fn name(&self) -> &'static str {
        match self {
            Self::None => "",
            Self::Eq => "EQ",
            Self::Eq0 => "EQ0",
            Self::Eq1 => "EQ1",
            Self::Ne => "NE",
            Self::Ne0 => "NE0",
            Self::Ne1 => "NE1",
            Self::Unknown(_) => "??",
        }
    }

    /// Evaluates the test over the is-negative / is-zero vectors of a bank.
    ///
    /// `None` for tests that cannot be evaluated.
    pub fn evaluate(&self, negative: Vec4, zero: Vec4) -> Option<bool> {
        let mut lanes = negative.0.into_iter().zip(zero.0);
        match self {
            Self::Eq | Self::Eq0 | Self::Eq1 => {
                Some(lanes.any(|(n, z)| n != 1.0 && z == 1.0))
            }
            Self::Ne | Self::Ne0 | Self::Ne1 => {
                Some(lanes.any(|(n, z)| n == 1.0 || z != 1.0))
            }
            Self::None | Self::Unknown(_) => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct Operand {
    pub kind: OperandKind,
    pub id: i32,
    pub swizzle: Swizzle,
    pub mask: WriteMask,
    pub negate: bool,
    pub abs: bool,
    pub cc_test: CcTest,
    pub cc_swizzle: Swizzle,
    pub value: Vec4,
}

impl Operand {
    pub fn none() -> Self {
        Self::default()
    }

    fn of(kind: OperandKind, id: i32) -> Self {
        Self {
            kind,
            id,
            ..Self::default()
        }
    }

    pub fn attribute(id: i32) -> Self {
        Self::of(OperandKind::Attribute, id)
    }

    pub fn uniform(id: i32) -> Self {
        Self::of(OperandKind::Uniform, id)
    }

    /// A negative id as destination discards the value but keeps condition-code capture.
    pub fn register(id: i32) -> Self {
        Self::of(OperandKind::Register, id)
    }

    pub fn color() -> Self {
        Self::of(OperandKind::Color, 0)
    }

    pub fn constant(value: Vec4) -> Self {
        Self {
            value,
            ..Self::of(OperandKind::Constant, 0)
        }
    }

    pub fn condition(bank: i32, test: CcTest) -> Self {
        Self {
            cc_test: test,
            ..Self::of(OperandKind::ConditionCode, bank)
        }
    }

    pub fn swizzle(mut self, swizzle: Swizzle) -> Self {
        self.swizzle = swizzle;
        self
    }

    pub fn mask(mut self, mask: WriteMask) -> Self {
        self.mask = mask;
        self
    }

    pub fn cc_swizzle(mut self, swizzle: Swizzle) -> Self {
        self.cc_swizzle = swizzle;
        self
    }

    pub fn negated(mut self) -> Self {
        self.negate = true;
        self
    }

    pub fn absolute(mut self) -> Self {
        self.abs = true;
        self
    }

    pub fn is_none(&self) -> bool {
        self.kind == OperandKind::None
    }

    fn fmt_storage(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            OperandKind::None => Ok(()),
            OperandKind::Attribute => write!(f, "a{}", self.id),
            OperandKind::Uniform => write!(f, "c{}", self.id),
            OperandKind::Register if self.id < 0 => f.write_str("_"),
            OperandKind::Register => write!(f, "r{}", self.id),
            OperandKind::ConditionCode => write!(f, "cc{}", self.id),
            OperandKind::Color => f.write_str("color"),
            OperandKind::Constant => write!(f, "{}", self.value),
        }
    }

    /// Renders the operand as a destination (with write mask).
    pub fn display_dst(&self) -> impl fmt::Display + '_ {
        DisplayDst(self)
    }
}

struct DisplayDst<'a>(&'a Operand);

impl fmt::Display for DisplayDst<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt_storage(f)?;
        if self.0.mask != WriteMask::XYZW {
            write!(f, ".{}", self.0.mask)?;
        }
        Ok(())
    }
}

/// Renders the operand as a source (with swizzle and modifiers).
impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.kind == OperandKind::ConditionCode {
            self.fmt_storage(f)?;
            return write!(f, ".{}({})", self.cc_swizzle, self.cc_test.name());
        }
        if self.negate {
            f.write_str("-")?;
        }
        if self.abs {
            f.write_str("|")?;
        }
        self.fmt_storage(f)?;
        if self.kind != OperandKind::Constant && self.swizzle != Swizzle::IDENTITY {
            write!(f, ".{}", self.swizzle)?;
        }
        if self.abs {
            f.write_str("|")?;
        }
        Ok(())
    }
}
