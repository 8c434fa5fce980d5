use crate::limits::{COLOR_ATTRIBUTE, MAX_ATTRIBUTES, MAX_LANES, QUAD_SIZE};
use gpusim_vec::Vec4;

/// Caller-visible state of one SIMD lane (a vertex or a fragment).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Lane {
    pub attributes: [Vec4; MAX_ATTRIBUTES],
    pub killed: bool,
}

impl Lane {
    pub fn new() -> Self {
        Self {
            attributes: [Vec4::ZERO; MAX_ATTRIBUTES],
            killed: false,
        }
    }

    pub fn with_attribute(mut self, slot: usize, value: Vec4) -> Self {
        if let Some(attr) = self.attributes.get_mut(slot) {
            *attr = value;
        }
        self
    }
}

impl Default for Lane {
    fn default() -> Self {
        Self::new()
    }
}

/// Bit `i` enables lane `i`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct LaneMask(pub u16);

impl LaneMask {
    pub const NONE: Self = Self(0);
    pub const ALL: Self = Self(u16::MAX);

    /// The lowest `count` lanes.
    pub fn first(count: usize) -> Self {
        if count >= MAX_LANES {
            Self::ALL
        } else {
            Self((1u16 << count) - 1)
        }
    }

    pub fn with(self, lane: usize) -> Self {
        if lane < MAX_LANES {
            Self(self.0 | (1 << lane))
        } else {
            self
        }
    }

    pub fn contains(self, lane: usize) -> bool {
        lane < MAX_LANES && self.0 & (1 << lane) != 0
    }

    pub fn count(self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Enabled lanes in index order.
    pub fn lanes(self) -> impl Iterator<Item = usize> {
        (0..MAX_LANES).filter(move |&lane| self.contains(lane))
    }

    /// Every lane of each quad that has at least one enabled lane.
    pub fn quads(self) -> Self {
        let quad_bits = (1u16 << QUAD_SIZE) - 1;
        let mut out = 0;
        for quad in 0..MAX_LANES / QUAD_SIZE {
            let shift = quad * QUAD_SIZE;
            if self.0 & (quad_bits << shift) != 0 {
                out |= quad_bits << shift;
            }
        }
        Self(out)
    }
}

/// Kind of work a run processes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum ShaderMode {
    /// Lanes are independent vertices.
    Vertex,
    /// Lanes are fragments grouped in 2x2 quads; disabled lanes of a partially covered quad run
    /// as helpers so derivatives stay defined.
    #[default]
    Fragment,
}

impl ShaderMode {
    /// Slot written by [`crate::OperandKind::Color`] destinations.
    pub fn color_attribute(self) -> usize {
        COLOR_ATTRIBUTE
    }

    pub fn uses_helper_lanes(self) -> bool {
        self == Self::Fragment
    }
}
