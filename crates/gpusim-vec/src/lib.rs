//! Four-component float vector kernel shared by the shader engine and the texture unit.
//!
//! [`Vec4`] is a plain `[f32; 4]` with accessors named for the context a value is used in
//! (`x/y/z/w` for positions, `r/g/b/a` for colors, `s/t/p/q` for texture coordinates). All three
//! spellings address the same storage; there is no aliasing beyond that.
//!
//! Comparisons follow the shader convention of producing `1.0` / `0.0` per component rather than
//! booleans so they can be written straight into registers.

#![forbid(unsafe_code)]

mod color;
mod scalar;

use std::fmt;
use std::ops::{Add, Div, Index, IndexMut, Mul, Neg, Sub};

pub use color::{rgba8_to_word, word_to_rgba8};
pub use scalar::{fast_rsqrt, frexp};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec4(pub [f32; 4]);

impl Vec4 {
    pub const ZERO: Self = Self([0.0; 4]);
    pub const ONE: Self = Self([1.0; 4]);
    /// Opaque black is `(0, 0, 0, 1)`; this is the fully transparent one used as a fallback texel.
    pub const TRANSPARENT_BLACK: Self = Self::ZERO;

    pub const fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self([x, y, z, w])
    }

    pub const fn splat(v: f32) -> Self {
        Self([v; 4])
    }

    pub fn x(&self) -> f32 {
        self.0[0]
    }

    pub fn y(&self) -> f32 {
        self.0[1]
    }

    pub fn z(&self) -> f32 {
        self.0[2]
    }

    pub fn w(&self) -> f32 {
        self.0[3]
    }

    pub fn r(&self) -> f32 {
        self.0[0]
    }

    pub fn g(&self) -> f32 {
        self.0[1]
    }

    pub fn b(&self) -> f32 {
        self.0[2]
    }

    pub fn a(&self) -> f32 {
        self.0[3]
    }

    pub fn s(&self) -> f32 {
        self.0[0]
    }

    pub fn t(&self) -> f32 {
        self.0[1]
    }

    pub fn p(&self) -> f32 {
        self.0[2]
    }

    pub fn q(&self) -> f32 {
        self.0[3]
    }

    pub fn set_s(&mut self, v: f32) {
        self.0[0] = v;
    }

    pub fn set_t(&mut self, v: f32) {
        self.0[1] = v;
    }

    pub fn map(self, f: impl Fn(f32) -> f32) -> Self {
        Self(self.0.map(f))
    }

    pub fn zip_map(self, other: Self, f: impl Fn(f32, f32) -> f32) -> Self {
        Self([
            f(self.0[0], other.0[0]),
            f(self.0[1], other.0[1]),
            f(self.0[2], other.0[2]),
            f(self.0[3], other.0[3]),
        ])
    }

    pub fn abs(self) -> Self {
        self.map(f32::abs)
    }

    pub fn floor(self) -> Self {
        self.map(f32::floor)
    }

    pub fn ceil(self) -> Self {
        self.map(f32::ceil)
    }

    /// Rounds half-way cases away from zero (C `round`).
    pub fn round(self) -> Self {
        self.map(f32::round)
    }

    pub fn trunc(self) -> Self {
        self.map(f32::trunc)
    }

    /// `x - floor(x)`, always in `[0, 1)` for finite input (unlike [`f32::fract`]).
    pub fn fract(self) -> Self {
        self.map(|v| v - v.floor())
    }

    pub fn min(self, other: Self) -> Self {
        self.zip_map(other, f32::min)
    }

    pub fn max(self, other: Self) -> Self {
        self.zip_map(other, f32::max)
    }

    pub fn clamp(self, lo: f32, hi: f32) -> Self {
        self.map(|v| v.clamp(lo, hi))
    }

    pub fn dot2(self, other: Self) -> f32 {
        self.0[0] * other.0[0] + self.0[1] * other.0[1]
    }

    pub fn dot3(self, other: Self) -> f32 {
        self.dot2(other) + self.0[2] * other.0[2]
    }

    pub fn dot4(self, other: Self) -> f32 {
        self.dot3(other) + self.0[3] * other.0[3]
    }

    pub fn cmp_eq(self, other: Self) -> Self {
        self.zip_map(other, |a, b| bool_to_f32(a == b))
    }

    pub fn cmp_ne(self, other: Self) -> Self {
        self.zip_map(other, |a, b| bool_to_f32(a != b))
    }

    pub fn cmp_lt(self, other: Self) -> Self {
        self.zip_map(other, |a, b| bool_to_f32(a < b))
    }

    pub fn cmp_le(self, other: Self) -> Self {
        self.zip_map(other, |a, b| bool_to_f32(a <= b))
    }

    pub fn cmp_gt(self, other: Self) -> Self {
        self.zip_map(other, |a, b| bool_to_f32(a > b))
    }

    pub fn cmp_ge(self, other: Self) -> Self {
        self.zip_map(other, |a, b| bool_to_f32(a >= b))
    }

    /// Decodes a packed little-endian RGBA8 word (`0xAABBGGRR`) into normalized channels.
    pub fn from_rgba8_word(word: u32) -> Self {
        let [r, g, b, a] = word_to_rgba8(word);
        Self([r, g, b, a].map(|c| c as f32 / 255.0))
    }

    /// Quantizes normalized channels to bytes.
    ///
    /// Exactly `1.0` maps to 255; everything else is `floor(v * 256)` saturated to the byte range,
    /// which keeps the 256 buckets equally wide.
    pub fn to_rgba8(self) -> [u8; 4] {
        self.0.map(|v| {
            if v == 1.0 {
                255
            } else {
                (v * 256.0).floor().clamp(0.0, 255.0) as u8
            }
        })
    }
}

fn bool_to_f32(b: bool) -> f32 {
    if b {
        1.0
    } else {
        0.0
    }
}

impl Index<usize> for Vec4 {
    type Output = f32;

    fn index(&self, index: usize) -> &f32 {
        &self.0[index]
    }
}

impl IndexMut<usize> for Vec4 {
    fn index_mut(&mut self, index: usize) -> &mut f32 {
        &mut self.0[index]
    }
}

impl From<[f32; 4]> for Vec4 {
    fn from(v: [f32; 4]) -> Self {
        Self(v)
    }
}

impl Neg for Vec4 {
    type Output = Self;

    fn neg(self) -> Self {
        self.map(|v| -v)
    }
}

macro_rules! impl_binop {
    ($trait:ident, $method:ident, $op:tt) => {
        impl $trait for Vec4 {
            type Output = Self;

            fn $method(self, rhs: Self) -> Self {
                self.zip_map(rhs, |a, b| a $op b)
            }
        }

        impl $trait<f32> for Vec4 {
            type Output = Self;

            fn $method(self, rhs: f32) -> Self {
                self.map(|a| a $op rhs)
            }
        }
    };
}

impl_binop!(Add, add, +);
impl_binop!(Sub, sub, -);
impl_binop!(Mul, mul, *);
impl_binop!(Div, div, /);

impl fmt::Display for Vec4 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {}, {})",
            self.0[0], self.0[1], self.0[2], self.0[3]
        )
    }
}

#[cfg(test)]
mod tests {
    use super::Vec4;
    use pretty_assertions::assert_eq;

    #[test]
    fn fract_is_floor_based() {
        let v = Vec4::new(-0.25, 1.75, -2.0, 0.5).fract();
        assert_eq!(v, Vec4::new(0.75, 0.75, 0.0, 0.5));
    }

    #[test]
    fn comparisons_produce_unit_floats() {
        let a = Vec4::new(1.0, 2.0, 3.0, 4.0);
        let b = Vec4::new(1.0, 3.0, 2.0, 4.0);
        assert_eq!(a.cmp_eq(b), Vec4::new(1.0, 0.0, 0.0, 1.0));
        assert_eq!(a.cmp_ne(b), Vec4::new(0.0, 1.0, 1.0, 0.0));
        assert_eq!(a.cmp_lt(b), Vec4::new(0.0, 1.0, 0.0, 0.0));
        assert_eq!(a.cmp_le(b), Vec4::new(1.0, 1.0, 0.0, 1.0));
        assert_eq!(a.cmp_gt(b), Vec4::new(0.0, 0.0, 1.0, 0.0));
        assert_eq!(a.cmp_ge(b), Vec4::new(1.0, 0.0, 1.0, 1.0));
    }

    #[test]
    fn dot_variants_accumulate_prefixes() {
        let a = Vec4::new(1.0, 2.0, 3.0, 4.0);
        let b = Vec4::new(5.0, 6.0, 7.0, 8.0);
        assert_eq!(a.dot2(b), 17.0);
        assert_eq!(a.dot3(b), 38.0);
        assert_eq!(a.dot4(b), 70.0);
    }

    #[test]
    fn round_goes_away_from_zero() {
        let v = Vec4::new(0.5, -0.5, 1.5, 2.4).round();
        assert_eq!(v, Vec4::new(1.0, -1.0, 2.0, 2.0));
    }

    #[test]
    fn rgba8_quantization_edges() {
        assert_eq!(Vec4::new(1.0, 0.0, 0.5, 0.999).to_rgba8(), [255, 0, 128, 255]);
        assert_eq!(Vec4::new(2.0, -1.0, 0.0, 1.0).to_rgba8(), [255, 0, 0, 255]);
    }

    #[test]
    fn rgba8_word_decodes_little_endian_channels() {
        let v = Vec4::from_rgba8_word(0xff00_80ff);
        assert_eq!(v.r(), 1.0);
        assert_eq!(v.g(), 128.0 / 255.0);
        assert_eq!(v.b(), 0.0);
        assert_eq!(v.a(), 1.0);
    }

    #[test]
    fn scalar_rhs_ops_broadcast() {
        let v = Vec4::new(1.0, 2.0, 3.0, 4.0);
        assert_eq!(v * 2.0, Vec4::new(2.0, 4.0, 6.0, 8.0));
        assert_eq!(v - 1.0, Vec4::new(0.0, 1.0, 2.0, 3.0));
        assert_eq!(-v, Vec4::new(-1.0, -2.0, -3.0, -4.0));
    }
}
