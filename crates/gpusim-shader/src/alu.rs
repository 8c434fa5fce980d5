//! Per-lane arithmetic. Everything here is a pure function of the fetched sources.

use crate::opcode::Opcode;
use gpusim_vec::{fast_rsqrt, Vec4};

/// Result of an arithmetic opcode and the scalar ops it costs beyond write-back.
///
/// `None` for opcodes that need engine state (flow control, derivatives, texturing).
pub(crate) fn evaluate(opcode: Opcode, src: &[Vec4; 3]) -> Option<(Vec4, u64)> {
    let [a, b, c] = *src;
    let result = match opcode {
        Opcode::Abs => a.abs(),
        Opcode::Ceil => a.ceil(),
        Opcode::Flr => a.floor(),
        Opcode::Frc => a.fract(),
        Opcode::I2f => a.map(|v| v as i32 as f32),
        Opcode::Mov => a,
        Opcode::Round => a.round(),
        Opcode::Trunc => a.trunc(),

        Opcode::Rcp => Vec4::splat(1.0 / a.x()),
        Opcode::Rsq => Vec4::splat(fast_rsqrt(a.x())),

        Opcode::Add => a + b,
        Opcode::Sub => a - b,
        Opcode::Mul => a * b,
        Opcode::Div => a / b,
        Opcode::And => a.zip_map(b, |x, y| ((x as i32) & (y as i32)) as f32),
        Opcode::Min => a.min(b),
        Opcode::Max => a.max(b),
        Opcode::Dp2 => return Some((Vec4::splat(a.dot2(b)), 1)),
        Opcode::Dp3 => return Some((Vec4::splat(a.dot3(b)), 2)),
        Opcode::Dp4 => return Some((Vec4::splat(a.dot4(b)), 3)),
        Opcode::Dst => Vec4::new(1.0, a.y() * b.y(), a.z(), b.w()),
        Opcode::Pow => Vec4::splat(a.x().powf(b.x())),
        Opcode::Seq => a.cmp_eq(b),
        Opcode::Sne => a.cmp_ne(b),
        Opcode::Slt => a.cmp_lt(b),
        Opcode::Sle => a.cmp_le(b),
        Opcode::Sgt => a.cmp_gt(b),
        Opcode::Sge => a.cmp_ge(b),

        Opcode::Mad => a * b + c,
        Opcode::Dp2a => Vec4::splat(a.x() * b.x() + a.y() * b.y() + c.x()),

        Opcode::Tex
        | Opcode::Txd
        | Opcode::Txf
        | Opcode::Txl
        | Opcode::Ddx
        | Opcode::Ddy
        | Opcode::If
        | Opcode::Else
        | Opcode::EndIf
        | Opcode::Rep
        | Opcode::EndRep
        | Opcode::Kil
        | Opcode::Unknown(_) => return None,
    };
    Some((result, 0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn eval(opcode: Opcode, a: Vec4, b: Vec4, c: Vec4) -> (Vec4, u64) {
        evaluate(opcode, &[a, b, c]).unwrap()
    }

    #[test]
    fn dot_products_cost_extra_ops() {
        let a = Vec4::new(1.0, 2.0, 3.0, 4.0);
        let b = Vec4::splat(1.0);
        assert_eq!(eval(Opcode::Dp2, a, b, Vec4::ZERO), (Vec4::splat(3.0), 1));
        assert_eq!(eval(Opcode::Dp3, a, b, Vec4::ZERO), (Vec4::splat(6.0), 2));
        assert_eq!(eval(Opcode::Dp4, a, b, Vec4::ZERO), (Vec4::splat(10.0), 3));
        assert_eq!(
            eval(Opcode::Dp2a, a, b, Vec4::splat(0.5)),
            (Vec4::splat(3.5), 0)
        );
    }

    #[test]
    fn integer_flavoured_ops_truncate() {
        let a = Vec4::new(1.9, -1.9, 6.0, 7.5);
        let b = Vec4::new(3.0, 3.0, 3.0, 2.0);
        assert_eq!(
            eval(Opcode::I2f, a, b, Vec4::ZERO).0,
            Vec4::new(1.0, -1.0, 6.0, 7.0)
        );
        assert_eq!(
            eval(Opcode::And, a, b, Vec4::ZERO).0,
            Vec4::new(1.0, 3.0, 2.0, 2.0)
        );
    }

    #[test]
    fn scalar_ops_replicate_x() {
        let a = Vec4::new(4.0, 9.0, 0.0, 0.0);
        let b = Vec4::new(3.0, 0.0, 0.0, 0.0);
        assert_eq!(eval(Opcode::Rcp, a, b, b).0, Vec4::splat(0.25));
        let pow = eval(Opcode::Pow, b, b, b).0;
        assert!((pow.x() - 27.0).abs() < 1e-4);
        assert_eq!(pow, Vec4::splat(pow.y()));
        let rsq = eval(Opcode::Rsq, a, b, b).0;
        assert!((rsq.x() - 0.5).abs() < 1e-2);
        assert_eq!(rsq, Vec4::splat(rsq.w()));
    }

    #[test]
    fn dst_mixes_components() {
        let a = Vec4::new(9.0, 2.0, 3.0, 9.0);
        let b = Vec4::new(9.0, 5.0, 9.0, 7.0);
        assert_eq!(
            eval(Opcode::Dst, a, b, Vec4::ZERO).0,
            Vec4::new(1.0, 10.0, 3.0, 7.0)
        );
    }

    #[test]
    fn engine_opcodes_are_not_arithmetic() {
        let src = [Vec4::ZERO; 3];
        for op in [Opcode::Tex, Opcode::Ddx, Opcode::If, Opcode::Kil, Opcode::Unknown(0xff)] {
            assert_eq!(evaluate(op, &src), None);
        }
    }
}
