//! Lockstep SIMD execution.
//!
//! Every instruction runs in two phases across all executing lanes: all sources are fetched first,
//! then each lane computes and writes back in index order. An instruction that overwrites a
//! register its neighbours read (for `DDX`, `DDY` or `TEX` gradients) therefore always sees the
//! pre-instruction values.
//!
//! Lanes carry a stack of `IF` predicates; a lane whose predicate is false still walks the
//! instruction stream but neither retires nor writes back. `REP` loops are shared by all lanes and
//! driven by the loop leader, the lowest executing lane.

use crate::alu;
use crate::error::ShaderError;
use crate::instruction::{Instruction, Modifiers};
use crate::lane::{Lane, LaneMask, ShaderMode};
use crate::limits::{
    CONDITION_BANKS, MAX_ATTRIBUTES, MAX_CONDITION_DEPTH, MAX_LANES, MAX_REGISTERS,
    MAX_REPEAT_DEPTH, QUAD_SIZE,
};
use crate::opcode::Opcode;
use crate::operand::{Operand, OperandKind};
use crate::program::Program;
use gpusim_texture::{Lod, SampleRequest, TextureMemory, TextureTarget, TextureUnit};
use gpusim_vec::Vec4;
use tracing::{debug, trace, warn};

/// Totals accumulated over every run of an engine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ShaderStats {
    /// Instructions retired, counted once per lane whose predicate was true.
    pub instructions: u64,
    /// Component-level operations: one per written component, plus the extra cost of dot
    /// products and flow control.
    pub scalar_ops: u64,
}

/// Outcome of a single [`ShaderEngine::run`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub instructions: u64,
    pub scalar_ops: u64,
    /// Enabled lanes.
    pub lanes: usize,
    /// Disabled lanes that executed to keep their quad complete.
    pub helper_lanes: usize,
    /// Enabled lanes whose `killed` flag is set after the run.
    pub killed: usize,
}

/// Everything a run reads besides the lanes themselves.
pub struct RunParams<'a> {
    pub program: &'a Program,
    pub uniforms: &'a [Vec4],
    pub enabled: LaneMask,
    pub mode: ShaderMode,
    pub textures: &'a mut TextureUnit,
    pub memory: &'a mut dyn TextureMemory,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
struct ConditionCode {
    negative: Vec4,
    zero: Vec4,
}

#[derive(Clone, Copy, Debug)]
struct ConditionStack {
    entries: [bool; MAX_CONDITION_DEPTH],
    len: usize,
}

impl ConditionStack {
    const fn new() -> Self {
        Self {
            entries: [false; MAX_CONDITION_DEPTH],
            len: 0,
        }
    }

    /// Current predicate; `true` outside any `IF`.
    fn top(&self) -> bool {
        self.len == 0 || self.entries[self.len - 1]
    }

    fn parent(&self) -> bool {
        self.len < 2 || self.entries[self.len - 2]
    }

    fn push(&mut self, value: bool) -> bool {
        if self.len == MAX_CONDITION_DEPTH {
            return false;
        }
        self.entries[self.len] = value;
        self.len += 1;
        true
    }

    fn replace_top(&mut self, value: bool) {
        if self.len > 0 {
            self.entries[self.len - 1] = value;
        }
    }

    fn pop(&mut self) {
        self.len = self.len.saturating_sub(1);
    }
}

/// Scratch copy of a lane for the duration of one run.
#[derive(Clone, Copy, Debug)]
struct LaneState {
    attributes: [Vec4; MAX_ATTRIBUTES],
    registers: [Vec4; MAX_REGISTERS],
    condition_codes: [ConditionCode; CONDITION_BANKS],
    conditions: ConditionStack,
    killed: bool,
}

impl LaneState {
    const fn new() -> Self {
        Self {
            attributes: [Vec4::ZERO; MAX_ATTRIBUTES],
            registers: [Vec4::ZERO; MAX_REGISTERS],
            condition_codes: [ConditionCode {
                negative: Vec4::ZERO,
                zero: Vec4::ZERO,
            }; CONDITION_BANKS],
            conditions: ConditionStack::new(),
            killed: false,
        }
    }

    fn reset(&mut self, lane: Option<&Lane>) {
        *self = Self::new();
        if let Some(lane) = lane {
            self.attributes = lane.attributes;
            self.killed = lane.killed;
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct RepeatFrame {
    return_pc: usize,
    iteration: i32,
    total: i32,
}

#[derive(Clone, Copy, Debug)]
enum Axis {
    X,
    Y,
}

pub struct ShaderEngine {
    lanes: Vec<LaneState>,
    repeats: Vec<RepeatFrame>,
    stats: ShaderStats,
}

impl Default for ShaderEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ShaderEngine {
    pub fn new() -> Self {
        Self {
            lanes: vec![LaneState::new(); MAX_LANES],
            repeats: Vec::with_capacity(MAX_REPEAT_DEPTH),
            stats: ShaderStats::default(),
        }
    }

    pub fn stats(&self) -> ShaderStats {
        self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = ShaderStats::default();
    }

    /// Runs `params.program` over `lanes`.
    ///
    /// Lane `i` takes part when bit `i` of `params.enabled` is set. In fragment mode the other
    /// lanes of a partially enabled quad also execute, on scratch state only. On return, enabled
    /// lanes hold their final attributes and `killed` flag; disabled lanes are untouched.
    pub fn run(
        &mut self,
        lanes: &mut [Lane],
        params: RunParams<'_>,
    ) -> Result<RunSummary, ShaderError> {
        let RunParams {
            program,
            uniforms,
            enabled,
            mode,
            textures,
            memory,
        } = params;

        if lanes.len() > MAX_LANES {
            return Err(ShaderError::TooManyLanes {
                lanes: lanes.len(),
                max: MAX_LANES,
            });
        }

        let present = LaneMask::first(lanes.len());
        let enabled = LaneMask(enabled.0 & present.0);
        let executing = if mode.uses_helper_lanes() {
            LaneMask(enabled.quads().0 & present.0)
        } else {
            enabled
        };

        for (idx, state) in self.lanes.iter_mut().enumerate() {
            state.reset(lanes.get(idx));
        }
        self.repeats.clear();

        let mut summary = RunSummary {
            lanes: enabled.count(),
            helper_lanes: executing.count() - enabled.count(),
            ..RunSummary::default()
        };

        let Some(leader) = executing.lanes().next() else {
            debug!(pcs = program.len(), "no enabled lanes; skipping run");
            return Ok(summary);
        };

        let mut pc = 0;
        while let Some(inst) = program.get(pc) {
            if let Opcode::Unknown(raw) = inst.opcode {
                warn!(pc, opcode = raw, "unknown shader opcode; skipping");
                pc += 1;
                continue;
            }
            trace!(pc, %inst, "execute");

            let mut sources = [[Vec4::ZERO; 3]; MAX_LANES];
            for lane in executing.lanes() {
                sources[lane] = self.fetch(lane, inst, uniforms, pc)?;
            }
            let firsts = sources.map(|src| src[0]);

            let condition_known = match inst.opcode {
                Opcode::If | Opcode::Kil => {
                    let test = inst.src[0].cc_test;
                    let known = test.evaluate(Vec4::ZERO, Vec4::ZERO).is_some();
                    if !known {
                        warn!(pc, test = ?test, "unknown condition test");
                    }
                    known
                }
                _ => true,
            };

            let mut jump = None;
            for lane in executing.lanes() {
                let [src0, src1, src2] = sources[lane];
                let active = self.lanes[lane].conditions.top();
                if active {
                    summary.instructions += 1;
                }

                let value = match inst.opcode {
                    Opcode::If => {
                        let test = condition_known
                            && inst.src[0].cc_test.evaluate(src0, src1) == Some(true);
                        let pushed = active && (test || !condition_known);
                        if !self.lanes[lane].conditions.push(pushed) {
                            return Err(ShaderError::ConditionOverflow {
                                pc,
                                max: MAX_CONDITION_DEPTH,
                            });
                        }
                        summary.scalar_ops += 1;
                        continue;
                    }
                    Opcode::Else => {
                        let conditions = &mut self.lanes[lane].conditions;
                        let value = conditions.parent() && !conditions.top();
                        conditions.replace_top(value);
                        summary.scalar_ops += 1;
                        continue;
                    }
                    Opcode::EndIf => {
                        self.lanes[lane].conditions.pop();
                        summary.scalar_ops += 1;
                        continue;
                    }
                    Opcode::Rep | Opcode::EndRep => {
                        if lane == leader {
                            jump = self.repeat(pc, inst.opcode, src0, program)?;
                            summary.scalar_ops += 1;
                        }
                        continue;
                    }
                    Opcode::Kil => {
                        if active && inst.src[0].cc_test.evaluate(src0, src1) == Some(true) {
                            self.lanes[lane].killed = true;
                        }
                        continue;
                    }
                    _ if !active => continue,
                    Opcode::Ddx => quad_delta(&firsts, executing, lane, Axis::X),
                    Opcode::Ddy => quad_delta(&firsts, executing, lane, Axis::Y),
                    Opcode::Tex | Opcode::Txd | Opcode::Txf | Opcode::Txl => {
                        let Some(tex) = inst.texture else {
                            continue;
                        };
                        let unit = usize::from(tex.unit);
                        let lod = match inst.opcode {
                            Opcode::Tex => Lod::Auto {
                                ddx: quad_delta(&firsts, executing, lane, Axis::X),
                                ddy: quad_delta(&firsts, executing, lane, Axis::Y),
                            },
                            Opcode::Txd => Lod::Auto {
                                ddx: src1,
                                ddy: src2,
                            },
                            Opcode::Txl => Lod::Explicit(src0.w()),
                            _ => {
                                // Texel fetch: integer coordinates, level in w.
                                let texel = if tex.target == TextureTarget::Cube {
                                    warn!(pc, unit, "texel fetch from a cube map; returning black");
                                    Vec4::TRANSPARENT_BLACK
                                } else {
                                    textures.fetch(memory, unit, src0, src0.w() as i32)
                                };
                                summary.scalar_ops +=
                                    write_back(&mut self.lanes[lane], inst, texel, mode, pc)?;
                                continue;
                            }
                        };
                        let request = SampleRequest {
                            coord: src0,
                            lod,
                            target: tex.target,
                            unit,
                        };
                        textures.sample(memory, &request)
                    }
                    opcode => {
                        let Some((value, cost)) = alu::evaluate(opcode, &sources[lane]) else {
                            continue;
                        };
                        summary.scalar_ops += cost;
                        value
                    }
                };

                summary.scalar_ops += write_back(&mut self.lanes[lane], inst, value, mode, pc)?;
            }

            pc = match jump {
                Some(target) => target + 1,
                None => pc + 1,
            };
        }

        for lane in enabled.lanes() {
            let state = &self.lanes[lane];
            if let Some(out) = lanes.get_mut(lane) {
                out.attributes = state.attributes;
                out.killed = state.killed;
                if out.killed {
                    summary.killed += 1;
                }
            }
        }

        self.stats.instructions += summary.instructions;
        self.stats.scalar_ops += summary.scalar_ops;
        debug!(
            instructions = summary.instructions,
            scalar_ops = summary.scalar_ops,
            lanes = summary.lanes,
            helpers = summary.helper_lanes,
            killed = summary.killed,
            "shader run complete"
        );
        Ok(summary)
    }

    fn fetch(
        &self,
        lane: usize,
        inst: &Instruction,
        uniforms: &[Vec4],
        pc: usize,
    ) -> Result<[Vec4; 3], ShaderError> {
        let state = &self.lanes[lane];
        let mut out = [Vec4::ZERO; 3];
        for (slot, src) in inst.src.iter().enumerate() {
            match src.kind {
                OperandKind::None => break,
                // A condition-code operand always lands in slots 0 and 1.
                OperandKind::ConditionCode => {
                    let cc = index(src.id)
                        .and_then(|bank| state.condition_codes.get(bank))
                        .copied()
                        .unwrap_or_default();
                    out[0] = modify(src, src.cc_swizzle.apply(cc.negative));
                    out[1] = modify(src, src.cc_swizzle.apply(cc.zero));
                }
                _ => {
                    let raw = read_source(state, src, uniforms, pc)?;
                    out[slot] = modify(src, src.swizzle.apply(raw));
                }
            }
        }
        Ok(out)
    }

    /// Advances the repeat stack. Returns the pc to continue after, if control transfers.
    fn repeat(
        &mut self,
        pc: usize,
        opcode: Opcode,
        count: Vec4,
        program: &Program,
    ) -> Result<Option<usize>, ShaderError> {
        if opcode == Opcode::Rep {
            let total = count.x().trunc() as i32;
            if total <= 0 {
                trace!(pc, total, "empty repeat; skipping body");
                return Ok(program.loop_end(pc));
            }
            if self.repeats.len() == MAX_REPEAT_DEPTH {
                return Err(ShaderError::RepeatOverflow {
                    pc,
                    max: MAX_REPEAT_DEPTH,
                });
            }
            self.repeats.push(RepeatFrame {
                return_pc: pc,
                iteration: 0,
                total,
            });
            return Ok(None);
        }

        let Some(frame) = self.repeats.last_mut() else {
            warn!(pc, "ENDREP outside a loop");
            return Ok(None);
        };
        frame.iteration += 1;
        if frame.iteration == frame.total {
            self.repeats.pop();
            Ok(None)
        } else {
            Ok(Some(frame.return_pc))
        }
    }
}

fn index(id: i32) -> Option<usize> {
    usize::try_from(id).ok()
}

fn read_source(
    state: &LaneState,
    src: &Operand,
    uniforms: &[Vec4],
    pc: usize,
) -> Result<Vec4, ShaderError> {
    let id = src.id;
    match src.kind {
        OperandKind::Attribute => index(id)
            .and_then(|i| state.attributes.get(i))
            .copied()
            .ok_or(ShaderError::AttributeOutOfRange { pc, id }),
        OperandKind::Uniform => index(id)
            .and_then(|i| uniforms.get(i))
            .copied()
            .ok_or(ShaderError::UniformOutOfRange {
                pc,
                id,
                len: uniforms.len(),
            }),
        OperandKind::Register => index(id)
            .and_then(|i| state.registers.get(i))
            .copied()
            .ok_or(ShaderError::RegisterOutOfRange { pc, id }),
        OperandKind::Constant => Ok(src.value),
        OperandKind::None | OperandKind::ConditionCode | OperandKind::Color => Ok(Vec4::ZERO),
    }
}

/// Negate, then absolute value.
fn modify(src: &Operand, v: Vec4) -> Vec4 {
    let v = if src.negate { -v } else { v };
    if src.abs {
        v.abs()
    } else {
        v
    }
}

fn flag(b: bool) -> f32 {
    if b {
        1.0
    } else {
        0.0
    }
}

/// Stores `value` through the destination mask and returns the scalar ops spent.
fn write_back(
    state: &mut LaneState,
    inst: &Instruction,
    value: Vec4,
    mode: ShaderMode,
    pc: usize,
) -> Result<u64, ShaderError> {
    let dst = &inst.dst;
    let mut target = match dst.kind {
        OperandKind::Attribute => Some(
            index(dst.id)
                .and_then(|i| state.attributes.get_mut(i))
                .ok_or(ShaderError::AttributeOutOfRange { pc, id: dst.id })?,
        ),
        OperandKind::Register if dst.id < 0 => None,
        OperandKind::Register => Some(
            index(dst.id)
                .and_then(|i| state.registers.get_mut(i))
                .ok_or(ShaderError::RegisterOutOfRange { pc, id: dst.id })?,
        ),
        OperandKind::Color => state.attributes.get_mut(mode.color_attribute()),
        OperandKind::None
        | OperandKind::Uniform
        | OperandKind::ConditionCode
        | OperandKind::Constant => return Ok(0),
    };

    let bank = inst.modifiers.capture_bank();
    let mut ops = 0;
    for c in dst.mask.components() {
        let raw = value[c];
        let stored = if inst.modifiers.contains(Modifiers::SATURATE) {
            raw.clamp(0.0, 1.0)
        } else if inst.modifiers.contains(Modifiers::SIGNED_SATURATE) {
            raw.clamp(-1.0, 1.0)
        } else {
            raw
        };
        if let Some(cc) = bank.and_then(|b| state.condition_codes.get_mut(b)) {
            cc.negative[c] = flag(raw < 0.0);
            cc.zero[c] = flag(raw == 0.0);
        }
        if let Some(target) = target.as_deref_mut() {
            target[c] = stored;
        }
        ops += 1;
    }
    Ok(ops)
}

/// Difference of `values` across the lane's quad along `axis`.
///
/// Lanes are laid out `0 1 / 2 3`; both lanes of a row (X) or column (Y) share one difference.
/// When either lane of the pair is not executing the difference is zero.
fn quad_delta(values: &[Vec4; MAX_LANES], executing: LaneMask, lane: usize, axis: Axis) -> Vec4 {
    let corner = lane % QUAD_SIZE;
    let base = lane - corner;
    let (from, to) = match axis {
        Axis::X => (base + (corner & 2), base + (corner & 2) + 1),
        Axis::Y => (base + (corner & 1), base + (corner & 1) + 2),
    };
    if executing.contains(from) && executing.contains(to) {
        values[to] - values[from]
    } else {
        Vec4::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn condition_stack_defaults_to_true() {
        let mut stack = ConditionStack::new();
        assert!(stack.top());
        assert!(stack.parent());
        assert!(stack.push(false));
        assert!(!stack.top());
        assert!(stack.parent());
        stack.replace_top(true);
        assert!(stack.top());
        stack.pop();
        stack.pop();
        assert!(stack.top());
    }

    #[test]
    fn condition_stack_is_bounded() {
        let mut stack = ConditionStack::new();
        for _ in 0..MAX_CONDITION_DEPTH {
            assert!(stack.push(true));
        }
        assert!(!stack.push(true));
    }

    #[test]
    fn quad_delta_pairs() {
        let mut values = [Vec4::ZERO; MAX_LANES];
        for (i, v) in values.iter_mut().enumerate() {
            *v = Vec4::splat((i * i) as f32);
        }
        let all = LaneMask::ALL;
        // Quad 1: lanes 4..8 hold 16, 25, 36, 49.
        assert_eq!(quad_delta(&values, all, 4, Axis::X), Vec4::splat(9.0));
        assert_eq!(quad_delta(&values, all, 5, Axis::X), Vec4::splat(9.0));
        assert_eq!(quad_delta(&values, all, 6, Axis::X), Vec4::splat(13.0));
        assert_eq!(quad_delta(&values, all, 7, Axis::Y), Vec4::splat(24.0));
        assert_eq!(quad_delta(&values, all, 5, Axis::Y), Vec4::splat(24.0));
        assert_eq!(quad_delta(&values, all, 4, Axis::Y), Vec4::splat(20.0));

        let partial = LaneMask::first(6);
        assert_eq!(quad_delta(&values, partial, 4, Axis::Y), Vec4::ZERO);
        assert_eq!(quad_delta(&values, partial, 4, Axis::X), Vec4::splat(9.0));
    }

    #[test]
    fn write_back_masks_saturates_and_captures() {
        let mut state = LaneState::new();
        let inst = Instruction::new(Opcode::Mov)
            .dst(Operand::register(3).mask(crate::operand::WriteMask::XY))
            .modifiers(Modifiers::SATURATE | Modifiers::CC1);
        let ops = write_back(
            &mut state,
            &inst,
            Vec4::new(-2.0, 0.0, 5.0, 5.0),
            ShaderMode::Fragment,
            0,
        )
        .unwrap();
        assert_eq!(ops, 2);
        assert_eq!(state.registers[3], Vec4::ZERO);
        assert_eq!(state.condition_codes[1].negative, Vec4::new(1.0, 0.0, 0.0, 0.0));
        assert_eq!(state.condition_codes[1].zero, Vec4::new(0.0, 1.0, 0.0, 0.0));
        assert_eq!(state.condition_codes[0], ConditionCode::default());
    }

    #[test]
    fn discarded_destination_still_captures() {
        let mut state = LaneState::new();
        let inst = Instruction::new(Opcode::Mov)
            .dst(Operand::register(-1))
            .modifiers(Modifiers::CC);
        let ops = write_back(&mut state, &inst, Vec4::splat(-1.0), ShaderMode::Vertex, 0).unwrap();
        assert_eq!(ops, 4);
        assert_eq!(state.condition_codes[0].negative, Vec4::ONE);
        assert!(state.registers.iter().all(|r| *r == Vec4::ZERO));
    }
}
