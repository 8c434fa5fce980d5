use crate::error::ProgramError;
use crate::instruction::Instruction;
use crate::limits::{
    CONDITION_BANKS, MAX_ATTRIBUTES, MAX_CONDITION_DEPTH, MAX_REGISTERS, MAX_REPEAT_DEPTH,
};
use crate::opcode::Opcode;
use crate::operand::{Operand, OperandKind};
use gpusim_texture::limits::MAX_TEXTURE_UNITS;
use std::fmt;

enum Block {
    If { pc: usize, else_seen: bool },
    Rep { pc: usize },
}

/// A validated instruction stream.
///
/// Validation runs once here so the engine can assume balanced blocks, bounded nesting, bound
/// texture references and in-range attribute/register/condition ids. Uniform ids are only
/// checked at run time, against the table the caller supplies.
#[derive(Clone, Debug, PartialEq)]
pub struct Program {
    instructions: Vec<Instruction>,
    /// For each `REP`, the pc of its `ENDREP`.
    loop_ends: Vec<Option<usize>>,
}

impl Program {
    pub fn new(instructions: Vec<Instruction>) -> Result<Self, ProgramError> {
        let mut loop_ends = vec![None; instructions.len()];
        let mut blocks: Vec<Block> = Vec::new();
        let mut if_depth = 0usize;
        let mut rep_depth = 0usize;

        for (pc, inst) in instructions.iter().enumerate() {
            check_operands(pc, inst)?;

            let opcode = inst.opcode;
            match opcode {
                Opcode::If => {
                    if_depth += 1;
                    if if_depth > MAX_CONDITION_DEPTH {
                        return Err(ProgramError::NestingTooDeep {
                            pc,
                            opcode,
                            max: MAX_CONDITION_DEPTH,
                        });
                    }
                    blocks.push(Block::If {
                        pc,
                        else_seen: false,
                    });
                }
                Opcode::Else => match blocks.last_mut() {
                    Some(Block::If {
                        else_seen: true, ..
                    }) => {
                        return Err(ProgramError::DuplicateElse { pc })
                    }
                    Some(Block::If { else_seen, .. }) => *else_seen = true,
                    _ => return Err(ProgramError::UnmatchedClose { pc, opcode }),
                },
                Opcode::EndIf => match blocks.last() {
                    Some(Block::If { .. }) => {
                        blocks.pop();
                        if_depth -= 1;
                    }
                    _ => return Err(ProgramError::UnmatchedClose { pc, opcode }),
                },
                Opcode::Rep => {
                    rep_depth += 1;
                    if rep_depth > MAX_REPEAT_DEPTH {
                        return Err(ProgramError::NestingTooDeep {
                            pc,
                            opcode,
                            max: MAX_REPEAT_DEPTH,
                        });
                    }
                    blocks.push(Block::Rep { pc });
                }
                Opcode::EndRep => match blocks.last() {
                    Some(&Block::Rep { pc: start }) => {
                        loop_ends[start] = Some(pc);
                        blocks.pop();
                        rep_depth -= 1;
                    }
                    _ => return Err(ProgramError::UnmatchedClose { pc, opcode }),
                },
                _ => {}
            }
        }

        if let Some(open) = blocks.last() {
            let (pc, opcode) = match *open {
                Block::Rep { pc } => (pc, Opcode::Rep),
                Block::If { pc, .. } => (pc, Opcode::If),
            };
            return Err(ProgramError::Unclosed { pc, opcode });
        }

        Ok(Self {
            instructions,
            loop_ends,
        })
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn get(&self, pc: usize) -> Option<&Instruction> {
        self.instructions.get(pc)
    }

    /// The `ENDREP` closing the `REP` at `pc`.
    pub fn loop_end(&self, pc: usize) -> Option<usize> {
        self.loop_ends.get(pc).copied().flatten()
    }
}

fn check_operands(pc: usize, inst: &Instruction) -> Result<(), ProgramError> {
    let opcode = inst.opcode;

    if opcode.is_texture() {
        let Some(tex) = inst.texture else {
            return Err(ProgramError::MissingTexture { pc, opcode });
        };
        if usize::from(tex.unit) >= MAX_TEXTURE_UNITS {
            return Err(ProgramError::TextureUnitOutOfRange {
                pc,
                opcode,
                unit: tex.unit,
                max: MAX_TEXTURE_UNITS,
            });
        }
    }

    if matches!(opcode, Opcode::If | Opcode::Kil)
        && inst.src[0].kind != OperandKind::ConditionCode
    {
        return Err(ProgramError::MissingCondition { pc, opcode });
    }

    match inst.dst.kind {
        OperandKind::None | OperandKind::Color => {}
        OperandKind::Attribute => check_id(pc, "attribute", inst.dst.id, MAX_ATTRIBUTES)?,
        // Negative register destinations are discarded.
        OperandKind::Register if inst.dst.id < 0 => {}
        OperandKind::Register => check_id(pc, "register", inst.dst.id, MAX_REGISTERS)?,
        kind @ (OperandKind::Uniform | OperandKind::ConditionCode | OperandKind::Constant) => {
            return Err(ProgramError::MisplacedOperand { pc, kind })
        }
    }

    for src in inst.sources() {
        check_source(pc, src)?;
    }
    Ok(())
}

fn check_source(pc: usize, src: &Operand) -> Result<(), ProgramError> {
    match src.kind {
        OperandKind::Attribute => check_id(pc, "attribute", src.id, MAX_ATTRIBUTES),
        OperandKind::Register => check_id(pc, "register", src.id, MAX_REGISTERS),
        OperandKind::ConditionCode => check_id(pc, "condition bank", src.id, CONDITION_BANKS),
        OperandKind::Uniform if src.id < 0 => Err(ProgramError::OperandOutOfRange {
            pc,
            what: "uniform",
            id: src.id,
            max: usize::MAX,
        }),
        OperandKind::Uniform | OperandKind::Constant | OperandKind::None => Ok(()),
        kind @ OperandKind::Color => Err(ProgramError::MisplacedOperand { pc, kind }),
    }
}

fn check_id(pc: usize, what: &'static str, id: i32, max: usize) -> Result<(), ProgramError> {
    match usize::try_from(id) {
        Ok(idx) if idx < max => Ok(()),
        _ => Err(ProgramError::OperandOutOfRange { pc, what, id, max }),
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut indent = 0usize;
        for (pc, inst) in self.instructions.iter().enumerate() {
            if matches!(inst.opcode, Opcode::Else | Opcode::EndIf | Opcode::EndRep) {
                indent = indent.saturating_sub(1);
            }
            writeln!(f, "{pc:4}: {:width$}{inst}", "", width = indent * 2)?;
            if matches!(inst.opcode, Opcode::If | Opcode::Else | Opcode::Rep) {
                indent += 1;
            }
        }
        Ok(())
    }
}
