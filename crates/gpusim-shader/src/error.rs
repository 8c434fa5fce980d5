use crate::opcode::Opcode;
use crate::operand::OperandKind;
use thiserror::Error;

/// Structural problems found once when a [`crate::Program`] is built.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProgramError {
    #[error("{opcode} at pc {pc} has no matching opening instruction")]
    UnmatchedClose { pc: usize, opcode: Opcode },

    #[error("{opcode} at pc {pc} is never closed")]
    Unclosed { pc: usize, opcode: Opcode },

    #[error("second ELSE at pc {pc} in the same IF block")]
    DuplicateElse { pc: usize },

    #[error("{opcode} at pc {pc} nests deeper than {max}")]
    NestingTooDeep { pc: usize, opcode: Opcode, max: usize },

    #[error("{opcode} at pc {pc} has no texture binding")]
    MissingTexture { pc: usize, opcode: Opcode },

    #[error("{opcode} at pc {pc} uses texture unit {unit} (max {max})")]
    TextureUnitOutOfRange {
        pc: usize,
        opcode: Opcode,
        unit: u8,
        max: usize,
    },

    #[error("{what} id {id} at pc {pc} out of range (max {max})")]
    OperandOutOfRange {
        pc: usize,
        what: &'static str,
        id: i32,
        max: usize,
    },

    #[error("{kind:?} operand not allowed in this position at pc {pc}")]
    MisplacedOperand { pc: usize, kind: OperandKind },

    #[error("{opcode} at pc {pc} needs a condition-code source")]
    MissingCondition { pc: usize, opcode: Opcode },
}

/// Errors returned by [`crate::ShaderEngine::run`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ShaderError {
    #[error("{lanes} lanes exceed the SIMD width of {max}")]
    TooManyLanes { lanes: usize, max: usize },

    #[error("uniform {id} read at pc {pc} but only {len} uniforms were supplied")]
    UniformOutOfRange { pc: usize, id: i32, len: usize },

    #[error("attribute {id} out of range at pc {pc}")]
    AttributeOutOfRange { pc: usize, id: i32 },

    #[error("register {id} out of range at pc {pc}")]
    RegisterOutOfRange { pc: usize, id: i32 },

    #[error("repeat stack exceeded {max} frames at pc {pc}")]
    RepeatOverflow { pc: usize, max: usize },

    #[error("condition stack exceeded {max} entries at pc {pc}")]
    ConditionOverflow { pc: usize, max: usize },
}
