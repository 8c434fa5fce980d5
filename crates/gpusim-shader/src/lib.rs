//! SIMD shader execution engine.
//!
//! A [`Program`] is a validated list of [`Instruction`]s. [`ShaderEngine::run`] executes it in
//! lockstep over up to [`limits::MAX_LANES`] lanes, sampling textures through a
//! [`gpusim_texture::TextureUnit`] for the `TEX` family of opcodes.

#![forbid(unsafe_code)]

mod alu;
mod engine;
mod error;
mod instruction;
mod lane;
pub mod limits;
mod opcode;
mod operand;
mod program;

pub use engine::{RunParams, RunSummary, ShaderEngine, ShaderStats};
pub use error::{ProgramError, ShaderError};
pub use instruction::{Instruction, Modifiers, TextureRef};
pub use lane::{Lane, LaneMask, ShaderMode};
pub use opcode::Opcode;
pub use operand::{CcTest, Operand, OperandKind, Swizzle, WriteMask};
pub use program::Program;
