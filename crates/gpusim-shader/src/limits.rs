//! Fixed sizes of the SIMD core.
//!
//! The engine sizes its per-lane scratch state from these at construction, and [`crate::Program`]
//! rejects instruction streams whose nesting would exceed the stack depths.

/// Lanes processed per [`crate::ShaderEngine::run`].
pub const MAX_LANES: usize = 16;

/// Lanes per derivative quad, laid out as
///
/// ```text
/// 0 1
/// 2 3
/// ```
pub const QUAD_SIZE: usize = 4;

/// Attribute slots per lane.
pub const MAX_ATTRIBUTES: usize = 16;

/// General-purpose registers per lane.
pub const MAX_REGISTERS: usize = 32;

/// Condition-code banks (`CC0`, `CC1`) per lane.
pub const CONDITION_BANKS: usize = 2;

/// Maximum `IF` nesting.
pub const MAX_CONDITION_DEPTH: usize = 16;

/// Maximum `REP` nesting.
pub const MAX_REPEAT_DEPTH: usize = 8;

/// Attribute written by `color` destinations in both shader modes.
pub const COLOR_ATTRIBUTE: usize = 1;
