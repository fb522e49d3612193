//! Engine limits
//!
//! This module defines the hard limits enforced by the projection engine:
//!
//! | Limit | Value | Constant |
//! |-------|-------|----------|
//! | Max shape nesting depth | 16 levels | [`MAX_SHAPE_DEPTH`] |
//! | Max accessors per shape | 256 | [`MAX_ACCESSORS_PER_SHAPE`] |
//! | Max field path segments | 32 | [`MAX_PATH_SEGMENTS`] |
//! | Max computed-accessor args | 16 | [`MAX_EVAL_ARGS`] |

/// Maximum nesting depth of a shape descriptor tree (16 levels)
///
/// A shape whose nested shapes exceed this depth is rejected at build time.
/// This is the guard against unbounded self-nesting: shape graphs must be
/// acyclic, and a shape that reaches its own name again can only do so by
/// growing past this bound.
pub const MAX_SHAPE_DEPTH: u32 = 16;

/// Maximum number of accessors a single shape may declare (256)
///
/// Shapes are partial views; a shape this wide almost certainly wants the
/// whole aggregate instead. Enforced at descriptor build time.
pub const MAX_ACCESSORS_PER_SHAPE: usize = 256;

/// Maximum field path length in segments (32 segments)
///
/// Limits the depth of paths like `a.b.c.d...` to keep path traversal and
/// parse costs bounded. Enforced when parsing a path from a string.
pub const MAX_PATH_SEGMENTS: usize = 32;

/// Maximum invocation arguments forwarded to a computed accessor (16)
///
/// The ordered argument list handed to the expression evaluator is capped;
/// longer lists are rejected at the accessor call.
pub const MAX_EVAL_ARGS: usize = 16;
