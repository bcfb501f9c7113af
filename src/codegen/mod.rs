//! Assembly emission: the stateful writer plus the fixed runtime prelude
//! and target/assembler glue.
//!
//! This module owns everything that knows what ARM64 instructions look
//! like; the parser module owns what Pascal constructs lower to which
//! instruction sequences.

pub mod emitter;
pub mod platform;
pub mod runtime;

pub use emitter::Emitter;
pub use runtime::{emit_runtime_prelude, RuntimeLabels};
