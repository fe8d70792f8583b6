//! Language runners
//!
//! Drives the two sandbox phases a language can have: an optional
//! compilation step for compiled languages, and the execution step that
//! runs the program against its stdin. Both phases run inside an
//! [`IsolateBox`](crate::isolate::IsolateBox) owned by the caller.
//!
//! Failures of the compiled or executed program itself are never errors
//! here; they come back as a [`CompileResult`] or
//! [`SandboxOutcome`](crate::isolate::SandboxOutcome). Errors are
//! service faults from the sandbox layer.

pub use crate::runner::compile::{CompileResult, compile};
pub use crate::runner::execute::execute;

mod compile;
mod execute;
