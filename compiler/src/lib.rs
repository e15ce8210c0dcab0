//! Native back end: lowers an optimized [`compiler_core::Program`] to an
//! object file with Cranelift and links it against the C runtime.

pub mod codegen;
pub mod linker;
pub mod options;
pub mod runtime;

pub use codegen::NativeBackend;
pub use options::{CodegenOptions, OptLevel};
