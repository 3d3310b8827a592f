//! The driver's own error surface: everything a pass can raise (§7),
//! collapsed alongside the handful of failure modes that only exist at
//! this outer boundary (bad JSON input, a missing JIT symbol, LLVM module
//! verification). `x-cli` wraps this again in `anyhow`, matching the
//! donor's `anyhow` use at its outermost CLI boundary.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DriverError {
    #[error(transparent)]
    Compile(#[from] x_compiler::error::CompileError),
    #[error("LLVM module verification failed: {0}")]
    Verification(String),
    #[error("failed to create JIT execution engine: {0}")]
    Jit(String),
    #[error("function {0} not found in compiled module")]
    FunctionNotFound(String),
    #[error("malformed program input: {0}")]
    Json(#[from] serde_json::Error),
    #[error("could not read input file: {0}")]
    Io(#[from] std::io::Error),
}
