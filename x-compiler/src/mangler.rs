//! Re-exported from `x-ast`: both this crate's lowerer and `x-runtime`'s
//! native functions need the exact same internal-symbol names, so the
//! mangling scheme itself lives in the dependency-free crate both sit on
//! top of.

pub use x_ast::mangler::*;
