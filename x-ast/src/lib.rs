//! AST and value-type definitions for the X language middle end.
//!
//! This crate has no LLVM dependency: it is consumed by `x-compiler`'s
//! passes and lowerer, and is the only crate in the workspace a future
//! lexer/parser frontend would need to target.

pub mod ast;
pub mod builder;
pub mod mangler;
pub mod types;

pub use ast::*;
pub use mangler::Mangler;
pub use types::*;
