//! Semantic passes and name mangling for the X language middle end.
//!
//! This crate owns everything between a parsed [`x_ast::Program`] and a
//! lowered module ready for JIT execution: the five fixed-order passes in
//! [`passes`], the cross-pass [`CompilerRuntime`] state they share, the
//! [`mangler`] they and the lowerer both call into, and the [`error`]
//! taxonomy each pass raises from.

pub mod compiler_runtime;
pub mod error;
pub mod lower;
pub mod mangler;
pub mod passes;

pub use compiler_runtime::CompilerRuntime;
pub use error::{
    AbstractClassError, CompileError, InterfaceError, LoweringError, ParseError, RuntimeAbort,
    TypeError, VirtualMethodError,
};
pub use lower::{GcMetaEntry, GcNodeKind, Lowerer};

/// Runs the five semantic passes over `program` in the fixed order the
/// pipeline requires, mutating it in place (const-folding rewrites nodes,
/// type inference fills in every `Expr::ty` cell) and returning the
/// accumulated cross-pass runtime state the lowerer consumes next.
///
/// No pass recovers from another's error: the first failure aborts the
/// whole compile and no partial codegen is ever produced.
pub fn run_passes(program: &mut x_ast::Program) -> Result<CompilerRuntime, CompileError> {
    log::debug!("const-string folding {} classes, {} funcs", program.classes.len(), program.funcs.len());
    passes::const_fold::run(program);

    log::debug!("checking abstract classes");
    passes::abstract_check::run(program)?;

    let mut rt = CompilerRuntime::new();
    log::debug!("checking interfaces");
    passes::interface_check::run(program, &mut rt)?;
    log::debug!("discovering virtual methods");
    passes::virtual_methods::run(program, &mut rt)?;
    log::debug!("inferring and checking types");
    passes::type_inferrer::run(program, &rt)?;

    Ok(rt)
}
