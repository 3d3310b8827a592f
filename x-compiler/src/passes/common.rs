//! Shared signature-comparison helpers used by the abstract-class,
//! interface and virtual-method passes — all three need the same notion
//! of "two method signatures are identical".

use x_ast::{FnDecl, MethodDecl, MethodDef};

pub fn fn_decls_equal(a: &FnDecl, b: &FnDecl) -> bool {
    a.return_type == b.return_type && a.args.iter().map(|arg| &arg.ty).eq(b.args.iter().map(|arg| &arg.ty))
}

/// Compares an interface/abstract `MethodDecl` against a concrete
/// `MethodDef`'s signature: access modifier, static-ness, and the
/// underlying `(args, return type)` must all match exactly.
pub fn decl_matches_def(decl: &MethodDecl, def: &MethodDef) -> bool {
    decl.access == def.access
        && decl.is_static == def.is_static
        && fn_decls_equal(&decl.fn_decl, &def.fn_def.decl)
}

pub fn defs_signature_equal(a: &MethodDef, b: &MethodDef) -> bool {
    a.access == b.access && a.is_static == b.is_static && fn_decls_equal(&a.fn_def.decl, &b.fn_def.decl)
}
