//! Shared cross-pass state (§3 "Global mutable state" design note),
//! grounded on the donor's `compiler_runtime.h`. Threaded explicitly as a
//! single owned value through every pass and the lowerer — there is no
//! process-wide static anywhere in this crate.
//!
//! One field present in the donor (`classPointerLists`, keyed by a
//! compile-time class id) is intentionally dropped here: the GC
//! pointer-layout metadata it duplicated is built once, directly on each
//! class's lowered `ClassDecl`, by the lowerer's decl phase (see
//! `x_compiler::lower::ClassDecl::meta`). Keeping one copy avoids two
//! tables disagreeing about a class's pointer layout.

use std::collections::{BTreeMap, HashMap, HashSet};

use x_ast::MethodDecl;

#[derive(Debug, Default)]
pub struct CompilerRuntime {
    /// `ancestor class name -> set of method names overridden by some
    /// descendant` (§4.4).
    pub virtual_methods: HashMap<String, HashSet<String>>,
    /// `interface name -> { method name -> declaration }`, transitively
    /// merged through parent interfaces (§4.3).
    pub interface_methods: HashMap<String, BTreeMap<String, MethodDecl>>,
    /// `class name -> transitively closed set of interfaces it implements`
    /// (§4.3, §8 "transitively closed" invariant).
    pub implemented_interfaces: HashMap<String, HashSet<String>>,
    /// `class name -> transitively closed set of ancestor class names`.
    pub extended_classes: HashMap<String, HashSet<String>>,
}

impl CompilerRuntime {
    pub fn new() -> Self {
        Self::default()
    }
}
