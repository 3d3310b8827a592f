//! The §7 error taxonomy. Every pass raises exactly one of these kinds;
//! no pass recovers from another's error, and no partial codegen is ever
//! produced (§4.7, §7 propagation rules).

use thiserror::Error;

use x_ast::Type;

/// Surface syntax errors. The lexer/parser are out of scope (spec §1);
/// this variant exists so the taxonomy is complete and so `x-driver` has
/// somewhere to put a frontend's error without inventing a new type.
#[derive(Debug, Error)]
#[error("parse error: {0}")]
pub struct ParseError(pub String);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AbstractClassError {
    #[error("class {0} already exists")]
    ClassAlreadyExists(String),
    #[error("class {0} must be declared abstract")]
    MustBeDeclaredAbstract(String),
    #[error("abstract method {0}::{1} must be implemented")]
    AbstractMethodNotImplemented(String, String),
    #[error("declaration of {class}::{method} must be compatible with abstract class {ancestor}")]
    IncompatibleDeclaration {
        class: String,
        method: String,
        ancestor: String,
    },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("interface method {0}::{1} must be public")]
    MethodMustBePublic(String, String),
    #[error("interface method {0}::{1} must be non-static")]
    MethodMustBeNonStatic(String, String),
    #[error("interface method {interface}::{method} is incompatible with {parent}::{method}")]
    IncompatibleRedeclaration {
        interface: String,
        parent: String,
        method: String,
    },
    #[error("class {class} does not implement {interface}::{method}")]
    NotImplemented {
        class: String,
        interface: String,
        method: String,
    },
    #[error("interface {0} not found")]
    InterfaceNotFound(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum VirtualMethodError {
    #[error("declaration of {class}::{method} must be compatible with {ancestor}::{method}")]
    SignatureMismatch {
        class: String,
        ancestor: String,
        method: String,
    },
}

#[derive(Debug, Error, PartialEq)]
pub enum TypeError {
    #[error("invalid type")]
    InvalidType,
    #[error("call args mismatch")]
    CallArgsMismatch,
    #[error("incompatible types: {expected} and {actual}")]
    IncompatibleTypes { expected: Type, actual: Type },
    #[error("var {0} not found")]
    VarNotFound(String),
    #[error("wrong method call {0}::{1}")]
    WrongMethodCall(String, String),
    #[error("wrong prop access {0}::{1}")]
    WrongPropAccess(String, String),
    #[error("for expression must be array or range")]
    ForExprMustBeArrayOrRange,
    #[error("range start/stop/step argument must be int")]
    RangeArgMustBeInt,
    #[error("class {0} not found")]
    ClassNotFound(String),
    #[error("prop/method {0}::{1} not found")]
    MemberNotFound(String, String),
    #[error("var {0} already exists")]
    VarAlreadyExists(String),
    #[error("prop {0}::{1} already declared")]
    PropAlreadyDeclared(String, String),
    #[error("fn {0} already declared")]
    FnAlreadyDeclared(String),
    #[error("cannot create empty array literal")]
    EmptyArrayLiteral,
    #[error("main fn must return void and take no arguments")]
    InvalidMainFn,
    #[error("{class}::{method} cannot be static")]
    ConstructorCannotBeStatic { class: String, method: String },
    #[error("{class}::{method} must be public")]
    ConstructorMustBePublic { class: String, method: String },
    #[error("{class}::{method} must return void")]
    ConstructorMustReturnVoid { class: String, method: String },
}

/// "Should never fire if inference passed" — guards assumptions the
/// lowerer relies on (§7).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LoweringError {
    #[error("class {0} not found")]
    ClassNotFound(String),
    #[error("invalid object exception")]
    InvalidObject,
    #[error("invalid array exception")]
    InvalidArray,
    #[error("symbol {0} already exists")]
    SymbolAlreadyExists(String),
    #[error("cannot access private property/method {0}::{1}")]
    PrivateAccess(String, String),
    #[error("class {0} cannot be instantiated (abstract)")]
    AbstractInstantiation(String),
    #[error("method {0}::{1} not found")]
    MethodNotFound(String, String),
    #[error("LLVM module verification failed: {0}")]
    VerificationFailed(String),
}

/// Terminates the whole process at runtime; not catchable by any pass.
#[derive(Debug, Error)]
pub enum RuntimeAbort {
    #[error("array index out of range")]
    ArrayIndexOutOfRange,
    #[error("negative array length")]
    NegativeArrayLength,
    #[error("zero range step")]
    ZeroRangeStep,
    #[error("{0}")]
    Die(String),
}

/// The pipeline-level error a single compile can fail with — one variant
/// per pass plus lowering and parsing, matching §4.7's "each pass raises a
/// single, named error kind".
#[derive(Debug, Error)]
pub enum CompileError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    AbstractClass(#[from] AbstractClassError),
    #[error(transparent)]
    Interface(#[from] InterfaceError),
    #[error(transparent)]
    VirtualMethod(#[from] VirtualMethodError),
    #[error(transparent)]
    Type(#[from] TypeError),
    #[error(transparent)]
    Lowering(#[from] LoweringError),
}
