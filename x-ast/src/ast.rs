//! AST node kinds (§3 Data Model), grounded on `ast.h` of the donor's
//! original implementation. The tree is owned top-down: a `Program` owns
//! its classes/interfaces/funcs/globals, each of which owns its nested
//! expressions and statements through `Box`. There is no separate arena —
//! the whole tree is dropped together when the pipeline that owns it
//! finishes, matching the "AST nodes form a tree owned by the
//! top-statement list" lifecycle note.
//!
//! Every expression node carries a `ty` cell that starts `None` and is
//! filled in by the type inferrer (§4.5); the lowerer (§4.6) only ever
//! reads it, never infers on its own.

use std::cell::RefCell;

use serde::{Deserialize, Serialize};

use crate::types::{AccessModifier, Type};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Inc,
    Dec,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Eq,
    Neq,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expr {
    pub kind: ExprKind,
    /// Populated by the type inferrer; read (never written) downstream.
    pub ty: RefCell<Option<Type>>,
}

impl Expr {
    pub fn new(kind: ExprKind) -> Self {
        Expr {
            kind,
            ty: RefCell::new(None),
        }
    }

    pub fn ty(&self) -> Option<Type> {
        self.ty.borrow().clone()
    }

    pub fn set_ty(&self, ty: Type) {
        *self.ty.borrow_mut() = Some(ty);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExprKind {
    IntLit(i64),
    FloatLit(f64),
    BoolLit(bool),
    StringLit(String),
    /// Non-empty per §4.5; emptiness is rejected by the builder/checker,
    /// never representable as a zero-length literal here.
    ArrayLit(Vec<Expr>),
    Var(String),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
        prefix: bool,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    FetchProp {
        object: Box<Expr>,
        name: String,
    },
    FetchStaticProp {
        class_name: String,
        name: String,
    },
    MethodCall {
        object: Box<Expr>,
        name: String,
        args: Vec<Expr>,
    },
    StaticMethodCall {
        class_name: String,
        name: String,
        args: Vec<Expr>,
    },
    FetchArr {
        array: Box<Expr>,
        index: Box<Expr>,
    },
    New {
        class_name: String,
        args: Vec<Expr>,
    },
    /// A free function call, `foo(1, 2)`.
    Call {
        name: String,
        args: Vec<Expr>,
    },
    Range {
        start: Option<Box<Expr>>,
        stop: Box<Expr>,
        step: Option<Box<Expr>>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stmt {
    pub kind: StmtKind,
}

impl Stmt {
    pub fn new(kind: StmtKind) -> Self {
        Stmt { kind }
    }

    /// Mirrors `Node::isTerminate()`: `return`/`break`/`continue` suppress
    /// an implicit fall-through branch when lowered inside a block.
    pub fn is_terminate(&self) -> bool {
        matches!(
            self.kind,
            StmtKind::Return(_) | StmtKind::Break | StmtKind::Continue
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StmtKind {
    List(Vec<Stmt>),
    Decl {
        name: String,
        ty: Type,
        init: Option<Expr>,
    },
    Assign {
        name: String,
        value: Expr,
    },
    AssignProp {
        object: Expr,
        name: String,
        value: Expr,
    },
    AssignStaticProp {
        class_name: String,
        name: String,
        value: Expr,
    },
    AssignArr {
        array: Expr,
        index: Expr,
        value: Expr,
    },
    AppendArr {
        array: Expr,
        value: Expr,
    },
    If {
        cond: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },
    While {
        cond: Expr,
        body: Box<Stmt>,
    },
    /// `for [idx,] val in iterable`.
    ForIn {
        idx_name: Option<String>,
        val_name: String,
        iterable: Expr,
        body: Box<Stmt>,
    },
    Break,
    Continue,
    Return(Option<Expr>),
    Println(Expr),
    Comment(String),
    /// A call kept for its side effect (e.g. a bare method call statement).
    Expr(Expr),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Arg {
    pub name: String,
    pub ty: Type,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FnDecl {
    pub name: String,
    pub args: Vec<Arg>,
    pub return_type: Type,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FnDef {
    pub decl: FnDecl,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropDecl {
    pub name: String,
    pub ty: Type,
    pub init: Option<Expr>,
    pub access: AccessModifier,
    pub is_static: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodDecl {
    pub fn_decl: FnDecl,
    pub is_abstract: bool,
    pub access: AccessModifier,
    pub is_static: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodDef {
    pub fn_def: FnDef,
    pub access: AccessModifier,
    pub is_static: bool,
}

pub const CONSTRUCTOR_FN_NAME: &str = "construct";
pub const MAIN_FN_NAME: &str = "main";
pub const INIT_FN_NAME: &str = "init";

/// Methods keyed by name, iterated in sorted (declaration-agnostic) order —
/// matches the donor's own `std::map<std::string, MethodDefNode*>`, which
/// guarantees deterministic cross-pass iteration regardless of parse order.
pub type MethodMap = std::collections::BTreeMap<String, MethodDef>;
pub type AbstractMethodMap = std::collections::BTreeMap<String, MethodDecl>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassDef {
    pub name: String,
    pub parent: Option<String>,
    pub interfaces: Vec<String>,
    pub is_abstract: bool,
    pub props: Vec<PropDecl>,
    pub methods: MethodMap,
    pub abstract_methods: AbstractMethodMap,
}

impl ClassDef {
    pub fn has_parent(&self) -> bool {
        self.parent.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterfaceDef {
    pub name: String,
    pub parents: Vec<String>,
    pub methods: AbstractMethodMap,
}

/// The top-level statement list, partitioned into four buckets at parse
/// time; everything else is rejected before it reaches this structure.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Program {
    pub classes: Vec<ClassDef>,
    pub interfaces: Vec<InterfaceDef>,
    pub funcs: Vec<FnDef>,
    pub globals: Vec<Stmt>,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }
}
