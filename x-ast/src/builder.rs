//! Small ergonomic constructors for building a [`Program`] by hand.
//!
//! This is not a parser: the lexer/parser are out-of-scope external
//! collaborators (spec §1). These helpers exist so tests and the
//! `--ast`/`-c` CLI paths can construct programs without a second compiler
//! frontend.

use crate::ast::*;
use crate::types::{AccessModifier, Type};

pub fn int(v: i64) -> Expr {
    Expr::new(ExprKind::IntLit(v))
}

pub fn float(v: f64) -> Expr {
    Expr::new(ExprKind::FloatLit(v))
}

pub fn boolean(v: bool) -> Expr {
    Expr::new(ExprKind::BoolLit(v))
}

pub fn string(v: impl Into<String>) -> Expr {
    Expr::new(ExprKind::StringLit(v.into()))
}

pub fn array_lit(elems: Vec<Expr>) -> Expr {
    Expr::new(ExprKind::ArrayLit(elems))
}

pub fn var(name: impl Into<String>) -> Expr {
    Expr::new(ExprKind::Var(name.into()))
}

pub fn unary(op: UnaryOp, operand: Expr, prefix: bool) -> Expr {
    Expr::new(ExprKind::Unary {
        op,
        operand: Box::new(operand),
        prefix,
    })
}

pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
    Expr::new(ExprKind::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    })
}

pub fn fetch_prop(object: Expr, name: impl Into<String>) -> Expr {
    Expr::new(ExprKind::FetchProp {
        object: Box::new(object),
        name: name.into(),
    })
}

pub fn fetch_static_prop(class_name: impl Into<String>, name: impl Into<String>) -> Expr {
    Expr::new(ExprKind::FetchStaticProp {
        class_name: class_name.into(),
        name: name.into(),
    })
}

pub fn method_call(object: Expr, name: impl Into<String>, args: Vec<Expr>) -> Expr {
    Expr::new(ExprKind::MethodCall {
        object: Box::new(object),
        name: name.into(),
        args,
    })
}

pub fn static_method_call(
    class_name: impl Into<String>,
    name: impl Into<String>,
    args: Vec<Expr>,
) -> Expr {
    Expr::new(ExprKind::StaticMethodCall {
        class_name: class_name.into(),
        name: name.into(),
        args,
    })
}

pub fn fetch_arr(array: Expr, index: Expr) -> Expr {
    Expr::new(ExprKind::FetchArr {
        array: Box::new(array),
        index: Box::new(index),
    })
}

pub fn new_obj(class_name: impl Into<String>, args: Vec<Expr>) -> Expr {
    Expr::new(ExprKind::New {
        class_name: class_name.into(),
        args,
    })
}

pub fn call(name: impl Into<String>, args: Vec<Expr>) -> Expr {
    Expr::new(ExprKind::Call {
        name: name.into(),
        args,
    })
}

pub fn range(start: Option<Expr>, stop: Expr, step: Option<Expr>) -> Expr {
    Expr::new(ExprKind::Range {
        start: start.map(Box::new),
        stop: Box::new(stop),
        step: step.map(Box::new),
    })
}

pub fn decl(name: impl Into<String>, ty: Type, init: Option<Expr>) -> Stmt {
    Stmt::new(StmtKind::Decl {
        name: name.into(),
        ty,
        init,
    })
}

pub fn assign(name: impl Into<String>, value: Expr) -> Stmt {
    Stmt::new(StmtKind::Assign {
        name: name.into(),
        value,
    })
}

pub fn if_stmt(cond: Expr, then_branch: Vec<Stmt>, else_branch: Option<Vec<Stmt>>) -> Stmt {
    Stmt::new(StmtKind::If {
        cond,
        then_branch: Box::new(Stmt::new(StmtKind::List(then_branch))),
        else_branch: else_branch.map(|b| Box::new(Stmt::new(StmtKind::List(b)))),
    })
}

pub fn while_stmt(cond: Expr, body: Vec<Stmt>) -> Stmt {
    Stmt::new(StmtKind::While {
        cond,
        body: Box::new(Stmt::new(StmtKind::List(body))),
    })
}

pub fn for_in(idx_name: Option<String>, val_name: impl Into<String>, iterable: Expr, body: Vec<Stmt>) -> Stmt {
    Stmt::new(StmtKind::ForIn {
        idx_name,
        val_name: val_name.into(),
        iterable,
        body: Box::new(Stmt::new(StmtKind::List(body))),
    })
}

pub fn println(value: Expr) -> Stmt {
    Stmt::new(StmtKind::Println(value))
}

pub fn ret(value: Option<Expr>) -> Stmt {
    Stmt::new(StmtKind::Return(value))
}

pub fn expr_stmt(value: Expr) -> Stmt {
    Stmt::new(StmtKind::Expr(value))
}

pub fn arg(name: impl Into<String>, ty: Type) -> Arg {
    Arg {
        name: name.into(),
        ty,
    }
}

pub fn fn_decl(name: impl Into<String>, args: Vec<Arg>, return_type: Type) -> FnDecl {
    FnDecl {
        name: name.into(),
        args,
        return_type,
    }
}

pub fn fn_def(decl: FnDecl, body: Vec<Stmt>) -> FnDef {
    FnDef { decl, body }
}

pub fn method_def(fn_def: FnDef, access: AccessModifier, is_static: bool) -> MethodDef {
    MethodDef {
        fn_def,
        access,
        is_static,
    }
}

pub fn method_decl(fn_decl: FnDecl, is_abstract: bool, access: AccessModifier, is_static: bool) -> MethodDecl {
    MethodDecl {
        fn_decl,
        is_abstract,
        access,
        is_static,
    }
}

pub fn prop_decl(
    name: impl Into<String>,
    ty: Type,
    init: Option<Expr>,
    access: AccessModifier,
    is_static: bool,
) -> PropDecl {
    PropDecl {
        name: name.into(),
        ty,
        init,
        access,
        is_static,
    }
}
