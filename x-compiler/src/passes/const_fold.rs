//! §4.1 const-string folding: a structural, idempotent, bottom-up AST
//! rewrite. Grounded on the donor's `const_string_folding.cpp`, which
//! visits every `BinaryNode` post-order and folds `PLUS` of two string
//! scalars into one. No other folding is performed.

use x_ast::{BinaryOp, Expr, ExprKind, FnDef, Program, Stmt, StmtKind};

pub fn run(program: &mut Program) {
    for class in &mut program.classes {
        for method in class.methods.values_mut() {
            fold_fn_def(&mut method.fn_def);
        }
    }
    for func in &mut program.funcs {
        fold_fn_def(func);
    }
    for global in &mut program.globals {
        fold_stmt(global);
    }
}

fn fold_fn_def(def: &mut FnDef) {
    for stmt in &mut def.body {
        fold_stmt(stmt);
    }
}

fn fold_stmt(stmt: &mut Stmt) {
    match &mut stmt.kind {
        StmtKind::List(stmts) => stmts.iter_mut().for_each(fold_stmt),
        StmtKind::Decl { init, .. } => {
            if let Some(e) = init {
                fold_expr(e);
            }
        }
        StmtKind::Assign { value, .. } => fold_expr(value),
        StmtKind::AssignProp { object, value, .. } => {
            fold_expr(object);
            fold_expr(value);
        }
        StmtKind::AssignStaticProp { value, .. } => fold_expr(value),
        StmtKind::AssignArr { array, index, value } => {
            fold_expr(array);
            fold_expr(index);
            fold_expr(value);
        }
        StmtKind::AppendArr { array, value } => {
            fold_expr(array);
            fold_expr(value);
        }
        StmtKind::If {
            cond,
            then_branch,
            else_branch,
        } => {
            fold_expr(cond);
            fold_stmt(then_branch);
            if let Some(e) = else_branch {
                fold_stmt(e);
            }
        }
        StmtKind::While { cond, body } => {
            fold_expr(cond);
            fold_stmt(body);
        }
        StmtKind::ForIn { iterable, body, .. } => {
            fold_expr(iterable);
            fold_stmt(body);
        }
        StmtKind::Return(Some(e)) => fold_expr(e),
        StmtKind::Println(e) => fold_expr(e),
        StmtKind::Expr(e) => fold_expr(e),
        StmtKind::Return(None)
        | StmtKind::Break
        | StmtKind::Continue
        | StmtKind::Comment(_) => {}
    }
}

fn fold_expr(expr: &mut Expr) {
    match &mut expr.kind {
        ExprKind::Unary { operand, .. } => fold_expr(operand),
        ExprKind::Binary { op, lhs, rhs } => {
            fold_expr(lhs);
            fold_expr(rhs);
            if *op == BinaryOp::Add {
                if let (ExprKind::StringLit(a), ExprKind::StringLit(b)) = (&lhs.kind, &rhs.kind) {
                    let folded = format!("{a}{b}");
                    expr.kind = ExprKind::StringLit(folded);
                }
            }
        }
        ExprKind::ArrayLit(elems) => elems.iter_mut().for_each(fold_expr),
        ExprKind::FetchProp { object, .. } => fold_expr(object),
        ExprKind::MethodCall { object, args, .. } => {
            fold_expr(object);
            args.iter_mut().for_each(fold_expr);
        }
        ExprKind::StaticMethodCall { args, .. } => args.iter_mut().for_each(fold_expr),
        ExprKind::FetchArr { array, index } => {
            fold_expr(array);
            fold_expr(index);
        }
        ExprKind::New { args, .. } => args.iter_mut().for_each(fold_expr),
        ExprKind::Call { args, .. } => args.iter_mut().for_each(fold_expr),
        ExprKind::Range { start, stop, step } => {
            if let Some(s) = start {
                fold_expr(s);
            }
            fold_expr(stop);
            if let Some(s) = step {
                fold_expr(s);
            }
        }
        ExprKind::IntLit(_)
        | ExprKind::FloatLit(_)
        | ExprKind::BoolLit(_)
        | ExprKind::StringLit(_)
        | ExprKind::Var(_)
        | ExprKind::FetchStaticProp { .. } => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use x_ast::builder::*;

    #[test]
    fn folds_string_concat() {
        let mut e = binary(BinaryOp::Add, string("hello"), string("bar"));
        fold_expr(&mut e);
        assert_eq!(e.kind, ExprKind::StringLit("hellobar".to_string()));
    }

    #[test]
    fn does_not_fold_numeric_add() {
        let mut e = binary(BinaryOp::Add, int(1), int(2));
        fold_expr(&mut e);
        assert!(matches!(e.kind, ExprKind::Binary { .. }));
    }
}
