//! The "parse stub" (§0 crate layout): with the lexer/parser out of
//! scope, a program reaches this crate already as a JSON-serialized
//! [`x_ast::Program`] — `x_ast`'s `Expr`/`Stmt`/`Type` nodes all derive
//! `serde::{Serialize, Deserialize}` for exactly this purpose. `x-cli`'s
//! `--ast` flag pretty-prints the same value right back out with
//! `serde_json`, so a round trip through this module is how the builder
//! API in `x_ast::builder` and the end-to-end test fixtures both reach
//! the pipeline.

use std::path::Path;

use x_ast::Program;

use crate::error::DriverError;

pub fn program_from_str(source: &str) -> Result<Program, DriverError> {
    Ok(serde_json::from_str(source)?)
}

pub fn program_from_file(path: &Path) -> Result<Program, DriverError> {
    let source = std::fs::read_to_string(path)?;
    program_from_str(&source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use x_ast::builder;

    #[test]
    fn round_trips_through_json() {
        let mut program = Program::new();
        program.funcs.push(builder::fn_def(
            builder::fn_decl("main", vec![], x_ast::Type::void()),
            vec![builder::println(builder::int(42))],
        ));

        let json = serde_json::to_string(&program).unwrap();
        let back = program_from_str(&json).unwrap();
        assert_eq!(back.funcs.len(), 1);
        assert_eq!(back.funcs[0].decl.name, "main");
    }
}
