//! §4.4 virtual-method discovery, grounded on `check_virtual_methods.cpp`.
//! Walks every class's ancestor chain; any non-static, non-constructor
//! method name shared with an ancestor must have an identical signature,
//! and the ancestor who first declared it is marked as having a virtual
//! slot for that name.

use std::collections::HashMap;

use x_ast::{ClassDef, Program, CONSTRUCTOR_FN_NAME};

use crate::compiler_runtime::CompilerRuntime;
use crate::error::VirtualMethodError;
use crate::passes::common::defs_signature_equal;

pub fn run(program: &Program, rt: &mut CompilerRuntime) -> Result<(), VirtualMethodError> {
    let classes_by_name: HashMap<&str, &ClassDef> =
        program.classes.iter().map(|c| (c.name.as_str(), c)).collect();

    for class in &program.classes {
        let mut ancestor = class.parent.as_deref().and_then(|p| classes_by_name.get(p).copied());
        while let Some(a) = ancestor {
            for (method_name, method_def) in &class.methods {
                if method_def.is_static || method_name == CONSTRUCTOR_FN_NAME {
                    continue;
                }
                if let Some(ancestor_def) = a.methods.get(method_name) {
                    if ancestor_def.is_static {
                        continue;
                    }
                    if !defs_signature_equal(method_def, ancestor_def) {
                        return Err(VirtualMethodError::SignatureMismatch {
                            class: class.name.clone(),
                            ancestor: a.name.clone(),
                            method: method_name.clone(),
                        });
                    }
                    rt.virtual_methods
                        .entry(a.name.clone())
                        .or_default()
                        .insert(method_name.clone());
                }
            }
            ancestor = a.parent.as_deref().and_then(|p| classes_by_name.get(p).copied());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use x_ast::builder::*;
    use x_ast::{AccessModifier, Type};

    fn method(name: &str, ret: Type) -> x_ast::MethodMap {
        let mut m = x_ast::MethodMap::new();
        m.insert(
            name.to_string(),
            method_def(fn_def(fn_decl(name, vec![], ret), vec![]), AccessModifier::Public, false),
        );
        m
    }

    #[test]
    fn matching_override_is_recorded_virtual() {
        let parent = ClassDef {
            name: "Animal".to_string(),
            parent: None,
            interfaces: vec![],
            is_abstract: false,
            props: vec![],
            methods: method("speak", Type::void()),
            abstract_methods: Default::default(),
        };
        let child = ClassDef {
            name: "Dog".to_string(),
            parent: Some("Animal".to_string()),
            interfaces: vec![],
            is_abstract: false,
            props: vec![],
            methods: method("speak", Type::void()),
            abstract_methods: Default::default(),
        };
        let program = Program {
            classes: vec![parent, child],
            ..Default::default()
        };
        let mut rt = CompilerRuntime::new();
        run(&program, &mut rt).expect("ok");
        assert!(rt.virtual_methods["Animal"].contains("speak"));
    }

    #[test]
    fn mismatched_override_errors() {
        let parent = ClassDef {
            name: "Animal".to_string(),
            parent: None,
            interfaces: vec![],
            is_abstract: false,
            props: vec![],
            methods: method("speak", Type::void()),
            abstract_methods: Default::default(),
        };
        let child = ClassDef {
            name: "Dog".to_string(),
            parent: Some("Animal".to_string()),
            interfaces: vec![],
            is_abstract: false,
            props: vec![],
            methods: method("speak", Type::int()),
            abstract_methods: Default::default(),
        };
        let program = Program {
            classes: vec![parent, child],
            ..Default::default()
        };
        let mut rt = CompilerRuntime::new();
        assert!(matches!(
            run(&program, &mut rt),
            Err(VirtualMethodError::SignatureMismatch { .. })
        ));
    }
}
