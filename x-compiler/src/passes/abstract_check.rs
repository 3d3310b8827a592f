//! §4.2 abstract-class check, grounded on `check_abstract_classes.cpp`.
//!
//! Classes are visited in declaration order (parents are required to be
//! declared before use, per §3's "parents are declared" invariant, which
//! in this pipeline also fixes their relative order in `Program::classes`).
//! Each class accumulates an "unimplemented abstract methods" set seeded
//! from its parent's.

use std::collections::{BTreeMap, HashMap, HashSet};

use x_ast::{ClassDef, MethodDecl, Program};

use crate::error::AbstractClassError;
use crate::passes::common::decl_matches_def;

pub fn run(program: &Program) -> Result<(), AbstractClassError> {
    let mut seen = HashSet::new();
    let mut class_abstract_methods: HashMap<String, BTreeMap<String, MethodDecl>> = HashMap::new();

    for class in &program.classes {
        if !seen.insert(class.name.clone()) {
            return Err(AbstractClassError::ClassAlreadyExists(class.name.clone()));
        }
        check_class(class, &mut class_abstract_methods)?;
    }
    Ok(())
}

fn check_class(
    class: &ClassDef,
    class_abstract_methods: &mut HashMap<String, BTreeMap<String, MethodDecl>>,
) -> Result<(), AbstractClassError> {
    if !class.abstract_methods.is_empty() && !class.is_abstract {
        return Err(AbstractClassError::MustBeDeclaredAbstract(class.name.clone()));
    }

    if class.is_abstract {
        let mut accumulated = class
            .parent
            .as_ref()
            .and_then(|p| class_abstract_methods.get(p))
            .cloned()
            .unwrap_or_default();
        for (name, decl) in &class.abstract_methods {
            accumulated.insert(name.clone(), decl.clone());
        }
        // own concrete overrides remove inherited abstract requirements
        for name in class.methods.keys() {
            accumulated.remove(name);
        }
        class_abstract_methods.insert(class.name.clone(), accumulated);
        return Ok(());
    }

    let Some(parent) = &class.parent else {
        return Ok(());
    };
    let Some(parent_abstract) = class_abstract_methods.get(parent) else {
        return Ok(());
    };

    for (method_name, method_decl) in parent_abstract {
        let Some(method_def) = class.methods.get(method_name) else {
            return Err(AbstractClassError::AbstractMethodNotImplemented(
                parent.clone(),
                method_name.clone(),
            ));
        };
        if !decl_matches_def(method_decl, method_def) {
            return Err(AbstractClassError::IncompatibleDeclaration {
                class: class.name.clone(),
                method: method_name.clone(),
                ancestor: parent.clone(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use x_ast::builder::*;
    use x_ast::{AccessModifier, ClassDef, Type};

    fn abstract_foo() -> ClassDef {
        let mut abstract_methods = x_ast::AbstractMethodMap::new();
        abstract_methods.insert(
            "speak".to_string(),
            method_decl(fn_decl("speak", vec![], Type::void()), true, AccessModifier::Public, false),
        );
        ClassDef {
            name: "Animal".to_string(),
            parent: None,
            interfaces: vec![],
            is_abstract: true,
            props: vec![],
            methods: Default::default(),
            abstract_methods,
        }
    }

    #[test]
    fn non_abstract_class_with_abstract_method_errors() {
        let mut c = abstract_foo();
        c.is_abstract = false;
        let program = Program {
            classes: vec![c],
            ..Default::default()
        };
        assert!(matches!(
            run(&program),
            Err(AbstractClassError::MustBeDeclaredAbstract(_))
        ));
    }

    #[test]
    fn missing_override_errors() {
        let parent = abstract_foo();
        let child = ClassDef {
            name: "Dog".to_string(),
            parent: Some("Animal".to_string()),
            interfaces: vec![],
            is_abstract: false,
            props: vec![],
            methods: Default::default(),
            abstract_methods: Default::default(),
        };
        let program = Program {
            classes: vec![parent, child],
            ..Default::default()
        };
        assert!(matches!(
            run(&program),
            Err(AbstractClassError::AbstractMethodNotImplemented(_, _))
        ));
    }

    #[test]
    fn compatible_override_passes() {
        let parent = abstract_foo();
        let mut methods = x_ast::MethodMap::new();
        methods.insert(
            "speak".to_string(),
            method_def(
                fn_def(fn_decl("speak", vec![], Type::void()), vec![]),
                AccessModifier::Public,
                false,
            ),
        );
        let child = ClassDef {
            name: "Dog".to_string(),
            parent: Some("Animal".to_string()),
            interfaces: vec![],
            is_abstract: false,
            props: vec![],
            methods,
            abstract_methods: Default::default(),
        };
        let program = Program {
            classes: vec![parent, child],
            ..Default::default()
        };
        assert!(run(&program).is_ok());
    }
}
