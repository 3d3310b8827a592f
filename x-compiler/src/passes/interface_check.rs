//! §4.3 interface check, grounded on `check_interfaces.cpp`: interfaces
//! are processed first (building a transitively-merged method map per
//! interface), then classes (computing the interfaces each must satisfy
//! and recording the transitively-closed `implemented-interfaces[C]`
//! regardless of whether `C` is abstract).

use std::collections::{HashMap, HashSet};

use x_ast::{AccessModifier, ClassDef, InterfaceDef, MethodDecl, Program};

use crate::compiler_runtime::CompilerRuntime;
use crate::error::InterfaceError;
use crate::passes::common::fn_decls_equal;

pub fn run(program: &Program, rt: &mut CompilerRuntime) -> Result<(), InterfaceError> {
    let interfaces_by_name: HashMap<&str, &InterfaceDef> =
        program.interfaces.iter().map(|i| (i.name.as_str(), i)).collect();
    let classes_by_name: HashMap<&str, &ClassDef> =
        program.classes.iter().map(|c| (c.name.as_str(), c)).collect();

    for iface in &program.interfaces {
        check_interface(iface, rt)?;
    }
    for class in &program.classes {
        check_class(class, &classes_by_name, &interfaces_by_name, rt)?;
    }
    Ok(())
}

fn check_interface(iface: &InterfaceDef, rt: &mut CompilerRuntime) -> Result<(), InterfaceError> {
    let mut methods: std::collections::BTreeMap<String, MethodDecl> = Default::default();

    for parent in &iface.parents {
        let parent_methods = rt
            .interface_methods
            .get(parent)
            .ok_or_else(|| InterfaceError::InterfaceNotFound(parent.clone()))?;
        for (name, decl) in parent_methods {
            methods.insert(name.clone(), decl.clone());
        }
    }

    for (name, decl) in &iface.methods {
        if decl.access != AccessModifier::Public {
            return Err(InterfaceError::MethodMustBePublic(iface.name.clone(), name.clone()));
        }
        if decl.is_static {
            return Err(InterfaceError::MethodMustBeNonStatic(iface.name.clone(), name.clone()));
        }
        if let Some(existing) = methods.get(name) {
            if !fn_decls_equal(&existing.fn_decl, &decl.fn_decl) {
                return Err(InterfaceError::IncompatibleRedeclaration {
                    interface: iface.name.clone(),
                    parent: iface
                        .parents
                        .iter()
                        .find(|p| {
                            rt.interface_methods
                                .get(*p)
                                .map(|m| m.contains_key(name))
                                .unwrap_or(false)
                        })
                        .cloned()
                        .unwrap_or_default(),
                    method: name.clone(),
                });
            }
        }
        methods.insert(name.clone(), decl.clone());
    }

    rt.interface_methods.insert(iface.name.clone(), methods);
    Ok(())
}

fn collect_interface_parents(
    name: &str,
    interfaces_by_name: &HashMap<&str, &InterfaceDef>,
    out: &mut HashSet<String>,
) {
    if let Some(iface) = interfaces_by_name.get(name) {
        for parent in &iface.parents {
            if out.insert(parent.clone()) {
                collect_interface_parents(parent, interfaces_by_name, out);
            }
        }
    }
}

fn find_concrete_method<'a>(
    class: &'a ClassDef,
    classes_by_name: &HashMap<&str, &'a ClassDef>,
    method_name: &str,
) -> Option<&'a x_ast::MethodDef> {
    let mut current = Some(class);
    while let Some(c) = current {
        if let Some(def) = c.methods.get(method_name) {
            return Some(def);
        }
        current = c.parent.as_deref().and_then(|p| classes_by_name.get(p).copied());
    }
    None
}

fn check_class(
    class: &ClassDef,
    classes_by_name: &HashMap<&str, &ClassDef>,
    interfaces_by_name: &HashMap<&str, &InterfaceDef>,
    rt: &mut CompilerRuntime,
) -> Result<(), InterfaceError> {
    // extended-classes closure: every transitive ancestor class name.
    let mut extended = HashSet::new();
    let mut cursor = class.parent.clone();
    while let Some(p) = cursor {
        cursor = classes_by_name.get(p.as_str()).and_then(|c| c.parent.clone());
        extended.insert(p);
    }
    rt.extended_classes.insert(class.name.clone(), extended);

    let mut interfaces_to_implement: HashSet<String> = HashSet::new();
    for iface_name in &class.interfaces {
        if !interfaces_by_name.contains_key(iface_name.as_str()) {
            return Err(InterfaceError::InterfaceNotFound(iface_name.clone()));
        }
        interfaces_to_implement.insert(iface_name.clone());
        collect_interface_parents(iface_name, interfaces_by_name, &mut interfaces_to_implement);
    }

    if let Some(parent_name) = &class.parent {
        if let Some(parent_class) = classes_by_name.get(parent_name.as_str()) {
            if parent_class.is_abstract {
                if let Some(parent_impl) = rt.implemented_interfaces.get(parent_name) {
                    interfaces_to_implement.extend(parent_impl.iter().cloned());
                }
            }
        }
    }

    if !class.is_abstract {
        for iface_name in &interfaces_to_implement {
            let iface_methods = rt
                .interface_methods
                .get(iface_name)
                .ok_or_else(|| InterfaceError::InterfaceNotFound(iface_name.clone()))?;
            for (method_name, method_decl) in iface_methods {
                match find_concrete_method(class, classes_by_name, method_name) {
                    Some(def) if crate::passes::common::decl_matches_def(method_decl, def) => {}
                    _ => {
                        return Err(InterfaceError::NotImplemented {
                            class: class.name.clone(),
                            interface: iface_name.clone(),
                            method: method_name.clone(),
                        })
                    }
                }
            }
        }
    }

    rt.implemented_interfaces
        .insert(class.name.clone(), interfaces_to_implement);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use x_ast::builder::*;
    use x_ast::{InterfaceDef, Type};

    #[test]
    fn class_must_implement_interface_method() {
        let mut methods = x_ast::AbstractMethodMap::new();
        methods.insert(
            "foo".to_string(),
            method_decl(fn_decl("foo", vec![], Type::void()), false, AccessModifier::Public, false),
        );
        let iface = InterfaceDef {
            name: "A".to_string(),
            parents: vec![],
            methods,
        };
        let class = ClassDef {
            name: "Bar".to_string(),
            parent: None,
            interfaces: vec!["A".to_string()],
            is_abstract: false,
            props: vec![],
            methods: Default::default(),
            abstract_methods: Default::default(),
        };
        let program = Program {
            classes: vec![class],
            interfaces: vec![iface],
            ..Default::default()
        };
        let mut rt = CompilerRuntime::new();
        assert!(matches!(
            run(&program, &mut rt),
            Err(InterfaceError::NotImplemented { .. })
        ));
    }

    #[test]
    fn implemented_interfaces_closure_is_transitive() {
        let parent_iface = InterfaceDef {
            name: "Base".to_string(),
            parents: vec![],
            methods: Default::default(),
        };
        let child_iface = InterfaceDef {
            name: "Derived".to_string(),
            parents: vec!["Base".to_string()],
            methods: Default::default(),
        };
        let class = ClassDef {
            name: "C".to_string(),
            parent: None,
            interfaces: vec!["Derived".to_string()],
            is_abstract: false,
            props: vec![],
            methods: Default::default(),
            abstract_methods: Default::default(),
        };
        let program = Program {
            classes: vec![class],
            interfaces: vec![parent_iface, child_iface],
            ..Default::default()
        };
        let mut rt = CompilerRuntime::new();
        run(&program, &mut rt).expect("should pass: no methods to implement");
        let closure = &rt.implemented_interfaces["C"];
        assert!(closure.contains("Derived"));
        assert!(closure.contains("Base"));
    }
}
