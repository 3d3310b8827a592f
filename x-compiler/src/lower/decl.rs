//! Decl phase (§4.6 step 1-4): pre-registers every class/interface struct
//! type, vtable and mangled function signature before any method body is
//! lowered, so forward references (a method returning its own class, a
//! field of a not-yet-lowered sibling class) resolve. Grounded on
//! `codegen/decl.cpp`.

use std::collections::HashMap;

use inkwell::types::BasicType;
use inkwell::AddressSpace;

use x_ast::{Program, Type, CONSTRUCTOR_FN_NAME, INIT_FN_NAME};

use super::{ClassInfo, InterfaceInfo, InterfaceValueType, PropSlot, StaticPropSlot, VtableSlot};
use crate::error::LoweringError;
use x_ast::Mangler;

impl<'a, 'ctx> super::Lowerer<'a, 'ctx> {
    pub(crate) fn decl_interfaces(&mut self, program: &Program) -> Result<(), LoweringError> {
        for iface in &program.interfaces {
            self.add_symbol(&iface.name)?;
            let mangled = Mangler.mangle_interface(&iface.name);

            let mut vtable_slots = Vec::new();
            let mut field_types = Vec::new();
            if let Some(methods) = self.rt.interface_methods.get(&iface.name) {
                for name in methods.keys() {
                    vtable_slots.push(VtableSlot { method_name: name.clone() });
                    field_types.push(self.context.ptr_type(AddressSpace::default()).as_basic_type_enum());
                }
            }
            let vtable_type = self.context.opaque_struct_type(&format!("{mangled}.vtable"));
            vtable_type.set_body(&field_types, false);

            self.interfaces.insert(
                iface.name.clone(),
                InterfaceInfo { vtable_type, vtable_slots },
            );

            // The trampoline an object is boxed into at a concrete->interface
            // cast site: { vtable*, object*, gc-meta* } (§4.6 Interface Values).
            let ptr_ty = self.context.ptr_type(AddressSpace::default());
            let value_ty = self.context.opaque_struct_type(&format!("{mangled}.value"));
            value_ty.set_body(&[ptr_ty.into(), ptr_ty.into(), ptr_ty.into()], false);
            self.interface_values
                .insert(iface.name.clone(), InterfaceValueType { llvm_type: value_ty });
        }
        Ok(())
    }

    pub(crate) fn decl_classes(&mut self, program: &Program) -> Result<(), LoweringError> {
        for class in &program.classes {
            self.add_symbol(&class.name)?;
            let mangled = Mangler.mangle_class(&class.name);
            let llvm_type = self.context.opaque_struct_type(&mangled);

            self.classes.insert(
                class.name.clone(),
                ClassInfo {
                    llvm_type,
                    parent: class.parent.clone(),
                    is_abstract: class.is_abstract,
                    props: HashMap::new(),
                    static_props: HashMap::new(),
                    vtable_type: None,
                    vtable_slots: Vec::new(),
                    parent_slot: None,
                    vtable_slot: None,
                    resolved_vtables: HashMap::new(),
                    gc_meta_id: 0,
                },
            );
        }
        Ok(())
    }

    /// Assigns struct slots (parent embed, vtable pointer, then each
    /// declared prop in order), resolves static prop globals, and
    /// registers the class's pointer layout with a fresh GC meta id
    /// (§4.6 step 3).
    pub(crate) fn decl_props(&mut self, program: &Program) -> Result<(), LoweringError> {
        for class in &program.classes {
            let mangled = Mangler.mangle_class(&class.name);
            let mut field_types = Vec::new();
            let mut pos = 0u32;
            let mut parent_slot = None;
            let mut props = HashMap::new();
            let mut static_props = HashMap::new();

            if let Some(parent_name) = &class.parent {
                let parent_info = self
                    .classes
                    .get(parent_name)
                    .ok_or_else(|| LoweringError::ClassNotFound(parent_name.clone()))?;
                field_types.push(parent_info.llvm_type.as_basic_type_enum());
                parent_slot = Some(pos);
                pos += 1;
            }

            let has_vtable = self
                .rt
                .virtual_methods
                .get(&class.name)
                .map(|m| !m.is_empty())
                .unwrap_or(false);
            let mut vtable_slot = None;
            let mut vtable_slots = Vec::new();
            let mut vtable_type = None;
            if has_vtable {
                vtable_slots = self
                    .rt
                    .virtual_methods
                    .get(&class.name)
                    .unwrap()
                    .iter()
                    .cloned()
                    .map(|name| VtableSlot { method_name: name })
                    .collect();
                let ptr_ty = self.context.ptr_type(AddressSpace::default());
                let vt = self.context.opaque_struct_type(&format!("{mangled}.vtable"));
                vt.set_body(&vec![ptr_ty.as_basic_type_enum(); vtable_slots.len()], false);
                field_types.push(ptr_ty.as_basic_type_enum());
                vtable_slot = Some(pos);
                pos += 1;
                vtable_type = Some(vt);
            }

            for prop in &class.props {
                if prop.is_static {
                    let llvm_ty = self.map_type(&prop.ty);
                    let mangled_prop = Mangler.mangle_static_prop(&mangled, &prop.name);
                    let global = self.module.add_global(llvm_ty, None, &mangled_prop);
                    global.set_initializer(&self.default_value(&prop.ty));
                    static_props.insert(
                        prop.name.clone(),
                        StaticPropSlot { global, ty: prop.ty.clone() },
                    );
                } else {
                    let llvm_ty = self.map_type(&prop.ty);
                    field_types.push(llvm_ty);
                    props.insert(prop.name.clone(), PropSlot { ty: prop.ty.clone(), pos });
                    pos += 1;
                }
            }

            let gc_meta_id = self.fresh_gc_meta_id();

            let info = self.classes.get_mut(&class.name).unwrap();
            info.llvm_type.set_body(&field_types, false);
            info.props = props;
            info.static_props = static_props;
            info.vtable_type = vtable_type;
            info.vtable_slots = vtable_slots;
            info.parent_slot = parent_slot;
            info.vtable_slot = vtable_slot;
            info.gc_meta_id = gc_meta_id;
        }
        Ok(())
    }

    /// Declares every method as an external `llvm::Function` (signature
    /// only — bodies are emitted in a later pass over the same classes),
    /// plus the always-present default constructor stub the donor injects
    /// even for classes without a user-written one (`decl.cpp`'s
    /// `declMethods`).
    pub(crate) fn decl_methods(&mut self, program: &Program) -> Result<(), LoweringError> {
        for class in &program.classes {
            let mangled = Mangler.mangle_class(&class.name);

            for (method_name, method_def) in &class.methods {
                let fn_decl = &method_def.fn_def.decl;
                let fn_name = Mangler.mangle_method(&mangled, &fn_decl.name);
                let this_ty = if method_def.is_static {
                    None
                } else {
                    Some(Type::class(class.name.clone()))
                };
                self.declare_fn(&fn_name, &fn_decl.args, &self.resolve_self(&fn_decl.return_type, &class.name), this_ty.as_ref());
                let _ = method_name;
            }

            if !class.methods.contains_key(CONSTRUCTOR_FN_NAME) {
                let fn_name = Mangler.mangle_method(&mangled, CONSTRUCTOR_FN_NAME);
                self.declare_fn(&fn_name, &[], &Type::void(), Some(&Type::class(class.name.clone())));
            }
        }
        Ok(())
    }

    /// Declares each class's per-instance property-initializer function
    /// (§4.6 decl phase step 4) — the hidden `init` named via
    /// `Mangler::mangle_hidden_method`, never reachable from source, that
    /// `new_obj` runs before a user/synthesized `construct` to set every
    /// instance prop's default value or field-initializer expression.
    pub(crate) fn decl_prop_inits(&mut self, program: &Program) -> Result<(), LoweringError> {
        for class in &program.classes {
            let mangled = Mangler.mangle_class(&class.name);
            let fn_name = Mangler.mangle_hidden_method(&mangled, INIT_FN_NAME);
            self.declare_fn(&fn_name, &[], &Type::void(), Some(&Type::class(class.name.clone())));
        }
        Ok(())
    }

    pub(crate) fn decl_funcs(&mut self, program: &Program) -> Result<(), LoweringError> {
        for func in &program.funcs {
            if self.module.get_function(&func.decl.name).is_some() {
                return Err(LoweringError::SymbolAlreadyExists(func.decl.name.clone()));
            }
            self.declare_fn(&func.decl.name, &func.decl.args, &func.decl.return_type, None);
        }
        Ok(())
    }

    /// `self` in a method's return type resolves to the enclosing class
    /// (§9 GLOSSARY); everywhere else it stands as written.
    fn resolve_self(&self, ty: &Type, class_name: &str) -> Type {
        if ty.is(x_ast::TypeId::SelfTy) {
            Type::class(class_name.to_string())
        } else {
            ty.clone()
        }
    }

    pub(crate) fn declare_fn(
        &mut self,
        name: &str,
        args: &[x_ast::Arg],
        return_type: &Type,
        this_ty: Option<&Type>,
    ) {
        let mut param_types = Vec::new();
        if let Some(t) = this_ty {
            param_types.push(self.map_type(t));
        }
        for arg in args {
            param_types.push(self.map_type(&arg.ty));
        }
        let param_meta: Vec<_> = param_types.iter().map(|t| (*t).into()).collect();

        let fn_type = if return_type.is(x_ast::TypeId::Void) {
            self.context.void_type().fn_type(&param_meta, false)
        } else {
            let ret = self.map_type(return_type);
            ret.fn_type(&param_meta, false)
        };

        let function = self.module.add_function(name, fn_type, None);
        let offset = if this_ty.is_some() { 1 } else { 0 };
        if this_ty.is_some() {
            function.get_nth_param(0).unwrap().set_name("this");
        }
        for (i, arg) in args.iter().enumerate() {
            function.get_nth_param((i + offset) as u32).unwrap().set_name(&arg.name);
        }
    }

    /// Every global var plus every static prop initializer runs inside a
    /// synthesized `x.<init>` function, mirroring `declGlobals` /
    /// `genStaticPropInit`; `x-driver` calls it once before `main`.
    pub(crate) fn decl_globals(&mut self, program: &Program) -> Result<(), LoweringError> {
        let fn_type = self.context.void_type().fn_type(&[], false);
        let init_fn = self
            .module
            .add_function(&Mangler.mangle_internal_function(INIT_FN_NAME), fn_type, None);
        let entry = self.context.append_basic_block(init_fn, "entry");
        self.builder.position_at_end(entry);
        self.current_fn = Some(init_fn);
        self.current_fn_ret_type = Type::void();
        self.gc_push_stack_frame();

        // A global outlives `x.init`'s own call frame, so it gets a real
        // module-level `llvm::GlobalVariable` rather than a stack slot —
        // an alloca here would dangle the moment `x.init` returns, and no
        // other function's IR may reference a value local to this one
        // anyway (§4.6, mirrors `declGlobals` in the donor).
        for decl in &program.globals {
            let x_ast::StmtKind::Decl { name, ty, init } = &decl.kind else {
                self.lower_stmt(decl)?;
                continue;
            };
            let llvm_ty = self.map_type(ty);
            let global = self.module.add_global(llvm_ty, None, &Mangler.mangle_internal_function(name));
            global.set_initializer(&self.default_value(ty));
            let value = match init {
                Some(expr) => {
                    let v = self.lower_expr(expr)?;
                    self.cast_to(v, &expr.ty().unwrap(), ty)
                }
                None => self.default_value(ty),
            };
            self.builder.build_store(global.as_pointer_value(), value).unwrap();
            self.globals.insert(name.clone(), super::Var { ptr: global.as_pointer_value(), ty: llvm_ty });
            if let Some(meta_id) = self.gc_meta_for_type(ty) {
                self.gc_add_global_root(global.as_pointer_value(), meta_id);
            }
        }

        for class in &program.classes {
            let mangled = Mangler.mangle_class(&class.name);
            for prop in &class.props {
                if !prop.is_static {
                    continue;
                }
                let value = match &prop.init {
                    Some(expr) => {
                        let v = self.lower_expr(expr)?;
                        self.cast_to(v, &expr.ty().unwrap(), &prop.ty)
                    }
                    None => self.default_value(&prop.ty).into(),
                };
                let slot = self.classes[&class.name].static_props[&prop.name].global;
                self.builder.build_store(slot.as_pointer_value(), value).unwrap();
                let meta_id = self.gc_meta_for_type(&prop.ty);
                if let Some(id) = meta_id {
                    self.gc_add_global_root(slot.as_pointer_value(), id);
                }
                let _ = &mangled;
            }
        }

        self.gc_pop_stack_frame();
        self.builder.build_return(None).unwrap();
        self.current_fn = None;
        Ok(())
    }
}
