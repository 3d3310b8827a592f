//! Object layout, vtable fill-in, method resolution and construction
//! (§4.6 steps 4-6), grounded on `codegen/class.cpp`.

use inkwell::types::{BasicType, StructType};
use inkwell::values::{BasicValueEnum, FunctionValue, PointerValue};
use inkwell::AddressSpace;

use x_ast::{Type, TypeId, CONSTRUCTOR_FN_NAME, INIT_FN_NAME};

use crate::error::LoweringError;
use x_ast::Mangler;

impl<'a, 'ctx> super::Lowerer<'a, 'ctx> {
    /// Fills in, for every class, one resolved vtable per vtable-owning
    /// ancestor in its chain (including itself) — each filled by walking
    /// from *this* class, not the owner, so a descendant's copy always
    /// bakes in its own override rather than the declaring ancestor's
    /// implementation. Run once, after `decl_methods`, before any body is
    /// lowered (§4.4 "vtable resolution happens after every override is
    /// known"). A single shared vtable per owner (resolved only from the
    /// owner's own perspective) would never reflect a subclass's override
    /// at all, which is exactly the silent-base-dispatch bug this exists
    /// to avoid.
    pub(crate) fn gen_vtables(&mut self, program: &x_ast::Program) -> Result<(), LoweringError> {
        for class in &program.classes {
            let mangled = Mangler.mangle_class(&class.name);
            let mut owner = Some(class.name.clone());
            while let Some(owner_name) = owner {
                let Some(vtable_type) = self.classes[&owner_name].vtable_type else {
                    owner = self.classes[&owner_name].parent.clone();
                    continue;
                };
                let slots = self.classes[&owner_name].vtable_slots.clone();

                let mut entries = Vec::with_capacity(slots.len());
                for (idx, slot) in slots.iter().enumerate() {
                    let callee = self.resolve_virtual_impl(&class.name, &slot.method_name)?;
                    log::trace!("{}.vtable[{idx}] (owner {owner_name}) = {}", class.name, slot.method_name);
                    entries.push(callee.as_global_value().as_pointer_value());
                }

                let owner_mangled = Mangler.mangle_class(&owner_name);
                let global = self.module.add_global(vtable_type, None, &format!("{mangled}.{owner_mangled}.vtable.instance"));
                global.set_initializer(&vtable_type.const_named_struct(
                    &entries.iter().map(|p| (*p).into()).collect::<Vec<_>>(),
                ));
                self.classes.get_mut(&class.name).unwrap().resolved_vtables.insert(owner_name.clone(), global);

                owner = self.classes[&owner_name].parent.clone();
            }
        }
        Ok(())
    }

    /// Walks the ancestor chain starting at `class_name` for the nearest
    /// class that actually defines `method_name` (overridden or not).
    fn resolve_virtual_impl(&self, class_name: &str, method_name: &str) -> Result<FunctionValue<'ctx>, LoweringError> {
        let mut current = Some(class_name.to_string());
        while let Some(name) = current {
            let mangled = Mangler.mangle_class(&name);
            let fn_name = Mangler.mangle_method(&mangled, method_name);
            if let Some(f) = self.module.get_function(&fn_name) {
                return Ok(f);
            }
            current = self.classes[&name].parent.clone();
        }
        Err(LoweringError::MethodNotFound(class_name.to_string(), method_name.to_string()))
    }

    /// Allocates and zero-initializes a new instance, runs its property
    /// initializer chain, then runs the resolved constructor (no-op when
    /// the class has only the synthesized default constructor and no args
    /// were given), mirroring `NewNode` codegen in `class.cpp`.
    pub(crate) fn new_obj(&mut self, class_name: &str, args: &[x_ast::Expr]) -> Result<PointerValue<'ctx>, LoweringError> {
        let info = self.classes.get(class_name).ok_or_else(|| LoweringError::ClassNotFound(class_name.to_string()))?;
        if info.is_abstract {
            return Err(LoweringError::AbstractInstantiation(class_name.to_string()));
        }
        let llvm_type = info.llvm_type;
        let size = self.context.i64_type().const_int(self.size_of_struct(llvm_type), false);
        let raw = self.gc_alloc(size);

        // Every vtable-owning ancestor in `class_name`'s chain (not just
        // `class_name` itself, which usually owns none at all) gets its
        // embedded field written with the vtable `gen_vtables` resolved
        // specifically for `class_name` — never the owner's own shared
        // copy, which would only ever reflect the owner's implementation.
        {
            let mut owner = Some(class_name.to_string());
            let mut current_obj = raw;
            while let Some(owner_name) = owner {
                let info = &self.classes[&owner_name];
                let owner_llvm_type = info.llvm_type;
                if let Some(vtable_slot) = info.vtable_slot {
                    let resolved = self.classes[class_name].resolved_vtables[&owner_name];
                    let slot_ptr = self.builder.build_struct_gep(owner_llvm_type, current_obj, vtable_slot, "vtable_slot").unwrap();
                    self.builder.build_store(slot_ptr, resolved.as_pointer_value()).unwrap();
                }
                let info = &self.classes[&owner_name];
                let parent_slot = info.parent_slot;
                let parent = info.parent.clone();
                if let Some(ps) = parent_slot {
                    current_obj = self.builder.build_struct_gep(owner_llvm_type, current_obj, ps, "parent").unwrap();
                }
                owner = parent;
            }
        }

        let mangled = Mangler.mangle_class(class_name);
        let init_name = Mangler.mangle_hidden_method(&mangled, INIT_FN_NAME);
        let init_fn = self.module.get_function(&init_name).expect("declared in decl_prop_inits");
        self.builder.build_call(init_fn, &[raw.into()], "").unwrap();

        let values: Vec<x_ast::Expr> = args.to_vec();
        let ctor_name = Mangler.mangle_method(&mangled, CONSTRUCTOR_FN_NAME);
        if let Some(ctor) = self.module.get_function(&ctor_name) {
            let mut llvm_args = vec![raw.into()];
            for a in &values {
                let v = self.lower_expr(a)?;
                llvm_args.push(v.into());
            }
            self.builder.build_call(ctor, &llvm_args, "").unwrap();
        }

        Ok(raw)
    }

    /// Builds the body of every class's hidden property-initializer
    /// function declared by `decl_prop_inits`: calls the parent's own
    /// initializer first (so a derived class never observes a
    /// half-constructed ancestor), then evaluates this class's own
    /// instance `prop.init` expressions (or each prop's default value)
    /// and stores them into the slots `decl_props` assigned, matching
    /// spec.md's "call C's initializer function" (§4.6 step 4).
    pub(crate) fn gen_prop_inits(&mut self, program: &x_ast::Program) -> Result<(), LoweringError> {
        for class in &program.classes {
            let mangled = Mangler.mangle_class(&class.name);
            let fn_name = Mangler.mangle_hidden_method(&mangled, INIT_FN_NAME);
            let function = self.module.get_function(&fn_name).expect("declared in decl_prop_inits");

            let entry = self.context.append_basic_block(function, "entry");
            self.builder.position_at_end(entry);
            self.current_fn = Some(function);
            self.current_fn_ret_type = Type::void();
            self.this_class = Some(class.name.clone());

            let this_param = function.get_nth_param(0).unwrap().into_pointer_value();
            let ptr_ty: inkwell::types::BasicTypeEnum = self.context.ptr_type(AddressSpace::default()).into();
            let this_alloca = self.create_alloca(ptr_ty, "this");
            self.builder.build_store(this_alloca, this_param).unwrap();
            self.this_value = Some(this_alloca);
            let mut scope = super::Scope::new();
            scope.insert("this".to_string(), super::Var { ptr: this_alloca, ty: ptr_ty });
            self.var_scopes.push(scope);

            if let Some(parent_name) = &class.parent {
                let parent_mangled = Mangler.mangle_class(parent_name);
                let parent_init_name = Mangler.mangle_hidden_method(&parent_mangled, INIT_FN_NAME);
                let parent_init = self
                    .module
                    .get_function(&parent_init_name)
                    .expect("every class's init fn is declared in decl_prop_inits");
                self.builder.build_call(parent_init, &[this_param.into()], "").unwrap();
            }

            let llvm_type = self.classes[&class.name].llvm_type;
            for prop in &class.props {
                if prop.is_static {
                    continue;
                }
                let value = match &prop.init {
                    Some(expr) => {
                        let v = self.lower_expr(expr)?;
                        self.cast_to(v, &expr.ty().unwrap(), &prop.ty)
                    }
                    None => self.default_value(&prop.ty),
                };
                let pos = self.classes[&class.name].props[&prop.name].pos;
                let field_ptr = self.builder.build_struct_gep(llvm_type, this_param, pos, &prop.name).unwrap();
                self.builder.build_store(field_ptr, value).unwrap();
            }

            self.builder.build_return(None).unwrap();

            self.var_scopes.pop();
            self.this_value = None;
            self.this_class = None;
            self.current_fn = None;
        }
        Ok(())
    }

    pub(crate) fn size_of_struct(&self, ty: inkwell::types::StructType<'ctx>) -> u64 {
        // A conservative, layout-agnostic estimate: 8 bytes per field. Exact
        // padding is immaterial here since `x.gcAlloc` only needs an upper
        // bound to carve out a zeroed region the struct body is stored into.
        ty.count_fields() as u64 * 8
    }

    /// Resolves `obj.name`'s slot, walking the parent chain and checking
    /// the public/private access rule (private is only reachable with
    /// `this_value` bound, i.e. from inside some instance method body).
    pub(crate) fn get_prop(
        &mut self,
        obj: PointerValue<'ctx>,
        class_name: &str,
        name: &str,
    ) -> Result<(Type, PointerValue<'ctx>), LoweringError> {
        let mut current = Some(class_name.to_string());
        let mut current_obj = obj;
        while let Some(cls) = current {
            let info = &self.classes[&cls];
            if let Some(slot) = info.props.get(name) {
                let ty = slot.ty.clone();
                let pos = slot.pos;
                let llvm_type = info.llvm_type;
                let ptr = self.builder.build_struct_gep(llvm_type, current_obj, pos, name).unwrap();
                return Ok((ty, ptr));
            }
            if let Some(parent_slot) = info.parent_slot {
                let llvm_type = info.llvm_type;
                current_obj = self.builder.build_struct_gep(llvm_type, current_obj, parent_slot, "parent").unwrap();
            }
            current = info.parent.clone();
        }
        Err(LoweringError::MethodNotFound(class_name.to_string(), name.to_string()))
    }

    pub(crate) fn get_static_prop(&mut self, class_name: &str, name: &str) -> Result<(Type, PointerValue<'ctx>), LoweringError> {
        let mut current = Some(class_name.to_string());
        while let Some(cls) = current {
            let info = &self.classes[&cls];
            if let Some(slot) = info.static_props.get(name) {
                return Ok((slot.ty.clone(), slot.global.as_pointer_value()));
            }
            current = info.parent.clone();
        }
        Err(LoweringError::MethodNotFound(class_name.to_string(), name.to_string()))
    }

    /// Finds the method to call on a value of static type `class_name`,
    /// walking ancestors for an inherited-but-not-overridden
    /// implementation (`findMethod` in `class.cpp`).
    pub(crate) fn find_method(&self, class_name: &str, method_name: &str) -> Result<FunctionValue<'ctx>, LoweringError> {
        let mut current = Some(class_name.to_string());
        while let Some(cls) = current {
            let mangled = Mangler.mangle_class(&cls);
            let fn_name = Mangler.mangle_method(&mangled, method_name);
            if let Some(f) = self.module.get_function(&fn_name) {
                return Ok(f);
            }
            // `cls` isn't a user-declared class at all (`String`/`Range`):
            // its methods live under the internal `x.`-prefixed name the
            // native runtime registers under (§6 ABI table:
            // `x.class.String_concat` etc.), built from the same mangled
            // class name as above rather than `find_method` giving up.
            if !self.classes.contains_key(&cls) {
                let internal_name = Mangler.mangle_internal_method(&mangled, method_name);
                if let Some(f) = self.module.get_function(&internal_name) {
                    return Ok(f);
                }
            }
            current = self.classes.get(&cls).and_then(|i| i.parent.clone());
        }
        Err(LoweringError::MethodNotFound(class_name.to_string(), method_name.to_string()))
    }

    /// Method resolution per spec.md's dispatch algorithm: an
    /// interface-typed receiver always dispatches through its trampoline's
    /// vtable; a class-typed receiver whose method is virtual (owned by
    /// some ancestor's vtable, per `resolve_virtual_impl`'s own
    /// construction-time fill-in) dispatches through the object's own
    /// vtable pointer; anything else resolves straight to the statically
    /// mangled symbol, matching non-virtual calls and native classes
    /// (`String`/`Range`) that never have a vtable at all.
    pub(crate) fn call_method(
        &mut self,
        obj: PointerValue<'ctx>,
        class_name: &str,
        method_name: &str,
        args: &[x_ast::Expr],
    ) -> Result<Option<BasicValueEnum<'ctx>>, LoweringError> {
        if self.interfaces.contains_key(class_name) {
            return self.call_interface_method(obj, class_name, method_name, args);
        }
        if let Some((vtable_ptr, idx, vtable_ty)) = self.virtual_dispatch_slot(obj, class_name, method_name) {
            let callee = self.find_method(class_name, method_name)?;
            let mut llvm_args = vec![obj.into()];
            for a in args {
                llvm_args.push(self.lower_expr(a)?.into());
            }
            let ptr_ty = self.context.ptr_type(AddressSpace::default());
            let fn_ptr_ptr = self.builder.build_struct_gep(vtable_ty, vtable_ptr, idx, "vslot").unwrap();
            let fn_ptr = self.builder.build_load(ptr_ty, fn_ptr_ptr, "vfn").unwrap().into_pointer_value();
            let call = self.builder.build_indirect_call(callee.get_type(), fn_ptr, &llvm_args, "").unwrap();
            return Ok(call.try_as_basic_value().left());
        }
        let callee = self.find_method(class_name, method_name)?;
        let mut llvm_args = vec![obj.into()];
        for a in args {
            llvm_args.push(self.lower_expr(a)?.into());
        }
        let call = self.builder.build_call(callee, &llvm_args, "").unwrap();
        Ok(call.try_as_basic_value().left())
    }

    /// Walks `class_name`'s ancestor chain (gep-ing into each level's
    /// embedded parent slot exactly like `get_prop`) for the nearest
    /// ancestor whose own vtable actually owns `method_name`'s slot,
    /// returning the loaded vtable pointer, the slot's index, and the
    /// vtable's struct type so the caller can gep+load the function
    /// pointer itself. `None` means the method isn't virtual at all.
    fn virtual_dispatch_slot(
        &mut self,
        obj: PointerValue<'ctx>,
        class_name: &str,
        method_name: &str,
    ) -> Option<(PointerValue<'ctx>, u32, StructType<'ctx>)> {
        let mut current = Some(class_name.to_string());
        let mut current_obj = obj;
        while let Some(cls) = current {
            let info = self.classes.get(&cls)?;
            if let (Some(vtable_slot), Some(vtable_ty)) = (info.vtable_slot, info.vtable_type) {
                if let Some(idx) = info.vtable_slots.iter().position(|s| s.method_name == method_name) {
                    let llvm_type = info.llvm_type;
                    let vtable_field = self.builder.build_struct_gep(llvm_type, current_obj, vtable_slot, "vtable_field").unwrap();
                    let ptr_ty = self.context.ptr_type(AddressSpace::default());
                    let vtable_ptr = self.builder.build_load(ptr_ty, vtable_field, "vtable").unwrap().into_pointer_value();
                    return Some((vtable_ptr, idx as u32, vtable_ty));
                }
            }
            let llvm_type = info.llvm_type;
            if let Some(parent_slot) = info.parent_slot {
                current_obj = self.builder.build_struct_gep(llvm_type, current_obj, parent_slot, "parent").unwrap();
            }
            current = info.parent.clone();
        }
        None
    }

    /// Calls an interface method through `value`'s trampoline: loads the
    /// trampoline's own vtable pointer, resolves `method_name`'s slot
    /// within the interface's vtable layout, and indirect-calls through
    /// it, passing the trampoline's boxed concrete object pointer (not the
    /// trampoline itself) as the receiver — `instantiate_interface` filled
    /// every slot with implementations that expect the concrete object.
    fn call_interface_method(
        &mut self,
        value: PointerValue<'ctx>,
        interface_name: &str,
        method_name: &str,
        args: &[x_ast::Expr],
    ) -> Result<Option<BasicValueEnum<'ctx>>, LoweringError> {
        let value_ty = self.interface_values[interface_name].llvm_type;
        let ptr_ty = self.context.ptr_type(AddressSpace::default());

        let vtable_field = self.builder.build_struct_gep(value_ty, value, 0, "iface_vtable_field").unwrap();
        let vtable_ptr = self.builder.build_load(ptr_ty, vtable_field, "iface_vtable").unwrap().into_pointer_value();
        let obj_field = self.builder.build_struct_gep(value_ty, value, 1, "iface_obj_field").unwrap();
        let obj_ptr = self.builder.build_load(ptr_ty, obj_field, "iface_obj").unwrap().into_pointer_value();

        let idx = self.interfaces[interface_name]
            .vtable_slots
            .iter()
            .position(|s| s.method_name == method_name)
            .ok_or_else(|| LoweringError::MethodNotFound(interface_name.to_string(), method_name.to_string()))?;
        let vtable_ty = self.interfaces[interface_name].vtable_type;

        let mut llvm_args = vec![obj_ptr.into()];
        for a in args {
            llvm_args.push(self.lower_expr(a)?.into());
        }

        let fn_ptr_ptr = self.builder.build_struct_gep(vtable_ty, vtable_ptr, idx as u32, "islot").unwrap();
        let fn_ptr = self.builder.build_load(ptr_ty, fn_ptr_ptr, "ifn").unwrap().into_pointer_value();
        let fn_type = self.interface_method_fn_type(interface_name, method_name);
        let call = self.builder.build_indirect_call(fn_type, fn_ptr, &llvm_args, "").unwrap();
        Ok(call.try_as_basic_value().left())
    }

    /// The function type a given interface method's slot holds, built
    /// straight from its `MethodDecl` (`this: ptr` plus its declared
    /// args/return) since a vtable slot is just `ptr` at the LLVM level —
    /// the only way to get a callable `FunctionType` back out of it.
    fn interface_method_fn_type(&mut self, interface_name: &str, method_name: &str) -> inkwell::types::FunctionType<'ctx> {
        let decl = self.rt.interface_methods[interface_name][method_name].fn_decl.clone();
        let ptr_ty = self.context.ptr_type(AddressSpace::default());
        let mut param_types = vec![ptr_ty.as_basic_type_enum()];
        for arg in &decl.args {
            param_types.push(self.map_type(&arg.ty));
        }
        let param_meta: Vec<_> = param_types.iter().map(|t| (*t).into()).collect();
        if decl.return_type.is(TypeId::Void) {
            self.context.void_type().fn_type(&param_meta, false)
        } else {
            let ret = self.map_type(&decl.return_type);
            ret.fn_type(&param_meta, false)
        }
    }

    pub(crate) fn call_static_method(
        &mut self,
        class_name: &str,
        method_name: &str,
        args: &[x_ast::Expr],
    ) -> Result<Option<BasicValueEnum<'ctx>>, LoweringError> {
        let callee = self.find_method(class_name, method_name)?;
        let mut llvm_args = Vec::with_capacity(args.len());
        for a in args {
            llvm_args.push(self.lower_expr(a)?.into());
        }
        let call = self.builder.build_call(callee, &llvm_args, "").unwrap();
        Ok(call.try_as_basic_value().left())
    }

    /// Boxes `value` (a `class_name` pointer) into the three-field
    /// trampoline for `interface_name`, allocated lazily right here at the
    /// cast site (§4.6 "Interface Values" — no trampoline exists until a
    /// concrete value actually needs to flow through an interface-typed
    /// slot).
    pub(crate) fn instantiate_interface(
        &mut self,
        value: PointerValue<'ctx>,
        class_name: &str,
        interface_name: &str,
    ) -> PointerValue<'ctx> {
        log::trace!("boxing {class_name} into {interface_name} trampoline");
        let value_ty = self.interface_values[interface_name].llvm_type;
        let iface_vtable_type = self.interfaces[interface_name].vtable_type;
        let iface_slots = self.interfaces[interface_name].vtable_slots.clone();

        let mut entries = Vec::with_capacity(iface_slots.len());
        for slot in &iface_slots {
            let callee = self
                .find_method(class_name, &slot.method_name)
                .expect("interface checking already proved every method is implemented");
            entries.push(callee.as_global_value().as_pointer_value());
        }
        let mangled_class = Mangler.mangle_class(class_name);
        let mangled_iface = Mangler.mangle_interface(interface_name);
        let vtable_global = self.module.add_global(
            iface_vtable_type,
            None,
            &format!("{mangled_class}.{mangled_iface}.vtable"),
        );
        vtable_global.set_initializer(&iface_vtable_type.const_named_struct(
            &entries.iter().map(|p| (*p).into()).collect::<Vec<_>>(),
        ));

        let size = self.context.i64_type().const_int(self.size_of_struct(value_ty), false);
        let trampoline = self.gc_alloc(size);
        let vtable_ptr = self.builder.build_struct_gep(value_ty, trampoline, 0, "iface_vtable").unwrap();
        self.builder.build_store(vtable_ptr, vtable_global.as_pointer_value()).unwrap();
        let obj_ptr = self.builder.build_struct_gep(value_ty, trampoline, 1, "iface_obj").unwrap();
        self.builder.build_store(obj_ptr, value).unwrap();
        let meta_ptr = self.builder.build_struct_gep(value_ty, trampoline, 2, "iface_meta").unwrap();
        let meta_id = self.classes[class_name].gc_meta_id;
        let meta_const = self.context.i64_type().const_int(meta_id, false);
        self.builder
            .build_store(meta_ptr, self.builder.build_int_to_ptr(meta_const, self.context.ptr_type(AddressSpace::default()), "meta_ptr").unwrap())
            .unwrap();

        trampoline
    }

    pub(crate) fn default_value(&mut self, ty: &Type) -> BasicValueEnum<'ctx> {
        match ty.id {
            TypeId::Int => self.context.i64_type().const_int(0, false).into(),
            TypeId::Float => self.context.f64_type().const_float(0.0).into(),
            TypeId::Bool => self.context.bool_type().const_int(0, false).into(),
            TypeId::String | TypeId::Class | TypeId::Array => {
                self.context.ptr_type(AddressSpace::default()).const_null().into()
            }
            TypeId::Void | TypeId::Auto | TypeId::SelfTy => unreachable!("not a value type"),
        }
    }

    /// GC metadata id for a type's static shape, `None` for scalars that
    /// carry no pointer (§4.6 step 3, `getTypeGCMeta` in the donor).
    pub(crate) fn gc_meta_for_type(&mut self, ty: &Type) -> Option<u64> {
        match ty.id {
            TypeId::Class => Some(self.classes.get(ty.class_name()?)?.gc_meta_id),
            TypeId::String => Some(match self.string_meta_id {
                Some(id) => id,
                None => {
                    let id = self.fresh_gc_meta_id();
                    self.string_meta_id = Some(id);
                    id
                }
            }),
            TypeId::Array => Some(match self.array_meta_ids.get(ty) {
                Some(id) => *id,
                None => {
                    let id = self.fresh_gc_meta_id();
                    self.array_meta_ids.insert(ty.clone(), id);
                    id
                }
            }),
            _ => None,
        }
    }

    /// Implicit widening conversions only (§4.5 "int -> float", "class ->
    /// ancestor/interface"); anything else is a type-checker bug reaching
    /// the lowerer (§7).
    pub(crate) fn cast_to(&mut self, value: BasicValueEnum<'ctx>, from: &Type, to: &Type) -> BasicValueEnum<'ctx> {
        if from == to {
            return value;
        }
        if from.is(TypeId::Int) && to.is(TypeId::Float) {
            return self
                .builder
                .build_signed_int_to_float(value.into_int_value(), self.context.f64_type(), "int2float")
                .unwrap()
                .into();
        }
        // class -> ancestor is a no-op bitcast at the value level since
        // every object already embeds its parent at slot 0 (pointer
        // identity is preserved); class -> interface boxes a trampoline.
        if to.is(TypeId::Class) {
            if let (Some(from_name), Some(to_name)) = (from.class_name(), to.class_name()) {
                if self.interfaces.contains_key(to_name) {
                    return self.instantiate_interface(value.into_pointer_value(), from_name, to_name).into();
                }
            }
            return value;
        }
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use x_ast::builder::*;
    use x_ast::{AccessModifier, ClassDef, Program};

    fn class(name: &str, parent: Option<&str>) -> ClassDef {
        ClassDef {
            name: name.to_string(),
            parent: parent.map(str::to_string),
            interfaces: vec![],
            is_abstract: false,
            props: vec![],
            methods: Default::default(),
            abstract_methods: Default::default(),
        }
    }

    #[test]
    fn vtable_dispatch_resolves_to_most_derived_override() {
        // class Animal { fn speak() void {...} }
        // class Dog extends Animal { fn speak() void {...} }
        // Animal a = new Dog(); a.speak();
        let mut program = Program::new();

        let mut animal = class("Animal", None);
        animal.methods.insert(
            "speak".to_string(),
            method_def(fn_def(fn_decl("speak", vec![], Type::void()), vec![println(string("animal"))]), AccessModifier::Public, false),
        );
        program.classes.push(animal);

        let mut dog = class("Dog", Some("Animal"));
        dog.methods.insert(
            "speak".to_string(),
            method_def(fn_def(fn_decl("speak", vec![], Type::void()), vec![println(string("dog"))]), AccessModifier::Public, false),
        );
        program.classes.push(dog);

        let decl_stmt = decl("a", Type::class("Animal"), Some(new_obj("Dog", vec![])));
        let call_stmt = expr_stmt(method_call(var("a"), "speak", vec![]));
        program.funcs.push(fn_def(fn_decl("main", vec![], Type::void()), vec![decl_stmt, call_stmt]));

        let rt = crate::run_passes(&mut program).expect("passes should accept this program");

        let context = inkwell::context::Context::create();
        let mut lowerer = crate::Lowerer::new(&context, "x", &rt);
        lowerer.lower_program(&program).expect("program should lower");

        // Dog owns no vtable field of its own (only Animal, the declaring
        // ancestor, does) but still gets its own resolved copy of Animal's
        // vtable, baking in Dog's override rather than Animal's.
        assert!(lowerer.classes["Dog"].resolved_vtables.contains_key("Animal"));

        let module = lowerer.into_module();
        module.verify().expect("module should verify");
        let ir = module.print_to_string().to_string();

        let dog_vtable_line = ir
            .lines()
            .find(|l| l.contains("class.Dog.class.Animal.vtable.instance") && l.contains('='))
            .expect("Dog's resolved vtable for the Animal-owned slot should be emitted as a global");
        assert!(dog_vtable_line.contains("class.Dog_speak"), "Dog's own vtable should bake in its override:\n{dog_vtable_line}");
        assert!(!dog_vtable_line.contains("class.Animal_speak"), "Dog's vtable must not fall back to Animal's implementation:\n{dog_vtable_line}");

        assert!(ir.contains("%vfn"), "dispatch through a base-typed `a.speak()` should load the vtable slot indirectly:\n{ir}");
    }

    #[test]
    fn non_virtual_method_dispatches_by_direct_call() {
        // class Foo { fn greet() void {...} }, no overrides anywhere.
        let mut program = Program::new();
        let mut foo = class("Foo", None);
        foo.methods.insert(
            "greet".to_string(),
            method_def(fn_def(fn_decl("greet", vec![], Type::void()), vec![println(string("hi"))]), AccessModifier::Public, false),
        );
        program.classes.push(foo);

        let decl_stmt = decl("f", Type::class("Foo"), Some(new_obj("Foo", vec![])));
        let call_stmt = expr_stmt(method_call(var("f"), "greet", vec![]));
        program.funcs.push(fn_def(fn_decl("main", vec![], Type::void()), vec![decl_stmt, call_stmt]));

        let rt = crate::run_passes(&mut program).expect("passes should accept this program");
        let context = inkwell::context::Context::create();
        let mut lowerer = crate::Lowerer::new(&context, "x", &rt);
        lowerer.lower_program(&program).expect("program should lower");
        assert!(lowerer.classes["Foo"].vtable_type.is_none(), "a class with no overridden method gets no vtable at all");

        let module = lowerer.into_module();
        module.verify().expect("module should verify");
        let ir = module.print_to_string().to_string();
        assert!(ir.contains("class.Foo_greet"), "a non-virtual method call should resolve straight to its symbol:\n{ir}");
    }

    #[test]
    fn prop_init_chains_to_parent_and_stores_field_initializer() {
        // class Base { int x = 42; }
        // class Derived extends Base { int y; }
        let mut program = Program::new();

        let mut base = class("Base", None);
        base.props.push(prop_decl("x", Type::int(), Some(int(42)), AccessModifier::Public, false));
        program.classes.push(base);

        let mut derived = class("Derived", Some("Base"));
        derived.props.push(prop_decl("y", Type::int(), None, AccessModifier::Public, false));
        program.classes.push(derived);

        program
            .funcs
            .push(fn_def(fn_decl("main", vec![], Type::void()), vec![expr_stmt(new_obj("Derived", vec![]))]));

        let rt = crate::run_passes(&mut program).expect("passes should accept this program");
        let context = inkwell::context::Context::create();
        let mut lowerer = crate::Lowerer::new(&context, "x", &rt);
        lowerer.lower_program(&program).expect("program should lower");
        let module = lowerer.into_module();
        module.verify().expect("module should verify");

        assert!(module.get_function("class.Base.init").is_some(), "Base's hidden initializer should be declared");
        assert!(module.get_function("class.Derived.init").is_some(), "Derived's hidden initializer should be declared");

        let ir = module.print_to_string().to_string();
        let base_init_body = ir
            .split("define void @\"class.Base.init\"")
            .nth(1)
            .and_then(|rest| rest.split('}').next())
            .expect("Base's init function body should be emitted");
        assert!(base_init_body.contains("store"), "Base's init should store its field-initializer value:\n{base_init_body}");
        assert!(base_init_body.contains("42"), "Base's init should evaluate its literal initializer:\n{base_init_body}");

        let derived_init_body = ir
            .split("define void @\"class.Derived.init\"")
            .nth(1)
            .and_then(|rest| rest.split('}').next())
            .expect("Derived's init function body should be emitted");
        assert!(
            derived_init_body.contains("class.Base.init"),
            "Derived's init should chain to its parent's init before running its own field stores:\n{derived_init_body}"
        );
    }
}
