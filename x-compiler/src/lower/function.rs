//! Function/method body codegen (§4.6 step 5), grounded on
//! `codegen/function.cpp`'s `genFn`.

use inkwell::types::BasicType;
use x_ast::{FnDef, MethodDef, CONSTRUCTOR_FN_NAME};

use crate::error::LoweringError;
use x_ast::Mangler;

impl<'a, 'ctx> super::Lowerer<'a, 'ctx> {
    pub(crate) fn gen_func(&mut self, func: &FnDef) -> Result<(), LoweringError> {
        let function = self
            .module
            .get_function(&func.decl.name)
            .expect("declared in decl_funcs");
        self.gen_fn_body(function, &func.decl.args, &func.decl.return_type, &func.body, None)
    }

    pub(crate) fn gen_method(
        &mut self,
        class_name: &str,
        method_name: &str,
        method: &MethodDef,
    ) -> Result<(), LoweringError> {
        let mangled = Mangler.mangle_class(class_name);
        let fn_name = Mangler.mangle_method(&mangled, &method.fn_def.decl.name);
        let function = self.module.get_function(&fn_name).expect("declared in decl_methods");

        let this_class = if method.is_static { None } else { Some(class_name.to_string()) };
        self.self_class = Some(class_name.to_string());
        let ret_type = self.resolve_self_return(&method.fn_def.decl.return_type, class_name);
        self.gen_fn_body(function, &method.fn_def.decl.args, &ret_type, &method.fn_def.body, this_class)?;
        self.self_class = None;
        let _ = method_name;
        Ok(())
    }

    /// Lowers the synthesized default constructor (`construct(this) {}`)
    /// for classes without a user-written one (§4.6 step 4).
    pub(crate) fn gen_default_constructor(&mut self, class_name: &str) -> Result<(), LoweringError> {
        let mangled = Mangler.mangle_class(class_name);
        let fn_name = Mangler.mangle_method(&mangled, CONSTRUCTOR_FN_NAME);
        let function = self.module.get_function(&fn_name).expect("declared in decl_methods");
        self.gen_fn_body(function, &[], &x_ast::Type::void(), &[], Some(class_name.to_string()))
    }

    fn resolve_self_return(&self, ty: &x_ast::Type, class_name: &str) -> x_ast::Type {
        if ty.is(x_ast::TypeId::SelfTy) {
            x_ast::Type::class(class_name.to_string())
        } else {
            ty.clone()
        }
    }

    fn gen_fn_body(
        &mut self,
        function: inkwell::values::FunctionValue<'ctx>,
        args: &[x_ast::Arg],
        return_type: &x_ast::Type,
        body: &[x_ast::Stmt],
        this_class: Option<String>,
    ) -> Result<(), LoweringError> {
        let entry = self.context.append_basic_block(function, "entry");
        self.builder.position_at_end(entry);

        self.current_fn = Some(function);
        self.current_fn_ret_type = return_type.clone();
        self.this_class = this_class.clone();
        self.gc_push_stack_frame();

        let offset = if this_class.is_some() { 1 } else { 0 };
        let mut scope = super::Scope::new();

        if let Some(class_name) = &this_class {
            let this_param = function.get_nth_param(0).unwrap().into_pointer_value();
            let llvm_type = self.classes[class_name].llvm_type;
            let this_alloca = self.create_alloca(llvm_type.as_basic_type_enum(), "this");
            self.builder.build_store(this_alloca, this_param).unwrap();
            self.this_value = Some(this_alloca);
        } else {
            self.this_value = None;
        }

        for (i, arg) in args.iter().enumerate() {
            let param = function.get_nth_param((i + offset) as u32).unwrap();
            let llvm_ty = self.map_type(&arg.ty);
            let alloca = self.create_alloca(llvm_ty, &arg.name);
            self.builder.build_store(alloca, param).unwrap();
            scope.insert(arg.name.clone(), super::Var { ptr: alloca, ty: llvm_ty });

            if let Some(meta_id) = self.gc_meta_for_type(&arg.ty) {
                self.gc_add_root(alloca, meta_id);
            }
        }
        self.var_scopes.push(scope);

        let mut last_terminated = false;
        for stmt in body {
            self.lower_stmt(stmt)?;
            last_terminated = stmt.is_terminate();
        }

        if !last_terminated && self.builder.get_insert_block().unwrap().get_terminator().is_none() {
            self.gc_pop_stack_frame();
            self.builder.build_return(None).unwrap();
        }

        self.var_scopes.pop();
        self.this_value = None;
        self.this_class = None;
        self.current_fn = None;

        Ok(())
    }
}
