//! Statement codegen (§4.6 step 5), grounded on `codegen/statement.cpp`.

use inkwell::types::BasicType;
use x_ast::{Stmt, StmtKind};

use crate::error::LoweringError;

impl<'a, 'ctx> super::Lowerer<'a, 'ctx> {
    pub(crate) fn lower_stmt(&mut self, stmt: &Stmt) -> Result<(), LoweringError> {
        match &stmt.kind {
            StmtKind::List(stmts) => {
                for s in stmts {
                    self.lower_stmt(s)?;
                }
                Ok(())
            }
            StmtKind::Decl { name, ty, init } => {
                let llvm_ty = self.map_type(ty);
                let alloca = self.create_alloca(llvm_ty, name);
                let value = match init {
                    Some(expr) => {
                        let v = self.lower_expr(expr)?;
                        self.cast_to(v, &expr.ty().unwrap(), ty)
                    }
                    None => self.default_value(ty),
                };
                self.builder.build_store(alloca, value).unwrap();
                self.var_scopes.last_mut().unwrap().insert(name.clone(), super::Var { ptr: alloca, ty: llvm_ty });
                if let Some(meta_id) = self.gc_meta_for_type(ty) {
                    self.gc_add_root(alloca, meta_id);
                }
                Ok(())
            }
            StmtKind::Assign { name, value } => {
                let var = self.get_var(name).ok_or_else(|| LoweringError::MethodNotFound("<local>".into(), name.clone()))?;
                let v = self.lower_expr(value)?;
                self.builder.build_store(var.ptr, v).unwrap();
                Ok(())
            }
            StmtKind::AssignProp { object, name, value } => {
                let obj = self.lower_expr(object)?.into_pointer_value();
                let class_name = object.ty().unwrap().class_name().unwrap().to_string();
                let (prop_ty, ptr) = self.get_prop(obj, &class_name, name)?;
                let v = self.lower_expr(value)?;
                let v = self.cast_to(v, &value.ty().unwrap(), &prop_ty);
                self.builder.build_store(ptr, v).unwrap();
                Ok(())
            }
            StmtKind::AssignStaticProp { class_name, name, value } => {
                let (prop_ty, ptr) = self.get_static_prop(class_name, name)?;
                let v = self.lower_expr(value)?;
                let v = self.cast_to(v, &value.ty().unwrap(), &prop_ty);
                self.builder.build_store(ptr, v).unwrap();
                Ok(())
            }
            StmtKind::AssignArr { array, index, value } => {
                let arr = self.lower_expr(array)?.into_pointer_value();
                let elem_ty = array.ty().unwrap().array_element().unwrap().clone();
                let idx = self.lower_expr(index)?.into_int_value();
                let v = self.lower_expr(value)?;
                let info_set_fn = self.ensure_array_type(&elem_ty).set_fn;
                self.builder.build_call(info_set_fn, &[arr.into(), idx.into(), v.into()], "").unwrap();
                Ok(())
            }
            StmtKind::AppendArr { array, value } => {
                let arr = self.lower_expr(array)?.into_pointer_value();
                let elem_ty = array.ty().unwrap().array_element().unwrap().clone();
                let v = self.lower_expr(value)?;
                let append_fn = self.ensure_array_type(&elem_ty).append_fn;
                self.builder.build_call(append_fn, &[arr.into(), v.into()], "").unwrap();
                Ok(())
            }
            StmtKind::If { cond, then_branch, else_branch } => self.lower_if(cond, then_branch, else_branch.as_deref()),
            StmtKind::While { cond, body } => self.lower_while(cond, body),
            StmtKind::ForIn { idx_name, val_name, iterable, body } => self.lower_for_in(idx_name.as_deref(), val_name, iterable, body),
            StmtKind::Break => {
                let (_, end) = *self.loops.last().expect("break outside loop rejected earlier, guard anyway");
                self.builder.build_unconditional_branch(end).unwrap();
                Ok(())
            }
            StmtKind::Continue => {
                let (start, _) = *self.loops.last().expect("continue outside loop rejected earlier, guard anyway");
                self.builder.build_unconditional_branch(start).unwrap();
                Ok(())
            }
            StmtKind::Return(value) => {
                match value {
                    Some(expr) => {
                        let v = self.lower_expr(expr)?;
                        let v = self.cast_to(v, &expr.ty().unwrap(), &self.current_fn_ret_type.clone());
                        self.gc_pop_stack_frame();
                        self.builder.build_return(Some(&v)).unwrap();
                    }
                    None => {
                        self.gc_pop_stack_frame();
                        self.builder.build_return(None).unwrap();
                    }
                }
                Ok(())
            }
            StmtKind::Println(expr) => {
                let v = self.lower_expr(expr)?;
                self.lower_println(v, &expr.ty().unwrap());
                Ok(())
            }
            StmtKind::Comment(_) => Ok(()),
            StmtKind::Expr(expr) => {
                self.lower_expr(expr)?;
                Ok(())
            }
        }
    }

    fn lower_if(&mut self, cond: &x_ast::Expr, then_branch: &Stmt, else_branch: Option<&Stmt>) -> Result<(), LoweringError> {
        let cond_val = self.lower_expr(cond)?.into_int_value();
        let function = self.current_fn.unwrap();

        let then_bb = self.context.append_basic_block(function, "then");
        let else_bb = self.context.append_basic_block(function, "else");
        let merge_bb = self.context.append_basic_block(function, "ifcont");

        self.builder.build_conditional_branch(cond_val, then_bb, else_bb).unwrap();

        self.builder.position_at_end(then_bb);
        self.lower_stmt(then_branch)?;
        if !then_branch.is_terminate() {
            self.builder.build_unconditional_branch(merge_bb).unwrap();
        }

        self.builder.position_at_end(else_bb);
        if let Some(else_branch) = else_branch {
            self.lower_stmt(else_branch)?;
            if !else_branch.is_terminate() {
                self.builder.build_unconditional_branch(merge_bb).unwrap();
            }
        } else {
            self.builder.build_unconditional_branch(merge_bb).unwrap();
        }

        self.builder.position_at_end(merge_bb);
        Ok(())
    }

    fn lower_while(&mut self, cond: &x_ast::Expr, body: &Stmt) -> Result<(), LoweringError> {
        let function = self.current_fn.unwrap();
        let cond_bb = self.context.append_basic_block(function, "loopcond");
        let body_bb = self.context.append_basic_block(function, "loop");
        let end_bb = self.context.append_basic_block(function, "loopend");

        self.builder.build_unconditional_branch(cond_bb).unwrap();
        self.builder.position_at_end(cond_bb);
        let cond_val = self.lower_expr(cond)?.into_int_value();
        self.builder.build_conditional_branch(cond_val, body_bb, end_bb).unwrap();

        self.builder.position_at_end(body_bb);
        self.loops.push((cond_bb, end_bb));
        self.lower_stmt(body)?;
        self.loops.pop();
        if self.builder.get_insert_block().unwrap().get_terminator().is_none() {
            self.builder.build_unconditional_branch(cond_bb).unwrap();
        }

        self.builder.position_at_end(end_bb);
        Ok(())
    }

    /// `for [idx,] val in arr_or_range`: desugars to an index-driven loop
    /// over `length()`/`get[]`, matching `ForNode` codegen in
    /// `statement.cpp` (the `Array` case; `Range` uses its own
    /// `length`/`get[]` native pair identically).
    fn lower_for_in(
        &mut self,
        idx_name: Option<&str>,
        val_name: &str,
        iterable: &x_ast::Expr,
        body: &Stmt,
    ) -> Result<(), LoweringError> {
        let iter_val = self.lower_expr(iterable)?.into_pointer_value();
        let iter_ty = iterable.ty().unwrap();
        let function = self.current_fn.unwrap();
        let i64_ty = self.context.i64_type();

        let (length_fn, get_fn, val_llvm_ty) = if iter_ty.is(x_ast::TypeId::Array) {
            let elem = iter_ty.array_element().unwrap().clone();
            let info = self.ensure_array_type(&elem);
            (info.length_fn, info.get_fn, self.map_type(&elem))
        } else {
            let mangled = x_ast::Mangler.mangle_class("Range");
            let length_fn = self.native_method(&mangled, "length", i64_ty.fn_type(&[self.context.ptr_type(inkwell::AddressSpace::default()).into()], false));
            let get_fn = self.native_method(
                &mangled,
                "get[]",
                i64_ty.fn_type(&[self.context.ptr_type(inkwell::AddressSpace::default()).into(), i64_ty.into()], false),
            );
            (length_fn, get_fn, i64_ty.as_basic_type_enum())
        };

        let iter_alloca = self.create_alloca(i64_ty.as_basic_type_enum(), "i");
        self.builder.build_store(iter_alloca, i64_ty.const_int(0, false)).unwrap();

        let idx_alloca = idx_name.map(|n| self.create_alloca(i64_ty.as_basic_type_enum(), n));
        let val_alloca = self.create_alloca(val_llvm_ty, val_name);

        let len = self.builder.build_call(length_fn, &[iter_val.into()], "len").unwrap().try_as_basic_value().left().unwrap().into_int_value();

        let cond_bb = self.context.append_basic_block(function, "forcond");
        let body_bb = self.context.append_basic_block(function, "forbody");
        let post_bb = self.context.append_basic_block(function, "forpost");
        let end_bb = self.context.append_basic_block(function, "forend");

        self.builder.build_unconditional_branch(cond_bb).unwrap();
        self.builder.position_at_end(cond_bb);
        let i = self.builder.build_load(i64_ty, iter_alloca, "i").unwrap().into_int_value();
        let cond = self.builder.build_int_compare(inkwell::IntPredicate::SLT, i, len, "forcond").unwrap();
        self.builder.build_conditional_branch(cond, body_bb, end_bb).unwrap();

        self.builder.position_at_end(body_bb);
        if let Some(idx_alloca) = idx_alloca {
            self.builder.build_store(idx_alloca, i).unwrap();
        }
        let val = self.builder.build_call(get_fn, &[iter_val.into(), i.into()], "val").unwrap().try_as_basic_value().left().unwrap();
        self.builder.build_store(val_alloca, val).unwrap();

        let mut scope = super::Scope::new();
        if let (Some(n), Some(a)) = (idx_name, idx_alloca) {
            scope.insert(n.to_string(), super::Var { ptr: a, ty: i64_ty.as_basic_type_enum() });
        }
        scope.insert(val_name.to_string(), super::Var { ptr: val_alloca, ty: val_llvm_ty });
        self.var_scopes.push(scope);
        self.loops.push((post_bb, end_bb));
        self.lower_stmt(body)?;
        self.loops.pop();
        self.var_scopes.pop();

        if self.builder.get_insert_block().unwrap().get_terminator().is_none() {
            self.builder.build_unconditional_branch(post_bb).unwrap();
        }

        self.builder.position_at_end(post_bb);
        let i = self.builder.build_load(i64_ty, iter_alloca, "i").unwrap().into_int_value();
        let next = self.builder.build_int_add(i, i64_ty.const_int(1, false), "inext").unwrap();
        self.builder.build_store(iter_alloca, next).unwrap();
        self.builder.build_unconditional_branch(cond_bb).unwrap();

        self.builder.position_at_end(end_bb);
        Ok(())
    }
}
