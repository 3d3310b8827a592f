//! Expression codegen (§4.6 step 5), grounded on `codegen/expr.cpp`.

use inkwell::values::BasicValueEnum;
use inkwell::AddressSpace;
use inkwell::{FloatPredicate, IntPredicate};

use x_ast::{BinaryOp, Expr, ExprKind, Type, TypeId, UnaryOp};

use crate::error::LoweringError;
use x_ast::Mangler;

impl<'a, 'ctx> super::Lowerer<'a, 'ctx> {
    pub(crate) fn lower_expr(&mut self, expr: &Expr) -> Result<BasicValueEnum<'ctx>, LoweringError> {
        match &expr.kind {
            ExprKind::IntLit(v) => Ok(self.context.i64_type().const_int(*v as u64, true).into()),
            ExprKind::FloatLit(v) => Ok(self.context.f64_type().const_float(*v).into()),
            ExprKind::BoolLit(v) => Ok(self.context.bool_type().const_int(*v as u64, false).into()),
            ExprKind::StringLit(s) => Ok(self.build_string_literal(s).into()),
            ExprKind::ArrayLit(elems) => self.lower_array_lit(elems, expr),
            ExprKind::Var(name) => {
                let var = self
                    .get_var(name)
                    .ok_or_else(|| LoweringError::MethodNotFound("<local>".into(), name.clone()))?;
                Ok(self.builder.build_load(var.ty, var.ptr, name).unwrap())
            }
            ExprKind::Unary { op, operand, prefix } => self.lower_unary(*op, operand, *prefix),
            ExprKind::Binary { op, lhs, rhs } => self.lower_binary(*op, lhs, rhs),
            ExprKind::FetchProp { object, name } => {
                let obj = self.lower_expr(object)?.into_pointer_value();
                let class_name = object.ty().unwrap().class_name().unwrap().to_string();
                let (ty, ptr) = self.get_prop(obj, &class_name, name)?;
                let llvm_ty = self.map_type(&ty);
                Ok(self.builder.build_load(llvm_ty, ptr, name).unwrap())
            }
            ExprKind::FetchStaticProp { class_name, name } => {
                let (ty, ptr) = self.get_static_prop(class_name, name)?;
                let llvm_ty = self.map_type(&ty);
                Ok(self.builder.build_load(llvm_ty, ptr, name).unwrap())
            }
            ExprKind::MethodCall { object, name, args } => {
                let obj = self.lower_expr(object)?.into_pointer_value();
                let obj_ty = object.ty().unwrap();
                if obj_ty.is(TypeId::Array) {
                    let elem_ty = obj_ty.array_element().unwrap().clone();
                    let result = self.call_array_method(obj, &elem_ty, name, args)?;
                    Ok(result.unwrap_or_else(|| self.void_sentinel()))
                } else {
                    // `String` has no `class_name` of its own (§3 Data
                    // Model) but its methods live under the `"String"`
                    // native class the same way a user class's would.
                    let class_name = if obj_ty.is(TypeId::String) {
                        "String".to_string()
                    } else {
                        obj_ty.class_name().unwrap().to_string()
                    };
                    let result = self.call_method(obj, &class_name, name, args)?;
                    Ok(result.unwrap_or_else(|| self.void_sentinel()))
                }
            }
            ExprKind::StaticMethodCall { class_name, name, args } => {
                let result = self.call_static_method(class_name, name, args)?;
                Ok(result.unwrap_or_else(|| self.void_sentinel()))
            }
            ExprKind::FetchArr { array, index } => {
                let arr = self.lower_expr(array)?.into_pointer_value();
                let elem_ty = array.ty().unwrap().array_element().unwrap().clone();
                let idx = self.lower_expr(index)?.into_int_value();
                let get_fn = self.ensure_array_type(&elem_ty).get_fn;
                Ok(self.builder.build_call(get_fn, &[arr.into(), idx.into()], "elem").unwrap().try_as_basic_value().left().unwrap())
            }
            ExprKind::New { class_name, args } => Ok(self.new_obj(class_name, args)?.into()),
            ExprKind::Call { name, args } => {
                let callee = self
                    .module
                    .get_function(name)
                    .ok_or_else(|| LoweringError::MethodNotFound("<free function>".into(), name.clone()))?;
                let mut llvm_args = Vec::with_capacity(args.len());
                for a in args {
                    llvm_args.push(self.lower_expr(a)?.into());
                }
                let call = self.builder.build_call(callee, &llvm_args, "").unwrap();
                Ok(call.try_as_basic_value().left().unwrap_or_else(|| self.void_sentinel()))
            }
            ExprKind::Range { start, stop, step } => self.lower_range(start.as_deref(), stop, step.as_deref()),
        }
    }

    /// A zero-sized placeholder value for a statement-position call whose
    /// result is discarded (`void` methods/funcs don't produce a usable
    /// `BasicValueEnum`, but `lower_expr`'s signature always returns one).
    fn void_sentinel(&self) -> BasicValueEnum<'ctx> {
        self.context.bool_type().const_int(0, false).into()
    }

    fn lower_array_lit(&mut self, elems: &[Expr], expr: &Expr) -> Result<BasicValueEnum<'ctx>, LoweringError> {
        let elem_ty = expr.ty().unwrap().array_element().unwrap().clone();
        let mut values = Vec::with_capacity(elems.len());
        for e in elems {
            values.push(self.lower_expr(e)?);
        }
        let info = self.ensure_array_type(&elem_ty);
        let construct_fn = info.construct_fn;
        let set_fn = info.set_fn;
        let llvm_type = info.llvm_type;
        let arr_ptr_ty = self.context.ptr_type(AddressSpace::default());
        let arr_alloca = self.create_alloca(arr_ptr_ty.into(), "arraylit");
        let len = self.context.i64_type().const_int(values.len() as u64, false);
        // The header itself is GC-heap-allocated, not a stack slot of the
        // current function: an array literal can be returned, stored into a
        // field, or assigned to a global, all of which outlive this frame.
        let header_size = self.context.i64_type().const_int(self.size_of_struct(llvm_type), false);
        let arr = self.gc_alloc(header_size);
        self.builder.build_call(construct_fn, &[arr.into(), len.into()], "").unwrap();
        for (i, v) in values.into_iter().enumerate() {
            let idx = self.context.i64_type().const_int(i as u64, false);
            self.builder.build_call(set_fn, &[arr.into(), idx.into(), v.into()], "").unwrap();
        }
        self.builder.build_store(arr_alloca, arr).unwrap();
        Ok(self.builder.build_load(arr_ptr_ty.into(), arr_alloca, "arraylit").unwrap())
    }

    fn lower_unary(&mut self, op: UnaryOp, operand: &Expr, prefix: bool) -> Result<BasicValueEnum<'ctx>, LoweringError> {
        match op {
            UnaryOp::Not => {
                let v = self.lower_expr(operand)?.into_int_value();
                Ok(self.builder.build_not(v, "not").unwrap().into())
            }
            UnaryOp::Inc | UnaryOp::Dec => {
                let ExprKind::Var(name) = &operand.kind else {
                    unreachable!("inc/dec operand is always a variable per the grammar");
                };
                let var = self.get_var(name).ok_or_else(|| LoweringError::MethodNotFound("<local>".into(), name.clone()))?;
                let old = self.builder.build_load(var.ty, var.ptr, name).unwrap();
                let new = match old {
                    BasicValueEnum::IntValue(i) => {
                        let one = i.get_type().const_int(1, false);
                        let v = if op == UnaryOp::Inc {
                            self.builder.build_int_add(i, one, "inc").unwrap()
                        } else {
                            self.builder.build_int_sub(i, one, "dec").unwrap()
                        };
                        v.into()
                    }
                    BasicValueEnum::FloatValue(f) => {
                        let one = f.get_type().const_float(1.0);
                        let v = if op == UnaryOp::Inc {
                            self.builder.build_float_add(f, one, "inc").unwrap()
                        } else {
                            self.builder.build_float_sub(f, one, "dec").unwrap()
                        };
                        v.into()
                    }
                    _ => unreachable!("inc/dec only applies to numeric locals"),
                };
                self.builder.build_store(var.ptr, new).unwrap();
                Ok(if prefix { new } else { old })
            }
        }
    }

    fn lower_binary(&mut self, op: BinaryOp, lhs: &Expr, rhs: &Expr) -> Result<BasicValueEnum<'ctx>, LoweringError> {
        let lhs_ty = lhs.ty().unwrap();
        let rhs_ty = rhs.ty().unwrap();
        let l = self.lower_expr(lhs)?;
        let r = self.lower_expr(rhs)?;

        if lhs_ty.is(TypeId::String) && rhs_ty.is(TypeId::String) {
            return self.lower_string_binary(op, l, r);
        }

        match op {
            BinaryOp::And => return Ok(self.builder.build_and(l.into_int_value(), r.into_int_value(), "and").unwrap().into()),
            BinaryOp::Or => return Ok(self.builder.build_or(l.into_int_value(), r.into_int_value(), "or").unwrap().into()),
            _ => {}
        }

        // `/` always forces float upcast even for two ints, matching
        // `forceUpcast` in `expr.cpp`; every other numeric op uses ordinary
        // `int -> float` upcast only when operands' types differ.
        let force_float = op == BinaryOp::Div;
        let (l, r, is_float) = self.upcast_numeric(l, r, force_float);

        if is_float {
            self.lower_float_binary(op, l.into_float_value(), r.into_float_value())
        } else {
            self.lower_int_binary(op, l.into_int_value(), r.into_int_value())
        }
    }

    fn lower_string_binary(&mut self, op: BinaryOp, l: BasicValueEnum<'ctx>, r: BasicValueEnum<'ctx>) -> Result<BasicValueEnum<'ctx>, LoweringError> {
        let ptr_ty = self.context.ptr_type(AddressSpace::default());
        match op {
            BinaryOp::Add => {
                let fn_type = ptr_ty.fn_type(&[ptr_ty.into(), ptr_ty.into()], false);
                let mangled = Mangler.mangle_class("String");
                let callee = self.native_method(&mangled, "concat", fn_type);
                Ok(self.builder.build_call(callee, &[l.into(), r.into()], "concat").unwrap().try_as_basic_value().left().unwrap())
            }
            BinaryOp::Eq | BinaryOp::Neq => {
                let bool_ty = self.context.bool_type();
                let fn_type = bool_ty.fn_type(&[ptr_ty.into(), ptr_ty.into()], false);
                let callee = self.native_fn("compareStrings", fn_type);
                let eq = self.builder.build_call(callee, &[l.into(), r.into()], "streq").unwrap().try_as_basic_value().left().unwrap().into_int_value();
                if op == BinaryOp::Eq {
                    Ok(eq.into())
                } else {
                    Ok(self.builder.build_not(eq, "strneq").unwrap().into())
                }
            }
            _ => unreachable!("type checker rejects other operators on strings"),
        }
    }

    /// Mirrors `upcast`/`forceUpcast`: widens `int -> float` only when
    /// either side is already a float, or when `force` is set (`/` always
    /// produces a float result, even `int / int`).
    fn upcast_numeric(
        &mut self,
        l: BasicValueEnum<'ctx>,
        r: BasicValueEnum<'ctx>,
        force: bool,
    ) -> (BasicValueEnum<'ctx>, BasicValueEnum<'ctx>, bool) {
        let l_is_float = matches!(l, BasicValueEnum::FloatValue(_));
        let r_is_float = matches!(r, BasicValueEnum::FloatValue(_));
        if !force && !l_is_float && !r_is_float {
            return (l, r, false);
        }
        let f64_ty = self.context.f64_type();
        let l = if let BasicValueEnum::IntValue(i) = l {
            self.builder.build_signed_int_to_float(i, f64_ty, "i2f").unwrap().into()
        } else {
            l
        };
        let r = if let BasicValueEnum::IntValue(i) = r {
            self.builder.build_signed_int_to_float(i, f64_ty, "i2f").unwrap().into()
        } else {
            r
        };
        (l, r, true)
    }

    fn lower_int_binary(
        &mut self,
        op: BinaryOp,
        l: inkwell::values::IntValue<'ctx>,
        r: inkwell::values::IntValue<'ctx>,
    ) -> Result<BasicValueEnum<'ctx>, LoweringError> {
        let v = match op {
            BinaryOp::Add => self.builder.build_int_add(l, r, "add").unwrap().into(),
            BinaryOp::Sub => self.builder.build_int_sub(l, r, "sub").unwrap().into(),
            BinaryOp::Mul => self.builder.build_int_mul(l, r, "mul").unwrap().into(),
            BinaryOp::Div => self.builder.build_int_signed_div(l, r, "div").unwrap().into(),
            BinaryOp::Mod => self.builder.build_int_signed_rem(l, r, "mod").unwrap().into(),
            BinaryOp::Pow => self.build_int_pow(l, r).into(),
            BinaryOp::Eq => self.builder.build_int_compare(IntPredicate::EQ, l, r, "eq").unwrap().into(),
            BinaryOp::Neq => self.builder.build_int_compare(IntPredicate::NE, l, r, "ne").unwrap().into(),
            BinaryOp::Lt => self.builder.build_int_compare(IntPredicate::SLT, l, r, "lt").unwrap().into(),
            BinaryOp::Le => self.builder.build_int_compare(IntPredicate::SLE, l, r, "le").unwrap().into(),
            BinaryOp::Gt => self.builder.build_int_compare(IntPredicate::SGT, l, r, "gt").unwrap().into(),
            BinaryOp::Ge => self.builder.build_int_compare(IntPredicate::SGE, l, r, "ge").unwrap().into(),
            BinaryOp::And | BinaryOp::Or => unreachable!("handled before numeric upcast"),
        };
        Ok(v)
    }

    fn lower_float_binary(
        &mut self,
        op: BinaryOp,
        l: inkwell::values::FloatValue<'ctx>,
        r: inkwell::values::FloatValue<'ctx>,
    ) -> Result<BasicValueEnum<'ctx>, LoweringError> {
        let v = match op {
            BinaryOp::Add => self.builder.build_float_add(l, r, "add").unwrap().into(),
            BinaryOp::Sub => self.builder.build_float_sub(l, r, "sub").unwrap().into(),
            BinaryOp::Mul => self.builder.build_float_mul(l, r, "mul").unwrap().into(),
            BinaryOp::Div => self.builder.build_float_div(l, r, "div").unwrap().into(),
            BinaryOp::Mod => self.builder.build_float_rem(l, r, "mod").unwrap().into(),
            BinaryOp::Pow => self.build_float_pow(l, r).into(),
            BinaryOp::Eq => self.builder.build_float_compare(FloatPredicate::OEQ, l, r, "eq").unwrap().into(),
            BinaryOp::Neq => self.builder.build_float_compare(FloatPredicate::ONE, l, r, "ne").unwrap().into(),
            BinaryOp::Lt => self.builder.build_float_compare(FloatPredicate::OLT, l, r, "lt").unwrap().into(),
            BinaryOp::Le => self.builder.build_float_compare(FloatPredicate::OLE, l, r, "le").unwrap().into(),
            BinaryOp::Gt => self.builder.build_float_compare(FloatPredicate::OGT, l, r, "gt").unwrap().into(),
            BinaryOp::Ge => self.builder.build_float_compare(FloatPredicate::OGE, l, r, "ge").unwrap().into(),
            BinaryOp::And | BinaryOp::Or => unreachable!("handled before numeric upcast"),
        };
        Ok(v)
    }

    /// Exponentiation by squaring, built inline as ordinary loop IR — there
    /// is no integer-power native in `x_runtime` (only a host `libm` call
    /// makes sense for floats), so this is generated directly rather than
    /// invented as a fabricated native dependency.
    fn build_int_pow(&mut self, base: inkwell::values::IntValue<'ctx>, exp: inkwell::values::IntValue<'ctx>) -> inkwell::values::IntValue<'ctx> {
        let i64_ty = self.context.i64_type();
        let function = self.current_fn.unwrap();

        let result_alloca = self.create_alloca(i64_ty.into(), "pow_result");
        let base_alloca = self.create_alloca(i64_ty.into(), "pow_base");
        let exp_alloca = self.create_alloca(i64_ty.into(), "pow_exp");
        self.builder.build_store(result_alloca, i64_ty.const_int(1, false)).unwrap();
        self.builder.build_store(base_alloca, base).unwrap();
        self.builder.build_store(exp_alloca, exp).unwrap();

        let cond_bb = self.context.append_basic_block(function, "powcond");
        let body_bb = self.context.append_basic_block(function, "powbody");
        let odd_bb = self.context.append_basic_block(function, "powodd");
        let cont_bb = self.context.append_basic_block(function, "powcont");
        let end_bb = self.context.append_basic_block(function, "powend");

        self.builder.build_unconditional_branch(cond_bb).unwrap();
        self.builder.position_at_end(cond_bb);
        let e = self.builder.build_load(i64_ty, exp_alloca, "e").unwrap().into_int_value();
        let more = self.builder.build_int_compare(IntPredicate::SGT, e, i64_ty.const_int(0, false), "more").unwrap();
        self.builder.build_conditional_branch(more, body_bb, end_bb).unwrap();

        self.builder.position_at_end(body_bb);
        let e = self.builder.build_load(i64_ty, exp_alloca, "e").unwrap().into_int_value();
        let is_odd = self
            .builder
            .build_int_compare(IntPredicate::NE, self.builder.build_int_and(e, i64_ty.const_int(1, false), "e_and_1").unwrap(), i64_ty.const_int(0, false), "is_odd")
            .unwrap();
        self.builder.build_conditional_branch(is_odd, odd_bb, cont_bb).unwrap();

        self.builder.position_at_end(odd_bb);
        let result = self.builder.build_load(i64_ty, result_alloca, "result").unwrap().into_int_value();
        let b = self.builder.build_load(i64_ty, base_alloca, "b").unwrap().into_int_value();
        let new_result = self.builder.build_int_mul(result, b, "new_result").unwrap();
        self.builder.build_store(result_alloca, new_result).unwrap();
        self.builder.build_unconditional_branch(cont_bb).unwrap();

        self.builder.position_at_end(cont_bb);
        let b = self.builder.build_load(i64_ty, base_alloca, "b").unwrap().into_int_value();
        let new_base = self.builder.build_int_mul(b, b, "new_base").unwrap();
        self.builder.build_store(base_alloca, new_base).unwrap();
        let e = self.builder.build_load(i64_ty, exp_alloca, "e").unwrap().into_int_value();
        let new_exp = self.builder.build_right_shift(e, i64_ty.const_int(1, false), false, "new_exp").unwrap();
        self.builder.build_store(exp_alloca, new_exp).unwrap();
        self.builder.build_unconditional_branch(cond_bb).unwrap();

        self.builder.position_at_end(end_bb);
        self.builder.build_load(i64_ty, result_alloca, "pow").unwrap().into_int_value()
    }

    /// `llvm.pow.f64` is a standard LLVM intrinsic, not a hand-rolled
    /// native call — declaring a function under its exact name is enough
    /// for LLVM to recognize and lower it (to a host `libm` `pow` call at
    /// JIT time).
    fn build_float_pow(&mut self, l: inkwell::values::FloatValue<'ctx>, r: inkwell::values::FloatValue<'ctx>) -> inkwell::values::FloatValue<'ctx> {
        let f64_ty = self.context.f64_type();
        let fn_type = f64_ty.fn_type(&[f64_ty.into(), f64_ty.into()], false);
        let callee = self
            .module
            .get_function("llvm.pow.f64")
            .unwrap_or_else(|| self.module.add_function("llvm.pow.f64", fn_type, None));
        self.builder.build_call(callee, &[l.into(), r.into()], "pow").unwrap().try_as_basic_value().left().unwrap().into_float_value()
    }

    /// Builds an `x.String` from a compile-time literal via a global
    /// constant string pointer, matching `ScalarNode`'s `STRING` case in
    /// `expr.cpp` (`CreateGlobalStringPtr` + the `String` constructor).
    pub(crate) fn build_string_literal(&mut self, s: &str) -> inkwell::values::PointerValue<'ctx> {
        let ptr_ty = self.context.ptr_type(AddressSpace::default());
        let i64_ty = self.context.i64_type();
        let llvm_type = self.native_struct_type("class.native.String");
        // Heap-allocated for the same reason as array literals' header
        // above: a string literal's value can escape this frame.
        let header_size = self.context.i64_type().const_int(self.size_of_struct(llvm_type), false);
        let str_alloca = self.gc_alloc(header_size);
        let data_ptr = self.builder.build_global_string_ptr(s, "strdata").unwrap().as_pointer_value();
        let len = i64_ty.const_int(s.len() as u64, false);
        let fn_type = self.context.void_type().fn_type(&[ptr_ty.into(), ptr_ty.into(), i64_ty.into()], false);
        let mangled = Mangler.mangle_class("String");
        let ctor = self.native_method(&mangled, "construct", fn_type);
        self.builder.build_call(ctor, &[str_alloca.into(), data_ptr.into(), len.into()], "").unwrap();
        str_alloca
    }

    /// `a..b[..step]`: `x.class.Range_create` allocates and returns the
    /// `XRange` pointer itself (unlike `String`'s caller-allocates
    /// convention), so there is no local struct to stack-allocate here.
    fn lower_range(&mut self, start: Option<&Expr>, stop: &Expr, step: Option<&Expr>) -> Result<BasicValueEnum<'ctx>, LoweringError> {
        let i64_ty = self.context.i64_type();
        let ptr_ty = self.context.ptr_type(AddressSpace::default());
        let start_v = match start {
            Some(e) => self.lower_expr(e)?.into_int_value(),
            None => i64_ty.const_int(0, false),
        };
        let stop_v = self.lower_expr(stop)?.into_int_value();
        let step_v = match step {
            Some(e) => self.lower_expr(e)?.into_int_value(),
            None => i64_ty.const_int(1, false),
        };

        let fn_type = ptr_ty.fn_type(&[i64_ty.into(), i64_ty.into(), i64_ty.into()], false);
        let mangled = Mangler.mangle_class("Range");
        let create_fn = self.native_method(&mangled, "create", fn_type);
        let range = self
            .builder
            .build_call(create_fn, &[start_v.into(), stop_v.into(), step_v.into()], "range")
            .unwrap()
            .try_as_basic_value()
            .left()
            .unwrap();
        Ok(range)
    }

    /// The `{ data: *u8, len: i64 }` layout of `x_runtime::string_rt::XString`
    /// (`#[repr(C)]`), declared once so generated code can stack-allocate a
    /// caller-owned `that` to pass into `x.String_construct`.
    fn native_struct_type(&mut self, name: &str) -> inkwell::types::StructType<'ctx> {
        if let Some(ty) = self.context.get_struct_type(name) {
            return ty;
        }
        let ptr_ty = self.context.ptr_type(AddressSpace::default());
        let i64_ty = self.context.i64_type();
        let ty = self.context.opaque_struct_type(name);
        ty.set_body(&[ptr_ty.into(), i64_ty.into()], false);
        ty
    }

    /// `println(expr)`: dispatches on static type to the matching typed
    /// `x.print*` native, then `x.printNewline` — the runtime has no
    /// combined "print + newline" entry point, matching `print_rt`'s four
    /// typed printers plus its separate newline call.
    pub(crate) fn lower_println(&mut self, value: BasicValueEnum<'ctx>, ty: &Type) {
        let void_ty = self.context.void_type();
        let (name, param_ty): (&str, inkwell::types::BasicTypeEnum) = match ty.id {
            TypeId::Int => ("printInt", self.context.i64_type().into()),
            TypeId::Float => ("printFloat", self.context.f64_type().into()),
            TypeId::Bool => ("printBool", self.context.bool_type().into()),
            _ => ("printString", self.context.ptr_type(AddressSpace::default()).into()),
        };
        let fn_type = void_ty.fn_type(&[param_ty.into()], false);
        let callee = self.native_fn(name, fn_type);
        self.builder.build_call(callee, &[value.into()], "").unwrap();
        let newline_fn = self.native_fn("printNewline", void_ty.fn_type(&[], false));
        self.builder.build_call(newline_fn, &[], "").unwrap();
    }
}
