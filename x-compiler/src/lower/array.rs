//! Per-element-type `Array<T>` codegen, grounded on
//! `runtime/array.h`'s `ArrayRuntime`. Unlike `String`/`Range`, arrays are
//! not a native runtime type (see `x-runtime`'s module docs): the struct
//! layout and every operation are generated here, once per concrete
//! element type, directly as LLVM IR.

use inkwell::types::{BasicType, BasicTypeEnum, StructType};
use inkwell::values::{BasicValueEnum, FunctionValue, PointerValue};
use inkwell::AddressSpace;
use inkwell::IntPredicate;

use x_ast::Type;

use crate::error::LoweringError;

use super::Lowerer;

pub(crate) struct ArrayInfo<'ctx> {
    pub llvm_type: StructType<'ctx>,
    pub elem_ty: BasicTypeEnum<'ctx>,
    pub elem_size: u64,
    pub construct_fn: FunctionValue<'ctx>,
    pub get_fn: FunctionValue<'ctx>,
    pub set_fn: FunctionValue<'ctx>,
    pub length_fn: FunctionValue<'ctx>,
    pub is_empty_fn: FunctionValue<'ctx>,
    pub append_fn: FunctionValue<'ctx>,
}

impl<'a, 'ctx> Lowerer<'a, 'ctx> {
    /// Floor on the capacity a growth step produces, even on an array's
    /// first growth from a small starting capacity (`Array::MIN_CAP` in
    /// `runtime/array.h`).
    const ARRAY_MIN_CAP: u64 = 8;

    /// Returns (declaring if needed) the `Array<T>` shape for `elem`.
    /// Idempotent: calling twice for the same element type returns the
    /// same struct/functions (mirrors `ArrayRuntime::add`'s cache).
    pub(crate) fn ensure_array_type(&mut self, elem: &Type) -> &ArrayInfo<'ctx> {
        if !self.array_types.contains_key(elem) {
            let info = self.build_array_type(elem);
            self.array_types.insert(elem.clone(), info);
        }
        self.array_types.get(elem).unwrap()
    }

    fn build_array_type(&mut self, elem: &Type) -> ArrayInfo<'ctx> {
        let mangled = format!("array.{elem}");
        let ptr_ty = self.context.ptr_type(AddressSpace::default());
        let i64_ty = self.context.i64_type();

        let struct_ty = self.context.opaque_struct_type(&mangled);
        // { data: T*, len: i64, cap: i64 }
        struct_ty.set_body(&[ptr_ty.into(), i64_ty.into(), i64_ty.into()], false);

        // The element type is mapped through the ordinary scalar/class
        // mapping, but arrays-of-arrays never reach this point (§3 Data
        // Model forbids nested array types), so recursing is safe.
        let elem_llvm = self.map_type(elem);
        let elem_size = self.size_of_basic_type(elem_llvm);

        let construct_fn = self.build_array_construct(&mangled, struct_ty, ptr_ty, i64_ty, elem_size);
        let get_fn = self.build_array_get(&mangled, struct_ty, elem_llvm, ptr_ty, i64_ty);
        let set_fn = self.build_array_set(&mangled, struct_ty, elem_llvm, ptr_ty, i64_ty);
        let length_fn = self.build_array_length(&mangled, struct_ty, ptr_ty, i64_ty);
        let is_empty_fn = self.build_array_is_empty(&mangled, struct_ty, ptr_ty);
        let append_fn = self.build_array_append(&mangled, struct_ty, elem_llvm, ptr_ty, i64_ty, elem_size);

        ArrayInfo {
            llvm_type: struct_ty,
            elem_ty: elem_llvm,
            elem_size,
            construct_fn,
            get_fn,
            set_fn,
            length_fn,
            is_empty_fn,
            append_fn,
        }
    }

    fn size_of_basic_type(&self, ty: BasicTypeEnum<'ctx>) -> u64 {
        match ty {
            BasicTypeEnum::IntType(t) if t.get_bit_width() == 1 => 1,
            BasicTypeEnum::IntType(_) => 8,
            BasicTypeEnum::FloatType(_) => 8,
            BasicTypeEnum::PointerType(_) => 8,
            _ => unreachable!("array element types are scalar, string or class pointers only"),
        }
    }

    /// `construct(arr: Array<T>*, len: i64)`: allocates a zeroed `len *
    /// sizeof(T)` backing buffer via `x.gcAlloc` and sets `len == cap ==
    /// len` (mirrors `ArrayRuntime::addConstructor`).
    fn build_array_construct(
        &mut self,
        mangled: &str,
        struct_ty: StructType<'ctx>,
        ptr_ty: inkwell::types::PointerType<'ctx>,
        i64_ty: inkwell::types::IntType<'ctx>,
        elem_size: u64,
    ) -> FunctionValue<'ctx> {
        let fn_type = self.context.void_type().fn_type(&[ptr_ty.into(), i64_ty.into()], false);
        let name = x_ast::Mangler.mangle_method(mangled, "construct");
        let function = self.module.add_function(&name, fn_type, None);
        let entry = self.context.append_basic_block(function, "entry");
        self.builder.position_at_end(entry);

        let arr = function.get_nth_param(0).unwrap().into_pointer_value();
        let len = function.get_nth_param(1).unwrap().into_int_value();

        let byte_size = self
            .builder
            .build_int_mul(len, i64_ty.const_int(elem_size, false), "bytesize")
            .unwrap();
        let data = self.gc_alloc(byte_size);

        let data_ptr = self.builder.build_struct_gep(struct_ty, arr, 0, "data_ptr").unwrap();
        self.builder.build_store(data_ptr, data).unwrap();
        let len_ptr = self.builder.build_struct_gep(struct_ty, arr, 1, "len_ptr").unwrap();
        self.builder.build_store(len_ptr, len).unwrap();
        let cap_ptr = self.builder.build_struct_gep(struct_ty, arr, 2, "cap_ptr").unwrap();
        self.builder.build_store(cap_ptr, len).unwrap();

        self.builder.build_return(None).unwrap();
        function
    }

    fn build_array_bounds_check(
        &mut self,
        struct_ty: StructType<'ctx>,
        arr: inkwell::values::PointerValue<'ctx>,
        idx: inkwell::values::IntValue<'ctx>,
        i64_ty: inkwell::types::IntType<'ctx>,
        function: FunctionValue<'ctx>,
    ) {
        let len_ptr = self.builder.build_struct_gep(struct_ty, arr, 1, "len_ptr").unwrap();
        let len = self.builder.build_load(i64_ty, len_ptr, "len").unwrap().into_int_value();

        let too_low = self
            .builder
            .build_int_compare(IntPredicate::SLT, idx, i64_ty.const_int(0, true), "too_low")
            .unwrap();
        let too_high = self.builder.build_int_compare(IntPredicate::SGE, idx, len, "too_high").unwrap();
        let oob = self.builder.build_or(too_low, too_high, "oob").unwrap();

        let ok_bb = self.context.append_basic_block(function, "bounds_ok");
        let fail_bb = self.context.append_basic_block(function, "bounds_fail");
        self.builder.build_conditional_branch(oob, fail_bb, ok_bb).unwrap();

        self.builder.position_at_end(fail_bb);
        self.emit_abort("array index out of range");

        self.builder.position_at_end(ok_bb);
    }

    fn build_array_get(
        &mut self,
        mangled: &str,
        struct_ty: StructType<'ctx>,
        elem_ty: BasicTypeEnum<'ctx>,
        ptr_ty: inkwell::types::PointerType<'ctx>,
        i64_ty: inkwell::types::IntType<'ctx>,
    ) -> FunctionValue<'ctx> {
        let fn_type = elem_ty.fn_type(&[ptr_ty.into(), i64_ty.into()], false);
        let name = x_ast::Mangler.mangle_method(mangled, "get[]");
        let function = self.module.add_function(&name, fn_type, None);
        let entry = self.context.append_basic_block(function, "entry");
        self.builder.position_at_end(entry);

        let arr = function.get_nth_param(0).unwrap().into_pointer_value();
        let idx = function.get_nth_param(1).unwrap().into_int_value();
        self.build_array_bounds_check(struct_ty, arr, idx, i64_ty, function);

        let data_ptr = self.builder.build_struct_gep(struct_ty, arr, 0, "data_ptr").unwrap();
        let data = self.builder.build_load(ptr_ty, data_ptr, "data").unwrap().into_pointer_value();
        let elem_ptr = unsafe { self.builder.build_gep(elem_ty, data, &[idx], "elem_ptr").unwrap() };
        let value = self.builder.build_load(elem_ty, elem_ptr, "elem").unwrap();

        self.builder.build_return(Some(&value)).unwrap();
        function
    }

    fn build_array_set(
        &mut self,
        mangled: &str,
        struct_ty: StructType<'ctx>,
        elem_ty: BasicTypeEnum<'ctx>,
        ptr_ty: inkwell::types::PointerType<'ctx>,
        i64_ty: inkwell::types::IntType<'ctx>,
    ) -> FunctionValue<'ctx> {
        let fn_type = self.context.void_type().fn_type(&[ptr_ty.into(), i64_ty.into(), elem_ty.into()], false);
        let name = x_ast::Mangler.mangle_method(mangled, "set[]");
        let function = self.module.add_function(&name, fn_type, None);
        let entry = self.context.append_basic_block(function, "entry");
        self.builder.position_at_end(entry);

        let arr = function.get_nth_param(0).unwrap().into_pointer_value();
        let idx = function.get_nth_param(1).unwrap().into_int_value();
        let value = function.get_nth_param(2).unwrap();
        self.build_array_bounds_check(struct_ty, arr, idx, i64_ty, function);

        let data_ptr = self.builder.build_struct_gep(struct_ty, arr, 0, "data_ptr").unwrap();
        let data = self.builder.build_load(ptr_ty, data_ptr, "data").unwrap().into_pointer_value();
        let elem_ptr = unsafe { self.builder.build_gep(elem_ty, data, &[idx], "elem_ptr").unwrap() };
        self.builder.build_store(elem_ptr, value).unwrap();

        self.builder.build_return(None).unwrap();
        function
    }

    fn build_array_length(
        &mut self,
        mangled: &str,
        struct_ty: StructType<'ctx>,
        ptr_ty: inkwell::types::PointerType<'ctx>,
        i64_ty: inkwell::types::IntType<'ctx>,
    ) -> FunctionValue<'ctx> {
        let fn_type = i64_ty.fn_type(&[ptr_ty.into()], false);
        let name = x_ast::Mangler.mangle_method(mangled, "length");
        let function = self.module.add_function(&name, fn_type, None);
        let entry = self.context.append_basic_block(function, "entry");
        self.builder.position_at_end(entry);

        let arr = function.get_nth_param(0).unwrap().into_pointer_value();
        let len_ptr = self.builder.build_struct_gep(struct_ty, arr, 1, "len_ptr").unwrap();
        let len = self.builder.build_load(i64_ty, len_ptr, "len").unwrap();

        self.builder.build_return(Some(&len)).unwrap();
        function
    }

    fn build_array_is_empty(
        &mut self,
        mangled: &str,
        struct_ty: StructType<'ctx>,
        ptr_ty: inkwell::types::PointerType<'ctx>,
    ) -> FunctionValue<'ctx> {
        let bool_ty = self.context.bool_type();
        let i64_ty = self.context.i64_type();
        let fn_type = bool_ty.fn_type(&[ptr_ty.into()], false);
        let name = x_ast::Mangler.mangle_method(mangled, "isEmpty");
        let function = self.module.add_function(&name, fn_type, None);
        let entry = self.context.append_basic_block(function, "entry");
        self.builder.position_at_end(entry);

        let arr = function.get_nth_param(0).unwrap().into_pointer_value();
        let len_ptr = self.builder.build_struct_gep(struct_ty, arr, 1, "len_ptr").unwrap();
        let len = self.builder.build_load(i64_ty, len_ptr, "len").unwrap().into_int_value();
        let is_empty = self
            .builder
            .build_int_compare(IntPredicate::EQ, len, i64_ty.const_int(0, false), "is_empty")
            .unwrap();

        self.builder.build_return(Some(&is_empty)).unwrap();
        function
    }

    /// Doubles capacity via `x.gcRealloc` whenever `len == cap`, floored
    /// at `ARRAY_MIN_CAP` so a small or empty array's first growth still
    /// lands at capacity 8 (mirrors `ArrayRuntime::addAppend`).
    fn build_array_append(
        &mut self,
        mangled: &str,
        struct_ty: StructType<'ctx>,
        elem_ty: BasicTypeEnum<'ctx>,
        ptr_ty: inkwell::types::PointerType<'ctx>,
        i64_ty: inkwell::types::IntType<'ctx>,
        elem_size: u64,
    ) -> FunctionValue<'ctx> {
        let fn_type = self.context.void_type().fn_type(&[ptr_ty.into(), elem_ty.into()], false);
        let name = x_ast::Mangler.mangle_method(mangled, "append[]");
        let function = self.module.add_function(&name, fn_type, None);
        let entry = self.context.append_basic_block(function, "entry");
        self.builder.position_at_end(entry);

        let arr = function.get_nth_param(0).unwrap().into_pointer_value();
        let value = function.get_nth_param(1).unwrap();

        let len_ptr = self.builder.build_struct_gep(struct_ty, arr, 1, "len_ptr").unwrap();
        let cap_ptr = self.builder.build_struct_gep(struct_ty, arr, 2, "cap_ptr").unwrap();
        let len = self.builder.build_load(i64_ty, len_ptr, "len").unwrap().into_int_value();
        let cap = self.builder.build_load(i64_ty, cap_ptr, "cap").unwrap().into_int_value();

        let needs_growth = self.builder.build_int_compare(IntPredicate::SGE, len, cap, "needs_growth").unwrap();
        let grow_bb = self.context.append_basic_block(function, "grow");
        let append_bb = self.context.append_basic_block(function, "append");
        self.builder.build_conditional_branch(needs_growth, grow_bb, append_bb).unwrap();

        self.builder.position_at_end(grow_bb);
        let two = i64_ty.const_int(2, false);
        let min_cap = i64_ty.const_int(Self::ARRAY_MIN_CAP, false);
        let doubled = self.builder.build_int_mul(cap, two, "doubled").unwrap();
        let below_floor = self.builder.build_int_compare(IntPredicate::SLT, doubled, min_cap, "below_floor").unwrap();
        let new_cap = self.builder.build_select(below_floor, min_cap, doubled, "new_cap").unwrap().into_int_value();
        let data_ptr = self.builder.build_struct_gep(struct_ty, arr, 0, "data_ptr").unwrap();
        let data = self.builder.build_load(ptr_ty, data_ptr, "data").unwrap().into_pointer_value();
        let new_byte_size = self
            .builder
            .build_int_mul(new_cap, i64_ty.const_int(elem_size, false), "new_bytesize")
            .unwrap();
        let new_data = self.gc_realloc(data, new_byte_size);
        self.builder.build_store(data_ptr, new_data).unwrap();
        self.builder.build_store(cap_ptr, new_cap).unwrap();
        self.builder.build_unconditional_branch(append_bb).unwrap();

        self.builder.position_at_end(append_bb);
        let data_ptr = self.builder.build_struct_gep(struct_ty, arr, 0, "data_ptr2").unwrap();
        let data = self.builder.build_load(ptr_ty, data_ptr, "data2").unwrap().into_pointer_value();
        let elem_ptr = unsafe { self.builder.build_gep(elem_ty, data, &[len], "elem_ptr").unwrap() };
        self.builder.build_store(elem_ptr, value).unwrap();
        let new_len = self.builder.build_int_add(len, one, "new_len").unwrap();
        self.builder.build_store(len_ptr, new_len).unwrap();

        self.builder.build_return(None).unwrap();
        function
    }

    /// Dispatches a `MethodCall` on an array-typed receiver to its
    /// per-element-type function (`a.length()`, `a.isEmpty()`). Arrays
    /// have no entry in `self.classes`, so this bypasses `find_method`
    /// entirely rather than pretending `"Array"` is a native class like
    /// `String`/`Range`.
    pub(crate) fn call_array_method(
        &mut self,
        obj: PointerValue<'ctx>,
        elem: &Type,
        method: &str,
        args: &[x_ast::Expr],
    ) -> Result<Option<BasicValueEnum<'ctx>>, LoweringError> {
        let info = self.ensure_array_type(elem);
        let callee = match method {
            "length" => info.length_fn,
            "isEmpty" => info.is_empty_fn,
            _ => return Err(LoweringError::MethodNotFound("Array".to_string(), method.to_string())),
        };
        let mut llvm_args = vec![obj.into()];
        for a in args {
            llvm_args.push(self.lower_expr(a)?.into());
        }
        let call = self.builder.build_call(callee, &llvm_args, "").unwrap();
        Ok(call.try_as_basic_value().left())
    }
}
