//! Call sites into the native GC/string ABI (§4.6 "GC root registration"),
//! grounded on `codegen/gc.cpp`'s `gcAlloc`/`gcAddRoot` helpers and on
//! `x_runtime::registrations()`, whose mangled names these declarations
//! must match exactly for `x-driver`'s `add_global_mapping` calls to bind.

use inkwell::values::{FunctionValue, PointerValue};
use inkwell::AddressSpace;
use x_ast::Mangler;

use super::Lowerer;

impl<'a, 'ctx> Lowerer<'a, 'ctx> {
    /// Declares (once) and returns a native function by its unmangled
    /// internal name, e.g. `"gcAlloc"` -> `x.gcAlloc`.
    pub(crate) fn native_fn(
        &mut self,
        name: &str,
        fn_type: inkwell::types::FunctionType<'ctx>,
    ) -> FunctionValue<'ctx> {
        let mangled = Mangler.mangle_internal_function(name);
        self.module
            .get_function(&mangled)
            .unwrap_or_else(|| self.module.add_function(&mangled, fn_type, None))
    }

    /// Native method on an internal runtime class (`String`/`Range`),
    /// e.g. `("String", "concat")` -> `x.class.String_concat`.
    pub(crate) fn native_method(
        &mut self,
        mangled_class: &str,
        method: &str,
        fn_type: inkwell::types::FunctionType<'ctx>,
    ) -> FunctionValue<'ctx> {
        let mangled = Mangler.mangle_internal_method(mangled_class, method);
        self.module
            .get_function(&mangled)
            .unwrap_or_else(|| self.module.add_function(&mangled, fn_type, None))
    }

    /// `x.gcAlloc(&gc, size) -> *u8`, zero-initialized heap allocation
    /// tracked by the collector (§4.6, `gc::Gc::alloc`).
    pub(crate) fn gc_alloc(&mut self, size: inkwell::values::IntValue<'ctx>) -> PointerValue<'ctx> {
        let ptr_ty = self.context.ptr_type(AddressSpace::default());
        let i64_ty = self.context.i64_type();
        let fn_type = ptr_ty.fn_type(&[ptr_ty.into(), i64_ty.into()], false);
        let callee = self.native_fn("gcAlloc", fn_type);
        let gc_handle = self.gc_handle();
        self.builder
            .build_call(callee, &[gc_handle.into(), size.into()], "gc_alloc")
            .unwrap()
            .try_as_basic_value()
            .left()
            .unwrap()
            .into_pointer_value()
    }

    pub(crate) fn gc_realloc(
        &mut self,
        ptr: PointerValue<'ctx>,
        size: inkwell::values::IntValue<'ctx>,
    ) -> PointerValue<'ctx> {
        let ptr_ty = self.context.ptr_type(AddressSpace::default());
        let i64_ty = self.context.i64_type();
        let fn_type = ptr_ty.fn_type(&[ptr_ty.into(), ptr_ty.into(), i64_ty.into()], false);
        let callee = self.native_fn("gcRealloc", fn_type);
        let gc_handle = self.gc_handle();
        self.builder
            .build_call(callee, &[gc_handle.into(), ptr.into(), size.into()], "gc_realloc")
            .unwrap()
            .try_as_basic_value()
            .left()
            .unwrap()
            .into_pointer_value()
    }

    /// Registers a stack slot as a root for the duration of the enclosing
    /// function, tagged with the compile-time GC metadata id of its static
    /// type (§4.6 decl phase step 3). A no-op for scalar (non-pointer)
    /// types — only class/string/array slots carry GC-managed pointers.
    pub(crate) fn gc_add_root(&mut self, slot: PointerValue<'ctx>, meta_id: u64) {
        let ptr_ty = self.context.ptr_type(AddressSpace::default());
        let i64_ty = self.context.i64_type();
        let fn_type = self.context.void_type().fn_type(&[ptr_ty.into(), ptr_ty.into(), i64_ty.into()], false);
        let callee = self.native_fn("gcAddRoot", fn_type);
        let gc_handle = self.gc_handle();
        let id = i64_ty.const_int(meta_id, false);
        self.builder
            .build_call(callee, &[gc_handle.into(), slot.into(), id.into()], "")
            .unwrap();
    }

    pub(crate) fn gc_add_global_root(&mut self, slot: PointerValue<'ctx>, meta_id: u64) {
        let ptr_ty = self.context.ptr_type(AddressSpace::default());
        let i64_ty = self.context.i64_type();
        let fn_type = self.context.void_type().fn_type(&[ptr_ty.into(), ptr_ty.into(), i64_ty.into()], false);
        let callee = self.native_fn("gcAddGlobalRoot", fn_type);
        let gc_handle = self.gc_handle();
        let id = i64_ty.const_int(meta_id, false);
        self.builder
            .build_call(callee, &[gc_handle.into(), slot.into(), id.into()], "")
            .unwrap();
    }

    pub(crate) fn gc_push_stack_frame(&mut self) {
        let ptr_ty = self.context.ptr_type(AddressSpace::default());
        let fn_type = self.context.void_type().fn_type(&[ptr_ty.into()], false);
        let callee = self.native_fn("gcPushStackFrame", fn_type);
        let gc_handle = self.gc_handle();
        self.builder.build_call(callee, &[gc_handle.into()], "").unwrap();
    }

    pub(crate) fn gc_pop_stack_frame(&mut self) {
        let ptr_ty = self.context.ptr_type(AddressSpace::default());
        let fn_type = self.context.void_type().fn_type(&[ptr_ty.into()], false);
        let callee = self.native_fn("gcPopStackFrame", fn_type);
        let gc_handle = self.gc_handle();
        self.builder.build_call(callee, &[gc_handle.into()], "").unwrap();
    }

    /// The `*mut *mut Gc` handle every GC-facing native call takes as its
    /// first argument; `x-driver` installs the real double-pointer as a
    /// global before the JIT runs (§4.6, `gc::Gc`'s `**` ABI).
    pub(crate) fn gc_handle(&mut self) -> PointerValue<'ctx> {
        let ptr_ty = self.context.ptr_type(AddressSpace::default());
        let global = self
            .module
            .get_global("x.gcHandle")
            .unwrap_or_else(|| {
                let g = self.module.add_global(ptr_ty, None, "x.gcHandle");
                g.set_initializer(&ptr_ty.const_null());
                g
            });
        global.as_pointer_value()
    }

    /// Pre-declares every native-runtime method reachable from source via
    /// ordinary `MethodCall` syntax (`"abc".length()`, a `Range`'s
    /// `get[]`), so `find_method` always has something to resolve even if
    /// no other codegen path happens to touch that native shape first
    /// (§4.6, mirrors `x_runtime::registrations()`'s method table).
    pub(crate) fn decl_natives(&mut self) {
        let ptr_ty = self.context.ptr_type(AddressSpace::default());
        let i64_ty = self.context.i64_type();
        let bool_ty = self.context.bool_type();
        let void_ty = self.context.void_type();

        // The ABI table names these `x.class.String_construct` etc. (§6) —
        // `x_runtime::registrations()`'s `reg_method!` mangles the class
        // name the same way before handing it to `mangle_internal_method`.
        let string = Mangler.mangle_class("String");
        let range = Mangler.mangle_class("Range");

        self.native_method(&string, "construct", void_ty.fn_type(&[ptr_ty.into(), ptr_ty.into(), i64_ty.into()], false));
        self.native_method(&string, "concat", ptr_ty.fn_type(&[ptr_ty.into(), ptr_ty.into()], false));
        self.native_method(&string, "length", i64_ty.fn_type(&[ptr_ty.into()], false));
        self.native_method(&string, "isEmpty", bool_ty.fn_type(&[ptr_ty.into()], false));
        self.native_method(&string, "trim", ptr_ty.fn_type(&[ptr_ty.into()], false));
        self.native_method(&string, "toLower", ptr_ty.fn_type(&[ptr_ty.into()], false));
        self.native_method(&string, "toUpper", ptr_ty.fn_type(&[ptr_ty.into()], false));
        self.native_method(&string, "index", i64_ty.fn_type(&[ptr_ty.into(), ptr_ty.into()], false));
        self.native_method(&string, "contains", bool_ty.fn_type(&[ptr_ty.into(), ptr_ty.into()], false));
        self.native_method(&string, "startsWith", bool_ty.fn_type(&[ptr_ty.into(), ptr_ty.into()], false));
        self.native_method(&string, "endsWith", bool_ty.fn_type(&[ptr_ty.into(), ptr_ty.into()], false));
        self.native_method(&string, "substring", ptr_ty.fn_type(&[ptr_ty.into(), i64_ty.into(), i64_ty.into()], false));
        self.native_fn("compareStrings", bool_ty.fn_type(&[ptr_ty.into(), ptr_ty.into()], false));
        self.native_fn("createEmptyString", ptr_ty.fn_type(&[], false));

        self.native_method(&range, "create", ptr_ty.fn_type(&[i64_ty.into(), i64_ty.into(), i64_ty.into()], false));
        self.native_method(&range, "length", i64_ty.fn_type(&[ptr_ty.into()], false));
        self.native_method(&range, "get[]", i64_ty.fn_type(&[ptr_ty.into(), i64_ty.into()], false));
    }

    /// Builds an `x.String` literal from a Rust `&str` and calls `x.die`
    /// with it, then marks the current block unreachable — the lowered
    /// equivalent of the donor's `std::abort()` call sites (array bounds,
    /// zero range step).
    pub(crate) fn emit_abort(&mut self, message: &str) {
        let string_ptr = self.build_string_literal(message);
        let ptr_ty = self.context.ptr_type(AddressSpace::default());
        let fn_type = self.context.void_type().fn_type(&[ptr_ty.into()], false);
        let callee = self.native_fn("die", fn_type);
        self.builder.build_call(callee, &[string_ptr.into()], "").unwrap();
        self.builder.build_unreachable().unwrap();
    }
}
