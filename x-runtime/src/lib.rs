//! Native runtime the JIT-compiled module calls into: the GC, the
//! `String`/`Range` value types, and `print`/`die`. `Array` has no entry
//! here — its constructor/getter/setter/length/append are generated
//! directly as LLVM IR per element type by the lowerer (grounded on
//! `runtime/array.h`'s `ArrayRuntime::add`), not implemented as native
//! functions.

pub mod gc;
pub mod print_rt;
pub mod range_rt;
pub mod string_rt;

use x_ast::Mangler;

/// One native function's JIT-visible name and address, ready to be fed to
/// `inkwell::ExecutionEngine::add_global_mapping`. Built once per
/// execution by [`registrations`].
pub struct Registration {
    pub symbol: String,
    pub address: usize,
}

/// Every native symbol generated code may call, paired with the mangled
/// name the lowerer emits a call to. Grounded on `runtime.cpp`'s
/// `addDefinitions`, minus `Array`'s functions (see module docs) and
/// `print`'s single varargs entry point (split into four typed ones, see
/// `print_rt`).
pub fn registrations() -> Vec<Registration> {
    let m = Mangler;
    macro_rules! reg {
        ($name:expr, $f:expr) => {
            Registration {
                symbol: m.mangle_internal_function($name),
                address: $f as usize,
            }
        };
    }
    // `mangle_internal_method` takes an already-mangled class name (see its
    // own doc comment and test) — the ABI table names these
    // `x.class.String_construct` etc., so the class name is run through
    // `mangle_class` first, matching how the lowerer's `native_method`
    // resolves the same symbol from the other side.
    macro_rules! reg_method {
        ($class:expr, $name:expr, $f:expr) => {
            Registration {
                symbol: m.mangle_internal_method(&m.mangle_class($class), $name),
                address: $f as usize,
            }
        };
    }

    vec![
        reg!("die", print_rt::x_die as unsafe extern "C" fn(*const string_rt::XString) -> !),
        reg!("printInt", print_rt::x_print_int as unsafe extern "C" fn(i64)),
        reg!("printFloat", print_rt::x_print_float as unsafe extern "C" fn(f64)),
        reg!("printBool", print_rt::x_print_bool as unsafe extern "C" fn(bool)),
        reg!(
            "printString",
            print_rt::x_print_string as unsafe extern "C" fn(*const string_rt::XString)
        ),
        reg!("printNewline", print_rt::x_print_newline as unsafe extern "C" fn()),
        reg!(
            "compareStrings",
            string_rt::x_compare_strings
                as unsafe extern "C" fn(*const string_rt::XString, *const string_rt::XString) -> bool
        ),
        reg_method!(
            "String",
            "construct",
            string_rt::x_string_construct as unsafe extern "C" fn(*mut string_rt::XString, *const u8, u64)
        ),
        reg_method!(
            "String",
            "concat",
            string_rt::x_string_concat
                as unsafe extern "C" fn(*const string_rt::XString, *const string_rt::XString) -> *mut string_rt::XString
        ),
        reg_method!(
            "String",
            "length",
            string_rt::x_string_length as unsafe extern "C" fn(*const string_rt::XString) -> u64
        ),
        reg_method!(
            "String",
            "isEmpty",
            string_rt::x_string_is_empty as unsafe extern "C" fn(*const string_rt::XString) -> bool
        ),
        reg_method!(
            "String",
            "trim",
            string_rt::x_string_trim
                as unsafe extern "C" fn(*const string_rt::XString) -> *mut string_rt::XString
        ),
        reg_method!(
            "String",
            "toLower",
            string_rt::x_string_to_lower
                as unsafe extern "C" fn(*const string_rt::XString) -> *mut string_rt::XString
        ),
        reg_method!(
            "String",
            "toUpper",
            string_rt::x_string_to_upper
                as unsafe extern "C" fn(*const string_rt::XString) -> *mut string_rt::XString
        ),
        reg_method!(
            "String",
            "index",
            string_rt::x_string_index
                as unsafe extern "C" fn(*const string_rt::XString, *const string_rt::XString) -> i64
        ),
        reg_method!(
            "String",
            "contains",
            string_rt::x_string_contains
                as unsafe extern "C" fn(*const string_rt::XString, *const string_rt::XString) -> bool
        ),
        reg_method!(
            "String",
            "startsWith",
            string_rt::x_string_starts_with
                as unsafe extern "C" fn(*const string_rt::XString, *const string_rt::XString) -> bool
        ),
        reg_method!(
            "String",
            "endsWith",
            string_rt::x_string_ends_with
                as unsafe extern "C" fn(*const string_rt::XString, *const string_rt::XString) -> bool
        ),
        reg_method!(
            "String",
            "substring",
            string_rt::x_string_substring
                as unsafe extern "C" fn(*const string_rt::XString, i64, i64) -> *mut string_rt::XString
        ),
        reg!(
            "createEmptyString",
            string_rt::x_create_empty_string as unsafe extern "C" fn() -> *mut string_rt::XString
        ),
        reg_method!(
            "Range",
            "create",
            range_rt::x_range_create as unsafe extern "C" fn(i64, i64, i64) -> *mut range_rt::XRange
        ),
        reg_method!(
            "Range",
            "length",
            range_rt::x_range_length as unsafe extern "C" fn(*const range_rt::XRange) -> i64
        ),
        reg_method!(
            "Range",
            "get[]",
            range_rt::x_range_get as unsafe extern "C" fn(*const range_rt::XRange, i64) -> i64
        ),
        reg!("gcAlloc", gc::x_gc_alloc as unsafe extern "C" fn(*mut *mut gc::Gc, u64) -> *mut u8),
        reg!(
            "gcRealloc",
            gc::x_gc_realloc as unsafe extern "C" fn(*mut *mut gc::Gc, *mut u8, u64) -> *mut u8
        ),
        reg!(
            "gcPushStackFrame",
            gc::x_gc_push_stack_frame as unsafe extern "C" fn(*mut *mut gc::Gc)
        ),
        reg!(
            "gcPopStackFrame",
            gc::x_gc_pop_stack_frame as unsafe extern "C" fn(*mut *mut gc::Gc)
        ),
        reg!(
            "gcAddRoot",
            gc::x_gc_add_root as unsafe extern "C" fn(*mut *mut gc::Gc, *mut *mut u8, u64)
        ),
        reg!(
            "gcAddGlobalRoot",
            gc::x_gc_add_global_root as unsafe extern "C" fn(*mut *mut gc::Gc, *mut *mut u8, u64)
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_registration_has_the_internal_prefix() {
        for r in registrations() {
            assert!(r.symbol.starts_with("x."), "{}", r.symbol);
            assert_ne!(r.address, 0);
        }
    }
}
