//! `print`/`die` runtime, grounded on `runtime/print.cpp`/`runtime.cpp`.
//!
//! The donor dispatches through a single C varargs `print(TypeID, ...)`.
//! Varargs have no idiomatic representation through `inkwell`, and by the
//! time a `println` reaches codegen its operand's type is already known
//! (§4.5 rejects `void`/`class`/`array` operands before this point), so
//! the lowerer instead picks one of the four typed entry points below —
//! statically dispatched, no libc varargs ABI involved.

use std::io::Write;

use crate::string_rt::XString;

pub unsafe extern "C" fn x_print_int(v: i64) {
    print!("{v}");
}

pub unsafe extern "C" fn x_print_float(v: f64) {
    print!("{v}");
}

pub unsafe extern "C" fn x_print_bool(v: bool) {
    print!("{}", if v { "true" } else { "false" });
}

/// # Safety
/// `s` must be a valid, readable `*const XString`.
pub unsafe extern "C" fn x_print_string(s: *const XString) {
    let bytes = std::slice::from_raw_parts((*s).str, (*s).len as usize);
    std::io::stdout().write_all(bytes).ok();
}

pub unsafe extern "C" fn x_print_newline() {
    println!();
}

/// # Safety
/// `msg` must be a valid, readable `*const XString`.
pub unsafe extern "C" fn x_die(msg: *const XString) -> ! {
    let bytes = std::slice::from_raw_parts((*msg).str, (*msg).len as usize);
    die_with_message(&String::from_utf8_lossy(bytes))
}

/// Used both by `x_die` and by runtime functions that hit an unrecoverable
/// state the type checker couldn't have prevented (e.g. a zero-step
/// `Range`), mirroring the donor's `std::abort()` call sites.
pub fn die_with_message(msg: &str) -> ! {
    eprintln!("x: {msg}");
    std::process::exit(1);
}
