//! JIT orchestration (§4.6 "GC root registration" + the donor's own
//! execution flow in `main.cpp`): create an execution engine over the
//! lowered module, bind every native symbol in [`x_runtime::registrations`]
//! to its real address, install a live [`x_runtime::gc::Gc`] behind
//! `x.gcHandle`, run `x.init` then `main`, sweep once, and reclaim the
//! collector. The donor has no GC generation to mirror here — that half
//! of this module is this crate's own addition to close the loop `gc.rs`
//! opens on the lowering side.

use inkwell::module::Module;
use inkwell::OptimizationLevel;
use x_compiler::{GcMetaEntry, GcNodeKind};
use x_runtime::gc::{Gc, MetaId, NodeType};

use crate::error::DriverError;

/// Builds a fresh [`Gc`] whose metadata table lines up, id for id, with
/// the constants already baked into the module's `x.gcAddRoot`/
/// `x.gcAddGlobalRoot` calls (`Lowerer::gc_metadata`'s own contract).
fn build_gc(entries: Vec<GcMetaEntry>) -> Gc {
    let mut gc = Gc::new();
    for entry in entries {
        let node_type = match entry.kind {
            GcNodeKind::Class => NodeType::Class,
            GcNodeKind::Array => NodeType::Array,
        };
        let pointer_list = entry
            .pointer_list
            .into_iter()
            .map(|(offset, meta)| (offset as usize, MetaId(meta as usize)))
            .collect();
        gc.add_meta(node_type, pointer_list);
    }
    gc
}

/// Runs a verified, lowered module to completion: `x.init` (global/static
/// prop initializers) followed by `main`, then one post-run collection
/// pass before the process moves on (§8 "no leak across repeated
/// invocations", relevant when a test harness runs this in a loop).
pub fn run(module: &Module<'_>, gc_entries: Vec<GcMetaEntry>) -> Result<(), DriverError> {
    let engine = module
        .create_jit_execution_engine(OptimizationLevel::None)
        .map_err(|e| DriverError::Jit(e.to_string()))?;

    for reg in x_runtime::registrations() {
        if let Some(function) = module.get_function(&reg.symbol) {
            engine.add_global_mapping(&function, reg.address);
        }
    }

    // The backing memory for `x.gcHandle` outlives the module's own JIT
    // storage for it: `add_global_mapping` redirects every reference to
    // that global's address onto this box instead, so `x_gc_alloc` and
    // friends see a real `Gc` through the double-pointer indirection
    // `gc_handle()` bakes into every call site.
    let gc_ptr: *mut Gc = Box::into_raw(Box::new(build_gc(gc_entries)));
    let gc_slot: *mut *mut Gc = Box::into_raw(Box::new(gc_ptr));

    if let Some(handle) = module.get_global("x.gcHandle") {
        engine.add_global_mapping(&handle, gc_slot as usize);
    }

    let mangler = x_ast::Mangler;
    let init_name = mangler.mangle_internal_function(x_ast::INIT_FN_NAME);

    let result = (|| -> Result<(), DriverError> {
        unsafe {
            let init_addr = engine
                .get_function_address(&init_name)
                .map_err(|_| DriverError::FunctionNotFound(init_name.clone()))?;
            let init: extern "C" fn() = std::mem::transmute(init_addr);
            init();

            let main_addr = engine
                .get_function_address(x_ast::MAIN_FN_NAME)
                .map_err(|_| DriverError::FunctionNotFound(x_ast::MAIN_FN_NAME.to_string()))?;
            let main: extern "C" fn() = std::mem::transmute(main_addr);
            main();
        }
        Ok(())
    })();

    // Reclaim the collector regardless of outcome: a `RuntimeAbort` exits
    // the process directly (never reaches here), so this only guards
    // against a future change making `main` return normally after a
    // recoverable failure.
    let mut gc = unsafe { Box::from_raw(gc_ptr) };
    gc.run();
    drop(gc);
    unsafe {
        drop(Box::from_raw(gc_slot));
    }

    result
}
