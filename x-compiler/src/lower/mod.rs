//! The lowerer (§4.6): resolves names, vtables and object layout against
//! an already type-checked `Program` and emits `inkwell` IR for it.
//! Grounded on the donor's `codegen/codegen.h` (the `Codegen` class this
//! module mirrors one field/method at a time) plus `class.cpp`,
//! `decl.cpp`, `function.cpp`, `statement.cpp`, `expr.cpp`, `gc.cpp`.
//!
//! Every helper here assumes the program already passed
//! [`crate::run_passes`]; a `LoweringError` firing on well-typed input is
//! a bug in an earlier pass, not a user-facing diagnostic (§7).

mod array;
mod class;
mod decl;
mod expr;
mod function;
mod gc;
mod stmt;

use std::collections::HashMap;

use inkwell::basic_block::BasicBlock;
use inkwell::builder::Builder;
use inkwell::context::Context;
use inkwell::module::Module;
use inkwell::types::{BasicTypeEnum, StructType};
use inkwell::values::{FunctionValue, GlobalValue, PointerValue};
use inkwell::AddressSpace;

use x_ast::{Type, TypeId};

use crate::error::LoweringError;
use crate::CompilerRuntime;

/// A bound local variable: the stack slot plus the type it was declared
/// with, so loads/stores don't need to re-derive the LLVM type.
#[derive(Clone, Copy)]
pub(crate) struct Var<'ctx> {
    pub ptr: PointerValue<'ctx>,
    pub ty: BasicTypeEnum<'ctx>,
}

pub(crate) type Scope<'ctx> = HashMap<String, Var<'ctx>>;

/// The collector only ever sees two of the three shapes `ClassInfo`/etc.
/// model internally — interface-typed roots are a known gap (see
/// `gc_metadata`'s doc comment) — but the enum keeps the table
/// self-describing rather than assuming every entry is a class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GcNodeKind {
    Class,
    Array,
}

/// One row of the GC metadata table `x-driver` feeds to `x_runtime::gc::Gc`
/// before starting the JIT, in the same order `fresh_gc_meta_id` handed the
/// ids out (§4.6 step 3). `pointer_list` entries are `(byte_offset,
/// meta_id)` pairs, matching `x_runtime::gc::Metadata`.
pub struct GcMetaEntry {
    pub kind: GcNodeKind,
    pub pointer_list: Vec<(u32, u64)>,
}

/// A non-static property: its source type (for GC pointer-list purposes)
/// and its 0-based slot within the struct, counting the parent slot (if
/// any) and the vtable slot (if any) as occupying slot 0 / slot 1.
#[derive(Clone)]
pub(crate) struct PropSlot {
    pub ty: Type,
    pub pos: u32,
}

#[derive(Clone)]
pub(crate) struct StaticPropSlot<'ctx> {
    pub global: GlobalValue<'ctx>,
    pub ty: Type,
}

/// One virtual/interface slot inside a vtable struct, in declaration
/// order (§4.4 "vtable position is assignment order").
#[derive(Clone)]
pub(crate) struct VtableSlot {
    pub method_name: String,
}

pub(crate) struct ClassInfo<'ctx> {
    pub llvm_type: StructType<'ctx>,
    pub parent: Option<String>,
    pub is_abstract: bool,
    pub props: HashMap<String, PropSlot>,
    pub static_props: HashMap<String, StaticPropSlot<'ctx>>,
    /// `None` when the class has no virtual methods at all — no vtable
    /// slot is added to the object layout (§4.6 decl phase step 2).
    pub vtable_type: Option<StructType<'ctx>>,
    pub vtable_slots: Vec<VtableSlot>,
    /// Slot index of the embedded parent struct, `None` for a root class.
    pub parent_slot: Option<u32>,
    /// Slot index of the vtable pointer, `None` if `vtable_type` is `None`.
    pub vtable_slot: Option<u32>,
    /// This class's own vtable contents, one entry per vtable-owning
    /// ancestor in its chain (including itself), each resolved by walking
    /// from *this* class rather than the owner — so a descendant always
    /// gets its own override baked in, not the declaring ancestor's
    /// implementation (§4.4, filled by `gen_vtables`).
    pub resolved_vtables: HashMap<String, GlobalValue<'ctx>>,
    /// Compile-time id handed to `x.gcAddRoot`/`x.gcAddGlobalRoot`,
    /// identifying this class's pointer layout in the GC metadata table
    /// `x-driver` builds before starting the JIT (§4.6 decl phase step 3,
    /// grounded on `gc.cpp`'s `GC::addMeta`).
    pub gc_meta_id: u64,
}

pub(crate) struct InterfaceInfo<'ctx> {
    pub vtable_type: StructType<'ctx>,
    pub vtable_slots: Vec<VtableSlot>,
}

/// The three-field trampoline a concrete object is boxed into at a
/// concrete-to-interface cast site (§4.6, "Interface Values").
pub(crate) struct InterfaceValueType<'ctx> {
    pub llvm_type: StructType<'ctx>,
}

pub struct Lowerer<'a, 'ctx> {
    pub(crate) context: &'ctx Context,
    pub(crate) module: Module<'ctx>,
    pub(crate) builder: Builder<'ctx>,
    pub(crate) rt: &'a CompilerRuntime,

    pub(crate) classes: HashMap<String, ClassInfo<'ctx>>,
    pub(crate) interfaces: HashMap<String, InterfaceInfo<'ctx>>,
    pub(crate) interface_values: HashMap<String, InterfaceValueType<'ctx>>,
    pub(crate) array_types: HashMap<Type, array::ArrayInfo<'ctx>>,
    /// Mangled-name registry, `dashmap::DashSet` per the donor's standing
    /// choice for this kind of table even in a single-threaded compiler —
    /// cheap interior mutability without a `RefCell`.
    pub(crate) symbols: dashmap::DashSet<String>,

    pub(crate) var_scopes: Vec<Scope<'ctx>>,
    pub(crate) globals: Scope<'ctx>,
    pub(crate) loops: Vec<(BasicBlock<'ctx>, BasicBlock<'ctx>)>,

    pub(crate) current_fn: Option<FunctionValue<'ctx>>,
    pub(crate) current_fn_ret_type: Type,
    /// `this` pointer inside an instance method, `None` in a free function
    /// or static method (mirrors the donor's `std::optional<Value> that`).
    pub(crate) this_value: Option<PointerValue<'ctx>>,
    pub(crate) this_class: Option<String>,
    /// Enclosing class while lowering a static method body, so static
    /// prop access can bypass the public-only restriction from outside.
    pub(crate) self_class: Option<String>,

    /// Running counter for GC metadata ids (§ above); bumped once per
    /// class/interface/array shape as it's declared.
    pub(crate) next_gc_meta_id: u64,
    /// Meta id for the `String` shape, assigned the first time any string
    /// slot is rooted; every string afterwards reuses it (leaf shape, no
    /// further pointers to scan).
    pub(crate) string_meta_id: Option<u64>,
    /// Meta id per distinct array element type, assigned lazily the first
    /// time that shape is rooted.
    pub(crate) array_meta_ids: HashMap<Type, u64>,
}

impl<'a, 'ctx> Lowerer<'a, 'ctx> {
    pub fn new(context: &'ctx Context, module_name: &str, rt: &'a CompilerRuntime) -> Self {
        let module = context.create_module(module_name);
        let builder = context.create_builder();

        Lowerer {
            context,
            module,
            builder,
            rt,
            classes: HashMap::new(),
            interfaces: HashMap::new(),
            interface_values: HashMap::new(),
            array_types: HashMap::new(),
            symbols: dashmap::DashSet::new(),
            var_scopes: Vec::new(),
            globals: HashMap::new(),
            loops: Vec::new(),
            current_fn: None,
            current_fn_ret_type: Type::void(),
            this_value: None,
            this_class: None,
            self_class: None,
            next_gc_meta_id: 0,
            string_meta_id: None,
            array_meta_ids: HashMap::new(),
        }
    }

    pub fn into_module(self) -> Module<'ctx> {
        self.module
    }

    pub(crate) fn add_symbol(&mut self, name: &str) -> Result<(), LoweringError> {
        if !self.symbols.insert(name.to_string()) {
            return Err(LoweringError::SymbolAlreadyExists(name.to_string()));
        }
        Ok(())
    }

    pub(crate) fn fresh_gc_meta_id(&mut self) -> u64 {
        let id = self.next_gc_meta_id;
        self.next_gc_meta_id += 1;
        id
    }

    /// Every scalar/class/array type a source expression can have, mapped
    /// to its LLVM representation. Classes and arrays are always pointers
    /// to their (pre-declared) struct type — values are heap objects,
    /// matching the donor's "objects are always behind a pointer" design.
    pub(crate) fn map_type(&mut self, ty: &Type) -> BasicTypeEnum<'ctx> {
        match ty.id {
            TypeId::Int => self.context.i64_type().into(),
            TypeId::Float => self.context.f64_type().into(),
            TypeId::Bool => self.context.bool_type().into(),
            TypeId::String | TypeId::Class => self.context.ptr_type(AddressSpace::default()).into(),
            TypeId::Array => {
                let elem = ty.array_element().expect("array type without element").clone();
                self.ensure_array_type(&elem);
                self.context.ptr_type(AddressSpace::default()).into()
            }
            TypeId::Void | TypeId::Auto | TypeId::SelfTy => {
                unreachable!("void/auto/self reach the lowerer only as a return type, handled separately")
            }
        }
    }

    pub(crate) fn create_alloca(&self, ty: BasicTypeEnum<'ctx>, name: &str) -> PointerValue<'ctx> {
        let current_bb = self.builder.get_insert_block().expect("alloca requested outside a function body");
        let entry = current_bb.get_parent().expect("block without parent function").get_first_basic_block().unwrap();

        let tmp_builder = self.context.create_builder();
        match entry.get_first_instruction() {
            Some(first) => tmp_builder.position_before(&first),
            None => tmp_builder.position_at_end(entry),
        }
        tmp_builder.build_alloca(ty, name).expect("alloca never fails")
    }

    /// `String`/`Array`/object comparisons are by ancestor chain; see
    /// `instanceof` in `codegen.h` for the pattern this mirrors.
    pub(crate) fn get_var(&self, name: &str) -> Option<Var<'ctx>> {
        for scope in self.var_scopes.iter().rev() {
            if let Some(v) = scope.get(name) {
                return Some(*v);
            }
        }
        self.globals.get(name).copied()
    }

    /// Runs the full decl/gen pipeline over an already type-checked
    /// `Program`, in the order `codegen.h`'s `Codegen::gen(Program *)`
    /// sequences its own sub-passes: every type and signature is known
    /// before any method body (and therefore any forward reference) is
    /// lowered.
    pub fn lower_program(&mut self, program: &x_ast::Program) -> Result<(), LoweringError> {
        self.decl_natives();
        self.decl_interfaces(program)?;
        self.decl_classes(program)?;
        self.decl_props(program)?;
        self.decl_methods(program)?;
        self.decl_prop_inits(program)?;
        self.gen_vtables(program)?;
        self.gen_prop_inits(program)?;
        self.decl_funcs(program)?;
        self.decl_globals(program)?;

        for func in &program.funcs {
            self.gen_func(func)?;
        }

        for class in &program.classes {
            for (method_name, method) in &class.methods {
                self.gen_method(&class.name, method_name, method)?;
            }
            if !class.methods.contains_key(x_ast::CONSTRUCTOR_FN_NAME) {
                self.gen_default_constructor(&class.name)?;
            }
        }

        Ok(())
    }

    /// Builds the GC metadata table in meta-id order, for `x-driver` to
    /// load into a fresh `x_runtime::gc::Gc` via `add_meta` before the JIT
    /// runs — `Gc::add_meta` assigns ids sequentially from 0 exactly like
    /// `fresh_gc_meta_id`, so calling this in ascending order reproduces
    /// the same ids the emitted `x.gcAddRoot`/`x.gcAddGlobalRoot` calls
    /// already baked in as constants.
    ///
    /// Byte offsets use the same "8 bytes per field" approximation as
    /// [`Self`]'s own struct sizing (`size_of_struct`): every prop slot,
    /// scalar or pointer, occupies one 8-byte lane. An embedded parent
    /// always sits at slot 0, so an ancestor's own prop offsets are valid
    /// relative to any descendant's base address without further
    /// adjustment.
    ///
    /// Interface-typed roots are not represented here at all: `self.gc_meta_for_type`
    /// only resolves `Class`/`String`/`Array` types, so a variable of
    /// interface type is never rooted in the first place. The boxed object
    /// still survives collection as long as it's also reachable through a
    /// concrete-typed root elsewhere — a documented gap, not a crash.
    pub fn gc_metadata(&mut self) -> Vec<GcMetaEntry> {
        let mut entries: Vec<Option<GcMetaEntry>> = (0..self.next_gc_meta_id).map(|_| None).collect();

        for name in self.classes.keys().cloned().collect::<Vec<_>>() {
            let meta_id = self.classes[&name].gc_meta_id;
            let mut pointer_list = Vec::new();
            let mut cur = Some(name);
            while let Some(class_name) = cur {
                let props: Vec<(Type, u32)> = self.classes[&class_name]
                    .props
                    .values()
                    .map(|slot| (slot.ty.clone(), slot.pos))
                    .collect();
                for (ty, pos) in props {
                    if ty.is_one_of(&[TypeId::String, TypeId::Class, TypeId::Array]) {
                        if let Some(child_meta) = self.gc_meta_for_type(&ty) {
                            pointer_list.push((pos * 8, child_meta));
                        }
                    }
                }
                cur = self.classes[&class_name].parent.clone();
            }
            entries[meta_id as usize] = Some(GcMetaEntry { kind: GcNodeKind::Class, pointer_list });
        }

        if let Some(id) = self.string_meta_id {
            // A leaf shape: its payload buffer is a plain heap allocation
            // outside the collector's view (`x-runtime`'s string module),
            // so there's nothing further to trace.
            entries[id as usize] = Some(GcMetaEntry { kind: GcNodeKind::Class, pointer_list: Vec::new() });
        }

        for (elem_ty, id) in self.array_meta_ids.clone() {
            let mut pointer_list = Vec::new();
            if elem_ty.is_one_of(&[TypeId::String, TypeId::Class, TypeId::Array]) {
                if let Some(child_meta) = self.gc_meta_for_type(&elem_ty) {
                    // The `data` buffer pointer lives at offset 0 of the
                    // `{data, len, cap}` header; marking it alive keeps the
                    // whole backing allocation, element-granular tracing
                    // into it is not attempted.
                    pointer_list.push((0, child_meta));
                }
            }
            entries[id as usize] = Some(GcMetaEntry { kind: GcNodeKind::Array, pointer_list });
        }

        entries
            .into_iter()
            .map(|e| e.unwrap_or(GcMetaEntry { kind: GcNodeKind::Class, pointer_list: Vec::new() }))
            .collect()
    }
}
