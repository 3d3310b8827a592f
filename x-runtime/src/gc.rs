//! Precise, cooperative, stop-the-world mark-and-sweep collector, grounded
//! on `gc/gc.h`/`gc/gc.cpp`. Generated code calls the `extern "C"`
//! functions at the bottom of this module through the global `x.gc`
//! pointer; this module is the only place in the crate that deals in raw
//! pointers borrowed from JIT-compiled code.

use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    Class,
    Interface,
    Array,
}

/// Describes where the pointer-bearing fields of one allocated shape live,
/// so `mark` can walk a heap graph without any type information baked into
/// the allocation itself. `meta` in each pointer-list entry indexes back
/// into [`Gc::metas`].
#[derive(Debug, Clone)]
pub struct Metadata {
    pub node_type: NodeType,
    pub pointer_list: Vec<(usize, MetaId)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MetaId(pub usize);

#[derive(Debug, Clone, Copy)]
struct Root {
    ptr: *mut *mut u8,
    meta: MetaId,
}

/// A precise mark-and-sweep heap. One instance lives for the whole JIT
/// execution and is reachable from generated code through a single global
/// pointer (`x.gc`, a pointer-to-pointer so generated code never has to
/// know the struct's Rust layout).
pub struct Gc {
    metas: Vec<Metadata>,
    allocs: HashMap<usize, bool>,
    global_roots: Vec<Root>,
    stack_frames: Vec<Vec<Root>>,
}

impl Gc {
    pub fn new() -> Self {
        Gc {
            metas: Vec::new(),
            allocs: HashMap::new(),
            global_roots: Vec::new(),
            stack_frames: Vec::new(),
        }
    }

    pub fn add_meta(&mut self, node_type: NodeType, pointer_list: Vec<(usize, MetaId)>) -> MetaId {
        self.metas.push(Metadata { node_type, pointer_list });
        MetaId(self.metas.len() - 1)
    }

    /// # Safety
    /// `size` must describe a layout the caller will only ever access
    /// through `u8`-granularity reads/writes within bounds.
    pub unsafe fn alloc(&mut self, size: u64) -> *mut u8 {
        let layout = std::alloc::Layout::from_size_align(size.max(1) as usize, 8).expect("layout");
        let ptr = std::alloc::alloc_zeroed(layout);
        if ptr.is_null() {
            std::alloc::handle_alloc_error(layout);
        }
        self.allocs.insert(ptr as usize, false);
        ptr
    }

    /// # Safety
    /// `ptr` must be null or a pointer previously returned by [`Gc::alloc`]
    /// or [`Gc::realloc`] on this same `Gc` and not yet swept.
    pub unsafe fn realloc(&mut self, ptr: *mut u8, new_size: u64) -> *mut u8 {
        if ptr.is_null() {
            return self.alloc(new_size);
        }
        let was_tracked = self.allocs.remove(&(ptr as usize)).is_some();
        debug_assert!(was_tracked, "realloc of untracked pointer");
        let new_ptr = self.alloc(new_size);
        // We don't know the old size here (mirrors the donor, which also
        // over-copies); callers only grow arrays, so copy what fits.
        std::ptr::copy_nonoverlapping(ptr, new_ptr, new_size as usize);
        std::alloc::dealloc(ptr, std::alloc::Layout::from_size_align(1, 8).unwrap());
        new_ptr
    }

    pub fn push_stack_frame(&mut self) {
        self.stack_frames.push(Vec::new());
    }

    pub fn pop_stack_frame(&mut self) {
        self.stack_frames.pop();
    }

    /// # Safety
    /// `root` must remain valid (a live stack slot) until the matching
    /// `pop_stack_frame`.
    pub unsafe fn add_root(&mut self, root: *mut *mut u8, meta: MetaId) {
        self.stack_frames
            .last_mut()
            .expect("addRoot with no active stack frame")
            .push(Root { ptr: root, meta });
    }

    /// # Safety
    /// `root` must remain valid for the lifetime of the program (a global).
    pub unsafe fn add_global_root(&mut self, root: *mut *mut u8, meta: MetaId) {
        self.global_roots.push(Root { ptr: root, meta });
    }

    pub fn run(&mut self) {
        self.mark();
        self.sweep();
    }

    fn mark(&mut self) {
        for alive in self.allocs.values_mut() {
            *alive = false;
        }

        let mut worklist: Vec<(usize, MetaId)> = Vec::new();
        for root in self.global_roots.iter().chain(self.stack_frames.iter().flatten()) {
            let ptr = unsafe { *root.ptr };
            if !ptr.is_null() {
                worklist.push((ptr as usize, root.meta));
            }
        }

        while let Some((ptr, meta_id)) = worklist.pop() {
            let Some(alive) = self.allocs.get_mut(&ptr) else {
                continue; // dangling link; shouldn't happen but mirrors the donor's defensive return
            };
            if *alive {
                continue;
            }
            *alive = true;

            let Some(meta) = self.metas.get(meta_id.0) else {
                continue;
            };
            if meta.node_type == NodeType::Interface {
                // trampoline layout: {vtable, object-ptr, gc-meta-ptr}; the
                // object pointer lives at offset 8.
                let field_ptr = (ptr + 8) as *mut *mut u8;
                let meta_slot = (ptr + 16) as *const usize;
                let child = unsafe { *field_ptr };
                let child_meta = unsafe { *meta_slot };
                if !child.is_null() {
                    worklist.push((child as usize, MetaId(child_meta)));
                }
                continue;
            }
            for &(offset, field_meta) in &meta.pointer_list {
                let field_ptr = (ptr + offset) as *mut *mut u8;
                let child = unsafe { *field_ptr };
                if !child.is_null() {
                    worklist.push((child as usize, field_meta));
                }
            }
        }
    }

    fn sweep(&mut self) {
        let dead: Vec<usize> = self
            .allocs
            .iter()
            .filter(|(_, alive)| !**alive)
            .map(|(ptr, _)| *ptr)
            .collect();

        for ptr in dead {
            self.allocs.remove(&ptr);
            unsafe {
                std::alloc::dealloc(ptr as *mut u8, std::alloc::Layout::from_size_align(1, 8).unwrap());
            }
        }
        for alive in self.allocs.values_mut() {
            *alive = false;
        }
    }

    #[cfg(test)]
    fn is_tracked(&self, ptr: *mut u8) -> bool {
        self.allocs.contains_key(&(ptr as usize))
    }
}

impl Default for Gc {
    fn default() -> Self {
        Self::new()
    }
}

// ---- extern "C" surface called from JIT-compiled code -----------------
//
// Every function takes `gc: *mut *mut Gc` matching the donor's `GC::GC
// **` ABI: the generated module holds one pointer-to-pointer global
// (`x.gc`) so it never needs to know this struct's Rust layout.

/// # Safety
/// `gc` must point at a live, non-null `*mut Gc`.
pub unsafe extern "C" fn x_gc_alloc(gc: *mut *mut Gc, size: u64) -> *mut u8 {
    (**gc).alloc(size)
}

/// # Safety
/// See [`x_gc_alloc`]; `ptr` must satisfy [`Gc::realloc`]'s contract.
pub unsafe extern "C" fn x_gc_realloc(gc: *mut *mut Gc, ptr: *mut u8, new_size: u64) -> *mut u8 {
    (**gc).realloc(ptr, new_size)
}

/// # Safety
/// `gc` must point at a live, non-null `*mut Gc`.
pub unsafe extern "C" fn x_gc_push_stack_frame(gc: *mut *mut Gc) {
    (**gc).push_stack_frame();
}

/// # Safety
/// `gc` must point at a live, non-null `*mut Gc`.
pub unsafe extern "C" fn x_gc_pop_stack_frame(gc: *mut *mut Gc) {
    (**gc).pop_stack_frame();
}

/// # Safety
/// `gc` must point at a live, non-null `*mut Gc`; `root` must be a live
/// stack slot; `meta` must be an id previously returned by `add_meta`.
pub unsafe extern "C" fn x_gc_add_root(gc: *mut *mut Gc, root: *mut *mut u8, meta: u64) {
    (**gc).add_root(root, MetaId(meta as usize));
}

/// # Safety
/// Same as [`x_gc_add_root`], but `root` must be valid for the program's
/// whole lifetime.
pub unsafe extern "C" fn x_gc_add_global_root(gc: *mut *mut Gc, root: *mut *mut u8, meta: u64) {
    (**gc).add_global_root(root, MetaId(meta as usize));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unreachable_alloc_is_swept() {
        let mut gc = Gc::new();
        let ptr = unsafe { gc.alloc(8) };
        assert!(gc.is_tracked(ptr));
        gc.run();
        assert!(!gc.is_tracked(ptr));
    }

    #[test]
    fn rooted_alloc_survives() {
        let mut gc = Gc::new();
        let class_meta = gc.add_meta(NodeType::Class, vec![]);
        let ptr = unsafe { gc.alloc(8) };
        let mut root_slot: *mut u8 = ptr;
        gc.push_stack_frame();
        unsafe { gc.add_root(&mut root_slot as *mut *mut u8, class_meta) };
        gc.run();
        assert!(gc.is_tracked(ptr));
        gc.pop_stack_frame();
        gc.run();
        assert!(!gc.is_tracked(ptr));
    }

    #[test]
    fn transitive_field_keeps_child_alive() {
        let mut gc = Gc::new();
        let child_meta = gc.add_meta(NodeType::Class, vec![]);
        let parent_meta = gc.add_meta(NodeType::Class, vec![(0, child_meta)]);

        let child = unsafe { gc.alloc(8) };
        let parent = unsafe { gc.alloc(8) };
        unsafe { *(parent as *mut *mut u8) = child };

        let mut root_slot: *mut u8 = parent;
        gc.push_stack_frame();
        unsafe { gc.add_root(&mut root_slot as *mut *mut u8, parent_meta) };
        gc.run();

        assert!(gc.is_tracked(parent));
        assert!(gc.is_tracked(child));
    }
}
