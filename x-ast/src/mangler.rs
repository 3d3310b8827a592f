//! Pure name-mangling scheme, ported verbatim from the donor's
//! `mangler.h`. Lives here (rather than in `x-compiler`) because both the
//! lowerer and the native runtime need the exact same internal-symbol
//! names — the donor's own `runtime.cpp` includes the same `mangler.h`
//! its codegen does, for the same reason.

pub const INTERNAL_PREFIX: &str = "x.";

#[derive(Debug, Default, Clone, Copy)]
pub struct Mangler;

impl Mangler {
    pub fn mangle_class(&self, class_name: &str) -> String {
        format!("class.{class_name}")
    }

    pub fn mangle_interface(&self, interface_name: &str) -> String {
        format!("interface.{interface_name}")
    }

    pub fn mangle_method(&self, mangled_class_name: &str, method_name: &str) -> String {
        format!("{mangled_class_name}_{method_name}")
    }

    /// A method name that is never reachable by source-level syntax
    /// (per-class `init` functions, see §4.6 decl phase step 4).
    pub fn mangle_hidden_method(&self, mangled_class_name: &str, method_name: &str) -> String {
        format!("{mangled_class_name}.{method_name}")
    }

    pub fn mangle_internal_method(&self, mangled_class_name: &str, method_name: &str) -> String {
        format!(
            "{INTERNAL_PREFIX}{}",
            self.mangle_method(mangled_class_name, method_name)
        )
    }

    pub fn mangle_static_prop(&self, mangled_class_name: &str, prop_name: &str) -> String {
        format!("{mangled_class_name}_{prop_name}")
    }

    pub fn mangle_internal_function(&self, fn_name: &str) -> String {
        format!("{INTERNAL_PREFIX}{fn_name}")
    }

    pub fn mangle_internal_symbol(&self, symbol: &str) -> String {
        format!("{INTERNAL_PREFIX}{symbol}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_and_method_names() {
        let m = Mangler;
        assert_eq!(m.mangle_class("Foo"), "class.Foo");
        assert_eq!(m.mangle_interface("Shape"), "interface.Shape");
        assert_eq!(m.mangle_method("class.Foo", "bar"), "class.Foo_bar");
        assert_eq!(m.mangle_hidden_method("class.Foo", "init"), "class.Foo.init");
        assert_eq!(
            m.mangle_internal_method("class.Foo", "bar"),
            "x.class.Foo_bar"
        );
        assert_eq!(m.mangle_internal_function("gcAlloc"), "x.gcAlloc");
    }
}
