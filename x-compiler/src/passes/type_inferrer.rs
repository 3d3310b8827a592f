//! §4.5 type inferrer/checker, grounded on `type_inferrer.cpp`. This is
//! the largest pass: it seeds built-in method signatures, declares every
//! class/function/global's signature up front (so forward references
//! type-check), then walks every function/method/global body checking
//! and annotating each expression's `ty` cell in place.

use std::collections::{HashMap, HashSet};

use x_ast::{
    AccessModifier, BinaryOp, ClassDef, Expr, ExprKind, FnDef, FnType, MethodType, Program,
    PropType, Stmt, StmtKind, Type, TypeId, UnaryOp, CONSTRUCTOR_FN_NAME, MAIN_FN_NAME,
};

use crate::compiler_runtime::CompilerRuntime;
use crate::error::TypeError;

const STRING_CLASS: &str = "String";
const ARRAY_CLASS: &str = "Array";
const RANGE_CLASS: &str = "Range";

type Scope = HashMap<String, Type>;

pub struct TypeInferrer<'a> {
    rt: &'a CompilerRuntime,
    var_scopes: Vec<Scope>,
    fn_types: HashMap<String, FnType>,
    parent_of: HashMap<String, Option<String>>,
    class_props: HashMap<String, HashMap<String, (Type, PropType)>>,
    class_methods: HashMap<String, HashMap<String, MethodType>>,
    classes: HashSet<String>,
    self_class: Option<String>,
    this_available: bool,
    current_fn_ret_type: Type,
}

pub fn run(program: &mut Program, rt: &CompilerRuntime) -> Result<(), TypeError> {
    let mut inferrer = TypeInferrer::new(rt);
    inferrer.add_runtime();
    inferrer.decl_classes(program)?;
    inferrer.decl_funcs(program)?;
    inferrer.var_scopes.push(Scope::new());
    inferrer.decl_globals(program)?;
    inferrer.check_class_bodies(program)?;
    inferrer.check_funcs(program)?;
    Ok(())
}

impl<'a> TypeInferrer<'a> {
    fn new(rt: &'a CompilerRuntime) -> Self {
        TypeInferrer {
            rt,
            var_scopes: Vec::new(),
            fn_types: HashMap::new(),
            parent_of: HashMap::new(),
            class_props: HashMap::new(),
            class_methods: HashMap::new(),
            classes: HashSet::new(),
            self_class: None,
            this_available: false,
            current_fn_ret_type: Type::void(),
        }
    }

    /// Seeds the built-in `String`/`Array`/`Range` method signatures a
    /// user program can call (`"foo".length()`, `xs.isEmpty()`, …).
    fn add_runtime(&mut self) {
        let mut string_methods = HashMap::new();
        let sig = |args: Vec<Type>, ret: Type| MethodType {
            fn_type: x_ast::FnType::new(args, ret),
            is_static: false,
        };
        string_methods.insert("length".to_string(), sig(vec![], Type::int()));
        string_methods.insert("isEmpty".to_string(), sig(vec![], Type::bool()));
        string_methods.insert("trim".to_string(), sig(vec![], Type::string()));
        string_methods.insert("toLower".to_string(), sig(vec![], Type::string()));
        string_methods.insert("toUpper".to_string(), sig(vec![], Type::string()));
        string_methods.insert("index".to_string(), sig(vec![Type::string()], Type::int()));
        string_methods.insert("contains".to_string(), sig(vec![Type::string()], Type::bool()));
        string_methods.insert("startsWith".to_string(), sig(vec![Type::string()], Type::bool()));
        string_methods.insert("endsWith".to_string(), sig(vec![Type::string()], Type::bool()));
        string_methods.insert(
            "substring".to_string(),
            sig(vec![Type::int(), Type::int()], Type::string()),
        );
        string_methods.insert("concat".to_string(), sig(vec![Type::string()], Type::string()));
        self.class_methods.insert(STRING_CLASS.to_string(), string_methods);

        let mut array_methods = HashMap::new();
        array_methods.insert("length".to_string(), sig(vec![], Type::int()));
        array_methods.insert("isEmpty".to_string(), sig(vec![], Type::bool()));
        self.class_methods.insert(ARRAY_CLASS.to_string(), array_methods);

        let mut range_methods = HashMap::new();
        range_methods.insert("length".to_string(), sig(vec![], Type::int()));
        self.class_methods.insert(RANGE_CLASS.to_string(), range_methods);
    }

    fn decl_classes(&mut self, program: &Program) -> Result<(), TypeError> {
        for class in &program.classes {
            self.classes.insert(class.name.clone());
            self.parent_of.insert(class.name.clone(), class.parent.clone());
        }
        for class in &program.classes {
            self.decl_class(class)?;
        }
        Ok(())
    }

    fn decl_class(&mut self, class: &ClassDef) -> Result<(), TypeError> {
        let mut props = HashMap::new();
        for prop in &class.props {
            check_decl_type_is_valid(&prop.ty)?;
            props.insert(
                prop.name.clone(),
                (
                    prop.ty.clone(),
                    PropType {
                        prop_type: prop.ty.clone(),
                        is_static: prop.is_static,
                    },
                ),
            );
        }
        self.class_props.insert(class.name.clone(), props);

        let mut methods = HashMap::new();
        methods.insert(
            CONSTRUCTOR_FN_NAME.to_string(),
            MethodType {
                fn_type: x_ast::FnType::new(vec![], Type::void()),
                is_static: false,
            },
        );
        for (name, def) in &class.methods {
            if name == CONSTRUCTOR_FN_NAME {
                if def.is_static {
                    return Err(TypeError::ConstructorCannotBeStatic {
                        class: class.name.clone(),
                        method: name.clone(),
                    });
                }
                if def.access != AccessModifier::Public {
                    return Err(TypeError::ConstructorMustBePublic {
                        class: class.name.clone(),
                        method: name.clone(),
                    });
                }
                if !def.fn_def.decl.return_type.is(TypeId::Void) {
                    return Err(TypeError::ConstructorMustReturnVoid {
                        class: class.name.clone(),
                        method: name.clone(),
                    });
                }
            }
            let return_type = self.resolve_self(&def.fn_def.decl.return_type, &class.name);
            for arg in &def.fn_def.decl.args {
                check_arg_type_is_valid(&arg.ty)?;
            }
            methods.insert(
                name.clone(),
                MethodType {
                    fn_type: x_ast::FnType::new(
                        def.fn_def.decl.args.iter().map(|a| a.ty.clone()).collect(),
                        return_type,
                    ),
                    is_static: def.is_static,
                },
            );
        }
        for (name, decl) in &class.abstract_methods {
            let return_type = self.resolve_self(&decl.fn_decl.return_type, &class.name);
            methods.insert(
                name.clone(),
                MethodType {
                    fn_type: x_ast::FnType::new(
                        decl.fn_decl.args.iter().map(|a| a.ty.clone()).collect(),
                        return_type,
                    ),
                    is_static: decl.is_static,
                },
            );
        }
        self.class_methods.insert(class.name.clone(), methods);
        Ok(())
    }

    fn resolve_self(&self, ty: &Type, enclosing_class: &str) -> Type {
        if ty.is(TypeId::SelfTy) {
            Type::class(enclosing_class)
        } else {
            ty.clone()
        }
    }

    fn decl_funcs(&mut self, program: &Program) -> Result<(), TypeError> {
        for func in &program.funcs {
            if self.fn_types.contains_key(&func.decl.name) {
                return Err(TypeError::FnAlreadyDeclared(func.decl.name.clone()));
            }
            if func.decl.name == MAIN_FN_NAME
                && (!func.decl.args.is_empty() || !func.decl.return_type.is(TypeId::Void))
            {
                return Err(TypeError::InvalidMainFn);
            }
            for arg in &func.decl.args {
                check_arg_type_is_valid(&arg.ty)?;
            }
            self.fn_types.insert(
                func.decl.name.clone(),
                FnType::new(
                    func.decl.args.iter().map(|a| a.ty.clone()).collect(),
                    func.decl.return_type.clone(),
                ),
            );
        }
        Ok(())
    }

    fn decl_globals(&mut self, program: &mut Program) -> Result<(), TypeError> {
        for stmt in &mut program.globals {
            self.check_stmt(stmt)?;
        }
        Ok(())
    }

    fn check_class_bodies(&mut self, program: &mut Program) -> Result<(), TypeError> {
        let global_scope = self.var_scopes[0].clone();
        for class in &mut program.classes {
            self.self_class = Some(class.name.clone());
            for prop in &mut class.props {
                self.this_available = !prop.is_static;
                self.var_scopes = vec![global_scope.clone(), Scope::new()];
                if let Some(init) = &mut prop.init {
                    let init_ty = self.infer_expr(init)?;
                    require_castable(self, &init_ty, &prop.ty)?;
                }
            }
            for method in class.methods.values_mut() {
                self.this_available = !method.is_static;
                self.current_fn_ret_type = self.resolve_self(&method.fn_def.decl.return_type, class.name.as_str());
                self.check_fn_def(&mut method.fn_def, &global_scope)?;
            }
        }
        self.self_class = None;
        self.this_available = false;
        Ok(())
    }

    fn check_funcs(&mut self, program: &mut Program) -> Result<(), TypeError> {
        let global_scope = self.var_scopes[0].clone();
        for func in &mut program.funcs {
            self.self_class = None;
            self.this_available = false;
            self.current_fn_ret_type = func.decl.return_type.clone();
            self.check_fn_def(func, &global_scope)?;
        }
        Ok(())
    }

    fn check_fn_def(&mut self, def: &mut FnDef, global_scope: &Scope) -> Result<(), TypeError> {
        let mut locals = Scope::new();
        if self.this_available {
            if let Some(class_name) = self.self_class.clone() {
                locals.insert("this".to_string(), Type::class(class_name));
            }
        }
        for arg in &def.decl.args {
            locals.insert(arg.name.clone(), arg.ty.clone());
        }
        self.var_scopes = vec![global_scope.clone(), locals];
        for stmt in &mut def.body {
            self.check_stmt(stmt)?;
        }
        Ok(())
    }

    // ---- variable / member resolution -------------------------------

    fn get_var_type(&self, name: &str) -> Result<Type, TypeError> {
        for scope in self.var_scopes.iter().rev() {
            if let Some(ty) = scope.get(name) {
                return Ok(ty.clone());
            }
        }
        if self.this_available {
            if let Some(class_name) = &self.self_class {
                if let Some((ty, _)) = self.resolve_prop(class_name, name, false) {
                    return Ok(ty);
                }
            }
        }
        if let Some(class_name) = &self.self_class {
            if let Some((ty, _)) = self.resolve_prop(class_name, name, true) {
                return Ok(ty);
            }
        }
        Err(TypeError::VarNotFound(name.to_string()))
    }

    fn resolve_prop(&self, class_name: &str, prop_name: &str, is_static: bool) -> Option<(Type, String)> {
        let mut current = Some(class_name.to_string());
        while let Some(c) = current {
            if let Some(props) = self.class_props.get(&c) {
                if let Some((ty, meta)) = props.get(prop_name) {
                    if meta.is_static == is_static {
                        return Some((ty.clone(), c));
                    }
                }
            }
            current = self.parent_of.get(&c).cloned().flatten();
        }
        None
    }

    fn get_prop_type(&self, class_name: &str, prop_name: &str, is_static: bool) -> Result<Type, TypeError> {
        if !self.classes.contains(class_name) && !is_builtin_class(class_name) {
            return Err(TypeError::ClassNotFound(class_name.to_string()));
        }
        match self.resolve_prop(class_name, prop_name, is_static) {
            Some((ty, _)) => Ok(ty),
            None => {
                if self.prop_exists_with_other_mode(class_name, prop_name, is_static) {
                    Err(TypeError::WrongPropAccess(class_name.to_string(), prop_name.to_string()))
                } else {
                    Err(TypeError::MemberNotFound(class_name.to_string(), prop_name.to_string()))
                }
            }
        }
    }

    fn prop_exists_with_other_mode(&self, class_name: &str, prop_name: &str, is_static: bool) -> bool {
        self.resolve_prop(class_name, prop_name, !is_static).is_some()
    }

    fn resolve_method(&self, class_name: &str, method_name: &str, is_static: bool) -> Option<(MethodType, String)> {
        let mut current = Some(class_name.to_string());
        while let Some(c) = current {
            if let Some(methods) = self.class_methods.get(&c) {
                if let Some(m) = methods.get(method_name) {
                    if m.is_static == is_static {
                        return Some((m.clone(), c));
                    }
                }
            }
            current = self.parent_of.get(&c).cloned().flatten();
        }
        None
    }

    fn get_method_type(&self, class_name: &str, method_name: &str, is_static: bool) -> Result<MethodType, TypeError> {
        if !self.classes.contains(class_name) && !is_builtin_class(class_name) {
            return Err(TypeError::ClassNotFound(class_name.to_string()));
        }
        match self.resolve_method(class_name, method_name, is_static) {
            Some((m, _)) => Ok(m),
            None => {
                if self.resolve_method(class_name, method_name, !is_static).is_some() {
                    Err(TypeError::WrongMethodCall(class_name.to_string(), method_name.to_string()))
                } else {
                    Err(TypeError::MemberNotFound(class_name.to_string(), method_name.to_string()))
                }
            }
        }
    }

    // ---- casting / subtyping ------------------------------------------

    fn can_cast_to(&self, from: &Type, to: &Type) -> bool {
        if from == to {
            return true;
        }
        if from.is(TypeId::Int) && to.is(TypeId::Float) {
            return true;
        }
        if from.is(TypeId::Class) && to.is(TypeId::Class) {
            let (Some(c), Some(d)) = (from.class_name(), to.class_name()) else {
                return false;
            };
            if let Some(ancestors) = self.rt.extended_classes.get(c) {
                if ancestors.contains(d) {
                    return true;
                }
            }
            if let Some(ifaces) = self.rt.implemented_interfaces.get(c) {
                if ifaces.contains(d) {
                    return true;
                }
            }
        }
        false
    }

    fn check_fn_call(&self, sig: &x_ast::FnType, args: &[Type]) -> Result<(), TypeError> {
        if sig.args.len() != args.len() {
            return Err(TypeError::CallArgsMismatch);
        }
        for (expected, actual) in sig.args.iter().zip(args.iter()) {
            if !self.can_cast_to(actual, expected) {
                return Err(TypeError::IncompatibleTypes {
                    expected: expected.clone(),
                    actual: actual.clone(),
                });
            }
        }
        Ok(())
    }

    // ---- expressions ----------------------------------------------------

    fn infer_expr(&mut self, expr: &Expr) -> Result<Type, TypeError> {
        let ty = self.infer_expr_kind(&expr.kind)?;
        expr.set_ty(ty.clone());
        Ok(ty)
    }

    fn infer_expr_kind(&mut self, kind: &ExprKind) -> Result<Type, TypeError> {
        match kind {
            ExprKind::IntLit(_) => Ok(Type::int()),
            ExprKind::FloatLit(_) => Ok(Type::float()),
            ExprKind::BoolLit(_) => Ok(Type::bool()),
            ExprKind::StringLit(_) => Ok(Type::string()),
            ExprKind::ArrayLit(elems) => {
                if elems.is_empty() {
                    return Err(TypeError::EmptyArrayLiteral);
                }
                let first = self.infer_expr(&elems[0])?;
                for e in &elems[1..] {
                    let t = self.infer_expr(e)?;
                    if t != first {
                        return Err(TypeError::IncompatibleTypes {
                            expected: first.clone(),
                            actual: t,
                        });
                    }
                }
                Ok(Type::array(first))
            }
            ExprKind::Var(name) => self.get_var_type(name),
            ExprKind::Unary { op, operand, .. } => {
                let ty = self.infer_expr(operand)?;
                match op {
                    UnaryOp::Inc | UnaryOp::Dec => {
                        if !ty.is_numeric() {
                            return Err(TypeError::InvalidType);
                        }
                        Ok(ty)
                    }
                    UnaryOp::Not => {
                        if ty.is(TypeId::Void) || ty.is(TypeId::Class) {
                            return Err(TypeError::InvalidType);
                        }
                        Ok(Type::bool())
                    }
                }
            }
            ExprKind::Binary { op, lhs, rhs } => {
                let l = self.infer_expr(lhs)?;
                let r = self.infer_expr(rhs)?;
                self.infer_binary(*op, &l, &r)
            }
            ExprKind::FetchProp { object, name } => {
                let obj_ty = self.infer_expr(object)?;
                let class_name = self.require_class(&obj_ty)?;
                self.get_prop_type(&class_name, name, false)
            }
            ExprKind::FetchStaticProp { class_name, name } => {
                self.get_prop_type(class_name, name, true)
            }
            ExprKind::MethodCall { object, name, args } => {
                let obj_ty = self.infer_expr(object)?;
                let arg_types = self.infer_args(args)?;
                let (method, owner) = self.resolve_method_for_receiver(&obj_ty, name)?;
                self.check_fn_call(&method.fn_type, &arg_types)?;
                Ok(self.resolve_self(&method.fn_type.return_type, &owner))
            }
            ExprKind::StaticMethodCall { class_name, name, args } => {
                let arg_types = self.infer_args(args)?;
                let method = self.get_method_type(class_name, name, true)?;
                self.check_fn_call(&method.fn_type, &arg_types)?;
                Ok(self.resolve_self(&method.fn_type.return_type, class_name))
            }
            ExprKind::FetchArr { array, index } => {
                let arr_ty = self.infer_expr(array)?;
                if !arr_ty.is(TypeId::Array) {
                    return Err(TypeError::InvalidType);
                }
                let idx_ty = self.infer_expr(index)?;
                if !idx_ty.is(TypeId::Int) {
                    return Err(TypeError::InvalidType);
                }
                Ok(arr_ty.array_element().cloned().unwrap_or_else(Type::void))
            }
            ExprKind::Call { name, args } => {
                let arg_types = self.infer_args(args)?;
                let sig = self
                    .fn_types
                    .get(name)
                    .cloned()
                    .ok_or_else(|| TypeError::MemberNotFound("<global>".to_string(), name.clone()))?;
                self.check_fn_call(&sig, &arg_types)?;
                Ok(sig.return_type)
            }
            ExprKind::New { class_name, args } => {
                if !self.classes.contains(class_name) {
                    return Err(TypeError::ClassNotFound(class_name.clone()));
                }
                let arg_types = self.infer_args(args)?;
                let ctor = self.get_method_type(class_name, CONSTRUCTOR_FN_NAME, false)?;
                self.check_fn_call(&ctor.fn_type, &arg_types)?;
                Ok(Type::class(class_name.clone()))
            }
            ExprKind::Range { start, stop, step } => {
                if let Some(s) = start {
                    let t = self.infer_expr(s)?;
                    if !t.is(TypeId::Int) {
                        return Err(TypeError::RangeArgMustBeInt);
                    }
                }
                let t = self.infer_expr(stop)?;
                if !t.is(TypeId::Int) {
                    return Err(TypeError::RangeArgMustBeInt);
                }
                if let Some(s) = step {
                    let t = self.infer_expr(s)?;
                    if !t.is(TypeId::Int) {
                        return Err(TypeError::RangeArgMustBeInt);
                    }
                }
                Ok(Type::class(RANGE_CLASS))
            }
        }
    }

    fn infer_args(&mut self, args: &[Expr]) -> Result<Vec<Type>, TypeError> {
        args.iter().map(|a| self.infer_expr(a)).collect()
    }

    fn require_class(&self, ty: &Type) -> Result<String, TypeError> {
        if ty.is(TypeId::Class) {
            Ok(ty.class_name().unwrap_or_default().to_string())
        } else {
            Err(TypeError::InvalidType)
        }
    }

    fn resolve_method_for_receiver(&self, obj_ty: &Type, name: &str) -> Result<(MethodType, String), TypeError> {
        match obj_ty.id {
            TypeId::String => self
                .resolve_method(STRING_CLASS, name, false)
                .ok_or_else(|| TypeError::MemberNotFound(STRING_CLASS.to_string(), name.to_string())),
            TypeId::Array => self
                .resolve_method(ARRAY_CLASS, name, false)
                .ok_or_else(|| TypeError::MemberNotFound(ARRAY_CLASS.to_string(), name.to_string())),
            TypeId::Class => {
                let class_name = obj_ty.class_name().unwrap_or_default();
                self.get_method_type(class_name, name, false)
                    .map(|m| (m, class_name.to_string()))
            }
            _ => Err(TypeError::WrongMethodCall(obj_ty.to_string(), name.to_string())),
        }
    }

    fn infer_binary(&self, op: BinaryOp, l: &Type, r: &Type) -> Result<Type, TypeError> {
        use BinaryOp::*;
        match op {
            Add => {
                if l.is(TypeId::String) && r.is(TypeId::String) {
                    Ok(Type::string())
                } else if l.is(TypeId::String) || r.is(TypeId::String) {
                    Err(TypeError::IncompatibleTypes {
                        expected: Type::string(),
                        actual: if l.is(TypeId::String) { r.clone() } else { l.clone() },
                    })
                } else {
                    numeric_promote(l, r)
                }
            }
            Sub => {
                if l.is(TypeId::String) || r.is(TypeId::String) {
                    return Err(TypeError::InvalidType);
                }
                numeric_promote(l, r)
            }
            Mul | Mod => numeric_promote(l, r),
            Div | Pow => {
                require_numeric(l)?;
                require_numeric(r)?;
                Ok(Type::float())
            }
            Lt | Le | Gt | Ge => {
                require_numeric(l)?;
                require_numeric(r)?;
                Ok(Type::bool())
            }
            Eq | Neq => {
                if l.is(TypeId::String) && r.is(TypeId::String) {
                    Ok(Type::bool())
                } else if l.is(TypeId::String) || r.is(TypeId::String) {
                    Err(TypeError::InvalidType)
                } else if l == r {
                    Ok(Type::bool())
                } else {
                    Err(TypeError::IncompatibleTypes {
                        expected: l.clone(),
                        actual: r.clone(),
                    })
                }
            }
            And | Or => {
                if l.is(TypeId::Void) || l.is(TypeId::Class) || r.is(TypeId::Void) || r.is(TypeId::Class) {
                    Err(TypeError::InvalidType)
                } else {
                    Ok(Type::bool())
                }
            }
        }
    }

    // ---- statements ------------------------------------------------------

    fn check_stmt(&mut self, stmt: &mut Stmt) -> Result<(), TypeError> {
        match &mut stmt.kind {
            StmtKind::List(stmts) => {
                for s in stmts {
                    self.check_stmt(s)?;
                }
                Ok(())
            }
            StmtKind::Decl { name, ty, init } => {
                if ty.is(TypeId::Auto) {
                    let Some(init_expr) = init else {
                        return Err(TypeError::InvalidType);
                    };
                    let inferred = self.infer_expr(init_expr)?;
                    check_decl_type_is_valid(&inferred)?;
                    *ty = inferred;
                } else {
                    check_decl_type_is_valid(ty)?;
                    if let Some(init_expr) = init {
                        let init_ty = self.infer_expr(init_expr)?;
                        if !self.can_cast_to(&init_ty, ty) {
                            return Err(TypeError::IncompatibleTypes {
                                expected: ty.clone(),
                                actual: init_ty,
                            });
                        }
                    }
                }
                let scope = self.var_scopes.last_mut().ok_or(TypeError::InvalidType)?;
                if scope.contains_key(name) {
                    return Err(TypeError::VarAlreadyExists(name.clone()));
                }
                scope.insert(name.clone(), ty.clone());
                Ok(())
            }
            StmtKind::Assign { name, value } => {
                let var_ty = self.get_var_type(name)?;
                let value_ty = self.infer_expr(value)?;
                require_castable(self, &value_ty, &var_ty)
            }
            StmtKind::AssignProp { object, name, value } => {
                let obj_ty = self.infer_expr(object)?;
                let class_name = self.require_class(&obj_ty)?;
                let prop_ty = self.get_prop_type(&class_name, name, false)?;
                let value_ty = self.infer_expr(value)?;
                require_castable(self, &value_ty, &prop_ty)
            }
            StmtKind::AssignStaticProp { class_name, name, value } => {
                let prop_ty = self.get_prop_type(class_name, name, true)?;
                let value_ty = self.infer_expr(value)?;
                require_castable(self, &value_ty, &prop_ty)
            }
            StmtKind::AssignArr { array, index, value } => {
                let arr_ty = self.infer_expr(array)?;
                if !arr_ty.is(TypeId::Array) {
                    return Err(TypeError::InvalidType);
                }
                let idx_ty = self.infer_expr(index)?;
                if !idx_ty.is(TypeId::Int) {
                    return Err(TypeError::InvalidType);
                }
                let value_ty = self.infer_expr(value)?;
                let elem = arr_ty.array_element().cloned().unwrap_or_else(Type::void);
                require_castable(self, &value_ty, &elem)
            }
            StmtKind::AppendArr { array, value } => {
                let arr_ty = self.infer_expr(array)?;
                if !arr_ty.is(TypeId::Array) {
                    return Err(TypeError::InvalidType);
                }
                let value_ty = self.infer_expr(value)?;
                let elem = arr_ty.array_element().cloned().unwrap_or_else(Type::void);
                require_castable(self, &value_ty, &elem)
            }
            StmtKind::If { cond, then_branch, else_branch } => {
                let cond_ty = self.infer_expr(cond)?;
                if !cond_ty.is(TypeId::Bool) {
                    return Err(TypeError::InvalidType);
                }
                self.check_stmt(then_branch)?;
                if let Some(e) = else_branch {
                    self.check_stmt(e)?;
                }
                Ok(())
            }
            StmtKind::While { cond, body } => {
                let cond_ty = self.infer_expr(cond)?;
                if !cond_ty.is(TypeId::Bool) {
                    return Err(TypeError::InvalidType);
                }
                self.check_stmt(body)
            }
            StmtKind::ForIn { idx_name, val_name, iterable, body } => {
                let iter_ty = self.infer_expr(iterable)?;
                let val_ty = if iter_ty.is(TypeId::Array) {
                    iter_ty.array_element().cloned().unwrap_or_else(Type::void)
                } else if iter_ty.is(TypeId::Class) && iter_ty.class_name() == Some(RANGE_CLASS) {
                    Type::int()
                } else {
                    return Err(TypeError::ForExprMustBeArrayOrRange);
                };
                let mut scope = Scope::new();
                if let Some(idx) = idx_name {
                    scope.insert(idx.clone(), Type::int());
                }
                scope.insert(val_name.clone(), val_ty);
                self.var_scopes.push(scope);
                let result = self.check_stmt(body);
                self.var_scopes.pop();
                result
            }
            StmtKind::Break | StmtKind::Continue | StmtKind::Comment(_) => Ok(()),
            StmtKind::Return(value) => match value {
                Some(e) => {
                    let ty = self.infer_expr(e)?;
                    require_castable(self, &ty, &self.current_fn_ret_type.clone())
                }
                None => {
                    if !self.current_fn_ret_type.is(TypeId::Void) {
                        return Err(TypeError::IncompatibleTypes {
                            expected: self.current_fn_ret_type.clone(),
                            actual: Type::void(),
                        });
                    }
                    Ok(())
                }
            },
            StmtKind::Println(e) => {
                let ty = self.infer_expr(e)?;
                if ty.is(TypeId::Void) || ty.is(TypeId::Class) || ty.is(TypeId::Array) {
                    return Err(TypeError::InvalidType);
                }
                Ok(())
            }
            StmtKind::Expr(e) => {
                self.infer_expr(e)?;
                Ok(())
            }
        }
    }
}

fn is_builtin_class(name: &str) -> bool {
    matches!(name, STRING_CLASS | ARRAY_CLASS | RANGE_CLASS)
}

fn require_numeric(ty: &Type) -> Result<(), TypeError> {
    if ty.is_numeric() {
        Ok(())
    } else {
        Err(TypeError::InvalidType)
    }
}

fn numeric_promote(l: &Type, r: &Type) -> Result<Type, TypeError> {
    require_numeric(l)?;
    require_numeric(r)?;
    if l.is(TypeId::Float) || r.is(TypeId::Float) {
        Ok(Type::float())
    } else {
        Ok(Type::int())
    }
}

fn require_castable(inferrer: &TypeInferrer, from: &Type, to: &Type) -> Result<(), TypeError> {
    if inferrer.can_cast_to(from, to) {
        Ok(())
    } else {
        Err(TypeError::IncompatibleTypes {
            expected: to.clone(),
            actual: from.clone(),
        })
    }
}

fn check_decl_type_is_valid(ty: &Type) -> Result<(), TypeError> {
    if ty.is(TypeId::Auto) || ty.is(TypeId::SelfTy) || ty.is(TypeId::Void) {
        return Err(TypeError::InvalidType);
    }
    if ty.is(TypeId::Array) && ty.array_element().map(|e| e.is(TypeId::Void)).unwrap_or(false) {
        return Err(TypeError::InvalidType);
    }
    Ok(())
}

fn check_arg_type_is_valid(ty: &Type) -> Result<(), TypeError> {
    check_decl_type_is_valid(ty)
}

#[cfg(test)]
mod tests {
    use super::*;
    use x_ast::builder::*;

    #[test]
    fn arithmetic_promotes_to_float() {
        let rt = CompilerRuntime::new();
        let mut inferrer = TypeInferrer::new(&rt);
        let ty = inferrer
            .infer_binary(BinaryOp::Add, &Type::int(), &Type::float())
            .expect("ok");
        assert_eq!(ty, Type::float());
    }

    #[test]
    fn division_is_always_float() {
        let rt = CompilerRuntime::new();
        let inferrer = TypeInferrer::new(&rt);
        let ty = inferrer.infer_binary(BinaryOp::Div, &Type::int(), &Type::int()).expect("ok");
        assert_eq!(ty, Type::float());
    }

    #[test]
    fn string_minus_string_is_error() {
        let rt = CompilerRuntime::new();
        let inferrer = TypeInferrer::new(&rt);
        assert!(inferrer.infer_binary(BinaryOp::Sub, &Type::string(), &Type::string()).is_err());
    }

    #[test]
    fn empty_array_literal_is_rejected() {
        let rt = CompilerRuntime::new();
        let mut inferrer = TypeInferrer::new(&rt);
        let expr = array_lit(vec![]);
        assert!(matches!(
            inferrer.infer_expr(&expr),
            Err(TypeError::EmptyArrayLiteral)
        ));
    }

    #[test]
    fn println_rejects_class_values() {
        let rt = CompilerRuntime::new();
        let mut inferrer = TypeInferrer::new(&rt);
        inferrer.var_scopes.push(Scope::new());
        inferrer.var_scopes.last_mut().unwrap().insert("x".to_string(), Type::class("Foo"));
        let mut stmt = println(var("x"));
        assert!(inferrer.check_stmt(&mut stmt).is_err());
    }
}
