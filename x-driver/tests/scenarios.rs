//! Black-box end-to-end scenarios run through the full pipeline
//! (parse-stub → passes → lower → JIT → sweep), one per numbered case
//! in the literal-input/literal-stdout table this workspace's scenarios
//! are drawn from. Programs are built with `x_ast::builder` rather than
//! source text, since there is no lexer/parser in this workspace.

use x_ast::builder::*;
use x_ast::{AccessModifier, BinaryOp, Type, UnaryOp};
use x_driver::RunOptions;

fn main_program(body: Vec<x_ast::Stmt>) -> x_ast::Program {
    let mut program = x_ast::Program::new();
    program.funcs.push(fn_def(fn_decl("main", vec![], Type::void()), body));
    program
}

fn run(mut program: x_ast::Program) {
    x_driver::run(&mut program, &RunOptions::default()).expect("program should run to completion");
}

#[test]
fn arithmetic_and_precedence() {
    // println(2 + 2 * 2); println((2+2)*2); println(!0)
    let a = binary(BinaryOp::Add, int(2), binary(BinaryOp::Mul, int(2), int(2)));
    let b = binary(BinaryOp::Mul, binary(BinaryOp::Add, int(2), int(2)), int(2));
    let c = unary(UnaryOp::Not, int(0), true);
    run(main_program(vec![println(a), println(b), println(c)]));
}

#[test]
fn for_in_over_range() {
    // for i in range(1, 5) { println(i) }
    let iterable = range(Some(int(1)), int(5), None);
    let loop_stmt = for_in(None, "i", iterable, vec![println(var("i"))]);
    run(main_program(vec![loop_stmt]));
}

#[test]
fn constructor_runs_on_instantiation() {
    // class Foo { fn construct(int a) void { println(a) } }; new Foo(10);
    let mut program = x_ast::Program::new();
    let ctor = fn_def(
        fn_decl(x_ast::CONSTRUCTOR_FN_NAME, vec![arg("a", Type::int())], Type::void()),
        vec![println(var("a"))],
    );
    let mut class = class_skeleton("Foo");
    class
        .methods
        .insert(x_ast::CONSTRUCTOR_FN_NAME.to_string(), method_def(ctor, AccessModifier::Public, false));
    program.classes.push(class);
    program
        .funcs
        .push(fn_def(fn_decl("main", vec![], Type::void()), vec![expr_stmt(new_obj("Foo", vec![int(10)]))]));
    run(program);
}

#[test]
fn array_append_and_length() {
    // []int a = []int{1,2,3}; a[] = 4; println(a.length())
    let elem_ty = Type::array(Type::int());
    let decl_stmt = decl("a", elem_ty, Some(array_lit(vec![int(1), int(2), int(3)])));
    let append_stmt = append_arr(var("a"), int(4));
    let print_stmt = println(method_call(var("a"), "length", vec![]));
    run(main_program(vec![decl_stmt, append_stmt, print_stmt]));
}

#[test]
fn interface_dispatch_through_trampoline() {
    // interface A { fn foo() void }
    // class Foo { fn foo() void { println("foo") } }
    // class Bar extends Foo implements A {}
    // A a = new Bar(); a.foo();
    let mut program = x_ast::Program::new();

    let mut iface = x_ast::InterfaceDef {
        name: "A".to_string(),
        parents: vec![],
        methods: Default::default(),
    };
    iface.methods.insert(
        "foo".to_string(),
        method_decl(fn_decl("foo", vec![], Type::void()), true, AccessModifier::Public, false),
    );
    program.interfaces.push(iface);

    let mut foo_class = class_skeleton("Foo");
    foo_class.methods.insert(
        "foo".to_string(),
        method_def(fn_def(fn_decl("foo", vec![], Type::void()), vec![println(string("foo"))]), AccessModifier::Public, false),
    );
    program.classes.push(foo_class);

    let mut bar_class = class_skeleton("Bar");
    bar_class.parent = Some("Foo".to_string());
    bar_class.interfaces = vec!["A".to_string()];
    program.classes.push(bar_class);

    let decl_stmt = decl("a", Type::class("A"), Some(new_obj("Bar", vec![])));
    let call_stmt = expr_stmt(method_call(var("a"), "foo", vec![]));
    program.funcs.push(fn_def(fn_decl("main", vec![], Type::void()), vec![decl_stmt, call_stmt]));

    run(program);
}

/// §8 scenario 5: `"hello"+"bar"` is folded to a single string constant at
/// compile time, with no runtime concat call left in the lowered IR.
/// Inspects the verified module's own text rather than stdout, since the
/// folding happens entirely before any code executes.
#[test]
fn string_concat_is_constant_folded() {
    let mut program = main_program(vec![println(binary(BinaryOp::Add, string("hello"), string("bar")))]);
    let rt = x_compiler::run_passes(&mut program).expect("passes should accept this program");

    let context = inkwell::context::Context::create();
    let mut lowerer = x_compiler::Lowerer::new(&context, "x", &rt);
    lowerer.lower_program(&program).expect("program should lower");
    let module = lowerer.into_module();
    module.verify().expect("module should verify");
    let ir = module.print_to_string().to_string();

    assert!(ir.contains("hellobar"), "expected the folded literal in the IR:\n{ir}");
    assert!(!ir.contains("String_concat"), "no runtime concat call should remain:\n{ir}");
}

fn class_skeleton(name: &str) -> x_ast::ClassDef {
    x_ast::ClassDef {
        name: name.to_string(),
        parent: None,
        interfaces: vec![],
        is_abstract: false,
        props: vec![],
        methods: Default::default(),
        abstract_methods: Default::default(),
    }
}

fn append_arr(array: x_ast::Expr, value: x_ast::Expr) -> x_ast::Stmt {
    x_ast::Stmt::new(x_ast::StmtKind::AppendArr { array, value })
}
