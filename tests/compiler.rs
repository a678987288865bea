//! End-to-end tests for the Jack compiler: each compiles one class held
//! in a string and checks the emitted bytecode.

use pretty_assertions::assert_eq;

use hackc::{compiler, Error, ErrorKind};

fn compile(source: &str) -> Vec<String> {
    let mut out = Vec::new();
    compiler::compile(source, &mut out).expect("compilation failed");
    String::from_utf8(out)
        .unwrap()
        .lines()
        .map(String::from)
        .collect()
}

fn compile_err(source: &str) -> Error {
    let mut out = Vec::new();
    compiler::compile(source, &mut out).expect_err("compilation unexpectedly succeeded")
}

#[test]
fn declarations_only_class_emits_nothing() {
    let out = compile("class Point { field int x, y; static int count; }");
    assert_eq!(out, Vec::<String>::new());
}

#[test]
fn function_assigning_a_field() {
    let out = compile(
        "class C {
            field int _f;
            function void set(int x) {
                let _f = x;
                return;
            }
        }",
    );
    let expected = vec![
        "function C.set 0",
        "push argument 0",
        "pop this 0",
        "push constant 0",
        "return",
    ];
    assert_eq!(out, expected);
}

#[test]
fn method_binds_receiver_before_its_body() {
    let out = compile(
        "class C {
            field int _f;
            method void set(int x) {
                let _f = x;
                return;
            }
        }",
    );
    let expected = vec![
        "function C.set 0",
        "push argument 0",
        "pop pointer 0",
        "push argument 1",
        "pop this 0",
        "push constant 0",
        "return",
    ];
    assert_eq!(out, expected);
}

#[test]
fn constructor_allocates_by_total_field_count() {
    let out = compile(
        "class Point {
            field int x, y;
            constructor Point new(int ax, int ay) {
                let x = ax;
                let y = ay;
                return this;
            }
        }",
    );
    let expected = vec![
        "function Point.new 0",
        "push constant 2",
        "call Memory.alloc 1",
        "pop pointer 0",
        "push argument 0",
        "pop this 0",
        "push argument 1",
        "pop this 1",
        "push pointer 0",
        "return",
    ];
    assert_eq!(out, expected);
}

#[test]
fn interleaved_kinds_get_independent_dense_indices() {
    let out = compile(
        "class Mix {
            field int a;
            static int b;
            field int c;
            static int d;
            method void copy() {
                let a = b;
                let c = d;
                return;
            }
        }",
    );
    let expected = vec![
        "function Mix.copy 0",
        "push argument 0",
        "pop pointer 0",
        "push static 0",
        "pop this 0",
        "push static 1",
        "pop this 1",
        "push constant 0",
        "return",
    ];
    assert_eq!(out, expected);
}

#[test]
fn local_shadows_field_within_one_subroutine_only() {
    let out = compile(
        "class Shade {
            field int v;
            function int masked() {
                var int v;
                let v = 7;
                return v;
            }
            method int plain() {
                return v;
            }
        }",
    );
    let expected = vec![
        "function Shade.masked 1",
        "push constant 7",
        "pop local 0",
        "push local 0",
        "return",
        "function Shade.plain 0",
        "push argument 0",
        "pop pointer 0",
        "push this 0",
        "return",
    ];
    assert_eq!(out, expected);
}

#[test]
fn branch_labels_count_up_and_reset_per_subroutine() {
    let out = compile(
        "class B {
            function void f(int x) {
                if (x) { let x = 1; }
                if (x) { let x = 2; }
                while (x) { let x = 3; }
                return;
            }
            function void g(int x) {
                if (x) { let x = 1; }
                return;
            }
        }",
    );
    let expected = vec![
        "function B.f 0",
        "push argument 0",
        "not",
        "if-goto B.f$br0$IF-ELSE",
        "push constant 1",
        "pop argument 0",
        "goto B.f$br0$IF-OUT",
        "label B.f$br0$IF-ELSE",
        "label B.f$br0$IF-OUT",
        "push argument 0",
        "not",
        "if-goto B.f$br1$IF-ELSE",
        "push constant 2",
        "pop argument 0",
        "goto B.f$br1$IF-OUT",
        "label B.f$br1$IF-ELSE",
        "label B.f$br1$IF-OUT",
        "label B.f$br2$WHILE-EXP",
        "push argument 0",
        "not",
        "if-goto B.f$br2$WHILE-OUT",
        "push constant 3",
        "pop argument 0",
        "goto B.f$br2$WHILE-EXP",
        "label B.f$br2$WHILE-OUT",
        "push constant 0",
        "return",
        "function B.g 0",
        "push argument 0",
        "not",
        "if-goto B.g$br0$IF-ELSE",
        "push constant 1",
        "pop argument 0",
        "goto B.g$br0$IF-OUT",
        "label B.g$br0$IF-ELSE",
        "label B.g$br0$IF-OUT",
        "push constant 0",
        "return",
    ];
    assert_eq!(out, expected);
}

#[test]
fn if_with_else_arm() {
    let out = compile(
        "class Cond {
            function int pick(boolean which, int a, int b) {
                if (which) {
                    return a;
                } else {
                    return b;
                }
            }
        }",
    );
    let expected = vec![
        "function Cond.pick 0",
        "push argument 0",
        "not",
        "if-goto Cond.pick$br0$IF-ELSE",
        "push argument 1",
        "return",
        "goto Cond.pick$br0$IF-OUT",
        "label Cond.pick$br0$IF-ELSE",
        "push argument 2",
        "return",
        "label Cond.pick$br0$IF-OUT",
    ];
    assert_eq!(out, expected);
}

#[test]
fn call_dispatch_by_receiver_shape() {
    let out = compile(
        "class Game {
            method void run(Ball b) {
                do b.move(1, 2);
                do Screen.clear();
                do step(3);
                return;
            }
        }",
    );
    let expected = vec![
        "function Game.run 0",
        "push argument 0",
        "pop pointer 0",
        // declared variable: dispatch on its type, receiver pushed first
        "push argument 1",
        "push constant 1",
        "push constant 2",
        "call Ball.move 3",
        "pop temp 0",
        // bare class name: no implicit receiver
        "call Screen.clear 0",
        "pop temp 0",
        // unqualified call: method of the current object
        "push pointer 0",
        "push constant 3",
        "call Game.step 2",
        "pop temp 0",
        "push constant 0",
        "return",
    ];
    assert_eq!(out, expected);
}

#[test]
fn subtraction_chain_groups_right() {
    // Operators drain most-recent-first, so a - b - c evaluates as
    // a - (b - c).
    let out = compile(
        "class Arith {
            function int sub3(int a, int b, int c) {
                return a - b - c;
            }
        }",
    );
    let expected = vec![
        "function Arith.sub3 0",
        "push argument 0",
        "push argument 1",
        "push argument 2",
        "neg",
        "add",
        "neg",
        "add",
        "return",
    ];
    assert_eq!(out, expected);
}

#[test]
fn star_and_slash_desugar_to_runtime_calls() {
    let out = compile(
        "class Arith {
            function int scale(int a, int b, int c) {
                return (a + b) * c;
            }
            function int half(int a) {
                return a / 2;
            }
        }",
    );
    let expected = vec![
        "function Arith.scale 0",
        "push argument 0",
        "push argument 1",
        "add",
        "push argument 2",
        "call Math.multiply 2",
        "return",
        "function Arith.half 0",
        "push argument 0",
        "push constant 2",
        "call Math.divide 2",
        "return",
    ];
    assert_eq!(out, expected);
}

#[test]
fn relational_operators_and_two_token_folds() {
    let out = compile(
        "class Rel {
            function boolean below(int a, int b) {
                return a < b;
            }
            function boolean at_most(int a, int b) {
                return a <= b;
            }
            function boolean at_least(int a, int b) {
                return a >= b;
            }
        }",
    );
    let expected = vec![
        "function Rel.below 0",
        "push argument 0",
        "push argument 1",
        "lt",
        "return",
        // `<=` folds to a swapped comparison plus a negation, drained
        // most-recent-first
        "function Rel.at_most 0",
        "push argument 0",
        "push argument 1",
        "not",
        "gt",
        "return",
        "function Rel.at_least 0",
        "push argument 0",
        "push argument 1",
        "not",
        "lt",
        "return",
    ];
    assert_eq!(out, expected);
}

#[test]
fn keyword_constants() {
    let out = compile(
        "class Flags {
            function boolean demo() {
                var boolean t;
                let t = true;
                let t = false;
                let t = null;
                return t;
            }
        }",
    );
    let expected = vec![
        "function Flags.demo 1",
        "push constant 1",
        "neg",
        "pop local 0",
        "push constant 0",
        "pop local 0",
        "push constant 0",
        "pop local 0",
        "push local 0",
        "return",
    ];
    assert_eq!(out, expected);
}

#[test]
fn unary_operators_compile_their_operand_first() {
    let out = compile(
        "class Un {
            function int flip(int x) {
                return -x;
            }
            function int invert(int x) {
                return ~x;
            }
        }",
    );
    let expected = vec![
        "function Un.flip 0",
        "push argument 0",
        "neg",
        "return",
        "function Un.invert 0",
        "push argument 0",
        "not",
        "return",
    ];
    assert_eq!(out, expected);
}

#[test]
fn array_store_fixes_the_address_before_the_value() {
    let out = compile(
        "class Buf {
            function void put(Array a, int i, int v) {
                let a[i] = v;
                return;
            }
        }",
    );
    let expected = vec![
        "function Buf.put 0",
        "push argument 0",
        "push argument 1",
        "add",
        "push argument 2",
        "pop temp 0",
        "pop pointer 1",
        "push temp 0",
        "pop that 0",
        "push constant 0",
        "return",
    ];
    assert_eq!(out, expected);
}

#[test]
fn array_read_loads_through_that() {
    let out = compile(
        "class Buf {
            function int get(Array a, int i) {
                var int v;
                let v = a[i];
                return v;
            }
        }",
    );
    let expected = vec![
        "function Buf.get 1",
        "push argument 0",
        "push argument 1",
        "add",
        "pop pointer 1",
        "push that 0",
        "pop local 0",
        "push local 0",
        "return",
    ];
    assert_eq!(out, expected);
}

#[test]
fn string_constant_builds_via_runtime_calls() {
    let out = compile(
        "class Greet {
            function String hi() {
                return \"Hi\";
            }
        }",
    );
    let expected = vec![
        "function Greet.hi 0",
        "push constant 2",
        "call String.new 1",
        "push constant 72",
        "call String.appendChar 2",
        "push constant 105",
        "call String.appendChar 2",
        "return",
    ];
    assert_eq!(out, expected);
}

#[test]
fn undeclared_identifier_is_fatal() {
    let err = compile_err(
        "class U {
            function void f() {
                let x = 1;
                return;
            }
        }",
    );
    assert!(matches!(err.kind(), ErrorKind::Undeclared(name) if name == "x"));
}

#[test]
fn missing_token_at_grammar_checkpoint_is_fatal() {
    let err = compile_err("class U { function void f() { let = 1; return; } }");
    assert!(matches!(err.kind(), ErrorKind::UnexpectedToken(_)));
}

#[test]
fn truncated_input_is_fatal() {
    let err = compile_err("class U {");
    assert!(matches!(err.kind(), ErrorKind::UnexpectedEof));
}

#[test]
fn keyword_in_term_position_is_unsupported() {
    let err = compile_err(
        "class U {
            function void f() {
                return let;
            }
        }",
    );
    assert!(matches!(err.kind(), ErrorKind::Unsupported(word) if word == "let"));
}
