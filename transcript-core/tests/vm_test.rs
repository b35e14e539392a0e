// transcript-core - VM end-to-end tests
// Copyright (c) 2025 Tom Waddington. MIT licensed.

use transcript_core::Interpreter;

fn run(src: &str) -> String {
    let interp = Interpreter::new().expect("interpreter");
    match interp.eval(src) {
        Ok(v) => v.to_display_string(),
        Err(e) => panic!("eval error: {e}"),
    }
}

/// Evaluate a program, then evaluate a probe expression in the same
/// interpreter and render the result.
fn run_then(src: &str, probe: &str) -> String {
    let interp = Interpreter::new().expect("interpreter");
    interp.eval(src).expect("program");
    match interp.eval(probe) {
        Ok(v) => v.to_display_string(),
        Err(e) => panic!("probe error: {e}"),
    }
}

// ============================================================================
// Literals and operators
// ============================================================================

#[test]
fn test_arithmetic() {
    assert_eq!(run("1 + 3"), "4");
    assert_eq!(run("12 * 4 - 6"), "42");
    assert_eq!(run("3 / 2"), "1.5");
    assert_eq!(run("-13"), "-13");
    assert_eq!(run("2.5 + 1"), "3.5");
}

#[test]
fn test_comparisons() {
    assert_eq!(run("5 >= 4"), "true");
    assert_eq!(run("5 == 4 + 2"), "false");
    assert_eq!(run("1 != 2"), "true");
    assert_eq!(run("\"a\" < \"b\""), "true");
    // cross-type comparison answers false, never faults
    assert_eq!(run("1 == \"x\""), "false");
}

#[test]
fn test_logical_short_circuit() {
    assert_eq!(run("true && false"), "false");
    assert_eq!(run("false || true"), "true");
    // the right operand must not be evaluated
    assert_eq!(run("false && undefinedThing"), "false");
    assert_eq!(run("true || undefinedThing"), "true");
}

#[test]
fn test_negation() {
    assert_eq!(run("!true"), "false");
    assert_eq!(run("!false"), "true");
    // every value other than false negates to false
    assert_eq!(run("!0"), "false");
    assert_eq!(run("!nil"), "false");
}

#[test]
fn test_strings() {
    assert_eq!(run("\"Hello, \" + \"world\""), "Hello, world");
    assert_eq!(run("\"abc\".size"), "3");
    assert_eq!(run("\"abc\"[1]"), "b");
    assert_eq!(run("\"12\".toInt() + 1"), "13");
}

// ============================================================================
// Variables and scope
// ============================================================================

#[test]
fn test_local_definition_shadows() {
    let src = "def x = 1; def f() def x = 2; return x; end;";
    assert_eq!(run_then(src, "f()"), "2");
    assert_eq!(run_then(src, "x"), "1");
}

#[test]
fn test_assignment_updates_in_place() {
    let src = "def a = 1; def f() a = 2; return a; end;";
    assert_eq!(run_then(src, "f()"), "2");
    let interp = Interpreter::new().unwrap();
    interp.eval(src).unwrap();
    interp.eval("f();").unwrap();
    assert_eq!(interp.eval("a").unwrap().to_int().unwrap(), 2);
}

#[test]
fn test_forward_reference_within_block() {
    // definitions may refer to later ones as long as reads are deferred
    let src = "def f() def g() = h(); def h() = 5; return g(); end;";
    assert_eq!(run_then(src, "f()"), "5");
}

#[test]
fn test_undefined_global_read_faults() {
    let interp = Interpreter::new().unwrap();
    let e = interp.eval("noSuchGlobal").unwrap_err();
    assert!(e.to_string().contains("noSuchGlobal"), "got: {e}");
}

#[test]
fn test_box_state_is_monotonic() {
    let interp = Interpreter::new().unwrap();
    assert!(interp.eval("pending").is_err());
    interp.eval("def pending = 9;").unwrap();
    assert_eq!(interp.eval("pending").unwrap().to_int().unwrap(), 9);
    assert_eq!(interp.eval("pending").unwrap().to_int().unwrap(), 9);
    assert!(interp.defined("pending"));
}

// ============================================================================
// Functions and closures
// ============================================================================

#[test]
fn test_function_calls() {
    assert_eq!(run_then("def add(a, b) return a + b; end;", "add(2, 3)"), "5");
}

#[test]
fn test_wrong_argument_count_faults() {
    let interp = Interpreter::new().unwrap();
    interp.eval("def f(a) return a; end;").unwrap();
    assert!(interp.eval("f(1, 2)").is_err());
    assert!(interp.eval("f()").is_err());
}

#[test]
fn test_optional_arguments_default_to_false() {
    let src = "def f(a, b?) if b then return b; else return a; end; end;";
    assert_eq!(run_then(src, "f(1)"), "1");
    assert_eq!(run_then(src, "f(1, 2)"), "2");
}

#[test]
fn test_rest_argument_collects_extras() {
    let src = "def f(a, r*) return r; end;";
    assert_eq!(run_then(src, "f(1).size"), "0");
    assert_eq!(run_then(src, "f(1, 2, 3)[1]"), "3");
}

#[test]
fn test_closure_captures_by_reference() {
    let src = "
        def accumulate(x)
            return fn(y)
                x = x + y;
                return x;
            end;
        end;
        def a = accumulate(1);
    ";
    let interp = Interpreter::new().unwrap();
    interp.eval(src).unwrap();
    assert_eq!(interp.eval("a(1)").unwrap().to_int().unwrap(), 2);
    assert_eq!(interp.eval("a(4)").unwrap().to_int().unwrap(), 6);
}

#[test]
fn test_two_closures_share_one_binding() {
    let src = "
        def make()
            def v = 0;
            def set(x) v = x; end;
            def get() = v;
            return [set, get];
        end;
        def p = make();
    ";
    let interp = Interpreter::new().unwrap();
    interp.eval(src).unwrap();
    interp.eval("p[0](42)").unwrap();
    assert_eq!(interp.eval("p[1]()").unwrap().to_int().unwrap(), 42);
}

#[test]
fn test_tail_recursion_is_unbounded() {
    let src = "
        def loop(n)
            if n == 0 then
                return 0;
            else
                return loop(n - 1);
            end;
        end;
    ";
    assert_eq!(run_then(src, "loop(200000)"), "0");
}

#[test]
fn test_iteration_through_tail_calls() {
    let src = "
        def total = 0;
        def for(i, t, f)
            if i < t then
                f(i);
                return for(i + 1, t, f);
            end;
        end;
        for(0, 10000, fn(i) total = total + 1; end);
    ";
    assert_eq!(run_then(src, "total"), "10000");
}

#[test]
fn test_methods_remember_receiver() {
    // a method read through a property get is bound to its receiver
    assert_eq!(run_then("def f = 1.toString;", "f()"), "1");
}

// ============================================================================
// Arrays and hashes
// ============================================================================

#[test]
fn test_array_literals_and_indexing() {
    assert_eq!(run("[1, 2, 3].size"), "3");
    assert_eq!(run("[1, 2, 3][0]"), "1");
    assert_eq!(run("[1, 2] + [3, 4]"), "[1, 2, 3, 4]");
    let interp = Interpreter::new().unwrap();
    interp.eval("def a = [1, 2, 3]; a[1] = 9;").unwrap();
    assert_eq!(interp.eval("a[1]").unwrap().to_int().unwrap(), 9);
}

#[test]
fn test_array_methods() {
    assert_eq!(run_then("def a = [3, 1];", "a.push(2); a.size"), "3");
    assert_eq!(run("[1, 2, 3].indexOf(2)"), "1");
    assert_eq!(run("[1, 2, 3].slice(1)"), "[2, 3]");
    assert_eq!(run("[\"a\", \"b\"].join(\"-\")"), "a-b");
}

#[test]
fn test_array_index_out_of_range() {
    let interp = Interpreter::new().unwrap();
    assert!(interp.eval("[1][5]").is_err());
}

#[test]
fn test_sort_through_accessors() {
    assert_eq!(
        run_then("def a = [3, 1, 2]; sort(a);", "a"),
        "[1, 2, 3]"
    );
}

#[test]
fn test_hash_literals() {
    assert_eq!(run("{\"k\": 1}[\"k\"]"), "1");
    assert_eq!(run("{1: \"one\", 2: \"two\"}.size"), "2");
    let interp = Interpreter::new().unwrap();
    interp.eval("def h = {}; h[\"x\"] = 5;").unwrap();
    assert_eq!(interp.eval("h[\"x\"]").unwrap().to_int().unwrap(), 5);
    assert_eq!(interp.eval("h.contains(\"x\")").unwrap().is_false(), false);
}

#[test]
fn test_hash_missing_key_faults() {
    let interp = Interpreter::new().unwrap();
    assert!(interp.eval("{}[\"missing\"]").is_err());
}

#[test]
fn test_iteration_protocol() {
    let src = "
        def total = 0;
        def each(coll, f)
            def it = coll.__iter__();
            def go()
                def x = it.next();
                if x != done then
                    f(x);
                    return go();
                end;
            end;
            go();
        end;
        each([1, 2, 3], fn(x) total = total + x; end);
    ";
    assert_eq!(run_then(src, "total"), "6");
}

// ============================================================================
// Classes and dispatch
// ============================================================================

#[test]
fn test_constructor_and_method_dispatch() {
    let src = "
        class Vector()
            def x, y;
            def create(x, y)
                this.x = x;
                this.y = y;
            end;
            def length()
                return this.x + this.y;
            end;
        end;
    ";
    assert_eq!(run_then(src, "Vector(3, 4).length()"), "7");
}

#[test]
fn test_field_access_from_outside() {
    let src = "
        class P()
            def v;
            def create(v) this.v = v; end;
        end;
        def p = P(10);
    ";
    assert_eq!(run_then(src, "p.v"), "10");
    let interp = Interpreter::new().unwrap();
    interp.eval(src).unwrap();
    interp.eval("p.v = 11;").unwrap();
    assert_eq!(interp.eval("p.v").unwrap().to_int().unwrap(), 11);
}

#[test]
fn test_inheritance_and_super() {
    let src = "
        class A()
            def m() return 1; end;
        end;
        class B(A)
            def m() return super.m() + 1; end;
        end;
    ";
    assert_eq!(run_then(src, "B().m()"), "2");
    // the ancestor's own behaviour is untouched by the override
    assert_eq!(run_then(src, "A().m()"), "1");
}

#[test]
fn test_super_through_intermediate_ancestor() {
    let src = "
        class A()
            def m() return 1; end;
        end;
        class B(A)
            def m() return super.m() + 10; end;
        end;
        class C(B)
            def m() return super.m() + 100; end;
        end;
    ";
    assert_eq!(run_then(src, "C().m()"), "111");
}

#[test]
fn test_inherited_methods_dispatch_virtually() {
    let src = "
        class A()
            def describe() return this.kind(); end;
            def kind() return \"a\"; end;
        end;
        class B(A)
            def kind() return \"b\"; end;
        end;
    ";
    assert_eq!(run_then(src, "B().describe()"), "b");
}

#[test]
fn test_properties_with_getter_and_setter() {
    let src = "
        class Cell()
            private def raw;
            def value
                get() return this.raw; end
                set(v) this.raw = v; end;
        end;
        def c = Cell();
    ";
    let interp = Interpreter::new().unwrap();
    interp.eval(src).unwrap();
    interp.eval("c.value = 7;").unwrap();
    assert_eq!(interp.eval("c.value").unwrap().to_int().unwrap(), 7);
}

#[test]
fn test_read_only_property_rejects_writes() {
    let src = "
        class R()
            def ten get() return 10; end;
        end;
        def r = R();
    ";
    let interp = Interpreter::new().unwrap();
    interp.eval(src).unwrap();
    assert_eq!(interp.eval("r.ten").unwrap().to_int().unwrap(), 10);
    assert!(interp.eval("r.ten = 1;").is_err());
}

#[test]
fn test_private_slots_are_invisible_outside() {
    let src = "
        class S()
            private def secret = 5;
            def reveal() return this.secret; end;
        end;
        def s = S();
    ";
    let interp = Interpreter::new().unwrap();
    interp.eval(src).unwrap();
    assert_eq!(interp.eval("s.reveal()").unwrap().to_int().unwrap(), 5);
    assert!(interp.eval("s.secret").is_err());
}

#[test]
fn test_missing_slot_fires_failure_hook() {
    let interp = Interpreter::new().unwrap();
    let e = interp.eval("Object().nonsense").unwrap_err();
    assert!(e.to_string().contains("nonsense"), "got: {e}");
    let e = interp.eval("Object().nonsense()").unwrap_err();
    assert!(e.to_string().contains("nonsense"), "got: {e}");
}

#[test]
fn test_is_checks_ancestry() {
    let src = "class A() end; class B(A) end;";
    assert_eq!(run_then(src, "B().is(A)"), "true");
    assert_eq!(run_then(src, "A().is(B)"), "false");
    assert_eq!(run_then(src, "B().is(Object)"), "true");
}

#[test]
fn test_anonymous_class_expressions_memoise() {
    let src = "
        def make()
            return (class()
                def m() return 1; end;
            end)();
        end;
        def a = make();
        def b = make();
    ";
    // repeated executions of one lexical class expression yield instances
    // of the identical class
    let interp = Interpreter::new().unwrap();
    interp.eval(src).unwrap();
    let a = interp.eval("a").unwrap();
    let b = interp.eval("b").unwrap();
    assert!(
        std::rc::Rc::ptr_eq(
            &a.class(),
            &b.class()
        ),
        "instances of one class expression should share their class"
    );
}

#[test]
fn test_final_class_rejects_extension() {
    let interp = Interpreter::new().unwrap();
    assert!(interp.eval("class Bad(String) end;").is_err());
}

#[test]
fn test_shadowing_rejected() {
    // redefining an inherited method as a field is incompatible
    let src = "
        class A()
            def m() return 1; end;
        end;
        class B(A)
            def m = 2;
        end;
    ";
    let interp = Interpreter::new().unwrap();
    assert!(interp.eval(src).is_err());
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_catch_returns_wrapped_error() {
    let interp = Interpreter::new().unwrap();
    let v = interp.eval("catch(fn() = throw(\"bang\"))").unwrap();
    assert!(!v.is_false());
    assert_eq!(
        interp
            .eval("catch(fn() = throw(\"bang\")).msg")
            .unwrap()
            .to_str()
            .unwrap(),
        "bang"
    );
}

#[test]
fn test_catch_returns_false_on_success() {
    assert_eq!(run("catch(fn() = 42)"), "false");
}

#[test]
fn test_errors_carry_position() {
    let interp = Interpreter::new().unwrap();
    let line = interp
        .eval("catch(fn() = undefinedName).line")
        .unwrap()
        .to_int()
        .unwrap();
    assert!(line > 0);
}

#[test]
fn test_thrown_error_objects_pass_through() {
    let src = "
        def e = catch(fn() = throw(Error(\"custom\")));
    ";
    assert_eq!(run_then(src, "e.msg"), "custom");
    assert_eq!(run_then(src, "e.is(Error)"), "true");
}

#[test]
fn test_abstract_method_faults() {
    let interp = Interpreter::new().unwrap();
    interp.eval("class Coll(Collection) end;").unwrap();
    let e = interp.eval("Coll()[0]").unwrap_err();
    assert!(e.to_string().contains("abstract"), "got: {e}");
}

// ============================================================================
// Packages
// ============================================================================

#[test]
fn test_import_math_extension() {
    let src = "import math;";
    assert_eq!(run_then(src, "math.sqrt(16.0)"), "4.0");
    assert_eq!(run_then(src, "math.max(2.0, 3.0)"), "3.0");
    // toFloat coercion admits integers
    assert_eq!(run_then(src, "math.sqrt(25)"), "5.0");
}

#[test]
fn test_import_re_extension() {
    let src = "import re; def r = re.Regex(\"a+b\");";
    assert_eq!(run_then(src, "r.find(\"xxaaabyy\")"), "aaab");
    assert_eq!(run_then(src, "r.find(\"zzz\")"), "false");
}

#[test]
fn test_packages_load_once() {
    let interp = Interpreter::new().unwrap();
    interp.eval("import math; def m1 = math;").unwrap();
    interp.eval("import math; def m2 = math;").unwrap();
    let m1 = interp.eval("m1").unwrap();
    let m2 = interp.eval("m2").unwrap();
    assert_eq!(m1, m2);
}

#[test]
fn test_package_statement_exports() {
    let src = "
        package counter
            def n = 0;
            def bump() n = n + 1; return n; end;
            export n, bump;
        end;
        import counter;
    ";
    let interp = Interpreter::new().unwrap();
    interp.eval(src).unwrap();
    assert_eq!(interp.eval("counter.bump()").unwrap().to_int().unwrap(), 1);
    assert_eq!(interp.eval("counter.bump()").unwrap().to_int().unwrap(), 2);
    // exports thread through to package state
    assert_eq!(interp.eval("counter.n").unwrap().to_int().unwrap(), 2);
}

// ============================================================================
// Host interface
// ============================================================================

#[test]
fn test_define_get_set() {
    let interp = Interpreter::new().unwrap();
    interp.define("fromHost", transcript_core::Value::int(5));
    assert_eq!(interp.eval("fromHost + 1").unwrap().to_int().unwrap(), 6);
    interp.set("fromHost", transcript_core::Value::int(9)).unwrap();
    assert_eq!(interp.get("fromHost").unwrap().to_int().unwrap(), 9);
    assert!(interp.set("neverDefined", transcript_core::Value::int(1)).is_err());
}

#[test]
fn test_list_defined_includes_globals() {
    let interp = Interpreter::new().unwrap();
    interp.eval("def uniqueNameForTest = 1;").unwrap();
    let names = interp.list_defined();
    assert!(names.iter().any(|n| n == "uniqueNameForTest"));
    assert!(names.iter().any(|n| n == "print"));
}
