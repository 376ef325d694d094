// Integration tests for translation and invocation

use ccall::translator::{HostArg, TranslateError, Translator};
use ccall::Value;

fn session(source: &str) -> Translator {
    Translator::from_source(source).expect("source failed to parse")
}

fn invoke_ints(session: &mut Translator, name: &str, args: &[i128]) -> Value {
    let args: Vec<HostArg> = args.iter().map(|&v| HostArg::Int(v)).collect();
    session
        .invoke(name, &args)
        .unwrap_or_else(|e| panic!("invoking {} failed: {}", name, e))
}

#[test]
fn test_simple_add() {
    let source = r#"
        int add(int a, int b) {
            return a + b;
        }
    "#;
    let mut session = session(source);
    let result = invoke_ints(&mut session, "add", &[3, 4]);
    assert_eq!(result, Value::I32(7));
}

#[test]
fn test_literal_widths_in_listing() {
    let source = r#"
        long widths() {
            long a = 5;
            long b = 300;
            long c = 5000000000;
            return a + b + c;
        }
    "#;
    let mut session = session(source);
    let listing = session.dump_source("widths").expect("dump failed");
    // literals carry the smallest signed width that holds them
    assert!(listing.contains("values.new::<int8_t>(5)"), "{}", listing);
    assert!(listing.contains("values.new::<int16_t>(300)"), "{}", listing);
    assert!(
        listing.contains("values.new::<int64_t>(5000000000)"),
        "{}",
        listing
    );

    let result = invoke_ints(&mut session, "widths", &[]);
    assert_eq!(result, Value::I64(5000000305));
}

#[test]
fn test_arithmetic_truncates_to_declared_width() {
    let source = r#"
        char wrap(char c) {
            c = c + 100;
            return c;
        }
    "#;
    let mut session = session(source);
    // 100 + 100 wraps in a signed byte
    let result = invoke_ints(&mut session, "wrap", &[100]);
    assert_eq!(result, Value::Char(-56));
}

#[test]
fn test_while_loop_sum() {
    let source = r#"
        int sum_to(int n) {
            int total = 0;
            int i = 1;
            while (i <= n) {
                total += i;
                ++i;
            }
            return total;
        }
    "#;
    let mut session = session(source);
    let result = invoke_ints(&mut session, "sum_to", &[10]);
    assert_eq!(result, Value::I32(55));
}

#[test]
fn test_block_scoping_and_shadowing() {
    let source = r#"
        int shadowed() {
            int x = 1;
            {
                int x = 2;
                x = 3;
            }
            return x;
        }
    "#;
    let mut session = session(source);
    let result = invoke_ints(&mut session, "shadowed", &[]);
    assert_eq!(result, Value::I32(1));

    // the inner binding gets a distinct generated name and is unbound
    // at the end of its block
    let listing = session.dump_source("shadowed").expect("dump failed");
    assert!(listing.contains("let x_a ="), "{}", listing);
    assert!(listing.contains("drop(x_a);"), "{}", listing);
}

#[test]
fn test_reserved_listing_names_are_renamed() {
    let source = r#"
        int g(int values) {
            int helpers = values + 1;
            return helpers;
        }
    "#;
    let mut session = session(source);
    assert_eq!(invoke_ints(&mut session, "g", &[5]), Value::I32(6));

    // `g`, `values` and `helpers` belong to the listing environment
    let listing = session.dump_source("g").expect("dump failed");
    assert!(listing.contains("let values_a ="), "{}", listing);
    assert!(listing.contains("let helpers_a ="), "{}", listing);
}

#[test]
fn test_loop_body_rebinds_each_iteration() {
    let source = r#"
        int rebind(int n) {
            int total = 0;
            while (n > 0) {
                int step = 0;
                step = step + n;
                total = total + step;
                n = n - 1;
            }
            return total;
        }
    "#;
    let mut session = session(source);
    // step starts from zero every iteration: 3 + 2 + 1
    let result = invoke_ints(&mut session, "rebind", &[3]);
    assert_eq!(result, Value::I32(6));
}

#[test]
fn test_postfix_and_prefix_increment() {
    let source = r#"
        int post(int x) {
            int y = x++;
            return y * 100 + x;
        }

        int pre(int x) {
            int y = ++x;
            return y * 100 + x;
        }
    "#;
    let mut session = session(source);
    assert_eq!(invoke_ints(&mut session, "post", &[5]), Value::I32(506));
    assert_eq!(invoke_ints(&mut session, "pre", &[5]), Value::I32(606));
}

#[test]
fn test_pointer_increment_scales_by_pointee_size() {
    let source = r#"
        long delta(int *p) {
            long a;
            long b;
            a = (long)p;
            ++p;
            b = (long)p;
            return b - a;
        }
    "#;
    let mut session = session(source);
    let result = invoke_ints(&mut session, "delta", &[0x1000]);
    assert_eq!(result, Value::I64(4));
}

#[test]
fn test_pointer_addition_scales_by_pointee_size() {
    let source = r#"
        long advance(long *p, int n) {
            long before = (long)p;
            long after = (long)(p + n);
            return after - before;
        }
    "#;
    let mut session = session(source);
    let result = invoke_ints(&mut session, "advance", &[0x2000, 3]);
    assert_eq!(result, Value::I64(24));
}

#[test]
fn test_ternary_and_logical_short_circuit() {
    let source = r#"
        int clamp01(int x) {
            return x < 0 ? 0 : (x > 1 ? 1 : x);
        }

        int guarded(int x) {
            return x != 0 && 100 / x > 10;
        }
    "#;
    let mut session = session(source);
    assert_eq!(invoke_ints(&mut session, "clamp01", &[-5]), Value::I32(0));
    assert_eq!(invoke_ints(&mut session, "clamp01", &[7]), Value::I32(1));
    assert_eq!(invoke_ints(&mut session, "clamp01", &[1]), Value::I32(1));
    // the division must not run when x is zero
    assert_eq!(invoke_ints(&mut session, "guarded", &[0]), Value::I32(0));
    assert_eq!(invoke_ints(&mut session, "guarded", &[5]), Value::I32(1));
}

#[test]
fn test_struct_members_and_typedef_chain() {
    let source = r#"
        struct point {
            int x;
            int y;
        };
        typedef struct point point_t;
        typedef point_t pt;

        int taxicab() {
            pt p;
            p.x = 3;
            p.y = 4;
            return p.x + p.y;
        }
    "#;
    let mut session = session(source);
    let result = invoke_ints(&mut session, "taxicab", &[]);
    assert_eq!(result, Value::I32(7));
}

#[test]
fn test_struct_assignment_copies_fields() {
    let source = r#"
        struct pair {
            int a;
            int b;
        };

        int detach() {
            struct pair p;
            struct pair q;
            p.a = 1;
            p.b = 2;
            q = p;
            q.a = 10;
            return p.a * 100 + q.a;
        }
    "#;
    let mut session = session(source);
    let result = invoke_ints(&mut session, "detach", &[]);
    assert_eq!(result, Value::I32(110));
}

#[test]
fn test_global_counter_persists_across_invocations() {
    let source = r#"
        int counter;

        int bump() {
            counter = counter + 1;
            return counter;
        }
    "#;
    let mut session = session(source);
    assert_eq!(invoke_ints(&mut session, "bump", &[]), Value::I32(1));
    assert_eq!(invoke_ints(&mut session, "bump", &[]), Value::I32(2));
    assert_eq!(invoke_ints(&mut session, "bump", &[]), Value::I32(3));
}

#[test]
fn test_direct_recursion() {
    let source = r#"
        int fact(int n) {
            if (n <= 1) {
                return 1;
            }
            return n * fact(n - 1);
        }
    "#;
    let mut session = session(source);
    let result = invoke_ints(&mut session, "fact", &[6]);
    assert_eq!(result, Value::I32(720));
}

#[test]
fn test_mutual_recursion() {
    let source = r#"
        int is_odd(int n);

        int is_even(int n) {
            if (n == 0) {
                return 1;
            }
            return is_odd(n - 1);
        }

        int is_odd(int n) {
            if (n == 0) {
                return 0;
            }
            return is_even(n - 1);
        }
    "#;
    let mut session = session(source);
    assert_eq!(invoke_ints(&mut session, "is_even", &[10]), Value::I32(1));
    assert_eq!(invoke_ints(&mut session, "is_odd", &[10]), Value::I32(0));
}

#[test]
fn test_enum_variants_resolve_to_literals() {
    let source = r#"
        enum color { RED, GREEN = 5, BLUE };

        int pick() {
            return BLUE;
        }
    "#;
    let mut session = session(source);
    let result = invoke_ints(&mut session, "pick", &[]);
    assert_eq!(result, Value::I32(6));
}

#[test]
fn test_implicit_return_yields_zero_instance() {
    let source = r#"
        int nothing(int x) {
            x = x + 1;
        }
    "#;
    let mut session = session(source);
    assert_eq!(invoke_ints(&mut session, "nothing", &[41]), Value::I32(0));

    let listing = session.dump_source("nothing").expect("dump failed");
    assert!(listing.contains("return values.zero::<int32_t>();"), "{}", listing);
}

#[test]
fn test_bodiless_function_is_not_available() {
    let source = r#"
        int later(int x);

        int caller(int x) {
            return later(x);
        }
    "#;
    let mut session = session(source);
    let err = session.invoke("later", &[HostArg::Int(1)]).unwrap_err();
    assert!(matches!(err, TranslateError::NotAvailable { .. }), "{}", err);

    // the definition arriving later takes effect
    session
        .add_source("int later(int x) { return x * 2; }")
        .expect("second source failed to parse");
    assert_eq!(invoke_ints(&mut session, "later", &[21]), Value::I32(42));
    assert_eq!(invoke_ints(&mut session, "caller", &[10]), Value::I32(20));
}

#[test]
fn test_void_return_mismatches_fail_translation() {
    let mut session = session("void f() { return 1; }");
    let err = session.invoke("f", &[]).unwrap_err();
    assert!(matches!(err, TranslateError::TypeMismatch { .. }), "{}", err);

    let mut session = Translator::from_source("int g() { return; }").expect("parse failed");
    let err = session.invoke("g", &[]).unwrap_err();
    assert!(matches!(err, TranslateError::TypeMismatch { .. }), "{}", err);
}

#[test]
fn test_unknown_function_not_found() {
    let mut session = session("int f() { return 0; }");
    let err = session.invoke("missing", &[]).unwrap_err();
    assert!(matches!(err, TranslateError::NotFound { .. }), "{}", err);
}

#[test]
fn test_arity_mismatch() {
    let mut session = session("int add(int a, int b) { return a + b; }");
    let err = session.invoke("add", &[HostArg::Int(1)]).unwrap_err();
    match err {
        TranslateError::ArityMismatch { expected, got, .. } => {
            assert_eq!(expected, 2);
            assert_eq!(got, 1);
        }
        other => panic!("expected arity mismatch, got {}", other),
    }
}

#[test]
fn test_unresolved_identifier() {
    let mut session = session("int f() { return nowhere; }");
    let err = session.invoke("f", &[]).unwrap_err();
    match err {
        TranslateError::UnresolvedIdentifier { name, func } => {
            assert_eq!(name, "nowhere");
            assert_eq!(func, "f");
        }
        other => panic!("expected unresolved identifier, got {}", other),
    }
}

#[test]
fn test_typedef_name_is_not_a_value() {
    let mut session = session("typedef int myint; int f() { return myint; }");
    let err = session.invoke("f", &[]).unwrap_err();
    assert!(matches!(err, TranslateError::TypeMismatch { .. }), "{}", err);
}

#[test]
fn test_deref_is_unsupported() {
    let mut session = session("int f(int *p) { return *p; }");
    let err = session.invoke("f", &[HostArg::Int(0)]).unwrap_err();
    assert!(
        matches!(err, TranslateError::UnsupportedConstruct { .. }),
        "{}",
        err
    );
}

#[test]
fn test_missing_struct_field() {
    let source = r#"
        struct point { int x; };

        int f() {
            struct point p;
            return p.z;
        }
    "#;
    let mut session = session(source);
    let err = session.invoke("f", &[]).unwrap_err();
    match err {
        TranslateError::MissingField { field, .. } => assert_eq!(field, "z"),
        other => panic!("expected missing field, got {}", other),
    }
}

#[test]
fn test_switch_and_for_lower_to_nops() {
    let source = r#"
        int skipped(int x) {
            switch (x) {
                case 1:
                    return 100;
                default:
                    return 200;
            }
            for (x = 0; x < 10; x++) {
                x = x + 1;
            }
            return 7;
        }
    "#;
    let mut session = session(source);
    let listing = session.dump_source("skipped").expect("dump failed");
    assert!(listing.contains("/* switch: not translated */"), "{}", listing);
    assert!(listing.contains("/* for: not translated */"), "{}", listing);

    // both constructs do nothing at run time
    assert_eq!(invoke_ints(&mut session, "skipped", &[1]), Value::I32(7));
}

#[test]
fn test_string_argument_round_trip() {
    let source = r#"
        long first_byte_addr(char *s) {
            return (long)s;
        }
    "#;
    let mut session = session(source);
    let result = session
        .invoke("first_byte_addr", &[HostArg::Str("hi".into())])
        .expect("invoke failed");
    let address = match result {
        Value::I64(addr) => addr as u64,
        other => panic!("expected a long, got {:?}", other),
    };
    // session policy keeps the buffer alive after the call
    let bytes = session.read_buffer(address, 3).expect("read failed");
    assert_eq!(bytes, b"hi\0");
}

#[test]
fn test_string_literal_reuses_its_buffer() {
    let source = r#"
        long touch(int n) {
            long a = 0;
            while (n > 0) {
                a = (long)"x";
                n = n - 1;
            }
            return a;
        }
    "#;
    let mut session = session(source);
    // tight arena: the loop only fits if the literal's buffer is shared
    session.set_buffer_limit(64);
    let result = session
        .invoke("touch", &[HostArg::Int(1000)])
        .expect("invoke failed");
    let address = match result {
        Value::I64(addr) => addr as u64,
        other => panic!("expected a long, got {:?}", other),
    };
    let bytes = session.read_buffer(address, 2).expect("read failed");
    assert_eq!(bytes, b"x\0");
}

#[test]
fn test_sequence_argument_is_serialized() {
    let source = r#"
        long base(int *xs) {
            return (long)xs;
        }
    "#;
    let mut session = session(source);
    let result = session
        .invoke(
            "base",
            &[HostArg::Seq(vec![
                HostArg::Int(1),
                HostArg::Int(2),
                HostArg::Int(259),
            ])],
        )
        .expect("invoke failed");
    let address = match result {
        Value::I64(addr) => addr as u64,
        other => panic!("expected a long, got {:?}", other),
    };
    // three int32 elements little-endian, one zeroed terminator element
    let bytes = session.read_buffer(address, 16).expect("read failed");
    assert_eq!(
        bytes,
        vec![1, 0, 0, 0, 2, 0, 0, 0, 3, 1, 0, 0, 0, 0, 0, 0]
    );
}

#[test]
fn test_host_value_and_callable() {
    let source = r#"
        long compute(int x) {
            return hostmul(x + bias);
        }
    "#;
    let mut session = session(source);
    session.register_host_value(Some("bias"), Value::I32(10));
    session.register_host_callable(
        Some("hostmul"),
        std::rc::Rc::new(|args: &[std::rc::Rc<std::cell::RefCell<Value>>]| {
            let raw = args[0].borrow().raw()?;
            Ok(std::rc::Rc::new(std::cell::RefCell::new(Value::I64(
                (raw * 3) as i64,
            ))))
        }),
    );
    let result = invoke_ints(&mut session, "compute", &[4]);
    assert_eq!(result, Value::I64(42));
}

#[test]
fn test_null_argument() {
    let source = r#"
        int is_null(char *p) {
            return !p;
        }
    "#;
    let mut session = session(source);
    let result = session
        .invoke("is_null", &[HostArg::Null])
        .expect("invoke failed");
    assert_eq!(result, Value::I32(1));
}

#[test]
fn test_bitwise_and_shift_operators() {
    let source = r#"
        int bits(int x) {
            int a = x << 2;
            int b = a | 3;
            int c = b & 60;
            int d = c ^ 9;
            return ~d + (x >> 1);
        }
    "#;
    let mut session = session(source);
    // x = 5: a = 20, b = 23, c = 20, d = 29, ~d = -30, x >> 1 = 2
    assert_eq!(invoke_ints(&mut session, "bits", &[5]), Value::I32(-28));
}

#[test]
fn test_compound_assignment_operators() {
    let source = r#"
        int compound(int x) {
            x += 10;
            x -= 2;
            x *= 3;
            x /= 2;
            x %= 17;
            return x;
        }
    "#;
    let mut session = session(source);
    // 5 -> 15 -> 13 -> 39 -> 19 -> 2
    assert_eq!(invoke_ints(&mut session, "compound", &[5]), Value::I32(2));
}

#[test]
fn test_division_by_zero_reports_evaluation_error() {
    let mut session = session("int div(int a, int b) { return a / b; }");
    let err = session
        .invoke("div", &[HostArg::Int(1), HostArg::Int(0)])
        .unwrap_err();
    assert!(matches!(err, TranslateError::Evaluation { .. }), "{}", err);
}

#[test]
fn test_argument_coercion_error() {
    let mut session = session("int f(int x) { return x; }");
    let err = session
        .invoke("f", &[HostArg::Str("oops".into())])
        .unwrap_err();
    assert!(
        matches!(err, TranslateError::ArgumentCoercion { index: 0, .. }),
        "{}",
        err
    );
}

#[test]
fn test_param_rebinding_truncates_wide_argument() {
    let source = r#"
        int narrow(char c) {
            return c;
        }
    "#;
    let mut session = session(source);
    // 300 does not fit a signed byte; the parameter sees the truncation
    assert_eq!(invoke_ints(&mut session, "narrow", &[300]), Value::I32(44));
}

#[test]
fn test_unsigned_width_semantics() {
    let source = r#"
        uint8_t wrapdown(uint8_t x) {
            x = x - 1;
            return x;
        }
    "#;
    let mut session = session(source);
    assert_eq!(invoke_ints(&mut session, "wrapdown", &[0]), Value::U8(255));
}
