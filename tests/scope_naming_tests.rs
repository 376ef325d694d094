// Tests for global scope name generation and host object registration

use std::cell::RefCell;
use std::rc::Rc;

use ccall::translator::{HostArg, Translator};
use ccall::Value;

#[test]
fn test_bare_name_used_when_free() {
    let mut session = Translator::new();
    let name = session.register_host_value(Some("speed"), Value::I32(88));
    assert_eq!(name, "speed");
}

#[test]
fn test_collision_suffixes_walk_the_alphabet() {
    let mut session = Translator::new();
    let mut names = Vec::new();
    for _ in 0..38 {
        names.push(session.register_host_value(Some("v"), Value::I32(0)));
    }
    assert_eq!(names[0], "v");
    assert_eq!(names[1], "v_a");
    assert_eq!(names[26], "v_z");
    assert_eq!(names[27], "v_0");
    assert_eq!(names[36], "v_9");
    // after the single-character suffixes run out, two characters
    assert_eq!(names[37], "v_aa");
}

#[test]
fn test_preferred_name_avoids_declared_globals() {
    let mut session =
        Translator::from_source("int counter; int f() { return counter; }").expect("parse failed");
    let name = session.register_host_value(Some("counter"), Value::I32(5));
    assert_eq!(name, "counter_a");
}

#[test]
fn test_preferred_name_avoids_typedefs_and_functions() {
    let mut session =
        Translator::from_source("typedef int myint; int f() { return 0; }").expect("parse failed");
    assert_eq!(
        session.register_host_value(Some("myint"), Value::I32(1)),
        "myint_a"
    );
    assert_eq!(
        session.register_host_value(Some("f"), Value::I32(2)),
        "f_a"
    );
}

#[test]
fn test_reserved_listing_names_are_never_issued() {
    let mut session = Translator::new();
    assert_eq!(
        session.register_host_value(Some("helpers"), Value::I32(1)),
        "helpers_a"
    );
    assert_eq!(
        session.register_host_value(Some("values"), Value::I32(2)),
        "values_a"
    );
    assert_eq!(session.register_host_value(Some("g"), Value::I32(3)), "g_a");
}

#[test]
fn test_unnamed_registration_uses_dummy_prefix() {
    let mut session = Translator::new();
    assert_eq!(session.register_host_value(None, Value::I32(1)), "__dummy");
    assert_eq!(
        session.register_host_value(None, Value::I32(2)),
        "__dummy_a"
    );
}

#[test]
fn test_same_cell_keeps_its_name() {
    let mut session = Translator::new();
    let shared: Rc<RefCell<Value>> = Rc::new(RefCell::new(Value::I64(7)));
    let first = session.register_host_cell(Some("shared"), shared.clone());
    let second = session.register_host_cell(Some("other"), shared.clone());
    assert_eq!(first, "shared");
    // re-registering the same storage hands back the existing name
    assert_eq!(second, "shared");
}

#[test]
fn test_same_callable_keeps_its_name() {
    let mut session = Translator::new();
    let f: ccall::translator::HostFn =
        Rc::new(|_args| Ok(Rc::new(RefCell::new(Value::I32(0)))));
    let first = session.register_host_callable(Some("cb"), f.clone());
    let second = session.register_host_callable(None, f.clone());
    assert_eq!(first, "cb");
    assert_eq!(second, "cb");
}

#[test]
fn test_distinct_cells_with_equal_values_get_distinct_names() {
    let mut session = Translator::new();
    let first = session.register_host_value(Some("x"), Value::I32(1));
    let second = session.register_host_value(Some("x"), Value::I32(1));
    assert_eq!(first, "x");
    assert_eq!(second, "x_a");
}

#[test]
fn test_host_cell_mutation_is_visible_to_translated_code() {
    let mut session =
        Translator::from_source("int probe() { return knob; }").expect("parse failed");
    let knob: Rc<RefCell<Value>> = Rc::new(RefCell::new(Value::I32(1)));
    session.register_host_cell(Some("knob"), knob.clone());

    let first = session.invoke("probe", &[]).expect("invoke failed");
    assert_eq!(first, Value::I32(1));

    *knob.borrow_mut() = Value::I32(99);
    let second = session.invoke("probe", &[]).expect("invoke failed");
    assert_eq!(second, Value::I32(99));
}

#[test]
fn test_translated_code_can_write_host_cell() {
    let mut session =
        Translator::from_source("int set(int v) { knob = v; return 0; }").expect("parse failed");
    let knob: Rc<RefCell<Value>> = Rc::new(RefCell::new(Value::I32(0)));
    session.register_host_cell(Some("knob"), knob.clone());

    session
        .invoke("set", &[HostArg::Int(41)])
        .expect("invoke failed");
    assert_eq!(*knob.borrow(), Value::I32(41));
}
