//! End-to-end closure tests: fixpoint termination, lifecycle states and
//! error propagation.

mod common;

use common::*;
use chirp_suite::{KlassState, SuiteKind};
use chirp_translator::{Properties, TranslateError};

#[test]
fn closure_terminates_on_mutually_recursive_classes() {
    let mut a = class("app/A");
    a.methods.push(method(
        "main",
        true,
        vec![invoke_static("app/B", "pong"), ret()],
    ));
    a.methods
        .push(method("ping", true, vec![invoke_static("app/B", "pong"), ret()]));
    let mut b = class("app/B");
    b.methods
        .push(method("pong", true, vec![invoke_static("app/A", "ping"), ret()]));

    let translator = open(vec![a, b], &["app/A"], &Properties::new()).unwrap();
    let suite = translator.close(SuiteKind::Application).unwrap();

    for klass in suite.classes() {
        assert_eq!(
            klass.state(),
            KlassState::Converted,
            "class {} did not finish",
            klass.name()
        );
    }
    assert!(suite.lookup("app/B").is_some());
}

#[test]
fn referenced_classes_are_pulled_into_the_suite() {
    // Only app/Main is registered up front; app/Helper and app/Data are
    // discovered while converting.
    let mut main = class("app/Main");
    main.methods.push(method(
        "main",
        true,
        vec![
            invoke_static("app/Helper", "make"),
            invoke_virtual("app/Data", "touch"),
            ret(),
        ],
    ));
    let mut helper = class("app/Helper");
    helper
        .methods
        .push(method("make", true, vec![new("app/Data"), ret()]));
    let mut data = class("app/Data");
    data.methods.push(method("touch", false, vec![ret()]));

    let translator = open(vec![main, helper, data], &["app/Main"], &Properties::new()).unwrap();
    let suite = translator.close(SuiteKind::Application).unwrap();

    for name in ["app/Main", "app/Helper", "app/Data"] {
        let id = suite.lookup(name).unwrap_or_else(|| panic!("{} missing", name));
        assert_eq!(suite.get(id).state(), KlassState::Converted);
    }
    // Virtual dispatch kept the callee's body.
    let data_id = suite.lookup("app/Data").unwrap();
    assert_eq!(suite.get(data_id).emitted_method_count(), 1);
}

#[test]
fn superclasses_convert_before_subclasses() {
    let mut base = class("app/Base");
    base.methods.push(method("frob", false, vec![ret()]));
    let mut sub = class("app/Sub");
    sub.superclass = Some("app/Base".to_string());
    sub.methods.push(method("main", true, vec![ret()]));

    let translator = open(vec![base, sub], &["app/Sub"], &Properties::new()).unwrap();
    let suite = translator.close(SuiteKind::Application).unwrap();

    let base_id = suite.lookup("app/Base").unwrap();
    let sub_id = suite.lookup("app/Sub").unwrap();
    assert_eq!(suite.get(base_id).state(), KlassState::Converted);
    assert_eq!(suite.get(sub_id).superclass(), Some(base_id));
}

#[test]
fn missing_class_is_fatal_and_marks_the_referrer() {
    let mut a = class("app/A");
    a.methods.push(method(
        "main",
        true,
        vec![invoke_static("app/Gone", "x"), ret()],
    ));

    let mut translator = open(vec![a], &["app/A"], &Properties::new()).unwrap();
    let id = translator.suite().lookup("app/A").unwrap();
    let err = translator.convert(id).unwrap_err();
    assert!(matches!(err, TranslateError::ClassNotFound { ref class, .. } if class == "app/Gone"));
    assert_eq!(translator.suite().get(id).state(), KlassState::Error);
}

#[test]
fn class_not_found_reports_the_conversion_path() {
    let mut a = class("app/A");
    a.methods.push(method(
        "main",
        true,
        vec![invoke_static("app/Gone", "x"), ret()],
    ));

    let mut translator = open(vec![a], &["app/A"], &Properties::new()).unwrap();
    let id = translator.suite().lookup("app/A").unwrap();
    let err = translator.convert(id).unwrap_err();
    let TranslateError::ClassNotFound { path, .. } = err else {
        panic!("wrong error: {err}");
    };
    assert!(path.contains(&"app/A".to_string()));
}

#[test]
fn inheritance_cycles_are_linkage_errors() {
    let mut a = class("app/A");
    a.superclass = Some("app/B".to_string());
    a.methods.push(method("main", true, vec![ret()]));
    let mut b = class("app/B");
    b.superclass = Some("app/A".to_string());

    let translator = open(vec![a, b], &["app/A"], &Properties::new()).unwrap();
    let err = translator.close(SuiteKind::Application).unwrap_err();
    assert!(matches!(err, TranslateError::Linkage(ref msg) if msg.contains("circularity")));
}

#[test]
fn arrays_convert_through_their_component_type() {
    let mut main = class("app/Main");
    main.methods.push(method(
        "main",
        true,
        vec![
            chirp_classfile::SourceInstruction::NewArray {
                class: "app/Elem".to_string(),
            },
            ret(),
        ],
    ));
    let mut elem = class("app/Elem");
    elem.methods.push(method("touch", false, vec![ret()]));

    let translator = open(vec![main, elem], &["app/Main"], &Properties::new()).unwrap();
    let suite = translator.close(SuiteKind::Application).unwrap();

    let arr = suite.lookup("[app/Elem").expect("array class registered");
    let elem_id = suite.lookup("app/Elem").unwrap();
    assert_eq!(suite.get(arr).state(), KlassState::Converted);
    assert_eq!(suite.get(arr).component_type(), Some(elem_id));
    assert_eq!(suite.get(elem_id).state(), KlassState::Converted);
}

#[test]
fn one_pass_strategies_also_close_completely() {
    for (dme, oco) in [("false", "true"), ("false", "false")] {
        let mut props = Properties::new();
        props.set("chirp.translator.deadMethodElimination", dme);
        props.set("chirp.translator.optimizeConstantObjects", oco);

        let mut a = class("app/A");
        a.methods.push(method(
            "main",
            true,
            vec![const_str("hello"), invoke_static("app/B", "pong"), ret()],
        ));
        let mut b = class("app/B");
        b.methods.push(method("pong", true, vec![const_int(7), ret()]));

        let translator = open(vec![a, b], &["app/A"], &props).unwrap();
        let suite = translator.close(SuiteKind::Application).unwrap();

        for name in ["app/A", "app/B"] {
            let id = suite.lookup(name).unwrap();
            assert_eq!(suite.get(id).state(), KlassState::Converted);
            assert!(suite.get(id).emitted_method_count() > 0, "{} emitted nothing", name);
        }
        // Without whole-suite analysis, nothing is ever reported unused.
        assert!(suite.unused_classes().is_empty());
    }
}

#[test]
fn close_is_a_noop_for_an_empty_root_set() {
    let translator = open(vec![], &[], &Properties::new()).unwrap();
    let suite = translator.close(SuiteKind::Application).unwrap();
    // Only bootstrap classes, all converted.
    for klass in suite.classes() {
        assert_eq!(klass.state(), KlassState::Converted);
    }
}
