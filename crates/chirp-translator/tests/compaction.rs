//! Object-table compaction: determinism, tie-breaks and the
//! conservative dead-constant policies.

mod common;

use common::*;
use chirp_suite::{SuiteKind, SuiteObject};
use chirp_translator::Properties;

#[test]
fn hot_constants_get_the_smallest_indices() {
    let mut a = class("app/A");
    a.methods.push(method(
        "main",
        true,
        vec![
            const_str("rare"),
            const_str("hot"),
            const_str("hot"),
            const_str("hot"),
            ret(),
        ],
    ));

    let translator = open(vec![a], &["app/A"], &Properties::new()).unwrap();
    let closed = translator.close(SuiteKind::Application).unwrap();
    let table = closed.get(closed.lookup("app/A").unwrap()).object_table();
    assert_eq!(table[0], SuiteObject::Str("hot".to_string()));
    assert_eq!(table[1], SuiteObject::Str("rare".to_string()));
}

#[test]
fn equal_counts_sort_lexically_regardless_of_insertion_order() {
    // "y" is seen first, but "x" must sort first.
    let mut a = class("app/A");
    a.methods.push(method(
        "main",
        true,
        vec![const_str("y"), const_str("x"), ret()],
    ));

    let translator = open(vec![a], &["app/A"], &Properties::new()).unwrap();
    let closed = translator.close(SuiteKind::Application).unwrap();
    let table = closed.get(closed.lookup("app/A").unwrap()).object_table();
    assert_eq!(
        table,
        &[
            SuiteObject::Str("x".to_string()),
            SuiteObject::Str("y".to_string()),
        ][..]
    );
}

#[test]
fn two_identical_runs_produce_identical_tables() {
    let build = || {
        let mut a = class("app/A");
        a.methods.push(method(
            "main",
            true,
            vec![
                const_str("alpha"),
                const_str("beta"),
                const_str("beta"),
                new("app/B"),
                invoke_static("app/B", "tick"),
                ret(),
            ],
        ));
        let mut b = class("app/B");
        b.methods.push(method("tick", true, vec![const_str("alpha"), ret()]));
        vec![a, b]
    };

    let run = || {
        let translator = open(build(), &["app/A"], &Properties::new()).unwrap();
        let closed = translator.close(SuiteKind::Application).unwrap();
        let a = closed.lookup("app/A").unwrap();
        let b = closed.lookup("app/B").unwrap();
        (
            closed.get(a).object_table().to_vec(),
            closed.get(b).object_table().to_vec(),
        )
    };

    assert_eq!(run(), run());
}

#[test]
fn unsorted_tables_keep_insertion_order() {
    let mut props = Properties::new();
    props.set("chirp.translator.optimizeConstantObjects", "false");
    // Dead-method elimination still forces whole-suite translation; only
    // the sort is disabled.
    let mut a = class("app/A");
    a.methods.push(method(
        "main",
        true,
        vec![const_str("b"), const_str("a"), const_str("a"), ret()],
    ));

    let translator = open(vec![a], &["app/A"], &props).unwrap();
    let closed = translator.close(SuiteKind::Application).unwrap();
    let table = closed.get(closed.lookup("app/A").unwrap()).object_table();
    assert_eq!(
        table,
        &[
            SuiteObject::Str("b".to_string()),
            SuiteObject::Str("a".to_string()),
        ][..]
    );
}

#[test]
fn glue_classes_keep_their_dead_strings() {
    // chirp/runtime/Vm is on the native-glue exclusion list: its string
    // constants must survive even when provably dead. A regular class
    // with the same shape loses the string to the dead marker.
    let make = |name: &str| {
        let mut c = class(name);
        c.methods.push(method("main", true, vec![ret()]));
        c.methods
            .push(private_method("helper", true, vec![const_str("gc-note"), ret()]));
        c
    };

    let translator = open(
        vec![make("chirp/runtime/Vm"), make("app/Other")],
        &["chirp/runtime/Vm", "app/Other"],
        &Properties::new(),
    )
    .unwrap();
    let closed = translator.close(SuiteKind::Application).unwrap();

    let vm = closed.lookup("chirp/runtime/Vm").unwrap();
    assert_eq!(
        closed.get(vm).object_table(),
        &[SuiteObject::Str("gc-note".to_string())][..]
    );
    let other = closed.lookup("app/Other").unwrap();
    assert_eq!(
        closed.get(other).object_table(),
        &[SuiteObject::DeadString][..]
    );
}

#[test]
fn dead_class_elision_requires_dead_string_elision() {
    // The joint policy: with string elision off, a dead class reference
    // must be kept even though class elision is on.
    let mut props = Properties::new();
    props.set("chirp.translator.deadStringElimination", "false");

    let mut a = class("app/A");
    a.methods.push(method("main", true, vec![ret()]));
    a.methods
        .push(private_method("helper", true, vec![new("app/B"), ret()]));
    let b = class("app/B");

    let translator = open(vec![a, b], &["app/A"], &props).unwrap();
    let closed = translator.close(SuiteKind::Application).unwrap();

    let a_id = closed.lookup("app/A").unwrap();
    let b_id = closed.lookup("app/B").unwrap();
    assert_eq!(
        closed.get(a_id).object_table(),
        &[SuiteObject::Class(b_id)][..]
    );

    // The stripped suite drops app/B; the kept reference degrades to the
    // dead-class marker rather than dangling.
    let stripped = closed.strip(SuiteKind::Application, "out");
    let a_id = stripped.lookup("app/A").unwrap();
    assert_eq!(
        stripped.get(a_id).object_table(),
        &[SuiteObject::DeadClass][..]
    );
}

#[test]
fn emitted_use_counts_gate_elision_not_static_counts() {
    // The same string appears in a live and a dead method: five static
    // references, but the surviving use keeps it.
    let mut a = class("app/A");
    a.methods.push(method(
        "main",
        true,
        vec![const_str("shared"), ret()],
    ));
    a.methods.push(private_method(
        "helper",
        true,
        vec![
            const_str("shared"),
            const_str("shared"),
            const_str("shared"),
            const_str("shared"),
            ret(),
        ],
    ));

    let translator = open(vec![a], &["app/A"], &Properties::new()).unwrap();
    let closed = translator.close(SuiteKind::Application).unwrap();
    let table = closed.get(closed.lookup("app/A").unwrap()).object_table();
    assert_eq!(table, &[SuiteObject::Str("shared".to_string())][..]);
}
