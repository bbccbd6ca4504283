//! Builders for in-memory class graphs.
#![allow(dead_code)]

use chirp_classfile::{
    ClassDefinition, ConstValue, FieldDefinition, MemoryClasspath, MethodDefinition,
    SourceInstruction,
};
use chirp_suite::Suite;
use chirp_translator::{Properties, TranslateResult, Translator};

pub fn class(name: &str) -> ClassDefinition {
    ClassDefinition {
        name: name.to_string(),
        modifiers: vec!["public".to_string()],
        ..Default::default()
    }
}

pub fn method(name: &str, is_static: bool, body: Vec<SourceInstruction>) -> MethodDefinition {
    MethodDefinition {
        name: name.to_string(),
        is_static,
        modifiers: vec!["public".to_string()],
        return_type: "void".to_string(),
        params: vec![],
        body,
        handlers: vec![],
    }
}

pub fn private_method(
    name: &str,
    is_static: bool,
    body: Vec<SourceInstruction>,
) -> MethodDefinition {
    MethodDefinition {
        modifiers: vec!["private".to_string()],
        ..method(name, is_static, body)
    }
}

pub fn field(name: &str, ty: &str) -> FieldDefinition {
    FieldDefinition {
        name: name.to_string(),
        ty: ty.to_string(),
        is_static: false,
        modifiers: vec!["private".to_string()],
    }
}

pub fn ret() -> SourceInstruction {
    SourceInstruction::Return
}

pub fn const_str(s: &str) -> SourceInstruction {
    SourceInstruction::Const {
        value: ConstValue::Str(s.to_string()),
    }
}

pub fn const_int(v: i64) -> SourceInstruction {
    SourceInstruction::Const {
        value: ConstValue::Int(v),
    }
}

pub fn invoke_static(class: &str, method: &str) -> SourceInstruction {
    SourceInstruction::InvokeStatic {
        class: class.to_string(),
        method: method.to_string(),
    }
}

pub fn invoke_virtual(class: &str, method: &str) -> SourceInstruction {
    SourceInstruction::InvokeVirtual {
        class: class.to_string(),
        method: method.to_string(),
    }
}

pub fn invoke_interface(class: &str, method: &str) -> SourceInstruction {
    SourceInstruction::InvokeInterface {
        class: class.to_string(),
        method: method.to_string(),
    }
}

pub fn new(class: &str) -> SourceInstruction {
    SourceInstruction::New {
        class: class.to_string(),
    }
}

pub fn classpath(defs: Vec<ClassDefinition>) -> MemoryClasspath {
    let mut cp = MemoryClasspath::new();
    for def in defs {
        cp.add(def);
    }
    cp
}

/// Opens a translator over `defs` with the given roots pre-registered.
pub fn open(
    defs: Vec<ClassDefinition>,
    roots: &[&str],
    props: &Properties,
) -> TranslateResult<Translator> {
    let mut suite = Suite::bootstrap("test");
    for root in roots {
        suite.register_stub(root).expect("bad root name");
    }
    Translator::open_with_loader(suite, Box::new(classpath(defs)), props)
}
