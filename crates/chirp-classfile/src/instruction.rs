//! Source instruction set
//!
//! The abstract, unlinked form a method body arrives in: every class,
//! method and field is still a symbolic name. The translator resolves
//! these to suite handles in phase 1 and emits Chirp bytecode in phase 2.
//! Only the symbol- and constant-bearing shapes matter to the linker;
//! the computational instructions are deliberately minimal.

use serde::{Deserialize, Serialize};

/// A literal constant in a method body. `Int` loads as an immediate;
/// the other variants are allocated in the owning class's object table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ConstValue {
    Int(i64),
    Str(String),
    /// Reference to a class object, by internal name.
    Class(String),
    IntArray(Vec<i32>),
}

/// One unlinked instruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum SourceInstruction {
    Const { value: ConstValue },
    GetStatic { class: String, field: String },
    PutStatic { class: String, field: String },
    GetField { class: String, field: String },
    PutField { class: String, field: String },
    InvokeStatic { class: String, method: String },
    InvokeVirtual { class: String, method: String },
    InvokeInterface { class: String, method: String },
    New { class: String },
    /// Allocates an array of the named component class.
    NewArray { class: String },
    Checkcast { class: String },
    InstanceOf { class: String },
    Load { slot: u16 },
    Store { slot: u16 },
    /// Relative branch, in instructions, from the current instruction.
    Branch { offset: i16 },
    Add,
    Return,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instructions_round_trip_through_json() {
        let instrs = vec![
            SourceInstruction::Const {
                value: ConstValue::Str("hello".to_string()),
            },
            SourceInstruction::InvokeStatic {
                class: "app/Util".to_string(),
                method: "log".to_string(),
            },
            SourceInstruction::Branch { offset: -2 },
            SourceInstruction::Return,
        ];
        let json = serde_json::to_string(&instrs).unwrap();
        let back: Vec<SourceInstruction> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, instrs);
    }

    #[test]
    fn const_values_are_tagged() {
        let json = r#"{"op":"const","value":{"kind":"int_array","value":[3,1,2]}}"#;
        let instr: SourceInstruction = serde_json::from_str(json).unwrap();
        assert_eq!(
            instr,
            SourceInstruction::Const {
                value: ConstValue::IntArray(vec![3, 1, 2])
            }
        );
    }
}
