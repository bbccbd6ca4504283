//! Post-compaction body verification
//!
//! Emitted method bodies are checked against the class's *final* object
//! table before being accepted into the suite: compaction reassigns
//! table indices, so an out-of-range operand here means the emitter and
//! the table disagree. Verification failures are fatal and surfaced
//! as-is.

use crate::emitter::{BytecodeReader, Opcode};
use chirp_suite::MethodBody;
use rustc_hash::FxHashSet;
use thiserror::Error;

/// Bytecode verification errors.
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("invalid opcode {opcode:#04x} at offset {offset}")]
    InvalidOpcode { opcode: u8, offset: usize },

    #[error("truncated instruction at offset {offset}")]
    TruncatedInstruction { offset: usize },

    #[error("object table index {index} out of range (table size {max}) at offset {offset}")]
    InvalidObjectIndex {
        index: u16,
        max: usize,
        offset: usize,
    },

    #[error("local slot {slot} out of range (locals {max}) at offset {offset}")]
    InvalidLocal { slot: u16, max: u16, offset: usize },

    #[error("branch target {target} is not an instruction boundary (offset {offset})")]
    InvalidBranchTarget { target: u16, offset: usize },

    #[error("execution falls off the end of the method at offset {0}")]
    FallOffEnd(usize),
}

struct Decoded {
    offset: usize,
    opcode: Opcode,
    first_operand: Option<u16>,
}

/// Verifies one emitted body against a table of `table_len` entries.
pub fn verify_body(body: &MethodBody, table_len: usize) -> Result<(), VerifyError> {
    let decoded = decode(&body.code)?;
    let boundaries: FxHashSet<usize> = decoded.iter().map(|d| d.offset).collect();

    for instr in &decoded {
        match instr.opcode {
            op if op.reads_object_table() => {
                let index = instr.first_operand.unwrap_or_default();
                if index as usize >= table_len {
                    return Err(VerifyError::InvalidObjectIndex {
                        index,
                        max: table_len,
                        offset: instr.offset,
                    });
                }
            }
            Opcode::Load | Opcode::Store => {
                let slot = instr.first_operand.unwrap_or_default();
                if slot >= body.locals {
                    return Err(VerifyError::InvalidLocal {
                        slot,
                        max: body.locals,
                        offset: instr.offset,
                    });
                }
            }
            Opcode::Branch => {
                let target = instr.first_operand.unwrap_or_default();
                if !boundaries.contains(&(target as usize)) {
                    return Err(VerifyError::InvalidBranchTarget {
                        target,
                        offset: instr.offset,
                    });
                }
            }
            _ => {}
        }
    }

    match decoded.last() {
        Some(last) if last.opcode.is_terminator() => Ok(()),
        Some(last) => Err(VerifyError::FallOffEnd(last.offset)),
        None => Err(VerifyError::FallOffEnd(0)),
    }
}

fn decode(code: &[u8]) -> Result<Vec<Decoded>, VerifyError> {
    let mut decoded = Vec::new();
    let mut reader = BytecodeReader::new(code);
    while reader.has_more() {
        let offset = reader.pos();
        let Some(byte) = reader.read_u8() else { break };
        let opcode = Opcode::from_u8(byte).ok_or(VerifyError::InvalidOpcode {
            opcode: byte,
            offset,
        })?;
        let operand_len = opcode.operand_len();
        let first_operand = if operand_len >= 2 {
            let value = reader
                .read_u16()
                .ok_or(VerifyError::TruncatedInstruction { offset })?;
            if !reader.skip(operand_len - 2) {
                return Err(VerifyError::TruncatedInstruction { offset });
            }
            Some(value)
        } else {
            None
        };
        decoded.push(Decoded {
            offset,
            opcode,
            first_operand,
        });
    }
    Ok(decoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emitter::BytecodeWriter;

    fn body(code: Vec<u8>, locals: u16) -> MethodBody {
        MethodBody { code, locals }
    }

    #[test]
    fn accepts_well_formed_body() {
        let mut w = BytecodeWriter::new();
        w.emit_op(Opcode::LoadObject);
        w.emit_u16(1);
        w.emit_op(Opcode::Store);
        w.emit_u16(0);
        w.emit_op(Opcode::Return);
        assert!(verify_body(&body(w.finish(), 1), 2).is_ok());
    }

    #[test]
    fn rejects_out_of_range_table_index() {
        let mut w = BytecodeWriter::new();
        w.emit_op(Opcode::LoadObject);
        w.emit_u16(5);
        w.emit_op(Opcode::Return);
        let err = verify_body(&body(w.finish(), 0), 2).unwrap_err();
        assert!(matches!(
            err,
            VerifyError::InvalidObjectIndex { index: 5, max: 2, .. }
        ));
    }

    #[test]
    fn rejects_unknown_opcode() {
        let err = verify_body(&body(vec![0xee], 0), 0).unwrap_err();
        assert!(matches!(err, VerifyError::InvalidOpcode { opcode: 0xee, .. }));
    }

    #[test]
    fn rejects_truncated_instruction() {
        let err = verify_body(&body(vec![Opcode::Load as u8, 0x00], 1), 0).unwrap_err();
        assert!(matches!(err, VerifyError::TruncatedInstruction { .. }));
    }

    #[test]
    fn rejects_local_out_of_range() {
        let mut w = BytecodeWriter::new();
        w.emit_op(Opcode::Load);
        w.emit_u16(3);
        w.emit_op(Opcode::Return);
        let err = verify_body(&body(w.finish(), 2), 0).unwrap_err();
        assert!(matches!(err, VerifyError::InvalidLocal { slot: 3, max: 2, .. }));
    }

    #[test]
    fn rejects_branch_into_operand_bytes() {
        let mut w = BytecodeWriter::new();
        w.emit_op(Opcode::Branch);
        w.emit_u16(1); // inside our own operand
        w.emit_op(Opcode::Return);
        let err = verify_body(&body(w.finish(), 0), 0).unwrap_err();
        assert!(matches!(err, VerifyError::InvalidBranchTarget { .. }));
    }

    #[test]
    fn rejects_fall_off_end() {
        let mut w = BytecodeWriter::new();
        w.emit_op(Opcode::Add);
        let err = verify_body(&body(w.finish(), 0), 0).unwrap_err();
        assert!(matches!(err, VerifyError::FallOffEnd(_)));
    }
}
