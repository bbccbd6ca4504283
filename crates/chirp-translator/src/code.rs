//! Per-method intermediate representation
//!
//! Phase 1 turns a method's source instructions into [`Ir`]: every
//! symbolic class/method/field name resolved to a suite handle, every
//! table-eligible constant registered in the owning class's object
//! table. Phase 2 walks the IR once to emit Chirp bytecode, recording
//! which table entries actually survive into generated code. The IR is
//! discarded as soon as the method is emitted.

use crate::emitter::{BytecodeWriter, Opcode};
use crate::error::{TranslateError, TranslateResult};
use crate::object_table::{ConstObject, ObjectTable};
use crate::Translator;
use chirp_classfile::{ConstValue, SourceInstruction};
use chirp_suite::{FieldRef, KlassId, MethodBody, MethodRef};

/// Unlinked body of one method, as installed from its class definition.
#[derive(Debug)]
pub struct MethodSource {
    pub instructions: Vec<SourceInstruction>,
    /// Resolved exception-handler catch types.
    pub handlers: Vec<KlassId>,
}

/// One resolved IR instruction.
#[derive(Debug, Clone, PartialEq)]
pub enum Ir {
    ConstInt(i64),
    LoadObject(ConstObject),
    GetStatic(FieldRef),
    PutStatic(FieldRef),
    GetField(FieldRef),
    PutField(FieldRef),
    InvokeStatic(MethodRef),
    InvokeVirtual(MethodRef),
    InvokeInterface(MethodRef),
    New(KlassId),
    NewArray(KlassId),
    Checkcast(KlassId),
    InstanceOf(KlassId),
    Load(u16),
    Store(u16),
    /// Absolute IR index of the branch target.
    Branch { target: usize },
    Add,
    Return,
}

/// A symbol referenced from a method body, as seen by the reachability
/// scan.
#[derive(Debug, Clone, Copy)]
pub enum CodeRef {
    Klass(KlassId),
    Method(MethodRef),
    Field(FieldRef),
}

/// Resolved IR for one method body.
#[derive(Debug)]
pub struct Code {
    ir: Vec<Ir>,
    handlers: Vec<KlassId>,
}

impl Code {
    /// Builds IR from source instructions, resolving symbols against the
    /// suite (registering referenced classes as needed) and counting
    /// every table-eligible constant.
    pub fn build(
        tr: &mut Translator,
        table: &mut ObjectTable,
        caller: MethodRef,
        source: &MethodSource,
    ) -> TranslateResult<Code> {
        let len = source.instructions.len();
        let mut ir = Vec::with_capacity(len);
        for (idx, instr) in source.instructions.iter().enumerate() {
            let resolved = match instr {
                SourceInstruction::Const { value } => match value {
                    ConstValue::Int(v) => Ir::ConstInt(*v),
                    ConstValue::Str(s) => {
                        let object = ConstObject::Str(s.clone());
                        table.add(object.clone());
                        Ir::LoadObject(object)
                    }
                    ConstValue::Class(name) => {
                        let id = tr.ensure_registered(name)?;
                        let object = ConstObject::Class(id);
                        table.add(object.clone());
                        Ir::LoadObject(object)
                    }
                    ConstValue::IntArray(values) => {
                        let object = ConstObject::IntArray(values.clone());
                        table.add(object.clone());
                        Ir::LoadObject(object)
                    }
                },
                SourceInstruction::GetStatic { class, field } => {
                    let fref = resolve_field(tr, class, field, true)?;
                    table.add(ConstObject::Class(fref.klass));
                    Ir::GetStatic(fref)
                }
                SourceInstruction::PutStatic { class, field } => {
                    let fref = resolve_field(tr, class, field, true)?;
                    table.add(ConstObject::Class(fref.klass));
                    Ir::PutStatic(fref)
                }
                SourceInstruction::GetField { class, field } => {
                    Ir::GetField(resolve_field(tr, class, field, false)?)
                }
                SourceInstruction::PutField { class, field } => {
                    Ir::PutField(resolve_field(tr, class, field, false)?)
                }
                SourceInstruction::InvokeStatic { class, method } => {
                    let mref = resolve_method(tr, class, method, true)?;
                    table.add(ConstObject::Class(mref.klass));
                    tr.method_db_mut().record_call(caller, mref);
                    Ir::InvokeStatic(mref)
                }
                SourceInstruction::InvokeVirtual { class, method } => {
                    let mref = resolve_method(tr, class, method, false)?;
                    tr.method_db_mut().record_call(caller, mref);
                    Ir::InvokeVirtual(mref)
                }
                SourceInstruction::InvokeInterface { class, method } => {
                    let mref = resolve_method(tr, class, method, false)?;
                    table.add(ConstObject::Class(mref.klass));
                    tr.method_db_mut().record_call(caller, mref);
                    Ir::InvokeInterface(mref)
                }
                SourceInstruction::New { class } => {
                    let id = tr.ensure_registered(class)?;
                    table.add(ConstObject::Class(id));
                    Ir::New(id)
                }
                SourceInstruction::NewArray { class } => {
                    let id = tr.ensure_registered(&format!("[{}", class))?;
                    table.add(ConstObject::Class(id));
                    Ir::NewArray(id)
                }
                SourceInstruction::Checkcast { class } => {
                    let id = tr.ensure_registered(class)?;
                    table.add(ConstObject::Class(id));
                    Ir::Checkcast(id)
                }
                SourceInstruction::InstanceOf { class } => {
                    let id = tr.ensure_registered(class)?;
                    table.add(ConstObject::Class(id));
                    Ir::InstanceOf(id)
                }
                SourceInstruction::Load { slot } => Ir::Load(*slot),
                SourceInstruction::Store { slot } => Ir::Store(*slot),
                SourceInstruction::Branch { offset } => {
                    let target = idx as i64 + *offset as i64;
                    if target < 0 || target as usize >= len {
                        return Err(TranslateError::Linkage(format!(
                            "branch target {} out of range at instruction {}",
                            target, idx
                        )));
                    }
                    Ir::Branch {
                        target: target as usize,
                    }
                }
                SourceInstruction::Add => Ir::Add,
                SourceInstruction::Return => Ir::Return,
            };
            ir.push(resolved);
        }
        Ok(Code {
            ir,
            handlers: source.handlers.clone(),
        })
    }

    /// IR size, the method-size metric recorded with the usage index.
    pub fn size(&self) -> usize {
        self.ir.len()
    }

    pub fn handlers(&self) -> &[KlassId] {
        &self.handlers
    }

    /// Every class/method/field symbol this body touches, for the
    /// reachability scan.
    pub fn refs(&self) -> Vec<CodeRef> {
        let mut refs = Vec::new();
        for instr in &self.ir {
            match instr {
                Ir::LoadObject(ConstObject::Class(id)) => refs.push(CodeRef::Klass(*id)),
                Ir::LoadObject(_) | Ir::ConstInt(_) => {}
                Ir::GetStatic(f) | Ir::PutStatic(f) | Ir::GetField(f) | Ir::PutField(f) => {
                    refs.push(CodeRef::Field(*f))
                }
                Ir::InvokeStatic(m) | Ir::InvokeVirtual(m) | Ir::InvokeInterface(m) => {
                    refs.push(CodeRef::Method(*m))
                }
                Ir::New(id) | Ir::NewArray(id) | Ir::Checkcast(id) | Ir::InstanceOf(id) => {
                    refs.push(CodeRef::Klass(*id))
                }
                Ir::Load(_) | Ir::Store(_) | Ir::Branch { .. } | Ir::Add | Ir::Return => {}
            }
        }
        refs
    }

    /// Emits the Chirp bytecode form, recording an emitted use for every
    /// object-table operand. `params` is the number of parameter slots,
    /// receiver included.
    pub fn emit(&self, table: &mut ObjectTable, params: u16) -> MethodBody {
        let mut offsets = Vec::with_capacity(self.ir.len());
        let mut pc = 0usize;
        for instr in &self.ir {
            offsets.push(pc);
            pc += 1 + opcode_of(instr).operand_len();
        }

        let mut w = BytecodeWriter::new();
        let mut max_slot: i64 = params as i64 - 1;
        for instr in &self.ir {
            let op = opcode_of(instr);
            w.emit_op(op);
            match instr {
                Ir::ConstInt(v) => w.emit_i64(*v),
                Ir::LoadObject(object) => w.emit_u16(table.index_of(object, true)),
                Ir::GetStatic(f) | Ir::PutStatic(f) => {
                    w.emit_u16(table.index_of(&ConstObject::Class(f.klass), true));
                    w.emit_u16(f.index);
                }
                Ir::GetField(f) | Ir::PutField(f) => w.emit_u16(f.index),
                Ir::InvokeStatic(m) | Ir::InvokeInterface(m) => {
                    w.emit_u16(table.index_of(&ConstObject::Class(m.klass), true));
                    w.emit_u16(m.index);
                }
                Ir::InvokeVirtual(m) => w.emit_u16(m.index),
                Ir::New(id) | Ir::NewArray(id) | Ir::Checkcast(id) | Ir::InstanceOf(id) => {
                    w.emit_u16(table.index_of(&ConstObject::Class(*id), true))
                }
                Ir::Load(slot) | Ir::Store(slot) => {
                    max_slot = max_slot.max(*slot as i64);
                    w.emit_u16(*slot);
                }
                Ir::Branch { target } => w.emit_u16(offsets[*target] as u16),
                Ir::Add | Ir::Return => {}
            }
        }
        MethodBody {
            code: w.finish(),
            locals: (max_slot + 1) as u16,
        }
    }
}

fn opcode_of(instr: &Ir) -> Opcode {
    match instr {
        Ir::ConstInt(_) => Opcode::ConstInt,
        Ir::LoadObject(_) => Opcode::LoadObject,
        Ir::GetStatic(_) => Opcode::GetStatic,
        Ir::PutStatic(_) => Opcode::PutStatic,
        Ir::GetField(_) => Opcode::GetField,
        Ir::PutField(_) => Opcode::PutField,
        Ir::InvokeStatic(_) => Opcode::InvokeStatic,
        Ir::InvokeVirtual(_) => Opcode::InvokeVirtual,
        Ir::InvokeInterface(_) => Opcode::InvokeInterface,
        Ir::New(_) => Opcode::New,
        Ir::NewArray(_) => Opcode::NewArray,
        Ir::Checkcast(_) => Opcode::Checkcast,
        Ir::InstanceOf(_) => Opcode::InstanceOf,
        Ir::Load(_) => Opcode::Load,
        Ir::Store(_) => Opcode::Store,
        Ir::Branch { .. } => Opcode::Branch,
        Ir::Add => Opcode::Add,
        Ir::Return => Opcode::Return,
    }
}

fn resolve_field(
    tr: &mut Translator,
    class: &str,
    field: &str,
    is_static: bool,
) -> TranslateResult<FieldRef> {
    let id = tr.ensure_registered(class)?;
    tr.load(id)?;
    tr.suite()
        .resolve_field(id, field, is_static)
        .ok_or_else(|| TranslateError::NoSuchField {
            class: class.to_string(),
            field: field.to_string(),
        })
}

fn resolve_method(
    tr: &mut Translator,
    class: &str,
    method: &str,
    is_static: bool,
) -> TranslateResult<MethodRef> {
    let id = tr.ensure_registered(class)?;
    tr.load(id)?;
    tr.suite()
        .resolve_method(id, method, is_static)
        .ok_or_else(|| TranslateError::NoSuchMethod {
            class: class.to_string(),
            method: method.to_string(),
        })
}
