//! Per-class translation unit
//!
//! One `ClassUnit` exists per class under translation, cached by the
//! orchestrator from load time until phase 2 completes, at which point
//! it is discarded to free the method IR. It owns the method code
//! arrays (indexed identically to the class's method tables) and the
//! class's constant object table.
//!
//! Conversion is split in two so the same method-conversion code serves
//! both the low-memory one-pass strategy and the whole-program
//! build-IR-first strategies.

use crate::code::{Code, MethodSource};
use crate::error::{TranslateError, TranslateResult};
use crate::object_table::ObjectTable;
use crate::options::Options;
use crate::verifier;
use crate::Translator;
use chirp_suite::{KlassId, KlassState, MethodBody, MethodRef};
use once_cell::sync::Lazy;
use rustc_hash::FxHashSet;
use tracing::debug;

/// Classes whose generated native glue reads string constants out of the
/// object table at runtime; dead-string elision must leave them alone.
static GLUE_CLASSES: Lazy<FxHashSet<&'static str>> = Lazy::new(|| {
    [
        "chirp/runtime/Vm",
        "chirp/runtime/GarbageCollector",
        "chirp/runtime/MarkSweepCollector",
        "chirp/runtime/MarkSweepCollector$MarkStack",
    ]
    .into_iter()
    .collect()
});

/// Which half of the conversion to run over a method table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConvertPhase {
    /// Build IR only.
    BuildIr,
    /// Emit from previously built IR.
    Emit,
    /// Build and emit in one pass (no compaction possible).
    Both,
}

/// Translation state for one method.
#[derive(Debug, Default)]
struct MethodUnit {
    /// Unlinked body; `None` for abstract/native/hosted methods, taken
    /// when IR is built.
    source: Option<MethodSource>,
    /// Built IR; dropped once the method is emitted or found dead.
    code: Option<Code>,
}

/// Translation state for one class.
#[derive(Debug)]
pub struct ClassUnit {
    klass: KlassId,
    name: String,
    statics: Vec<MethodUnit>,
    virtuals: Vec<MethodUnit>,
    object_table: ObjectTable,
    safe_to_elide_strings: bool,
    safe_to_elide_classes: bool,
}

impl ClassUnit {
    pub(crate) fn new(
        klass: KlassId,
        name: &str,
        static_sources: Vec<Option<MethodSource>>,
        virtual_sources: Vec<Option<MethodSource>>,
        options: &Options,
    ) -> Self {
        let to_units = |sources: Vec<Option<MethodSource>>| {
            sources
                .into_iter()
                .map(|source| MethodUnit { source, code: None })
                .collect()
        };
        ClassUnit {
            klass,
            name: name.to_string(),
            statics: to_units(static_sources),
            virtuals: to_units(virtual_sources),
            object_table: ObjectTable::new(),
            safe_to_elide_strings: options.dead_string_elimination
                && !GLUE_CLASSES.contains(name),
            safe_to_elide_classes: options.dead_class_elimination,
        }
    }

    pub(crate) fn klass(&self) -> KlassId {
        self.klass
    }

    pub(crate) fn code(&self, is_static: bool, index: usize) -> Option<&Code> {
        let units = if is_static { &self.statics } else { &self.virtuals };
        units.get(index).and_then(|u| u.code.as_ref())
    }

    /// Phase 1: build IR for every translatable method, superclass
    /// first. Moves the class `Loaded -> Converting`.
    pub(crate) fn convert_phase1(
        &mut self,
        tr: &mut Translator,
        generate_ir: bool,
    ) -> TranslateResult<()> {
        let klass = tr.suite().get(self.klass);
        assert_eq!(
            klass.state(),
            KlassState::Loaded,
            "class must be loaded before conversion: {}",
            self.name
        );
        assert!(
            !klass.is_synthetic() && !klass.is_primitive() && !klass.is_array(),
            "fileless class has no translation unit: {}",
            self.name
        );

        let superclass = klass.superclass();
        if let Some(s) = superclass {
            tr.convert(s)?;
        }

        debug!(class = self.name.as_str(), "converting");

        if generate_ir {
            let mut bodies = Vec::new();
            self.convert_methods(tr, true, ConvertPhase::BuildIr, &mut bodies)?;
            self.convert_methods(tr, false, ConvertPhase::BuildIr, &mut bodies)?;
        }

        tr.suite_mut()
            .get_mut(self.klass)
            .advance(KlassState::Converting)?;
        Ok(())
    }

    /// Phase 2: emit Chirp bytecode for every live method from the IR
    /// (or build and emit in one pass), compact the object table, verify
    /// and install the results. Moves the class `Converting ->
    /// Converted`.
    pub(crate) fn convert_phase2(
        &mut self,
        tr: &mut Translator,
        one_pass: bool,
    ) -> TranslateResult<()> {
        let klass = tr.suite().get(self.klass);
        assert_eq!(
            klass.state(),
            KlassState::Converting,
            "phase 1 must complete before phase 2: {}",
            self.name
        );

        let superclass = klass.superclass();
        if let Some(s) = superclass {
            tr.convert_phase2_klass(s)?;
        }

        let mut bodies: Vec<(MethodRef, MethodBody)> = Vec::new();
        if one_pass {
            self.convert_methods(tr, true, ConvertPhase::Both, &mut bodies)?;
            self.convert_methods(tr, false, ConvertPhase::Both, &mut bodies)?;
        } else {
            if tr.options().optimize_constant_objects {
                self.object_table.sort(tr.suite());
            }
            self.convert_methods(tr, true, ConvertPhase::Emit, &mut bodies)?;
            self.convert_methods(tr, false, ConvertPhase::Emit, &mut bodies)?;
        }

        let table = self
            .object_table
            .finalize(self.safe_to_elide_strings, self.safe_to_elide_classes);

        if tr.options().verify_suite {
            for (mref, body) in &bodies {
                verifier::verify_body(body, table.len()).map_err(|source| {
                    TranslateError::Verify {
                        class: self.name.clone(),
                        method: tr
                            .suite()
                            .get(self.klass)
                            .method(mref.is_static, mref.index as usize)
                            .name
                            .clone(),
                        source,
                    }
                })?;
            }
        }

        let klass = tr.suite_mut().get_mut(self.klass);
        for (mref, body) in bodies {
            klass.set_method_body(mref, body);
        }
        klass.set_object_table(table);
        klass.advance(KlassState::Converted)?;

        debug!(class = self.name.as_str(), "converted");
        Ok(())
    }

    /// Converts one method table through the requested phase, in
    /// declaration order.
    fn convert_methods(
        &mut self,
        tr: &mut Translator,
        is_static: bool,
        phase: ConvertPhase,
        bodies: &mut Vec<(MethodRef, MethodBody)>,
    ) -> TranslateResult<()> {
        let count = if is_static {
            self.statics.len()
        } else {
            self.virtuals.len()
        };
        for index in 0..count {
            let mref = MethodRef {
                klass: self.klass,
                is_static,
                index: index as u16,
            };
            let method = tr.suite().get(self.klass).method(is_static, index).clone();

            if method.is_abstract() && phase != ConvertPhase::Emit {
                tr.method_db_mut().record_method(mref, 0);
            }
            if method.has_no_body() {
                continue;
            }

            if phase != ConvertPhase::Emit {
                let source = self
                    .unit_mut(is_static, index)
                    .source
                    .take()
                    .unwrap_or_else(|| {
                        panic!("method source missing: {}.{}", self.name, method.name)
                    });
                let code = Code::build(tr, &mut self.object_table, mref, &source)?;
                tr.method_db_mut().record_method(mref, code.size());
                self.unit_mut(is_static, index).code = Some(code);
            }

            if phase != ConvertPhase::BuildIr {
                // Take the IR either way so dead methods free their
                // memory too.
                let code = self.unit_mut(is_static, index).code.take();
                if !tr.is_method_live(mref) {
                    debug!(
                        class = self.name.as_str(),
                        method = method.name.as_str(),
                        "skipping dead method"
                    );
                    continue;
                }
                if let Some(code) = code {
                    let receiver = u16::from(!is_static);
                    let params = method.param_types.len() as u16 + receiver;
                    let body = code.emit(&mut self.object_table, params);
                    bodies.push((mref, body));
                }
            }
        }
        Ok(())
    }

    fn unit_mut(&mut self, is_static: bool, index: usize) -> &mut MethodUnit {
        if is_static {
            &mut self.statics[index]
        } else {
            &mut self.virtuals[index]
        }
    }
}
