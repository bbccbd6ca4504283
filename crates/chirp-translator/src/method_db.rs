//! Method usage index
//!
//! Phase 1 records every method (abstract methods at size 0) together
//! with the call edges discovered while building IR. When whole-suite
//! translation is active, [`DeadMethodEliminator`] closes over the
//! recorded edges from a root set and its verdict gates phase-2
//! emission and the reachability analyzer's method scans.

use crate::dce::is_externally_visible;
use crate::options::Options;
use chirp_suite::member::{modifiers, MAIN_NAME};
use chirp_suite::{MethodRef, Suite, SuiteKind};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

/// Records methods, their IR sizes and their call edges.
#[derive(Debug, Default)]
pub struct MethodDb {
    sizes: FxHashMap<MethodRef, usize>,
    calls: FxHashMap<MethodRef, Vec<MethodRef>>,
}

impl MethodDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a method and its IR size. Abstract methods register at
    /// size 0.
    pub fn record_method(&mut self, method: MethodRef, size: usize) {
        self.sizes.insert(method, size);
    }

    /// Records a call edge discovered while building IR.
    pub fn record_call(&mut self, caller: MethodRef, callee: MethodRef) {
        self.calls.entry(caller).or_default().push(callee);
    }

    pub fn size_of(&self, method: &MethodRef) -> Option<usize> {
        self.sizes.get(method).copied()
    }

    pub fn callees(&self, method: &MethodRef) -> &[MethodRef] {
        self.calls.get(method).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn method_count(&self) -> usize {
        self.sizes.len()
    }
}

/// Computes the used-method set for one suite closure.
#[derive(Debug, Default)]
pub struct DeadMethodEliminator {
    used: FxHashSet<MethodRef>,
}

impl DeadMethodEliminator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_marked_used(&self, method: &MethodRef) -> bool {
        self.used.contains(method)
    }

    pub fn used_count(&self) -> usize {
        self.used.len()
    }

    /// Seeds the root methods and closes over recorded call edges plus
    /// override edges (an override of a used virtual method is used).
    pub fn compute_methods_used(
        &mut self,
        suite: &Suite,
        db: &MethodDb,
        kind: SuiteKind,
        options: &Options,
    ) {
        let mut worklist: Vec<MethodRef> = Vec::new();

        for klass in suite.classes() {
            let class_is_system = klass.system_id().is_some() || klass.is_synthetic();
            let class_is_visible = is_externally_visible(klass, kind);
            for is_static in [true, false] {
                for (index, method) in klass.methods(is_static).iter().enumerate() {
                    let mref = MethodRef {
                        klass: klass.id(),
                        is_static,
                        index: index as u16,
                    };
                    let root = class_is_system
                        || (is_static
                            && method.name == MAIN_NAME
                            && method.modifiers & modifiers::PUBLIC != 0)
                        || method.is_class_initializer()
                        || (class_is_visible && !method.is_private())
                        || (method.is_constructor()
                            && method.is_private()
                            && !options.delete_unused_private_constructors);
                    if root {
                        self.mark(mref, &mut worklist);
                    }
                }
            }
        }

        loop {
            while let Some(method) = worklist.pop() {
                for &callee in db.callees(&method) {
                    self.mark(callee, &mut worklist);
                }
            }
            if !self.propagate_overrides(suite, &mut worklist) {
                break;
            }
        }

        debug!(
            used = self.used.len(),
            recorded = db.method_count(),
            "dead method elimination computed used set"
        );
    }

    fn mark(&mut self, method: MethodRef, worklist: &mut Vec<MethodRef>) {
        if self.used.insert(method) {
            worklist.push(method);
        }
    }

    /// Marks overrides of used virtual methods in derived classes.
    /// Returns true if anything new was marked.
    fn propagate_overrides(&mut self, suite: &Suite, worklist: &mut Vec<MethodRef>) -> bool {
        let used_virtuals: Vec<MethodRef> = self
            .used
            .iter()
            .filter(|m| !m.is_static)
            .copied()
            .collect();
        let mut changed = false;
        for base in used_virtuals {
            let name = &suite.get(base.klass).method(false, base.index as usize).name;
            for sub in suite.classes() {
                if sub.id() == base.klass
                    || !(suite.derives_from(sub.id(), base.klass)
                        || suite.implements(sub.id(), base.klass))
                {
                    continue;
                }
                if let Some(index) = sub.find_declared_method(name, false) {
                    let override_ref = MethodRef {
                        klass: sub.id(),
                        is_static: false,
                        index,
                    };
                    if !self.used.contains(&override_ref) {
                        self.mark(override_ref, worklist);
                        changed = true;
                    }
                }
            }
        }
        changed
    }
}
