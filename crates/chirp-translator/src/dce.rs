//! Dead class elimination
//!
//! Class-level mark and sweep over the suite. Two root passes seed an
//! explicit mark stack: system roots (VM-intrinsic and entry-point
//! classes reachable through mechanisms invisible to static analysis)
//! and externally visible roots (symbols the suite kind exports). A
//! work-list fixpoint then expands each marked class's outgoing
//! references.
//! Discovery is a cheap shallow mark; expansion is a queued deep scan,
//! so stack depth stays constant no matter how deep the class graph is.
//!
//! The analyzer never mutates the registry: unreachable classes are
//! collected and handed to the suite, which drops them when stripped.

use crate::code::CodeRef;
use crate::Translator;
use chirp_suite::member::modifiers;
use chirp_suite::{Klass, KlassId, MethodRef, SuiteKind};
use once_cell::sync::Lazy;
use rustc_hash::FxHashSet;
use tracing::debug;

/// Classes reachable only through interpreter dispatch or reflection;
/// marked live unconditionally.
static SYSTEM_ROOTS: Lazy<FxHashSet<&'static str>> = Lazy::new(|| {
    [
        "chirp/runtime/Vm",
        "chirp/ResourceFile",
        "chirp/ManifestProperty",
        "chirp/Suite",
        "chirp/KlassMetadata",
        "chirp/MethodMetadata",
        "chirp/Klass",
        "chirp/StringOfBytes",
        "chirp/vm/FieldOffsets",
        "chirp/vm/MethodOffsets",
    ]
    .into_iter()
    .collect()
});

/// Could a class be called by the system through some basic mechanism,
/// such as interpreter dispatch, an entry point, or reflection support?
fn is_basic_root(klass: &Klass) -> bool {
    klass.system_id().is_some()
        || klass.is_synthetic()
        || klass.has_main()
        || SYSTEM_ROOTS.contains(klass.name())
}

/// Given a class's declared access and the suite kind, decides whether
/// code outside this suite could possibly reference it. Internal-flagged
/// symbols are never visible; an application exports only symbols
/// explicitly flagged dynamic; every other suite kind exports all
/// non-internal symbols.
pub fn is_externally_visible(klass: &Klass, kind: SuiteKind) -> bool {
    if klass.is_internal_symbol() {
        return false;
    }
    let m = klass.modifiers();
    debug_assert!(
        modifiers::is_package_private(m)
            || m & modifiers::PROTECTED != 0
            || m & modifiers::PUBLIC != 0
    );
    match kind {
        SuiteKind::Application => klass.is_dynamic_symbol(),
        // Library, extendable and debuggable suites leave every
        // non-internal symbol visible.
        _ => true,
    }
}

/// Detects unused classes. After [`compute_classes_used`] the translator
/// can use [`is_marked`] to query liveness.
///
/// [`compute_classes_used`]: DeadClassEliminator::compute_classes_used
/// [`is_marked`]: DeadClassEliminator::is_marked
#[derive(Debug, Default)]
pub struct DeadClassEliminator {
    marked: FxHashSet<KlassId>,
    mark_stack: Vec<KlassId>,
}

impl DeadClassEliminator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_marked(&self, id: KlassId) -> bool {
        self.marked.contains(&id)
    }

    pub fn marked_count(&self) -> usize {
        self.marked.len()
    }

    /// Marks `id` directly. Returns true if it was unmarked.
    fn mark_class(&mut self, id: KlassId) -> bool {
        self.marked.insert(id)
    }

    /// Queues `id` for a deep scan without recursing.
    fn shallow_mark(&mut self, id: Option<KlassId>) {
        if let Some(id) = id {
            if !self.marked.contains(&id) {
                self.mark_stack.push(id);
            }
        }
    }

    /// Marks the class and queues everything it structurally references:
    /// superclass, component type, interfaces, field types, and (for
    /// non-synthetic classes) every symbol its scanned methods touch.
    fn scan_class_deep(&mut self, tr: &Translator, id: KlassId) {
        if !self.mark_class(id) {
            return;
        }
        let klass = tr.suite().get(id);
        self.shallow_mark(klass.superclass());
        self.shallow_mark(klass.component_type());
        for &iface in klass.interfaces() {
            self.shallow_mark(Some(iface));
        }
        if !klass.is_synthetic() {
            self.scan_class_methods(tr, id);
        }
        self.scan_class_fields(tr, id);
    }

    /// Scans method bodies for references to other classes. A method is
    /// scanned only if the usage index reports it used, or always when
    /// dead-method elimination is off.
    fn scan_class_methods(&mut self, tr: &Translator, id: KlassId) {
        let Some(unit) = tr.class_unit_for(id) else {
            return;
        };
        let klass = tr.suite().get(id);
        for is_static in [true, false] {
            for index in 0..klass.methods(is_static).len() {
                let Some(code) = unit.code(is_static, index) else {
                    continue;
                };
                let mref = MethodRef {
                    klass: id,
                    is_static,
                    index: index as u16,
                };
                if tr.options().dead_method_elimination && !tr.is_method_live(mref) {
                    continue;
                }
                let method = klass.method(is_static, index);
                self.shallow_mark(Some(method.return_type));
                for &param in &method.param_types {
                    self.shallow_mark(Some(param));
                }
                for code_ref in code.refs() {
                    match code_ref {
                        CodeRef::Klass(k) => self.shallow_mark(Some(k)),
                        CodeRef::Method(m) => self.shallow_mark(Some(m.klass)),
                        CodeRef::Field(f) => {
                            self.shallow_mark(Some(f.klass));
                            let ty = tr
                                .suite()
                                .get(f.klass)
                                .field(f.is_static, f.index as usize)
                                .ty;
                            self.shallow_mark(Some(ty));
                        }
                    }
                }
                for &handler in code.handlers() {
                    self.shallow_mark(Some(handler));
                }
            }
        }
    }

    fn scan_class_fields(&mut self, tr: &Translator, id: KlassId) {
        let klass = tr.suite().get(id);
        for is_static in [true, false] {
            for field in klass.fields(is_static) {
                self.shallow_mark(Some(field.ty));
            }
        }
    }

    /// Runs the two root passes and the fixpoint, returning the classes
    /// that were never marked, in registration order.
    pub fn compute_classes_used(&mut self, tr: &Translator, kind: SuiteKind) -> Vec<KlassId> {
        let verbose = tr.options().verbose;
        let suite = tr.suite();

        // Preserve classes the system might call beyond the powers of
        // analysis.
        let mut found: Vec<String> = Vec::new();
        for id in suite.ids() {
            if is_basic_root(suite.get(id)) {
                if verbose {
                    found.push(suite.get(id).name().to_string());
                }
                self.scan_class_deep(tr, id);
            }
        }
        trace_sorted(verbose, "system root", &mut found);

        // Preserve all externally visible classes.
        for id in suite.ids() {
            if is_externally_visible(suite.get(id), kind) && !self.is_marked(id) {
                if verbose {
                    found.push(suite.get(id).name().to_string());
                }
                self.scan_class_deep(tr, id);
            }
        }
        trace_sorted(verbose, "visible root", &mut found);

        while let Some(id) = self.mark_stack.pop() {
            self.scan_class_deep(tr, id);
        }

        let unused: Vec<KlassId> = suite.ids().filter(|&id| !self.is_marked(id)).collect();
        if verbose {
            let mut names: Vec<String> = unused
                .iter()
                .map(|&id| suite.get(id).name().to_string())
                .collect();
            names.sort();
            for name in &names {
                debug!(class = name.as_str(), "unused class");
            }
        }
        debug!(
            used = self.marked.len(),
            unused = unused.len(),
            "dead class elimination complete"
        );
        unused
    }
}

fn trace_sorted(verbose: bool, label: &str, names: &mut Vec<String>) {
    if verbose && !names.is_empty() {
        names.sort();
        for name in names.iter() {
            debug!(class = name.as_str(), "{}", label);
        }
    }
    names.clear();
}
