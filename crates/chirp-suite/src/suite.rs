//! The suite class registry
//!
//! A suite holds every class known to one compilation unit in a stable,
//! insertion-ordered table. Registration interns by internal name: asking
//! for an already-registered name returns the existing handle. The
//! translator advances class states in place; the dead-class analyzer
//! records its verdict via [`Suite::set_unused_classes`] and the classes
//! are actually dropped when the suite is [`Suite::strip`]ped.

use crate::klass::{array_dimensions, is_valid_internal_name, Klass, KlassId, KlassKind};
use crate::member::{FieldRef, MethodRef};
use crate::state::KlassState;
use rustc_hash::FxHashMap;
use thiserror::Error;

/// Internal name of the synthetic root object class.
pub const OBJECT_CLASS: &str = "chirp/Object";

/// Primitive type names, each bootstrapped with a system id.
const PRIMITIVES: &[&str] = &[
    "void", "boolean", "byte", "char", "short", "int", "long", "float", "double",
];

/// What the closed suite will be used as. Decides which symbols stay
/// externally visible after stripping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuiteKind {
    /// Closed application: nothing links against it later.
    Application,
    /// Library other suites link against.
    Library,
    /// Library that may additionally be extended by subclassing.
    Extendable,
    /// Debug build: every symbol stays visible.
    Debuggable,
}

impl SuiteKind {
    pub fn name(self) -> &'static str {
        match self {
            SuiteKind::Application => "application",
            SuiteKind::Library => "library",
            SuiteKind::Extendable => "extendable",
            SuiteKind::Debuggable => "debuggable",
        }
    }
}

/// Registry errors.
#[derive(Debug, Error)]
pub enum SuiteError {
    #[error("invalid class name: '{0}'")]
    InvalidName(String),
}

/// A raw resource carried alongside the classes.
#[derive(Debug, Clone)]
pub struct ResourceFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Ordered class registry for one compilation unit.
#[derive(Debug, Clone)]
pub struct Suite {
    name: String,
    classes: Vec<Klass>,
    by_name: FxHashMap<String, KlassId>,
    unused: Vec<KlassId>,
    resources: Vec<ResourceFile>,
    configuration: String,
}

impl Suite {
    /// Creates an empty registry with no bootstrap classes. Most callers
    /// want [`Suite::bootstrap`].
    pub fn new(name: &str) -> Self {
        Suite {
            name: name.to_string(),
            classes: Vec::new(),
            by_name: FxHashMap::default(),
            unused: Vec::new(),
            resources: Vec::new(),
            configuration: "open".to_string(),
        }
    }

    /// Creates a registry pre-installed with the synthetic root object
    /// class and the primitive types, all carrying system ids.
    pub fn bootstrap(name: &str) -> Self {
        let mut suite = Suite::new(name);
        let root = suite.install(OBJECT_CLASS, KlassKind::Synthetic, KlassState::Loaded);
        let mut next_id = 0u32;
        suite.classes[root.index()].set_system_id(next_id);
        for prim in PRIMITIVES {
            next_id += 1;
            let id = suite.install(prim, KlassKind::Primitive, KlassState::Loaded);
            suite.classes[id.index()].set_system_id(next_id);
        }
        suite
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn configuration(&self) -> &str {
        &self.configuration
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn get(&self, id: KlassId) -> &Klass {
        &self.classes[id.index()]
    }

    pub fn get_mut(&mut self, id: KlassId) -> &mut Klass {
        &mut self.classes[id.index()]
    }

    pub fn lookup(&self, name: &str) -> Option<KlassId> {
        self.by_name.get(name).copied()
    }

    /// Iterates class handles in registration order.
    pub fn ids(&self) -> impl Iterator<Item = KlassId> + '_ {
        (0..self.classes.len() as u32).map(KlassId)
    }

    pub fn classes(&self) -> impl Iterator<Item = &Klass> {
        self.classes.iter()
    }

    /// Handle of the root object class. Panics if the registry was built
    /// without bootstrap classes.
    pub fn object_class(&self) -> KlassId {
        self.lookup(OBJECT_CLASS)
            .expect("suite is missing the bootstrap object class")
    }

    fn install(&mut self, name: &str, kind: KlassKind, state: KlassState) -> KlassId {
        let id = KlassId(self.classes.len() as u32);
        self.classes
            .push(Klass::new(id, name.to_string(), kind, state));
        self.by_name.insert(name.to_string(), id);
        id
    }

    /// Registers `name`, interning: an existing registration is returned
    /// as-is. Instance classes are created `Unloaded`; array classes are
    /// created `Loaded` (they have no class file) after registering their
    /// component type.
    pub fn register_stub(&mut self, name: &str) -> Result<KlassId, SuiteError> {
        if !is_valid_internal_name(name) {
            return Err(SuiteError::InvalidName(name.to_string()));
        }
        if let Some(id) = self.lookup(name) {
            return Ok(id);
        }
        if array_dimensions(name) > 0 {
            let component = self.register_stub(&name[1..])?;
            Ok(self.install(name, KlassKind::Array { component }, KlassState::Loaded))
        } else {
            Ok(self.install(name, KlassKind::Instance, KlassState::Unloaded))
        }
    }

    /// Records the analyzer's unused-class verdict; consumed by `strip`.
    pub fn set_unused_classes(&mut self, unused: Vec<KlassId>) {
        self.unused = unused;
    }

    pub fn unused_classes(&self) -> &[KlassId] {
        &self.unused
    }

    pub fn install_resource(&mut self, resource: ResourceFile) {
        self.resources.push(resource);
    }

    pub fn resources(&self) -> &[ResourceFile] {
        &self.resources
    }

    /// Produces the deliverable copy of this suite: unused classes are
    /// dropped, surviving handles are renumbered densely in the original
    /// order, and the configuration records the stripping mode.
    pub fn strip(&self, kind: SuiteKind, name: &str) -> Suite {
        let dropped: rustc_hash::FxHashSet<KlassId> = self.unused.iter().copied().collect();
        let mut forward: Vec<Option<KlassId>> = vec![None; self.classes.len()];
        let mut next = 0u32;
        for id in self.ids() {
            if !dropped.contains(&id) {
                forward[id.index()] = Some(KlassId(next));
                next += 1;
            }
        }

        let mut copy = Suite::new(name);
        copy.configuration = match kind {
            SuiteKind::Debuggable => "symbols not stripped".to_string(),
            _ => format!("symbols stripped in {} mode", kind.name()),
        };
        copy.resources = self.resources.clone();
        for klass in &self.classes {
            if dropped.contains(&klass.id()) {
                continue;
            }
            let mut klass = klass.clone();
            klass.remap_ids(|id| forward[id.index()]);
            copy.by_name.insert(klass.name().to_string(), klass.id());
            copy.classes.push(klass);
        }
        copy
    }

    /// Resolves a method by name against `start`'s declared methods, its
    /// superclass chain, and (for virtual lookups) its interfaces.
    pub fn resolve_method(
        &self,
        start: KlassId,
        name: &str,
        is_static: bool,
    ) -> Option<MethodRef> {
        let mut current = Some(start);
        while let Some(id) = current {
            let klass = self.get(id);
            if let Some(index) = klass.find_declared_method(name, is_static) {
                return Some(MethodRef {
                    klass: id,
                    is_static,
                    index,
                });
            }
            if !is_static {
                for &iface in klass.interfaces() {
                    if let Some(found) = self.resolve_method(iface, name, false) {
                        return Some(found);
                    }
                }
            }
            current = klass.superclass();
        }
        None
    }

    /// Resolves a field by name against `start` and its superclass chain.
    pub fn resolve_field(&self, start: KlassId, name: &str, is_static: bool) -> Option<FieldRef> {
        let mut current = Some(start);
        while let Some(id) = current {
            let klass = self.get(id);
            if let Some(index) = klass.find_declared_field(name, is_static) {
                return Some(FieldRef {
                    klass: id,
                    is_static,
                    index,
                });
            }
            current = klass.superclass();
        }
        None
    }

    /// True if `sub` equals `ancestor` or derives from it through the
    /// superclass chain.
    pub fn derives_from(&self, sub: KlassId, ancestor: KlassId) -> bool {
        let mut current = Some(sub);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.get(id).superclass();
        }
        false
    }

    /// True if `sub` implements `iface`, directly or through its
    /// superclass chain and super-interfaces.
    pub fn implements(&self, sub: KlassId, iface: KlassId) -> bool {
        let mut current = Some(sub);
        while let Some(id) = current {
            for &declared in self.get(id).interfaces() {
                if declared == iface || self.implements(declared, iface) {
                    return true;
                }
            }
            current = self.get(id).superclass();
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::member::{modifiers, Method};

    #[test]
    fn bootstrap_installs_root_and_primitives() {
        let suite = Suite::bootstrap("boot");
        let root = suite.object_class();
        assert!(suite.get(root).is_synthetic());
        assert_eq!(suite.get(root).system_id(), Some(0));
        let int = suite.lookup("int").unwrap();
        assert!(suite.get(int).is_primitive());
        assert!(suite.get(int).system_id().is_some());
    }

    #[test]
    fn register_stub_interns() {
        let mut suite = Suite::bootstrap("s");
        let a = suite.register_stub("app/A").unwrap();
        let b = suite.register_stub("app/A").unwrap();
        assert_eq!(a, b);
        assert_eq!(suite.get(a).state(), KlassState::Unloaded);
    }

    #[test]
    fn register_array_registers_component_first() {
        let mut suite = Suite::bootstrap("s");
        let arr = suite.register_stub("[[app/A").unwrap();
        let inner = suite.lookup("[app/A").unwrap();
        let elem = suite.lookup("app/A").unwrap();
        assert_eq!(suite.get(arr).component_type(), Some(inner));
        assert_eq!(suite.get(inner).component_type(), Some(elem));
        assert_eq!(suite.get(arr).state(), KlassState::Loaded);
    }

    #[test]
    fn register_rejects_malformed_names() {
        let mut suite = Suite::new("s");
        assert!(suite.register_stub("app.A").is_err());
        assert!(suite.register_stub("[").is_err());
    }

    #[test]
    fn strip_drops_unused_and_remaps() {
        let mut suite = Suite::bootstrap("s");
        let a = suite.register_stub("app/A").unwrap();
        let dead = suite.register_stub("app/Dead").unwrap();
        let b = suite.register_stub("app/B").unwrap();
        let root = suite.object_class();
        suite.get_mut(a).set_superclass(Some(root));
        suite.get_mut(b).set_superclass(Some(a));
        suite.set_unused_classes(vec![dead]);

        let stripped = suite.strip(SuiteKind::Application, "s");
        assert_eq!(stripped.len(), suite.len() - 1);
        assert!(stripped.lookup("app/Dead").is_none());
        let new_a = stripped.lookup("app/A").unwrap();
        let new_b = stripped.lookup("app/B").unwrap();
        assert_eq!(stripped.get(new_b).superclass(), Some(new_a));
        assert_eq!(stripped.get(new_a).name(), "app/A");
    }

    #[test]
    fn method_resolution_walks_superclass_chain() {
        let mut suite = Suite::bootstrap("s");
        let base = suite.register_stub("app/Base").unwrap();
        let sub = suite.register_stub("app/Sub").unwrap();
        let root = suite.object_class();
        suite.get_mut(base).set_superclass(Some(root));
        suite.get_mut(sub).set_superclass(Some(base));
        suite.get_mut(base).set_methods(
            vec![],
            vec![Method {
                name: "greet".to_string(),
                modifiers: modifiers::PUBLIC,
                return_type: root,
                param_types: vec![],
            }],
        );

        let mref = suite.resolve_method(sub, "greet", false).unwrap();
        assert_eq!(mref.klass, base);
        assert_eq!(mref.index, 0);
        assert!(suite.resolve_method(sub, "missing", false).is_none());
    }
}
