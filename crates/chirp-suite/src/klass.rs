//! Class representation
//!
//! A [`Klass`] is one class, interface, array or primitive type registered
//! in a suite. Cross-references between classes are [`KlassId`] handles
//! into the owning suite's class table, assigned at registration and
//! stable for the lifetime of the suite (stripping produces a remapped
//! copy rather than mutating ids in place).

use crate::member::{Field, Method, MethodBody, MethodRef, MAIN_NAME};
use crate::object::SuiteObject;
use crate::state::{check_transition, KlassState, StateError};

/// Handle to a class registered in a [`crate::Suite`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KlassId(pub u32);

impl KlassId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// What sort of type a [`Klass`] is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KlassKind {
    Instance,
    Interface,
    Array { component: KlassId },
    Primitive,
    /// Defined by the VM itself; has no class file and no translatable
    /// methods.
    Synthetic,
}

/// Class modifier bits. Members reuse [`crate::member::modifiers`].
pub use crate::member::modifiers;

/// True if `name` is a well-formed internal class name.
///
/// Internal names use `/` as the package separator (`chirp/app/Main`);
/// array classes prefix the component name with `[` per dimension
/// (`[chirp/app/Main`, `[[int`). Source-form names with `.` separators are
/// rejected here; callers convert first.
pub fn is_valid_internal_name(name: &str) -> bool {
    let base = name.trim_start_matches('[');
    if base.is_empty() {
        return false;
    }
    !base.contains(['.', ';', ' ']) && !base.starts_with('/') && !base.ends_with('/')
}

/// Number of leading `[` dimensions in an internal class name.
pub fn array_dimensions(name: &str) -> usize {
    name.bytes().take_while(|&b| b == b'[').count()
}

/// One class registered in a suite.
#[derive(Debug, Clone)]
pub struct Klass {
    id: KlassId,
    name: String,
    kind: KlassKind,
    modifiers: u32,
    /// Non-negative system id marks a VM-intrinsic class.
    system_id: Option<u32>,
    /// Symbol never exported from the enclosing suite, regardless of its
    /// declared access.
    internal_symbol: bool,
    /// Symbol explicitly exported for dynamic lookup from other suites.
    dynamic_symbol: bool,
    has_main: bool,
    superclass: Option<KlassId>,
    interfaces: Vec<KlassId>,
    fields_static: Vec<Field>,
    fields_instance: Vec<Field>,
    methods_static: Vec<Method>,
    methods_virtual: Vec<Method>,
    bodies_static: Vec<Option<MethodBody>>,
    bodies_virtual: Vec<Option<MethodBody>>,
    object_table: Vec<SuiteObject>,
    state: KlassState,
}

impl Klass {
    pub(crate) fn new(id: KlassId, name: String, kind: KlassKind, state: KlassState) -> Self {
        Klass {
            id,
            name,
            kind,
            modifiers: 0,
            system_id: None,
            internal_symbol: false,
            dynamic_symbol: false,
            has_main: false,
            superclass: None,
            interfaces: Vec::new(),
            fields_static: Vec::new(),
            fields_instance: Vec::new(),
            methods_static: Vec::new(),
            methods_virtual: Vec::new(),
            bodies_static: Vec::new(),
            bodies_virtual: Vec::new(),
            object_table: Vec::new(),
            state,
        }
    }

    pub fn id(&self) -> KlassId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> KlassKind {
        self.kind
    }

    pub fn state(&self) -> KlassState {
        self.state
    }

    pub fn modifiers(&self) -> u32 {
        self.modifiers
    }

    pub fn system_id(&self) -> Option<u32> {
        self.system_id
    }

    pub fn is_internal_symbol(&self) -> bool {
        self.internal_symbol
    }

    pub fn is_dynamic_symbol(&self) -> bool {
        self.dynamic_symbol
    }

    pub fn has_main(&self) -> bool {
        self.has_main
    }

    pub fn is_array(&self) -> bool {
        matches!(self.kind, KlassKind::Array { .. })
    }

    pub fn is_synthetic(&self) -> bool {
        matches!(self.kind, KlassKind::Synthetic)
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self.kind, KlassKind::Primitive)
    }

    pub fn is_interface(&self) -> bool {
        matches!(self.kind, KlassKind::Interface)
    }

    /// Component type for array classes.
    pub fn component_type(&self) -> Option<KlassId> {
        match self.kind {
            KlassKind::Array { component } => Some(component),
            _ => None,
        }
    }

    pub fn superclass(&self) -> Option<KlassId> {
        self.superclass
    }

    pub fn interfaces(&self) -> &[KlassId] {
        &self.interfaces
    }

    pub fn fields(&self, is_static: bool) -> &[Field] {
        if is_static {
            &self.fields_static
        } else {
            &self.fields_instance
        }
    }

    pub fn methods(&self, is_static: bool) -> &[Method] {
        if is_static {
            &self.methods_static
        } else {
            &self.methods_virtual
        }
    }

    pub fn method(&self, is_static: bool, index: usize) -> &Method {
        &self.methods(is_static)[index]
    }

    pub fn field(&self, is_static: bool, index: usize) -> &Field {
        &self.fields(is_static)[index]
    }

    /// Finds a method declared by this class. Inherited members are
    /// resolved by [`crate::Suite::resolve_method`].
    pub fn find_declared_method(&self, name: &str, is_static: bool) -> Option<u16> {
        self.methods(is_static)
            .iter()
            .position(|m| m.name == name)
            .map(|i| i as u16)
    }

    pub fn find_declared_field(&self, name: &str, is_static: bool) -> Option<u16> {
        self.fields(is_static)
            .iter()
            .position(|f| f.name == name)
            .map(|i| i as u16)
    }

    pub fn object_table(&self) -> &[SuiteObject] {
        &self.object_table
    }

    pub fn method_body(&self, is_static: bool, index: usize) -> Option<&MethodBody> {
        let bodies = if is_static {
            &self.bodies_static
        } else {
            &self.bodies_virtual
        };
        bodies.get(index).and_then(|b| b.as_ref())
    }

    /// Count of emitted method bodies, both tables.
    pub fn emitted_method_count(&self) -> usize {
        self.bodies_static
            .iter()
            .chain(self.bodies_virtual.iter())
            .filter(|b| b.is_some())
            .count()
    }

    /// Advances the lifecycle state. Any strictly forward move is legal;
    /// everything else is a [`StateError`].
    pub fn advance(&mut self, to: KlassState) -> Result<(), StateError> {
        check_transition(&self.name, self.state, to)?;
        self.state = to;
        Ok(())
    }

    /// Drops the class into the terminal `Error` state unconditionally.
    pub fn force_error(&mut self) {
        self.state = KlassState::Error;
    }

    // -- mutation during definition install ---------------------------------

    pub fn set_modifiers(&mut self, modifiers: u32) {
        self.modifiers = modifiers;
    }

    pub fn set_kind(&mut self, kind: KlassKind) {
        self.kind = kind;
    }

    pub(crate) fn set_system_id(&mut self, system_id: u32) {
        self.system_id = Some(system_id);
    }

    pub fn set_symbol_flags(&mut self, internal: bool, dynamic: bool) {
        self.internal_symbol = internal;
        self.dynamic_symbol = dynamic;
    }

    pub fn set_superclass(&mut self, superclass: Option<KlassId>) {
        self.superclass = superclass;
    }

    pub fn set_interfaces(&mut self, interfaces: Vec<KlassId>) {
        self.interfaces = interfaces;
    }

    pub fn set_fields(&mut self, static_fields: Vec<Field>, instance_fields: Vec<Field>) {
        self.fields_static = static_fields;
        self.fields_instance = instance_fields;
    }

    /// Installs the method tables and sizes the body tables to match. The
    /// entry-point flag is derived here: a public static `main`.
    pub fn set_methods(&mut self, static_methods: Vec<Method>, virtual_methods: Vec<Method>) {
        self.has_main = static_methods
            .iter()
            .any(|m| m.name == MAIN_NAME && m.modifiers & modifiers::PUBLIC != 0);
        self.bodies_static = vec![None; static_methods.len()];
        self.bodies_virtual = vec![None; virtual_methods.len()];
        self.methods_static = static_methods;
        self.methods_virtual = virtual_methods;
    }

    /// Installs one emitted method body (phase 2).
    pub fn set_method_body(&mut self, mref: MethodRef, body: MethodBody) {
        debug_assert_eq!(mref.klass, self.id);
        let bodies = if mref.is_static {
            &mut self.bodies_static
        } else {
            &mut self.bodies_virtual
        };
        bodies[mref.index as usize] = Some(body);
    }

    /// Installs the finalized, compacted object table (phase 2).
    pub fn set_object_table(&mut self, table: Vec<SuiteObject>) {
        self.object_table = table;
    }

    // -- strip support -------------------------------------------------------

    pub(crate) fn remap_ids(&mut self, map: impl Fn(KlassId) -> Option<KlassId>) {
        let remap = |id: &mut KlassId| {
            // Structural links to stripped classes cannot occur: the
            // analyzer marks every class reachable through them.
            *id = map(*id).expect("structural link to a stripped class");
        };
        self.id = map(self.id).expect("remapping a stripped class");
        if let Some(s) = self.superclass.as_mut() {
            remap(s);
        }
        if let KlassKind::Array { component } = &mut self.kind {
            remap(component);
        }
        for i in self.interfaces.iter_mut() {
            remap(i);
        }
        for f in self
            .fields_static
            .iter_mut()
            .chain(self.fields_instance.iter_mut())
        {
            remap(&mut f.ty);
        }
        for m in self
            .methods_static
            .iter_mut()
            .chain(self.methods_virtual.iter_mut())
        {
            remap(&mut m.return_type);
            for p in m.param_types.iter_mut() {
                remap(p);
            }
        }
        for slot in self.object_table.iter_mut() {
            if let SuiteObject::Class(id) = slot {
                match map(*id) {
                    Some(new_id) => *id = new_id,
                    // A table can still name a stripped class when
                    // dead-class elision was disabled; the slot degrades
                    // to the dead-class marker.
                    None => *slot = SuiteObject::DeadClass,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_name_validation() {
        assert!(is_valid_internal_name("chirp/app/Main"));
        assert!(is_valid_internal_name("int"));
        assert!(is_valid_internal_name("[chirp/app/Main"));
        assert!(is_valid_internal_name("[[int"));
        assert!(!is_valid_internal_name(""));
        assert!(!is_valid_internal_name("["));
        assert!(!is_valid_internal_name("chirp.app.Main"));
        assert!(!is_valid_internal_name("/Main"));
        assert!(!is_valid_internal_name("chirp/"));
    }

    #[test]
    fn array_dimension_count() {
        assert_eq!(array_dimensions("chirp/Object"), 0);
        assert_eq!(array_dimensions("[int"), 1);
        assert_eq!(array_dimensions("[[[int"), 3);
    }

    #[test]
    fn main_detection() {
        let mut k = Klass::new(
            KlassId(0),
            "app/Main".to_string(),
            KlassKind::Instance,
            KlassState::Unloaded,
        );
        k.set_methods(
            vec![Method {
                name: "main".to_string(),
                modifiers: modifiers::PUBLIC,
                return_type: KlassId(0),
                param_types: vec![],
            }],
            vec![],
        );
        assert!(k.has_main());

        k.set_methods(
            vec![Method {
                name: "main".to_string(),
                modifiers: modifiers::PRIVATE,
                return_type: KlassId(0),
                param_types: vec![],
            }],
            vec![],
        );
        assert!(!k.has_main());
    }
}
