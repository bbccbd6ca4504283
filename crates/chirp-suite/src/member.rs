//! Class member metadata
//!
//! Methods and fields carry only the metadata the linker needs: names,
//! access modifiers and resolved type handles. Method *bodies* live in the
//! translator's per-class unit until phase 2 installs the emitted form
//! here.

use crate::klass::KlassId;

/// Access and attribute modifier bits shared by classes and members.
pub mod modifiers {
    pub const PUBLIC: u32 = 1 << 0;
    pub const PROTECTED: u32 = 1 << 1;
    pub const PRIVATE: u32 = 1 << 2;
    pub const FINAL: u32 = 1 << 3;
    pub const ABSTRACT: u32 = 1 << 4;
    pub const NATIVE: u32 = 1 << 5;
    /// Implemented by the host build tool, never translated into a suite.
    pub const HOSTED: u32 = 1 << 6;

    /// True when neither `PUBLIC` nor `PROTECTED` nor `PRIVATE` is set.
    pub fn is_package_private(m: u32) -> bool {
        m & (PUBLIC | PROTECTED | PRIVATE) == 0
    }
}

/// Name given to instance constructors.
pub const CONSTRUCTOR_NAME: &str = "<init>";

/// Name given to class initializers.
pub const CLASS_INITIALIZER_NAME: &str = "<clinit>";

/// Name of a runnable entry point.
pub const MAIN_NAME: &str = "main";

/// A method declaration. One entry in a class's static or virtual table;
/// the table side and the index are carried by [`MethodRef`].
#[derive(Debug, Clone)]
pub struct Method {
    pub name: String,
    pub modifiers: u32,
    pub return_type: KlassId,
    pub param_types: Vec<KlassId>,
}

impl Method {
    pub fn is_abstract(&self) -> bool {
        self.modifiers & modifiers::ABSTRACT != 0
    }

    pub fn is_native(&self) -> bool {
        self.modifiers & modifiers::NATIVE != 0
    }

    pub fn is_hosted(&self) -> bool {
        self.modifiers & modifiers::HOSTED != 0
    }

    pub fn is_private(&self) -> bool {
        self.modifiers & modifiers::PRIVATE != 0
    }

    pub fn is_constructor(&self) -> bool {
        self.name == CONSTRUCTOR_NAME
    }

    pub fn is_class_initializer(&self) -> bool {
        self.name == CLASS_INITIALIZER_NAME
    }

    /// True when this method has no translatable body.
    pub fn has_no_body(&self) -> bool {
        self.is_abstract() || self.is_native() || self.is_hosted()
    }
}

/// A field declaration.
#[derive(Debug, Clone)]
pub struct Field {
    pub name: String,
    pub modifiers: u32,
    pub ty: KlassId,
}

/// Resolved handle to a method: defining class, table side, table index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MethodRef {
    pub klass: KlassId,
    pub is_static: bool,
    pub index: u16,
}

/// Resolved handle to a field: defining class, table side, table index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldRef {
    pub klass: KlassId,
    pub is_static: bool,
    pub index: u16,
}

/// An emitted Chirp bytecode method body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodBody {
    pub code: Vec<u8>,
    /// Local slot count, parameters included.
    pub locals: u16,
}
