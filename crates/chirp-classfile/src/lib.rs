//! Class-file boundary for the Chirp VM linker.
//!
//! The low-level class-file parser is a separate tool; what reaches the
//! linker is its output: a [`ClassDefinition`] document per class, located
//! through a [`ClassFileLoader`]. Definitions are serde documents
//! (`<internal-name>.json` on a classpath), so the same records serve the
//! on-disk toolchain and in-memory embedding.

pub mod def;
pub mod error;
pub mod instruction;
pub mod loader;

pub use def::{
    parse_class_modifiers, parse_member_modifiers, ClassDefinition, FieldDefinition,
    HandlerDefinition, MethodDefinition,
};
pub use error::LoadError;
pub use instruction::{ConstValue, SourceInstruction};
pub use loader::{ClassFileLoader, DirClasspath, MemoryClasspath};
