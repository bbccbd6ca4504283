//! Suite and class model for the Chirp VM linker.
//!
//! A *suite* is a closed, linked unit of classes: the output of the linker
//! and the unit of deployment for the Chirp VM. This crate owns the class
//! registry, the per-class lifecycle state machine, member metadata, and
//! the finalized per-class object tables. The translation pipeline itself
//! lives in `chirp-translator`.

pub mod klass;
pub mod member;
pub mod object;
pub mod state;
pub mod suite;

pub use klass::{Klass, KlassId, KlassKind};
pub use member::{Field, FieldRef, Method, MethodBody, MethodRef};
pub use object::SuiteObject;
pub use state::{KlassState, StateError};
pub use suite::{ResourceFile, Suite, SuiteError, SuiteKind};
