//! Classpath loaders
//!
//! A [`ClassFileLoader`] locates the parsed definition for an internal
//! class name. [`DirClasspath`] is the production loader: an ordered list
//! of directory roots searched for `<internal-name>.json`, first hit
//! wins. [`MemoryClasspath`] serves tests and embedders.

use crate::def::ClassDefinition;
use crate::error::LoadError;
use chirp_suite::klass::is_valid_internal_name;
use rustc_hash::FxHashMap;
use std::path::{Path, PathBuf};

/// File extension of class definition documents.
pub const CLASS_FILE_EXTENSION: &str = "json";

/// Locates parsed class definitions by internal name.
pub trait ClassFileLoader {
    fn find_class(&self, internal_name: &str) -> Result<ClassDefinition, LoadError>;
}

/// Directory-backed classpath: a `:`-separated list of existing directory
/// roots, searched in order.
#[derive(Debug)]
pub struct DirClasspath {
    roots: Vec<PathBuf>,
}

impl DirClasspath {
    /// Opens a classpath specification. Every entry must name an existing
    /// directory; an empty spec is rejected.
    pub fn open(spec: &str) -> Result<Self, LoadError> {
        let mut roots = Vec::new();
        for entry in spec.split(':').filter(|e| !e.is_empty()) {
            let path = PathBuf::from(entry);
            if !path.is_dir() {
                return Err(LoadError::Classpath {
                    spec: spec.to_string(),
                    reason: format!("'{}' is not a directory", entry),
                });
            }
            roots.push(path);
        }
        if roots.is_empty() {
            return Err(LoadError::Classpath {
                spec: spec.to_string(),
                reason: "no entries".to_string(),
            });
        }
        Ok(DirClasspath { roots })
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    fn class_path(root: &Path, internal_name: &str) -> PathBuf {
        let mut path = root.join(internal_name);
        path.set_extension(CLASS_FILE_EXTENSION);
        path
    }
}

impl ClassFileLoader for DirClasspath {
    fn find_class(&self, internal_name: &str) -> Result<ClassDefinition, LoadError> {
        if !is_valid_internal_name(internal_name) {
            return Err(LoadError::BadName(internal_name.to_string()));
        }
        for root in &self.roots {
            let path = Self::class_path(root, internal_name);
            if !path.is_file() {
                continue;
            }
            let bytes = std::fs::read(&path).map_err(|source| LoadError::Io {
                path: path.clone(),
                source,
            })?;
            return serde_json::from_slice(&bytes).map_err(|source| LoadError::Parse {
                class: internal_name.to_string(),
                source,
            });
        }
        Err(LoadError::NotFound {
            class: internal_name.to_string(),
        })
    }
}

/// In-memory classpath for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryClasspath {
    classes: FxHashMap<String, ClassDefinition>,
}

impl MemoryClasspath {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a definition, keyed by its own name. Replaces any previous
    /// definition of the same class.
    pub fn add(&mut self, def: ClassDefinition) -> &mut Self {
        self.classes.insert(def.name.clone(), def);
        self
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

impl ClassFileLoader for MemoryClasspath {
    fn find_class(&self, internal_name: &str) -> Result<ClassDefinition, LoadError> {
        self.classes
            .get(internal_name)
            .cloned()
            .ok_or_else(|| LoadError::NotFound {
                class: internal_name.to_string(),
            })
    }
}
