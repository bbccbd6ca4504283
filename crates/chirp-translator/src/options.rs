//! Translator options
//!
//! All behavior-controlling flags are read once, when a translation unit
//! is opened, into an immutable [`Options`] value that is threaded
//! through the pipeline. Flags are property-style: a [`Properties`] map
//! merged from the process environment and explicit `-D` definitions.
//! Malformed values log a diagnostic and fall back to the default; they
//! are never errors.

use std::collections::BTreeMap;
use tracing::warn;

/// Reorder each class's object table so the most-used constants get the
/// smallest indices, and elide provably dead entries.
pub const OPTIMIZE_CONSTANT_OBJECTS: &str = "chirp.translator.optimizeConstantObjects";
/// Remove uncalled (and uncallable) methods; selects whole-suite
/// translation.
pub const DEAD_METHOD_ELIMINATION: &str = "chirp.translator.deadMethodElimination";
/// Treat uncalled private constructors as dead.
pub const DELETE_UNUSED_PRIVATE_CONSTRUCTORS: &str =
    "chirp.translator.deleteUnusedPrivateConstructors";
/// Replace dead string constants with a sentinel slot.
pub const DEAD_STRING_ELIMINATION: &str = "chirp.translator.deadStringElimination";
/// Replace dead class-reference constants with a sentinel slot.
pub const DEAD_CLASS_ELIMINATION: &str = "chirp.translator.deadClassElimination";
/// Print linking progress.
pub const VERBOSE: &str = "chirp.translator.verbose";
/// Verify every emitted method body against its class's final object
/// table.
pub const VERIFY_SUITE: &str = "chirp.translator.verifySuite";

/// Recognized properties with their defaults and one-line help, in the
/// order they are documented.
pub const RECOGNIZED: &[(&str, bool, &str)] = &[
    (
        OPTIMIZE_CONSTANT_OBJECTS,
        true,
        "reorder class objects to give common constants small indexes",
    ),
    (
        DEAD_METHOD_ELIMINATION,
        true,
        "remove uncalled (and uncallable) methods",
    ),
    (
        DELETE_UNUSED_PRIVATE_CONSTRUCTORS,
        true,
        "treat uncalled private constructors as dead",
    ),
    (
        DEAD_STRING_ELIMINATION,
        true,
        "strip string constants no surviving code refers to",
    ),
    (
        DEAD_CLASS_ELIMINATION,
        true,
        "strip class-reference constants no surviving code refers to",
    ),
    (VERBOSE, false, "print linking progress"),
    (
        VERIFY_SUITE,
        true,
        "verify emitted method bodies against the final object table",
    ),
];

/// Property map. Ordered so diagnostics and help output are stable.
#[derive(Debug, Clone, Default)]
pub struct Properties(BTreeMap<String, String>);

impl Properties {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshots `chirp.translator.*` keys from the process environment.
    pub fn from_env() -> Self {
        let mut props = Properties::new();
        for (key, value) in std::env::vars() {
            if key.starts_with("chirp.translator.") {
                props.set(&key, &value);
            }
        }
        props
    }

    pub fn set(&mut self, key: &str, value: &str) -> &mut Self {
        self.0.insert(key.to_string(), value.to_string());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }
}

/// How much of the program is in memory before code is generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranslationStrategy {
    /// Build and emit one method at a time. Lowest memory, no
    /// whole-program optimization.
    ByMethod,
    /// Build IR for a whole class before emitting, enabling constant
    /// table compaction.
    ByClass,
    /// Build IR for the whole suite before emitting anything, enabling
    /// dead-method and dead-class elimination.
    BySuite,
    /// Whole-program over a bundle of suites; same gates as `BySuite`.
    ByTranslation,
}

impl TranslationStrategy {
    pub fn is_whole_program(self) -> bool {
        matches!(
            self,
            TranslationStrategy::BySuite | TranslationStrategy::ByTranslation
        )
    }
}

/// Immutable option snapshot for one translation unit.
#[derive(Debug, Clone)]
pub struct Options {
    pub optimize_constant_objects: bool,
    pub dead_method_elimination: bool,
    pub delete_unused_private_constructors: bool,
    pub dead_string_elimination: bool,
    pub dead_class_elimination: bool,
    pub verbose: bool,
    pub verify_suite: bool,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            optimize_constant_objects: true,
            dead_method_elimination: true,
            delete_unused_private_constructors: true,
            dead_string_elimination: true,
            dead_class_elimination: true,
            verbose: false,
            verify_suite: true,
        }
    }
}

impl Options {
    /// Reads the recognized properties out of `props`, falling back to
    /// defaults (with a diagnostic) on malformed values.
    pub fn from_properties(props: &Properties) -> Options {
        let defaults = Options::default();
        Options {
            optimize_constant_objects: parse_bool(
                props,
                OPTIMIZE_CONSTANT_OBJECTS,
                defaults.optimize_constant_objects,
            ),
            dead_method_elimination: parse_bool(
                props,
                DEAD_METHOD_ELIMINATION,
                defaults.dead_method_elimination,
            ),
            delete_unused_private_constructors: parse_bool(
                props,
                DELETE_UNUSED_PRIVATE_CONSTRUCTORS,
                defaults.delete_unused_private_constructors,
            ),
            dead_string_elimination: parse_bool(
                props,
                DEAD_STRING_ELIMINATION,
                defaults.dead_string_elimination,
            ),
            dead_class_elimination: parse_bool(
                props,
                DEAD_CLASS_ELIMINATION,
                defaults.dead_class_elimination,
            ),
            verbose: parse_bool(props, VERBOSE, defaults.verbose),
            verify_suite: parse_bool(props, VERIFY_SUITE, defaults.verify_suite),
        }
    }

    /// Selects the translation strategy once per unit. Dead-method
    /// elimination needs the whole program in memory; constant-object
    /// optimization needs a whole class.
    pub fn strategy(&self) -> TranslationStrategy {
        if self.dead_method_elimination {
            TranslationStrategy::BySuite
        } else if self.optimize_constant_objects {
            TranslationStrategy::ByClass
        } else {
            TranslationStrategy::ByMethod
        }
    }
}

fn parse_bool(props: &Properties, key: &str, default: bool) -> bool {
    match props.get(key) {
        None => default,
        Some(value) => match value.to_ascii_lowercase().as_str() {
            "true" => true,
            "false" => false,
            other => {
                warn!(
                    property = key,
                    value = other,
                    default,
                    "ill-formed boolean value for translator property, using default"
                );
                default
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_select_whole_suite_strategy() {
        let opts = Options::default();
        assert_eq!(opts.strategy(), TranslationStrategy::BySuite);
        assert!(opts.strategy().is_whole_program());
    }

    #[test]
    fn strategy_degrades_with_flags() {
        let mut props = Properties::new();
        props.set(DEAD_METHOD_ELIMINATION, "false");
        let opts = Options::from_properties(&props);
        assert_eq!(opts.strategy(), TranslationStrategy::ByClass);

        props.set(OPTIMIZE_CONSTANT_OBJECTS, "false");
        let opts = Options::from_properties(&props);
        assert_eq!(opts.strategy(), TranslationStrategy::ByMethod);
    }

    #[test]
    fn malformed_booleans_fall_back_to_defaults() {
        let mut props = Properties::new();
        props.set(VERBOSE, "yes please");
        props.set(DEAD_METHOD_ELIMINATION, "1");
        let opts = Options::from_properties(&props);
        assert!(!opts.verbose);
        assert!(opts.dead_method_elimination);
    }

    #[test]
    fn booleans_are_case_insensitive() {
        let mut props = Properties::new();
        props.set(VERBOSE, "TRUE");
        let opts = Options::from_properties(&props);
        assert!(opts.verbose);
    }
}
