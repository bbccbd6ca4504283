//! Class lifecycle states
//!
//! Every class moves monotonically through `Unloaded → Loaded → Converting
//! → Converted`; any state may drop to the terminal `Error`. The observed
//! sequence for a class is always a subsequence of the forward chain, so a
//! transition may legally skip states (array classes jump from `Loaded`
//! straight to `Converted`) but may never move backwards.

use thiserror::Error;

/// Lifecycle state of a class within one translation unit.
///
/// The derived ordering is the pipeline ordering; `Error` sorts last and
/// is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum KlassState {
    /// Registered (by name) but not yet defined by a class file.
    Unloaded,
    /// Class file located and its definition installed.
    Loaded,
    /// Phase 1 complete: method IR built, constants counted.
    Converting,
    /// Phase 2 complete: bodies emitted, object table finalized.
    Converted,
    /// Translation failed; terminal for this translation unit.
    Error,
}

impl KlassState {
    /// Short lowercase name, used in diagnostics and link reports.
    pub fn name(self) -> &'static str {
        match self {
            KlassState::Unloaded => "unloaded",
            KlassState::Loaded => "loaded",
            KlassState::Converting => "converting",
            KlassState::Converted => "converted",
            KlassState::Error => "error",
        }
    }
}

/// Rejected lifecycle transition. This indicates a pipeline bug, not bad
/// input: callers are expected to check a class's state before advancing.
#[derive(Debug, Clone, Error)]
#[error("illegal state transition for {klass}: {from:?} -> {to:?}")]
pub struct StateError {
    pub klass: String,
    pub from: KlassState,
    pub to: KlassState,
}

/// Checks that `from -> to` is a legal advance: any strictly forward move,
/// or a drop to `Error` from any non-`Error` state.
pub(crate) fn check_transition(
    klass: &str,
    from: KlassState,
    to: KlassState,
) -> Result<(), StateError> {
    let legal = match to {
        KlassState::Error => from != KlassState::Error,
        _ => from < to && from != KlassState::Error,
    };
    if legal {
        Ok(())
    } else {
        Err(StateError {
            klass: klass.to_string(),
            from,
            to,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_steps_are_legal() {
        assert!(check_transition("t", KlassState::Unloaded, KlassState::Loaded).is_ok());
        assert!(check_transition("t", KlassState::Loaded, KlassState::Converting).is_ok());
        assert!(check_transition("t", KlassState::Converting, KlassState::Converted).is_ok());
    }

    #[test]
    fn forward_jumps_are_legal() {
        // Array classes jump Loaded -> Converted.
        assert!(check_transition("t", KlassState::Loaded, KlassState::Converted).is_ok());
        assert!(check_transition("t", KlassState::Unloaded, KlassState::Converting).is_ok());
    }

    #[test]
    fn backward_moves_are_rejected() {
        assert!(check_transition("t", KlassState::Converted, KlassState::Loaded).is_err());
        assert!(check_transition("t", KlassState::Loaded, KlassState::Loaded).is_err());
    }

    #[test]
    fn error_is_terminal() {
        assert!(check_transition("t", KlassState::Converting, KlassState::Error).is_ok());
        assert!(check_transition("t", KlassState::Error, KlassState::Converted).is_err());
        assert!(check_transition("t", KlassState::Error, KlassState::Error).is_err());
    }
}
