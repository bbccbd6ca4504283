//! Link report
//!
//! A serializable summary of what the linker kept and removed, printed
//! to stdout and optionally written as JSON.

use chirp_suite::{Suite, SuiteKind};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ClassReport {
    pub name: String,
    pub state: &'static str,
    pub object_table_len: usize,
    pub methods_emitted: usize,
}

#[derive(Debug, Serialize)]
pub struct LinkReport {
    pub suite: String,
    pub kind: &'static str,
    pub configuration: String,
    pub classes: Vec<ClassReport>,
    pub removed: Vec<String>,
}

impl LinkReport {
    /// Summarizes the closed suite and its stripped copy. `closed` still
    /// contains the removed classes; `stripped` is the deliverable.
    pub fn collect(closed: &Suite, stripped: &Suite, kind: SuiteKind) -> LinkReport {
        let removed = closed
            .unused_classes()
            .iter()
            .map(|&id| closed.get(id).name().to_string())
            .collect();
        let classes = stripped
            .classes()
            .map(|klass| ClassReport {
                name: klass.name().to_string(),
                state: klass.state().name(),
                object_table_len: klass.object_table().len(),
                methods_emitted: klass.emitted_method_count(),
            })
            .collect();
        LinkReport {
            suite: stripped.name().to_string(),
            kind: kind.name(),
            configuration: stripped.configuration().to_string(),
            classes,
            removed,
        }
    }

    pub fn print_summary(&self) {
        println!(
            "suite '{}' ({}): {} classes, {} removed",
            self.suite,
            self.configuration,
            self.classes.len(),
            self.removed.len()
        );
        for class in &self.classes {
            println!(
                "    {:<40} {:>3} constants  {:>3} methods",
                class.name, class.object_table_len, class.methods_emitted
            );
        }
        if !self.removed.is_empty() {
            println!("removed:");
            for name in &self.removed {
                println!("    {}", name);
            }
        }
    }
}
