//! Per-class constant object table
//!
//! Phase 1 registers every constant object a class's code references and
//! counts the static references. After phase 1 (whole-suite mode) the
//! table is sorted so the most-referenced constants get the smallest
//! indices; the sort is fully deterministic because the persisted suite
//! must be reproducible bit-for-bit across builds. Phase 2 then records
//! which references actually survive into emitted code; entries with no
//! surviving use are replaced by dead markers when the table is
//! finalized.

use chirp_suite::{KlassId, Suite, SuiteObject};
use rustc_hash::FxHashMap;
use std::cmp::Ordering;

/// A constant object as keyed in the table. Normalized by value, never by
/// identity: two equal strings in different methods share one entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ConstObject {
    Str(String),
    Class(KlassId),
    IntArray(Vec<i32>),
}

impl ConstObject {
    /// Stable kind name, the first tie-break key of the compaction sort.
    pub fn kind_name(&self) -> &'static str {
        match self {
            ConstObject::Class(_) => "class",
            ConstObject::IntArray(_) => "int-array",
            ConstObject::Str(_) => "string",
        }
    }
}

/// Reference counts for one table entry.
#[derive(Debug, Clone)]
pub struct ObjectCounter {
    index: u16,
    static_count: u32,
    emitted_count: u32,
}

impl ObjectCounter {
    pub fn index(&self) -> u16 {
        self.index
    }

    /// References counted while building IR, before any elimination.
    pub fn static_count(&self) -> u32 {
        self.static_count
    }

    /// References that survived into emitted code.
    pub fn emitted_count(&self) -> u32 {
        self.emitted_count
    }
}

/// The object table of one class under translation.
#[derive(Debug, Default)]
pub struct ObjectTable {
    entries: FxHashMap<ConstObject, ObjectCounter>,
    next_index: u16,
}

impl ObjectTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registers a static reference to `object`, creating the entry at
    /// the next free index on first sight.
    pub fn add(&mut self, object: ConstObject) {
        match self.entries.get_mut(&object) {
            Some(counter) => counter.static_count += 1,
            None => {
                let index = self.next_index;
                self.next_index += 1;
                self.entries.insert(
                    object,
                    ObjectCounter {
                        index,
                        static_count: 1,
                        emitted_count: 0,
                    },
                );
            }
        }
    }

    /// Index of `object`, optionally counting an emitted use. The object
    /// must have been registered in phase 1; a miss is a pipeline bug.
    pub fn index_of(&mut self, object: &ConstObject, record_use: bool) -> u16 {
        let Some(counter) = self.entries.get_mut(object) else {
            panic!("constant object missing from table: {:?}", object);
        };
        if record_use {
            counter.emitted_count += 1;
        }
        counter.index
    }

    pub fn counter(&self, object: &ConstObject) -> Option<&ObjectCounter> {
        self.entries.get(object)
    }

    /// Sorts by descending static reference count; ties break by kind
    /// name, then by value (string order, class internal name, int arrays
    /// elementwise). The sort position becomes the entry's final index.
    /// Deterministic for identical inputs regardless of insertion order.
    pub fn sort(&mut self, suite: &Suite) {
        let mut order: Vec<(&ConstObject, u32)> = self
            .entries
            .iter()
            .map(|(obj, counter)| (obj, counter.static_count))
            .collect();
        order.sort_by(|(a, a_count), (b, b_count)| {
            b_count
                .cmp(a_count)
                .then_with(|| a.kind_name().cmp(b.kind_name()))
                .then_with(|| compare_values(a, b, suite))
        });
        let ranked: Vec<ConstObject> = order.into_iter().map(|(obj, _)| obj.clone()).collect();
        for (rank, obj) in ranked.into_iter().enumerate() {
            self.entries.get_mut(&obj).expect("entry vanished").index = rank as u16;
        }
    }

    /// Produces the final table in index order, replacing entries without
    /// a surviving use by dead markers. Strings are only elided when the
    /// owning class permits it, and a class reference is only elided when
    /// string elision is also permitted: generated glue resolves classes
    /// by decoding their name strings at runtime, so the two must fall
    /// together or not at all.
    pub fn finalize(&self, elide_strings: bool, elide_classes: bool) -> Vec<SuiteObject> {
        let mut slots: Vec<Option<SuiteObject>> = vec![None; self.entries.len()];
        for (object, counter) in &self.entries {
            let live = counter.emitted_count > 0;
            let slot = if live {
                to_suite_object(object)
            } else {
                match object {
                    ConstObject::Str(_) if elide_strings => SuiteObject::DeadString,
                    ConstObject::Class(_) if elide_classes && elide_strings => {
                        SuiteObject::DeadClass
                    }
                    other => to_suite_object(other),
                }
            };
            slots[counter.index as usize] = Some(slot);
        }
        slots
            .into_iter()
            .map(|slot| slot.expect("object table index gap"))
            .collect()
    }
}

fn to_suite_object(object: &ConstObject) -> SuiteObject {
    match object {
        ConstObject::Str(s) => SuiteObject::Str(s.clone()),
        ConstObject::Class(id) => SuiteObject::Class(*id),
        ConstObject::IntArray(a) => SuiteObject::IntArray(a.clone()),
    }
}

fn compare_values(a: &ConstObject, b: &ConstObject, suite: &Suite) -> Ordering {
    match (a, b) {
        (ConstObject::Str(a), ConstObject::Str(b)) => a.cmp(b),
        (ConstObject::Class(a), ConstObject::Class(b)) => {
            suite.get(*a).name().cmp(suite.get(*b).name())
        }
        (ConstObject::IntArray(a), ConstObject::IntArray(b)) => a.cmp(b),
        // Kinds differ; the kind-name key already decided.
        _ => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_with(objects: &[(ConstObject, u32)]) -> ObjectTable {
        let mut table = ObjectTable::new();
        for (obj, count) in objects {
            for _ in 0..*count {
                table.add(obj.clone());
            }
        }
        table
    }

    fn str_obj(s: &str) -> ConstObject {
        ConstObject::Str(s.to_string())
    }

    #[test]
    fn counts_accumulate_per_value() {
        let mut table = ObjectTable::new();
        table.add(str_obj("a"));
        table.add(str_obj("a"));
        table.add(str_obj("b"));
        assert_eq!(table.len(), 2);
        assert_eq!(table.counter(&str_obj("a")).unwrap().static_count(), 2);
        assert_eq!(table.counter(&str_obj("b")).unwrap().static_count(), 1);
    }

    #[test]
    fn sort_ranks_by_descending_count() {
        let suite = Suite::bootstrap("s");
        let mut table = table_with(&[(str_obj("rare"), 1), (str_obj("hot"), 5)]);
        table.sort(&suite);
        assert_eq!(table.index_of(&str_obj("hot"), false), 0);
        assert_eq!(table.index_of(&str_obj("rare"), false), 1);
    }

    #[test]
    fn equal_counts_break_ties_lexically() {
        let suite = Suite::bootstrap("s");
        // Insertion order must not matter.
        let mut table = table_with(&[(str_obj("y"), 5), (str_obj("x"), 5)]);
        table.sort(&suite);
        assert_eq!(table.index_of(&str_obj("x"), false), 0);
        assert_eq!(table.index_of(&str_obj("y"), false), 1);
    }

    #[test]
    fn kind_name_orders_across_kinds() {
        let suite = Suite::bootstrap("s");
        let arr = ConstObject::IntArray(vec![1, 2]);
        let class = ConstObject::Class(suite.object_class());
        let mut table = table_with(&[(str_obj("s"), 1), (arr.clone(), 1), (class.clone(), 1)]);
        table.sort(&suite);
        assert_eq!(table.index_of(&class, false), 0);
        assert_eq!(table.index_of(&arr, false), 1);
        assert_eq!(table.index_of(&str_obj("s"), false), 2);
    }

    #[test]
    fn int_arrays_compare_elementwise_then_by_length() {
        let suite = Suite::bootstrap("s");
        let short = ConstObject::IntArray(vec![1, 2]);
        let long = ConstObject::IntArray(vec![1, 2, 0]);
        let other = ConstObject::IntArray(vec![1, 3]);
        let mut table = table_with(&[(other.clone(), 1), (long.clone(), 1), (short.clone(), 1)]);
        table.sort(&suite);
        assert_eq!(table.index_of(&short, false), 0);
        assert_eq!(table.index_of(&long, false), 1);
        assert_eq!(table.index_of(&other, false), 2);
    }

    #[test]
    fn sort_is_reproducible_across_insertion_orders() {
        let suite = Suite::bootstrap("s");
        let mut forward = table_with(&[(str_obj("a"), 2), (str_obj("b"), 2), (str_obj("c"), 1)]);
        let mut reverse = table_with(&[(str_obj("c"), 1), (str_obj("b"), 2), (str_obj("a"), 2)]);
        forward.sort(&suite);
        reverse.sort(&suite);
        for obj in [str_obj("a"), str_obj("b"), str_obj("c")] {
            assert_eq!(
                forward.index_of(&obj, false),
                reverse.index_of(&obj, false)
            );
        }
    }

    #[test]
    fn finalize_keeps_used_entries_and_elides_dead_ones() {
        let suite = Suite::bootstrap("s");
        let mut table = table_with(&[(str_obj("used"), 1), (str_obj("dead"), 1)]);
        table.sort(&suite);
        table.index_of(&str_obj("used"), true);
        let finalized = table.finalize(true, true);
        assert!(finalized.contains(&SuiteObject::Str("used".to_string())));
        assert!(finalized.contains(&SuiteObject::DeadString));
        assert!(!finalized.contains(&SuiteObject::Str("dead".to_string())));
    }

    #[test]
    fn dead_class_needs_both_flags() {
        let suite = Suite::bootstrap("s");
        let class = ConstObject::Class(suite.object_class());
        let mut table = table_with(&[(class.clone(), 1)]);
        table.sort(&suite);

        // Class elision without string elision stays conservative.
        let kept = table.finalize(false, true);
        assert_eq!(kept, vec![SuiteObject::Class(suite.object_class())]);

        let elided = table.finalize(true, true);
        assert_eq!(elided, vec![SuiteObject::DeadClass]);
    }

    #[test]
    fn dead_strings_kept_when_class_is_excluded() {
        let suite = Suite::bootstrap("s");
        let mut table = table_with(&[(str_obj("glue"), 1)]);
        table.sort(&suite);
        let finalized = table.finalize(false, true);
        assert_eq!(finalized, vec![SuiteObject::Str("glue".to_string())]);
    }
}
