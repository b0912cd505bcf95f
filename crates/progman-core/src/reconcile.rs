//! Startup reconciliation between the metadata store and the file stores.
//!
//! The script file store is authoritative for whether a program exists; the
//! metadata store is authoritative for descriptive fields. [`plan_repairs`]
//! compares listings of both and returns the repairs that restore:
//!
//! - every record has a script body (else the record is dropped),
//! - every record flagged `has_visual` has a visual body (else the flag is
//!   cleared, a body is never invented),
//! - every script body has a record (else one is synthesized),
//! - the autorun setting points at a surviving program (else it is cleared).
//!
//! Planning is pure so it can be tested against listings alone; applying the
//! plan to real stores is the manager's job.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::id::ProgramId;

/// What reconciliation needs to know about one metadata record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordState {
    pub has_visual: bool,
}

/// Listings of every store, taken at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreSnapshot {
    pub records: BTreeMap<ProgramId, RecordState>,
    pub script_ids: BTreeSet<ProgramId>,
    pub visual_ids: BTreeSet<ProgramId>,
    pub autorun_program: Option<ProgramId>,
}

/// One corrective action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Repair {
    /// The record has no script body.
    DropRecord { id: ProgramId },
    /// The record claims a visual body that does not exist.
    ClearVisualFlag { id: ProgramId },
    /// A script body exists with no record; synthesize one.
    AdoptScript { id: ProgramId, has_visual: bool },
    /// The autorun setting points at a program that will not exist.
    ClearAutorun { id: ProgramId },
}

impl fmt::Display for Repair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Repair::DropRecord { id } => {
                write!(f, "removing program \"{id}\" from metadata since it has no script file")
            }
            Repair::ClearVisualFlag { id } => {
                write!(f, "no visual file found for \"{id}\", clearing its visual flag")
            }
            Repair::AdoptScript { id, has_visual } => write!(
                f,
                "adopting script file \"{id}\" not referenced in metadata (visual: {has_visual})"
            ),
            Repair::ClearAutorun { id } => {
                write!(f, "autorun pointed at missing program \"{id}\", resetting it")
            }
        }
    }
}

/// Computes the repairs needed to make `snapshot` consistent.
pub fn plan_repairs(snapshot: &StoreSnapshot) -> Vec<Repair> {
    let mut repairs = Vec::new();

    for (id, state) in &snapshot.records {
        if !snapshot.script_ids.contains(id) {
            repairs.push(Repair::DropRecord { id: id.clone() });
        } else if state.has_visual && !snapshot.visual_ids.contains(id) {
            repairs.push(Repair::ClearVisualFlag { id: id.clone() });
        }
    }

    for id in &snapshot.script_ids {
        if !snapshot.records.contains_key(id) {
            repairs.push(Repair::AdoptScript {
                id: id.clone(),
                has_visual: snapshot.visual_ids.contains(id),
            });
        }
    }

    if let Some(id) = &snapshot.autorun_program {
        // After the passes above, the surviving programs are exactly the
        // script ids.
        if !snapshot.script_ids.contains(id) {
            repairs.push(Repair::ClearAutorun { id: id.clone() });
        }
    }

    repairs
}

impl StoreSnapshot {
    /// The snapshot the stores would present after applying `repairs`.
    pub fn apply(&self, repairs: &[Repair]) -> StoreSnapshot {
        let mut next = self.clone();
        for repair in repairs {
            match repair {
                Repair::DropRecord { id } => {
                    next.records.remove(id);
                }
                Repair::ClearVisualFlag { id } => {
                    if let Some(state) = next.records.get_mut(id) {
                        state.has_visual = false;
                    }
                }
                Repair::AdoptScript { id, has_visual } => {
                    next.records.insert(
                        id.clone(),
                        RecordState {
                            has_visual: *has_visual,
                        },
                    );
                }
                Repair::ClearAutorun { .. } => {
                    next.autorun_program = None;
                }
            }
        }
        next
    }

    /// True when no invariant is violated.
    pub fn is_consistent(&self) -> bool {
        plan_repairs(self).is_empty()
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn id(raw: &str) -> ProgramId {
        ProgramId::parse(raw).unwrap()
    }

    fn ids(raw: &[&str]) -> BTreeSet<ProgramId> {
        raw.iter().map(|r| id(r)).collect()
    }

    #[test]
    fn record_without_script_is_dropped() {
        let mut snapshot = StoreSnapshot::default();
        snapshot.records.insert(id("gone"), RecordState { has_visual: true });
        snapshot.visual_ids = ids(&["gone"]);

        assert_eq!(plan_repairs(&snapshot), vec![Repair::DropRecord { id: id("gone") }]);
    }

    #[test]
    fn dangling_visual_flag_is_cleared_not_dropped() {
        let mut snapshot = StoreSnapshot::default();
        snapshot.records.insert(id("p"), RecordState { has_visual: true });
        snapshot.script_ids = ids(&["p"]);

        assert_eq!(plan_repairs(&snapshot), vec![Repair::ClearVisualFlag { id: id("p") }]);
    }

    #[test]
    fn orphan_scripts_are_adopted_with_inferred_visual() {
        let snapshot = StoreSnapshot {
            script_ids: ids(&["b", "a"]),
            visual_ids: ids(&["b"]),
            ..Default::default()
        };

        assert_eq!(
            plan_repairs(&snapshot),
            vec![
                Repair::AdoptScript { id: id("a"), has_visual: false },
                Repair::AdoptScript { id: id("b"), has_visual: true },
            ]
        );
    }

    #[test]
    fn orphan_visual_files_are_left_alone() {
        let snapshot = StoreSnapshot {
            visual_ids: ids(&["lonely"]),
            ..Default::default()
        };
        assert!(plan_repairs(&snapshot).is_empty());
    }

    #[test]
    fn autorun_follows_dropped_record() {
        let mut snapshot = StoreSnapshot::default();
        snapshot.records.insert(id("gone"), RecordState { has_visual: false });
        snapshot.autorun_program = Some(id("gone"));

        assert_eq!(
            plan_repairs(&snapshot),
            vec![
                Repair::DropRecord { id: id("gone") },
                Repair::ClearAutorun { id: id("gone") },
            ]
        );
    }

    #[test]
    fn autorun_on_adopted_program_is_kept() {
        let snapshot = StoreSnapshot {
            script_ids: ids(&["found"]),
            autorun_program: Some(id("found")),
            ..Default::default()
        };
        assert_eq!(
            plan_repairs(&snapshot),
            vec![Repair::AdoptScript { id: id("found"), has_visual: false }]
        );
    }

    fn arb_id() -> impl Strategy<Value = ProgramId> {
        prop::sample::select(vec!["a", "b", "c", "d", "e", "f"]).prop_map(id)
    }

    fn arb_snapshot() -> impl Strategy<Value = StoreSnapshot> {
        (
            prop::collection::btree_map(arb_id(), any::<bool>(), 0..6),
            prop::collection::btree_set(arb_id(), 0..6),
            prop::collection::btree_set(arb_id(), 0..6),
            prop::option::of(arb_id()),
        )
            .prop_map(|(records, script_ids, visual_ids, autorun_program)| StoreSnapshot {
                records: records
                    .into_iter()
                    .map(|(id, has_visual)| (id, RecordState { has_visual }))
                    .collect(),
                script_ids,
                visual_ids,
                autorun_program,
            })
    }

    proptest! {
        #[test]
        fn second_pass_finds_nothing(snapshot in arb_snapshot()) {
            let repaired = snapshot.apply(&plan_repairs(&snapshot));
            prop_assert!(plan_repairs(&repaired).is_empty());
        }

        #[test]
        fn repaired_snapshot_satisfies_invariants(snapshot in arb_snapshot()) {
            let repaired = snapshot.apply(&plan_repairs(&snapshot));
            for (id, state) in &repaired.records {
                prop_assert!(repaired.script_ids.contains(id));
                if state.has_visual {
                    prop_assert!(repaired.visual_ids.contains(id));
                }
            }
            for id in &repaired.script_ids {
                prop_assert!(repaired.records.contains_key(id));
            }
            if let Some(id) = &repaired.autorun_program {
                prop_assert!(repaired.records.contains_key(id));
            }
        }

        #[test]
        fn files_are_never_touched(snapshot in arb_snapshot()) {
            let repaired = snapshot.apply(&plan_repairs(&snapshot));
            prop_assert_eq!(&repaired.script_ids, &snapshot.script_ids);
            prop_assert_eq!(&repaired.visual_ids, &snapshot.visual_ids);
        }
    }
}
