//! In-memory index of merged programs, keyed by id.
//!
//! Rebuilt once after reconciliation and then kept in step with every
//! mutation by its single owner, the program manager. Iteration follows
//! insertion order so listings are stable between calls.

use indexmap::IndexMap;

use crate::id::ProgramId;
use crate::program::Program;

#[derive(Debug, Clone, Default)]
pub struct ProgramIndex {
    programs: IndexMap<ProgramId, Program>,
}

impl ProgramIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole index.
    pub fn rebuild(&mut self, programs: impl IntoIterator<Item = Program>) {
        self.programs = programs.into_iter().map(|p| (p.id.clone(), p)).collect();
    }

    /// Inserts or replaces a program. A replaced entry keeps its position.
    pub fn upsert(&mut self, program: Program) {
        self.programs.insert(program.id.clone(), program);
    }

    pub fn remove(&mut self, id: &ProgramId) -> Option<Program> {
        self.programs.shift_remove(id)
    }

    pub fn get(&self, id: &ProgramId) -> Option<&Program> {
        self.programs.get(id)
    }

    pub fn contains(&self, id: &ProgramId) -> bool {
        self.programs.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.programs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.programs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Program> {
        self.programs.values()
    }

    pub fn to_vec(&self) -> Vec<Program> {
        self.programs.values().cloned().collect()
    }
}

impl FromIterator<Program> for ProgramIndex {
    fn from_iter<I: IntoIterator<Item = Program>>(iter: I) -> Self {
        let mut index = ProgramIndex::new();
        index.rebuild(iter);
        index
    }
}
