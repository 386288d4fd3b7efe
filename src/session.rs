//! The session: the ordered list of accepted statements that *is* the REPL's
//! durable program state.
//!
//! Append-only in normal operation, with a single LIFO `undo` (no redo). The
//! driver appends a tentative statement before compiling and pops it again on
//! any unrecoverable failure, so between `run` calls the session always
//! renders to a known-good program.

use serde::{Deserialize, Serialize};

use crate::statement::{classify, Scope, Statement};

/// One persisted session entry: `[rawText, scopeCode]`. Inferred return
/// types are deliberately not persisted — a reload re-derives every derived
/// field from the text and the recorded scope.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord(pub String, pub Scope);

/// Ordered, single-owner statement list. Not shared across threads.
#[derive(Debug, Default)]
pub struct Session {
    statements: Vec<Statement>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    pub fn append(&mut self, statement: Statement) {
        self.statements.push(statement);
    }

    /// Remove and return the most recently appended statement. No-op on an
    /// empty session.
    pub fn undo(&mut self) -> Option<Statement> {
        self.statements.pop()
    }

    /// Drop everything and start from scratch.
    pub fn reset(&mut self) {
        self.statements.clear();
    }

    pub fn last(&self) -> Option<&Statement> {
        self.statements.last()
    }

    pub fn last_mut(&mut self) -> Option<&mut Statement> {
        self.statements.last_mut()
    }

    /// The governing version pragma: the last `VersionPragma` statement in
    /// session order. Earlier ones are retained but superseded.
    pub fn governing_pragma(&self) -> Option<&Statement> {
        self.statements
            .iter()
            .rev()
            .find(|s| s.scope == Scope::VersionPragma)
    }

    /// The version request of the governing pragma, e.g. `^0.8.21`.
    pub fn governing_version(&self) -> Option<String> {
        self.governing_pragma()
            .and_then(|s| s.pragma_version())
            .map(str::to_string)
    }

    /// Serialize to the flat `[rawText, scopeCode]` record list.
    pub fn dump(&self) -> Vec<SessionRecord> {
        self.statements
            .iter()
            .map(|s| SessionRecord(s.raw.clone(), s.scope))
            .collect()
    }

    /// Replace the session contents by re-classifying each record with its
    /// explicit scope. Derived fields (return disposition, placeholder type)
    /// restart at their scope defaults.
    pub fn load(&mut self, records: &[SessionRecord]) {
        self.statements = records
            .iter()
            .map(|SessionRecord(text, scope)| classify(text, Some(*scope)))
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session_with(inputs: &[&str]) -> Session {
        let mut session = Session::new();
        for input in inputs {
            session.append(classify(input, None));
        }
        session
    }

    #[test]
    fn test_undo_is_lifo_and_total() {
        let mut session = session_with(&["uint a = 2", "a + 1"]);
        assert_eq!(session.len(), 2);

        let popped = session.undo().unwrap();
        assert_eq!(popped.raw, "a + 1;");
        assert_eq!(session.len(), 1);

        session.undo().unwrap();
        assert!(session.undo().is_none());
        assert!(session.is_empty());
    }

    #[test]
    fn test_governing_pragma_is_the_last_one() {
        let mut session = session_with(&[
            "pragma solidity 0.8.10",
            "uint a = 2",
            "pragma solidity ^0.8.21",
        ]);
        assert_eq!(session.governing_version().as_deref(), Some("^0.8.21"));

        // Undoing the newer pragma reinstates the older one.
        session.undo();
        assert_eq!(session.governing_version().as_deref(), Some("0.8.10"));
    }

    #[test]
    fn test_no_pragma_means_no_version() {
        let session = session_with(&["uint a = 2"]);
        assert!(session.governing_version().is_none());
    }

    #[test]
    fn test_dump_load_dump_is_a_fixed_point() {
        let session = session_with(&[
            "pragma solidity 0.8.10",
            "import \"./x.sol\"",
            "uint a = 2",
            "a",
        ]);
        let dumped = session.dump();

        let mut reloaded = Session::new();
        reloaded.load(&dumped);
        assert_eq!(reloaded.dump(), dumped);
    }

    #[test]
    fn test_load_resets_inferred_types_to_defaults() {
        let mut session = session_with(&["a"]);
        session.last_mut().unwrap().return_type = "uint".to_string();

        let dumped = session.dump();
        let mut reloaded = Session::new();
        reloaded.load(&dumped);

        // The inferred `uint` is gone; the placeholder is back.
        assert_eq!(reloaded.last().unwrap().return_type, "bool");
    }

    #[test]
    fn test_records_round_trip_through_json() {
        let session = session_with(&["pragma solidity 0.8.10", "uint a = 2"]);
        let json = serde_json::to_string(&session.dump()).unwrap();
        assert_eq!(
            json,
            "[[\"pragma solidity 0.8.10;\",\"versionPragma\"],[\"uint a = 2;\",\"main\"]]"
        );

        let records: Vec<SessionRecord> = serde_json::from_str(&json).unwrap();
        assert_eq!(records, session.dump());
    }
}
