use std::collections::HashMap;

use crate::types::*;
use crate::undo::undo_last_stroke;

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum StoreError {
    #[error("identity `{0}` never sent init")]
    UnknownIdentity(Identity),
}

/// Per-identity action logs. Logs are kept in first-seen order so snapshots
/// replay identities the same way every time; entries live as long as the
/// store does.
#[derive(Debug, Default)]
pub struct SessionStore {
    logs: Vec<(Identity, Vec<Action>)>,
    idx_by_identity: HashMap<Identity, usize>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty log for `identity` if there is none. Returns `true`
    /// when a log was created.
    pub fn ensure(&mut self, identity: &str) -> bool {
        if self.idx_by_identity.contains_key(identity) {
            return false;
        }
        self.idx_by_identity
            .insert(identity.to_owned(), self.logs.len());
        self.logs.push((identity.to_owned(), Vec::new()));
        true
    }

    pub fn append(&mut self, identity: &str, action: Action) -> Result<(), StoreError> {
        self.log_mut(identity)?.push(action);
        Ok(())
    }

    pub fn clear(&mut self, identity: &str) -> Result<(), StoreError> {
        self.log_mut(identity)?.clear();
        Ok(())
    }

    /// Removes the last stroke of `identity`; see [`undo_last_stroke`].
    pub fn undo(&mut self, identity: &str) -> Result<usize, StoreError> {
        self.log_mut(identity).map(undo_last_stroke)
    }

    pub fn log(&self, identity: &str) -> Option<&[Action]> {
        self.idx_by_identity
            .get(identity)
            .map(|idx| self.logs[*idx].1.as_slice())
    }

    pub fn contains(&self, identity: &str) -> bool {
        self.idx_by_identity.contains_key(identity)
    }

    pub fn snapshot(&self) -> Snapshot {
        self.logs.iter().map(|(_, log)| log.clone()).collect()
    }

    pub fn identity_count(&self) -> usize {
        self.logs.len()
    }

    pub fn action_count(&self) -> usize {
        self.logs.iter().map(|(_, log)| log.len()).sum()
    }

    fn log_mut(&mut self, identity: &str) -> Result<&mut Vec<Action>, StoreError> {
        match self.idx_by_identity.get(identity) {
            Some(idx) => Ok(&mut self.logs[*idx].1),
            None => Err(StoreError::UnknownIdentity(identity.to_owned())),
        }
    }
}
