//! Change history retention
//!
//! Item change histories are append-only and grow with every sync. The store
//! keeps everything unless a retention policy is plugged in; the engine runs
//! the policy over every item just before persisting a list.

use crate::models::ChangeRecord;

/// Trims an item's change history in place. Records are ordered oldest first.
pub trait HistoryRetention: Send + Sync {
    fn retain(&self, history: &mut Vec<ChangeRecord>);
}

/// Keep every record
#[derive(Debug, Clone, Copy, Default)]
pub struct KeepAll;

impl HistoryRetention for KeepAll {
    fn retain(&self, _history: &mut Vec<ChangeRecord>) {}
}

impl<F> HistoryRetention for F
where
    F: Fn(&mut Vec<ChangeRecord>) + Send + Sync,
{
    fn retain(&self, history: &mut Vec<ChangeRecord>) {
        self(history)
    }
}
