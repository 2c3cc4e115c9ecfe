//! User-visible, non-fatal messages.
//!
//! Precondition rejections and task failures never raise errors; they land
//! here for the host UI to surface, and the requester stays free to retry.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NoticeLog {
    entries: Vec<String>,
}

impl NoticeLog {
    pub fn push(&mut self, notice: impl Into<String>) {
        self.entries.push(notice.into());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|s| s.as_str())
    }

    /// Any notice mentioning `pattern`?
    pub fn contains(&self, pattern: &str) -> bool {
        self.entries.iter().any(|n| n.contains(pattern))
    }

    /// Hand all pending notices to the host, emptying the log.
    pub fn drain(&mut self) -> Vec<String> {
        std::mem::take(&mut self.entries)
    }
}
