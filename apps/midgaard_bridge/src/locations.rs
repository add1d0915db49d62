use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use mushproto::Player;
use tracing::warn;

/// Room id -> display name. Entries are never evicted or replaced: a room keeps
/// its name for the life of the process.
///
/// The map sits behind an `Arc` so published snapshots can share it; inserting
/// after a snapshot was taken copies it once.
#[derive(Debug, Default, Clone)]
pub struct LocationCache {
    names: Arc<HashMap<String, String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Insert {
    Added,
    Unchanged,
    /// The id was already known under another name; the first name wins.
    Conflict,
}

impl LocationCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(&self, id: &str) -> Option<&str> {
        self.names.get(id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn insert(&mut self, id: &str, name: &str) -> Insert {
        match self.names.get(id) {
            Some(known) if known == name => Insert::Unchanged,
            Some(known) => {
                warn!(id = %id, known = %known, got = %name, "location renamed; keeping first name");
                Insert::Conflict
            }
            None => {
                Arc::make_mut(&mut self.names).insert(id.to_string(), name.to_string());
                Insert::Added
            }
        }
    }

    pub fn shared(&self) -> Arc<HashMap<String, String>> {
        self.names.clone()
    }
}

/// Room ids seen in the last roster that still need a name, oldest first.
#[derive(Debug, Default, Clone)]
pub struct UnresolvedQueue {
    ids: VecDeque<String>,
}

impl UnresolvedQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn head(&self) -> Option<&str> {
        self.ids.front().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }

    /// Replace the queue with the unknown ids of `roster`, deduplicated, in the
    /// order they first appear.
    pub fn rebuild(&mut self, roster: &[Player], cache: &LocationCache) {
        let mut seen = HashSet::new();
        self.ids = roster
            .iter()
            .map(|p| p.location_id.as_str())
            .filter(|id| cache.lookup(id).is_none() && seen.insert(*id))
            .map(str::to_string)
            .collect();
    }

    /// Drop the head if it is `id`. Replies for any other id leave the queue
    /// as it is.
    pub fn pop_if_head(&mut self, id: &str) -> bool {
        if self.head() == Some(id) {
            self.ids.pop_front();
            true
        } else {
            false
        }
    }
}
