//! Responses the user chose to keep.

use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedResponse {
    pub response: String,
    pub timestamp: DateTime<Utc>,
    pub profile: String,
}

/// Storage for saved responses. Entries are unique by `response` text.
pub trait SavedResponseStore: Send + Sync {
    fn list(&self) -> Vec<SavedResponse>;
    fn contains(&self, response: &str) -> bool;
    /// Returns false when an entry with the same text already exists.
    fn save(&self, entry: SavedResponse) -> bool;
}

#[derive(Debug, Default)]
pub struct MemorySavedResponses {
    entries: Mutex<Vec<SavedResponse>>,
}

impl MemorySavedResponses {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, Vec<SavedResponse>> {
        match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl SavedResponseStore for MemorySavedResponses {
    fn list(&self) -> Vec<SavedResponse> {
        self.entries().clone()
    }

    fn contains(&self, response: &str) -> bool {
        self.entries().iter().any(|e| e.response == response)
    }

    fn save(&self, entry: SavedResponse) -> bool {
        let mut entries = self.entries();
        if entries.iter().any(|e| e.response == entry.response) {
            return false;
        }
        entries.push(entry);
        true
    }
}
