//! In-memory book catalog
//!
//! The catalog holds one immutable snapshot behind a lock that is only ever
//! held for an `Arc` clone or a pointer swap. Readers keep whatever snapshot
//! they cloned, so a concurrent `replace` never shows them a partial list.

use std::collections::BTreeSet;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};

use crate::domain::BookRecord;

#[derive(Debug, Clone)]
struct Snapshot {
    books: Arc<[BookRecord]>,
    installed_at: Option<DateTime<Utc>>,
}

/// Current set of normalized books
#[derive(Debug)]
pub struct Catalog {
    current: RwLock<Snapshot>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}

impl Catalog {
    pub fn new() -> Self {
        Self {
            current: RwLock::new(Snapshot {
                books: Arc::from(Vec::new()),
                installed_at: None,
            }),
        }
    }

    fn read(&self) -> Snapshot {
        // A poisoned lock still holds a complete snapshot
        match self.current.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Install a new snapshot, replacing the old one wholesale
    pub fn replace(&self, books: Vec<BookRecord>) {
        let next = Snapshot {
            books: Arc::from(books),
            installed_at: Some(Utc::now()),
        };
        match self.current.write() {
            Ok(mut guard) => *guard = next,
            Err(poisoned) => *poisoned.into_inner() = next,
        }
    }

    /// Shared view of the current snapshot
    pub fn snapshot(&self) -> Arc<[BookRecord]> {
        self.read().books
    }

    /// Distinct category labels in the current snapshot
    pub fn categories(&self) -> BTreeSet<String> {
        self.snapshot().iter().map(|b| b.category.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }

    /// When the current snapshot was installed; `None` before the first refresh
    pub fn refreshed_at(&self) -> Option<DateTime<Utc>> {
        self.read().installed_at
    }

    /// Book by 1-based position in the current snapshot
    pub fn get(&self, id: usize) -> Option<BookRecord> {
        id.checked_sub(1)
            .and_then(|index| self.snapshot().get(index).cloned())
    }
}
