use serde::Serialize;

/// Key of the entry created when a page is first loaded.
pub const INITIAL_KEY: &str = "load";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    pub key: &'static str,
    pub query: String,
}

/// Session history for one page: pushes never navigate, back/forward move
/// a cursor and hand back the query that is now current.
#[derive(Debug, Clone, Serialize)]
pub struct History {
    entries: Vec<HistoryEntry>,
    index: usize,
}

impl History {
    pub fn new(initial_query: &str) -> Self {
        Self {
            entries: vec![HistoryEntry {
                key: INITIAL_KEY,
                query: initial_query.to_string(),
            }],
            index: 0,
        }
    }

    /// Record a new entry after the current one, dropping any forward entries.
    pub fn push(&mut self, key: &'static str, query: String) {
        self.entries.truncate(self.index + 1);
        self.entries.push(HistoryEntry { key, query });
        self.index = self.entries.len() - 1;
    }

    pub fn current(&self) -> &HistoryEntry {
        &self.entries[self.index]
    }

    pub fn back(&mut self) -> Option<&str> {
        if self.index == 0 {
            return None;
        }
        self.index -= 1;
        Some(&self.entries[self.index].query)
    }

    pub fn forward(&mut self) -> Option<&str> {
        if self.index + 1 >= self.entries.len() {
            return None;
        }
        self.index += 1;
        Some(&self.entries[self.index].query)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
