//! The canonical locator: the address that carries `session_id` between loads.

use url::Url;

/// The query parameter the session id lives in.
pub const SESSION_PARAM: &str = "session_id";

/// Something that owns the current address and a navigation history.
///
/// `replace` rewrites the current entry in place; `push` adds a new entry so
/// back-navigation can return to the previous one.
pub trait Locator {
    fn current(&self) -> &Url;
    fn replace(&mut self, url: Url);
    fn push(&mut self, url: Url);
    /// Moves one entry back. Returns the new current address, or `None` at the start.
    fn back(&mut self) -> Option<&Url>;
}

/// Returns the first non-empty value of `key` in the query string.
pub fn query_param(url: &Url, key: &str) -> Option<String> {
    url.query_pairs()
        .find(|(k, v)| k == key && !v.is_empty())
        .map(|(_, v)| v.into_owned())
}

/// Returns a copy of `url` whose query carries `session_id` and otherwise
/// keeps the existing parameters.
pub fn with_session_id(url: &Url, session_id: &str) -> Url {
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != SESSION_PARAM)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    let mut next = url.clone();
    next.set_query(None);
    {
        let mut pairs = next.query_pairs_mut();
        pairs.extend_pairs(kept);
        pairs.append_pair(SESSION_PARAM, session_id);
    }
    next
}

/// An in-memory history stack with browser semantics.
#[derive(Debug, Clone)]
pub struct HistoryLocator {
    entries: Vec<Url>,
    cursor: usize,
}

impl HistoryLocator {
    pub fn new(start: Url) -> Self {
        Self {
            entries: vec![start],
            cursor: 0,
        }
    }

    /// Number of entries in the history, including ones ahead of the cursor.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Locator for HistoryLocator {
    fn current(&self) -> &Url {
        &self.entries[self.cursor]
    }

    fn replace(&mut self, url: Url) {
        self.entries[self.cursor] = url;
    }

    fn push(&mut self, url: Url) {
        self.entries.truncate(self.cursor + 1);
        self.entries.push(url);
        self.cursor = self.entries.len() - 1;
    }

    fn back(&mut self) -> Option<&Url> {
        if self.cursor == 0 {
            return None;
        }
        self.cursor -= 1;
        Some(&self.entries[self.cursor])
    }
}
