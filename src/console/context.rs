use crate::components::rows::{Collection, RowKey};
use std::collections::HashMap;
use url::Url;

/// State scoped to one loaded page: its address, locale and row counters.
///
/// Counters only ever grow, so a key handed out once is never handed out
/// again while the page lives.
#[derive(Debug, Clone)]
pub struct PageSession {
    page_url: Url,
    locale: String,
    counters: HashMap<Collection, u32>,
}

impl PageSession {
    pub fn new(page_url: Url, locale: impl Into<String>) -> Self {
        Self {
            page_url,
            locale: locale.into(),
            counters: HashMap::new(),
        }
    }

    pub fn page_url(&self) -> &Url {
        &self.page_url
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    /// Make sure the next key of `collection` is at least `next`
    pub fn seed(&mut self, collection: Collection, next: u32) {
        let counter = self.counters.entry(collection).or_insert(0);
        *counter = (*counter).max(next);
    }

    pub fn next_key(&mut self, collection: Collection) -> RowKey {
        let counter = self.counters.entry(collection).or_insert(0);
        let key = RowKey::new(collection, *counter);
        *counter += 1;
        key
    }

    /// Index the next key of `collection` will get
    pub fn peek(&self, collection: Collection) -> u32 {
        self.counters.get(&collection).copied().unwrap_or(0)
    }
}
