use std::collections::hash_map;
use std::collections::HashMap;
use std::fmt;

use super::Record;

/// Keyed store of one domain's records.
pub struct Collection<R: Record> {
    entries: HashMap<R::Key, R>,
}

impl<R: Record> Collection<R> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Inserts `record`, replacing any entry with the same key.
    ///
    /// Returns `true` when the key was not present before.
    pub fn upsert(
        &mut self,
        record: R,
    ) -> bool {
        self.entries.insert(record.key(), record).is_none()
    }

    pub fn get(
        &self,
        key: &R::Key,
    ) -> Option<&R> {
        self.entries.get(key)
    }

    pub fn contains(
        &self,
        key: &R::Key,
    ) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> hash_map::Values<'_, R::Key, R> {
        self.entries.values()
    }

    pub fn keys(&self) -> hash_map::Keys<'_, R::Key, R> {
        self.entries.keys()
    }
}

impl<R: Record> Default for Collection<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Record> Clone for Collection<R> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
        }
    }
}

impl<R: Record> fmt::Debug for Collection<R> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("Collection")
            .field("domain", &R::DOMAIN)
            .field("len", &self.entries.len())
            .finish()
    }
}

impl<'a, R: Record> IntoIterator for &'a Collection<R> {
    type Item = &'a R;
    type IntoIter = hash_map::Values<'a, R::Key, R>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
