use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use crate::error::{ErrorKind, ParseError};

/// A handle into a [ParseState]'s string table. Stable for the lifetime of the
/// `ParseState` that produced it; never reused across independent parses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StringId(u32);

enum Entry<'s> {
    /// A view straight into the source text, added without copying.
    Borrowed(&'s str),
    /// An owned copy, sliced out of `owned_arena` by byte range.
    Owned(usize, usize),
}

/// Owns the document's source text plus a content-addressed table of interned
/// strings. Both source-text keys/values and copied-in strings (schema field
/// names, string values read off the document) share one table, so equal byte
/// content always maps to the same [StringId] regardless of which insertion
/// path produced it.
pub struct ParseState<'s> {
    source: &'s str,
    entries: Vec<Entry<'s>>,
    owned_arena: String,
    hash_to_id: HashMap<u64, StringId>,
}

impl<'s> ParseState<'s> {
    pub fn new(source: &'s str) -> Self {
        Self {
            source,
            entries: Vec::new(),
            owned_arena: String::new(),
            hash_to_id: HashMap::new(),
        }
    }

    pub fn source(&self) -> &'s str {
        self.source
    }

    fn hash_of(bytes: &[u8]) -> u64 {
        let mut hasher = DefaultHasher::new();
        bytes.hash(&mut hasher);
        hasher.finish()
    }

    /// Interns a view into the source text. No allocation on a repeat insert.
    pub fn add_str(&mut self, value: &'s str) -> StringId {
        let hash = Self::hash_of(value.as_bytes());
        if let Some(id) = self.hash_to_id.get(&hash) {
            return *id;
        }
        let id = StringId(self.entries.len() as u32);
        self.entries.push(Entry::Borrowed(value));
        self.hash_to_id.insert(hash, id);
        id
    }

    /// Interns an owned string, copying it into this state's arena. Used for
    /// strings that don't come straight from the source buffer (schema field
    /// names supplied as `&str` literals, for instance).
    pub fn add_string(&mut self, value: impl AsRef<str>) -> StringId {
        let value = value.as_ref();
        let hash = Self::hash_of(value.as_bytes());
        if let Some(id) = self.hash_to_id.get(&hash) {
            return *id;
        }
        let start = self.owned_arena.len();
        self.owned_arena.push_str(value);
        let end = self.owned_arena.len();
        let id = StringId(self.entries.len() as u32);
        self.entries.push(Entry::Owned(start, end));
        self.hash_to_id.insert(hash, id);
        id
    }

    /// Resolves an id back to its text. An out-of-range id is a reported error,
    /// never a panic or undefined read.
    pub fn lookup(&self, id: StringId) -> Result<&str, ParseError> {
        match self.entries.get(id.0 as usize) {
            Some(Entry::Borrowed(s)) => Ok(s),
            Some(Entry::Owned(start, end)) => Ok(&self.owned_arena[*start..*end]),
            None => Err(ParseError::new(
                ErrorKind::InvalidState,
                format!("string table id {} is out of range", id.0),
                0,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_is_idempotent_across_insertion_forms() {
        let mut state = ParseState::new("hello hello");
        let borrowed_a = state.add_str(&state.source()[0..5]);
        let borrowed_b = state.add_str(&state.source()[6..11]);
        assert_eq!(borrowed_a, borrowed_b);

        let owned = state.add_string("hello".to_string());
        assert_eq!(borrowed_a, owned);
    }

    #[test]
    fn distinct_content_gets_distinct_ids() {
        let mut state = ParseState::new("a b");
        let a = state.add_string("a");
        let b = state.add_string("b");
        assert_ne!(a, b);
    }

    #[test]
    fn lookup_out_of_range_is_an_error_not_a_panic() {
        let state = ParseState::new("");
        let bogus = ParseState::new("x").add_string("x");
        assert!(state.lookup(bogus).is_err());
    }

    #[test]
    fn lookup_returns_original_text() {
        let mut state = ParseState::new("irrelevant");
        let id = state.add_string("province_definitions");
        assert_eq!(state.lookup(id).unwrap(), "province_definitions");
    }
}
