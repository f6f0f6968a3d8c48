//! Buffered write batches.

/// A key/value pair as stored in a backend.
pub type KeyValue = (Vec<u8>, Vec<u8>);

/// A batch of additions and deletions against one store.
///
/// Deletions are applied before additions, so a batch that deletes and
/// re-adds the same key leaves the addition in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mutation {
    additions: Vec<KeyValue>,
    deletions: Vec<Vec<u8>>,
}

impl Mutation {
    /// Creates an empty mutation.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a mutation holding a single addition.
    #[must_use]
    pub fn put(key: Vec<u8>, value: Vec<u8>) -> Self {
        Self {
            additions: vec![(key, value)],
            deletions: Vec::new(),
        }
    }

    /// Creates a mutation holding a single deletion.
    #[must_use]
    pub fn delete(key: Vec<u8>) -> Self {
        Self {
            additions: Vec::new(),
            deletions: vec![key],
        }
    }

    /// Adds a key/value pair.
    pub fn add(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.additions.push((key, value));
    }

    /// Adds a deletion.
    pub fn remove(&mut self, key: Vec<u8>) {
        self.deletions.push(key);
    }

    /// Appends all entries of `other` to this mutation.
    pub fn merge(&mut self, other: Mutation) {
        self.additions.extend(other.additions);
        self.deletions.extend(other.deletions);
    }

    /// Returns the additions.
    #[must_use]
    pub fn additions(&self) -> &[KeyValue] {
        &self.additions
    }

    /// Returns the deletions.
    #[must_use]
    pub fn deletions(&self) -> &[Vec<u8>] {
        &self.deletions
    }

    /// Returns the number of entries (additions plus deletions).
    #[must_use]
    pub fn len(&self) -> usize {
        self.additions.len() + self.deletions.len()
    }

    /// Returns true if the mutation has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.additions.is_empty() && self.deletions.is_empty()
    }

    /// Splits the mutation into its additions and deletions.
    #[must_use]
    pub fn into_parts(self) -> (Vec<KeyValue>, Vec<Vec<u8>>) {
        (self.additions, self.deletions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_mutation_is_empty() {
        let m = Mutation::new();
        assert!(m.is_empty());
        assert_eq!(m.len(), 0);
    }

    #[test]
    fn merge_concatenates() {
        let mut a = Mutation::put(b"a".to_vec(), b"1".to_vec());
        let mut b = Mutation::delete(b"b".to_vec());
        b.add(b"c".to_vec(), b"3".to_vec());
        a.merge(b);

        assert_eq!(a.len(), 3);
        assert_eq!(a.additions().len(), 2);
        assert_eq!(a.deletions(), &[b"b".to_vec()]);
    }
}
