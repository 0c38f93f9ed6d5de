use serde::{Deserialize, Serialize};

use crate::core::sequence::Sequence;

/// Reference sequences searched for off-target sites
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceCorpus {
    pub sequences: Vec<Sequence>,
}

impl ReferenceCorpus {
    #[must_use]
    pub fn new(sequences: Vec<Sequence>) -> Self {
        Self { sequences }
    }

    /// Add a sequence unless one with the same name is already present
    pub fn add(&mut self, sequence: Sequence) -> bool {
        if self.sequences.iter().any(|s| s.name == sequence.name) {
            return false;
        }
        self.sequences.push(sequence);
        true
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }

    /// Total number of bases across all sequences
    #[must_use]
    pub fn total_bases(&self) -> usize {
        self.sequences.iter().map(Sequence::len).sum()
    }

    /// MD5 over every sequence's name and bases, in order.
    ///
    /// Identifies the exact corpus a saved index was built from.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let mut context = md5::Context::new();
        for sequence in &self.sequences {
            context.consume(sequence.name.as_bytes());
            context.consume(b"\n");
            context.consume(sequence.bases());
            context.consume(b"\n");
        }
        format!("{:x}", context.compute())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seq(name: &str, bases: &str) -> Sequence {
        Sequence::parse_reference(name, bases).unwrap()
    }

    #[test]
    fn test_total_bases() {
        let corpus = ReferenceCorpus::new(vec![seq("a", "ACGT"), seq("b", "NNACG")]);
        assert_eq!(corpus.len(), 2);
        assert_eq!(corpus.total_bases(), 9);
    }

    #[test]
    fn test_add_skips_duplicate_names() {
        let mut corpus = ReferenceCorpus::new(vec![seq("a", "ACGT")]);
        assert!(!corpus.add(seq("a", "GGGG")));
        assert!(corpus.add(seq("b", "GGGG")));
        assert_eq!(corpus.len(), 2);
    }

    #[test]
    fn test_fingerprint() {
        let a = ReferenceCorpus::new(vec![seq("a", "ACGT")]);
        let b = ReferenceCorpus::new(vec![seq("a", "ACGT")]);
        let c = ReferenceCorpus::new(vec![seq("a", "ACGA")]);
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
        assert_eq!(a.fingerprint().len(), 32);
    }
}
