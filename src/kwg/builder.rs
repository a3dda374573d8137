//! Build a packed [`Kwg`](super::Kwg) from a word list at runtime, so
//! small lexicons need no external data files.

use super::Kwg;
use crate::distribution::LetterDistribution;
use crate::error::Error;
use crate::letters::{MachineLetter, SEPARATOR};
use std::collections::BTreeMap;

const ARC_LIMIT: usize = 1 << 22;

#[derive(Debug, Default)]
struct TrieNode {
    children: BTreeMap<MachineLetter, usize>,
    terminal: bool,
}

/// Accumulates words, then packs the trie into the KWG node format.
///
/// Every word contributes its plain DAWG path plus, for each split point,
/// the GADDAG path (reversed prefix, separator, suffix). Sibling runs are
/// sorted ascending by letter, which puts the separator arc first.
#[derive(Debug)]
pub struct KwgBuilder {
    trie: Vec<TrieNode>,
    dawg_root: usize,
    gaddag_root: usize,
}

impl Default for KwgBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl KwgBuilder {
    #[must_use]
    pub fn new() -> KwgBuilder {
        KwgBuilder {
            trie: vec![TrieNode::default(), TrieNode::default()],
            dawg_root: 0,
            gaddag_root: 1,
        }
    }

    /// Build from human-readable words.
    /// ## Errors
    /// If a word can not be parsed with the distribution.
    pub fn from_words(words: &[&str], ld: &LetterDistribution) -> Result<KwgBuilder, Error> {
        let mut builder = KwgBuilder::new();
        for &word in words {
            builder.insert(&ld.string_to_letters(word)?);
        }
        Ok(builder)
    }

    /// Insert one word given as machine letters.
    pub fn insert(&mut self, word: &[MachineLetter]) {
        if word.is_empty() {
            return;
        }
        self.insert_path(self.dawg_root, word);
        let mut entry: Vec<MachineLetter> = Vec::with_capacity(word.len() + 1);
        for split in 1..=word.len() {
            entry.clear();
            entry.extend(word[..split].iter().rev());
            if split < word.len() {
                entry.push(SEPARATOR);
                entry.extend_from_slice(&word[split..]);
            }
            self.insert_path(self.gaddag_root, &entry);
        }
    }

    /// Insert only the DAWG path. The leave valuator's graph has no
    /// GADDAG side.
    pub fn insert_dawg_only(&mut self, word: &[MachineLetter]) {
        if !word.is_empty() {
            self.insert_path(self.dawg_root, word);
        }
    }

    fn insert_path(&mut self, root: usize, path: &[MachineLetter]) {
        let mut node = root;
        for &ml in path {
            node = match self.trie[node].children.get(&ml) {
                Some(&child) => child,
                None => {
                    let child = self.trie.len();
                    self.trie.push(TrieNode::default());
                    self.trie[node].children.insert(ml, child);
                    child
                }
            };
        }
        self.trie[node].terminal = true;
    }

    /// Pack into the node array. Children of each node become one
    /// contiguous sibling run; the last sibling carries the end-of-run bit,
    /// terminal children the accepts bit.
    #[must_use]
    pub fn build(&self) -> Kwg {
        // headers: node 0 arcs to the dawg root run, node 1 to the gaddag
        // root run
        let mut nodes: Vec<u32> = vec![0x40_0000, 0x40_0000];
        let mut queue: std::collections::VecDeque<(usize, usize)> =
            std::collections::VecDeque::new();
        queue.push_back((self.dawg_root, 0));
        queue.push_back((self.gaddag_root, 1));
        while let Some((tid, patch)) = queue.pop_front() {
            let children = &self.trie[tid].children;
            if children.is_empty() {
                continue;
            }
            let start = nodes.len();
            assert!(start < ARC_LIMIT, "kwg overflows 22-bit arc indices");
            nodes[patch] |= start as u32;
            let last = children.len() - 1;
            for (k, (&letter, &child)) in children.iter().enumerate() {
                let mut val = (letter as u32) << 24;
                if self.trie[child].terminal {
                    val |= 0x80_0000;
                }
                if k == last {
                    val |= 0x40_0000;
                }
                nodes.push(val);
                queue.push_back((child, nodes.len() - 1));
            }
        }
        Kwg::from_nodes(nodes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_builder() {
        let kwg = KwgBuilder::new().build();
        assert_eq!(kwg.root(), 0);
        assert_eq!(kwg.dawg_root(), 0);
    }

    #[test]
    fn test_sibling_runs_sorted() {
        let mut builder = KwgBuilder::new();
        builder.insert(&[3, 1]); // CA
        builder.insert(&[2, 1]); // BA
        let kwg = builder.build();
        let root = kwg.dawg_root();
        assert_eq!(kwg.tile(root), 2);
        assert!(!kwg.is_end(root));
        assert_eq!(kwg.tile(root + 1), 3);
        assert!(kwg.is_end(root + 1));
    }
}
