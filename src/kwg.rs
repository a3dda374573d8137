mod builder;

pub use builder::KwgBuilder;

use crate::error::Error;
use crate::letters::{unblanked, MachineLetter, SEPARATOR};
use std::convert::TryInto;
use std::fmt;
use std::fs;

/// A packed word graph (KWG): DAWG and GADDAG in one node array.
///
/// Each node is one 32-bit word: `letter` in the top 8 bits, `accepts` at
/// bit 23, `is_end_of_sibling_list` at bit 22, and a 22-bit `arc_index`
/// into the same array. Node 0 is an unused sentinel whose arc index is the
/// DAWG root; node 1's arc index is the GADDAG root. A node index always
/// names the first entry of a sibling run; an arc index of 0 means "no
/// child".
///
/// The GADDAG property: for every word `w1..wn` and split point `i`, the
/// path `wi wi-1 .. w1 ^ wi+1 .. wn` is accepted, which lets the move
/// generator extend from a mid-word anchor in both directions with a
/// single graph walk.
#[derive(Debug, Clone)]
pub struct Kwg {
    nodes: Vec<u32>,
}

const ACCEPTS_BIT: u32 = 0x80_0000;
const IS_END_BIT: u32 = 0x40_0000;
const ARC_MASK: u32 = 0x3f_ffff;

impl fmt::Display for Kwg {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "<Kwg: {} nodes>", self.nodes.len())
    }
}

impl Kwg {
    pub(crate) fn from_nodes(nodes: Vec<u32>) -> Kwg {
        Kwg { nodes }
    }

    /// Parse a raw little-endian packed node array. The file format has no
    /// header: the size is `4 * num_nodes`.
    ///
    /// ## Errors
    /// If the byte length is not a multiple of 4 or the array is too short
    /// to hold the two root sentinels.
    pub fn from_bytes(bytes: &[u8]) -> Result<Kwg, Error> {
        if bytes.len() % 4 != 0 {
            return Err(Error::MalformedData {
                kind: "kwg",
                reason: format!("length {} is not a multiple of 4", bytes.len()),
            });
        }
        let nodes: Vec<u32> = bytes
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes(c.try_into().unwrap()))
            .collect();
        if nodes.len() < 2 {
            return Err(Error::MalformedData {
                kind: "kwg",
                reason: String::from("fewer than 2 nodes"),
            });
        }
        Ok(Kwg { nodes })
    }

    /// Read a packed node array from a file.
    /// ## Errors
    /// If the file can not be read or parsed.
    pub fn from_file(path: &str) -> Result<Kwg, Error> {
        let bytes = fs::read(path).map_err(|source| Error::ReadError {
            path: String::from(path),
            source,
        })?;
        Self::from_bytes(&bytes)
    }

    /// Serialize back to the on-disk format.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.nodes.iter().flat_map(|n| n.to_le_bytes()).collect()
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn tile(&self, node: u32) -> MachineLetter {
        (self.nodes[node as usize] >> 24) as MachineLetter
    }

    #[inline]
    pub fn accepts(&self, node: u32) -> bool {
        self.nodes[node as usize] & ACCEPTS_BIT != 0
    }

    #[inline]
    pub fn is_end(&self, node: u32) -> bool {
        self.nodes[node as usize] & IS_END_BIT != 0
    }

    #[inline]
    pub fn arc_index(&self, node: u32) -> u32 {
        self.nodes[node as usize] & ARC_MASK
    }

    /// The GADDAG root.
    #[inline]
    pub fn root(&self) -> u32 {
        self.arc_index(1)
    }

    /// The DAWG root (used by the leave valuator and prefix checks).
    #[inline]
    pub fn dawg_root(&self) -> u32 {
        self.arc_index(0)
    }

    /// Walk the sibling run starting at `node` for `letter`; returns the
    /// matching sibling's arc index, or 0 if no such arc. Callers must not
    /// follow a zero arc.
    #[inline]
    pub fn next_node(&self, node: u32, letter: MachineLetter) -> u32 {
        let letter = unblanked(letter);
        let mut i = node;
        loop {
            if self.tile(i) == letter {
                return self.arc_index(i);
            }
            if self.is_end(i) {
                return 0;
            }
            i += 1;
        }
    }

    /// Bitmask over machine letters `l` for which a sibling of `node` has
    /// `letter == l` and accepts.
    pub fn letter_set(&self, node: u32) -> u64 {
        let mut set = 0u64;
        let mut i = node;
        loop {
            let t = self.tile(i);
            if self.accepts(i) && t != SEPARATOR {
                set |= 1 << t;
            }
            if self.is_end(i) {
                return set;
            }
            i += 1;
        }
    }

    #[inline]
    pub fn in_letter_set(&self, node: u32, letter: MachineLetter) -> bool {
        let letter = unblanked(letter);
        let mut i = node;
        loop {
            if self.tile(i) == letter {
                return self.accepts(i);
            }
            if self.is_end(i) {
                return false;
            }
            i += 1;
        }
    }

    /// Check a full word against the DAWG side.
    pub fn accepts_word(&self, word: &[MachineLetter]) -> bool {
        if word.is_empty() {
            return false;
        }
        let mut node = self.dawg_root();
        for (i, &ml) in word.iter().enumerate() {
            if node == 0 {
                return false;
            }
            if i == word.len() - 1 {
                return self.in_letter_set(node, ml);
            }
            node = self.next_node(node, ml);
        }
        unreachable!()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distribution::LetterDistribution;

    fn build(words: &[&str]) -> Kwg {
        let ld = LetterDistribution::english();
        KwgBuilder::from_words(words, &ld).unwrap().build()
    }

    #[test]
    fn test_accepts_word() {
        let kwg = build(&["CARE", "CAR", "AREA"]);
        let ld = LetterDistribution::english();
        for &w in &["CARE", "CAR", "AREA"] {
            assert!(kwg.accepts_word(&ld.string_to_letters(w).unwrap()), "{}", w);
        }
        for &w in &["CA", "ARE", "CAREA", "REA"] {
            assert!(!kwg.accepts_word(&ld.string_to_letters(w).unwrap()), "{}", w);
        }
    }

    #[test]
    fn test_gaddag_paths() {
        // every split of CARE must be walkable: reversed prefix, separator,
        // then the suffix, accepting on the last letter.
        let kwg = build(&["CARE"]);
        let ld = LetterDistribution::english();
        let word = ld.string_to_letters("CARE").unwrap();
        for split in 1..=word.len() {
            let mut node = kwg.root();
            let mut path: Vec<MachineLetter> = word[..split].iter().rev().copied().collect();
            if split < word.len() {
                path.push(SEPARATOR);
                path.extend_from_slice(&word[split..]);
            }
            for (i, &ml) in path.iter().enumerate() {
                if i == path.len() - 1 {
                    assert!(kwg.in_letter_set(node, ml), "split {}", split);
                } else {
                    node = kwg.next_node(node, ml);
                    assert_ne!(node, 0, "split {} dead-ends at {}", split, i);
                }
            }
        }
    }

    #[test]
    fn test_letter_set() {
        let kwg = build(&["AB", "AD", "AX"]);
        let ld = LetterDistribution::english();
        let node = kwg.next_node(kwg.dawg_root(), ld.string_to_letters("A").unwrap()[0]);
        let set = kwg.letter_set(node);
        let expected: u64 = [2u8, 4, 24].iter().map(|&ml| 1 << ml).sum();
        assert_eq!(set, expected);
        assert!(kwg.in_letter_set(node, 2));
        assert!(!kwg.in_letter_set(node, 3));
    }

    #[test]
    fn test_binary_round_trip() {
        let kwg = build(&["QI", "QIS", "AA"]);
        let reparsed = Kwg::from_bytes(&kwg.to_bytes()).unwrap();
        assert_eq!(kwg.nodes, reparsed.nodes);
    }

    #[test]
    fn test_zero_arc_means_no_child() {
        let kwg = build(&["AB"]);
        let ld = LetterDistribution::english();
        let a = ld.string_to_letters("A").unwrap()[0];
        let z = ld.string_to_letters("Z").unwrap()[0];
        assert_eq!(kwg.next_node(kwg.dawg_root(), z), 0);
        let node = kwg.next_node(kwg.dawg_root(), a);
        assert_ne!(node, 0);
        // B accepts but has no further children
        assert_eq!(kwg.next_node(node, 2), 0);
    }
}
