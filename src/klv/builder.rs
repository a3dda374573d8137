//! Build a [`Klv`](super::Klv) from (leave, value) pairs at runtime.

use super::Klv;
use crate::distribution::LetterDistribution;
use crate::error::Error;
use crate::kwg::KwgBuilder;
use crate::letters::{unblanked, MachineLetter};

/// Accumulates leaves, then packs them into the KLV graph with values
/// ordered by graph rank.
#[derive(Debug, Default)]
pub struct KlvBuilder {
    // canonically sorted letters per leave
    leaves: Vec<(Vec<MachineLetter>, f32)>,
}

impl KlvBuilder {
    #[must_use]
    pub fn new() -> KlvBuilder {
        KlvBuilder::default()
    }

    /// Build from human-readable leaves ("?" for blank).
    /// ## Errors
    /// If a leave can not be parsed with the distribution.
    pub fn from_leaves(
        leaves: &[(&str, f32)],
        ld: &LetterDistribution,
    ) -> Result<KlvBuilder, Error> {
        let mut builder = KlvBuilder::new();
        for &(leave, value) in leaves {
            builder.insert(&ld.string_to_letters(leave)?, value);
        }
        Ok(builder)
    }

    /// Insert one leave. Letters are canonicalized (unblanked, ascending).
    pub fn insert(&mut self, leave: &[MachineLetter], value: f32) {
        let mut letters: Vec<MachineLetter> = leave.iter().map(|&ml| unblanked(ml)).collect();
        letters.sort_unstable();
        self.leaves.push((letters, value));
    }

    /// Pack the leaves into a KLV. The graph rank of a leave equals its
    /// lexicographic rank among the inserted leaves, so sorting here lines
    /// the value array up with the rank walk.
    #[must_use]
    pub fn build(&self) -> Klv {
        let mut sorted = self.leaves.clone();
        sorted.sort_by(|a, b| a.0.cmp(&b.0));
        sorted.dedup_by(|a, b| a.0 == b.0);
        let mut kwg = KwgBuilder::new();
        let mut values = Vec::with_capacity(sorted.len());
        for (letters, value) in &sorted {
            kwg.insert_dawg_only(letters);
            values.push(*value);
        }
        Klv::new(kwg.build(), values)
    }
}
