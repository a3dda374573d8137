mod builder;

pub use builder::KlvBuilder;

use crate::error::Error;
use crate::kwg::Kwg;
use crate::rack::Rack;
use std::convert::TryInto;
use std::fs;

/// The leave valuator (KLV): a word graph over rack multisets of size
/// 1..=7 paired with a value per accepted leave. Leaves are spelled in
/// canonical order (machine letter ascending, blank first); the graph walk
/// turns a leave into a rank by summing the word counts of branches not
/// taken, and the rank indexes `leave_values`.
#[derive(Debug, Clone)]
pub struct Klv {
    kwg: Kwg,
    word_counts: Vec<u32>,
    leave_values: Vec<f32>,
}

impl Klv {
    pub(crate) fn new(kwg: Kwg, leave_values: Vec<f32>) -> Klv {
        let word_counts = count_words(&kwg);
        Klv {
            kwg,
            word_counts,
            leave_values,
        }
    }

    /// Parse a KLV blob: little-endian `u32` node count, the packed nodes,
    /// `u32` leaf count, then `f32` leave values.
    ///
    /// ## Errors
    /// If the layout is truncated or inconsistent.
    pub fn from_bytes(bytes: &[u8]) -> Result<Klv, Error> {
        let malformed = |reason: String| Error::MalformedData {
            kind: "klv",
            reason,
        };
        let read_u32 = |pos: usize| -> Result<u32, Error> {
            bytes
                .get(pos..pos + 4)
                .map(|c| u32::from_le_bytes(c.try_into().unwrap()))
                .ok_or_else(|| malformed(String::from("truncated")))
        };
        let node_count = read_u32(0)? as usize;
        let mut pos = 4;
        if bytes.len() < pos + 4 * node_count {
            return Err(malformed(format!("{} nodes do not fit", node_count)));
        }
        let nodes: Vec<u32> = bytes[pos..pos + 4 * node_count]
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes(c.try_into().unwrap()))
            .collect();
        pos += 4 * node_count;
        let leaf_count = read_u32(pos)? as usize;
        pos += 4;
        if bytes.len() < pos + 4 * leaf_count {
            return Err(malformed(format!("{} leaves do not fit", leaf_count)));
        }
        let leave_values: Vec<f32> = bytes[pos..pos + 4 * leaf_count]
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes(c.try_into().unwrap()))
            .collect();
        Ok(Klv::new(Kwg::from_nodes(nodes), leave_values))
    }

    /// Read a KLV blob from a file.
    /// ## Errors
    /// If the file can not be read or parsed.
    pub fn from_file(path: &str) -> Result<Klv, Error> {
        let bytes = fs::read(path).map_err(|source| Error::ReadError {
            path: String::from(path),
            source,
        })?;
        Self::from_bytes(&bytes)
    }

    /// Serialize back to the on-disk format.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&(self.kwg.num_nodes() as u32).to_le_bytes());
        bytes.extend_from_slice(&self.kwg.to_bytes());
        bytes.extend_from_slice(&(self.leave_values.len() as u32).to_le_bytes());
        for v in &self.leave_values {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        bytes
    }

    /// An empty valuator: every leave is worth 0.
    #[must_use]
    pub fn zeroed() -> Klv {
        Klv::new(crate::kwg::KwgBuilder::new().build(), Vec::new())
    }

    /// The equity bonus for keeping exactly `leave`. Empty or off-table
    /// leaves are worth 0.
    pub fn leave_value(&self, leave: &Rack) -> f32 {
        if leave.is_empty() {
            return 0.0;
        }
        match self.word_index_of(leave) {
            Some(idx) => self.leave_values[idx],
            None => 0.0,
        }
    }

    /// Rank of `leave` in the graph, counting accepted leaves passed over.
    fn word_index_of(&self, leave: &Rack) -> Option<usize> {
        let kwg = &self.kwg;
        let mut node = kwg.dawg_root();
        if node == 0 {
            return None;
        }
        let mut idx = 0usize;
        let mut pending: Vec<(u8, u32)> = leave
            .present_letters()
            .map(|ml| (ml, leave.count(ml)))
            .collect();
        pending.reverse(); // pop from the low-letter end
        let mut remaining = leave.len();
        let (mut lidx, mut lcount) = pending.pop()?;

        loop {
            // scan the sibling run for the next leave letter
            while kwg.tile(node) != lidx {
                if kwg.is_end(node) {
                    return None;
                }
                idx += (self.word_counts[node as usize]
                    - self.word_counts[node as usize + 1]) as usize;
                node += 1;
            }

            lcount -= 1;
            remaining -= 1;
            if lcount == 0 {
                if let Some(next) = pending.pop() {
                    lidx = next.0;
                    lcount = next.1;
                }
            }

            if remaining == 0 {
                return if kwg.accepts(node) { Some(idx) } else { None };
            }
            if kwg.accepts(node) {
                idx += 1;
            }
            node = kwg.arc_index(node);
            if node == 0 {
                return None;
            }
        }
    }
}

/// Number of accepted leaves reachable from each sibling position onward
/// (later siblings included), the ranking support structure.
fn count_words(kwg: &Kwg) -> Vec<u32> {
    let size = kwg.num_nodes();
    let mut counts: Vec<Option<u32>> = vec![None; size];
    for p in (0..size).rev() {
        count_words_at(kwg, p, &mut counts);
    }
    counts.into_iter().map(|c| c.unwrap_or(0)).collect()
}

fn count_words_at(kwg: &Kwg, p: usize, counts: &mut Vec<Option<u32>>) -> u32 {
    if p >= kwg.num_nodes() {
        return 0;
    }
    if let Some(c) = counts[p] {
        return c;
    }
    let a = kwg.accepts(p as u32) as u32;
    let arc = kwg.arc_index(p as u32) as usize;
    let b = if arc == 0 {
        0
    } else {
        count_words_at(kwg, arc, counts)
    };
    let c = if kwg.is_end(p as u32) {
        0
    } else {
        count_words_at(kwg, p + 1, counts)
    };
    counts[p] = Some(a + b + c);
    a + b + c
}
