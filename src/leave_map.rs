use crate::klv::Klv;
use crate::letters::MachineLetter;
use crate::rack::Rack;

/// Caches the leave value of every subset of the starting rack, indexed by
/// a bitmask with one bit per tile instance. The generator updates the
/// mask in lock-step with its rack pushes and pops, so a leave lookup at
/// record time is one array read.
#[derive(Debug, Clone, Default)]
pub struct LeaveMap {
    values: Vec<f32>,
    /// first bit of each machine letter's instances
    base_index: Vec<u32>,
    current_index: usize,
    best_value: f32,
}

impl LeaveMap {
    #[must_use]
    pub fn new() -> LeaveMap {
        LeaveMap::default()
    }

    /// Precompute the 2^n subset values for `rack`. The mask starts full:
    /// every tile on the rack is part of the leave until taken.
    pub fn init(&mut self, rack: &Rack, klv: &Klv) {
        let n = rack.len() as usize;
        self.base_index.clear();
        self.base_index.resize(rack.alphabet_size(), 0);
        let mut bit = 0u32;
        for ml in 0..rack.alphabet_size() as MachineLetter {
            self.base_index[ml as usize] = bit;
            bit += rack.count(ml);
        }
        let letters = rack.as_letters();
        self.values.clear();
        self.values.resize(1 << n, 0.0);
        self.best_value = 0.0;
        let mut subset = Rack::new(rack.alphabet_size());
        for mask in 0..(1usize << n) {
            subset.clear();
            for (bit, &ml) in letters.iter().enumerate() {
                if mask & (1 << bit) != 0 {
                    subset.add(ml);
                }
            }
            let value = klv.leave_value(&subset);
            self.values[mask] = value;
            // the full rack is not a reachable leave for a tile play
            if mask != (1 << n) - 1 && value > self.best_value {
                self.best_value = value;
            }
        }
        self.current_index = (1 << n) - 1;
    }

    /// Clear the bit of the instance just taken from the rack;
    /// `count_after` is the rack's count of `ml` after the take.
    #[inline]
    pub fn take(&mut self, ml: MachineLetter, count_after: u32) {
        self.current_index &= !(1 << (self.base_index[ml as usize] + count_after));
    }

    /// Set the bit of the instance just returned to the rack;
    /// `count_before` is the rack's count of `ml` before the add.
    #[inline]
    pub fn add(&mut self, ml: MachineLetter, count_before: u32) {
        self.current_index |= 1 << (self.base_index[ml as usize] + count_before);
    }

    /// Leave value of the tiles still on the rack.
    #[inline]
    pub fn current_value(&self) -> f32 {
        self.values[self.current_index]
    }

    /// The best leave value over every proper subset of the starting rack,
    /// an upper bound used for anchor pruning.
    #[inline]
    pub fn best_value(&self) -> f32 {
        self.best_value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distribution::LetterDistribution;
    use crate::klv::KlvBuilder;

    #[test]
    fn test_lock_step_with_rack() {
        let ld = LetterDistribution::english();
        let klv = KlvBuilder::from_leaves(
            &[("A", 1.0), ("AB", 2.0), ("ABB", 3.0), ("B", -1.0), ("BB", -2.0)],
            &ld,
        )
        .unwrap()
        .build();
        let mut rack = ld.rack_from_string("ABB").unwrap();
        let mut map = LeaveMap::new();
        map.init(&rack, &klv);

        // full rack kept
        assert_eq!(map.current_value(), 3.0);

        // play a B: leave AB
        rack.take(2);
        map.take(2, rack.count(2));
        assert_eq!(map.current_value(), 2.0);

        // play the A too: leave B
        rack.take(1);
        map.take(1, rack.count(1));
        assert_eq!(map.current_value(), -1.0);

        // put the A back
        map.add(1, rack.count(1));
        rack.add(1);
        assert_eq!(map.current_value(), 2.0);

        // put the B back
        map.add(2, rack.count(2));
        rack.add(2);
        assert_eq!(map.current_value(), 3.0);
    }

    #[test]
    fn test_matches_direct_lookup() {
        let ld = LetterDistribution::english();
        let klv = KlvBuilder::from_leaves(
            &[("E", 4.0), ("ES", 9.0), ("S", 8.0), ("EES", 5.0)],
            &ld,
        )
        .unwrap()
        .build();
        let rack = ld.rack_from_string("EES").unwrap();
        let mut map = LeaveMap::new();
        map.init(&rack, &klv);
        // every subset value agrees with a direct KLV lookup
        let letters = rack.as_letters();
        for mask in 0..(1usize << letters.len()) {
            let mut subset = crate::rack::Rack::new(ld.size());
            for (bit, &ml) in letters.iter().enumerate() {
                if mask & (1 << bit) != 0 {
                    subset.add(ml);
                }
            }
            let mut probe = map.clone();
            probe.current_index = mask;
            assert_eq!(probe.current_value(), klv.leave_value(&subset));
        }
        assert_eq!(map.best_value(), 9.0);
    }
}
