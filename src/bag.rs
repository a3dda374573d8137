use crate::distribution::LetterDistribution;
use crate::letters::{is_blanked, MachineLetter, BLANK_LETTER};
use crate::rack::Rack;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

/// The tile bag. Tiles live in a flat array; drawing swaps the drawn tile
/// to the end, adding inserts at a random index. The PRNG is part of game
/// state so simulations can be reproduced from a seed.
#[derive(Debug, Clone, PartialEq)]
pub struct Bag {
    tiles: Vec<MachineLetter>,
    rng: Xoshiro256PlusPlus,
}

impl Bag {
    /// A full, shuffled bag for the distribution.
    #[must_use]
    pub fn new(ld: &LetterDistribution, seed: u64) -> Bag {
        let mut bag = Bag {
            tiles: Vec::with_capacity(ld.total_tiles()),
            rng: Xoshiro256PlusPlus::seed_from_u64(seed),
        };
        bag.refill(ld);
        bag
    }

    /// Refill to a full bag and shuffle.
    pub fn refill(&mut self, ld: &LetterDistribution) {
        self.tiles.clear();
        for ml in 0..ld.size() as MachineLetter {
            for _ in 0..ld.count(ml) {
                self.tiles.push(ml);
            }
        }
        self.shuffle();
    }

    pub fn reseed(&mut self, seed: u64) {
        self.rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    pub fn tiles(&self) -> &[MachineLetter] {
        &self.tiles
    }

    /// Fisher-Yates over the remaining tiles.
    pub fn shuffle(&mut self) {
        for i in (1..self.tiles.len()).rev() {
            let j = self.rng.gen_range(0..=i);
            self.tiles.swap(i, j);
        }
    }

    /// Draw the last tile.
    pub fn draw_random(&mut self) -> Option<MachineLetter> {
        self.tiles.pop()
    }

    /// Draw one specific letter, wherever it sits. Designated blanks are
    /// drawn as the blank. Returns false if the letter is not in the bag.
    pub fn draw_letter(&mut self, ml: MachineLetter) -> bool {
        let ml = if is_blanked(ml) { BLANK_LETTER } else { ml };
        if let Some(i) = self.tiles.iter().position(|&t| t == ml) {
            self.tiles.swap_remove(i);
            true
        } else {
            false
        }
    }

    /// Return a tile to the bag at a random position. Designated blanks go
    /// back as the blank.
    pub fn add_letter(&mut self, ml: MachineLetter) {
        let ml = if is_blanked(ml) { BLANK_LETTER } else { ml };
        if self.tiles.is_empty() {
            self.tiles.push(ml);
            return;
        }
        let i = self.rng.gen_range(0..self.tiles.len());
        let displaced = self.tiles[i];
        self.tiles[i] = ml;
        self.tiles.push(displaced);
    }

    /// View the bag contents as letter counts.
    pub fn as_rack(&self, alphabet_size: usize) -> Rack {
        let mut rack = Rack::new(alphabet_size);
        for &t in &self.tiles {
            rack.add(t);
        }
        rack
    }
}
