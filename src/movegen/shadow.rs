//! The shadow pass: an admissible upper bound on the score achievable from
//! one anchor, computed without touching the word graph. Rack tiles are
//! assumed to land best-score-on-best-multiplier, so the bound never
//! underestimates a real play; sorting anchors by it lets the generator
//! visit promising anchors first and cut off the rest.

use crate::board::{Board, Direction, BINGO_BONUS};
use crate::distribution::LetterDistribution;
use crate::letters::{is_blanked, MachineLetter, EMPTY_SQUARE};
use crate::rack::Rack;

/// One fresh square covered by a shadow play.
#[derive(Debug, Clone, Copy)]
struct FreshSquare {
    letter_mult: u32,
    word_mult: u32,
    cross_score: u32,
    has_cross: bool,
}

pub(super) struct Shadow<'a> {
    board: &'a Board,
    ld: &'a LetterDistribution,
    row: usize,
    anchor_col: usize,
    last_anchor_col: usize,
    cs_dir: Direction,
    /// rack tile scores, descending (blank = 0)
    tile_scores: Vec<u32>,
    rack_mask: u64,
    has_blank: bool,
    fresh: Vec<FreshSquare>,
    played_through: u32,
    best: u32,
}

impl<'a> Shadow<'a> {
    pub(super) fn new(
        board: &'a Board,
        row: usize,
        anchor_col: usize,
        last_anchor_col: usize,
        cs_dir: Direction,
        rack: &Rack,
        ld: &'a LetterDistribution,
    ) -> Shadow<'a> {
        let mut tile_scores: Vec<u32> = rack.as_letters().iter().map(|&ml| ld.score(ml)).collect();
        tile_scores.sort_unstable_by(|a, b| b.cmp(a));
        let mut rack_mask = 0u64;
        for ml in rack.present_letters() {
            rack_mask |= 1 << ml;
        }
        Shadow {
            board,
            ld,
            row,
            anchor_col,
            last_anchor_col,
            cs_dir,
            tile_scores,
            rack_mask,
            has_blank: rack.count(0) > 0,
            fresh: Vec::with_capacity(8),
            played_through: 0,
            best: 0,
        }
    }

    /// Run the walk; returns the highest possible score for the anchor.
    pub(super) fn run(mut self) -> u32 {
        if !self.tile_scores.is_empty() {
            self.walk_left(self.anchor_col);
        }
        self.best
    }

    /// Can any rack tile legally sit on a square with this cross-set?
    fn placeable(&self, cross_set: u64) -> bool {
        if cross_set == 0 {
            return false;
        }
        self.has_blank || cross_set & self.rack_mask != 0
    }

    /// Bound the best score of the current shape: highest rack scores on
    /// the highest effective multipliers.
    fn record(&mut self) {
        let k = self.fresh.len();
        if k == 0 {
            return;
        }
        let word_mult: u32 = self.fresh.iter().map(|f| f.word_mult).product();
        let mut mults: Vec<u32> = self
            .fresh
            .iter()
            .map(|f| {
                f.letter_mult * word_mult
                    + if f.has_cross {
                        f.letter_mult * f.word_mult
                    } else {
                        0
                    }
            })
            .collect();
        mults.sort_unstable_by(|a, b| b.cmp(a));
        let paired: u32 = mults
            .iter()
            .zip(self.tile_scores.iter())
            .map(|(m, s)| m * s)
            .sum();
        let crosses: u32 = self
            .fresh
            .iter()
            .filter(|f| f.has_cross)
            .map(|f| f.cross_score * f.word_mult)
            .sum();
        let bingo = if k == 7 { BINGO_BONUS } else { 0 };
        let score = self.played_through * word_mult + paired + crosses + bingo;
        if score > self.best {
            self.best = score;
        }
    }

    fn letter_score(&self, ml: MachineLetter) -> u32 {
        if is_blanked(ml) {
            0
        } else {
            self.ld.score(ml)
        }
    }

    fn push_fresh(&mut self, col: usize) {
        self.fresh.push(FreshSquare {
            letter_mult: self.board.letter_multiplier(self.row, col),
            word_mult: self.board.word_multiplier(self.row, col),
            cross_score: self.board.cross_score(self.row, col, self.cs_dir),
            has_cross: self.board.has_perpendicular_neighbor(self.row, col),
        });
    }

    /// Cover one square: count it as played-through, or claim it as a
    /// fresh placement if a rack tile can legally sit there.
    fn enter(&mut self, col: usize, ml: MachineLetter) -> bool {
        if ml == EMPTY_SQUARE {
            if self.fresh.len() >= self.tile_scores.len() {
                return false;
            }
            let cross_set = self.board.cross_set(self.row, col, self.cs_dir);
            if !self.placeable(cross_set) {
                return false;
            }
            self.push_fresh(col);
        } else {
            self.played_through += self.letter_score(ml);
        }
        true
    }

    fn leave(&mut self, ml: MachineLetter) {
        if ml == EMPTY_SQUARE {
            self.fresh.pop();
        } else {
            self.played_through -= self.letter_score(ml);
        }
    }

    fn walk_left(&mut self, col: usize) {
        let ml = self.board.letter(self.row, col);
        if !self.enter(col, ml) {
            return;
        }

        let no_letter_left = col == 0 || self.board.is_empty_square(self.row, col - 1);
        if no_letter_left {
            self.record();
            // the separator jump of the real walk
            if self.anchor_col + 1 < self.board.dim() {
                self.walk_right(self.anchor_col + 1);
            }
        }
        if col > 0 && col - 1 != self.last_anchor_col {
            self.walk_left(col - 1);
        }

        self.leave(ml);
    }

    fn walk_right(&mut self, col: usize) {
        let ml = self.board.letter(self.row, col);
        if !self.enter(col, ml) {
            return;
        }

        let no_letter_right =
            col == self.board.dim() - 1 || self.board.is_empty_square(self.row, col + 1);
        if no_letter_right {
            self.record();
        }
        if col + 1 < self.board.dim() {
            self.walk_right(col + 1);
        }

        self.leave(ml);
    }
}
