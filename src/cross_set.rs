//! Cross-set and cross-score maintenance: for every empty square and
//! direction, which letters close a legal perpendicular word and what the
//! perpendicular tiles score.

use crate::board::{Board, Direction, TRIVIAL_CROSS_SET};
use crate::distribution::LetterDistribution;
use crate::kwg::Kwg;
use crate::letters::{unblanked, MachineLetter, EMPTY_SQUARE, PLAYED_THROUGH, SEPARATOR};
use crate::moves::{Move, MoveType};

/// Bit test against a cross-set.
#[inline]
pub fn allowed(cross_set: u64, ml: MachineLetter) -> bool {
    cross_set & (1 << unblanked(ml)) != 0
}

/// Walk leftward from (row, col) through placed tiles, following the
/// graph. Returns the node reached and whether the path stayed on the
/// graph; with `check_letter_set`, the letter at `left_most_col` is tested
/// against the node's letter set instead of being followed.
fn traverse_backwards(
    board: &Board,
    row: usize,
    mut col: isize,
    mut node: u32,
    check_letter_set: bool,
    left_most_col: isize,
    kwg: &Kwg,
) -> (u32, bool) {
    while board.pos_exists(row as isize, col) {
        let ml = board.letter(row, col as usize);
        if ml == EMPTY_SQUARE {
            break;
        }
        if check_letter_set && col == left_most_col {
            return (node, kwg.in_letter_set(node, ml));
        }
        node = kwg.next_node(node, unblanked(ml));
        if node == 0 {
            return (0, false);
        }
        col -= 1;
    }
    (node, true)
}

/// Recompute the cross-set and cross-score at one square for one
/// direction. The square's row neighbors are read in the board's current
/// frame, so callers transpose before passing `Direction::Vertical`.
pub fn gen_cross_set(
    board: &mut Board,
    row: isize,
    col: isize,
    dir: Direction,
    kwg: &Kwg,
    ld: &LetterDistribution,
) {
    if !board.pos_exists(row, col) {
        return;
    }
    let (row, col) = (row as usize, col as usize);

    if !board.is_empty_square(row, col) {
        board.set_cross_set(row, col, dir, 0);
        board.set_cross_score(row, col, dir, 0);
        return;
    }
    if board.left_and_right_empty(row, col) {
        board.set_cross_set(row, col, dir, TRIVIAL_CROSS_SET);
        board.set_cross_score(row, col, dir, 0);
        return;
    }

    let right_col = board.word_edge(row, col + 1, 1);
    if right_col == col {
        // tiles on the left side only: walk the reversed prefix, then the
        // separator arc's letter set is exactly the closing letters
        let (node, valid) =
            traverse_backwards(board, row, col as isize - 1, kwg.root(), false, 0, kwg);
        let score = board.tile_run_score_left(row, col as isize - 1, ld);
        board.set_cross_score(row, col, dir, score);
        if !valid {
            board.set_cross_set(row, col, dir, 0);
            return;
        }
        let s_node = kwg.next_node(node, SEPARATOR);
        let set = if s_node == 0 { 0 } else { kwg.letter_set(s_node) };
        board.set_cross_set(row, col, dir, set);
    } else {
        let left_col = if col == 0 {
            0
        } else {
            board.word_edge(row, col - 1, -1)
        };
        let (node, valid) =
            traverse_backwards(board, row, right_col as isize, kwg.root(), false, 0, kwg);
        let score_r = board.tile_run_score_left(row, right_col as isize, ld);
        let score_l = board.tile_run_score_left(row, col as isize - 1, ld);
        board.set_cross_score(row, col, dir, score_r + score_l);
        if !valid {
            board.set_cross_set(row, col, dir, 0);
            return;
        }
        if col == 0 || board.is_empty_square(row, col - 1) {
            // tiles on the right side only
            let set = kwg.letter_set(node);
            board.set_cross_set(row, col, dir, set);
        } else {
            // tiles on both sides: try each pivot letter, then verify the
            // left side spells a valid continuation
            let mut set = 0u64;
            let mut i = node;
            loop {
                let t = kwg.tile(i);
                if t != SEPARATOR {
                    let next = kwg.arc_index(i);
                    if next != 0 {
                        let (_, ok) = traverse_backwards(
                            board,
                            row,
                            col as isize - 1,
                            next,
                            true,
                            left_col as isize,
                            kwg,
                        );
                        if ok {
                            set |= 1 << t;
                        }
                    }
                }
                if kwg.is_end(i) {
                    break;
                }
                i += 1;
            }
            board.set_cross_set(row, col, dir, set);
        }
    }
}

/// Regenerate every cross-set on the board, both directions.
pub fn generate_all_cross_sets(board: &mut Board, kwg: &Kwg, ld: &LetterDistribution) {
    let dim = board.dim() as isize;
    for row in 0..dim {
        for col in 0..dim {
            gen_cross_set(board, row, col, Direction::Horizontal, kwg, ld);
        }
    }
    board.transpose();
    for row in 0..dim {
        for col in 0..dim {
            gen_cross_set(board, row, col, Direction::Vertical, kwg, ld);
        }
    }
    board.transpose();
}

fn update_for_across(
    board: &mut Board,
    mv: &Move,
    row_start: usize,
    col_start: usize,
    dir: Direction,
    kwg: &Kwg,
    ld: &LetterDistribution,
) {
    for (i, &strip_ml) in mv.tiles.iter().enumerate() {
        if strip_ml == PLAYED_THROUGH {
            continue;
        }
        let row = row_start + i;
        let right_col = board.word_edge(row, col_start, 1);
        let left_col = board.word_edge(row, col_start, -1);
        gen_cross_set(board, row as isize, right_col as isize + 1, dir, kwg, ld);
        gen_cross_set(board, row as isize, left_col as isize - 1, dir, kwg, ld);
        gen_cross_set(board, row as isize, col_start as isize, dir, kwg, ld);
    }
}

fn update_for_self(
    board: &mut Board,
    mv: &Move,
    row_start: usize,
    col_start: usize,
    dir: Direction,
    kwg: &Kwg,
    ld: &LetterDistribution,
) {
    for col in col_start as isize - 1..=(col_start + mv.tiles_length()) as isize {
        gen_cross_set(board, row_start as isize, col, dir, kwg, ld);
    }
}

/// After a play, regenerate the cross-sets of every square that lost an
/// empty-neighbor relationship: the word's own row (endpoints included)
/// and, per fresh tile, the perpendicular run it now joins.
pub fn update_cross_sets_for_move(
    board: &mut Board,
    mv: &Move,
    kwg: &Kwg,
    ld: &LetterDistribution,
) {
    if mv.move_type != MoveType::Play {
        return;
    }
    match mv.dir {
        Direction::Vertical => {
            update_for_across(board, mv, mv.row, mv.col, Direction::Horizontal, kwg, ld);
            board.transpose();
            update_for_self(board, mv, mv.col, mv.row, Direction::Vertical, kwg, ld);
            board.transpose();
        }
        Direction::Horizontal => {
            update_for_self(board, mv, mv.row, mv.col, Direction::Horizontal, kwg, ld);
            board.transpose();
            update_for_across(board, mv, mv.col, mv.row, Direction::Vertical, kwg, ld);
            board.transpose();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distribution::LetterDistribution;
    use crate::kwg::KwgBuilder;

    fn ld() -> LetterDistribution {
        LetterDistribution::english()
    }

    fn kwg(words: &[&str]) -> Kwg {
        KwgBuilder::from_words(words, &ld()).unwrap().build()
    }

    fn place(board: &mut Board, word: &str, row: usize, col: usize, horizontal: bool) {
        let letters = ld().string_to_letters(word).unwrap();
        for (i, &ml) in letters.iter().enumerate() {
            let (r, c) = if horizontal { (row, col + i) } else { (row + i, col) };
            board.set_letter(r, c, ml);
            board.add_tiles_played(1);
        }
        board.update_all_anchors();
    }

    /// Brute force: the set of letters whose placement at (row, col) makes
    /// the vertical run a lexicon word (or leaves it trivial).
    fn brute_force_vertical_set(
        board: &Board,
        row: usize,
        col: usize,
        kwg: &Kwg,
        alphabet: usize,
    ) -> u64 {
        let dim = board.dim();
        let mut top = row;
        while top > 0 && !board.is_empty_square(top - 1, col) {
            top -= 1;
        }
        let mut bottom = row;
        while bottom + 1 < dim && !board.is_empty_square(bottom + 1, col) {
            bottom += 1;
        }
        if top == row && bottom == row {
            return TRIVIAL_CROSS_SET;
        }
        let mut set = 0u64;
        for ml in 1..alphabet as MachineLetter {
            let word: Vec<MachineLetter> = (top..=bottom)
                .map(|r| {
                    if r == row {
                        ml
                    } else {
                        unblanked(board.letter(r, col))
                    }
                })
                .collect();
            if kwg.accepts_word(&word) {
                set |= 1 << ml;
            }
        }
        set
    }

    #[test]
    fn test_cross_set_one_side() {
        let kwg = kwg(&["AB", "ABS", "CAB"]);
        let mut board = Board::default();
        place(&mut board, "AB", 7, 6, true);
        generate_all_cross_sets(&mut board, &kwg, &ld());
        // below the A at (8,6): only B closes a word (AB) downward
        assert_eq!(board.cross_set(8, 6, Direction::Vertical), 1 << 2);
        // above the A at (6,6): no 2-letter word ends in A
        assert_eq!(board.cross_set(6, 6, Direction::Vertical), 0);
        // left of AB at (7,5): words ending ..AB with one more letter: CAB
        // is length 3 and would need C at (7,5)
        assert_eq!(board.cross_set(7, 5, Direction::Horizontal), 1 << 3);
        // cross scores: below A the perpendicular run is just A = 1
        assert_eq!(board.cross_score(8, 6, Direction::Vertical), 1);
    }

    #[test]
    fn test_cross_set_both_sides() {
        let kwg = kwg(&["CAB", "CB", "AB"]);
        let mut board = Board::default();
        place(&mut board, "C", 6, 7, true);
        place(&mut board, "B", 8, 7, true);
        generate_all_cross_sets(&mut board, &kwg, &ld());
        // the gap at (7,7) joins C above and B below: only A makes CAB
        assert_eq!(board.cross_set(7, 7, Direction::Vertical), 1 << 1);
        assert_eq!(
            board.cross_score(7, 7, Direction::Vertical),
            3 + 3,
            "C and B scores"
        );
    }

    #[test]
    fn test_cross_set_matches_brute_force() {
        let words = &[
            "AB", "ABS", "BA", "BAS", "CAB", "CABS", "QI", "QIS", "SAB", "BASS",
        ];
        let kwg = kwg(words);
        let ld = ld();
        let mut board = Board::default();
        place(&mut board, "CABS", 7, 5, true);
        place(&mut board, "QI", 5, 8, false);
        generate_all_cross_sets(&mut board, &kwg, &ld);
        for row in 0..board.dim() {
            for col in 0..board.dim() {
                if !board.is_empty_square(row, col) {
                    assert_eq!(board.cross_set(row, col, Direction::Vertical), 0);
                    continue;
                }
                let expected = brute_force_vertical_set(&board, row, col, &kwg, ld.size());
                assert_eq!(
                    board.cross_set(row, col, Direction::Vertical),
                    expected,
                    "square ({}, {})",
                    row,
                    col
                );
            }
        }
    }

    #[test]
    fn test_isolated_square_is_trivial() {
        let kwg = kwg(&["AB"]);
        let mut board = Board::default();
        place(&mut board, "AB", 7, 6, true);
        generate_all_cross_sets(&mut board, &kwg, &ld());
        assert_eq!(board.cross_set(0, 0, Direction::Vertical), TRIVIAL_CROSS_SET);
        assert_eq!(board.cross_set(0, 0, Direction::Horizontal), TRIVIAL_CROSS_SET);
    }
}
