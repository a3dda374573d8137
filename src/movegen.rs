mod shadow;

use crate::board::{Board, Direction, TRIVIAL_CROSS_SET};
use crate::cross_set::allowed;
use crate::distribution::LetterDistribution;
use crate::klv::Klv;
use crate::kwg::Kwg;
use crate::leave_map::LeaveMap;
use crate::letters::{blanked, unblanked, MachineLetter, BLANK_LETTER, EMPTY_SQUARE, PLAYED_THROUGH, SEPARATOR};
use crate::moves::{Move, MoveList, MoveType, RecordMode, TileStrip, PASS_EQUITY};
use crate::rack::Rack;
use shadow::Shadow;

/// Opening-play penalty per vowel landed on a hotspot column.
const OPENING_HOTSPOT_PENALTY: f64 = -0.7;
const HOTSPOT_COLS: [usize; 4] = [2, 6, 8, 12];

/// Length of the pre-endgame adjustment table, indexed by bag-plus-rack
/// tile count.
pub const PREENDGAME_ADJUSTMENT_VALUES_LENGTH: usize = 13;

/// Hand-tuned pre-endgame values from Quackle.
pub const QUACKLE_PREENDGAME_ADJUSTMENT_VALUES: [f64; PREENDGAME_ADJUSTMENT_VALUES_LENGTH] =
    [0.0, -8.0, 0.0, -0.5, -2.0, -3.5, -2.0, 2.0, 10.0, 7.0, 4.0, -1.0, -2.0];

const RACK_SIZE: u32 = 7;

/// What the candidate ordering is keyed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortBy {
    Equity,
    Score,
}

/// One anchor produced by the shadow pass.
#[derive(Debug, Clone, Copy)]
pub struct Anchor {
    pub row: usize,
    pub col: usize,
    pub last_anchor_col: usize,
    pub vertical: bool,
    pub highest_possible_score: u32,
}

/// Everything one generation call reads and mutates. The shared data
/// (graph, valuator, distribution) is borrowed for the duration of the
/// call; the board and rack are scratch that the call restores.
pub struct GenParams<'a> {
    pub board: &'a mut Board,
    pub rack: &'a mut Rack,
    pub opp_rack: Option<&'a Rack>,
    pub kwg: &'a Kwg,
    pub klv: &'a Klv,
    pub ld: &'a LetterDistribution,
    /// tiles left in the bag before the play
    pub bag_count: usize,
    pub include_exchanges: bool,
}

/// The anchor-driven move generator. Owns its scratch (strips, leave map,
/// anchor list) and the output move list, so one instance per thread
/// suffices and no allocation happens per call after warmup.
pub struct MoveGen {
    pub move_list: MoveList,
    sort_by: SortBy,
    preendgame_values: [f64; PREENDGAME_ADJUSTMENT_VALUES_LENGTH],
    strip: Vec<MachineLetter>,
    exchange_strip: Vec<MachineLetter>,
    leave_map: LeaveMap,
    anchors: Vec<Anchor>,
    // recursion state
    tiles_played: u32,
    current_row: usize,
    current_anchor_col: usize,
    last_anchor_col: usize,
    vertical: bool,
    // pruning state
    max_equity_adjustment: f64,
    opening: bool,
    bag_count: usize,
}

impl Default for MoveGen {
    fn default() -> Self {
        MoveGen::new(RecordMode::All, SortBy::Equity)
    }
}

impl MoveGen {
    #[must_use]
    pub fn new(record_mode: RecordMode, sort_by: SortBy) -> MoveGen {
        MoveGen {
            move_list: MoveList::new(record_mode),
            sort_by,
            preendgame_values: [0.0; PREENDGAME_ADJUSTMENT_VALUES_LENGTH],
            strip: Vec::new(),
            exchange_strip: Vec::new(),
            leave_map: LeaveMap::new(),
            anchors: Vec::new(),
            tiles_played: 0,
            current_row: 0,
            current_anchor_col: 0,
            last_anchor_col: 0,
            vertical: false,
            max_equity_adjustment: 0.0,
            opening: false,
            bag_count: 0,
        }
    }

    pub fn set_record_mode(&mut self, mode: RecordMode) {
        self.move_list.set_mode(mode);
    }

    pub fn set_sort_by(&mut self, sort_by: SortBy) {
        self.sort_by = sort_by;
    }

    /// Install the Quackle pre-endgame profile (the default is all zeros).
    pub fn use_quackle_preendgame_values(&mut self) {
        self.preendgame_values = QUACKLE_PREENDGAME_ADJUSTMENT_VALUES;
    }

    /// The anchors of the last generation, sorted by upper bound
    /// descending.
    pub fn anchor_list(&self) -> &[Anchor] {
        &self.anchors
    }

    /// Generate every candidate move for the rack on the board. In
    /// `RecordAll` mode the list ends sorted by equity descending and
    /// always contains the pass; in `RecordBest` a single best move
    /// remains. An empty rack yields a pass-only list. The board and rack
    /// are restored before returning.
    pub fn generate(&mut self, p: &mut GenParams) {
        self.move_list.reset();
        self.leave_map.init(p.rack, p.klv);
        self.strip.clear();
        self.strip.resize(p.board.dim(), PLAYED_THROUGH);
        self.exchange_strip.clear();
        self.exchange_strip.resize(RACK_SIZE as usize, 0);
        self.tiles_played = 0;
        self.opening = p.board.tiles_played() == 0;
        self.bag_count = p.bag_count;
        self.max_equity_adjustment = if p.bag_count > 0 {
            self.preendgame_values
                .iter()
                .fold(0.0f64, |acc, &v| acc.max(v))
        } else {
            // the out-play bonus is the largest endgame boost
            2.0 * p.opp_rack.map_or(0.0, |r| p.ld.score_on_rack(r) as f64)
        };

        debug_assert!(!p.board.is_transposed());
        self.shadow_all_anchors(p);

        let root = p.kwg.root();
        let anchors = std::mem::take(&mut self.anchors);
        for anchor in &anchors {
            if self.better_play_has_been_found(anchor.highest_possible_score) {
                break;
            }
            p.board.set_transposed(anchor.vertical);
            self.vertical = anchor.vertical;
            self.current_row = anchor.row;
            self.current_anchor_col = anchor.col;
            self.last_anchor_col = anchor.last_anchor_col;
            self.recursive_gen(p, anchor.col, root, anchor.col, anchor.col, !anchor.vertical);
        }
        self.anchors = anchors;
        p.board.set_transposed(false);

        if p.include_exchanges {
            self.generate_exchange_moves(p, 0, 0);
        }

        // the pass is always a candidate
        self.move_list.record(Move::pass());

        if self.move_list.mode() == RecordMode::All {
            self.move_list.sort_by_equity();
        }
    }

    /// RecordBest cutoff: the anchor list is sorted, so once the best
    /// recorded equity beats an anchor's ceiling nothing later can win.
    fn better_play_has_been_found(&self, highest_possible_score: u32) -> bool {
        if self.move_list.mode() != RecordMode::Best {
            return false;
        }
        let ceiling = highest_possible_score as f64
            + match self.sort_by {
                SortBy::Equity => self.leave_map.best_value() as f64 + self.max_equity_adjustment,
                SortBy::Score => 0.0,
            };
        self.move_list.top_equity() >= ceiling
    }

    /// Phase 1: shadow every anchor in both directions and sort by upper
    /// bound descending.
    fn shadow_all_anchors(&mut self, p: &mut GenParams) {
        self.anchors.clear();
        let dim = p.board.dim();
        for &dir in &[Direction::Horizontal, Direction::Vertical] {
            let vertical = dir == Direction::Vertical;
            let cs_dir = dir.other();
            for row in 0..dim {
                let mut last_anchor_col = dim; // sentinel: no anchor yet
                for col in 0..dim {
                    if p.board.anchor(row, col, dir) {
                        let bound = Shadow::new(
                            p.board,
                            row,
                            col,
                            last_anchor_col,
                            cs_dir,
                            p.rack,
                            p.ld,
                        )
                        .run();
                        self.anchors.push(Anchor {
                            row,
                            col,
                            last_anchor_col,
                            vertical,
                            highest_possible_score: bound,
                        });
                        last_anchor_col = col;
                    }
                }
            }
            p.board.transpose();
        }
        debug_assert!(!p.board.is_transposed());
        self.anchors
            .sort_by(|a, b| b.highest_possible_score.cmp(&a.highest_possible_score));
    }

    fn take_letter(&mut self, rack: &mut Rack, ml: MachineLetter) {
        rack.take(ml);
        self.leave_map.take(ml, rack.count(ml));
        self.tiles_played += 1;
    }

    fn add_letter(&mut self, rack: &mut Rack, ml: MachineLetter) {
        self.leave_map.add(ml, rack.count(ml));
        rack.add(ml);
        self.tiles_played -= 1;
    }

    fn recursive_gen(
        &mut self,
        p: &mut GenParams,
        col: usize,
        node: u32,
        leftstrip: usize,
        rightstrip: usize,
        unique_play: bool,
    ) {
        let cs_dir = if self.vertical {
            Direction::Horizontal
        } else {
            Direction::Vertical
        };
        let current_letter = p.board.letter(self.current_row, col);
        let cross_set = p.board.cross_set(self.current_row, col, cs_dir);
        if current_letter == EMPTY_SQUARE {
            if p.rack.is_empty() {
                return;
            }
            for ml in 1..p.ld.size() as MachineLetter {
                if p.rack.count(ml) == 0 {
                    continue;
                }
                if allowed(cross_set, ml) {
                    let next = p.kwg.next_node(node, ml);
                    self.take_letter(p.rack, ml);
                    self.go_on(p, col, ml, next, node, leftstrip, rightstrip, unique_play);
                    self.add_letter(p.rack, ml);
                }
            }
            if p.rack.count(BLANK_LETTER) > 0 {
                for ml in 1..p.ld.size() as MachineLetter {
                    if allowed(cross_set, ml) {
                        let next = p.kwg.next_node(node, ml);
                        self.take_letter(p.rack, BLANK_LETTER);
                        self.go_on(
                            p,
                            col,
                            blanked(ml),
                            next,
                            node,
                            leftstrip,
                            rightstrip,
                            unique_play,
                        );
                        self.add_letter(p.rack, BLANK_LETTER);
                    }
                }
            }
        } else {
            let next = p.kwg.next_node(node, unblanked(current_letter));
            self.go_on(
                p,
                col,
                current_letter,
                next,
                node,
                leftstrip,
                rightstrip,
                unique_play,
            );
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn go_on(
        &mut self,
        p: &mut GenParams,
        current_col: usize,
        letter: MachineLetter,
        new_node: u32,
        old_node: u32,
        mut leftstrip: usize,
        mut rightstrip: usize,
        mut unique_play: bool,
    ) {
        let dim = p.board.dim();
        let row = self.current_row;
        let on_board = !p.board.is_empty_square(row, current_col);
        self.strip[current_col] = if on_board { PLAYED_THROUGH } else { letter };
        if !on_board
            && self.vertical
            && p.board.cross_set(row, current_col, Direction::Horizontal) == TRIVIAL_CROSS_SET
        {
            unique_play = true;
        }

        if current_col <= self.current_anchor_col {
            leftstrip = current_col;
            let no_letter_left =
                current_col == 0 || p.board.is_empty_square(row, current_col - 1);

            if p.kwg.in_letter_set(old_node, letter) && no_letter_left && self.tiles_played > 0
            {
                if unique_play || self.tiles_played > 1 {
                    self.record_play(p, leftstrip, rightstrip);
                }
            }

            if new_node == 0 {
                return;
            }

            if current_col > 0 && current_col - 1 != self.last_anchor_col {
                self.recursive_gen(p, current_col - 1, new_node, leftstrip, rightstrip, unique_play);
            }

            let separation_node = p.kwg.next_node(new_node, SEPARATOR);
            if separation_node != 0 && no_letter_left && self.current_anchor_col < dim - 1 {
                self.recursive_gen(
                    p,
                    self.current_anchor_col + 1,
                    separation_node,
                    leftstrip,
                    rightstrip,
                    unique_play,
                );
            }
        } else {
            rightstrip = current_col;
            let no_letter_right =
                current_col == dim - 1 || p.board.is_empty_square(row, current_col + 1);

            if p.kwg.in_letter_set(old_node, letter) && no_letter_right && self.tiles_played > 0
            {
                if unique_play || self.tiles_played > 1 {
                    self.record_play(p, leftstrip, rightstrip);
                }
            }

            if new_node != 0 && current_col < dim - 1 {
                self.recursive_gen(p, current_col + 1, new_node, leftstrip, rightstrip, unique_play);
            }
        }
    }

    fn record_play(&mut self, p: &mut GenParams, leftstrip: usize, rightstrip: usize) {
        let cross_dir = if self.vertical {
            Direction::Horizontal
        } else {
            Direction::Vertical
        };
        let score = p.board.score_move(
            &self.strip,
            leftstrip,
            rightstrip,
            self.current_row,
            self.tiles_played,
            cross_dir,
            p.ld,
        );
        let (row, col) = if self.vertical {
            (leftstrip, self.current_row)
        } else {
            (self.current_row, leftstrip)
        };
        let mut tiles = TileStrip::new();
        for &ml in &self.strip[leftstrip..=rightstrip] {
            tiles.push(ml);
        }
        let mut mv = Move {
            move_type: MoveType::Play,
            tiles,
            tiles_played: self.tiles_played,
            row,
            col,
            dir: if self.vertical {
                Direction::Vertical
            } else {
                Direction::Horizontal
            },
            score,
            equity: 0.0,
        };
        mv.equity = match self.sort_by {
            SortBy::Equity => self.move_equity(p, &mv),
            SortBy::Score => score as f64,
        };
        self.move_list.record(mv);
    }

    /// `equity = score + leave + context adjustments`.
    fn move_equity(&self, p: &GenParams, mv: &Move) -> f64 {
        let mut leave_adjustment = 0.0;
        let mut other_adjustments = 0.0;

        if self.opening && mv.move_type == MoveType::Play {
            other_adjustments += placement_adjustment(mv, p.ld);
        }

        if self.bag_count > 0 {
            leave_adjustment = self.leave_map.current_value() as f64;
            let bag_plus_rack_size =
                self.bag_count as i64 - mv.tiles_played as i64 + RACK_SIZE as i64;
            if (0..PREENDGAME_ADJUSTMENT_VALUES_LENGTH as i64).contains(&bag_plus_rack_size) {
                other_adjustments += self.preendgame_values[bag_plus_rack_size as usize];
            }
        } else {
            other_adjustments += endgame_adjustment(p.rack, p.opp_rack, p.ld);
        }

        mv.score as f64 + leave_adjustment + other_adjustments
    }

    /// Enumerate every distinct nonempty rack subset as an exchange.
    fn generate_exchange_moves(&mut self, p: &mut GenParams, ml: MachineLetter, stripidx: usize) {
        let size = p.ld.size() as MachineLetter;
        let mut ml = ml;
        while ml < size && p.rack.count(ml) == 0 {
            ml += 1;
        }
        if ml == size {
            if stripidx > 0 {
                self.record_exchange(p, stripidx);
            }
        } else {
            self.generate_exchange_moves(p, ml + 1, stripidx);
            let num_this = p.rack.count(ml);
            for i in 0..num_this {
                self.exchange_strip[stripidx + i as usize] = ml;
                self.take_letter_for_exchange(p.rack, ml);
                self.generate_exchange_moves(p, ml + 1, stripidx + i as usize + 1);
            }
            for _ in 0..num_this {
                self.add_letter_for_exchange(p.rack, ml);
            }
        }
    }

    fn take_letter_for_exchange(&mut self, rack: &mut Rack, ml: MachineLetter) {
        rack.take(ml);
        self.leave_map.take(ml, rack.count(ml));
    }

    fn add_letter_for_exchange(&mut self, rack: &mut Rack, ml: MachineLetter) {
        self.leave_map.add(ml, rack.count(ml));
        rack.add(ml);
    }

    fn record_exchange(&mut self, p: &GenParams, stripidx: usize) {
        let mut tiles = TileStrip::new();
        for &ml in &self.exchange_strip[..stripidx] {
            tiles.push(ml);
        }
        let mut mv = Move {
            move_type: MoveType::Exchange,
            tiles,
            tiles_played: stripidx as u32,
            row: 0,
            col: 0,
            dir: Direction::Horizontal,
            score: 0,
            equity: 0.0,
        };
        mv.equity = match self.sort_by {
            SortBy::Equity => self.move_equity(p, &mv),
            SortBy::Score => 0.0,
        };
        self.move_list.record(mv);
    }
}

/// Opening defensive bias: vowels on the hotspot columns next to the
/// double-letter squares hand the opponent easy premium access.
fn placement_adjustment(mv: &Move, ld: &LetterDistribution) -> f64 {
    let mut penalty = 0.0;
    for (i, &ml) in mv.tiles.iter().enumerate() {
        if ml == PLAYED_THROUGH {
            continue;
        }
        let col = mv.col + i;
        if ld.is_vowel(ml) && HOTSPOT_COLS.contains(&col) {
            penalty += OPENING_HOTSPOT_PENALTY;
        }
    }
    penalty
}

/// With the bag empty, going out earns twice the opponent's rack; getting
/// stuck costs twice your own plus a tempo constant.
fn endgame_adjustment(rack_after: &Rack, opp_rack: Option<&Rack>, ld: &LetterDistribution) -> f64 {
    if !rack_after.is_empty() {
        return -2.0 * ld.score_on_rack(rack_after) as f64 - 10.0;
    }
    2.0 * opp_rack.map_or(0, |r| ld.score_on_rack(r)) as f64
}
