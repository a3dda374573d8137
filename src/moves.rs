use crate::board::Direction;
use crate::distribution::LetterDistribution;
use crate::letters::{MachineLetter, PLAYED_THROUGH};
use tinyvec::ArrayVec;

/// Tile strips cover a full board row in the super variant.
pub const STRIP_CAP: usize = 21;

/// A move's tile footprint.
pub type TileStrip = ArrayVec<[MachineLetter; STRIP_CAP]>;

/// Equity of a pass, below any possible play.
pub const PASS_EQUITY: f64 = -10000.0;

/// Sentinel below every real equity, including the pass.
pub const INITIAL_TOP_EQUITY: f64 = -100000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum MoveType {
    Play,
    Exchange,
    Pass,
}

impl Default for MoveType {
    fn default() -> Self {
        MoveType::Pass
    }
}

/// One candidate move.
///
/// For a `Play`, `tiles` spans the whole footprint with
/// [`PLAYED_THROUGH`] marking squares that already held a tile; for an
/// `Exchange` it lists the returned tiles. `row`/`col` are in absolute
/// (untransposed) coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Move {
    pub move_type: MoveType,
    pub tiles: TileStrip,
    pub tiles_played: u32,
    pub row: usize,
    pub col: usize,
    pub dir: Direction,
    pub score: u32,
    pub equity: f64,
}

impl Default for Move {
    fn default() -> Self {
        Move::pass()
    }
}

impl Move {
    /// The pass move.
    #[must_use]
    pub fn pass() -> Move {
        Move {
            move_type: MoveType::Pass,
            tiles: TileStrip::new(),
            tiles_played: 0,
            row: 0,
            col: 0,
            dir: Direction::Horizontal,
            score: 0,
            equity: PASS_EQUITY,
        }
    }

    /// Length of the footprint (or the exchanged tile count).
    pub fn tiles_length(&self) -> usize {
        self.tiles.len()
    }

    /// A play's identity: footprint plus placed tiles.
    pub fn position_key(&self) -> (usize, usize, usize, Vec<MachineLetter>) {
        (
            self.row,
            self.col,
            self.dir.index(),
            self.tiles.iter().copied().collect(),
        )
    }

    /// Standard notation: `8D QI`, `14B hEaDW(OR)DS 106`-style body
    /// (score not included), `A1 ...` for vertical plays, `(exch ..)`,
    /// `(pass)`.
    pub fn notation(&self, ld: &LetterDistribution) -> String {
        match self.move_type {
            MoveType::Pass => String::from("(pass)"),
            MoveType::Exchange => {
                let tiles: String = self
                    .tiles
                    .iter()
                    .map(|&ml| ld.letter_to_string(ml))
                    .collect();
                format!("(exch {})", tiles)
            }
            MoveType::Play => {
                let coord = match self.dir {
                    Direction::Horizontal => {
                        format!("{}{}", self.row + 1, (b'A' + self.col as u8) as char)
                    }
                    Direction::Vertical => {
                        format!("{}{}", (b'A' + self.col as u8) as char, self.row + 1)
                    }
                };
                let mut word = String::new();
                let mut through = false;
                for &ml in self.tiles.iter() {
                    if ml == PLAYED_THROUGH {
                        if !through {
                            word.push('(');
                            through = true;
                        }
                        word.push('.');
                    } else {
                        if through {
                            word.push(')');
                            through = false;
                        }
                        word.push_str(&ld.letter_to_string(ml));
                    }
                }
                if through {
                    word.push(')');
                }
                format!("{} {}", coord, word)
            }
        }
    }

    /// Notation with the played-through squares spelled from the board
    /// letters, e.g. `14B hEaDW(OR)DS`.
    pub fn notation_on(
        &self,
        ld: &LetterDistribution,
        board: &crate::board::Board,
    ) -> String {
        debug_assert!(!board.is_transposed());
        match self.move_type {
            MoveType::Play => {
                let coord = match self.dir {
                    Direction::Horizontal => {
                        format!("{}{}", self.row + 1, (b'A' + self.col as u8) as char)
                    }
                    Direction::Vertical => {
                        format!("{}{}", (b'A' + self.col as u8) as char, self.row + 1)
                    }
                };
                let mut word = String::new();
                let mut through = false;
                for (i, &ml) in self.tiles.iter().enumerate() {
                    let (r, c) = match self.dir {
                        Direction::Horizontal => (self.row, self.col + i),
                        Direction::Vertical => (self.row + i, self.col),
                    };
                    if ml == PLAYED_THROUGH {
                        if !through {
                            word.push('(');
                            through = true;
                        }
                        word.push_str(&ld.letter_to_string(board.letter(r, c)));
                    } else {
                        if through {
                            word.push(')');
                            through = false;
                        }
                        word.push_str(&ld.letter_to_string(ml));
                    }
                }
                if through {
                    word.push(')');
                }
                format!("{} {}", coord, word)
            }
            _ => self.notation(ld),
        }
    }
}

/// How the generator records candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordMode {
    /// Keep every play, sort once at the end by equity descending.
    All,
    /// Keep only the best play seen so far; O(1) insertion.
    Best,
}

/// The candidate list a generation pass fills.
#[derive(Debug, Clone)]
pub struct MoveList {
    moves: Vec<Move>,
    mode: RecordMode,
}

impl Default for MoveList {
    fn default() -> Self {
        MoveList::new(RecordMode::All)
    }
}

impl MoveList {
    #[must_use]
    pub fn new(mode: RecordMode) -> MoveList {
        MoveList {
            moves: Vec::new(),
            mode,
        }
    }

    pub fn mode(&self) -> RecordMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: RecordMode) {
        self.mode = mode;
    }

    pub fn reset(&mut self) {
        self.moves.clear();
    }

    pub fn len(&self) -> usize {
        self.moves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    pub fn moves(&self) -> &[Move] {
        &self.moves
    }

    pub fn best(&self) -> Option<&Move> {
        self.moves.first()
    }

    /// Equity of the best play recorded so far.
    pub fn top_equity(&self) -> f64 {
        match self.mode {
            RecordMode::Best => self.moves.first().map_or(INITIAL_TOP_EQUITY, |m| m.equity),
            RecordMode::All => self
                .moves
                .iter()
                .map(|m| m.equity)
                .fold(INITIAL_TOP_EQUITY, f64::max),
        }
    }

    /// Record one candidate under the current mode.
    pub fn record(&mut self, mv: Move) {
        match self.mode {
            RecordMode::All => self.moves.push(mv),
            RecordMode::Best => {
                if let Some(top) = self.moves.first_mut() {
                    if mv.equity > top.equity {
                        *top = mv;
                    }
                } else {
                    self.moves.push(mv);
                }
            }
        }
    }

    /// Sort by equity descending. Ties break on score, then position, so
    /// the order is a stable total order.
    pub fn sort_by_equity(&mut self) {
        self.moves.sort_by(|a, b| {
            b.equity
                .partial_cmp(&a.equity)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(b.score.cmp(&a.score))
                .then(a.position_key().cmp(&b.position_key()))
        });
    }

    pub fn into_moves(self) -> Vec<Move> {
        self.moves
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn play(score: u32, equity: f64, col: usize) -> Move {
        Move {
            move_type: MoveType::Play,
            tiles: TileStrip::new(),
            tiles_played: 1,
            row: 7,
            col,
            dir: Direction::Horizontal,
            score,
            equity,
        }
    }

    #[test]
    fn test_record_all_sorts() {
        let mut list = MoveList::new(RecordMode::All);
        list.record(play(10, 12.0, 0));
        list.record(play(30, 31.5, 1));
        list.record(play(20, 18.0, 2));
        list.sort_by_equity();
        let equities: Vec<f64> = list.moves().iter().map(|m| m.equity).collect();
        assert_eq!(equities, vec![31.5, 18.0, 12.0]);
    }

    #[test]
    fn test_record_best_keeps_single_slot() {
        let mut list = MoveList::new(RecordMode::Best);
        list.record(play(10, 12.0, 0));
        list.record(play(30, 31.5, 1));
        list.record(play(20, 18.0, 2));
        assert_eq!(list.len(), 1);
        assert_eq!(list.best().unwrap().equity, 31.5);
    }

    #[test]
    fn test_notation() {
        let ld = LetterDistribution::english();
        let mut mv = play(22, 22.0, 6);
        mv.tiles.push(17);
        mv.tiles.push(9);
        assert_eq!(mv.notation(&ld), "8G QI");
        mv.dir = Direction::Vertical;
        assert_eq!(mv.notation(&ld), "G8 QI");
        assert_eq!(Move::pass().notation(&ld), "(pass)");
    }
}
