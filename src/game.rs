use crate::bag::Bag;
use crate::board::Board;
use crate::cross_set::update_cross_sets_for_move;
use crate::distribution::LetterDistribution;
use crate::klv::Klv;
use crate::kwg::Kwg;
use crate::letters::{is_blanked, MachineLetter, BLANK_LETTER, PLAYED_THROUGH};
use crate::movegen::{GenParams, MoveGen};
use crate::moves::{Move, MoveType};
use crate::rack::Rack;

/// Rack capacity in the standard game.
pub const RACK_SIZE: u32 = 7;

/// Six consecutive scoreless turns end the game.
pub const MAX_SCORELESS_TURNS: u32 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum GameEndReason {
    None,
    /// A player emptied their rack with the bag empty.
    Standard,
    /// Six scoreless turns in a row.
    ConsecutiveZeros,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerState {
    pub rack: Rack,
    pub score: i32,
}

#[derive(Debug, Clone, PartialEq)]
struct Backup {
    board: Board,
    bag: Bag,
    players: [PlayerState; 2],
    on_turn: usize,
    consecutive_scoreless_turns: u32,
    end_reason: GameEndReason,
}

/// One game position plus the immutable data it plays under. The word
/// graph, leave valuator and distribution are borrowed, never owned:
/// every clone of a `Game` (one per simulation thread) shares them.
///
/// A single backup slot supports `play_move`/`unplay_last_move` pairs,
/// which is all a simulation iteration needs.
#[derive(Debug, Clone)]
pub struct Game<'a> {
    pub kwg: &'a Kwg,
    pub klv: &'a Klv,
    pub ld: &'a LetterDistribution,
    pub board: Board,
    pub bag: Bag,
    pub players: [PlayerState; 2],
    pub on_turn: usize,
    pub consecutive_scoreless_turns: u32,
    pub end_reason: GameEndReason,
    backup_enabled: bool,
    backup: Option<Box<Backup>>,
}

impl<'a> Game<'a> {
    #[must_use]
    pub fn new(kwg: &'a Kwg, klv: &'a Klv, ld: &'a LetterDistribution, seed: u64) -> Game<'a> {
        let empty = PlayerState {
            rack: Rack::new(ld.size()),
            score: 0,
        };
        Game {
            kwg,
            klv,
            ld,
            board: Board::default(),
            bag: Bag::new(ld, seed),
            players: [empty.clone(), empty],
            on_turn: 0,
            consecutive_scoreless_turns: 0,
            end_reason: GameEndReason::None,
            backup_enabled: false,
            backup: None,
        }
    }

    /// Reset to a fresh game: empty board, full bag, empty racks.
    pub fn reset(&mut self) {
        self.board.reset();
        self.bag.refill(self.ld);
        for p in self.players.iter_mut() {
            p.rack.clear();
            p.score = 0;
        }
        self.on_turn = 0;
        self.consecutive_scoreless_turns = 0;
        self.end_reason = GameEndReason::None;
        self.backup = None;
    }

    pub fn is_over(&self) -> bool {
        self.end_reason != GameEndReason::None
    }

    /// Score difference from `player`'s perspective.
    pub fn spread(&self, player: usize) -> i32 {
        self.players[player].score - self.players[1 - player].score
    }

    /// Exchanges are legal only while the bag holds a full rack.
    pub fn exchanges_allowed(&self) -> bool {
        self.bag.len() >= RACK_SIZE as usize
    }

    /// Bag tiles plus the hidden rack, from `player`'s point of view.
    pub fn tiles_unseen_by(&self, player: usize) -> u32 {
        self.bag.len() as u32 + self.players[1 - player].rack.len()
    }

    /// Enable the single-slot backup used by simulation rollouts.
    pub fn set_backup_mode(&mut self, enabled: bool) {
        self.backup_enabled = enabled;
    }

    fn save_backup(&mut self) {
        self.backup = Some(Box::new(Backup {
            board: self.board.clone(),
            bag: self.bag.clone(),
            players: self.players.clone(),
            on_turn: self.on_turn,
            consecutive_scoreless_turns: self.consecutive_scoreless_turns,
            end_reason: self.end_reason,
        }));
    }

    /// Restore the state saved by the last backed-up `play_move`.
    pub fn unplay_last_move(&mut self) {
        let backup = self.backup.take().expect("no backup to restore");
        self.board = backup.board;
        self.bag = backup.bag;
        self.players = backup.players;
        self.on_turn = backup.on_turn;
        self.consecutive_scoreless_turns = backup.consecutive_scoreless_turns;
        self.end_reason = backup.end_reason;
    }

    /// Draw up to `n` tiles to the on-turn player's rack.
    pub fn draw_at_most(&mut self, player: usize, n: u32) {
        for _ in 0..n {
            match self.bag.draw_random() {
                Some(ml) => self.players[player].rack.add(ml),
                None => break,
            }
        }
    }

    /// Throw the player's rack back into the bag, then refill it: randomly,
    /// or with a known rack when the opponent's tiles are given.
    pub fn set_random_rack(&mut self, player: usize, known: Option<&Rack>) {
        let letters = self.players[player].rack.as_letters();
        for ml in letters {
            self.bag.add_letter(ml);
        }
        self.players[player].rack.clear();
        match known {
            Some(rack) => {
                for ml in rack.as_letters() {
                    if self.bag.draw_letter(ml) {
                        self.players[player].rack.add(ml);
                    }
                }
            }
            None => self.draw_at_most(player, RACK_SIZE),
        }
    }

    fn place_move_tiles(&mut self, mv: &Move) {
        debug_assert!(!self.board.is_transposed());
        for (i, &ml) in mv.tiles.iter().enumerate() {
            if ml == PLAYED_THROUGH {
                continue;
            }
            let (row, col) = match mv.dir {
                crate::board::Direction::Horizontal => (mv.row, mv.col + i),
                crate::board::Direction::Vertical => (mv.row + i, mv.col),
            };
            self.board.set_letter(row, col, ml);
            let rack_letter = if is_blanked(ml) { BLANK_LETTER } else { ml };
            self.players[self.on_turn].rack.take(rack_letter);
        }
        self.board.add_tiles_played(mv.tiles_played);

        // every square whose neighborhood changed gets its anchors redone
        let dim = self.board.dim() as isize;
        for (i, _) in mv.tiles.iter().enumerate() {
            let (row, col) = match mv.dir {
                crate::board::Direction::Horizontal => (mv.row as isize, (mv.col + i) as isize),
                crate::board::Direction::Vertical => ((mv.row + i) as isize, mv.col as isize),
            };
            for &(dr, dc) in &[(0, 0), (-1, 0), (1, 0), (0, -1), (0, 1)] {
                let (r, c) = (row + dr, col + dc);
                if r >= 0 && r < dim && c >= 0 && c < dim {
                    self.board.update_anchors(r as usize, c as usize);
                }
            }
        }
    }

    fn execute_exchange(&mut self, mv: &Move) {
        for &ml in mv.tiles.iter() {
            self.players[self.on_turn].rack.take(ml);
        }
        self.draw_at_most(self.on_turn, mv.tiles_played);
        for &ml in mv.tiles.iter() {
            self.bag.add_letter(ml);
        }
    }

    /// Apply a move: board, racks, scores, cross-set cache, turn state and
    /// end-of-game bookkeeping. With backup mode on, the prior state is
    /// saved for `unplay_last_move`.
    pub fn play_move(&mut self, mv: &Move) {
        if self.backup_enabled {
            self.save_backup();
        }
        match mv.move_type {
            MoveType::Play => {
                self.place_move_tiles(mv);
                update_cross_sets_for_move(&mut self.board, mv, self.kwg, self.ld);
                self.consecutive_scoreless_turns = 0;
                self.players[self.on_turn].score += mv.score as i32;
                self.draw_at_most(self.on_turn, mv.tiles_played);
                if self.players[self.on_turn].rack.is_empty() {
                    // going out: collect twice the opponent's rack
                    let bonus =
                        2 * self.ld.score_on_rack(&self.players[1 - self.on_turn].rack) as i32;
                    self.players[self.on_turn].score += bonus;
                    self.end_reason = GameEndReason::Standard;
                }
            }
            MoveType::Pass => {
                self.consecutive_scoreless_turns += 1;
            }
            MoveType::Exchange => {
                self.execute_exchange(mv);
                self.consecutive_scoreless_turns += 1;
            }
        }

        if self.consecutive_scoreless_turns == MAX_SCORELESS_TURNS {
            let r0 = self.ld.score_on_rack(&self.players[0].rack) as i32;
            let r1 = self.ld.score_on_rack(&self.players[1].rack) as i32;
            self.players[0].score -= r0;
            self.players[1].score -= r1;
            self.end_reason = GameEndReason::ConsecutiveZeros;
        }

        if self.end_reason == GameEndReason::None {
            self.on_turn = 1 - self.on_turn;
        }
    }

    /// Run the generator for the player on turn.
    pub fn generate_moves(&mut self, gen: &mut MoveGen, include_exchanges: bool) {
        let bag_count = self.bag.len();
        let (left, right) = self.players.split_at_mut(1);
        let (rack, opp_rack) = if self.on_turn == 0 {
            (&mut left[0].rack, &right[0].rack)
        } else {
            (&mut right[0].rack, &left[0].rack)
        };
        let mut params = GenParams {
            board: &mut self.board,
            rack,
            opp_rack: Some(opp_rack),
            kwg: self.kwg,
            klv: self.klv,
            ld: self.ld,
            bag_count,
            include_exchanges,
        };
        gen.generate(&mut params);
    }

    /// Generate with `RecordBest` and return the single top-equity move.
    pub fn best_equity_move(&mut self, gen: &mut MoveGen) -> Move {
        let mode = gen.move_list.mode();
        gen.set_record_mode(crate::moves::RecordMode::Best);
        let include = self.exchanges_allowed();
        self.generate_moves(gen, include);
        gen.set_record_mode(mode);
        gen.move_list.best().cloned().unwrap_or_else(Move::pass)
    }

    /// Remove specific letters from the bag (CGP racks, board tiles).
    /// Missing letters are ignored, matching lenient position loading.
    pub fn draw_letters_from_bag(&mut self, letters: &[MachineLetter]) {
        for &ml in letters {
            if !self.bag.draw_letter(ml) {
                log::warn!("letter {} not in bag while loading position", ml);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cross_set::generate_all_cross_sets;
    use crate::kwg::KwgBuilder;
    use crate::moves::RecordMode;
    use crate::movegen::SortBy;

    fn setup() -> (Kwg, Klv, LetterDistribution) {
        let ld = LetterDistribution::english();
        let kwg = KwgBuilder::from_words(&["RUST", "RUSTS", "QI", "AB"], &ld)
            .unwrap()
            .build();
        (kwg, Klv::zeroed(), ld)
    }

    fn top_move(game: &mut Game) -> Move {
        let mut gen = MoveGen::new(RecordMode::All, SortBy::Equity);
        let include = game.exchanges_allowed();
        game.generate_moves(&mut gen, include);
        gen.move_list.moves()[0].clone()
    }

    #[test]
    fn test_play_and_unplay_round_trip() {
        let (kwg, klv, ld) = setup();
        let mut game = Game::new(&kwg, &klv, &ld, 42);
        game.players[0].rack = ld.rack_from_string("RUSTQAB").unwrap();
        game.players[1].rack = ld.rack_from_string("EIABRUS").unwrap();
        game.draw_letters_from_bag(&ld.string_to_letters("RUSTQABEIABRUS").unwrap());
        generate_all_cross_sets(&mut game.board, &kwg, &ld);
        game.board.update_all_anchors();

        let before = (
            game.board.clone(),
            game.bag.clone(),
            game.players.clone(),
            game.on_turn,
        );
        let mv = top_move(&mut game);
        assert_eq!(mv.move_type, MoveType::Play);

        game.set_backup_mode(true);
        game.play_move(&mv);
        assert_ne!(game.board, before.0);
        assert_eq!(game.on_turn, 1);

        game.unplay_last_move();
        assert_eq!(game.board, before.0);
        assert_eq!(game.bag, before.1);
        assert_eq!(game.players, before.2);
        assert_eq!(game.on_turn, before.3);
        assert_eq!(game.board.tiles_played(), 0);
    }

    #[test]
    fn test_play_updates_state() {
        let (kwg, klv, ld) = setup();
        let mut game = Game::new(&kwg, &klv, &ld, 42);
        game.players[0].rack = ld.rack_from_string("RUSTZZZ").unwrap();
        game.draw_letters_from_bag(&ld.string_to_letters("RUSTZZZ").unwrap());
        generate_all_cross_sets(&mut game.board, &kwg, &ld);

        let bag_before = game.bag.len();
        let mv = top_move(&mut game);
        game.play_move(&mv);
        assert_eq!(game.players[0].score, mv.score as i32);
        assert_eq!(game.board.tiles_played(), mv.tiles_played);
        // rack refilled from the bag
        assert_eq!(game.players[0].rack.len(), 7);
        assert_eq!(game.bag.len(), bag_before - mv.tiles_played as usize);
        assert_eq!(game.consecutive_scoreless_turns, 0);
        assert_eq!(game.on_turn, 1);
    }

    #[test]
    fn test_pass_and_six_zero_rule() {
        let (kwg, klv, ld) = setup();
        let mut game = Game::new(&kwg, &klv, &ld, 42);
        game.players[0].rack = ld.rack_from_string("Q").unwrap();
        game.players[1].rack = ld.rack_from_string("Z").unwrap();
        for _ in 0..MAX_SCORELESS_TURNS {
            assert_eq!(game.end_reason, GameEndReason::None);
            game.play_move(&Move::pass());
        }
        assert_eq!(game.end_reason, GameEndReason::ConsecutiveZeros);
        assert_eq!(game.players[0].score, -10);
        assert_eq!(game.players[1].score, -10);
    }

    #[test]
    fn test_exchange_keeps_bag_size() {
        let (kwg, klv, ld) = setup();
        let mut game = Game::new(&kwg, &klv, &ld, 42);
        game.players[0].rack = ld.rack_from_string("QIABRUS").unwrap();
        game.draw_letters_from_bag(&ld.string_to_letters("QIABRUS").unwrap());
        let bag_before = game.bag.len();

        let mut mv = Move {
            move_type: MoveType::Exchange,
            tiles: Default::default(),
            tiles_played: 2,
            row: 0,
            col: 0,
            dir: crate::board::Direction::Horizontal,
            score: 0,
            equity: 0.0,
        };
        mv.tiles.push(17); // Q
        mv.tiles.push(9); // I
        game.play_move(&mv);
        assert_eq!(game.bag.len(), bag_before);
        assert_eq!(game.players[0].rack.len(), 7);
        assert_eq!(game.players[0].rack.count(17), 0);
        assert_eq!(game.consecutive_scoreless_turns, 1);
    }

    #[test]
    fn test_set_random_rack_known() {
        let (kwg, klv, ld) = setup();
        let mut game = Game::new(&kwg, &klv, &ld, 42);
        let known = ld.rack_from_string("QIZ").unwrap();
        game.set_random_rack(1, Some(&known));
        assert_eq!(game.players[1].rack, known);
        game.set_random_rack(1, None);
        assert_eq!(game.players[1].rack.len(), 7);
    }
}
