#![deny(
    clippy::used_underscore_binding,
    clippy::map_unwrap_or,
    clippy::int_plus_one,
    clippy::string_add_assign,
    clippy::if_not_else,
    clippy::invalid_upcast_comparisons,
    clippy::mutex_integer,
    clippy::mut_mut,
    clippy::items_after_statements,
    clippy::mem_forget,
    clippy::maybe_infinite_iter
)]

//! A crossword-game analysis engine for Rust.
//! <br>
//! Given a board position, a rack and a lexicon, this crate generates
//! every legal play, ranks the candidates by static equity, estimates
//! win probability by multi-threaded Monte-Carlo rollouts, and infers
//! the unseen tiles an opponent held from a play they made.
//!
//! The lexicon is a packed GADDAG word graph ([`Kwg`]); rack-leave
//! equities come from a companion valuator ([`Klv`]). Both load from
//! their binary formats, or can be built at runtime from word lists,
//! which is how the examples below work.
//!
//! # Basic usage
//! ```
//! # use crossword_analyzer::Error;
//! use crossword_analyzer::{Game, Klv, KwgBuilder, LetterDistribution, MoveGen, RecordMode, SortBy};
//! let ld = LetterDistribution::english();
//! let kwg = KwgBuilder::from_words(&["RUST", "REST"], &ld)?.build();
//! let klv = Klv::zeroed();
//! let mut game = Game::new(&kwg, &klv, &ld, 42);
//! game.players[0].rack = ld.rack_from_string("RUSTA")?;
//! let mut gen = MoveGen::new(RecordMode::All, SortBy::Equity);
//! game.generate_moves(&mut gen, game.exchanges_allowed());
//! for mv in gen.move_list.moves().iter().take(3) {
//!     println!("{} {}", mv.notation(&ld), mv.score);
//! }
//! # Ok::<(), Error>(())
//! ```
//!
//! Positions load from CGP strings with [`Game::load_cgp`]; candidate
//! plays feed the simulator through [`simulate`] and the inference
//! engine through [`infer`].

mod bag;
mod board;
mod cgp;
mod cross_set;
mod distribution;
mod error;
mod game;
mod infer;
mod klv;
mod kwg;
mod leave_map;
pub mod letters;
mod movegen;
mod moves;
mod rack;
mod sim;
mod stats;
mod winpct;

pub use crate::bag::Bag;
pub use crate::board::{Board, Direction, BINGO_BONUS, BOARD_DIM, TRIVIAL_CROSS_SET};
pub use crate::cgp::{parse_cgp, position_to_cgp, CgpOptions, CgpPosition};
pub use crate::cross_set::{gen_cross_set, generate_all_cross_sets, update_cross_sets_for_move};
pub use crate::distribution::LetterDistribution;
pub use crate::error::Error;
pub use crate::game::{Game, GameEndReason, PlayerState, MAX_SCORELESS_TURNS, RACK_SIZE};
pub use crate::infer::{infer, Inference, InferenceStatus, LeaveRecord};
pub use crate::klv::{Klv, KlvBuilder};
pub use crate::kwg::{Kwg, KwgBuilder};
pub use crate::leave_map::LeaveMap;
pub use crate::letters::MachineLetter;
pub use crate::movegen::{Anchor, GenParams, MoveGen, SortBy};
pub use crate::moves::{Move, MoveList, MoveType, RecordMode, TileStrip, PASS_EQUITY};
pub use crate::rack::Rack;
pub use crate::sim::{
    simulate, HaltReason, PlayResult, SimConfig, SimResults, StoppingCondition, ThreadControl,
};
pub use crate::stats::Stat;
pub use crate::winpct::WinPct;
