//! Rack inference: given an observed play and the pool of unseen tiles,
//! find every leave the opponent could have held such that the observed
//! play was (within an equity margin) their best available move, and
//! weight each surviving leave by its draw probability.

use crate::error::Error;
use crate::game::{Game, RACK_SIZE};
use crate::letters::MachineLetter;
use crate::movegen::{MoveGen, SortBy};
use crate::moves::{MoveType, RecordMode};
use crate::rack::Rack;
#[cfg(feature = "rayon")]
use rayon::prelude::*;

const EQUITY_EPSILON: f64 = 1e-9;

/// Why an inference request was refused, or how it completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum InferenceStatus {
    Success,
    /// Too few tiles in the bag to hide anything: the remaining tiles are
    /// reported exactly.
    RemainingTilesKnown,
    NoTilesPlayed,
    RackOverflow,
    TilesPlayedNotInBag,
    RacksNotEmpty,
    ExchangeScoreNotZero,
    ExchangeNotAllowed,
}

/// One surviving leave with its draw weight.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct LeaveRecord {
    pub leave: Vec<MachineLetter>,
    pub draws: u64,
    pub leave_value: f32,
}

/// The aggregated inference result.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Inference {
    pub status: InferenceStatus,
    /// total weighted draws over all surviving leaves
    pub total_draws: u64,
    /// per machine letter, draws of leaves containing it
    pub draws_including_letter: Vec<u64>,
    /// surviving leaves, most probable first
    pub leaves: Vec<LeaveRecord>,
}

fn choose(n: u64, k: u64) -> u64 {
    if k > n {
        return 0;
    }
    let mut result = 1u64;
    for i in 0..k {
        result = result * (n - i) / (i + 1);
    }
    result
}

fn enumerate_leaves(
    bag: &Rack,
    size: u32,
    start: MachineLetter,
    current: &mut Rack,
    out: &mut Vec<Rack>,
) {
    if current.len() == size {
        out.push(current.clone());
        return;
    }
    for ml in start..bag.alphabet_size() as MachineLetter {
        if bag.count(ml) > current.count(ml) {
            current.add(ml);
            enumerate_leaves(bag, size, ml, current, out);
            current.take(ml);
        }
    }
}

fn draw_weight(bag_after_play: &Rack, leave: &Rack) -> u64 {
    let mut ways = 1u64;
    for ml in leave.present_letters() {
        ways *= choose(bag_after_play.count(ml) as u64, leave.count(ml) as u64);
    }
    ways
}

/// Would the generator have settled for the observed play holding
/// `played + leave`?
fn within_equity_margin(
    base: &Game,
    played: &Rack,
    leave: &Rack,
    observed_score: u32,
    equity_margin: f64,
) -> bool {
    let mut game = base.clone();
    let on_turn = game.on_turn;
    let mut full_rack = played.clone();
    for ml in leave.as_letters() {
        full_rack.add(ml);
        game.bag.draw_letter(ml);
    }
    game.players[on_turn].rack = full_rack;
    let mut gen = MoveGen::new(RecordMode::Best, SortBy::Equity);
    let best = game.best_equity_move(&mut gen);
    let observed_equity = observed_score as f64 + game.klv.leave_value(leave) as f64;
    observed_equity + equity_margin + EQUITY_EPSILON >= best.equity
}

/// Infer the opponent's leave from an observed play.
///
/// `game` is the position *before* the play, with both racks empty and
/// every unseen tile in the bag. `tiles_played` is the multiset of tiles
/// the play placed (blanks as the blank letter), `observed_score` its
/// score.
///
/// ## Errors
/// [`Error::InferenceRefused`] when the request is inconsistent with the
/// position: tiles that are not in the bag, more than a rackful played, a
/// scoring exchange, or racks that are not empty.
pub fn infer(
    game: &Game,
    tiles_played: &Rack,
    move_type: MoveType,
    observed_score: u32,
    equity_margin: f64,
) -> Result<Inference, Error> {
    let ld_size = game.ld.size();
    if !game.players[0].rack.is_empty() || !game.players[1].rack.is_empty() {
        return Err(Error::InferenceRefused(InferenceStatus::RacksNotEmpty));
    }
    match move_type {
        MoveType::Play => {}
        MoveType::Exchange if observed_score != 0 => {
            return Err(Error::InferenceRefused(
                InferenceStatus::ExchangeScoreNotZero,
            ));
        }
        MoveType::Exchange => {
            return Err(Error::InferenceRefused(InferenceStatus::ExchangeNotAllowed));
        }
        MoveType::Pass => {
            return Err(Error::InferenceRefused(InferenceStatus::NoTilesPlayed));
        }
    }
    if tiles_played.is_empty() {
        return Err(Error::InferenceRefused(InferenceStatus::NoTilesPlayed));
    }
    if tiles_played.len() > RACK_SIZE {
        return Err(Error::InferenceRefused(InferenceStatus::RackOverflow));
    }

    // with (almost) nothing hidden the answer is exact
    if game.bag.len() <= RACK_SIZE as usize {
        let mut draws_including_letter = vec![0u64; ld_size];
        for &t in game.bag.tiles() {
            draws_including_letter[t as usize] = 1;
        }
        return Ok(Inference {
            status: InferenceStatus::RemainingTilesKnown,
            total_draws: 1,
            draws_including_letter,
            leaves: Vec::new(),
        });
    }

    // pull the played tiles out of the bag; failure means the observation
    // is inconsistent with the position
    let mut base = game.clone();
    for ml in tiles_played.as_letters() {
        if !base.bag.draw_letter(ml) {
            return Err(Error::InferenceRefused(
                InferenceStatus::TilesPlayedNotInBag,
            ));
        }
    }

    let leave_size = RACK_SIZE - tiles_played.len();
    let bag_after_play = base.bag.as_rack(ld_size);
    let mut candidates = Vec::new();
    if leave_size == 0 {
        candidates.push(Rack::new(ld_size));
    } else {
        let mut scratch = Rack::new(ld_size);
        enumerate_leaves(&bag_after_play, leave_size, 0, &mut scratch, &mut candidates);
    }

    let evaluate = |leave: &Rack| -> bool {
        within_equity_margin(&base, tiles_played, leave, observed_score, equity_margin)
    };
    #[cfg(feature = "rayon")]
    let accepted: Vec<bool> = candidates.par_iter().map(evaluate).collect();
    #[cfg(not(feature = "rayon"))]
    let accepted: Vec<bool> = candidates.iter().map(evaluate).collect();

    let mut total_draws = 0u64;
    let mut draws_including_letter = vec![0u64; ld_size];
    let mut leaves = Vec::new();
    for (leave, ok) in candidates.iter().zip(accepted) {
        if !ok {
            continue;
        }
        let draws = draw_weight(&bag_after_play, leave);
        total_draws += draws;
        for ml in leave.present_letters() {
            draws_including_letter[ml as usize] += draws;
        }
        leaves.push(LeaveRecord {
            leave: leave.as_letters(),
            draws,
            leave_value: game.klv.leave_value(leave),
        });
    }
    leaves.sort_by(|a, b| b.draws.cmp(&a.draws).then(a.leave.cmp(&b.leave)));

    Ok(Inference {
        status: InferenceStatus::Success,
        total_draws,
        draws_including_letter,
        leaves,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distribution::LetterDistribution;
    use crate::klv::Klv;
    use crate::kwg::{Kwg, KwgBuilder};

    fn setup() -> (Kwg, Klv, LetterDistribution) {
        let ld = LetterDistribution::english();
        let kwg = KwgBuilder::from_words(&["AAAABB", "ZA"], &ld).unwrap().build();
        (kwg, Klv::zeroed(), ld)
    }

    #[test]
    fn test_inference_excludes_refuted_letters() {
        let (kwg, klv, ld) = setup();
        let game = Game::new(&kwg, &klv, &ld, 3);
        // observed: AAAABB through the center for 20
        let played = ld.rack_from_string("AAAABB").unwrap();
        let result = infer(&game, &played, MoveType::Play, 20, 0.0).unwrap();
        assert_eq!(result.status, InferenceStatus::Success);

        // holding a Z, ZA (22) beats the observed 20: Z is impossible
        assert_eq!(result.draws_including_letter[26], 0);
        // a C changes nothing: 4 in the bag, all draws survive
        assert_eq!(result.draws_including_letter[3], 4);
        // 5 As are left after the play
        assert_eq!(result.draws_including_letter[1], 5);

        // total = all bag tiles except the Z
        let bag_total = 100 - 6;
        assert_eq!(result.total_draws, bag_total - 1);
        assert!(result.leaves.iter().all(|l| l.leave != vec![26]));
        // most probable single-tile leave first
        assert!(result.leaves[0].draws >= result.leaves.last().unwrap().draws);
    }

    #[test]
    fn test_inference_with_margin() {
        let (kwg, klv, ld) = setup();
        let game = Game::new(&kwg, &klv, &ld, 3);
        let played = ld.rack_from_string("AAAABB").unwrap();
        // a 2-point margin forgives the 22-vs-20 gap: Z becomes possible
        let result = infer(&game, &played, MoveType::Play, 20, 2.0).unwrap();
        assert_eq!(result.draws_including_letter[26], 1);
    }

    #[test]
    fn test_refusals() {
        let (kwg, klv, ld) = setup();
        let mut game = Game::new(&kwg, &klv, &ld, 3);

        // two Qs cannot have been played
        let played = {
            let mut r = Rack::new(ld.size());
            r.add(17);
            r.add(17);
            r
        };
        assert!(matches!(
            infer(&game, &played, MoveType::Play, 40, 0.0),
            Err(Error::InferenceRefused(
                InferenceStatus::TilesPlayedNotInBag
            ))
        ));

        // more than a rackful
        let played = ld.rack_from_string("AAAABBBB").unwrap();
        assert!(matches!(
            infer(&game, &played, MoveType::Play, 40, 0.0),
            Err(Error::InferenceRefused(InferenceStatus::RackOverflow))
        ));

        // a scoring exchange is nonsense
        let played = ld.rack_from_string("AB").unwrap();
        assert!(matches!(
            infer(&game, &played, MoveType::Exchange, 5, 0.0),
            Err(Error::InferenceRefused(
                InferenceStatus::ExchangeScoreNotZero
            ))
        ));

        // racks must be empty
        game.players[0].rack.add(1);
        assert!(matches!(
            infer(&game, &played, MoveType::Play, 8, 0.0),
            Err(Error::InferenceRefused(InferenceStatus::RacksNotEmpty))
        ));
    }

    #[test]
    fn test_nearly_empty_bag_reports_remaining() {
        let (kwg, klv, ld) = setup();
        let mut game = Game::new(&kwg, &klv, &ld, 3);
        // drain the bag down to 5 tiles
        while game.bag.len() > 5 {
            game.bag.draw_random();
        }
        let remaining: Vec<_> = game.bag.tiles().to_vec();
        let played = ld.rack_from_string("A").unwrap();
        let result = infer(&game, &played, MoveType::Play, 2, 0.0).unwrap();
        assert_eq!(result.status, InferenceStatus::RemainingTilesKnown);
        assert_eq!(result.total_draws, 1);
        for &t in &remaining {
            assert_eq!(result.draws_including_letter[t as usize], 1);
        }
    }
}
