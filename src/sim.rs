//! Monte-Carlo simulation of candidate plays: every candidate is rolled
//! out through N plies of top-equity responses with randomized opponent
//! racks, and the terminal positions feed win-percentage and equity
//! statistics until the iteration budget or the stopping rule ends the
//! run.

use crate::game::{Game, GameEndReason};
use crate::klv::Klv;
use crate::movegen::{MoveGen, SortBy};
use crate::moves::{Move, MoveType, RecordMode};
use crate::rack::Rack;
use crate::stats::{means_separated, Stat, Z_95, Z_98, Z_99};
use crate::winpct::WinPct;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

/// When the stopping rule fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum StoppingCondition {
    None,
    Pct95,
    Pct98,
    Pct99,
}

impl StoppingCondition {
    fn z(self) -> Option<f64> {
        match self {
            StoppingCondition::None => None,
            StoppingCondition::Pct95 => Some(Z_95),
            StoppingCondition::Pct98 => Some(Z_98),
            StoppingCondition::Pct99 => Some(Z_99),
        }
    }
}

/// Why a simulation stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum HaltReason {
    MaxIterations,
    Probabilistic,
    UserInterrupt,
}

/// The shared halt flag plus the reason that set it first.
#[derive(Debug, Default)]
pub struct ThreadControl {
    halted: AtomicBool,
    reason: Mutex<Option<HaltReason>>,
}

impl ThreadControl {
    #[must_use]
    pub fn new() -> ThreadControl {
        ThreadControl::default()
    }

    /// Raise the halt flag; the first caller's reason sticks.
    pub fn halt(&self, reason: HaltReason) {
        let mut guard = self.reason.lock().unwrap();
        if guard.is_none() {
            *guard = Some(reason);
        }
        self.halted.store(true, Ordering::Release);
    }

    pub fn is_halted(&self) -> bool {
        self.halted.load(Ordering::Acquire)
    }

    pub fn reason(&self) -> Option<HaltReason> {
        *self.reason.lock().unwrap()
    }

    pub fn reset(&self) {
        *self.reason.lock().unwrap() = None;
        self.halted.store(false, Ordering::Release);
    }
}

#[derive(Debug, Clone)]
pub struct SimConfig {
    pub plies: u32,
    pub threads: usize,
    pub max_iterations: u64,
    pub stopping_condition: StoppingCondition,
    /// iterations between stopping-rule evaluations
    pub check_interval: u64,
    /// iterations between progress log lines (0 = never)
    pub print_interval: u64,
    pub seed: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        SimConfig {
            plies: 2,
            threads: 1,
            max_iterations: 1000,
            stopping_condition: StoppingCondition::None,
            check_interval: 64,
            print_interval: 0,
            seed: 0,
        }
    }
}

#[derive(Debug, Default)]
struct PlayStats {
    win_pct: Stat,
    equity: Stat,
    leftover: Stat,
    bingo: Stat,
    ply_score: Vec<Stat>,
    ply_bingo: Vec<Stat>,
}

/// One candidate under simulation: the move, its mutex-guarded stats, and
/// the sticky ignore flag the stopping rule sets.
struct SimmedPlay {
    mv: Move,
    stats: Mutex<PlayStats>,
    ignore: AtomicBool,
}

/// One iteration's worth of data for one play, committed under the play's
/// mutex only once the whole iteration finished.
struct IterationRecord {
    win_pct: f64,
    equity: f64,
    leftover: f64,
    ply_records: Vec<(u32, u32, bool)>,
}

/// Per-play results, sorted by win percentage descending.
#[derive(Debug, Clone)]
pub struct PlayResult {
    pub mv: Move,
    pub ignored: bool,
    pub win_pct_mean: f64,
    pub win_pct_stderr: f64,
    pub equity_mean: f64,
    pub equity_stderr: f64,
    pub leftover_mean: f64,
    pub bingo_rate: f64,
    /// per-ply (mean score, bingo rate) of the rollout responses
    pub ply_stats: Vec<(f64, f64)>,
    pub iterations: u64,
}

#[derive(Debug, Clone)]
pub struct SimResults {
    pub plays: Vec<PlayResult>,
    pub iterations: u64,
    pub halt_reason: HaltReason,
}

/// Two plays are interchangeable for the stopping rule when they place
/// the same multiset of tiles on the same squares forming the same word.
fn plays_are_similar(a: &Move, b: &Move) -> bool {
    if a.move_type != b.move_type || a.tiles_played != b.tiles_played {
        return false;
    }
    let multiset = |m: &Move| {
        let mut t: Vec<u8> = m
            .tiles
            .iter()
            .copied()
            .filter(|&ml| ml != crate::letters::PLAYED_THROUGH)
            .collect();
        t.sort_unstable();
        t
    };
    if multiset(a) != multiset(b) {
        return false;
    }
    match a.move_type {
        MoveType::Play => {
            a.row == b.row
                && a.col == b.col
                && a.dir == b.dir
                && a.tiles.iter().eq(b.tiles.iter())
        }
        _ => true,
    }
}

/// Leave value of the rack that remains after `mv` is played from `rack`.
fn leave_value_for_move(klv: &Klv, mv: &Move, rack: &Rack) -> f32 {
    let mut leave = rack.clone();
    for &ml in mv.tiles.iter() {
        if mv.move_type == MoveType::Play && ml == crate::letters::PLAYED_THROUGH {
            continue;
        }
        let t = if crate::letters::is_blanked(ml) { 0 } else { ml };
        if leave.count(t) > 0 {
            leave.take(t);
        }
    }
    klv.leave_value(&leave)
}

fn winpct_value(
    wp: &WinPct,
    spread: i32,
    leftover: f64,
    end_reason: GameEndReason,
    tiles_unseen: u32,
    plies_are_odd: bool,
) -> f64 {
    if end_reason != GameEndReason::None {
        // the game ended; use the actual result
        return if spread == 0 {
            0.5
        } else if spread > 0 {
            1.0
        } else {
            0.0
        };
    }
    let mut spread_plus_leftover = spread + leftover.round() as i32;
    // for an even-ply sim the opponent is on turn at the end; the table is
    // from the mover's perspective, so flip the spread and the probability
    if !plies_are_odd {
        spread_plus_leftover = -spread_plus_leftover;
    }
    let mut pct = wp.win_pct(spread_plus_leftover, tiles_unseen);
    if !plies_are_odd {
        pct = 1.0 - pct;
    }
    pct
}

/// Simulate `candidates` from the seed position. Each worker thread owns a
/// clone of the game (bag reseeded from the config seed plus the thread
/// index) and pulls iteration numbers from a shared atomic counter; the
/// per-play statistics merge under each play's mutex. Returns the plays
/// sorted by win rate descending.
pub fn simulate(
    game: &Game,
    candidates: &[Move],
    known_opp_rack: Option<&Rack>,
    win_pcts: &WinPct,
    config: &SimConfig,
    control: &ThreadControl,
) -> SimResults {
    let plays: Vec<SimmedPlay> = candidates
        .iter()
        .map(|mv| SimmedPlay {
            mv: mv.clone(),
            stats: Mutex::new(PlayStats {
                ply_score: (0..config.plies).map(|_| Stat::new()).collect(),
                ply_bingo: (0..config.plies).map(|_| Stat::new()).collect(),
                ..PlayStats::default()
            }),
            ignore: AtomicBool::new(false),
        })
        .collect();

    let similar: Vec<Vec<bool>> = (0..plays.len())
        .map(|i| {
            (0..plays.len())
                .map(|j| i != j && plays_are_similar(&plays[i].mv, &plays[j].mv))
                .collect()
        })
        .collect();

    let iteration_counter = AtomicU64::new(0);
    let completed = AtomicU64::new(0);
    let initial_player = game.on_turn;
    let initial_spread = game.spread(initial_player);

    if plays.is_empty() || control.is_halted() {
        return SimResults {
            plays: Vec::new(),
            iterations: 0,
            halt_reason: control.reason().unwrap_or(HaltReason::UserInterrupt),
        };
    }

    std::thread::scope(|scope| {
        for thread_index in 0..config.threads.max(1) {
            let plays = &plays;
            let similar = &similar;
            let iteration_counter = &iteration_counter;
            let completed = &completed;
            scope.spawn(move || {
                let mut clone = game.clone();
                clone
                    .bag
                    .reseed(config.seed.wrapping_add(thread_index as u64));
                let mut gen = MoveGen::new(RecordMode::Best, SortBy::Equity);
                let mut rack_placeholder = Rack::new(game.ld.size());

                loop {
                    if control.is_halted() {
                        break;
                    }
                    let iteration = iteration_counter.fetch_add(1, Ordering::AcqRel);
                    if iteration >= config.max_iterations {
                        // the counter pre-claims iterations, so every
                        // worker runs out on its own; no halt needed
                        break;
                    }
                    if config.print_interval > 0
                        && iteration > 0
                        && iteration % config.print_interval == 0
                    {
                        log::info!("simulation iteration {}", iteration);
                    }

                    // fresh hidden rack and bag order for this iteration
                    clone.set_random_rack(1 - initial_player, known_opp_rack);
                    clone.bag.shuffle();

                    // an iteration commits for all plays or not at all; a
                    // halted worker discards its partial work
                    let mut records: Vec<Option<IterationRecord>> = Vec::with_capacity(plays.len());
                    let mut aborted = false;
                    for play in plays.iter() {
                        if control.is_halted() {
                            aborted = true;
                            break;
                        }
                        if play.ignore.load(Ordering::Relaxed) {
                            records.push(None);
                            continue;
                        }

                        clone.set_backup_mode(true);
                        clone.play_move(&play.mv);
                        clone.set_backup_mode(false);

                        let mut leftover = 0.0f64;
                        let mut ply_records: Vec<(u32, u32, bool)> = Vec::new();
                        for ply in 0..config.plies {
                            if clone.is_over() {
                                break;
                            }
                            let onturn = clone.on_turn;
                            let best = clone.best_equity_move(&mut gen);
                            rack_placeholder.clone_from(&clone.players[onturn].rack);
                            clone.play_move(&best);

                            if ply + 2 >= config.plies {
                                let value =
                                    leave_value_for_move(clone.klv, &best, &rack_placeholder)
                                        as f64;
                                if onturn == initial_player {
                                    leftover += value;
                                } else {
                                    leftover -= value;
                                }
                            }
                            ply_records.push((ply, best.score, best.tiles_played == 7));
                        }

                        let spread = clone.spread(initial_player);
                        let tiles_unseen = clone.tiles_unseen_by(initial_player);
                        let wpct = winpct_value(
                            win_pcts,
                            spread,
                            leftover,
                            clone.end_reason,
                            tiles_unseen,
                            config.plies % 2 == 1,
                        );
                        records.push(Some(IterationRecord {
                            win_pct: wpct,
                            equity: (spread - initial_spread) as f64 + leftover,
                            leftover,
                            ply_records,
                        }));

                        clone.unplay_last_move();
                    }
                    if aborted {
                        break;
                    }

                    for (play, record) in plays.iter().zip(records) {
                        let record = match record {
                            Some(r) => r,
                            None => continue,
                        };
                        let mut stats = play.stats.lock().unwrap();
                        stats.win_pct.push(record.win_pct);
                        stats.equity.push(record.equity);
                        stats.leftover.push(record.leftover);
                        stats
                            .bingo
                            .push(if play.mv.tiles_played == 7 { 1.0 } else { 0.0 });
                        for &(ply, score, bingo) in &record.ply_records {
                            stats.ply_score[ply as usize].push(score as f64);
                            stats.ply_bingo[ply as usize].push(if bingo { 1.0 } else { 0.0 });
                        }
                    }
                    completed.fetch_add(1, Ordering::AcqRel);

                    // the stopping rule runs on thread 0 at interval
                    // boundaries
                    if thread_index == 0
                        && iteration > 0
                        && iteration % config.check_interval.max(1) == 0
                    {
                        if let Some(z) = config.stopping_condition.z() {
                            if evaluate_stopping_rule(plays, similar, z) {
                                control.halt(HaltReason::Probabilistic);
                                break;
                            }
                        }
                    }
                }
            });
        }
    });

    let mut results: Vec<PlayResult> = plays
        .iter()
        .map(|play| {
            let stats = play.stats.lock().unwrap();
            PlayResult {
                mv: play.mv.clone(),
                ignored: play.ignore.load(Ordering::Relaxed),
                win_pct_mean: stats.win_pct.mean(),
                win_pct_stderr: stats.win_pct.standard_error(Z_99),
                equity_mean: stats.equity.mean(),
                equity_stderr: stats.equity.standard_error(Z_99),
                leftover_mean: stats.leftover.mean(),
                bingo_rate: stats.bingo.mean(),
                ply_stats: stats
                    .ply_score
                    .iter()
                    .zip(stats.ply_bingo.iter())
                    .map(|(s, b)| (s.mean(), b.mean()))
                    .collect(),
                iterations: stats.win_pct.weight(),
            }
        })
        .collect();
    results.sort_by(|a, b| {
        b.win_pct_mean
            .partial_cmp(&a.win_pct_mean)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(
                b.equity_mean
                    .partial_cmp(&a.equity_mean)
                    .unwrap_or(std::cmp::Ordering::Equal),
            )
    });

    SimResults {
        plays: results,
        iterations: completed.load(Ordering::Acquire),
        halt_reason: control.reason().unwrap_or(HaltReason::MaxIterations),
    }
}

/// Mark challengers that are statistically dominated by the current
/// leader; returns true when only the leader is left standing.
fn evaluate_stopping_rule(plays: &[SimmedPlay], similar: &[Vec<bool>], z: f64) -> bool {
    // snapshot the win stats in index order (one lock at a time)
    let snapshots: Vec<(usize, Stat)> = plays
        .iter()
        .enumerate()
        .filter(|(_, p)| !p.ignore.load(Ordering::Relaxed))
        .map(|(i, p)| (i, p.stats.lock().unwrap().win_pct.clone()))
        .collect();
    if snapshots.len() <= 1 {
        return snapshots.len() == 1;
    }
    let top = snapshots
        .iter()
        .max_by(|a, b| {
            a.1.mean()
                .partial_cmp(&b.1.mean())
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|(i, s)| (*i, s.clone()))
        .unwrap();

    let mut remaining = 0;
    for (i, stat) in &snapshots {
        if *i == top.0 {
            continue;
        }
        if similar[top.0][*i] || means_separated(&top.1, stat, z) {
            plays[*i].ignore.store(true, Ordering::Relaxed);
        } else {
            remaining += 1;
        }
    }
    remaining == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cross_set::generate_all_cross_sets;
    use crate::distribution::LetterDistribution;
    use crate::kwg::{Kwg, KwgBuilder};
    use crate::moves::RecordMode;

    fn setup() -> (Kwg, Klv, LetterDistribution) {
        let ld = LetterDistribution::english();
        let kwg = KwgBuilder::from_words(
            &["QI", "ZA", "AB", "BA", "AA", "AI", "QIS", "ZAS", "ABS"],
            &ld,
        )
        .unwrap()
        .build();
        (kwg, Klv::zeroed(), ld)
    }

    fn candidates(game: &mut Game) -> Vec<Move> {
        let mut gen = MoveGen::new(RecordMode::All, SortBy::Equity);
        let include = game.exchanges_allowed();
        game.generate_moves(&mut gen, include);
        gen.move_list
            .moves()
            .iter()
            .filter(|m| m.move_type == MoveType::Play)
            .take(4)
            .cloned()
            .collect()
    }

    fn seed_game<'a>(
        kwg: &'a Kwg,
        klv: &'a Klv,
        ld: &'a LetterDistribution,
    ) -> Game<'a> {
        let mut game = Game::new(kwg, klv, ld, 99);
        game.players[0].rack = ld.rack_from_string("QIZABAA").unwrap();
        game.draw_letters_from_bag(&ld.string_to_letters("QIZABAA").unwrap());
        game.draw_at_most(1, 7);
        generate_all_cross_sets(&mut game.board, kwg, ld);
        game.board.update_all_anchors();
        game
    }

    #[test]
    fn test_rollback_correctness() {
        let (kwg, klv, ld) = setup();
        let mut game = seed_game(&kwg, &klv, &ld);
        let cands = candidates(&mut game);
        assert!(!cands.is_empty());
        let tiles_before = game.board.tiles_played();

        let control = ThreadControl::new();
        let config = SimConfig {
            plies: 2,
            threads: 1,
            max_iterations: 20,
            ..SimConfig::default()
        };
        let results = simulate(&game, &cands, None, &WinPct::uniform(), &config, &control);
        assert_eq!(results.iterations, 20);
        assert_eq!(results.halt_reason, HaltReason::MaxIterations);
        // the seed game is untouched
        assert_eq!(game.board.tiles_played(), tiles_before);
        for play in &results.plays {
            assert_eq!(play.iterations, 20);
            assert!(play.win_pct_mean >= 0.0 && play.win_pct_mean <= 1.0);
            assert_eq!(play.ply_stats.len(), 2);
        }
    }

    #[test]
    fn test_multithreaded_counts() {
        let (kwg, klv, ld) = setup();
        let mut game = seed_game(&kwg, &klv, &ld);
        let cands = candidates(&mut game);
        let control = ThreadControl::new();
        let config = SimConfig {
            plies: 1,
            threads: 3,
            max_iterations: 50,
            ..SimConfig::default()
        };
        let results = simulate(&game, &cands, None, &WinPct::uniform(), &config, &control);
        assert_eq!(results.iterations, 50);
        for play in &results.plays {
            assert_eq!(play.iterations, 50);
        }
    }

    #[test]
    fn test_deterministic_with_fixed_seed() {
        let (kwg, klv, ld) = setup();
        let mut game = seed_game(&kwg, &klv, &ld);
        let cands = candidates(&mut game);
        let config = SimConfig {
            plies: 2,
            threads: 1,
            max_iterations: 10,
            seed: 7,
            ..SimConfig::default()
        };
        let a = simulate(
            &game,
            &cands,
            None,
            &WinPct::uniform(),
            &config,
            &ThreadControl::new(),
        );
        let b = simulate(
            &game,
            &cands,
            None,
            &WinPct::uniform(),
            &config,
            &ThreadControl::new(),
        );
        for (x, y) in a.plays.iter().zip(b.plays.iter()) {
            assert_eq!(x.mv, y.mv);
            assert!((x.win_pct_mean - y.win_pct_mean).abs() < 1e-12);
            assert!((x.equity_mean - y.equity_mean).abs() < 1e-12);
        }
    }

    #[test]
    fn test_better_play_ranks_first() {
        // rig the position: one candidate scores far above the others, the
        // spread carries straight into the win estimate
        let (kwg, klv, ld) = setup();
        let mut game = seed_game(&kwg, &klv, &ld);
        let mut gen = MoveGen::new(RecordMode::All, SortBy::Equity);
        let include = game.exchanges_allowed();
        game.generate_moves(&mut gen, include);
        let moves = gen.move_list.moves();
        let best = moves
            .iter()
            .filter(|m| m.move_type == MoveType::Play)
            .max_by_key(|m| m.score)
            .unwrap()
            .clone();
        let worst = moves
            .iter()
            .filter(|m| m.move_type == MoveType::Play)
            .min_by_key(|m| m.score)
            .unwrap()
            .clone();
        assert!(best.score > worst.score);

        // a steep linear table so spread dominates
        let mut csv = String::from("spread");
        for c in 0..94 {
            csv.push_str(&format!(",{}", c));
        }
        csv.push('\n');
        for spread in (-300..=300).rev() {
            csv.push_str(&spread.to_string());
            for _ in 0..94 {
                let p = 0.5 + (spread as f64) / 600.0;
                csv.push_str(&format!(",{:.4}", p));
            }
            csv.push('\n');
        }
        let wp = WinPct::from_csv(&csv).unwrap();

        let config = SimConfig {
            plies: 0,
            threads: 2,
            max_iterations: 40,
            ..SimConfig::default()
        };
        let results = simulate(
            &game,
            &[best.clone(), worst.clone()],
            None,
            &wp,
            &config,
            &ThreadControl::new(),
        );
        assert_eq!(results.plays[0].mv, best);
        assert!(results.plays[0].win_pct_mean > results.plays[1].win_pct_mean);
    }

    #[test]
    fn test_external_halt_is_noop() {
        let (kwg, klv, ld) = setup();
        let mut game = seed_game(&kwg, &klv, &ld);
        let cands = candidates(&mut game);
        let control = ThreadControl::new();
        control.halt(HaltReason::UserInterrupt);
        let results = simulate(
            &game,
            &cands,
            None,
            &WinPct::uniform(),
            &SimConfig::default(),
            &control,
        );
        assert_eq!(results.iterations, 0);
        assert_eq!(results.halt_reason, HaltReason::UserInterrupt);
    }

    #[test]
    fn test_stopping_rule_dominance() {
        let (kwg, klv, ld) = setup();
        let mut game = seed_game(&kwg, &klv, &ld);
        let cands = candidates(&mut game);
        // all-0.5 table: win stats are constant, nothing separates, so the
        // run must end on max iterations, never probabilistically
        let control = ThreadControl::new();
        let config = SimConfig {
            plies: 1,
            threads: 1,
            max_iterations: 30,
            stopping_condition: StoppingCondition::Pct95,
            check_interval: 5,
            ..SimConfig::default()
        };
        let results = simulate(&game, &cands, None, &WinPct::uniform(), &config, &control);
        assert_eq!(results.halt_reason, HaltReason::MaxIterations);
    }

    #[test]
    fn test_plays_are_similar() {
        let mut a = Move::pass();
        a.move_type = MoveType::Exchange;
        a.tiles.push(17);
        a.tiles.push(9);
        a.tiles_played = 2;
        let mut b = Move::pass();
        b.move_type = MoveType::Exchange;
        b.tiles.push(9);
        b.tiles.push(17);
        b.tiles_played = 2;
        assert!(plays_are_similar(&a, &b));
        let mut c = b.clone();
        c.tiles.push(1);
        c.tiles_played = 3;
        assert!(!plays_are_similar(&a, &c));
    }
}
