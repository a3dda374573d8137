use anyhow::{anyhow, Context, Result};
use clap::Parser;
use crossword_analyzer::{
    infer, position_to_cgp, simulate, Game, HaltReason, Klv, Kwg, LetterDistribution, MoveGen,
    MoveType, RecordMode, SimConfig, SortBy, StoppingCondition, ThreadControl, WinPct,
};
use flexi_logger::Logger;
use std::io::BufRead;
use std::sync::Arc;
use std::thread::JoinHandle;

/// Console analysis engine: line-oriented commands on stdin, one fact per
/// line on stdout.
#[derive(Clone, Debug, Parser)]
struct ConsoleOptions {
    #[arg(short, long)]
    log_level: Option<String>,

    /// packed KWG lexicon file
    #[arg(long)]
    kwg: Option<String>,

    /// KLV leave-value file
    #[arg(long)]
    klv: Option<String>,

    /// letter distribution file (built-in English when absent)
    #[arg(long)]
    ld: Option<String>,

    /// win-percentage CSV
    #[arg(long)]
    winpct: Option<String>,

    #[arg(short, long)]
    threads: Option<usize>,
}

/// Sticky options updated by `setoptions`.
#[derive(Clone, Debug)]
struct SearchOptions {
    plies: u32,
    threads: usize,
    iterations: u64,
    stopping: StoppingCondition,
    check_interval: u64,
    margin: f64,
    seed: u64,
}

/// The single session object: loaded data, sticky options, the current
/// position, and the running search if any.
struct Session {
    kwg: Arc<Kwg>,
    klv: Arc<Klv>,
    ld: Arc<LetterDistribution>,
    winpct: Arc<WinPct>,
    options: SearchOptions,
    cgp: Option<String>,
    control: Arc<ThreadControl>,
    search: Option<JoinHandle<()>>,
}

fn main() -> Result<()> {
    let options = ConsoleOptions::parse();
    let _logger = Logger::try_with_env_or_str(
        options.log_level.clone().unwrap_or_else(|| "info".into()),
    )?
    .start()?;

    let ld = match &options.ld {
        Some(path) => LetterDistribution::from_file(path)?,
        None => LetterDistribution::english(),
    };
    let kwg = match &options.kwg {
        Some(path) => Kwg::from_file(path)?,
        None => return Err(anyhow!("a lexicon is required: pass --kwg <file>")),
    };
    let klv = match &options.klv {
        Some(path) => Klv::from_file(path)?,
        None => Klv::zeroed(),
    };
    let winpct = match &options.winpct {
        Some(path) => WinPct::from_file(path)?,
        None => WinPct::uniform(),
    };

    let mut session = Session {
        kwg: Arc::new(kwg),
        klv: Arc::new(klv),
        ld: Arc::new(ld),
        winpct: Arc::new(winpct),
        options: SearchOptions {
            plies: 2,
            threads: options.threads.unwrap_or(1),
            iterations: 1000,
            stopping: StoppingCondition::None,
            check_interval: 64,
            margin: 0.0,
            seed: 0,
        },
        cgp: None,
        control: Arc::new(ThreadControl::new()),
        search: None,
    };

    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        let args: Vec<&str> = line.split_whitespace().collect();
        let cmd = *args.first().unwrap_or(&"");
        let result = match cmd {
            "" => Ok(()),
            "position" => session.position(&args[1..]),
            "setoptions" => session.set_options(&args[1..]),
            "go" => session.go(&args[1..]),
            "stop" => session.stop(),
            "quit" => {
                session.stop().ok();
                session.join_search();
                return Ok(());
            }
            _ => Err(anyhow!("unrecognized command {}", cmd)),
        };
        match result {
            Ok(()) => log::debug!("command ok: {}", line),
            Err(err) => {
                log::warn!("recoverable error: {:#}", err);
                println!("error {:#}", err);
            }
        }
    }
    Ok(())
}

impl Session {
    fn position(&mut self, args: &[&str]) -> Result<()> {
        match args.first() {
            Some(&"cgp") => {
                let cgp = args[1..].join(" ");
                // validate eagerly so errors surface on the position line
                let mut probe = Game::new(&self.kwg, &self.klv, &self.ld, 0);
                probe.load_cgp(&cgp)?;
                println!("position ok {}", position_to_cgp(&probe));
                self.cgp = Some(cgp);
                Ok(())
            }
            _ => Err(anyhow!("expected: position cgp <fields>")),
        }
    }

    fn set_options(&mut self, args: &[&str]) -> Result<()> {
        let mut it = args.iter();
        while let Some(key) = it.next() {
            let value = it
                .next()
                .ok_or_else(|| anyhow!("option {} has no value", key))?;
            self.apply_option(key, value)?;
        }
        Ok(())
    }

    fn apply_option(&mut self, key: &str, value: &str) -> Result<()> {
        let opts = &mut self.options;
        match key {
            "plies" => opts.plies = value.parse().context("plies")?,
            "threads" => opts.threads = value.parse().context("threads")?,
            "iterations" | "i" => opts.iterations = value.parse().context("iterations")?,
            "checkinterval" => opts.check_interval = value.parse().context("checkinterval")?,
            "margin" => opts.margin = value.parse().context("margin")?,
            "seed" => opts.seed = value.parse().context("seed")?,
            "stopping" => {
                opts.stopping = match value {
                    "none" => StoppingCondition::None,
                    "95" => StoppingCondition::Pct95,
                    "98" => StoppingCondition::Pct98,
                    "99" => StoppingCondition::Pct99,
                    _ => return Err(anyhow!("stopping must be none|95|98|99")),
                }
            }
            _ => return Err(anyhow!("unknown option {}", key)),
        }
        Ok(())
    }

    fn go(&mut self, args: &[&str]) -> Result<()> {
        self.join_search();
        self.control.reset();
        let mode = *args.first().ok_or_else(|| anyhow!("go needs a mode"))?;
        // trailing tokens update the sticky options before the search
        let mut rest = args[1..].iter();
        let mut overrides: Vec<(String, String)> = Vec::new();
        while let Some(key) = rest.next() {
            if let Some(value) = rest.next() {
                overrides.push((String::from(*key), String::from(*value)));
            }
        }
        let infer_args = overrides.clone();
        for (key, value) in &overrides {
            if !matches!(key.as_str(), "tiles" | "score") {
                self.apply_option(key, value)?;
            }
        }

        let cgp = self
            .cgp
            .clone()
            .ok_or_else(|| anyhow!("no position loaded"))?;

        match mode {
            "static" => self.go_static(&cgp),
            "sim" => self.go_sim(&cgp),
            "infer" => self.go_infer(&cgp, &infer_args),
            _ => Err(anyhow!("go mode must be static|sim|infer")),
        }
    }

    fn go_static(&mut self, cgp: &str) -> Result<()> {
        let mut game = Game::new(&self.kwg, &self.klv, &self.ld, self.options.seed);
        game.load_cgp(cgp)?;
        let mut gen = MoveGen::new(RecordMode::All, SortBy::Equity);
        let include = game.exchanges_allowed();
        game.generate_moves(&mut gen, include);
        for mv in gen.move_list.moves().iter().take(20) {
            println!(
                "play {} score {} equity {:.3}",
                mv.notation_on(&self.ld, &game.board),
                mv.score,
                mv.equity
            );
        }
        if let Some(best) = gen.move_list.moves().first() {
            println!("bestmove {}", best.notation_on(&self.ld, &game.board));
        }
        Ok(())
    }

    fn go_sim(&mut self, cgp: &str) -> Result<()> {
        let kwg = Arc::clone(&self.kwg);
        let klv = Arc::clone(&self.klv);
        let ld = Arc::clone(&self.ld);
        let winpct = Arc::clone(&self.winpct);
        let control = Arc::clone(&self.control);
        let config = SimConfig {
            plies: self.options.plies,
            threads: self.options.threads,
            max_iterations: self.options.iterations,
            stopping_condition: self.options.stopping,
            check_interval: self.options.check_interval,
            print_interval: 0,
            seed: self.options.seed,
        };
        let cgp = String::from(cgp);
        self.search = Some(std::thread::spawn(move || {
            let run = || -> Result<()> {
                let mut game = Game::new(&kwg, &klv, &ld, config.seed);
                game.load_cgp(&cgp)?;
                let mut gen = MoveGen::new(RecordMode::All, SortBy::Equity);
                let include = game.exchanges_allowed();
                game.generate_moves(&mut gen, include);
                let candidates: Vec<_> = gen.move_list.moves().iter().take(15).cloned().collect();
                let results = simulate(&game, &candidates, None, &winpct, &config, &control);
                for play in &results.plays {
                    println!(
                        "play {} score {} win {:.3} stderr {:.3} equity {:.3} ignored {}",
                        play.mv.notation_on(&ld, &game.board),
                        play.mv.score,
                        play.win_pct_mean * 100.0,
                        play.win_pct_stderr * 100.0,
                        play.equity_mean,
                        play.ignored
                    );
                }
                println!(
                    "simresult iterations {} halt {}",
                    results.iterations,
                    match results.halt_reason {
                        HaltReason::MaxIterations => "max-iterations",
                        HaltReason::Probabilistic => "probabilistic",
                        HaltReason::UserInterrupt => "user-interrupt",
                    }
                );
                if let Some(best) = results.plays.first() {
                    println!("bestmove {}", best.mv.notation_on(&ld, &game.board));
                }
                Ok(())
            };
            if let Err(err) = run() {
                log::warn!("simulation failed: {:#}", err);
                println!("error {:#}", err);
            }
        }));
        Ok(())
    }

    fn go_infer(&mut self, cgp: &str, args: &[(String, String)]) -> Result<()> {
        let mut tiles = None;
        let mut score = None;
        for (key, value) in args {
            match key.as_str() {
                "tiles" => tiles = Some(value.clone()),
                "score" => score = Some(value.parse::<u32>().context("score")?),
                _ => {}
            }
        }
        let tiles = tiles.ok_or_else(|| anyhow!("infer needs: tiles <TILES>"))?;
        let score = score.ok_or_else(|| anyhow!("infer needs: score <N>"))?;

        let mut game = Game::new(&self.kwg, &self.klv, &self.ld, self.options.seed);
        game.load_cgp(cgp)?;
        let played = self.ld.rack_from_string(&tiles)?;
        let result = infer(&game, &played, MoveType::Play, score, self.options.margin)?;
        println!("inferresult total {}", result.total_draws);
        for (ml, &draws) in result.draws_including_letter.iter().enumerate() {
            if draws > 0 {
                println!(
                    "letter {} draws {}",
                    self.ld.letter_to_string(ml as u8),
                    draws
                );
            }
        }
        for record in result.leaves.iter().take(20) {
            println!(
                "leave {} draws {} value {:.3}",
                self.ld.letters_to_string(&record.leave),
                record.draws,
                record.leave_value
            );
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.control.halt(HaltReason::UserInterrupt);
        Ok(())
    }

    fn join_search(&mut self) {
        if let Some(handle) = self.search.take() {
            let _ = handle.join();
        }
    }
}
