//! CGP (compact game position) parsing and serialization.
//!
//! `<board> <rack0>/<rack1> <score0>/<score1> <scoreless> [op value;]...`
//! where the board is 15 `/`-separated run-length-encoded rows, lowercase
//! letters are designated blanks and `?` is the undesignated blank.

use crate::cross_set::generate_all_cross_sets;
use crate::distribution::LetterDistribution;
use crate::error::Error;
use crate::game::{Game, GameEndReason, MAX_SCORELESS_TURNS};
use crate::letters::MachineLetter;

/// The optional trailing opcodes of a CGP string.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CgpOptions {
    /// `bb <int>`: bingo bonus override
    pub bingo_bonus: Option<u32>,
    /// `bdn <name>`: board layout name
    pub board_name: Option<String>,
    /// `var <classic|wordsmog>`
    pub variant: Option<String>,
    /// `ld <name>`: letter distribution name
    pub letter_distribution: Option<String>,
    /// `lex <name>`
    pub lexicon: Option<String>,
}

/// A parsed position before it is applied to a game.
#[derive(Debug, Clone, PartialEq)]
pub struct CgpPosition {
    pub rows: Vec<Vec<MachineLetter>>,
    pub racks: [Vec<MachineLetter>; 2],
    pub scores: [i32; 2],
    pub consecutive_scoreless_turns: u32,
    pub options: CgpOptions,
}

fn parse_row(row: &str, dim: usize, ld: &LetterDistribution) -> Result<Vec<MachineLetter>, Error> {
    let mut out = Vec::with_capacity(dim);
    let mut digits = String::new();
    for c in row.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
        } else {
            if !digits.is_empty() {
                let run: usize = digits
                    .parse()
                    .map_err(|_| Error::CgpParseError(format!("bad run length in \"{}\"", row)))?;
                if run == 0 || run > dim {
                    return Err(Error::CgpParseError(format!(
                        "run length {} outside 1..{}",
                        run, dim
                    )));
                }
                out.resize(out.len() + run, 0);
                digits.clear();
            }
            if c.is_alphabetic() {
                let ml = ld
                    .string_to_letters(&c.to_string())?
                    .into_iter()
                    .next()
                    .ok_or_else(|| Error::InvalidTileToken(c.to_string()))?;
                out.push(ml);
            } else {
                return Err(Error::CgpParseError(format!(
                    "unexpected '{}' in board row",
                    c
                )));
            }
        }
    }
    if !digits.is_empty() {
        let run: usize = digits
            .parse()
            .map_err(|_| Error::CgpParseError(format!("bad run length in \"{}\"", row)))?;
        if run == 0 || run > dim {
            return Err(Error::CgpParseError(format!(
                "run length {} outside 1..{}",
                run, dim
            )));
        }
        out.resize(out.len() + run, 0);
    }
    if out.len() != dim {
        return Err(Error::InvalidRowWidth {
            row: String::from(row),
            width: out.len(),
            expect: dim,
        });
    }
    Ok(out)
}

fn parse_rack(rack: &str, ld: &LetterDistribution) -> Result<Vec<MachineLetter>, Error> {
    let mut out = Vec::new();
    for c in rack.chars() {
        if c == '?' {
            out.push(0);
        } else if c.is_uppercase() {
            out.push(
                ld.string_to_letters(&c.to_string())?
                    .into_iter()
                    .next()
                    .ok_or_else(|| Error::InvalidTileToken(c.to_string()))?,
            );
        } else {
            return Err(Error::CgpParseError(format!("bad rack letter '{}'", c)));
        }
    }
    Ok(out)
}

fn parse_score(s: &str) -> Result<i32, Error> {
    s.parse().map_err(|_| Error::InvalidScore(String::from(s)))
}

/// Parse a CGP string against a board dimension and distribution.
/// ## Errors
/// On any malformed field, per the shapes above; no state is changed.
pub fn parse_cgp(cgp: &str, dim: usize, ld: &LetterDistribution) -> Result<CgpPosition, Error> {
    let mut fields = cgp.split_whitespace();
    let board_field = fields
        .next()
        .ok_or_else(|| Error::CgpParseError(String::from("missing board field")))?;
    let racks_field = fields
        .next()
        .ok_or_else(|| Error::CgpParseError(String::from("missing racks field")))?;
    let scores_field = fields
        .next()
        .ok_or_else(|| Error::CgpParseError(String::from("missing scores field")))?;
    let zeros_field = fields
        .next()
        .ok_or_else(|| Error::CgpParseError(String::from("missing scoreless-turns field")))?;

    let row_strs: Vec<&str> = board_field.split('/').collect();
    if row_strs.len() != dim {
        return Err(Error::InvalidRowCount(row_strs.len(), dim));
    }
    let rows = row_strs
        .iter()
        .map(|r| parse_row(r, dim, ld))
        .collect::<Result<Vec<_>, Error>>()?;

    let rack_strs: Vec<&str> = racks_field.split('/').collect();
    if rack_strs.len() != 2 {
        return Err(Error::CgpParseError(format!(
            "{} racks (expect 2)",
            rack_strs.len()
        )));
    }
    let racks = [parse_rack(rack_strs[0], ld)?, parse_rack(rack_strs[1], ld)?];

    let score_strs: Vec<&str> = scores_field.split('/').collect();
    if score_strs.len() != 2 {
        return Err(Error::CgpParseError(format!(
            "{} scores (expect 2)",
            score_strs.len()
        )));
    }
    let scores = [parse_score(score_strs[0])?, parse_score(score_strs[1])?];

    let consecutive_scoreless_turns = zeros_field
        .parse()
        .map_err(|_| Error::CgpParseError(format!("bad scoreless turns \"{}\"", zeros_field)))?;

    let mut options = CgpOptions::default();
    let rest: Vec<&str> = fields.collect();
    let mut i = 0;
    while i < rest.len() {
        let op = rest[i];
        i += 1;
        let mut value = String::new();
        let mut terminated = false;
        while i < rest.len() {
            let tok = rest[i];
            i += 1;
            if !value.is_empty() {
                value.push(' ');
            }
            if let Some(stripped) = tok.strip_suffix(';') {
                value.push_str(stripped);
                terminated = true;
                break;
            }
            value.push_str(tok);
        }
        if !terminated {
            return Err(Error::CgpParseError(format!(
                "opcode \"{}\" not terminated with ';'",
                op
            )));
        }
        match op {
            "bb" => {
                options.bingo_bonus = Some(
                    value
                        .parse()
                        .map_err(|_| Error::CgpParseError(format!("bad bb value \"{}\"", value)))?,
                )
            }
            "bdn" => options.board_name = Some(value),
            "var" => options.variant = Some(value),
            "ld" => options.letter_distribution = Some(value),
            "lex" => options.lexicon = Some(value),
            _ => return Err(Error::CgpParseError(format!("unknown opcode \"{}\"", op))),
        }
    }

    Ok(CgpPosition {
        rows,
        racks,
        scores,
        consecutive_scoreless_turns,
        options,
    })
}

/// Serialize a position back to its CGP base fields.
pub fn position_to_cgp(game: &Game) -> String {
    debug_assert!(!game.board.is_transposed());
    let dim = game.board.dim();
    let mut rows = Vec::with_capacity(dim);
    for row in 0..dim {
        let mut s = String::new();
        let mut run = 0;
        for col in 0..dim {
            let ml = game.board.letter(row, col);
            if ml == 0 {
                run += 1;
            } else {
                if run > 0 {
                    s.push_str(&run.to_string());
                    run = 0;
                }
                s.push_str(&game.ld.letter_to_string(ml));
            }
        }
        if run > 0 {
            s.push_str(&run.to_string());
        }
        rows.push(s);
    }
    let rack_str = |rack: &crate::rack::Rack| -> String {
        rack.as_letters()
            .iter()
            .map(|&ml| if ml == 0 { String::from("?") } else { game.ld.letter_to_string(ml) })
            .collect()
    };
    format!(
        "{} {}/{} {}/{} {}",
        rows.join("/"),
        rack_str(&game.players[0].rack),
        rack_str(&game.players[1].rack),
        game.players[0].score,
        game.players[1].score,
        game.consecutive_scoreless_turns
    )
}

impl<'a> Game<'a> {
    /// Load a CGP position into this game: board tiles and racks are drawn
    /// out of the bag, cross-sets and anchors are regenerated, and the end
    /// reason is derived. Returns the parsed opcodes.
    ///
    /// ## Errors
    /// On malformed CGP the game keeps its previous state.
    pub fn load_cgp(&mut self, cgp: &str) -> Result<CgpOptions, Error> {
        let position = parse_cgp(cgp, self.board.dim(), self.ld)?;
        self.reset();

        let dim = self.board.dim();
        for (row, letters) in position.rows.iter().enumerate() {
            for (col, &ml) in letters.iter().enumerate() {
                if ml != 0 {
                    self.board.set_letter_by_index(row * dim + col, ml);
                    self.board.add_tiles_played(1);
                    self.draw_letters_from_bag(&[ml]);
                }
            }
        }
        for (i, rack) in position.racks.iter().enumerate() {
            for &ml in rack {
                self.draw_letters_from_bag(&[ml]);
                self.players[i].rack.add(ml);
            }
        }
        self.players[0].score = position.scores[0];
        self.players[1].score = position.scores[1];
        self.consecutive_scoreless_turns = position.consecutive_scoreless_turns;
        self.on_turn = 0;

        if let Some(bonus) = position.options.bingo_bonus {
            self.board.set_bingo_bonus(bonus);
        }

        generate_all_cross_sets(&mut self.board, self.kwg, self.ld);
        self.board.update_all_anchors();

        self.end_reason = if self.consecutive_scoreless_turns >= MAX_SCORELESS_TURNS {
            GameEndReason::ConsecutiveZeros
        } else if self.bag.is_empty()
            && (self.players[0].rack.is_empty() || self.players[1].rack.is_empty())
        {
            GameEndReason::Standard
        } else {
            GameEndReason::None
        };

        Ok(position.options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::klv::Klv;
    use crate::kwg::KwgBuilder;
    use crate::letters::blanked;

    fn setup() -> (crate::kwg::Kwg, Klv, LetterDistribution) {
        let ld = LetterDistribution::english();
        let kwg = KwgBuilder::from_words(&["QI", "AB"], &ld).unwrap().build();
        (kwg, Klv::zeroed(), ld)
    }

    const MIDGAME: &str = "15/15/15/15/15/15/15/6QI7/15/15/15/15/15/15/15 ABCDEFG/HIJKLMN 22/0 0 lex CSW21;";

    #[test]
    fn test_parse_and_apply() {
        let (kwg, klv, ld) = setup();
        let mut game = Game::new(&kwg, &klv, &ld, 1);
        let opts = game.load_cgp(MIDGAME).unwrap();
        assert_eq!(opts.lexicon.as_deref(), Some("CSW21"));
        assert_eq!(game.board.letter(7, 6), 17);
        assert_eq!(game.board.letter(7, 7), 9);
        assert_eq!(game.board.tiles_played(), 2);
        assert_eq!(game.players[0].score, 22);
        assert_eq!(game.players[0].rack.len(), 7);
        assert_eq!(game.end_reason, GameEndReason::None);
        // Q, I and the 14 rack tiles left the bag
        assert_eq!(game.bag.len(), 100 - 16);
    }

    #[test]
    fn test_round_trip() {
        let (kwg, klv, ld) = setup();
        let mut game = Game::new(&kwg, &klv, &ld, 1);
        game.load_cgp(MIDGAME).unwrap();
        let serialized = position_to_cgp(&game);
        let mut game2 = Game::new(&kwg, &klv, &ld, 2);
        game2.load_cgp(&serialized).unwrap();
        assert_eq!(game.board, game2.board);
        assert_eq!(game.players[0].rack, game2.players[0].rack);
        assert_eq!(game.players[1].rack, game2.players[1].rack);
        assert_eq!(game.players[0].score, game2.players[0].score);
        assert_eq!(
            game.consecutive_scoreless_turns,
            game2.consecutive_scoreless_turns
        );
        assert_eq!(position_to_cgp(&game2), serialized);
    }

    #[test]
    fn test_designated_blank_on_board() {
        let (kwg, klv, ld) = setup();
        let mut game = Game::new(&kwg, &klv, &ld, 1);
        game.load_cgp("15/15/15/15/15/15/15/6qI7/15/15/15/15/15/15/15 / 0/0 0")
            .unwrap();
        assert_eq!(game.board.letter(7, 6), blanked(17));
        // the blank, not a Q, left the bag
        assert_eq!(game.bag.len(), 98);
        assert!(game.bag.tiles().contains(&17));
    }

    #[test]
    fn test_parse_errors() {
        let (_, _, ld) = setup();
        // wrong row count
        assert!(matches!(
            parse_cgp("15/15 / 0/0 0", 15, &ld),
            Err(Error::InvalidRowCount(2, 15))
        ));
        // row too wide
        assert!(parse_cgp(
            "16/15/15/15/15/15/15/15/15/15/15/15/15/15/15 / 0/0 0",
            15,
            &ld
        )
        .is_err());
        // bad score
        assert!(matches!(
            parse_cgp("15/15/15/15/15/15/15/15/15/15/15/15/15/15/15 / a/0 0", 15, &ld),
            Err(Error::InvalidScore(_))
        ));
        // unknown opcode
        assert!(parse_cgp(
            "15/15/15/15/15/15/15/15/15/15/15/15/15/15/15 / 0/0 0 nope x;",
            15,
            &ld
        )
        .is_err());
        // rack letters must be uppercase or '?'
        assert!(parse_cgp(
            "15/15/15/15/15/15/15/15/15/15/15/15/15/15/15 ab/ 0/0 0",
            15,
            &ld
        )
        .is_err());
    }

    #[test]
    fn test_zero_run_length_rejected() {
        let (_, _, ld) = setup();
        assert!(parse_cgp(
            "0QI13/15/15/15/15/15/15/15/15/15/15/15/15/15/15 / 0/0 0",
            15,
            &ld
        )
        .is_err());
    }
}
