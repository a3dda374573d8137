use crate::error::Error;
use crate::letters::{blanked, is_blanked, unblanked, MachineLetter, BLANK_LETTER};
use crate::rack::Rack;
use std::convert::TryInto;
use std::fmt;
use std::fs;

/// Tag at the start of a letter distribution blob.
const MAGIC: &[u8; 4] = b"clds";

/// letter string, count, score, vowel
type TileInfo = (&'static str, u32, u32, bool);

/// The standard English distribution: 100 tiles, 2 blanks.
/// Index 0 is the blank.
const ENGLISH: &[TileInfo] = &[
    ("?", 2, 0, false),
    ("A", 9, 1, true),
    ("B", 2, 3, false),
    ("C", 2, 3, false),
    ("D", 4, 2, false),
    ("E", 12, 1, true),
    ("F", 2, 4, false),
    ("G", 3, 2, false),
    ("H", 2, 4, false),
    ("I", 9, 1, true),
    ("J", 1, 8, false),
    ("K", 1, 5, false),
    ("L", 4, 1, false),
    ("M", 2, 3, false),
    ("N", 6, 1, false),
    ("O", 8, 1, true),
    ("P", 2, 3, false),
    ("Q", 1, 10, false),
    ("R", 6, 1, false),
    ("S", 4, 1, false),
    ("T", 6, 1, false),
    ("U", 4, 1, true),
    ("V", 2, 4, false),
    ("W", 2, 4, false),
    ("X", 1, 8, false),
    ("Y", 2, 4, false),
    ("Z", 1, 10, false),
];

/// The tile distribution for a game: per machine letter the number of
/// copies in a full bag, the point score, whether it is a vowel, and its
/// string form (possibly multi-character, as in Catalan "L·L").
///
/// Immutable after load. Shared by reference between the board scorer, the
/// bag, the inference engine and the formatters.
#[derive(Debug, Clone)]
pub struct LetterDistribution {
    name: String,
    counts: Vec<u32>,
    scores: Vec<u32>,
    vowels: Vec<bool>,
    strings: Vec<String>,
    /// Machine letters sorted by score descending; consumed by the shadow
    /// upper bound.
    score_order: Vec<MachineLetter>,
}

impl fmt::Display for LetterDistribution {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "<LetterDistribution \"{}\": {} letters, {} tiles>",
            self.name,
            self.size(),
            self.total_tiles()
        )
    }
}

impl Default for LetterDistribution {
    fn default() -> Self {
        Self::english()
    }
}

impl LetterDistribution {
    /// The standard English distribution.
    #[must_use]
    pub fn english() -> LetterDistribution {
        let mut ld = LetterDistribution {
            name: String::from("english"),
            counts: ENGLISH.iter().map(|t| t.1).collect(),
            scores: ENGLISH.iter().map(|t| t.2).collect(),
            vowels: ENGLISH.iter().map(|t| t.3).collect(),
            strings: ENGLISH.iter().map(|t| String::from(t.0)).collect(),
            score_order: Vec::new(),
        };
        ld.set_score_order();
        ld
    }

    /// Parse a distribution from a tagged binary blob: 4-byte magic "clds",
    /// a length-prefixed name, then three big-endian `u32` arrays (counts,
    /// scores, vowel flags) whose shared length is the alphabet size.
    ///
    /// The blob carries no letter strings; machine letters map to `?`,
    /// `A`.., which covers the standard alphabets. Use
    /// [`with_letter_strings`](Self::with_letter_strings) for alphabets with
    /// multi-character tiles.
    ///
    /// ## Errors
    /// If the magic or layout is wrong.
    pub fn from_bytes(bytes: &[u8]) -> Result<LetterDistribution, Error> {
        let malformed = |reason: &str| Error::MalformedData {
            kind: "letter distribution",
            reason: String::from(reason),
        };
        if bytes.len() < 5 {
            return Err(malformed("truncated header"));
        }
        let magic: [u8; 4] = bytes[0..4].try_into().unwrap();
        if &magic != MAGIC {
            return Err(Error::BadMagic(magic));
        }
        let name_len = bytes[4] as usize;
        let mut pos = 5 + name_len;
        if bytes.len() < pos {
            return Err(malformed("truncated name"));
        }
        let name = String::from_utf8(bytes[5..pos].to_vec())
            .map_err(|_| malformed("name is not utf-8"))?;

        let body = bytes.len() - pos;
        if body % 12 != 0 {
            return Err(malformed("array section is not three u32 arrays"));
        }
        let size = body / 12;
        let mut read_array = || -> Vec<u32> {
            let array = bytes[pos..pos + 4 * size]
                .chunks_exact(4)
                .map(|c| u32::from_be_bytes(c.try_into().unwrap()))
                .collect();
            pos += 4 * size;
            array
        };
        let counts = read_array();
        let scores = read_array();
        let vowels: Vec<bool> = read_array().into_iter().map(|v| v != 0).collect();

        let strings = (0..size)
            .map(|i| {
                if i == 0 {
                    String::from("?")
                } else if i <= 26 {
                    String::from((b'A' + i as u8 - 1) as char)
                } else {
                    // no string information in the blob past Z
                    format!("[{}]", i)
                }
            })
            .collect();

        let mut ld = LetterDistribution {
            name,
            counts,
            scores,
            vowels,
            strings,
            score_order: Vec::new(),
        };
        ld.set_score_order();
        Ok(ld)
    }

    /// Read a distribution blob from a file.
    /// ## Errors
    /// If the file can not be read or parsed.
    pub fn from_file(path: &str) -> Result<LetterDistribution, Error> {
        let bytes = fs::read(path).map_err(|source| Error::ReadError {
            path: String::from(path),
            source,
        })?;
        Self::from_bytes(&bytes)
    }

    /// Replace the per-letter string forms, for alphabets with
    /// multi-character tiles.
    /// ## Errors
    /// If the number of strings does not match the alphabet size.
    pub fn with_letter_strings(mut self, strings: &[&str]) -> Result<LetterDistribution, Error> {
        if strings.len() != self.size() {
            return Err(Error::InconsistentData(format!(
                "{} letter strings for alphabet of {}",
                strings.len(),
                self.size()
            )));
        }
        self.strings = strings.iter().map(|&s| String::from(s)).collect();
        Ok(self)
    }

    fn set_score_order(&mut self) {
        let mut order: Vec<MachineLetter> = (0..self.size() as MachineLetter).collect();
        order.sort_by(|&a, &b| self.scores[b as usize].cmp(&self.scores[a as usize]));
        self.score_order = order;
    }

    /// Number of distinct machine letters, blank included.
    pub fn size(&self) -> usize {
        self.counts.len()
    }

    /// The distribution name from the blob ("english", "norwegian", ...).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Copies of `ml` in a full bag.
    #[inline]
    pub fn count(&self, ml: MachineLetter) -> u32 {
        self.counts[ml as usize]
    }

    /// Point score of `ml`. A designated blank scores 0.
    #[inline]
    pub fn score(&self, ml: MachineLetter) -> u32 {
        if is_blanked(ml) {
            return 0;
        }
        self.scores[ml as usize]
    }

    #[inline]
    pub fn is_vowel(&self, ml: MachineLetter) -> bool {
        self.vowels[unblanked(ml) as usize] && unblanked(ml) != BLANK_LETTER
    }

    /// Total tiles in a full bag.
    pub fn total_tiles(&self) -> usize {
        self.counts.iter().map(|&c| c as usize).sum()
    }

    /// Machine letters sorted by score descending.
    pub fn score_order(&self) -> &[MachineLetter] {
        &self.score_order
    }

    /// Sum of tile scores on a rack.
    pub fn score_on_rack(&self, rack: &Rack) -> u32 {
        (0..self.size() as MachineLetter)
            .map(|ml| rack.count(ml) * self.scores[ml as usize])
            .sum()
    }

    /// The string form of one machine letter. Designated blanks render in
    /// lowercase, the undesignated blank as "?".
    pub fn letter_to_string(&self, ml: MachineLetter) -> String {
        if is_blanked(ml) {
            self.strings[unblanked(ml) as usize].to_lowercase()
        } else {
            self.strings[ml as usize].clone()
        }
    }

    /// Render a sequence of machine letters.
    pub fn letters_to_string(&self, mls: &[MachineLetter]) -> String {
        mls.iter().map(|&ml| self.letter_to_string(ml)).collect()
    }

    /// Parse a string into machine letters with longest-match tokenization,
    /// so multi-character tiles parse before their single-character
    /// prefixes. Lowercase means a designated blank, `?` the undesignated
    /// blank.
    ///
    /// ## Errors
    /// If a token does not name a tile in this distribution.
    ///
    /// ## Examples
    /// ```
    /// # use crossword_analyzer::{LetterDistribution, Error};
    /// let ld = LetterDistribution::english();
    /// assert_eq!(ld.string_to_letters("AaZ?")?, vec![1, 0x81, 26, 0]);
    /// # Ok::<(), Error>(())
    /// ```
    pub fn string_to_letters(&self, s: &str) -> Result<Vec<MachineLetter>, Error> {
        let mut letters = Vec::new();
        let mut rest = s;
        'outer: while !rest.is_empty() {
            // longest match first
            let mut best: Option<(usize, MachineLetter, bool)> = None;
            for (i, ls) in self.strings.iter().enumerate() {
                let upper = ls.to_uppercase();
                let lower = ls.to_lowercase();
                if rest.starts_with(upper.as_str())
                    && best.map_or(true, |(len, _, _)| upper.len() > len)
                {
                    best = Some((upper.len(), i as MachineLetter, false));
                }
                if i != 0
                    && rest.starts_with(lower.as_str())
                    && best.map_or(true, |(len, _, _)| lower.len() > len)
                {
                    best = Some((lower.len(), i as MachineLetter, true));
                }
            }
            if let Some((len, ml, blank)) = best {
                letters.push(if blank { blanked(ml) } else { ml });
                rest = &rest[len..];
                continue 'outer;
            }
            return Err(Error::InvalidTileToken(
                rest.chars().take(1).collect::<String>(),
            ));
        }
        Ok(letters)
    }

    /// Fill a rack from a string.
    /// ## Errors
    /// If the string can not be parsed.
    pub fn rack_from_string(&self, s: &str) -> Result<Rack, Error> {
        let mut rack = Rack::new(self.size());
        for ml in self.string_to_letters(s)? {
            rack.add(unblanked(ml));
        }
        Ok(rack)
    }
}
