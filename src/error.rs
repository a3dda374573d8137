use thiserror::Error;

#[derive(Error, Debug)]
/// Errors that can be returned
pub enum Error {
    /// Error reading a data file (lexicon, leave table, distribution, win table)
    #[error("Data file \"{path}\" could not be read")]
    ReadError {
        path: String,
        source: std::io::Error,
    },

    /// A binary data blob did not have the expected layout
    #[error("Malformed {kind} data: {reason}")]
    MalformedData { kind: &'static str, reason: String },

    /// A letter distribution blob carried the wrong magic bytes
    #[error("Bad magic in letter distribution: expected \"clds\", got {0:?}")]
    BadMagic([u8; 4]),

    /// Error when parsing a string into machine letters
    #[error("Invalid token '{0}' in tile string")]
    InvalidTileToken(String),

    /// A machine letter outside the alphabet
    #[error("Invalid machine letter {0}")]
    InvalidMachineLetter(u8),

    /// CGP: wrong number of board rows
    #[error("Invalid number of rows {0} (expect {1})")]
    InvalidRowCount(usize, usize),

    /// CGP: a row does not describe the full board width
    #[error("Invalid row \"{row}\": {width} squares (expect {expect})")]
    InvalidRowWidth {
        row: String,
        width: usize,
        expect: usize,
    },

    /// CGP: missing or malformed field
    #[error("Malformed CGP field: {0}")]
    CgpParseError(String),

    /// CGP: a score was not an integer
    #[error("Invalid score \"{0}\"")]
    InvalidScore(String),

    /// Error parsing a bonus-square layout
    #[error("Invalid bonus square: '{0}'")]
    BonusSquareParseError(char),

    /// Attempt to place (part of) a play outside the board
    #[error("Playing {len} tiles at row {row}, col {col} does not fit")]
    PlacementError { row: usize, col: usize, len: usize },

    /// Unknown console/config option or malformed value
    #[error("Invalid option: {0}")]
    InvalidOption(String),

    /// Two loaded data files disagree about the alphabet
    #[error("Inconsistent data: {0}")]
    InconsistentData(String),

    /// Inference refused: the observed play is impossible given the bag
    #[error("Inference refused: {0:?}")]
    InferenceRefused(crate::infer::InferenceStatus),
}
