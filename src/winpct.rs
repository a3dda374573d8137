use crate::error::Error;
use std::fs;

/// Win-percentage lookup table: rows are spreads from `-max_spread` to
/// `+max_spread`, columns are tiles-unseen counts. Loaded from CSV where
/// the first column is an informational spread label.
#[derive(Debug, Clone)]
pub struct WinPct {
    rows: Vec<Vec<f32>>,
    max_spread: i32,
    max_tiles_unseen: u32,
}

impl WinPct {
    /// Parse the CSV text. The first line is a header; each data row is
    /// `label,p0,p1,...` covering one spread value, highest spread first.
    ///
    /// ## Errors
    /// If the table is empty, ragged, or holds non-numeric cells.
    pub fn from_csv(text: &str) -> Result<WinPct, Error> {
        let malformed = |reason: String| Error::MalformedData {
            kind: "win percentage table",
            reason,
        };
        let mut rows = Vec::new();
        let mut width = None;
        for line in text.lines().skip(1) {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let cells: Vec<&str> = line.split(',').collect();
            if cells.len() < 2 {
                return Err(malformed(format!("row \"{}\" has no data columns", line)));
            }
            let values = cells[1..]
                .iter()
                .map(|c| c.trim().parse::<f32>())
                .collect::<Result<Vec<f32>, _>>()
                .map_err(|_| malformed(format!("non-numeric cell in \"{}\"", line)))?;
            match width {
                None => width = Some(values.len()),
                Some(w) if w != values.len() => {
                    return Err(malformed(String::from("ragged rows")));
                }
                _ => {}
            }
            rows.push(values);
        }
        if rows.is_empty() {
            return Err(malformed(String::from("no data rows")));
        }
        if rows.len() % 2 == 0 {
            return Err(malformed(format!(
                "{} rows cannot center on spread 0",
                rows.len()
            )));
        }
        let max_spread = (rows.len() as i32 - 1) / 2;
        let max_tiles_unseen = (rows[0].len() - 1) as u32;
        Ok(WinPct {
            rows,
            max_spread,
            max_tiles_unseen,
        })
    }

    /// Read a win-percentage CSV from a file.
    /// ## Errors
    /// If the file can not be read or parsed.
    pub fn from_file(path: &str) -> Result<WinPct, Error> {
        let text = fs::read_to_string(path).map_err(|source| Error::ReadError {
            path: String::from(path),
            source,
        })?;
        Self::from_csv(&text)
    }

    /// A flat 50% table, used when no real table is loaded: simulations
    /// still rank by spread-driven terminal results.
    #[must_use]
    pub fn uniform() -> WinPct {
        WinPct {
            rows: vec![vec![0.5; 94]; 601],
            max_spread: 300,
            max_tiles_unseen: 93,
        }
    }

    pub fn max_spread(&self) -> i32 {
        self.max_spread
    }

    /// Win probability for the player ahead by `spread_plus_leftover` with
    /// `tiles_unseen` unaccounted for, clamped at the table edges. Rows run
    /// from the highest spread down.
    pub fn win_pct(&self, spread_plus_leftover: i32, tiles_unseen: u32) -> f64 {
        let spread = spread_plus_leftover.clamp(-self.max_spread, self.max_spread);
        let row = (self.max_spread - spread) as usize;
        let col = tiles_unseen.min(self.max_tiles_unseen) as usize;
        self.rows[row][col] as f64
    }
}
