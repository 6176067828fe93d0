//! Tick file adapter for `<date> <time> <ask>/<bid>` lines.

use crate::domain::error::ArlError;
use crate::domain::series::Quote;
use crate::ports::data_port::QuotePort;
use chrono::NaiveDateTime;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use tracing::{debug, warn};

const TIMESTAMP_FORMATS: [&str; 4] = [
    "%Y.%m.%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%d.%m.%Y %H:%M:%S%.f",
    "%Y%m%d %H%M%S",
];

pub struct TickFileAdapter {
    path: PathBuf,
}

impl TickFileAdapter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Parses one line. The last whitespace-separated token holds the quote;
    /// everything before it is the timestamp.
    pub fn parse_line(line: &str) -> Option<Quote> {
        let line = line.trim();
        let (stamp, pair) = match line.rsplit_once(char::is_whitespace) {
            Some((stamp, pair)) => (stamp.trim(), pair),
            None => ("", line),
        };
        let (ask, bid) = pair.split_once('/')?;
        let ask: f64 = ask.trim().parse().ok()?;
        let bid: f64 = bid.trim().parse().ok()?;
        if !ask.is_finite() || !bid.is_finite() {
            return None;
        }
        Some(Quote {
            timestamp: parse_timestamp(stamp),
            ask,
            bid,
        })
    }
}

fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    if value.is_empty() {
        return None;
    }
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
}

impl QuotePort for TickFileAdapter {
    fn load_quotes(&self, limit: Option<usize>) -> Result<Vec<Quote>, ArlError> {
        let file = File::open(&self.path).map_err(|e| ArlError::Io {
            reason: format!("failed to read {}: {}", self.path.display(), e),
        })?;
        let reader = BufReader::new(file);
        let limit = limit.unwrap_or(usize::MAX);
        let mut quotes = Vec::new();
        let mut skipped = 0usize;

        for (number, line) in reader.lines().enumerate() {
            if quotes.len() >= limit {
                break;
            }
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match Self::parse_line(&line) {
                Some(quote) => quotes.push(quote),
                None => {
                    skipped += 1;
                    warn!(line = number + 1, content = %line.trim(), "skipping malformed tick line");
                }
            }
        }

        debug!(path = %self.path.display(), quotes = quotes.len(), skipped, "loaded tick file");
        Ok(quotes)
    }
}
