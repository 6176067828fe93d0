//! Delimited quote table adapter.

use crate::domain::error::ArlError;
use crate::domain::series::Quote;
use crate::ports::data_port::QuotePort;
use std::path::PathBuf;
use tracing::debug;

/// A column picked by header name or by zero-based position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnRef {
    Index(usize),
    Name(String),
}

impl ColumnRef {
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        match value.parse::<usize>() {
            Ok(i) => ColumnRef::Index(i),
            Err(_) => ColumnRef::Name(value.to_string()),
        }
    }

    fn resolve(&self, headers: Option<&csv::StringRecord>) -> Result<usize, ArlError> {
        match self {
            ColumnRef::Index(i) => Ok(*i),
            ColumnRef::Name(name) => headers
                .and_then(|h| h.iter().position(|c| c.trim().eq_ignore_ascii_case(name)))
                .ok_or_else(|| ArlError::data(format!("column '{name}' not found"))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CsvQuoteAdapter {
    path: PathBuf,
    delimiter: u8,
    has_headers: bool,
    ask_column: ColumnRef,
    /// Without a bid column the bid equals the ask.
    bid_column: Option<ColumnRef>,
}

impl CsvQuoteAdapter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            delimiter: b',',
            has_headers: true,
            ask_column: ColumnRef::Name("ask".to_string()),
            bid_column: Some(ColumnRef::Name("bid".to_string())),
        }
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_headers(mut self, has_headers: bool) -> Self {
        self.has_headers = has_headers;
        self
    }

    pub fn with_columns(mut self, ask: ColumnRef, bid: Option<ColumnRef>) -> Self {
        self.ask_column = ask;
        self.bid_column = bid;
        self
    }
}

fn parse_field(record: &csv::StringRecord, column: usize, line: u64) -> Result<f64, ArlError> {
    let raw = record
        .get(column)
        .ok_or_else(|| ArlError::data(format!("line {line}: missing column {column}")))?;
    let value: f64 = raw
        .trim()
        .parse()
        .map_err(|e| ArlError::data(format!("line {line}: invalid value '{raw}': {e}")))?;
    if !value.is_finite() {
        return Err(ArlError::data(format!("line {line}: value {value} is not finite")));
    }
    Ok(value)
}

impl QuotePort for CsvQuoteAdapter {
    fn load_quotes(&self, limit: Option<usize>) -> Result<Vec<Quote>, ArlError> {
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(self.has_headers)
            .flexible(true)
            .from_path(&self.path)
            .map_err(|e| ArlError::Io {
                reason: format!("failed to read {}: {}", self.path.display(), e),
            })?;

        let headers = if self.has_headers {
            Some(
                rdr.headers()
                    .map_err(|e| ArlError::data(format!("CSV header error: {e}")))?
                    .clone(),
            )
        } else {
            None
        };
        let ask_idx = self.ask_column.resolve(headers.as_ref())?;
        let bid_idx = match &self.bid_column {
            Some(column) => Some(column.resolve(headers.as_ref())?),
            None => None,
        };

        let limit = limit.unwrap_or(usize::MAX);
        let mut quotes = Vec::new();
        for result in rdr.records() {
            if quotes.len() >= limit {
                break;
            }
            let record = result.map_err(|e| ArlError::data(format!("CSV parse error: {e}")))?;
            let line = record.position().map(|p| p.line()).unwrap_or(0);
            let ask = parse_field(&record, ask_idx, line)?;
            let bid = match bid_idx {
                Some(i) => parse_field(&record, i, line)?,
                None => ask,
            };
            quotes.push(Quote {
                timestamp: None,
                ask,
                bid,
            });
        }

        debug!(path = %self.path.display(), quotes = quotes.len(), "loaded quote table");
        Ok(quotes)
    }
}
