//! Quote source port trait.

use crate::domain::error::ArlError;
use crate::domain::series::Quote;

/// Supplies the ordered bid/ask quotes a run is built from.
pub trait QuotePort {
    /// Loads quotes in timeline order, at most `limit` of them when given.
    fn load_quotes(&self, limit: Option<usize>) -> Result<Vec<Quote>, ArlError>;
}
