use tracing::debug;

use crate::engine;
use crate::errors::AppError;
use crate::models::result::JournalReport;
use crate::models::trade::Trade;

/// Trades accumulated during one working session: manual submissions and CSV
/// loads pile up here until the caller clears them. Duplicates are allowed.
#[derive(Debug, Clone, Default)]
pub struct TradeSession {
    trades: Vec<Trade>,
}

impl TradeSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add trades to the end of the session.
    pub fn append<I>(&mut self, trades: I) -> usize
    where
        I: IntoIterator<Item = Trade>,
    {
        let before = self.trades.len();
        self.trades.extend(trades);
        let added = self.trades.len() - before;
        debug!("Session: appended {} trades ({} total)", added, self.trades.len());
        added
    }

    pub fn push(&mut self, trade: Trade) {
        self.append(std::iter::once(trade));
    }

    /// Swap the session contents for a freshly loaded batch.
    pub fn replace(&mut self, trades: Vec<Trade>) {
        debug!("Session: replaced {} trades with {}", self.trades.len(), trades.len());
        self.trades = trades;
    }

    pub fn clear(&mut self) {
        debug!("Session: cleared {} trades", self.trades.len());
        self.trades.clear();
    }

    /// Owned copy of the current contents.
    pub fn snapshot(&self) -> Vec<Trade> {
        self.trades.clone()
    }

    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    pub fn len(&self) -> usize {
        self.trades.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trades.is_empty()
    }

    /// Recompute every view from scratch over the current contents.
    pub fn report(&self) -> Result<JournalReport, AppError> {
        engine::analyze(&self.trades)
    }
}
