use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::trade::EnrichedTrade;

/// Profit statistics for one grouping key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupSummary {
    pub key: String,
    pub total_profit: f64,
    pub avg_profit: f64,
    pub trade_count: usize,
    pub win_count: usize,
    /// Fraction of winning trades in `[0, 1]`.
    pub win_rate: f64,
}

/// Sign of a month's net result.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum MonthResult {
    Positive,
    Negative,
}

impl MonthResult {
    pub fn from_total(total: f64) -> Self {
        if total > 0.0 {
            MonthResult::Positive
        } else {
            MonthResult::Negative
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MonthResult::Positive => "Positive",
            MonthResult::Negative => "Negative",
        }
    }
}

/// A `YYYY-MM` bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlySummary {
    #[serde(flatten)]
    pub stats: GroupSummary,
    pub result: MonthResult,
}

/// A calendar-day bucket for heatmap rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySummary {
    pub date: NaiveDate,
    #[serde(flatten)]
    pub stats: GroupSummary,
}

/// A point on the cumulative profit curve, in close-time order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub close_time: NaiveDateTime,
    pub profit_usd: f64,
    pub cumulative_profit: f64,
    pub running_max: f64,
    /// Always `<= 0`.
    pub drawdown: f64,
}

/// Whole-journal scalar metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeSummary {
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub win_rate_pct: f64,

    pub total_profit: f64,
    pub gross_profit: f64,
    pub gross_loss: f64,
    pub avg_profit: f64,
    pub avg_win: Option<f64>,
    pub avg_loss: Option<f64>,
    pub best_trade: f64,
    pub worst_trade: f64,
    pub profit_std_dev: f64,

    /// `0.0` when there are no losing trades.
    pub profit_factor: f64,
    pub max_drawdown: f64,

    pub total_commission: f64,
    pub total_fees: f64,
    pub avg_duration_hours: f64,
}

/// Everything derived from one pass over the journal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalReport {
    pub trades: Vec<EnrichedTrade>,
    pub summary: TradeSummary,
    pub by_symbol: Vec<GroupSummary>,
    pub by_day_of_week: Vec<GroupSummary>,
    pub by_month: Vec<MonthlySummary>,
    pub by_day: Vec<DailySummary>,
    pub by_time_of_day: Vec<GroupSummary>,
    pub equity_curve: Vec<EquityPoint>,
}

impl JournalReport {
    pub fn symbol(&self, symbol: &str) -> Option<&GroupSummary> {
        self.by_symbol.iter().find(|g| g.key == symbol)
    }

    pub fn weekday(&self, name: &str) -> Option<&GroupSummary> {
        self.by_day_of_week.iter().find(|g| g.key == name)
    }

    pub fn month(&self, period: &str) -> Option<&MonthlySummary> {
        self.by_month.iter().find(|m| m.stats.key == period)
    }

    pub fn day(&self, date: NaiveDate) -> Option<&DailySummary> {
        self.by_day.iter().find(|d| d.date == date)
    }
}
