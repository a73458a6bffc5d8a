use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use statrs::statistics::Statistics;

use crate::models::result::{DailySummary, GroupSummary, MonthResult, MonthlySummary};
use crate::models::trade::{weekday_name, EnrichedTrade, Side, TimeOfDay};

/// Group trades by an ordered key. Every trade lands in exactly one bucket;
/// buckets come out in key order.
fn group_by<K, F>(trades: &[EnrichedTrade], key_fn: F) -> BTreeMap<K, Vec<&EnrichedTrade>>
where
    K: Ord,
    F: Fn(&EnrichedTrade) -> K,
{
    let mut groups: BTreeMap<K, Vec<&EnrichedTrade>> = BTreeMap::new();
    for trade in trades {
        groups.entry(key_fn(trade)).or_default().push(trade);
    }
    groups
}

/// Sum, mean, count and win rate over one bucket.
pub fn summarize(key: impl Into<String>, trades: &[&EnrichedTrade]) -> GroupSummary {
    let trade_count = trades.len();
    let win_count = trades.iter().filter(|t| t.is_win()).count();
    let total_profit: f64 = trades.iter().map(|t| t.trade.profit_usd).sum();
    let avg_profit = if trade_count > 0 {
        trades.iter().map(|t| t.trade.profit_usd).mean()
    } else {
        0.0
    };
    let win_rate = if trade_count > 0 {
        win_count as f64 / trade_count as f64
    } else {
        0.0
    };

    GroupSummary {
        key: key.into(),
        total_profit,
        avg_profit,
        trade_count,
        win_count,
        win_rate,
    }
}

/// One row per symbol, alphabetical.
pub fn by_symbol(trades: &[EnrichedTrade]) -> Vec<GroupSummary> {
    group_by(trades, |t| t.trade.symbol.clone())
        .into_iter()
        .map(|(symbol, group)| summarize(symbol, &group))
        .collect()
}

/// One row per weekday that has trades, Monday first.
pub fn by_day_of_week(trades: &[EnrichedTrade]) -> Vec<GroupSummary> {
    group_by(trades, |t| t.day_of_week.num_days_from_monday())
        .into_values()
        .map(|group| summarize(weekday_name(group[0].day_of_week), &group))
        .collect()
}

/// One row per `YYYY-MM` close month, chronological.
pub fn by_month(trades: &[EnrichedTrade]) -> Vec<MonthlySummary> {
    group_by(trades, |t| {
        let close = t.trade.close_time;
        (close.year(), close.month())
    })
    .into_iter()
    .map(|((year, month), group)| {
        let stats = summarize(format!("{:04}-{:02}", year, month), &group);
        let result = MonthResult::from_total(stats.total_profit);
        MonthlySummary { stats, result }
    })
    .collect()
}

/// One row per close date, chronological. Feeds the calendar heatmap.
pub fn by_day(trades: &[EnrichedTrade]) -> Vec<DailySummary> {
    group_by(trades, |t| t.trade.close_date())
        .into_iter()
        .map(|(date, group): (NaiveDate, _)| DailySummary {
            date,
            stats: summarize(date.format("%Y-%m-%d").to_string(), &group),
        })
        .collect()
}

/// One row per session bucket that has trades, Night first.
pub fn by_time_of_day(trades: &[EnrichedTrade]) -> Vec<GroupSummary> {
    group_by(trades, |t| t.time_of_day)
        .into_iter()
        .map(|(bucket, group): (TimeOfDay, _)| summarize(bucket.as_str(), &group))
        .collect()
}

/// Trade selection by symbol and side. An empty list means "any".
#[derive(Debug, Clone, Default)]
pub struct TradeFilter {
    pub symbols: Vec<String>,
    pub sides: Vec<Side>,
}

impl TradeFilter {
    pub fn matches(&self, trade: &EnrichedTrade) -> bool {
        let symbol_ok = self.symbols.is_empty()
            || self
                .symbols
                .iter()
                .any(|s| s.eq_ignore_ascii_case(&trade.trade.symbol));
        let side_ok = self.sides.is_empty()
            || trade.trade.side.is_some_and(|side| self.sides.contains(&side));
        symbol_ok && side_ok
    }

    pub fn apply(&self, trades: &[EnrichedTrade]) -> Vec<EnrichedTrade> {
        trades.iter().filter(|t| self.matches(t)).cloned().collect()
    }
}
