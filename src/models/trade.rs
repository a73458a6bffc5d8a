use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime, Weekday};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;

/// Symbol used when the input table carries no `Symbol` column.
pub const UNKNOWN_SYMBOL: &str = "UNKNOWN";

/// Market the instrument trades on.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum Market {
    #[default]
    Stock,
    Forex,
    Crypto,
    Futures,
}

impl Market {
    pub fn as_str(&self) -> &'static str {
        match self {
            Market::Stock => "STOCK",
            Market::Forex => "FOREX",
            Market::Crypto => "CRYPTO",
            Market::Futures => "FUTURES",
        }
    }
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Market {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "STOCK" => Ok(Market::Stock),
            "FOREX" => Ok(Market::Forex),
            "CRYPTO" => Ok(Market::Crypto),
            "FUTURES" => Ok(Market::Futures),
            _ => Err(format!("Unknown market: {}", s)),
        }
    }
}

/// Trade side.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Buy => "BUY",
            Side::Sell => "SELL",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Side {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "BUY" => Ok(Side::Buy),
            "SELL" => Ok(Side::Sell),
            _ => Err(format!("Unknown side: {}", s)),
        }
    }
}

/// A trade as logged by the user. Raw fields only; derived metrics live in
/// [`EnrichedTrade`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub market: Market,
    pub portfolio: Option<String>,
    pub symbol: String,
    pub side: Option<Side>,
    pub open_time: NaiveDateTime,
    pub close_time: NaiveDateTime,
    pub size: Option<f64>,
    pub open_price: Option<f64>,
    pub commission: f64,
    pub fees: f64,
    pub profit_usd: f64,
    pub take_profit: Option<f64>,
    pub stop_loss: Option<f64>,
}

impl Trade {
    /// Minimal trade with only the required fields set.
    pub fn new(
        symbol: &str,
        open_time: NaiveDateTime,
        close_time: NaiveDateTime,
        profit_usd: f64,
    ) -> Self {
        Trade {
            market: Market::default(),
            portfolio: None,
            symbol: symbol.trim().to_uppercase(),
            side: None,
            open_time,
            close_time,
            size: None,
            open_price: None,
            commission: 0.0,
            fees: 0.0,
            profit_usd,
            take_profit: None,
            stop_loss: None,
        }
    }

    pub fn is_breakeven(&self) -> bool {
        self.profit_usd == 0.0
    }

    pub fn close_date(&self) -> NaiveDate {
        self.close_time.date()
    }
}

/// Win/loss classification. Breakeven trades never reach classification.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TradeOutcome {
    Win,
    Loss,
}

impl TradeOutcome {
    pub fn from_profit(profit_usd: f64) -> Self {
        if profit_usd > 0.0 {
            TradeOutcome::Win
        } else {
            TradeOutcome::Loss
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TradeOutcome::Win => "Win",
            TradeOutcome::Loss => "Loss",
        }
    }
}

impl fmt::Display for TradeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Session bucket of the opening hour.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TimeOfDay {
    Night,
    Morning,
    Afternoon,
    Evening,
}

impl TimeOfDay {
    /// Half-open buckets, inclusive at the lower bound.
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            0..=5 => TimeOfDay::Night,
            6..=11 => TimeOfDay::Morning,
            12..=17 => TimeOfDay::Afternoon,
            _ => TimeOfDay::Evening,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeOfDay::Night => "Night",
            TimeOfDay::Morning => "Morning",
            TimeOfDay::Afternoon => "Afternoon",
            TimeOfDay::Evening => "Evening",
        }
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Full English weekday name.
pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// A trade with its derived metrics attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedTrade {
    #[serde(flatten)]
    pub trade: Trade,
    pub duration_hours: f64,
    pub result: TradeOutcome,
    pub day_of_week: Weekday,
    pub month: String,
    pub time_of_day: TimeOfDay,
    pub risk_reward: Option<f64>,
}

impl EnrichedTrade {
    pub fn is_win(&self) -> bool {
        self.result == TradeOutcome::Win
    }
}

/// A single trade submitted through a manual-entry form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManualEntry {
    #[serde(default)]
    pub market: Market,
    #[serde(default)]
    pub portfolio: Option<String>,
    pub symbol: String,
    pub side: Side,
    pub open_time: NaiveDateTime,
    /// Defaults to `open_time` when the form has no close time.
    #[serde(default)]
    pub close_time: Option<NaiveDateTime>,
    pub size: f64,
    pub price: f64,
    #[serde(default)]
    pub commission: f64,
    #[serde(default)]
    pub fees: f64,
    pub profit_usd: f64,
    #[serde(default)]
    pub take_profit: Option<f64>,
    #[serde(default)]
    pub stop_loss: Option<f64>,
}

impl ManualEntry {
    /// Validate the form and turn it into a [`Trade`].
    pub fn into_trade(self) -> Result<Trade, AppError> {
        let symbol = self.symbol.trim().to_uppercase();
        let mut problems = Vec::new();
        if symbol.is_empty() {
            problems.push("symbol is required");
        }
        if !(self.size > 0.0) {
            problems.push("size must be positive");
        }
        if !(self.price > 0.0) {
            problems.push("price must be positive");
        }
        if self.commission < 0.0 || self.fees < 0.0 {
            problems.push("commission and fees cannot be negative");
        }
        if self.close_time.is_some_and(|close| close < self.open_time) {
            problems.push("close time cannot be before open time");
        }
        if !self.profit_usd.is_finite() {
            problems.push("profit must be a finite number");
        }
        if !problems.is_empty() {
            return Err(AppError::InvalidTrade(problems.join("; ")));
        }

        let portfolio = self
            .portfolio
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty());

        Ok(Trade {
            market: self.market,
            portfolio,
            symbol,
            side: Some(self.side),
            open_time: self.open_time,
            close_time: self.close_time.unwrap_or(self.open_time),
            size: Some(self.size),
            open_price: Some(self.price),
            commission: self.commission,
            fees: self.fees,
            profit_usd: self.profit_usd,
            take_profit: self.take_profit,
            stop_loss: self.stop_loss,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }

    fn entry() -> ManualEntry {
        ManualEntry {
            market: Market::Crypto,
            portfolio: Some("  Swing ".into()),
            symbol: " btcusdt ".into(),
            side: Side::Buy,
            open_time: ts("2024-03-01 14:30"),
            close_time: None,
            size: 0.5,
            price: 62000.0,
            commission: 1.5,
            fees: 0.0,
            profit_usd: 120.0,
            take_profit: None,
            stop_loss: None,
        }
    }

    #[test]
    fn time_of_day_boundaries_are_inclusive_low() {
        assert_eq!(TimeOfDay::from_hour(0), TimeOfDay::Night);
        assert_eq!(TimeOfDay::from_hour(5), TimeOfDay::Night);
        assert_eq!(TimeOfDay::from_hour(6), TimeOfDay::Morning);
        assert_eq!(TimeOfDay::from_hour(11), TimeOfDay::Morning);
        assert_eq!(TimeOfDay::from_hour(12), TimeOfDay::Afternoon);
        assert_eq!(TimeOfDay::from_hour(18), TimeOfDay::Evening);
        assert_eq!(TimeOfDay::from_hour(23), TimeOfDay::Evening);
    }

    #[test]
    fn outcome_uses_strict_comparison() {
        assert_eq!(TradeOutcome::from_profit(0.01), TradeOutcome::Win);
        assert_eq!(TradeOutcome::from_profit(-0.01), TradeOutcome::Loss);
    }

    #[test]
    fn side_and_market_parse_case_insensitively() {
        assert_eq!("buy".parse::<Side>().unwrap(), Side::Buy);
        assert_eq!(" Sell ".parse::<Side>().unwrap(), Side::Sell);
        assert_eq!("forex".parse::<Market>().unwrap(), Market::Forex);
        assert!("long".parse::<Side>().is_err());
    }

    #[test]
    fn manual_entry_normalizes_symbol_and_close_time() {
        let trade = entry().into_trade().unwrap();
        assert_eq!(trade.symbol, "BTCUSDT");
        assert_eq!(trade.portfolio.as_deref(), Some("Swing"));
        assert_eq!(trade.close_time, trade.open_time);
        assert_eq!(trade.side, Some(Side::Buy));
        assert_eq!(trade.open_price, Some(62000.0));
    }

    #[test]
    fn manual_entry_rejects_missing_symbol_and_zero_size() {
        let mut bad = entry();
        bad.symbol = "   ".into();
        bad.size = 0.0;
        let err = bad.into_trade().unwrap_err();
        assert!(err.is_validation());
        let msg = err.to_string();
        assert!(msg.contains("symbol"));
        assert!(msg.contains("size"));
    }
}
