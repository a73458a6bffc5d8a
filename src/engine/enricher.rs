use chrono::{Datelike, Month, Timelike};

use crate::models::trade::{EnrichedTrade, Side, TimeOfDay, Trade, TradeOutcome};

/// Attach derived metrics to every trade. Pure; row order is preserved.
pub fn enrich(trades: &[Trade]) -> Vec<EnrichedTrade> {
    trades.iter().map(enrich_trade).collect()
}

pub fn enrich_trade(trade: &Trade) -> EnrichedTrade {
    EnrichedTrade {
        duration_hours: duration_hours(trade),
        result: TradeOutcome::from_profit(trade.profit_usd),
        day_of_week: trade.open_time.weekday(),
        month: month_name(trade.open_time.month()),
        time_of_day: TimeOfDay::from_hour(trade.open_time.hour()),
        risk_reward: risk_reward(trade),
        trade: trade.clone(),
    }
}

/// Recompute derived fields from the raw part of already-enriched rows.
pub fn reenrich(trades: &[EnrichedTrade]) -> Vec<EnrichedTrade> {
    trades.iter().map(|t| enrich_trade(&t.trade)).collect()
}

/// Hours between open and close. Sub-second precision is kept.
pub fn duration_hours(trade: &Trade) -> f64 {
    let delta = trade.close_time - trade.open_time;
    match delta.num_microseconds() {
        Some(us) => us as f64 / 3_600_000_000.0,
        None => delta.num_seconds() as f64 / 3600.0,
    }
}

/// Reward-to-risk ratio implied by the stop and target, rounded to 2 places.
///
/// `None` unless take profit, stop loss and open price are all known, or when
/// the stop sits exactly at the entry. Anything not marked BUY, including a
/// missing side, is measured as a short. The sign is not validated: a target
/// on the wrong side of the entry yields a negative ratio.
pub fn risk_reward(trade: &Trade) -> Option<f64> {
    let tp = trade.take_profit?;
    let sl = trade.stop_loss?;
    let open = trade.open_price?;

    let (risk, reward) = match trade.side {
        Some(Side::Buy) => (open - sl, tp - open),
        Some(Side::Sell) | None => (sl - open, open - tp),
    };
    if risk == 0.0 {
        return None;
    }
    Some(round2(reward / risk))
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn month_name(month: u32) -> String {
    u8::try_from(month)
        .ok()
        .and_then(|m| Month::try_from(m).ok())
        .map(|m| m.name().to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDateTime, Weekday};

    fn ts(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }

    fn trade(profit: f64, open: &str, close: &str) -> Trade {
        Trade::new("AAPL", ts(open), ts(close), profit)
    }

    fn with_levels(side: Side, open: f64, sl: f64, tp: f64) -> Trade {
        let mut t = trade(10.0, "2024-01-01 09:00", "2024-01-01 10:00");
        t.side = Some(side);
        t.open_price = Some(open);
        t.stop_loss = Some(sl);
        t.take_profit = Some(tp);
        t
    }

    #[test]
    fn enriches_worked_example() {
        let trades = vec![
            trade(100.0, "2024-01-01 09:00", "2024-01-01 10:00"),
            trade(-50.0, "2024-01-02 09:00", "2024-01-02 09:30"),
        ];
        let enriched = enrich(&trades);
        assert!((enriched[0].duration_hours - 1.0).abs() < 1e-12);
        assert!((enriched[1].duration_hours - 0.5).abs() < 1e-12);
        assert_eq!(enriched[0].result, TradeOutcome::Win);
        assert_eq!(enriched[1].result, TradeOutcome::Loss);
        assert_eq!(enriched[0].day_of_week, Weekday::Mon);
        assert_eq!(enriched[1].day_of_week, Weekday::Tue);
        assert_eq!(enriched[0].month, "January");
        assert_eq!(enriched[0].time_of_day, TimeOfDay::Morning);
    }

    #[test]
    fn result_tracks_profit_sign() {
        for p in [0.01, 5.0, -0.01, -300.0] {
            let e = enrich_trade(&trade(p, "2024-01-01 09:00", "2024-01-01 10:00"));
            assert_eq!(e.is_win(), p > 0.0);
        }
    }

    #[test]
    fn risk_reward_buy() {
        let t = with_levels(Side::Buy, 100.0, 90.0, 130.0);
        assert_eq!(risk_reward(&t), Some(3.0));
    }

    #[test]
    fn risk_reward_sell() {
        let t = with_levels(Side::Sell, 100.0, 104.0, 90.0);
        assert_eq!(risk_reward(&t), Some(2.5));
    }

    #[test]
    fn risk_reward_rounds_and_keeps_sign() {
        let t = with_levels(Side::Buy, 100.0, 97.0, 110.0);
        assert_eq!(risk_reward(&t), Some(3.33));
        // Stop and target swapped: ratio goes negative, not clamped.
        let swapped = with_levels(Side::Buy, 100.0, 130.0, 90.0);
        assert_eq!(risk_reward(&swapped), Some(0.33));
        let inverted = with_levels(Side::Buy, 100.0, 90.0, 80.0);
        assert_eq!(risk_reward(&inverted), Some(-2.0));
    }

    #[test]
    fn risk_reward_undefined_cases() {
        let zero_risk = with_levels(Side::Buy, 100.0, 100.0, 120.0);
        assert_eq!(risk_reward(&zero_risk), None);

        let mut no_stop = with_levels(Side::Buy, 100.0, 90.0, 120.0);
        no_stop.stop_loss = None;
        assert_eq!(risk_reward(&no_stop), None);
    }

    #[test]
    fn risk_reward_without_side_is_measured_as_short() {
        let mut t = with_levels(Side::Buy, 100.0, 110.0, 80.0);
        t.side = None;
        assert_eq!(risk_reward(&t), Some(2.0));
        assert_eq!(enrich_trade(&t).risk_reward, Some(2.0));
    }

    #[test]
    fn reenrich_is_idempotent() {
        let mut t = with_levels(Side::Sell, 50.0, 55.0, 40.0);
        t.open_time = ts("2024-06-15 18:00");
        t.close_time = ts("2024-06-16 02:15");
        let once = enrich(&[t, trade(-3.0, "2024-02-29 05:59", "2024-02-29 06:00")]);
        let twice = reenrich(&once);
        assert_eq!(once, twice);
        assert_eq!(once[0].time_of_day, TimeOfDay::Evening);
        assert_eq!(once[1].time_of_day, TimeOfDay::Night);
        assert_eq!(once[1].month, "February");
    }

    #[test]
    fn negative_duration_passes_through_unclamped() {
        let e = enrich_trade(&trade(1.0, "2024-01-01 10:00", "2024-01-01 09:00"));
        assert!((e.duration_hours + 1.0).abs() < 1e-12);
    }
}
