use statrs::statistics::Statistics;

use crate::models::result::{EquityPoint, TradeSummary};
use crate::models::trade::EnrichedTrade;

/// Trades in close-time order. Ties keep their input order.
pub fn chronological(trades: &[EnrichedTrade]) -> Vec<&EnrichedTrade> {
    let mut sorted: Vec<&EnrichedTrade> = trades.iter().collect();
    sorted.sort_by_key(|t| t.trade.close_time);
    sorted
}

/// Cumulative profit, its running maximum and the drawdown from it.
pub fn equity_curve(trades: &[EnrichedTrade]) -> Vec<EquityPoint> {
    let mut cumulative = 0.0f64;
    let mut peak = f64::NEG_INFINITY;

    chronological(trades)
        .into_iter()
        .map(|t| {
            cumulative += t.trade.profit_usd;
            peak = peak.max(cumulative);
            EquityPoint {
                close_time: t.trade.close_time,
                profit_usd: t.trade.profit_usd,
                cumulative_profit: cumulative,
                running_max: peak,
                drawdown: cumulative - peak,
            }
        })
        .collect()
}

/// Deepest drawdown on the curve; `0.0` for an empty curve.
pub fn max_drawdown(curve: &[EquityPoint]) -> f64 {
    curve.iter().map(|p| p.drawdown).fold(0.0f64, f64::min)
}

/// `|sum of wins| / |sum of losses|`, or `0.0` when nothing was lost.
pub fn profit_factor(trades: &[EnrichedTrade]) -> f64 {
    let gross_profit: f64 = trades.iter().filter(|t| t.is_win()).map(|t| t.trade.profit_usd).sum();
    let gross_loss: f64 = trades.iter().filter(|t| !t.is_win()).map(|t| t.trade.profit_usd).sum();
    if gross_loss == 0.0 {
        return 0.0;
    }
    gross_profit.abs() / gross_loss.abs()
}

/// Calculate all journal-level metrics.
pub fn calculate_summary(trades: &[EnrichedTrade]) -> TradeSummary {
    let total_trades = trades.len();

    if total_trades == 0 {
        return empty_summary();
    }

    // ── Trade classification ──
    let winning: Vec<f64> = trades
        .iter()
        .filter(|t| t.is_win())
        .map(|t| t.trade.profit_usd)
        .collect();
    let losing: Vec<f64> = trades
        .iter()
        .filter(|t| !t.is_win())
        .map(|t| t.trade.profit_usd)
        .collect();

    let winning_trades = winning.len();
    let losing_trades = losing.len();
    let win_rate_pct = winning_trades as f64 / total_trades as f64 * 100.0;

    // ── P&L ──
    let profits: Vec<f64> = trades.iter().map(|t| t.trade.profit_usd).collect();
    let total_profit: f64 = profits.iter().sum();
    let gross_profit: f64 = winning.iter().sum();
    let gross_loss: f64 = losing.iter().map(|p| p.abs()).sum();
    let avg_profit = profits.iter().mean();
    let avg_win = (!winning.is_empty()).then(|| winning.iter().mean());
    let avg_loss = (!losing.is_empty()).then(|| losing.iter().mean());
    let best_trade = profits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let worst_trade = profits.iter().copied().fold(f64::INFINITY, f64::min);
    // Sample deviation is undefined for a single trade.
    let profit_std_dev = if total_trades > 1 {
        profits.iter().std_dev()
    } else {
        0.0
    };

    // ── Drawdown ──
    let curve = equity_curve(trades);

    // ── Costs & time ──
    let total_commission: f64 = trades.iter().map(|t| t.trade.commission).sum();
    let total_fees: f64 = trades.iter().map(|t| t.trade.fees).sum();
    let avg_duration_hours = trades.iter().map(|t| t.duration_hours).mean();

    TradeSummary {
        total_trades,
        winning_trades,
        losing_trades,
        win_rate_pct,
        total_profit,
        gross_profit,
        gross_loss,
        avg_profit,
        avg_win,
        avg_loss,
        best_trade,
        worst_trade,
        profit_std_dev,
        profit_factor: profit_factor(trades),
        max_drawdown: max_drawdown(&curve),
        total_commission,
        total_fees,
        avg_duration_hours,
    }
}

/// Return default metrics for zero-trade case.
fn empty_summary() -> TradeSummary {
    TradeSummary {
        total_trades: 0,
        winning_trades: 0,
        losing_trades: 0,
        win_rate_pct: 0.0,
        total_profit: 0.0,
        gross_profit: 0.0,
        gross_loss: 0.0,
        avg_profit: 0.0,
        avg_win: None,
        avg_loss: None,
        best_trade: 0.0,
        worst_trade: 0.0,
        profit_std_dev: 0.0,
        profit_factor: 0.0,
        max_drawdown: 0.0,
        total_commission: 0.0,
        total_fees: 0.0,
        avg_duration_hours: 0.0,
    }
}
