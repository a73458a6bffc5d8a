pub mod aggregator;
pub mod enricher;
pub mod metrics;
pub mod normalizer;

use tracing::info;

use crate::errors::AppError;
use crate::models::raw::RawTable;
use crate::models::result::JournalReport;
use crate::models::trade::{EnrichedTrade, Trade};

use normalizer::TimestampParser;

/// Run the full pipeline over typed trades: normalize, enrich, aggregate.
pub fn analyze(trades: &[Trade]) -> Result<JournalReport, AppError> {
    let normalized = normalizer::normalize_trades(trades)?;
    Ok(build_report(enricher::enrich(&normalized)))
}

/// Run the full pipeline over an unparsed input table.
pub fn analyze_table(table: &RawTable, parser: &TimestampParser) -> Result<JournalReport, AppError> {
    let normalized = normalizer::normalize_table(table, parser)?;
    Ok(build_report(enricher::enrich(&normalized)))
}

/// Aggregate already-enriched trades into every summary view.
pub fn build_report(trades: Vec<EnrichedTrade>) -> JournalReport {
    let summary = metrics::calculate_summary(&trades);
    info!(
        "Report: {} trades, total profit {:.2}, win rate {:.1}%",
        summary.total_trades, summary.total_profit, summary.win_rate_pct
    );

    JournalReport {
        by_symbol: aggregator::by_symbol(&trades),
        by_day_of_week: aggregator::by_day_of_week(&trades),
        by_month: aggregator::by_month(&trades),
        by_day: aggregator::by_day(&trades),
        by_time_of_day: aggregator::by_time_of_day(&trades),
        equity_curve: metrics::equity_curve(&trades),
        summary,
        trades,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::raw::{ColumnSchema, RawTrade};
    use crate::models::trade::{Side, TradeOutcome};
    use chrono::NaiveDate;

    fn row(profit: &str, open: &str, close: &str, side: &str) -> RawTrade {
        RawTrade {
            profit_usd: Some(profit.into()),
            open_time: Some(open.into()),
            close_time: Some(close.into()),
            symbol: Some("AAPL".into()),
            side: Some(side.into()),
            ..Default::default()
        }
    }

    #[test]
    fn worked_example_end_to_end() {
        let table = RawTable::new(
            ColumnSchema::from_headers(["Profit (USD)", "Open Time", "Close Time", "Symbol", "Side"]),
            vec![
                row("100", "2024-01-01T09:00", "2024-01-01T10:00", "BUY"),
                row("-50", "2024-01-02T09:00", "2024-01-02T09:30", "SELL"),
                row("0", "2024-01-03T09:00", "2024-01-03T09:00", "BUY"),
            ],
        );
        let report = analyze_table(&table, &TimestampParser::default()).unwrap();

        assert_eq!(report.trades.len(), 2);
        assert_eq!(report.trades[0].result, TradeOutcome::Win);
        assert_eq!(report.trades[1].result, TradeOutcome::Loss);
        assert_eq!(report.trades[1].trade.side, Some(Side::Sell));
        assert!((report.trades[0].duration_hours - 1.0).abs() < 1e-12);
        assert!((report.trades[1].duration_hours - 0.5).abs() < 1e-12);

        let aapl = report.symbol("AAPL").unwrap();
        assert!((aapl.total_profit - 50.0).abs() < 1e-9);
        assert_eq!(aapl.trade_count, 2);
        assert!((aapl.win_rate - 0.5).abs() < 1e-9);

        let cumulative: Vec<f64> = report.equity_curve.iter().map(|p| p.cumulative_profit).collect();
        assert_eq!(cumulative, vec![100.0, 50.0]);
        assert_eq!(report.summary.max_drawdown, -50.0);
        assert!((report.summary.profit_factor - 2.0).abs() < 1e-9);

        let jan1 = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert_eq!(report.day(jan1).unwrap().stats.trade_count, 1);
        assert_eq!(report.month("2024-01").unwrap().stats.trade_count, 2);
        assert_eq!(report.weekday("Monday").unwrap().trade_count, 1);
    }

    #[test]
    fn views_partition_every_trade() {
        let trades: Vec<Trade> = (0..20)
            .map(|i| {
                let open = NaiveDate::from_ymd_opt(2024, 3, 1)
                    .unwrap()
                    .and_hms_opt(i % 24, 0, 0)
                    .unwrap()
                    + chrono::Duration::days(i as i64 * 3);
                let symbol = ["ES", "NQ", "CL"][i as usize % 3];
                let profit = if i % 4 == 0 { -(i as f64) - 1.0 } else { i as f64 };
                Trade::new(symbol, open, open + chrono::Duration::minutes(45), profit)
            })
            .collect();
        let report = analyze(&trades).unwrap();
        let n = report.trades.len();

        // i == 0 maps to -1, so no row is breakeven.
        assert_eq!(n, 20);
        let count = |groups: &[crate::models::result::GroupSummary]| -> usize {
            groups.iter().map(|g| g.trade_count).sum()
        };
        assert_eq!(count(&report.by_symbol), n);
        assert_eq!(count(&report.by_day_of_week), n);
        assert_eq!(count(&report.by_time_of_day), n);
        assert_eq!(report.by_month.iter().map(|m| m.stats.trade_count).sum::<usize>(), n);
        assert_eq!(report.by_day.iter().map(|d| d.stats.trade_count).sum::<usize>(), n);
        assert_eq!(report.equity_curve.len(), n);
    }

    #[test]
    fn analyze_rejects_negative_duration() {
        let open = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(10, 0, 0).unwrap();
        let trades = vec![Trade::new("X", open, open - chrono::Duration::hours(1), 5.0)];
        assert!(analyze(&trades).unwrap_err().is_validation());
    }
}
