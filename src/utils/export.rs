use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::data::storage::StoredTrade;
use crate::errors::AppError;
use crate::models::raw::{
    COL_CLOSE_TIME, COL_COMMISSION, COL_FEES, COL_MARKET, COL_OPEN_PRICE, COL_OPEN_TIME,
    COL_PORTFOLIO, COL_PROFIT, COL_SIDE, COL_SIZE, COL_STOP_LOSS, COL_SYMBOL, COL_TAKE_PROFIT,
};
use crate::models::result::{
    DailySummary, EquityPoint, GroupSummary, JournalReport, MonthlySummary, TradeSummary,
};
use crate::models::trade::{weekday_name, EnrichedTrade, Trade};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

const RAW_HEADERS: [&str; 13] = [
    COL_MARKET,
    COL_PORTFOLIO,
    COL_SYMBOL,
    COL_SIDE,
    COL_OPEN_TIME,
    COL_CLOSE_TIME,
    COL_SIZE,
    COL_OPEN_PRICE,
    COL_COMMISSION,
    COL_FEES,
    COL_PROFIT,
    COL_TAKE_PROFIT,
    COL_STOP_LOSS,
];

const DERIVED_HEADERS: [&str; 6] = [
    "Duration (hours)",
    "Result",
    "Day of Week",
    "Month",
    "Time of Day",
    "Risk-Reward",
];

fn write_err(e: csv::Error) -> AppError {
    AppError::FileWrite(e.to_string())
}

fn create_writer(path: &Path) -> Result<csv::Writer<fs::File>, AppError> {
    csv::Writer::from_path(path)
        .map_err(|e| AppError::FileWrite(format!("Cannot create CSV {}: {}", path.display(), e)))
}

/// Shortest representation that parses back to the same `f64`.
fn num(v: f64) -> String {
    v.to_string()
}

fn opt_num(v: Option<f64>) -> String {
    v.map(num).unwrap_or_default()
}

fn raw_fields(t: &Trade) -> Vec<String> {
    vec![
        t.market.to_string(),
        t.portfolio.clone().unwrap_or_default(),
        t.symbol.clone(),
        t.side.map(|s| s.to_string()).unwrap_or_default(),
        t.open_time.format(TIME_FORMAT).to_string(),
        t.close_time.format(TIME_FORMAT).to_string(),
        opt_num(t.size),
        opt_num(t.open_price),
        num(t.commission),
        num(t.fees),
        num(t.profit_usd),
        opt_num(t.take_profit),
        opt_num(t.stop_loss),
    ]
}

/// Write the enriched trade table. Re-reading the file through the loader and
/// normalizer reproduces the same trades.
pub fn write_trades_csv(trades: &[EnrichedTrade], path: &Path) -> Result<(), AppError> {
    let mut wtr = create_writer(path)?;

    let headers: Vec<&str> = RAW_HEADERS.iter().chain(DERIVED_HEADERS.iter()).copied().collect();
    wtr.write_record(&headers).map_err(write_err)?;

    for t in trades {
        let mut record = raw_fields(&t.trade);
        record.extend([
            num(t.duration_hours),
            t.result.to_string(),
            weekday_name(t.day_of_week).to_string(),
            t.month.clone(),
            t.time_of_day.to_string(),
            opt_num(t.risk_reward),
        ]);
        wtr.write_record(&record).map_err(write_err)?;
    }

    wtr.flush().map_err(|e| AppError::FileWrite(e.to_string()))?;
    Ok(())
}

/// Write journal metrics as a key-value CSV report.
pub fn write_summary_csv(summary: &TradeSummary, path: &Path) -> Result<(), AppError> {
    let mut wtr = create_writer(path)?;

    wtr.write_record(["Metric", "Value"]).map_err(write_err)?;

    let opt = |v: Option<f64>| v.map(|x| format!("{:.2}", x)).unwrap_or_default();
    let rows: Vec<(&str, String)> = vec![
        // Trades
        ("Total Trades", summary.total_trades.to_string()),
        ("Profitable Trades", summary.winning_trades.to_string()),
        ("Losing Trades", summary.losing_trades.to_string()),
        ("Win Rate %", format!("{:.2}", summary.win_rate_pct)),
        // P&L
        ("Total Profit (USD)", format!("{:.2}", summary.total_profit)),
        ("Gross Profit", format!("{:.2}", summary.gross_profit)),
        ("Gross Loss", format!("{:.2}", summary.gross_loss)),
        ("Average Profit per Trade", format!("{:.2}", summary.avg_profit)),
        ("Avg Win", opt(summary.avg_win)),
        ("Avg Loss", opt(summary.avg_loss)),
        ("Best Trade", format!("{:.2}", summary.best_trade)),
        ("Worst Trade", format!("{:.2}", summary.worst_trade)),
        ("Profit Std Dev", format!("{:.2}", summary.profit_std_dev)),
        ("Profit Factor", format!("{:.2}", summary.profit_factor)),
        // Drawdown
        ("Max Drawdown", format!("{:.2}", summary.max_drawdown)),
        // Costs & time
        ("Total Commission", format!("{:.2}", summary.total_commission)),
        ("Total Fees", format!("{:.2}", summary.total_fees)),
        ("Avg Duration (hours)", format!("{:.2}", summary.avg_duration_hours)),
    ];

    for (name, value) in &rows {
        wtr.write_record([*name, value.as_str()]).map_err(write_err)?;
    }

    wtr.flush().map_err(|e| AppError::FileWrite(e.to_string()))?;
    Ok(())
}

/// Write one grouped view. `key_header` names the first column.
pub fn write_groups_csv(groups: &[GroupSummary], key_header: &str, path: &Path) -> Result<(), AppError> {
    let mut wtr = create_writer(path)?;
    wtr.write_record([key_header, "Total Profit", "Trade Count", "Avg Profit", "Win Rate"])
        .map_err(write_err)?;
    for g in groups {
        wtr.write_record(group_fields(g)).map_err(write_err)?;
    }
    wtr.flush().map_err(|e| AppError::FileWrite(e.to_string()))?;
    Ok(())
}

fn group_fields(g: &GroupSummary) -> [String; 5] {
    [
        g.key.clone(),
        format!("{:.2}", g.total_profit),
        g.trade_count.to_string(),
        format!("{:.2}", g.avg_profit),
        format!("{:.4}", g.win_rate),
    ]
}

pub fn write_monthly_csv(months: &[MonthlySummary], path: &Path) -> Result<(), AppError> {
    let mut wtr = create_writer(path)?;
    wtr.write_record([
        "Month-Year",
        "Total Profit",
        "Trade Count",
        "Avg Profit",
        "Win Rate",
        "Result",
    ])
    .map_err(write_err)?;
    for m in months {
        let mut record = group_fields(&m.stats).to_vec();
        record.push(m.result.as_str().to_string());
        wtr.write_record(&record).map_err(write_err)?;
    }
    wtr.flush().map_err(|e| AppError::FileWrite(e.to_string()))?;
    Ok(())
}

pub fn write_daily_csv(days: &[DailySummary], path: &Path) -> Result<(), AppError> {
    write_groups_csv(
        &days.iter().map(|d| d.stats.clone()).collect::<Vec<_>>(),
        "Date",
        path,
    )
}

pub fn write_equity_csv(curve: &[EquityPoint], path: &Path) -> Result<(), AppError> {
    let mut wtr = create_writer(path)?;
    wtr.write_record([
        "Close Time",
        "Profit (USD)",
        "Cumulative Profit",
        "Running Max",
        "Drawdown",
    ])
    .map_err(write_err)?;
    for p in curve {
        wtr.write_record([
            p.close_time.format(TIME_FORMAT).to_string(),
            num(p.profit_usd),
            num(p.cumulative_profit),
            num(p.running_max),
            num(p.drawdown),
        ])
        .map_err(write_err)?;
    }
    wtr.flush().map_err(|e| AppError::FileWrite(e.to_string()))?;
    Ok(())
}

/// Write every sheet of a report into `dir`. Returns the files written.
pub fn write_report_bundle(report: &JournalReport, dir: &Path) -> Result<Vec<PathBuf>, AppError> {
    fs::create_dir_all(dir)
        .map_err(|e| AppError::FileWrite(format!("Cannot create {}: {}", dir.display(), e)))?;

    let path = |name: &str| dir.join(name);
    let files = vec![
        path("all_trades.csv"),
        path("summary.csv"),
        path("by_symbol.csv"),
        path("by_day_of_week.csv"),
        path("by_time_of_day.csv"),
        path("by_month.csv"),
        path("by_day.csv"),
        path("equity_curve.csv"),
    ];

    write_trades_csv(&report.trades, &files[0])?;
    write_summary_csv(&report.summary, &files[1])?;
    write_groups_csv(&report.by_symbol, "Symbol", &files[2])?;
    write_groups_csv(&report.by_day_of_week, "Day of Week", &files[3])?;
    write_groups_csv(&report.by_time_of_day, "Time of Day", &files[4])?;
    write_monthly_csv(&report.by_month, &files[5])?;
    write_daily_csv(&report.by_day, &files[6])?;
    write_equity_csv(&report.equity_curve, &files[7])?;

    info!("Wrote {} report files to {}", files.len(), dir.display());
    Ok(files)
}

/// Dump persisted rows to a timestamped CSV in `dir`. `None` when there is
/// nothing to export.
pub fn export_stored_csv(trades: &[StoredTrade], dir: &Path) -> Result<Option<PathBuf>, AppError> {
    if trades.is_empty() {
        return Ok(None);
    }
    fs::create_dir_all(dir)
        .map_err(|e| AppError::FileWrite(format!("Cannot create {}: {}", dir.display(), e)))?;

    let name = format!(
        "trades_export_{}.csv",
        chrono::Local::now().format("%Y%m%d_%H%M%S")
    );
    let path = dir.join(name);
    let mut wtr = create_writer(&path)?;

    let mut headers = vec!["ID"];
    headers.extend(RAW_HEADERS);
    wtr.write_record(&headers).map_err(write_err)?;

    for stored in trades {
        let mut record = vec![stored.id.to_string()];
        record.extend(raw_fields(&stored.trade));
        wtr.write_record(&record).map_err(write_err)?;
    }
    wtr.flush().map_err(|e| AppError::FileWrite(e.to_string()))?;

    info!("Exported {} stored trades to {}", trades.len(), path.display());
    Ok(Some(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::load_csv;
    use crate::engine;
    use crate::engine::normalizer::{normalize_table, TimestampParser};
    use crate::models::trade::{Market, Side};
    use chrono::NaiveDateTime;

    fn ts(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f").unwrap()
    }

    fn sample_trades() -> Vec<Trade> {
        let mut a = Trade::new("EURUSD", ts("2024-04-01 07:15:00"), ts("2024-04-01 09:40:30.25"), 0.1 + 0.2);
        a.market = Market::Forex;
        a.portfolio = Some("Main, FX".into());
        a.side = Some(Side::Buy);
        a.size = Some(1.5);
        a.open_price = Some(1.08123);
        a.stop_loss = Some(1.0800);
        a.take_profit = Some(1.0850);
        a.commission = 3.5;

        let mut b = Trade::new("BTCUSD", ts("2024-04-02 22:00:00"), ts("2024-04-03 01:00:00"), -1234.5678);
        b.market = Market::Crypto;
        b.side = Some(Side::Sell);
        b.fees = 0.75;

        let c = Trade::new("UNKNOWN", ts("2024-04-05 12:00:00"), ts("2024-04-05 12:00:00"), 1e-7);
        vec![a, b, c]
    }

    #[test]
    fn enriched_csv_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trades.csv");

        let report = engine::analyze(&sample_trades()).unwrap();
        write_trades_csv(&report.trades, &path).unwrap();

        let table = load_csv(&path).unwrap();
        let reloaded = normalize_table(&table, &TimestampParser::default()).unwrap();
        let again = engine::analyze(&reloaded).unwrap();
        assert_eq!(again.trades, report.trades);
    }

    #[test]
    fn bundle_writes_every_sheet() {
        let dir = tempfile::tempdir().unwrap();
        let report = engine::analyze(&sample_trades()).unwrap();
        let files = write_report_bundle(&report, &dir.path().join("out")).unwrap();
        assert_eq!(files.len(), 8);
        assert!(files.iter().all(|f| f.exists()));

        let summary = fs::read_to_string(&files[1]).unwrap();
        assert!(summary.starts_with("Metric,Value"));
        assert!(summary.contains("Total Trades,3"));
        // Two winners out of three, written as a percentage.
        assert!(summary.contains("Win Rate %,66.67"));

        let months = fs::read_to_string(&files[5]).unwrap();
        assert!(months.contains("2024-04"));
        assert!(months.contains("Negative"));
    }

    #[test]
    fn stored_export_is_timestamped_and_skips_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(export_stored_csv(&[], dir.path()).unwrap().is_none());

        let stored: Vec<StoredTrade> = sample_trades()
            .into_iter()
            .enumerate()
            .map(|(i, trade)| StoredTrade { id: i as i64 + 1, trade })
            .collect();
        let path = export_stored_csv(&stored, dir.path()).unwrap().unwrap();
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("trades_export_"));
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.lines().next().unwrap().starts_with("ID,Market"));
        assert_eq!(text.lines().count(), 4);
    }
}
