use std::fs::File;
use std::path::Path;

use polars::prelude::*;
use serde_json::Value;

use crate::errors::AppError;
use crate::models::trade::{weekday_name, EnrichedTrade};

/// Columnar view of the enriched trade table.
pub fn enriched_to_dataframe(trades: &[EnrichedTrade]) -> Result<DataFrame, AppError> {
    let t = |f: fn(&EnrichedTrade) -> Option<f64>| trades.iter().map(f).collect::<Vec<_>>();

    let columns = vec![
        Column::new(
            "Market".into(),
            trades.iter().map(|e| e.trade.market.as_str()).collect::<Vec<_>>(),
        ),
        Column::new(
            "Portfolio".into(),
            trades.iter().map(|e| e.trade.portfolio.clone()).collect::<Vec<_>>(),
        ),
        Column::new(
            "Symbol".into(),
            trades.iter().map(|e| e.trade.symbol.as_str()).collect::<Vec<_>>(),
        ),
        Column::new(
            "Side".into(),
            trades
                .iter()
                .map(|e| e.trade.side.map(|s| s.as_str()))
                .collect::<Vec<_>>(),
        ),
        Column::new(
            "Open Time".into(),
            trades.iter().map(|e| e.trade.open_time).collect::<Vec<_>>(),
        ),
        Column::new(
            "Close Time".into(),
            trades.iter().map(|e| e.trade.close_time).collect::<Vec<_>>(),
        ),
        Column::new("Size".into(), t(|e| e.trade.size)),
        Column::new("Open Price".into(), t(|e| e.trade.open_price)),
        Column::new("Commission".into(), t(|e| Some(e.trade.commission))),
        Column::new("Fees".into(), t(|e| Some(e.trade.fees))),
        Column::new("Profit (USD)".into(), t(|e| Some(e.trade.profit_usd))),
        Column::new("Take Profit".into(), t(|e| e.trade.take_profit)),
        Column::new("Stop Loss".into(), t(|e| e.trade.stop_loss)),
        Column::new("Duration (hours)".into(), t(|e| Some(e.duration_hours))),
        Column::new(
            "Result".into(),
            trades.iter().map(|e| e.result.as_str()).collect::<Vec<_>>(),
        ),
        Column::new(
            "Day of Week".into(),
            trades.iter().map(|e| weekday_name(e.day_of_week)).collect::<Vec<_>>(),
        ),
        Column::new(
            "Month".into(),
            trades.iter().map(|e| e.month.as_str()).collect::<Vec<_>>(),
        ),
        Column::new(
            "Time of Day".into(),
            trades.iter().map(|e| e.time_of_day.as_str()).collect::<Vec<_>>(),
        ),
        Column::new("Risk-Reward".into(), t(|e| e.risk_reward)),
    ];

    Ok(DataFrame::new(columns)?)
}

/// Write a DataFrame to a Parquet file.
pub fn write_parquet(df: &mut DataFrame, path: &Path) -> Result<(), AppError> {
    let mut file = File::create(path)
        .map_err(|e| AppError::FileWrite(format!("Cannot create {}: {}", path.display(), e)))?;
    ParquetWriter::new(&mut file).finish(df)?;
    Ok(())
}

/// Convert a DataFrame to a Vec of JSON objects, one per row.
pub fn dataframe_to_json(df: &DataFrame) -> Result<Vec<Value>, AppError> {
    let mut rows = Vec::with_capacity(df.height());

    for i in 0..df.height() {
        let mut row = serde_json::Map::new();
        for col in df.get_columns() {
            let val = col.get(i)?;
            row.insert(col.name().to_string(), anyvalue_to_json(&val));
        }
        rows.push(Value::Object(row));
    }

    Ok(rows)
}

fn anyvalue_to_json(val: &AnyValue) -> Value {
    match val {
        AnyValue::Null => Value::Null,
        AnyValue::Boolean(b) => Value::Bool(*b),
        AnyValue::Int32(n) => Value::Number((*n).into()),
        AnyValue::Int64(n) => Value::Number((*n).into()),
        AnyValue::UInt32(n) => Value::Number((*n).into()),
        AnyValue::UInt64(n) => Value::Number((*n).into()),
        AnyValue::Float64(f) => serde_json::Number::from_f64(*f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        AnyValue::String(s) => Value::String(s.to_string()),
        AnyValue::StringOwned(s) => Value::String(s.to_string()),
        _ => Value::String(format!("{}", val)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine;
    use crate::models::trade::{Side, Trade};
    use chrono::NaiveDateTime;

    fn sample() -> Vec<EnrichedTrade> {
        let ts = |s: &str| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap();
        let mut a = Trade::new("es", ts("2024-06-03 09:00"), ts("2024-06-03 11:00"), 120.0);
        a.side = Some(Side::Buy);
        a.open_price = Some(100.0);
        a.stop_loss = Some(90.0);
        a.take_profit = Some(130.0);
        let b = Trade::new("NQ", ts("2024-06-04 20:00"), ts("2024-06-04 20:30"), -40.0);
        engine::analyze(&[a, b]).unwrap().trades
    }

    #[test]
    fn dataframe_has_one_row_per_trade() {
        let df = enriched_to_dataframe(&sample()).unwrap();
        assert_eq!(df.height(), 2);
        assert_eq!(df.width(), 19);
        let profit = df.column("Profit (USD)").unwrap().f64().unwrap();
        assert_eq!(profit.get(0), Some(120.0));
        assert_eq!(profit.get(1), Some(-40.0));
    }

    #[test]
    fn json_rows_keep_nulls_and_strings() {
        let df = enriched_to_dataframe(&sample()).unwrap();
        let rows = dataframe_to_json(&df).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["Symbol"], Value::String("ES".into()));
        assert_eq!(rows[0]["Risk-Reward"], serde_json::json!(3.0));
        assert_eq!(rows[1]["Side"], Value::Null);
        assert_eq!(rows[1]["Result"], Value::String("Loss".into()));
    }

    #[test]
    fn parquet_file_is_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trades.parquet");
        let mut df = enriched_to_dataframe(&sample()).unwrap();
        write_parquet(&mut df, &path).unwrap();
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
    }
}
