use chrono::{DateTime, NaiveDate, NaiveDateTime};
use tracing::{debug, info};

use crate::errors::AppError;
use crate::models::config::JournalConfig;
use crate::models::raw::{
    ColumnSchema, RawTable, RawTrade, COL_CLOSE_TIME, COL_COMMISSION, COL_FEES, COL_MARKET,
    COL_OPEN_PRICE, COL_OPEN_TIME, COL_PROFIT, COL_SIDE, COL_SIZE, COL_STOP_LOSS,
    COL_TAKE_PROFIT,
};
use crate::models::trade::{Market, Side, Trade, UNKNOWN_SYMBOL};

const ISO_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
];

const DAY_FIRST_FORMATS: &[&str] = &[
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
    "%d-%m-%Y %H:%M:%S",
    "%d-%m-%Y %H:%M",
];

const MONTH_FIRST_FORMATS: &[&str] = &["%m/%d/%Y %H:%M:%S", "%m/%d/%Y %H:%M"];

/// Parses the timestamp spellings found in broker exports and manual forms.
#[derive(Debug, Clone)]
pub struct TimestampParser {
    day_first: bool,
    extra_formats: Vec<String>,
}

impl Default for TimestampParser {
    fn default() -> Self {
        TimestampParser {
            day_first: true,
            extra_formats: Vec::new(),
        }
    }
}

impl TimestampParser {
    pub fn new(day_first: bool, extra_formats: Vec<String>) -> Self {
        TimestampParser {
            day_first,
            extra_formats,
        }
    }

    pub fn from_config(config: &JournalConfig) -> Self {
        Self::new(config.day_first, config.timestamp_formats.clone())
    }

    pub fn parse(&self, value: &str) -> Option<NaiveDateTime> {
        let value = value.trim();
        if value.is_empty() {
            return None;
        }

        let (first, second) = if self.day_first {
            (DAY_FIRST_FORMATS, MONTH_FIRST_FORMATS)
        } else {
            (MONTH_FIRST_FORMATS, DAY_FIRST_FORMATS)
        };

        let builtin = ISO_FORMATS.iter().chain(first).chain(second).copied();
        let extra = self.extra_formats.iter().map(String::as_str);
        for fmt in builtin.chain(extra) {
            if let Ok(dt) = NaiveDateTime::parse_from_str(value, fmt) {
                return Some(dt);
            }
        }

        if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
            return Some(dt.naive_local());
        }

        // Date-only cells mean midnight.
        let date_formats: &[&str] = if self.day_first {
            &["%Y-%m-%d", "%d/%m/%Y", "%m/%d/%Y"]
        } else {
            &["%Y-%m-%d", "%m/%d/%Y", "%d/%m/%Y"]
        };
        date_formats
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
            .and_then(|d| d.and_hms_opt(0, 0, 0))
    }
}

/// Validate and parse a raw table, then apply [`normalize_trades`].
///
/// Fails with [`AppError::MissingFields`] before looking at any row when a
/// required column is absent. Any bad row aborts the whole batch.
pub fn normalize_table(table: &RawTable, parser: &TimestampParser) -> Result<Vec<Trade>, AppError> {
    let missing = table.schema.missing_required();
    if !missing.is_empty() {
        return Err(AppError::MissingFields(missing));
    }

    let trades = table
        .rows
        .iter()
        .enumerate()
        .map(|(i, raw)| parse_row(i + 1, raw, &table.schema, parser))
        .collect::<Result<Vec<_>, _>>()?;

    normalize_trades(&trades)
}

/// Reject trades closing before they open and drop breakeven trades.
/// The input slice is left untouched.
pub fn normalize_trades(trades: &[Trade]) -> Result<Vec<Trade>, AppError> {
    if let Some((i, t)) = trades
        .iter()
        .enumerate()
        .find(|(_, t)| t.close_time < t.open_time)
    {
        return Err(AppError::InvalidRow {
            row: i + 1,
            message: format!(
                "close time {} is before open time {}",
                t.close_time, t.open_time
            ),
        });
    }

    let kept: Vec<Trade> = trades.iter().filter(|t| !t.is_breakeven()).cloned().collect();
    let dropped = trades.len() - kept.len();
    if dropped > 0 {
        info!("Dropped {} breakeven trades out of {}", dropped, trades.len());
    }
    debug!("Normalized {} trades", kept.len());
    Ok(kept)
}

fn parse_row(
    row: usize,
    raw: &RawTrade,
    schema: &ColumnSchema,
    parser: &TimestampParser,
) -> Result<Trade, AppError> {
    let missing: Vec<&str> = [
        (COL_PROFIT, &raw.profit_usd),
        (COL_OPEN_TIME, &raw.open_time),
        (COL_CLOSE_TIME, &raw.close_time),
    ]
    .into_iter()
    .filter(|(_, cell)| cell_text(cell).is_none())
    .map(|(name, _)| name)
    .collect();
    if !missing.is_empty() {
        return Err(AppError::InvalidRow {
            row,
            message: format!("missing required fields: {}", missing.join(", ")),
        });
    }

    let profit_usd = parse_number(row, COL_PROFIT, &raw.profit_usd)?.unwrap_or_default();
    let open_time = parse_time(row, COL_OPEN_TIME, &raw.open_time, parser)?;
    let close_time = parse_time(row, COL_CLOSE_TIME, &raw.close_time, parser)?;

    let symbol = if schema.has_symbol {
        cell_text(&raw.symbol)
            .map(str::to_uppercase)
            .unwrap_or_else(|| UNKNOWN_SYMBOL.to_string())
    } else {
        UNKNOWN_SYMBOL.to_string()
    };

    let side = if schema.has_side {
        parse_enum::<Side>(row, COL_SIDE, &raw.side)?
    } else {
        None
    };
    let market = if schema.has_market {
        parse_enum::<Market>(row, COL_MARKET, &raw.market)?.unwrap_or_default()
    } else {
        Market::default()
    };
    let portfolio = if schema.has_portfolio {
        cell_text(&raw.portfolio).map(str::to_string)
    } else {
        None
    };

    let optional = |present: bool, column: &str, cell: &Option<String>| {
        if present {
            parse_number(row, column, cell)
        } else {
            Ok(None)
        }
    };

    Ok(Trade {
        market,
        portfolio,
        symbol,
        side,
        open_time,
        close_time,
        size: optional(schema.has_size, COL_SIZE, &raw.size)?,
        open_price: optional(schema.has_open_price, COL_OPEN_PRICE, &raw.open_price)?,
        commission: optional(schema.has_commission, COL_COMMISSION, &raw.commission)?
            .unwrap_or(0.0),
        fees: optional(schema.has_fees, COL_FEES, &raw.fees)?.unwrap_or(0.0),
        profit_usd,
        take_profit: optional(schema.has_take_profit, COL_TAKE_PROFIT, &raw.take_profit)?,
        stop_loss: optional(schema.has_stop_loss, COL_STOP_LOSS, &raw.stop_loss)?,
    })
}

fn cell_text(cell: &Option<String>) -> Option<&str> {
    cell.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn parse_number(row: usize, column: &str, cell: &Option<String>) -> Result<Option<f64>, AppError> {
    let Some(text) = cell_text(cell) else {
        return Ok(None);
    };
    match text.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(Some(v)),
        Ok(_) => Err(parse_error(row, column, format!("'{}' is not a finite number", text))),
        Err(e) => Err(parse_error(row, column, format!("'{}': {}", text, e))),
    }
}

fn parse_time(
    row: usize,
    column: &str,
    cell: &Option<String>,
    parser: &TimestampParser,
) -> Result<NaiveDateTime, AppError> {
    let text = cell_text(cell).unwrap_or_default();
    parser
        .parse(text)
        .ok_or_else(|| parse_error(row, column, format!("unrecognized timestamp '{}'", text)))
}

fn parse_enum<T>(row: usize, column: &str, cell: &Option<String>) -> Result<Option<T>, AppError>
where
    T: std::str::FromStr<Err = String>,
{
    cell_text(cell)
        .map(|text| text.parse::<T>().map_err(|e| parse_error(row, column, e)))
        .transpose()
}

fn parse_error(row: usize, column: &str, message: String) -> AppError {
    AppError::Parse {
        row,
        column: column.to_string(),
        message,
    }
}
