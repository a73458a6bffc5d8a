use std::path::Path;

use chrono::NaiveDateTime;
use rusqlite::{params, Connection, Row};
use serde::Serialize;
use tracing::{debug, info};

use crate::errors::AppError;
use crate::models::trade::{Market, Side, Trade};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS trades (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    market TEXT NOT NULL DEFAULT 'STOCK',
    portfolio TEXT,
    symbol TEXT NOT NULL,
    side TEXT,
    open_time TEXT NOT NULL,
    close_time TEXT NOT NULL,
    size REAL,
    open_price REAL,
    commission REAL NOT NULL DEFAULT 0,
    fees REAL NOT NULL DEFAULT 0,
    profit_usd REAL NOT NULL,
    take_profit REAL,
    stop_loss REAL
);
CREATE INDEX IF NOT EXISTS idx_trades_close_time ON trades(close_time);
";

const SELECT_COLUMNS: &str = "id, market, portfolio, symbol, side, open_time, close_time, \
    size, open_price, commission, fees, profit_usd, take_profit, stop_loss";

/// A persisted trade with its row identifier.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredTrade {
    pub id: i64,
    pub trade: Trade,
}

/// Aggregate counts computed in SQL over the persisted, non-breakeven rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradeStatistics {
    pub total_trades: i64,
    pub total_profit: f64,
    pub winners: i64,
    pub losers: i64,
    pub win_rate_pct: f64,
    pub best_trade: f64,
    pub worst_trade: f64,
}

/// Open (or create) the journal database and make sure the schema exists.
pub fn initialize_database(path: &str) -> Result<Connection, AppError> {
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::FileWrite(format!("Cannot create {}: {}", parent.display(), e))
            })?;
        }
    }
    let conn = Connection::open(path)?;
    create_schema(&conn)?;
    Ok(conn)
}

/// In-memory journal, for tests and throwaway sessions.
pub fn open_in_memory() -> Result<Connection, AppError> {
    let conn = Connection::open_in_memory()?;
    create_schema(&conn)?;
    Ok(conn)
}

fn create_schema(conn: &Connection) -> Result<(), AppError> {
    conn.execute_batch(SCHEMA_SQL)?;
    debug!("Trade schema ready");
    Ok(())
}

/// Replace the whole journal with `trades` in one transaction.
pub fn replace_all_trades(conn: &mut Connection, trades: &[Trade]) -> Result<usize, AppError> {
    let tx = conn.transaction()?;
    let removed = tx.execute("DELETE FROM trades", [])?;
    for trade in trades {
        insert_with(&tx, trade)?;
    }
    tx.commit()?;
    info!("Replaced {} stored trades with {}", removed, trades.len());
    Ok(trades.len())
}

/// Append one trade. Returns its new id.
pub fn insert_trade(conn: &Connection, trade: &Trade) -> Result<i64, AppError> {
    insert_with(conn, trade)?;
    let id = conn.last_insert_rowid();
    info!("Stored trade {} ({})", id, trade.symbol);
    Ok(id)
}

fn insert_with(conn: &Connection, trade: &Trade) -> Result<(), AppError> {
    conn.execute(
        "INSERT INTO trades (market, portfolio, symbol, side, open_time, close_time, size,
            open_price, commission, fees, profit_usd, take_profit, stop_loss)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        params![
            trade.market.as_str(),
            trade.portfolio,
            trade.symbol,
            trade.side.map(|s| s.as_str()),
            trade.open_time.format(TIME_FORMAT).to_string(),
            trade.close_time.format(TIME_FORMAT).to_string(),
            trade.size,
            trade.open_price,
            trade.commission,
            trade.fees,
            trade.profit_usd,
            trade.take_profit,
            trade.stop_loss,
        ],
    )?;
    Ok(())
}

/// Delete by id. Fails with `NotFound` when no such row exists.
pub fn delete_trade_by_id(conn: &Connection, id: i64) -> Result<(), AppError> {
    let affected = conn.execute("DELETE FROM trades WHERE id = ?1", params![id])?;
    if affected == 0 {
        return Err(AppError::NotFound(format!("Trade {}", id)));
    }
    info!("Deleted trade {}", id);
    Ok(())
}

/// Every stored trade, most recently closed first.
pub fn load_trades(conn: &Connection) -> Result<Vec<StoredTrade>, AppError> {
    let sql = format!(
        "SELECT {} FROM trades ORDER BY close_time DESC, id DESC",
        SELECT_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], StoredRow::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    rows.into_iter().map(StoredRow::into_stored).collect()
}

pub fn get_trade_by_id(conn: &Connection, id: i64) -> Result<StoredTrade, AppError> {
    let sql = format!("SELECT {} FROM trades WHERE id = ?1", SELECT_COLUMNS);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query_map(params![id], StoredRow::from_row)?;
    match rows.next() {
        Some(row) => row?.into_stored(),
        None => Err(AppError::NotFound(format!("Trade {}", id))),
    }
}

pub fn count_trades(conn: &Connection) -> Result<i64, AppError> {
    Ok(conn.query_row("SELECT COUNT(*) FROM trades", [], |row| row.get(0))?)
}

/// Headline statistics straight from SQL. Breakeven rows are excluded.
pub fn trade_statistics(conn: &Connection) -> Result<TradeStatistics, AppError> {
    let (total, sum, winners, losers, best, worst): (
        i64,
        Option<f64>,
        i64,
        i64,
        Option<f64>,
        Option<f64>,
    ) = conn.query_row(
        "SELECT COUNT(*),
                SUM(profit_usd),
                COALESCE(SUM(CASE WHEN profit_usd > 0 THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN profit_usd < 0 THEN 1 ELSE 0 END), 0),
                MAX(profit_usd),
                MIN(profit_usd)
         FROM trades WHERE profit_usd != 0",
        [],
        |row| {
            Ok((
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                row.get(3)?,
                row.get(4)?,
                row.get(5)?,
            ))
        },
    )?;

    Ok(TradeStatistics {
        total_trades: total,
        total_profit: sum.unwrap_or(0.0),
        winners,
        losers,
        win_rate_pct: if total > 0 {
            winners as f64 / total as f64 * 100.0
        } else {
            0.0
        },
        best_trade: best.unwrap_or(0.0),
        worst_trade: worst.unwrap_or(0.0),
    })
}

/// Column values as SQLite hands them back, before domain parsing.
struct StoredRow {
    id: i64,
    market: String,
    portfolio: Option<String>,
    symbol: String,
    side: Option<String>,
    open_time: String,
    close_time: String,
    size: Option<f64>,
    open_price: Option<f64>,
    commission: f64,
    fees: f64,
    profit_usd: f64,
    take_profit: Option<f64>,
    stop_loss: Option<f64>,
}

impl StoredRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(StoredRow {
            id: row.get(0)?,
            market: row.get(1)?,
            portfolio: row.get(2)?,
            symbol: row.get(3)?,
            side: row.get(4)?,
            open_time: row.get(5)?,
            close_time: row.get(6)?,
            size: row.get(7)?,
            open_price: row.get(8)?,
            commission: row.get(9)?,
            fees: row.get(10)?,
            profit_usd: row.get(11)?,
            take_profit: row.get(12)?,
            stop_loss: row.get(13)?,
        })
    }

    fn into_stored(self) -> Result<StoredTrade, AppError> {
        let id = self.id;
        let corrupt = |what: String| AppError::Database(format!("Trade {}: {}", id, what));

        let market = self.market.parse::<Market>().map_err(corrupt)?;
        let side = self
            .side
            .map(|s| s.parse::<Side>())
            .transpose()
            .map_err(corrupt)?;
        let open_time = parse_stored_time(&self.open_time).map_err(corrupt)?;
        let close_time = parse_stored_time(&self.close_time).map_err(corrupt)?;

        Ok(StoredTrade {
            id,
            trade: Trade {
                market,
                portfolio: self.portfolio,
                symbol: self.symbol,
                side,
                open_time,
                close_time,
                size: self.size,
                open_price: self.open_price,
                commission: self.commission,
                fees: self.fees,
                profit_usd: self.profit_usd,
                take_profit: self.take_profit,
                stop_loss: self.stop_loss,
            },
        })
    }
}

fn parse_stored_time(value: &str) -> Result<NaiveDateTime, String> {
    NaiveDateTime::parse_from_str(value, TIME_FORMAT)
        .map_err(|e| format!("bad timestamp '{}': {}", value, e))
}
