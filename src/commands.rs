use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{info, warn};

use crate::data::storage::{StoredTrade, TradeStatistics};
use crate::data::{loader, storage};
use crate::engine;
use crate::engine::aggregator::TradeFilter;
use crate::errors::AppError;
use crate::models::result::JournalReport;
use crate::models::trade::{EnrichedTrade, ManualEntry, Trade};
use crate::utils::{export, frame};
use crate::AppState;

// ── Journal Commands ──

/// Import a journal CSV: validate every row, then replace the stored journal
/// or append to it. Returns the number of rows written.
pub fn import_csv(state: &mut AppState, path: &Path, append: bool) -> Result<usize, AppError> {
    let table = loader::load_csv(path)?;
    let trades = engine::normalizer::normalize_table(&table, &state.parser)?;

    let written = if append {
        let tx = state.db.transaction()?;
        for trade in &trades {
            storage::insert_trade(&tx, trade)?;
        }
        tx.commit()?;
        trades.len()
    } else {
        storage::replace_all_trades(&mut state.db, &trades)?
    };

    info!(
        "Imported {} trades from {} ({})",
        written,
        path.display(),
        if append { "appended" } else { "replaced" }
    );
    Ok(written)
}

/// Validate and store a manually entered trade.
pub fn add_trade(state: &AppState, entry: ManualEntry) -> Result<StoredTrade, AppError> {
    let trade = entry.into_trade()?;
    if trade.is_breakeven() {
        warn!("Breakeven trade stored; it will not appear in reports");
    }
    let id = storage::insert_trade(&state.db, &trade)?;
    info!("Trade added: #{} {}", id, trade.symbol);
    Ok(StoredTrade { id, trade })
}

/// Delete a stored trade by ID.
pub fn delete_trade(state: &AppState, id: i64) -> Result<(), AppError> {
    storage::delete_trade_by_id(&state.db, id)?;
    info!("Trade deleted: #{}", id);
    Ok(())
}

/// Stored trades as persisted, newest first.
pub fn stored_trades(state: &AppState) -> Result<Vec<StoredTrade>, AppError> {
    storage::load_trades(&state.db)
}

/// Enriched trades matching `filter`, newest first.
pub fn list_trades(state: &AppState, filter: &TradeFilter) -> Result<Vec<EnrichedTrade>, AppError> {
    let trades = load_journal(state)?;
    let normalized = engine::normalizer::normalize_trades(&trades)?;
    Ok(filter.apply(&engine::enricher::enrich(&normalized)))
}

/// First `limit` matching trades as JSON rows.
pub fn preview_trades(
    state: &AppState,
    filter: &TradeFilter,
    limit: usize,
) -> Result<Vec<Value>, AppError> {
    let trades = list_trades(state, filter)?;
    let df = frame::enriched_to_dataframe(&trades)?;
    frame::dataframe_to_json(&df.head(Some(limit)))
}

// ── Report Commands ──

/// Full report over the stored journal, restricted to trades matching `filter`.
pub fn build_report(state: &AppState, filter: &TradeFilter) -> Result<JournalReport, AppError> {
    let trades = list_trades(state, filter)?;
    Ok(engine::build_report(trades))
}

/// Quick SQL-side statistics.
pub fn statistics(state: &AppState) -> Result<TradeStatistics, AppError> {
    storage::trade_statistics(&state.db)
}

/// Write every report sheet plus a dump of the stored rows into `dir`
/// (the configured export directory when `None`). Returns the files written.
pub fn export_report(
    state: &AppState,
    dir: Option<PathBuf>,
    parquet: bool,
) -> Result<Vec<PathBuf>, AppError> {
    let dir = dir.unwrap_or_else(|| state.config.export_path());
    let report = build_report(state, &TradeFilter::default())?;

    let mut files = export::write_report_bundle(&report, &dir)?;

    let stored = storage::load_trades(&state.db)?;
    if let Some(path) = export::export_stored_csv(&stored, &dir)? {
        files.push(path);
    }

    if parquet {
        let path = dir.join("all_trades.parquet");
        let mut df = frame::enriched_to_dataframe(&report.trades)?;
        frame::write_parquet(&mut df, &path)?;
        files.push(path);
    }

    info!("Export complete: {} files in {}", files.len(), dir.display());
    Ok(files)
}

// ── Helpers ──

fn load_journal(state: &AppState) -> Result<Vec<Trade>, AppError> {
    Ok(storage::load_trades(&state.db)?
        .into_iter()
        .map(|s| s.trade)
        .collect())
}
