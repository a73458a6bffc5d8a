use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};

use crate::commands;
use crate::engine::aggregator::TradeFilter;
use crate::errors::AppError;
use crate::models::result::{GroupSummary, JournalReport};
use crate::models::trade::{weekday_name, ManualEntry, Market, Side};
use crate::AppState;

/// Trade journal: import, record and analyze closed trades.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// JSON config file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Database file, overriding the config.
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Import a journal CSV into the database.
    Import {
        file: PathBuf,
        /// Keep existing rows instead of replacing them.
        #[arg(long)]
        append: bool,
    },
    /// Record a single trade by hand.
    Add(AddArgs),
    /// Delete a stored trade.
    Delete { id: i64 },
    /// List stored trades with their derived metrics.
    List {
        #[command(flatten)]
        filter: FilterArgs,
        #[arg(long, default_value_t = 50)]
        limit: usize,
        #[arg(long)]
        json: bool,
    },
    /// Print the journal report.
    Report {
        #[command(flatten)]
        filter: FilterArgs,
        #[arg(long)]
        json: bool,
    },
    /// Quick statistics computed by the database.
    Stats,
    /// Write every report sheet to disk.
    Export {
        /// Output directory (defaults to the configured export directory).
        #[arg(long)]
        out: Option<PathBuf>,
        /// Also write the enriched table as Parquet.
        #[arg(long)]
        parquet: bool,
    },
}

#[derive(Args)]
pub struct FilterArgs {
    /// Only these symbols (repeatable).
    #[arg(long = "symbol")]
    pub symbols: Vec<String>,
    /// Only these sides (repeatable).
    #[arg(long = "side")]
    pub sides: Vec<Side>,
}

impl From<FilterArgs> for TradeFilter {
    fn from(args: FilterArgs) -> Self {
        TradeFilter {
            symbols: args.symbols,
            sides: args.sides,
        }
    }
}

#[derive(Args)]
pub struct AddArgs {
    #[arg(long)]
    pub symbol: String,
    #[arg(long)]
    pub side: Side,
    #[arg(long, default_value = "STOCK")]
    pub market: Market,
    #[arg(long)]
    pub portfolio: Option<String>,
    /// Open time, in any format the importer accepts.
    #[arg(long)]
    pub open: String,
    /// Close time. Defaults to the open time.
    #[arg(long)]
    pub close: Option<String>,
    #[arg(long)]
    pub size: f64,
    #[arg(long)]
    pub price: f64,
    #[arg(long, allow_hyphen_values = true)]
    pub profit: f64,
    #[arg(long, default_value_t = 0.0)]
    pub commission: f64,
    #[arg(long, default_value_t = 0.0)]
    pub fees: f64,
    #[arg(long)]
    pub take_profit: Option<f64>,
    #[arg(long)]
    pub stop_loss: Option<f64>,
}

impl AddArgs {
    fn into_entry(self, state: &AppState) -> Result<ManualEntry, AppError> {
        let parse = |s: &str| {
            state
                .parser
                .parse(s)
                .ok_or_else(|| AppError::InvalidTrade(format!("unrecognised timestamp '{}'", s)))
        };
        let open_time = parse(&self.open)?;
        let close_time = self.close.as_deref().map(parse).transpose()?;

        Ok(ManualEntry {
            market: self.market,
            portfolio: self.portfolio,
            symbol: self.symbol,
            side: self.side,
            open_time,
            close_time,
            size: self.size,
            price: self.price,
            commission: self.commission,
            fees: self.fees,
            profit_usd: self.profit,
            take_profit: self.take_profit,
            stop_loss: self.stop_loss,
        })
    }
}

/// Run one subcommand against an opened journal.
pub fn dispatch(command: Commands, state: &mut AppState) -> anyhow::Result<()> {
    match command {
        Commands::Import { file, append } => {
            let n = commands::import_csv(state, &file, append)
                .with_context(|| format!("importing {}", file.display()))?;
            println!("Imported {} trades", n);
        }
        Commands::Add(args) => {
            let entry = args.into_entry(state)?;
            let stored = commands::add_trade(state, entry)?;
            println!("Added trade #{} ({})", stored.id, stored.trade.symbol);
        }
        Commands::Delete { id } => {
            commands::delete_trade(state, id)?;
            println!("Deleted trade #{}", id);
        }
        Commands::List { filter, limit, json } => {
            let filter = TradeFilter::from(filter);
            if json {
                let rows = commands::preview_trades(state, &filter, limit)?;
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                for t in commands::list_trades(state, &filter)?.iter().take(limit) {
                    println!(
                        "{}  {:<10} {:<4} {:>12.2}  {:>7.2}h  {}",
                        t.trade.close_time.format("%Y-%m-%d %H:%M"),
                        t.trade.symbol,
                        t.trade.side.map(|s| s.as_str()).unwrap_or("-"),
                        t.trade.profit_usd,
                        t.duration_hours,
                        t.result,
                    );
                }
            }
        }
        Commands::Report { filter, json } => {
            let report = commands::build_report(state, &TradeFilter::from(filter))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }
        }
        Commands::Stats => {
            let stats = commands::statistics(state)?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Commands::Export { out, parquet } => {
            for path in commands::export_report(state, out, parquet)? {
                println!("{}", path.display());
            }
        }
    }
    Ok(())
}

fn print_report(report: &JournalReport) {
    let s = &report.summary;
    println!("Total trades:      {}", s.total_trades);
    println!("Winning / losing:  {} / {}", s.winning_trades, s.losing_trades);
    println!("Win rate:          {:.2}%", s.win_rate_pct);
    println!("Total profit:      {:.2}", s.total_profit);
    println!("Avg per trade:     {:.2}", s.avg_profit);
    println!("Profit factor:     {:.2}", s.profit_factor);
    println!("Max drawdown:      {:.2}", s.max_drawdown);

    print_groups("By symbol", &report.by_symbol);
    print_groups("By day of week", &report.by_day_of_week);
    print_groups("By time of day", &report.by_time_of_day);

    println!("\nBy month");
    for m in &report.by_month {
        println!(
            "  {:<10} {:>12.2} {:>5} {}",
            m.stats.key,
            m.stats.total_profit,
            m.stats.trade_count,
            m.result.as_str()
        );
    }

    if let Some(best) = report
        .trades
        .iter()
        .max_by(|a, b| a.trade.profit_usd.total_cmp(&b.trade.profit_usd))
    {
        println!(
            "\nBest trade: {} {:.2} on {}",
            best.trade.symbol,
            best.trade.profit_usd,
            weekday_name(best.day_of_week)
        );
    }
}

fn print_groups(title: &str, groups: &[GroupSummary]) {
    println!("\n{}", title);
    for g in groups {
        println!(
            "  {:<10} {:>12.2} {:>5} {:>6.1}%",
            g.key,
            g.total_profit,
            g.trade_count,
            g.win_rate * 100.0
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::config::JournalConfig;

    fn add_args(extra: &[&str]) -> AddArgs {
        let mut argv = vec![
            "trade-journal", "add", "--symbol", "es", "--side", "sell", "--open",
            "04/03/2024 14:00", "--size", "2", "--price", "5000", "--profit", "-12.5",
        ];
        argv.extend_from_slice(extra);
        match Cli::try_parse_from(argv).unwrap().command {
            Commands::Add(args) => args,
            _ => panic!("expected the add subcommand"),
        }
    }

    #[test]
    fn add_accepts_negative_profit() {
        let args = add_args(&[]);
        assert_eq!(args.profit, -12.5);
        assert_eq!(args.side, Side::Sell);
        assert_eq!(args.market, Market::Stock);
        assert_eq!(args.commission, 0.0);
    }

    #[test]
    fn close_time_defaults_to_open_time() {
        let state = AppState::in_memory(JournalConfig::default()).unwrap();
        let entry = add_args(&[]).into_entry(&state).unwrap();
        assert_eq!(entry.close_time, None);
        // Day-first: 4 March.
        assert_eq!(entry.open_time.format("%Y-%m-%d %H:%M").to_string(), "2024-03-04 14:00");

        let trade = entry.into_trade().unwrap();
        assert_eq!(trade.close_time, trade.open_time);
        assert_eq!(trade.symbol, "ES");
    }

    #[test]
    fn explicit_close_time_is_parsed() {
        let state = AppState::in_memory(JournalConfig::default()).unwrap();
        let entry = add_args(&["--close", "2024-03-04T15:30"]).into_entry(&state).unwrap();
        let close = entry.close_time.unwrap();
        assert_eq!(close.format("%H:%M").to_string(), "15:30");
    }

    #[test]
    fn unreadable_timestamp_is_rejected() {
        let state = AppState::in_memory(JournalConfig::default()).unwrap();
        let err = add_args(&["--close", "tomorrow"]).into_entry(&state).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn dispatch_add_stores_the_trade() {
        let mut state = AppState::in_memory(JournalConfig::default()).unwrap();
        let cli = Cli::try_parse_from([
            "trade-journal", "add", "--symbol", "nq", "--side", "BUY", "--open",
            "2024-03-05 10:00", "--size", "1", "--price", "18000", "--profit", "-40",
        ])
        .unwrap();
        dispatch(cli.command, &mut state).unwrap();

        let stored = commands::stored_trades(&state).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].trade.profit_usd, -40.0);
    }

    #[test]
    fn unknown_side_fails_to_parse() {
        let argv = [
            "trade-journal", "add", "--symbol", "es", "--side", "long", "--open",
            "2024-03-05 10:00", "--size", "1", "--price", "1", "--profit", "1",
        ];
        assert!(Cli::try_parse_from(argv).is_err());
    }
}
