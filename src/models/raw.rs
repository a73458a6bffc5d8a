use serde::{Deserialize, Serialize};

// Column headers of the journal CSV format.
pub const COL_PROFIT: &str = "Profit (USD)";
pub const COL_OPEN_TIME: &str = "Open Time";
pub const COL_CLOSE_TIME: &str = "Close Time";
pub const COL_SYMBOL: &str = "Symbol";
pub const COL_SIDE: &str = "Side";
pub const COL_SIZE: &str = "Size";
pub const COL_OPEN_PRICE: &str = "Open Price";
pub const COL_TAKE_PROFIT: &str = "Take Profit";
pub const COL_STOP_LOSS: &str = "Stop Loss";
pub const COL_COMMISSION: &str = "Commission";
pub const COL_FEES: &str = "Fees";
pub const COL_MARKET: &str = "Market";
pub const COL_PORTFOLIO: &str = "Portfolio";
pub const COL_ORDER_ID: &str = "Order ID";

/// Columns every input table must carry.
pub const REQUIRED_COLUMNS: [&str; 3] = [COL_PROFIT, COL_OPEN_TIME, COL_CLOSE_TIME];

/// Which columns an input table carries. Computed once from the header row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ColumnSchema {
    pub has_profit: bool,
    pub has_open_time: bool,
    pub has_close_time: bool,
    pub has_symbol: bool,
    pub has_side: bool,
    pub has_size: bool,
    pub has_open_price: bool,
    pub has_take_profit: bool,
    pub has_stop_loss: bool,
    pub has_commission: bool,
    pub has_fees: bool,
    pub has_market: bool,
    pub has_portfolio: bool,
    pub has_order_id: bool,
}

impl ColumnSchema {
    pub fn from_headers<'a, I>(headers: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut schema = ColumnSchema::default();
        for header in headers {
            match header.trim() {
                COL_PROFIT => schema.has_profit = true,
                COL_OPEN_TIME => schema.has_open_time = true,
                COL_CLOSE_TIME => schema.has_close_time = true,
                COL_SYMBOL => schema.has_symbol = true,
                COL_SIDE => schema.has_side = true,
                COL_SIZE => schema.has_size = true,
                COL_OPEN_PRICE => schema.has_open_price = true,
                COL_TAKE_PROFIT => schema.has_take_profit = true,
                COL_STOP_LOSS => schema.has_stop_loss = true,
                COL_COMMISSION => schema.has_commission = true,
                COL_FEES => schema.has_fees = true,
                COL_MARKET => schema.has_market = true,
                COL_PORTFOLIO => schema.has_portfolio = true,
                COL_ORDER_ID => schema.has_order_id = true,
                _ => {}
            }
        }
        schema
    }

    /// Names of required columns the table lacks, in canonical order.
    pub fn missing_required(&self) -> Vec<String> {
        [
            (COL_PROFIT, self.has_profit),
            (COL_OPEN_TIME, self.has_open_time),
            (COL_CLOSE_TIME, self.has_close_time),
        ]
        .into_iter()
        .filter(|(_, present)| !present)
        .map(|(name, _)| name.to_string())
        .collect()
    }
}

/// One unparsed row. Empty cells deserialize to `None`; unknown columns
/// (including `Order ID` and previously exported derived columns) are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTrade {
    #[serde(rename = "Profit (USD)")]
    pub profit_usd: Option<String>,
    #[serde(rename = "Open Time")]
    pub open_time: Option<String>,
    #[serde(rename = "Close Time")]
    pub close_time: Option<String>,
    #[serde(rename = "Symbol")]
    pub symbol: Option<String>,
    #[serde(rename = "Side")]
    pub side: Option<String>,
    #[serde(rename = "Size")]
    pub size: Option<String>,
    #[serde(rename = "Open Price")]
    pub open_price: Option<String>,
    #[serde(rename = "Take Profit")]
    pub take_profit: Option<String>,
    #[serde(rename = "Stop Loss")]
    pub stop_loss: Option<String>,
    #[serde(rename = "Commission")]
    pub commission: Option<String>,
    #[serde(rename = "Fees")]
    pub fees: Option<String>,
    #[serde(rename = "Market")]
    pub market: Option<String>,
    #[serde(rename = "Portfolio")]
    pub portfolio: Option<String>,
}

/// A parsed-but-unvalidated input table.
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    pub schema: ColumnSchema,
    pub rows: Vec<RawTrade>,
}

impl RawTable {
    pub fn new(schema: ColumnSchema, rows: Vec<RawTrade>) -> Self {
        RawTable { schema, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
