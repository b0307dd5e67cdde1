//! Table loading and transaction assembly using Polars

use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime};
use polars::prelude::*;
use tracing::debug;

use crate::error::{ChurnError, ChurnResult};

pub const ORDERS_FILE: &str = "olist_orders_dataset.csv";
pub const ITEMS_FILE: &str = "olist_order_items_dataset.csv";
pub const CUSTOMERS_FILE: &str = "olist_customers_dataset.csv";

const ORDER_COLUMNS: [&str; 3] = ["order_id", "customer_id", "order_purchase_timestamp"];
const ITEM_COLUMNS: [&str; 2] = ["order_id", "price"];
const CUSTOMER_COLUMNS: [&str; 2] = ["customer_id", "customer_unique_id"];

/// One purchase occasion attributed to a persistent customer
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub customer_unique_id: String,
    pub purchase_date: NaiveDate,
    pub price: f64,
}

/// The three raw input tables, as read from disk
#[derive(Debug, Clone)]
pub struct RawTables {
    pub orders: DataFrame,
    pub items: DataFrame,
    pub customers: DataFrame,
}

/// Load the orders, order items and customers tables from `data_dir`
///
/// # Arguments
/// * `data_dir` - Directory holding the three Olist CSV exports
///
/// # Returns
/// * `RawTables` with every required column present
pub fn load_tables(data_dir: &Path) -> ChurnResult<RawTables> {
    let orders = read_table(&data_dir.join(ORDERS_FILE), &ORDER_COLUMNS)?;
    let items = read_table(&data_dir.join(ITEMS_FILE), &ITEM_COLUMNS)?;
    let customers = read_table(&data_dir.join(CUSTOMERS_FILE), &CUSTOMER_COLUMNS)?;

    debug!(
        orders = orders.height(),
        items = items.height(),
        customers = customers.height(),
        dir = %data_dir.display(),
        "loaded input tables"
    );

    Ok(RawTables {
        orders,
        items,
        customers,
    })
}

fn read_table(path: &Path, required: &[&str]) -> ChurnResult<DataFrame> {
    if !path.is_file() {
        return Err(ChurnError::data_unavailable(path.display(), "file not found"));
    }

    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(None)
        .try_into_reader_with_file_path(Some(PathBuf::from(path)))
        .and_then(|reader| reader.finish())
        .map_err(|e| ChurnError::data_unavailable(path.display(), e))?;

    for column in required {
        if df.column(column).is_err() {
            return Err(ChurnError::data_unavailable(
                path.display(),
                format!("missing column '{column}'"),
            ));
        }
    }

    Ok(df)
}

/// Join the raw tables into one transaction per order
///
/// Orders pick up the customer's persistent `customer_unique_id`, order items
/// are reduced to their first row per order, and orders without an item row
/// are dropped by the inner join. Multi-item orders therefore contribute only
/// the first line's price, not the order total.
pub fn assemble_transactions(tables: &RawTables) -> ChurnResult<Vec<Transaction>> {
    let customers = tables.customers.clone().lazy().select([
        col("customer_id").cast(DataType::String),
        col("customer_unique_id").cast(DataType::String),
    ]);

    let orders = tables
        .orders
        .clone()
        .lazy()
        .select([
            col("order_id").cast(DataType::String),
            col("customer_id").cast(DataType::String),
            col("order_purchase_timestamp").cast(DataType::String),
        ])
        .join(
            customers,
            [col("customer_id")],
            [col("customer_id")],
            JoinArgs::new(JoinType::Inner),
        );

    let items = tables
        .items
        .clone()
        .lazy()
        .select([
            col("order_id").cast(DataType::String),
            col("price").cast(DataType::Float64),
        ])
        .unique_stable(Some(vec!["order_id".to_string()]), UniqueKeepStrategy::First);

    let df = orders
        .join(
            items,
            [col("order_id")],
            [col("order_id")],
            JoinArgs::new(JoinType::Inner),
        )
        .select([
            col("customer_unique_id"),
            col("order_purchase_timestamp"),
            col("price"),
        ])
        .collect()
        .map_err(|e| ChurnError::data_unavailable("transactions", e))?;

    let transactions = frame_to_transactions(&df)?;
    debug!(transactions = transactions.len(), "assembled transactions");
    Ok(transactions)
}

fn frame_to_transactions(df: &DataFrame) -> ChurnResult<Vec<Transaction>> {
    let malformed = |e: PolarsError| ChurnError::data_unavailable("transactions", e);

    let ids = df.column("customer_unique_id").and_then(|s| s.str()).map_err(malformed)?;
    let stamps = df
        .column("order_purchase_timestamp")
        .and_then(|s| s.str())
        .map_err(malformed)?;
    let prices = df.column("price").and_then(|s| s.f64()).map_err(malformed)?;

    ids.into_iter()
        .zip(stamps)
        .zip(prices)
        .enumerate()
        .map(|(row, ((id, stamp), price))| {
            let missing = |field: &str| {
                ChurnError::data_unavailable("transactions", format!("row {row}: missing {field}"))
            };

            let customer_unique_id = id.ok_or_else(|| missing("customer_unique_id"))?;
            let stamp = stamp.ok_or_else(|| missing("order_purchase_timestamp"))?;
            let price = price.ok_or_else(|| missing("price"))?;

            let purchase_date = parse_purchase_date(stamp).ok_or_else(|| {
                ChurnError::data_unavailable(
                    "transactions",
                    format!("row {row}: unparseable timestamp '{stamp}'"),
                )
            })?;

            if !price.is_finite() || price < 0.0 {
                return Err(ChurnError::data_unavailable(
                    "transactions",
                    format!("row {row}: invalid price {price}"),
                ));
            }

            Ok(Transaction {
                customer_unique_id: customer_unique_id.to_string(),
                purchase_date,
                price,
            })
        })
        .collect()
}

/// Parse a purchase timestamp and drop the time of day
pub fn parse_purchase_date(raw: &str) -> Option<NaiveDate> {
    const DATETIME_FORMATS: [&str; 4] = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
    ];

    let raw = raw.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|dt| dt.date())
        .or_else(|| NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok())
}
