//! CSV fixtures shared by the integration tests

#![allow(dead_code)]

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use chrono::{Days, NaiveDate};
use churnwatch::data::{CUSTOMERS_FILE, ITEMS_FILE, ORDERS_FILE};
use tempfile::TempDir;

/// One order placed by a persistent customer
pub struct Order {
    pub unique_id: String,
    pub timestamp: String,
    /// Item prices, in file order
    pub prices: Vec<f64>,
}

impl Order {
    pub fn new(unique_id: &str, timestamp: &str, prices: &[f64]) -> Self {
        Self {
            unique_id: unique_id.to_string(),
            timestamp: timestamp.to_string(),
            prices: prices.to_vec(),
        }
    }
}

/// Write the three Olist CSV files for `orders` into a fresh directory
///
/// Every order gets its own session-scoped `customer_id`, mapped back to the
/// persistent id in the customers table.
pub fn write_dataset(orders: &[Order]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    write_dataset_into(dir.path(), orders);
    dir
}

pub fn write_dataset_into(dir: &Path, orders: &[Order]) {
    let mut orders_csv = String::from(
        "order_id,customer_id,order_status,order_purchase_timestamp,order_approved_at\n",
    );
    let mut items_csv = String::from("order_id,order_item_id,product_id,seller_id,price,freight_value\n");
    let mut customers_csv =
        String::from("customer_id,customer_unique_id,customer_zip_code_prefix,customer_city,customer_state\n");

    for (i, order) in orders.iter().enumerate() {
        let order_id = format!("ord{i:05}");
        let customer_id = format!("sess{i:05}");
        writeln!(
            orders_csv,
            "{order_id},{customer_id},delivered,{},{}",
            order.timestamp, order.timestamp
        )
        .unwrap();
        writeln!(customers_csv, "{customer_id},{},01310,sao paulo,SP", order.unique_id).unwrap();
        for (n, price) in order.prices.iter().enumerate() {
            writeln!(items_csv, "{order_id},{},prod{n},sell{n},{price:.2},9.90", n + 1).unwrap();
        }
    }

    fs::write(dir.join(ORDERS_FILE), orders_csv).unwrap();
    fs::write(dir.join(ITEMS_FILE), items_csv).unwrap();
    fs::write(dir.join(CUSTOMERS_FILE), customers_csv).unwrap();
}

/// A deterministic population of 48 customers: one in four buys once,
/// the rest repeat with varying gaps, and every third one stops early.
pub fn synthetic_population() -> Vec<Order> {
    let origin = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
    let mut orders = Vec::new();

    for i in 0..48u64 {
        let unique_id = format!("{:032x}", 0xabc0_0000 + i);
        let purchases = 1 + i % 4;
        let gap = 12 + (i % 5) * 17;
        let start = origin + Days::new(i * 3);
        let lapsed = i % 3 == 0;

        for p in 0..purchases {
            let offset = if lapsed { p * 4 } else { p * gap };
            let day = start + Days::new(offset);
            let timestamp = format!("{} 1{}:2{}:00", day.format("%Y-%m-%d"), p % 10, i % 10);
            let price = 20.0 + (i * 7 + p * 3) as f64;
            orders.push(Order::new(&unique_id, &timestamp, &[price]));
        }
    }

    orders
}

/// 500 customers who mostly come back exactly once, observed over windows of
/// 30 to 699 days ending at `cutoff`; every fortieth makes a second repeat.
pub fn sparse_repeat_population(cutoff: NaiveDate) -> Vec<Order> {
    let mut orders = Vec::new();

    for i in 0..500u64 {
        let unique_id = format!("{:032x}", 0xdef0_0000 + i);
        let t = 30 + (i * 37) % 670;
        let last = 2 + (i * 13) % (t - 1);
        let first = cutoff - Days::new(t);

        let mut offsets = vec![0, last];
        if i % 40 == 0 {
            offsets.insert(1, 1);
        }
        for offset in offsets {
            let day = first + Days::new(offset);
            let timestamp = format!("{} 14:05:00", day.format("%Y-%m-%d"));
            orders.push(Order::new(&unique_id, &timestamp, &[49.9]));
        }
    }

    orders
}
