//! Per-customer frequency / recency / T summaries using Polars

use chrono::{Datelike, NaiveDate};
use polars::prelude::*;

use crate::data::Transaction;
use crate::error::{ChurnError, ChurnResult};

/// Sufficient statistics of one customer's purchase history, in days
#[derive(Debug, Clone, PartialEq)]
pub struct CustomerSummary {
    pub customer_unique_id: String,
    /// Repeat purchase days (the first purchase day is not counted)
    pub frequency: u32,
    /// Days between the first and the last purchase day
    pub recency: f64,
    /// Days between the first purchase day and the observation cutoff
    pub t: f64,
    /// Mean spend per repeat purchase day, 0 without repeats
    pub monetary_value: f64,
}

/// Summaries for every customer seen before the cutoff
#[derive(Debug, Clone, PartialEq)]
pub struct Summaries {
    /// Observation cutoff used, `None` when there was nothing to summarise
    pub cutoff: Option<NaiveDate>,
    pub customers: Vec<CustomerSummary>,
}

/// Collapse transactions into one summary per customer
///
/// When `cutoff` is `None` the latest purchase date in `transactions` is used.
/// Transactions after the cutoff are ignored. Output is ordered by
/// `customer_unique_id`.
pub fn summarize(transactions: &[Transaction], cutoff: Option<NaiveDate>) -> ChurnResult<Summaries> {
    let cutoff = match cutoff.or_else(|| transactions.iter().map(|t| t.purchase_date).max()) {
        Some(date) => date,
        None => {
            return Ok(Summaries {
                cutoff: None,
                customers: Vec::new(),
            })
        }
    };

    let cutoff_day = day_number(cutoff);
    let per_customer = aggregate_days(transactions, cutoff_day)
        .map_err(|e| ChurnError::data_unavailable("customer summaries", e))?;
    let customers = frame_to_summaries(&per_customer, cutoff_day)
        .map_err(|e| ChurnError::data_unavailable("customer summaries", e))?;

    Ok(Summaries {
        cutoff: Some(cutoff),
        customers,
    })
}

fn day_number(date: NaiveDate) -> i64 {
    i64::from(date.num_days_from_ce())
}

/// Daily totals per customer, then first day, last day, distinct days and
/// the spend on every day after the first
fn aggregate_days(transactions: &[Transaction], cutoff_day: i64) -> PolarsResult<DataFrame> {
    let ids: Vec<&str> = transactions
        .iter()
        .map(|t| t.customer_unique_id.as_str())
        .collect();
    let days: Vec<i64> = transactions.iter().map(|t| day_number(t.purchase_date)).collect();
    let prices: Vec<f64> = transactions.iter().map(|t| t.price).collect();

    let df = df!(
        "customer_unique_id" => ids,
        "day" => days,
        "price" => prices
    )?;

    df.lazy()
        .filter(col("day").lt_eq(lit(cutoff_day)))
        // Same-day purchases count once, with their prices summed
        .group_by([col("customer_unique_id"), col("day")])
        .agg([col("price").sum().alias("day_total")])
        .with_column(
            col("day")
                .min()
                .over([col("customer_unique_id")])
                .alias("first_day"),
        )
        .group_by([col("customer_unique_id")])
        .agg([
            col("first_day").first(),
            col("day").max().alias("last_day"),
            col("day").count().alias("days"),
            col("day_total")
                .filter(col("day").gt(col("first_day")))
                .sum()
                .alias("repeat_total"),
        ])
        .sort(["customer_unique_id"], SortMultipleOptions::default())
        .collect()
}

fn frame_to_summaries(df: &DataFrame, cutoff_day: i64) -> PolarsResult<Vec<CustomerSummary>> {
    let ids = df.column("customer_unique_id")?.str()?;
    let first_days = df.column("first_day")?.i64()?;
    let last_days = df.column("last_day")?.i64()?;
    let day_counts = df.column("days")?.cast(&DataType::Int64)?;
    let day_counts = day_counts.i64()?;
    let repeat_totals = df.column("repeat_total")?.f64()?;

    let summaries = ids
        .into_no_null_iter()
        .zip(first_days.into_no_null_iter())
        .zip(last_days.into_no_null_iter())
        .zip(day_counts.into_no_null_iter())
        .zip(repeat_totals.into_no_null_iter())
        .map(|((((id, first), last), days), repeat_total)| {
            let frequency = (days - 1).max(0) as u32;
            let monetary_value = if frequency > 0 {
                repeat_total / f64::from(frequency)
            } else {
                0.0
            };

            CustomerSummary {
                customer_unique_id: id.to_string(),
                frequency,
                recency: (last - first) as f64,
                t: (cutoff_day - first) as f64,
                monetary_value,
            }
        })
        .collect();

    Ok(summaries)
}

/// Customers with at least one repeat purchase, the only ones the model can score
pub fn repeat_customers(customers: &[CustomerSummary]) -> Vec<CustomerSummary> {
    customers
        .iter()
        .filter(|c| c.frequency > 0)
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn txn(id: &str, purchase_date: NaiveDate, price: f64) -> Transaction {
        Transaction {
            customer_unique_id: id.to_string(),
            purchase_date,
            price,
        }
    }

    #[test]
    fn test_two_purchases_scenario() {
        let transactions = vec![
            txn("A", date(2021, 1, 1), 10.0),
            txn("A", date(2021, 3, 1), 30.0),
        ];
        let summaries = summarize(&transactions, Some(date(2021, 6, 1))).unwrap();

        assert_eq!(summaries.customers.len(), 1);
        let a = &summaries.customers[0];
        assert_eq!(a.frequency, 1);
        assert_eq!(a.recency, 59.0);
        assert_eq!(a.t, 151.0);
        assert_eq!(a.monetary_value, 30.0);
    }

    #[test]
    fn test_same_day_purchases_collapse() {
        let transactions = vec![
            txn("A", date(2021, 1, 1), 10.0),
            txn("A", date(2021, 1, 1), 5.0),
            txn("A", date(2021, 1, 10), 4.0),
            txn("A", date(2021, 1, 10), 6.0),
            txn("A", date(2021, 1, 20), 20.0),
        ];
        let summaries = summarize(&transactions, None).unwrap();
        let a = &summaries.customers[0];

        assert_eq!(summaries.cutoff, Some(date(2021, 1, 20)));
        assert_eq!(a.frequency, 2);
        assert_eq!(a.recency, 19.0);
        assert_eq!(a.t, 19.0);
        assert_eq!(a.monetary_value, 15.0);
    }

    #[test]
    fn test_single_purchase_has_zero_frequency() {
        let transactions = vec![
            txn("A", date(2021, 1, 1), 10.0),
            txn("B", date(2021, 1, 5), 10.0),
            txn("B", date(2021, 2, 5), 10.0),
        ];
        let summaries = summarize(&transactions, None).unwrap();

        let a = &summaries.customers[0];
        assert_eq!(a.customer_unique_id, "A");
        assert_eq!(a.frequency, 0);
        assert_eq!(a.recency, 0.0);
        assert_eq!(a.monetary_value, 0.0);

        let repeat = repeat_customers(&summaries.customers);
        assert_eq!(repeat.len(), 1);
        assert_eq!(repeat[0].customer_unique_id, "B");
    }

    #[test]
    fn test_purchases_after_cutoff_are_ignored() {
        let transactions = vec![
            txn("A", date(2021, 1, 1), 10.0),
            txn("A", date(2021, 8, 1), 10.0),
            txn("B", date(2021, 9, 1), 10.0),
        ];
        let summaries = summarize(&transactions, Some(date(2021, 6, 1))).unwrap();

        assert_eq!(summaries.customers.len(), 1);
        assert_eq!(summaries.customers[0].frequency, 0);
        assert_eq!(summaries.customers[0].t, 151.0);
    }

    #[test]
    fn test_recency_never_exceeds_t() {
        let ids = ["A", "B", "C", "D"];
        let transactions: Vec<Transaction> = (0..40u32)
            .map(|i| {
                let day = date(2020, 1, 1) + chrono::Days::new(u64::from((i * 37) % 300));
                txn(ids[(i % 4) as usize], day, f64::from(i))
            })
            .collect();

        for cutoff in [None, Some(date(2020, 6, 1)), Some(date(2021, 1, 1))] {
            let summaries = summarize(&transactions, cutoff).unwrap();
            for c in &summaries.customers {
                assert!(c.recency <= c.t, "{} has recency {} > T {}", c.customer_unique_id, c.recency, c.t);
            }
        }
    }

    #[test]
    fn test_output_sorted_by_customer() {
        let transactions = vec![
            txn("zeta", date(2021, 1, 1), 1.0),
            txn("alpha", date(2021, 1, 2), 1.0),
            txn("mid", date(2021, 1, 3), 1.0),
        ];
        let ids: Vec<String> = summarize(&transactions, None)
            .unwrap()
            .customers
            .into_iter()
            .map(|c| c.customer_unique_id)
            .collect();
        assert_eq!(ids, vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn test_cutoff_before_every_purchase() {
        let transactions = vec![
            txn("A", date(2021, 1, 1), 10.0),
            txn("A", date(2021, 2, 1), 10.0),
        ];
        let summaries = summarize(&transactions, Some(date(2020, 12, 31))).unwrap();

        assert_eq!(summaries.cutoff, Some(date(2020, 12, 31)));
        assert!(summaries.customers.is_empty());
    }

    #[test]
    fn test_empty_input() {
        let summaries = summarize(&[], None).unwrap();
        assert_eq!(summaries.cutoff, None);
        assert!(summaries.customers.is_empty());
    }
}
