//! Presentation of high-risk customers: HTML page and console table

use crate::churn::{ChurnLabel, ScoredCustomer};
use crate::pipeline::ChurnReport;

/// One row of the high-risk table
#[derive(Debug, Clone, PartialEq)]
pub struct HighRiskRow {
    pub customer_unique_id: String,
    pub frequency: u32,
    pub recency: f64,
    pub t: f64,
    pub prob_alive: f64,
    pub churn: ChurnLabel,
}

impl From<&ScoredCustomer> for HighRiskRow {
    fn from(scored: &ScoredCustomer) -> Self {
        Self {
            customer_unique_id: scored.summary.customer_unique_id.clone(),
            frequency: scored.summary.frequency,
            recency: scored.summary.recency,
            t: scored.summary.t,
            prob_alive: scored.prob_alive,
            churn: scored.churn,
        }
    }
}

const COLUMNS: [&str; 6] = [
    "customer_unique_id",
    "frequency",
    "recency",
    "T",
    "prob_alive",
    "churn",
];

/// Render the report as a self-contained HTML document
pub fn render_html(report: &ChurnReport) -> String {
    let rows = report.high_risk_rows();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Customer Churn Risk</title>
    <style>{css}</style>
</head>
<body>
    <h1>High-risk customers</h1>
    {summary}
    {table}
</body>
</html>"#,
        css = inline_css(),
        summary = render_summary(report, rows.len()),
        table = render_table(&rows),
    )
}

/// Render a failed page load
pub fn render_error_html(message: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <title>Customer Churn Risk - error</title>
    <style>{css}</style>
</head>
<body>
    <h1>Churn analysis failed</h1>
    <p class="error">{message}</p>
</body>
</html>"#,
        css = inline_css(),
        message = html_escape(message),
    )
}

fn render_summary(report: &ChurnReport, high_risk: usize) -> String {
    let cutoff = report
        .cutoff
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "n/a".to_string());

    format!(
        r#"<dl class="summary">
        <dt>Observation cutoff</dt><dd>{cutoff}</dd>
        <dt>Customers</dt><dd>{customers}</dd>
        <dt>Repeat customers scored</dt><dd>{cohort}</dd>
        <dt>High risk</dt><dd>{high_risk}</dd>
    </dl>"#,
        cutoff = cutoff,
        customers = report.customers,
        cohort = report.cohort_size(),
        high_risk = high_risk,
    )
}

fn render_table(rows: &[HighRiskRow]) -> String {
    let header: String = COLUMNS
        .iter()
        .map(|c| format!("<th>{}</th>", html_escape(c)))
        .collect();

    let body: String = if rows.is_empty() {
        format!(
            r#"<tr><td class="empty" colspan="{}">No high-risk customers</td></tr>"#,
            COLUMNS.len()
        )
    } else {
        rows.iter().map(render_row).collect::<Vec<_>>().join("\n")
    };

    format!(
        r#"<table class="customers">
        <thead><tr>{header}</tr></thead>
        <tbody>
{body}
        </tbody>
    </table>"#
    )
}

fn render_row(row: &HighRiskRow) -> String {
    format!(
        "<tr><td>{}</td><td>{}</td><td>{:.0}</td><td>{:.0}</td><td>{:.4}</td><td>{}</td></tr>",
        html_escape(&row.customer_unique_id),
        row.frequency,
        row.recency,
        row.t,
        row.prob_alive,
        row.churn,
    )
}

fn inline_css() -> &'static str {
    "body{font-family:sans-serif;margin:2rem;color:#222}\
     dl.summary{display:grid;grid-template-columns:max-content auto;gap:.25rem 1rem}\
     dt{font-weight:bold}\
     table.customers{border-collapse:collapse;margin-top:1rem}\
     th,td{border:1px solid #ccc;padding:.3rem .6rem;text-align:left}\
     th{background:#f4f4f4}\
     td.empty{color:#777;font-style:italic}\
     p.error{color:#a00}"
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Print the high-risk table to stdout
pub fn print_report(report: &ChurnReport) {
    let rows = report.high_risk_rows();

    println!("=== Churn Risk Report ===");
    match report.cutoff {
        Some(cutoff) => println!("Observation cutoff: {cutoff}"),
        None => println!("Observation cutoff: n/a"),
    }
    println!("Customers: {}", report.customers);
    println!("Repeat customers scored: {}", report.cohort_size());
    println!("Label policy: {:?}", report.label_policy);
    println!("High-risk customers: {}", rows.len());

    if rows.is_empty() {
        return;
    }

    println!();
    println!(
        "  {:<34} | {:>9} | {:>7} | {:>7} | {:>10} | churn",
        "customer_unique_id", "frequency", "recency", "T", "prob_alive"
    );
    println!("  {}", "-".repeat(90));
    for row in &rows {
        println!(
            "  {:<34} | {:>9} | {:>7.0} | {:>7.0} | {:>10.4} | {}",
            row.customer_unique_id, row.frequency, row.recency, row.t, row.prob_alive, row.churn
        );
    }
}
