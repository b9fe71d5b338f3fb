//! Sales report export.
//!
//! The report is laid out as positioned text and table cells on A4 pages
//! (millimetres, origin top-left), then rendered to PDF.

use crate::errors::ReportError;
use crate::handlers::pdf::render_pdf;
use crate::models::all_models::{Order, Payment, SalesSummary};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use log::info;
use std::fs;
use std::path::{Path, PathBuf};

pub const PAGE_WIDTH: f32 = 210.0;
pub const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 20.0;
const ROW_HEIGHT: f32 = 8.0;
/// Payment headings start a fresh page when the cursor is already this low.
const PAYMENTS_PAGE_BREAK_Y: f32 = 250.0;
const RECENT_ORDERS: usize = 10;
const RECENT_PAYMENTS: usize = 5;

pub const REPORT_TITLE: &str = "MealTimes - Sales Report";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

pub const BRAND_RED: Rgb = Rgb(230, 57, 70);
pub const BLACK: Rgb = Rgb(0, 0, 0);
pub const WHITE: Rgb = Rgb(255, 255, 255);
pub const GREY: Rgb = Rgb(128, 128, 128);

#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Text {
        x: f32,
        y: f32,
        size: f32,
        color: Rgb,
        text: String,
    },
    Cell {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        fill: Option<Rgb>,
        color: Rgb,
        text: String,
    },
}

impl Element {
    pub fn text(&self) -> &str {
        match self {
            Element::Text { text, .. } | Element::Cell { text, .. } => text,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportPage {
    pub elements: Vec<Element>,
}

impl ReportPage {
    pub fn contains_text(&self, needle: &str) -> bool {
        self.elements.iter().any(|e| e.text() == needle)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportLayout {
    pub pages: Vec<ReportPage>,
}

struct LayoutWriter {
    pages: Vec<ReportPage>,
}

impl LayoutWriter {
    fn new() -> Self {
        LayoutWriter {
            pages: vec![ReportPage::default()],
        }
    }

    fn add_page(&mut self) {
        self.pages.push(ReportPage::default());
    }

    fn push(&mut self, element: Element) {
        if let Some(page) = self.pages.last_mut() {
            page.elements.push(element);
        }
    }

    fn text(&mut self, x: f32, y: f32, size: f32, color: Rgb, text: impl Into<String>) {
        self.push(Element::Text {
            x,
            y,
            size,
            color,
            text: text.into(),
        });
    }

    fn row(&mut self, y: f32, cells: &[String], header: bool) {
        let width = (PAGE_WIDTH - 2.0 * MARGIN) / cells.len().max(1) as f32;
        for (i, cell) in cells.iter().enumerate() {
            self.push(Element::Cell {
                x: MARGIN + i as f32 * width,
                y,
                width,
                height: ROW_HEIGHT,
                fill: header.then_some(BRAND_RED),
                color: if header { WHITE } else { BLACK },
                text: cell.clone(),
            });
        }
    }

    /// Where a payment heading goes: `y`, or the top of a new page when `y`
    /// is past the break line.
    fn heading_position(&mut self, y: f32) -> f32 {
        if y > PAYMENTS_PAGE_BREAK_Y {
            self.add_page();
            MARGIN
        } else {
            y
        }
    }

    /// Grid table with a brand-red header repeated on every page it spans.
    /// Returns the y just below the last row.
    fn table(&mut self, start_y: f32, head: &[&str], body: &[Vec<String>]) -> f32 {
        let head: Vec<String> = head.iter().map(|h| h.to_string()).collect();
        let limit = PAGE_HEIGHT - MARGIN;
        let mut y = start_y;

        if y + 2.0 * ROW_HEIGHT > limit {
            self.add_page();
            y = MARGIN;
        }
        self.row(y, &head, true);
        y += ROW_HEIGHT;

        for row in body {
            if y + ROW_HEIGHT > limit {
                self.add_page();
                y = MARGIN;
                self.row(y, &head, true);
                y += ROW_HEIGHT;
            }
            self.row(y, row, false);
            y += ROW_HEIGHT;
        }
        y
    }

    fn finish(mut self, generated_at: NaiveDateTime) -> ReportLayout {
        let count = self.pages.len();
        let stamp = generated_at.format("%-m/%-d/%Y, %-I:%M:%S %p");
        for (index, page) in self.pages.iter_mut().enumerate() {
            page.elements.push(Element::Text {
                x: MARGIN,
                y: PAGE_HEIGHT - 10.0,
                size: 10.0,
                color: GREY,
                text: format!(
                    "Page {} of {} | MealTimes Sales Report | Generated {}",
                    index + 1,
                    count,
                    stamp
                ),
            });
        }
        ReportLayout { pages: self.pages }
    }
}

/// Lays out the sales report. `orders` and `payments` are expected newest
/// first; only the most recent ones are listed.
pub fn build_sales_report(
    summary: &SalesSummary,
    orders: &[Order],
    payments: &[Payment],
    generated_at: NaiveDateTime,
) -> ReportLayout {
    let mut doc = LayoutWriter::new();

    // Header
    doc.text(MARGIN, 20.0, 20.0, BRAND_RED, REPORT_TITLE);
    doc.text(
        MARGIN,
        30.0,
        12.0,
        BLACK,
        format!("Generated on: {}", short_date(generated_at)),
    );

    // Summary
    doc.text(MARGIN, 50.0, 16.0, BLACK, "Summary");
    let summary_rows = vec![
        pair("Total Orders", summary.total_orders.to_string()),
        pair("Total Revenue", money(summary.total_revenue)),
        pair("Orders This Month", summary.orders_this_month.to_string()),
        pair("Orders This Week", summary.orders_this_week.to_string()),
        pair("Monthly Revenue", money(summary.revenue_this_month)),
        pair("Weekly Revenue", money(summary.revenue_this_week)),
        pair(
            "Average Order Value",
            format!("${:.2}", summary.average_order_value),
        ),
    ];
    let mut y = doc.table(60.0, &["Metric", "Value"], &summary_rows);

    // Top performing days
    y += 20.0;
    doc.text(MARGIN, y, 16.0, BLACK, "Top Performing Days");
    let top_days: Vec<Vec<String>> = summary
        .top_days
        .iter()
        .enumerate()
        .map(|(i, day)| {
            vec![
                format!("#{}", i + 1),
                day.date.clone(),
                day.count.to_string(),
                money(day.revenue),
            ]
        })
        .collect();
    y = doc.table(y + 10.0, &["Rank", "Date", "Orders", "Revenue"], &top_days);

    // Recent orders
    y += 20.0;
    doc.text(MARGIN, y, 16.0, BLACK, "Recent Orders");
    let recent_orders: Vec<Vec<String>> = orders
        .iter()
        .take(RECENT_ORDERS)
        .map(|order| {
            vec![
                format!("#{}", order.order_id),
                format!("Employee #{}", order.employee_id),
                short_date(order.order_date),
                order.delivery_status.clone(),
                format!("${}", order.total()),
            ]
        })
        .collect();
    y = doc.table(
        y + 10.0,
        &["Order ID", "Employee", "Date", "Status", "Total"],
        &recent_orders,
    );

    // Payments
    if !payments.is_empty() {
        y = doc.heading_position(y + 20.0);
        doc.text(MARGIN, y, 16.0, BLACK, "Payment Summary");
        let total: f64 = payments.iter().map(|p| p.payment_amount).sum();
        let payment_rows = vec![
            pair("Total Payments", payments.len().to_string()),
            pair("Total Payment Amount", money(total)),
            pair(
                "Average Payment",
                format!("${:.2}", total / payments.len() as f64),
            ),
        ];
        y = doc.table(y + 10.0, &["Payment Metric", "Value"], &payment_rows);

        y = doc.heading_position(y + 20.0);
        doc.text(MARGIN, y, 14.0, BLACK, "Recent Payments");
        let recent_payments: Vec<Vec<String>> = payments
            .iter()
            .take(RECENT_PAYMENTS)
            .map(|payment| {
                vec![
                    payment.company_name.clone(),
                    short_date(payment.payment_date),
                    money(payment.payment_amount),
                    payment.payment_method.clone(),
                    payment.plan_name.clone().unwrap_or_else(|| "N/A".to_string()),
                ]
            })
            .collect();
        doc.table(
            y + 10.0,
            &["Company", "Date", "Amount", "Method", "Plan"],
            &recent_payments,
        );
    }

    doc.finish(generated_at)
}

/// `sales-report-YYYY-MM-DD.pdf`, dated in UTC.
pub fn report_file_name<Tz: TimeZone>(generated_at: &DateTime<Tz>) -> String {
    format!(
        "sales-report-{}.pdf",
        generated_at.with_timezone(&Utc).format("%Y-%m-%d")
    )
}

/// Lays out, renders and writes the report into `out_dir`, returning the
/// written path. Page text shows `generated_at` in its own time zone.
pub fn export_sales_report<Tz: TimeZone>(
    summary: &SalesSummary,
    orders: &[Order],
    payments: &[Payment],
    generated_at: &DateTime<Tz>,
    out_dir: &Path,
) -> Result<PathBuf, ReportError> {
    let layout = build_sales_report(summary, orders, payments, generated_at.naive_local());
    let bytes = render_pdf(&layout, REPORT_TITLE)?;

    fs::create_dir_all(out_dir)?;
    let path = out_dir.join(report_file_name(generated_at));
    fs::write(&path, bytes)?;

    info!(
        "Wrote sales report ({} pages) to {}",
        layout.pages.len(),
        path.display()
    );
    Ok(path)
}

fn pair(label: &str, value: String) -> Vec<String> {
    vec![label.to_string(), value]
}

fn short_date(at: NaiveDateTime) -> String {
    at.format("%-m/%-d/%Y").to_string()
}

fn money(amount: f64) -> String {
    format!("${}", group_thousands(amount))
}

/// en-US grouping with at most three fraction digits: `1234.5` is `1,234.5`.
fn group_thousands(value: f64) -> String {
    let rounded = (value * 1000.0).round() / 1000.0;
    let fixed = format!("{:.3}", rounded.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));
    let frac_part = frac_part.trim_end_matches('0');

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, digit) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if rounded < 0.0 { "-" } else { "" };
    if frac_part.is_empty() {
        format!("{sign}{grouped}")
    } else {
        format!("{sign}{grouped}.{frac_part}")
    }
}
