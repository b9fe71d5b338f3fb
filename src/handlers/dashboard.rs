use crate::models::all_models::{Order, SalesSummary, TopDay};
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use std::collections::BTreeMap;

const TOP_DAYS: usize = 5;
const RECENT_ORDERS: usize = 5;

/// Employee dashboard figures for the signed-in employee's orders.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderOverview {
    pub total_orders: usize,
    pub pending_orders: usize,
    pub todays_orders: Vec<Order>,
    pub recent_orders: Vec<Order>,
}

impl OrderOverview {
    /// `orders` are expected newest first, as the API returns them.
    pub fn from_orders(orders: &[Order], today: NaiveDate) -> Self {
        OrderOverview {
            total_orders: orders.len(),
            pending_orders: orders
                .iter()
                .filter(|o| o.delivery_status.eq_ignore_ascii_case("pending"))
                .count(),
            todays_orders: orders
                .iter()
                .filter(|o| o.order_date.date() == today)
                .cloned()
                .collect(),
            recent_orders: orders.iter().take(RECENT_ORDERS).cloned().collect(),
        }
    }
}

/// Aggregates admin sales figures from the full order list.
///
/// "This month" is the calendar month of `now`; "this week" is the seven days
/// up to `now`.
pub fn summarize_sales(orders: &[Order], now: NaiveDateTime) -> SalesSummary {
    let week_start = now - Duration::days(7);
    let mut summary = SalesSummary {
        total_orders: 0,
        total_revenue: 0.0,
        orders_this_month: 0,
        orders_this_week: 0,
        revenue_this_month: 0.0,
        revenue_this_week: 0.0,
        average_order_value: 0.0,
        top_days: Vec::new(),
    };
    let mut by_day: BTreeMap<NaiveDate, (u32, f64)> = BTreeMap::new();

    for order in orders {
        let total = order.total();
        summary.total_orders += 1;
        summary.total_revenue += total;

        let date = order.order_date;
        if date.year() == now.year() && date.month() == now.month() {
            summary.orders_this_month += 1;
            summary.revenue_this_month += total;
        }
        if date >= week_start && date <= now {
            summary.orders_this_week += 1;
            summary.revenue_this_week += total;
        }

        let day = by_day.entry(date.date()).or_insert((0, 0.0));
        day.0 += 1;
        day.1 += total;
    }

    if summary.total_orders > 0 {
        summary.average_order_value = summary.total_revenue / summary.total_orders as f64;
    }

    let mut days: Vec<_> = by_day.into_iter().collect();
    // highest revenue first; ties keep the earlier day first
    days.sort_by(|a, b| b.1 .1.total_cmp(&a.1 .1));
    summary.top_days = days
        .into_iter()
        .take(TOP_DAYS)
        .map(|(date, (count, revenue))| TopDay {
            date: date.format("%Y-%m-%d").to_string(),
            count,
            revenue,
        })
        .collect();

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::all_models::Meal;

    fn at(raw: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M").unwrap()
    }

    fn order(id: i64, date: &str, status: &str, prices: &[f64]) -> Order {
        Order {
            order_id: id,
            employee_id: 4,
            order_date: at(date),
            delivery_status: status.to_string(),
            payment_status: Some("Paid".into()),
            meals: prices
                .iter()
                .map(|&price| Meal {
                    meal_id: None,
                    meal_name: None,
                    price,
                })
                .collect(),
        }
    }

    #[test]
    fn overview_counts_pending_and_todays_orders() {
        let orders = vec![
            order(6, "2024-05-20 12:00", "Pending", &[10.0]),
            order(5, "2024-05-20 08:00", "PENDING", &[10.0]),
            order(4, "2024-05-19 12:00", "Delivered", &[10.0]),
            order(3, "2024-05-18 12:00", "Preparing", &[10.0]),
            order(2, "2024-05-17 12:00", "Delivered", &[10.0]),
            order(1, "2024-05-16 12:00", "Delivered", &[10.0]),
        ];
        let today = NaiveDate::from_ymd_opt(2024, 5, 20).unwrap();

        let overview = OrderOverview::from_orders(&orders, today);

        assert_eq!(overview.total_orders, 6);
        assert_eq!(overview.pending_orders, 2);
        assert_eq!(
            overview.todays_orders.iter().map(|o| o.order_id).collect::<Vec<_>>(),
            vec![6, 5]
        );
        assert_eq!(overview.recent_orders.len(), 5);
        assert_eq!(overview.recent_orders[0].order_id, 6);
    }

    #[test]
    fn sales_summary_splits_month_week_and_top_days() {
        let orders = vec![
            order(1, "2024-05-20 12:00", "Delivered", &[10.0, 5.0]),
            order(2, "2024-05-20 13:00", "Delivered", &[20.0]),
            order(3, "2024-05-02 09:00", "Delivered", &[40.0]),
            order(4, "2024-04-30 09:00", "Delivered", &[7.5]),
        ];

        let summary = summarize_sales(&orders, at("2024-05-21 10:00"));

        assert_eq!(summary.total_orders, 4);
        assert_eq!(summary.total_revenue, 82.5);
        assert_eq!(summary.orders_this_month, 3);
        assert_eq!(summary.revenue_this_month, 75.0);
        assert_eq!(summary.orders_this_week, 2);
        assert_eq!(summary.revenue_this_week, 35.0);
        assert_eq!(summary.average_order_value, 20.625);
        assert_eq!(summary.top_days[0].date, "2024-05-02");
        assert_eq!(summary.top_days[1].date, "2024-05-20");
        assert_eq!(summary.top_days[1].count, 2);
        assert_eq!(summary.top_days.len(), 3);
    }

    #[test]
    fn empty_order_list_has_zero_average() {
        let summary = summarize_sales(&[], at("2024-05-21 10:00"));
        assert_eq!(summary.total_orders, 0);
        assert_eq!(summary.average_order_value, 0.0);
        assert!(summary.top_days.is_empty());
    }
}
