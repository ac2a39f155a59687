//! Dashboard module
//!
//! Turns the transaction snapshot into the data region of the page: totals,
//! the category and monthly charts, and the filtered transactions table.

mod aggregation;
mod cards;
mod charts;
mod handlers;

use maud::{Markup, html};
use time::Date;

use crate::transaction::{Transaction, TypeFilter, transactions_table_view};

pub use aggregation::{
    CategoryTotal, MONTH_WINDOW, MonthlyBucket, NO_EXPENSES_LABEL, Totals, category_dataset,
    filter_transactions, monthly_dataset,
};
pub use charts::{
    CATEGORY_CHART_ID, ChartInstance, ChartRegistry, DashboardChart, MONTHLY_CHART_ID,
};
pub use handlers::{get_events, post_filter, post_refresh};

use cards::totals_view;
use charts::{category_chart, charts_view, monthly_chart};

pub const DATA_REGION_ID: &str = "data";

/// Aggregate `transactions` and render the data region.
///
/// Totals and charts cover the whole snapshot; only the table applies
/// `filter`. Both charts are replaced in `charts`, disposing the previous
/// instances.
pub fn render_dashboard(
    transactions: &[Transaction],
    filter: TypeFilter,
    signed_in: bool,
    charts: &mut ChartRegistry,
    today: Date,
) -> Markup {
    let totals = Totals::from_transactions(transactions);

    charts.replace(DashboardChart {
        id: CATEGORY_CHART_ID,
        options: category_chart(&category_dataset(transactions)).to_string(),
    });
    charts.replace(DashboardChart {
        id: MONTHLY_CHART_ID,
        options: monthly_chart(&monthly_dataset(transactions, today)).to_string(),
    });

    let instances: Vec<&ChartInstance> = [CATEGORY_CHART_ID, MONTHLY_CHART_ID]
        .iter()
        .filter_map(|id| charts.get(id))
        .collect();

    html! {
        (totals_view(&totals))
        (charts_view(&instances))
        (transactions_table_view(transactions, filter, signed_in))
    }
}
