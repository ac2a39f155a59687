//! Chart generation and rendering for the dashboard.
//!
//! Two ECharts visualizations are built from the snapshot:
//! - **Category chart**: a doughnut of expenses per category
//! - **Monthly chart**: grouped income and expense bars for the last six months
//!
//! Each chart is rendered as a container plus an inline script. The script
//! disposes the instance previously drawn on the same container before it
//! creates a new one.

use std::collections::HashMap;

use charming::{
    Chart,
    component::{Axis, Grid, Legend, Title},
    element::{
        AxisLabel, AxisPointer, AxisPointerType, AxisType, ItemStyle, JsFunction, Tooltip,
        Trigger,
    },
    series::{Pie, bar},
};
use maud::{Markup, PreEscaped, html};

use crate::{
    dashboard::aggregation::{CategoryTotal, MonthlyBucket},
    html::{EXPENSE_COLOUR, INCOME_COLOUR},
};

pub const CATEGORY_CHART_ID: &str = "category-chart";
pub const MONTHLY_CHART_ID: &str = "monthly-chart";

const CATEGORY_PALETTE: [&str; 5] = ["#0f78d1", "#d94848", "#1f9d63", "#f39c12", "#9b59b6"];

/// A dashboard chart with its HTML container ID and ECharts configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardChart {
    /// The HTML element ID to use for the chart (kebab-case)
    pub id: &'static str,
    /// The ECharts configuration as a JSON string
    pub options: String,
}

pub fn category_chart(dataset: &[CategoryTotal]) -> Chart {
    let data: Vec<(f64, &str)> = dataset
        .iter()
        .map(|total| (total.amount, total.category.as_str()))
        .collect();

    Chart::new()
        .title(Title::new().text("Uitgaven per categorie"))
        .color(CATEGORY_PALETTE.iter().map(|&colour| colour.into()).collect::<Vec<charming::element::Color>>())
        .tooltip(
            Tooltip::new()
                .trigger(Trigger::Item)
                .value_formatter(currency_formatter()),
        )
        .legend(Legend::new().bottom("0"))
        .series(
            Pie::new()
                .name("Uitgaven")
                .radius(vec!["40%", "70%"])
                .data(data),
        )
}

pub fn monthly_chart(dataset: &[MonthlyBucket]) -> Chart {
    let labels: Vec<String> = dataset.iter().map(|bucket| bucket.label.clone()).collect();
    let income: Vec<f64> = dataset.iter().map(|bucket| bucket.income).collect();
    let expense: Vec<f64> = dataset.iter().map(|bucket| bucket.expense).collect();

    Chart::new()
        .title(
            Title::new()
                .text("Maandoverzicht")
                .subtext("Laatste zes maanden"),
        )
        .tooltip(
            Tooltip::new()
                .trigger(Trigger::Axis)
                .value_formatter(currency_formatter())
                .axis_pointer(AxisPointer::new().type_(AxisPointerType::Shadow)),
        )
        .legend(Legend::new().top("1%"))
        .grid(
            Grid::new()
                .left("3%")
                .right("4%")
                .bottom("3%")
                .top(70)
                .contain_label(true),
        )
        .x_axis(Axis::new().type_(AxisType::Category).data(labels))
        .y_axis(
            Axis::new()
                .type_(AxisType::Value)
                .axis_label(AxisLabel::new().formatter(currency_formatter())),
        )
        .series(
            bar::Bar::new()
                .name("Inkomsten")
                .item_style(ItemStyle::new().color(INCOME_COLOUR))
                .data(income),
        )
        .series(
            bar::Bar::new()
                .name("Uitgaven")
                .item_style(ItemStyle::new().color(EXPENSE_COLOUR))
                .data(expense),
        )
}

#[inline]
fn currency_formatter() -> JsFunction {
    JsFunction::new_with_args(
        "number",
        "const currencyFormatter = new Intl.NumberFormat('nl-NL', {
              style: 'currency',
              currency: 'EUR'
            });
            return (number !== undefined) ? currencyFormatter.format(number) : \"-\";",
    )
}

/// The chart instances drawn for one session, keyed by container id.
///
/// Replacing a chart always disposes the instance drawn before it, so a
/// container never holds more than one live chart.
#[derive(Debug, Default)]
pub struct ChartRegistry {
    instances: HashMap<&'static str, ChartInstance>,
    disposed: u64,
}

/// One drawn chart.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartInstance {
    /// Counts how many times a chart was drawn on this container.
    pub generation: u64,
    pub chart: DashboardChart,
}

impl ChartRegistry {
    /// Dispose the instance on `chart.id`, if any, and register `chart` in
    /// its place.
    pub fn replace(&mut self, chart: DashboardChart) -> &ChartInstance {
        let id = chart.id;
        let generation = match self.instances.remove(id) {
            Some(previous) => {
                self.disposed += 1;
                previous.generation + 1
            }
            None => 1,
        };

        self.instances
            .entry(id)
            .or_insert(ChartInstance { generation, chart })
    }

    /// Dispose every instance.
    pub fn clear(&mut self) {
        self.disposed += self.instances.len() as u64;
        self.instances.clear();
    }

    pub fn get(&self, id: &str) -> Option<&ChartInstance> {
        self.instances.get(id)
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// How many instances were disposed over the life of the registry.
    pub fn disposed(&self) -> u64 {
        self.disposed
    }
}

/// Renders the chart containers together with the scripts that draw them.
pub fn charts_view(charts: &[&ChartInstance]) -> Markup {
    html!(
        section
            id="charts"
            class="w-full mx-auto mb-4"
        {
            div class="grid grid-cols-1 xl:grid-cols-2 gap-4"
            {
                @for instance in charts {
                    div
                        id=(instance.chart.id)
                        data-generation=(instance.generation)
                        class="min-h-[380px] rounded dark:bg-gray-100"
                    {}

                    script { (chart_script(&instance.chart)) }
                }
            }
        }
    )
}

fn chart_script(chart: &DashboardChart) -> PreEscaped<String> {
    PreEscaped(format!(
        r#"(function() {{
            const charts = window.kasboekCharts = window.kasboekCharts || {{}};
            const chartDom = document.getElementById("{id}");
            if (charts["{id}"]) {{
                charts["{id}"].dispose();
            }}
            const chart = echarts.init(chartDom);
            chart.setOption({options});
            charts["{id}"] = chart;
        }})();"#,
        id = chart.id,
        options = escape_script_text(&chart.options),
    ))
}

/// User text in the options ends up inside an inline script, where `</` or
/// `<!--` change how the HTML parser finds the end of the script. The options
/// only carry `<` inside JSON strings, where `\u003c` reads the same.
fn escape_script_text(text: &str) -> String {
    text.replace('<', "\\u003c")
}
