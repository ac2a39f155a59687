//! Cards showing the income, expense and balance totals.

use maud::{Markup, html};

use crate::{
    dashboard::aggregation::Totals,
    html::{CARD_STYLE, EXPENSE_COLOUR, INCOME_COLOUR, format_currency},
};

/// Renders the three totals cards.
///
/// The balance is green when it is zero or more and red when it is negative.
pub fn totals_view(totals: &Totals) -> Markup {
    let balance_colour = if totals.is_negative() {
        EXPENSE_COLOUR
    } else {
        INCOME_COLOUR
    };
    let balance_state = if totals.is_negative() {
        "negative"
    } else {
        "positive"
    };

    html! {
        section id="totals" class="w-full grid grid-cols-1 sm:grid-cols-3 gap-4 mb-4"
        {
            (total_card("total-income", "Inkomsten", totals.income, INCOME_COLOUR, None))
            (total_card("total-expense", "Uitgaven", totals.expense, EXPENSE_COLOUR, None))
            (total_card("total-balance", "Saldo", totals.balance, balance_colour, Some(balance_state)))
        }
    }
}

fn total_card(
    id: &str,
    title: &str,
    amount: f64,
    colour: &str,
    state: Option<&str>,
) -> Markup {
    html! {
        div id=(id) class=(CARD_STYLE) data-state=[state]
        {
            h4 class="text-sm font-medium text-gray-600 dark:text-gray-400" { (title) }
            p class="text-2xl font-bold" style={ "color: " (colour) }
            {
                (format_currency(amount))
            }
        }
    }
}
