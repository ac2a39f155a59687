//! The transactions table.

use maud::{Markup, html};

use crate::{
    endpoints::{self, format_endpoint},
    html::{
        BUTTON_DELETE_STYLE, BUTTON_EDIT_STYLE, CHIP_STYLE, TABLE_CELL_STYLE, TABLE_HEADER_STYLE,
        TABLE_ROW_STYLE, format_currency, format_date,
    },
};

use super::{
    core::{Transaction, TransactionType, TypeFilter},
    form::FORM_CONTAINER_ID,
};

pub const SIGNED_OUT_PLACEHOLDER: &str = "Log in om je transacties te zien.";
pub const EMPTY_PLACEHOLDER: &str = "Nog geen transacties.";
pub const NO_MATCHES_PLACEHOLDER: &str = "Geen transacties voor dit filter.";

const COLUMN_COUNT: u8 = 6;

fn chip_style(type_: TransactionType) -> String {
    match type_ {
        TransactionType::Income => format!(
            "{CHIP_STYLE} text-green-800 bg-green-100 dark:bg-green-900 dark:text-green-300"
        ),
        TransactionType::Expense => {
            format!("{CHIP_STYLE} text-red-800 bg-red-100 dark:bg-red-900 dark:text-red-300")
        }
    }
}

/// Renders the transactions that pass `filter`, one row each.
///
/// `transactions` is the full snapshot; it is filtered here. When there is
/// nothing to show, a single placeholder row explains why.
pub fn transactions_table_view(
    transactions: &[Transaction],
    filter: TypeFilter,
    signed_in: bool,
) -> Markup {
    let visible: Vec<&Transaction> = transactions
        .iter()
        .filter(|transaction| filter.matches(transaction))
        .collect();

    let placeholder = if !signed_in {
        Some(SIGNED_OUT_PLACEHOLDER)
    } else if transactions.is_empty() {
        Some(EMPTY_PLACEHOLDER)
    } else if visible.is_empty() {
        Some(NO_MATCHES_PLACEHOLDER)
    } else {
        None
    };

    html! {
        div class="w-full overflow-x-auto rounded-lg shadow"
        {
            table class="w-full text-sm text-left rtl:text-right text-gray-500 dark:text-gray-400"
            {
                thead class=(TABLE_HEADER_STYLE)
                {
                    tr
                    {
                        th scope="col" class=(TABLE_CELL_STYLE) { "Datum" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Type" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Categorie" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Bedrag" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Notitie" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Acties" }
                    }
                }

                tbody id="transactions-body"
                {
                    @if let Some(placeholder) = placeholder {
                        tr class=(TABLE_ROW_STYLE) data-placeholder="true"
                        {
                            td colspan=(COLUMN_COUNT) class={ (TABLE_CELL_STYLE) " text-center" }
                            {
                                (placeholder)
                            }
                        }
                    } @else {
                        @for transaction in visible {
                            (transaction_row(transaction))
                        }
                    }
                }
            }
        }
    }
}

fn transaction_row(transaction: &Transaction) -> Markup {
    let id = transaction.id.as_str();
    let note = if transaction.note.is_empty() {
        "-"
    } else {
        transaction.note.as_str()
    };

    html! {
        tr class=(TABLE_ROW_STYLE) data-transaction-id=(id)
        {
            td class=(TABLE_CELL_STYLE) { (format_date(transaction.date)) }
            td class=(TABLE_CELL_STYLE)
            {
                span
                    class=(chip_style(transaction.type_))
                    data-type=(transaction.type_.as_str())
                {
                    (transaction.type_.label())
                }
            }
            td class=(TABLE_CELL_STYLE) { (transaction.category) }
            td class=(TABLE_CELL_STYLE) { (format_currency(transaction.amount)) }
            td class=(TABLE_CELL_STYLE) { (note) }
            td class={ (TABLE_CELL_STYLE) " flex gap-4" }
            {
                button
                    type="button"
                    hx-post=(format_endpoint(endpoints::EDIT_TRANSACTION, id))
                    hx-target={ "#" (FORM_CONTAINER_ID) }
                    class=(BUTTON_EDIT_STYLE)
                {
                    "Bewerk"
                }

                button
                    type="button"
                    hx-delete=(format_endpoint(endpoints::TRANSACTION, id))
                    hx-confirm="Weet je zeker dat je deze transactie wilt verwijderen?"
                    hx-vals=r#"{"confirmed": "true"}"#
                    hx-target={ "#" (FORM_CONTAINER_ID) }
                    class=(BUTTON_DELETE_STYLE)
                {
                    "Wis"
                }
            }
        }
    }
}

#[cfg(test)]
mod transactions_table_view_tests {
    use scraper::{ElementRef, Html, Selector};
    use time::macros::date;

    use crate::{
        test_utils::{assert_valid_html, create_test_transaction},
        transaction::core::{Transaction, TransactionType, TypeFilter},
    };

    use super::{
        EMPTY_PLACEHOLDER, NO_MATCHES_PLACEHOLDER, SIGNED_OUT_PLACEHOLDER,
        transactions_table_view,
    };

    fn render(transactions: &[Transaction], filter: TypeFilter, signed_in: bool) -> Html {
        let markup = transactions_table_view(transactions, filter, signed_in);
        let html = Html::parse_fragment(&markup.into_string());
        assert_valid_html(&html);
        html
    }

    fn data_rows(html: &Html) -> Vec<ElementRef<'_>> {
        html.select(&Selector::parse("tbody tr[data-transaction-id]").unwrap())
            .collect()
    }

    fn placeholder_text(html: &Html) -> Option<String> {
        html.select(&Selector::parse("tbody tr[data-placeholder]").unwrap())
            .next()
            .map(|row| row.text().collect::<String>().trim().to_owned())
    }

    fn mixed_snapshot() -> Vec<Transaction> {
        vec![
            create_test_transaction("a", TransactionType::Income, 1500.0, "Salaris", date!(2024 - 03 - 25)),
            create_test_transaction("b", TransactionType::Expense, 42.5, "Boodschappen", date!(2024 - 03 - 15)),
            create_test_transaction("c", TransactionType::Expense, 800.0, "Huur", date!(2024 - 03 - 01)),
        ]
    }

    #[test]
    fn row_count_matches_filter() {
        let snapshot = mixed_snapshot();
        let cases = [
            (TypeFilter::All, 3),
            (TypeFilter::Only(TransactionType::Income), 1),
            (TypeFilter::Only(TransactionType::Expense), 2),
        ];

        for (filter, want_rows) in cases {
            let html = render(&snapshot, filter, true);

            assert_eq!(
                data_rows(&html).len(),
                want_rows,
                "wrong row count for filter {filter:?}"
            );
        }
    }

    #[test]
    fn rows_keep_snapshot_order() {
        let html = render(&mixed_snapshot(), TypeFilter::All, true);

        let ids: Vec<_> = data_rows(&html)
            .iter()
            .map(|row| row.value().attr("data-transaction-id").unwrap().to_owned())
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn renders_row_fields_in_dutch_format() {
        let snapshot = vec![create_test_transaction(
            "b",
            TransactionType::Expense,
            42.5,
            "Boodschappen",
            date!(2024 - 03 - 15),
        )];

        let html = render(&snapshot, TypeFilter::All, true);

        let cells: Vec<String> = html
            .select(&Selector::parse("tbody td").unwrap())
            .map(|cell| cell.text().collect::<String>().trim().to_owned())
            .collect();
        assert_eq!(cells[0], "15-03-2024");
        assert_eq!(cells[1], "Uitgave");
        assert_eq!(cells[2], "Boodschappen");
        assert_eq!(cells[3], "€ 42,50");
        assert_eq!(cells[4], "-");
        assert!(cells[5].contains("Bewerk"));
        assert!(cells[5].contains("Wis"));
    }

    #[test]
    fn delete_button_asks_for_confirmation() {
        let html = render(&mixed_snapshot(), TypeFilter::All, true);

        let delete_button = html
            .select(&Selector::parse("button[hx-delete]").unwrap())
            .next()
            .unwrap();
        assert_eq!(
            delete_button.value().attr("hx-delete"),
            Some("/api/transactions/a")
        );
        assert!(delete_button.value().attr("hx-confirm").is_some());
        assert_eq!(
            delete_button.value().attr("hx-vals"),
            Some(r#"{"confirmed": "true"}"#)
        );
    }

    #[test]
    fn escapes_user_text() {
        let snapshot = vec![Transaction {
            note: "<img src=x onerror=alert(1)>".to_owned(),
            ..create_test_transaction(
                "x",
                TransactionType::Expense,
                1.0,
                "<script>alert('xss')</script>",
                date!(2024 - 03 - 15),
            )
        }];

        let markup = transactions_table_view(&snapshot, TypeFilter::All, true).into_string();
        let html = Html::parse_fragment(&markup);

        assert!(markup.contains("&lt;script&gt;alert('xss')&lt;/script&gt;"));
        assert!(html.select(&Selector::parse("script").unwrap()).next().is_none());
        assert!(html.select(&Selector::parse("img").unwrap()).next().is_none());
        let category_cell = html
            .select(&Selector::parse("tbody td").unwrap())
            .nth(2)
            .unwrap();
        assert_eq!(
            category_cell.text().collect::<String>(),
            "<script>alert('xss')</script>"
        );
    }

    #[test]
    fn signed_out_shows_placeholder() {
        let html = render(&[], TypeFilter::All, false);

        assert!(data_rows(&html).is_empty());
        assert_eq!(placeholder_text(&html).as_deref(), Some(SIGNED_OUT_PLACEHOLDER));
    }

    #[test]
    fn empty_snapshot_shows_placeholder() {
        let html = render(&[], TypeFilter::All, true);

        assert_eq!(placeholder_text(&html).as_deref(), Some(EMPTY_PLACEHOLDER));
    }

    #[test]
    fn filter_without_matches_shows_placeholder() {
        let snapshot = vec![create_test_transaction(
            "b",
            TransactionType::Expense,
            42.5,
            "Boodschappen",
            date!(2024 - 03 - 15),
        )];

        let html = render(&snapshot, TypeFilter::Only(TransactionType::Income), true);

        assert_eq!(placeholder_text(&html).as_deref(), Some(NO_MATCHES_PLACEHOLDER));
    }
}
