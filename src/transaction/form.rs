//! The transaction form: its raw values, their validation and the view.

use maud::{Markup, html};
use serde::Deserialize;
use time::{Date, format_description::BorrowedFormatItem, macros::format_description};

use crate::{
    endpoints,
    html::{
        BUTTON_PRIMARY_STYLE, BUTTON_SECONDARY_STYLE, FORM_ERROR_STYLE, FORM_LABEL_STYLE,
        FORM_TEXT_INPUT_STYLE, loading_spinner,
    },
    session::Workspace,
    status::status_view,
};

use super::core::{Transaction, TransactionDraft, TransactionType};

pub const FORM_CONTAINER_ID: &str = "transaction-form-container";

const ISO_DATE_FORMAT: &[BorrowedFormatItem<'_>] = format_description!("[year]-[month]-[day]");

/// The values of the transaction form exactly as the browser sent them.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TransactionForm {
    #[serde(rename = "type", default)]
    pub type_: String,
    #[serde(default)]
    pub amount: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub note: String,
}

impl TransactionForm {
    /// An empty expense dated `today`.
    pub fn new_with_defaults(today: Date) -> Self {
        Self {
            type_: TransactionType::Expense.as_str().to_owned(),
            amount: String::new(),
            category: String::new(),
            date: format_iso_date(today),
            note: String::new(),
        }
    }

    /// The form filled in with the fields of `transaction`.
    pub fn from_transaction(transaction: &Transaction) -> Self {
        Self {
            type_: transaction.type_.as_str().to_owned(),
            amount: format!("{:.2}", transaction.amount),
            category: transaction.category.clone(),
            date: format_iso_date(transaction.date),
            note: transaction.note.clone(),
        }
    }

    /// Check every field and build the draft to store.
    ///
    /// # Errors
    /// Returns one message per failing field, in form order.
    pub fn validate(&self) -> Result<TransactionDraft, ValidationErrors> {
        let mut errors = Vec::new();

        let type_ = self.type_.trim().parse::<TransactionType>().ok();
        if type_.is_none() {
            errors.push(FieldError {
                field: FormField::Type,
                message: "Kies inkomst of uitgave.",
            });
        }

        let amount = self
            .amount
            .trim()
            .replace(',', ".")
            .parse::<f64>()
            .ok()
            .filter(|amount| amount.is_finite() && *amount > 0.0);
        if amount.is_none() {
            errors.push(FieldError {
                field: FormField::Amount,
                message: "Vul een bedrag groter dan 0 in.",
            });
        }

        let category = self.category.trim();
        if category.is_empty() {
            errors.push(FieldError {
                field: FormField::Category,
                message: "Vul een categorie in.",
            });
        }

        let date = self.date.trim();
        let parsed_date = Date::parse(date, ISO_DATE_FORMAT).ok();
        if date.is_empty() {
            errors.push(FieldError {
                field: FormField::Date,
                message: "Kies een datum.",
            });
        } else if parsed_date.is_none() {
            errors.push(FieldError {
                field: FormField::Date,
                message: "Vul een geldige datum in.",
            });
        }

        match (type_, amount, parsed_date) {
            (Some(type_), Some(amount), Some(date)) if errors.is_empty() => Ok(TransactionDraft {
                type_,
                amount,
                category: category.to_owned(),
                date,
                note: self.note.trim().to_owned(),
            }),
            _ => Err(ValidationErrors(errors)),
        }
    }
}

fn format_iso_date(date: Date) -> String {
    date.format(ISO_DATE_FORMAT)
        .unwrap_or_else(|_| date.to_string())
}

/// The form fields that are validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Type,
    Amount,
    Category,
    Date,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: FormField,
    pub message: &'static str,
}

/// Everything wrong with a submitted form.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{}", join_messages(.0))]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    pub fn errors(&self) -> &[FieldError] {
        &self.0
    }

    pub fn message_for(&self, field: FormField) -> Option<&'static str> {
        self.0
            .iter()
            .find(|error| error.field == field)
            .map(|error| error.message)
    }
}

fn join_messages(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|error| error.message)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Renders the transaction form.
///
/// The submit button reads "Update" while a transaction is being edited and
/// "Opslaan" otherwise.
pub fn transaction_form_view(
    form: &TransactionForm,
    editing: bool,
    errors: Option<&ValidationErrors>,
) -> Markup {
    let error_for = |field| errors.and_then(|errors| errors.message_for(field));
    let is_income = form.type_ == TransactionType::Income.as_str();

    html! {
        form
            id="transaction-form"
            hx-post=(endpoints::TRANSACTIONS_API)
            hx-target={ "#" (FORM_CONTAINER_ID) }
            class="w-full space-y-4"
        {
            div
            {
                label for="type" class=(FORM_LABEL_STYLE) { "Type" }

                select
                    name="type"
                    id="type"
                    required
                    class=(FORM_TEXT_INPUT_STYLE)
                {
                    option value="expense" selected[!is_income] { (TransactionType::Expense.label()) }
                    option value="income" selected[is_income] { (TransactionType::Income.label()) }
                }

                @if let Some(message) = error_for(FormField::Type) {
                    p class=(FORM_ERROR_STYLE) { (message) }
                }
            }

            div
            {
                label for="amount" class=(FORM_LABEL_STYLE) { "Bedrag" }

                input
                    name="amount"
                    id="amount"
                    type="number"
                    step="0.01"
                    min="0.01"
                    placeholder="0,00"
                    required
                    value=(form.amount)
                    class=(FORM_TEXT_INPUT_STYLE);

                @if let Some(message) = error_for(FormField::Amount) {
                    p class=(FORM_ERROR_STYLE) { (message) }
                }
            }

            div
            {
                label for="category" class=(FORM_LABEL_STYLE) { "Categorie" }

                input
                    name="category"
                    id="category"
                    type="text"
                    placeholder="Boodschappen"
                    required
                    value=(form.category)
                    class=(FORM_TEXT_INPUT_STYLE);

                @if let Some(message) = error_for(FormField::Category) {
                    p class=(FORM_ERROR_STYLE) { (message) }
                }
            }

            div
            {
                label for="date" class=(FORM_LABEL_STYLE) { "Datum" }

                input
                    name="date"
                    id="date"
                    type="date"
                    required
                    value=(form.date)
                    class=(FORM_TEXT_INPUT_STYLE);

                @if let Some(message) = error_for(FormField::Date) {
                    p class=(FORM_ERROR_STYLE) { (message) }
                }
            }

            div
            {
                label for="note" class=(FORM_LABEL_STYLE) { "Notitie" }

                input
                    name="note"
                    id="note"
                    type="text"
                    placeholder="Optioneel"
                    value=(form.note)
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            div class="flex gap-4"
            {
                button type="submit" id="submit-button" class=(BUTTON_PRIMARY_STYLE)
                {
                    (loading_spinner())
                    @if editing { "Update" } @else { "Opslaan" }
                }

                button
                    type="button"
                    id="reset-button"
                    hx-post=(endpoints::RESET_FORM)
                    hx-target={ "#" (FORM_CONTAINER_ID) }
                    class=(BUTTON_SECONDARY_STYLE)
                {
                    "Reset"
                }
            }
        }
    }
}

/// The form as the workspace holds it, with the status area swapped out of band.
///
/// This is the response to every action aimed at the form container.
pub fn form_response_view(workspace: &Workspace) -> Markup {
    html! {
        (transaction_form_view(
            workspace.form(),
            workspace.editing_id().is_some(),
            workspace.form_errors(),
        ))
        (status_view(workspace.status(), true))
    }
}
