//! Totals and chart datasets derived from a transaction snapshot.
//!
//! Everything here is pure: the same snapshot, filter and date always give the
//! same result.

use time::{Date, Duration, Month};

use crate::transaction::{Transaction, TransactionType, TypeFilter};

/// The number of months shown in the monthly trend chart.
pub const MONTH_WINDOW: usize = 6;

/// The category shown in the category chart when there are no expenses.
pub const NO_EXPENSES_LABEL: &str = "Geen uitgaven";

/// Restrict `transactions` to those that pass `filter`, keeping their order.
pub fn filter_transactions(transactions: &[Transaction], filter: TypeFilter) -> Vec<&Transaction> {
    transactions
        .iter()
        .filter(|transaction| filter.matches(transaction))
        .collect()
}

/// Income, expense and balance over a whole snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Totals {
    pub income: f64,
    pub expense: f64,
    pub balance: f64,
}

impl Totals {
    /// Sum every transaction, ignoring any table filter.
    pub fn from_transactions(transactions: &[Transaction]) -> Self {
        let (income, expense) =
            transactions
                .iter()
                .fold((0.0, 0.0), |(income, expense), transaction| {
                    match transaction.type_ {
                        TransactionType::Income => (income + transaction.amount, expense),
                        TransactionType::Expense => (income, expense + transaction.amount),
                    }
                });

        Self {
            income,
            expense,
            balance: income - expense,
        }
    }

    pub fn is_negative(&self) -> bool {
        self.balance < 0.0
    }
}

/// The summed expenses of one category.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryTotal {
    pub category: String,
    pub amount: f64,
}

/// Group expenses by category in the order categories first appear.
///
/// Income is ignored. Without any expense the result is a single
/// [NO_EXPENSES_LABEL] entry with a neutral value, so the chart has something
/// to draw.
pub fn category_dataset(transactions: &[Transaction]) -> Vec<CategoryTotal> {
    let mut totals: Vec<CategoryTotal> = Vec::new();

    for transaction in transactions
        .iter()
        .filter(|transaction| transaction.type_ == TransactionType::Expense)
    {
        match totals
            .iter_mut()
            .find(|total| total.category == transaction.category)
        {
            Some(total) => total.amount += transaction.amount,
            None => totals.push(CategoryTotal {
                category: transaction.category.clone(),
                amount: transaction.amount,
            }),
        }
    }

    if totals.is_empty() {
        totals.push(CategoryTotal {
            category: NO_EXPENSES_LABEL.to_owned(),
            amount: 1.0,
        });
    }

    totals
}

/// Income and expense of one calendar month.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyBucket {
    /// The first day of the month.
    pub month: Date,
    /// e.g. "mrt 2024"
    pub label: String,
    pub income: f64,
    pub expense: f64,
}

/// Income and expense for the [MONTH_WINDOW] months ending with the month of
/// `today`, oldest first.
///
/// Months without transactions are kept with zero totals.
pub fn monthly_dataset(transactions: &[Transaction], today: Date) -> Vec<MonthlyBucket> {
    let mut months = Vec::with_capacity(MONTH_WINDOW);
    let mut month = first_of_month(today);

    for _ in 0..MONTH_WINDOW {
        months.push(month);
        month = first_of_month(month - Duration::days(1));
    }

    months.reverse();

    months
        .into_iter()
        .map(|month| {
            let mut bucket = MonthlyBucket {
                month,
                label: month_label(month),
                income: 0.0,
                expense: 0.0,
            };

            for transaction in transactions
                .iter()
                .filter(|transaction| same_month(transaction.date, month))
            {
                match transaction.type_ {
                    TransactionType::Income => bucket.income += transaction.amount,
                    TransactionType::Expense => bucket.expense += transaction.amount,
                }
            }

            bucket
        })
        .collect()
}

fn first_of_month(date: Date) -> Date {
    date - Duration::days(i64::from(date.day()) - 1)
}

fn same_month(date: Date, month: Date) -> bool {
    date.year() == month.year() && date.month() == month.month()
}

/// Dutch month abbreviation and year, e.g. "mrt 2024".
fn month_label(month: Date) -> String {
    let name = match month.month() {
        Month::January => "jan",
        Month::February => "feb",
        Month::March => "mrt",
        Month::April => "apr",
        Month::May => "mei",
        Month::June => "jun",
        Month::July => "jul",
        Month::August => "aug",
        Month::September => "sep",
        Month::October => "okt",
        Month::November => "nov",
        Month::December => "dec",
    };

    format!("{name} {}", month.year())
}
