//! The state of one client's workspace and the pure transitions on it.

use maud::{Markup, PreEscaped};
use time::Date;

use crate::{
    dashboard::{ChartRegistry, render_dashboard},
    identity::{Subject, UserId},
    status::StatusMessage,
    store::StoreError,
    transaction::{
        Transaction, TransactionDraft, TransactionForm, TransactionId, TypeFilter,
        ValidationErrors,
    },
};

pub const SIGN_IN_FIRST: &str = "Log eerst in om je kasboek te gebruiken.";
pub const TRANSACTION_GONE: &str = "Deze transactie bestaat niet meer.";

/// The store call a valid form submission turns into.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    Create(TransactionDraft),
    Update(TransactionId, TransactionDraft),
}

impl Mutation {
    pub fn draft(&self) -> &TransactionDraft {
        match self {
            Mutation::Create(draft) | Mutation::Update(_, draft) => draft,
        }
    }
}

/// Everything the page shows for one client.
///
/// `transactions` is always the full result of the last snapshot and
/// `editing_id`, when set, names a transaction in it.
#[derive(Debug)]
pub struct Workspace {
    subject: Option<Subject>,
    transactions: Vec<Transaction>,
    editing_id: Option<TransactionId>,
    filter: TypeFilter,
    form: TransactionForm,
    form_errors: Option<ValidationErrors>,
    status: Option<StatusMessage>,
    charts: ChartRegistry,
    rendered: Markup,
}

impl Workspace {
    /// A signed-out workspace, already rendered.
    pub fn new(today: Date) -> Self {
        let mut workspace = Self {
            subject: None,
            transactions: Vec::new(),
            editing_id: None,
            filter: TypeFilter::All,
            form: TransactionForm::new_with_defaults(today),
            form_errors: None,
            status: None,
            charts: ChartRegistry::default(),
            rendered: PreEscaped(String::new()),
        };
        workspace.render(today);

        workspace
    }

    pub fn subject(&self) -> Option<&Subject> {
        self.subject.as_ref()
    }

    pub fn is_signed_in(&self) -> bool {
        self.subject.is_some()
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn editing_id(&self) -> Option<&TransactionId> {
        self.editing_id.as_ref()
    }

    pub fn filter(&self) -> TypeFilter {
        self.filter
    }

    pub fn form(&self) -> &TransactionForm {
        &self.form
    }

    pub fn form_errors(&self) -> Option<&ValidationErrors> {
        self.form_errors.as_ref()
    }

    pub fn status(&self) -> Option<&StatusMessage> {
        self.status.as_ref()
    }

    pub fn charts(&self) -> &ChartRegistry {
        &self.charts
    }

    /// The totals, charts and table as of the last [Workspace::render].
    pub fn rendered(&self) -> &Markup {
        &self.rendered
    }

    pub fn set_status(&mut self, status: StatusMessage) {
        self.status = Some(status);
    }

    /// The signed-in user's id, or `None` with an error status.
    pub fn require_signed_in(&mut self) -> Option<UserId> {
        match &self.subject {
            Some(subject) => Some(subject.uid.clone()),
            None => {
                self.set_status(StatusMessage::error(SIGN_IN_FIRST));
                None
            }
        }
    }

    /// Start a fresh workspace for `subject`.
    ///
    /// Anything left from another user is dropped.
    pub fn sign_in(&mut self, subject: Subject, today: Date) {
        self.transactions.clear();
        self.editing_id = None;
        self.filter = TypeFilter::default();
        self.form = TransactionForm::new_with_defaults(today);
        self.form_errors = None;
        self.subject = Some(subject);
    }

    /// Forget the user and everything shown for them.
    pub fn sign_out(&mut self, today: Date) {
        self.subject = None;
        self.transactions.clear();
        self.editing_id = None;
        self.filter = TypeFilter::default();
        self.form = TransactionForm::new_with_defaults(today);
        self.form_errors = None;
        self.charts.clear();
    }

    /// Replace the snapshot wholesale.
    ///
    /// If the transaction being edited is no longer in the snapshot, editing
    /// stops and the form goes back to its defaults. Returns whether that
    /// happened.
    pub fn replace_snapshot(&mut self, transactions: Vec<Transaction>, today: Date) -> bool {
        self.transactions = transactions;

        let editing_vanished = self.editing_id.as_ref().is_some_and(|editing_id| {
            !self
                .transactions
                .iter()
                .any(|transaction| &transaction.id == editing_id)
        });

        if editing_vanished {
            self.reset_form(today);
        }

        editing_vanished
    }

    pub fn set_filter(&mut self, filter: TypeFilter) {
        self.filter = filter;
    }

    /// Copy the transaction `id` into the form and mark it as being edited.
    ///
    /// Returns `false`, with an error status, if `id` is not in the snapshot.
    pub fn begin_edit(&mut self, id: &TransactionId) -> bool {
        match self
            .transactions
            .iter()
            .find(|transaction| &transaction.id == id)
        {
            Some(transaction) => {
                self.form = TransactionForm::from_transaction(transaction);
                self.form_errors = None;
                self.editing_id = Some(id.clone());
                true
            }
            None => {
                self.set_status(StatusMessage::error(TRANSACTION_GONE));
                false
            }
        }
    }

    /// Stop editing and restore the form defaults.
    pub fn reset_form(&mut self, today: Date) {
        self.editing_id = None;
        self.form = TransactionForm::new_with_defaults(today);
        self.form_errors = None;
    }

    /// Validate `form` and decide which store call it needs.
    ///
    /// Invalid input stays in the form together with its errors, and `None`
    /// is returned so that nothing reaches the store.
    pub fn prepare_submit(&mut self, form: TransactionForm) -> Option<Mutation> {
        self.require_signed_in()?;

        let result = form.validate();
        self.form = form;

        match result {
            Ok(draft) => {
                self.form_errors = None;
                Some(match &self.editing_id {
                    Some(id) => Mutation::Update(id.clone(), draft),
                    None => Mutation::Create(draft),
                })
            }
            Err(errors) => {
                self.set_status(StatusMessage::error(errors.to_string()));
                self.form_errors = Some(errors);
                None
            }
        }
    }

    /// Apply the outcome of the store call made for `mutation`.
    ///
    /// The snapshot is left alone either way; the live query brings the
    /// change in.
    pub fn finish_submit(
        &mut self,
        mutation: &Mutation,
        result: Result<(), StoreError>,
        today: Date,
    ) {
        match result {
            Ok(()) => {
                self.reset_form(today);
                self.set_status(StatusMessage::info(match mutation {
                    Mutation::Create(_) => "Transactie opgeslagen.",
                    Mutation::Update(..) => "Transactie bijgewerkt.",
                }));
            }
            Err(error) => self.set_status(StatusMessage::error(error.to_string())),
        }
    }

    /// Whether deleting `id` needs a store call at all.
    pub fn contains(&self, id: &TransactionId) -> bool {
        self.transactions
            .iter()
            .any(|transaction| &transaction.id == id)
    }

    /// Apply the outcome of deleting `id`.
    pub fn finish_delete(&mut self, id: &TransactionId, result: Result<(), StoreError>, today: Date) {
        match result {
            Ok(()) => {
                if self.editing_id.as_ref() == Some(id) {
                    self.reset_form(today);
                }
                self.set_status(StatusMessage::info("Transactie verwijderd."));
            }
            Err(error) => self.set_status(StatusMessage::error(error.to_string())),
        }
    }

    /// Recompute totals and chart datasets and render them with the table.
    ///
    /// Every chart is disposed and drawn again.
    pub fn render(&mut self, today: Date) {
        self.rendered = render_dashboard(
            &self.transactions,
            self.filter,
            self.is_signed_in(),
            &mut self.charts,
            today,
        );
    }
}
