use axum::{
    extract::State,
    response::{IntoResponse, Response},
};
use axum_extra::extract::{Form, PrivateCookieJar};

use crate::{AppState, Error};

use super::form::{TransactionForm, form_response_view};

/// A route handler for the transaction form.
///
/// Creates a transaction, or updates the one being edited. Responds with the
/// form: reset after a successful save, or as submitted with the errors
/// when validation or the store failed. The table catches up through the
/// live query.
pub async fn submit_transaction_endpoint(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    Form(form): Form<TransactionForm>,
) -> Result<Response, Error> {
    let (jar, session) = state.sessions.session_for_jar(jar)?;

    session.submit(form).await?;
    let fragment = session.read(form_response_view)?;

    Ok((jar, fragment).into_response())
}

/// A route handler that stops editing and restores the form defaults.
pub async fn reset_form_endpoint(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
) -> Result<Response, Error> {
    let (jar, session) = state.sessions.session_for_jar(jar)?;

    session.reset_form()?;
    let fragment = session.read(form_response_view)?;

    Ok((jar, fragment).into_response())
}
