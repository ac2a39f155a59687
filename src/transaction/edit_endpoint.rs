use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use axum_extra::extract::PrivateCookieJar;

use crate::{AppState, Error};

use super::{core::TransactionId, form::form_response_view};

/// A route handler that loads a transaction into the form for editing.
///
/// Responds with the filled-in form, or with the unchanged form and an error
/// status if the transaction is no longer in the snapshot.
pub async fn edit_transaction_endpoint(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    Path(transaction_id): Path<TransactionId>,
) -> Result<Response, Error> {
    let (jar, session) = state.sessions.session_for_jar(jar)?;

    session.begin_edit(&transaction_id)?;
    let fragment = session.read(form_response_view)?;

    Ok((jar, fragment).into_response())
}
