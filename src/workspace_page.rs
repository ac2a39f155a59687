//! The single page of the app and the regions it is built from.
//!
//! The page has three regions that are redrawn independently: the status
//! area, the session region (who is signed in, the auth section or the
//! workspace controls and form) and the data region (totals, charts and the
//! table). Each one listens for its own server-sent event.

use axum::{
    extract::State,
    response::{IntoResponse, Response},
};
use axum_extra::extract::PrivateCookieJar;
use maud::{Markup, html};

use crate::{
    AppState, Error,
    dashboard::DATA_REGION_ID,
    endpoints,
    html::{BUTTON_SECONDARY_STYLE, FORM_TEXT_INPUT_STYLE, HeadElement, PAGE_CONTAINER_STYLE, base},
    identity::auth_section_view,
    session::Workspace,
    status::status_view,
    transaction::{FORM_CONTAINER_ID, TransactionType, TypeFilter, transaction_form_view},
};

pub const SESSION_REGION_ID: &str = "session";

const ECHARTS_SCRIPT: &str = "/static/echarts-5.6.0.min.js";

/// The server-sent event names, one per region.
pub const SESSION_EVENT: &str = "session";
pub const SNAPSHOT_EVENT: &str = "snapshot";
pub const STATUS_EVENT: &str = "status";

/// Display the whole app for the client that sent `jar`.
pub async fn get_workspace_page(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
) -> Result<Response, Error> {
    let (jar, session) = state.sessions.session_for_jar(jar)?;
    let supports_federated = state.identity.supports_federated();

    let content = session.read(|workspace| workspace_view(workspace, supports_federated))?;
    let page = base(
        "Overzicht",
        &[HeadElement::ScriptLink(ECHARTS_SCRIPT.to_owned())],
        &content,
    );

    Ok((jar, page).into_response())
}

fn workspace_view(workspace: &Workspace, supports_federated: bool) -> Markup {
    html! {
        main
            hx-ext="sse"
            sse-connect=(endpoints::EVENTS)
            class={ (PAGE_CONTAINER_STYLE) " gap-6" }
        {
            header class="w-full max-w-4xl"
            {
                h1 class="text-3xl font-bold" { "Kasboek" }
            }

            div id="status-region" sse-swap=(STATUS_EVENT) class="w-full max-w-4xl"
            {
                (status_view(workspace.status(), false))
            }

            div
                id=(SESSION_REGION_ID)
                sse-swap=(SESSION_EVENT)
                class="w-full max-w-4xl flex flex-col items-center gap-4"
            {
                (session_region_view(workspace, supports_federated))
            }

            div
                id=(DATA_REGION_ID)
                sse-swap=(SNAPSHOT_EVENT)
                class="w-full max-w-4xl flex flex-col gap-6"
            {
                (workspace.rendered())
            }
        }
    }
}

/// The content of the session region.
///
/// Signed out, it holds the auth section. Signed in, it holds the workspace
/// controls and the transaction form instead.
pub fn session_region_view(workspace: &Workspace, supports_federated: bool) -> Markup {
    html! {
        p id="user-meta" class="w-full text-sm text-gray-600 dark:text-gray-400"
        {
            @match workspace.subject() {
                Some(subject) => { "Ingelogd als " (subject.email) },
                None => "Niet ingelogd",
            }
        }

        @if workspace.is_signed_in() {
            (controls_view(workspace.filter()))

            div id=(FORM_CONTAINER_ID) class="w-full max-w-md"
            {
                (transaction_form_view(
                    workspace.form(),
                    workspace.editing_id().is_some(),
                    workspace.form_errors(),
                ))
            }
        } @else {
            (auth_section_view(supports_federated))
        }
    }
}

fn controls_view(filter: TypeFilter) -> Markup {
    let options = [
        (TypeFilter::All, "Alles"),
        (TypeFilter::Only(TransactionType::Income), "Inkomsten"),
        (TypeFilter::Only(TransactionType::Expense), "Uitgaven"),
    ];

    html! {
        div id="controls" class="w-full flex flex-wrap items-end gap-4"
        {
            label class="flex flex-col text-sm"
            {
                "Toon"
                select
                    name="filter"
                    id="filter"
                    hx-post=(endpoints::FILTER)
                    hx-trigger="change"
                    hx-target={ "#" (DATA_REGION_ID) }
                    class=(FORM_TEXT_INPUT_STYLE)
                {
                    @for (option, label) in options {
                        option value=(option.as_str()) selected[option == filter] { (label) }
                    }
                }
            }

            div class="flex gap-2"
            {
                button
                    type="button"
                    id="refresh-button"
                    hx-post=(endpoints::REFRESH)
                    hx-target={ "#" (DATA_REGION_ID) }
                    class=(BUTTON_SECONDARY_STYLE)
                {
                    "Vernieuwen"
                }

                button
                    type="button"
                    id="sign-out-button"
                    hx-post=(endpoints::SIGN_OUT)
                    hx-target={ "#" (SESSION_REGION_ID) }
                    class=(BUTTON_SECONDARY_STYLE)
                {
                    "Uitloggen"
                }
            }
        }
    }
}

/// The response to a sign-in or sign-out: the session region, with the
/// status and the data region swapped out of band.
pub fn session_response_view(workspace: &Workspace, supports_federated: bool) -> Markup {
    html! {
        (session_region_view(workspace, supports_federated))
        (status_view(workspace.status(), true))
        (data_region_out_of_band(workspace))
    }
}

/// The data region as an out-of-band swap of its content.
pub fn data_region_out_of_band(workspace: &Workspace) -> Markup {
    html! {
        div id=(DATA_REGION_ID) hx-swap-oob="innerHTML"
        {
            (workspace.rendered())
        }
    }
}

#[cfg(test)]
mod workspace_page_tests {
    use axum::extract::State;
    use scraper::{Html, Selector};

    use crate::{
        endpoints,
        test_utils::{
            assert_content_type, assert_status_ok, assert_valid_html, get_header,
            get_test_app_state, new_client_jar, parse_html_document, signed_in_jar,
        },
    };

    use super::get_workspace_page;

    fn count(html: &Html, selector: &str) -> usize {
        html.select(&Selector::parse(selector).unwrap()).count()
    }

    #[tokio::test]
    async fn new_client_sees_auth_section_and_gets_cookie() {
        let state = get_test_app_state();

        let response = get_workspace_page(State(state.clone()), new_client_jar(&state))
            .await
            .unwrap();

        assert_status_ok(&response);
        assert_content_type(&response, "text/html; charset=utf-8");
        assert!(get_header(&response, "set-cookie").starts_with("client_id="));
        let html = parse_html_document(response).await;
        assert_valid_html(&html);
        assert_eq!(count(&html, "#auth-section"), 1);
        assert_eq!(count(&html, "#controls"), 0);
        assert_eq!(count(&html, "#transaction-form"), 0);
        assert_eq!(count(&html, "#data tr[data-placeholder]"), 1);
    }

    #[tokio::test]
    async fn signed_in_client_sees_workspace() {
        let state = get_test_app_state();
        let jar = signed_in_jar(&state).await;

        let response = get_workspace_page(State(state), jar).await.unwrap();

        let html = parse_html_document(response).await;
        assert_valid_html(&html);
        assert_eq!(count(&html, "#auth-section"), 0);
        assert_eq!(count(&html, "#controls select[name=filter]"), 1);
        assert_eq!(count(&html, "#transaction-form-container form"), 1);
        assert_eq!(count(&html, "#total-income"), 1);
        assert_eq!(count(&html, "#category-chart"), 1);
        assert_eq!(count(&html, "#monthly-chart"), 1);
    }

    #[tokio::test]
    async fn page_listens_for_server_sent_events() {
        let state = get_test_app_state();

        let response = get_workspace_page(State(state.clone()), new_client_jar(&state))
            .await
            .unwrap();

        let html = parse_html_document(response).await;
        let main = html
            .select(&Selector::parse("main[hx-ext=sse]").unwrap())
            .next()
            .unwrap();
        assert_eq!(main.value().attr("sse-connect"), Some(endpoints::EVENTS));
        assert_eq!(count(&html, "#session[sse-swap=session]"), 1);
        assert_eq!(count(&html, "#data[sse-swap=snapshot]"), 1);
        assert_eq!(count(&html, "#status-region[sse-swap=status]"), 1);
    }
}
