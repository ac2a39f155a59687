//! The auth section and the endpoints that sign clients in and out.

use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use axum_extra::extract::{Form, PrivateCookieJar};
use maud::{Markup, html};
use serde::Deserialize;

use crate::{
    AppState, Error,
    endpoints::{self, format_endpoint},
    html::{
        BUTTON_PRIMARY_STYLE, BUTTON_SECONDARY_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE,
        loading_spinner,
    },
    status::StatusMessage,
    workspace_page::{SESSION_REGION_ID, session_response_view},
};

use super::{FederatedProvider, Subject};

pub const UNKNOWN_AUTH_MODE: &str = "Kies inloggen of registreren.";

/// Renders the email and password form.
///
/// Both submit buttons send `mode`, so the request always says whether the
/// user meant to sign in or to register.
pub fn auth_section_view(supports_federated: bool) -> Markup {
    html! {
        section id="auth-section" class="w-full max-w-md space-y-4"
        {
            h2 class="text-xl font-bold" { "Inloggen" }

            form
                id="auth-form"
                hx-post=(endpoints::AUTH)
                hx-target={ "#" (SESSION_REGION_ID) }
                hx-disabled-elt="#auth-form button"
                class="space-y-4"
            {
                div
                {
                    label for="email" class=(FORM_LABEL_STYLE) { "E-mailadres" }

                    input
                        type="email"
                        name="email"
                        id="email"
                        placeholder="naam@voorbeeld.nl"
                        autocomplete="email"
                        required
                        class=(FORM_TEXT_INPUT_STYLE);
                }

                div
                {
                    label for="password" class=(FORM_LABEL_STYLE) { "Wachtwoord" }

                    input
                        type="password"
                        name="password"
                        id="password"
                        placeholder="••••••••"
                        autocomplete="current-password"
                        required
                        class=(FORM_TEXT_INPUT_STYLE);
                }

                div class="flex gap-4"
                {
                    button type="submit" name="mode" value="login" class=(BUTTON_PRIMARY_STYLE)
                    {
                        (loading_spinner())
                        "Inloggen"
                    }

                    button type="submit" name="mode" value="register" class=(BUTTON_SECONDARY_STYLE)
                    {
                        "Registreren"
                    }
                }
            }

            @if supports_federated {
                button
                    type="button"
                    id="google-sign-in"
                    hx-post=(format_endpoint(endpoints::FEDERATED_AUTH, "google"))
                    hx-target={ "#" (SESSION_REGION_ID) }
                    class=(BUTTON_SECONDARY_STYLE)
                {
                    "Inloggen met Google"
                }
            }
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AuthForm {
    #[serde(default)]
    pub mode: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// A route handler for signing in or registering with email and password.
///
/// Responds with the session region, the status and the data region. A
/// rejected attempt only changes the status.
pub async fn post_auth(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    Form(form): Form<AuthForm>,
) -> Result<Response, Error> {
    let (jar, session) = state.sessions.session_for_jar(jar)?;
    let client = session.client().clone();

    let result = match form.mode.as_str() {
        "login" => Some(
            state
                .identity
                .sign_in(&client, &form.email, &form.password)
                .await,
        ),
        "register" => Some(
            state
                .identity
                .register(&client, &form.email, &form.password)
                .await,
        ),
        other => {
            tracing::warn!("rejecting auth request with unknown mode {other:?}");
            None
        }
    };

    let status = match result {
        Some(Ok(subject)) => {
            session.sync_auth_state()?;
            signed_in_status(&subject)
        }
        Some(Err(error)) => {
            tracing::warn!("{} for client {client} failed: {error}", form.mode);
            StatusMessage::error(error.to_string())
        }
        None => StatusMessage::error(UNKNOWN_AUTH_MODE),
    };
    session.report(status)?;

    let supports_federated = state.identity.supports_federated();
    let fragment = session.read(|workspace| session_response_view(workspace, supports_federated))?;

    Ok((jar, fragment).into_response())
}

/// A route handler for signing in with a federated identity provider.
pub async fn post_federated_sign_in(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    Path(provider): Path<String>,
) -> Result<Response, Error> {
    let (jar, session) = state.sessions.session_for_jar(jar)?;

    let result = match provider.parse::<FederatedProvider>() {
        Ok(provider) => {
            state
                .identity
                .sign_in_federated(session.client(), provider)
                .await
        }
        Err(error) => Err(error),
    };

    let status = match result {
        Ok(subject) => {
            session.sync_auth_state()?;
            signed_in_status(&subject)
        }
        Err(error) => {
            tracing::warn!("federated sign-in with {provider:?} failed: {error}");
            StatusMessage::error(error.to_string())
        }
    };
    session.report(status)?;

    let supports_federated = state.identity.supports_federated();
    let fragment = session.read(|workspace| session_response_view(workspace, supports_federated))?;

    Ok((jar, fragment).into_response())
}

/// A route handler for signing out.
///
/// The live query is closed and the workspace cleared before the response
/// is rendered.
pub async fn post_sign_out(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
) -> Result<Response, Error> {
    let (jar, session) = state.sessions.session_for_jar(jar)?;

    let status = match state.identity.sign_out(session.client()).await {
        Ok(()) => {
            session.sync_auth_state()?;
            StatusMessage::info("Uitgelogd.")
        }
        Err(error) => {
            tracing::warn!("sign-out of client {} failed: {error}", session.client());
            StatusMessage::error(error.to_string())
        }
    };
    session.report(status)?;

    let supports_federated = state.identity.supports_federated();
    let fragment = session.read(|workspace| session_response_view(workspace, supports_federated))?;

    Ok((jar, fragment).into_response())
}

fn signed_in_status(subject: &Subject) -> StatusMessage {
    StatusMessage::info(format!("Ingelogd als {}.", subject.email))
}


#[cfg(test)]
mod sign_in_endpoint_tests {
    use axum::extract::{Path, State};
    use axum_extra::extract::Form;
    use scraper::{Html, Selector};

    use crate::test_utils::{
        TEST_EMAIL, TEST_PASSWORD, assert_valid_html, get_test_app_state, new_client_jar,
        parse_html_fragment, signed_in_jar,
    };

    use super::{AuthForm, UNKNOWN_AUTH_MODE, post_auth, post_federated_sign_in, post_sign_out};

    fn auth_form(mode: &str, password: &str) -> AuthForm {
        AuthForm {
            mode: mode.to_owned(),
            email: TEST_EMAIL.to_owned(),
            password: password.to_owned(),
        }
    }

    fn text_of(html: &Html, selector: &str) -> String {
        html.select(&Selector::parse(selector).unwrap())
            .next()
            .unwrap_or_else(|| panic!("nothing matches {selector}"))
            .text()
            .collect::<String>()
            .trim()
            .to_owned()
    }

    #[tokio::test]
    async fn register_signs_in_and_shows_workspace() {
        let state = get_test_app_state();
        let jar = new_client_jar(&state);

        let response = post_auth(
            State(state),
            jar,
            Form(auth_form("register", TEST_PASSWORD)),
        )
        .await
        .unwrap();

        let html = parse_html_fragment(response).await;
        assert_valid_html(&html);
        assert_eq!(text_of(&html, "#user-meta"), "Ingelogd als test@example.com");
        assert!(html.select(&Selector::parse("#auth-section").unwrap()).next().is_none());
        assert!(html.select(&Selector::parse("#transaction-form").unwrap()).next().is_some());
        assert_eq!(text_of(&html, "#status"), "Ingelogd als test@example.com.");
        assert_eq!(
            text_of(&html, "#data tr[data-placeholder]"),
            "Nog geen transacties."
        );
    }

    #[tokio::test]
    async fn wrong_password_keeps_auth_section() {
        let state = get_test_app_state();
        signed_in_jar(&state).await;
        let jar = new_client_jar(&state);

        let response = post_auth(
            State(state),
            jar,
            Form(auth_form("login", "notthepassword")),
        )
        .await
        .unwrap();

        let html = parse_html_fragment(response).await;
        assert_eq!(text_of(&html, "#user-meta"), "Niet ingelogd");
        assert!(html.select(&Selector::parse("#auth-section").unwrap()).next().is_some());
        assert_eq!(text_of(&html, "#status"), "Onjuist e-mailadres of wachtwoord.");
    }

    #[tokio::test]
    async fn unknown_mode_is_rejected() {
        let state = get_test_app_state();
        let jar = new_client_jar(&state);

        let response = post_auth(State(state), jar, Form(auth_form("sudo", TEST_PASSWORD)))
            .await
            .unwrap();

        let html = parse_html_fragment(response).await;
        assert_eq!(text_of(&html, "#status"), UNKNOWN_AUTH_MODE);
        assert_eq!(text_of(&html, "#user-meta"), "Niet ingelogd");
    }

    #[tokio::test]
    async fn federated_sign_in_reports_provider_message() {
        let state = get_test_app_state();
        let jar = new_client_jar(&state);

        let response = post_federated_sign_in(State(state), jar, Path("google".to_owned()))
            .await
            .unwrap();

        let html = parse_html_fragment(response).await;
        assert_eq!(
            text_of(&html, "#status"),
            "Inloggen met Google wordt niet ondersteund."
        );
    }

    #[tokio::test]
    async fn sign_out_clears_workspace() {
        let state = get_test_app_state();
        let jar = signed_in_jar(&state).await;

        let response = post_sign_out(State(state), jar).await.unwrap();

        let html = parse_html_fragment(response).await;
        assert_eq!(text_of(&html, "#user-meta"), "Niet ingelogd");
        assert_eq!(text_of(&html, "#status"), "Uitgelogd.");
        assert_eq!(
            text_of(&html, "#data tr[data-placeholder]"),
            "Log in om je transacties te zien."
        );
        assert_eq!(text_of(&html, "#data #total-balance p"), "€ 0,00");
    }
}
