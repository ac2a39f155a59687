//! Dashboard HTTP handlers.
//!
//! The filter and refresh endpoints answer with the data region. The event
//! stream pushes every later redraw of the page's regions to the browser.

use std::{collections::VecDeque, convert::Infallible, sync::Arc};

use axum::{
    extract::State,
    response::{
        IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
};
use axum_extra::extract::{Form, PrivateCookieJar};
use futures::stream;
use maud::{Markup, html};
use serde::Deserialize;
use tokio::sync::watch;

use crate::{
    AppState, Error,
    session::{Revisions, Session, Workspace},
    status::status_view,
    transaction::TypeFilter,
    workspace_page::{SESSION_EVENT, SNAPSHOT_EVENT, STATUS_EVENT, session_region_view},
};

/// Form data for changing the table filter.
#[derive(Debug, Deserialize)]
pub struct FilterForm {
    #[serde(default)]
    pub filter: String,
}

/// The data region content with the status swapped out of band.
fn data_response_view(workspace: &Workspace) -> Markup {
    html! {
        (workspace.rendered())
        (status_view(workspace.status(), true))
    }
}

/// API endpoint to change which transactions the table shows.
///
/// The table is rendered again from the current snapshot; the store is not
/// queried.
pub async fn post_filter(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
    Form(form): Form<FilterForm>,
) -> Result<Response, Error> {
    let (jar, session) = state.sessions.session_for_jar(jar)?;

    session.set_filter(TypeFilter::parse(&form.filter))?;
    let fragment = session.read(data_response_view)?;

    Ok((jar, fragment).into_response())
}

/// API endpoint to reload the transactions with a one-off query.
pub async fn post_refresh(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
) -> Result<Response, Error> {
    let (jar, session) = state.sessions.session_for_jar(jar)?;

    session.refresh().await?;
    let fragment = session.read(data_response_view)?;

    Ok((jar, fragment).into_response())
}

/// Follows the revisions of one session and turns them into events.
struct EventFeed {
    session: Arc<Session>,
    changes: watch::Receiver<Revisions>,
    seen: Option<Revisions>,
    supports_federated: bool,
    pending: VecDeque<Event>,
}

impl EventFeed {
    /// Queue an event for every region that changed since the last call.
    ///
    /// The first call queues all of them, so a browser that reconnects
    /// catches up on whatever it missed.
    fn queue_changes(&mut self) -> Result<(), Error> {
        let current = *self.changes.borrow_and_update();
        let previous = self.seen.replace(current);
        let changed = |revision: fn(&Revisions) -> u64| {
            previous.is_none_or(|previous| revision(&previous) != revision(&current))
        };

        let session_changed = changed(|revisions| revisions.session);
        let data_changed = changed(|revisions| revisions.data);
        let status_changed = changed(|revisions| revisions.status);
        let supports_federated = self.supports_federated;

        let events = self.session.read(|workspace| {
            let mut events = Vec::new();

            if session_changed {
                events.push(html_event(
                    SESSION_EVENT,
                    session_region_view(workspace, supports_federated),
                ));
            }
            if data_changed {
                events.push(html_event(SNAPSHOT_EVENT, workspace.rendered().clone()));
            }
            if status_changed {
                events.push(html_event(STATUS_EVENT, status_view(workspace.status(), false)));
            }

            events
        })?;

        self.pending.extend(events);

        Ok(())
    }
}

/// An event carrying `markup` for the element that listens for `name`.
fn html_event(name: &str, markup: Markup) -> Event {
    // SSE cannot carry carriage returns.
    Event::default()
        .event(name)
        .data(markup.into_string().replace('\r', ""))
}

/// The server-sent event stream of the client's session.
pub async fn get_events(
    State(state): State<AppState>,
    jar: PrivateCookieJar,
) -> Result<Response, Error> {
    let (jar, session) = state.sessions.session_for_jar(jar)?;

    let feed = EventFeed {
        changes: session.changes(),
        session,
        seen: None,
        supports_federated: state.identity.supports_federated(),
        pending: VecDeque::new(),
    };

    let events = stream::unfold(feed, |mut feed| async move {
        loop {
            if let Some(event) = feed.pending.pop_front() {
                return Some((Ok::<_, Infallible>(event), feed));
            }

            if feed.seen.is_some() && feed.changes.changed().await.is_err() {
                return None;
            }

            if let Err(error) = feed.queue_changes() {
                tracing::error!(
                    "closing event stream of client {}: {error}",
                    feed.session.client()
                );
                return None;
            }
        }
    });

    Ok((jar, Sse::new(events).keep_alive(KeepAlive::default())).into_response())
}


#[cfg(test)]
mod event_stream_tests {
    use std::time::Duration;

    use axum::extract::State;
    use futures::StreamExt;

    use crate::{
        status::StatusMessage,
        test_utils::{assert_content_type, get_test_app_state, signed_in_jar},
    };

    use super::get_events;

    /// Read the body until `needle` shows up.
    async fn read_until(body: &mut axum::body::BodyDataStream, received: &mut String, needle: &str) {
        tokio::time::timeout(Duration::from_secs(2), async {
            while !received.contains(needle) {
                let chunk = body.next().await.unwrap().unwrap();
                received.push_str(&String::from_utf8_lossy(&chunk));
            }
        })
        .await
        .unwrap_or_else(|_| panic!("never received {needle:?}, got {received:?}"));
    }

    #[tokio::test]
    async fn first_events_carry_every_region() {
        let state = get_test_app_state();
        let jar = signed_in_jar(&state).await;

        let response = get_events(State(state), jar).await.unwrap();

        assert_content_type(&response, "text/event-stream");
        let mut body = response.into_body().into_data_stream();
        let mut received = String::new();
        read_until(&mut body, &mut received, "event: status").await;
        assert!(received.contains("event: session"));
        assert!(received.contains("event: snapshot"));
        assert!(received.contains("Ingelogd als test@example.com"));
    }

    #[tokio::test]
    async fn status_change_is_pushed() {
        let state = get_test_app_state();
        let jar = signed_in_jar(&state).await;
        let (_, session) = state.sessions.session_for_jar(jar.clone()).unwrap();

        let response = get_events(State(state), jar).await.unwrap();
        let mut body = response.into_body().into_data_stream();
        let mut received = String::new();
        read_until(&mut body, &mut received, "event: status").await;

        session
            .report(StatusMessage::info("Hallo vanaf de server."))
            .unwrap();

        read_until(&mut body, &mut received, "Hallo vanaf de server.").await;
    }
}
