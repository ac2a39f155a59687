//! The shared status area that reports the outcome of every user action.

use maud::{Markup, html};

/// The two kinds of status message, styled differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub kind: StatusKind,
    pub text: String,
}

impl StatusMessage {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            kind: StatusKind::Info,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            kind: StatusKind::Error,
            text: text.into(),
        }
    }
}

pub const STATUS_ID: &str = "status";

/// Renders the status area.
///
/// With `out_of_band` set the element carries `hx-swap-oob` so it can ride
/// along with any other fragment and replace the status area in place.
pub fn status_view(status: Option<&StatusMessage>, out_of_band: bool) -> Markup {
    let style = match status.map(|status| status.kind) {
        Some(StatusKind::Error) => {
            "w-full max-w-4xl rounded px-4 py-2 text-sm bg-red-50 text-red-800 \
            dark:bg-gray-800 dark:text-red-400"
        }
        Some(StatusKind::Info) => {
            "w-full max-w-4xl rounded px-4 py-2 text-sm bg-blue-50 text-blue-800 \
            dark:bg-gray-800 dark:text-blue-400"
        }
        None => "hidden",
    };

    let kind = status.map(|status| match status.kind {
        StatusKind::Info => "info",
        StatusKind::Error => "error",
    });
    let swap_oob = out_of_band.then_some("true");

    html! {
        div
            id=(STATUS_ID)
            role="status"
            aria-live="polite"
            data-kind=[kind]
            hx-swap-oob=[swap_oob]
            class=(style)
        {
            @if let Some(status) = status {
                (status.text)
            }
        }
    }
}
