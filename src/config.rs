//! Validation of the credentials the server needs before it may initialize.

use crate::timezone::get_local_offset;

/// The timezone used when none is given on the command line.
pub const DEFAULT_TIMEZONE: &str = "Europe/Amsterdam";

/// Template text that never shows up in a generated secret, matched anywhere
/// in a credential.
const PLACEHOLDER_FRAGMENTS: [&str; 6] = ["your_", "change_me", "replace_me", "<", ">", "..."];

/// Template words, matched against whole alphanumeric words of a credential.
const PLACEHOLDER_WORDS: [&str; 3] = ["changeme", "placeholder", "replaceme"];

/// Errors that stop the server from initializing the store and identity provider.
#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum ConfigError {
    /// A required credential is empty.
    #[error("Configuratie onvolledig: {0} ontbreekt.")]
    Missing(&'static str),

    /// A credential still holds a template placeholder.
    #[error("Configuratie onvolledig: {0} bevat nog een voorbeeldwaarde.")]
    Placeholder(&'static str),

    /// The timezone is not a canonical timezone name.
    #[error("Configuratie ongeldig: onbekende tijdzone \"{0}\".")]
    InvalidTimezone(String),
}

/// The connection credentials for the identity provider and the document store.
#[derive(Debug, Clone)]
pub struct Credentials {
    /// Path to the SQLite database that holds accounts and documents.
    pub db_path: String,
    /// The secret for encrypting client cookies.
    pub secret: String,
    /// The canonical timezone name used for "today", e.g. "Europe/Amsterdam".
    pub timezone: String,
}

impl Credentials {
    /// Check that every field is filled in with a real value.
    ///
    /// # Errors
    /// Returns the first [ConfigError] found, checking `db_path`, `secret`
    /// and `timezone` in that order.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_field("db_path", &self.db_path)?;
        check_field("SECRET", &self.secret)?;
        check_field("timezone", &self.timezone)?;

        if get_local_offset(self.timezone.trim()).is_none() {
            return Err(ConfigError::InvalidTimezone(self.timezone.clone()));
        }

        Ok(())
    }
}

fn check_field(name: &'static str, value: &str) -> Result<(), ConfigError> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ConfigError::Missing(name));
    }

    let lowercase = value.to_lowercase();

    let has_fragment = PLACEHOLDER_FRAGMENTS
        .iter()
        .any(|fragment| lowercase.contains(fragment));
    let has_word = lowercase
        .split(|c: char| !c.is_alphanumeric())
        .any(is_placeholder_word);

    if has_fragment || has_word {
        return Err(ConfigError::Placeholder(name));
    }

    Ok(())
}

/// Whether `word` is a template word, or a run of at least three x's.
fn is_placeholder_word(word: &str) -> bool {
    PLACEHOLDER_WORDS.contains(&word) || (word.len() >= 3 && word.chars().all(|c| c == 'x'))
}
