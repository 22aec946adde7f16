//! Locale lookup for the language picker.

use std::collections::BTreeMap;

use arrdesk_store::settings::SUPPORTED_LANGUAGES;

/// Locale code to display name, for every language the UI ships.
pub fn languages() -> BTreeMap<String, String> {
    SUPPORTED_LANGUAGES
        .iter()
        .map(|(code, name)| (code.to_string(), name.to_string()))
        .collect()
}

/// Display name for `code`, if supported.
pub fn display_name(code: &str) -> Option<&'static str> {
    SUPPORTED_LANGUAGES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, name)| *name)
}
